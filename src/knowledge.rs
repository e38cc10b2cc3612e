//! Knowledge base: reusable answer snippets the chatbot can surface, plus the
//! caller-owned store that manages their lifecycle.
//!
//! The store is an explicit in-memory collection — no hidden shared state.
//! Matching itself lives in [`crate::matcher`] and is a pure query; usage
//! bookkeeping (`usage_count`, `last_used`) happens only through
//! [`KnowledgeStore::record_usage`], called after an entry was actually used
//! in a reply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How an entry came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeSource {
    Manual,
    Conversation,
    Imported,
}

/// One reusable piece of chatbot content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Open label set ("Vendas", "Suporte", ...).
    pub category: String,
    /// Lowercase keywords used for matching.
    pub tags: Vec<String>,
    pub source: KnowledgeSource,
    /// Static prior weight in [0, 1]; higher entries win ties at match time.
    pub relevance_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    pub usage_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Whether future auto-learned content may overwrite this entry.
    pub auto_update: bool,
}

impl KnowledgeEntry {
    /// Fresh manual entry with the default prior (0.5) and auto-update on.
    pub fn manual(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            category: category.into(),
            tags: Vec::new(),
            source: KnowledgeSource::Manual,
            relevance_score: 0.5,
            last_used: None,
            usage_count: 0,
            created_at: now,
            updated_at: now,
            auto_update: true,
        }
    }

    /// Builder-style tag list; tags are lowercased here so matching never has
    /// to re-normalize per query.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags
            .into_iter()
            .map(|t| t.into().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    pub fn with_relevance(mut self, score: f32) -> Self {
        self.relevance_score = clamp01(score);
        self
    }

    pub fn with_source(mut self, source: KnowledgeSource) -> Self {
        self.source = source;
        self
    }
}

/// Caller-owned collection of knowledge entries. Insertion order is stable
/// and is the final tiebreak at match time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeStore {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&KnowledgeEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn add(&mut self, entry: KnowledgeEntry) {
        self.entries.push(entry);
    }

    /// Apply an edit to the entry with `id`; bumps `updated_at`. Returns
    /// `false` if no such entry exists.
    pub fn update<F>(&mut self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut KnowledgeEntry),
    {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                f(entry);
                entry.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Explicit delete — entries are never destroyed implicitly.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() < before
    }

    /// The match side effect, made explicit: call once per entry that was
    /// actually used in a response.
    pub fn record_usage(&mut self, id: &str) -> bool {
        self.update(id, |e| {
            e.usage_count += 1;
            e.last_used = Some(Utc::now());
        })
    }

    /// Case-insensitive substring search over title, content and tags
    /// (the manager UI's filter box).
    pub fn search(&self, term: &str) -> Vec<&KnowledgeEntry> {
        let term = term.to_lowercase();
        if term.is_empty() {
            return self.entries.iter().collect();
        }
        self.entries
            .iter()
            .filter(|e| {
                e.title.to_lowercase().contains(&term)
                    || e.content.to_lowercase().contains(&term)
                    || e.tags.iter().any(|t| t.contains(&term))
            })
            .collect()
    }

    /// Synthesize an entry from a conversation snippet (auto-learning).
    ///
    /// If an entry with the same title already exists it is overwritten in
    /// place — but only when its `auto_update` flag allows it; a protected
    /// entry wins and the learned content is discarded. Returns the id of the
    /// entry that now holds the content, or `None` when learning was refused.
    pub fn learn_from_conversation(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
        tags: Vec<String>,
    ) -> Option<String> {
        let title = title.into();
        let content = content.into();

        if let Some(existing) = self.entries.iter_mut().find(|e| e.title == title) {
            if !existing.auto_update {
                tracing::debug!(id = %existing.id, "auto-learn refused: entry is protected");
                return None;
            }
            existing.content = content;
            existing.source = KnowledgeSource::Conversation;
            existing.updated_at = Utc::now();
            return Some(existing.id.clone());
        }

        let id = format!("kb_auto_{}", Utc::now().timestamp_millis());
        let entry = KnowledgeEntry::manual(id.clone(), title, content, "Auto-Aprendizado")
            .with_tags(tags)
            .with_relevance(0.75)
            .with_source(KnowledgeSource::Conversation);
        self.entries.push(entry);
        Some(id)
    }

    /// Sum of usage counters across the store (dashboard stat).
    pub fn total_usage(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.usage_count)).sum()
    }
}

fn clamp01(x: f32) -> f32 {
    if x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(titles: &[&str]) -> KnowledgeStore {
        let mut s = KnowledgeStore::new();
        for (i, t) in titles.iter().enumerate() {
            s.add(KnowledgeEntry::manual(
                format!("kb_{i}"),
                *t,
                format!("conteudo de {t}"),
                "Geral",
            ));
        }
        s
    }

    #[test]
    fn manual_entry_defaults() {
        let e = KnowledgeEntry::manual("kb_1", "Horários", "8h às 18h", "Geral");
        assert_eq!(e.relevance_score, 0.5);
        assert_eq!(e.usage_count, 0);
        assert!(e.last_used.is_none());
        assert!(e.auto_update);
        assert_eq!(e.source, KnowledgeSource::Manual);
    }

    #[test]
    fn with_tags_lowercases_and_drops_blanks() {
        let e = KnowledgeEntry::manual("kb_1", "t", "c", "Geral")
            .with_tags(["PIX", "  Pagamento ", "", "  "]);
        assert_eq!(e.tags, vec!["pix", "pagamento"]);
    }

    #[test]
    fn record_usage_bumps_counter_and_timestamp() {
        let mut s = store_with(&["Pedidos"]);
        assert!(s.record_usage("kb_0"));
        assert!(s.record_usage("kb_0"));
        let e = s.get("kb_0").unwrap();
        assert_eq!(e.usage_count, 2);
        assert!(e.last_used.is_some());
        assert!(!s.record_usage("kb_missing"));
    }

    #[test]
    fn delete_is_explicit_and_targeted() {
        let mut s = store_with(&["A", "B"]);
        assert!(s.delete("kb_0"));
        assert!(!s.delete("kb_0"));
        assert_eq!(s.len(), 1);
        assert_eq!(s.entries()[0].title, "B");
    }

    #[test]
    fn search_covers_title_content_and_tags() {
        let mut s = KnowledgeStore::new();
        s.add(
            KnowledgeEntry::manual("kb_1", "Formas de Pagamento", "Aceitamos PIX", "Financeiro")
                .with_tags(["pix", "boleto"]),
        );
        s.add(KnowledgeEntry::manual(
            "kb_2",
            "Devolução",
            "Até 30 dias",
            "Suporte",
        ));
        assert_eq!(s.search("pagamento").len(), 1);
        assert_eq!(s.search("PIX").len(), 1);
        assert_eq!(s.search("boleto").len(), 1);
        assert_eq!(s.search("30 dias").len(), 1);
        assert_eq!(s.search("").len(), 2);
        assert!(s.search("inexistente").is_empty());
    }

    #[test]
    fn learn_creates_conversation_entry() {
        let mut s = KnowledgeStore::new();
        let id = s
            .learn_from_conversation(
                "Entrega expressa",
                "Entregamos em até 2h na capital.",
                vec!["entrega".into(), "prazo".into()],
            )
            .unwrap();
        let e = s.get(&id).unwrap();
        assert_eq!(e.source, KnowledgeSource::Conversation);
        assert!((e.relevance_score - 0.75).abs() < 1e-6);
        assert!(e.auto_update);
    }

    #[test]
    fn learn_respects_auto_update_flag() {
        let mut s = KnowledgeStore::new();
        let mut protected = KnowledgeEntry::manual("kb_1", "Política", "Texto oficial.", "Suporte");
        protected.auto_update = false;
        s.add(protected);

        assert!(s
            .learn_from_conversation("Política", "Texto aprendido.", vec![])
            .is_none());
        assert_eq!(s.get("kb_1").unwrap().content, "Texto oficial.");

        // With the flag on, the learned content overwrites in place.
        assert!(s.update("kb_1", |e| e.auto_update = true));
        let id = s
            .learn_from_conversation("Política", "Texto aprendido.", vec![])
            .unwrap();
        assert_eq!(id, "kb_1");
        assert_eq!(s.get("kb_1").unwrap().content, "Texto aprendido.");
        assert_eq!(s.get("kb_1").unwrap().source, KnowledgeSource::Conversation);
    }

    #[test]
    fn total_usage_sums_counters() {
        let mut s = store_with(&["A", "B"]);
        s.record_usage("kb_0");
        s.record_usage("kb_0");
        s.record_usage("kb_1");
        assert_eq!(s.total_usage(), 3);
    }
}
