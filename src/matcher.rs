//! Knowledge relevance matching: given an incoming message, pick the entries
//! most likely to answer it.
//!
//! This is a pure query — it never mutates the entries it is given. The
//! caller records usage afterwards via `KnowledgeStore::record_usage`, and
//! only for entries that actually made it into a reply.
//!
//! Matching contract: an entry qualifies when at least one of its tags is a
//! substring of at least one lowercase whitespace-delimited message token.
//! Tokenization is whitespace-only, so a tag containing whitespace can never
//! match; keep tags single-token.

use crate::knowledge::KnowledgeEntry;
use crate::lead::anon_hash;

/// How many entries a match returns unless the caller asks otherwise.
pub const DEFAULT_MATCH_LIMIT: usize = 3;

/// Lowercase whitespace tokenization. Punctuation stays attached to tokens;
/// the substring rule absorbs it ("pix?" still contains "pix").
pub fn tokenize(message: &str) -> Vec<String> {
    message
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect()
}

/// Return up to `limit` entries relevant to `message`, best first.
///
/// Ordering: descending `relevance_score`, ties broken by descending
/// `usage_count`, remaining ties by the entries' original order (stable).
/// Empty message, empty entry set or `limit == 0` all yield an empty result.
pub fn match_entries<'a>(
    message: &str,
    entries: &'a [KnowledgeEntry],
    limit: usize,
) -> Vec<&'a KnowledgeEntry> {
    if limit == 0 {
        return Vec::new();
    }
    let tokens = tokenize(message);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<&KnowledgeEntry> = entries
        .iter()
        .filter(|e| qualifies(e, &tokens))
        .collect();

    // Stable sort keeps insertion order as the final tiebreak.
    candidates.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.usage_count.cmp(&a.usage_count))
    });
    candidates.truncate(limit);

    if !candidates.is_empty() {
        // Hashed id only; raw customer messages never hit the logs.
        tracing::debug!(
            target: "matcher",
            id = %anon_hash(message),
            hits = candidates.len(),
            matched = ?candidates.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
        );
    }

    candidates
}

/// Convenience wrapper with the default limit of 3.
pub fn match_entries_default<'a>(
    message: &str,
    entries: &'a [KnowledgeEntry],
) -> Vec<&'a KnowledgeEntry> {
    match_entries(message, entries, DEFAULT_MATCH_LIMIT)
}

fn qualifies(entry: &KnowledgeEntry, tokens: &[String]) -> bool {
    entry.tags.iter().any(|tag| {
        let tag = tag.to_lowercase();
        !tag.is_empty() && tokens.iter().any(|tok| tok.contains(tag.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeEntry;

    fn entry(id: &str, tags: &[&str], relevance: f32, usage: u32) -> KnowledgeEntry {
        let mut e = KnowledgeEntry::manual(id, format!("title {id}"), "conteudo", "Geral")
            .with_tags(tags.iter().copied())
            .with_relevance(relevance);
        e.usage_count = usage;
        e
    }

    #[test]
    fn tokenizer_lowercases_and_splits_on_whitespace() {
        assert_eq!(
            tokenize("Aceita  Pagamento\tvia PIX?"),
            vec!["aceita", "pagamento", "via", "pix?"]
        );
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t\n").is_empty());
    }

    #[test]
    fn pix_message_matches_payment_entry() {
        let entries = vec![
            entry("kb_pay", &["pix", "pagamento"], 0.91, 31),
            entry("kb_hours", &["horário", "funcionamento"], 0.95, 15),
        ];
        let hits = match_entries("Aceita pagamento via pix?", &entries, 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "kb_pay");
    }

    #[test]
    fn tag_matches_inside_punctuated_token() {
        // "pix?" contains "pix" — punctuation never blocks a match.
        let entries = vec![entry("kb_pay", &["pix"], 0.9, 0)];
        assert_eq!(match_entries("aceita pix?", &entries, 3).len(), 1);
    }

    #[test]
    fn never_returns_more_than_limit_and_all_qualify() {
        let entries = vec![
            entry("a", &["pedido"], 0.9, 1),
            entry("b", &["pedido"], 0.8, 2),
            entry("c", &["pedido"], 0.7, 3),
            entry("d", &["pedido"], 0.6, 4),
            entry("e", &["entrega"], 0.99, 0),
        ];
        let hits = match_entries("quero fazer um pedido", &entries, 2);
        assert_eq!(hits.len(), 2);
        let tokens = tokenize("quero fazer um pedido");
        for h in &hits {
            assert!(super::qualifies(h, &tokens));
        }
    }

    #[test]
    fn orders_by_relevance_then_usage_then_insertion() {
        let entries = vec![
            entry("low", &["pix"], 0.5, 100),
            entry("a", &["pix"], 0.9, 5),
            entry("b", &["pix"], 0.9, 10),
            entry("b_twin", &["pix"], 0.9, 10),
        ];
        let hits = match_entries("pix", &entries, 4);
        let ids: Vec<_> = hits.iter().map(|e| e.id.as_str()).collect();
        // 0.9 beats 0.5 regardless of usage; usage 10 beats 5; equal pairs
        // keep insertion order.
        assert_eq!(ids, vec!["b", "b_twin", "a", "low"]);
    }

    #[test]
    fn fewer_candidates_than_limit_returns_all_without_padding() {
        let entries = vec![entry("a", &["pix"], 0.9, 0)];
        assert_eq!(match_entries("pix", &entries, 5).len(), 1);
    }

    #[test]
    fn empty_inputs_yield_empty_results() {
        let entries = vec![entry("a", &["pix"], 0.9, 0)];
        assert!(match_entries("", &entries, 3).is_empty());
        assert!(match_entries("pix", &[], 3).is_empty());
        assert!(match_entries("pix", &entries, 0).is_empty());
    }

    #[test]
    fn matching_is_idempotent() {
        let entries = vec![
            entry("a", &["pix"], 0.9, 5),
            entry("b", &["pix", "boleto"], 0.9, 10),
        ];
        let first: Vec<String> = match_entries("pagar com pix ou boleto", &entries, 3)
            .iter()
            .map(|e| e.id.clone())
            .collect();
        let second: Vec<String> = match_entries("pagar com pix ou boleto", &entries, 3)
            .iter()
            .map(|e| e.id.clone())
            .collect();
        assert_eq!(first, second);
        // No hidden mutation: counters untouched by matching.
        assert_eq!(entries[0].usage_count, 5);
        assert_eq!(entries[1].usage_count, 10);
    }

    #[test]
    fn multiword_tags_never_match() {
        // Whitespace tokenization means a tag with a space cannot be a
        // substring of any single token. Documented contract, not a bug.
        let e = {
            let mut e = KnowledgeEntry::manual("kb", "t", "c", "Geral");
            e.tags = vec!["forma de pagamento".into()];
            e
        };
        assert!(match_entries("qual a forma de pagamento", &[e], 3).is_empty());
    }
}
