//! Demo that runs one simulated capture batch plus a knowledge-match round
//! and prints the job summary (stdout/log only, no network).

use zapbot_engine::sim::{SimulatedLeadProvider, SimulatedSignalProvider};
use zapbot_engine::{
    match_entries_default, run_capture, CaptureSettings, CaptureStats, EngineConfig,
    KnowledgeEntry, KnowledgeStore, LeadProvider, LeadSource, ValidationStatus,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cfg = EngineConfig::load();

    // --- Knowledge matching round ---
    let mut store = KnowledgeStore::new();
    store.add(
        KnowledgeEntry::manual(
            "kb_pay",
            "Formas de Pagamento Aceitas",
            "Aceitamos pagamento via PIX (desconto de 5%), cartão de crédito e boleto.",
            "Financeiro",
        )
        .with_tags(["pagamento", "pix", "cartão", "boleto"])
        .with_relevance(0.91),
    );
    store.add(
        KnowledgeEntry::manual(
            "kb_hours",
            "Horários de Funcionamento",
            "Funcionamos de segunda a sexta das 8h às 18h.",
            "Informações Gerais",
        )
        .with_tags(["horário", "funcionamento", "aberto"])
        .with_relevance(0.95),
    );

    let message = "Oi! Aceita pagamento via pix?";
    let hits: Vec<String> = match_entries_default(message, store.entries())
        .iter()
        .map(|e| e.id.clone())
        .collect();
    for id in &hits {
        store.record_usage(id);
    }
    println!("matched {} knowledge entries: {:?}", hits.len(), hits);

    // --- Capture batch ---
    let settings = CaptureSettings::new("dentistas", "São Paulo, SP", LeadSource::Instagram)
        .with_daily_limit(cfg.capture.daily_limit);
    let providers: Vec<Box<dyn LeadProvider>> = vec![Box::new(SimulatedLeadProvider)];
    let signals = SimulatedSignalProvider::with_failure_rate(0.1);

    let outcome = run_capture(&settings, &providers, &signals, cfg.dedup_similarity).await?;

    let mut stats = CaptureStats::default();
    stats.record(&outcome.job);

    let pending = outcome
        .leads
        .iter()
        .filter(|l| l.validation_status == ValidationStatus::Pending)
        .count();
    println!(
        "job {}: {} found / {} valid / {} still pending ({:.1}% success)",
        outcome.job.id,
        outcome.job.leads_found,
        outcome.job.leads_validated,
        pending,
        stats.success_rate()
    );

    Ok(())
}
