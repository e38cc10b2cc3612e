//! Lead capture pipeline: one batch run per job.
//!
//! Flow: fetch raw leads from the injected scraping providers (per-provider
//! errors are tolerated), normalize scraped fields, collapse near-duplicate
//! contacts, cap at the daily limit, then validate each lead through the
//! signal collaborator. A failed signal fetch leaves that lead `pending` for
//! a later retry; it never fails the batch.
//!
//! Job invariant: `leads_validated <= leads_found`, and status only moves
//! `pending -> running -> {completed, failed}`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

use crate::config::CaptureSettings;
use crate::lead::{Lead, LeadSource, ValidationStatus};
use crate::validator::{validate, SignalProvider};

/// One-time metrics registration (so series show up for any exporter the
/// embedding service wires in).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("capture_leads_found_total", "Leads kept after dedup/limit.");
        describe_counter!("capture_leads_validated_total", "Leads validated as usable.");
        describe_counter!("capture_leads_invalid_total", "Leads validated as not usable.");
        describe_counter!(
            "capture_signal_errors_total",
            "Validation signal fetches that failed (lead left pending)."
        );
        describe_counter!("capture_provider_errors_total", "Lead provider fetch errors.");
        describe_counter!("capture_dedup_total", "Leads dropped as near-duplicates.");
        describe_gauge!("capture_last_run_ts", "Unix ts when a capture batch last ran.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Bookkeeping for one capture run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadCaptureJob {
    pub id: String,
    pub niche: String,
    pub location: String,
    pub source: LeadSource,
    pub status: JobStatus,
    pub leads_found: u32,
    pub leads_validated: u32,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LeadCaptureJob {
    pub fn new(niche: impl Into<String>, location: impl Into<String>, source: LeadSource) -> Self {
        let now = Utc::now();
        Self {
            id: format!("job_{}", now.timestamp_millis()),
            niche: niche.into(),
            location: location.into(),
            source,
            status: JobStatus::Pending,
            leads_found: 0,
            leads_validated: 0,
            started_at: now,
            completed_at: None,
            error_message: None,
        }
    }

    /// `pending -> running`. Returns `false` on any other state.
    pub fn start(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Running;
        self.started_at = Utc::now();
        true
    }

    /// `running -> completed`. Clamps `validated` so the
    /// `leads_validated <= leads_found` invariant holds even for a buggy
    /// caller. Terminal once set.
    pub fn complete(&mut self, found: u32, validated: u32) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        if validated > found {
            tracing::warn!(job = %self.id, found, validated, "validated count exceeds found; clamping");
        }
        self.leads_found = found;
        self.leads_validated = validated.min(found);
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
        true
    }

    /// `running -> failed`. Terminal once set.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(Utc::now());
        true
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }

    /// Valid/found ratio in percent (dashboard figure); 0 for an empty run.
    pub fn success_rate(&self) -> f32 {
        if self.leads_found == 0 {
            0.0
        } else {
            (self.leads_validated as f32 / self.leads_found as f32) * 100.0
        }
    }
}

/// Running totals across capture runs (the "today" panel).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureStats {
    pub leads_generated: u32,
    pub leads_validated: u32,
}

impl CaptureStats {
    pub fn record(&mut self, job: &LeadCaptureJob) {
        self.leads_generated += job.leads_found;
        self.leads_validated += job.leads_validated;
    }

    pub fn success_rate(&self) -> f32 {
        if self.leads_generated == 0 {
            0.0
        } else {
            (self.leads_validated as f32 / self.leads_generated as f32) * 100.0
        }
    }
}

/// Scraping collaborator: turns capture settings into raw leads. Owns all
/// networking and rate limiting.
#[async_trait::async_trait]
pub trait LeadProvider: Send + Sync {
    async fn fetch_leads(&self, settings: &CaptureSettings) -> Result<Vec<Lead>>;
    fn name(&self) -> &'static str;
}

/// Result of one batch: the finished job record plus every kept lead with its
/// validation state applied (leads with failed signal fetches stay pending).
#[derive(Debug)]
pub struct CaptureOutcome {
    pub job: LeadCaptureJob,
    pub leads: Vec<Lead>,
    /// How many raw leads were dropped as near-duplicates.
    pub deduped: usize,
}

/// Drop leads whose contact already appeared earlier in the batch: exact
/// phone/email collision, or normalized-name similarity at or above
/// `similarity_threshold`. First occurrence wins.
pub fn dedup_leads(raw: Vec<Lead>, similarity_threshold: f32) -> (Vec<Lead>, usize) {
    let mut kept: Vec<Lead> = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;

    'outer: for lead in raw {
        let name = lead.name.to_lowercase();
        for k in &kept {
            let same_phone = lead.phone.is_some() && lead.phone == k.phone;
            let same_email = lead.email.is_some() && lead.email == k.email;
            let similar_name =
                normalized_levenshtein(&name, &k.name.to_lowercase()) as f32 >= similarity_threshold;
            if same_phone || same_email || similar_name {
                dropped += 1;
                continue 'outer;
            }
        }
        kept.push(lead);
    }

    (kept, dropped)
}

/// Run one capture batch and return the finished job plus its leads.
///
/// Per-provider fetch errors are logged and counted; the job only fails when
/// every provider errored and nothing was captured. Signal-fetch errors leave
/// the affected lead `pending` and are counted, never fatal.
pub async fn run_capture(
    settings: &CaptureSettings,
    providers: &[Box<dyn LeadProvider>],
    signals: &dyn SignalProvider,
    dedup_similarity: f32,
) -> Result<CaptureOutcome> {
    settings.validate()?;
    ensure_metrics_described();

    let mut job = LeadCaptureJob::new(&settings.niche, &settings.location, settings.source);
    job.start();

    let mut raw: Vec<Lead> = Vec::new();
    let mut provider_errors = 0usize;
    for p in providers {
        match p.fetch_leads(settings).await {
            Ok(mut v) => raw.append(&mut v),
            Err(e) => {
                tracing::warn!(error = ?e, provider = p.name(), "lead provider error");
                counter!("capture_provider_errors_total").increment(1);
                provider_errors += 1;
            }
        }
    }

    if raw.is_empty() && provider_errors == providers.len() && !providers.is_empty() {
        job.fail("all lead providers failed");
        return Ok(CaptureOutcome {
            job,
            leads: Vec::new(),
            deduped: 0,
        });
    }

    for lead in &mut raw {
        lead.normalize_fields();
    }

    let (mut leads, deduped) = dedup_leads(raw, dedup_similarity);
    counter!("capture_dedup_total").increment(deduped as u64);
    leads.truncate(settings.daily_limit as usize);

    let found = leads.len() as u32;
    let mut validated = 0u32;
    for lead in &mut leads {
        match validate(lead, signals).await {
            Ok(outcome) => {
                let usable = outcome.status == ValidationStatus::Valid;
                lead.apply_validation(outcome);
                if usable {
                    validated += 1;
                    counter!("capture_leads_validated_total").increment(1);
                } else {
                    counter!("capture_leads_invalid_total").increment(1);
                }
            }
            Err(e) => {
                // Still pending; the caller can re-run validation later.
                tracing::warn!(error = %e, contact = %lead.contact_hash(), "signal fetch failed");
                counter!("capture_signal_errors_total").increment(1);
            }
        }
    }

    job.complete(found, validated);

    counter!("capture_leads_found_total").increment(u64::from(found));
    gauge!("capture_last_run_ts").set(Utc::now().timestamp().max(0) as f64);
    tracing::info!(
        job = %job.id,
        source = %job.source,
        found,
        validated,
        deduped,
        "capture batch finished"
    );

    Ok(CaptureOutcome {
        job,
        leads,
        deduped,
    })
}
