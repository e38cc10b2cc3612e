// src/lib.rs
// Public library surface for integration tests (and potential reuse).
//
// The crate is a library consumed by the message-handling, lead-capture and
// persistence collaborators; it owns no transport, storage or UI.

pub mod capture;
pub mod config;
pub mod crm;
pub mod knowledge;
pub mod lead;
pub mod matcher;
pub mod sim;
pub mod validator;

// ---- Re-exports for stable public API ----
pub use crate::capture::{
    dedup_leads, run_capture, CaptureOutcome, CaptureStats, JobStatus, LeadCaptureJob,
    LeadProvider,
};
pub use crate::config::{CaptureSettings, EngineConfig};
pub use crate::crm::{sync_to_all, CrmConnector, CrmContact, CrmKind, SyncStatus};
pub use crate::knowledge::{KnowledgeEntry, KnowledgeSource, KnowledgeStore};
pub use crate::lead::{Lead, LeadSource, LeadStatus, ValidationDetails, ValidationStatus};
pub use crate::matcher::{match_entries, match_entries_default, tokenize, DEFAULT_MATCH_LIMIT};
pub use crate::validator::{
    decide, validate, LeadSignals, SignalError, SignalProvider, ValidationOutcome,
};
