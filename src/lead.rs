//! Lead data model: identity fields, capture source, pipeline status and
//! validation state, plus normalization helpers for scraped text.
//!
//! `validation_status` is owned exclusively by the validator flow and only
//! ever moves `pending -> {valid, invalid}`; the business pipeline `status`
//! is independent of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validator::ValidationOutcome;

/// Where a lead was scraped from. Adding a source means adding one variant
/// here plus one decision arm in the validator — shared logic stays untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Instagram,
    Facebook,
    Linkedin,
    GoogleMaps,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSource::Instagram => "instagram",
            LeadSource::Facebook => "facebook",
            LeadSource::Linkedin => "linkedin",
            LeadSource::GoogleMaps => "google_maps",
        }
    }
}

impl std::fmt::Display for LeadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business pipeline stage. Independent of validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
    Invalid,
}

/// Set exclusively by the lead validator; one-way transition from `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    Valid,
    Invalid,
}

/// Source-specific signal bundle recorded alongside the verdict.
/// Which fields are populated depends on the lead source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_post_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_open: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_activity: Option<bool>,
}

/// A prospective contact captured from an external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub source: LeadSource,
    pub status: LeadStatus,
    pub validation_status: ValidationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_details: Option<ValidationDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Fresh lead as produced by a capture job: `status = new`,
    /// `validation_status = pending`, no details yet.
    pub fn new(id: impl Into<String>, name: impl Into<String>, source: LeadSource) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            phone: None,
            email: None,
            instagram: None,
            linkedin: None,
            facebook: None,
            company: None,
            address: None,
            website: None,
            source,
            status: LeadStatus::New,
            validation_status: ValidationStatus::Pending,
            validation_details: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a validation verdict. Only applies while the lead is still
    /// `pending`; returns `false` (and changes nothing) otherwise, so a
    /// settled verdict can never be reversed by a late retry.
    pub fn apply_validation(&mut self, outcome: ValidationOutcome) -> bool {
        if self.validation_status != ValidationStatus::Pending {
            return false;
        }
        self.validation_status = outcome.status;
        self.validation_details = Some(outcome.details);
        self.updated_at = Utc::now();
        true
    }

    /// Short anonymized id for log lines. Never log raw contact data;
    /// phone/email/name only ever appear hashed.
    pub fn contact_hash(&self) -> String {
        let key = self
            .phone
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.name);
        anon_hash(key)
    }

    /// Normalize all scraped free-text fields in place.
    pub fn normalize_fields(&mut self) {
        self.name = normalize_field(&self.name);
        for f in [
            &mut self.company,
            &mut self.address,
            &mut self.website,
        ] {
            if let Some(v) = f.as_deref() {
                let n = normalize_field(v);
                *f = if n.is_empty() { None } else { Some(n) };
            }
        }
    }
}

/// Normalize a scraped text field: decode HTML entities, strip markup,
/// collapse whitespace, cap length.
pub fn normalize_field(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 4) Length cap: 200 chars is plenty for any identity field
    if out.chars().count() > 200 {
        out = out.chars().take(200).collect();
    }

    out
}

/// 12-hex-char SHA-256 prefix used to reference customer data in logs.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
