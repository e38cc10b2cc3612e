//! CRM sync boundary: fan a valid lead out to every enabled connector.
//!
//! Sync is optional and independent of validation — a sync error never
//! touches the lead's status, it is only recorded on the per-connector
//! [`CrmContact`] so the caller can retry. The actual HTTP clients live in
//! the integration layer; this module only defines the seam.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lead::Lead;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrmKind {
    Hubspot,
    Pipedrive,
    RdStation,
}

impl CrmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrmKind::Hubspot => "hubspot",
            CrmKind::Pipedrive => "pipedrive",
            CrmKind::RdStation => "rd_station",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Synced,
    Error,
}

/// One lead's sync record for one CRM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrmContact {
    pub lead_id: String,
    pub crm_type: CrmKind,
    /// Remote contact id, empty until the first successful sync.
    pub crm_contact_id: String,
    pub sync_status: SyncStatus,
    pub last_sync: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// One CRM integration. Implementations own auth and HTTP; `push_contact`
/// returns the remote contact id on success.
#[async_trait::async_trait]
pub trait CrmConnector: Send + Sync {
    fn kind(&self) -> CrmKind;
    async fn push_contact(&self, lead: &Lead) -> Result<String>;
}

/// Push `lead` to every connector, tolerating per-connector failures.
/// Returns one [`CrmContact`] record per connector, in input order.
pub async fn sync_to_all(lead: &Lead, connectors: &[Box<dyn CrmConnector>]) -> Vec<CrmContact> {
    let mut results = Vec::with_capacity(connectors.len());
    for c in connectors {
        let record = match c.push_contact(lead).await {
            Ok(remote_id) => CrmContact {
                lead_id: lead.id.clone(),
                crm_type: c.kind(),
                crm_contact_id: remote_id,
                sync_status: SyncStatus::Synced,
                last_sync: Utc::now(),
                error_message: None,
            },
            Err(e) => {
                tracing::warn!(crm = c.kind().as_str(), contact = %lead.contact_hash(), error = ?e, "CRM sync error");
                CrmContact {
                    lead_id: lead.id.clone(),
                    crm_type: c.kind(),
                    crm_contact_id: String::new(),
                    sync_status: SyncStatus::Error,
                    last_sync: Utc::now(),
                    error_message: Some(e.to_string()),
                }
            }
        };
        results.push(record);
    }
    results
}
