//! Simulated collaborators for the demo product.
//!
//! All randomness in the system lives here, behind the same injectable
//! traits the real scraping/verification integrations implement. The
//! decision rule in [`crate::validator`] stays deterministic and testable;
//! swap these out for real providers without touching the pipeline.

use anyhow::Result;
use chrono::{Duration, Utc};
use rand::Rng;

use crate::capture::LeadProvider;
use crate::config::{BusinessType, CaptureSettings};
use crate::lead::{Lead, LeadSource};
use crate::validator::{LeadSignals, SignalError, SignalProvider};

/// The mock scraper never yields more than this per run, regardless of the
/// daily limit.
const MAX_SIMULATED_LEADS: u32 = 25;

/// Generates niche/location-templated leads the way the demo dashboard did.
#[derive(Debug, Default)]
pub struct SimulatedLeadProvider;

#[async_trait::async_trait]
impl LeadProvider for SimulatedLeadProvider {
    async fn fetch_leads(&self, settings: &CaptureSettings) -> Result<Vec<Lead>> {
        let mut rng = rand::rng();
        let count = settings.daily_limit.min(MAX_SIMULATED_LEADS);
        let niche_slug = settings.niche.to_lowercase().replace(' ', "");
        let batch = Utc::now().timestamp_millis();

        let mut leads = Vec::with_capacity(count as usize);
        for i in 0..count {
            let n = i + 1;
            let mut lead = Lead::new(
                format!("lead_{batch}_{i}"),
                format!("{} Lead {}", settings.niche, n),
                settings.source,
            );
            lead.phone = Some(format!(
                "(11) 9{:04}-{:04}",
                rng.random_range(0..10_000),
                rng.random_range(0..10_000)
            ));
            lead.email = Some(format!("lead{n}@{niche_slug}.com"));
            lead.address = Some(format!("{}, Brasil", settings.location));
            if settings.filters.business_type != BusinessType::Individual {
                lead.company = Some(format!("{} Empresa {}", settings.niche, n));
            }
            match settings.source {
                LeadSource::Instagram => {
                    lead.instagram = Some(format!("@{niche_slug}{n}"));
                }
                LeadSource::Linkedin => {
                    lead.linkedin = Some(format!("linkedin.com/in/{niche_slug}-{n}"));
                }
                LeadSource::Facebook | LeadSource::GoogleMaps => {}
            }
            leads.push(lead);
        }
        Ok(leads)
    }

    fn name(&self) -> &'static str {
        "SimulatedLeadProvider"
    }
}

/// Random per-source signals with a configurable outage rate.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedSignalProvider {
    /// Probability in [0, 1] that a fetch fails with `SignalError::Unavailable`.
    pub failure_rate: f64,
}

impl Default for SimulatedSignalProvider {
    fn default() -> Self {
        Self { failure_rate: 0.0 }
    }
}

impl SimulatedSignalProvider {
    pub fn with_failure_rate(failure_rate: f64) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }
}

#[async_trait::async_trait]
impl SignalProvider for SimulatedSignalProvider {
    async fn fetch_signals(&self, lead: &Lead) -> Result<LeadSignals, SignalError> {
        let mut rng = rand::rng();
        if self.failure_rate > 0.0 && rng.random_bool(self.failure_rate) {
            return Err(SignalError::Unavailable {
                provider: self.name(),
                reason: "simulated outage".to_string(),
            });
        }

        // Hit rates mirror the original demo: ~80% live profiles, ~90% open
        // businesses, engagement 0-10, last post within 30 days.
        Ok(match lead.source {
            LeadSource::Instagram => LeadSignals::Instagram {
                active_profile: rng.random_bool(0.8),
                last_post_date: Utc::now()
                    - Duration::seconds(rng.random_range(0..30i64 * 86_400)),
                engagement_rate: rng.random::<f32>() * 10.0,
            },
            LeadSource::Facebook | LeadSource::Linkedin => LeadSignals::ProfileActivity {
                profile_activity: rng.random_bool(0.8),
            },
            LeadSource::GoogleMaps => LeadSignals::BusinessHours {
                business_open: rng.random_bool(0.9),
            },
        })
    }

    fn name(&self) -> &'static str {
        "SimulatedSignalProvider"
    }
}
