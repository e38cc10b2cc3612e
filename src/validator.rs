//! Lead validation: a deterministic decision rule over source-specific
//! signals fetched from an external verification collaborator.
//!
//! The split matters: `decide` is a pure function (signals in, verdict out)
//! and is the only place that knows the per-source validity rules; the
//! collaborator behind [`SignalProvider`] owns all I/O, timeouts and any
//! simulated randomness. A failed fetch surfaces as [`SignalError`] so the
//! caller keeps the lead `pending` and retries later — the validator never
//! guesses a signal value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lead::{Lead, LeadSource, ValidationDetails, ValidationStatus};

/// Signals produced by the verification collaborator, one bundle shape per
/// lead source family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LeadSignals {
    /// Instagram profile-liveness check.
    Instagram {
        active_profile: bool,
        last_post_date: DateTime<Utc>,
        /// Posts-per-follower style metric, 0.0–10.0.
        engagement_rate: f32,
    },
    /// Facebook / LinkedIn profile-activity check.
    ProfileActivity { profile_activity: bool },
    /// Google Maps business-hours check.
    BusinessHours { business_open: bool },
}

impl LeadSignals {
    fn kind(&self) -> &'static str {
        match self {
            LeadSignals::Instagram { .. } => "instagram",
            LeadSignals::ProfileActivity { .. } => "profile_activity",
            LeadSignals::BusinessHours { .. } => "business_hours",
        }
    }
}

/// Verdict plus the signal bundle that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub status: ValidationStatus,
    pub details: ValidationDetails,
}

/// Why no verdict could be reached. All variants mean "retry later with the
/// lead still pending" — none of them is a validity judgement.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("signal provider `{provider}` unavailable: {reason}")]
    Unavailable {
        provider: &'static str,
        reason: String,
    },
    #[error("signal provider `{provider}` timed out")]
    Timeout { provider: &'static str },
    #[error("provider `{provider}` returned {got} signals for a {want} lead")]
    SourceMismatch {
        provider: &'static str,
        want: LeadSource,
        got: &'static str,
    },
}

/// External verification collaborator (profile-liveness check, business-hours
/// check). Implementations own networking, timeouts and simulation; they must
/// be safe to call concurrently for different leads.
#[async_trait::async_trait]
pub trait SignalProvider: Send + Sync {
    async fn fetch_signals(&self, lead: &Lead) -> Result<LeadSignals, SignalError>;
    fn name(&self) -> &'static str;
}

/// Pure per-source decision rule. One arm per source; adding a source adds an
/// arm here, never a change to shared logic. Returns `None` when the signal
/// bundle does not belong to the given source.
pub fn decide(source: LeadSource, signals: &LeadSignals) -> Option<ValidationOutcome> {
    match (source, signals) {
        (
            LeadSource::Instagram,
            LeadSignals::Instagram {
                active_profile,
                last_post_date,
                engagement_rate,
            },
        ) => Some(ValidationOutcome {
            status: verdict(*active_profile),
            details: ValidationDetails {
                instagram_active: Some(*active_profile),
                last_post_date: Some(*last_post_date),
                engagement_rate: Some(engagement_rate.clamp(0.0, 10.0)),
                ..Default::default()
            },
        }),
        (
            LeadSource::Facebook | LeadSource::Linkedin,
            LeadSignals::ProfileActivity { profile_activity },
        ) => Some(ValidationOutcome {
            status: verdict(*profile_activity),
            details: ValidationDetails {
                profile_activity: Some(*profile_activity),
                ..Default::default()
            },
        }),
        (LeadSource::GoogleMaps, LeadSignals::BusinessHours { business_open }) => {
            Some(ValidationOutcome {
                status: verdict(*business_open),
                details: ValidationDetails {
                    business_open: Some(*business_open),
                    ..Default::default()
                },
            })
        }
        _ => None,
    }
}

fn verdict(usable: bool) -> ValidationStatus {
    if usable {
        ValidationStatus::Valid
    } else {
        ValidationStatus::Invalid
    }
}

/// Fetch signals for `lead` and run the decision rule. On any error the lead
/// is left untouched by the caller (still `pending`) and the error carries
/// enough context for retry/backoff bookkeeping.
pub async fn validate(
    lead: &Lead,
    provider: &dyn SignalProvider,
) -> Result<ValidationOutcome, SignalError> {
    let signals = provider.fetch_signals(lead).await?;
    decide(lead.source, &signals).ok_or_else(|| SignalError::SourceMismatch {
        provider: provider.name(),
        want: lead.source,
        got: signals.kind(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lead(source: LeadSource) -> Lead {
        Lead::new("lead_t", "Teste", source)
    }

    struct FixedProvider(Result<LeadSignals, &'static str>);

    #[async_trait::async_trait]
    impl SignalProvider for FixedProvider {
        async fn fetch_signals(&self, _lead: &Lead) -> Result<LeadSignals, SignalError> {
            match &self.0 {
                Ok(s) => Ok(s.clone()),
                Err(reason) => Err(SignalError::Unavailable {
                    provider: self.name(),
                    reason: reason.to_string(),
                }),
            }
        }
        fn name(&self) -> &'static str {
            "FixedProvider"
        }
    }

    #[test]
    fn instagram_active_profile_is_valid() {
        let s = LeadSignals::Instagram {
            active_profile: true,
            last_post_date: Utc::now(),
            engagement_rate: 4.2,
        };
        let out = decide(LeadSource::Instagram, &s).unwrap();
        assert_eq!(out.status, ValidationStatus::Valid);
        assert_eq!(out.details.instagram_active, Some(true));
        assert!(out.details.last_post_date.is_some());
    }

    #[test]
    fn instagram_inactive_even_with_high_engagement_is_invalid() {
        // Validity hinges on active_profile alone; engagement is informative.
        let s = LeadSignals::Instagram {
            active_profile: false,
            last_post_date: Utc::now(),
            engagement_rate: 9.9,
        };
        let out = decide(LeadSource::Instagram, &s).unwrap();
        assert_eq!(out.status, ValidationStatus::Invalid);
    }

    #[test]
    fn engagement_rate_is_clamped() {
        let s = LeadSignals::Instagram {
            active_profile: true,
            last_post_date: Utc::now(),
            engagement_rate: 42.0,
        };
        let out = decide(LeadSource::Instagram, &s).unwrap();
        assert_eq!(out.details.engagement_rate, Some(10.0));
    }

    #[test]
    fn facebook_and_linkedin_share_the_activity_rule() {
        let s = LeadSignals::ProfileActivity {
            profile_activity: true,
        };
        for src in [LeadSource::Facebook, LeadSource::Linkedin] {
            let out = decide(src, &s).unwrap();
            assert_eq!(out.status, ValidationStatus::Valid);
            assert_eq!(out.details.profile_activity, Some(true));
        }
    }

    #[test]
    fn closed_business_is_invalid() {
        let s = LeadSignals::BusinessHours {
            business_open: false,
        };
        let out = decide(LeadSource::GoogleMaps, &s).unwrap();
        assert_eq!(out.status, ValidationStatus::Invalid);
        assert_eq!(out.details.business_open, Some(false));
    }

    #[test]
    fn mismatched_signal_bundle_yields_no_verdict() {
        let s = LeadSignals::BusinessHours {
            business_open: true,
        };
        assert!(decide(LeadSource::Instagram, &s).is_none());
    }

    #[tokio::test]
    async fn provider_error_propagates_without_a_verdict() {
        let l = lead(LeadSource::Linkedin);
        let p = FixedProvider(Err("connection reset"));
        let err = validate(&l, &p).await.unwrap_err();
        assert!(matches!(err, SignalError::Unavailable { .. }));
        // The lead itself was never touched.
        assert_eq!(l.validation_status, ValidationStatus::Pending);
    }

    #[tokio::test]
    async fn mismatch_surfaces_as_signal_error() {
        let l = lead(LeadSource::GoogleMaps);
        let p = FixedProvider(Ok(LeadSignals::ProfileActivity {
            profile_activity: true,
        }));
        let err = validate(&l, &p).await.unwrap_err();
        assert!(matches!(err, SignalError::SourceMismatch { .. }));
    }
}
