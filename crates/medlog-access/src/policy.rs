//! Consent validity policies
//!
//! Grants carry no expiry or revocation of their own. A policy decides
//! whether an authentic grant still counts at a given moment; the default
//! accepts every authentic grant forever.

use chrono::{DateTime, Duration, Utc};
use medlog_integrity::ConsentGrant;

/// Time-based validity of an already re-verified grant
pub trait ConsentPolicy: Send + Sync {
    fn is_current(&self, grant: &ConsentGrant, now: DateTime<Utc>) -> bool;
}

/// Grants never lapse; only a newer grant replaces one
#[derive(Debug, Default, Clone, Copy)]
pub struct UnboundedConsent;

impl ConsentPolicy for UnboundedConsent {
    fn is_current(&self, _grant: &ConsentGrant, _now: DateTime<Utc>) -> bool {
        true
    }
}

/// Grants lapse a fixed time after issue
#[derive(Debug, Clone, Copy)]
pub struct MaxAgeConsent {
    pub max_age: Duration,
}

impl MaxAgeConsent {
    pub fn new(max_age: Duration) -> Self {
        MaxAgeConsent { max_age }
    }
}

impl ConsentPolicy for MaxAgeConsent {
    fn is_current(&self, grant: &ConsentGrant, now: DateTime<Utc>) -> bool {
        // a grant stamped in the future is treated as not yet valid
        grant.issued_at <= now && now - grant.issued_at <= self.max_age
    }
}
