//! Patient consent grants
//!
//! A grant is the patient's own signed statement that clinical staff may
//! read their records. It is only worth anything while its stored
//! `(message, signature)` still recovers the grantor, so consumers
//! re-verify on every use instead of trusting a flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::PayloadData;
use crate::error::PayloadError;
use crate::identity::Identity;
use crate::payload::hex_bytes;
use crate::signature::recover_signer;

/// One patient's active delegation to clinical staff
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentGrant {
    /// The patient who signed the grant
    pub grantor: Identity,
    /// The signed data exactly as submitted
    pub message: PayloadData,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
    pub issued_at: DateTime<Utc>,
}

impl ConsentGrant {
    pub fn new(
        grantor: Identity,
        message: PayloadData,
        signature: Vec<u8>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        ConsentGrant {
            grantor,
            message,
            signature,
            issued_at,
        }
    }

    /// Re-derive the grant's authenticity from its stored bytes
    pub fn reverify(&self) -> Result<(), PayloadError> {
        let canonical = self.message.canonical_bytes()?;
        let recovered = recover_signer(&canonical, &self.signature)?;
        if recovered != self.grantor {
            return Err(PayloadError::Mismatch {
                claimed: self.grantor,
                recovered,
            });
        }
        Ok(())
    }

    /// Fail-closed form of [`reverify`](Self::reverify)
    pub fn is_authentic(&self) -> bool {
        self.reverify().is_ok()
    }
}
