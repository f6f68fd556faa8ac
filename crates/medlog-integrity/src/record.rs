//! Medical record references kept on the ledger

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EncodingError;
use crate::identity::Identity;

/// Longest content address accepted (CIDv1 base32 of a sha2-512 is ~110)
pub const MAX_CONTENT_HASH_LEN: usize = 128;

/// Address of a blob in the content-addressed store
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Accepts non-empty ASCII alphanumeric addresses (CIDs, hex digests)
    pub fn new(hash: impl Into<String>) -> Result<Self, EncodingError> {
        let hash = hash.into();
        if hash.is_empty() || hash.len() > MAX_CONTENT_HASH_LEN {
            return Err(EncodingError::InvalidField {
                field: "ipfsHash",
                reason: format!("length must be 1..={MAX_CONTENT_HASH_LEN}"),
            });
        }
        if !hash.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(EncodingError::InvalidField {
                field: "ipfsHash",
                reason: "must be ASCII alphanumeric".to_string(),
            });
        }
        Ok(ContentHash(hash))
    }

    /// Lowercase hex of a 32-byte digest
    pub fn from_digest(digest: [u8; 32]) -> Self {
        ContentHash(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentHash {
    type Error = EncodingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ContentHash::new(value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ledger transaction hash returned by a write
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Clinical fields of a record about to be written
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    pub patient: Identity,
    pub condition: String,
    pub diagnosis: String,
    pub treatment: String,
    pub content_hash: ContentHash,
}

/// Immutable record metadata as stored on the ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecordRef {
    pub patient: Identity,
    pub condition: String,
    pub diagnosis: String,
    pub treatment: String,
    pub content_hash: ContentHash,
    pub recorded_at: DateTime<Utc>,
}

impl MedicalRecordRef {
    pub fn from_draft(draft: RecordDraft, recorded_at: DateTime<Utc>) -> Self {
        MedicalRecordRef {
            patient: draft.patient,
            condition: draft.condition,
            diagnosis: draft.diagnosis,
            treatment: draft.treatment,
            content_hash: draft.content_hash,
            recorded_at,
        }
    }
}

/// Display order: newest first. Stable for equal timestamps.
pub fn sort_newest_first(records: &mut [MedicalRecordRef]) {
    records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
}
