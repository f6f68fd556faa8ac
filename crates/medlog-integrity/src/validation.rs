//! Field extraction for signed record payloads
//!
//! Staff clients sign an object carrying `patientAddress`, `condition`,
//! `diagnosis`, `treatment` and `ipfsHash`. Field order is whatever the
//! client used; only presence and types are checked here.

use serde_json::Value;

use crate::codec::PayloadData;
use crate::error::EncodingError;
use crate::identity::Identity;
use crate::record::{ContentHash, RecordDraft};

pub const FIELD_PATIENT: &str = "patientAddress";
pub const FIELD_CONDITION: &str = "condition";
pub const FIELD_DIAGNOSIS: &str = "diagnosis";
pub const FIELD_TREATMENT: &str = "treatment";
pub const FIELD_CONTENT_HASH: &str = "ipfsHash";

/// Longest free-text clinical field accepted
pub const MAX_CLINICAL_TEXT_LEN: usize = 4096;

/// Pull the record fields out of a signed write payload
pub fn record_draft(data: &PayloadData) -> Result<RecordDraft, EncodingError> {
    let patient = require_text(data, FIELD_PATIENT)?
        .parse::<Identity>()
        .map_err(|e| EncodingError::InvalidField {
            field: FIELD_PATIENT,
            reason: e.to_string(),
        })?;

    Ok(RecordDraft {
        patient,
        condition: clinical_text(data, FIELD_CONDITION)?,
        diagnosis: clinical_text(data, FIELD_DIAGNOSIS)?,
        treatment: clinical_text(data, FIELD_TREATMENT)?,
        content_hash: ContentHash::new(require_text(data, FIELD_CONTENT_HASH)?)?,
    })
}

fn require_text<'a>(data: &'a PayloadData, field: &'static str) -> Result<&'a str, EncodingError> {
    match data.get(field) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(EncodingError::InvalidField {
            field,
            reason: "expected a string".to_string(),
        }),
        None => Err(EncodingError::MissingField(field)),
    }
}

fn clinical_text(data: &PayloadData, field: &'static str) -> Result<String, EncodingError> {
    let text = require_text(data, field)?;
    if text.len() > MAX_CLINICAL_TEXT_LEN {
        return Err(EncodingError::InvalidField {
            field,
            reason: format!("longer than {MAX_CLINICAL_TEXT_LEN} bytes"),
        });
    }
    Ok(text.to_string())
}
