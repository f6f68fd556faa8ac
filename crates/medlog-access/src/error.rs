//! Error taxonomy for authorization decisions
//!
//! Every failure resolves to Deny. The `Display` text of [`AccessError`] is
//! stable and safe to hand to untrusted callers; raw upstream causes are
//! only ever logged.

use medlog_integrity::{EncodingError, Identity, SignatureError};
use thiserror::Error;

use crate::engine::DecisionReason;

/// Failure reported by a collaborator (role registry, ledger, content store)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("upstream call timed out")]
    Timeout,
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    /// The collaborator's own access gate refused the call
    #[error("upstream denied the call: {0}")]
    Denied(String),
    #[error("not found upstream: {0}")]
    NotFound(String),
}

/// Stable classification of an [`AccessError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Encoding,
    InvalidSignature,
    SignatureMismatch,
    Unauthorized,
    UpstreamUnavailable,
    NotFound,
}

impl ErrorKind {
    /// Message shown to callers for this kind
    pub fn public_message(&self) -> &'static str {
        match self {
            ErrorKind::Encoding => "payload could not be encoded",
            ErrorKind::InvalidSignature => "invalid signature",
            ErrorKind::SignatureMismatch => "signature does not match the claimed identity",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::UpstreamUnavailable => "upstream service unavailable",
            ErrorKind::NotFound => "not found",
        }
    }

    /// Caller-side mistakes (4xx); everything else is ours or upstream's
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ErrorKind::UpstreamUnavailable)
    }

    /// Safe for the caller to retry with backoff. Never retried internally.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::UpstreamUnavailable)
    }
}

/// Why an authorization operation did not go through
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("payload could not be encoded: {0}")]
    Encoding(#[from] EncodingError),
    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),
    #[error("signature does not match the claimed identity")]
    SignatureMismatch { claimed: Identity, recovered: Identity },
    /// A consent grant signed by someone other than its grantor. Reported
    /// to callers as an invalid signature.
    #[error("invalid signature")]
    ConsentSignerMismatch { claimed: Identity, recovered: Identity },
    #[error("unauthorized")]
    Unauthorized(DecisionReason),
    #[error("upstream service unavailable")]
    UpstreamUnavailable,
    #[error("{0} not found")]
    NotFound(&'static str),
}

impl AccessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccessError::Encoding(_) => ErrorKind::Encoding,
            AccessError::InvalidSignature(_) => ErrorKind::InvalidSignature,
            AccessError::SignatureMismatch { .. } => ErrorKind::SignatureMismatch,
            AccessError::ConsentSignerMismatch { .. } => ErrorKind::InvalidSignature,
            AccessError::Unauthorized(_) => ErrorKind::Unauthorized,
            AccessError::UpstreamUnavailable => ErrorKind::UpstreamUnavailable,
            AccessError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Stable message for untrusted callers
    pub fn public_message(&self) -> &'static str {
        self.kind().public_message()
    }

    /// Map a collaborator failure. Only the kind survives; the detail is
    /// expected to have been logged by the caller. `what` names the thing
    /// the caller asked for ("record", "content"), never the collaborator.
    pub fn from_upstream(err: &UpstreamError, what: &'static str) -> Self {
        match err {
            UpstreamError::Timeout | UpstreamError::Unavailable(_) => AccessError::UpstreamUnavailable,
            UpstreamError::Denied(_) => AccessError::Unauthorized(DecisionReason::UpstreamDenied),
            UpstreamError::NotFound(_) => AccessError::NotFound(what),
        }
    }
}

/// Invalid or incomplete service configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
