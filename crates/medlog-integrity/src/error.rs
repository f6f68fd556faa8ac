//! Error types for the integrity layer.

use thiserror::Error;

use crate::identity::Identity;

/// A payload could not be turned into canonical bytes, or a required field
/// could not be read from it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// NaN or infinity has no JSON representation
    #[error("field `{0}` holds a non-finite number")]
    NonFiniteNumber(String),
    #[error("field `{0}` is not valid UTF-8")]
    InvalidUtf8(String),
    /// Signed payloads are always JSON objects at the top level
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("payload is not valid JSON")]
    InvalidJson,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Signature bytes that cannot be used for recovery at all.
///
/// This is distinct from a signature that recovers to the wrong identity,
/// which is a policy outcome decided by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature must be {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),
    #[error("signature is not valid hex")]
    InvalidHex,
    /// r or s is zero or out of range for secp256k1
    #[error("malformed signature scalars")]
    Malformed,
    #[error("no public key can be recovered from this signature")]
    RecoveryFailed,
}

/// Textual identity that does not decode to an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address must be 40 hex characters, got {0}")]
    InvalidLength(usize),
    #[error("address is not valid hex")]
    InvalidHex,
    #[error("mixed-case address fails its checksum")]
    BadChecksum,
}

/// Failure to establish that a signed payload came from its claimed signer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error("payload signed by {recovered}, not by claimed signer {claimed}")]
    Mismatch { claimed: Identity, recovered: Identity },
}
