//! Medlog Integrity - signed payloads and signer identity
//!
//! Pure, synchronous building blocks for wallet-signature based access
//! control over patient medical records:
//!
//! - [`Identity`]: 20-byte wallet addresses with EIP-55 text form
//! - [`PayloadData`] and [`canonicalize`]: the exact bytes a client signed
//! - [`recover_signer`]: `personal_sign` signer recovery (secp256k1)
//! - [`SignedPayload`], [`ConsentGrant`], [`MedicalRecordRef`]
//! - [`validation`]: record fields carried inside a signed write request
//!
//! # Example
//!
//! ```rust,ignore
//! use medlog_integrity::{PayloadData, SignedPayload};
//!
//! let payload: SignedPayload = serde_json::from_str(request_body)?;
//! let signer = payload.verify()?; // recovered == claimed, or an error
//! ```

pub mod codec;
pub mod consent;
pub mod error;
pub mod identity;
pub mod payload;
pub mod record;
pub mod role;
pub mod signature;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod signer;

// Re-export commonly used types for convenience
pub use codec::{canonicalize, PayloadData};
pub use consent::ConsentGrant;
pub use error::{EncodingError, IdentityError, PayloadError, SignatureError};
pub use identity::Identity;
pub use payload::SignedPayload;
pub use record::{ContentHash, MedicalRecordRef, RecordDraft, TransactionId};
pub use role::{Role, RoleSet};
pub use signature::{keccak256, personal_message_hash, recover_signer, RecoverableSignature};

#[cfg(any(test, feature = "test-utils"))]
pub use signer::LocalSigner;
