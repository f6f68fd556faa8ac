//! Signer recovery for `personal_sign` messages
//!
//! Wallets never sign the raw message. They sign
//! `keccak256("\x19Ethereum Signed Message:\n" || len(msg) || msg)` and emit
//! 65 bytes `r || s || v`. Recovery reverses that to the signer's address.

use std::fmt;

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

use crate::error::SignatureError;
use crate::identity::Identity;

/// Prefix wallets prepend before hashing a personal message
pub const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Length of an `r || s || v` signature
pub const SIGNATURE_LEN: usize = 65;

/// Keccak-256 digest
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Digest a wallet actually signs for `message`
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// A structurally valid 65-byte recoverable signature
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature([u8; SIGNATURE_LEN]);

impl RecoverableSignature {
    /// Check length and recovery byte. Scalars are checked at recovery.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(SignatureError::InvalidLength {
                expected: SIGNATURE_LEN,
                got: bytes.len(),
            });
        }
        normalize_v(bytes[64])?;

        let mut raw = [0u8; SIGNATURE_LEN];
        raw.copy_from_slice(bytes);
        Ok(RecoverableSignature(raw))
    }

    /// Parse `0x`-prefixed (or bare) hex as produced by wallet RPCs
    pub fn from_hex(text: &str) -> Result<Self, SignatureError> {
        Self::from_bytes(&decode_hex(text)?)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// Recovery id in 0..=1, whichever `v` convention the signer used
    pub fn recovery_id(&self) -> u8 {
        // from_bytes already rejected anything else
        normalize_v(self.0[64]).unwrap_or(0)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Recover the identity that produced this signature over `message`
    pub fn recover(&self, message: &[u8]) -> Result<Identity, SignatureError> {
        let digest = personal_message_hash(message);

        let mut signature =
            Signature::from_slice(&self.0[..64]).map_err(|_| SignatureError::Malformed)?;
        let mut recovery_id = RecoveryId::from_byte(self.recovery_id())
            .ok_or(SignatureError::InvalidRecoveryId(self.0[64]))?;

        // Ethereum tooling accepts high-S signatures; k256 only verifies
        // low-S. Normalizing s mirrors the point, so flip the y parity too.
        if let Some(low_s) = signature.normalize_s() {
            signature = low_s;
            recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
        }

        let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
            .map_err(|_| SignatureError::RecoveryFailed)?;
        Ok(Identity::from_verifying_key(&key))
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({})", self.to_hex())
    }
}

/// Recover the signer of a personal message.
///
/// Fails only when the signature bytes are unusable. Whether the recovered
/// identity is the expected one is for the caller to decide.
pub fn recover_signer(message: &[u8], signature: &[u8]) -> Result<Identity, SignatureError> {
    RecoverableSignature::from_bytes(signature)?.recover(message)
}

/// Decode signature hex, with or without a `0x` prefix
pub fn decode_hex(text: &str) -> Result<Vec<u8>, SignatureError> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    hex::decode(digits).map_err(|_| SignatureError::InvalidHex)
}

fn normalize_v(v: u8) -> Result<u8, SignatureError> {
    match v {
        0 | 1 => Ok(v),
        27 | 28 => Ok(v - 27),
        _ => Err(SignatureError::InvalidRecoveryId(v)),
    }
}
