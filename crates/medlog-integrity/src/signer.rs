//! Local wallet stand-in for tests
//!
//! Produces the same `personal_sign` signatures a browser wallet would.
//! Key management is not part of the service; this exists so tests and
//! benches can create real signatures.

use k256::ecdsa::SigningKey;

use crate::codec::PayloadData;
use crate::error::{PayloadError, SignatureError};
use crate::identity::Identity;
use crate::payload::SignedPayload;
use crate::signature::{keccak256, personal_message_hash, SIGNATURE_LEN};

/// A secp256k1 key that signs personal messages
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    identity: Identity,
}

impl LocalSigner {
    /// Deterministic key derived from a label, e.g. `"patient-1"`
    pub fn from_seed(seed: &str) -> Self {
        let mut material = keccak256(seed.as_bytes());
        loop {
            // a hash lands outside the scalar field with negligible odds
            if let Ok(key) = SigningKey::from_slice(&material) {
                return Self::from_key(key);
            }
            material = keccak256(&material);
        }
    }

    /// Key from raw secret scalar bytes
    pub fn from_secret(secret: &[u8]) -> Result<Self, SignatureError> {
        let key = SigningKey::from_slice(secret).map_err(|_| SignatureError::Malformed)?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: SigningKey) -> Self {
        let identity = Identity::from_verifying_key(key.verifying_key());
        LocalSigner { key, identity }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// `personal_sign(message)` as `r || s || v` with `v` in {27, 28}
    pub fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let digest = personal_message_hash(message);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&digest)
            .map_err(|_| SignatureError::Malformed)?;

        let mut out = Vec::with_capacity(SIGNATURE_LEN);
        out.extend_from_slice(&signature.to_bytes());
        out.push(27 + recovery_id.to_byte());
        Ok(out)
    }

    /// Sign the canonical bytes of `data` and claim it as this signer
    pub fn sign_payload(&self, data: PayloadData) -> Result<SignedPayload, PayloadError> {
        let message = data.canonical_bytes()?;
        let signature = self.sign_message(&message)?;
        Ok(SignedPayload::new(data, signature, self.identity))
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
