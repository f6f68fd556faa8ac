//! Signed authorization payloads

use serde::{Deserialize, Serialize};

use crate::codec::PayloadData;
use crate::error::PayloadError;
use crate::identity::Identity;
use crate::signature::recover_signer;

/// Data signed by a wallet, the signature, and who claims to have signed it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayload {
    pub data: PayloadData,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
    pub claimed_signer: Identity,
}

impl SignedPayload {
    pub fn new(data: PayloadData, signature: Vec<u8>, claimed_signer: Identity) -> Self {
        SignedPayload {
            data,
            signature,
            claimed_signer,
        }
    }

    /// Identity that actually signed the canonical form of `data`
    pub fn recover_signer(&self) -> Result<Identity, PayloadError> {
        let message = self.data.canonical_bytes()?;
        Ok(recover_signer(&message, &self.signature)?)
    }

    /// Authenticate the payload: the recovered signer must be the claimed one
    pub fn verify(&self) -> Result<Identity, PayloadError> {
        let recovered = self.recover_signer()?;
        if recovered != self.claimed_signer {
            return Err(PayloadError::Mismatch {
                claimed: self.claimed_signer,
                recovered,
            });
        }
        Ok(recovered)
    }
}

/// Serde adapter writing byte strings as `0x` hex
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::signature::decode_hex;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        decode_hex(&text).map_err(serde::de::Error::custom)
    }
}
