//! Wallet identities
//!
//! An identity is the 20-byte address derived from a secp256k1 public key.
//! Its textual form is the EIP-55 checksummed hex string; every comparison
//! happens on the decoded bytes, so any casing of `0xabc...` names the same
//! identity.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IdentityError;
use crate::signature::keccak256;

/// Number of bytes in an address
pub const IDENTITY_LEN: usize = 20;

/// A wallet address used as the subject of roles, ownership and signatures
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity([u8; IDENTITY_LEN]);

impl Identity {
    /// Create an identity from raw address bytes
    pub const fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Self {
        Identity(bytes)
    }

    /// Derive the address of a public key: the last 20 bytes of the
    /// Keccak-256 hash of the uncompressed point without its 0x04 tag.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let hash = keccak256(&point.as_bytes()[1..]);
        let mut bytes = [0u8; IDENTITY_LEN];
        bytes.copy_from_slice(&hash[32 - IDENTITY_LEN..]);
        Identity(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// EIP-55 checksummed representation, `0x` prefixed
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl Identity {
    /// Parse requiring a valid EIP-55 checksum whenever the hex is mixed
    /// case. All-lowercase and all-uppercase text carry no checksum and are
    /// accepted as is.
    pub fn parse_strict(s: &str) -> Result<Self, IdentityError> {
        let (identity, digits) = decode(s)?;
        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && identity.to_checksum()[2..] != *digits {
            return Err(IdentityError::BadChecksum);
        }
        Ok(identity)
    }
}

/// Split off the `0x` prefix and decode the 40 hex digits, ignoring case
fn decode(s: &str) -> Result<(Identity, &str), IdentityError> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or(IdentityError::MissingPrefix)?;

    if digits.len() != IDENTITY_LEN * 2 {
        return Err(IdentityError::InvalidLength(digits.len()));
    }

    let mut bytes = [0u8; IDENTITY_LEN];
    hex::decode_to_slice(digits, &mut bytes).map_err(|_| IdentityError::InvalidHex)?;
    Ok((Identity(bytes), digits))
}

impl FromStr for Identity {
    type Err = IdentityError;

    /// Any casing of the same 20 bytes names the same identity; the text is
    /// normalized, not checked. See [`Identity::parse_strict`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s).map(|(identity, _)| identity)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.to_checksum())
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
