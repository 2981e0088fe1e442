//! Note Commitments
//!
//! A commitment hides a note's contents while binding to them:
//!
//! ```text
//! Commitment = H(value, H(secret, salt))
//! ```
//!
//! The inner hash doubles as the note's nullifier, so publishing the
//! nullifier at spend time never reveals the committed value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::hash::{FieldHash, field_from_u64};

/// A note commitment (32 bytes, canonical field encoding)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(#[serde(with = "hex::serde")] pub [u8; 32]);

impl Commitment {
    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Commitment {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// Commit to a note: C = H(value, H(secret, salt))
///
/// # Arguments
/// * `hasher` - The injected field hash
/// * `value` - The note value (amount)
/// * `secret` - Owner's secret (32 bytes)
/// * `salt` - Random salt (32 bytes)
pub fn commit(
    hasher: &dyn FieldHash,
    value: u64,
    secret: &[u8; 32],
    salt: &[u8; 32],
) -> Commitment {
    let inner = hasher.hash_pair(secret, salt);
    Commitment(hasher.hash_pair(&field_from_u64(value), &inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::PoseidonHasher;

    #[test]
    fn test_commitment_deterministic() {
        let hasher = PoseidonHasher::new();
        let secret = [1u8; 32];
        let salt = [42u8; 32];

        let c1 = commit(&hasher, 1000, &secret, &salt);
        let c2 = commit(&hasher, 1000, &secret, &salt);

        assert_eq!(c1, c2, "same inputs should produce same commitment");
    }

    #[test]
    fn test_commitment_hiding() {
        let hasher = PoseidonHasher::new();
        let secret = [1u8; 32];

        let c1 = commit(&hasher, 1000, &secret, &[1u8; 32]);
        let c2 = commit(&hasher, 1000, &secret, &[2u8; 32]);

        assert_ne!(
            c1, c2,
            "different salts should produce different commitments"
        );
    }

    #[test]
    fn test_commitment_binding() {
        let hasher = PoseidonHasher::new();
        let secret = [1u8; 32];
        let salt = [42u8; 32];

        let c1 = commit(&hasher, 1000, &secret, &salt);
        let c2 = commit(&hasher, 2000, &secret, &salt);

        assert_ne!(
            c1, c2,
            "different values should produce different commitments"
        );
    }

    #[test]
    fn test_hex_round_trip() {
        let c = Commitment([0xab; 32]);
        let parsed: Commitment = c.to_string().parse().unwrap();
        assert_eq!(parsed, c);

        // Without the 0x prefix too
        let parsed: Commitment = hex::encode([0xab; 32]).parse().unwrap();
        assert_eq!(parsed, c);
    }

    #[test]
    fn test_serde_as_hex() {
        let c = Commitment([0x01; 32]);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, format!("\"{}\"", hex::encode([0x01; 32])));

        let back: Commitment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
