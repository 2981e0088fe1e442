//! Shielded Notes
//!
//! A note is the atomic unit of hidden value:
//!
//! ```text
//! ConfidentialNote = {
//!     value: u64,        // Amount in the smallest unit
//!     secret: [u8; 32],  // Owner's secret, never transmitted in clear
//!     salt: [u8; 32],    // Per-note randomness
//! }
//! ```
//!
//! Commitment and nullifier are pure functions of these three fields and are
//! recomputed on demand; the fields are immutable after construction, so the
//! derived values can never drift from their source.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commitment::{Commitment, commit};
use crate::hash::FieldHash;
use crate::nullifier::{Nullifier, derive_nullifier};

/// Note value with overflow protection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteValue(pub u64);

impl NoteValue {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u64::MAX);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Checked addition
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NoteError {
    #[error("note value must be positive")]
    ZeroValue,
}

/// A confidential note representing privately held value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidentialNote {
    /// The value (amount) held in this note
    pub value: NoteValue,
    /// Owner's secret (who can spend this note)
    #[serde(with = "hex::serde")]
    pub secret: [u8; 32],
    /// Random salt ensuring commitment uniqueness
    #[serde(with = "hex::serde")]
    pub salt: [u8; 32],
}

impl ConfidentialNote {
    /// Create a note for a known owner secret, with a fresh random salt
    pub fn create(value: u64, secret: [u8; 32]) -> Result<Self, NoteError> {
        let mut salt = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::from_parts(value, secret, salt)
    }

    /// Create a note with a random owner secret and salt
    pub fn generate(value: u64) -> Result<Self, NoteError> {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::create(value, secret)
    }

    /// Construct from explicit fields (restore, recovery, tests)
    pub fn from_parts(value: u64, secret: [u8; 32], salt: [u8; 32]) -> Result<Self, NoteError> {
        if value == 0 {
            return Err(NoteError::ZeroValue);
        }
        Ok(Self {
            value: NoteValue(value),
            secret,
            salt,
        })
    }

    /// Compute the commitment for this note: H(value, H(secret, salt))
    pub fn commitment(&self, hasher: &dyn FieldHash) -> Commitment {
        commit(hasher, self.value.0, &self.secret, &self.salt)
    }

    /// Derive the nullifier for spending this note: H(secret, salt)
    pub fn nullifier(&self, hasher: &dyn FieldHash) -> Nullifier {
        derive_nullifier(hasher, &self.secret, &self.salt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::PoseidonHasher;

    #[test]
    fn test_zero_value_rejected() {
        assert_eq!(ConfidentialNote::generate(0), Err(NoteError::ZeroValue));
        assert_eq!(
            ConfidentialNote::from_parts(0, [1u8; 32], [2u8; 32]),
            Err(NoteError::ZeroValue)
        );
    }

    #[test]
    fn test_create_uses_fresh_salt() {
        let secret = [1u8; 32];
        let hasher = PoseidonHasher::new();

        let a = ConfidentialNote::create(1000, secret).unwrap();
        let b = ConfidentialNote::create(1000, secret).unwrap();

        assert_ne!(a.salt, b.salt);
        assert_ne!(
            a.commitment(&hasher),
            b.commitment(&hasher),
            "equal value and secret must still commit differently"
        );
    }

    #[test]
    fn test_derived_values_stable() {
        let hasher = PoseidonHasher::new();
        let note = ConfidentialNote::from_parts(500, [3u8; 32], [4u8; 32]).unwrap();

        assert_eq!(note.commitment(&hasher), note.commitment(&hasher));
        assert_eq!(note.nullifier(&hasher), note.nullifier(&hasher));
    }

    #[test]
    fn test_serde_round_trip_preserves_derivations() {
        let hasher = PoseidonHasher::new();
        let note = ConfidentialNote::generate(12_345).unwrap();

        let json = serde_json::to_string(&note).unwrap();
        let back: ConfidentialNote = serde_json::from_str(&json).unwrap();

        assert_eq!(back, note);
        assert_eq!(back.commitment(&hasher), note.commitment(&hasher));
        assert_eq!(back.nullifier(&hasher), note.nullifier(&hasher));
    }

    #[test]
    fn test_note_value_checked_ops() {
        let v1 = NoteValue::new(100);
        let v2 = NoteValue::new(50);

        assert_eq!(v1.checked_add(v2), Some(NoteValue::new(150)));
        assert_eq!(v1.checked_sub(v2), Some(NoteValue::new(50)));
        assert_eq!(v2.checked_sub(v1), None); // Underflow
        assert_eq!(NoteValue::MAX.checked_add(NoteValue::new(1)), None); // Overflow
    }
}
