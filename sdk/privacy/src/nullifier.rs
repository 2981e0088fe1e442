//! Nullifiers
//!
//! A nullifier is the unique tag a spender publishes to consume a note:
//!
//! ```text
//! Nullifier = H(secret, salt)
//! ```
//!
//! Once a nullifier is in the [`NullifierSet`] the note is spent forever.
//! The set is insert-only; there is no eviction for the pool's lifetime.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::FieldHash;

/// A nullifier (32 bytes, canonical field encoding)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nullifier(#[serde(with = "hex::serde")] pub [u8; 32]);

impl Nullifier {
    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Nullifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Nullifier {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// Derive a note's nullifier: N = H(secret, salt)
pub fn derive_nullifier(hasher: &dyn FieldHash, secret: &[u8; 32], salt: &[u8; 32]) -> Nullifier {
    Nullifier(hasher.hash_pair(secret, salt))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NullifierError {
    #[error("nullifier already recorded: {0}")]
    AlreadySpent(Nullifier),
}

/// Insert-only set of published nullifiers
///
/// Membership here is the sole double-spend guard. Insertion order is kept
/// so persisted state replays deterministically.
#[derive(Debug, Clone, Default)]
pub struct NullifierSet {
    seen: HashSet<Nullifier>,
    ordered: Vec<Nullifier>,
}

impl NullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, nullifier: &Nullifier) -> bool {
        self.seen.contains(nullifier)
    }

    /// Record a nullifier; check-then-insert, rejecting duplicates
    pub fn insert(&mut self, nullifier: Nullifier) -> Result<(), NullifierError> {
        if self.seen.contains(&nullifier) {
            return Err(NullifierError::AlreadySpent(nullifier));
        }
        self.seen.insert(nullifier);
        self.ordered.push(nullifier);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Nullifier> {
        self.ordered.iter()
    }

    /// True when the ordered log and the membership index agree
    pub fn is_consistent(&self) -> bool {
        self.seen.len() == self.ordered.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::PoseidonHasher;

    #[test]
    fn test_nullifier_deterministic() {
        let hasher = PoseidonHasher::new();

        let n1 = derive_nullifier(&hasher, &[1u8; 32], &[2u8; 32]);
        let n2 = derive_nullifier(&hasher, &[1u8; 32], &[2u8; 32]);

        assert_eq!(n1, n2, "same inputs should produce same nullifier");
    }

    #[test]
    fn test_nullifier_unique_per_secret() {
        let hasher = PoseidonHasher::new();

        let n1 = derive_nullifier(&hasher, &[1u8; 32], &[9u8; 32]);
        let n2 = derive_nullifier(&hasher, &[2u8; 32], &[9u8; 32]);

        assert_ne!(n1, n2, "different secrets should produce different nullifiers");
    }

    #[test]
    fn test_set_rejects_double_insert() {
        let mut set = NullifierSet::new();
        let n = Nullifier([42u8; 32]);

        assert!(set.insert(n).is_ok());
        assert_eq!(set.insert(n), Err(NullifierError::AlreadySpent(n)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_set_preserves_insertion_order() {
        let mut set = NullifierSet::new();
        let nullifiers = [
            Nullifier([3u8; 32]),
            Nullifier([1u8; 32]),
            Nullifier([2u8; 32]),
        ];

        for n in nullifiers {
            set.insert(n).unwrap();
        }

        let replayed: Vec<_> = set.iter().copied().collect();
        assert_eq!(replayed, nullifiers);
        assert!(set.is_consistent());
    }

    #[test]
    fn test_contains() {
        let mut set = NullifierSet::new();
        let n = Nullifier([7u8; 32]);

        assert!(!set.contains(&n));
        set.insert(n).unwrap();
        assert!(set.contains(&n));
    }
}
