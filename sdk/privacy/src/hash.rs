//! Field Hashing
//!
//! Every commitment, nullifier, and tree node in the pool is a BLS12-381
//! scalar-field element, serialized as 32 canonical little-endian bytes.
//! The two-argument binding hash that combines them is injected behind the
//! [`FieldHash`] trait so the tree and pool logic never name a hash family.
//!
//! ```text
//! FieldHash::hash_pair(a, b) -> field element
//! ```
//!
//! [`PoseidonHasher`] is the production instance. [`Sha256Hasher`] reduces a
//! general-purpose digest into the field and stands in where a ZK-friendly
//! permutation is not needed (tests, tooling).

use ark_bls12_381::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};
use ark_ff::{BigInteger, PrimeField};
use sha2::{Digest, Sha256};

/// Two-argument binding hash over the scalar field.
///
/// Implementations must be deterministic and collision-resistant. Inputs are
/// reduced into the field; the output is the canonical little-endian encoding
/// of the resulting element.
pub trait FieldHash: Send + Sync {
    fn hash_pair(&self, left: &[u8; 32], right: &[u8; 32]) -> [u8; 32];
}

/// Convert bytes to a field element (reducing mod the field order)
pub fn field_from_bytes(bytes: &[u8; 32]) -> Fr {
    Fr::from_le_bytes_mod_order(bytes)
}

/// Convert a field element to its canonical 32-byte encoding
pub fn field_to_bytes(f: Fr) -> [u8; 32] {
    let bytes = f.into_bigint().to_bytes_le();
    let mut arr = [0u8; 32];
    arr[..bytes.len().min(32)].copy_from_slice(&bytes[..bytes.len().min(32)]);
    arr
}

/// Canonical encoding of a value as a field element
pub fn field_from_u64(value: u64) -> [u8; 32] {
    field_to_bytes(Fr::from(value))
}

/// Poseidon-based field hash
///
/// Field: BLS12-381 Fr (255 bits)
/// Rate: 2, Capacity: 1
/// Security: 128 bits
pub struct PoseidonHasher {
    config: PoseidonConfig<Fr>,
}

impl PoseidonHasher {
    pub fn new() -> Self {
        Self {
            config: poseidon_config(),
        }
    }
}

impl FieldHash for PoseidonHasher {
    fn hash_pair(&self, left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
        let mut sponge = PoseidonSponge::new(&self.config);

        let left_f = field_from_bytes(left);
        let right_f = field_from_bytes(right);

        sponge.absorb(&left_f);
        sponge.absorb(&right_f);

        let result: Fr = sponge.squeeze_field_elements(1)[0];
        field_to_bytes(result)
    }
}

impl Default for PoseidonHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 field hash stand-in
///
/// Hashes `left || right` and reduces the digest into the field. Not
/// circuit-friendly; swappable for [`PoseidonHasher`] without touching any
/// caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl FieldHash for Sha256Hasher {
    fn hash_pair(&self, left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(left);
        hasher.update(right);
        let digest: [u8; 32] = hasher.finalize().into();
        field_to_bytes(Fr::from_le_bytes_mod_order(&digest))
    }
}

/// Poseidon configuration shared by commitments, nullifiers, and the tree
fn poseidon_config() -> PoseidonConfig<Fr> {
    let prime_bits: u64 = 255;
    let rate: usize = 2;
    let capacity: usize = 1;
    let full_rounds: u64 = 8;
    let partial_rounds: u64 = 57;
    let alpha: u64 = 5;
    let skip_matrices: u64 = 0;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        prime_bits,
        rate,
        full_rounds,
        partial_rounds,
        skip_matrices,
    );

    PoseidonConfig::new(
        full_rounds as usize,
        partial_rounds as usize,
        alpha,
        mds,
        ark,
        rate,
        capacity,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poseidon_deterministic() {
        let hasher = PoseidonHasher::new();
        let a = [1u8; 32];
        let b = [2u8; 32];

        let h1 = hasher.hash_pair(&a, &b);
        let h2 = hasher.hash_pair(&a, &b);

        assert_eq!(h1, h2, "same inputs should produce same hash");
    }

    #[test]
    fn test_poseidon_order_matters() {
        let hasher = PoseidonHasher::new();
        let a = [1u8; 32];
        let b = [2u8; 32];

        assert_ne!(
            hasher.hash_pair(&a, &b),
            hasher.hash_pair(&b, &a),
            "hash must not be commutative"
        );
    }

    #[test]
    fn test_sha256_deterministic() {
        let hasher = Sha256Hasher;
        let a = [3u8; 32];
        let b = [4u8; 32];

        assert_eq!(hasher.hash_pair(&a, &b), hasher.hash_pair(&a, &b));
    }

    #[test]
    fn test_hashers_disagree() {
        let a = [5u8; 32];
        let b = [6u8; 32];

        assert_ne!(
            PoseidonHasher::new().hash_pair(&a, &b),
            Sha256Hasher.hash_pair(&a, &b),
        );
    }

    #[test]
    fn test_field_u64_round_trip() {
        let bytes = field_from_u64(1000);
        assert_eq!(field_from_bytes(&bytes), Fr::from(1000u64));

        // Canonical encoding: low 8 bytes carry the value, rest are zero
        assert_eq!(&bytes[..8], &1000u64.to_le_bytes());
        assert!(bytes[8..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_output_is_canonical() {
        let out = PoseidonHasher::new().hash_pair(&[7u8; 32], &[8u8; 32]);
        assert_eq!(field_to_bytes(field_from_bytes(&out)), out);
    }
}
