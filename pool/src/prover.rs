//! Spend prover seam
//!
//! The pool consumes the proof system as an opaque prove/verify pair; the
//! real Groth16/PLONK machinery is injected here by the proving layer. The
//! pool itself only checks the structural preconditions a proof would also
//! need to satisfy (membership, unspent nullifier, balance).

use serde::{Deserialize, Serialize};
use velum_privacy::{MerklePath, Nullifier};

/// Private inputs to a spend proof
#[derive(Debug, Clone)]
pub struct SpendWitness {
    /// Value of the note being consumed
    pub value: u64,
    /// Owner's secret
    pub secret: [u8; 32],
    /// Note salt
    pub salt: [u8; 32],
    /// Membership path for the spent commitment
    pub path: MerklePath,
}

/// Public inputs a verifier sees
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpendPublicInputs {
    /// Nullifier being published
    pub nullifier: Nullifier,
    /// Tree root the membership proof was generated against
    #[serde(with = "hex::serde")]
    pub root: [u8; 32],
}

/// Opaque proof bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendProof(#[serde(with = "hex::serde")] pub Vec<u8>);

impl SpendProof {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Proof-system capability consumed by the pool
pub trait SpendProver: Send + Sync {
    fn prove(&self, witness: &SpendWitness, public: &SpendPublicInputs) -> SpendProof;
    fn verify(&self, proof: &SpendProof, public: &SpendPublicInputs) -> bool;
}

/// Development prover: a keyed blake3 transcript
///
/// The proof is `tag(public) || digest(witness, public)`. Verification
/// recomputes the public tag, which binds a proof to its public inputs but
/// proves nothing about the witness — soundness comes from the real prover
/// injected in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranscriptProver;

impl TranscriptProver {
    fn public_tag(public: &SpendPublicInputs) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new_derive_key("velum-spend-public-v1");
        hasher.update(public.nullifier.as_bytes());
        hasher.update(&public.root);
        *hasher.finalize().as_bytes()
    }

    fn transcript_digest(witness: &SpendWitness, public: &SpendPublicInputs) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new_derive_key("velum-spend-transcript-v1");
        hasher.update(&witness.value.to_le_bytes());
        hasher.update(&witness.secret);
        hasher.update(&witness.salt);
        hasher.update(&witness.path.position.to_le_bytes());
        for sibling in &witness.path.siblings {
            hasher.update(sibling);
        }
        for bit in &witness.path.path_bits {
            hasher.update(&[u8::from(*bit)]);
        }
        hasher.update(public.nullifier.as_bytes());
        hasher.update(&public.root);
        *hasher.finalize().as_bytes()
    }
}

impl SpendProver for TranscriptProver {
    fn prove(&self, witness: &SpendWitness, public: &SpendPublicInputs) -> SpendProof {
        let mut bytes = Vec::with_capacity(64);
        bytes.extend_from_slice(&Self::public_tag(public));
        bytes.extend_from_slice(&Self::transcript_digest(witness, public));
        SpendProof(bytes)
    }

    fn verify(&self, proof: &SpendProof, public: &SpendPublicInputs) -> bool {
        proof.0.len() == 64 && proof.0[..32] == Self::public_tag(public)
    }
}
