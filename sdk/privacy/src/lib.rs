//! Velum Privacy SDK
//!
//! Zcash-style note-based privacy primitives for the Velum shielded pool.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Shielded Operation                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │  Nullifiers  │  │ Commitments  │  │   Encrypted Output    │ │
//! │  │  (spent)     │  │  (new notes) │  │   (for recipient)     │ │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘ │
//! │         │                 │                     │               │
//! │         ▼                 ▼                     ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │            Commitment Tree (append-only Merkle)          │   │
//! │  │  • Membership proofs without revealing which note        │   │
//! │  │  • One root summarizing every commitment ever inserted   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every hash in the system goes through the injected [`FieldHash`] seam, so
//! the Poseidon instance can be swapped for another field-native hash without
//! touching note, tree, or pool logic.

pub mod commitment;
pub mod encryption;
pub mod hash;
pub mod merkle;
pub mod note;
pub mod nullifier;

pub use commitment::{Commitment, commit};
pub use encryption::{EncryptedNote, decrypt_note, encrypt_note, try_decrypt_note};
pub use hash::{FieldHash, PoseidonHasher, Sha256Hasher, field_from_u64};
pub use merkle::{
    CommitmentTree, EMPTY_NODE, MAX_TREE_DEPTH, MerklePath, RootHistory, TreeError,
};
pub use note::{ConfidentialNote, NoteError, NoteValue};
pub use nullifier::{Nullifier, NullifierError, NullifierSet, derive_nullifier};
