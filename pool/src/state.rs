//! Pool state persistence
//!
//! Serializes pool state to a transport-neutral document: notes in original
//! insertion order, published nullifiers in publication order, and the root
//! as a cross-check. Import replays the document into a fresh pool —
//! re-inserting every commitment in order so tree indices and the root come
//! out identical — and refuses documents whose recorded derivations or root
//! do not match what it recomputes.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use velum_privacy::{Commitment, ConfidentialNote, FieldHash, Nullifier};

use crate::error::PoolError;
use crate::pool::{PoolConfig, PoolNote, ROOT_HISTORY_SIZE, ShieldedPool};
use crate::prover::SpendProver;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("i/o failure reading or writing state")]
    Io(#[from] std::io::Error),

    #[error("malformed state document")]
    Json(#[from] serde_json::Error),

    #[error("recorded commitment {recorded} does not match recomputed {computed}")]
    CommitmentMismatch {
        recorded: Commitment,
        computed: Commitment,
    },

    #[error("recorded nullifier {recorded} does not match recomputed {computed}")]
    NullifierMismatch {
        recorded: Nullifier,
        computed: Nullifier,
    },

    #[error("reconstructed root 0x{actual} does not match recorded root 0x{expected}")]
    RootMismatch { expected: String, actual: String },

    #[error(transparent)]
    Replay(#[from] PoolError),
}

/// One persisted note, derived fields included for cross-checking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRecord {
    pub value: u64,
    #[serde(with = "hex::serde")]
    pub secret: [u8; 32],
    #[serde(with = "hex::serde")]
    pub salt: [u8; 32],
    pub commitment: Commitment,
    pub nullifier: Nullifier,
}

/// Persisted pool state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDocument {
    pub name: String,
    pub tree_depth: usize,
    /// Notes in original insertion order; order is load-bearing, the
    /// reconstructed tree indices and root depend on it
    pub notes: Vec<NoteRecord>,
    /// Published nullifiers in publication order
    pub nullifiers: Vec<Nullifier>,
    /// Root recorded at export time, verified after reconstruction
    #[serde(with = "hex::serde")]
    pub root: [u8; 32],
}

impl ShieldedPool {
    /// Export pool state for persistence
    pub fn export_state(&self) -> StateDocument {
        let hasher = self.hasher.as_ref();

        let mut entries: Vec<&PoolNote> = self.notes.values().collect();
        entries.sort_by_key(|entry| entry.position);

        let notes = entries
            .iter()
            .map(|entry| NoteRecord {
                value: entry.note.value.as_u64(),
                secret: entry.note.secret,
                salt: entry.note.salt,
                commitment: entry.note.commitment(hasher),
                nullifier: entry.note.nullifier(hasher),
            })
            .collect();

        StateDocument {
            name: self.name.clone(),
            tree_depth: self.tree.depth(),
            notes,
            nullifiers: self.nullifiers.iter().copied().collect(),
            root: self.tree.root(),
        }
    }

    /// Reconstruct a pool from a persisted document
    ///
    /// The same hash collaborator used at export time must be supplied;
    /// recorded commitments will not recompute under a different one.
    pub fn import_state(
        doc: &StateDocument,
        hasher: Arc<dyn FieldHash>,
        prover: Arc<dyn SpendProver>,
    ) -> Result<ShieldedPool, StateError> {
        let config = PoolConfig {
            name: doc.name.clone(),
            tree_depth: doc.tree_depth,
            root_history: ROOT_HISTORY_SIZE,
        };
        let mut pool = ShieldedPool::with_collaborators(config, hasher, prover);

        for record in &doc.notes {
            let note = ConfidentialNote::from_parts(record.value, record.secret, record.salt)
                .map_err(PoolError::from)?;

            let commitment = note.commitment(pool.hasher.as_ref());
            if commitment != record.commitment {
                return Err(StateError::CommitmentMismatch {
                    recorded: record.commitment,
                    computed: commitment,
                });
            }

            let nullifier = note.nullifier(pool.hasher.as_ref());
            if nullifier != record.nullifier {
                return Err(StateError::NullifierMismatch {
                    recorded: record.nullifier,
                    computed: nullifier,
                });
            }

            let (position, _) = pool.tree.insert(&commitment).map_err(PoolError::from)?;
            pool.notes.insert(commitment, PoolNote { note, position });
        }

        for nullifier in &doc.nullifiers {
            pool.nullifiers.insert(*nullifier).map_err(PoolError::from)?;
        }

        pool.root_history.push(pool.tree.root());

        if pool.tree.root() != doc.root {
            return Err(StateError::RootMismatch {
                expected: hex::encode(doc.root),
                actual: hex::encode(pool.tree.root()),
            });
        }

        info!(
            "restored pool '{}': {} notes, {} nullifiers",
            pool.name,
            pool.notes.len(),
            pool.nullifiers.len()
        );

        Ok(pool)
    }

    /// Write pool state to a JSON file
    pub fn save_state(&self, path: impl AsRef<Path>) -> Result<(), StateError> {
        let doc = self.export_state();
        fs::write(path, serde_json::to_vec_pretty(&doc)?)?;
        Ok(())
    }

    /// Read pool state back from a JSON file
    pub fn load_state(
        path: impl AsRef<Path>,
        hasher: Arc<dyn FieldHash>,
        prover: Arc<dyn SpendProver>,
    ) -> Result<ShieldedPool, StateError> {
        let doc: StateDocument = serde_json::from_slice(&fs::read(path)?)?;
        Self::import_state(&doc, hasher, prover)
    }
}
