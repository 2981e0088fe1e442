//! Pool error taxonomy
//!
//! Every operation-level failure surfaces as a typed [`PoolError`]; there is
//! no retry policy in the core. Corruption found by integrity checks is
//! reported descriptively through `IntegrityReport`, never raised here.

use thiserror::Error;
use velum_privacy::{Commitment, NoteError, Nullifier, NullifierError, TreeError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("amount must be positive")]
    InvalidValue,

    #[error("commitment tree is full (capacity {capacity})")]
    TreeFull { capacity: u64 },

    #[error("note not found: {0}")]
    NoteNotFound(Commitment),

    #[error("note already spent (nullifier {0})")]
    AlreadySpent(Nullifier),

    #[error("insufficient balance: {available} < {required}")]
    InsufficientBalance { available: u64, required: u64 },

    #[error("invalid secret for note {0}")]
    InvalidSecret(Commitment),
}

impl From<NoteError> for PoolError {
    fn from(err: NoteError) -> Self {
        match err {
            NoteError::ZeroValue => PoolError::InvalidValue,
        }
    }
}

impl From<TreeError> for PoolError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::Full { capacity } => PoolError::TreeFull { capacity },
        }
    }
}

impl From<NullifierError> for PoolError {
    fn from(err: NullifierError) -> Self {
        match err {
            NullifierError::AlreadySpent(n) => PoolError::AlreadySpent(n),
        }
    }
}
