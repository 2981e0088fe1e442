//! Velum Shielded Pool
//!
//! The pool state machine tying together the privacy primitives from
//! `velum-privacy`: deposits mint notes into the commitment tree, transfers
//! consume a note and mint recipient/change notes behind a published
//! nullifier, withdrawals take a note's full value back out. State persists
//! through a transport-neutral JSON document.
//!
//! ```text
//! deposit ──▶ note ──▶ commitment ──▶ tree (append-only)
//! spend   ──▶ nullifier set (insert-only)  +  new output notes
//! ```
//!
//! All mutating operations are synchronous and atomic; wrap the pool in
//! [`SharedPool`] to share it across threads.

pub mod error;
pub mod pool;
pub mod prover;
pub mod state;

pub use error::PoolError;
pub use pool::{
    BalanceView, DEFAULT_TREE_DEPTH, DepositReceipt, IntegrityReport, PoolConfig,
    ROOT_HISTORY_SIZE, SharedPool, ShieldedPool, TransferReceipt, WithdrawReceipt,
    derive_recipient_secret,
};
pub use prover::{SpendProof, SpendProver, SpendPublicInputs, SpendWitness, TranscriptProver};
pub use state::{NoteRecord, StateDocument, StateError};
