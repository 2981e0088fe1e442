//! Shielded Pool
//!
//! Orchestrates notes, the commitment tree, and the nullifier set into the
//! five pool operations: deposit, transfer, withdraw, balance lookup, and
//! integrity verification.
//!
//! The pool is an owned aggregate with single-writer / multiple-reader
//! semantics: mutating operations take `&mut self`, reads take `&self`.
//! Services that share a pool across threads wrap it in [`SharedPool`] and
//! take the write lock for deposits, transfers, and withdrawals.
//!
//! Every operation is observably atomic. All failable checks — existence,
//! spent status, balance, ownership, and remaining tree capacity for every
//! leaf the operation will insert — run before the first state change, so an
//! error never leaves a half-applied operation behind.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use velum_privacy::{
    Commitment, CommitmentTree, ConfidentialNote, FieldHash, MerklePath, Nullifier, NullifierSet,
    PoseidonHasher, RootHistory,
};

use crate::error::PoolError;
use crate::prover::{SpendProof, SpendProver, SpendPublicInputs, SpendWitness, TranscriptProver};

/// Default tree depth (capacity 65536 notes)
pub const DEFAULT_TREE_DEPTH: usize = 16;

/// Maximum number of recent roots kept for stale-proof tolerance
pub const ROOT_HISTORY_SIZE: usize = 100;

/// Pool construction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Human-readable pool name, carried through persisted state
    pub name: String,
    /// Commitment tree depth; capacity is 2^depth
    pub tree_depth: usize,
    /// Recent-root history size
    pub root_history: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "velum-pool".to_string(),
            tree_depth: DEFAULT_TREE_DEPTH,
            root_history: ROOT_HISTORY_SIZE,
        }
    }
}

/// A note recorded in the pool, with its tree position
#[derive(Debug, Clone)]
pub(crate) struct PoolNote {
    pub(crate) note: ConfidentialNote,
    pub(crate) position: u64,
}

/// Result of a deposit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositReceipt {
    pub commitment: Commitment,
    /// Returned for owner bookkeeping; NOT yet published to the pool
    pub nullifier: Nullifier,
    pub leaf_index: u64,
    #[serde(with = "hex::serde")]
    pub new_root: [u8; 32],
}

/// Result of a transfer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReceipt {
    pub amount: u64,
    /// Nullifier of the consumed note, now published
    pub nullifier: Nullifier,
    pub recipient_commitment: Commitment,
    /// Change note for the sender, when the spent note was larger than `amount`
    pub change_commitment: Option<Commitment>,
    /// Membership proof for the spent note, valid against `proof_root`
    pub merkle_proof: MerklePath,
    #[serde(with = "hex::serde")]
    pub proof_root: [u8; 32],
    pub spend_proof: SpendProof,
    #[serde(with = "hex::serde")]
    pub new_root: [u8; 32],
}

/// Result of a withdrawal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithdrawReceipt {
    pub amount: u64,
    pub recipient: String,
    pub nullifier: Nullifier,
    /// Membership proof for the withdrawn note, valid against `proof_root`
    pub merkle_proof: MerklePath,
    #[serde(with = "hex::serde")]
    pub proof_root: [u8; 32],
    pub spend_proof: SpendProof,
}

/// Spendable balance held under one secret
#[derive(Debug, Clone, Serialize)]
pub struct BalanceView {
    pub total: u128,
    pub note_count: usize,
    /// Unspent commitments, in insertion order
    pub commitments: Vec<Commitment>,
}

/// Outcome of an integrity check; problems are reported, never thrown
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub valid: bool,
    pub note_count: usize,
    pub nullifier_count: usize,
    #[serde(with = "hex::serde")]
    pub root: [u8; 32],
    pub issues: Vec<String>,
}

/// Thread-safe handle: readers share, writers exclude
pub type SharedPool = Arc<RwLock<ShieldedPool>>;

/// Derive a note secret for a recipient address hint
///
/// Stand-in for out-of-band key exchange: a real deployment has the
/// recipient hand the sender a fresh note secret instead.
pub fn derive_recipient_secret(address: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key("velum-recipient-v1");
    hasher.update(address.as_bytes());
    *hasher.finalize().as_bytes()
}

/// The shielded pool state machine
pub struct ShieldedPool {
    pub(crate) name: String,
    pub(crate) hasher: Arc<dyn FieldHash>,
    pub(crate) prover: Arc<dyn SpendProver>,
    /// All notes ever recorded, keyed by commitment; spent notes are
    /// retained for audit and are excluded from balances by the nullifier set
    pub(crate) notes: HashMap<Commitment, PoolNote>,
    pub(crate) nullifiers: NullifierSet,
    pub(crate) tree: CommitmentTree,
    pub(crate) root_history: RootHistory,
}

impl std::fmt::Debug for ShieldedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShieldedPool")
            .field("name", &self.name)
            .field("notes", &self.notes.len())
            .finish_non_exhaustive()
    }
}

impl ShieldedPool {
    /// Create an empty pool with the default Poseidon hash and dev prover
    pub fn new(config: PoolConfig) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(PoseidonHasher::new()),
            Arc::new(TranscriptProver),
        )
    }

    /// Create an empty pool with injected hash and prover collaborators
    pub fn with_collaborators(
        config: PoolConfig,
        hasher: Arc<dyn FieldHash>,
        prover: Arc<dyn SpendProver>,
    ) -> Self {
        let tree = CommitmentTree::new(config.tree_depth, Arc::clone(&hasher));
        let mut root_history = RootHistory::new(config.root_history);
        root_history.push(tree.root());

        Self {
            name: config.name,
            hasher,
            prover,
            notes: HashMap::new(),
            nullifiers: NullifierSet::new(),
            tree,
            root_history,
        }
    }

    /// Deposit value into the pool, creating a fresh note
    ///
    /// The returned nullifier is a derived value for the owner's records;
    /// it is not inserted into the nullifier set until spend time.
    pub fn deposit(
        &mut self,
        value: u64,
        owner_secret: [u8; 32],
    ) -> Result<DepositReceipt, PoolError> {
        let note = ConfidentialNote::create(value, owner_secret)?;
        let commitment = note.commitment(self.hasher.as_ref());
        let nullifier = note.nullifier(self.hasher.as_ref());

        let (leaf_index, _) = self.tree.insert(&commitment)?;
        self.notes.insert(
            commitment,
            PoolNote {
                note,
                position: leaf_index,
            },
        );

        let new_root = self.tree.root();
        self.root_history.push(new_root);

        info!("deposited {value} units, commitment {commitment}, leaf {leaf_index}");

        Ok(DepositReceipt {
            commitment,
            nullifier,
            leaf_index,
            new_root,
        })
    }

    /// Spend a note privately: publish its nullifier and create a recipient
    /// note (plus a change note when the spent note is larger than `amount`)
    pub fn transfer(
        &mut self,
        from_commitment: Commitment,
        to_address: &str,
        amount: u64,
        owner_secret: [u8; 32],
    ) -> Result<TransferReceipt, PoolError> {
        let entry = self
            .notes
            .get(&from_commitment)
            .ok_or(PoolError::NoteNotFound(from_commitment))?;
        let spent_note = entry.note.clone();
        let position = entry.position;

        let nullifier = spent_note.nullifier(self.hasher.as_ref());
        if self.nullifiers.contains(&nullifier) {
            return Err(PoolError::AlreadySpent(nullifier));
        }

        let value = spent_note.value.as_u64();
        if value < amount {
            return Err(PoolError::InsufficientBalance {
                available: value,
                required: amount,
            });
        }
        if amount == 0 {
            return Err(PoolError::InvalidValue);
        }

        // Reserve capacity for every leaf this transfer will insert, so the
        // mutations below cannot fail halfway through
        let change = value - amount;
        let slots_needed = if change > 0 { 2 } else { 1 };
        if self.tree.remaining() < slots_needed {
            return Err(PoolError::TreeFull {
                capacity: self.tree.capacity(),
            });
        }

        // Membership proof against the pre-spend root
        let proof_root = self.tree.root();
        let merkle_proof = self
            .tree
            .path(position)
            .expect("recorded note has a leaf in the tree");

        let public = SpendPublicInputs {
            nullifier,
            root: proof_root,
        };
        let witness = SpendWitness {
            value,
            secret: spent_note.secret,
            salt: spent_note.salt,
            path: merkle_proof.clone(),
        };
        let spend_proof = self.prover.prove(&witness, &public);

        // All checks passed; apply
        self.nullifiers.insert(nullifier)?;
        info!("published nullifier {nullifier}");

        let change_commitment = if change > 0 {
            let change_note = ConfidentialNote::create(change, owner_secret)?;
            let commitment = change_note.commitment(self.hasher.as_ref());
            let (pos, _) = self.tree.insert(&commitment)?;
            self.notes.insert(
                commitment,
                PoolNote {
                    note: change_note,
                    position: pos,
                },
            );
            Some(commitment)
        } else {
            None
        };

        let recipient_secret = derive_recipient_secret(to_address);
        let recipient_note = ConfidentialNote::create(amount, recipient_secret)?;
        let recipient_commitment = recipient_note.commitment(self.hasher.as_ref());
        let (pos, _) = self.tree.insert(&recipient_commitment)?;
        self.notes.insert(
            recipient_commitment,
            PoolNote {
                note: recipient_note,
                position: pos,
            },
        );

        let new_root = self.tree.root();
        self.root_history.push(new_root);

        info!("transferred {amount} units, change {change}");
        debug!("recipient commitment {recipient_commitment}");

        Ok(TransferReceipt {
            amount,
            nullifier,
            recipient_commitment,
            change_commitment,
            merkle_proof,
            proof_root,
            spend_proof,
            new_root,
        })
    }

    /// Withdraw a note's full value out of the pool
    pub fn withdraw(
        &mut self,
        commitment: Commitment,
        owner_secret: [u8; 32],
        recipient: &str,
    ) -> Result<WithdrawReceipt, PoolError> {
        let entry = self
            .notes
            .get(&commitment)
            .ok_or(PoolError::NoteNotFound(commitment))?;
        let note = entry.note.clone();
        let position = entry.position;

        let nullifier = note.nullifier(self.hasher.as_ref());
        if self.nullifiers.contains(&nullifier) {
            return Err(PoolError::AlreadySpent(nullifier));
        }

        // Ownership check, distinct from not-found so callers can tell
        // "doesn't exist" from "exists but isn't yours"
        if note.secret != owner_secret {
            return Err(PoolError::InvalidSecret(commitment));
        }

        let proof_root = self.tree.root();
        let merkle_proof = self
            .tree
            .path(position)
            .expect("recorded note has a leaf in the tree");

        let public = SpendPublicInputs {
            nullifier,
            root: proof_root,
        };
        let witness = SpendWitness {
            value: note.value.as_u64(),
            secret: note.secret,
            salt: note.salt,
            path: merkle_proof.clone(),
        };
        let spend_proof = self.prover.prove(&witness, &public);

        // Publishing the nullifier is what removes the note from the
        // spendable set; the note object is retained for audit
        self.nullifiers.insert(nullifier)?;

        let amount = note.value.as_u64();
        info!("withdrew {amount} units to {recipient}, nullifier {nullifier} published");

        Ok(WithdrawReceipt {
            amount,
            recipient: recipient.to_string(),
            nullifier,
            merkle_proof,
            proof_root,
            spend_proof,
        })
    }

    /// Spendable balance for a secret: unspent notes whose stored secret
    /// matches. Pure read.
    pub fn balance_of(&self, secret: &[u8; 32]) -> BalanceView {
        let hasher = self.hasher.as_ref();
        let mut commitments: Vec<Commitment> = self
            .notes
            .iter()
            .filter(|(_, entry)| &entry.note.secret == secret)
            .filter(|(_, entry)| !self.nullifiers.contains(&entry.note.nullifier(hasher)))
            .map(|(commitment, _)| *commitment)
            .collect();
        commitments.sort_by_key(|c| self.notes[c].position);

        let total = commitments
            .iter()
            .map(|c| u128::from(self.notes[c].note.value.as_u64()))
            .sum();

        BalanceView {
            total,
            note_count: commitments.len(),
            commitments,
        }
    }

    /// Check pool consistency; structural problems are reported, not thrown
    pub fn verify_integrity(&self) -> IntegrityReport {
        let hasher = self.hasher.as_ref();
        let mut issues = Vec::new();

        for (commitment, entry) in &self.notes {
            let recomputed = entry.note.commitment(hasher);
            if recomputed != *commitment {
                issues.push(format!(
                    "commitment mismatch for note {commitment}: recomputed {recomputed}"
                ));
            }
            match self.tree.get(entry.position) {
                Some(leaf) if leaf == *commitment => {}
                Some(leaf) => issues.push(format!(
                    "tree leaf {} holds {leaf}, expected {commitment}",
                    entry.position
                )),
                None => issues.push(format!(
                    "no tree leaf at index {} for note {commitment}",
                    entry.position
                )),
            }
        }

        if !self.nullifiers.is_consistent() {
            issues.push("duplicate nullifiers recorded".to_string());
        }

        // Cross-check the incrementally maintained root against one
        // recomputed from the full leaf sequence
        let mut rebuilt = CommitmentTree::new(self.tree.depth(), Arc::clone(&self.hasher));
        for leaf in self.tree.leaves() {
            if rebuilt.insert(&leaf).is_err() {
                issues.push("leaf sequence exceeds tree capacity".to_string());
                break;
            }
        }
        if rebuilt.root() != self.tree.root() {
            issues.push(format!(
                "incremental root 0x{} does not match recomputed root 0x{}",
                hex::encode(self.tree.root()),
                hex::encode(rebuilt.root())
            ));
        }

        issues.sort();

        IntegrityReport {
            valid: issues.is_empty(),
            note_count: self.notes.len(),
            nullifier_count: self.nullifiers.len(),
            root: self.tree.root(),
            issues,
        }
    }

    /// Verify a membership proof, accepting the current or any recent root
    pub fn verify_membership(
        &self,
        commitment: &Commitment,
        path: &MerklePath,
        claimed_root: &[u8; 32],
    ) -> bool {
        if !self.root_history.is_valid(claimed_root) {
            return false;
        }
        path.verify(commitment, claimed_root, self.hasher.as_ref())
    }

    /// Verify a spend proof against its public inputs
    ///
    /// Checks the opaque proof and that the claimed root is current or
    /// recent; spent-status is enforced at apply time, not here.
    pub fn verify_spend(&self, proof: &SpendProof, public: &SpendPublicInputs) -> bool {
        self.root_history.is_valid(&public.root) && self.prover.verify(proof, public)
    }

    /// Current tree root
    pub fn root(&self) -> [u8; 32] {
        self.tree.root()
    }

    /// Whether a root is current or within the recent-root window
    pub fn is_recent_root(&self, root: &[u8; 32]) -> bool {
        self.root_history.is_valid(root)
    }

    /// Membership proof for a commitment, re-derived against current state
    pub fn proof_for(&self, commitment: &Commitment) -> Option<MerklePath> {
        let position = self.notes.get(commitment)?.position;
        self.tree.path(position)
    }

    /// Number of leaves inserted so far
    pub fn tree_size(&self) -> u64 {
        self.tree.next_index()
    }

    pub fn contains_note(&self, commitment: &Commitment) -> bool {
        self.notes.contains_key(commitment)
    }

    pub fn is_spent(&self, nullifier: &Nullifier) -> bool {
        self.nullifiers.contains(nullifier)
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn nullifier_count(&self) -> usize {
        self.nullifiers.len()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tree_depth(&self) -> usize {
        self.tree.depth()
    }
}
