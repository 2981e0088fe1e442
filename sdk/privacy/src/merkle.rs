//! Commitment Tree
//!
//! Fixed-depth, append-only Merkle accumulator over note commitments.
//!
//! ```text
//!                    Root
//!                   /    \
//!                 H01    H23
//!                /  \   /   \
//!               H0  H1 H2   H3
//!               |   |   |    |
//!              C0  C1  C2   C3  (Note Commitments)
//! ```
//!
//! Numeric semantics are part of the externally verifiable scheme and are
//! fixed here: unpopulated nodes read as the field element 0 at every level
//! (so the root of the empty tree is 0), and a node at an even index is the
//! left child, hashed as `H(current, sibling)`; at an odd index it is the
//! right child, hashed as `H(sibling, current)`.
//!
//! Authentication paths are re-derived against the current tree state, so a
//! path is only guaranteed to verify against the root at the moment it was
//! produced. Callers that tolerate slightly stale proofs keep a bounded
//! [`RootHistory`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commitment::Commitment;
use crate::hash::FieldHash;

/// Deepest supported tree (2^32 leaves)
pub const MAX_TREE_DEPTH: usize = 32;

/// Value of every unpopulated node
pub const EMPTY_NODE: [u8; 32] = [0u8; 32];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("commitment tree is full (capacity {capacity})")]
    Full { capacity: u64 },
}

/// A Merkle path proving inclusion of a commitment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    /// Sibling hashes from leaf to root
    #[serde(with = "hex_seq")]
    pub siblings: Vec<[u8; 32]>,
    /// Position bits (false = current node is the left child)
    pub path_bits: Vec<bool>,
    /// The leaf position
    pub position: u64,
}

impl MerklePath {
    /// Verify that this path proves inclusion of `leaf` under `root`
    ///
    /// Pure fold over the siblings; needs no tree state.
    pub fn verify(&self, leaf: &Commitment, root: &[u8; 32], hasher: &dyn FieldHash) -> bool {
        &self.compute_root(leaf, hasher) == root
    }

    /// Recompute the root this path commits to
    pub fn compute_root(&self, leaf: &Commitment, hasher: &dyn FieldHash) -> [u8; 32] {
        let mut current = leaf.0;

        for (sibling, is_right) in self.siblings.iter().zip(self.path_bits.iter()) {
            current = if *is_right {
                hasher.hash_pair(sibling, &current)
            } else {
                hasher.hash_pair(&current, sibling)
            };
        }

        current
    }
}

/// Append-only Merkle tree of note commitments
///
/// Sparse: only populated nodes are stored, keyed by (level, index).
pub struct CommitmentTree {
    depth: usize,
    /// Populated nodes: (level, index) -> hash; level 0 holds the leaves
    nodes: HashMap<(usize, u64), [u8; 32]>,
    /// Next free leaf position, monotonically increasing, never reused
    next_index: u64,
    /// Current root, maintained incrementally
    root: [u8; 32],
    hasher: Arc<dyn FieldHash>,
}

impl CommitmentTree {
    /// Create an empty tree of the given depth (capacity 2^depth)
    pub fn new(depth: usize, hasher: Arc<dyn FieldHash>) -> Self {
        assert!(
            depth >= 1 && depth <= MAX_TREE_DEPTH,
            "tree depth must be in 1..={MAX_TREE_DEPTH}"
        );
        Self {
            depth,
            nodes: HashMap::new(),
            next_index: 0,
            root: EMPTY_NODE,
            hasher,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    pub fn remaining(&self) -> u64 {
        self.capacity() - self.next_index
    }

    /// Get current root
    pub fn root(&self) -> [u8; 32] {
        self.root
    }

    /// Next free leaf position
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Append a commitment; returns its index and the authentication path
    /// as of immediately after this insertion
    pub fn insert(&mut self, commitment: &Commitment) -> Result<(u64, MerklePath), TreeError> {
        if self.next_index == self.capacity() {
            return Err(TreeError::Full {
                capacity: self.capacity(),
            });
        }

        let position = self.next_index;
        self.nodes.insert((0, position), commitment.0);

        // Update the path from the new leaf to the root
        let mut current_index = position;
        let mut current_hash = commitment.0;

        for level in 0..self.depth {
            let is_right = current_index & 1 == 1;
            let sibling = self.node(level, current_index ^ 1);

            current_hash = if is_right {
                self.hasher.hash_pair(&sibling, &current_hash)
            } else {
                self.hasher.hash_pair(&current_hash, &sibling)
            };

            current_index /= 2;
            self.nodes.insert((level + 1, current_index), current_hash);
        }

        self.root = current_hash;
        self.next_index += 1;

        let path = self.path(position).expect("freshly inserted leaf has a path");
        Ok((position, path))
    }

    /// Authentication path for a previously inserted leaf, re-derived
    /// against the current tree state
    pub fn path(&self, position: u64) -> Option<MerklePath> {
        if position >= self.next_index {
            return None;
        }

        let mut siblings = Vec::with_capacity(self.depth);
        let mut path_bits = Vec::with_capacity(self.depth);
        let mut current_index = position;

        for level in 0..self.depth {
            path_bits.push(current_index & 1 == 1);
            siblings.push(self.node(level, current_index ^ 1));
            current_index /= 2;
        }

        Some(MerklePath {
            siblings,
            path_bits,
            position,
        })
    }

    /// Get the commitment at a position
    pub fn get(&self, position: u64) -> Option<Commitment> {
        self.nodes.get(&(0, position)).map(|h| Commitment(*h))
    }

    /// All inserted leaves in insertion order
    pub fn leaves(&self) -> Vec<Commitment> {
        (0..self.next_index)
            .map(|i| Commitment(self.node(0, i)))
            .collect()
    }

    pub fn hasher(&self) -> &Arc<dyn FieldHash> {
        &self.hasher
    }

    fn node(&self, level: usize, index: u64) -> [u8; 32] {
        self.nodes.get(&(level, index)).copied().unwrap_or(EMPTY_NODE)
    }
}

/// Root history for the commitment tree
///
/// Stores recent roots so verifiers can accept proofs generated against a
/// slightly stale state.
#[derive(Debug, Clone, Default)]
pub struct RootHistory {
    /// Recent roots (most recent first)
    roots: Vec<[u8; 32]>,
    /// Maximum history size
    max_size: usize,
}

impl RootHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            roots: Vec::new(),
            max_size,
        }
    }

    /// Add a new root
    pub fn push(&mut self, root: [u8; 32]) {
        self.roots.insert(0, root);
        if self.roots.len() > self.max_size {
            self.roots.pop();
        }
    }

    /// Check if a root is current or recent
    pub fn is_valid(&self, root: &[u8; 32]) -> bool {
        self.roots.contains(root)
    }

    /// Get the most recent root
    pub fn current(&self) -> Option<&[u8; 32]> {
        self.roots.first()
    }
}

/// Serialize `Vec<[u8; 32]>` as fixed-width hex strings
mod hex_seq {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[[u8; 32]], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(values.iter().map(hex::encode))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<[u8; 32]>, D::Error> {
        let strings = Vec::<String>::deserialize(d)?;
        strings
            .into_iter()
            .map(|s| {
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(&s, &mut bytes).map_err(D::Error::custom)?;
                Ok(bytes)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{PoseidonHasher, Sha256Hasher};

    fn tree(depth: usize) -> CommitmentTree {
        CommitmentTree::new(depth, Arc::new(PoseidonHasher::new()))
    }

    #[test]
    fn test_empty_tree() {
        let t = tree(4);
        assert_eq!(t.root(), EMPTY_NODE);
        assert_eq!(t.next_index(), 0);
        assert_eq!(t.capacity(), 16);
        assert_eq!(t.remaining(), 16);
    }

    #[test]
    fn test_insert_and_verify_at_insertion_time() {
        let mut t = tree(4);
        let hasher = PoseidonHasher::new();

        for i in 1..=5u8 {
            let c = Commitment([i; 32]);
            let (index, path) = t.insert(&c).unwrap();
            assert_eq!(index, u64::from(i - 1));
            assert!(
                path.verify(&c, &t.root(), &hasher),
                "path at insertion time must verify against the fresh root"
            );
        }
    }

    #[test]
    fn test_zero_sibling_fold_matches_root() {
        // Depth 2, single leaf: root = H(H(c, 0), 0)
        let hasher = Sha256Hasher;
        let mut t = CommitmentTree::new(2, Arc::new(Sha256Hasher));
        let c = Commitment([9u8; 32]);

        t.insert(&c).unwrap();

        let level1 = hasher.hash_pair(&c.0, &EMPTY_NODE);
        let expected = hasher.hash_pair(&level1, &EMPTY_NODE);
        assert_eq!(t.root(), expected);
    }

    #[test]
    fn test_root_changes_per_insert() {
        let mut t = tree(4);
        let root0 = t.root();

        t.insert(&Commitment([1u8; 32])).unwrap();
        let root1 = t.root();
        assert_ne!(root0, root1);

        t.insert(&Commitment([2u8; 32])).unwrap();
        assert_ne!(root1, t.root());
    }

    #[test]
    fn test_append_only_older_leaves_still_provable() {
        let mut t = tree(4);
        let hasher = PoseidonHasher::new();

        let c0 = Commitment([1u8; 32]);
        t.insert(&c0).unwrap();

        for i in 2..=8u8 {
            t.insert(&Commitment([i; 32])).unwrap();
        }

        // Re-derived path for leaf 0 verifies against the current root
        let path = t.path(0).unwrap();
        assert!(path.verify(&c0, &t.root(), &hasher));
    }

    #[test]
    fn test_paths_go_stale_as_tree_grows() {
        let mut t = tree(4);
        let hasher = PoseidonHasher::new();

        let c0 = Commitment([1u8; 32]);
        let (_, old_path) = t.insert(&c0).unwrap();
        let old_root = t.root();

        t.insert(&Commitment([2u8; 32])).unwrap();

        assert!(!old_path.verify(&c0, &t.root(), &hasher));
        assert!(old_path.verify(&c0, &old_root, &hasher));
    }

    #[test]
    fn test_wrong_leaf_rejected() {
        let mut t = tree(4);
        let hasher = PoseidonHasher::new();

        let (_, path) = t.insert(&Commitment([1u8; 32])).unwrap();
        assert!(!path.verify(&Commitment([99u8; 32]), &t.root(), &hasher));
    }

    #[test]
    fn test_tree_exhaustion() {
        let mut t = tree(2);

        for i in 1..=4u8 {
            t.insert(&Commitment([i; 32])).unwrap();
        }

        assert_eq!(t.remaining(), 0);
        assert_eq!(
            t.insert(&Commitment([5u8; 32])),
            Err(TreeError::Full { capacity: 4 })
        );
        // A failed insert changes nothing
        assert_eq!(t.next_index(), 4);
    }

    #[test]
    fn test_path_unknown_index() {
        let mut t = tree(4);
        assert!(t.path(0).is_none());

        t.insert(&Commitment([1u8; 32])).unwrap();
        assert!(t.path(0).is_some());
        assert!(t.path(1).is_none());
    }

    #[test]
    fn test_leaves_in_insertion_order() {
        let mut t = tree(3);
        let commitments: Vec<_> = (1..=3u8).map(|i| Commitment([i; 32])).collect();

        for c in &commitments {
            t.insert(c).unwrap();
        }

        assert_eq!(t.leaves(), commitments);
        assert_eq!(t.get(1), Some(commitments[1]));
        assert_eq!(t.get(3), None);
    }

    #[test]
    fn test_merkle_path_serde_round_trip() {
        let mut t = tree(3);
        let (_, path) = t.insert(&Commitment([7u8; 32])).unwrap();

        let json = serde_json::to_string(&path).unwrap();
        let back: MerklePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn test_root_history() {
        let mut history = RootHistory::new(2);

        let r1 = [1u8; 32];
        let r2 = [2u8; 32];
        let r3 = [3u8; 32];

        history.push(r1);
        history.push(r2);
        history.push(r3);

        // Bounded: oldest root evicted
        assert!(!history.is_valid(&r1));
        assert!(history.is_valid(&r2));
        assert!(history.is_valid(&r3));
        assert_eq!(history.current(), Some(&r3));
    }
}
