//! cache::store
//!
//! Commit node storage and derived adjacency.
//!
//! # Architecture
//!
//! Nodes live in a dense arena (`Vec<GraphNode>`) addressed through an
//! identity lookup table. Child back-references are identity lists, never
//! pointers: a node never owns its children or parents, only their
//! identities, which sidesteps reference-cycle lifetime problems entirely.
//!
//! # Invariants
//!
//! - The lookup table and arena always agree (rebuilt together)
//! - `children` is re-derived in one linear pass after ingest, never
//!   hand-maintained incrementally
//! - Display positions are a permutation of `[0, N)`: every child precedes
//!   its parents, ties broken by commit date descending then insertion
//!   order, working-tree sentinel first

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use super::lanes::Lane;
use super::record::CommitRecord;
use crate::core::types::CommitId;

/// A commit record plus the state derived for it by the graph passes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    /// The underlying immutable record.
    pub record: CommitRecord,
    /// Index in the current display ordering. Reassigned every pass;
    /// not a stable identity.
    pub position: usize,
    /// Identities whose parent list contains this node's id. Derived.
    pub children: Vec<CommitId>,
    /// Lane markers for this node's row.
    pub lanes: Vec<Lane>,
    /// The lane this node's commit point sits on.
    pub active_lane: usize,
    /// Set when a referenced parent is absent from the fetch window
    /// (shallow or truncated history).
    pub parent_missing: bool,
}

impl GraphNode {
    fn new(record: CommitRecord) -> Self {
        Self {
            record,
            position: 0,
            children: Vec::new(),
            lanes: Vec::new(),
            active_lane: 0,
            parent_missing: false,
        }
    }

}

/// Heap key for display ordering: working-tree sentinel first, then
/// commit date descending, then insertion order.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct Ready {
    sentinel: bool,
    date: i64,
    slot: Reverse<usize>,
}

/// Owns all graph nodes for one repository snapshot.
#[derive(Debug, Default)]
pub struct NodeStore {
    nodes: Vec<GraphNode>,
    index: HashMap<CommitId, usize>,
}

impl NodeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store sized for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether an identity is present.
    pub fn contains(&self, id: &CommitId) -> bool {
        self.index.contains_key(id)
    }

    /// O(1) node lookup by identity.
    pub fn lookup(&self, id: &CommitId) -> Option<&GraphNode> {
        self.index.get(id).map(|&slot| &self.nodes[slot])
    }

    /// Arena slot of an identity.
    pub fn slot_of(&self, id: &CommitId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Node at an arena slot.
    pub fn node(&self, slot: usize) -> &GraphNode {
        &self.nodes[slot]
    }

    /// Mutable node at an arena slot.
    pub(crate) fn node_mut(&mut self, slot: usize) -> &mut GraphNode {
        &mut self.nodes[slot]
    }

    /// Iterate nodes in arena (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    /// Consume the store, yielding nodes in arena order.
    pub(crate) fn into_nodes(self) -> Vec<GraphNode> {
        self.nodes
    }

    /// Insert or overwrite records keyed by identity.
    ///
    /// A duplicate identity with a different parent set is a forced-push
    /// replacement: logged, second occurrence wins. Call
    /// [`NodeStore::rebuild_adjacency`] after the last `ingest`.
    pub fn ingest(&mut self, records: impl IntoIterator<Item = CommitRecord>) {
        for record in records {
            match self.index.get(record.id()) {
                Some(&slot) => {
                    let existing = &self.nodes[slot];
                    if existing.record.parent_ids() != record.parent_ids() {
                        warn!(
                            id = %record.id().short(12),
                            "duplicate identity with different parents; keeping newest"
                        );
                    }
                    self.nodes[slot] = GraphNode::new(record);
                }
                None => {
                    let slot = self.nodes.len();
                    self.index.insert(record.id().clone(), slot);
                    self.nodes.push(GraphNode::new(record));
                }
            }
        }
    }

    /// Recompute every node's `children` and `parent_missing` in one
    /// linear pass over the arena.
    ///
    /// Always re-derived from the parent lists; never patched in place.
    pub fn rebuild_adjacency(&mut self) {
        for node in &mut self.nodes {
            node.children.clear();
            node.parent_missing = false;
        }

        for slot in 0..self.nodes.len() {
            let id = self.nodes[slot].record.id().clone();
            let parents: Vec<CommitId> = self.nodes[slot].record.parent_ids().to_vec();
            for parent in parents {
                match self.index.get(&parent) {
                    Some(&parent_slot) => self.nodes[parent_slot].children.push(id.clone()),
                    None => self.nodes[slot].parent_missing = true,
                }
            }
        }
    }

    /// Drop nodes whose identity is absent from a fresh full fetch.
    ///
    /// Covers rebase and history rewrites. Adjacency is rebuilt, so any
    /// survivor that referenced a dropped parent comes out flagged
    /// `parent_missing` rather than silently dangling.
    ///
    /// Returns the number of nodes removed.
    pub fn remove_missing(&mut self, current: &HashSet<CommitId>) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|n| current.contains(n.record.id()));

        self.index.clear();
        for (slot, node) in self.nodes.iter().enumerate() {
            self.index.insert(node.record.id().clone(), slot);
        }
        self.rebuild_adjacency();

        before - self.nodes.len()
    }

    /// Compute the display ordering as a sequence of arena slots.
    ///
    /// Kahn's algorithm over the child-before-parent relation: a node is
    /// ready once every child in the store has been placed. Ties are
    /// deterministic (sentinel, then commit date descending, then
    /// insertion order), so identical input always yields identical
    /// positions.
    pub fn display_order(&self) -> Vec<usize> {
        let len = self.nodes.len();

        // remaining[slot] = children of slot still unplaced
        let mut remaining = vec![0usize; len];
        for node in &self.nodes {
            for parent in node.record.parent_ids() {
                if let Some(&parent_slot) = self.index.get(parent) {
                    remaining[parent_slot] += 1;
                }
            }
        }

        let mut heap = BinaryHeap::new();
        for (slot, count) in remaining.iter().enumerate() {
            if *count == 0 {
                heap.push(self.ready_key(slot));
            }
        }

        let mut order = Vec::with_capacity(len);
        let mut placed = vec![false; len];
        while let Some(ready) = heap.pop() {
            let slot = ready.slot.0;
            order.push(slot);
            placed[slot] = true;
            for parent in self.nodes[slot].record.parent_ids() {
                if let Some(&parent_slot) = self.index.get(parent) {
                    remaining[parent_slot] -= 1;
                    if remaining[parent_slot] == 0 {
                        heap.push(self.ready_key(parent_slot));
                    }
                }
            }
        }

        // A parent cycle cannot occur in real history; if malformed input
        // produces one, the stragglers keep insertion order.
        if order.len() < len {
            warn!(
                unplaced = len - order.len(),
                "cycle in parent references; appending in insertion order"
            );
            for (slot, was_placed) in placed.iter().enumerate() {
                if !was_placed {
                    order.push(slot);
                }
            }
        }

        order
    }

    fn ready_key(&self, slot: usize) -> Ready {
        let record = &self.nodes[slot].record;
        Ready {
            sentinel: record.is_working_tree(),
            date: record.commit_date().timestamp(),
            slot: Reverse(slot),
        }
    }

    /// Apply a display ordering produced by [`NodeStore::display_order`],
    /// writing each node's `position`.
    pub fn assign_positions(&mut self, order: &[usize]) {
        for (position, &slot) in order.iter().enumerate() {
            self.nodes[slot].position = position;
        }
    }
}
