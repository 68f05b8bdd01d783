//! cache::reconcile
//!
//! Incremental lane reconciliation against a previous snapshot.
//!
//! # Approach
//!
//! Lane state at a row is a pure function of the lane table entering it,
//! the row's identity, and its parents. New or rewritten history disturbs
//! the newest rows; older rows whose id sequence survives unchanged can
//! keep their previous lanes verbatim once the recomputed lane table
//! converges with the table the previous pass had at the same row. The
//! entering table of any old row is recovered from its stored lane
//! markers, so no side structure is needed.
//!
//! When the tables never converge (divergent history, reordered suffix),
//! the pass simply runs to the end: a full re-run. Correctness over
//! micro-optimization.

use std::collections::HashSet;

use tracing::debug;

use super::lanes::{entering_table, LaneAssigner};
use super::snapshot::GraphSnapshot;
use super::store::NodeStore;
use crate::core::types::CommitId;

/// Classification of an incoming identity against the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Same id, same parents as before.
    Unchanged,
    /// Id not previously seen.
    New,
    /// Id previously seen with a different parent set: a forced update.
    Rewritten,
}

/// Classify one incoming record against the previous snapshot.
pub fn classify(prev: &GraphSnapshot, id: &CommitId, parents: &[CommitId]) -> Classification {
    match prev.lookup(id) {
        None => Classification::New,
        Some(node) if node.record.parent_ids() == parents => Classification::Unchanged,
        Some(_) => Classification::Rewritten,
    }
}

/// Statistics from one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Identities not present in the previous snapshot.
    pub new: usize,
    /// Identities whose parent set changed (forced push).
    pub rewritten: usize,
    /// Previous identities absent from the new fetch.
    pub removed: usize,
    /// Rows whose lanes were copied from the previous snapshot instead
    /// of recomputed. Zero means a full re-run.
    pub preserved_rows: usize,
}

/// Assign lanes to a freshly built store, reusing the previous snapshot's
/// work where the graphs agree.
///
/// The store must have adjacency and positions assigned. Returns the
/// classification and preservation statistics for the pass.
pub fn relane(prev: &GraphSnapshot, store: &mut NodeStore) -> ReconcileStats {
    let mut stats = count_classes(prev, store);

    let new_len = store.len();
    let old_len = prev.len();

    let mut by_position = vec![0usize; new_len];
    for slot in 0..new_len {
        by_position[store.node(slot).position] = slot;
    }

    // Longest tail on which old and new agree (same ids, same parents, in
    // the same relative order). The sentinel is rebuilt every pass and
    // never preserved.
    let mut aligned = 0;
    while aligned < new_len.min(old_len) {
        let new_node = store.node(by_position[new_len - 1 - aligned]);
        let old_node = prev.node_at(old_len - 1 - aligned).expect("within bounds");
        let matches = !new_node.record.is_working_tree()
            && new_node.record.id() == old_node.record.id()
            && new_node.record.parent_ids() == old_node.record.parent_ids();
        if !matches {
            break;
        }
        aligned += 1;
    }
    let align_start = new_len - aligned;

    let mut assigner = LaneAssigner::new();
    for position in 0..new_len {
        if position >= align_start {
            let old_position = old_len - (new_len - position);
            let old_entry = entering_table(
                &prev
                    .node_at(old_position)
                    .expect("aligned row exists")
                    .lanes,
            );
            if old_entry == assigner.table() {
                copy_preserved(prev, store, &by_position, position, old_position);
                stats.preserved_rows = new_len - position;
                debug!(
                    preserved = stats.preserved_rows,
                    recomputed = position,
                    "lane tables converged; preserving older rows"
                );
                return stats;
            }
        }

        let slot = by_position[position];
        let id = store.node(slot).record.id().clone();
        let parents: Vec<CommitId> = store
            .node(slot)
            .record
            .parent_ids()
            .iter()
            .filter(|p| store.contains(p))
            .cloned()
            .collect();
        let parent_refs: Vec<&CommitId> = parents.iter().collect();

        let (lanes, active) = assigner.assign_row(&id, &parent_refs);
        let node = store.node_mut(slot);
        node.lanes = lanes;
        node.active_lane = active;
    }

    debug!("lane tables never converged; full re-run");
    stats
}

/// Copy lanes of the preserved suffix verbatim from the old snapshot.
fn copy_preserved(
    prev: &GraphSnapshot,
    store: &mut NodeStore,
    by_position: &[usize],
    from: usize,
    old_from: usize,
) {
    for (offset, position) in (from..by_position.len()).enumerate() {
        let old_node = prev.node_at(old_from + offset).expect("aligned row exists");
        let node = store.node_mut(by_position[position]);
        node.lanes = old_node.lanes.clone();
        node.active_lane = old_node.active_lane;
    }
}

fn count_classes(prev: &GraphSnapshot, store: &NodeStore) -> ReconcileStats {
    let mut stats = ReconcileStats::default();

    let mut current: HashSet<&CommitId> = HashSet::with_capacity(store.len());
    for node in store.iter() {
        let record = &node.record;
        if record.is_working_tree() {
            continue;
        }
        current.insert(record.id());
        match classify(prev, record.id(), record.parent_ids()) {
            Classification::New => stats.new += 1,
            Classification::Rewritten => stats.rewritten += 1,
            Classification::Unchanged => {}
        }
    }

    stats.removed = prev
        .iter()
        .filter(|n| !n.record.is_working_tree() && !current.contains(n.record.id()))
        .count();

    stats
}
