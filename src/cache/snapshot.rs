//! cache::snapshot
//!
//! Immutable, completed graph snapshots.
//!
//! A snapshot is sealed once by the pass that built it and never mutated;
//! readers hold an `Arc` to it while the next pass builds its successor
//! into a fresh structure.

use std::collections::HashMap;
use std::ops::Range;

use crate::core::types::{CommitId, Fingerprint};

use super::record::CommitRecord;
use super::store::{GraphNode, NodeStore};

/// A completed, lane-annotated commit graph.
#[derive(Debug)]
pub struct GraphSnapshot {
    /// Nodes in display order; index == position.
    nodes: Vec<GraphNode>,
    /// Identity -> position.
    index: HashMap<CommitId, usize>,
    /// Generation of the pass that produced this snapshot.
    generation: u64,
    /// Fingerprint of the raw log this snapshot was built from.
    fingerprint: Fingerprint,
    /// Malformed or truncated records dropped during parsing.
    skipped_records: usize,
}

impl GraphSnapshot {
    /// The snapshot visible before any pass completes.
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            generation: 0,
            fingerprint: Fingerprint::empty(),
            skipped_records: 0,
        }
    }

    /// Seal a finished store into an immutable snapshot.
    ///
    /// The store must have positions and lanes assigned; the cache does
    /// this as part of a refresh. Exposed for embedders composing their
    /// own passes.
    pub fn seal(
        store: NodeStore,
        generation: u64,
        fingerprint: Fingerprint,
        skipped_records: usize,
    ) -> Self {
        let mut nodes = store.into_nodes();
        nodes.sort_by_key(|n| n.position);

        let index = nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (node.record.id().clone(), position))
            .collect();

        Self {
            nodes,
            index,
            generation,
            fingerprint,
            skipped_records,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the snapshot holds no rows.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Generation of the pass that produced this snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fingerprint of the raw log behind this snapshot.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Records skipped during the producing parse.
    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }

    /// Node at a display position.
    pub fn node_at(&self, position: usize) -> Option<&GraphNode> {
        self.nodes.get(position)
    }

    /// Commit record at a display position.
    pub fn record_at(&self, position: usize) -> Option<&CommitRecord> {
        self.nodes.get(position).map(|n| &n.record)
    }

    /// O(1) node lookup by identity.
    pub fn lookup(&self, id: &CommitId) -> Option<&GraphNode> {
        self.index.get(id).map(|&position| &self.nodes[position])
    }

    /// All nodes in display order.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Iterate nodes in display order.
    pub fn iter(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    /// The working-tree sentinel, when present. Always at position 0.
    pub fn working_tree(&self) -> Option<&GraphNode> {
        self.nodes.first().filter(|n| n.record.is_working_tree())
    }

    /// Widest lane table across all rows.
    pub fn max_lane_width(&self) -> usize {
        self.nodes.iter().map(|n| n.lanes.len()).max().unwrap_or(0)
    }

    /// Positions of rows whose record matches a case-insensitive
    /// substring search.
    pub fn find(&self, text: &str) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.record.contains(text))
            .map(|(position, _)| position)
            .collect()
    }
}

/// Notification emitted once per completed pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphChange {
    /// Generation of the newly visible snapshot.
    pub generation: u64,
    /// Display-row ranges that differ from the previous snapshot, so a
    /// renderer can redraw incrementally.
    pub rows: Vec<Range<usize>>,
}

/// Compute the row ranges that differ between two snapshots.
///
/// A row differs when the occupant identity, lane markers, or active lane
/// at that position changed. A length change contributes a trailing range.
pub fn changed_ranges(old: &GraphSnapshot, new: &GraphSnapshot) -> Vec<Range<usize>> {
    let common = old.len().min(new.len());
    let mut ranges: Vec<Range<usize>> = Vec::new();
    let mut open: Option<usize> = None;

    for position in 0..common {
        let a = &old.nodes[position];
        let b = &new.nodes[position];
        let differs = a.record.id() != b.record.id()
            || a.lanes != b.lanes
            || a.active_lane != b.active_lane;

        if differs {
            open.get_or_insert(position);
        } else if let Some(start) = open.take() {
            ranges.push(start..position);
        }
    }
    if let Some(start) = open {
        ranges.push(start..common);
    }

    if old.len() != new.len() {
        let tail = common..old.len().max(new.len());
        match ranges.last_mut() {
            Some(last) if last.end == tail.start => last.end = tail.end,
            _ => ranges.push(tail),
        }
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::lanes::assign_lanes;
    use chrono::{TimeZone, Utc};

    fn id(c: char) -> CommitId {
        CommitId::new(c.to_string().repeat(40)).unwrap()
    }

    fn record(c: char, parents: &[char], secs: i64) -> CommitRecord {
        CommitRecord::new(
            id(c),
            parents.iter().map(|p| id(*p)).collect(),
            "c".into(),
            "a".into(),
            Utc.timestamp_opt(secs, 0).unwrap(),
            format!("commit {c}"),
            String::new(),
        )
    }

    fn snapshot_of(records: Vec<CommitRecord>, generation: u64) -> GraphSnapshot {
        let mut store = NodeStore::new();
        store.ingest(records);
        store.rebuild_adjacency();
        let order = store.display_order();
        store.assign_positions(&order);
        assign_lanes(&mut store, &order);
        GraphSnapshot::seal(store, generation, Fingerprint::empty(), 0)
    }

    fn linear() -> GraphSnapshot {
        snapshot_of(
            vec![
                record('3', &['2'], 300),
                record('2', &['1'], 200),
                record('1', &[], 100),
            ],
            1,
        )
    }

    #[test]
    fn empty_snapshot() {
        let snap = GraphSnapshot::empty();
        assert!(snap.is_empty());
        assert_eq!(snap.generation(), 0);
        assert!(snap.node_at(0).is_none());
        assert_eq!(snap.max_lane_width(), 0);
    }

    #[test]
    fn nodes_ordered_by_position() {
        let snap = linear();
        assert_eq!(snap.len(), 3);
        for (position, node) in snap.iter().enumerate() {
            assert_eq!(node.position, position);
        }
        assert_eq!(snap.record_at(0).unwrap().id(), &id('3'));
        assert_eq!(snap.record_at(2).unwrap().id(), &id('1'));
    }

    #[test]
    fn lookup_by_identity() {
        let snap = linear();
        assert_eq!(snap.lookup(&id('2')).unwrap().position, 1);
        assert!(snap.lookup(&id('9')).is_none());
    }

    #[test]
    fn working_tree_detection() {
        let snap = linear();
        assert!(snap.working_tree().is_none());

        let with_wip = {
            let mut records = vec![
                record('3', &['2'], 300),
                record('2', &['1'], 200),
                record('1', &[], 100),
            ];
            records.push(CommitRecord::working_tree(Some(id('3'))));
            snapshot_of(records, 2)
        };
        let wip = with_wip.working_tree().unwrap();
        assert_eq!(wip.position, 0);
    }

    #[test]
    fn find_matches_positions() {
        let snap = linear();
        assert_eq!(snap.find("commit 2"), vec![1]);
        assert!(snap.find("absent").is_empty());
    }

    mod changes {
        use super::*;

        #[test]
        fn identical_snapshots_no_ranges() {
            let a = linear();
            let b = linear();
            assert!(changed_ranges(&a, &b).is_empty());
        }

        #[test]
        fn prepended_commit_changes_all_rows() {
            let old = linear();
            let new = snapshot_of(
                vec![
                    record('4', &['3'], 400),
                    record('3', &['2'], 300),
                    record('2', &['1'], 200),
                    record('1', &[], 100),
                ],
                2,
            );
            // Every position's occupant shifted, plus the added tail
            assert_eq!(changed_ranges(&old, &new), vec![0..4]);
        }

        #[test]
        fn empty_to_populated_is_one_range() {
            let old = GraphSnapshot::empty();
            let new = linear();
            assert_eq!(changed_ranges(&old, &new), vec![0..3]);
        }

        #[test]
        fn interior_difference_is_isolated() {
            let old = snapshot_of(
                vec![
                    record('3', &['2'], 300),
                    record('2', &['1'], 200),
                    record('1', &[], 100),
                ],
                1,
            );
            // Same shape, but position 0 carries a different id
            let new = snapshot_of(
                vec![
                    record('4', &['2'], 300),
                    record('2', &['1'], 200),
                    record('1', &[], 100),
                ],
                2,
            );
            assert_eq!(changed_ranges(&old, &new), vec![0..1]);
        }
    }
}
