//! cache::lanes
//!
//! Branch-lane assignment.
//!
//! # Algorithm
//!
//! A single pass over position-ordered nodes (most recent first) keeps a
//! table mapping lane index to the identity expected next on that lane.
//! Per row:
//!
//! 1. The node takes the lowest lane already tracking its id, else the
//!    lowest free index.
//! 2. A marker is recorded for every lane at the row: the commit point
//!    ([`LaneKind::Commit`], [`LaneKind::Root`] or [`LaneKind::Fork`]),
//!    collapsing duplicates ([`LaneKind::Join`]), passers-by
//!    ([`LaneKind::Through`]) and free slots ([`LaneKind::Empty`]).
//! 3. The first parent inherits the node's lane, keeping mainline
//!    vertical; each later parent reuses a lane already tracking it, else
//!    takes the lowest free index ([`LaneKind::ForkOut`]).
//! 4. Collapsed and terminated lanes are freed for reuse by later rows.
//!
//! All tie-breaks take the lowest index, so identical input yields
//! identical lanes.
//!
//! # Invariants
//!
//! - The table is local to one pass and discarded with it; concurrent
//!   passes never share lane state
//! - A lane index is claimed by at most one identity per row
//! - A freed index is the first choice of the next allocation

use serde::Serialize;

use super::store::NodeStore;
use crate::core::types::CommitId;

/// How a lane at one row connects to the row above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LaneKind {
    /// Unoccupied slot, kept so lane indices stay stable.
    Empty,
    /// Another line passes straight through.
    Through,
    /// This row's commit point; continues to a single parent.
    Commit,
    /// This row's commit point; no parents, the lane terminates here.
    Root,
    /// This row's commit point; two or more parents split from here.
    Fork,
    /// Lane opened at this row for a secondary parent of the commit.
    ForkOut,
    /// Lane that was tracking this row's id, collapsing into the commit
    /// lane because the node is a shared parent.
    Join,
}

impl LaneKind {
    /// Whether this marker is the row's own commit point.
    pub fn is_commit_point(self) -> bool {
        matches!(self, LaneKind::Commit | LaneKind::Root | LaneKind::Fork)
    }
}

/// One lane marker at one row.
///
/// `tracking` is the identity occupying the lane *entering* the row
/// (`None` for slots that were free, including the commit lane of a tip
/// and lanes opened by `ForkOut`). Keeping the entering occupant on the
/// row lets the reconciler recover the lane table at any row from a
/// snapshot alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lane {
    /// Connection marker.
    pub kind: LaneKind,
    /// Identity occupying the lane entering this row.
    pub tracking: Option<CommitId>,
}

/// Recover the lane table entering a row from its stored markers.
///
/// Trailing free slots are trimmed, matching the assigner's table shape.
pub fn entering_table(lanes: &[Lane]) -> Vec<Option<CommitId>> {
    let mut table: Vec<Option<CommitId>> = lanes.iter().map(|l| l.tracking.clone()).collect();
    while matches!(table.last(), Some(None)) {
        table.pop();
    }
    table
}

/// The per-pass lane state machine.
///
/// One assigner serves exactly one pass; it is created empty, driven one
/// row at a time, and discarded.
#[derive(Debug, Default)]
pub struct LaneAssigner {
    /// Lane index -> identity expected next on that lane.
    slots: Vec<Option<CommitId>>,
}

impl LaneAssigner {
    /// Create an assigner with an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current table: the identity each lane is waiting for.
    ///
    /// Trailing free slots are always trimmed.
    pub fn table(&self) -> &[Option<CommitId>] {
        &self.slots
    }

    /// Assign the row for `id`, whose parents present in the fetch window
    /// are `parents` (in record order). Returns the row's lane markers and
    /// the node's active lane.
    pub fn assign_row(&mut self, id: &CommitId, parents: &[&CommitId]) -> (Vec<Lane>, usize) {
        let entering: Vec<Option<CommitId>> = self.slots.clone();

        let tracked: Vec<usize> = entering
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.as_ref() == Some(id))
            .map(|(i, _)| i)
            .collect();

        let active = match tracked.first() {
            Some(&lane) => lane,
            None => self.allocate(),
        };

        let node_kind = match parents.len() {
            0 => LaneKind::Root,
            1 => LaneKind::Commit,
            _ => LaneKind::Fork,
        };

        let mut lanes = Vec::with_capacity(self.slots.len());
        for i in 0..self.slots.len() {
            let occupant = entering.get(i).cloned().flatten();
            let kind = if i == active {
                node_kind
            } else if occupant.as_ref() == Some(id) {
                LaneKind::Join
            } else if occupant.is_some() {
                LaneKind::Through
            } else {
                LaneKind::Empty
            };
            lanes.push(Lane {
                kind,
                tracking: occupant,
            });
        }

        // Duplicate lanes collapse into the commit lane and free up.
        for &lane in &tracked {
            if lane != active {
                self.slots[lane] = None;
            }
        }

        match parents.first() {
            None => {
                // Root: terminates, frees its lane immediately.
                self.slots[active] = None;
            }
            Some(first) => {
                self.slots[active] = Some((*first).clone());
                for parent in &parents[1..] {
                    if self.slots.iter().any(|s| s.as_ref() == Some(*parent)) {
                        // A lane already tracks this parent; the merge line
                        // routes there instead of widening the graph.
                        continue;
                    }
                    let lane = self.allocate();
                    self.slots[lane] = Some((*parent).clone());
                    let marker = Lane {
                        kind: LaneKind::ForkOut,
                        tracking: None,
                    };
                    if lane < lanes.len() {
                        lanes[lane] = marker;
                    } else {
                        lanes.push(marker);
                    }
                }
            }
        }

        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }

        (lanes, active)
    }

    /// Lowest free lane index, appending a new lane when none is free.
    fn allocate(&mut self) -> usize {
        match self.slots.iter().position(|s| s.is_none()) {
            Some(lane) => lane,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        }
    }
}

/// Run a full lane pass over a store whose positions are assigned.
///
/// `order` is the arena-slot sequence in display order, as produced by
/// [`NodeStore::display_order`].
pub fn assign_lanes(store: &mut NodeStore, order: &[usize]) {
    let mut assigner = LaneAssigner::new();
    for &slot in order {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::record::CommitRecord;
    use chrono::{TimeZone, Utc};

    fn id(c: char) -> CommitId {
        let s = if c.is_ascii_hexdigit() {
            c.to_string().repeat(40)
        } else {
            format!("{:02x}", c as u8).repeat(20)
        };
        CommitId::new(s).unwrap()
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

    fn laid_out(records: Vec<CommitRecord>) -> NodeStore {
        let mut store = NodeStore::new();
        store.ingest(records);
        store.rebuild_adjacency();
        let order = store.display_order();
        store.assign_positions(&order);
        assign_lanes(&mut store, &order);
        store
    }

    fn kinds(store: &NodeStore, c: char) -> Vec<LaneKind> {
        store
            .lookup(&id(c))
            .unwrap()
            .lanes
            .iter()
            .map(|l| l.kind)
            .collect()
    }

    fn active(store: &NodeStore, c: char) -> usize {
        store.lookup(&id(c)).unwrap().active_lane
    }

    #[test]
    fn linear_history_stays_on_lane_zero() {
        // c3 (newest) -> c2 -> c1
        let store = laid_out(vec![
            record('3', &['2'], 300),
            record('2', &['1'], 200),
            record('1', &[], 100),
        ]);

        assert_eq!(active(&store, '3'), 0);
        assert_eq!(active(&store, '2'), 0);
        assert_eq!(active(&store, '1'), 0);
        assert_eq!(kinds(&store, '3'), vec![LaneKind::Commit]);
        assert_eq!(kinds(&store, '2'), vec![LaneKind::Commit]);
        assert_eq!(kinds(&store, '1'), vec![LaneKind::Root]);
    }

    #[test]
    fn merge_forks_and_parent_joins() {
        // A root; B, C children of A; M merges [B, C]
        let store = laid_out(vec![
            record('m', &['b', 'c'], 400),
            record('b', &['a'], 300),
            record('c', &['a'], 200),
            record('a', &[], 100),
        ]);

        // M forks: first parent B keeps lane 0, C opens lane 1
        assert_eq!(active(&store, 'm'), 0);
        assert_eq!(kinds(&store, 'm'), vec![LaneKind::Fork, LaneKind::ForkOut]);

        // B continues mainline on lane 0, C's line passes through lane 1
        assert_eq!(active(&store, 'b'), 0);
        assert_eq!(kinds(&store, 'b'), vec![LaneKind::Commit, LaneKind::Through]);

        // C commits on lane 1, A's line passes through lane 0
        assert_eq!(active(&store, 'c'), 1);
        assert_eq!(kinds(&store, 'c'), vec![LaneKind::Through, LaneKind::Commit]);

        // A is the shared parent: lane 1 joins, lane 0 terminates
        assert_eq!(active(&store, 'a'), 0);
        assert_eq!(kinds(&store, 'a'), vec![LaneKind::Root, LaneKind::Join]);
    }

    #[test]
    fn join_reduces_lane_count_and_freed_lane_is_reused() {
        // Two independent merges sharing structure:
        //   m1 merges [b, c] over shared parent a
        //   below a, d forks again and must reuse the freed lane 1
        let store = laid_out(vec![
            record('m', &['b', 'c'], 700),
            record('b', &['a'], 600),
            record('c', &['a'], 500),
            record('a', &['d'], 400),
            record('d', &['e', 'f'], 300),
            record('e', &[], 200),
            record('f', &[], 100),
        ]);

        // After a's row the table shrinks by one (join collapsed lane 1)
        let a_node = store.lookup(&id('a')).unwrap();
        assert_eq!(a_node.lanes.len(), 2);

        // d forks again; the freed index 1 is the next allocation
        assert_eq!(active(&store, 'd'), 0);
        assert_eq!(kinds(&store, 'd'), vec![LaneKind::Fork, LaneKind::ForkOut]);
    }

    #[test]
    fn secondary_parent_reuses_tracked_lane() {
        // t1 and t2 are tips; t2's merge parent x is already tracked by t1
        // (t1 -> x), so the merge must not open a third lane.
        let store = laid_out(vec![
            record('t', &['x'], 400),
            record('u', &['y', 'x'], 300),
            record('x', &[], 200),
            record('y', &[], 100),
        ]);

        // u's secondary parent x is already on t's lane: no ForkOut
        assert_eq!(kinds(&store, 'u'), vec![LaneKind::Through, LaneKind::Fork]);

        // Only one lane tracks x, so its row has no Join; y's line passes by
        assert_eq!(kinds(&store, 'x'), vec![LaneKind::Root, LaneKind::Through]);
    }

    #[test]
    fn orphan_in_truncated_window_is_a_root() {
        // b's parent never arrives; layout treats b as a root
        let store = laid_out(vec![record('b', &['9'], 100)]);
        assert_eq!(kinds(&store, 'b'), vec![LaneKind::Root]);
        assert!(store.lookup(&id('b')).unwrap().parent_missing);
    }

    #[test]
    fn lane_indices_unique_per_row() {
        let store = laid_out(vec![
            record('m', &['b', 'c'], 400),
            record('b', &['a'], 300),
            record('c', &['a'], 200),
            record('a', &[], 100),
        ]);

        for node in store.iter() {
            let points = node
                .lanes
                .iter()
                .filter(|l| l.kind.is_commit_point())
                .count();
            assert_eq!(points, 1, "exactly one commit point per row");
        }
    }

    #[test]
    fn identical_input_identical_lanes() {
        let records = vec![
            record('m', &['b', 'c'], 400),
            record('b', &['a'], 300),
            record('c', &['a'], 200),
            record('a', &[], 100),
        ];
        let first = laid_out(records.clone());
        let second = laid_out(records);

        for (x, y) in first.iter().zip(second.iter()) {
            assert_eq!(x.lanes, y.lanes);
            assert_eq!(x.active_lane, y.active_lane);
        }
    }

    mod entering_table_fn {
        use super::*;

        #[test]
        fn trims_trailing_free_slots() {
            let lanes = vec![
                Lane {
                    kind: LaneKind::Commit,
                    tracking: Some(id('a')),
                },
                Lane {
                    kind: LaneKind::Empty,
                    tracking: None,
                },
            ];
            assert_eq!(entering_table(&lanes), vec![Some(id('a'))]);
        }

        #[test]
        fn keeps_interior_free_slots() {
            let lanes = vec![
                Lane {
                    kind: LaneKind::Empty,
                    tracking: None,
                },
                Lane {
                    kind: LaneKind::Through,
                    tracking: Some(id('b')),
                },
            ];
            assert_eq!(entering_table(&lanes), vec![None, Some(id('b'))]);
        }
    }

    mod assigner_state {
        use super::*;

        #[test]
        fn table_tracks_first_parent_after_row() {
            let mut assigner = LaneAssigner::new();
            let a = id('a');
            let b = id('b');
            let (_, lane) = assigner.assign_row(&a, &[&b]);
            assert_eq!(lane, 0);
            assert_eq!(assigner.table(), &[Some(b)]);
        }

        #[test]
        fn root_leaves_empty_table() {
            let mut assigner = LaneAssigner::new();
            assigner.assign_row(&id('a'), &[]);
            assert!(assigner.table().is_empty());
        }
    }
}
