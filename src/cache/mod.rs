//! cache
//!
//! The commit graph cache: raw log text in, lane-annotated graph out.
//!
//! # Architecture
//!
//! - [`record`] - Immutable commit records
//! - [`parser`] - Streaming raw-log parser
//! - [`store`] - Node arena with derived adjacency and display ordering
//! - [`lanes`] - Branch-lane assignment
//! - [`reconcile`] - Incremental relane against a previous snapshot
//! - [`snapshot`] - Immutable sealed graphs and change notifications
//!
//! [`GraphCache`] ties the passes together under a single-writer,
//! multiple-reader discipline: readers hold an `Arc` to the visible
//! snapshot; a refresh builds the next snapshot into a fresh structure
//! and atomically swaps the pointer. Every pass carries a monotonic
//! generation; a pass that finishes after a newer one has published is
//! discarded (last writer wins).

pub mod lanes;
pub mod parser;
pub mod reconcile;
pub mod record;
pub mod snapshot;
pub mod store;

pub use lanes::{Lane, LaneKind};
pub use record::{CommitRecord, Signature, SignatureStatus};
pub use reconcile::ReconcileStats;
pub use snapshot::{GraphChange, GraphSnapshot};
pub use store::{GraphNode, NodeStore};

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::core::types::{CommitId, Fingerprint};

/// Errors from cache refresh operations.
///
/// Structural anomalies (malformed records, dangling parents, duplicate
/// identities) are recovered locally and annotated on the data; only the
/// conditions below surface to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Refresh input was empty or unusable. The previous snapshot is
    /// retained and the generation counter does not advance.
    #[error("stale data: refresh produced no usable records")]
    StaleData,

    /// No initial snapshot could be produced: the repository has no
    /// commits and no working-tree changes.
    #[error("repository has no commits and no working-tree changes")]
    EmptyRepository,
}

/// Working-tree dirty state, supplied by the repository collaborator.
///
/// Present only when the tree is dirty. `tip` is the current branch tip;
/// an unborn repository has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingTree {
    /// Identity of the current branch tip, parent of the sentinel.
    pub tip: Option<CommitId>,
}

/// Outcome of a completed refresh pass.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// A new snapshot became visible.
    Published {
        /// Generation of the published snapshot.
        generation: u64,
        /// Display-row ranges that changed.
        changed: Vec<Range<usize>>,
        /// Classification and preservation statistics.
        stats: ReconcileStats,
    },
    /// Input was identical to the visible snapshot; nothing was rebuilt.
    Unchanged,
    /// The pass finished after a newer pass had already published, so its
    /// result was discarded. A correctness guard, not a failure.
    Discarded {
        /// Generation of the discarded pass.
        pass: u64,
        /// Generation of the snapshot that stayed visible.
        visible: u64,
    },
}

/// The visible commit graph for one repository.
///
/// # Concurrency
///
/// `snapshot()` is lock-free and may be called from any thread; the
/// returned `Arc` never mutates. Refreshes may run concurrently (each
/// builds into its own structures); publication is serialized and
/// generation-guarded.
///
/// # Example
///
/// ```
/// use lanework::cache::GraphCache;
///
/// let cache = GraphCache::new();
/// let log = format!(
///     "{}\u{1f}\u{1f}c <c@e>\u{1f}a <a@e>\u{1f}100\u{1f}init\u{1f}\u{1f}N\u{1f}\u{1e}",
///     "a".repeat(40),
/// );
/// cache.refresh(&log, None).unwrap();
/// assert_eq!(cache.snapshot().len(), 1);
/// ```
pub struct GraphCache {
    visible: ArcSwap<GraphSnapshot>,
    next_generation: AtomicU64,
    publish_lock: Mutex<()>,
    change_tx: watch::Sender<GraphChange>,
}

impl Default for GraphCache {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphCache {
    /// Create a cache with an empty visible snapshot (generation 0).
    pub fn new() -> Self {
        let (change_tx, _) = watch::channel(GraphChange::default());
        Self {
            visible: ArcSwap::from_pointee(GraphSnapshot::empty()),
            next_generation: AtomicU64::new(0),
            publish_lock: Mutex::new(()),
            change_tx,
        }
    }

    /// The current immutable snapshot. Lock-free.
    pub fn snapshot(&self) -> Arc<GraphSnapshot> {
        self.visible.load_full()
    }

    /// Subscribe to change notifications, one per published pass.
    pub fn subscribe(&self) -> watch::Receiver<GraphChange> {
        self.change_tx.subscribe()
    }

    /// Allocate the generation for a pass about to start.
    ///
    /// Call this *before* fetching, so that overlapping fetches resolve
    /// last-writer-wins regardless of completion order; then hand the
    /// generation to [`GraphCache::refresh_pass`].
    pub fn begin_pass(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Fetch-and-publish in one step, allocating the pass generation now.
    pub fn refresh(
        &self,
        raw_log: &str,
        working_tree: Option<&WorkingTree>,
    ) -> Result<RefreshOutcome, CacheError> {
        let pass = self.begin_pass();
        self.refresh_pass(pass, raw_log, working_tree)
    }

    /// Build and publish a snapshot for a pass whose generation was
    /// allocated earlier with [`GraphCache::begin_pass`].
    pub fn refresh_pass(
        &self,
        pass: u64,
        raw_log: &str,
        working_tree: Option<&WorkingTree>,
    ) -> Result<RefreshOutcome, CacheError> {
        let prev = self.snapshot();
        let fingerprint = Fingerprint::of_bytes(raw_log.as_bytes());
        let (records, skipped) = parser::parse_log(raw_log);

        if records.is_empty() && working_tree.is_none() {
            return if prev.generation() == 0 && prev.is_empty() {
                Err(CacheError::EmptyRepository)
            } else {
                warn!(skipped, "refresh produced no records; keeping previous snapshot");
                Err(CacheError::StaleData)
            };
        }

        if prev.generation() > 0
            && *prev.fingerprint() == fingerprint
            && sentinel_matches(&prev, working_tree)
        {
            debug!(generation = prev.generation(), "fetch identical to visible snapshot");
            return Ok(RefreshOutcome::Unchanged);
        }

        let mut store = NodeStore::with_capacity(records.len() + 1);
        store.ingest(records);
        if let Some(wt) = working_tree {
            store.ingest(std::iter::once(CommitRecord::working_tree(wt.tip.clone())));
        }
        store.rebuild_adjacency();
        let order = store.display_order();
        store.assign_positions(&order);

        let stats = reconcile::relane(&prev, &mut store);
        let snapshot = GraphSnapshot::seal(store, pass, fingerprint, skipped);

        Ok(self.publish(snapshot, stats))
    }

    /// Swap the visible snapshot, unless a newer pass already published.
    fn publish(&self, snapshot: GraphSnapshot, stats: ReconcileStats) -> RefreshOutcome {
        let _guard = self.publish_lock.lock();

        let current = self.visible.load();
        if snapshot.generation() <= current.generation() {
            warn!(
                pass = snapshot.generation(),
                visible = current.generation(),
                "discarding out-of-order refresh result"
            );
            return RefreshOutcome::Discarded {
                pass: snapshot.generation(),
                visible: current.generation(),
            };
        }

        let changed = snapshot::changed_ranges(&current, &snapshot);
        let generation = snapshot.generation();
        debug!(
            generation,
            rows = snapshot.len(),
            preserved = stats.preserved_rows,
            "publishing snapshot"
        );

        self.visible.store(Arc::new(snapshot));
        self.change_tx.send_replace(GraphChange {
            generation,
            rows: changed.clone(),
        });

        RefreshOutcome::Published {
            generation,
            changed,
            stats,
        }
    }
}

/// Whether the visible snapshot's sentinel state matches the incoming
/// working-tree report.
fn sentinel_matches(prev: &GraphSnapshot, working_tree: Option<&WorkingTree>) -> bool {
    match (prev.working_tree(), working_tree) {
        (None, None) => true,
        (Some(node), Some(wt)) => node.record.first_parent() == wt.tip.as_ref(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(c: char) -> String {
        c.to_string().repeat(40)
    }

    fn id(c: char) -> CommitId {
        CommitId::new(hex(c)).unwrap()
    }

    fn raw_record(c: char, parents: &[char], secs: i64) -> String {
        let parents = parents.iter().map(|p| hex(*p)).collect::<Vec<_>>().join(" ");
        format!(
            "{}\u{1f}{}\u{1f}c <c@e>\u{1f}a <a@e>\u{1f}{}\u{1f}commit {}\u{1f}\u{1f}N\u{1f}\u{1e}\n",
            hex(c),
            parents,
            secs,
            c,
        )
    }

    fn linear_log() -> String {
        raw_record('3', &['2'], 300) + &raw_record('2', &['1'], 200) + &raw_record('1', &[], 100)
    }

    #[test]
    fn first_build_publishes_generation_one() {
        let cache = GraphCache::new();
        let outcome = cache.refresh(&linear_log(), None).unwrap();

        match outcome {
            RefreshOutcome::Published {
                generation,
                changed,
                ..
            } => {
                assert_eq!(generation, 1);
                assert_eq!(changed, vec![0..3]);
            }
            other => panic!("expected Published, got {other:?}"),
        }

        let snap = cache.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.generation(), 1);
        assert_eq!(snap.record_at(0).unwrap().id(), &id('3'));
    }

    #[test]
    fn identical_refetch_is_unchanged() {
        let cache = GraphCache::new();
        cache.refresh(&linear_log(), None).unwrap();
        let outcome = cache.refresh(&linear_log(), None).unwrap();
        assert_eq!(outcome, RefreshOutcome::Unchanged);
        // Visible generation stays at the published pass
        assert_eq!(cache.snapshot().generation(), 1);
    }

    #[test]
    fn empty_input_on_empty_cache_is_fatal() {
        let cache = GraphCache::new();
        assert_eq!(
            cache.refresh("", None).unwrap_err(),
            CacheError::EmptyRepository
        );
    }

    #[test]
    fn empty_input_keeps_previous_snapshot() {
        let cache = GraphCache::new();
        cache.refresh(&linear_log(), None).unwrap();

        assert_eq!(cache.refresh("", None).unwrap_err(), CacheError::StaleData);
        let snap = cache.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.generation(), 1, "generation must not advance");
    }

    #[test]
    fn unparseable_input_keeps_previous_snapshot() {
        let cache = GraphCache::new();
        cache.refresh(&linear_log(), None).unwrap();

        let garbage = "not\u{1f}a\u{1f}record\u{1e}";
        assert_eq!(
            cache.refresh(garbage, None).unwrap_err(),
            CacheError::StaleData
        );
        assert_eq!(cache.snapshot().generation(), 1);
    }

    #[test]
    fn out_of_order_result_is_discarded() {
        let cache = GraphCache::new();
        let slow = cache.begin_pass();
        let fast = cache.begin_pass();

        // The later-allocated pass completes first
        let longer = raw_record('4', &['3'], 400) + &linear_log();
        cache.refresh_pass(fast, &longer, None).unwrap();

        // The stale pass finishes afterwards and must be rejected
        let outcome = cache.refresh_pass(slow, &linear_log(), None).unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Discarded {
                pass: slow,
                visible: fast,
            }
        );

        let snap = cache.snapshot();
        assert_eq!(snap.generation(), fast);
        assert_eq!(snap.len(), 4);
    }

    #[test]
    fn incremental_refresh_reports_preserved_rows() {
        let cache = GraphCache::new();
        cache.refresh(&linear_log(), None).unwrap();

        let longer = raw_record('4', &['3'], 400) + &linear_log();
        match cache.refresh(&longer, None).unwrap() {
            RefreshOutcome::Published { stats, .. } => {
                assert_eq!(stats.new, 1);
                assert!(stats.preserved_rows > 0);
            }
            other => panic!("expected Published, got {other:?}"),
        }
    }

    #[test]
    fn skipped_records_surface_on_snapshot() {
        let cache = GraphCache::new();
        let log = linear_log() + "truncated\u{1f}partial";
        cache.refresh(&log, None).unwrap();
        assert_eq!(cache.snapshot().skipped_records(), 1);
    }

    mod working_tree {
        use super::*;

        #[test]
        fn sentinel_injected_at_position_zero() {
            let cache = GraphCache::new();
            let wt = WorkingTree {
                tip: Some(id('3')),
            };
            cache.refresh(&linear_log(), Some(&wt)).unwrap();

            let snap = cache.snapshot();
            assert_eq!(snap.len(), 4);
            let sentinel = snap.working_tree().expect("sentinel present");
            assert_eq!(sentinel.position, 0);
            assert_eq!(sentinel.record.first_parent(), Some(&id('3')));
        }

        #[test]
        fn sentinel_removed_without_disturbing_real_rows() {
            let cache = GraphCache::new();
            let wt = WorkingTree {
                tip: Some(id('3')),
            };
            cache.refresh(&linear_log(), Some(&wt)).unwrap();
            let dirty = cache.snapshot();

            cache.refresh(&linear_log(), None).unwrap();
            let clean = cache.snapshot();

            assert!(clean.working_tree().is_none());
            assert_eq!(clean.len(), 3);
            // Real commits keep their relative order and lanes
            for (offset, node) in clean.iter().enumerate() {
                let before = dirty.node_at(offset + 1).unwrap();
                assert_eq!(node.record.id(), before.record.id());
                assert_eq!(node.active_lane, before.active_lane);
            }
        }

        #[test]
        fn dirty_flag_flip_defeats_fingerprint_shortcut() {
            let cache = GraphCache::new();
            cache.refresh(&linear_log(), None).unwrap();

            let wt = WorkingTree {
                tip: Some(id('3')),
            };
            let outcome = cache.refresh(&linear_log(), Some(&wt)).unwrap();
            assert!(
                matches!(outcome, RefreshOutcome::Published { .. }),
                "same log with new dirty state must rebuild"
            );
            assert!(cache.snapshot().working_tree().is_some());
        }

        #[test]
        fn dirty_unborn_repository_is_just_the_sentinel() {
            let cache = GraphCache::new();
            let wt = WorkingTree { tip: None };
            cache.refresh("", Some(&wt)).unwrap();

            let snap = cache.snapshot();
            assert_eq!(snap.len(), 1);
            assert!(snap.working_tree().is_some());
        }
    }

    mod notifications {
        use super::*;

        #[test]
        fn change_emitted_per_published_pass() {
            let cache = GraphCache::new();
            let mut rx = cache.subscribe();

            cache.refresh(&linear_log(), None).unwrap();
            let change = rx.borrow_and_update().clone();
            assert_eq!(change.generation, 1);
            assert_eq!(change.rows, vec![0..3]);
        }

        #[test]
        fn unchanged_pass_emits_nothing() {
            let cache = GraphCache::new();
            cache.refresh(&linear_log(), None).unwrap();

            let mut rx = cache.subscribe();
            rx.borrow_and_update();
            cache.refresh(&linear_log(), None).unwrap();
            assert!(!rx.has_changed().unwrap());
        }
    }
}
