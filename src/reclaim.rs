//! Stale token reclamation.
//!
//! Tokens whose entries never refault would otherwise pin index nodes
//! forever. A node whose last live entry is gone but which still holds
//! tokens is queued on the engine's [`ShadowLru`](crate::ShadowLru); under
//! memory pressure
//! the host's reclaim framework drives a [`ShadowReclaimer`] to clear and
//! delete the oldest such nodes. Tokens stored next to live entries are
//! never touched: their slots are reclaimed naturally when the host reuses
//! them.
//!
//! # Lock order
//!
//! Index maintenance takes a container's structural lock first and the
//! queue lock inside it. The scanner has to start from the queue, so it
//! faces the inverted order. It stays deadlock-free by only ever *trying*
//! the container lock while the queue lock is held; a contended container
//! yields [`ScanStep::Retry`] and the candidate keeps its place in line.

use std::fmt;

use crate::domain::{DomainId, DomainResolver, PartitionId};
use crate::shadow::NodeKey;
use crate::sync::atomic::{AtomicU64, Ordering};
use crate::sync::{Arc, thread};
use crate::token::RawSlot;
use crate::workingset::WorkingSet;

/// Relative cost of recreating a reclaimed object, for frameworks that
/// weigh reclaim targets against each other.
pub const DEFAULT_SEEKS: u32 = 2;

/// Registration metadata a host passes to its reclaim framework.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShrinkerMeta {
    /// Relative cost of recreating a reclaimed object.
    pub seeks: u32,
    /// The shrinker interprets the scope's partition.
    pub partition_aware: bool,
    /// The shrinker interprets the scope's domain.
    pub domain_aware: bool,
}

/// The accounting scope a pressure callback runs against.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReclaimScope {
    pub domain: DomainId,
    pub partition: PartitionId,
}

/// The count/scan pair a memory-pressure framework invokes.
pub trait Shrinker {
    /// Upper bound on how many objects [`scan_objects`](Self::scan_objects)
    /// could usefully reclaim right now. Zero means no pressure is needed.
    fn count_objects(&self, scope: ReclaimScope) -> u64;

    /// Reclaims up to `requested` objects and returns how many were
    /// actually reclaimed.
    fn scan_objects(&self, scope: ReclaimScope, requested: u64) -> u64;

    fn meta(&self) -> ShrinkerMeta;
}

/// Outcome of a single scanner step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScanStep {
    /// The oldest token-only node was cleared and deleted.
    Reclaimed,
    /// The candidate's container lock was contended; nothing was touched
    /// and the candidate kept its place. The caller decides when to retry.
    Retry,
    /// No token-only nodes are queued.
    Exhausted,
}

/// One index node, accessed while its owning container's structural lock is
/// held. Dropping the guard releases the lock.
pub trait NodeGuard {
    /// Live entry references currently stored in the node.
    fn live_entries(&self) -> usize;

    /// Shadow tokens currently stored in the node.
    fn shadow_entries(&self) -> usize;

    /// The node's fixed slot fan-out.
    fn slot_count(&self) -> usize;

    /// The raw word in `slot`, if the slot is occupied.
    fn slot(&self, slot: usize) -> Option<RawSlot>;

    /// Empties `slot` and drops the container's token tally by one.
    fn clear_slot(&mut self, slot: usize);

    /// Unlinks the node from the index if it is empty. Reports whether the
    /// node was deleted.
    fn delete(self) -> bool;
}

/// The locking and node-access surface of the host's lookup index.
///
/// `try_lock_node` is called with the shadow queue lock held and must not
/// block under any circumstances; see the module docs for the lock order
/// this protects.
pub trait IndexBackend: Send + Sync {
    type Guard<'a>: NodeGuard
    where
        Self: 'a;

    /// Tries to take the structural lock of the container owning `key`.
    /// Returns `None` if the lock is contended.
    fn try_lock_node(&self, key: NodeKey) -> Option<Self::Guard<'_>>;
}

/// Deletes token-only index nodes, oldest first, in response to memory
/// pressure.
///
/// A node that was queued must contain at least one token and no live
/// entries, and its slots must agree with the container's token tally.
/// A mismatch means the host's index bookkeeping is corrupt; carrying on
/// would silently reclaim live data, so the scanner panics instead.
pub struct ShadowReclaimer<B: IndexBackend, R: DomainResolver> {
    working_set: Arc<WorkingSet<R>>,
    backend: Arc<B>,
    nodes_reclaimed: AtomicU64,
}

impl<B: IndexBackend, R: DomainResolver> ShadowReclaimer<B, R> {
    pub fn new(working_set: Arc<WorkingSet<R>>, backend: Arc<B>) -> ShadowReclaimer<B, R> {
        ShadowReclaimer {
            working_set,
            backend,
            nodes_reclaimed: AtomicU64::new(0),
        }
    }

    /// Total nodes this reclaimer has deleted.
    pub fn nodes_reclaimed(&self) -> u64 {
        self.nodes_reclaimed.load(Ordering::Relaxed)
    }

    /// Attempts to reclaim the oldest token-only node.
    pub fn scan_one(&self) -> ScanStep {
        let mut list = self.working_set.shadow_nodes().lock();
        let Some(key) = list.iter().next().copied() else {
            return ScanStep::Exhausted;
        };

        // The queue lock is held, so the container lock may only be tried,
        // never waited on.
        let Some(node) = self.backend.try_lock_node(key) else {
            drop(list);
            crate::tracing::trace!(?key, "candidate container contended");
            return ScanStep::Retry;
        };

        list.remove(&key);
        drop(list);

        self.reclaim_node(key, node);
        ScanStep::Reclaimed
    }

    /// Clears and deletes `node`; its container lock is held via the guard.
    fn reclaim_node(&self, key: NodeKey, mut node: B::Guard<'_>) {
        let shadows = node.shadow_entries();
        assert!(shadows > 0, "queued node {key:?} holds no tokens");
        assert_eq!(
            node.live_entries(),
            0,
            "queued node {key:?} holds live entries"
        );

        let mut cleared = 0;
        for slot in 0..node.slot_count() {
            let Some(raw) = node.slot(slot) else { continue };
            assert!(
                raw.is_shadow(),
                "queued node {key:?} holds a live reference in slot {slot}"
            );
            node.clear_slot(slot);
            cleared += 1;
        }
        assert_eq!(
            cleared, shadows,
            "token tally of node {key:?} disagrees with its slots"
        );

        assert!(node.delete(), "emptied node {key:?} was not deletable");

        self.nodes_reclaimed.fetch_add(1, Ordering::Relaxed);
        crate::tracing::debug!(?key, cleared, "reclaimed token-only node");
    }
}

impl<B: IndexBackend, R: DomainResolver> Shrinker for ShadowReclaimer<B, R> {
    /// Queued nodes in excess of the scope's budget.
    ///
    /// Shadow history earns its keep only while it can influence refault
    /// decisions, and the influence window scales with the active list. The
    /// budget grants one node per `node_density` active entries; anything
    /// beyond that is reclaimable. An unresolvable scope has no active list
    /// and reports no pressure.
    fn count_objects(&self, scope: ReclaimScope) -> u64 {
        let ws = &self.working_set;
        let queued = ws.shadow_nodes().len() as u64;

        let Some(state) = ws.resolver().resolve(scope.domain, scope.partition) else {
            return 0;
        };
        let budget = state.active_entries() / ws.config().node_density();

        queued.saturating_sub(budget)
    }

    fn scan_objects(&self, _scope: ReclaimScope, requested: u64) -> u64 {
        let mut reclaimed = 0;
        let mut walk = requested;

        // Every step, contended or not, consumes walk budget; a run of
        // contended candidates terminates instead of spinning, and the
        // framework re-invokes for the remainder.
        while reclaimed < requested && walk > 0 {
            walk -= 1;
            match self.scan_one() {
                ScanStep::Reclaimed => reclaimed += 1,
                ScanStep::Retry => thread::yield_now(),
                ScanStep::Exhausted => break,
            }
        }

        reclaimed
    }

    fn meta(&self) -> ShrinkerMeta {
        ShrinkerMeta {
            seeks: DEFAULT_SEEKS,
            partition_aware: true,
            domain_aware: true,
        }
    }
}

impl<B: IndexBackend, R: DomainResolver> fmt::Debug for ShadowReclaimer<B, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowReclaimer")
            .field("queued", &self.working_set.shadow_nodes().len())
            .field("nodes_reclaimed", &self.nodes_reclaimed())
            .finish()
    }
}
