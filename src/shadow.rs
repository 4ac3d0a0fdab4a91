use std::fmt;

use crate::hash::FxLinkedHashSet;
use crate::sync::{Mutex, MutexGuard};

/// Identifies one node of the host's lookup index. Keys are assigned by the
/// host; the engine only stores and compares them.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(u64);

impl NodeKey {
    #[inline]
    pub const fn new(key: u64) -> NodeKey {
        NodeKey(key)
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeKey({:#x})", self.0)
    }
}

/// The queue of index nodes that hold nothing but shadow tokens, in the
/// order they became token-only.
///
/// The host's index maintenance calls [`note_shadow_only`](Self::note_shadow_only)
/// and [`note_live`](Self::note_live) while it already holds the owning
/// container's structural lock, so the queue's own lock nests inside
/// container locks. The reclaimer walks the queue from the other direction
/// and must therefore never block on a container lock while holding the
/// queue lock; see [`ShadowReclaimer`](crate::ShadowReclaimer).
pub struct ShadowLru {
    list: Mutex<FxLinkedHashSet<NodeKey>>,
}

impl ShadowLru {
    pub(crate) fn new() -> ShadowLru {
        ShadowLru {
            list: Mutex::new(FxLinkedHashSet::default()),
        }
    }

    /// The node's last live entry is gone but tokens remain: queue it behind
    /// every node already waiting. Queueing an already queued node is a
    /// no-op that keeps its position.
    ///
    /// Call with the owning container's lock held.
    pub fn note_shadow_only(&self, key: NodeKey) {
        let mut list = self.list.lock();
        if !list.contains(&key) {
            list.insert(key);
        }
    }

    /// The node regained a live entry, or the host is deleting it: drop it
    /// from the queue. A key that was never queued is ignored.
    ///
    /// Call with the owning container's lock held.
    pub fn note_live(&self, key: NodeKey) {
        self.list.lock().remove(&key);
    }

    /// Number of token-only nodes currently queued.
    pub fn len(&self) -> usize {
        self.list.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.list.lock().contains(&key)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, FxLinkedHashSet<NodeKey>> {
        self.list.lock()
    }
}

impl fmt::Debug for ShadowLru {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowLru").field("len", &self.len()).finish()
    }
}
