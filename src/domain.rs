use std::fmt;

use crate::clock::AccessClock;
use crate::sync::atomic::{AtomicU64, Ordering};
use crate::token::ShadowToken;

/// Identifies an accounting domain (a tenant, a cgroup-like group, or the
/// single implicit domain when accounting is disabled).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomainId(u16);

impl DomainId {
    /// The implicit domain hosts use when they do not partition accounting.
    pub const DEFAULT: DomainId = DomainId(0);

    #[inline]
    pub const fn new(id: u16) -> DomainId {
        DomainId(id)
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DomainId({})", self.0)
    }
}

/// Identifies a cache partition, typically the storage or memory node an
/// entry resided on. Partition ids share a token field with the tag bit, so
/// their range is narrower than the type suggests.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionId(u16);

impl PartitionId {
    /// Largest id the token's partition field can carry.
    pub const MAX: PartitionId = PartitionId((1 << ShadowToken::PARTITION_BITS) - 1);

    /// Panics if `id` does not fit the token's partition field. Partitions
    /// are enumerated at startup, so this is a configuration-time failure.
    #[inline]
    pub fn new(id: u16) -> PartitionId {
        assert!(
            id <= PartitionId::MAX.0,
            "partition id {id} exceeds the token field"
        );
        PartitionId(id)
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartitionId({})", self.0)
    }
}

/// Monotonic per-partition refault counters.
pub struct WorkingSetStats {
    refaulted: AtomicU64,
    activated: AtomicU64,
}

impl WorkingSetStats {
    /// Tokens found and evaluated on a cache miss.
    pub fn refaulted(&self) -> u64 {
        self.refaulted.load(Ordering::Relaxed)
    }

    /// Evaluations that granted immediate activation.
    pub fn activated(&self) -> u64 {
        self.activated.load(Ordering::Relaxed)
    }

    pub(crate) fn count_refault(&self) {
        self.refaulted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_activation(&self) {
        self.activated.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for WorkingSetStats {
    fn default() -> WorkingSetStats {
        WorkingSetStats {
            refaulted: AtomicU64::new(0),
            activated: AtomicU64::new(0),
        }
    }
}

impl fmt::Debug for WorkingSetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkingSetStats")
            .field("refaulted", &self.refaulted())
            .field("activated", &self.activated())
            .finish()
    }
}

/// Shared state for one (domain, partition) pair: the access clock, the size
/// of the partition's active list, and refault statistics.
///
/// The active count mirrors the host's LRU bookkeeping. The host updates it
/// as entries move between the active and inactive lists; the evaluator only
/// reads it, so a slightly stale reading shifts the activation threshold by
/// at most the staleness.
pub struct PartitionState {
    clock: AccessClock,
    active_entries: AtomicU64,
    stats: WorkingSetStats,
}

impl PartitionState {
    pub fn new() -> PartitionState {
        PartitionState::with_clock(AccessClock::new())
    }

    /// A partition whose clock starts at a caller-chosen reading.
    pub fn with_clock(clock: AccessClock) -> PartitionState {
        PartitionState {
            clock,
            active_entries: AtomicU64::new(0),
            stats: WorkingSetStats::default(),
        }
    }

    pub fn clock(&self) -> &AccessClock {
        &self.clock
    }

    pub fn stats(&self) -> &WorkingSetStats {
        &self.stats
    }

    /// Current number of entries on the partition's active list.
    pub fn active_entries(&self) -> u64 {
        self.active_entries.load(Ordering::Relaxed)
    }

    pub fn set_active_entries(&self, count: u64) {
        self.active_entries.store(count, Ordering::Relaxed);
    }

    pub fn inc_active(&self) {
        self.active_entries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_active(&self) {
        self.active_entries.fetch_sub(1, Ordering::Relaxed);
    }
}

impl Default for PartitionState {
    fn default() -> PartitionState {
        PartitionState::new()
    }
}

impl fmt::Debug for PartitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionState")
            .field("clock", &self.clock)
            .field("active_entries", &self.active_entries())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Maps (domain, partition) pairs to their shared state.
///
/// `None` means the domain has been destroyed or never existed; tokens
/// carrying such a pair fail closed. Implementations must resolve without
/// blocking: the engine resolves on every eviction, activation and refault,
/// often while the caller holds index locks.
pub trait DomainResolver: Send + Sync {
    fn resolve(&self, domain: DomainId, partition: PartitionId) -> Option<&PartitionState>;
}

/// Implemented by cache entries so the recorders can locate their clock.
pub trait Accounted {
    fn domain(&self) -> DomainId;
    fn partition(&self) -> PartitionId;
}

/// Resolver for hosts that run without accounting domains: every domain id
/// maps onto one implicit domain, which is never destroyed.
pub struct SingleDomain {
    partitions: Box<[PartitionState]>,
}

impl SingleDomain {
    pub fn new(partitions: usize) -> SingleDomain {
        assert!(partitions > 0, "at least one partition is required");
        (0..partitions).map(|_| PartitionState::new()).collect()
    }

    /// Direct access to one partition's state, for hosts updating active
    /// counts outside the resolver path.
    pub fn partition(&self, partition: PartitionId) -> &PartitionState {
        &self.partitions[usize::from(partition.as_u16())]
    }
}

impl FromIterator<PartitionState> for SingleDomain {
    fn from_iter<I: IntoIterator<Item = PartitionState>>(iter: I) -> SingleDomain {
        let partitions: Box<[PartitionState]> = iter.into_iter().collect();
        assert!(
            partitions.len() <= usize::from(PartitionId::MAX.as_u16()) + 1,
            "more partitions than the token field can address"
        );
        SingleDomain { partitions }
    }
}

impl DomainResolver for SingleDomain {
    fn resolve(&self, _domain: DomainId, partition: PartitionId) -> Option<&PartitionState> {
        self.partitions.get(usize::from(partition.as_u16()))
    }
}
