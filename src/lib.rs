#![deny(clippy::undocumented_unsafe_blocks)]
#![forbid(unsafe_op_in_unsafe_fn)]

mod clock;
mod config;
mod domain;
mod hash;
mod reclaim;
mod shadow;
mod sync;
mod token;
mod tracing;
mod workingset;

pub use self::clock::AccessClock;
pub use self::config::WorkingSetConfig;
pub use self::domain::{
    Accounted, DomainId, DomainResolver, PartitionId, PartitionState, SingleDomain,
    WorkingSetStats,
};
pub use self::reclaim::{
    IndexBackend, NodeGuard, ReclaimScope, ScanStep, ShadowReclaimer, Shrinker, ShrinkerMeta,
    DEFAULT_SEEKS,
};
pub use self::shadow::{NodeKey, ShadowLru};
pub use self::token::{EntryRef, RawSlot, ShadowToken, SlotValue};
pub use self::workingset::WorkingSet;
