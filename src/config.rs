use crate::token::ShadowToken;

/// Engine-wide tuning, computed once at startup and shared by the codec, the
/// evaluator and the reclaimer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WorkingSetConfig {
    bucket_order: u32,
    node_density: u64,
}

impl WorkingSetConfig {
    /// Expected number of active entries covered by one index node. The
    /// reclaim budget is `active_entries / node_density`; the default models
    /// nodes averaging about an eighth of their fan-out populated. An
    /// empirical approximation, not a measurement.
    pub const DEFAULT_NODE_DENSITY: u64 = 8;

    /// Sizes the snapshot truncation for a cache of `total_entries`.
    ///
    /// Refault distances beyond the total capacity are never actionable, so
    /// the snapshot field only has to span `total_entries`. When it cannot,
    /// snapshots shed low-order bits until it can: each unit of bucket order
    /// halves the clock resolution and doubles the range. Capacity may still
    /// grow afterwards; distances stay meaningful up to double the total
    /// configured here.
    pub fn new(total_entries: u64) -> WorkingSetConfig {
        let snapshot_bits = ShadowToken::SNAPSHOT_BITS;
        let max_order = match total_entries.saturating_sub(1) {
            0 => 0,
            n => u64::BITS - n.leading_zeros(),
        };
        let bucket_order = max_order.saturating_sub(snapshot_bits);

        crate::tracing::info!(snapshot_bits, max_order, bucket_order, "working set configured");

        WorkingSetConfig {
            bucket_order,
            node_density: Self::DEFAULT_NODE_DENSITY,
        }
    }

    /// Overrides the reclaim density factor.
    ///
    /// Panics if `node_density` is zero.
    pub fn with_node_density(mut self, node_density: u64) -> WorkingSetConfig {
        assert!(node_density > 0, "node density must be positive");
        self.node_density = node_density;
        self
    }

    /// Number of low snapshot bits discarded when packing a token.
    pub fn bucket_order(&self) -> u32 {
        self.bucket_order
    }

    pub fn node_density(&self) -> u64 {
        self.node_density
    }
}
