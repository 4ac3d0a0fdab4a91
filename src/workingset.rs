//! Refault distance tracking.
//!
//! A two-tier cache protects its active list by demanding that an entry
//! prove reuse before activation. Entries that are reused at intervals just
//! over the inactive list's length never get that chance: they are evicted,
//! faulted back in, evicted again. To recognize them, eviction leaves a
//! shadow token in the vacated index slot recording when the entry left.
//!
//! When a later miss finds the token, the distance between eviction and
//! refault tells how much competing activity the entry's reuse interval
//! spans. Time is measured in evictions plus activations of the same
//! partition: both remove an inactive slot an evicted entry could have
//! stayed in, so their sum is exactly the access pressure the entry failed
//! to survive. If the distance fits within the active list, the refaulting
//! entry is at least as hot as the coldest active entry and is activated
//! immediately rather than being made to prove itself again.

use crate::config::WorkingSetConfig;
use crate::domain::{Accounted, DomainResolver};
use crate::shadow::ShadowLru;
use crate::token::ShadowToken;

/// The working set engine: records evictions and activations, evaluates
/// refaults, and tracks which index nodes hold nothing but tokens.
///
/// One `WorkingSet` serves a whole cache. All methods take `&self` and are
/// safe to call concurrently from eviction, fault and activation paths.
pub struct WorkingSet<R: DomainResolver> {
    config: WorkingSetConfig,
    resolver: R,
    shadow_nodes: ShadowLru,
}

impl<R: DomainResolver> WorkingSet<R> {
    pub fn new(config: WorkingSetConfig, resolver: R) -> WorkingSet<R> {
        WorkingSet {
            config,
            resolver,
            shadow_nodes: ShadowLru::new(),
        }
    }

    pub fn config(&self) -> &WorkingSetConfig {
        &self.config
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// The queue of token-only index nodes. The host's index maintenance
    /// reports node transitions here; the reclaimer consumes it.
    pub fn shadow_nodes(&self) -> &ShadowLru {
        &self.shadow_nodes
    }

    /// Records the eviction of `entry` and returns the token to store in
    /// its vacated index slot.
    ///
    /// The entry must already be unlinked from the cache's lists; the caller
    /// is expected to be its sole remaining owner.
    pub fn record_eviction<E: Accounted>(&self, entry: &E) -> ShadowToken {
        let domain = entry.domain();
        let partition = entry.partition();

        // An entry can outlive the teardown of its domain. The token still
        // has to encode something, so it carries a zero snapshot and fails
        // closed at refault time.
        let snapshot = match self.resolver.resolve(domain, partition) {
            Some(state) => state.clock().bump(),
            None => 0,
        };

        ShadowToken::pack(&self.config, domain, partition, snapshot)
    }

    /// Records that `entry` moved from the inactive to the active list.
    ///
    /// Activations advance the same clock evictions snapshot, which is what
    /// lets refault distances be compared against the active list size. An
    /// entry whose domain no longer resolves is skipped.
    pub fn record_activation<E: Accounted>(&self, entry: &E) {
        if let Some(state) = self.resolver.resolve(entry.domain(), entry.partition()) {
            state.clock().bump();
        }
    }

    /// Evaluates a token found where a live entry was expected: reports
    /// whether the refaulting entry should go straight to the active list.
    ///
    /// Only the decision is returned; storing the new entry and moving it
    /// between lists remains the caller's job.
    pub fn evaluate_refault(&self, token: ShadowToken) -> bool {
        let (domain, partition, eviction) = token.unpack(&self.config);

        // The domain may have been destroyed while the token sat in the
        // index. Without its clock the distance is unknowable; never
        // activate on an unresolvable domain, and leave its stats alone.
        let Some(state) = self.resolver.resolve(domain, partition) else {
            crate::tracing::debug!(?domain, ?partition, "refault against a vanished domain");
            return false;
        };

        let refault = state.clock().read();
        let active = state.active_entries();

        // The subtraction is masked to the snapshot field's span: the clock
        // keeps counting past what the token could store, and the high bits
        // the token never held must not surface in the distance. A clock
        // that laps a token by the whole span reads as a small distance
        // again; the occasional stale activation that causes is accepted.
        let distance = refault.wrapping_sub(eviction) & ShadowToken::SNAPSHOT_MASK;

        state.stats().count_refault();

        if distance <= active {
            state.stats().count_activation();
            crate::tracing::trace!(distance, active, "refault inside the working set");
            true
        } else {
            crate::tracing::trace!(distance, active, "refault outside the working set");
            false
        }
    }
}
