//! Engine-wide configuration (§10.2).
//!
//! The distilled spec hard-codes the ring size-in-KB constants and the
//! `N/8` cap as literals. A deployable crate turns those into a typed,
//! overridable configuration, the way the teacher lineage turns LRU-K's
//! `k`/`ref_period` constants into [`LruKConfig`]-equivalent structs.

use crate::ring::RingKind;

/// Per-strategy-kind ring size budgets, in kilobytes, per §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingBudgets {
    /// `BAS_BULKREAD` equivalent. Default 256 KB.
    pub bulk_read_kb: usize,
    /// `BAS_BULKWRITE` equivalent. Default 16 MB.
    pub bulk_write_kb: usize,
    /// `BAS_VACUUM` equivalent. Default 256 KB.
    pub vacuum_kb: usize,
}

impl Default for RingBudgets {
    fn default() -> Self {
        Self {
            bulk_read_kb: 256,
            bulk_write_kb: 16 * 1024,
            vacuum_kb: 256,
        }
    }
}

/// Tunables for an [`ElruEngine`](crate::ElruEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of frames in the pool, i.e. `N`.
    pub num_frames: usize,
    /// Page size, used to convert [`RingBudgets`] from kilobytes to slot
    /// counts.
    pub page_size_bytes: usize,
    /// KB budgets per ring kind.
    pub ring_budgets: RingBudgets,
    /// A ring may never exceed `num_frames / ring_cap_divisor` slots.
    /// Defaults to 8, matching the reference `N/8` cap. Clamped to at
    /// least 1 by [`EngineConfig::ring_capacity`].
    pub ring_cap_divisor: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_frames: 0,
            page_size_bytes: 8 * 1024,
            ring_budgets: RingBudgets::default(),
            ring_cap_divisor: 8,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration for `num_frames` frames, defaults
    /// otherwise.
    #[must_use]
    pub fn new(num_frames: usize) -> Self {
        Self {
            num_frames,
            ..Self::default()
        }
    }

    /// Number of slots a ring of `kind` should have, per §3/§4.5: the KB
    /// budget divided by page size, capped at `num_frames /
    /// ring_cap_divisor`. `RingKind::Normal` always yields zero (no ring).
    #[must_use]
    pub fn ring_capacity(&self, kind: RingKind) -> usize {
        let budget_kb = match kind {
            RingKind::Normal => return 0,
            RingKind::BulkRead => self.ring_budgets.bulk_read_kb,
            RingKind::BulkWrite => self.ring_budgets.bulk_write_kb,
            RingKind::Vacuum => self.ring_budgets.vacuum_kb,
        };
        let by_budget = (budget_kb * 1024) / self.page_size_bytes.max(1);
        let cap = self.num_frames / self.ring_cap_divisor.max(1);
        by_budget.min(cap)
    }
}
