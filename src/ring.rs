//! Ring strategies (C5): bounded circular buffers that let a bulk scan
//! reuse a handful of frames instead of flushing the whole pool through
//! ELRU, per §3/§4.5.
//!
//! A ring only ever hands back a *candidate*; the engine (C6) still has to
//! lock the candidate's descriptor header and confirm it's unpinned and
//! cold before accepting it. This module owns slot bookkeeping only.

use crate::{FrameId, config::EngineConfig};

/// Which strategy a caller is running under, mirroring `BufferAccessStrategyType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RingKind {
    /// No ring: every frame comes from the free list or ELRU.
    Normal,
    /// Sequential bulk reads (e.g. `COPY FROM`, sequential scans).
    BulkRead,
    /// Sequential bulk writes (e.g. `COPY TO`, `CREATE TABLE AS`).
    BulkWrite,
    /// Vacuum scans.
    Vacuum,
}

const INVALID: i64 = -1;

/// A fixed-size circular buffer of frame ids for one bulk operation.
pub struct Ring {
    kind: RingKind,
    slots: Vec<i64>,
    cursor: usize,
}

impl Ring {
    /// Builds a ring for `kind` sized per `config`. Returns `None` for
    /// [`RingKind::Normal`], or if the computed capacity is zero (e.g. a
    /// tiny pool where `N / ring_cap_divisor` rounds down to nothing).
    #[must_use]
    pub fn new(kind: RingKind, config: &EngineConfig) -> Option<Self> {
        let capacity = config.ring_capacity(kind);
        if capacity == 0 {
            return None;
        }
        Some(Self {
            kind,
            slots: vec![INVALID; capacity],
            // Positioned one before the first slot so the first advance
            // lands on index 0.
            cursor: capacity - 1,
        })
    }

    /// Which strategy this ring serves.
    #[must_use]
    pub const fn kind(&self) -> RingKind {
        self.kind
    }

    /// Number of slots in the ring.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Advances the cursor by one slot (wrapping) and returns the frame id
    /// occupying the new slot, if any. The caller is responsible for
    /// validating the candidate against the descriptor table before
    /// treating it as acceptable; a rejected candidate is simply
    /// overwritten by the next [`Ring::record`].
    pub fn advance_and_peek(&mut self) -> Option<FrameId> {
        self.cursor = (self.cursor + 1) % self.slots.len();
        let slot = self.slots[self.cursor];
        (slot >= 0).then_some(slot as FrameId)
    }

    /// Records that `id` now occupies the slot at the current cursor
    /// position, after either allocating a fresh frame into the ring or
    /// accepting a recycled one.
    pub fn record(&mut self, id: FrameId) {
        self.slots[self.cursor] = id as i64;
    }

    /// Reports that `id` was found pinned or otherwise unsuitable for
    /// reuse when it was the ring's candidate. Only [`RingKind::BulkRead`]
    /// rings reroute rejected buffers back through the free list/ELRU
    /// instead of evicting something else to make room (§4.5); other
    /// kinds keep the slot occupied and fall through to a normal
    /// allocation. Returns whether the slot was cleared.
    pub fn reject(&mut self, id: FrameId) -> bool {
        if self.kind != RingKind::BulkRead || self.slots[self.cursor] != id as i64 {
            return false;
        }
        self.slots[self.cursor] = INVALID;
        true
    }
}
