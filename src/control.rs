//! Statistics & signalling (C7): the allocation counter, the legacy sweep
//! position kept for telemetry, and the background-writer wake latch.

use {
    parking_lot::Mutex,
    std::sync::atomic::{AtomicU32, Ordering},
    tracing::{debug, trace},
};

/// No background writer is currently registered to be woken.
const NO_BGWRITER: i64 = -1;

/// Snapshot returned by [`Control::sync_start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Frame id the rotating sweep position currently points at.
    pub start_index: usize,
    /// Total number of full wraps of the sweep pointer observed so far.
    pub complete_passes: u32,
    /// Number of `acquire_frame` calls since the previous `sync_start`.
    pub alloc_delta: u32,
}

struct Inner {
    complete_passes: u32,
    bgwriter_id: i64,
}

/// Process-wide counters consumed by a background writer, per §4.7.
///
/// The legacy clock-sweep pointer (`next_victim`) no longer chooses
/// victims — ELRU does — but is retained as a pure statistics counter per
/// the design decision recorded for this implementation: it is exposed
/// read-only via [`Control::sync_start`] and never consulted by
/// [`crate::engine::ElruEngine::acquire_frame`].
pub struct Control {
    num_frames: usize,
    next_victim: AtomicU32,
    alloc_count: AtomicU32,
    inner: Mutex<Inner>,
}

impl Control {
    /// Creates a fresh control block for a pool of `num_frames` frames.
    #[must_use]
    pub fn new(num_frames: usize) -> Self {
        Self {
            num_frames,
            next_victim: AtomicU32::new(0),
            alloc_count: AtomicU32::new(0),
            inner: Mutex::new(Inner {
                complete_passes: 0,
                bgwriter_id: NO_BGWRITER,
            }),
        }
    }

    /// Advances the legacy sweep pointer by one and bumps the allocation
    /// counter, called once per `acquire_frame`. Wraparound of the
    /// pointer increments `complete_passes` under the same lock that
    /// guards it, keeping the two fields mutually consistent.
    pub(crate) fn record_allocation(&self) {
        self.alloc_count.fetch_add(1, Ordering::Relaxed);

        if self.num_frames == 0 {
            return;
        }
        let prev = self.next_victim.fetch_add(1, Ordering::AcqRel);
        if (prev as usize + 1) % self.num_frames == 0 {
            let mut inner = self.inner.lock();
            inner.complete_passes += 1;
            debug!(complete_passes = inner.complete_passes, "sweep pointer wrapped");
        }
    }

    /// Reads and clears `bgwriter_id`, signalling that process's wake
    /// latch if one was registered. Returns the id that was woken, if
    /// any. The read-then-clear is observable only once per registration.
    pub(crate) fn wake_bgwriter(&self) -> Option<i64> {
        let mut inner = self.inner.lock();
        if inner.bgwriter_id == NO_BGWRITER {
            return None;
        }
        let id = inner.bgwriter_id;
        inner.bgwriter_id = NO_BGWRITER;
        trace!(bgwriter_id = id, "waking background writer");
        Some(id)
    }

    /// Registers `id` to be woken on the next allocation, or cancels a
    /// pending wake if `id = -1`.
    pub fn notify_bgwriter(&self, id: i64) {
        self.inner.lock().bgwriter_id = id;
    }

    /// Reports sweep position, completed passes, and the allocation delta
    /// since the previous call, atomically zeroing the allocation
    /// counter.
    pub fn sync_start(&self) -> SyncReport {
        // Locked so `complete_passes` can't change between reading it and
        // reading the sweep pointer it describes.
        let inner = self.inner.lock();
        let next_victim = self.next_victim.load(Ordering::Acquire);
        let start_index = if self.num_frames == 0 {
            0
        } else {
            next_victim as usize % self.num_frames
        };
        SyncReport {
            start_index,
            complete_passes: inner.complete_passes,
            alloc_delta: self.alloc_count.swap(0, Ordering::AcqRel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_counter_accumulates_until_read() {
        let control = Control::new(4);
        control.record_allocation();
        control.record_allocation();
        let report = control.sync_start();
        assert_eq!(report.alloc_delta, 2);
        let report = control.sync_start();
        assert_eq!(report.alloc_delta, 0);
    }

    #[test]
    fn sweep_pointer_wraps_and_counts_passes() {
        let control = Control::new(2);
        control.record_allocation();
        control.record_allocation();
        let report = control.sync_start();
        assert_eq!(report.complete_passes, 1);
        assert_eq!(report.start_index, 0);
    }

    #[test]
    fn bgwriter_wake_is_consumed_once() {
        let control = Control::new(4);
        control.notify_bgwriter(42);
        assert_eq!(control.wake_bgwriter(), Some(42));
        assert_eq!(control.wake_bgwriter(), None);
    }

    #[test]
    fn bgwriter_cancel_clears_pending_wake() {
        let control = Control::new(4);
        control.notify_bgwriter(7);
        control.notify_bgwriter(-1);
        assert_eq!(control.wake_bgwriter(), None);
    }
}
