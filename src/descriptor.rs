//! External collaborator interface (§6): the buffer descriptor table.
//!
//! The real descriptor table — pin counts, dirty flags, I/O locks — is out
//! of scope for this crate; it lives in the storage manager and is
//! authored once per deployment. What this crate needs from it is the
//! narrow interface below: a short header spinlock guarding a refcount and
//! a usage count, which `acquire_frame` (C6) takes and hands back to its
//! caller still locked — so the lock must survive a function-call
//! boundary without allocating, ruling out an ordinary RAII guard.
//!
//! [`SimpleDescriptorTable`] is a minimal in-process implementation of
//! that interface, sufficient to drive this crate's own tests and to give
//! downstream integrators a working pool before they wire up shared
//! memory.

use {
    crate::FrameId,
    std::{
        cell::UnsafeCell,
        hint,
        sync::atomic::{AtomicBool, AtomicI64, Ordering},
    },
};

/// Sentinel stored in `free_next` when a frame is not in the free list.
pub const NOT_IN_LIST: i64 = -1;

/// Snapshot of a descriptor's header fields, returned while the header
/// lock is held.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorState {
    /// Number of holders currently pinning the frame.
    pub refcount: u32,
    /// External access-recency hint, consulted only by the ring (C5).
    pub usage_count: u32,
}

impl DescriptorState {
    /// Whether the frame is unpinned, i.e. a viable eviction candidate.
    #[must_use]
    pub const fn is_unpinned(&self) -> bool {
        self.refcount == 0
    }

    /// Whether the frame is both unpinned and has never been touched by
    /// anyone besides the free-list/ELRU machinery itself.
    #[must_use]
    pub const fn is_cold(&self) -> bool {
        self.refcount == 0 && self.usage_count == 0
    }
}

/// The descriptor-table interface this engine consumes (§6).
///
/// `lock_header`/`unlock_header` must pair up like a spinlock: the caller
/// is expected to call `unlock_header(id)` exactly once for every
/// `lock_header(id)`, and not call it for any other id.
pub trait DescriptorTable: Send + Sync {
    /// Acquires the short header spinlock for `id` and returns a snapshot
    /// of its fields.
    fn lock_header(&self, id: FrameId) -> DescriptorState;

    /// Releases the header spinlock for `id`.
    fn unlock_header(&self, id: FrameId);

    /// Reads `id`'s `free_next` slot. Protected by the free list's own
    /// lock by convention, not the header spinlock — see the source
    /// comment this mirrors in `freelist.rs`.
    fn free_next(&self, id: FrameId) -> i64;

    /// Writes `id`'s `free_next` slot.
    fn set_free_next(&self, id: FrameId, next: i64);
}

/// Bare spin-until-acquired lock, analogous to a descriptor's header
/// spinlock in a real shared-memory buffer pool. Deliberately manual
/// (lock/unlock rather than a RAII guard) because the interface this
/// crate consumes must hold a lock across a function-call boundary
/// without heap-allocating a guard.
struct HeaderLock(AtomicBool);

impl HeaderLock {
    const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    fn lock(&self) {
        while self
            .0
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            hint::spin_loop();
        }
    }

    fn unlock(&self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Header {
    refcount: u32,
    usage_count: u32,
}

/// A minimal, process-local [`DescriptorTable`] backed by one spinlock and
/// one free-running `free_next` slot per frame. Not shared-memory-safe —
/// intended for tests and for embedders bootstrapping a pool before they
/// wire up real shared memory.
pub struct SimpleDescriptorTable {
    locks: Vec<HeaderLock>,
    headers: Vec<UnsafeCell<Header>>,
    free_next: Vec<AtomicI64>,
}

// SAFETY: every access to `headers[id]` is preceded by `locks[id].lock()`
// and followed by `locks[id].unlock()`, so concurrent access is
// serialized per id exactly as a real descriptor header spinlock would.
unsafe impl Sync for SimpleDescriptorTable {}

impl SimpleDescriptorTable {
    /// Creates a table for `capacity` frames, all unpinned, unused, and
    /// not in any free list.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            locks: (0..capacity).map(|_| HeaderLock::new()).collect(),
            headers: (0..capacity)
                .map(|_| {
                    UnsafeCell::new(Header {
                        refcount: 0,
                        usage_count: 0,
                    })
                })
                .collect(),
            free_next: (0..capacity).map(|_| AtomicI64::new(NOT_IN_LIST)).collect(),
        }
    }

    /// Sets `id`'s refcount directly, bypassing pin/unpin bookkeeping.
    /// Test/demo convenience only.
    pub fn set_refcount(&self, id: FrameId, refcount: u32) {
        self.locks[id].lock();
        unsafe { (*self.headers[id].get()).refcount = refcount };
        self.locks[id].unlock();
    }

    /// Sets `id`'s usage count directly. Test/demo convenience only.
    pub fn set_usage_count(&self, id: FrameId, usage_count: u32) {
        self.locks[id].lock();
        unsafe { (*self.headers[id].get()).usage_count = usage_count };
        self.locks[id].unlock();
    }
}

impl DescriptorTable for SimpleDescriptorTable {
    fn lock_header(&self, id: FrameId) -> DescriptorState {
        self.locks[id].lock();
        let header = unsafe { &*self.headers[id].get() };
        DescriptorState {
            refcount: header.refcount,
            usage_count: header.usage_count,
        }
    }

    fn unlock_header(&self, id: FrameId) {
        self.locks[id].unlock();
    }

    fn free_next(&self, id: FrameId) -> i64 {
        self.free_next[id].load(Ordering::Acquire)
    }

    fn set_free_next(&self, id: FrameId, next: i64) {
        self.free_next[id].store(next, Ordering::Release);
    }
}
