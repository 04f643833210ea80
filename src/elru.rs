//! ELRU ordered list (C3).
//!
//! An index-based intrusive doubly linked list over a fixed `[0, N)` range
//! of frame ids. `next` points toward `top` (most recently ordered,
//! evicted last); `prev` points toward `bottom` (evicted first). Ordering
//! is induced by the ELRU key: frames touched at most once (tier 0) always
//! sort below frames touched at least twice (tier 1), and within a tier by
//! the relevant timestamp.

use {
    crate::{
        FrameId,
        clock::TIMESTAMP_NIL,
        error::{EngineError, EngineResult},
    },
    parking_lot::{Mutex, MutexGuard},
    tracing::error,
};

/// ELRU key: `(tier, rank)`. Tier 0 ("touched once") always sorts below
/// tier 1 ("touched twice or more"); within a tier, smaller rank sorts
/// lower.
type Key = (u8, i64);

#[derive(Debug, Clone, Copy)]
struct FrameNode {
    last_accessed: i64,
    prev_accessed: i64,
    prev: Option<FrameId>,
    next: Option<FrameId>,
}

impl FrameNode {
    const fn new() -> Self {
        Self {
            last_accessed: TIMESTAMP_NIL,
            prev_accessed: TIMESTAMP_NIL,
            prev: None,
            next: None,
        }
    }

    fn resident(&self) -> bool {
        self.last_accessed != TIMESTAMP_NIL
    }

    fn key(&self) -> Key {
        if self.prev_accessed == TIMESTAMP_NIL {
            (0, self.last_accessed)
        } else {
            (1, self.prev_accessed)
        }
    }
}

/// Locked list structure, manipulated only while the owning [`ElruList`]'s
/// mutex is held. Exposed at `pub(crate)` visibility so the acquisition
/// protocol (C6) can walk candidates and mutate them without releasing and
/// reacquiring `list_lock` between each step.
pub(crate) struct ListState {
    nodes: Vec<FrameNode>,
    top: Option<FrameId>,
    bottom: Option<FrameId>,
}

impl ListState {
    fn new(capacity: usize) -> Self {
        Self {
            nodes: vec![FrameNode::new(); capacity],
            top: None,
            bottom: None,
        }
    }

    fn unlink(&mut self, id: FrameId) {
        let (prev, next) = {
            let node = &self.nodes[id];
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.bottom = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.top = prev,
        }
        let node = &mut self.nodes[id];
        node.prev = None;
        node.next = None;
    }

    /// Inserts `id` at the position dictated by its current key, scanning
    /// from `top` toward `bottom` for the first existing node whose key is
    /// `<=` the new node's key, and inserting immediately above it. A
    /// newly inserted node with a key tied with an existing one sorts
    /// above that existing node, matching the reference tie-break.
    fn insert_sorted(&mut self, id: FrameId) {
        let key = self.nodes[id].key();

        let Some(mut cursor) = self.top else {
            self.top = Some(id);
            self.bottom = Some(id);
            return;
        };

        loop {
            if self.nodes[cursor].key() <= key {
                let above = self.nodes[cursor].next;
                self.nodes[id].prev = Some(cursor);
                self.nodes[id].next = above;
                self.nodes[cursor].next = Some(id);
                match above {
                    Some(above_id) => self.nodes[above_id].prev = Some(id),
                    None => self.top = Some(id),
                }
                return;
            }
            match self.nodes[cursor].prev {
                Some(next_cursor) => cursor = next_cursor,
                None => break,
            }
        }

        // Walked off the bottom without finding a node with key <= ours:
        // every resident node outranks us, so we become the new bottom.
        let old_bottom = self.bottom.expect("top present implies bottom present");
        self.nodes[id].prev = None;
        self.nodes[id].next = Some(old_bottom);
        self.nodes[old_bottom].prev = Some(id);
        self.bottom = Some(id);
    }

    pub(crate) fn touch(&mut self, id: FrameId, now: i64) {
        let resident = self.nodes[id].resident();
        let prev_ts = self.nodes[id].last_accessed;
        self.nodes[id].last_accessed = now;
        self.nodes[id].prev_accessed = prev_ts;
        if resident {
            self.unlink(id);
        }
        self.insert_sorted(id);
    }

    pub(crate) fn evict(&mut self, id: FrameId) {
        if !self.nodes[id].resident() {
            return;
        }
        self.unlink(id);
        self.nodes[id].last_accessed = TIMESTAMP_NIL;
        self.nodes[id].prev_accessed = TIMESTAMP_NIL;
    }

    pub(crate) fn is_top(&self, id: FrameId) -> bool {
        self.top == Some(id)
    }

    /// Frame ids from `bottom` to `top`, i.e. in eviction order.
    pub(crate) fn bottom_to_top(&self) -> impl Iterator<Item = FrameId> + '_ {
        BottomIter {
            nodes: &self.nodes,
            cursor: self.bottom,
        }
    }

    #[cfg(test)]
    fn last_accessed(&self, id: FrameId) -> i64 {
        self.nodes[id].last_accessed
    }

    #[cfg(test)]
    fn prev_accessed(&self, id: FrameId) -> i64 {
        self.nodes[id].prev_accessed
    }
}

struct BottomIter<'a> {
    nodes: &'a [FrameNode],
    cursor: Option<FrameId>,
}

impl Iterator for BottomIter<'_> {
    type Item = FrameId;

    fn next(&mut self) -> Option<FrameId> {
        let id = self.cursor?;
        self.cursor = self.nodes[id].next;
        Some(id)
    }
}

/// Public, lockable entry point into the ELRU ordered list.
pub struct ElruList {
    capacity: usize,
    inner: Mutex<ListState>,
}

impl ElruList {
    /// Creates a list covering frame ids `[0, capacity)`, all initially
    /// non-resident.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(ListState::new(capacity)),
        }
    }

    fn validate(&self, id: FrameId) -> EngineResult<()> {
        if id >= self.capacity {
            error!(frame_id = id, capacity = self.capacity, "invalid frame id");
            return Err(EngineError::InvalidFrameId(id));
        }
        Ok(())
    }

    /// Records an access at timestamp `now`, making `id` resident at the
    /// position dictated by its (possibly just-updated) ELRU key.
    pub fn touch(&self, id: FrameId, now: i64) -> EngineResult<()> {
        self.validate(id)?;
        self.inner.lock().touch(id, now);
        Ok(())
    }

    /// Removes `id` from the list if resident; a no-op otherwise.
    pub fn evict(&self, id: FrameId) -> EngineResult<()> {
        self.validate(id)?;
        self.inner.lock().evict(id);
        Ok(())
    }

    /// Whether `id` currently appears in the list.
    pub fn is_resident(&self, id: FrameId) -> EngineResult<bool> {
        self.validate(id)?;
        Ok(self.inner.lock().nodes[id].resident())
    }

    /// Snapshot of frame ids from `bottom` to `top` (eviction order).
    /// Intended for tests and diagnostics; the acquisition protocol walks
    /// the list under its own lock instead, see [`ElruList::lock`].
    pub fn snapshot_bottom_to_top(&self) -> Vec<FrameId> {
        self.inner.lock().bottom_to_top().collect()
    }

    /// Takes `list_lock` and exposes the raw list for the acquisition
    /// protocol, which needs to walk candidates and mutate the winner
    /// without releasing the lock in between.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ListState> {
        self.inner.lock()
    }
}
