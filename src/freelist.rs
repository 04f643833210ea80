//! Free list (C4): a singly linked stack of frames known to hold no page.
//!
//! The chain itself lives in each frame's `free_next` slot on the
//! descriptor table (§3, §6); this component only tracks the head and
//! tail of the chain and the push/pop protocol over it.

use {
    crate::{
        FrameId,
        descriptor::{DescriptorTable, NOT_IN_LIST},
        elru::ElruList,
        error::{EngineError, EngineResult},
    },
    parking_lot::Mutex,
    tracing::error,
};

struct Heads {
    first_free: i64,
    last_free: i64,
}

/// LIFO stack over frame ids, pushed onto when a frame is released and
/// popped from first when satisfying `acquire_frame`.
pub struct FreeList {
    capacity: usize,
    heads: Mutex<Heads>,
}

impl FreeList {
    /// Creates a free list covering `[0, capacity)`, all initially
    /// non-free (a caller typically pushes every frame during startup).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heads: Mutex::new(Heads {
                first_free: -1,
                last_free: -1,
            }),
        }
    }

    fn validate(&self, id: FrameId) -> EngineResult<()> {
        if id >= self.capacity {
            error!(frame_id = id, capacity = self.capacity, "invalid frame id");
            return Err(EngineError::InvalidFrameId(id));
        }
        Ok(())
    }

    /// Advisory, lock-free-in-spirit check for whether the list is
    /// non-empty. Exposed to the buffer manager as `have_free_frame`; a
    /// positive result can go stale the instant it's read.
    pub fn has_free_frame(&self) -> bool {
        self.heads.lock().first_free >= 0
    }

    /// Pops the head of the free list, if any, from `descriptors`.
    pub fn try_pop(&self, descriptors: &dyn DescriptorTable) -> Option<FrameId> {
        let mut heads = self.heads.lock();
        if heads.first_free < 0 {
            return None;
        }
        let id = heads.first_free as usize;
        heads.first_free = descriptors.free_next(id);
        if heads.first_free < 0 {
            heads.last_free = -1;
        }
        descriptors.set_free_next(id, NOT_IN_LIST);
        Some(id)
    }

    /// Pushes `id` onto the free list and evicts it from the ELRU list.
    /// A frame already in the free list is left untouched (idempotent).
    pub fn push(
        &self,
        id: FrameId,
        descriptors: &dyn DescriptorTable,
        elru: &ElruList,
    ) -> EngineResult<()> {
        self.validate(id)?;
        {
            let mut heads = self.heads.lock();
            if descriptors.free_next(id) != NOT_IN_LIST {
                return Ok(());
            }
            descriptors.set_free_next(id, heads.first_free);
            if heads.first_free < 0 {
                heads.last_free = id as i64;
            }
            heads.first_free = id as i64;
        }
        elru.evict(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SimpleDescriptorTable;

    #[test]
    fn push_then_pop_round_trips() {
        let elru = ElruList::new(4);
        let descriptors = SimpleDescriptorTable::new(4);
        let list = FreeList::new(4);
        assert!(!list.has_free_frame());

        list.push(2, &descriptors, &elru).unwrap();
        assert!(list.has_free_frame());
        assert_ne!(descriptors.free_next(2), NOT_IN_LIST);

        assert_eq!(list.try_pop(&descriptors), Some(2));
        assert!(!list.has_free_frame());
        assert_eq!(list.try_pop(&descriptors), None);
    }

    #[test]
    fn push_is_idempotent() {
        let elru = ElruList::new(4);
        let descriptors = SimpleDescriptorTable::new(4);
        let list = FreeList::new(4);
        list.push(0, &descriptors, &elru).unwrap();
        list.push(0, &descriptors, &elru).unwrap();
        assert_eq!(list.try_pop(&descriptors), Some(0));
        assert_eq!(list.try_pop(&descriptors), None);
    }

    #[test]
    fn push_evicts_from_elru() {
        let elru = ElruList::new(4);
        let descriptors = SimpleDescriptorTable::new(4);
        let list = FreeList::new(4);
        elru.touch(1, 10).unwrap();
        assert!(elru.is_resident(1).unwrap());

        list.push(1, &descriptors, &elru).unwrap();
        assert!(!elru.is_resident(1).unwrap());
    }

    #[test]
    fn lifo_order() {
        let elru = ElruList::new(4);
        let descriptors = SimpleDescriptorTable::new(4);
        let list = FreeList::new(4);
        list.push(0, &descriptors, &elru).unwrap();
        list.push(1, &descriptors, &elru).unwrap();
        list.push(2, &descriptors, &elru).unwrap();
        assert_eq!(list.try_pop(&descriptors), Some(2));
        assert_eq!(list.try_pop(&descriptors), Some(1));
        assert_eq!(list.try_pop(&descriptors), Some(0));
    }
}
