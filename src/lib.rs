#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![deny(elided_lifetimes_in_paths)]

pub mod clock;
pub mod config;
pub mod control;
pub mod descriptor;
pub mod elru;
pub mod engine;
pub mod error;
pub mod freelist;
pub mod ring;

pub use {
    clock::{Clock, MonotonicClock, SteppedClock},
    config::{EngineConfig, RingBudgets},
    control::SyncReport,
    descriptor::{DescriptorState, DescriptorTable, SimpleDescriptorTable},
    elru::ElruList,
    engine::{Acquired, ElruEngine},
    error::{EngineError, EngineResult},
    freelist::FreeList,
    ring::{Ring, RingKind},
};

/// Buffer frame identifier: an index into the fixed-size `[0, N)` pool.
pub type FrameId = usize;
