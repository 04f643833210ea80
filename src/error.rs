//! Error taxonomy (§7, §10.3).

use crate::FrameId;

/// Replacement engine error.
///
/// Mirrors the error taxonomy of the source freelist: most conditions
/// encountered while walking candidates (pinned frame, dirty ring slot,
/// stale free-list entry) are recovered locally and never surface here.
/// Only programming errors and genuine pool exhaustion do.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// `id` is outside `[0, num_frames)`.
    #[error("invalid frame id: {0}")]
    InvalidFrameId(FrameId),

    /// Every resident frame is pinned and the free list is empty.
    #[error("no unpinned buffer available")]
    NoUnpinnedBuffer,

    /// A ring was constructed with a strategy kind the engine does not
    /// know how to size.
    #[error("unrecognized strategy kind")]
    UnrecognizedStrategyKind,

    /// `EngineConfig::num_frames` was zero.
    #[error("engine capacity must be non-zero")]
    ZeroCapacity,
}

/// Replacement engine result type.
pub type EngineResult<T> = Result<T, EngineError>;
