//! Error types for the simulation core.
//!
//! Expected gameplay shortfalls (insufficient gold, max-level upgrades,
//! out-of-range indices) are silent no-ops, not errors. Errors are reserved
//! for contract violations that would otherwise corrupt simulation state.

use thiserror::Error;

use crate::pool::UnitHandle;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for the simulation core.
#[derive(Debug, Error)]
pub enum SimError {
    /// A pool handle was released while already on the free list.
    #[error("Double release of pool handle {0:?}")]
    DoubleRelease(UnitHandle),

    /// A pool handle refers to a slot that has since been recycled.
    #[error("Stale pool handle {handle:?}: slot generation is {slot_generation}")]
    StaleHandle {
        /// The offending handle.
        handle: UnitHandle,
        /// Generation currently stored in the slot.
        slot_generation: u32,
    },

    /// A pool handle's slot index is outside the arena.
    #[error("Pool handle {0:?} does not name an allocated slot")]
    UnknownHandle(UnitHandle),

    /// Invalid lane reference.
    #[error("Lane not found: {0}")]
    LaneNotFound(usize),

    /// Invalid simulation state.
    #[error("Invalid simulation state: {0}")]
    InvalidState(String),

    /// Snapshot serialization or deserialization failed.
    #[error("Snapshot codec error: {0}")]
    SnapshotCodec(String),
}
