//! Error types
//!
//! Every variant is a configuration error: the caller asked for more than was
//! preallocated or for a degenerate shape. None of them is retried.

use bevy::math::Vec3;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("requested {requested} particles but only {capacity} are preallocated")]
    ParticleCapacityExceeded { requested: u32, capacity: u32 },

    #[error("box {box_size} needs {required} grid cells but only {capacity} are preallocated")]
    GridCapacityExceeded {
        box_size: Vec3,
        required: u64,
        capacity: u32,
    },

    #[error("box size {0} must be finite and strictly positive")]
    InvalidBoxSize(Vec3),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("scan workgroup must have a power-of-two thread count, got {0}")]
    WorkgroupNotPowerOfTwo(u32),

    #[error("scan was prepared for {expected} elements but the buffer holds {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}
