//! # Engine Errors
//!
//! Every recoverable and fatal condition the terrain engine reports.
//!
//! Not everything that "does nothing" is an error: an edit that touches only cells
//! already holding the requested material is reported as a changed-cell count of zero,
//! never as an `Err`.

use cgmath::Point3;
use thiserror::Error;

/// Errors raised by the voxel grid, ray editor, physics bridge and instance pools.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine was configured with values that cannot describe a valid world.
    ///
    /// This is fatal: initialization must abort.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A ray was built from two (nearly) coincident points, so it has no direction.
    ///
    /// Callers should skip the edit for this frame.
    #[error("invalid ray: direction magnitude is too close to zero")]
    InvalidRay,

    /// A chunk was requested for reading but is not resident.
    #[error("chunk {0:?} is not loaded")]
    NotFound(Point3<i32>),

    /// A pool was asked to launch an entity while already full.
    #[error("instance pool exhausted (capacity {capacity})")]
    PoolExhausted {
        /// The configured capacity of the exhausted pool
        capacity: usize,
    },

    /// The configuration file could not be read.
    #[error("could not read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// The configuration file is not valid JSON for `EngineConfig`.
    #[error("could not parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Shorthand result type used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;
