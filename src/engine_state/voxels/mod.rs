//! # Voxel Storage
//!
//! Chunked voxel storage and the queries built on it.
//!
//! ## Architecture
//!
//! * **Atlas**: the per-cell material id and the named materials
//! * **Chunk**: a fixed-size cube of cells with its derived mesh and solid mask
//! * **Grid**: the sparse chunk map, view streaming and edit-mode state
//! * **Streaming**: visible-set bookkeeping and LRU-bounded eviction candidates
//! * **Ray**: DDA traversal and the add/remove snapping policies
//! * **Collision**: the 3×3×3 collision-cell query feeding the solver
//!
//! ## Data Flow
//!
//! 1. Edits and streaming write cells through the `ChunkGrid`
//! 2. Every changed chunk is marked dirty
//! 3. Dirty chunks in view regenerate their meshes before the renderer reads them
//! 4. Physics and ray queries always read live cells, never meshes

pub mod atlas;
pub mod block_side;
pub mod chunk;
pub mod collision;
pub mod grid;
pub mod ray;
pub mod streaming;
