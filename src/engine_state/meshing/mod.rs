//! Mesh generation for voxel chunks and the edit preview.
//!
//! Chunks are meshed with per-face culling: every side of a solid cell that borders
//! air becomes one quad. The resulting `ChunkMesh` is plain CPU data; uploading it is
//! the renderer's job.
//!
//! # Architecture
//! - [`ChunkMesh`]: geometry of one chunk, split by `BlockSide`
//! - [`Face`]: a single quad of a cell
//! - [`Vertex`]: the `Pod` vertex format shared with the renderer

mod face;
mod mesh;
mod vertex;

pub use face::Face;
pub use mesh::*;
pub use vertex::Vertex;
