//! # Chunk Module
//!
//! This module provides the `VoxelChunk` struct: a fixed-size cube of material ids
//! together with the triangle mesh derived from it.
//!
//! ## Storage
//!
//! A chunk stores two views of the same data:
//! - `cells`: one `AtlasId` (signed byte) per cell, `AIR` for empty cells. This is the
//!   complete serialization unit; nothing else needs saving.
//! - `solid_mask`: a bit vector (1 bit per cell) mirrored from `cells`, used for the
//!   hot solidity checks done by meshing, ray traversal and collision queries.
//!
//! Cells are laid out x-fastest, then y, then z:
//! `index = x + size * y + size² * z`.
//!
//! ## Mesh Freshness
//!
//! Every change to a cell sets the `dirty` flag. While a chunk is dirty its mesh is
//! not handed out (`mesh()` returns `None`); `regenerate_mesh()` is the only writer of
//! the mesh and the only way to clear the flag.

use bitvec::prelude::BitVec;
use cgmath::{EuclideanSpace, Point3};
use log::trace;
use serde::{Deserialize, Serialize};
use web_time::Instant;

use chunk_iteration::SolidCellIterator;

use super::atlas::{is_solid, AtlasId, AIR};
use crate::engine_state::meshing::ChunkMesh;

mod chunk_creation;
pub mod chunk_iteration;

pub use chunk_creation::GenerationMethod;

/// A fixed-size cube of voxel cells, the unit of storage, streaming and meshing.
#[derive(Debug, Clone)]
pub struct VoxelChunk {
    /// Position of this chunk in chunk coordinates (not cell coordinates).
    origin: Point3<i32>,
    /// Edge length in cells.
    size: i32,
    /// Material id of every cell, `AIR` for empty cells.
    cells: Vec<AtlasId>,
    /// One bit per cell, set when the cell is solid.
    solid_mask: BitVec,
    /// Geometry derived from `cells`; stale while `dirty` is set.
    mesh: ChunkMesh,
    /// Set whenever a cell changes, cleared by `regenerate_mesh`.
    dirty: bool,
}

/// The raw per-chunk material array handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSnapshot {
    /// Chunk coordinate of the saved chunk
    pub origin: [i32; 3],
    /// Edge length of the saved chunk
    pub size: i32,
    /// Cell material ids in storage order
    pub cells: Vec<AtlasId>,
}

impl VoxelChunk {
    /// Creates a chunk filled with air.
    ///
    /// # Arguments
    /// * `origin` - The chunk coordinates of the new chunk
    /// * `size` - Edge length of the chunk in cells
    pub fn new(origin: Point3<i32>, size: i32) -> Self {
        let volume = Self::volume(size);
        Self::from_cells(origin, size, vec![AIR; volume])
    }

    /// Creates a chunk from an existing cell array.
    ///
    /// # Panics
    /// Panics if `cells` does not hold exactly `size³` entries.
    pub fn from_cells(origin: Point3<i32>, size: i32, cells: Vec<AtlasId>) -> Self {
        assert_eq!(
            cells.len(),
            Self::volume(size),
            "chunk cell array has the wrong length"
        );
        let solid_mask = cells.iter().map(|&id| is_solid(id)).collect::<BitVec>();
        VoxelChunk {
            origin,
            size,
            cells,
            solid_mask,
            mesh: ChunkMesh::new(),
            dirty: true,
        }
    }

    /// Rebuilds a chunk from a persisted snapshot.
    pub fn from_snapshot(snapshot: ChunkSnapshot) -> Self {
        let [x, y, z] = snapshot.origin;
        Self::from_cells(Point3::new(x, y, z), snapshot.size, snapshot.cells)
    }

    fn volume(size: i32) -> usize {
        assert!(size > 0, "chunk size must be positive");
        (size * size * size) as usize
    }

    /// Chunk coordinate of this chunk.
    pub fn origin(&self) -> Point3<i32> {
        self.origin
    }

    /// Edge length in cells.
    pub fn size(&self) -> i32 {
        self.size
    }

    /// World cell coordinate of this chunk's minimum corner.
    pub fn world_min(&self) -> Point3<i32> {
        Point3::from_vec(self.origin.to_vec() * self.size)
    }

    /// The raw cell array.
    pub fn cells(&self) -> &[AtlasId] {
        &self.cells
    }

    /// The raw cell array viewed as bytes, for the persistence collaborator.
    pub fn cell_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }

    /// Copies the cell array out for saving.
    pub fn snapshot(&self) -> ChunkSnapshot {
        ChunkSnapshot {
            origin: [self.origin.x, self.origin.y, self.origin.z],
            size: self.size,
            cells: self.cells.clone(),
        }
    }

    /// Converts a chunk-local coordinate to a storage index.
    ///
    /// # Panics
    /// Panics if the coordinate lies outside the chunk. Local coordinates are always
    /// derived from validated world coordinates, so this is an invariant violation.
    pub fn local_index(&self, local: Point3<i32>) -> usize {
        assert!(
            self.contains_local(local),
            "local coordinate {:?} outside chunk of size {}",
            local,
            self.size
        );
        (local.x + self.size * local.y + self.size * self.size * local.z) as usize
    }

    /// Inverse of `local_index`.
    pub fn local_from_index(&self, index: usize) -> Point3<i32> {
        let index = index as i32;
        let plane = self.size * self.size;
        Point3::new(index % self.size, (index % plane) / self.size, index / plane)
    }

    /// `true` if the local coordinate addresses a cell of this chunk.
    pub fn contains_local(&self, local: Point3<i32>) -> bool {
        (0..self.size).contains(&local.x)
            && (0..self.size).contains(&local.y)
            && (0..self.size).contains(&local.z)
    }

    /// Material of the cell at a local coordinate.
    pub fn get(&self, local: Point3<i32>) -> AtlasId {
        self.cells[self.local_index(local)]
    }

    /// `true` if the cell at a local coordinate is solid.
    pub fn is_solid(&self, local: Point3<i32>) -> bool {
        self.solid_mask[self.local_index(local)]
    }

    /// Writes a material into a cell.
    ///
    /// # Returns
    /// `true` if the cell changed. Writing the value a cell already holds is a no-op and
    /// leaves the dirty flag untouched.
    pub fn set(&mut self, local: Point3<i32>, id: AtlasId) -> bool {
        let index = self.local_index(local);
        if self.cells[index] == id {
            return false;
        }
        self.cells[index] = id;
        self.solid_mask.set(index, is_solid(id));
        self.dirty = true;
        true
    }

    /// Number of solid cells in the chunk.
    pub fn solid_count(&self) -> usize {
        self.solid_mask.count_ones()
    }

    /// Iterates over every solid cell as `(local coordinate, material)`.
    pub fn iter_solid(&self) -> SolidCellIterator<'_> {
        SolidCellIterator::new(self)
    }

    pub(crate) fn solid_mask(&self) -> &BitVec {
        &self.solid_mask
    }

    /// `true` if cells changed since the mesh was last regenerated.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The chunk mesh, or `None` while it is stale.
    pub fn mesh(&self) -> Option<&ChunkMesh> {
        if self.dirty {
            None
        } else {
            Some(&self.mesh)
        }
    }

    /// Rebuilds the mesh from the current cells and clears the dirty flag.
    pub fn regenerate_mesh(&mut self) -> &ChunkMesh {
        let start = Instant::now();
        self.mesh = ChunkMesh::from_chunk(self);
        self.dirty = false;
        trace!(
            "Meshed chunk {:?}: {} faces in {:?}",
            self.origin,
            self.mesh.face_count(),
            start.elapsed()
        );
        &self.mesh
    }
}
