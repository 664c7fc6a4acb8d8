//! # Chunk Iteration Module
//!
//! An iterator over the solid cells of a chunk that skips air using the chunk's
//! solid mask instead of inspecting every material id.

use cgmath::Point3;

use super::VoxelChunk;
use crate::engine_state::voxels::atlas::AtlasId;

/// Iterates over every solid cell of a chunk as `(local coordinate, material)`,
/// in storage order.
pub struct SolidCellIterator<'a> {
    /// Reference to the chunk being iterated over
    chunk_ref: &'a VoxelChunk,
    /// Next storage index to scan from
    cursor: usize,
}

impl<'a> SolidCellIterator<'a> {
    /// Creates an iterator positioned before the first cell of `chunk_ref`.
    pub fn new(chunk_ref: &'a VoxelChunk) -> Self {
        SolidCellIterator {
            chunk_ref,
            cursor: 0,
        }
    }
}

impl Iterator for SolidCellIterator<'_> {
    type Item = (Point3<i32>, AtlasId);

    fn next(&mut self) -> Option<Self::Item> {
        let mask = self.chunk_ref.solid_mask();
        if self.cursor >= mask.len() {
            return None;
        }

        // Jump straight to the next set bit
        let index = self.cursor + mask[self.cursor..].first_one()?;
        self.cursor = index + 1;

        Some((
            self.chunk_ref.local_from_index(index),
            self.chunk_ref.cells()[index],
        ))
    }
}
