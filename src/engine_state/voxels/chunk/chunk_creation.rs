//! # Chunk Creation Module
//!
//! Generators used when a chunk is streamed in around the viewer.
//!
//! Chunks created by edits (`ChunkGrid::get_or_create_chunk`) always start as air;
//! the generators here only fill chunks entering the view radius for the first time.

use cgmath::Point3;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use super::VoxelChunk;
use crate::engine_state::voxels::atlas::{Atlas, AtlasId, AIR};

/// Threshold above which Perlin noise is considered solid for terrain generation.
pub const PERLIN_POSITIVE_THRESHOLD: f64 = 0.2;
/// Threshold below which Perlin noise is considered solid for terrain generation.
pub const PERLIN_NEGATIVE_THRESHOLD: f64 = -0.2;
/// Scaling factor applied to world coordinates when sampling Perlin noise.
pub const PERLIN_SCALE_FACTOR: f64 = 0.02;

/// How a streamed-in chunk is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMethod {
    /// Every cell is air
    #[default]
    Empty,
    /// Every cell is stone
    Solid,
    /// Alternating stone and air in all three axes
    Checkerboard,
    /// Sparse random solids
    Random,
    /// Caves and overhangs from 3D Perlin noise
    Perlin,
}

impl VoxelChunk {
    /// Creates a chunk filled by the given generator.
    ///
    /// # Arguments
    /// * `origin` - The chunk coordinates of the new chunk
    /// * `size` - Edge length of the chunk in cells
    /// * `method` - How to fill it
    pub fn generate(origin: Point3<i32>, size: i32, method: GenerationMethod) -> Self {
        match method {
            GenerationMethod::Empty => Self::new(origin, size),
            GenerationMethod::Solid => Self::fill_with(origin, size, |_| Atlas::STONE.id()),
            GenerationMethod::Checkerboard => Self::fill_with(origin, size, |p| {
                if (p.x + p.y + p.z).rem_euclid(2) == 0 {
                    Atlas::STONE.id()
                } else {
                    AIR
                }
            }),
            GenerationMethod::Random => {
                let sparseness = 0.9;
                Self::fill_with(origin, size, |_| {
                    if fastrand::f64() < sparseness {
                        AIR
                    } else {
                        Atlas::random().id()
                    }
                })
            }
            GenerationMethod::Perlin => {
                let perlin = Perlin::new(0);
                Self::fill_with(origin, size, |p| {
                    let sample = perlin.get(to_perlin_pos(p, PERLIN_SCALE_FACTOR));
                    if (PERLIN_NEGATIVE_THRESHOLD..=PERLIN_POSITIVE_THRESHOLD).contains(&sample) {
                        AIR
                    } else {
                        Atlas::random().id()
                    }
                })
            }
        }
    }

    /// Builds a chunk by evaluating `f` at the world cell coordinate of every cell,
    /// in storage order.
    fn fill_with(origin: Point3<i32>, size: i32, mut f: impl FnMut(Point3<i32>) -> AtlasId) -> Self {
        let mut cells = Vec::with_capacity((size * size * size) as usize);
        for k in 0..size {
            for j in 0..size {
                for i in 0..size {
                    cells.push(f(Point3::new(
                        i + size * origin.x,
                        j + size * origin.y,
                        k + size * origin.z,
                    )));
                }
            }
        }
        Self::from_cells(origin, size, cells)
    }
}

/// Converts a world cell coordinate to a scaled Perlin sample position.
fn to_perlin_pos(pos: Point3<i32>, scale_factor: f64) -> [f64; 3] {
    [
        pos.x as f64 * scale_factor,
        pos.y as f64 * scale_factor,
        pos.z as f64 * scale_factor,
    ]
}
