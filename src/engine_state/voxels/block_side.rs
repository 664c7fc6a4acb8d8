//! # Block Side Module
//!
//! The six faces of a voxel cell, used to group mesh geometry and to look up
//! neighbouring cells during face culling.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel cell.
///
/// The discriminant doubles as the index of the face's geometry inside a `ChunkMesh`.
///
/// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The face pointing towards negative X
    FRONT = 0,

    /// The face pointing towards positive X
    BACK = 1,

    /// The face pointing towards negative Y
    BOTTOM = 2,

    /// The face pointing towards positive Y
    TOP = 3,

    /// The face pointing towards negative Z
    LEFT = 4,

    /// The face pointing towards positive Z
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six faces in discriminant order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// Offset from a cell to the neighbour that covers this face.
    pub fn normal(self) -> Vector3<i32> {
        match self {
            BlockSide::FRONT => Vector3::new(-1, 0, 0),
            BlockSide::BACK => Vector3::new(1, 0, 0),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::LEFT => Vector3::new(0, 0, -1),
            BlockSide::RIGHT => Vector3::new(0, 0, 1),
        }
    }
}
