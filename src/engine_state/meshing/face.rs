use cgmath::Point3;

use crate::engine_state::voxels::{atlas::AtlasId, block_side::BlockSide};

/// Represents a single quad face of a voxel cell.
///
/// A face is defined by four corner points (lower-left, lower-right, upper-right, upper-left)
/// in world cell coordinates, the material of the cell it belongs to and the side it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Lower-right corner of the face
    pub lr: Point3<i32>,
    /// Lower-left corner of the face
    pub ll: Point3<i32>,
    /// Upper-right corner of the face
    pub ur: Point3<i32>,
    /// Upper-left corner of the face
    pub ul: Point3<i32>,
    /// Material of the cell, used for texture mapping
    pub atlas: AtlasId,
    /// Which side of the cell this face covers
    pub block_side: BlockSide,
}

impl Face {
    /// Creates the face of the unit cell whose minimum corner is `cell`.
    ///
    /// Corners are wound counter-clockwise when seen from outside the cell.
    pub fn new(cell: Point3<i32>, atlas: AtlasId, block_side: BlockSide) -> Self {
        let (i, j, k) = (cell.x, cell.y, cell.z);
        match block_side {
            BlockSide::FRONT => Face {
                ll: Point3::new(i, j, k),
                lr: Point3::new(i, j, k + 1),
                ul: Point3::new(i, j + 1, k),
                ur: Point3::new(i, j + 1, k + 1),
                atlas,
                block_side,
            },

            BlockSide::BACK => Face {
                ll: Point3::new(i + 1, j, k + 1),
                lr: Point3::new(i + 1, j, k),
                ul: Point3::new(i + 1, j + 1, k + 1),
                ur: Point3::new(i + 1, j + 1, k),
                atlas,
                block_side,
            },

            BlockSide::BOTTOM => Face {
                ll: Point3::new(i, j, k + 1),
                lr: Point3::new(i, j, k),
                ul: Point3::new(i + 1, j, k + 1),
                ur: Point3::new(i + 1, j, k),
                atlas,
                block_side,
            },

            BlockSide::TOP => Face {
                ll: Point3::new(i, j + 1, k),
                lr: Point3::new(i, j + 1, k + 1),
                ul: Point3::new(i + 1, j + 1, k),
                ur: Point3::new(i + 1, j + 1, k + 1),
                atlas,
                block_side,
            },

            BlockSide::LEFT => Face {
                ll: Point3::new(i + 1, j, k),
                lr: Point3::new(i, j, k),
                ul: Point3::new(i + 1, j + 1, k),
                ur: Point3::new(i, j + 1, k),
                atlas,
                block_side,
            },

            BlockSide::RIGHT => Face {
                ll: Point3::new(i, j, k + 1),
                lr: Point3::new(i + 1, j, k + 1),
                ul: Point3::new(i, j + 1, k + 1),
                ur: Point3::new(i + 1, j + 1, k + 1),
                atlas,
                block_side,
            },
        }
    }

    /// The four corners in vertex order (ll, lr, ul, ur).
    pub fn corners(&self) -> [Point3<i32>; 4] {
        [self.ll, self.lr, self.ul, self.ur]
    }
}
