//! Payloads of the two projectile pools and the detonation they produce.

use cgmath::{Point3, Vector3};

use super::Pooled;
use crate::engine_state::voxels::atlas::AtlasId;

/// A thrown charge. Its atlas colours the debris of the blast.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Explosive {
    /// Material the charge is made of
    pub atlas: AtlasId,
}

impl Pooled for Explosive {
    const KIND: &'static str = "explosive";
}

/// A fast, flat-flying projectile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Missile;

impl Pooled for Missile {
    const KIND: &'static str = "missile";
}

/// A pooled entity hit solid geometry this frame.
///
/// Returned from `InstancePool::update_frame` instead of firing a callback, so the
/// caller applies the blast after the pool has finished iterating.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Detonation<T> {
    /// Where the entity was once pushed out of the geometry it hit
    pub position: Point3<f32>,
    /// The solid cell that was struck
    pub cell: Point3<i32>,
    /// Unit direction opposing the entity's velocity at impact
    pub direction: Vector3<f32>,
    /// Extent of the box of cells the blast clears
    pub scale: Vector3<u32>,
    /// The entity's payload
    pub payload: T,
    /// Material of the cell that was hit
    pub struck: AtlasId,
}

impl<T> Detonation<T> {
    /// Anchor of the blast box, chosen so the box always contains the struck cell and
    /// is centred on it for odd extents.
    pub fn blast_anchor(&self) -> Point3<f32> {
        let offset = |extent: u32| (extent.saturating_sub(1) / 2) as i32;
        Point3::new(
            (self.cell.x - offset(self.scale.x)) as f32,
            (self.cell.y - offset(self.scale.y)) as f32,
            (self.cell.z - offset(self.scale.z)) as f32,
        )
    }
}
