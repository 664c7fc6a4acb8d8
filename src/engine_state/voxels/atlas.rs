//! # Atlas Module
//!
//! Material ("atlas") ids stored in every voxel cell.
//!
//! A cell holds a single signed byte. Non-negative values index the texture atlas;
//! `AIR` (`-1`) marks an empty cell. The well-known materials are listed in `Atlas`,
//! but any non-negative id is a valid solid material.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// The compact per-cell material id.
pub type AtlasId = i8;

/// Sentinel id for an empty cell.
pub const AIR: AtlasId = -1;

/// Number of texture rows in the atlas; ids wrap onto this when picking textures.
pub const ATLAS_TEXTURE_COUNT: usize = 8;

/// Named materials of the texture atlas.
///
/// The discriminants are the ids written into chunk cells.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum Atlas {
    /// Grass-topped soil
    GRASS = 0,
    /// Grey stone
    STONE = 1,
    /// Loose sand
    SAND = 2,
    /// Tree bark
    WOOD = 3,
    /// Dark mineral used by explosives
    IRON = 4,
    /// Reactive mineral
    SODIUM = 5,
    /// Plain white, used for tests and markers
    WHITE = 6,
}

impl Atlas {
    /// Looks up the named material for a cell id, if it has one.
    pub fn from_id(id: AtlasId) -> Option<Self> {
        FromPrimitive::from_i8(id)
    }

    /// The id written into chunk cells for this material.
    pub fn id(self) -> AtlasId {
        self as AtlasId
    }

    /// Picks a random solid material, used by the random and Perlin generators.
    pub fn random() -> Self {
        FromPrimitive::from_u8(fastrand::u8(0..4)).unwrap_or(Atlas::STONE)
    }
}

/// `true` if the id marks a solid cell.
#[inline]
pub fn is_solid(id: AtlasId) -> bool {
    id >= 0
}

/// Texture row used by every face of a cell with the given material.
///
/// # Panics
/// Panics when called with `AIR`: air has no faces.
pub fn texture_index(id: AtlasId) -> usize {
    assert!(is_solid(id), "air has no texture");
    id as usize % ATLAS_TEXTURE_COUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_materials_round_trip_through_ids() {
        for atlas in [Atlas::GRASS, Atlas::STONE, Atlas::SAND, Atlas::WOOD, Atlas::WHITE] {
            assert_eq!(Atlas::from_id(atlas.id()), Some(atlas));
        }
        assert_eq!(Atlas::from_id(AIR), None);
        assert_eq!(Atlas::from_id(100), None);
    }

    #[test]
    fn air_is_the_only_non_solid_id() {
        assert!(!is_solid(AIR));
        assert!(is_solid(0));
        assert!(is_solid(i8::MAX));
    }

    #[test]
    fn random_material_is_solid() {
        for _ in 0..32 {
            assert!(is_solid(Atlas::random().id()));
        }
    }
}
