//! # Collision Cell Module
//!
//! The only point of contact between voxel storage and the physics solver.
//!
//! Every tick the solver asks the grid for the solid cells in the 3×3×3 neighbourhood
//! of a body's position and receives them as axis-aligned boxes. The solver never reads
//! chunk internals, and the query always sees live cell data regardless of whether the
//! chunk meshes are fresh.

use cgmath::{EuclideanSpace, Point3, Vector3};

use super::{atlas::AtlasId, grid::ChunkGrid};

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Point3<f32>,
    /// Maximum corner
    pub max: Point3<f32>,
}

impl Aabb {
    /// Creates a box from its corners.
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Aabb { min, max }
    }

    /// Creates a box from its centre and half extent.
    pub fn from_center(center: Point3<f32>, half_extent: Vector3<f32>) -> Self {
        Aabb {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// The unit box covering an integer cell.
    pub fn unit_cell(cell: Point3<i32>) -> Self {
        let min = Point3::new(cell.x as f32, cell.y as f32, cell.z as f32);
        Aabb {
            min,
            max: min + Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Centre of the box.
    pub fn center(&self) -> Point3<f32> {
        self.min.midpoint(self.max)
    }

    /// Half of the box size along each axis.
    pub fn half_extent(&self) -> Vector3<f32> {
        (self.max - self.min) * 0.5
    }

    /// `true` if the interiors of the two boxes overlap. Touching faces do not count.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// `true` if the point lies inside or on the box.
    pub fn contains(&self, point: Point3<f32>) -> bool {
        (self.min.x..=self.max.x).contains(&point.x)
            && (self.min.y..=self.max.y).contains(&point.y)
            && (self.min.z..=self.max.z).contains(&point.z)
    }
}

/// A solid cell handed to the solver as a static collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionCell {
    /// Integer coordinate of the cell
    pub cell: Point3<i32>,
    /// Material of the cell
    pub atlas: AtlasId,
    /// The box the cell occupies
    pub aabb: Aabb,
}

impl ChunkGrid {
    /// Collects the solid cells in the 3×3×3 neighbourhood of the cell containing
    /// `position` into `out`, replacing its previous contents.
    ///
    /// Taking the buffer from the caller lets the per-tick query reuse one allocation.
    pub fn collision_cells_into(&self, out: &mut Vec<CollisionCell>, position: Point3<f32>) {
        out.clear();
        let center = Self::cell_of(position);
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let cell = center + Vector3::new(dx, dy, dz);
                    if !self.is_solid_cell(cell) {
                        continue;
                    }
                    out.push(CollisionCell {
                        cell,
                        atlas: self.get_cell(cell),
                        aabb: Aabb::unit_cell(cell),
                    });
                }
            }
        }
    }

    /// The boxes of the solid cells around `position`; air contributes nothing.
    pub fn create_collision_cells(&self, position: Point3<f32>) -> Vec<Aabb> {
        let mut cells = Vec::with_capacity(27);
        self.collision_cells_into(&mut cells, position);
        cells.into_iter().map(|c| c.aabb).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;

    fn grid() -> ChunkGrid {
        ChunkGrid::new(&GridConfig {
            world_size: 32,
            chunk_size: 8,
            ..GridConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn single_block_yields_single_box() {
        let mut grid = grid();
        grid.set_geometry(Point3::new(0.5, 0.5, 0.5), Vector3::new(1, 1, 1), 1);

        let boxes = grid.create_collision_cells(Point3::new(0.0, 0.0, 0.0));
        assert_eq!(
            boxes,
            vec![Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))]
        );
    }

    #[test]
    fn empty_neighbourhood_yields_nothing() {
        let grid = grid();
        assert!(grid.create_collision_cells(Point3::new(3.2, -4.7, 0.1)).is_empty());
    }

    #[test]
    fn only_the_neighbourhood_is_reported() {
        let mut grid = grid();
        grid.set_geometry(Point3::new(-2.0, -2.0, -2.0), Vector3::new(5, 5, 5), 2);

        let mut cells = Vec::new();
        grid.collision_cells_into(&mut cells, Point3::new(0.5, 0.5, 0.5));
        assert_eq!(cells.len(), 27);
        assert!(cells.iter().all(|c| c.atlas == 2));
        assert!(cells.iter().all(|c| (-1..=1).contains(&c.cell.x)));

        grid.collision_cells_into(&mut cells, Point3::new(10.5, 10.5, 10.5));
        assert!(cells.is_empty());
    }

    #[test]
    fn negative_positions_use_the_containing_cell() {
        let mut grid = grid();
        grid.set_geometry(Point3::new(-2.0, 0.0, 0.0), Vector3::new(1, 1, 1), 1);

        assert_eq!(grid.create_collision_cells(Point3::new(-0.5, 0.5, 0.5)).len(), 1);
        assert!(grid.create_collision_cells(Point3::new(0.5, 0.5, 0.5)).is_empty());
    }

    #[test]
    fn touching_boxes_do_not_intersect() {
        let a = Aabb::unit_cell(Point3::new(0, 0, 0));
        let b = Aabb::unit_cell(Point3::new(1, 0, 0));
        let c = Aabb::from_center(Point3::new(1.0, 0.5, 0.5), Vector3::new(0.25, 0.25, 0.25));
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c) && b.intersects(&c));
        assert!(a.contains(Point3::new(1.0, 1.0, 1.0)));
        assert_eq!(c.center(), Point3::new(1.0, 0.5, 0.5));
    }
}
