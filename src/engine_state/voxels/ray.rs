//! # Ray Editing Module
//!
//! Voxel traversal used to pick the cell an edit applies to.
//!
//! A ray is marched cell by cell with a 3D DDA: at every step it moves into whichever
//! neighbouring cell its line enters first, so no cell along the ray is skipped and
//! none is visited twice, independent of how long the ray is. Ties (the line passing
//! exactly through an edge or corner) are broken in x, y, z order.
//!
//! Two policies sit on top of the traversal:
//! - `ray_trace_before` picks the last air cell in front of the first solid cell, so an
//!   added block lands against existing geometry instead of inside it. A ray that
//!   starts inside solid geometry has no such cell and yields `None`.
//! - `ray_trace_after` picks the first solid cell, so a removal targets what was hit.
//!
//! Both return the *centre* of the chosen cell and never mutate the grid.

use cgmath::{InnerSpace, Point3, Vector3};

use super::grid::ChunkGrid;
use crate::engine_state::error::{EngineError, EngineResult};

/// Rays shorter than this have no usable direction.
pub const MIN_RAY_LENGTH: f32 = 1e-6;

/// Default cap on the number of cells a trace visits.
pub const DEFAULT_MAX_STEPS: usize = 512;

/// A segment from an eye position toward a target point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    origin: Point3<f32>,
    /// Unit direction
    direction: Vector3<f32>,
    length: f32,
    max_steps: usize,
}

impl Ray {
    /// Creates the ray from `origin` to `target`.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidRay` if the two points (nearly) coincide or are not
    /// finite.
    pub fn new(origin: Point3<f32>, target: Point3<f32>) -> EngineResult<Self> {
        let delta = target - origin;
        let length = delta.magnitude();
        if !length.is_finite() || length < MIN_RAY_LENGTH {
            return Err(EngineError::InvalidRay);
        }
        Ok(Ray {
            origin,
            direction: delta / length,
            length,
            max_steps: DEFAULT_MAX_STEPS,
        })
    }

    /// Caps the number of cells a trace of this ray may visit.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Where the ray starts.
    pub fn origin(&self) -> Point3<f32> {
        self.origin
    }

    /// Unit direction of the ray.
    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    /// Distance from origin to target.
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Where the ray ends.
    pub fn target(&self) -> Point3<f32> {
        self.origin + self.direction * self.length
    }
}

/// Projects a point onto the centre of the cell containing it: `floor(x) + 0.5` per axis.
///
/// Negative coordinates round toward negative infinity, so `-0.2` snaps to `-0.5`.
pub fn snap(point: Point3<f32>) -> Point3<f32> {
    Point3::new(
        point.x.floor() + 0.5,
        point.y.floor() + 0.5,
        point.z.floor() + 0.5,
    )
}

/// Centre of an integer cell.
pub fn cell_center(cell: Point3<i32>) -> Point3<f32> {
    Point3::new(
        cell.x as f32 + 0.5,
        cell.y as f32 + 0.5,
        cell.z as f32 + 0.5,
    )
}

/// The cells of interest found by one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayTrace {
    /// Last air cell visited before `first_solid` (or before the trace ended)
    pub last_air: Option<Point3<i32>>,
    /// First solid cell visited, if any
    pub first_solid: Option<Point3<i32>>,
    /// Last cell visited
    pub end: Point3<i32>,
}

impl ChunkGrid {
    /// Marches `ray` through the grid until it enters a solid cell, passes its target,
    /// leaves the world or runs out of steps.
    pub fn trace(&self, ray: &Ray) -> RayTrace {
        let start = Self::cell_of(ray.origin);
        let mut trace = RayTrace {
            last_air: None,
            first_solid: None,
            end: start,
        };
        if !self.contains_cell(start) {
            return trace;
        }

        let origin = [ray.origin.x, ray.origin.y, ray.origin.z];
        let direction = [ray.direction.x, ray.direction.y, ray.direction.z];
        let mut cell = [start.x, start.y, start.z];
        let mut step = [0i32; 3];
        let mut t_max = [f32::INFINITY; 3];
        let mut t_delta = [f32::INFINITY; 3];

        for axis in 0..3 {
            let d = direction[axis];
            if d > 0.0 {
                step[axis] = 1;
                t_delta[axis] = 1.0 / d;
                t_max[axis] = ((cell[axis] + 1) as f32 - origin[axis]) / d;
            } else if d < 0.0 {
                step[axis] = -1;
                t_delta[axis] = -1.0 / d;
                t_max[axis] = (origin[axis] - cell[axis] as f32) / -d;
            }
        }

        for _ in 0..ray.max_steps {
            let current = Point3::new(cell[0], cell[1], cell[2]);
            trace.end = current;
            if self.is_solid_cell(current) {
                trace.first_solid = Some(current);
                break;
            }
            trace.last_air = Some(current);

            let axis = if t_max[0] <= t_max[1] && t_max[0] <= t_max[2] {
                0
            } else if t_max[1] <= t_max[2] {
                1
            } else {
                2
            };
            if t_max[axis] > ray.length {
                break;
            }
            cell[axis] += step[axis];
            t_max[axis] += t_delta[axis];
            if !self.contains_cell(Point3::new(cell[0], cell[1], cell[2])) {
                break;
            }
        }

        trace
    }

    /// Centre of the cell an *add* along `ray` should fill.
    ///
    /// This is the last air cell before the first solid cell, or the last cell reached
    /// when nothing solid is in range.
    ///
    /// # Returns
    /// `None` if the ray starts inside a solid cell: there is no air in front of the
    /// hit to place into.
    pub fn ray_trace_before(&self, ray: &Ray) -> Option<Point3<f32>> {
        let trace = self.trace(ray);
        let cell = match trace.first_solid {
            Some(_) => trace.last_air?,
            None => trace.end,
        };
        Some(cell_center(cell))
    }

    /// Centre of the cell a *remove* along `ray` should clear: the first solid cell,
    /// or the last cell reached when nothing solid is in range.
    pub fn ray_trace_after(&self, ray: &Ray) -> Point3<f32> {
        let trace = self.trace(ray);
        cell_center(trace.first_solid.unwrap_or(trace.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;

    const EPSILON: f32 = 1e-5;

    fn grid() -> ChunkGrid {
        ChunkGrid::new(&GridConfig {
            world_size: 32,
            chunk_size: 8,
            ..GridConfig::default()
        })
        .unwrap()
    }

    fn assert_point_eq(a: Point3<f32>, b: Point3<f32>) {
        assert!(
            (a - b).magnitude() < EPSILON,
            "expected {:?}, got {:?}",
            b,
            a
        );
    }

    fn place(grid: &mut ChunkGrid, x: i32, y: i32, z: i32) {
        grid.set_geometry(
            Point3::new(x as f32, y as f32, z as f32),
            Vector3::new(1, 1, 1),
            1,
        );
    }

    #[test]
    fn coincident_points_are_an_invalid_ray() {
        let p = Point3::new(1.0, 2.0, 3.0);
        assert!(matches!(Ray::new(p, p), Err(EngineError::InvalidRay)));
        assert!(matches!(
            Ray::new(p, Point3::new(1.0, 2.0, 3.0000001)),
            Err(EngineError::InvalidRay)
        ));
    }

    #[test]
    fn snap_rounds_toward_negative_infinity() {
        assert_point_eq(snap(Point3::new(0.2, 1.0, 2.99)), Point3::new(0.5, 1.5, 2.5));
        assert_point_eq(snap(Point3::new(-0.2, -1.0, -1.01)), Point3::new(-0.5, -0.5, -1.5));
    }

    #[test]
    fn before_and_after_straddle_the_first_solid_cell() {
        let mut grid = grid();
        place(&mut grid, 3, 0, 0);
        place(&mut grid, 5, 0, 0);
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Point3::new(9.5, 0.5, 0.5)).unwrap();

        assert_point_eq(grid.ray_trace_before(&ray).unwrap(), Point3::new(2.5, 0.5, 0.5));
        assert_point_eq(grid.ray_trace_after(&ray), Point3::new(3.5, 0.5, 0.5));
    }

    #[test]
    fn negative_direction_hits_negative_cells() {
        let mut grid = grid();
        place(&mut grid, -3, 0, 0);
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Point3::new(-6.0, 0.5, 0.5)).unwrap();

        assert_point_eq(grid.ray_trace_before(&ray).unwrap(), Point3::new(-1.5, 0.5, 0.5));
        assert_point_eq(grid.ray_trace_after(&ray), Point3::new(-2.5, 0.5, 0.5));
    }

    #[test]
    fn empty_ray_stops_at_its_target() {
        let grid = grid();
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Point3::new(0.5, 0.5, 3.2)).unwrap();

        assert_point_eq(grid.ray_trace_before(&ray).unwrap(), Point3::new(0.5, 0.5, 3.5));
        assert_point_eq(grid.ray_trace_after(&ray), Point3::new(0.5, 0.5, 3.5));
    }

    #[test]
    fn solid_beyond_the_target_is_ignored() {
        let mut grid = grid();
        place(&mut grid, 0, -4, 0);
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Point3::new(0.5, -2.5, 0.5)).unwrap();

        assert!(grid.trace(&ray).first_solid.is_none());
        assert_point_eq(grid.ray_trace_after(&ray), Point3::new(0.5, -2.5, 0.5));
    }

    #[test]
    fn march_stops_at_the_world_boundary() {
        let grid = grid();
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Point3::new(200.0, 0.5, 0.5)).unwrap();
        assert_point_eq(grid.ray_trace_before(&ray).unwrap(), Point3::new(15.5, 0.5, 0.5));
    }

    #[test]
    fn march_is_bounded_by_max_steps() {
        let grid = grid();
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Point3::new(12.5, 0.5, 0.5))
            .unwrap()
            .with_max_steps(3);
        assert_eq!(grid.trace(&ray).end, Point3::new(2, 0, 0));
    }

    #[test]
    fn diagonal_rays_visit_face_adjacent_cells() {
        let mut grid = grid();
        place(&mut grid, 3, 3, 0);
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Point3::new(6.5, 6.5, 0.5)).unwrap();

        let trace = grid.trace(&ray);
        assert_eq!(trace.first_solid, Some(Point3::new(3, 3, 0)));
        // The tie at the shared corner is broken along x first.
        assert_eq!(trace.last_air, Some(Point3::new(3, 2, 0)));
        assert_eq!(grid.trace(&ray), trace);
    }

    #[test]
    fn ray_starting_inside_solid_has_no_placement() {
        let mut grid = grid();
        place(&mut grid, 0, 0, 0);
        place(&mut grid, 1, 0, 0);
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Point3::new(6.5, 0.5, 0.5)).unwrap();

        assert_eq!(grid.ray_trace_before(&ray), None);
        assert_point_eq(grid.ray_trace_after(&ray), Point3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn before_is_never_inside_solid_geometry() {
        let mut grid = grid();
        for (x, y, z) in [(2, 1, 0), (4, 2, 1), (1, 3, 2), (5, 5, 5)] {
            place(&mut grid, x, y, z);
        }
        let eye = Point3::new(0.3, 0.6, 0.1);
        for target in [
            Point3::new(6.0, 3.0, 1.5),
            Point3::new(2.7, 1.2, 0.3),
            Point3::new(1.2, 6.0, 4.0),
            Point3::new(7.0, 7.0, 7.0),
        ] {
            let ray = Ray::new(eye, target).unwrap();
            let before = grid.ray_trace_before(&ray).unwrap();
            assert!(!grid.is_solid_cell(ChunkGrid::cell_of(before)));

            let trace = grid.trace(&ray);
            if let Some(solid) = trace.first_solid {
                assert!(grid.is_solid_cell(solid));
                assert_point_eq(grid.ray_trace_after(&ray), cell_center(solid));
            }
        }
    }
}
