//! # Character Controller
//!
//! The player body and the per-frame bridge that feeds it collision cells.
//!
//! Movement intents become forces: walking is a horizontal force scaled by mass, a
//! jump is a vertical impulse that is refused while the body is already moving
//! vertically. The body is then advanced in a fixed number of sub-steps per frame, each
//! with friction and a fresh collision-cell query, so fast movement cannot tunnel
//! through single-cell geometry.

use cgmath::{InnerSpace, Point3, Vector3};

use super::{body::RigidBody, simulation::PhysicsWorld, BodyHandle};
use crate::config::CharacterConfig;
use crate::engine_state::voxels::{collision::CollisionCell, grid::ChunkGrid};

/// Squared length below which a movement direction is treated as "no movement".
const MIN_DIRECTION_LENGTH2: f32 = 1e-8;

/// The player-controlled body.
pub struct Character {
    body: BodyHandle,
    move_force: f32,
    jump_impulse: f32,
    jump_threshold: f32,
    friction: f32,
    substeps: u32,
    /// Reused collision-cell buffer
    cells: Vec<CollisionCell>,
}

impl Character {
    /// Adds the character body to `physics` at the configured spawn point.
    pub fn new(physics: &mut PhysicsWorld, config: &CharacterConfig, substeps: u32) -> Self {
        let [x, y, z] = config.spawn;
        let [hx, hy, hz] = config.half_extent;
        let body = physics.add_body(RigidBody::new(
            Point3::new(x, y, z),
            Vector3::new(hx, hy, hz),
            config.mass,
        ));
        Character {
            body,
            move_force: config.move_force,
            jump_impulse: config.jump_impulse,
            jump_threshold: config.jump_threshold,
            friction: config.friction,
            substeps: substeps.max(1),
            cells: Vec::with_capacity(27),
        }
    }

    /// Handle of the character body.
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Current position of the character body.
    pub fn position(&self, physics: &PhysicsWorld) -> Option<Point3<f32>> {
        physics.position(self.body)
    }

    /// Current velocity of the character body.
    pub fn velocity(&self, physics: &PhysicsWorld) -> Option<Vector3<f32>> {
        physics.body(self.body).map(|body| body.velocity)
    }

    /// Pushes the character along the horizontal part of `direction`.
    ///
    /// The direction is projected onto the xz plane and normalized, so looking up or
    /// down never changes vertical speed. A (near) zero direction does nothing.
    pub fn character_move(&self, physics: &mut PhysicsWorld, direction: Vector3<f32>) {
        let horizontal = Vector3::new(direction.x, 0.0, direction.z);
        if horizontal.magnitude2() < MIN_DIRECTION_LENGTH2 {
            return;
        }
        let move_force = self.move_force;
        if let Some(body) = physics.body_mut(self.body) {
            let force = horizontal.normalize() * move_force * body.mass;
            body.apply_force(force);
        }
    }

    /// Makes the character jump if it is not already moving vertically.
    ///
    /// # Returns
    /// `true` if the impulse was applied.
    pub fn character_jump(&self, physics: &mut PhysicsWorld) -> bool {
        let (jump_impulse, jump_threshold) = (self.jump_impulse, self.jump_threshold);
        match physics.body_mut(self.body) {
            Some(body) if body.velocity.y.abs() < jump_threshold => {
                let impulse = Vector3::new(0.0, jump_impulse * body.mass, 0.0);
                body.apply_impulse(impulse);
                true
            }
            _ => false,
        }
    }

    /// Advances the character by one frame of `dt` seconds against the live cells of
    /// `grid`.
    pub fn update(&mut self, physics: &mut PhysicsWorld, grid: &ChunkGrid, dt: f32) {
        let sub_dt = dt / self.substeps as f32;
        let friction = self.friction;

        for _ in 0..self.substeps {
            let Some(body) = physics.body_mut(self.body) else {
                return;
            };
            let drag = Vector3::new(-body.velocity.x, 0.0, -body.velocity.z) * friction * body.mass;
            body.apply_force(drag);
            let position = body.position;

            grid.collision_cells_into(&mut self.cells, position);
            physics.solve_static(self.body, &self.cells, sub_dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GridConfig, PhysicsConfig};

    const FRAME: f32 = 1.0 / 60.0;

    fn setup() -> (ChunkGrid, PhysicsWorld, Character) {
        let mut grid = ChunkGrid::new(&GridConfig {
            world_size: 32,
            chunk_size: 8,
            ..GridConfig::default()
        })
        .unwrap();
        grid.set_geometry(Point3::new(-3.0, 0.0, -3.0), Vector3::new(7, 1, 7), 1);

        let mut physics = PhysicsWorld::new(&PhysicsConfig::default());
        let config = CharacterConfig {
            spawn: [0.5, 1.95, 0.5],
            ..CharacterConfig::default()
        };
        let character = Character::new(&mut physics, &config, 10);
        (grid, physics, character)
    }

    #[test]
    fn character_rests_on_the_floor() {
        let (grid, mut physics, mut character) = setup();
        for _ in 0..120 {
            character.update(&mut physics, &grid, FRAME);
        }
        let position = character.position(&physics).unwrap();
        assert!((position.y - 1.95).abs() < 0.01, "y = {}", position.y);
        assert!(character.velocity(&physics).unwrap().y.abs() < 1.0);
    }

    #[test]
    fn jump_is_refused_while_moving_vertically() {
        let (grid, mut physics, mut character) = setup();
        for _ in 0..10 {
            character.update(&mut physics, &grid, FRAME);
        }

        assert!(character.character_jump(&mut physics));
        let vy = character.velocity(&physics).unwrap().y;
        assert!(vy > 1.0);

        assert!(!character.character_jump(&mut physics));
        assert_eq!(character.velocity(&physics).unwrap().y, vy);

        character.update(&mut physics, &grid, FRAME);
        assert!(character.position(&physics).unwrap().y > 1.95);
    }

    #[test]
    fn movement_is_horizontal_only() {
        let (grid, mut physics, mut character) = setup();
        for _ in 0..10 {
            character.update(&mut physics, &grid, FRAME);
        }
        let start = character.position(&physics).unwrap();

        for _ in 0..20 {
            character.character_move(&mut physics, Vector3::new(0.0, 5.0, 3.0));
            character.update(&mut physics, &grid, FRAME);
        }
        let end = character.position(&physics).unwrap();
        assert!(end.z > start.z + 0.05);
        assert!((end.x - start.x).abs() < 1e-4);
        assert!((end.y - start.y).abs() < 0.01);
    }

    #[test]
    fn zero_direction_applies_no_force() {
        let (_grid, mut physics, character) = setup();
        character.character_move(&mut physics, Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(
            physics.body(character.body()).unwrap().force,
            Vector3::new(0.0, 0.0, 0.0)
        );
    }

    #[test]
    fn friction_slows_horizontal_motion() {
        let (grid, mut physics, mut character) = setup();
        physics.body_mut(character.body()).unwrap().velocity.x = 2.0;
        for _ in 0..30 {
            character.update(&mut physics, &grid, FRAME);
        }
        let vx = character.velocity(&physics).unwrap().x;
        assert!(vx > 0.0 && vx < 1.0, "vx = {}", vx);
    }
}
