//! # Engine State Module
//!
//! The frame-stepped core of the terrain engine.
//!
//! ## Key Components
//!
//! * `EngineState` - Owns the grid, the physics world, the character and both pools
//! * `voxels` - Chunk storage, streaming, ray editing and collision-cell queries
//! * `meshing` - Face-culled chunk meshes and the edit preview
//! * `physics` - Body arena, static solver and character controller
//! * `pool` - Fixed-capacity projectile pools
//!
//! ## Frame Order
//!
//! One call to `EngineState::frame` runs these steps, in order:
//!
//! 1. Edit-mode changes (material, scale), then ray edits (add/remove)
//! 2. Projectile launches
//! 3. Character movement and jump intents
//! 4. Viewer update: stream chunks, regenerate meshes on a boundary crossing, evict
//! 5. Character sub-steps against the live cells
//! 6. Projectile integration; detonations clear their blast boxes
//! 7. Cosmetic projectile rotation
//! 8. Mesh regeneration for chunks dirtied this frame
//!
//! Edits are applied before any collision query of the same frame, so movement always
//! resolves against the world as just edited.

use std::collections::HashSet;

use cgmath::{InnerSpace, Point3, Vector3};
use log::{debug, info};

use crate::config::{EngineConfig, RayConfig};
use error::EngineResult;
use physics::{Character, PhysicsWorld};
use pool::{Detonation, Explosive, InstanceIndex, InstancePool, Missile};
use voxels::{
    atlas::{AtlasId, AIR},
    chunk::ChunkSnapshot,
    grid::ChunkGrid,
    ray::{snap, Ray},
    streaming::ViewChange,
};

pub mod error;
pub mod meshing;
pub mod physics;
pub mod pool;
pub mod voxels;

/// Height of the eye above the character body centre.
const EYE_HEIGHT: f32 = 1.0;

/// Edge length of the pocket carved around the spawn point at start-up.
const SPAWN_POCKET: u32 = 3;

/// Something visible or audible happened at a position: cells were removed by an
/// edit or a blast. Consumed by the external particle and sound collaborators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditEffect {
    /// Where it happened
    pub position: Point3<f32>,
    /// Direction debris should fly in
    pub direction: Vector3<f32>,
    /// Material of the removed cells
    pub atlas: AtlasId,
    /// Number of cells removed
    pub cells: usize,
}

/// The intents driving one frame, produced by the external input layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerAction {
    /// Desired walking direction in world space; only its horizontal part is used
    pub move_direction: Vector3<f32>,
    /// Unit view direction, used for ray edits and launches
    pub look: Vector3<f32>,
    /// Jump this frame
    pub jump: bool,
    /// Place the selected material under the crosshair
    pub add_block: bool,
    /// Remove the block under the crosshair
    pub remove_block: bool,
    /// Throw an explosive made of this material
    pub launch_explosive: Option<AtlasId>,
    /// Fire a missile
    pub launch_missile: bool,
    /// Select a new material for adds
    pub select_atlas: Option<AtlasId>,
    /// Per-axis change of the edit extent
    pub scale_delta: Vector3<i32>,
    /// Return the edit extent to one cell
    pub reset_scale: bool,
}

impl Default for PlayerAction {
    fn default() -> Self {
        PlayerAction {
            move_direction: Vector3::new(0.0, 0.0, 0.0),
            look: Vector3::new(0.0, 0.0, -1.0),
            jump: false,
            add_block: false,
            remove_block: false,
            launch_explosive: None,
            launch_missile: false,
            select_atlas: None,
            scale_delta: Vector3::new(0, 0, 0),
            reset_scale: false,
        }
    }
}

/// What happened during one frame.
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Cells changed by ray edits and blasts
    pub edited_cells: usize,
    /// Effects for the particle and sound collaborators
    pub effects: Vec<EditEffect>,
    /// The viewer crossed into another chunk
    pub view_change: Option<ViewChange>,
    /// Chunk meshes regenerated
    pub meshes_rebuilt: usize,
    /// Chunks evicted this frame, for persistence
    pub evicted: Vec<ChunkSnapshot>,
    /// Explosives that hit geometry
    pub explosive_detonations: Vec<Detonation<Explosive>>,
    /// Missiles that hit geometry
    pub missile_detonations: Vec<Detonation<Missile>>,
    /// The character jumped
    pub jumped: bool,
    /// Launch requests refused because a pool was full
    pub launch_failures: usize,
}

/// The main state container for the terrain engine.
///
/// The grid is exclusively owned here; collaborators read it through the query
/// methods and mutate it only through the edit entry points.
pub struct EngineState {
    /// Voxel storage, streaming and edit-mode state
    pub grid: ChunkGrid,
    /// Every rigid body
    pub physics: PhysicsWorld,
    /// The player body
    pub character: Character,
    /// Thrown explosives
    pub explosives: InstancePool<Explosive>,
    /// Fired missiles
    pub missiles: InstancePool<Missile>,
    ray_config: RayConfig,
    /// Effects produced outside `frame`, handed out by the next report
    pending_effects: Vec<EditEffect>,
    frame_index: u64,
}

impl EngineState {
    /// Creates the engine from a configuration.
    ///
    /// The chunks around the spawn point are streamed in and a pocket is carved around
    /// the character so it never starts inside generated terrain.
    ///
    /// # Errors
    /// Returns `EngineError::Configuration` if the configuration is invalid.
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let mut grid = ChunkGrid::new(&config.grid)?;
        let mut physics = PhysicsWorld::new(&config.physics);
        let character = Character::new(&mut physics, &config.character, config.physics.substeps);
        let explosives = InstancePool::new(&config.explosives);
        let missiles = InstancePool::new(&config.missiles);

        let [x, y, z] = config.character.spawn;
        let spawn = Point3::new(x, y, z);
        grid.update(spawn);
        let carved = grid.set_geometry(
            spawn - Vector3::new(1.0, 2.0, 1.0),
            Vector3::new(SPAWN_POCKET, SPAWN_POCKET, SPAWN_POCKET),
            AIR,
        );
        let rebuilt = grid.refresh_view_meshes();
        info!(
            "Engine ready: spawn {:?}, {} cells carved, {} chunk meshes built",
            spawn, carved, rebuilt
        );

        Ok(EngineState {
            grid,
            physics,
            character,
            explosives,
            missiles,
            ray_config: config.ray.clone(),
            pending_effects: Vec::new(),
            frame_index: 0,
        })
    }

    /// Number of frames stepped so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Position of the character body.
    pub fn character_position(&self) -> Point3<f32> {
        self.character
            .position(&self.physics)
            .unwrap_or_else(|| Point3::new(0.0, 0.0, 0.0))
    }

    /// Where the viewer's eye is.
    pub fn eye_position(&self) -> Point3<f32> {
        self.character_position() + Vector3::new(0.0, EYE_HEIGHT, 0.0)
    }

    /// The ray from the eye along `look`, as long as the configured reach.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidRay` if `look` has no length.
    pub fn edit_ray(&self, look: Vector3<f32>) -> EngineResult<Ray> {
        let eye = self.eye_position();
        let target = if look.magnitude2() > 0.0 {
            eye + look.normalize() * self.ray_config.reach
        } else {
            eye
        };
        Ok(Ray::new(eye, target)?.with_max_steps(self.ray_config.max_steps))
    }

    /// Fills the cell in front of the first solid cell along `ray` with the selected
    /// material and extent.
    ///
    /// # Returns
    /// The number of cells changed; zero if the ray starts inside solid geometry.
    pub fn add_block(&mut self, ray: &Ray) -> usize {
        match self.grid.ray_trace_before(ray) {
            Some(target) => self.add_block_at(target),
            None => {
                debug!("No air in front of the ray origin, nothing to add");
                0
            }
        }
    }

    /// Clears the first solid cell along `ray` with the selected extent.
    ///
    /// # Returns
    /// The number of cells changed.
    pub fn remove_block(&mut self, ray: &Ray) -> usize {
        let target = self.grid.ray_trace_after(ray);
        self.remove_block_at(target, -ray.direction())
    }

    /// Fills the box anchored at the cell containing `point` with the selected material.
    pub fn add_block_at(&mut self, point: Point3<f32>) -> usize {
        let (atlas, scale) = (self.grid.atlas_id(), self.grid.scale());
        self.grid.set_geometry(snap(point), scale, atlas)
    }

    /// Clears the box anchored at the cell containing `point`.
    ///
    /// A removal that changed anything queues an `EditEffect` with debris flying along
    /// `direction`. A removal that changed nothing has no effect at all.
    pub fn remove_block_at(&mut self, point: Point3<f32>, direction: Vector3<f32>) -> usize {
        let point = snap(point);
        let atlas = self.grid.material_at(point);
        let changed = self.grid.set_geometry(point, self.grid.scale(), AIR);
        if changed > 0 {
            self.pending_effects.push(EditEffect {
                position: point,
                direction,
                atlas,
                cells: changed,
            });
        }
        changed
    }

    /// Throws an explosive from the eye along `look`.
    ///
    /// # Errors
    /// Returns `EngineError::PoolExhausted` if every explosive is already live.
    pub fn launch_explosive(&mut self, look: Vector3<f32>, atlas: AtlasId) -> EngineResult<InstanceIndex> {
        let eye = self.eye_position();
        self.explosives
            .launch(&mut self.physics, eye, look, Explosive { atlas })
    }

    /// Fires a missile from the eye along `look`.
    ///
    /// # Errors
    /// Returns `EngineError::PoolExhausted` if every missile is already live.
    pub fn launch_missile(&mut self, look: Vector3<f32>) -> EngineResult<InstanceIndex> {
        let eye = self.eye_position();
        self.missiles.launch(&mut self.physics, eye, look, Missile)
    }

    /// Drains the effects queued by edits made outside `frame`.
    pub fn take_effects(&mut self) -> Vec<EditEffect> {
        std::mem::take(&mut self.pending_effects)
    }

    /// Steps the engine by one frame of `dt` seconds.
    pub fn frame(&mut self, actions: &PlayerAction, dt: f32) -> FrameReport {
        self.frame_index += 1;
        let mut report = FrameReport::default();

        // Edit mode
        if let Some(atlas) = actions.select_atlas {
            self.grid.set_atlas_id(atlas);
        }
        if actions.reset_scale {
            self.grid.reset_scale();
        }
        let delta = actions.scale_delta;
        if delta.x != 0 {
            self.grid.set_scale_x(delta.x);
        }
        if delta.y != 0 {
            self.grid.set_scale_y(delta.y);
        }
        if delta.z != 0 {
            self.grid.set_scale_z(delta.z);
        }

        // Ray edits
        if actions.add_block || actions.remove_block {
            match self.edit_ray(actions.look) {
                Ok(ray) => {
                    if actions.add_block {
                        report.edited_cells += self.add_block(&ray);
                    }
                    if actions.remove_block {
                        report.edited_cells += self.remove_block(&ray);
                    }
                }
                Err(error) => debug!("Skipping edit this frame: {}", error),
            }
        }

        // Launches
        if let Some(atlas) = actions.launch_explosive {
            if self.launch_explosive(actions.look, atlas).is_err() {
                report.launch_failures += 1;
            }
        }
        if actions.launch_missile && self.launch_missile(actions.look).is_err() {
            report.launch_failures += 1;
        }

        // Character intents
        self.character
            .character_move(&mut self.physics, actions.move_direction);
        if actions.jump {
            report.jumped = self.character.character_jump(&mut self.physics);
        }

        // Streaming
        let viewer = self.character_position();
        report.view_change = self.grid.update(viewer);
        if report.view_change.is_some() {
            report.meshes_rebuilt += self.grid.refresh_view_meshes();
        }
        let pinned = self.pinned_chunks();
        report.evicted = self.grid.evict_stale(&pinned);

        // Physics
        self.character.update(&mut self.physics, &self.grid, dt);
        report.explosive_detonations = self.explosives.update_frame(&mut self.physics, &self.grid, dt);
        report.missile_detonations = self.missiles.update_frame(&mut self.physics, &self.grid, dt);

        let blasts: Vec<_> = report
            .explosive_detonations
            .iter()
            .map(|d| (d.blast_anchor(), d.scale, d.direction, d.struck))
            .chain(
                report
                    .missile_detonations
                    .iter()
                    .map(|d| (d.blast_anchor(), d.scale, d.direction, d.struck)),
            )
            .collect();
        for (anchor, scale, direction, struck) in blasts {
            report.edited_cells += self.apply_blast(anchor, scale, direction, struck);
        }

        self.explosives.update();
        self.missiles.update();

        report.meshes_rebuilt += self.grid.refresh_view_meshes();
        report.effects = self.take_effects();
        report
    }

    /// Clears a blast box and queues its effect.
    fn apply_blast(
        &mut self,
        anchor: Point3<f32>,
        scale: Vector3<u32>,
        direction: Vector3<f32>,
        atlas: AtlasId,
    ) -> usize {
        let changed = self.grid.set_geometry(anchor, scale, AIR);
        if changed > 0 {
            debug!("Blast at {:?} cleared {} cells", anchor, changed);
            self.pending_effects.push(EditEffect {
                position: anchor,
                direction,
                atlas,
                cells: changed,
            });
        }
        changed
    }

    /// Chunks that must stay resident because a projectile is inside them.
    fn pinned_chunks(&self) -> HashSet<voxels::streaming::ChunkKey> {
        let mut pinned = self.explosives.pinned_chunks(&self.grid);
        pinned.extend(self.missiles.pinned_chunks(&self.grid));
        pinned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use voxels::atlas::Atlas;

    const FRAME: f32 = 1.0 / 60.0;

    fn config() -> EngineConfig {
        EngineConfig {
            grid: GridConfig {
                world_size: 32,
                chunk_size: 8,
                ..GridConfig::default()
            },
            ..EngineConfig::default()
        }
    }

    /// An engine whose character stands on a stone floor at y = 0.
    fn engine_on_floor() -> EngineState {
        let mut engine = EngineState::new(&config()).unwrap();
        engine.grid.set_atlas_id(Atlas::STONE.id());
        for _ in 0..4 {
            engine.grid.set_scale_x(1);
            engine.grid.set_scale_z(1);
        }
        for (x, z) in [(-5.0, -5.0), (0.0, -5.0), (-5.0, 0.0), (0.0, 0.0)] {
            engine.add_block_at(Point3::new(x, 0.0, z));
        }
        engine.grid.reset_scale();
        engine
    }

    fn settle(engine: &mut EngineState) {
        for _ in 0..60 {
            engine.frame(&PlayerAction::default(), FRAME);
        }
    }

    #[test]
    fn invalid_grid_aborts_construction() {
        let mut config = config();
        config.grid.world_size = 30;
        assert!(EngineState::new(&config).is_err());
    }

    #[test]
    fn character_lands_on_the_floor() {
        let mut engine = engine_on_floor();
        settle(&mut engine);
        let y = engine.character_position().y;
        assert!((y - 1.95).abs() < 0.01, "y = {}", y);
    }

    #[test]
    fn remove_then_add_along_the_view() {
        let mut engine = engine_on_floor();
        settle(&mut engine);
        let down = PlayerAction {
            look: Vector3::new(0.0, -1.0, 0.0),
            remove_block: true,
            ..PlayerAction::default()
        };

        // The eye is 1.95 above the floor surface, well within the default reach.
        let report = engine.frame(&down, FRAME);
        assert_eq!(report.edited_cells, 1);
        assert_eq!(report.effects.len(), 1);
        assert_eq!(report.effects[0].atlas, Atlas::STONE.id());
        assert!(report.effects[0].direction.y > 0.99);
        assert_eq!(engine.grid.get_cell(Point3::new(0, 0, 0)), AIR);

        let ray = engine.edit_ray(Vector3::new(0.0, -1.0, 0.0)).unwrap();
        assert_eq!(engine.remove_block(&ray), 0);
        assert!(engine.take_effects().is_empty());
    }

    #[test]
    fn add_lands_next_to_existing_geometry() {
        let mut engine = engine_on_floor();
        settle(&mut engine);
        engine.grid.set_atlas_id(Atlas::WOOD.id());
        let eye = engine.eye_position();
        let ray = Ray::new(eye, Point3::new(eye.x + 3.0, 0.5, eye.z)).unwrap();

        let target = engine.grid.ray_trace_before(&ray).unwrap();
        assert_eq!(engine.add_block(&ray), 1);
        assert_eq!(engine.grid.material_at(target), Atlas::WOOD.id());
        assert_eq!(ChunkGrid::cell_of(target).y, 1);
        // The new block is now the first solid cell, so the next add lands in front of it.
        assert_eq!(engine.add_block(&ray), 1);
        assert_eq!(engine.grid.get_cell(Point3::new(1, 1, 0)), Atlas::WOOD.id());
    }

    #[test]
    fn add_from_inside_a_ceiling_changes_nothing() {
        let mut engine = engine_on_floor();
        settle(&mut engine);
        let eye = engine.eye_position();
        // A one-cell ceiling right above the body puts the eye inside it.
        engine.grid.set_atlas_id(Atlas::STONE.id());
        engine.add_block_at(eye);
        assert!(engine.grid.is_solid_cell(ChunkGrid::cell_of(eye)));

        engine.grid.set_atlas_id(Atlas::WOOD.id());
        let ray = engine.edit_ray(Vector3::new(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(engine.add_block(&ray), 0);
        assert_eq!(engine.grid.material_at(eye), Atlas::STONE.id());
        assert_eq!(engine.grid.get_cell(ChunkGrid::cell_of(eye) + Vector3::new(1, 0, 0)), AIR);
    }

    #[test]
    fn jump_guard_holds_across_frames() {
        let mut engine = engine_on_floor();
        settle(&mut engine);
        let jump = PlayerAction {
            jump: true,
            ..PlayerAction::default()
        };
        assert!(engine.frame(&jump, FRAME).jumped);
        assert!(!engine.frame(&jump, FRAME).jumped);
    }

    #[test]
    fn explosive_blast_clears_the_floor() {
        let mut engine = engine_on_floor();
        settle(&mut engine);
        let solid_before = engine
            .grid
            .get_chunk(Point3::new(0, 0, 0))
            .unwrap()
            .solid_count();

        let throw = PlayerAction {
            look: Vector3::new(0.3, -1.0, 0.0).normalize(),
            launch_explosive: Some(Atlas::IRON.id()),
            ..PlayerAction::default()
        };
        engine.frame(&throw, FRAME);
        assert_eq!(engine.explosives.len(), 1);

        let mut detonated = false;
        for _ in 0..120 {
            let report = engine.frame(&PlayerAction::default(), FRAME);
            if !report.explosive_detonations.is_empty() {
                assert_eq!(report.explosive_detonations[0].payload.atlas, Atlas::IRON.id());
                assert!(report.edited_cells > 0);
                assert!(!report.effects.is_empty());
                detonated = true;
                break;
            }
        }
        assert!(detonated);
        assert!(engine.explosives.is_empty());
        let solid_after = engine
            .grid
            .get_chunk(Point3::new(0, 0, 0))
            .unwrap()
            .solid_count();
        assert!(solid_after < solid_before);
    }

    /// Steps idle frames until a missile or explosive detonates and returns that frame.
    fn frame_until_detonation(engine: &mut EngineState) -> FrameReport {
        for _ in 0..120 {
            let report = engine.frame(&PlayerAction::default(), FRAME);
            if !report.explosive_detonations.is_empty() || !report.missile_detonations.is_empty() {
                return report;
            }
        }
        panic!("nothing detonated");
    }

    #[test]
    fn missile_from_above_clears_the_cells_it_strikes() {
        let mut engine = engine_on_floor();
        settle(&mut engine);
        let down = Vector3::new(0.0, -1.0, 0.0);
        engine
            .missiles
            .launch(&mut engine.physics, Point3::new(3.5, 3.0, 3.5), down, Missile)
            .unwrap();

        let report = frame_until_detonation(&mut engine);
        let detonation = report.missile_detonations[0];
        assert_eq!(detonation.cell, Point3::new(3, 0, 3));
        assert_eq!(detonation.struck, Atlas::STONE.id());
        // A 2x2x2 box anchored on the struck cell takes four floor cells with it.
        assert_eq!(report.edited_cells, 4);
        for cell in [Point3::new(3, 0, 3), Point3::new(4, 0, 3), Point3::new(3, 0, 4), Point3::new(4, 0, 4)] {
            assert_eq!(engine.grid.get_cell(cell), AIR);
        }
        assert_eq!(engine.grid.get_cell(Point3::new(2, 0, 3)), Atlas::STONE.id());
        assert_eq!(report.effects.len(), 1);
        assert_eq!(report.effects[0].atlas, Atlas::STONE.id());
    }

    #[test]
    fn single_cell_blast_removes_exactly_the_struck_cell() {
        let mut config = config();
        config.explosives.blast_scale = [1, 1, 1];
        let mut engine = EngineState::new(&config).unwrap();
        engine.grid.set_geometry(Point3::new(-5.0, 0.0, -5.0), Vector3::new(10, 1, 10), Atlas::STONE.id());
        engine
            .explosives
            .launch(
                &mut engine.physics,
                Point3::new(-2.5, 3.0, -2.5),
                Vector3::new(0.0, -1.0, 0.0),
                Explosive { atlas: Atlas::IRON.id() },
            )
            .unwrap();

        let report = frame_until_detonation(&mut engine);
        assert_eq!(report.explosive_detonations[0].cell, Point3::new(-3, 0, -3));
        assert_eq!(report.edited_cells, 1);
        assert_eq!(engine.grid.get_cell(Point3::new(-3, 0, -3)), AIR);
        assert_eq!(engine.grid.get_cell(Point3::new(-2, 0, -3)), Atlas::STONE.id());
    }

    #[test]
    fn full_pool_counts_launch_failures() {
        let mut engine = EngineState::new(&EngineConfig {
            missiles: crate::config::PoolConfig {
                capacity: 1,
                ..crate::config::PoolConfig::missiles()
            },
            ..config()
        })
        .unwrap();
        let fire = PlayerAction {
            look: Vector3::new(0.0, 1.0, 0.0),
            launch_missile: true,
            ..PlayerAction::default()
        };
        assert_eq!(engine.frame(&fire, FRAME).launch_failures, 0);
        assert_eq!(engine.frame(&fire, FRAME).launch_failures, 1);
        assert_eq!(engine.missiles.len(), 1);
    }

    #[test]
    fn edit_mode_actions_update_the_grid() {
        let mut engine = EngineState::new(&config()).unwrap();
        let actions = PlayerAction {
            select_atlas: Some(Atlas::SAND.id()),
            scale_delta: Vector3::new(1, 2, 0),
            ..PlayerAction::default()
        };
        engine.frame(&actions, FRAME);
        assert_eq!(engine.grid.atlas_id(), Atlas::SAND.id());
        assert_eq!(engine.grid.scale(), Vector3::new(2, 3, 1));

        let reset = PlayerAction {
            reset_scale: true,
            ..PlayerAction::default()
        };
        engine.frame(&reset, FRAME);
        assert_eq!(engine.grid.scale_size(), 1);
    }
}
