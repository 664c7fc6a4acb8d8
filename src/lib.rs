#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Terrain
//!
//! The runtime terrain core of a voxel action game: chunked voxel storage streamed
//! around a moving viewer, ray-based block editing, a small rigid-body bridge for the
//! character and pooled projectiles that blast holes into the world.
//!
//! ## Key Modules
//!
//! * `config` - Construction-time configuration loaded from JSON
//! * `engine_state` - The frame-stepped engine: grid, meshing, physics and pools
//!
//! ## Architecture
//!
//! Rendering, input, audio and persistence are external collaborators. The engine
//! hands them plain data: chunk meshes and instance transforms for the renderer,
//! `EditEffect`s for particles and sound, `ChunkSnapshot`s for saving. It takes back
//! only `PlayerAction`s.
//!
//! ## Usage
//!
//! ```no_run
//! use voxel_terrain::{config::EngineConfig, engine_state::{EngineState, PlayerAction}};
//!
//! let mut engine = EngineState::new(&EngineConfig::default()).unwrap();
//! let report = engine.frame(&PlayerAction::default(), 1.0 / 60.0);
//! println!("{} meshes rebuilt", report.meshes_rebuilt);
//! ```

use cgmath::{InnerSpace, Point3, Vector3};
use log::info;
use web_time::Instant;

use config::EngineConfig;
use engine_state::{
    error::EngineResult, voxels::atlas::Atlas, EngineState, FrameReport, PlayerAction,
};

pub mod config;
pub mod engine_state;

/// Length of one simulated frame of the headless driver, in seconds.
pub const FRAME_TIME: f32 = 1.0 / 60.0;

/// Number of frames the headless driver steps.
pub const DEMO_FRAMES: u64 = 600;

/// Initializes logging, builds an engine from the configuration named by
/// `VOXEL_CONFIG` (or the defaults) and runs a short scripted session without a window.
///
/// # Errors
/// Returns the configuration error if the engine cannot be built.
pub fn run() -> EngineResult<()> {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    let start = Instant::now();
    let config = EngineConfig::from_env();
    let mut engine = EngineState::new(&config)?;
    lay_demo_floor(&mut engine);
    info!("Initialization took {:?}", start.elapsed());

    let mut totals = FrameReport::default();
    for frame in 0..DEMO_FRAMES {
        let report = engine.frame(&demo_actions(frame), FRAME_TIME);
        totals.edited_cells += report.edited_cells;
        totals.meshes_rebuilt += report.meshes_rebuilt;
        totals.launch_failures += report.launch_failures;
        totals.effects.extend(report.effects);
        totals.evicted.extend(report.evicted);
        totals.explosive_detonations.extend(report.explosive_detonations);
        totals.missile_detonations.extend(report.missile_detonations);
    }

    info!(
        "Demo finished after {} frames in {:?}: character at {:?}, {} resident chunks",
        engine.frame_index(),
        start.elapsed(),
        engine.character_position(),
        engine.grid.chunk_count()
    );
    info!(
        "{} cells edited, {} effects, {} meshes rebuilt, {} chunks evicted",
        totals.edited_cells,
        totals.effects.len(),
        totals.meshes_rebuilt,
        totals.evicted.len()
    );
    info!(
        "{} explosive and {} missile detonations, {} launches refused",
        totals.explosive_detonations.len(),
        totals.missile_detonations.len(),
        totals.launch_failures
    );
    Ok(())
}

/// Lays a stone slab under the spawn point so the scripted session has ground to
/// walk on, whatever the configured generator.
fn lay_demo_floor(engine: &mut EngineState) {
    let spawn = engine.character_position();
    let floor_y = spawn.y.floor() - 2.0;
    engine.grid.set_atlas_id(Atlas::STONE.id());
    for _ in 0..3 {
        engine.grid.set_scale_x(1);
        engine.grid.set_scale_z(1);
    }
    let mut laid = 0;
    for dx in (-8..8).step_by(4) {
        for dz in (-8..8).step_by(4) {
            let corner = Point3::new(spawn.x + dx as f32, floor_y, spawn.z + dz as f32);
            laid += engine.add_block_at(corner);
        }
    }
    engine.grid.reset_scale();
    engine.grid.set_atlas_id(Atlas::WOOD.id());
    info!("Laid a demo floor of {} cells at y = {}", laid, floor_y);
}

/// The scripted intents for one frame of the headless session.
fn demo_actions(frame: u64) -> PlayerAction {
    let forward = Vector3::new(0.0, 0.0, -1.0);
    let down_forward = Vector3::new(0.0, -1.0, -1.0).normalize();
    let mut actions = PlayerAction {
        look: forward,
        ..PlayerAction::default()
    };
    match frame {
        60..=179 => actions.move_direction = forward,
        200 => actions.jump = true,
        240 => {
            actions.look = down_forward;
            actions.add_block = true;
        }
        260 => {
            actions.look = down_forward;
            actions.remove_block = true;
        }
        280 => actions.scale_delta = Vector3::new(1, 0, 1),
        300 => {
            actions.look = down_forward;
            actions.remove_block = true;
            actions.reset_scale = true;
        }
        320 | 330 => actions.launch_explosive = Some(Atlas::IRON.id()),
        340 => actions.launch_missile = true,
        400..=459 => actions.move_direction = -forward,
        _ => {}
    }
    actions
}
