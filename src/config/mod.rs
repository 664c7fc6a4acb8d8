//! # Engine Configuration
//!
//! Construction-time configuration for every component of the terrain engine.
//!
//! Values that used to be compile-time constants (pool capacity, chunk size, solver
//! sub-step count, ...) live here so that tests and tools can exercise boundary values
//! without recompiling. The configuration is plain data: it is deserialized from JSON
//! with `serde_json` and validated by the component that consumes it.
//!
//! ## Example
//!
//! ```json
//! {
//!   "grid": { "world_size": 64, "chunk_size": 16, "view_radius": 1 },
//!   "explosives": { "capacity": 4 }
//! }
//! ```
//!
//! Omitted sections and fields fall back to their defaults.

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::engine_state::error::{EngineError, EngineResult};
use crate::engine_state::voxels::chunk::GenerationMethod;

/// Environment variable holding the path of the JSON configuration used by `run()`.
pub const CONFIG_PATH_VARIABLE: &str = "VOXEL_CONFIG";

/// Top-level configuration for an `EngineState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Voxel storage and streaming
    pub grid: GridConfig,
    /// Ray editing limits
    pub ray: RayConfig,
    /// Solver parameters shared by every body
    pub physics: PhysicsConfig,
    /// The player-controlled body
    pub character: CharacterConfig,
    /// The explosive pool
    pub explosives: PoolConfig,
    /// The missile pool
    pub missiles: PoolConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            ray: RayConfig::default(),
            physics: PhysicsConfig::default(),
            character: CharacterConfig::default(),
            explosives: PoolConfig::default(),
            missiles: PoolConfig::missiles(),
        }
    }
}

/// Configuration of the chunk grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of the addressable world, in cells. Must be a multiple of `chunk_size`.
    pub world_size: i32,
    /// Edge length of one chunk, in cells.
    pub chunk_size: i32,
    /// Chebyshev radius, in chunks, of the streamed/visible region around the viewer.
    pub view_radius: i32,
    /// How chunks streamed in around the viewer are filled.
    pub generation: GenerationMethod,
    /// Updates a chunk must spend out of view before it may be evicted.
    pub eviction_grace_updates: u64,
    /// Upper bound on the number of out-of-view chunks tracked for eviction.
    pub max_eviction_candidates: usize,
    /// Largest edit extent along any axis.
    pub max_scale: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            world_size: 64,
            chunk_size: 8,
            view_radius: 1,
            generation: GenerationMethod::Empty,
            eviction_grace_updates: 1,
            max_eviction_candidates: 4096,
            max_scale: 5,
        }
    }
}

/// Limits for ray traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RayConfig {
    /// Hard cap on the number of cells a single trace may visit.
    pub max_steps: usize,
    /// Distance in front of the eye used as the edit target.
    pub reach: f32,
}

impl Default for RayConfig {
    fn default() -> Self {
        Self {
            max_steps: 512,
            reach: 3.0,
        }
    }
}

/// Solver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Constant acceleration applied to every dynamic body.
    pub gravity: [f32; 3],
    /// Fraction of the normal velocity kept after hitting a static cell.
    pub elasticity: f32,
    /// Solver sub-steps per frame for the character.
    pub substeps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -10.0, 0.0],
            elasticity: 0.1,
            substeps: 10,
        }
    }
}

/// Configuration of the player body and its movement forces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    /// Spawn position of the character body.
    pub spawn: [f32; 3],
    /// Half extent of the character bounding box.
    pub half_extent: [f32; 3],
    /// Mass of the character body.
    pub mass: f32,
    /// Lateral force per unit mass applied by `character_move`.
    pub move_force: f32,
    /// Vertical speed change applied by a jump.
    pub jump_impulse: f32,
    /// A jump is only allowed while |vertical velocity| is below this.
    pub jump_threshold: f32,
    /// Friction force per unit mass opposing horizontal velocity, applied every sub-step.
    pub friction: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            spawn: [0.0, 2.0, 0.0],
            half_extent: [0.45, 0.95, 0.45],
            mass: 10.0,
            move_force: 100.0,
            jump_impulse: 6.0,
            jump_threshold: 1.0,
            friction: 2.0,
        }
    }
}

/// Configuration of one pooled-projectile kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of live entities.
    pub capacity: usize,
    /// Velocity added to every launch regardless of direction.
    pub launch_bias: [f32; 3],
    /// Multiplier applied to the launch direction.
    pub launch_speed: f32,
    /// Half extent of each entity's bounding box.
    pub half_extent: f32,
    /// Mass of each entity's body.
    pub mass: f32,
    /// Seconds an entity may live before it is removed without detonating.
    pub lifetime: f32,
    /// Degrees added to the shared rotation every frame.
    pub rotation_rate: f32,
    /// Extent of the box of cells cleared by a detonation.
    pub blast_scale: [u32; 3],
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            launch_bias: [0.0, 5.0, 0.0],
            launch_speed: 20.0,
            half_extent: 0.25,
            mass: 10.0,
            lifetime: 10.0,
            rotation_rate: 2.0,
            blast_scale: [3, 3, 3],
        }
    }
}

impl PoolConfig {
    /// Defaults for the missile pool: flat trajectory, faster, smaller blast.
    pub fn missiles() -> Self {
        Self {
            capacity: 4,
            launch_bias: [0.0, 0.0, 0.0],
            launch_speed: 40.0,
            half_extent: 0.15,
            mass: 2.0,
            lifetime: 5.0,
            rotation_rate: 8.0,
            blast_scale: [2, 2, 2],
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        info!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Loads the file named by `VOXEL_CONFIG`, or the defaults when it is unset or unreadable.
    pub fn from_env() -> Self {
        match std::env::var(CONFIG_PATH_VARIABLE) {
            Ok(path) => Self::load(&path).unwrap_or_else(|error| {
                warn!("Falling back to default configuration: {}", error);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Rejects configurations no component could be built from.
    ///
    /// Grid geometry is validated again by `ChunkGrid::new`; this covers the rest.
    pub fn validate(&self) -> EngineResult<()> {
        if self.physics.substeps == 0 {
            return Err(EngineError::Configuration(
                "physics.substeps must be at least 1".into(),
            ));
        }
        if self.physics.substeps == 1 {
            warn!("Running the character solver with a single sub-step; thin geometry may be tunneled");
        }
        for (name, pool) in [("explosives", &self.explosives), ("missiles", &self.missiles)] {
            if pool.capacity == 0 {
                return Err(EngineError::Configuration(format!(
                    "{}.capacity must be at least 1",
                    name
                )));
            }
        }
        if self.character.mass <= 0.0 {
            return Err(EngineError::Configuration("character.mass must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "grid": { "world_size": 32, "chunk_size": 8 }, "explosives": { "capacity": 3 } }"#,
        )
        .unwrap();

        assert_eq!(config.grid.world_size, 32);
        assert_eq!(config.grid.chunk_size, 8);
        assert_eq!(config.grid.view_radius, GridConfig::default().view_radius);
        assert_eq!(config.explosives.capacity, 3);
        assert_eq!(config.explosives.launch_speed, 20.0);
        assert_eq!(config.physics.substeps, 10);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let result = EngineConfig::from_json_str("{ grid: ");
        assert!(matches!(result, Err(EngineError::ConfigParse(_))));
    }

    #[test]
    fn zero_substeps_is_rejected() {
        let mut config = EngineConfig::default();
        config.physics.substeps = 0;
        assert!(matches!(config.validate(), Err(EngineError::Configuration(_))));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut config = EngineConfig::default();
        config.missiles.capacity = 0;
        assert!(matches!(config.validate(), Err(EngineError::Configuration(_))));
    }
}
