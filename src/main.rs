//! # Voxel Terrain Entry Point
//!
//! This is the main entry point for the headless terrain engine.
//! It simply calls into the library's `run()` function; logging is configured through
//! `RUST_LOG` and the engine configuration through `VOXEL_CONFIG`.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info VOXEL_CONFIG=terrain.json cargo run --release
//! ```

fn main() -> voxel_terrain::engine_state::error::EngineResult<()> {
    voxel_terrain::run()
}
