//! # Physics Bridge
//!
//! Just enough rigid-body simulation for the voxel core: axis-aligned bodies in an
//! arena, static collision against voxel cells, and the character controller.
//!
//! ## Architecture
//!
//! * [`PhysicsWorld`]: body arena with typed handles, integration and static solving
//! * [`RigidBody`]: position, velocity, accumulated force and owner back-reference
//! * [`Character`]: movement intents and the sub-stepped per-frame update
//!
//! The solver never reads chunks. Everything it knows about the world arrives as
//! `CollisionCell`s from `ChunkGrid::collision_cells_into`.

mod body;
mod character;
mod simulation;

pub use body::{BodyData, BodyHandle, RigidBody};
pub use character::Character;
pub use simulation::PhysicsWorld;
