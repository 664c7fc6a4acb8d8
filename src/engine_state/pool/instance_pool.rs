//! # Instance Pool
//!
//! Fixed-capacity, densely packed pools of short-lived physical entities.
//!
//! Each live entry owns one physics body and one render-instance slot. Entries, instance
//! slots and the `BodyData::Pool` back-references stored on the bodies are kept
//! coherent at all times:
//!
//! - entry `i` owns instance slot `i`;
//! - the body of entry `i` carries `BodyData::Pool(InstanceIndex(i))`.
//!
//! ## Removal during iteration
//!
//! `remove` is a swap-remove: the last entry moves into the freed position and both of
//! its links (instance slot and body back-reference) are rewritten in the same call.
//! A loop that removes entry `i` must therefore visit position `i` again instead of
//! advancing, because it now holds an entry that has not been processed yet.
//! `update_frame` is the only place that removes while iterating and follows this
//! rule.
//!
//! ## Sub-steps
//!
//! A frame is split so no entity moves more than `MAX_STEP_DISTANCE` per sub-step,
//! with the collision cells re-queried around it each time. Thin walls therefore stop
//! fast projectiles. The split is capped at `MAX_SUBSTEPS`.

use std::collections::HashSet;
use std::fmt::Debug;

use cgmath::{Deg, InnerSpace, Point3, Quaternion, Rotation3, Vector3};
use log::{debug, warn};

use super::{instance_buffer::InstanceBuffer, projectile::Detonation};
use crate::config::PoolConfig;
use crate::engine_state::error::{EngineError, EngineResult};
use crate::engine_state::physics::{BodyData, BodyHandle, PhysicsWorld, RigidBody};
use crate::engine_state::voxels::{collision::CollisionCell, grid::ChunkGrid, streaming::ChunkKey};

/// Longest distance, in cells, an entity may travel in one sub-step.
pub const MAX_STEP_DISTANCE: f32 = 0.5;

/// Upper bound on the sub-steps one entity takes per frame.
pub const MAX_SUBSTEPS: u32 = 64;

/// Typed dense index of a pool entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstanceIndex(pub(crate) usize);

impl InstanceIndex {
    /// The raw dense index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A payload type that can live in an `InstancePool`.
pub trait Pooled: Copy + Debug {
    /// Name used in log messages.
    const KIND: &'static str;
}

/// One live pooled entity.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PoolEntry<T> {
    /// The entity's physics body
    pub body: BodyHandle,
    /// The entity's render-instance slot
    pub instance: InstanceIndex,
    /// Kind-specific data carried to the detonation
    pub payload: T,
    /// Seconds since launch
    pub age: f32,
    /// Contacts reported for this entity
    pub hits: u32,
}

/// A fixed-capacity pool of projectiles of one kind.
pub struct InstancePool<T: Pooled> {
    entries: Vec<PoolEntry<T>>,
    instances: InstanceBuffer,
    capacity: usize,
    launch_bias: Vector3<f32>,
    launch_speed: f32,
    half_extent: f32,
    mass: f32,
    lifetime: f32,
    rotation_rate: f32,
    blast_scale: Vector3<u32>,
    /// Shared cosmetic rotation in degrees, kept in `[0, 360)`
    angle: f32,
    /// Reused collision-cell buffer
    cells: Vec<CollisionCell>,
}

impl<T: Pooled> InstancePool<T> {
    /// Creates an empty pool.
    pub fn new(config: &PoolConfig) -> Self {
        let [bx, by, bz] = config.launch_bias;
        let [sx, sy, sz] = config.blast_scale;
        InstancePool {
            entries: Vec::with_capacity(config.capacity),
            instances: InstanceBuffer::new(config.capacity),
            capacity: config.capacity,
            launch_bias: Vector3::new(bx, by, bz),
            launch_speed: config.launch_speed,
            half_extent: config.half_extent,
            mass: config.mass,
            lifetime: config.lifetime,
            rotation_rate: config.rotation_rate,
            blast_scale: Vector3::new(sx, sy, sz),
            angle: 0.0,
            cells: Vec::with_capacity(27),
        }
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no entity is alive.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of live entities.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The live entries in dense order.
    pub fn entries(&self) -> &[PoolEntry<T>] {
        &self.entries
    }

    /// The entry at `index`, if it is live.
    pub fn entry(&self, index: InstanceIndex) -> Option<&PoolEntry<T>> {
        self.entries.get(index.0)
    }

    /// Render-instance slots of the live entries.
    pub fn instances(&self) -> &InstanceBuffer {
        &self.instances
    }

    /// Current shared rotation angle in degrees.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Launches a new entity from `origin`.
    ///
    /// The initial velocity is the configured upward bias plus `direction` (normalized)
    /// times the launch speed.
    ///
    /// # Errors
    /// Returns `EngineError::PoolExhausted` if the pool is full. Nothing is spawned and
    /// no slot is reserved in that case.
    pub fn launch(
        &mut self,
        physics: &mut PhysicsWorld,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        payload: T,
    ) -> EngineResult<InstanceIndex> {
        let exhausted = EngineError::PoolExhausted {
            capacity: self.capacity,
        };
        if self.entries.len() >= self.capacity {
            warn!("Cannot launch {}: pool of {} is full", T::KIND, self.capacity);
            return Err(exhausted);
        }
        let slot = self.instances.push(origin).ok_or(exhausted)?;
        let index = InstanceIndex(slot);

        let aim = if direction.magnitude2() > 0.0 {
            direction.normalize()
        } else {
            direction
        };
        let velocity = self.launch_bias + aim * self.launch_speed;
        let half = Vector3::new(self.half_extent, self.half_extent, self.half_extent);
        let body = physics.add_body(
            RigidBody::new(origin, half, self.mass)
                .with_velocity(velocity)
                .with_data(BodyData::Pool(index)),
        );

        self.entries.push(PoolEntry {
            body,
            instance: index,
            payload,
            age: 0.0,
            hits: 0,
        });
        debug!("Launched {} {:?} from {:?}", T::KIND, index, origin);
        Ok(index)
    }

    /// Removes the entry at `index`, releasing its body and instance slot.
    ///
    /// The last entry moves into `index`; its instance handle and its body's
    /// back-reference are rewritten before this returns.
    ///
    /// # Returns
    /// The removed entry, or `None` if `index` is not live.
    pub fn remove(&mut self, physics: &mut PhysicsWorld, index: InstanceIndex) -> Option<PoolEntry<T>> {
        if index.0 >= self.entries.len() {
            return None;
        }
        let removed = self.entries.swap_remove(index.0);
        let moved_from = self.instances.swap_remove(index.0);
        physics.clear_body(removed.body);

        if moved_from.is_some() {
            let moved = &mut self.entries[index.0];
            moved.instance = index;
            if let Some(body) = physics.body_mut(moved.body) {
                body.data = BodyData::Pool(index);
            }
        }
        Some(removed)
    }

    /// Routes a contact on `body` to the entry that owns it, through the body's
    /// back-reference, and counts the hit.
    ///
    /// # Returns
    /// The index of the entry that was hit, or `None` if the body is not one of this
    /// pool's live bodies.
    pub fn notify_collision(&mut self, physics: &PhysicsWorld, body: BodyHandle) -> Option<InstanceIndex> {
        let BodyData::Pool(index) = physics.body(body)?.data else {
            return None;
        };
        let entry = self.entries.get_mut(index.0)?;
        if entry.body != body {
            return None;
        }
        entry.hits += 1;
        Some(index)
    }

    /// Advances every entity by one frame.
    ///
    /// Entities older than their lifetime are removed without detonating. The others
    /// are integrated in sub-steps against the live cells around them; an entity that
    /// hits a solid cell is removed and reported as a `Detonation`.
    pub fn update_frame(
        &mut self,
        physics: &mut PhysicsWorld,
        grid: &ChunkGrid,
        dt: f32,
    ) -> Vec<Detonation<T>> {
        let mut detonations = Vec::new();
        let mut i = 0;

        while i < self.entries.len() {
            let index = InstanceIndex(i);
            self.entries[i].age += dt;
            let entry = self.entries[i];

            if entry.age > self.lifetime {
                debug!("{} {:?} timed out", T::KIND, index);
                self.remove(physics, index);
                continue;
            }

            let Some(body) = physics.body(entry.body) else {
                warn!("{} {:?} lost its body", T::KIND, index);
                self.remove(physics, index);
                continue;
            };
            let mut position = body.position;
            let steps = substeps(body.velocity, physics.gravity(), dt);
            let sub_dt = dt / steps as f32;

            let mut impact = None;
            for _ in 0..steps {
                let Some(body) = physics.body(entry.body) else {
                    break;
                };
                let velocity = body.velocity;
                grid.collision_cells_into(&mut self.cells, body.position);
                let contact = physics.solve_static(entry.body, &self.cells, sub_dt);
                position = physics.position(entry.body).unwrap_or(position);
                if let Some(cell) = contact {
                    impact = Some((cell, velocity));
                    break;
                }
            }

            if let Some((cell, velocity)) = impact {
                self.notify_collision(physics, entry.body);
                let direction = if velocity.magnitude2() > 0.0 {
                    -velocity.normalize()
                } else {
                    Vector3::new(0.0, 1.0, 0.0)
                };
                debug!("{} {:?} detonated on cell {:?}", T::KIND, index, cell.cell);
                detonations.push(Detonation {
                    position,
                    cell: cell.cell,
                    direction,
                    scale: self.blast_scale,
                    payload: entry.payload,
                    struck: cell.atlas,
                });
                self.remove(physics, index);
                continue;
            }

            self.instances.set_position(i, position);
            i += 1;
        }

        detonations
    }

    /// Advances the shared cosmetic rotation and applies it to every instance.
    pub fn update(&mut self) {
        self.angle = (self.angle + self.rotation_rate).rem_euclid(360.0);
        self.instances
            .set_rotation_all(Quaternion::from_angle_y(Deg(self.angle)));
    }

    /// Chunks holding live entities; these must not be evicted.
    pub fn pinned_chunks(&self, grid: &ChunkGrid) -> HashSet<ChunkKey> {
        self.instances
            .positions()
            .iter()
            .map(|p| grid.chunk_key(ChunkGrid::cell_of(*p)))
            .collect()
    }
}

/// Sub-steps needed so a body starting at `velocity` covers at most
/// `MAX_STEP_DISTANCE` per step over a frame of `dt`.
fn substeps(velocity: Vector3<f32>, gravity: Vector3<f32>, dt: f32) -> u32 {
    let travel = (velocity.magnitude() + gravity.magnitude() * dt) * dt;
    let steps = (travel / MAX_STEP_DISTANCE).ceil();
    if steps.is_finite() {
        (steps as u32).clamp(1, MAX_SUBSTEPS)
    } else {
        MAX_SUBSTEPS
    }
}
