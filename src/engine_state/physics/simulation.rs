//! # Physics World
//!
//! An arena of rigid bodies addressed by `BodyHandle`.
//!
//! Slots freed by `clear_body` are reused by later `add_body` calls, so a handle is only
//! meaningful while its body is alive. Owners that need to find their way back from a
//! body (pools) store that link in `BodyData` and keep it current themselves.

use cgmath::{Point3, Vector3};
use log::trace;

use super::body::{BodyHandle, RigidBody};
use crate::config::PhysicsConfig;
use crate::engine_state::voxels::collision::{Aabb, CollisionCell};

/// Owns every rigid body and the constants the solver applies to them.
pub struct PhysicsWorld {
    /// Body slots, `None` when free
    bodies: Vec<Option<RigidBody>>,
    /// Indices of free slots, reused last-freed first
    free: Vec<usize>,
    /// Constant acceleration applied to every body
    gravity: Vector3<f32>,
    /// Fraction of the normal velocity kept after a static contact
    elasticity: f32,
}

impl PhysicsWorld {
    /// Creates an empty world.
    pub fn new(config: &PhysicsConfig) -> Self {
        let [x, y, z] = config.gravity;
        PhysicsWorld {
            bodies: Vec::new(),
            free: Vec::new(),
            gravity: Vector3::new(x, y, z),
            elasticity: config.elasticity,
        }
    }

    /// Inserts a body and returns its handle.
    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        match self.free.pop() {
            Some(index) => {
                self.bodies[index] = Some(body);
                BodyHandle(index)
            }
            None => {
                self.bodies.push(Some(body));
                BodyHandle(self.bodies.len() - 1)
            }
        }
    }

    /// Removes a body, freeing its slot.
    ///
    /// # Returns
    /// The removed body, or `None` if the slot was already free.
    pub fn clear_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let body = self.bodies.get_mut(handle.0)?.take()?;
        self.free.push(handle.0);
        Some(body)
    }

    /// The body behind a handle, if it is alive.
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle.0)?.as_ref()
    }

    /// Mutable access to the body behind a handle, if it is alive.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle.0)?.as_mut()
    }

    /// Constant acceleration applied to every body.
    pub fn gravity(&self) -> Vector3<f32> {
        self.gravity
    }

    /// Number of live bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len() - self.free.len()
    }

    /// Advances one body by `dt` with semi-implicit Euler and clears its force.
    pub fn integrate(&mut self, handle: BodyHandle, dt: f32) {
        let gravity = self.gravity;
        if let Some(body) = self.body_mut(handle) {
            let acceleration = gravity + body.force / body.mass;
            body.velocity += acceleration * dt;
            body.position += body.velocity * dt;
            body.force = Vector3::new(0.0, 0.0, 0.0);
        }
    }

    /// `true` if the body's box overlaps `aabb`.
    pub fn collide(&self, handle: BodyHandle, aabb: &Aabb) -> bool {
        self.body(handle)
            .map(|body| body.aabb().intersects(aabb))
            .unwrap_or(false)
    }

    /// Integrates the body, then pushes it out of every static cell it overlaps.
    ///
    /// Each overlap is resolved along the axis of least penetration. Velocity into the
    /// cell along that axis is reflected and scaled by the elasticity.
    ///
    /// # Returns
    /// The first cell the body was pushed out of, if any.
    pub fn solve_static(
        &mut self,
        handle: BodyHandle,
        cells: &[CollisionCell],
        dt: f32,
    ) -> Option<CollisionCell> {
        self.integrate(handle, dt);
        let elasticity = self.elasticity;
        let body = self.body_mut(handle)?;
        let mut first_contact = None;

        for cell in cells {
            let bounds = body.aabb();
            if !bounds.intersects(&cell.aabb) {
                continue;
            }

            let (axis, depth) = least_penetration(&bounds, &cell.aabb);
            let sign = if bounds.center()[axis] >= cell.aabb.center()[axis] {
                1.0
            } else {
                -1.0
            };
            body.position[axis] += sign * depth;
            if body.velocity[axis] * sign < 0.0 {
                body.velocity[axis] = -body.velocity[axis] * elasticity;
            }

            trace!("Body {:?} pushed out of cell {:?} along axis {}", handle, cell.cell, axis);
            if first_contact.is_none() {
                first_contact = Some(*cell);
            }
        }

        first_contact
    }

    /// Position of a live body.
    pub fn position(&self, handle: BodyHandle) -> Option<Point3<f32>> {
        self.body(handle).map(|body| body.position)
    }
}

/// Axis and depth of the smallest overlap between two intersecting boxes.
fn least_penetration(a: &Aabb, b: &Aabb) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    for axis in 0..3 {
        let depth = a.max[axis].min(b.max[axis]) - a.min[axis].max(b.min[axis]);
        if depth < best.1 {
            best = (axis, depth);
        }
    }
    best
}
