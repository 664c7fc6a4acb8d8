use cgmath::{Point3, Vector3, Zero};

use crate::engine_state::pool::InstanceIndex;
use crate::engine_state::voxels::collision::Aabb;

/// Typed index of a body slot in a `PhysicsWorld`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub(crate) usize);

impl BodyHandle {
    /// The raw slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a body belongs to, so a contact on the body can be routed back to its owner.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum BodyData {
    /// A free-standing body such as the character
    #[default]
    None,
    /// The body of the pool entry at this dense index
    Pool(InstanceIndex),
}

/// An axis-aligned rigid body. Bodies never rotate; pooled entities only spin
/// cosmetically in the instance buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    /// Centre of the bounding box
    pub position: Point3<f32>,
    /// Linear velocity
    pub velocity: Vector3<f32>,
    /// Force accumulated since the last integration
    pub force: Vector3<f32>,
    /// Half size of the bounding box
    pub half_extent: Vector3<f32>,
    /// Mass, always positive
    pub mass: f32,
    /// Back-reference to the owner of this body
    pub data: BodyData,
}

impl RigidBody {
    /// Creates a body at rest.
    ///
    /// # Panics
    /// Panics if `mass` is not positive.
    pub fn new(position: Point3<f32>, half_extent: Vector3<f32>, mass: f32) -> Self {
        assert!(mass > 0.0, "rigid body mass must be positive");
        RigidBody {
            position,
            velocity: Vector3::zero(),
            force: Vector3::zero(),
            half_extent,
            mass,
            data: BodyData::None,
        }
    }

    /// Sets the initial velocity.
    pub fn with_velocity(mut self, velocity: Vector3<f32>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Sets the owner back-reference.
    pub fn with_data(mut self, data: BodyData) -> Self {
        self.data = data;
        self
    }

    /// The current bounding box.
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.position, self.half_extent)
    }

    /// Adds a force applied during the next integration.
    pub fn apply_force(&mut self, force: Vector3<f32>) {
        self.force += force;
    }

    /// Changes the velocity immediately by `impulse / mass`.
    pub fn apply_impulse(&mut self, impulse: Vector3<f32>) {
        self.velocity += impulse / self.mass;
    }
}
