//! # Pooled Entities
//!
//! Fixed-capacity pools of projectiles (explosives, missiles) that pair every live
//! entity with a physics body and a render-instance slot.
//!
//! * [`InstancePool`]: the generic pool and its remove-and-rewind iteration contract
//! * [`InstanceBuffer`]: dense render-instance transforms
//! * [`Explosive`], [`Missile`]: pool payloads
//! * [`Detonation`]: what a pool reports when an entity hits geometry

mod instance_buffer;
mod instance_pool;
mod projectile;

pub use instance_buffer::{InstanceBuffer, InstanceRaw};
pub use instance_pool::{InstanceIndex, InstancePool, PoolEntry, Pooled};
pub use projectile::{Detonation, Explosive, Missile};
