//! Dense render-instance slots for pooled entities.
//!
//! Slot `i` always belongs to pool entry `i`: the buffer is compacted with the same
//! swap-remove as the entry array, so the renderer can upload it as one contiguous
//! instance range.

use cgmath::{EuclideanSpace, Matrix4, One, Point3, Quaternion, Vector3};

/// Per-instance data uploaded to the GPU, a column-major model matrix.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
}

impl InstanceRaw {
    /// The model matrix.
    pub fn model(&self) -> Matrix4<f32> {
        self.model.into()
    }
}

/// Capacity-bounded, densely packed instance transforms.
#[derive(Debug, Clone)]
pub struct InstanceBuffer {
    positions: Vec<Point3<f32>>,
    rotations: Vec<Quaternion<f32>>,
    capacity: usize,
}

impl InstanceBuffer {
    /// Creates an empty buffer that holds at most `capacity` instances.
    pub fn new(capacity: usize) -> Self {
        InstanceBuffer {
            positions: Vec::with_capacity(capacity),
            rotations: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// `true` if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Maximum number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reserves the next slot.
    ///
    /// # Returns
    /// The slot index, or `None` when the buffer is full.
    pub fn push(&mut self, position: Point3<f32>) -> Option<usize> {
        if self.len() >= self.capacity {
            return None;
        }
        self.positions.push(position);
        self.rotations.push(Quaternion::one());
        Some(self.positions.len() - 1)
    }

    /// Releases a slot by moving the last slot into it.
    ///
    /// # Returns
    /// The former index of the slot that was moved into `index`, or `None` if `index`
    /// was the last slot.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn swap_remove(&mut self, index: usize) -> Option<usize> {
        let last = self.positions.len() - 1;
        self.positions.swap_remove(index);
        self.rotations.swap_remove(index);
        (index != last).then_some(last)
    }

    /// Position of a slot.
    pub fn position(&self, index: usize) -> Point3<f32> {
        self.positions[index]
    }

    /// Moves a slot.
    pub fn set_position(&mut self, index: usize, position: Point3<f32>) {
        self.positions[index] = position;
    }

    /// Rotation of a slot.
    pub fn rotation(&self, index: usize) -> Quaternion<f32> {
        self.rotations[index]
    }

    /// Applies the same rotation to every slot.
    pub fn set_rotation_all(&mut self, rotation: Quaternion<f32>) {
        self.rotations.iter_mut().for_each(|r| *r = rotation);
    }

    /// Positions of all occupied slots.
    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    /// Model matrices of all occupied slots, ready for upload.
    pub fn raw(&self) -> Vec<InstanceRaw> {
        self.positions
            .iter()
            .zip(&self.rotations)
            .map(|(position, rotation)| {
                let translation: Vector3<f32> = position.to_vec();
                InstanceRaw {
                    model: (Matrix4::from_translation(translation) * Matrix4::from(*rotation)).into(),
                }
            })
            .collect()
    }
}
