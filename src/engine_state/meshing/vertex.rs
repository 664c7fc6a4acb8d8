//! Vertex data structures for chunk and preview geometry.
//!
//! The renderer that uploads these is an external collaborator; the layout is kept
//! `#[repr(C)]` and `Pod` so it can be copied into a GPU buffer without conversion.

use cgmath::Point3;

/// A vertex of chunk or preview geometry.
///
/// # Memory Layout
/// - Position: 3x i32 (12 bytes)
/// - Texture Index: u32 (4 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
///
/// Total size: 24 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// X coordinate in world space
    x: i32,
    /// Y coordinate in world space
    y: i32,
    /// Z coordinate in world space
    z: i32,
    /// Row of the texture atlas
    texture_index: u32,
    /// UV texture coordinates
    tex_coords: [f32; 2],
}

impl Vertex {
    /// Creates a new vertex.
    ///
    /// # Arguments
    /// * `pos` - The position of the vertex in world cell coordinates
    /// * `texture_index` - Row of the texture atlas
    /// * `u` - U texture coordinate
    /// * `v` - V texture coordinate
    pub fn new(pos: Point3<i32>, texture_index: usize, u: u8, v: u8) -> Self {
        Vertex {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            texture_index: texture_index as u32,
            tex_coords: [u as f32, v as f32],
        }
    }

    /// Position of the vertex.
    pub fn position(&self) -> Point3<i32> {
        Point3::new(self.x, self.y, self.z)
    }

    /// Texture atlas row of the vertex.
    pub fn texture_index(&self) -> u32 {
        self.texture_index
    }
}
