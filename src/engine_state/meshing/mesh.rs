//! Mesh data structures for chunk and preview geometry.
//!
//! Geometry is kept split by `BlockSide` so the renderer can cull whole groups of faces
//! that point away from the camera.

use cgmath::{EuclideanSpace, Point3, Vector3};

use super::{face::Face, vertex::Vertex};
use crate::engine_state::voxels::{
    atlas::{texture_index, AtlasId},
    block_side::BlockSide,
    chunk::VoxelChunk,
};

/// Vertices and indices of every face pointing in one direction.
#[derive(Debug, Clone)]
pub struct MeshSide {
    /// The vertex data for this mesh side
    pub vertices: Vec<Vertex>,
    /// The index data for this mesh side
    pub indices: Vec<u32>,
    /// Which block side this mesh represents
    pub side: BlockSide,
}

impl MeshSide {
    /// Creates a new, empty `MeshSide` for the specified block side.
    pub fn new(side: BlockSide) -> Self {
        MeshSide {
            vertices: Vec::new(),
            indices: Vec::new(),
            side,
        }
    }

    /// Number of quads in this side.
    pub fn face_count(&self) -> usize {
        self.vertices.len() / 4
    }
}

/// Triangle geometry of a chunk (or of the edit preview), one `MeshSide` per face direction.
#[derive(Debug, Clone)]
pub struct ChunkMesh {
    /// Array of mesh sides, indexed by `BlockSide` discriminant.
    pub mesh: [MeshSide; 6],
}

impl Default for ChunkMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkMesh {
    /// Creates a new, empty mesh with all sides initialized.
    pub fn new() -> Self {
        ChunkMesh {
            mesh: BlockSide::all().map(MeshSide::new),
        }
    }

    /// Builds the face-culled mesh of a chunk.
    ///
    /// A face is emitted for every side of a solid cell whose neighbour is air. Neighbours
    /// outside the chunk are treated as air, so faces on the chunk border are always kept.
    pub fn from_chunk(chunk: &VoxelChunk) -> Self {
        let mut mesh = ChunkMesh::new();
        let world_min = chunk.world_min().to_vec();

        for (local, atlas) in chunk.iter_solid() {
            for side in BlockSide::all() {
                let neighbour = local + side.normal();
                if chunk.contains_local(neighbour) && chunk.is_solid(neighbour) {
                    continue;
                }
                mesh.add_face(&Face::new(local + world_min, atlas, side));
            }
        }

        mesh
    }

    /// Builds the preview geometry for a pending edit: a box of `scale` cells of
    /// material `atlas` with its minimum corner at the origin.
    ///
    /// Faces shared by two cells of the box are culled.
    pub fn preview(atlas: AtlasId, scale: Vector3<u32>) -> Self {
        let mut mesh = ChunkMesh::new();
        let extent = scale.cast::<i32>().unwrap_or(Vector3::new(1, 1, 1));
        let inside = |p: Point3<i32>| {
            (0..extent.x).contains(&p.x) && (0..extent.y).contains(&p.y) && (0..extent.z).contains(&p.z)
        };

        for i in 0..extent.x {
            for j in 0..extent.y {
                for k in 0..extent.z {
                    let cell = Point3::new(i, j, k);
                    for side in BlockSide::all() {
                        if !inside(cell + side.normal()) {
                            mesh.add_face(&Face::new(cell, atlas, side));
                        }
                    }
                }
            }
        }

        mesh
    }

    /// Appends one quad to the side it belongs to.
    pub fn add_face(&mut self, face: &Face) {
        let side = &mut self.mesh[face.block_side as usize];
        let base = side.vertices.len() as u32;
        side.vertices.extend(Self::generate_face_vertices(face));
        side.indices.extend(Self::generate_face_indices(base));
    }

    /// Generates the four vertices of a face.
    ///
    /// The vertices are ordered so that, combined with `generate_face_indices`,
    /// they form two counter-clockwise triangles.
    pub fn generate_face_vertices(face: &Face) -> [Vertex; 4] {
        let texture = texture_index(face.atlas);
        let [ll, lr, ul, ur] = face.corners();
        [
            Vertex::new(ll, texture, 0, 1),
            Vertex::new(lr, texture, 1, 1),
            Vertex::new(ul, texture, 0, 0),
            Vertex::new(ur, texture, 1, 0),
        ]
    }

    /// Generates the six indices of a face whose first vertex is at `base`.
    pub fn generate_face_indices(base: u32) -> [u32; 6] {
        [base, base + 1, base + 3, base, base + 3, base + 2]
    }

    /// Total number of quads over all sides.
    pub fn face_count(&self) -> usize {
        self.mesh.iter().map(MeshSide::face_count).sum()
    }

    /// `true` if the mesh has no geometry.
    pub fn is_empty(&self) -> bool {
        self.face_count() == 0
    }

    /// Geometry of a single side.
    pub fn side(&self, side: BlockSide) -> &MeshSide {
        &self.mesh[side as usize]
    }
}
