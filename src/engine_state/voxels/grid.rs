//! # Chunk Grid Module
//!
//! The `ChunkGrid` owns every resident `VoxelChunk` and is the only way the rest of the
//! engine reads or writes voxel cells.
//!
//! ## Coordinates
//!
//! - *Cell* coordinates are integer world positions, one unit per voxel.
//! - *Chunk keys* are cell coordinates divided by `chunk_size`, rounding toward negative
//!   infinity (`div_euclid`), so cell `-1` lives in chunk `-1` at local coordinate
//!   `chunk_size - 1`.
//! - Continuous positions map to the cell containing them with `floor`.
//!
//! The addressable world is a cube of `world_size` cells per axis whose minimum corner
//! is at `-(chunks_per_axis / 2) * chunk_size`, so the origin is always inside it.
//!
//! ## Storage
//!
//! Chunks are stored sparsely: an absent key reads as air. Chunks are created when an
//! edit writes a solid cell into them or when they stream into view, and evicted some
//! time after leaving the view (see the `streaming` module).

use std::collections::{HashMap, HashSet};

use cgmath::{Point3, Vector3};
use log::{debug, info, warn};

use super::{
    atlas::{is_solid, AtlasId, Atlas, AIR},
    chunk::{ChunkSnapshot, GenerationMethod, VoxelChunk},
    streaming::{chunks_in_radius, ChunkKey, EvictionTracker, ViewChange},
};
use crate::config::GridConfig;
use crate::engine_state::error::{EngineError, EngineResult};
use crate::engine_state::meshing::ChunkMesh;

/// Sparse, chunked voxel storage with view streaming and edit-mode state.
pub struct ChunkGrid {
    /// Edge length of the addressable world, in cells
    world_size: i32,
    /// Edge length of one chunk, in cells
    chunk_size: i32,
    /// Minimum cell coordinate of the world along every axis
    world_min: i32,
    /// Chebyshev radius of the visible region, in chunks
    view_radius: i32,
    /// Generator for chunks streamed into view
    generation: GenerationMethod,
    /// Resident chunks
    chunks: HashMap<ChunkKey, VoxelChunk>,
    /// Chunk containing the viewer at the last update
    active_chunk_key: Option<ChunkKey>,
    /// Visible chunk keys around the active chunk, clipped to the world
    view_chunks: Vec<ChunkKey>,
    /// Chunks that left the view and may be evicted later
    eviction: EvictionTracker,
    /// Number of `update` calls so far
    tick: u64,
    /// Material written by the next add
    current_atlas: AtlasId,
    /// Extent of the next edit along each axis
    current_scale: Vector3<u32>,
    /// Largest allowed extent along any axis
    max_scale: u32,
}

impl ChunkGrid {
    /// Creates an empty grid.
    ///
    /// # Errors
    /// Returns `EngineError::Configuration` if the chunk or world size is not positive,
    /// if `world_size` is not a multiple of `chunk_size`, or if the view radius or
    /// maximum edit scale is out of range.
    pub fn new(config: &GridConfig) -> EngineResult<Self> {
        if config.chunk_size <= 0 {
            return Err(EngineError::Configuration(format!(
                "chunk_size must be positive, got {}",
                config.chunk_size
            )));
        }
        if config.world_size <= 0 {
            return Err(EngineError::Configuration(format!(
                "world_size must be positive, got {}",
                config.world_size
            )));
        }
        if config.world_size % config.chunk_size != 0 {
            return Err(EngineError::Configuration(format!(
                "world_size {} is not a multiple of chunk_size {}",
                config.world_size, config.chunk_size
            )));
        }
        if config.view_radius < 0 {
            return Err(EngineError::Configuration(format!(
                "view_radius must not be negative, got {}",
                config.view_radius
            )));
        }
        if config.max_scale == 0 {
            return Err(EngineError::Configuration("max_scale must be at least 1".into()));
        }

        let chunks_per_axis = config.world_size / config.chunk_size;
        let world_min = -(chunks_per_axis / 2) * config.chunk_size;
        info!(
            "Created chunk grid: {0}x{0}x{0} chunks of {1} cells, world cells {2}..{3}",
            chunks_per_axis,
            config.chunk_size,
            world_min,
            world_min + config.world_size
        );

        Ok(ChunkGrid {
            world_size: config.world_size,
            chunk_size: config.chunk_size,
            world_min,
            view_radius: config.view_radius,
            generation: config.generation,
            chunks: HashMap::new(),
            active_chunk_key: None,
            view_chunks: Vec::new(),
            eviction: EvictionTracker::new(
                config.max_eviction_candidates,
                config.eviction_grace_updates,
            ),
            tick: 0,
            current_atlas: Atlas::GRASS.id(),
            current_scale: Vector3::new(1, 1, 1),
            max_scale: config.max_scale,
        })
    }

    /// Edge length of the addressable world, in cells.
    pub fn world_size(&self) -> i32 {
        self.world_size
    }

    /// Edge length of one chunk, in cells.
    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    /// Minimum and one-past-maximum cell coordinate of the world along every axis.
    pub fn world_bounds(&self) -> (i32, i32) {
        (self.world_min, self.world_min + self.world_size)
    }

    /// The cell containing a continuous position.
    pub fn cell_of(point: Point3<f32>) -> Point3<i32> {
        Point3::new(
            point.x.floor() as i32,
            point.y.floor() as i32,
            point.z.floor() as i32,
        )
    }

    /// The key of the chunk containing a cell.
    pub fn chunk_key(&self, cell: Point3<i32>) -> ChunkKey {
        Point3::new(
            cell.x.div_euclid(self.chunk_size),
            cell.y.div_euclid(self.chunk_size),
            cell.z.div_euclid(self.chunk_size),
        )
    }

    /// The coordinate of a cell inside its chunk.
    pub fn local_cell(&self, cell: Point3<i32>) -> Point3<i32> {
        Point3::new(
            cell.x.rem_euclid(self.chunk_size),
            cell.y.rem_euclid(self.chunk_size),
            cell.z.rem_euclid(self.chunk_size),
        )
    }

    /// `true` if the cell lies inside the addressable world.
    pub fn contains_cell(&self, cell: Point3<i32>) -> bool {
        let range = self.world_min..self.world_min + self.world_size;
        range.contains(&cell.x) && range.contains(&cell.y) && range.contains(&cell.z)
    }

    /// `true` if the chunk lies inside the addressable world.
    pub fn contains_chunk(&self, key: ChunkKey) -> bool {
        self.contains_cell(Point3::new(
            key.x * self.chunk_size,
            key.y * self.chunk_size,
            key.z * self.chunk_size,
        ))
    }

    /// Returns the chunk at `key`, creating an air-filled one if it is absent.
    ///
    /// # Panics
    /// Panics if the chunk lies outside the world. Keys are derived from cells that were
    /// already checked against the world bounds.
    pub fn get_or_create_chunk(&mut self, key: ChunkKey) -> &mut VoxelChunk {
        assert!(self.contains_chunk(key), "chunk {:?} outside the world", key);
        let size = self.chunk_size;
        self.chunks
            .entry(key)
            .or_insert_with(|| VoxelChunk::new(key, size))
    }

    /// Returns the resident chunk at `key`.
    ///
    /// # Errors
    /// Returns `EngineError::NotFound` if the chunk is not resident. Use `has_chunk`
    /// first where absence is expected.
    pub fn get_chunk(&self, key: ChunkKey) -> EngineResult<&VoxelChunk> {
        self.chunks.get(&key).ok_or(EngineError::NotFound(key))
    }

    /// `true` if the chunk at `key` is resident.
    pub fn has_chunk(&self, key: ChunkKey) -> bool {
        self.chunks.contains_key(&key)
    }

    /// Number of resident chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Material of a cell; `AIR` for absent chunks and for cells outside the world.
    pub fn get_cell(&self, cell: Point3<i32>) -> AtlasId {
        if !self.contains_cell(cell) {
            return AIR;
        }
        match self.chunks.get(&self.chunk_key(cell)) {
            Some(chunk) => chunk.get(self.local_cell(cell)),
            None => AIR,
        }
    }

    /// Material of the cell containing a continuous position.
    pub fn material_at(&self, point: Point3<f32>) -> AtlasId {
        self.get_cell(Self::cell_of(point))
    }

    /// `true` if the cell holds a solid material.
    pub fn is_solid_cell(&self, cell: Point3<i32>) -> bool {
        if !self.contains_cell(cell) {
            return false;
        }
        match self.chunks.get(&self.chunk_key(cell)) {
            Some(chunk) => chunk.is_solid(self.local_cell(cell)),
            None => false,
        }
    }

    /// Writes `id` into every cell of the box anchored at `floor(point)` spanning
    /// `extent` cells along each axis.
    ///
    /// Cells outside the world are skipped. Writing air into an absent chunk is a no-op
    /// and does not create the chunk.
    ///
    /// # Returns
    /// The number of cells whose material actually changed. Zero means nothing happened
    /// and no chunk was marked dirty.
    pub fn set_geometry(&mut self, point: Point3<f32>, extent: Vector3<u32>, id: AtlasId) -> usize {
        let anchor = Self::cell_of(point);
        let mut changed = 0;

        for k in 0..extent.z as i32 {
            for j in 0..extent.y as i32 {
                for i in 0..extent.x as i32 {
                    let cell = anchor + Vector3::new(i, j, k);
                    if !self.contains_cell(cell) {
                        continue;
                    }
                    let key = self.chunk_key(cell);
                    let local = self.local_cell(cell);
                    let chunk = if is_solid(id) {
                        self.get_or_create_chunk(key)
                    } else {
                        match self.chunks.get_mut(&key) {
                            Some(chunk) => chunk,
                            None => continue,
                        }
                    };
                    if chunk.set(local, id) {
                        changed += 1;
                    }
                }
            }
        }

        changed
    }

    /// Recomputes the active chunk from the viewer position.
    ///
    /// Nothing else happens unless the viewer moved into a different chunk. When it did,
    /// the visible set is rebuilt, chunks entering it are streamed in (generated if
    /// absent) and chunks leaving it become eviction candidates.
    ///
    /// # Returns
    /// The entered and left chunk keys, or `None` if the active chunk is unchanged.
    pub fn update(&mut self, viewer: Point3<f32>) -> Option<ViewChange> {
        self.tick += 1;
        let key = self.chunk_key(Self::cell_of(viewer));
        if self.active_chunk_key == Some(key) {
            return None;
        }
        self.active_chunk_key = Some(key);

        let view: Vec<ChunkKey> = chunks_in_radius(key, self.view_radius)
            .filter(|k| self.contains_chunk(*k))
            .collect();
        let before: HashSet<ChunkKey> = self.view_chunks.iter().copied().collect();
        let after: HashSet<ChunkKey> = view.iter().copied().collect();

        let entered: Vec<ChunkKey> = view.iter().copied().filter(|k| !before.contains(k)).collect();
        let left: Vec<ChunkKey> = self
            .view_chunks
            .iter()
            .copied()
            .filter(|k| !after.contains(k))
            .collect();

        for &k in &entered {
            self.eviction.entered_view(k);
            if !self.chunks.contains_key(&k) {
                self.chunks
                    .insert(k, VoxelChunk::generate(k, self.chunk_size, self.generation));
            }
        }
        for &k in &left {
            self.eviction.left_view(k, self.tick);
        }
        self.view_chunks = view;

        debug!(
            "Active chunk is now {:?}: {} chunks entered view, {} left",
            key,
            entered.len(),
            left.len()
        );
        Some(ViewChange {
            active: key,
            entered,
            left,
        })
    }

    /// The chunk containing the viewer at the last update.
    pub fn active_chunk_key(&self) -> Option<ChunkKey> {
        self.active_chunk_key
    }

    /// Keys of the chunks currently in view.
    pub fn view_chunks(&self) -> &[ChunkKey] {
        &self.view_chunks
    }

    /// Regenerates the mesh of every dirty chunk in view.
    ///
    /// # Returns
    /// The number of meshes rebuilt.
    pub fn refresh_view_meshes(&mut self) -> usize {
        let mut rebuilt = 0;
        for key in &self.view_chunks {
            if let Some(chunk) = self.chunks.get_mut(key) {
                if chunk.is_dirty() {
                    chunk.regenerate_mesh();
                    rebuilt += 1;
                }
            }
        }
        rebuilt
    }

    /// Fresh meshes of the visible chunks, skipping absent and dirty ones.
    pub fn visible_meshes(&self) -> impl Iterator<Item = (ChunkKey, &ChunkMesh)> + '_ {
        self.view_chunks.iter().filter_map(move |key| {
            self.chunks
                .get(key)
                .and_then(|chunk| chunk.mesh())
                .map(|mesh| (*key, mesh))
        })
    }

    /// Evicts chunks that have been out of view longer than the grace period.
    ///
    /// Chunks in `pinned` (e.g. holding live pooled entities) are kept. Resident chunks
    /// outside the view that are not yet candidates (created by edits or blasts, or
    /// dropped by a full tracker) start their grace period here.
    ///
    /// # Returns
    /// Snapshots of the evicted chunks, for the persistence collaborator.
    pub fn evict_stale(&mut self, pinned: &HashSet<ChunkKey>) -> Vec<ChunkSnapshot> {
        self.track_resident_outside_view();
        let stale = self.eviction.stale(self.tick, pinned);
        let mut evicted = Vec::with_capacity(stale.len());
        for key in stale {
            self.eviction.forget(key);
            if let Some(chunk) = self.chunks.remove(&key) {
                debug!("Evicted chunk {:?} ({} solid cells)", key, chunk.solid_count());
                evicted.push(chunk.snapshot());
            }
        }
        evicted
    }

    /// Starts tracking resident chunks outside the view that nothing tracks yet, as long
    /// as the tracker has room.
    fn track_resident_outside_view(&mut self) {
        let view: HashSet<ChunkKey> = self.view_chunks.iter().copied().collect();
        for &key in self.chunks.keys() {
            if !self.eviction.has_room() {
                break;
            }
            if !view.contains(&key) && !self.eviction.contains(key) {
                self.eviction.left_view(key, self.tick);
            }
        }
    }

    /// Makes a persisted chunk resident again, replacing whatever was there.
    ///
    /// # Errors
    /// Returns `EngineError::Configuration` if the snapshot was taken with a different
    /// chunk size or lies outside the world.
    pub fn load_snapshot(&mut self, snapshot: ChunkSnapshot) -> EngineResult<()> {
        let volume = (self.chunk_size * self.chunk_size * self.chunk_size) as usize;
        if snapshot.size != self.chunk_size || snapshot.cells.len() != volume {
            return Err(EngineError::Configuration(format!(
                "snapshot of size {} ({} cells) does not fit chunk size {}",
                snapshot.size,
                snapshot.cells.len(),
                self.chunk_size
            )));
        }
        let [x, y, z] = snapshot.origin;
        let key = Point3::new(x, y, z);
        if !self.contains_chunk(key) {
            return Err(EngineError::Configuration(format!(
                "snapshot chunk {:?} lies outside the world",
                key
            )));
        }
        self.chunks.insert(key, VoxelChunk::from_snapshot(snapshot));
        Ok(())
    }

    /// Selects the material used by the next add.
    ///
    /// Air is not a selectable material; selecting it is ignored.
    pub fn set_atlas_id(&mut self, id: AtlasId) {
        if is_solid(id) {
            self.current_atlas = id;
        } else {
            warn!("Ignoring selection of non-solid material {}", id);
        }
    }

    /// The material used by the next add.
    pub fn atlas_id(&self) -> AtlasId {
        self.current_atlas
    }

    /// The extent of the next edit.
    pub fn scale(&self) -> Vector3<u32> {
        self.current_scale
    }

    /// Grows or shrinks the edit extent along x. Growing is only allowed while the
    /// extent is below the maximum; the extent never drops below one.
    pub fn set_scale_x(&mut self, delta: i32) {
        self.current_scale.x = Self::step_scale(self.current_scale.x, delta, self.max_scale);
    }

    /// Same as `set_scale_x`, along y.
    pub fn set_scale_y(&mut self, delta: i32) {
        self.current_scale.y = Self::step_scale(self.current_scale.y, delta, self.max_scale);
    }

    /// Same as `set_scale_x`, along z.
    pub fn set_scale_z(&mut self, delta: i32) {
        self.current_scale.z = Self::step_scale(self.current_scale.z, delta, self.max_scale);
    }

    fn step_scale(current: u32, delta: i32, max: u32) -> u32 {
        if current >= max && delta > 0 {
            return current;
        }
        (current as i64 + delta as i64).clamp(1, max as i64) as u32
    }

    /// Sets the edit extent back to a single cell.
    pub fn reset_scale(&mut self) {
        self.current_scale = Vector3::new(1, 1, 1);
    }

    /// Number of cells the next edit covers.
    pub fn scale_size(&self) -> u32 {
        self.current_scale.x * self.current_scale.y * self.current_scale.z
    }

    /// Mesh of the pending edit for the current material and extent, at the origin.
    pub fn preview_mesh(&self) -> ChunkMesh {
        ChunkMesh::preview(self.current_atlas, self.current_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(world_size: i32, chunk_size: i32) -> ChunkGrid {
        ChunkGrid::new(&GridConfig {
            world_size,
            chunk_size,
            ..GridConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn construction_requires_whole_chunks() {
        for (world, chunk) in [(32, 8), (64, 16), (8, 8), (30, 5)] {
            assert!(ChunkGrid::new(&GridConfig {
                world_size: world,
                chunk_size: chunk,
                ..GridConfig::default()
            })
            .is_ok());
        }
        for (world, chunk) in [(30, 8), (64, 0), (0, 8), (7, 8)] {
            let result = ChunkGrid::new(&GridConfig {
                world_size: world,
                chunk_size: chunk,
                ..GridConfig::default()
            });
            assert!(matches!(result, Err(EngineError::Configuration(_))));
        }
    }

    #[test]
    fn world_is_centered_on_the_origin() {
        let grid = grid(32, 8);
        assert_eq!(grid.world_bounds(), (-16, 16));
        assert!(grid.contains_cell(Point3::new(-16, 0, 15)));
        assert!(!grid.contains_cell(Point3::new(16, 0, 0)));
        assert!(grid.contains_chunk(Point3::new(-2, 1, 0)));
        assert!(!grid.contains_chunk(Point3::new(2, 0, 0)));
    }

    #[test]
    fn negative_cells_round_toward_negative_infinity() {
        let grid = grid(32, 8);
        assert_eq!(grid.chunk_key(Point3::new(-1, 0, 7)), Point3::new(-1, 0, 0));
        assert_eq!(grid.local_cell(Point3::new(-1, 0, 7)), Point3::new(7, 0, 7));
        assert_eq!(grid.chunk_key(Point3::new(-8, -9, 8)), Point3::new(-1, -2, 1));
        assert_eq!(ChunkGrid::cell_of(Point3::new(-0.25, 0.0, 1.99)), Point3::new(-1, 0, 1));
    }

    #[test]
    fn set_geometry_writes_and_is_idempotent() {
        let mut grid = grid(32, 8);
        let changed = grid.set_geometry(Point3::new(-0.5, 0.2, 6.7), Vector3::new(2, 1, 3), 2);
        assert_eq!(changed, 6);
        // The box straddles chunks -1 and 0 along x and 0 and 1 along z.
        assert_eq!(grid.chunk_count(), 4);
        for cell in [Point3::new(-1, 0, 6), Point3::new(0, 0, 8)] {
            assert_eq!(grid.get_cell(cell), 2);
        }

        assert_eq!(grid.set_geometry(Point3::new(-0.5, 0.2, 6.7), Vector3::new(2, 1, 3), 2), 0);
    }

    #[test]
    fn noop_edits_leave_meshes_clean() {
        let mut grid = grid(32, 8);
        grid.set_geometry(Point3::new(0.0, 0.0, 0.0), Vector3::new(1, 1, 1), 1);
        grid.get_or_create_chunk(Point3::new(0, 0, 0)).regenerate_mesh();

        assert_eq!(grid.set_geometry(Point3::new(3.0, 3.0, 3.0), Vector3::new(1, 1, 1), AIR), 0);
        assert!(!grid.get_chunk(Point3::new(0, 0, 0)).unwrap().is_dirty());

        assert_eq!(grid.set_geometry(Point3::new(0.5, 0.5, 0.5), Vector3::new(1, 1, 1), AIR), 1);
        assert!(grid.get_chunk(Point3::new(0, 0, 0)).unwrap().is_dirty());
    }

    #[test]
    fn removing_from_absent_chunks_creates_nothing() {
        let mut grid = grid(32, 8);
        assert_eq!(grid.set_geometry(Point3::new(5.0, 5.0, 5.0), Vector3::new(3, 3, 3), AIR), 0);
        assert_eq!(grid.chunk_count(), 0);
    }

    #[test]
    fn edits_are_clipped_to_the_world() {
        let mut grid = grid(32, 8);
        let changed = grid.set_geometry(Point3::new(14.0, 0.0, 0.0), Vector3::new(5, 1, 1), 1);
        assert_eq!(changed, 2);
        assert_eq!(grid.get_cell(Point3::new(16, 0, 0)), AIR);
    }

    #[test]
    fn get_chunk_reports_missing_chunks() {
        let grid = grid(32, 8);
        let key = Point3::new(1, 1, 1);
        assert!(!grid.has_chunk(key));
        assert!(matches!(grid.get_chunk(key), Err(EngineError::NotFound(k)) if k == key));
    }

    #[test]
    fn update_only_reports_chunk_crossings() {
        let mut grid = grid(64, 8);
        let first = grid.update(Point3::new(0.5, 0.5, 0.5)).unwrap();
        assert_eq!(first.active, Point3::new(0, 0, 0));
        assert_eq!(first.entered.len(), 27);
        assert!(first.left.is_empty());
        assert_eq!(grid.chunk_count(), 27);

        assert!(grid.update(Point3::new(7.9, 0.5, 0.5)).is_none());

        let change = grid.update(Point3::new(8.1, 0.5, 0.5)).unwrap();
        assert_eq!(change.active, Point3::new(1, 0, 0));
        assert_eq!(change.entered.len(), 9);
        assert_eq!(change.left.len(), 9);
        assert!(change.left.iter().all(|k| k.x == -1));
        assert_eq!(grid.active_chunk_key(), Some(Point3::new(1, 0, 0)));
    }

    #[test]
    fn view_is_clipped_to_the_world() {
        let mut grid = grid(32, 8);
        let change = grid.update(Point3::new(-15.5, 0.5, 0.5)).unwrap();
        assert_eq!(change.active, Point3::new(-2, 0, 0));
        assert_eq!(change.entered.len(), 2 * 3 * 3);
    }

    #[test]
    fn stale_chunks_are_evicted_as_snapshots() {
        let mut grid = grid(64, 8);
        grid.update(Point3::new(0.5, 0.5, 0.5));
        grid.set_geometry(Point3::new(-4.0, 0.0, 0.0), Vector3::new(1, 1, 1), 3);
        grid.update(Point3::new(8.5, 0.5, 0.5));

        let pinned = HashSet::new();
        assert!(grid.evict_stale(&pinned).is_empty());
        grid.update(Point3::new(9.5, 0.5, 0.5));
        grid.update(Point3::new(10.5, 0.5, 0.5));

        let evicted = grid.evict_stale(&pinned);
        assert_eq!(evicted.len(), 9);
        assert!(!grid.has_chunk(Point3::new(-1, 0, 0)));
        let saved = evicted.iter().find(|s| s.origin == [-1, 0, 0]).unwrap();
        assert_eq!(saved.cells.iter().filter(|&&id| id == 3).count(), 1);

        grid.load_snapshot(saved.clone()).unwrap();
        assert_eq!(grid.get_cell(Point3::new(-4, 0, 0)), 3);
    }

    #[test]
    fn pinned_chunks_survive_eviction() {
        let mut grid = grid(64, 8);
        grid.update(Point3::new(0.5, 0.5, 0.5));
        grid.update(Point3::new(8.5, 0.5, 0.5));
        grid.update(Point3::new(9.5, 0.5, 0.5));
        grid.update(Point3::new(10.5, 0.5, 0.5));

        let pinned: HashSet<_> = [Point3::new(-1, 0, 0)].into_iter().collect();
        assert_eq!(grid.evict_stale(&pinned).len(), 8);
        assert!(grid.has_chunk(Point3::new(-1, 0, 0)));
    }

    #[test]
    fn chunks_edited_outside_the_view_are_evicted_eventually() {
        let mut grid = ChunkGrid::new(&GridConfig {
            world_size: 64,
            chunk_size: 8,
            max_eviction_candidates: 2,
            ..GridConfig::default()
        })
        .unwrap();
        let viewer = Point3::new(0.5, 0.5, 0.5);
        grid.update(viewer);
        for corner in [
            Point3::new(24.0, 0.0, 0.0),
            Point3::new(-32.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 24.0),
            Point3::new(0.0, 0.0, -32.0),
        ] {
            grid.set_geometry(corner, Vector3::new(1, 1, 1), 2);
        }
        assert_eq!(grid.chunk_count(), 31);

        let pinned = HashSet::new();
        let mut evicted = Vec::new();
        for _ in 0..4 {
            evicted.extend(grid.evict_stale(&pinned));
            grid.update(viewer);
            grid.update(viewer);
        }
        evicted.extend(grid.evict_stale(&pinned));

        assert_eq!(evicted.len(), 4);
        assert_eq!(grid.chunk_count(), 27);
        assert!(grid.view_chunks().iter().all(|key| grid.has_chunk(*key)));
    }

    #[test]
    fn mismatched_snapshot_is_rejected() {
        let mut grid = grid(32, 8);
        let snapshot = VoxelChunk::new(Point3::new(0, 0, 0), 4).snapshot();
        assert!(matches!(grid.load_snapshot(snapshot), Err(EngineError::Configuration(_))));
    }

    #[test]
    fn refresh_rebuilds_only_dirty_visible_chunks() {
        let mut grid = grid(32, 8);
        grid.update(Point3::new(0.5, 0.5, 0.5));
        assert_eq!(grid.refresh_view_meshes(), 27);
        assert_eq!(grid.refresh_view_meshes(), 0);

        grid.set_geometry(Point3::new(1.0, 1.0, 1.0), Vector3::new(1, 1, 1), 0);
        assert_eq!(grid.visible_meshes().count(), 26);
        assert_eq!(grid.refresh_view_meshes(), 1);

        let (_, mesh) = grid
            .visible_meshes()
            .find(|(key, _)| *key == Point3::new(0, 0, 0))
            .unwrap();
        assert_eq!(mesh.face_count(), 6);
    }

    #[test]
    fn scale_steps_stay_in_range() {
        let mut grid = grid(32, 8);
        for _ in 0..10 {
            grid.set_scale_x(1);
        }
        grid.set_scale_y(1);
        grid.set_scale_z(-1);
        assert_eq!(grid.scale(), Vector3::new(5, 2, 1));
        assert_eq!(grid.scale_size(), 10);
        assert_eq!(grid.preview_mesh().face_count(), 2 * (10 + 5 + 2));

        grid.reset_scale();
        assert_eq!(grid.scale_size(), 1);
    }

    #[test]
    fn air_is_not_a_selectable_material() {
        let mut grid = grid(32, 8);
        grid.set_atlas_id(4);
        grid.set_atlas_id(AIR);
        assert_eq!(grid.atlas_id(), 4);
    }
}
