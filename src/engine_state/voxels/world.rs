//! # World Module
//!
//! The sparse map of cell id -> chunk. Only cells that have been written or
//! explicitly generated exist in memory, which keeps the addressable volume
//! unbounded. Reads of missing cells see air; writes allocate on demand.
//!
//! The world is owned and mutated by a single thread. Mesh workers never see
//! it directly: at dispatch time the world produces an owned [`MeshInput`]
//! snapshot of the target cell and its six face neighbors.

use std::collections::HashMap;

use super::addressing::{local_offset, CellId};
use super::chunk::{Chunk, ChunkFill};
use super::{VoxelId, AIR};

/// Voxel-space offsets of the six face-adjacent cells, in the fixed face
/// order used throughout meshing: left (-x), right (+x), bottom (-y),
/// top (+y), back (-z), front (+z).
pub const NEIGHBOR_CELL_OFFSETS: [[i32; 3]; 6] = [
    [-1, 0, 0],
    [1, 0, 0],
    [0, -1, 0],
    [0, 1, 0],
    [0, 0, -1],
    [0, 0, 1],
];

/// An owned, immutable snapshot of one cell and its six face neighbors,
/// taken at dispatch time and handed to a mesh worker.
///
/// `None` voxel data means the cell was absent (or deleted mid-flight) and
/// reads as all-air.
pub struct MeshInput {
    /// The cell this snapshot was taken for.
    pub cell: CellId,
    /// Edge length of every chunk in the snapshot.
    pub cell_size: i32,
    /// The target cell's voxels, if the cell exists.
    pub voxels: Option<Vec<VoxelId>>,
    /// The six face neighbors' voxels, in [`NEIGHBOR_CELL_OFFSETS`] order.
    pub neighbors: [Option<Vec<VoxelId>>; 6],
    /// Whether the resulting geometry must be applied even when empty.
    pub force_update: bool,
}

impl MeshInput {
    /// A snapshot with no voxel data at all; builds to empty geometry.
    pub fn empty(cell: CellId, cell_size: i32, force_update: bool) -> Self {
        MeshInput {
            cell,
            cell_size,
            voxels: None,
            neighbors: Default::default(),
            force_update,
        }
    }

    /// Reads the voxel at chunk-local coordinates, following the coordinate
    /// into the matching neighbor snapshot when it falls outside the cell.
    ///
    /// Coordinates more than one cell away (never produced by the 6-face
    /// scan) and absent chunks read as air.
    pub fn voxel_at(&self, lx: i32, ly: i32, lz: i32) -> VoxelId {
        let s = self.cell_size;
        let (dx, dy, dz) = (lx.div_euclid(s), ly.div_euclid(s), lz.div_euclid(s));

        let source = if (dx, dy, dz) == (0, 0, 0) {
            self.voxels.as_ref()
        } else {
            NEIGHBOR_CELL_OFFSETS
                .iter()
                .position(|&[ox, oy, oz]| (ox, oy, oz) == (dx, dy, dz))
                .and_then(|side| self.neighbors[side].as_ref())
        };

        match source {
            Some(voxels) => voxels[local_offset(lx, ly, lz, s)],
            None => AIR,
        }
    }
}

/// The sparse chunk store: owns all voxel data, allocates cells lazily and
/// produces meshing snapshots.
pub struct World {
    cells: HashMap<CellId, Chunk>,
    cell_size: i32,
    fill: ChunkFill,
}

impl World {
    /// Creates an empty world.
    ///
    /// `cell_size` is the chunk edge length; `fill` is the strategy used by
    /// [`World::ensure_generated`] for unexplored cells.
    pub fn new(cell_size: i32, fill: ChunkFill) -> Self {
        World {
            cells: HashMap::new(),
            cell_size,
            fill,
        }
    }

    /// The configured chunk edge length.
    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    /// The voxel at world coordinates, or air when the owning cell is
    /// absent. Valid for any integer coordinates.
    pub fn get_voxel(&self, x: i32, y: i32, z: i32) -> VoxelId {
        let cell = CellId::containing(x, y, z, self.cell_size);
        match self.cells.get(&cell) {
            Some(chunk) => chunk.get(local_offset(x, y, z, self.cell_size)),
            None => AIR,
        }
    }

    /// Writes a voxel at world coordinates.
    ///
    /// Allocates an air-filled chunk on demand unless `allocate_if_missing`
    /// is false, in which case a write into an absent cell is a no-op.
    /// Values outside the block-type table are stored opaquely; validation
    /// is the caller's concern.
    pub fn set_voxel(&mut self, x: i32, y: i32, z: i32, voxel: VoxelId, allocate_if_missing: bool) {
        let cell = CellId::containing(x, y, z, self.cell_size);
        let cell_size = self.cell_size;

        if !self.cells.contains_key(&cell) {
            if !allocate_if_missing {
                return;
            }
            self.cells.insert(cell, Chunk::air(cell_size));
        }

        if let Some(chunk) = self.cells.get_mut(&cell) {
            chunk.set(local_offset(x, y, z, cell_size), voxel);
        }
    }

    /// Allocates and fills the cell with the configured generation fill if
    /// it does not exist yet. Idempotent.
    pub fn ensure_generated(&mut self, cell: CellId) {
        if !self.cells.contains_key(&cell) {
            self.cells
                .insert(cell, Chunk::from_fill(self.cell_size, &self.fill, cell));
        }
    }

    /// Removes the cell's voxel data. Distinct from hiding its mesh at the
    /// render layer; subsequent reads see air.
    pub fn delete_cell(&mut self, cell: CellId) {
        self.cells.remove(&cell);
    }

    /// Whether the cell currently has voxel data.
    pub fn contains_cell(&self, cell: CellId) -> bool {
        self.cells.contains_key(&cell)
    }

    /// The chunk stored for `cell`, if any.
    pub fn cell(&self, cell: CellId) -> Option<&Chunk> {
        self.cells.get(&cell)
    }

    /// Number of allocated cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Ids of every allocated cell, in no particular order.
    pub fn loaded_cells(&self) -> Vec<CellId> {
        self.cells.keys().copied().collect()
    }

    /// Takes the owned snapshot handed to a mesh worker: the cell's voxels
    /// plus its six face neighbors'. Absent chunks snapshot as `None` and
    /// read as air, so a cell deleted mid-flight builds to empty geometry.
    pub fn snapshot_for_meshing(&self, cell: CellId, force_update: bool) -> MeshInput {
        let mut input = MeshInput::empty(cell, self.cell_size, force_update);
        input.voxels = self.cells.get(&cell).map(Chunk::to_snapshot);
        for (side, &[dx, dy, dz]) in NEIGHBOR_CELL_OFFSETS.iter().enumerate() {
            input.neighbors[side] = self
                .cells
                .get(&cell.offset(dx, dy, dz))
                .map(Chunk::to_snapshot);
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::{STONE, WATER};

    fn world() -> World {
        World::new(16, ChunkFill::Solid { voxel: STONE })
    }

    #[test]
    fn set_then_get_round_trips_for_negative_coordinates() {
        let mut world = world();
        for &(x, y, z) in &[(0, 0, 0), (-1, -1, -1), (15, -16, 100), (-33, 5, -2)] {
            world.set_voxel(x, y, z, WATER, true);
            assert_eq!(world.get_voxel(x, y, z), WATER, "at ({},{},{})", x, y, z);
        }
    }

    #[test]
    fn reads_of_missing_cells_are_air() {
        let world = world();
        assert_eq!(world.get_voxel(123, -456, 789), AIR);
        assert_eq!(world.cell_count(), 0);
    }

    #[test]
    fn set_without_allocation_is_a_noop() {
        let mut world = world();
        world.set_voxel(1, 2, 3, STONE, false);
        assert_eq!(world.cell_count(), 0);
        assert_eq!(world.get_voxel(1, 2, 3), AIR);
    }

    #[test]
    fn ensure_generated_fills_solid_and_is_idempotent() {
        let mut world = world();
        let cell = CellId::new(0, 0, 0);
        world.ensure_generated(cell);
        assert_eq!(world.get_voxel(5, 5, 5), STONE);

        // A later edit survives repeated generation calls.
        world.set_voxel(5, 5, 5, AIR, true);
        world.ensure_generated(cell);
        assert_eq!(world.get_voxel(5, 5, 5), AIR);
        assert_eq!(world.cell_count(), 1);
    }

    #[test]
    fn delete_cell_reads_as_air_again() {
        let mut world = world();
        world.set_voxel(0, 0, 0, STONE, true);
        world.delete_cell(CellId::new(0, 0, 0));
        assert!(!world.contains_cell(CellId::new(0, 0, 0)));
        assert_eq!(world.get_voxel(0, 0, 0), AIR);
    }

    #[test]
    fn snapshot_carries_cell_and_neighbors() {
        let mut world = world();
        world.set_voxel(0, 0, 0, STONE, true);
        world.set_voxel(-1, 0, 0, WATER, true); // -x neighbor cell

        let input = world.snapshot_for_meshing(CellId::new(0, 0, 0), false);
        assert!(input.voxels.is_some());
        assert_eq!(input.voxel_at(0, 0, 0), STONE);
        // Crossing the -x boundary lands in the neighbor snapshot.
        assert_eq!(input.voxel_at(-1, 0, 0), WATER);
        // Unloaded neighbors read as air.
        assert_eq!(input.voxel_at(16, 0, 0), AIR);
    }

    #[test]
    fn snapshot_of_deleted_cell_reads_all_air() {
        let world = world();
        let input = world.snapshot_for_meshing(CellId::new(3, 3, 3), true);
        assert!(input.voxels.is_none());
        assert!(input.force_update);
        assert_eq!(input.voxel_at(8, 8, 8), AIR);
    }
}
