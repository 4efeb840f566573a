//! # Chunk Module
//!
//! A chunk is a dense `cell_size^3` cube of voxel ids, the unit of storage
//! and of remeshing granularity. Storage is a flat `Vec<VoxelId>` in
//! `y * cell_size^2 + z * cell_size + x` order, paired with a bit vector
//! holding one occupancy bit per voxel for O(1) emptiness checks.
//!
//! Missing chunks are represented by absence from the world map; a chunk
//! that exists always has exactly `cell_size^3` slots.

use bitvec::prelude::BitVec;
use noise::{NoiseFn, Perlin};
use serde::Deserialize;

use super::addressing::CellId;
use super::block::{DIRT, GRASS, STONE};
use super::{VoxelId, AIR};

/// Threshold above which Perlin noise is considered solid during fill.
const PERLIN_POSITIVE_THRESHOLD: f64 = 0.2;
/// Threshold below which Perlin noise is considered solid during fill.
const PERLIN_NEGATIVE_THRESHOLD: f64 = -0.2;
/// Scaling factor applied to world coordinates when sampling Perlin noise.
const PERLIN_SCALE_FACTOR: f64 = 0.02;

/// How a freshly generated chunk is populated.
///
/// The default, `Solid`, is the "solid until proven otherwise" value used
/// for as-yet-unexplored cells.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChunkFill {
    /// All air.
    Empty,
    /// Every slot holds the given voxel.
    Solid {
        /// The voxel id written into every slot.
        voxel: VoxelId,
    },
    /// Thresholded 3D Perlin noise sampled at world coordinates.
    Noise {
        /// Seed for the noise source.
        seed: u32,
    },
    /// Alternating solid/air test pattern.
    Checkerboard {
        /// The voxel id used for the solid half of the pattern.
        voxel: VoxelId,
    },
}

impl Default for ChunkFill {
    fn default() -> Self {
        ChunkFill::Solid { voxel: STONE }
    }
}

/// A dense `cell_size^3` cube of voxels.
pub struct Chunk {
    voxels: Vec<VoxelId>,
    occupancy: BitVec,
    cell_size: i32,
}

impl Chunk {
    /// Creates a chunk with every slot set to air.
    pub fn air(cell_size: i32) -> Self {
        let volume = (cell_size * cell_size * cell_size) as usize;
        Chunk {
            voxels: vec![AIR; volume],
            occupancy: BitVec::repeat(false, volume),
            cell_size,
        }
    }

    /// Creates a chunk with every slot set to `voxel`.
    pub fn solid(cell_size: i32, voxel: VoxelId) -> Self {
        let mut chunk = Chunk::air(cell_size);
        for offset in 0..chunk.voxels.len() {
            chunk.set(offset, voxel);
        }
        chunk
    }

    /// Creates a chunk from thresholded 3D Perlin noise.
    ///
    /// Samples world coordinates derived from the cell origin, so adjacent
    /// cells line up seamlessly. Solid samples pick one of a few surface
    /// block types at random.
    pub fn noise(cell_size: i32, seed: u32, cell: CellId) -> Self {
        let perlin = Perlin::new(seed);
        let origin = cell.origin(cell_size);
        let mut chunk = Chunk::air(cell_size);

        for ly in 0..cell_size {
            for lz in 0..cell_size {
                for lx in 0..cell_size {
                    let sample = perlin.get([
                        (origin.x + lx) as f64 * PERLIN_SCALE_FACTOR,
                        (origin.y + ly) as f64 * PERLIN_SCALE_FACTOR,
                        (origin.z + lz) as f64 * PERLIN_SCALE_FACTOR,
                    ]);
                    if !(PERLIN_NEGATIVE_THRESHOLD..=PERLIN_POSITIVE_THRESHOLD).contains(&sample) {
                        let voxel = match fastrand::u8(0..3) {
                            0 => GRASS,
                            1 => DIRT,
                            _ => STONE,
                        };
                        let offset =
                            (ly * cell_size * cell_size + lz * cell_size + lx) as usize;
                        chunk.set(offset, voxel);
                    }
                }
            }
        }

        chunk
    }

    /// Creates a chunk with a 3D checkerboard test pattern.
    pub fn checkerboard(cell_size: i32, voxel: VoxelId) -> Self {
        let mut chunk = Chunk::air(cell_size);
        for ly in 0..cell_size {
            for lz in 0..cell_size {
                for lx in 0..cell_size {
                    if (lx + ly + lz) % 2 == 0 {
                        let offset =
                            (ly * cell_size * cell_size + lz * cell_size + lx) as usize;
                        chunk.set(offset, voxel);
                    }
                }
            }
        }
        chunk
    }

    /// Creates a chunk using the given fill strategy.
    pub fn from_fill(cell_size: i32, fill: &ChunkFill, cell: CellId) -> Self {
        match *fill {
            ChunkFill::Empty => Chunk::air(cell_size),
            ChunkFill::Solid { voxel } => Chunk::solid(cell_size, voxel),
            ChunkFill::Noise { seed } => Chunk::noise(cell_size, seed, cell),
            ChunkFill::Checkerboard { voxel } => Chunk::checkerboard(cell_size, voxel),
        }
    }

    /// The edge length of this chunk in voxels.
    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    /// The voxel at the given linear offset.
    ///
    /// # Panics
    /// Panics if `offset` is out of range; callers derive offsets from
    /// [`super::addressing::local_offset`], which cannot exceed the volume.
    pub fn get(&self, offset: usize) -> VoxelId {
        self.voxels[offset]
    }

    /// Writes the voxel at the given linear offset, keeping the occupancy
    /// mask in sync.
    pub fn set(&mut self, offset: usize, voxel: VoxelId) {
        self.voxels[offset] = voxel;
        self.occupancy.set(offset, voxel != AIR);
    }

    /// Whether every slot is air.
    pub fn is_empty(&self) -> bool {
        self.occupancy.not_any()
    }

    /// Number of non-air voxels.
    pub fn solid_count(&self) -> usize {
        self.occupancy.count_ones()
    }

    /// Read-only view of the raw voxel slots.
    pub fn voxels(&self) -> &[VoxelId] {
        &self.voxels
    }

    /// An owned copy of the voxel slots, used for dispatch-time snapshots.
    pub fn to_snapshot(&self) -> Vec<VoxelId> {
        self.voxels.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn air_chunk_is_empty() {
        let chunk = Chunk::air(4);
        assert_eq!(chunk.voxels().len(), 64);
        assert!(chunk.is_empty());
        assert_eq!(chunk.solid_count(), 0);
    }

    #[test]
    fn solid_chunk_fills_every_slot() {
        let chunk = Chunk::solid(4, STONE);
        assert!(!chunk.is_empty());
        assert_eq!(chunk.solid_count(), 64);
        assert!(chunk.voxels().iter().all(|&v| v == STONE));
    }

    #[test]
    fn set_keeps_occupancy_in_sync() {
        let mut chunk = Chunk::air(4);
        chunk.set(10, STONE);
        assert_eq!(chunk.get(10), STONE);
        assert_eq!(chunk.solid_count(), 1);
        chunk.set(10, AIR);
        assert!(chunk.is_empty());
    }

    #[test]
    fn checkerboard_fills_half_the_volume() {
        let chunk = Chunk::checkerboard(4, STONE);
        assert_eq!(chunk.solid_count(), 32);
    }

    #[test]
    fn noise_chunks_line_up_with_world_coordinates() {
        // Two fills of the same cell must agree on which slots are solid.
        let a = Chunk::noise(8, 7, CellId::new(1, 0, -2));
        let b = Chunk::noise(8, 7, CellId::new(1, 0, -2));
        let solid_a: Vec<bool> = a.voxels().iter().map(|&v| v != AIR).collect();
        let solid_b: Vec<bool> = b.voxels().iter().map(|&v| v != AIR).collect();
        assert_eq!(solid_a, solid_b);
    }
}
