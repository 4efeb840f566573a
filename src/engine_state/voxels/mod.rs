//! # Voxel Core
//!
//! This module contains the voxel data layer: coordinate addressing, chunk
//! storage, the sparse world map, dirty-cell tracking and the block-type
//! table consulted during meshing.
//!
//! ## Architecture
//!
//! * **Addressing**: Pure integer math between world coordinates, cell ids
//!   and linear in-chunk offsets
//! * **Chunk**: Fixed-size dense voxel cube, the unit of storage and of
//!   remeshing granularity
//! * **World**: Coordinates chunks and provides a unified interface for the
//!   entire (unbounded, sparse) voxel space
//! * **Dirty**: Maps a voxel edit to the set of cells whose mesh is now stale
//! * **Block**: Voxel id -> transparency / atlas-tile lookups
//!
//! ## Data Flow
//!
//! 1. World receives requests for voxel access or modification
//! 2. World delegates to the owning chunk (allocating it if necessary)
//! 3. Edits are translated by the dirty tracker into remesh requests
//! 4. The mesh dispatcher snapshots chunk data and hands it to workers
//!
//! ## Thread Safety
//!
//! The world map is owned and mutated by a single thread. Mesh workers only
//! ever see owned snapshots taken at dispatch time, so no synchronization is
//! required on the voxel data itself.

pub mod addressing;
pub mod block;
pub mod chunk;
pub mod dirty;
pub mod world;

/// The underlying integer type used to represent voxels in memory.
/// `0` is always air; nonzero values index the block-type table.
pub type VoxelId = u8;

/// The empty voxel.
pub const AIR: VoxelId = 0;
