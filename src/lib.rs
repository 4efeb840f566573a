#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World
//!
//! A chunked voxel store with an incremental, parallel meshing pipeline.
//!
//! This crate manages a large, sparsely populated 3D voxel volume and
//! converts edits to that volume into renderable surface geometry in real
//! time: voxel addressing, chunk lifecycle, neighbor-aware dirty
//! propagation, parallel mesh generation on a fixed worker pool, and
//! synchronization of finished geometry back into live render state.
//!
//! ## Key Modules
//!
//! * `config` - World, worker and texture-atlas configuration
//! * `core` - Shared-ownership primitives used across threads
//! * `engine_state` - The chunk store, dirty tracking, meshing pipeline and
//!   chunk-mesh registry, behind the [`WorldEngine`] facade
//!
//! ## Architecture
//!
//! The engine keeps a strict thread split: one thread owns all voxel data
//! and all render-scene state, while a fixed pool of workers runs the
//! stateless geometry builder over owned snapshots taken at dispatch time.
//! Per cell, at most one build is ever in flight; further edits coalesce
//! until it completes.
//!
//! ## Usage
//!
//! ```no_run
//! use voxel_world::config::WorldConfig;
//! use voxel_world::engine_state::rendering::HeadlessScene;
//! use voxel_world::engine_state::voxels::block::{BlockRegistry, STONE};
//! use voxel_world::engine_state::{EditOptions, WorldEngine};
//!
//! let config = WorldConfig::default();
//! let mut engine =
//!     WorldEngine::new(&config, BlockRegistry::with_builtins(), HeadlessScene::new());
//!
//! engine.edit_voxel(0, 0, 0, STONE, EditOptions::default());
//! // Once per simulation tick:
//! let report = engine.flush_pending_meshes();
//! assert!(report.failed.is_empty());
//! ```

pub mod config;
pub mod core;
pub mod engine_state;

pub use config::WorldConfig;
pub use engine_state::rendering::meshing::{FlushReport, GeometryBuffer};
pub use engine_state::rendering::{HeadlessScene, RenderScene};
pub use engine_state::voxels::addressing::CellId;
pub use engine_state::voxels::VoxelId;
pub use engine_state::{EditOptions, UnloadMode, WorldEngine};
