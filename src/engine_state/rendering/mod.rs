//! # Rendering Module
//!
//! The render-facing half of the engine: geometry generation, the chunk
//! mesh lifecycle, and the scene boundary the renderer sits behind.
//!
//! ## Key Components
//!
//! * `meshing` - Geometry builder, dispatch pipeline and chunk-mesh registry
//! * `scene` - The [`scene::RenderScene`] trait plus the in-memory
//!   [`scene::HeadlessScene`]
//! * `wgpu_scene` - The wgpu-backed reference scene with manually managed
//!   GPU buffer lifetimes
//!
//! The compositing pipeline itself (passes, camera, post-processing) lives
//! outside this crate; everything here stops at resource ownership.

pub mod meshing;
pub mod scene;
pub mod wgpu_scene;

pub use scene::{HeadlessScene, MaterialKind, MeshDescriptor, RenderScene};
