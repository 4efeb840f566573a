//! # Core Module
//!
//! Small shared-ownership primitives used throughout the engine.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write
//!   locking, for state shared with worker threads
//! - `StResource`: Single-threaded reference-counted resource with interior
//!   mutability, for state shared within the owning thread

pub mod mt_resource;
pub mod st_resource;

pub use mt_resource::MtResource;
pub use st_resource::StResource;
