//! # Render Scene Boundary
//!
//! The seam between the meshing core and whatever renders the world. The
//! chunk-mesh registry owns the per-cell lifecycle (create, swap geometry,
//! hide, destroy) and drives it through the [`RenderScene`] trait; the
//! renderer behind the trait owns the actual resources.
//!
//! Two implementations ship with the crate: [`HeadlessScene`] (in-memory
//! nodes, used by tests and the headless demo) and the wgpu-backed scene in
//! [`super::wgpu_scene`].

use std::collections::HashMap;

use cgmath::Point3;

use super::meshing::mesh::GeometryBuffer;

/// Which of the two shared materials a visual object is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    /// Depth-writing, alpha-tested material.
    Opaque,
    /// Blended material drawn after the opaque pass.
    Transparent,
}

/// Everything a scene needs to place a new visual object.
///
/// The transform is static: the position is fixed at creation and the scene
/// is never asked to move an object afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDescriptor {
    /// Debug label, also useful for scene inspection.
    pub label: String,
    /// World-space position of the object's origin.
    pub position: Point3<f32>,
    /// Which shared material the object uses.
    pub material: MaterialKind,
    /// Whether the object casts shadows.
    pub cast_shadow: bool,
    /// Whether the object receives shadows.
    pub receive_shadow: bool,
}

/// The rendering side of the chunk-mesh lifecycle.
///
/// Handles returned by `add_mesh` identify the object in later calls. New
/// objects start visible. All methods are called from the thread that owns
/// the scene; the meshing workers never touch it.
pub trait RenderScene {
    /// Opaque identifier for one visual object in this scene.
    type MeshHandle;

    /// Creates a visual object and uploads its initial geometry.
    fn add_mesh(&mut self, descriptor: MeshDescriptor, geometry: &GeometryBuffer)
        -> Self::MeshHandle;

    /// Swaps the object's geometry buffers in place.
    fn replace_geometry(&mut self, handle: &Self::MeshHandle, geometry: &GeometryBuffer);

    /// Shows or hides the object without touching its resources.
    fn set_visible(&mut self, handle: &Self::MeshHandle, visible: bool);

    /// Releases the object's resources and removes it from the scene.
    fn remove_mesh(&mut self, handle: Self::MeshHandle);
}

/// One object tracked by the [`HeadlessScene`].
#[derive(Debug, Clone)]
pub struct HeadlessNode {
    /// The descriptor the object was created with.
    pub descriptor: MeshDescriptor,
    /// Vertex count of the most recently applied geometry.
    pub vertex_count: usize,
    /// Index count of the most recently applied geometry.
    pub index_count: usize,
    /// Current visibility flag.
    pub visible: bool,
    /// How many times the geometry has been swapped since creation.
    pub geometry_swaps: usize,
}

/// Counters describing everything a scene has been asked to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStats {
    /// Objects created.
    pub created: usize,
    /// In-place geometry swaps.
    pub updated: usize,
    /// Objects removed and released.
    pub removed: usize,
    /// Visibility toggles.
    pub visibility_changes: usize,
}

/// A render scene that stores nodes in memory and counts operations.
///
/// Stands in for a real renderer in tests and in the headless demo; the
/// lifecycle contract is identical to the wgpu scene's.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    nodes: HashMap<u64, HeadlessNode>,
    next_handle: u64,
    /// Operation counters, monotonically increasing.
    pub stats: SceneStats,
}

impl HeadlessScene {
    /// An empty scene.
    pub fn new() -> Self {
        HeadlessScene::default()
    }

    /// The node behind a handle, if it still exists.
    pub fn node(&self, handle: u64) -> Option<&HeadlessNode> {
        self.nodes.get(&handle)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the scene holds no objects.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of currently visible objects.
    pub fn visible_count(&self) -> usize {
        self.nodes.values().filter(|node| node.visible).count()
    }
}

impl RenderScene for HeadlessScene {
    type MeshHandle = u64;

    fn add_mesh(
        &mut self,
        descriptor: MeshDescriptor,
        geometry: &GeometryBuffer,
    ) -> Self::MeshHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.nodes.insert(
            handle,
            HeadlessNode {
                descriptor,
                vertex_count: geometry.vertex_count(),
                index_count: geometry.index_count(),
                visible: true,
                geometry_swaps: 0,
            },
        );
        self.stats.created += 1;
        handle
    }

    fn replace_geometry(&mut self, handle: &Self::MeshHandle, geometry: &GeometryBuffer) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.vertex_count = geometry.vertex_count();
            node.index_count = geometry.index_count();
            node.geometry_swaps += 1;
            self.stats.updated += 1;
        }
    }

    fn set_visible(&mut self, handle: &Self::MeshHandle, visible: bool) {
        if let Some(node) = self.nodes.get_mut(handle) {
            if node.visible != visible {
                node.visible = visible;
                self.stats.visibility_changes += 1;
            }
        }
    }

    fn remove_mesh(&mut self, handle: Self::MeshHandle) {
        if self.nodes.remove(&handle).is_some() {
            self.stats.removed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> MeshDescriptor {
        MeshDescriptor {
            label: "0,0,0/opaque".to_string(),
            position: Point3::new(0.0, 0.0, 0.0),
            material: MaterialKind::Opaque,
            cast_shadow: true,
            receive_shadow: true,
        }
    }

    #[test]
    fn nodes_track_geometry_and_visibility() {
        let mut scene = HeadlessScene::new();
        let mut geometry = GeometryBuffer::default();
        geometry.positions.extend_from_slice(&[0.0; 12]);
        geometry.indices.extend_from_slice(&[0, 1, 2, 2, 1, 3]);

        let handle = scene.add_mesh(descriptor(), &geometry);
        assert_eq!(scene.node(handle).unwrap().vertex_count, 4);
        assert!(scene.node(handle).unwrap().visible);

        scene.set_visible(&handle, false);
        assert_eq!(scene.visible_count(), 0);

        scene.replace_geometry(&handle, &GeometryBuffer::default());
        assert_eq!(scene.node(handle).unwrap().vertex_count, 0);
        assert_eq!(scene.node(handle).unwrap().geometry_swaps, 1);

        scene.remove_mesh(handle);
        assert!(scene.is_empty());
        assert_eq!(scene.stats.removed, 1);
    }
}
