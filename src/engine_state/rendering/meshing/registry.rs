//! The mapping from cell id to live visual objects.
//!
//! Each cell owns up to two objects, one per render class. Objects are
//! created lazily on the first non-empty (or forced) build result, have
//! their geometry swapped in place on later results, can be cheaply hidden
//! for reversible unloads, and are only released on explicit destruction.
//!
//! Per-entry state machine: absent -> hidden <-> visible -> absent.
//! `apply` moves absent/hidden to visible, `hide` moves visible to hidden,
//! `destroy` moves any state back to absent and is idempotent.

use std::collections::HashMap;

use cgmath::Point3;
use log::trace;

use super::mesh::GeometryBuffer;
use crate::engine_state::rendering::scene::{MaterialKind, MeshDescriptor, RenderScene};
use crate::engine_state::voxels::addressing::CellId;

/// The two optional visual objects of one cell.
struct ChunkMeshEntry<H> {
    opaque: Option<H>,
    transparent: Option<H>,
}

impl<H> ChunkMeshEntry<H> {
    fn empty() -> Self {
        ChunkMeshEntry {
            opaque: None,
            transparent: None,
        }
    }
}

/// Owns every live chunk mesh and drives the scene behind it.
pub struct ChunkMeshRegistry<S: RenderScene> {
    scene: S,
    entries: HashMap<CellId, ChunkMeshEntry<S::MeshHandle>>,
    cell_size: i32,
    block_size: f32,
}

impl<S: RenderScene> ChunkMeshRegistry<S> {
    /// A registry driving the given scene.
    ///
    /// `cell_size` and `block_size` position new objects at
    /// `cell origin * block size`.
    pub fn new(scene: S, cell_size: i32, block_size: f32) -> Self {
        ChunkMeshRegistry {
            scene,
            entries: HashMap::new(),
            cell_size,
            block_size,
        }
    }

    /// Applies one completed build result.
    ///
    /// Existing objects get their geometry swapped in place and become
    /// visible. Missing objects are created only when the buffer is
    /// non-empty or `force_update` is set; an empty buffer with no object
    /// and no force is a no-op. Safe to call for any cell in any order.
    pub fn apply(
        &mut self,
        cell: CellId,
        opaque: &GeometryBuffer,
        transparent: &GeometryBuffer,
        force_update: bool,
    ) {
        let position = self.object_position(cell);
        let entry = self
            .entries
            .entry(cell)
            .or_insert_with(ChunkMeshEntry::empty);

        Self::apply_class(
            &mut self.scene,
            &mut entry.opaque,
            cell,
            MaterialKind::Opaque,
            position,
            opaque,
            force_update,
        );
        Self::apply_class(
            &mut self.scene,
            &mut entry.transparent,
            cell,
            MaterialKind::Transparent,
            position,
            transparent,
            force_update,
        );

        // An apply that created nothing leaves no entry behind.
        if entry.opaque.is_none() && entry.transparent.is_none() {
            self.entries.remove(&cell);
        }
    }

    fn apply_class(
        scene: &mut S,
        slot: &mut Option<S::MeshHandle>,
        cell: CellId,
        material: MaterialKind,
        position: Point3<f32>,
        geometry: &GeometryBuffer,
        force_update: bool,
    ) {
        match slot {
            Some(handle) => {
                scene.replace_geometry(handle, geometry);
                scene.set_visible(handle, true);
            }
            None if !geometry.is_empty() || force_update => {
                trace!("creating {:?} mesh for cell {}", material, cell);
                let descriptor = MeshDescriptor {
                    label: format!("{}/{:?}", cell, material),
                    position,
                    material,
                    cast_shadow: true,
                    receive_shadow: true,
                };
                *slot = Some(scene.add_mesh(descriptor, geometry));
            }
            None => {}
        }
    }

    /// Hides both objects of a cell without releasing anything. Cheap and
    /// reversible; a no-op for unknown cells.
    pub fn hide(&mut self, cell: CellId) {
        if let Some(entry) = self.entries.get_mut(&cell) {
            if let Some(handle) = &entry.opaque {
                self.scene.set_visible(handle, false);
            }
            if let Some(handle) = &entry.transparent {
                self.scene.set_visible(handle, false);
            }
        }
    }

    /// Releases both objects and erases the entry. Idempotent: destroying a
    /// cell that has no entry is a no-op.
    pub fn destroy(&mut self, cell: CellId) {
        if let Some(entry) = self.entries.remove(&cell) {
            trace!("destroying meshes for cell {}", cell);
            if let Some(handle) = entry.opaque {
                self.scene.remove_mesh(handle);
            }
            if let Some(handle) = entry.transparent {
                self.scene.remove_mesh(handle);
            }
        }
    }

    /// Whether the cell currently has an entry.
    pub fn has_entry(&self, cell: CellId) -> bool {
        self.entries.contains_key(&cell)
    }

    /// Number of cells with live objects.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Read access to the scene being driven.
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Mutable access to the scene being driven.
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    fn object_position(&self, cell: CellId) -> Point3<f32> {
        let origin = cell.origin(self.cell_size);
        Point3::new(
            origin.x as f32 * self.block_size,
            origin.y as f32 * self.block_size,
            origin.z as f32 * self.block_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::rendering::scene::HeadlessScene;

    fn quad() -> GeometryBuffer {
        let mut buffer = GeometryBuffer::default();
        buffer.positions.extend_from_slice(&[0.0; 12]);
        buffer.normals.extend_from_slice(&[0.0; 12]);
        buffer.uvs.extend_from_slice(&[0.0; 8]);
        buffer.indices.extend_from_slice(&[0, 1, 2, 2, 1, 3]);
        buffer
    }

    fn registry() -> ChunkMeshRegistry<HeadlessScene> {
        ChunkMeshRegistry::new(HeadlessScene::new(), 16, 16.0)
    }

    #[test]
    fn empty_apply_without_force_creates_nothing() {
        let mut registry = registry();
        let empty = GeometryBuffer::default();
        registry.apply(CellId::new(0, 0, 0), &empty, &empty, false);
        assert!(!registry.has_entry(CellId::new(0, 0, 0)));
        assert_eq!(registry.scene().stats.created, 0);
    }

    #[test]
    fn empty_apply_with_force_creates_clearable_objects() {
        let mut registry = registry();
        let empty = GeometryBuffer::default();
        registry.apply(CellId::new(0, 0, 0), &empty, &empty, true);
        assert!(registry.has_entry(CellId::new(0, 0, 0)));
        assert_eq!(registry.scene().stats.created, 2);
    }

    #[test]
    fn nonempty_apply_creates_then_swaps_in_place() {
        let mut registry = registry();
        let cell = CellId::new(1, 0, -2);
        let empty = GeometryBuffer::default();

        registry.apply(cell, &quad(), &empty, false);
        assert_eq!(registry.scene().stats.created, 1, "only the opaque object");
        assert_eq!(registry.scene().len(), 1);

        // Second apply swaps geometry on the same object.
        registry.apply(cell, &quad(), &empty, false);
        assert_eq!(registry.scene().stats.created, 1);
        assert_eq!(registry.scene().stats.updated, 1);
    }

    #[test]
    fn objects_are_positioned_at_scaled_cell_origin() {
        let mut registry = registry();
        let empty = GeometryBuffer::default();
        registry.apply(CellId::new(1, 0, -2), &quad(), &empty, false);

        let node = registry
            .scene()
            .node(0)
            .expect("object 0 should exist");
        assert_eq!(node.descriptor.position, Point3::new(256.0, 0.0, -512.0));
        assert!(node.descriptor.cast_shadow);
        assert!(node.descriptor.receive_shadow);
        assert_eq!(node.descriptor.material, MaterialKind::Opaque);
    }

    #[test]
    fn hide_is_reversible_by_apply() {
        let mut registry = registry();
        let cell = CellId::new(0, 0, 0);
        let empty = GeometryBuffer::default();
        registry.apply(cell, &quad(), &empty, false);

        registry.hide(cell);
        assert_eq!(registry.scene().visible_count(), 0);
        assert_eq!(registry.scene().len(), 1, "hide keeps resources alive");

        registry.apply(cell, &quad(), &empty, false);
        assert_eq!(registry.scene().visible_count(), 1);
    }

    #[test]
    fn destroy_is_idempotent_and_makes_hide_a_noop() {
        let mut registry = registry();
        let cell = CellId::new(0, 0, 0);
        let empty = GeometryBuffer::default();
        registry.apply(cell, &quad(), &quad(), false);
        assert_eq!(registry.scene().len(), 2);

        registry.destroy(cell);
        assert_eq!(registry.scene().len(), 0);
        assert!(!registry.has_entry(cell));

        // Terminal state: both of these are safe no-ops.
        registry.destroy(cell);
        registry.hide(cell);
        assert_eq!(registry.scene().stats.removed, 2);
    }
}
