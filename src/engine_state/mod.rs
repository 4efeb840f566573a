//! # Engine State Module
//!
//! The central coordinator for the voxel world: the sparse chunk store, the
//! dirty tracker, the parallel mesh dispatch pipeline and the chunk-mesh
//! registry, tied together behind [`WorldEngine`].
//!
//! ## Architecture
//!
//! Each subsystem is an explicitly owned container (no globals), so multiple
//! independent worlds can coexist in one process. The facade owns them all
//! and is the single entry point surrounding application code talks to.
//!
//! ## Data Flow
//!
//! 1. `edit_voxel` writes the store and enqueues dirty cells
//! 2. `flush_pending_meshes`, called once per tick, first applies finished
//!    geometry, then dispatches newly dirty cells to the worker pool
//! 3. Workers run the stateless builder over dispatch-time snapshots
//! 4. The registry applies results into the render scene on this thread

use log::info;

pub mod rendering;
pub mod task_management;
pub mod voxels;

use crate::config::WorldConfig;
use crate::core::MtResource;
use self::rendering::meshing::{ChunkMeshRegistry, FlushReport, MeshDispatcher};
use self::rendering::RenderScene;
use self::task_management::MeshWorkerPool;
use self::voxels::addressing::CellId;
use self::voxels::block::BlockRegistry;
use self::voxels::dirty::DirtyTracker;
use self::voxels::world::World;
use self::voxels::VoxelId;

/// Per-edit options for [`WorldEngine::edit_voxel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOptions {
    /// Also remesh face-adjacent cells when the edit sits on their shared
    /// boundary. Defaults to true; bulk interior edits may turn it off.
    pub neighbor_propagation: bool,
    /// Force regeneration to be applied even if the geometry comes back
    /// empty, clearing a mesh whose last voxel was removed.
    pub force: bool,
}

impl Default for EditOptions {
    fn default() -> Self {
        EditOptions {
            neighbor_propagation: true,
            force: false,
        }
    }
}

/// How a chunk leaves the render scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadMode {
    /// Hide the meshes but keep voxel data and resources; the chunk may
    /// reappear cheaply.
    Hide,
    /// Delete voxel data and release the meshes for good.
    Permanent,
}

/// The facade owning one complete voxel world and its meshing pipeline.
pub struct WorldEngine<S: RenderScene> {
    world: World,
    tracker: DirtyTracker,
    dispatcher: MeshDispatcher,
    registry: ChunkMeshRegistry<S>,
    block_registry: MtResource<BlockRegistry>,
}

impl<S: RenderScene> WorldEngine<S> {
    /// Builds an engine from a validated configuration, a block table and
    /// the scene that will receive the meshes.
    pub fn new(config: &WorldConfig, blocks: BlockRegistry, scene: S) -> Self {
        let block_registry = MtResource::new(blocks);
        let pool = MeshWorkerPool::new(
            config.mesh_workers,
            block_registry.clone(),
            config.atlas,
            config.block_size,
        );

        info!(
            "world engine up: cell size {}, {} mesh worker(s)",
            config.cell_size, config.mesh_workers
        );

        WorldEngine {
            world: World::new(config.cell_size, config.chunk_fill),
            tracker: DirtyTracker::new(config.cell_size),
            dispatcher: MeshDispatcher::new(pool),
            registry: ChunkMeshRegistry::new(scene, config.cell_size, config.block_size),
            block_registry,
        }
    }

    /// The single entry point for world mutation.
    ///
    /// Writes the voxel, computes the dirty batch and merges it into the
    /// dispatcher. Nothing is meshed until the next
    /// [`WorldEngine::flush_pending_meshes`].
    pub fn edit_voxel(&mut self, x: i32, y: i32, z: i32, voxel: VoxelId, options: EditOptions) {
        self.world.set_voxel(x, y, z, voxel, true);
        let batch =
            self.tracker
                .requests_for_edit(x, y, z, options.neighbor_propagation, options.force);
        self.dispatcher.enqueue(&batch);
    }

    /// Read accessor for external systems (physics, gameplay logic).
    pub fn get_voxel(&self, x: i32, y: i32, z: i32) -> VoxelId {
        self.world.get_voxel(x, y, z)
    }

    /// Allocates and fills the cell with the configured generation default
    /// if absent, and queues it for meshing. Idempotent on the store.
    pub fn ensure_generated(&mut self, cell: CellId) {
        self.world.ensure_generated(cell);
        self.dispatcher.enqueue(&[voxels::dirty::DirtyRequest {
            cell,
            force_update: false,
        }]);
    }

    /// Runs one tick of the meshing pipeline: applies every finished build,
    /// then dispatches everything newly dirty.
    ///
    /// Results of builds still in flight arrive on a later call; the caller
    /// never blocks on workers. Worker failures surface in the report's
    /// `failed` list without affecting other cells.
    pub fn flush_pending_meshes(&mut self) -> FlushReport {
        let mut report = FlushReport::default();

        let Self {
            dispatcher,
            registry,
            ..
        } = self;
        let (applied, mut failed) = dispatcher.drain_completed(|output| {
            registry.apply(
                output.cell,
                &output.opaque,
                &output.transparent,
                output.force_update,
            );
        });
        report.applied = applied;
        report.failed.append(&mut failed);

        let (dispatched, mut failed) = self.dispatcher.dispatch(&self.world);
        report.dispatched = dispatched;
        report.failed.append(&mut failed);

        report
    }

    /// Unloads a chunk from the render scene.
    ///
    /// `Hide` is cheap and reversible. `Permanent` also deletes the voxel
    /// data; a build already in flight for the cell resolves against the
    /// deleted state as all-air and applies an empty result, which is
    /// harmless.
    pub fn unload_chunk(&mut self, cell: CellId, mode: UnloadMode) {
        match mode {
            UnloadMode::Hide => self.registry.hide(cell),
            UnloadMode::Permanent => {
                self.world.delete_cell(cell);
                self.registry.destroy(cell);
            }
        }
    }

    /// Whether no meshing work is pending, queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.dispatcher.is_idle()
    }

    /// Read access to the chunk store.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Read access to the chunk-mesh registry.
    pub fn mesh_registry(&self) -> &ChunkMeshRegistry<S> {
        &self.registry
    }

    /// Read access to the render scene.
    pub fn scene(&self) -> &S {
        self.registry.scene()
    }

    /// Mutable access to the render scene.
    pub fn scene_mut(&mut self) -> &mut S {
        self.registry.scene_mut()
    }

    /// Shared handle on the block registry, e.g. to register new block
    /// types at runtime.
    pub fn blocks(&self) -> MtResource<BlockRegistry> {
        self.block_registry.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    use super::rendering::HeadlessScene;
    use super::voxels::block::{STONE, WATER};

    fn engine() -> WorldEngine<HeadlessScene> {
        let config = WorldConfig {
            cell_size: 16,
            mesh_workers: 2,
            chunk_fill: voxels::chunk::ChunkFill::Empty,
            ..WorldConfig::default()
        };
        WorldEngine::new(&config, BlockRegistry::with_builtins(), HeadlessScene::new())
    }

    /// Flushes until the pipeline settles, with a hard timeout.
    fn settle(engine: &mut WorldEngine<HeadlessScene>) -> usize {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut applied = 0;
        loop {
            let report = engine.flush_pending_meshes();
            assert!(report.failed.is_empty(), "unexpected worker failure");
            applied += report.applied;
            if engine.is_idle() {
                return applied;
            }
            assert!(Instant::now() < deadline, "meshing never settled");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn edit_then_flush_produces_a_visible_mesh() {
        let mut engine = engine();
        engine.edit_voxel(5, 5, 5, STONE, EditOptions::default());
        assert_eq!(engine.get_voxel(5, 5, 5), STONE);

        settle(&mut engine);
        let scene = engine.scene();
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.visible_count(), 1);
    }

    #[test]
    fn two_edits_to_one_chunk_dispatch_one_build() {
        let mut engine = engine();
        engine.edit_voxel(5, 5, 5, STONE, EditOptions::default());
        engine.edit_voxel(6, 5, 5, WATER, EditOptions { force: true, ..Default::default() });

        let report = engine.flush_pending_meshes();
        assert_eq!(report.dispatched, 1, "coalesced into one build");

        settle(&mut engine);
        // Both render classes exist: stone mesh plus water mesh.
        assert_eq!(engine.scene().len(), 2);
    }

    #[test]
    fn boundary_edit_meshes_the_neighbor_cell_too() {
        let mut engine = engine();
        engine.edit_voxel(0, 5, 5, STONE, EditOptions::default());

        let report = engine.flush_pending_meshes();
        assert_eq!(report.dispatched, 2, "owning cell plus -x neighbor");
        settle(&mut engine);
        // The neighbor cell is empty, so only the owning cell created a
        // mesh.
        assert_eq!(engine.scene().len(), 1);
    }

    #[test]
    fn removing_the_last_voxel_clears_the_mesh_in_place() {
        let mut engine = engine();
        engine.edit_voxel(5, 5, 5, STONE, EditOptions::default());
        settle(&mut engine);
        assert_eq!(engine.scene().len(), 1);

        engine.edit_voxel(5, 5, 5, 0, EditOptions { force: true, ..Default::default() });
        settle(&mut engine);

        let scene = engine.scene();
        let node = scene.node(0).expect("opaque object survives");
        assert_eq!(node.vertex_count, 0, "geometry is cleared in place");
        assert!(node.visible);
    }

    #[test]
    fn unload_hide_is_reversible_and_permanent_is_not() {
        let mut engine = engine();
        engine.edit_voxel(5, 5, 5, STONE, EditOptions::default());
        settle(&mut engine);
        let cell = CellId::new(0, 0, 0);

        engine.unload_chunk(cell, UnloadMode::Hide);
        assert_eq!(engine.scene().visible_count(), 0);
        assert_eq!(engine.get_voxel(5, 5, 5), STONE, "hide keeps voxel data");

        engine.unload_chunk(cell, UnloadMode::Permanent);
        assert_eq!(engine.scene().len(), 0);
        assert_eq!(engine.get_voxel(5, 5, 5), 0);
        assert!(!engine.mesh_registry().has_entry(cell));

        // Terminal state: repeating either unload is a safe no-op.
        engine.unload_chunk(cell, UnloadMode::Permanent);
        engine.unload_chunk(cell, UnloadMode::Hide);
    }

    #[test]
    fn generated_solid_chunk_meshes_only_its_shell() {
        let config = WorldConfig {
            cell_size: 4,
            mesh_workers: 1,
            ..WorldConfig::default()
        };
        let mut engine: WorldEngine<HeadlessScene> =
            WorldEngine::new(&config, BlockRegistry::with_builtins(), HeadlessScene::new());

        engine.ensure_generated(CellId::new(0, 0, 0));
        settle(&mut engine);

        let node = engine.scene().node(0).expect("shell mesh");
        // 6 walls of 4x4 faces, 4 vertices each.
        assert_eq!(node.vertex_count, 6 * 16 * 4);
    }
}
