//! Dirty-request batching and dispatch.
//!
//! The dispatcher sits between the dirty tracker and the worker pool. It
//! coalesces requests per cell id (one pending slot per cell, force flags
//! OR-merged), enforces at most one in-flight build per cell, snapshots
//! voxel data at dispatch time and routes completed geometry to the
//! registry.
//!
//! A cell that is dirtied again while its build is still running keeps its
//! pending slot: the running build finishes and is applied (stale but
//! harmless), and the next flush dispatches a fresh build from a fresh
//! snapshot. No edit is ever lost and no cell ever has two concurrent
//! builds.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::engine_state::task_management::{MeshJob, MeshJobOutput, MeshWorkerPool};
use crate::engine_state::voxels::addressing::CellId;
use crate::engine_state::voxels::dirty::DirtyRequest;
use crate::engine_state::voxels::world::World;

/// Outcome of one flush: how much was dispatched and applied, and which
/// cells failed because no worker could run them.
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Builds handed to the worker pool this flush.
    pub dispatched: usize,
    /// Completed builds applied to the registry this flush.
    pub applied: usize,
    /// Cells whose build was lost to worker failure. State for other cells
    /// is unaffected.
    pub failed: Vec<CellId>,
}

impl FlushReport {
    /// Whether every build this flush either completed or is still in
    /// flight.
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Batches dirty cells and drives the worker pool.
pub struct MeshDispatcher {
    pending: HashMap<CellId, bool>,
    in_flight: HashSet<CellId>,
    pool: MeshWorkerPool,
}

impl MeshDispatcher {
    /// A dispatcher feeding the given pool.
    pub fn new(pool: MeshWorkerPool) -> Self {
        MeshDispatcher {
            pending: HashMap::new(),
            in_flight: HashSet::new(),
            pool,
        }
    }

    /// Merges a batch of dirty requests into the pending set.
    ///
    /// At most one pending slot exists per cell id; `force_update` is the
    /// OR of every contributing request. Requests for cells already in
    /// flight are absorbed the same way and picked up by a later flush.
    pub fn enqueue(&mut self, batch: &[DirtyRequest]) {
        for request in batch {
            let force = self.pending.entry(request.cell).or_insert(false);
            *force |= request.force_update;
        }
    }

    /// Dispatches every pending cell that has no build in flight.
    ///
    /// Snapshots are taken here, so a build always sees the world as of the
    /// flush that dispatched it. Returns the number dispatched plus cells
    /// that could not be dispatched because no live worker remains.
    pub fn dispatch(&mut self, world: &World) -> (usize, Vec<CellId>) {
        let ready: Vec<CellId> = self
            .pending
            .keys()
            .copied()
            .filter(|cell| !self.in_flight.contains(cell))
            .collect();

        let mut dispatched = 0;
        let mut failed = Vec::new();

        for cell in ready {
            let force_update = self.pending.remove(&cell).unwrap_or(false);
            let input = world.snapshot_for_meshing(cell, force_update);
            match self.pool.publish_job(MeshJob { input }) {
                Ok(()) => {
                    self.in_flight.insert(cell);
                    dispatched += 1;
                }
                Err(cell) => failed.push(cell),
            }
        }

        if dispatched > 0 {
            debug!("dispatched {} mesh build(s)", dispatched);
        }

        (dispatched, failed)
    }

    /// Collects finished builds and hands each to `apply`, clearing the
    /// in-flight marker so the cell can be dispatched again.
    ///
    /// Results arrive in arbitrary completion order. Cells lost to worker
    /// failure are returned alongside the applied count.
    pub fn drain_completed(
        &mut self,
        mut apply: impl FnMut(MeshJobOutput),
    ) -> (usize, Vec<CellId>) {
        let (outputs, failed) = self.pool.drain_completed();

        for cell in &failed {
            self.in_flight.remove(cell);
        }

        let applied = outputs.len();
        for output in outputs {
            self.in_flight.remove(&output.cell);
            apply(output);
        }

        (applied, failed)
    }

    /// Cells waiting for dispatch.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Cells with a build currently outstanding.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether nothing is pending, queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty() && self.pool.queued_len() == 0
    }
}
