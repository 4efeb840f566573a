//! # Mesh Worker Pool
//!
//! A fixed pool of worker threads that turns cell snapshots into geometry
//! off the owning thread. Each worker owns a dedicated pair of mpsc
//! channels: jobs flow in, finished geometry flows out. The pool schedules
//! round-robin across workers, caps the number of jobs in flight per
//! channel, and parks overflow in a FIFO queue that drains as workers free
//! up.
//!
//! ## Job Lifecycle
//! 1. Jobs are published via [`MeshWorkerPool::publish_job`]
//! 2. The pool picks the next free channel round-robin, or queues the job
//! 3. The worker runs the stateless geometry builder on its snapshot
//! 4. Results are collected on the owning thread via
//!    [`MeshWorkerPool::drain_completed`], in whatever order workers finish
//!
//! Workers never block on anything but their own channel, never touch the
//! live world and never see the scene. A worker whose channel has died (a
//! panic in the builder, which cannot normally happen) is detected during
//! draining and the cells it was working on are reported as failed rather
//! than silently lost.

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use crate::config::AtlasLayout;
use crate::core::MtResource;
use crate::engine_state::rendering::meshing::mesh::{build_cell_geometry, GeometryBuffer};
use crate::engine_state::voxels::addressing::CellId;
use crate::engine_state::voxels::block::BlockRegistry;
use crate::engine_state::voxels::world::MeshInput;

/// One unit of meshing work: an owned snapshot of the target cell and its
/// neighbors.
pub struct MeshJob {
    /// The snapshot the worker builds from.
    pub input: MeshInput,
}

/// The finished geometry for one cell, delivered in arbitrary completion
/// order.
pub struct MeshJobOutput {
    /// The cell the geometry belongs to.
    pub cell: CellId,
    /// Opaque-class geometry.
    pub opaque: GeometryBuffer,
    /// Transparent-class geometry.
    pub transparent: GeometryBuffer,
    /// Propagated from the originating dirty request.
    pub force_update: bool,
}

/// Maximum number of jobs in flight per worker channel.
///
/// One per channel keeps per-worker latency predictable and lets the
/// round-robin spread a batch evenly; raising it would pipeline channel
/// sends at the cost of lumpier completion bursts.
pub const MAX_JOBS_IN_FLIGHT: usize = 1;

/// The owning thread's handle on one worker.
struct WorkerChannel {
    job_sender: Sender<MeshJob>,
    result_receiver: Receiver<MeshJobOutput>,
    jobs_in_flight: usize,
    cells_in_flight: Vec<CellId>,
    dead: bool,
    _worker: JoinHandle<()>,
}

/// A fixed pool of meshing workers fed over per-worker channels.
pub struct MeshWorkerPool {
    channels: Vec<WorkerChannel>,
    queued_jobs: VecDeque<MeshJob>,
    current_channel: usize,
}

impl MeshWorkerPool {
    /// Spawns `num_workers` worker threads.
    ///
    /// Every worker gets a shared read handle on the block registry plus
    /// its own copy of the atlas layout and block size, which together
    /// parameterize the geometry builder.
    pub fn new(
        num_workers: usize,
        registry: MtResource<BlockRegistry>,
        atlas: AtlasLayout,
        block_size: f32,
    ) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        for worker_index in 0..num_workers {
            let (job_tx, job_rx) = channel::<MeshJob>();
            let (result_tx, result_rx) = channel::<MeshJobOutput>();
            let registry = registry.clone();

            let worker = thread::spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    let output = {
                        let table = registry.get();
                        let (opaque, transparent) =
                            build_cell_geometry(&job.input, &*table, &atlas, block_size);
                        MeshJobOutput {
                            cell: job.input.cell,
                            opaque,
                            transparent,
                            force_update: job.input.force_update,
                        }
                    };
                    if result_tx.send(output).is_err() {
                        break;
                    }
                }
                debug!("mesh worker {} shutting down", worker_index);
            });

            channels.push(WorkerChannel {
                job_sender: job_tx,
                result_receiver: result_rx,
                jobs_in_flight: 0,
                cells_in_flight: Vec::new(),
                dead: false,
                _worker: worker,
            });
        }

        MeshWorkerPool {
            channels,
            queued_jobs: VecDeque::new(),
            current_channel: 0,
        }
    }

    /// Finds the next channel that can accept a job, round-robin from the
    /// last channel used.
    fn find_available_channel(&self) -> Option<usize> {
        if self.channels.is_empty() {
            return None;
        }

        let start = self.current_channel % self.channels.len();
        let mut current = start;
        loop {
            let channel = &self.channels[current];
            if !channel.dead && channel.jobs_in_flight < MAX_JOBS_IN_FLIGHT {
                return Some(current);
            }
            current = (current + 1) % self.channels.len();
            if current == start {
                return None;
            }
        }
    }

    fn try_send_job(&mut self, job: MeshJob, channel_idx: usize) -> Result<(), MeshJob> {
        let cell = job.input.cell;
        let channel = &mut self.channels[channel_idx];
        match channel.job_sender.send(job) {
            Ok(()) => {
                channel.jobs_in_flight += 1;
                channel.cells_in_flight.push(cell);
                Ok(())
            }
            Err(err) => {
                warn!("mesh worker channel {} died", channel_idx);
                channel.dead = true;
                Err(err.0)
            }
        }
    }

    /// Publishes a job, sending it to a free worker immediately or parking
    /// it in the overflow queue.
    ///
    /// Returns `Err` with the cell id when no live worker remains to ever
    /// run the job.
    pub fn publish_job(&mut self, job: MeshJob) -> Result<(), CellId> {
        if !self.has_live_workers() {
            return Err(job.input.cell);
        }

        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_job(job, channel_idx) {
                Ok(()) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    Ok(())
                }
                Err(job) => {
                    if self.has_live_workers() {
                        self.queued_jobs.push_back(job);
                        Ok(())
                    } else {
                        Err(job.input.cell)
                    }
                }
            },
            None => {
                self.queued_jobs.push_back(job);
                Ok(())
            }
        }
    }

    /// Moves queued jobs onto workers as capacity frees up. Called after
    /// draining completions.
    pub fn process_queued_jobs(&mut self) {
        while !self.queued_jobs.is_empty() {
            match self.find_available_channel() {
                Some(channel_idx) => {
                    let job = match self.queued_jobs.pop_front() {
                        Some(job) => job,
                        None => break,
                    };
                    if let Err(job) = self.try_send_job(job, channel_idx) {
                        self.queued_jobs.push_front(job);
                        if !self.has_live_workers() {
                            break;
                        }
                    }
                }
                None => break,
            }
        }
    }

    /// Collects every finished result without blocking.
    ///
    /// Returns the outputs plus the cells lost to dead worker channels, if
    /// any. Queued jobs are re-dispatched onto the freed capacity before
    /// returning.
    pub fn drain_completed(&mut self) -> (Vec<MeshJobOutput>, Vec<CellId>) {
        let mut outputs = Vec::new();
        let mut failed = Vec::new();

        for channel in &mut self.channels {
            loop {
                match channel.result_receiver.try_recv() {
                    Ok(output) => {
                        channel.jobs_in_flight = channel.jobs_in_flight.saturating_sub(1);
                        channel.cells_in_flight.retain(|&cell| cell != output.cell);
                        outputs.push(output);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        if !channel.dead {
                            channel.dead = true;
                            warn!(
                                "mesh worker channel lost {} in-flight build(s)",
                                channel.cells_in_flight.len()
                            );
                        }
                        channel.jobs_in_flight = 0;
                        failed.append(&mut channel.cells_in_flight);
                        break;
                    }
                }
            }
        }

        self.process_queued_jobs();

        (outputs, failed)
    }

    /// Whether any worker can still accept jobs.
    pub fn has_live_workers(&self) -> bool {
        self.channels.iter().any(|channel| !channel.dead)
    }

    /// Jobs parked in the overflow queue.
    pub fn queued_len(&self) -> usize {
        self.queued_jobs.len()
    }

    /// Jobs currently executing or sitting in worker channels.
    pub fn in_flight_len(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.jobs_in_flight)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use crate::engine_state::voxels::addressing::local_offset;
    use crate::engine_state::voxels::block::STONE;

    fn pool(workers: usize) -> MeshWorkerPool {
        MeshWorkerPool::new(
            workers,
            MtResource::new(BlockRegistry::with_builtins()),
            AtlasLayout::default(),
            1.0,
        )
    }

    fn job_for(cell: CellId) -> MeshJob {
        let cell_size = 4;
        let mut input = MeshInput::empty(cell, cell_size, false);
        let mut voxels = vec![0u8; (cell_size * cell_size * cell_size) as usize];
        voxels[local_offset(0, 0, 0, cell_size)] = STONE;
        input.voxels = Some(voxels);
        MeshJob { input }
    }

    fn drain_until(pool: &mut MeshWorkerPool, expected: usize) -> Vec<MeshJobOutput> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut outputs = Vec::new();
        while outputs.len() < expected {
            assert!(Instant::now() < deadline, "timed out waiting for workers");
            let (mut done, failed) = pool.drain_completed();
            assert!(failed.is_empty());
            outputs.append(&mut done);
            thread::sleep(Duration::from_millis(1));
        }
        outputs
    }

    #[test]
    fn jobs_round_trip_through_workers() {
        let mut pool = pool(2);
        for i in 0..8 {
            pool.publish_job(job_for(CellId::new(i, 0, 0))).unwrap();
        }
        let outputs = drain_until(&mut pool, 8);

        assert_eq!(outputs.len(), 8);
        for output in &outputs {
            assert_eq!(output.opaque.vertex_count(), 24);
            assert!(output.transparent.is_empty());
        }
        assert_eq!(pool.in_flight_len(), 0);
        assert_eq!(pool.queued_len(), 0);
    }

    #[test]
    fn overflow_queues_and_drains() {
        let mut pool = pool(1);
        for i in 0..4 {
            pool.publish_job(job_for(CellId::new(0, i, 0))).unwrap();
        }
        // With one worker and one slot, the rest waits in the queue.
        assert!(pool.queued_len() >= 2);
        let outputs = drain_until(&mut pool, 4);
        assert_eq!(outputs.len(), 4);
    }
}
