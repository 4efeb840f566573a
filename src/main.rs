//! # Voxel World Demo
//!
//! Headless-friendly demonstration of the edit -> mesh pipeline: seeds a
//! patch of generated terrain, performs bursts of random edits while
//! flushing the meshing pipeline once per tick, then exercises both chunk
//! unload paths.
//!
//! Uses the wgpu-backed scene when a GPU adapter is available and falls
//! back to the in-memory scene otherwise. Pass a JSON config path as the
//! first argument to override [`WorldConfig::default`].
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release [config.json]
//! ```

use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};
use log::{info, warn};

use voxel_world::config::{AtlasLayout, WorldConfig};
use voxel_world::engine_state::rendering::wgpu_scene::WgpuScene;
use voxel_world::engine_state::rendering::HeadlessScene;
use voxel_world::engine_state::voxels::block::{BlockRegistry, GRASS, STONE, WATER};
use voxel_world::engine_state::voxels::chunk::ChunkFill;
use voxel_world::engine_state::voxels::AIR;
use voxel_world::{CellId, EditOptions, RenderScene, UnloadMode, WorldEngine};

fn main() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();

    let config = load_config();
    let blocks = BlockRegistry::with_builtins();
    let atlas_image = build_atlas(&config.atlas);

    match WgpuScene::new(atlas_image, &config.atlas) {
        Ok(scene) => {
            let mut engine = WorldEngine::new(&config, blocks, scene);
            run_demo(&mut engine, &config);
            let report = engine.scene().report();
            info!(
                "gpu resources: {} mesh(es), {} visible, {} vertex bytes, {} index bytes",
                report.meshes, report.visible, report.vertex_bytes, report.index_bytes
            );
        }
        Err(err) => {
            warn!("wgpu unavailable ({}), using headless scene", err);
            let mut engine = WorldEngine::new(&config, blocks, HeadlessScene::new());
            run_demo(&mut engine, &config);
            let scene = engine.scene();
            info!(
                "headless scene: {} node(s), {} visible, stats {:?}",
                scene.len(),
                scene.visible_count(),
                scene.stats
            );
        }
    }
}

/// Reads the config from the path given on the command line, or falls back
/// to defaults with noise-generated terrain.
fn load_config() -> WorldConfig {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path).expect("config file unreadable");
            WorldConfig::from_json_str(&json).expect("invalid config")
        }
        None => WorldConfig {
            chunk_fill: ChunkFill::Noise { seed: 7 },
            ..WorldConfig::default()
        },
    }
}

/// Procedural stand-in for the real texture atlas: one flat-colored tile
/// per column/row so UVs remain inspectable.
fn build_atlas(layout: &AtlasLayout) -> RgbaImage {
    let mut image = RgbaImage::new(layout.width, layout.height);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let tile = x / layout.tile_size;
        let row = y / layout.tile_size;
        *pixel = Rgba([
            (40 + tile * 23 % 200) as u8,
            (60 + row * 61 % 180) as u8,
            (90 + (tile + row) * 17 % 150) as u8,
            255,
        ]);
    }
    image
}

/// The demo body, independent of which scene backs the engine.
fn run_demo<S: RenderScene>(engine: &mut WorldEngine<S>, config: &WorldConfig) {
    let started = Instant::now();

    // Seed a 4x4 patch of generated terrain around the origin.
    for cx in -2..2 {
        for cz in -2..2 {
            engine.ensure_generated(CellId::new(cx, 0, cz));
        }
    }
    flush_until_idle(engine);
    info!(
        "seeded {} cell(s) in {:?}",
        engine.world().cell_count(),
        started.elapsed()
    );

    let span = 2 * config.cell_size;
    let mut edits = 0;
    for tick in 0..60 {
        for _ in 0..8 {
            let x = fastrand::i32(-span..span);
            let y = fastrand::i32(0..config.cell_size);
            let z = fastrand::i32(-span..span);
            let voxel = match fastrand::u8(0..4) {
                0 => AIR,
                1 => GRASS,
                2 => WATER,
                _ => STONE,
            };
            engine.edit_voxel(
                x,
                y,
                z,
                voxel,
                EditOptions {
                    force: voxel == AIR,
                    ..Default::default()
                },
            );
            edits += 1;
        }

        let report = engine.flush_pending_meshes();
        if !report.failed.is_empty() {
            warn!("tick {}: {} failed build(s)", tick, report.failed.len());
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    flush_until_idle(engine);

    // Both unload paths: a reversible hide and a permanent deletion.
    engine.unload_chunk(CellId::new(-2, 0, -2), UnloadMode::Hide);
    engine.unload_chunk(CellId::new(1, 0, 1), UnloadMode::Permanent);

    info!(
        "demo done: {} edit(s), {} cell(s) loaded, {} mesh entrie(s), {:?} elapsed",
        edits,
        engine.world().cell_count(),
        engine.mesh_registry().entry_count(),
        started.elapsed()
    );
}

/// Flushes until nothing is pending, queued or in flight.
fn flush_until_idle<S: RenderScene>(engine: &mut WorldEngine<S>) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !engine.is_idle() {
        let report = engine.flush_pending_meshes();
        if !report.failed.is_empty() {
            warn!("{} build(s) failed", report.failed.len());
        }
        if Instant::now() > deadline {
            warn!("meshing pipeline did not settle before the deadline");
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}
