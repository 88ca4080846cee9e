//! camwalk - plan random-walk camera trajectories through an OBJ scene.
//!
//! Usage: `camwalk <mesh.obj> <cameras.json> [config.json] [output.json]`
//!
//! Free space is carved from the camera positions, then one trajectory is
//! planned per camera. Cameras whose walk fails are reported and skipped.

mod scene;

use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Instant;

use anyhow::{Context, Result};
use camwalk_planner::{RandomWalkPlanner, SpaceCarver};
use camwalk_tracer::BvhIntersector;
use rayon::prelude::*;

use scene::{CameraTrajectory, RunConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args.len() > 5 {
        eprintln!(
            "Usage: {} <mesh.obj> <cameras.json> [config.json] [output.json]",
            args[0]
        );
        std::process::exit(1);
    }

    let mesh = scene::load_obj(&args[1])?;
    let cameras = scene::load_cameras(&args[2])?;
    let config = match args.get(3) {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };

    let start = Instant::now();
    let intersector = BvhIntersector::new(&mesh);

    let positions: Vec<_> = cameras.iter().map(|c| c.position).collect();
    let occupancy = SpaceCarver::new(config.carve.clone())
        .carve(&mesh, &intersector, &positions)
        .context("Space carving failed")?;
    let walk = config.scene_walk(occupancy.voxel_size())?;
    log::info!(
        "Walk in asset units: voxel {}, step half extent {:?}",
        walk.voxel_size,
        walk.query_half_extent_relative_to_current
    );

    let planner = RandomWalkPlanner::new(&intersector, &occupancy, walk)?;
    let results: Vec<CameraTrajectory> = cameras
        .par_iter()
        .filter_map(|camera| match planner.plan(camera.start_pose()) {
            Ok(trajectory) => Some(CameraTrajectory {
                camera: camera.name.clone(),
                trajectory,
            }),
            Err(e) => {
                log::warn!("Skipping camera '{}': {}", camera.name, e);
                None
            }
        })
        .collect();

    log::info!(
        "Planned {}/{} cameras in {:.2}s",
        results.len(),
        cameras.len(),
        start.elapsed().as_secs_f32()
    );

    match args.get(4) {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &results)?;
            writer.flush()?;
            log::info!("Wrote {}", path);
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &results)?;
            writeln!(writer)?;
        }
    }

    Ok(())
}
