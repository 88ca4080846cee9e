//! Space carving: building an occupancy map from known-free viewpoints.
//!
//! The mesh surface is first rasterized into occupied voxels. Rays are then
//! cast in all directions from each camera position; every voxel a ray
//! crosses before reaching geometry (or leaving the mapped region) has been
//! seen through and is marked free. Between iterations the camera jumps to a
//! random free point so that the carved region grows beyond the direct line
//! of sight of the start position.

use std::f32::consts::PI;

use camwalk_core::{Mesh, Occupancy, OccupancyMap, VoxelMapError, VoxelOccupancyMap};
use camwalk_math::{Aabb, IVec3, Vec3};
use camwalk_tracer::{IntersectError, RayIntersector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sampling::uniform_in_box;

/// Surface sample spacing, in voxels.
const SURFACE_SAMPLE_SPACING: f32 = 0.25;
/// Start repair march step, in voxels.
const START_MARCH_STEP: f32 = 0.25;

#[derive(Error, Debug)]
pub enum CarveError {
    #[error("Ray intersector failure: {0}")]
    Intersector(#[from] IntersectError),

    #[error("Cannot create occupancy map: {0}")]
    VoxelMap(#[from] VoxelMapError),

    #[error("Invalid carve configuration: {0}")]
    InvalidConfig(String),

    #[error("No voxel was carved free; every start position was rejected")]
    NoFreeSpace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarveConfig {
    pub voxel_size: f32,
    /// Lower corner of the mapped region. Defaults to the mesh bounds.
    pub bounds_min: Option<Vec3>,
    /// Upper corner of the mapped region. Defaults to the mesh bounds.
    pub bounds_max: Option<Vec3>,
    /// Rays cast per camera position.
    pub num_rays: usize,
    /// Camera positions carved from per start, the start included.
    pub num_iterations: usize,
    pub seed: u64,
    /// Rejection samples allowed when moving the camera to a new free point.
    pub max_reposition_attempts: usize,
}

impl Default for CarveConfig {
    fn default() -> Self {
        Self {
            voxel_size: 1.0,
            bounds_min: None,
            bounds_max: None,
            num_rays: 10_000,
            num_iterations: 1,
            seed: 0,
            max_reposition_attempts: 10_000,
        }
    }
}

impl CarveConfig {
    pub fn with_voxel_size(mut self, voxel_size: f32) -> Self {
        self.voxel_size = voxel_size;
        self
    }

    pub fn with_bounds(mut self, min: Vec3, max: Vec3) -> Self {
        self.bounds_min = Some(min);
        self.bounds_max = Some(max);
        self
    }

    pub fn with_num_rays(mut self, num_rays: usize) -> Self {
        self.num_rays = num_rays;
        self
    }

    pub fn with_num_iterations(mut self, num_iterations: usize) -> Self {
        self.num_iterations = num_iterations;
        self
    }

    /// Mapped region: the configured corners, falling back to the mesh
    /// bounds per corner.
    pub fn region(&self, mesh: &Mesh) -> Aabb {
        let mesh_bounds = mesh.bounds();
        Aabb::from_corners(
            self.bounds_min.unwrap_or_else(|| mesh_bounds.min()),
            self.bounds_max.unwrap_or_else(|| mesh_bounds.max()),
        )
    }

    fn validate(&self) -> Result<(), CarveError> {
        if self.num_rays == 0 {
            return Err(CarveError::InvalidConfig("num_rays must be at least 1".into()));
        }
        if self.num_iterations == 0 {
            return Err(CarveError::InvalidConfig("num_iterations must be at least 1".into()));
        }
        Ok(())
    }
}

/// `n` roughly evenly spread unit directions (Fibonacci sphere).
pub fn fibonacci_sphere(n: usize) -> Vec<Vec3> {
    let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
    let (z_first, z_last) = (1.0 / n as f32 - 1.0, 1.0 - 1.0 / n as f32);
    (0..n)
        .map(|i| {
            let z = if n > 1 {
                z_first + (z_last - z_first) * i as f32 / (n - 1) as f32
            } else {
                z_first
            };
            let radius = (1.0 - z * z).max(0.0).sqrt();
            let theta = golden_angle * i as f32;
            Vec3::new(radius * theta.cos(), radius * theta.sin(), z)
        })
        .collect()
}

/// Voxel keys covered by one triangle's surface.
fn rasterize_triangle(map: &VoxelOccupancyMap, [a, b, c]: [Vec3; 3]) -> Vec<IVec3> {
    let bounds = map.bounds();
    if ![a, b, c].iter().any(|&v| bounds.contains_point(v)) {
        return Vec::new();
    }

    let (ka, kb, kc) = (map.key(a), map.key(b), map.key(c));
    if ka == kb && kb == kc {
        return vec![ka];
    }

    let centroid = (a + b + c) / 3.0;
    let mut keys = vec![map.key(centroid)];

    let Some(u) = (b - a).try_normalize() else {
        return keys;
    };
    let Some(normal) = (b - a).cross(c - a).try_normalize() else {
        // Collinear: only the vertex voxels.
        for v in [a, b, c] {
            if bounds.contains_point(v) {
                keys.push(map.key(v));
            }
        }
        return keys;
    };
    let v = normal.cross(u);

    // Triangle in (u, v) plane coordinates with `a` at the origin.
    let project = |p: Vec3| ((p - a).dot(u), (p - a).dot(v));
    let (p1, p2) = (project(b), project(c));
    let denom = p1.0 * p2.1 - p2.0 * p1.1;

    let spacing = SURFACE_SAMPLE_SPACING * map.voxel_size();
    let pad = 0.001 * map.voxel_size();
    let (u_min, u_max) = (0.0_f32.min(p1.0).min(p2.0) - pad, 0.0_f32.max(p1.0).max(p2.0) + pad);
    let (v_min, v_max) = (0.0_f32.min(p1.1).min(p2.1) - pad, 0.0_f32.max(p1.1).max(p2.1) + pad);
    let nu = ((u_max - u_min) / spacing).ceil() as usize + 1;
    let nv = ((v_max - v_min) / spacing).ceil() as usize + 1;

    for i in 0..nu {
        let su = u_min + i as f32 * spacing;
        for j in 0..nv {
            let sv = v_min + j as f32 * spacing;
            // Barycentric coordinates of (su, sv) against (0,0), p1, p2.
            let l1 = (su * p2.1 - p2.0 * sv) / denom;
            let l2 = (p1.0 * sv - su * p1.1) / denom;
            let l0 = 1.0 - l1 - l2;
            if l0 <= 0.0 || l1 <= 0.0 || l2 <= 0.0 {
                continue;
            }
            let p = a + u * su + v * sv;
            if bounds.contains_point(p) {
                keys.push(map.key(p));
            }
        }
    }
    keys
}

/// Builds [`VoxelOccupancyMap`]s by space carving.
#[derive(Debug, Clone, Default)]
pub struct SpaceCarver {
    config: CarveConfig,
}

impl SpaceCarver {
    pub fn new(config: CarveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CarveConfig {
        &self.config
    }

    /// Carve free space seen from `starts` and return the resulting map.
    pub fn carve<I: RayIntersector + ?Sized>(
        &self,
        mesh: &Mesh,
        intersector: &I,
        starts: &[Vec3],
    ) -> Result<VoxelOccupancyMap, CarveError> {
        self.config.validate()?;
        let mut map = VoxelOccupancyMap::new(self.config.voxel_size, self.config.region(mesh))?;

        self.mark_surface(&mut map, mesh);
        log::info!(
            "Rasterized {} triangles into {} occupied voxels",
            mesh.triangle_count(),
            map.occupied_count()
        );

        let directions = fibonacci_sphere(self.config.num_rays);
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        for (index, &start) in starts.iter().enumerate() {
            let Some(mut position) = self.verify_start(&map, intersector, start, &directions)? else {
                log::warn!("Skipping start {} at {:?}: no unoccupied voxel nearby", index, start);
                continue;
            };

            for iteration in 0..self.config.num_iterations {
                let freed = self.carve_from(&mut map, intersector, position, &directions)?;
                log::debug!(
                    "Start {} iteration {}: freed {} voxels from {:?}",
                    index,
                    iteration,
                    freed,
                    position
                );

                if iteration + 1 == self.config.num_iterations {
                    break;
                }
                match self.reposition(&map, &mut rng) {
                    Some(next) => position = next,
                    None => {
                        log::warn!("Start {}: no free position to continue carving from", index);
                        break;
                    }
                }
            }
        }

        let free = map.free_count();
        if free == 0 {
            return Err(CarveError::NoFreeSpace);
        }
        log::info!(
            "Carved {} free voxels from {} start positions",
            free,
            starts.len()
        );
        Ok(map)
    }

    fn mark_surface(&self, map: &mut VoxelOccupancyMap, mesh: &Mesh) {
        let shared: &VoxelOccupancyMap = map;
        let keys: Vec<IVec3> = (0..mesh.triangle_count())
            .into_par_iter()
            .flat_map_iter(|face| rasterize_triangle(shared, mesh.triangle(face)))
            .collect();
        for key in keys {
            map.set_state(key, Occupancy::Occupied);
        }
    }

    /// The start itself if its voxel is inside the region and not occupied.
    /// Otherwise march outwards, most open direction first, to the first
    /// such voxel.
    fn verify_start<I: RayIntersector + ?Sized>(
        &self,
        map: &VoxelOccupancyMap,
        intersector: &I,
        start: Vec3,
        directions: &[Vec3],
    ) -> Result<Option<Vec3>, CarveError> {
        if !start.is_finite() {
            return Ok(None);
        }
        let usable = |p: Vec3| {
            let key = map.key(p);
            map.key_in_bounds(key) && map.state(key) != Occupancy::Occupied
        };
        if usable(start) {
            return Ok(Some(start));
        }

        let hits = intersector.intersect(&vec![start; directions.len()], directions)?;
        let mut order: Vec<usize> = (0..directions.len()).collect();
        order.sort_by(|&a, &b| hits.distances[b].total_cmp(&hits.distances[a]));

        let step = START_MARCH_STEP * map.voxel_size();
        let reach = map.bounds().diagonal();
        for i in order {
            let max_distance = hits.distances[i].min(reach);
            let mut t = step;
            while t < max_distance {
                let p = start + directions[i] * t;
                if usable(p) {
                    log::debug!("Moved start {:?} to {:?}", start, p);
                    return Ok(Some(p));
                }
                t += step;
            }
        }
        Ok(None)
    }

    /// Cast every direction from `position` and free the unknown voxels the
    /// rays cross. Returns the number of newly freed voxels.
    fn carve_from<I: RayIntersector + ?Sized>(
        &self,
        map: &mut VoxelOccupancyMap,
        intersector: &I,
        position: Vec3,
        directions: &[Vec3],
    ) -> Result<usize, CarveError> {
        let hits = intersector.intersect(&vec![position; directions.len()], directions)?;
        let reach = map.bounds().diagonal();

        let shared: &VoxelOccupancyMap = map;
        let seen: Vec<IVec3> = directions
            .par_iter()
            .zip(hits.distances.par_iter())
            .flat_map_iter(|(&dir, &hit)| {
                let mut keys = Vec::new();
                for step in shared.traverse(position, dir, hit.min(reach)) {
                    if !shared.key_in_bounds(step.key) {
                        break;
                    }
                    match shared.state(step.key) {
                        Occupancy::Occupied => break,
                        Occupancy::Unknown => keys.push(step.key),
                        Occupancy::Free => {}
                    }
                }
                keys
            })
            .collect();

        let mut freed = 0;
        for key in seen {
            if map.state(key) == Occupancy::Unknown {
                map.set_state(key, Occupancy::Free);
                freed += 1;
            }
        }
        Ok(freed)
    }

    /// Uniform free point inside the free-space bounds, by rejection.
    fn reposition<R: Rng + ?Sized>(&self, map: &VoxelOccupancyMap, rng: &mut R) -> Option<Vec3> {
        let free_bounds = map.free_space_bounds();
        if free_bounds.is_empty() {
            return None;
        }
        let center = free_bounds.centroid();
        let half_extent = (free_bounds.max() - free_bounds.min()) * 0.5;
        (0..self.config.max_reposition_attempts)
            .map(|_| uniform_in_box(rng, center, half_extent))
            .find(|&p| map.query(p).is_free())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camwalk_tracer::BvhIntersector;

    /// Closed cube `[-h, h]^3`, 12 triangles.
    fn room(h: f32) -> Mesh {
        let positions = vec![
            Vec3::new(-h, -h, -h),
            Vec3::new(h, -h, -h),
            Vec3::new(h, h, -h),
            Vec3::new(-h, h, -h),
            Vec3::new(-h, -h, h),
            Vec3::new(h, -h, h),
            Vec3::new(h, h, h),
            Vec3::new(-h, h, h),
        ];
        let faces = vec![
            [0, 1, 2],
            [0, 2, 3],
            [4, 6, 5],
            [4, 7, 6],
            [0, 5, 1],
            [0, 4, 5],
            [3, 2, 6],
            [3, 6, 7],
            [0, 3, 7],
            [0, 7, 4],
            [1, 5, 6],
            [1, 6, 2],
        ];
        Mesh::new(positions, faces).unwrap()
    }

    fn carver() -> SpaceCarver {
        SpaceCarver::new(
            CarveConfig::default()
                .with_voxel_size(0.5)
                .with_bounds(Vec3::splat(-6.0), Vec3::splat(6.0))
                .with_num_rays(2000),
        )
    }

    #[test]
    fn test_fibonacci_sphere_unit_and_spread() {
        let dirs = fibonacci_sphere(500);
        assert_eq!(dirs.len(), 500);
        assert!(dirs.iter().all(|d| (d.length() - 1.0).abs() < 1e-4));
        let mean = dirs.iter().copied().sum::<Vec3>() / 500.0;
        assert!(mean.length() < 0.02, "{mean:?}");
        assert_eq!(fibonacci_sphere(1), vec![Vec3::X]);
    }

    #[test]
    fn test_surface_rasterization() {
        let mesh = room(5.0);
        let mut map = VoxelOccupancyMap::new(0.5, Aabb::from_corners(Vec3::splat(-6.0), Vec3::splat(6.0))).unwrap();
        carver().mark_surface(&mut map, &mesh);

        assert_eq!(map.query(Vec3::new(5.1, 0.3, -2.2)), Occupancy::Occupied);
        assert_eq!(map.query(Vec3::new(1.2, -5.0, 3.3)), Occupancy::Occupied);
        assert_eq!(map.query(Vec3::ZERO), Occupancy::Unknown);
    }

    #[test]
    fn test_small_triangle_single_voxel() {
        let map = VoxelOccupancyMap::new(1.0, Aabb::from_corners(Vec3::ZERO, Vec3::splat(4.0))).unwrap();
        let keys = rasterize_triangle(
            &map,
            [Vec3::new(1.1, 1.1, 1.1), Vec3::new(1.3, 1.1, 1.1), Vec3::new(1.1, 1.4, 1.1)],
        );
        assert_eq!(keys, vec![IVec3::ONE]);

        let outside = rasterize_triangle(
            &map,
            [Vec3::new(9.0, 9.0, 9.0), Vec3::new(9.5, 9.0, 9.0), Vec3::new(9.0, 9.5, 9.0)],
        );
        assert!(outside.is_empty());
    }

    #[test]
    fn test_carve_room() {
        let mesh = room(5.0);
        let intersector = BvhIntersector::new(&mesh);
        let map = carver().carve(&mesh, &intersector, &[Vec3::ZERO]).unwrap();

        assert_eq!(map.query(Vec3::ZERO), Occupancy::Free);
        assert_eq!(map.query(Vec3::new(1.0, 1.0, 1.0)), Occupancy::Free);
        assert_eq!(map.query(Vec3::new(5.1, 0.0, 0.0)), Occupancy::Occupied);
        // Behind the wall: never seen.
        assert_eq!(map.query(Vec3::new(5.8, 0.0, 0.0)), Occupancy::Unknown);

        let free = map.free_space_bounds();
        assert!(free.min().cmpge(Vec3::splat(-5.0)).all());
        assert!(free.max().cmple(Vec3::splat(5.0)).all());
    }

    #[test]
    fn test_iterations_keep_growing_free_space() {
        let mesh = room(5.0);
        let intersector = BvhIntersector::new(&mesh);
        let once = carver().carve(&mesh, &intersector, &[Vec3::ZERO]).unwrap();
        let twice = SpaceCarver::new(carver().config().clone().with_num_iterations(3))
            .carve(&mesh, &intersector, &[Vec3::ZERO])
            .unwrap();
        assert!(twice.free_count() >= once.free_count());
    }

    #[test]
    fn test_start_inside_wall_is_moved() {
        let mesh = room(5.0);
        let intersector = BvhIntersector::new(&mesh);
        let carver = carver();
        let mut map = VoxelOccupancyMap::new(0.5, carver.config().region(&mesh)).unwrap();
        carver.mark_surface(&mut map, &mesh);

        // Inside the voxel layer the x = 5 wall was rasterized into.
        let start = Vec3::new(5.1, 0.2, 0.2);
        assert_eq!(map.query(start), Occupancy::Occupied);
        let moved = carver
            .verify_start(&map, &intersector, start, &fibonacci_sphere(200))
            .unwrap()
            .unwrap();
        assert_ne!(map.query(moved), Occupancy::Occupied);
        assert!(map.key_in_bounds(map.key(moved)));

        let free_start = Vec3::new(1.0, 1.0, 1.0);
        assert_eq!(
            carver
                .verify_start(&map, &intersector, free_start, &fibonacci_sphere(200))
                .unwrap(),
            Some(free_start)
        );
    }

    #[test]
    fn test_no_usable_start() {
        let mesh = room(5.0);
        let intersector = BvhIntersector::new(&mesh);
        let err = carver()
            .carve(&mesh, &intersector, &[Vec3::new(f32::NAN, 0.0, 0.0)])
            .unwrap_err();
        assert!(matches!(err, CarveError::NoFreeSpace));
    }

    #[test]
    fn test_invalid_config() {
        let mesh = room(5.0);
        let intersector = BvhIntersector::new(&mesh);
        let err = SpaceCarver::new(CarveConfig::default().with_num_rays(0))
            .carve(&mesh, &intersector, &[Vec3::ZERO])
            .unwrap_err();
        assert!(matches!(err, CarveError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_json_defaults() {
        let config: CarveConfig = serde_json::from_str(r#"{ "voxel_size": 0.25, "bounds_min": [-1, -1, -1] }"#).unwrap();
        assert_eq!(config.voxel_size, 0.25);
        assert_eq!(config.bounds_min, Some(Vec3::splat(-1.0)));
        assert_eq!(config.bounds_max, None);
        assert_eq!(config.num_rays, 10_000);
    }
}
