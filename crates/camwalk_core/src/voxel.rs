//! Sparse voxel occupancy store.
//!
//! Voxels are addressed by integer keys `floor(p / voxel_size)` and kept in a
//! hash map holding only the voxels that have been observed. Anything not in
//! the map, or outside the mapped region, is `Unknown`.

use std::collections::HashMap;

use camwalk_math::{Aabb, IVec3, Vec3};
use thiserror::Error;

use crate::occupancy::{Occupancy, OccupancyMap};

/// Direction components below this are treated as parallel to a grid plane.
const DDA_PARALLEL_EPSILON: f32 = 1e-6;

#[derive(Error, Debug, PartialEq)]
pub enum VoxelMapError {
    #[error("Voxel size must be positive and finite, got {0}")]
    InvalidVoxelSize(f32),

    #[error("Mapped region is empty or not finite")]
    InvalidBounds,
}

/// Hash-map backed occupancy map with a fixed voxel size.
#[derive(Debug, Clone)]
pub struct VoxelOccupancyMap {
    voxel_size: f32,
    bounds: Aabb,
    cells: HashMap<IVec3, Occupancy>,
    free_bounds: Aabb,
}

impl VoxelOccupancyMap {
    /// Create an all-unknown map covering `bounds`.
    pub fn new(voxel_size: f32, bounds: Aabb) -> Result<Self, VoxelMapError> {
        if !(voxel_size > 0.0 && voxel_size.is_finite()) {
            return Err(VoxelMapError::InvalidVoxelSize(voxel_size));
        }
        if bounds.is_empty() || !bounds.min().is_finite() || !bounds.max().is_finite() {
            return Err(VoxelMapError::InvalidBounds);
        }
        Ok(Self {
            voxel_size,
            bounds,
            cells: HashMap::new(),
            free_bounds: Aabb::EMPTY,
        })
    }

    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Region outside of which every query is `Unknown`.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Key of the voxel containing `p`.
    pub fn key(&self, p: Vec3) -> IVec3 {
        (p / self.voxel_size).floor().as_ivec3()
    }

    /// World-space center of a voxel.
    pub fn center(&self, key: IVec3) -> Vec3 {
        (key.as_vec3() + Vec3::splat(0.5)) * self.voxel_size
    }

    /// True if the voxel's center lies inside the mapped region.
    pub fn key_in_bounds(&self, key: IVec3) -> bool {
        self.bounds.contains_point(self.center(key))
    }

    /// Stored state of a voxel, ignoring the mapped region.
    pub fn state(&self, key: IVec3) -> Occupancy {
        self.cells.get(&key).copied().unwrap_or(Occupancy::Unknown)
    }

    /// Set a voxel's state. Setting `Unknown` forgets the voxel.
    ///
    /// Free-space bounds only ever grow, so overwriting a free voxel leaves
    /// them as a conservative envelope.
    pub fn set_state(&mut self, key: IVec3, state: Occupancy) {
        match state {
            Occupancy::Unknown => {
                self.cells.remove(&key);
            }
            Occupancy::Free => {
                self.free_bounds = self.free_bounds.grow(self.center(key));
                self.cells.insert(key, state);
            }
            Occupancy::Occupied => {
                self.cells.insert(key, state);
            }
        }
    }

    /// Mark the voxel containing `p` free.
    pub fn mark_free(&mut self, p: Vec3) {
        self.set_state(self.key(p), Occupancy::Free);
    }

    /// Set every voxel whose center lies inside `region` to `state`.
    /// Returns the number of voxels written.
    pub fn fill_box(&mut self, region: &Aabb, state: Occupancy) -> usize {
        if region.is_empty() {
            return 0;
        }
        let lo = self.key(region.min());
        let hi = self.key(region.max());
        let mut written = 0;
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    let key = IVec3::new(x, y, z);
                    if region.contains_point(self.center(key)) {
                        self.set_state(key, state);
                        written += 1;
                    }
                }
            }
        }
        written
    }

    pub fn free_count(&self) -> usize {
        self.cells.values().filter(|s| s.is_free()).count()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.values().filter(|&&s| s == Occupancy::Occupied).count()
    }

    /// Voxels visited by a ray from `origin` along `direction`, in order,
    /// up to `max_distance` (world units along the normalized direction).
    pub fn traverse(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> VoxelTraversal {
        VoxelTraversal::new(origin, direction, max_distance, self.voxel_size)
    }
}

impl OccupancyMap for VoxelOccupancyMap {
    fn query(&self, p: Vec3) -> Occupancy {
        if !p.is_finite() || !self.bounds.contains_point(p) {
            return Occupancy::Unknown;
        }
        self.state(self.key(p))
    }

    fn free_space_bounds(&self) -> Aabb {
        self.free_bounds
    }
}

/// One voxel visited by a [`VoxelTraversal`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelStep {
    pub key: IVec3,
    /// Distance along the ray at which the voxel is entered.
    pub t: f32,
}

/// Exact grid traversal (3D DDA): yields every voxel a ray passes through.
#[derive(Debug, Clone)]
pub struct VoxelTraversal {
    key: IVec3,
    step: IVec3,
    t_delta: Vec3,
    t_max: Vec3,
    t: f32,
    max_distance: f32,
    done: bool,
}

impl VoxelTraversal {
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32, voxel_size: f32) -> Self {
        let pos = origin / voxel_size;
        let key = pos.floor().as_ivec3();

        let Some(dir) = direction.try_normalize() else {
            // Degenerate direction: only the starting voxel.
            return Self {
                key,
                step: IVec3::ZERO,
                t_delta: Vec3::INFINITY,
                t_max: Vec3::INFINITY,
                t: 0.0,
                max_distance: 0.0,
                done: false,
            };
        };

        let mut step = IVec3::ZERO;
        let mut t_delta = Vec3::INFINITY;
        let mut t_max = Vec3::INFINITY;
        for axis in 0..3 {
            let d = dir[axis];
            if d.abs() < DDA_PARALLEL_EPSILON {
                continue;
            }
            step[axis] = if d > 0.0 { 1 } else { -1 };
            t_delta[axis] = (voxel_size / d).abs();
            let cell = key[axis] as f32;
            let to_boundary = if d > 0.0 {
                cell + 1.0 - pos[axis]
            } else {
                pos[axis] - cell
            };
            t_max[axis] = to_boundary * t_delta[axis];
        }

        Self {
            key,
            step,
            t_delta,
            t_max,
            t: 0.0,
            max_distance,
            done: false,
        }
    }
}

impl Iterator for VoxelTraversal {
    type Item = VoxelStep;

    fn next(&mut self) -> Option<VoxelStep> {
        if self.done {
            return None;
        }
        let current = VoxelStep {
            key: self.key,
            t: self.t,
        };

        let axis = if self.t_max.x < self.t_max.y && self.t_max.x < self.t_max.z {
            0
        } else if self.t_max.y < self.t_max.z {
            1
        } else {
            2
        };
        let next_t = self.t_max[axis];
        if !next_t.is_finite() || next_t > self.max_distance {
            self.done = true;
        } else {
            self.t = next_t;
            self.t_max[axis] += self.t_delta[axis];
            self.key[axis] += self.step[axis];
        }

        Some(current)
    }
}
