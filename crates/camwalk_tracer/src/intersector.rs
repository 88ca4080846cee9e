//! Batched nearest-hit queries.
//!
//! Every backend answers the same question for a batch of rays: the nearest
//! intersection at positive distance, reported as Euclidean distance along
//! the normalized direction. Misses report an infinite distance, a zero
//! normal and primitive id -1.

use crate::bvh::BvhNode;
use crate::hittable::{hit_closest, HitRecord, Hittable};
use crate::triangle::Triangle;
use camwalk_core::Mesh;
use camwalk_math::{Interval, Ray, Vec3};
use rayon::prelude::*;
use thiserror::Error;

/// Errors reported by an intersection backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntersectError {
    #[error("Ray batch has {origins} origins but {directions} directions")]
    LengthMismatch { origins: usize, directions: usize },

    #[error("Intersection backend error: {0}")]
    Backend(String),
}

/// Nearest hit for a single ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub normal: Vec3,
    pub primitive_id: i32,
}

impl RayHit {
    pub const MISS: RayHit = RayHit {
        distance: f32::INFINITY,
        normal: Vec3::ZERO,
        primitive_id: -1,
    };

    pub fn is_hit(&self) -> bool {
        self.primitive_id >= 0
    }
}

/// Results for a ray batch, parallel to the input rays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntersectionBatch {
    pub distances: Vec<f32>,
    pub normals: Vec<Vec3>,
    pub primitive_ids: Vec<i32>,
}

impl IntersectionBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            distances: Vec::with_capacity(capacity),
            normals: Vec::with_capacity(capacity),
            primitive_ids: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, hit: RayHit) {
        self.distances.push(hit.distance);
        self.normals.push(hit.normal);
        self.primitive_ids.push(hit.primitive_id);
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<RayHit> {
        Some(RayHit {
            distance: *self.distances.get(i)?,
            normal: *self.normals.get(i)?,
            primitive_id: *self.primitive_ids.get(i)?,
        })
    }

    pub fn hit_count(&self) -> usize {
        self.primitive_ids.iter().filter(|&&id| id >= 0).count()
    }
}

impl FromIterator<RayHit> for IntersectionBatch {
    fn from_iter<I: IntoIterator<Item = RayHit>>(iter: I) -> Self {
        let mut batch = IntersectionBatch::default();
        for hit in iter {
            batch.push(hit);
        }
        batch
    }
}

/// Nearest-hit ray casting against a fixed mesh.
pub trait RayIntersector: Send + Sync {
    /// Cast a batch of rays. Directions need not be unit length; zero or
    /// non-finite directions are reported as misses.
    fn intersect(&self, origins: &[Vec3], directions: &[Vec3]) -> Result<IntersectionBatch, IntersectError>;

    /// Cast a single ray.
    fn intersect_one(&self, origin: Vec3, direction: Vec3) -> Result<RayHit, IntersectError> {
        let batch = self.intersect(&[origin], &[direction])?;
        batch
            .get(0)
            .ok_or_else(|| IntersectError::Backend("empty result for a single ray".to_string()))
    }
}

fn check_lengths(origins: &[Vec3], directions: &[Vec3]) -> Result<(), IntersectError> {
    if origins.len() != directions.len() {
        return Err(IntersectError::LengthMismatch {
            origins: origins.len(),
            directions: directions.len(),
        });
    }
    Ok(())
}

/// Normalize the direction and search `(0, inf)` so that `t` is a distance.
fn cast(origin: Vec3, direction: Vec3, hit: impl Fn(&Ray, &mut HitRecord) -> bool) -> RayHit {
    let Some(dir) = direction.try_normalize() else {
        return RayHit::MISS;
    };
    if !origin.is_finite() {
        return RayHit::MISS;
    }

    let ray = Ray::new(origin, dir);
    let mut rec = HitRecord::default();
    if hit(&ray, &mut rec) {
        RayHit {
            distance: rec.t,
            normal: rec.normal,
            primitive_id: rec.primitive_id as i32,
        }
    } else {
        RayHit::MISS
    }
}

const SEARCH: Interval = Interval {
    min: 0.0,
    max: f32::INFINITY,
};

/// BVH-accelerated backend; batches are cast in parallel with rayon.
pub struct BvhIntersector {
    root: BvhNode,
    triangle_count: usize,
}

impl BvhIntersector {
    pub fn new(mesh: &Mesh) -> Self {
        let triangles = Triangle::from_mesh(mesh);
        let triangle_count = triangles.len();
        let root = BvhNode::new(triangles);
        log::info!(
            "Built BVH over {} triangles (depth {})",
            triangle_count,
            root.depth()
        );
        Self {
            root,
            triangle_count,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }
}

impl RayIntersector for BvhIntersector {
    fn intersect(&self, origins: &[Vec3], directions: &[Vec3]) -> Result<IntersectionBatch, IntersectError> {
        check_lengths(origins, directions)?;

        let hits: Vec<RayHit> = origins
            .par_iter()
            .zip(directions.par_iter())
            .map(|(&o, &d)| cast(o, d, |ray, rec| self.root.hit(ray, SEARCH, rec)))
            .collect();

        Ok(hits.into_iter().collect())
    }
}

/// Linear-scan backend. Slow, but has no acceleration structure to get
/// wrong; used to cross-check the BVH.
pub struct BruteForceIntersector {
    triangles: Vec<Triangle>,
}

impl BruteForceIntersector {
    pub fn new(mesh: &Mesh) -> Self {
        let triangles = Triangle::from_mesh(mesh);
        log::debug!("Brute-force intersector over {} triangles", triangles.len());
        Self { triangles }
    }
}

impl RayIntersector for BruteForceIntersector {
    fn intersect(&self, origins: &[Vec3], directions: &[Vec3]) -> Result<IntersectionBatch, IntersectError> {
        check_lengths(origins, directions)?;

        Ok(origins
            .iter()
            .zip(directions)
            .map(|(&o, &d)| cast(o, d, |ray, rec| hit_closest(&self.triangles, ray, SEARCH, rec)))
            .collect())
    }
}
