//! camwalk tracer - nearest-hit ray casting for the walk planner.
//!
//! Triangles are intersected with Möller-Trumbore and accelerated with a
//! median-split BVH. The planner only sees the [`RayIntersector`] contract;
//! [`BvhIntersector`] is the production backend and
//! [`BruteForceIntersector`] a linear-scan reference.

mod bvh;
mod hittable;
mod intersector;
mod triangle;

pub use bvh::BvhNode;
pub use hittable::{HitRecord, Hittable};
pub use intersector::{
    BruteForceIntersector, BvhIntersector, IntersectError, IntersectionBatch, RayHit,
    RayIntersector,
};
pub use triangle::Triangle;

/// Re-export common math types from camwalk_math
pub use camwalk_math::{Aabb, Interval, Ray, Vec3};
