//! camwalk math - shared geometric primitives.
//!
//! Re-exports glam and adds the small set of types the tracer, occupancy map
//! and planner share: rays, intervals, bounding boxes, camera frames and
//! pinhole pixel ray bundles.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod camera;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use camera::{CameraFrame, PixelRays};
pub use interval::Interval;
pub use ray::Ray;
