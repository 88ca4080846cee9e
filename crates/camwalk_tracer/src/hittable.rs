//! Hittable trait and HitRecord for ray-primitive intersection.

use camwalk_math::{Aabb, Interval, Ray, Vec3};

/// Record of a ray-primitive intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Point of intersection
    pub p: Vec3,
    /// Unit geometric normal of the primitive (winding order, not flipped
    /// towards the ray)
    pub normal: Vec3,
    /// Index of the primitive in its source mesh
    pub primitive_id: u32,
    /// Barycentric coordinates
    pub u: f32,
    pub v: f32,
}

impl Default for HitRecord {
    fn default() -> Self {
        Self {
            t: f32::INFINITY,
            p: Vec3::ZERO,
            normal: Vec3::ZERO,
            primitive_id: 0,
            u: 0.0,
            v: 0.0,
        }
    }
}

/// Trait for objects that can be hit by rays.
pub trait Hittable: Send + Sync {
    /// Test if a ray hits this object strictly inside `ray_t`.
    ///
    /// Returns true if hit, and fills in the hit record.
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool;

    /// Get the axis-aligned bounding box of this object.
    fn bounding_box(&self) -> Aabb;
}

/// Closest hit among a slice of hittables, searching `(ray_t.min, ray_t.max)`.
pub fn hit_closest<H: Hittable>(objects: &[H], ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
    let mut hit_anything = false;
    let mut closest = ray_t.max;

    for obj in objects {
        if obj.hit(ray, Interval::new(ray_t.min, closest), rec) {
            hit_anything = true;
            closest = rec.t;
        }
    }
    hit_anything
}
