//! Triangle primitive.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::hittable::{HitRecord, Hittable};
use camwalk_core::Mesh;
use camwalk_math::{Aabb, Interval, Ray, Vec3};

/// Determinant magnitude below which a ray counts as parallel to the plane.
const PARALLEL_EPSILON: f32 = 1e-8;

/// A mesh face ready for intersection.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    v0: Vec3,
    edge1: Vec3,
    edge2: Vec3,
    /// Unit face normal (zero for degenerate faces)
    normal: Vec3,
    primitive_id: u32,
    bbox: Aabb,
}

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, primitive_id: u32) -> Self {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let normal = edge1.cross(edge2).normalize_or_zero();

        // Pad thin dimensions to avoid degenerate AABBs
        let delta = 0.0001;
        let min = v0.min(v1).min(v2);
        let max = v0.max(v1).max(v2);
        let bbox = Aabb::from_points(min - Vec3::splat(delta), max + Vec3::splat(delta));

        Self {
            v0,
            edge1,
            edge2,
            normal,
            primitive_id,
            bbox,
        }
    }

    /// One triangle per mesh face, tagged with its face index.
    pub fn from_mesh(mesh: &Mesh) -> Vec<Self> {
        mesh.triangles()
            .enumerate()
            .map(|(i, [v0, v1, v2])| Self::new(v0, v1, v2, i as u32))
            .collect()
    }

    pub fn primitive_id(&self) -> u32 {
        self.primitive_id
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }
}

impl Hittable for Triangle {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        let h = ray.direction.cross(self.edge2);
        let a = self.edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < PARALLEL_EPSILON {
            return false;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return false;
        }

        let q = s.cross(self.edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return false;
        }

        let t = f * self.edge2.dot(q);
        if !ray_t.surrounds(t) {
            return false;
        }

        rec.t = t;
        rec.p = ray.at(t);
        rec.normal = self.normal;
        rec.primitive_id = self.primitive_id;
        rec.u = u;
        rec.v = v;

        true
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facing_triangle() -> Triangle {
        // Triangle in XY plane at z=-1
        Triangle::new(
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(0.0, 1.0, -1.0),
            3,
        )
    }

    #[test]
    fn test_triangle_hit() {
        let tri = facing_triangle();
        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let mut rec = HitRecord::default();

        assert!(tri.hit(&ray, Interval::new(0.0, f32::INFINITY), &mut rec));
        assert!((rec.t - 1.0).abs() < 1e-6);
        assert_eq!(rec.primitive_id, 3);
        assert_eq!(rec.normal, Vec3::Z);
    }

    #[test]
    fn test_triangle_backface_hit() {
        // Hits from behind still count; the normal is not flipped.
        let tri = facing_triangle();
        let ray = Ray::new(Vec3::new(0.0, 0.0, -2.0), Vec3::Z);
        let mut rec = HitRecord::default();

        assert!(tri.hit(&ray, Interval::new(0.0, f32::INFINITY), &mut rec));
        assert_eq!(rec.normal, Vec3::Z);
    }

    #[test]
    fn test_triangle_miss() {
        let tri = facing_triangle();
        let mut rec = HitRecord::default();

        // Ray pointing away
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(!tri.hit(&ray, Interval::new(0.0, f32::INFINITY), &mut rec));

        // Passing beside the triangle
        let ray = Ray::new(Vec3::new(5.0, 0.0, 0.0), -Vec3::Z);
        assert!(!tri.hit(&ray, Interval::new(0.0, f32::INFINITY), &mut rec));

        // Beyond the search interval
        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        assert!(!tri.hit(&ray, Interval::new(0.0, 0.5), &mut rec));
    }

    #[test]
    fn test_triangle_parallel_ray() {
        let tri = facing_triangle();
        let ray = Ray::new(Vec3::new(-5.0, 0.0, -1.0), Vec3::X);
        let mut rec = HitRecord::default();
        assert!(!tri.hit(&ray, Interval::new(0.0, f32::INFINITY), &mut rec));
    }

    #[test]
    fn test_degenerate_triangle_never_hits() {
        let tri = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::X * 2.0, 0);
        assert_eq!(tri.normal(), Vec3::ZERO);
        let ray = Ray::new(Vec3::new(0.5, 0.0, 1.0), -Vec3::Z);
        let mut rec = HitRecord::default();
        assert!(!tri.hit(&ray, Interval::new(0.0, f32::INFINITY), &mut rec));
    }
}
