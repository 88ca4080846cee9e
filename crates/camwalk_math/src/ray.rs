use crate::Vec3;

/// A half-line starting at `origin` and travelling along `direction`.
///
/// The direction is not required to be unit length; `t` is measured in
/// multiples of it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Ray from `from` towards `to` with a unit direction, plus the distance
    /// between the two points. Returns `None` when the points coincide.
    pub fn between(from: Vec3, to: Vec3) -> Option<(Self, f32)> {
        let offset = to - from;
        let distance = offset.length();
        let direction = offset.try_normalize()?;
        Some((Self::new(from, direction), distance))
    }

    /// Returns origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_between() {
        let (ray, distance) = Ray::between(Vec3::ONE, Vec3::new(1.0, 1.0, 4.0)).unwrap();
        assert_eq!(ray.direction, Vec3::Z);
        assert_eq!(distance, 3.0);
        assert_eq!(ray.at(distance), Vec3::new(1.0, 1.0, 4.0));
    }

    #[test]
    fn test_ray_between_same_point() {
        assert!(Ray::between(Vec3::ONE, Vec3::ONE).is_none());
    }
}
