use crate::{Interval, Ray, Vec3};

/// Directions with an axis component at or below this magnitude are treated
/// as parallel to that axis' slabs when clipping.
const SLAB_PARALLEL_EPSILON: f32 = 1e-6;

/// Axis-aligned bounding box, one `Interval` per axis.
///
/// Used both as the BVH node volume and as the free-space extent of an
/// occupancy map.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        Self { x, y, z }
    }

    /// Exact box spanning two corner points (in any order).
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self {
            x: Interval::new(min.x, max.x),
            y: Interval::new(min.y, max.y),
            z: Interval::new(min.z, max.z),
        }
    }

    /// Box spanning two corners, padded so that no axis has zero width.
    ///
    /// Flat triangles (e.g. a ground plane) would otherwise produce boxes the
    /// slab test can never enter.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let mut aabb = Self::from_corners(a, b);
        aabb.pad_to_minimums();
        aabb
    }

    /// Tight box around a set of points, `EMPTY` if there are none.
    pub fn enclosing<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        points
            .into_iter()
            .fold(Self::EMPTY, |acc, p| acc.grow(*p))
    }

    /// Smallest box containing `self` and `p`.
    pub fn grow(&self, p: Vec3) -> Self {
        Self {
            x: Interval::new(self.x.min.min(p.x), self.x.max.max(p.x)),
            y: Interval::new(self.y.min.min(p.y), self.y.max.max(p.y)),
            z: Interval::new(self.z.min.min(p.z), self.z.max.max(p.z)),
        }
    }

    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    /// Inclusive point containment test.
    pub fn contains_point(&self, p: Vec3) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.contains(p.z)
    }

    /// Length of the box diagonal.
    pub fn diagonal(&self) -> f32 {
        (self.max() - self.min()).length()
    }

    /// Test if a ray intersects this box within the given interval.
    ///
    /// Uses the slab method.
    pub fn hit(&self, r: &Ray, mut ray_t: Interval) -> bool {
        for axis in 0..3 {
            let slab = self.axis_interval(axis);
            let adinv = 1.0 / r.direction[axis];
            let mut t0 = (slab.min - r.origin[axis]) * adinv;
            let mut t1 = (slab.max - r.origin[axis]) * adinv;
            if adinv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            ray_t.min = t0.max(ray_t.min);
            ray_t.max = t1.min(ray_t.max);
            if ray_t.max <= ray_t.min {
                return false;
            }
        }
        true
    }

    /// Parametric range over which the ray lies inside the box.
    ///
    /// Axes whose direction component is near zero are skipped rather than
    /// tested, so a ray running parallel to a slab is never clipped by it.
    /// The result is not clamped to `t >= 0` and is empty if the ray's line
    /// misses the box.
    pub fn clip(&self, r: &Ray) -> Interval {
        let mut ray_t = Interval::UNIVERSE;
        for axis in 0..3 {
            let d = r.direction[axis];
            if d.abs() <= SLAB_PARALLEL_EPSILON {
                continue;
            }
            let slab = self.axis_interval(axis);
            let t0 = (slab.min - r.origin[axis]) / d;
            let t1 = (slab.max - r.origin[axis]) / d;
            ray_t = ray_t.intersect(&Interval::new(t0.min(t1), t0.max(t1)));
        }
        ray_t
    }

    fn pad_to_minimums(&mut self) {
        let delta = 0.0001;
        if self.x.size() < delta {
            self.x = self.x.expand(delta);
        }
        if self.y.size() < delta {
            self.y = self.y.expand(delta);
        }
        if self.z.size() < delta {
            self.z = self.z.expand(delta);
        }
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let x_size = self.x.size();
        let y_size = self.y.size();
        let z_size = self.z.size();

        if x_size > y_size && x_size > z_size {
            0
        } else if y_size > z_size {
            1
        } else {
            2
        }
    }

    pub fn centroid(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };

    pub const UNIVERSE: Aabb = Aabb {
        x: Interval::UNIVERSE,
        y: Interval::UNIVERSE,
        z: Interval::UNIVERSE,
    };
}
