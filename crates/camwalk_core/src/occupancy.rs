//! Point occupancy queries.

use camwalk_math::{Aabb, Vec3};
use serde::{Deserialize, Serialize};

/// State of the space around a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occupancy {
    /// Observed empty; the camera may be placed here.
    Free,
    /// Contains scene geometry.
    Occupied,
    /// Never observed, or outside the mapped region.
    Unknown,
}

impl Occupancy {
    pub fn is_free(self) -> bool {
        self == Occupancy::Free
    }
}

/// Read-only occupancy query contract consumed by the planner.
///
/// Implementations must be safe to share across threads; several planners
/// may query the same map concurrently.
pub trait OccupancyMap: Send + Sync {
    /// Occupancy at `p`. Non-finite points are `Unknown`.
    fn query(&self, p: Vec3) -> Occupancy;

    /// Box inside which free-space queries are meaningful.
    fn free_space_bounds(&self) -> Aabb;

    /// Query many points at once, preserving order.
    fn query_batch(&self, points: &[Vec3]) -> Vec<Occupancy> {
        points.iter().map(|&p| self.query(p)).collect()
    }
}

impl<T: OccupancyMap + ?Sized> OccupancyMap for &T {
    fn query(&self, p: Vec3) -> Occupancy {
        (**self).query(p)
    }

    fn free_space_bounds(&self) -> Aabb {
        (**self).free_space_bounds()
    }

    fn query_batch(&self, points: &[Vec3]) -> Vec<Occupancy> {
        (**self).query_batch(points)
    }
}
