//! Candidate point pools.
//!
//! Each walk step proposes points around the current look-from and look-at
//! points and keeps only those that pass, in order: the box around the
//! walk's start point, the occupancy map, and a line-of-sight check from the
//! current point. A stage that rejects everything ends the walk.

use camwalk_core::OccupancyMap;
use camwalk_math::{Aabb, Interval, Vec3};
use camwalk_tracer::RayIntersector;
use rand::Rng;

use crate::config::WalkConfig;
use crate::error::{CandidatePool, FilterStage, PlanError, PlanResult};
use crate::sampling::propose_points;

/// Box `start ± half_extent`; infinite half extents leave an axis unbounded.
pub fn start_bounds(start: Vec3, half_extent: Vec3) -> Aabb {
    Aabb::new(
        Interval::centered(start.x, half_extent.x),
        Interval::centered(start.y, half_extent.y),
        Interval::centered(start.z, half_extent.z),
    )
}

/// Keep points inside `bounds` (inclusive).
pub fn filter_in_bounds(points: Vec<Vec3>, bounds: &Aabb) -> Vec<Vec3> {
    points
        .into_iter()
        .filter(|&p| bounds.contains_point(p))
        .collect()
}

/// Keep points the map reports as free.
pub fn filter_free<M: OccupancyMap + ?Sized>(points: Vec<Vec3>, occupancy: &M) -> Vec<Vec3> {
    let states = occupancy.query_batch(&points);
    points
        .into_iter()
        .zip(states)
        .filter(|(_, state)| state.is_free())
        .map(|(p, _)| p)
        .collect()
}

/// Keep points reachable from `from` without hitting geometry: the hit
/// distance towards the point, shortened by `margin`, must not be less than
/// the distance to the point.
pub fn filter_line_of_sight<I: RayIntersector + ?Sized>(
    points: Vec<Vec3>,
    from: Vec3,
    intersector: &I,
    margin: f32,
) -> PlanResult<Vec<Vec3>> {
    if points.is_empty() {
        return Ok(points);
    }
    let origins = vec![from; points.len()];
    let directions: Vec<Vec3> = points.iter().map(|&p| p - from).collect();
    let hits = intersector.intersect(&origins, &directions)?;

    Ok(points
        .into_iter()
        .zip(hits.distances)
        .filter(|&(p, hit)| (1.0 - margin) * hit >= p.distance(from))
        .map(|(p, _)| p)
        .collect())
}

/// Run the full propose, bound, occupancy, line-of-sight chain for one pool.
#[allow(clippy::too_many_arguments)]
pub fn build_pool<R, I, M>(
    rng: &mut R,
    intersector: &I,
    occupancy: &M,
    config: &WalkConfig,
    current: Vec3,
    start: Vec3,
    pool: CandidatePool,
    step: usize,
) -> PlanResult<Vec<Vec3>>
where
    R: Rng + ?Sized,
    I: RayIntersector + ?Sized,
    M: OccupancyMap + ?Sized,
{
    let empty = |stage| PlanError::EmptyCandidatePool { step, pool, stage };

    let proposals = propose_points(
        rng,
        current,
        config.query_half_extent_relative_to_current,
        config.num_octomap_query_samples,
    );

    let bounds = start_bounds(start, config.query_half_extent_relative_to_start);
    let bounded = filter_in_bounds(proposals, &bounds);
    if bounded.is_empty() {
        return Err(empty(FilterStage::Bound));
    }

    let free = filter_free(bounded, occupancy);
    if free.is_empty() {
        return Err(empty(FilterStage::Occupancy));
    }
    let free_count = free.len();

    let visible = filter_line_of_sight(free, current, intersector, config.line_of_sight_margin)?;
    if visible.is_empty() {
        return Err(empty(FilterStage::LineOfSight));
    }

    log::debug!(
        "Step {}: {} pool {} -> {} free -> {} visible",
        step,
        pool,
        config.num_octomap_query_samples,
        free_count,
        visible.len()
    );
    Ok(visible)
}
