//! Step 0: finding the first look-at point.
//!
//! The start pose only fixes where the camera is and how it is turned. The
//! walk also needs a point it is looking at, and that point has to lie in
//! free space so the look-at pool of step 1 can be proposed around it.

use camwalk_core::OccupancyMap;
use camwalk_math::{Mat3, PixelRays, Ray, Vec3};
use camwalk_tracer::RayIntersector;

use crate::config::WalkConfig;
use crate::error::{PlanError, PlanResult};

/// Look-at distance along a ray: pulled back from the reach by the safety
/// margin, but never closer than `min_distance`.
fn pulled_back(reach: f32, margin: f32, min_distance: f32) -> f32 {
    (reach - margin).max(min_distance)
}

/// Search for the initial look-at point of a walk starting at `look_from`.
///
/// First try the center ray. If the point in front of the first hit is not
/// free, shoot the full pixel bundle, clip every ray to the free-space bounds
/// and pick the free sample nearest the image center, advancing the camera a
/// little along its view direction between attempts.
pub(crate) fn find_initial_look_at<I, M>(
    intersector: &I,
    occupancy: &M,
    rays: &PixelRays,
    config: &WalkConfig,
    look_from: Vec3,
    orientation: &Mat3,
) -> PlanResult<Vec3>
where
    I: RayIntersector + ?Sized,
    M: OccupancyMap + ?Sized,
{
    let forward = (-orientation.z_axis).normalize();
    let margin = config.look_at_margin();

    let center = intersector.intersect_one(look_from, forward)?;
    let t = pulled_back(center.distance, margin, config.min_look_at_distance);
    if t.is_finite() {
        let candidate = look_from + forward * t;
        if occupancy.query(candidate).is_free() {
            log::debug!("Initial look-at from the center ray at distance {:.4}", t);
            return Ok(candidate);
        }
    }

    let directions: Vec<Vec3> = rays
        .to_world(orientation)
        .into_iter()
        .map(|d| d.normalize_or_zero())
        .collect();
    let free_bounds = occupancy.free_space_bounds();

    for attempt in 0..config.perturb_attempts {
        let origin = look_from + forward * (attempt as f32 * config.perturb_step());
        let origins = vec![origin; directions.len()];
        let hits = intersector.intersect(&origins, &directions)?;
        if hits.hit_count() == 0 {
            return Err(PlanError::NoVisibleGeometry);
        }

        let samples: Vec<Option<Vec3>> = directions
            .iter()
            .zip(&hits.distances)
            .map(|(&dir, &hit)| {
                let clip = free_bounds.clip(&Ray::new(origin, dir));
                let exit = if clip.is_empty() { f32::INFINITY } else { clip.max };
                let t = pulled_back(hit.min(exit), margin, config.min_look_at_distance);
                t.is_finite().then(|| origin + dir * t)
            })
            .collect();
        let states = occupancy.query_batch(&samples.iter().map(|s| s.unwrap_or(Vec3::NAN)).collect::<Vec<_>>());

        if let Some(pixel) = rays.closest_to_center(|i| states[i].is_free()) {
            // Sampled from the advanced origin; the point is known to be free.
            if let Some(point) = samples[pixel] {
                log::debug!(
                    "Initial look-at from pixel {} after {} camera advance(s)",
                    pixel,
                    attempt
                );
                return Ok(point);
            }
        }
    }

    Err(PlanError::NoFreeInitialLookAt {
        attempts: config.perturb_attempts,
    })
}
