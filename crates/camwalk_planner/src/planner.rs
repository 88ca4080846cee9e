//! The random walk itself.
//!
//! Frame 0 is the caller's start pose aimed at a free look-at point (see
//! `initial`). Every later frame draws a pool of look-from and look-at points
//! around the previous ones, pairs them up into pose candidates and keeps one
//! with probability proportional to how much geometry it sees.

use camwalk_core::{CameraPose, OccupancyMap, Trajectory};
use camwalk_math::{CameraFrame, Mat3, PixelRays, Vec3};
use camwalk_tracer::RayIntersector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::candidates::build_pool;
use crate::config::WalkConfig;
use crate::error::{CandidatePool, PlanError, PlanResult};
use crate::initial::find_initial_look_at;
use crate::sampling::{choose_with_replacement, perturbed_up_hint};
use crate::view::{pose_visibility, PoseCandidate, ScoredViews};

const START_ORIENTATION_TOLERANCE: f32 = 1e-3;

/// Where a walk begins. The look-at point is derived from the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartPose {
    pub look_from: Vec3,
    /// World-from-camera rotation, columns right, up, backward.
    pub orientation: Mat3,
}

impl StartPose {
    pub fn new(look_from: Vec3, orientation: Mat3) -> Self {
        Self {
            look_from,
            orientation,
        }
    }

    fn validate(&self) -> PlanResult<()> {
        if !self.look_from.is_finite() {
            return Err(PlanError::InvalidStartPose("camera position is not finite"));
        }
        if !CameraFrame::from_mat3(&self.orientation).is_orthonormal(START_ORIENTATION_TOLERANCE) {
            return Err(PlanError::InvalidStartPose(
                "orientation is not a right-handed orthonormal basis",
            ));
        }
        Ok(())
    }
}

/// Plans camera trajectories against one scene.
///
/// The planner only borrows the intersector and the occupancy map, so one
/// scene can serve many planners on different threads.
pub struct RandomWalkPlanner<'a, I: ?Sized, M: ?Sized> {
    intersector: &'a I,
    occupancy: &'a M,
    config: WalkConfig,
    rays: PixelRays,
}

impl<'a, I, M> RandomWalkPlanner<'a, I, M>
where
    I: RayIntersector + ?Sized,
    M: OccupancyMap + ?Sized,
{
    pub fn new(intersector: &'a I, occupancy: &'a M, config: WalkConfig) -> PlanResult<Self> {
        config.validate()?;
        let rays = PixelRays::new(config.image.width, config.image.height, config.image.fov_x);
        Ok(Self {
            intersector,
            occupancy,
            config,
            rays,
        })
    }

    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    /// Plan one trajectory with a generator seeded from `config.seed`.
    pub fn plan(&self, start: StartPose) -> PlanResult<Trajectory> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.plan_with_rng(start, &mut rng)
    }

    /// Plan one trajectory drawing from `rng`.
    ///
    /// Any failure abandons the whole trajectory; nothing partial is returned.
    pub fn plan_with_rng<R: Rng + ?Sized>(&self, start: StartPose, rng: &mut R) -> PlanResult<Trajectory> {
        let result = self.walk(start, rng);
        match &result {
            Ok(trajectory) => log::info!(
                "Planned {} poses from {:?}",
                trajectory.len(),
                start.look_from
            ),
            Err(e) => log::warn!("Abandoning trajectory from {:?}: {}", start.look_from, e),
        }
        result
    }

    fn walk<R: Rng + ?Sized>(&self, start: StartPose, rng: &mut R) -> PlanResult<Trajectory> {
        start.validate()?;
        let config = &self.config;

        let start_look_at = find_initial_look_at(
            self.intersector,
            self.occupancy,
            &self.rays,
            config,
            start.look_from,
            &start.orientation,
        )?;
        let visibility = pose_visibility(
            self.intersector,
            &self.rays,
            start.look_from,
            &start.orientation,
            config.view_score_bias,
            config.keep_view_images,
        )?;

        let mut trajectory = Trajectory::with_capacity(config.num_samples);
        trajectory.push(
            CameraPose::new(start.look_from, start_look_at, start.orientation),
            visibility,
        );

        let mut look_from = start.look_from;
        let mut look_at = start_look_at;
        for step in 1..config.num_samples {
            let from_pool = build_pool(
                rng,
                self.intersector,
                self.occupancy,
                config,
                look_from,
                start.look_from,
                CandidatePool::LookFrom,
                step,
            )?;
            let at_pool = build_pool(
                rng,
                self.intersector,
                self.occupancy,
                config,
                look_at,
                start_look_at,
                CandidatePool::LookAt,
                step,
            )?;

            let from_picks = choose_with_replacement(rng, from_pool.len(), config.num_pose_candidates);
            let at_picks = choose_with_replacement(rng, at_pool.len(), config.num_pose_candidates);
            let up_hint = perturbed_up_hint(rng, config.up_hint_nominal, config.up_hint_std_dev);

            let candidates: Vec<PoseCandidate> = from_picks
                .iter()
                .zip(&at_picks)
                .map(|(&f, &a)| PoseCandidate::new(from_pool[f], at_pool[a], up_hint, config.up_hint_nominal))
                .collect();

            let views = ScoredViews::evaluate(self.intersector, &self.rays, candidates, config.view_score_bias)?;
            let eligible = views.eligible_count();
            if eligible == 0 {
                return Err(PlanError::DegenerateCandidates { step });
            }
            let chosen = views.select(rng).ok_or(PlanError::DegenerateCandidates { step })?;
            let orientation = views
                .orientation(chosen)
                .ok_or(PlanError::DegenerateCandidates { step })?;
            let candidate = views.candidates[chosen];
            let visibility = views.visibility(chosen, config.keep_view_images);

            log::debug!(
                "Step {}: picked candidate {} of {} ({} eligible, score {:.3}, {} primitives)",
                step,
                chosen,
                views.candidates.len(),
                eligible,
                visibility.view_score,
                visibility.num_unique_primitives
            );

            trajectory.push(
                CameraPose::new(candidate.look_from, candidate.look_at, orientation),
                visibility,
            );
            look_from = candidate.look_from;
            look_at = candidate.look_at;
        }

        Ok(trajectory)
    }
}
