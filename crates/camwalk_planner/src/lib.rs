//! camwalk planner - random-walk camera trajectories.
//!
//! Given a mesh (through a [`RayIntersector`](camwalk_tracer::RayIntersector)),
//! an occupancy map of observed free space and a starting camera pose, the
//! [`RandomWalkPlanner`] produces a [`Trajectory`](camwalk_core::Trajectory)
//! that stays in free space, keeps line of sight between consecutive poses
//! and favours views that see a lot of geometry.
//!
//! The [`SpaceCarver`] builds the occupancy map the planner consumes by
//! casting rays from known-free camera positions.
//!
//! # Example
//!
//! ```ignore
//! use camwalk_planner::{RandomWalkPlanner, StartPose, WalkConfig};
//!
//! let planner = RandomWalkPlanner::new(&intersector, &occupancy, WalkConfig::default())?;
//! let trajectory = planner.plan(StartPose::new(position, orientation))?;
//! ```

pub mod candidates;
pub mod carve;
pub mod config;
pub mod error;
mod initial;
pub mod planner;
pub mod sampling;
pub mod view;

pub use carve::{CarveConfig, CarveError, SpaceCarver};
pub use config::{ConfigError, ImageConfig, WalkConfig};
pub use error::{CandidatePool, FilterStage, PlanError, PlanResult};
pub use planner::{RandomWalkPlanner, StartPose};
