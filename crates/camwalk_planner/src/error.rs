//! Reasons a walk gives up.
//!
//! Every variant ends the current trajectory only. Nothing is retried and
//! no partial trajectory is returned; the caller decides whether to skip the
//! camera or try another start pose.

use std::fmt;

use camwalk_tracer::IntersectError;
use thiserror::Error;

use crate::config::ConfigError;

/// Which point a candidate pool proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidatePool {
    LookFrom,
    LookAt,
}

impl fmt::Display for CandidatePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidatePool::LookFrom => write!(f, "look-from"),
            CandidatePool::LookAt => write!(f, "look-at"),
        }
    }
}

/// Filter stage that rejected every candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStage {
    /// Outside the box around the start point.
    Bound,
    /// Not free in the occupancy map.
    Occupancy,
    /// Blocked by geometry.
    LineOfSight,
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterStage::Bound => write!(f, "start bounds"),
            FilterStage::Occupancy => write!(f, "occupancy"),
            FilterStage::LineOfSight => write!(f, "line of sight"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("Start pose is not usable: {0}")]
    InvalidStartPose(&'static str),

    #[error("Camera does not observe any part of the scene: every ray misses")]
    NoVisibleGeometry,

    #[error("No free initial look-at point after {attempts} attempts: every sample is unknown or occupied")]
    NoFreeInitialLookAt { attempts: usize },

    #[error("Step {step}: no {pool} candidate survived the {stage} filter")]
    EmptyCandidatePool {
        step: usize,
        pool: CandidatePool,
        stage: FilterStage,
    },

    #[error("Step {step}: every pose candidate has coincident look-from and look-at points")]
    DegenerateCandidates { step: usize },

    #[error("Ray intersector failure: {0}")]
    Intersector(#[from] IntersectError),

    #[error("Invalid walk configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

pub type PlanResult<T> = Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PlanError::EmptyCandidatePool {
            step: 3,
            pool: CandidatePool::LookAt,
            stage: FilterStage::LineOfSight,
        };
        assert_eq!(
            err.to_string(),
            "Step 3: no look-at candidate survived the line of sight filter"
        );

        let err: PlanError = IntersectError::Backend("device lost".into()).into();
        assert_eq!(
            err.to_string(),
            "Ray intersector failure: Intersection backend error: device lost"
        );
    }
}
