//! Pose candidates and view scoring.
//!
//! A candidate's view score is `valid_fraction^2 * unique_primitives + bias`,
//! where `valid_fraction` is the share of pixels that hit geometry and
//! `unique_primitives` the number of distinct triangles seen. One candidate
//! is then drawn with probability proportional to its score.

use std::collections::HashSet;

use camwalk_core::FrameVisibility;
use camwalk_math::{CameraFrame, Mat3, PixelRays, Vec3};
use camwalk_tracer::{IntersectError, IntersectionBatch, RayIntersector};
use rand::Rng;

use crate::sampling::weighted_index;

/// A look-from / look-at pair and the frame built from it.
#[derive(Debug, Clone, Copy)]
pub struct PoseCandidate {
    pub look_from: Vec3,
    pub look_at: Vec3,
    /// `None` if look-from and look-at coincide; such candidates are never
    /// selected.
    pub frame: Option<CameraFrame>,
}

impl PoseCandidate {
    pub fn new(look_from: Vec3, look_at: Vec3, up_hint: Vec3, fallback_up: Vec3) -> Self {
        Self {
            look_from,
            look_at,
            frame: CameraFrame::look_at_or_fallback(look_from, look_at, up_hint, fallback_up),
        }
    }
}

/// Visibility statistics of one rendered view.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewStats {
    pub valid_fraction: f32,
    pub num_unique_primitives: usize,
    pub score: f32,
}

impl ViewStats {
    /// Statistics of one view's per-pixel primitive ids (-1 on miss).
    pub fn from_primitive_ids(primitive_ids: &[i32], bias: f32) -> Self {
        if primitive_ids.is_empty() {
            return Self::default();
        }
        let hits = primitive_ids.iter().filter(|&&id| id >= 0).count();
        let unique: HashSet<i32> = primitive_ids.iter().copied().filter(|&id| id >= 0).collect();
        let valid_fraction = hits as f32 / primitive_ids.len() as f32;
        Self {
            valid_fraction,
            num_unique_primitives: unique.len(),
            score: view_score(valid_fraction, unique.len(), bias),
        }
    }
}

pub fn view_score(valid_fraction: f32, num_unique_primitives: usize, bias: f32) -> f32 {
    valid_fraction * valid_fraction * num_unique_primitives as f32 + bias
}

/// Scored candidates of one step, backed by a single ray batch.
#[derive(Debug)]
pub struct ScoredViews {
    pub candidates: Vec<PoseCandidate>,
    /// Per candidate; excluded candidates have `None`.
    pub stats: Vec<Option<ViewStats>>,
    /// Slot of each candidate's image in `batch`.
    slots: Vec<Option<usize>>,
    batch: IntersectionBatch,
    pixels_per_view: usize,
}

impl ScoredViews {
    /// Cast every eligible candidate's pixel bundle in one batch and score
    /// them.
    pub fn evaluate<I: RayIntersector + ?Sized>(
        intersector: &I,
        rays: &PixelRays,
        candidates: Vec<PoseCandidate>,
        bias: f32,
    ) -> Result<Self, IntersectError> {
        let pixels_per_view = rays.len();
        let eligible = candidates.iter().filter(|c| c.frame.is_some()).count();
        let mut origins = Vec::with_capacity(eligible * pixels_per_view);
        let mut directions = Vec::with_capacity(eligible * pixels_per_view);

        let mut slots = Vec::with_capacity(candidates.len());
        let mut next_slot = 0;
        for candidate in &candidates {
            match candidate.frame {
                Some(frame) => {
                    rays.extend_world(&frame.to_mat3(), candidate.look_from, &mut origins, &mut directions);
                    slots.push(Some(next_slot));
                    next_slot += 1;
                }
                None => slots.push(None),
            }
        }

        let batch = intersector.intersect(&origins, &directions)?;
        let stats = slots
            .iter()
            .map(|slot| {
                slot.map(|s| {
                    let ids = &batch.primitive_ids[s * pixels_per_view..(s + 1) * pixels_per_view];
                    ViewStats::from_primitive_ids(ids, bias)
                })
            })
            .collect();

        Ok(Self {
            candidates,
            stats,
            slots,
            batch,
            pixels_per_view,
        })
    }

    pub fn eligible_count(&self) -> usize {
        self.stats.iter().filter(|s| s.is_some()).count()
    }

    /// Draw a candidate with probability proportional to its score. If no
    /// eligible candidate has a positive score, draw uniformly among the
    /// eligible ones. `None` only if nothing is eligible.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        let weights: Vec<f32> = self
            .stats
            .iter()
            .map(|s| s.map_or(0.0, |s| s.score))
            .collect();
        if let Some(index) = weighted_index(rng, &weights) {
            return Some(index);
        }

        let eligible: Vec<usize> = (0..self.stats.len())
            .filter(|&i| self.stats[i].is_some())
            .collect();
        if eligible.is_empty() {
            return None;
        }
        Some(eligible[rng.gen_range(0..eligible.len())])
    }

    /// Orientation of candidate `index`, if it is eligible.
    pub fn orientation(&self, index: usize) -> Option<Mat3> {
        self.candidates.get(index)?.frame.map(|f| f.to_mat3())
    }

    /// Diagnostics for candidate `index`, optionally with its per-pixel images.
    pub fn visibility(&self, index: usize, keep_images: bool) -> FrameVisibility {
        let stats = self.stats.get(index).copied().flatten().unwrap_or_default();
        let mut visibility = FrameVisibility {
            valid_fraction: stats.valid_fraction,
            num_unique_primitives: stats.num_unique_primitives,
            view_score: stats.score,
            ..Default::default()
        };
        if keep_images {
            if let Some(Some(slot)) = self.slots.get(index) {
                let range = slot * self.pixels_per_view..(slot + 1) * self.pixels_per_view;
                visibility.distances = Some(self.batch.distances[range.clone()].to_vec());
                visibility.primitive_ids = Some(self.batch.primitive_ids[range].to_vec());
            }
        }
        visibility
    }
}

/// Visibility of a single pose, used for the start frame.
pub fn pose_visibility<I: RayIntersector + ?Sized>(
    intersector: &I,
    rays: &PixelRays,
    look_from: Vec3,
    orientation: &Mat3,
    bias: f32,
    keep_images: bool,
) -> Result<FrameVisibility, IntersectError> {
    let origins = vec![look_from; rays.len()];
    let batch = intersector.intersect(&origins, &rays.to_world(orientation))?;
    let stats = ViewStats::from_primitive_ids(&batch.primitive_ids, bias);
    let mut visibility = FrameVisibility {
        valid_fraction: stats.valid_fraction,
        num_unique_primitives: stats.num_unique_primitives,
        view_score: stats.score,
        ..Default::default()
    };
    if keep_images {
        visibility.distances = Some(batch.distances);
        visibility.primitive_ids = Some(batch.primitive_ids);
    }
    Ok(visibility)
}
