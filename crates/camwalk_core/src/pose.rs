//! Camera poses and the trajectories built from them.

use camwalk_math::{CameraFrame, Mat3, Vec3};
use serde::{Deserialize, Serialize};

/// A camera placement: eye, aim point and world-from-camera rotation
/// (columns right, up, backward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub look_from: Vec3,
    pub look_at: Vec3,
    pub orientation: Mat3,
}

impl CameraPose {
    pub fn new(look_from: Vec3, look_at: Vec3, orientation: Mat3) -> Self {
        Self {
            look_from,
            look_at,
            orientation,
        }
    }

    pub fn frame(&self) -> CameraFrame {
        CameraFrame::from_mat3(&self.orientation)
    }

    /// True if `look_at - look_from` points along `-backward` to within
    /// `tolerance` (as a sine of the angle between them).
    pub fn is_aimed(&self, tolerance: f32) -> bool {
        match (self.look_at - self.look_from).try_normalize() {
            Some(dir) => dir.cross(-self.orientation.z_axis).length() <= tolerance
                && dir.dot(-self.orientation.z_axis) > 0.0,
            None => false,
        }
    }
}

/// What a frame's camera sees, measured from its full pixel ray bundle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameVisibility {
    /// Fraction of pixels whose ray hits geometry.
    pub valid_fraction: f32,
    /// Number of distinct primitives hit across the image.
    pub num_unique_primitives: usize,
    /// Score the frame was selected with.
    pub view_score: f32,
    /// Per-pixel hit distances, row-major, row 0 at the top. Only kept on
    /// request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distances: Option<Vec<f32>>,
    /// Per-pixel primitive ids (-1 on miss), same layout as `distances`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive_ids: Option<Vec<i32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryFrame {
    pub pose: CameraPose,
    pub visibility: FrameVisibility,
}

/// Ordered camera poses produced by one walk. Frame 0 is the start pose.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trajectory {
    pub frames: Vec<TrajectoryFrame>,
}

impl Trajectory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, pose: CameraPose, visibility: FrameVisibility) {
        self.frames.push(TrajectoryFrame { pose, visibility });
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn poses(&self) -> impl Iterator<Item = &CameraPose> + '_ {
        self.frames.iter().map(|f| &f.pose)
    }

    pub fn look_from_positions(&self) -> Vec<Vec3> {
        self.poses().map(|p| p.look_from).collect()
    }

    pub fn look_at_positions(&self) -> Vec<Vec3> {
        self.poses().map(|p| p.look_at).collect()
    }

    pub fn orientations(&self) -> Vec<Mat3> {
        self.poses().map(|p| p.orientation).collect()
    }
}
