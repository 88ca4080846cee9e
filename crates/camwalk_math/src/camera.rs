//! Camera frames and pinhole pixel rays.
//!
//! Convention: camera +x points right, +y points up and +z points away from
//! where the camera is looking. An orientation matrix is world-from-camera
//! with columns `[right, up, backward]`.

use glam::{Mat3, Vec3};

/// Orthonormal camera basis expressed in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub right: Vec3,
    pub up: Vec3,
    pub backward: Vec3,
}

impl CameraFrame {
    /// Builds the frame looking from `look_from` towards `look_at`.
    ///
    /// Returns `None` when the two points coincide or `up_hint` is parallel
    /// to the viewing direction (or zero), so no NaN ever escapes.
    pub fn look_at(look_from: Vec3, look_at: Vec3, up_hint: Vec3) -> Option<Self> {
        let backward = (look_from - look_at).try_normalize()?;
        let right = -backward.cross(up_hint).try_normalize()?;
        let up = backward.cross(right).try_normalize()?;
        Some(Self { right, up, backward })
    }

    /// Like [`CameraFrame::look_at`], but falls back to `fallback_up` and then
    /// to an arbitrary vector orthogonal to the view direction when the hint
    /// is degenerate. Only fails when `look_from == look_at`.
    pub fn look_at_or_fallback(
        look_from: Vec3,
        look_at: Vec3,
        up_hint: Vec3,
        fallback_up: Vec3,
    ) -> Option<Self> {
        Self::look_at(look_from, look_at, up_hint)
            .or_else(|| Self::look_at(look_from, look_at, fallback_up))
            .or_else(|| {
                let backward = (look_from - look_at).try_normalize()?;
                Self::look_at(look_from, look_at, backward.any_orthonormal_vector())
            })
    }

    pub fn from_mat3(m: &Mat3) -> Self {
        Self {
            right: m.x_axis,
            up: m.y_axis,
            backward: m.z_axis,
        }
    }

    /// World-from-camera rotation with columns `[right, up, backward]`.
    pub fn to_mat3(&self) -> Mat3 {
        Mat3::from_cols(self.right, self.up, self.backward)
    }

    /// Direction the camera looks along (`-backward`).
    pub fn forward(&self) -> Vec3 {
        -self.backward
    }

    /// True if the axes are unit length, pairwise orthogonal and
    /// right-handed, each to within `tolerance`.
    pub fn is_orthonormal(&self, tolerance: f32) -> bool {
        let unit = |v: Vec3| (v.length() - 1.0).abs() <= tolerance;
        unit(self.right)
            && unit(self.up)
            && unit(self.backward)
            && self.right.dot(self.up).abs() <= tolerance
            && self.right.dot(self.backward).abs() <= tolerance
            && self.up.dot(self.backward).abs() <= tolerance
            && (self.right.cross(self.up) - self.backward).length() <= tolerance
    }
}

/// Camera-space pinhole ray bundle for one image resolution and field of view.
///
/// Pixels are stored row-major with row 0 at the top of the image. All rays
/// share the optical center, so no per-pixel origin offsets are kept.
#[derive(Debug, Clone)]
pub struct PixelRays {
    pub width: u32,
    pub height: u32,
    pub fov_x: f32,
    /// Unnormalized camera-space directions, z = -1.
    pub directions: Vec<Vec3>,
    /// Euclidean distance in pixels from each pixel center to the exact
    /// image center.
    pub center_distances: Vec<f32>,
}

impl PixelRays {
    pub fn new(width: u32, height: u32, fov_x: f32) -> Self {
        let fov_y = Self::vertical_fov(width, height, fov_x);
        let tan_half_x = (fov_x * 0.5).tan();
        let tan_half_y = (fov_y * 0.5).tan();

        let count = width as usize * height as usize;
        let mut directions = Vec::with_capacity(count);
        let mut center_distances = Vec::with_capacity(count);

        let (w, h) = (width as f32, height as f32);
        for row in 0..height {
            // Flip v so that row 0 is the top of the image.
            let v = 1.0 - (2.0 * row as f32 + 1.0) / h;
            let dy = row as f32 + 0.5 - h * 0.5;
            for col in 0..width {
                let u = -1.0 + (2.0 * col as f32 + 1.0) / w;
                let dx = col as f32 + 0.5 - w * 0.5;
                directions.push(Vec3::new(u * tan_half_x, v * tan_half_y, -1.0));
                center_distances.push((dx * dx + dy * dy).sqrt());
            }
        }

        Self {
            width,
            height,
            fov_x,
            directions,
            center_distances,
        }
    }

    /// `fov_y = 2 atan(height tan(fov_x / 2) / width)`
    pub fn vertical_fov(width: u32, height: u32, fov_x: f32) -> f32 {
        2.0 * (height as f32 * (fov_x * 0.5).tan() / width as f32).atan()
    }

    pub fn fov_y(&self) -> f32 {
        Self::vertical_fov(self.width, self.height, self.fov_x)
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    /// Index of the pixel nearest the image center (first in scan order on
    /// ties).
    pub fn center_index(&self) -> Option<usize> {
        self.closest_to_center(|_| true)
    }

    /// Among pixels accepted by `keep`, the one nearest the image center.
    /// Ties resolve to the first pixel in scan order.
    pub fn closest_to_center(&self, mut keep: impl FnMut(usize) -> bool) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &d) in self.center_distances.iter().enumerate() {
            if !keep(i) {
                continue;
            }
            match best {
                Some((_, best_d)) if best_d <= d => {}
                _ => best = Some((i, d)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Rotates the bundle into world space.
    pub fn to_world(&self, orientation: &Mat3) -> Vec<Vec3> {
        self.directions.iter().map(|d| *orientation * *d).collect()
    }

    /// Appends the world-space bundle to existing buffers.
    pub fn extend_world(&self, orientation: &Mat3, origin: Vec3, origins: &mut Vec<Vec3>, directions: &mut Vec<Vec3>) {
        origins.extend(std::iter::repeat(origin).take(self.len()));
        directions.extend(self.directions.iter().map(|d| *orientation * *d));
    }
}
