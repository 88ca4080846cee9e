//! Walk parameters.
//!
//! Distances are in asset units. The defaults are the metric values of a
//! scene modelled in meters; use [`WalkConfig::for_scene`] to rescale them.

use camwalk_math::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_3;
use thiserror::Error;

/// Invalid parameter combinations, caught before a walk starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be at least 1")]
    ZeroCount(&'static str),

    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f32 },

    #[error("{name} must be non-negative, got {value}")]
    Negative { name: &'static str, value: f32 },

    #[error("Horizontal field of view must be in (0, pi), got {0}")]
    FieldOfView(f32),

    #[error("Line of sight margin must be in [0, 1), got {0}")]
    LineOfSightMargin(f32),

    #[error("Up hint must be finite and non-zero, got {0:?}")]
    UpHint(Vec3),
}

/// Resolution and field of view of the rendered views used for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub width: u32,
    pub height: u32,
    /// Horizontal field of view in radians
    pub fov_x: f32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 192,
            fov_x: FRAC_PI_3,
        }
    }
}

impl ImageConfig {
    pub fn new(width: u32, height: u32, fov_x: f32) -> Self {
        Self {
            width,
            height,
            fov_x,
        }
    }
}

/// Parameters of one random walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    pub image: ImageConfig,
    /// Trajectory length, including the start pose.
    pub num_samples: usize,
    /// Points proposed per pool per step before filtering.
    pub num_octomap_query_samples: usize,
    /// Poses scored per step.
    pub num_pose_candidates: usize,
    /// Occupancy map resolution.
    pub voxel_size: f32,
    /// Per-axis half size of the box new points are proposed in.
    #[serde(with = "half_extent")]
    pub query_half_extent_relative_to_current: Vec3,
    /// Per-axis half size of the box the whole walk must stay in. Infinite
    /// axes are unbounded (JSON `null`).
    #[serde(with = "half_extent")]
    pub query_half_extent_relative_to_start: Vec3,
    pub up_hint_nominal: Vec3,
    pub up_hint_std_dev: f32,
    /// Fraction of the hit distance a candidate must stay short of.
    pub line_of_sight_margin: f32,
    /// Lower clamp of the initial look-at distance.
    pub min_look_at_distance: f32,
    /// Initial look-at points are pulled back from geometry by this many voxels.
    pub look_at_voxel_margin: f32,
    /// How many times the initial look-at search advances the camera.
    pub perturb_attempts: usize,
    /// Size of each advance, in voxels.
    pub perturb_step_voxels: f32,
    /// Constant added to every view score.
    pub view_score_bias: f32,
    pub seed: u64,
    /// Keep per-pixel distance and primitive id images for every frame.
    pub keep_view_images: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            image: ImageConfig::default(),
            num_samples: 100,
            num_octomap_query_samples: 1000,
            num_pose_candidates: 20,
            voxel_size: 0.1,
            query_half_extent_relative_to_current: Vec3::new(1.5, 1.5, 0.25),
            query_half_extent_relative_to_start: Vec3::new(f32::INFINITY, f32::INFINITY, 0.25),
            up_hint_nominal: Vec3::Z,
            up_hint_std_dev: 0.1,
            line_of_sight_margin: 0.01,
            min_look_at_distance: 0.0001,
            look_at_voxel_margin: 1.75,
            perturb_attempts: 8,
            perturb_step_voxels: 0.25,
            view_score_bias: 0.0,
            seed: 0,
            keep_view_images: false,
        }
    }
}

impl WalkConfig {
    /// Defaults rescaled for a scene measured in asset units, with the map
    /// resolution given in meters.
    pub fn for_scene(voxel_extent_meters: f32, meters_per_asset_unit: f32) -> Self {
        Self::default()
            .with_voxel_size(voxel_extent_meters)
            .in_asset_units(meters_per_asset_unit)
    }

    /// Rescale the metric lengths (voxel size and both half extents) into
    /// asset units. Lengths given in voxels are left alone.
    pub fn in_asset_units(&self, meters_per_asset_unit: f32) -> Self {
        let asset_units_per_meter = 1.0 / meters_per_asset_unit;
        Self {
            voxel_size: self.voxel_size * asset_units_per_meter,
            query_half_extent_relative_to_current: self.query_half_extent_relative_to_current
                * asset_units_per_meter,
            query_half_extent_relative_to_start: self.query_half_extent_relative_to_start
                * asset_units_per_meter,
            ..self.clone()
        }
    }

    pub fn with_image(mut self, width: u32, height: u32, fov_x: f32) -> Self {
        self.image = ImageConfig::new(width, height, fov_x);
        self
    }

    pub fn with_num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples;
        self
    }

    pub fn with_voxel_size(mut self, voxel_size: f32) -> Self {
        self.voxel_size = voxel_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Absolute safety margin between an initial look-at point and geometry.
    pub fn look_at_margin(&self) -> f32 {
        self.look_at_voxel_margin * self.voxel_size
    }

    /// Absolute camera advance per initial look-at attempt.
    pub fn perturb_step(&self) -> f32 {
        self.perturb_step_voxels * self.voxel_size
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, count) in [
            ("num_samples", self.num_samples),
            ("num_octomap_query_samples", self.num_octomap_query_samples),
            ("num_pose_candidates", self.num_pose_candidates),
            ("image.width", self.image.width as usize),
            ("image.height", self.image.height as usize),
        ] {
            if count == 0 {
                return Err(ConfigError::ZeroCount(name));
            }
        }

        if !(self.voxel_size > 0.0 && self.voxel_size.is_finite()) {
            return Err(ConfigError::NotPositive {
                name: "voxel_size",
                value: self.voxel_size,
            });
        }

        if !(self.image.fov_x > 0.0 && self.image.fov_x < std::f32::consts::PI) {
            return Err(ConfigError::FieldOfView(self.image.fov_x));
        }

        for (name, extent) in [
            ("query_half_extent_relative_to_current", self.query_half_extent_relative_to_current),
            ("query_half_extent_relative_to_start", self.query_half_extent_relative_to_start),
        ] {
            for value in extent.to_array() {
                if !(value >= 0.0) {
                    return Err(ConfigError::Negative { name, value });
                }
            }
        }
        // Proposals are drawn from this box, so it must be finite.
        for value in self.query_half_extent_relative_to_current.to_array() {
            if !value.is_finite() {
                return Err(ConfigError::NotPositive {
                    name: "query_half_extent_relative_to_current",
                    value,
                });
            }
        }

        for (name, value) in [
            ("up_hint_std_dev", self.up_hint_std_dev),
            ("min_look_at_distance", self.min_look_at_distance),
            ("look_at_voxel_margin", self.look_at_voxel_margin),
            ("perturb_step_voxels", self.perturb_step_voxels),
            ("view_score_bias", self.view_score_bias),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::Negative { name, value });
            }
        }

        if !(self.line_of_sight_margin >= 0.0 && self.line_of_sight_margin < 1.0) {
            return Err(ConfigError::LineOfSightMargin(self.line_of_sight_margin));
        }

        if !self.up_hint_nominal.is_finite() || self.up_hint_nominal.length_squared() == 0.0 {
            return Err(ConfigError::UpHint(self.up_hint_nominal));
        }

        Ok(())
    }
}

/// Serializes per-axis half extents, writing infinite axes as `null`.
mod half_extent {
    use camwalk_math::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Vec3, serializer: S) -> Result<S::Ok, S::Error> {
        let axes: [Option<f32>; 3] = v.to_array().map(|a| a.is_finite().then_some(a));
        axes.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec3, D::Error> {
        let axes = <[Option<f32>; 3]>::deserialize(deserializer)?;
        Ok(Vec3::from_array(axes.map(|a| a.unwrap_or(f32::INFINITY))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert_eq!(WalkConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_for_scene_scales_lengths() {
        // Scene modelled in centimeters with 5cm voxels.
        let config = WalkConfig::for_scene(0.05, 0.01);
        assert!((config.voxel_size - 5.0).abs() < 1e-4);
        assert!((config.query_half_extent_relative_to_current.x - 150.0).abs() < 1e-3);
        assert!((config.query_half_extent_relative_to_start.z - 25.0).abs() < 1e-3);
        assert!(config.query_half_extent_relative_to_start.x.is_infinite());
        assert_eq!(config.num_samples, 100);
        assert!((config.look_at_margin() - 8.75).abs() < 1e-4);
    }

    #[test]
    fn test_in_asset_units_keeps_other_fields() {
        let config = WalkConfig::default().with_num_samples(7).with_seed(3);
        let scaled = config.in_asset_units(0.01);
        assert_eq!(scaled.num_samples, 7);
        assert_eq!(scaled.seed, 3);
        assert_eq!(scaled.perturb_step_voxels, config.perturb_step_voxels);
        assert!((scaled.voxel_size - 10.0).abs() < 1e-4);
        assert!((scaled.query_half_extent_relative_to_current.y - 150.0).abs() < 1e-3);
        assert_eq!(config.in_asset_units(1.0), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = WalkConfig::default().with_num_samples(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroCount("num_samples")));

        let config = WalkConfig::default().with_voxel_size(-1.0);
        assert!(matches!(config.validate(), Err(ConfigError::NotPositive { .. })));

        let config = WalkConfig::default().with_image(32, 24, 4.0);
        assert_eq!(config.validate(), Err(ConfigError::FieldOfView(4.0)));

        let mut config = WalkConfig::default();
        config.line_of_sight_margin = 1.0;
        assert_eq!(config.validate(), Err(ConfigError::LineOfSightMargin(1.0)));

        let mut config = WalkConfig::default();
        config.query_half_extent_relative_to_current.y = f32::INFINITY;
        assert!(config.validate().is_err());

        let mut config = WalkConfig::default();
        config.query_half_extent_relative_to_start.z = f32::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::Negative { .. })));

        let mut config = WalkConfig::default();
        config.up_hint_nominal = Vec3::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::UpHint(Vec3::ZERO)));
    }

    #[test]
    fn test_json_infinite_extent_is_null() {
        let json = serde_json::to_value(WalkConfig::default()).unwrap();
        assert_eq!(
            json["query_half_extent_relative_to_start"],
            serde_json::json!([null, null, 0.25])
        );

        let parsed: WalkConfig = serde_json::from_value(json).unwrap();
        assert!(parsed.query_half_extent_relative_to_start.x.is_infinite());
        assert_eq!(parsed, WalkConfig::default());
    }

    #[test]
    fn test_json_partial_config_uses_defaults() {
        let parsed: WalkConfig =
            serde_json::from_str(r#"{ "num_samples": 12, "image": { "width": 64 } }"#).unwrap();
        assert_eq!(parsed.num_samples, 12);
        assert_eq!(parsed.image.width, 64);
        assert_eq!(parsed.image.height, 192);
        assert_eq!(parsed.num_pose_candidates, 20);
    }
}
