//! Input files: OBJ scene, camera list and run configuration.

use std::fs;
use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};
use camwalk_core::{Mesh, Trajectory};
use camwalk_math::{Mat3, Vec3};
use camwalk_planner::{CarveConfig, StartPose, WalkConfig};
use serde::{Deserialize, Serialize};

fn obj_load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ..Default::default()
    }
}

/// Load every model of an OBJ file into one mesh. Faces keep the index of
/// the model they came from as their object id.
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path = path.as_ref();
    let (models, _materials) = tobj::load_obj(path, &obj_load_options())
        .with_context(|| format!("Failed to load OBJ {}", path.display()))?;
    mesh_from_models(&models)
}

/// Parse OBJ text from a reader. Material libraries are ignored.
pub fn parse_obj<R: BufRead>(reader: &mut R) -> Result<Mesh> {
    let (models, _materials) = tobj::load_obj_buf(reader, &obj_load_options(), |_| {
        Err(tobj::LoadError::GenericFailure)
    })?;
    mesh_from_models(&models)
}

fn mesh_from_models(models: &[tobj::Model]) -> Result<Mesh> {
    if models.is_empty() {
        anyhow::bail!("No models found in OBJ file");
    }

    let mut positions = Vec::new();
    let mut indices = Vec::new();
    let mut object_ids = Vec::new();

    for (object_id, model) in models.iter().enumerate() {
        let mesh = &model.mesh;
        let base = positions.len() as u32;
        positions.extend(mesh.positions.chunks_exact(3).map(Vec3::from_slice));
        indices.extend(mesh.indices.iter().map(|&i| base + i));
        object_ids.extend(std::iter::repeat(object_id as i32).take(mesh.indices.len() / 3));
        log::debug!(
            "Model {} '{}': {} triangles",
            object_id,
            model.name,
            mesh.indices.len() / 3
        );
    }

    anyhow::ensure!(!indices.is_empty(), "OBJ file contains no faces");

    let mesh = Mesh::from_flat_indices(positions, &indices)?.with_object_ids(object_ids)?;
    log::info!(
        "Loaded {} models: {} vertices, {} triangles",
        models.len(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// One entry of the cameras file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraInput {
    pub name: String,
    pub position: Vec3,
    /// World-from-camera columns: right, up, backward.
    pub orientation: [Vec3; 3],
}

impl CameraInput {
    pub fn start_pose(&self) -> StartPose {
        let [right, up, backward] = self.orientation;
        StartPose::new(self.position, Mat3::from_cols(right, up, backward))
    }
}

pub fn load_cameras<P: AsRef<Path>>(path: P) -> Result<Vec<CameraInput>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let cameras: Vec<CameraInput> =
        serde_json::from_str(&text).with_context(|| format!("Invalid camera list in {}", path.display()))?;
    log::info!("Loaded {} cameras", cameras.len());
    Ok(cameras)
}

/// Contents of the optional configuration file.
///
/// Walk lengths are given in meters and converted with
/// `meters_per_asset_unit`. Carving works directly in scene coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub meters_per_asset_unit: f32,
    pub walk: WalkConfig,
    pub carve: CarveConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            meters_per_asset_unit: 1.0,
            walk: WalkConfig::default(),
            carve: CarveConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Walk parameters in asset units, on a map with the given voxel size.
    pub fn scene_walk(&self, voxel_size: f32) -> Result<WalkConfig> {
        anyhow::ensure!(
            self.meters_per_asset_unit.is_finite() && self.meters_per_asset_unit > 0.0,
            "meters_per_asset_unit must be positive, got {}",
            self.meters_per_asset_unit
        );
        let mut walk = self.walk.in_asset_units(self.meters_per_asset_unit);
        walk.voxel_size = voxel_size;
        Ok(walk)
    }
}

/// One planned camera in the output file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraTrajectory {
    pub camera: String,
    pub trajectory: Trajectory,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TWO_OBJECTS: &str = "\
o ground
v -1 -1 0
v 1 -1 0
v 1 1 0
v -1 1 0
f 1 2 3 4
o marker
v 0 0 1
v 0.1 0 1
v 0 0.1 1
f 5 6 7
";

    #[test]
    fn test_parse_obj_merges_models() {
        let mesh = parse_obj(&mut Cursor::new(TWO_OBJECTS)).unwrap();
        // The quad is triangulated.
        assert_eq!(mesh.triangle_count(), 3);
        assert_eq!(mesh.vertex_count(), 7);
        assert_eq!(mesh.face_object_ids(), Some(&[0, 0, 1][..]));
        assert_eq!(mesh.triangle(2)[0], Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_parse_obj_without_faces() {
        assert!(parse_obj(&mut Cursor::new("# nothing here\n")).is_err());
        // Vertices alone still make no mesh.
        assert!(parse_obj(&mut Cursor::new("o points\nv 0 0 0\nv 1 0 0\n")).is_err());
    }

    #[test]
    fn test_camera_input_json() {
        let json = r#"[{
            "name": "cam_0",
            "position": [0.0, 0.0, 5.0],
            "orientation": [[1, 0, 0], [0, 1, 0], [0, 0, 1]]
        }]"#;
        let cameras: Vec<CameraInput> = serde_json::from_str(json).unwrap();
        let start = cameras[0].start_pose();
        assert_eq!(start.look_from, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(start.orientation, Mat3::IDENTITY);
    }

    #[test]
    fn test_run_config_sections_are_optional() {
        let config: RunConfig = serde_json::from_str(r#"{ "carve": { "voxel_size": 0.25 } }"#).unwrap();
        assert_eq!(config.walk, WalkConfig::default());
        assert_eq!(config.carve.voxel_size, 0.25);
        assert_eq!(config.meters_per_asset_unit, 1.0);
    }

    #[test]
    fn test_scene_walk_in_centimeters() {
        let config: RunConfig = serde_json::from_str(r#"{ "meters_per_asset_unit": 0.01 }"#).unwrap();
        let walk = config.scene_walk(5.0).unwrap();
        assert_eq!(walk.voxel_size, 5.0);
        assert!((walk.query_half_extent_relative_to_current - Vec3::new(150.0, 150.0, 25.0)).abs().max_element() < 1e-3);
        assert!(walk.query_half_extent_relative_to_start.x.is_infinite());
        assert!((walk.query_half_extent_relative_to_start.z - 25.0).abs() < 1e-3);
        assert_eq!(walk.validate(), Ok(()));
    }

    #[test]
    fn test_scene_walk_in_meters_keeps_extents() {
        let walk = RunConfig::default().scene_walk(0.2).unwrap();
        assert_eq!(walk.voxel_size, 0.2);
        assert_eq!(
            walk.query_half_extent_relative_to_current,
            WalkConfig::default().query_half_extent_relative_to_current
        );
    }

    #[test]
    fn test_scene_walk_rejects_bad_scale() {
        let config = RunConfig {
            meters_per_asset_unit: 0.0,
            ..Default::default()
        };
        assert!(config.scene_walk(0.1).is_err());
    }
}
