//! Triangle mesh input.
//!
//! A mesh is a plain triangle soup: vertex positions, one index triple per
//! face and an optional per-face object id recording which scene object a
//! face came from. Indices are validated once on construction so that every
//! consumer can index positions without bounds checks failing later.

use camwalk_math::{Aabb, Vec3};
use thiserror::Error;

/// Errors that can occur when assembling a mesh.
#[derive(Error, Debug, PartialEq)]
pub enum MeshError {
    #[error("Face {face} references vertex {index}, but the mesh has {vertex_count} vertices")]
    FaceIndexOutOfRange {
        face: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("Index buffer length {0} is not a multiple of 3")]
    IncompleteTriangle(usize),

    #[error("Expected {faces} face object ids, got {ids}")]
    ObjectIdCountMismatch { faces: usize, ids: usize },
}

pub type MeshResult<T> = Result<T, MeshError>;

/// An immutable triangle mesh.
#[derive(Clone, Debug)]
pub struct Mesh {
    positions: Vec<Vec3>,
    faces: Vec<[u32; 3]>,
    face_object_ids: Option<Vec<i32>>,
    bounds: Aabb,
}

impl Mesh {
    /// Create a mesh from positions and index triples.
    ///
    /// A mesh with zero faces is valid; rays cast against it never hit.
    pub fn new(positions: Vec<Vec3>, faces: Vec<[u32; 3]>) -> MeshResult<Self> {
        for (face, tri) in faces.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= positions.len()) {
                return Err(MeshError::FaceIndexOutOfRange {
                    face,
                    index,
                    vertex_count: positions.len(),
                });
            }
        }

        let bounds = Self::compute_bounds(&positions, &faces);
        log::debug!(
            "Mesh: {} vertices, {} triangles",
            positions.len(),
            faces.len()
        );
        Ok(Self {
            positions,
            faces,
            face_object_ids: None,
            bounds,
        })
    }

    /// Create a mesh from a flat index buffer (every 3 indices form a triangle).
    pub fn from_flat_indices(positions: Vec<Vec3>, indices: &[u32]) -> MeshResult<Self> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::IncompleteTriangle(indices.len()));
        }
        let faces = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Self::new(positions, faces)
    }

    /// Attach per-face object ids.
    pub fn with_object_ids(mut self, ids: Vec<i32>) -> MeshResult<Self> {
        if ids.len() != self.faces.len() {
            return Err(MeshError::ObjectIdCountMismatch {
                faces: self.faces.len(),
                ids: ids.len(),
            });
        }
        self.face_object_ids = Some(ids);
        Ok(self)
    }

    /// Bounds of the vertices referenced by faces.
    fn compute_bounds(positions: &[Vec3], faces: &[[u32; 3]]) -> Aabb {
        faces
            .iter()
            .flatten()
            .fold(Aabb::EMPTY, |acc, &i| acc.grow(positions[i as usize]))
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn face_object_ids(&self) -> Option<&[i32]> {
        self.face_object_ids.as_deref()
    }

    /// Axis-aligned bounds of all referenced vertices (`Aabb::EMPTY` for an
    /// empty mesh).
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Vertices of one face.
    pub fn triangle(&self, face: usize) -> [Vec3; 3] {
        let [i0, i1, i2] = self.faces[face];
        [
            self.positions[i0 as usize],
            self.positions[i1 as usize],
            self.positions[i2 as usize],
        ]
    }

    /// Iterate over all faces as vertex triplets, in face order.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        (0..self.faces.len()).map(move |f| self.triangle(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_positions() -> Vec<Vec3> {
        vec![
            Vec3::new(-10.0, -10.0, 0.0),
            Vec3::new(10.0, -10.0, 0.0),
            Vec3::new(10.0, 10.0, 0.0),
            Vec3::new(-10.0, 10.0, 0.0),
        ]
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = Mesh::new(quad_positions(), vec![[0, 1, 2], [0, 2, 3]]).unwrap();

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.bounds().min(), Vec3::new(-10.0, -10.0, 0.0));
        assert_eq!(mesh.bounds().max(), Vec3::new(10.0, 10.0, 0.0));
        assert_eq!(mesh.triangle(1)[2], Vec3::new(-10.0, 10.0, 0.0));
        assert_eq!(mesh.triangles().count(), 2);
    }

    #[test]
    fn test_mesh_rejects_bad_index() {
        let err = Mesh::new(quad_positions(), vec![[0, 1, 4]]).unwrap_err();
        assert_eq!(
            err,
            MeshError::FaceIndexOutOfRange {
                face: 0,
                index: 4,
                vertex_count: 4
            }
        );
    }

    #[test]
    fn test_mesh_from_flat_indices() {
        let mesh = Mesh::from_flat_indices(quad_positions(), &[0, 1, 2, 0, 2, 3]).unwrap();
        assert_eq!(mesh.faces(), &[[0, 1, 2], [0, 2, 3]]);

        let err = Mesh::from_flat_indices(quad_positions(), &[0, 1]).unwrap_err();
        assert_eq!(err, MeshError::IncompleteTriangle(2));
    }

    #[test]
    fn test_mesh_object_ids() {
        let mesh = Mesh::new(quad_positions(), vec![[0, 1, 2], [0, 2, 3]])
            .unwrap()
            .with_object_ids(vec![7, 9])
            .unwrap();
        assert_eq!(mesh.face_object_ids(), Some(&[7, 9][..]));

        let err = Mesh::new(quad_positions(), vec![[0, 1, 2]])
            .unwrap()
            .with_object_ids(vec![1, 2])
            .unwrap_err();
        assert_eq!(err, MeshError::ObjectIdCountMismatch { faces: 1, ids: 2 });
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = Mesh::new(Vec::new(), Vec::new()).unwrap();
        assert!(mesh.is_empty());
        assert!(mesh.bounds().is_empty());
    }

    #[test]
    fn test_bounds_ignore_unreferenced_vertices() {
        let mut positions = quad_positions();
        positions.push(Vec3::splat(100.0));
        let mesh = Mesh::new(positions, vec![[0, 1, 2]]).unwrap();
        assert_eq!(mesh.bounds().max(), Vec3::new(10.0, 10.0, 0.0));
    }
}
