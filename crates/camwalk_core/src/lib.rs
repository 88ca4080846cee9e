//! camwalk core - scene inputs and trajectory outputs.
//!
//! This crate provides:
//!
//! - **Mesh**: the immutable triangle soup rays are cast against
//! - **Occupancy**: the `OccupancyMap` query contract and the sparse
//!   `VoxelOccupancyMap` store built by space carving
//! - **Poses**: `CameraPose`, per-frame visibility diagnostics and the
//!   `Trajectory` a walk produces

pub mod mesh;
pub mod occupancy;
pub mod pose;
pub mod voxel;

// Re-export commonly used types
pub use mesh::{Mesh, MeshError};
pub use occupancy::{Occupancy, OccupancyMap};
pub use pose::{CameraPose, FrameVisibility, Trajectory, TrajectoryFrame};
pub use voxel::{VoxelMapError, VoxelOccupancyMap, VoxelStep, VoxelTraversal};
