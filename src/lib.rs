//! voxel_terrain - streaming level-of-detail voxel terrain
//!
//! A block octree of volumetric density data that asynchronously generates
//! and re-meshes itself around a moving observer, with live density edits
//! and seam-free LOD transitions.
//!
//! # Architecture
//!
//! - [`terrain::VoxelTerrain`] owns all blocks and drives one
//!   single-threaded tick per frame: delete, discover, advance state
//!   machines, apply edits, flush scene actions.
//! - [`contouring`] is the pure surface extractor ("Contouring Cubes"): a
//!   dual-contouring-style algorithm over 3×3×3 density neighbourhoods with
//!   LOD boundary stitching.
//! - [`jobs::JobSystem`] runs density generation and mesh builds on rayon
//!   workers; the tick polls completions by id and never blocks.
//! - Collaborators stay external: the scene graph is consumed through
//!   [`scene::SceneGraph`], terrain content through
//!   [`samplers::DensityGenerator`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use glam::I64Vec3;
//! use voxel_terrain::{
//!   GroundPlaneGenerator, RecordingScene, TerrainConfig, VoxelTerrain,
//! };
//!
//! let config = TerrainConfig::new(3, 2, I64Vec3::splat(1000));
//! let generator = Arc::new(GroundPlaneGenerator::new(40.0));
//! let mut terrain = VoxelTerrain::new(config, generator, RecordingScene::new());
//!
//! // each frame:
//! terrain.update(observer_position);
//! ```

pub mod constants;
pub mod types;

pub use constants::{VOXEL_BLOCK_OVERLAP, VOXEL_BLOCK_SIZE, VOXEL_GRID_SIZE};
pub use types::{density, Aabb, IAabb, TerrainMesh, VoxelDensity};

// Density storage and edits
pub mod operations;
pub mod voxel_data;
pub use operations::VoxelOperation;
pub use voxel_data::VoxelData;

// Surface extraction
pub mod contouring;
pub use contouring::{ContouringCubes, NeighborMask};

// Async job execution
pub mod jobs;
pub use jobs::{JobId, JobSystem};

// External collaborator contracts
pub mod samplers;
pub mod scene;
pub use samplers::{
  DensityGenerator, GroundPlaneGenerator, SphereGenerator, UniformGenerator, VoxelBlockInfo,
};
pub use scene::{RecordingScene, SceneAction, SceneGraph, SceneNodeId};

// The block octree manager
pub mod terrain;
pub use terrain::{
  BlockId, BlockState, EditQueue, RayHit, TerrainConfig, VoxelBlock, VoxelTerrain,
};
