//! The voxel block: one octree node and its per-block state machine data.

use glam::I64Vec3;
use smallvec::SmallVec;

use crate::constants::{block_world_size, CHILD_OFFSET_POSITION};
use crate::contouring::NeighborMask;
use crate::jobs::JobId;
use crate::operations::VoxelOperation;
use crate::scene::SceneNodeId;
use crate::terrain::arena::BlockId;
use crate::voxel_data::VoxelData;
use std::sync::Arc;

/// Lifecycle state of a block. Each state carries only what it needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
  /// Created but not yet close enough to the observer to set up.
  Initial,
  /// Within setup range; allocates data and submits generation next tick.
  Setup,
  /// Waiting on the asynchronous voxel generation job. `job` is `None` for
  /// a block resurrected from `Empty` by a pending edit, whose grid was
  /// cleared in place instead of regenerated.
  GeneratingVoxel { job: Option<JobId> },
  /// Waiting on the asynchronous mesh build; `None` until submitted.
  GeneratingMesh { job: Option<JobId> },
  /// Idle with up-to-date data. `dirty` requests a remesh.
  Ready { dirty: bool },
  /// Generated volume contained no surface; density data was released.
  Empty,
}

/// One octree node of the terrain.
pub struct VoxelBlock {
  pub position_in_lod: I64Vec3,
  /// Level of detail; 0 is finest.
  pub lod: u32,
  /// Edge length in world units at this LOD.
  pub size: i64,
  /// Octant index under the parent (0-7).
  pub child_address: u8,

  pub parent: Option<BlockId>,
  /// All 8 children are created together; individual entries go back to
  /// `None` while a subtree is being torn down.
  pub children: [Option<BlockId>; 8],
  /// Same-LOD face neighbours: +X, -X, +Y, -Y, +Z, -Z.
  pub neighbours: [Option<BlockId>; 6],

  /// Density payload; only materialized while generating, editing or
  /// meshing.
  pub voxel_data: Option<VoxelData>,

  pub state: BlockState,
  pub in_range: bool,
  pub dirty_neighbours: bool,
  pub neighbours_lod: NeighborMask,

  /// Bumped per remesh; makes queued mesh resource names unique.
  pub mutation_counter: u32,

  pub transform_node_current: Option<SceneNodeId>,
  pub transform_node_queued: Option<SceneNodeId>,
  pub model_node_current: Option<SceneNodeId>,
  pub model_node_queued: Option<SceneNodeId>,
  /// Resource name for the queued mesh, consumed on swap.
  pub queued_mesh_name: Option<String>,

  /// Edits waiting to be baked into the density grid. Rarely more than a
  /// couple per block per tick.
  pub operations: SmallVec<[Arc<VoxelOperation>; 2]>,
}

impl VoxelBlock {
  /// Create a block at `parent_position * 2 + octant offset` when spawned
  /// as a child, or at `parent_position` directly for discovery roots
  /// (`child_address` 0).
  pub fn new(parent_position_in_lod: I64Vec3, lod: u32, child_address: u8) -> Self {
    Self {
      position_in_lod: parent_position_in_lod + CHILD_OFFSET_POSITION[child_address as usize],
      lod,
      size: block_world_size(lod),
      child_address,
      parent: None,
      children: [None; 8],
      neighbours: [None; 6],
      voxel_data: None,
      state: BlockState::Initial,
      in_range: false,
      dirty_neighbours: false,
      neighbours_lod: NeighborMask::default(),
      mutation_counter: 0,
      transform_node_current: None,
      transform_node_queued: None,
      model_node_current: None,
      model_node_queued: None,
      queued_mesh_name: None,
      operations: SmallVec::new(),
    }
  }

  /// True once the lazy child creation has run.
  pub fn has_children(&self) -> bool {
    self.children[0].is_some()
  }

  /// Unique scene resource name for the next queued mesh.
  pub fn next_mesh_name(&mut self) -> String {
    let name = format!(
      "{}:{}:{}:{}:{}",
      self.position_in_lod.x,
      self.position_in_lod.y,
      self.position_in_lod.z,
      self.lod,
      self.mutation_counter
    );
    self.mutation_counter += 1;
    name
  }

  /// World-space bounds of the block's payload volume.
  pub fn world_bounds(&self) -> crate::types::IAabb {
    let min = self.position_in_lod * self.size;
    crate::types::IAabb::new(min, min + I64Vec3::splat(self.size))
  }
}

#[cfg(test)]
#[path = "block_test.rs"]
mod block_test;
