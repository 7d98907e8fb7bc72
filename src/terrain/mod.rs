//! Block octree manager: discovery, eviction, per-block state machines,
//! edit application and the deferred scene action queue.
//!
//! ```text
//!                         ONE TICK (update)
//!  ┌──────────┐  ┌───────────┐  ┌────────────────┐  ┌───────┐  ┌───────┐
//!  │ delete   ├─►│ discover  ├─►│ advance block  ├─►│ apply ├─►│ flush │
//!  │ eligible │  │ around    │  │ state machines │  │ edits │  │ scene │
//!  │ blocks   │  │ observer  │  │ (recursive)    │  │       │  │ batch │
//!  └──────────┘  └───────────┘  └────────────────┘  └───────┘  └───────┘
//! ```
//!
//! The tick is single-threaded and owns all block state. Only two
//! boundaries are shared with other threads: the edit channel feeding
//! [`VoxelTerrain::modify`] and the job system's completion map. Heavy work
//! (density generation, contouring) runs as prioritized jobs and is polled,
//! never awaited.
//!
//! Block state machine:
//!
//! ```text
//!  Initial ──(setup range)──► Setup ──► GeneratingVoxel ──┬──► Empty
//!                                                         │
//!                             (coarsest, or edits pending)├──► Ready
//!                                                         │      ▲ │dirty
//!                                                         ▼      │ ▼
//!                                                   GeneratingMesh
//! ```

pub mod arena;
pub mod block;
pub mod config;

pub use arena::{BlockArena, BlockId};
pub use block::{BlockState, VoxelBlock};
pub use config::TerrainConfig;

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use glam::I64Vec3;

use crate::constants::{
  CHILD_OFFSET_POSITION, DIR_X_POS, DIR_Y_POS, DIR_Z_POS, NEIGHBOUR_OFFSETS, OPPOSITE_DIRECTION,
  VOXEL_BLOCK_OVERLAP, VOXEL_BLOCK_SIZE, VOXEL_GRID_SIZE,
};
use crate::contouring::{ContouringCubes, NeighborMask};
use crate::jobs::JobSystem;
use crate::operations::VoxelOperation;
use crate::samplers::{DensityGenerator, VoxelBlockInfo};
use crate::scene::{SceneAction, SceneGraph, SceneNodeId};
use crate::types::{IAabb, TerrainMesh, VoxelDensity};
use crate::voxel_data::VoxelData;

/// Result of a voxel generation job.
struct GeneratedVoxels {
  data: VoxelData,
  contains_surface: bool,
}

/// Result of a mesh build job.
struct MeshJobOutput {
  mesh: TerrainMesh,
}

/// First solid voxel hit by [`VoxelTerrain::cast_ray`], plus the last empty
/// voxel in front of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RayHit {
  pub outside: I64Vec3,
  pub inside: I64Vec3,
}

/// Cloneable handle for queueing edits from any thread.
#[derive(Clone)]
pub struct EditQueue {
  tx: Sender<Arc<VoxelOperation>>,
}

impl EditQueue {
  /// Queue an edit; it is applied during a later tick.
  pub fn modify(&self, operation: VoxelOperation) {
    let _ = self.tx.send(Arc::new(operation));
  }
}

/// Callback for scattering props on freshly generated finest-LOD blocks.
pub type PlacePropsDelegate = Arc<dyn Fn(IAabb) + Send + Sync>;

/// Streaming LOD voxel terrain.
pub struct VoxelTerrain<S: SceneGraph> {
  config: TerrainConfig,
  generator: Arc<dyn DensityGenerator>,
  place_props: Option<PlacePropsDelegate>,

  jobs: JobSystem,
  scene: S,
  root_node: SceneNodeId,

  arena: BlockArena,
  /// Per-LOD lookup from grid position to block.
  position_index: Vec<HashMap<I64Vec3, BlockId>>,
  blocks_to_delete: Vec<BlockId>,

  operations_tx: Sender<Arc<VoxelOperation>>,
  operations_rx: Receiver<Arc<VoxelOperation>>,
  action_queue: Vec<SceneAction>,

  last_discovery_position: I64Vec3,
  dirty_discovery: bool,
}

impl<S: SceneGraph> VoxelTerrain<S> {
  pub fn new(config: TerrainConfig, generator: Arc<dyn DensityGenerator>, mut scene: S) -> Self {
    let root_node = scene.create_node();
    let position_index = (0..config.lod_count).map(|_| HashMap::new()).collect();
    let (operations_tx, operations_rx) = crossbeam_channel::unbounded();

    Self {
      config,
      generator,
      place_props: None,
      jobs: JobSystem::new(),
      scene,
      root_node,
      arena: BlockArena::new(),
      position_index,
      blocks_to_delete: Vec::new(),
      operations_tx,
      operations_rx,
      action_queue: Vec::new(),
      last_discovery_position: I64Vec3::ZERO,
      dirty_discovery: true,
    }
  }

  /// Register a props placement callback, invoked once per finest-LOD block
  /// when it first finishes generating.
  pub fn with_place_props(mut self, delegate: PlacePropsDelegate) -> Self {
    self.place_props = Some(delegate);
    self
  }

  pub fn config(&self) -> &TerrainConfig {
    &self.config
  }

  pub fn scene(&self) -> &S {
    &self.scene
  }

  /// Handle for queueing edits from other threads.
  pub fn edit_queue(&self) -> EditQueue {
    EditQueue {
      tx: self.operations_tx.clone(),
    }
  }

  /// Queue an edit (thread-safe; applied during a later tick).
  pub fn modify(&self, operation: VoxelOperation) {
    let _ = self.operations_tx.send(Arc::new(operation));
  }

  pub fn block(&self, id: BlockId) -> Option<&VoxelBlock> {
    self.arena.get(id)
  }

  /// Resident block at a grid position of the given LOD.
  pub fn block_at(&self, lod: u32, position: I64Vec3) -> Option<(BlockId, &VoxelBlock)> {
    let id = *self.position_index.get(lod as usize)?.get(&position)?;
    self.arena.get(id).map(|block| (id, block))
  }

  /// Number of resident blocks at a LOD level.
  pub fn resident_count(&self, lod: u32) -> usize {
    self
      .position_index
      .get(lod as usize)
      .map_or(0, HashMap::len)
  }

  pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &VoxelBlock)> {
    self.arena.iter()
  }

  /// Blocks waiting for their deferred deletion to become safe.
  pub fn pending_delete_count(&self) -> usize {
    self.blocks_to_delete.len()
  }

  /// Advance one simulation tick.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "terrain::update"))]
  pub fn update(&mut self, observer: I64Vec3) {
    {
      #[cfg(feature = "tracing")]
      let _span = tracing::info_span!("delete_blocks").entered();
      self.delete_blocks();
    }
    {
      #[cfg(feature = "tracing")]
      let _span = tracing::info_span!("discover_blocks").entered();
      self.discover_blocks(observer);
    }
    {
      #[cfg(feature = "tracing")]
      let _span = tracing::info_span!("update_blocks").entered();
      self.update_blocks(observer);
    }
    {
      #[cfg(feature = "tracing")]
      let _span = tracing::info_span!("apply_operations").entered();
      self.apply_voxel_operations();
    }

    // one batch per tick keeps the scene frame-consistent
    let actions = std::mem::take(&mut self.action_queue);
    self.scene.apply(&actions);
  }

  // ===========================================================================
  // Queries
  // ===========================================================================

  /// Density at a world position, read from the finest-LOD block if its
  /// data is resident; empty otherwise.
  pub fn get_voxel_density(&self, position: I64Vec3) -> VoxelDensity {
    if position.min_element() < 0 {
      return 0;
    }

    let block_pos = position.div_euclid(I64Vec3::splat(VOXEL_BLOCK_SIZE));
    let Some(&id) = self.position_index[0].get(&block_pos) else {
      return 0;
    };
    let Some(block) = self.arena.get(id) else {
      return 0;
    };
    let Some(data) = &block.voxel_data else {
      return 0;
    };
    data.density_at(position.rem_euclid(I64Vec3::splat(VOXEL_BLOCK_SIZE)))
  }

  /// Step along the segment voxel by voxel and return the first solid
  /// crossing together with the last empty voxel before it.
  pub fn cast_ray(&self, from: I64Vec3, to: I64Vec3) -> Option<RayHit> {
    let mut position = from;
    let delta = to - from;
    let step = I64Vec3::new(
      if delta.x > 0 { 1 } else { -1 },
      if delta.y > 0 { 1 } else { -1 },
      if delta.z > 0 { 1 } else { -1 },
    );
    let delta = delta.abs();
    let dist = delta.max_element();

    let mut error = delta;
    let mut outside = position;

    for _ in 0..dist {
      if self.get_voxel_density(position) != 0 {
        return Some(RayHit {
          outside,
          inside: position,
        });
      }
      outside = position;

      error += delta;
      if error.x > dist {
        error.x -= dist;
        position.x += step.x;
      }
      if error.y > dist {
        error.y -= dist;
        position.y += step.y;
      }
      if error.z > dist {
        error.z -= dist;
        position.z += step.z;
      }
    }

    None
  }

  // ===========================================================================
  // Discovery & eviction
  // ===========================================================================

  fn create_block(&mut self, lod: u32, parent_position_in_lod: I64Vec3, child_address: u8) -> BlockId {
    debug_assert!(lod <= self.config.lowest_lod(), "lod out of range");

    let block = VoxelBlock::new(parent_position_in_lod, lod, child_address);
    let position = block.position_in_lod;
    let id = self.arena.insert(block);
    self.position_index[lod as usize].insert(position, id);
    id
  }

  /// Ensure all coarsest-LOD blocks around the observer exist, and queue
  /// everything that moved out of range for deletion.
  ///
  /// Skipped until the observer has moved at least one world block since
  /// the last discovery.
  fn discover_blocks(&mut self, observer: I64Vec3) {
    let world_block_size = self.config.world_block_size();
    let moved = (observer - self.last_discovery_position).length_squared();
    if !self.dirty_discovery && moved <= world_block_size * world_block_size {
      return;
    }
    self.dirty_discovery = false;
    self.last_discovery_position = observer;

    let center = observer.div_euclid(I64Vec3::splat(world_block_size));
    let distance = I64Vec3::splat(self.config.discovery_distance());
    let start = (center - distance).max(I64Vec3::ZERO);
    let stop = (center + distance).min(self.config.max_discovery_boundaries);

    let lowest = self.config.lowest_lod() as usize;
    let mut out_of_range = self.position_index[lowest].clone();

    for x in start.x..=stop.x {
      for y in start.y..=stop.y {
        for z in start.z..=stop.z {
          let position = I64Vec3::new(x, y, z);
          if self.position_index[lowest].contains_key(&position) {
            out_of_range.remove(&position);
          } else {
            self.create_block(self.config.lowest_lod(), position, 0);
          }
        }
      }
    }

    for (_, id) in out_of_range {
      self.collect_blocks_to_delete(id);
    }
  }

  /// Detach a subtree from the index and neighbour graph and queue it for
  /// deferred deletion.
  fn collect_blocks_to_delete(&mut self, id: BlockId) {
    let Some(block) = self.arena.get(id) else {
      return;
    };
    let lod = block.lod;
    let position = block.position_in_lod;
    let children = block.children;

    self.detach_neighbours(id);

    if self.position_index[lod as usize].remove(&position).is_some() {
      self.blocks_to_delete.push(id);
      for child in children.into_iter().flatten() {
        self.collect_blocks_to_delete(child);
      }
    }
  }

  fn delete_blocks(&mut self) {
    let pending = std::mem::take(&mut self.blocks_to_delete);
    for id in pending {
      if self.can_be_deleted(id) {
        self.delete_block(id);
      } else {
        self.blocks_to_delete.push(id);
      }
    }
  }

  /// A block may be destroyed once it has no children, no queued mesh swap,
  /// and no outstanding generation job. A job that never completes pins the
  /// block forever; there is no timeout.
  fn can_be_deleted(&mut self, id: BlockId) -> bool {
    let Some(block) = self.arena.get(id) else {
      return true;
    };
    if block.children.iter().any(Option::is_some) {
      return false;
    }

    // let an in-flight mesh swap finish so the queued node gets promoted
    // (and its predecessor destroyed) before the block goes away
    if matches!(block.state, BlockState::GeneratingMesh { .. }) {
      self.finalize_mesh(id);
    }

    let Some(block) = self.arena.get(id) else {
      return true;
    };
    if block.transform_node_queued.is_some() {
      return false;
    }

    if let BlockState::GeneratingVoxel { job: Some(job) } = block.state {
      // observe completion here because detached blocks no longer tick
      match self.jobs.poll::<GeneratedVoxels>(job) {
        Some(generated) => {
          let block = self.arena.get_mut(id).expect("checked above");
          block.state = if generated.contains_surface {
            block.voxel_data = Some(generated.data);
            BlockState::Ready { dirty: false }
          } else {
            BlockState::Empty
          };
        }
        None => return false,
      }
    }

    true
  }

  fn delete_block(&mut self, id: BlockId) {
    let Some(removed) = self.arena.remove(id) else {
      return;
    };

    if let Some(parent_id) = removed.parent {
      if let Some(parent) = self.arena.get_mut(parent_id) {
        for child in parent.children.iter_mut() {
          if *child == Some(id) {
            *child = None;
          }
        }
      }
    }

    if let Some(transform) = removed.transform_node_current {
      self.action_queue.push(SceneAction::Destroy(transform));
    }
  }

  // ===========================================================================
  // Neighbour graph
  // ===========================================================================

  /// Mark a block and its six neighbours for a stitch-mask recompute,
  /// pruning any stale neighbour links on the way.
  fn set_neighbours_dirty(&mut self, id: BlockId) {
    let Some(block) = self.arena.get_mut(id) else {
      return;
    };
    block.dirty_neighbours = true;
    let neighbours = block.neighbours;

    for (direction, neighbour) in neighbours.iter().enumerate() {
      let Some(neighbour_id) = *neighbour else {
        continue;
      };
      match self.arena.get_mut(neighbour_id) {
        Some(neighbour) => neighbour.dirty_neighbours = true,
        None => {
          if let Some(block) = self.arena.get_mut(id) {
            block.neighbours[direction] = None;
          }
        }
      }
    }
  }

  fn set_in_range(&mut self, id: BlockId, in_range: bool) {
    let Some(block) = self.arena.get_mut(id) else {
      return;
    };
    if block.in_range != in_range {
      block.in_range = in_range;
      self.set_neighbours_dirty(id);
    }
  }

  /// Link a block to any resident same-LOD neighbours, symmetrically.
  fn attach_neighbours(&mut self, id: BlockId) {
    let Some(block) = self.arena.get(id) else {
      return;
    };
    let lod = block.lod as usize;
    let position = block.position_in_lod;
    let neighbours = block.neighbours;

    for direction in 0..6 {
      if neighbours[direction].is_some() {
        continue;
      }
      let neighbour_position = position + NEIGHBOUR_OFFSETS[direction];
      let Some(&neighbour_id) = self.position_index[lod].get(&neighbour_position) else {
        continue;
      };
      if let Some(block) = self.arena.get_mut(id) {
        block.neighbours[direction] = Some(neighbour_id);
      }
      if let Some(neighbour) = self.arena.get_mut(neighbour_id) {
        neighbour.neighbours[OPPOSITE_DIRECTION[direction]] = Some(id);
      }
    }
  }

  /// Sever all neighbour links of a block, symmetrically.
  fn detach_neighbours(&mut self, id: BlockId) {
    let Some(block) = self.arena.get_mut(id) else {
      return;
    };
    let neighbours = std::mem::take(&mut block.neighbours);

    for (direction, neighbour) in neighbours.into_iter().enumerate() {
      let Some(neighbour_id) = neighbour else {
        continue;
      };
      if let Some(neighbour) = self.arena.get_mut(neighbour_id) {
        neighbour.neighbours[OPPOSITE_DIRECTION[direction]] = None;
      }
    }
  }

  /// 6-bit stitch mask: a bit is set when that side borders a coarser or
  /// absent block. Blocks at the coarsest LOD never stitch.
  fn calc_lod_transition(&self, id: BlockId) -> NeighborMask {
    let mut mask = NeighborMask::default();
    let Some(block) = self.arena.get(id) else {
      return mask;
    };
    if block.lod >= self.config.lowest_lod() {
      return mask;
    }

    for direction in 0..6 {
      let coarser = match block.neighbours[direction].and_then(|nid| self.arena.get(nid)) {
        Some(neighbour) => !neighbour.in_range,
        None => true,
      };
      if coarser {
        mask.insert(NeighborMask::from_direction(direction));
      }
    }
    mask
  }

  // ===========================================================================
  // Block state machine
  // ===========================================================================

  fn update_blocks(&mut self, observer: I64Vec3) {
    let lowest = self.config.lowest_lod() as usize;
    let roots: Vec<BlockId> = self.position_index[lowest].values().copied().collect();

    for &id in &roots {
      self.update_block(id, observer);
    }
    for &id in &roots {
      self.update_visibility(id);
    }
  }

  fn update_block(&mut self, id: BlockId, observer: I64Vec3) {
    // blocks found empty come back to life when an edit lands on them: the
    // grid is re-allocated clear and treated as freshly generated
    {
      let Some(block) = self.arena.get_mut(id) else {
        return;
      };
      if block.state == BlockState::Empty {
        if block.operations.is_empty() {
          return;
        }
        block.voxel_data = Some(VoxelData::new_block());
        block.state = BlockState::GeneratingVoxel { job: None };
      }
    }

    let (lod, size, position, children) = {
      let block = self.arena.get(id).expect("checked above");
      (block.lod, block.size, block.position_in_lod, block.children)
    };

    // observer distance in blocks of this LOD, per axis
    let distance = (observer.div_euclid(I64Vec3::splat(size)) - position).abs();
    let within = |limit: i64| distance.max_element() <= limit;

    if children[0].is_some() {
      let children_in_range = within(1);
      for child in children.into_iter().flatten() {
        self.set_in_range(child, children_in_range);
      }
    }
    if lod == self.config.lowest_lod() {
      self.set_in_range(id, within(self.config.discovery_distance()));
    }

    let state = self.arena.get(id).expect("checked above").state;
    match state {
      BlockState::Initial => {
        if within(self.config.setup_distance) {
          self.arena.get_mut(id).expect("checked above").state = BlockState::Setup;
        }
      }

      BlockState::Setup => self.submit_generation(id, position, lod),

      BlockState::GeneratingVoxel { job } => self.poll_generation(id, job, lod),

      BlockState::GeneratingMesh { .. } => self.update_mesh(id),

      BlockState::Ready { .. } => self.update_ready(id),

      BlockState::Empty => {}
    }

    // recurse, picking up children created by this very tick
    let children = match self.arena.get(id) {
      Some(block) => block.children,
      None => return,
    };
    for child in children.into_iter().flatten() {
      self.update_block(child, observer);
    }
  }

  /// `Setup`: hand the block's region to the density generator on a worker.
  /// Coarser levels get more urgent priorities so distant terrain appears
  /// before nearby refinement.
  fn submit_generation(&mut self, id: BlockId, position: I64Vec3, lod: u32) {
    let info = VoxelBlockInfo::new(position, lod);
    let generator = Arc::clone(&self.generator);
    let job = self.jobs.submit(self.config.generation_priority(lod), move || {
      let mut data = VoxelData::new_block();
      generator.generate(&info, &mut data);
      let contains_surface = data.any_inside();
      GeneratedVoxels {
        data,
        contains_surface,
      }
    });

    self.arena.get_mut(id).expect("block exists").state =
      BlockState::GeneratingVoxel { job: Some(job) };
  }

  /// `GeneratingVoxel`: observe job completion. Empty volumes release their
  /// grid; anything else spawns children (once) and moves on.
  fn poll_generation(&mut self, id: BlockId, job: Option<crate::jobs::JobId>, lod: u32) {
    let contains_surface = match job {
      Some(job_id) => match self.jobs.poll::<GeneratedVoxels>(job_id) {
        Some(generated) => {
          let block = self.arena.get_mut(id).expect("block exists");
          block.voxel_data = Some(generated.data);
          generated.contains_surface
        }
        None => return,
      },
      // resurrected from Empty: the cleared grid is already in place
      None => true,
    };

    if !contains_surface {
      let block = self.arena.get_mut(id).expect("block exists");
      block.voxel_data = None;
      block.state = BlockState::Empty;
      return;
    }

    if lod != 0 {
      let already_subdivided = self.arena.get(id).expect("block exists").has_children();
      if !already_subdivided {
        self.create_children(id);
      }
    } else if self.arena.get(id).expect("block exists").mutation_counter == 0 {
      if let Some(delegate) = &self.place_props {
        let delegate = Arc::clone(delegate);
        let bounds = self.arena.get(id).expect("block exists").world_bounds();
        self.jobs.submit(0, move || delegate(bounds));
      }
    }

    let lowest = self.config.lowest_lod();
    let block = self.arena.get_mut(id).expect("block exists");
    block.state = if lod == lowest {
      // the coarsest level only seeds children, it never carries a mesh
      BlockState::Ready { dirty: false }
    } else if !block.operations.is_empty() {
      // edits first, mesh afterwards
      BlockState::Ready { dirty: false }
    } else {
      BlockState::GeneratingMesh { job: None }
    };
  }

  /// Create all 8 children of a block, wire sibling neighbour links from
  /// the octant layout, and attach them to any resident non-sibling
  /// neighbours.
  fn create_children(&mut self, parent_id: BlockId) {
    let (child_lod, child_base) = {
      let parent = self.arena.get(parent_id).expect("block exists");
      (parent.lod - 1, parent.position_in_lod * 2)
    };

    let mut children = [None; 8];
    for address in 0..8u8 {
      let child_id = self.create_block(child_lod, child_base, address);
      self.arena.get_mut(child_id).expect("just created").parent = Some(parent_id);
      children[address as usize] = Some(child_id);
    }
    self.arena.get_mut(parent_id).expect("block exists").children = children;

    // sibling wiring: each +axis pair of octants
    for i in 0..8 {
      for direction in [DIR_X_POS, DIR_Y_POS, DIR_Z_POS] {
        let target = CHILD_OFFSET_POSITION[i] + NEIGHBOUR_OFFSETS[direction];
        if target.min_element() < 0 || target.max_element() > 1 {
          continue;
        }
        let j = CHILD_OFFSET_POSITION
          .iter()
          .position(|&offset| offset == target)
          .expect("octant table covers the unit cube");

        let (a, b) = (children[i].unwrap(), children[j].unwrap());
        self.arena.get_mut(a).expect("just created").neighbours[direction] = Some(b);
        self.arena.get_mut(b).expect("just created").neighbours[OPPOSITE_DIRECTION[direction]] =
          Some(a);
      }
    }

    for child in children.into_iter().flatten() {
      self.attach_neighbours(child);
    }
  }

  /// `Ready`: refresh the stitch mask, bake pending edits, fan edits out to
  /// intersecting children, and kick off a remesh when dirty.
  fn update_ready(&mut self, id: BlockId) {
    let Some(block) = self.arena.get(id) else {
      return;
    };
    let in_range = block.in_range;
    let dirty_neighbours = block.dirty_neighbours;

    if in_range && dirty_neighbours {
      let mask = self.calc_lod_transition(id);
      let block = self.arena.get_mut(id).expect("checked above");
      if block.neighbours_lod != mask {
        block.neighbours_lod = mask;
        if let BlockState::Ready { dirty } = &mut block.state {
          // seams changed; the mesh must be rebuilt against the new mask
          *dirty = true;
        }
      }
      block.dirty_neighbours = false;
    }

    let has_operations = self
      .arena
      .get(id)
      .is_some_and(|block| !block.operations.is_empty());
    if has_operations {
      let (position, size, lod, children, operations) = {
        let block = self.arena.get_mut(id).expect("checked above");
        let operations = std::mem::take(&mut block.operations);
        (
          block.position_in_lod,
          block.size,
          block.lod,
          block.children,
          operations,
        )
      };

      {
        let block = self.arena.get_mut(id).expect("checked above");
        if let Some(data) = &mut block.voxel_data {
          let origin = position * size;
          for operation in &operations {
            operation.apply(data, origin, lod);
          }
        }
        if let BlockState::Ready { dirty } = &mut block.state {
          *dirty = true;
        }
      }

      // fan out to children whose octant volume the edit touches
      if children[0].is_some() && lod > 0 {
        let lod_factor = 1i64 << (lod - 1);
        let half = (VOXEL_BLOCK_SIZE + VOXEL_BLOCK_OVERLAP) / 2 * lod_factor;

        for child_id in children.into_iter().flatten() {
          let Some(child) = self.arena.get(child_id) else {
            continue;
          };
          let center =
            child.position_in_lod * VOXEL_BLOCK_SIZE * lod_factor + I64Vec3::splat(half);
          let child_box = IAabb::from_center_half_widths(center, I64Vec3::splat(half));

          let matching: Vec<_> = operations
            .iter()
            .filter(|operation| operation.bounds().intersects(&child_box))
            .cloned()
            .collect();
          if !matching.is_empty() {
            self
              .arena
              .get_mut(child_id)
              .expect("checked above")
              .operations
              .extend(matching);
          }
        }
      }
    }

    // dirty blocks re-enter mesh generation; the coarsest level never
    // carries a mesh
    let lowest = self.config.lowest_lod();
    let Some(block) = self.arena.get_mut(id) else {
      return;
    };
    if block.lod != lowest && block.state == (BlockState::Ready { dirty: true }) {
      block.transform_node_queued = None;
      block.state = BlockState::GeneratingMesh { job: None };
    }
  }

  fn update_mesh(&mut self, id: BlockId) {
    let queued = self
      .arena
      .get(id)
      .map(|block| block.transform_node_queued.is_some());
    match queued {
      Some(false) => self.submit_mesh(id),
      Some(true) => self.finalize_mesh(id),
      None => {}
    }
  }

  /// Request a mesh build: clone the block's and its parent's densities,
  /// create the queued scene nodes, and submit the contouring job.
  fn submit_mesh(&mut self, id: BlockId) {
    let Some(block) = self.arena.get(id) else {
      return;
    };
    let Some(data) = &block.voxel_data else {
      return;
    };
    // the parent's grid feeds LOD boundary blending; wait for it if the
    // parent is still generating
    let Some(parent_id) = block.parent else {
      return;
    };
    let Some(parent) = self.arena.get(parent_id) else {
      return;
    };
    let Some(parent_data) = &parent.voxel_data else {
      return;
    };

    let own_data = data.clone();
    let parent_clone = parent_data.clone();
    let lod = block.lod;
    let mask = block.neighbours_lod;
    let translation = (block.position_in_lod * block.size).as_vec3();
    let next_lod_offset =
      CHILD_OFFSET_POSITION[block.child_address as usize] * (VOXEL_BLOCK_SIZE / 2);

    let name = self.arena.get_mut(id).expect("checked above").next_mesh_name();

    let transform = self.scene.create_node();
    self.scene.set_translation(transform, translation);
    let model = self.scene.create_node();
    self.action_queue.push(SceneAction::Insert {
      parent: transform,
      child: model,
    });
    self.action_queue.push(SceneAction::Insert {
      parent: self.root_node,
      child: transform,
    });

    let job = self.jobs.submit(0, move || MeshJobOutput {
      mesh: ContouringCubes::new(&own_data)
        .with_next_lod(&parent_clone, next_lod_offset)
        .compile(
          I64Vec3::ZERO,
          I64Vec3::splat(VOXEL_GRID_SIZE as i64),
          lod,
          mask,
        ),
    });

    let block = self.arena.get_mut(id).expect("checked above");
    block.transform_node_queued = Some(transform);
    block.model_node_queued = Some(model);
    block.queued_mesh_name = Some(name);
    block.state = BlockState::GeneratingMesh { job: Some(job) };
  }

  /// Promote the queued mesh once its build job reports completion; the
  /// previously visible node is destroyed in the same batch.
  fn finalize_mesh(&mut self, id: BlockId) {
    let Some(block) = self.arena.get(id) else {
      return;
    };
    let BlockState::GeneratingMesh { job: Some(job) } = block.state else {
      return;
    };
    let Some(output) = self.jobs.poll::<MeshJobOutput>(job) else {
      return;
    };

    let block = self.arena.get_mut(id).expect("checked above");
    let name = block.queued_mesh_name.take().unwrap_or_default();
    let model = block.model_node_queued;
    let retired = block.transform_node_current;

    block.transform_node_current = block.transform_node_queued.take();
    block.model_node_current = block.model_node_queued.take();
    block.state = BlockState::Ready { dirty: false };

    if let Some(model) = model {
      self.scene.set_mesh(model, &name, output.mesh);
    }
    if let Some(retired) = retired {
      self.action_queue.push(SceneAction::Destroy(retired));
    }
  }

  // ===========================================================================
  // Edits
  // ===========================================================================

  fn apply_voxel_operations(&mut self) {
    let operations: Vec<Arc<VoxelOperation>> = self.operations_rx.try_iter().collect();
    for operation in operations {
      self.apply_voxel_operation(operation);
    }
  }

  /// Fan an edit out to every coarsest-LOD block whose bounds intersect it,
  /// creating blocks that do not exist yet so the edit cannot be dropped.
  fn apply_voxel_operation(&mut self, operation: Arc<VoxelOperation>) {
    let bounds = operation.bounds();
    let world_block_size = I64Vec3::splat(self.config.world_block_size());
    let lower = bounds
      .min
      .div_euclid(world_block_size)
      .clamp(I64Vec3::ZERO, self.config.max_discovery_boundaries);
    let upper = bounds
      .max
      .div_euclid(world_block_size)
      .clamp(I64Vec3::ZERO, self.config.max_discovery_boundaries);

    let lowest = self.config.lowest_lod();
    for x in lower.x..=upper.x {
      for y in lower.y..=upper.y {
        for z in lower.z..=upper.z {
          let position = I64Vec3::new(x, y, z);
          let id = match self.position_index[lowest as usize].get(&position) {
            Some(&id) => id,
            None => self.create_block(lowest, position, 0),
          };
          self
            .arena
            .get_mut(id)
            .expect("just resolved")
            .operations
            .push(Arc::clone(&operation));
        }
      }
    }
  }

  // ===========================================================================
  // Visibility
  // ===========================================================================

  /// Reconcile which representation of a block is shown: its own mesh or
  /// its children's. Returns whether anything under this block is visible.
  fn update_visibility(&mut self, id: BlockId) -> bool {
    let Some(block) = self.arena.get(id) else {
      return true;
    };
    if block.state == BlockState::Empty {
      return true;
    }

    let children = block.children;
    let has_children = block.has_children();
    let has_current_mesh = block.model_node_current.is_some();
    let current_transform = block.transform_node_current;
    let mut mesh_visible = block.in_range;

    let mut children_visible = false;
    if has_children {
      children_visible = true;
      for child in children.into_iter().flatten() {
        if !self.update_visibility(child) {
          children_visible = false;
        }
      }

      if children_visible {
        // the finer representation wins; hide this block's own mesh
        mesh_visible = false;
      } else {
        // incomplete children stay hidden until every sibling can show
        for child in children.into_iter().flatten() {
          let Some(child_block) = self.arena.get(child) else {
            continue;
          };
          if child_block.model_node_current.is_some() {
            if let Some(transform) = child_block.transform_node_current {
              self.action_queue.push(SceneAction::SetActive(transform, false));
            }
          }
        }
      }
    }

    if has_current_mesh {
      if let Some(transform) = current_transform {
        self
          .action_queue
          .push(SceneAction::SetActive(transform, mesh_visible));
      }
    } else {
      mesh_visible = false;
    }

    mesh_visible || children_visible
  }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
