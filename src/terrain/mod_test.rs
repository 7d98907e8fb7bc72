use std::sync::Arc;
use std::time::Duration;

use glam::I64Vec3;

use super::*;
use crate::samplers::GroundPlaneGenerator;
use crate::scene::RecordingScene;
use crate::types::density;

/// Surface in every block at every LOD: repeating solid slabs along Y.
/// Slabs sit at y in (24, 40) mod 64, so even a 32-voxel fine block always
/// straddles at least one slab boundary.
struct WaveGenerator;

impl crate::samplers::DensityGenerator for WaveGenerator {
  fn generate(&self, info: &crate::samplers::VoxelBlockInfo, data: &mut crate::VoxelData) {
    let stride = info.stride() as f32;
    for x in 0..info.size as i64 {
      for y in 0..info.size as i64 {
        for z in 0..info.size as i64 {
          let world = info.world_position(I64Vec3::new(x, y, z));
          let band = (world.y as f32).rem_euclid(64.0);
          let depth = 8.0 - (band - 32.0).abs();
          data.set_density(
            I64Vec3::new(x, y, z),
            density::from_penetration(depth / stride),
          );
        }
      }
    }
  }
}

fn scenario_config() -> TerrainConfig {
  TerrainConfig::new(3, 2, I64Vec3::splat(100_000))
}

fn waves_terrain() -> VoxelTerrain<RecordingScene> {
  VoxelTerrain::new(scenario_config(), Arc::new(WaveGenerator), RecordingScene::new())
}

fn ground_terrain(height: f32) -> VoxelTerrain<RecordingScene> {
  VoxelTerrain::new(
    scenario_config(),
    Arc::new(GroundPlaneGenerator::new(height)),
    RecordingScene::new(),
  )
}

/// Tick until every block is parked (Initial, Empty, or clean Ready) and
/// deferred deletions drained. Dirty blocks at the coarsest LOD never
/// remesh and do not count as busy.
fn settle(terrain: &mut VoxelTerrain<RecordingScene>, observer: I64Vec3) {
  let lowest = terrain.config().lowest_lod();
  for _ in 0..4000 {
    terrain.update(observer);

    let busy = terrain.blocks().any(|(_, block)| {
      matches!(
        block.state,
        BlockState::Setup | BlockState::GeneratingVoxel { .. } | BlockState::GeneratingMesh { .. }
      ) || (block.state == (BlockState::Ready { dirty: true }) && block.lod != lowest)
    });
    if !busy && terrain.pending_delete_count() == 0 {
      return;
    }
    std::thread::sleep(Duration::from_millis(1));
  }
  panic!("terrain did not settle");
}

fn assert_neighbour_symmetry(terrain: &VoxelTerrain<RecordingScene>) {
  for (id, block) in terrain.blocks() {
    for (direction, neighbour) in block.neighbours.iter().enumerate() {
      let Some(neighbour_id) = *neighbour else {
        continue;
      };
      let neighbour = terrain
        .block(neighbour_id)
        .expect("neighbour link points at a live block");
      assert_eq!(
        neighbour.neighbours[crate::constants::OPPOSITE_DIRECTION[direction]],
        Some(id),
        "asymmetric neighbour link at {:?} lod {} dir {}",
        block.position_in_lod,
        block.lod,
        direction
      );
    }
  }
}

fn assert_octree_complete(terrain: &VoxelTerrain<RecordingScene>) {
  for (id, block) in terrain.blocks() {
    if !block.has_children() {
      continue;
    }
    for (octant, child) in block.children.iter().enumerate() {
      let child_id = child.unwrap_or_else(|| {
        panic!(
          "block {:?} lod {} missing child {octant}",
          block.position_in_lod, block.lod
        )
      });
      let child = terrain.block(child_id).expect("child is live");
      assert_eq!(child.parent, Some(id));
      assert_eq!(child.lod, block.lod - 1);
      assert_eq!(child.child_address as usize, octant);
    }
  }
}

/// The concrete scenario: lod_count 3, setup distance 2, observer at the
/// origin. The coarsest block covering the origin subdivides fully, and so
/// do its children within setup range.
#[test]
fn scenario_origin_octree_reaches_ready() {
  let mut terrain = waves_terrain();
  settle(&mut terrain, I64Vec3::ZERO);

  let (root_id, root) = terrain.block_at(2, I64Vec3::ZERO).expect("root resident");
  assert_eq!(root.state, BlockState::Ready { dirty: false });
  assert!(root.has_children());

  for child in root.children.into_iter().flatten() {
    let child = terrain.block(child).expect("child live");
    assert_eq!(child.parent, Some(root_id));
    assert!(
      child.has_children(),
      "lod 1 child at {:?} did not subdivide",
      child.position_in_lod
    );
    assert!(matches!(child.state, BlockState::Ready { .. }));
    assert!(child.model_node_current.is_some(), "lod 1 child has no mesh");
  }

  assert_octree_complete(&terrain);
  assert_neighbour_symmetry(&terrain);
}

/// Discovery covers exactly the clamped cube around the observer.
#[test]
fn discovery_is_bounded() {
  let mut terrain = waves_terrain();
  terrain.update(I64Vec3::ZERO);

  let distance = terrain.config().discovery_distance();
  let expected = (distance + 1).pow(3); // clamped at zero on every axis
  assert_eq!(terrain.resident_count(2) as i64, expected);

  for (_, block) in terrain.blocks() {
    if block.lod == 2 {
      assert!(block.position_in_lod.min_element() >= 0);
      assert!(block.position_in_lod.max_element() <= distance);
    }
  }
}

/// Blocks whose generated volume holds no surface release their grid.
#[test]
fn empty_blocks_release_density_data() {
  let mut terrain = ground_terrain(40.5);
  settle(&mut terrain, I64Vec3::ZERO);

  // well above the ground: generated but entirely air
  let (_, sky) = terrain.block_at(2, I64Vec3::new(0, 1, 0)).expect("resident");
  assert_eq!(sky.state, BlockState::Empty);
  assert!(sky.voxel_data.is_none());
  assert!(!sky.has_children());

  // the surface block kept its data and subdivided
  let (_, ground) = terrain.block_at(2, I64Vec3::ZERO).expect("resident");
  assert!(matches!(ground.state, BlockState::Ready { .. }));
  assert!(ground.voxel_data.is_some());
  assert!(ground.has_children());
}

/// An edit into empty sky resurrects the chain of empty blocks and is
/// readable back through the finest level.
#[test]
fn edit_conservation_through_resurrection() {
  let mut terrain = ground_terrain(40.5);
  settle(&mut terrain, I64Vec3::ZERO);

  let center = I64Vec3::new(64, 80, 64);
  terrain.modify(crate::VoxelOperation::Sphere {
    center,
    radius: 6,
    density: 255,
  });
  settle(&mut terrain, I64Vec3::ZERO);

  assert_eq!(terrain.get_voxel_density(center), 255);
  assert_eq!(terrain.get_voxel_density(center + I64Vec3::new(3, 0, 0)), 255);
  assert_eq!(terrain.get_voxel_density(center + I64Vec3::new(0, 20, 0)), 0);

  // the finest block under the edit is live again and meshed
  let (_, block) = terrain.block_at(0, I64Vec3::new(2, 2, 2)).expect("resident");
  assert!(matches!(block.state, BlockState::Ready { .. }));
  assert!(block.voxel_data.is_some());

  assert_neighbour_symmetry(&terrain);
  assert_octree_complete(&terrain);
}

/// Carving below the surface updates the density field readably.
#[test]
fn carve_removes_ground() {
  let mut terrain = ground_terrain(40.5);
  settle(&mut terrain, I64Vec3::ZERO);

  let center = I64Vec3::new(40, 38, 40);
  assert_ne!(terrain.get_voxel_density(center), 0, "ground starts solid");

  terrain.modify(crate::VoxelOperation::Sphere {
    center,
    radius: 4,
    density: density::EMPTY,
  });
  settle(&mut terrain, I64Vec3::ZERO);

  assert_eq!(terrain.get_voxel_density(center), 0);
  assert_ne!(
    terrain.get_voxel_density(center - I64Vec3::new(0, 8, 0)),
    0,
    "ground outside the carve is intact"
  );
}

#[test]
fn cast_ray_finds_first_solid_voxel() {
  let mut terrain = ground_terrain(40.5);
  settle(&mut terrain, I64Vec3::ZERO);

  let hit = terrain
    .cast_ray(I64Vec3::new(40, 100, 40), I64Vec3::new(40, 10, 40))
    .expect("ray hits the ground");
  assert_eq!(hit.inside, I64Vec3::new(40, 40, 40));
  assert_eq!(hit.outside, I64Vec3::new(40, 41, 40));

  // a ray through resident-but-empty sky reports no hit
  assert!(terrain
    .cast_ray(I64Vec3::new(40, 100, 40), I64Vec3::new(40, 60, 40))
    .is_none());
}

/// Observer movement evicts everything that left the discovery radius and
/// discovers the new neighbourhood; links stay symmetric throughout.
#[test]
fn movement_evicts_and_rediscovers() {
  let mut terrain = waves_terrain();
  settle(&mut terrain, I64Vec3::ZERO);
  assert!(terrain.block_at(2, I64Vec3::ZERO).is_some());

  // ten world blocks along +X: the old neighbourhood is fully out of range
  let world_block = terrain.config().world_block_size();
  let observer = I64Vec3::new(world_block * 10, 0, 0);
  settle(&mut terrain, observer);

  assert!(terrain.block_at(2, I64Vec3::ZERO).is_none(), "origin evicted");
  let distance = terrain.config().discovery_distance();
  for (_, block) in terrain.blocks() {
    if block.lod == 2 {
      assert!(
        (block.position_in_lod.x - 10).abs() <= distance,
        "resident block outside new radius: {:?}",
        block.position_in_lod
      );
    }
  }

  assert_eq!(terrain.pending_delete_count(), 0);
  assert_neighbour_symmetry(&terrain);
  assert_octree_complete(&terrain);

  // evicted meshes were destroyed in the scene
  let destroyed = terrain
    .scene()
    .applied_actions
    .iter()
    .filter(|action| matches!(action, SceneAction::Destroy(_)))
    .count();
  assert!(destroyed > 0, "no scene nodes were destroyed");
}

/// Exactly one representation is shown: once all children of a block can
/// display, the parent's own mesh is deactivated.
#[test]
fn visibility_prefers_finer_children() {
  let mut terrain = waves_terrain();
  settle(&mut terrain, I64Vec3::ZERO);
  // one extra tick so visibility reflects the settled meshes
  terrain.update(I64Vec3::ZERO);

  let (_, parent) = terrain.block_at(1, I64Vec3::ZERO).expect("resident");
  let parent_transform = parent.transform_node_current.expect("parent meshed");

  let mut children_meshed = true;
  for child in parent.children.into_iter().flatten() {
    let child = terrain.block(child).expect("live");
    if child.model_node_current.is_none() || !child.in_range {
      children_meshed = false;
    }
  }
  assert!(children_meshed, "scenario should mesh all origin children");

  let scene = terrain.scene();
  assert!(
    !scene.nodes[&parent_transform].active,
    "parent mesh still visible above its children"
  );
  for child in parent.children.into_iter().flatten() {
    let child = terrain.block(child).expect("live");
    let transform = child.transform_node_current.expect("child meshed");
    assert!(scene.nodes[&transform].active, "child mesh not visible");
  }
}

/// Blocks at the edge of the in-range region stitch toward their coarser
/// surroundings.
#[test]
fn range_boundary_sets_stitch_mask() {
  let mut terrain = waves_terrain();
  settle(&mut terrain, I64Vec3::ZERO);

  // lod 0 block whose +X neighbour exists but is out of range
  let (_, block) = terrain.block_at(0, I64Vec3::new(3, 0, 0)).expect("resident");
  assert!(block.in_range);

  let neighbour_id = block.neighbours[crate::constants::DIR_X_POS].expect("+X neighbour resident");
  let neighbour = terrain.block(neighbour_id).expect("live");
  assert!(!neighbour.in_range);

  assert!(
    block
      .neighbours_lod
      .contains(crate::contouring::NeighborMask::X_POS),
    "stitch mask missing +X transition"
  );
}
