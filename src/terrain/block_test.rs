use glam::I64Vec3;

use super::*;

#[test]
fn child_position_derives_from_parent_and_octant() {
  let root = VoxelBlock::new(I64Vec3::new(3, 4, 5), 2, 0);
  assert_eq!(root.position_in_lod, I64Vec3::new(3, 4, 5));
  assert_eq!(root.size, 128);

  // octant 6 is the (+X, +Y, +Z) corner
  let child = VoxelBlock::new(I64Vec3::new(6, 8, 10), 1, 6);
  assert_eq!(child.position_in_lod, I64Vec3::new(7, 9, 11));
  assert_eq!(child.size, 64);
}

#[test]
fn fresh_blocks_are_inert() {
  let block = VoxelBlock::new(I64Vec3::ZERO, 1, 0);

  assert_eq!(block.state, BlockState::Initial);
  assert!(!block.has_children());
  assert!(block.neighbours.iter().all(Option::is_none));
  assert!(block.voxel_data.is_none());
  assert!(!block.in_range);
  assert!(block.operations.is_empty());
}

#[test]
fn mesh_names_are_unique_per_remesh() {
  let mut block = VoxelBlock::new(I64Vec3::new(1, 2, 3), 1, 0);

  let first = block.next_mesh_name();
  let second = block.next_mesh_name();

  assert_eq!(first, "1:2:3:1:0");
  assert_eq!(second, "1:2:3:1:1");
  assert_eq!(block.mutation_counter, 2);
}

#[test]
fn world_bounds_scale_with_lod() {
  let block = VoxelBlock::new(I64Vec3::new(2, 0, 1), 1, 0);
  let bounds = block.world_bounds();

  assert_eq!(bounds.min, I64Vec3::new(128, 0, 64));
  assert_eq!(bounds.max, I64Vec3::new(192, 64, 128));
}
