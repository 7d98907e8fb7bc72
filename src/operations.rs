//! Voxel operations: pending density edits.
//!
//! An operation is queued globally, fanned out to every block whose bounds
//! intersect it, and rasterized into each block's grid at that block's LOD
//! scale. Blocks keep un-applied operations in a pending list until their
//! state machine reaches `Ready`.

use glam::I64Vec3;

use crate::constants::{block_world_size, lod_stride};
use crate::types::{IAabb, VoxelDensity};
use crate::voxel_data::VoxelData;

/// A pending density edit over a world-space region.
#[derive(Clone, Debug)]
pub enum VoxelOperation {
  /// Paint a solid sphere.
  Sphere {
    center: I64Vec3,
    radius: i64,
    density: VoxelDensity,
  },
  /// Paint an axis-aligned box.
  Cuboid {
    bounds: IAabb,
    density: VoxelDensity,
  },
}

impl VoxelOperation {
  /// World-space bounds of the affected region.
  pub fn bounds(&self) -> IAabb {
    match self {
      VoxelOperation::Sphere { center, radius, .. } => {
        IAabb::from_center_half_widths(*center, I64Vec3::splat(*radius))
      }
      VoxelOperation::Cuboid { bounds, .. } => *bounds,
    }
  }

  /// Density value the operation paints.
  pub fn density(&self) -> VoxelDensity {
    match self {
      VoxelOperation::Sphere { density, .. } | VoxelOperation::Cuboid { density, .. } => *density,
    }
  }

  /// Rasterize the operation into a block's density grid.
  ///
  /// `block_origin` is the world position of the grid's (0, 0, 0) sample and
  /// `lod` the block's level; samples are `2^lod` world units apart.
  pub fn apply(&self, data: &mut VoxelData, block_origin: I64Vec3, lod: u32) {
    let stride = lod_stride(lod);
    let bounds = self.bounds();

    // clip the affected world region to this grid's index range
    let grid_max = I64Vec3::new(
      data.width() as i64 - 1,
      data.height() as i64 - 1,
      data.depth() as i64 - 1,
    );
    let lo = ((bounds.min - block_origin).div_euclid(I64Vec3::splat(stride)))
      .max(I64Vec3::ZERO)
      .min(grid_max);
    let hi = ((bounds.max - block_origin).div_euclid(I64Vec3::splat(stride)))
      .max(I64Vec3::ZERO)
      .min(grid_max);

    for x in lo.x..=hi.x {
      for z in lo.z..=hi.z {
        for y in lo.y..=hi.y {
          let grid_pos = I64Vec3::new(x, y, z);
          let world_pos = block_origin + grid_pos * stride;
          if self.covers(world_pos) {
            data.set_density(grid_pos, self.density());
          }
        }
      }
    }
  }

  /// True when the operation's volume covers the given world position.
  fn covers(&self, world_pos: I64Vec3) -> bool {
    match self {
      VoxelOperation::Sphere { center, radius, .. } => {
        let d = world_pos - *center;
        d.length_squared() <= radius * radius
      }
      VoxelOperation::Cuboid { bounds, .. } => bounds.contains(world_pos),
    }
  }
}

/// World-space origin of a block's density grid.
#[inline]
pub fn block_origin(position_in_lod: I64Vec3, lod: u32) -> I64Vec3 {
  position_in_lod * block_world_size(lod)
}

#[cfg(test)]
#[path = "operations_test.rs"]
mod operations_test;
