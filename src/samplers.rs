//! Density provider contract and deterministic reference samplers.
//!
//! Terrain content comes from a caller-supplied [`DensityGenerator`]. The
//! manager hands it one block request at a time on a worker thread; the
//! generator must be deterministic for a given world region so regenerated
//! blocks reproduce identical terrain.
//!
//! The bundled samplers implement simple analytic shapes. They are useful
//! for tests and debugging chunk/LOD coherency without a noise stack.

use glam::{I64Vec3, Vec3};

use crate::constants::{block_world_size, lod_stride};
use crate::contouring;
use crate::types::{density, VoxelDensity};
use crate::voxel_data::VoxelData;

/// Description of one block's volume to generate.
#[derive(Clone, Debug)]
pub struct VoxelBlockInfo {
  /// Block grid position at its own LOD.
  pub position_in_lod: I64Vec3,
  /// Level of detail; 0 is finest.
  pub lod: u32,
  /// Samples per axis of the target grid (payload + overlap).
  pub size: usize,
  /// Mesh-space alignment offset of this LOD (see
  /// [`contouring::lod_offset`]); generators sampling continuous fields
  /// should shift by it so LOD levels line up.
  pub lod_offset: Vec3,
}

impl VoxelBlockInfo {
  pub fn new(position_in_lod: I64Vec3, lod: u32) -> Self {
    Self {
      position_in_lod,
      lod,
      size: crate::constants::VOXEL_GRID_SIZE,
      lod_offset: contouring::lod_offset(lod),
    }
  }

  /// World position of the grid's (0, 0, 0) sample.
  pub fn world_origin(&self) -> I64Vec3 {
    self.position_in_lod * block_world_size(self.lod)
  }

  /// World-space distance between adjacent samples.
  pub fn stride(&self) -> i64 {
    lod_stride(self.lod)
  }

  /// World position of a grid sample.
  pub fn world_position(&self, grid_pos: I64Vec3) -> I64Vec3 {
    self.world_origin() + grid_pos * self.stride()
  }
}

/// Fills a block's density grid for a world region.
pub trait DensityGenerator: Send + Sync {
  /// Fill `data` for the region described by `info`.
  ///
  /// Must be deterministic: the same `info` always produces the same
  /// densities.
  fn generate(&self, info: &VoxelBlockInfo, data: &mut VoxelData);
}

/// Quantize a world-space penetration depth at a block's stride.
fn sample<F: Fn(Vec3) -> f32>(info: &VoxelBlockInfo, data: &mut VoxelData, depth_at: F) {
  let stride = info.stride() as f32;
  for x in 0..info.size as i64 {
    for y in 0..info.size as i64 {
      for z in 0..info.size as i64 {
        let grid_pos = I64Vec3::new(x, y, z);
        let world = info.world_position(grid_pos).as_vec3();
        let value = density::from_penetration(depth_at(world) / stride);
        data.set_density(grid_pos, value);
      }
    }
  }
}

/// Flat ground at a fixed height. Simplest coherent baseline.
#[derive(Clone, Copy, Debug)]
pub struct GroundPlaneGenerator {
  pub height: f32,
}

impl GroundPlaneGenerator {
  pub fn new(height: f32) -> Self {
    Self { height }
  }
}

impl DensityGenerator for GroundPlaneGenerator {
  fn generate(&self, info: &VoxelBlockInfo, data: &mut VoxelData) {
    sample(info, data, |world| self.height - world.y);
  }
}

/// Solid sphere, for radially symmetric LOD tests.
#[derive(Clone, Copy, Debug)]
pub struct SphereGenerator {
  pub center: Vec3,
  pub radius: f32,
}

impl SphereGenerator {
  pub fn new(center: Vec3, radius: f32) -> Self {
    Self { center, radius }
  }
}

impl DensityGenerator for SphereGenerator {
  fn generate(&self, info: &VoxelBlockInfo, data: &mut VoxelData) {
    sample(info, data, |world| {
      self.radius - (world - self.center).length()
    });
  }
}

/// Paints a constant density everywhere (or nothing when `value` is empty).
/// Degenerate on purpose; exercises the empty-block reclamation path.
#[derive(Clone, Copy, Debug)]
pub struct UniformGenerator {
  pub value: VoxelDensity,
}

impl DensityGenerator for UniformGenerator {
  fn generate(&self, _info: &VoxelBlockInfo, data: &mut VoxelData) {
    if density::is_inside(self.value) {
      for x in 0..data.width() as i64 {
        for y in 0..data.height() as i64 {
          for z in 0..data.depth() as i64 {
            data.set_density(I64Vec3::new(x, y, z), self.value);
          }
        }
      }
    }
  }
}

#[cfg(test)]
#[path = "samplers_test.rs"]
mod samplers_test;
