//! Per-block density grid.
//!
//! Densities are stored as vertical poles: each (x, z) column keeps its Y
//! samples contiguous, so the extractor's climb cursor reads straight down a
//! slice while walking up a pole. Pole order is Z-major, X-minor.

use glam::I64Vec3;

use crate::types::{density, VoxelDensity};

/// Dense 3D density grid for one voxel block.
#[derive(Clone, Debug)]
pub struct VoxelData {
  width: usize,
  height: usize,
  depth: usize,
  clear_value: VoxelDensity,
  data: Vec<VoxelDensity>,
}

impl VoxelData {
  /// Allocate a grid of the given dimensions, filled with `clear_value`.
  pub fn new(width: usize, height: usize, depth: usize, clear_value: VoxelDensity) -> Self {
    assert!(width > 1 && height > 1 && depth > 1, "voxel grid too small");
    Self {
      width,
      height,
      depth,
      clear_value,
      data: vec![clear_value; width * height * depth],
    }
  }

  /// Allocate a standard block grid (payload + overlap), cleared to empty.
  pub fn new_block() -> Self {
    let size = crate::constants::VOXEL_GRID_SIZE;
    Self::new(size, size, size, density::EMPTY)
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn depth(&self) -> usize {
    self.depth
  }

  /// Reset every sample to the clear value.
  pub fn clear(&mut self) {
    self.data.fill(self.clear_value);
  }

  #[inline(always)]
  fn pole_start(&self, x: usize, z: usize) -> usize {
    (z * self.width + x) * self.height
  }

  /// The Y-contiguous density column at (x, z).
  #[inline]
  pub fn density_pole(&self, x: usize, z: usize) -> &[VoxelDensity] {
    let start = self.pole_start(x, z);
    &self.data[start..start + self.height]
  }

  /// Density at a grid position; out-of-range reads degrade to the clear
  /// value so callers at discovery boundaries see empty space.
  #[inline]
  pub fn density_at(&self, pos: I64Vec3) -> VoxelDensity {
    if pos.x < 0
      || pos.y < 0
      || pos.z < 0
      || pos.x >= self.width as i64
      || pos.y >= self.height as i64
      || pos.z >= self.depth as i64
    {
      return self.clear_value;
    }
    self.data[self.pole_start(pos.x as usize, pos.z as usize) + pos.y as usize]
  }

  /// Write a density sample. Out-of-range writes are ignored.
  #[inline]
  pub fn set_density(&mut self, pos: I64Vec3, value: VoxelDensity) {
    if pos.x < 0
      || pos.y < 0
      || pos.z < 0
      || pos.x >= self.width as i64
      || pos.y >= self.height as i64
      || pos.z >= self.depth as i64
    {
      return;
    }
    let idx = self.pole_start(pos.x as usize, pos.z as usize) + pos.y as usize;
    self.data[idx] = value;
  }

  /// True when any sample is inside the surface.
  pub fn any_inside(&self) -> bool {
    self.data.iter().any(|&v| density::is_inside(v))
  }
}

#[cfg(test)]
#[path = "voxel_data_test.rs"]
mod voxel_data_test;
