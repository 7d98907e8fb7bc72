//! Terrain construction parameters.

use glam::I64Vec3;

use crate::constants::block_world_size;

/// Validated configuration for a [`crate::terrain::VoxelTerrain`].
///
/// Invalid parameters are construction-time panics: a terrain with a broken
/// LOD count or discovery region cannot run in any degraded mode.
#[derive(Clone, Debug)]
pub struct TerrainConfig {
  /// Number of LOD levels (2-11). Level 0 is finest; the coarsest level
  /// carries no mesh and only seeds children.
  pub lod_count: u32,
  /// Distance in coarsest-LOD blocks within which blocks are set up.
  pub setup_distance: i64,
  /// Per-axis cap on coarsest-LOD block coordinates; discovery never leaves
  /// `[0, max_discovery_boundaries]`.
  pub max_discovery_boundaries: I64Vec3,
}

impl TerrainConfig {
  pub fn new(lod_count: u32, setup_distance: i64, max_discovery_boundaries: I64Vec3) -> Self {
    assert!((2..=11).contains(&lod_count), "lod count out of range");
    assert!(setup_distance >= 2, "voxel block setup distance out of range");
    assert!(
      max_discovery_boundaries.min_element() > 0,
      "discovery boundaries out of range"
    );

    Self {
      lod_count,
      setup_distance,
      max_discovery_boundaries,
    }
  }

  /// Coarsest LOD index (lowest detail).
  #[inline]
  pub fn lowest_lod(&self) -> u32 {
    self.lod_count - 1
  }

  /// Distance in coarsest-LOD blocks within which blocks stay resident.
  #[inline]
  pub fn discovery_distance(&self) -> i64 {
    self.setup_distance + 2
  }

  /// World-space edge length of a coarsest-LOD block.
  #[inline]
  pub fn world_block_size(&self) -> i64 {
    block_world_size(self.lowest_lod())
  }

  /// Generation job priority for a block: coarser levels first.
  #[inline]
  pub fn generation_priority(&self, lod: u32) -> u32 {
    self.lowest_lod() - lod + 1
  }
}

impl Default for TerrainConfig {
  fn default() -> Self {
    Self::new(11, 4, I64Vec3::splat(100_000))
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
