use glam::I64Vec3;

use super::*;

#[test]
fn derived_values() {
  let config = TerrainConfig::new(3, 2, I64Vec3::splat(100));

  assert_eq!(config.lowest_lod(), 2);
  assert_eq!(config.discovery_distance(), 4);
  assert_eq!(config.world_block_size(), 128);

  // coarser levels generate first
  assert_eq!(config.generation_priority(2), 1);
  assert_eq!(config.generation_priority(1), 2);
  assert_eq!(config.generation_priority(0), 3);
}

#[test]
fn default_is_valid() {
  let config = TerrainConfig::default();
  assert_eq!(config.lod_count, 11);
  assert_eq!(config.discovery_distance(), config.setup_distance + 2);
}

#[test]
#[should_panic(expected = "lod count out of range")]
fn rejects_single_lod() {
  TerrainConfig::new(1, 4, I64Vec3::splat(100));
}

#[test]
#[should_panic(expected = "lod count out of range")]
fn rejects_oversized_lod_count() {
  TerrainConfig::new(12, 4, I64Vec3::splat(100));
}

#[test]
#[should_panic(expected = "setup distance out of range")]
fn rejects_tiny_setup_distance() {
  TerrainConfig::new(3, 1, I64Vec3::splat(100));
}

#[test]
#[should_panic(expected = "discovery boundaries out of range")]
fn rejects_non_positive_boundaries() {
  TerrainConfig::new(3, 4, I64Vec3::new(10, 0, 10));
}
