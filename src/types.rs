//! Core data types shared across the terrain subsystem.

use glam::{I64Vec3, Vec3};

/// Raw density sample. `0` is empty space; `1..=255` is solid, where the
/// value encodes how deep inside the surface the sample sits (see
/// [`density`]).
pub type VoxelDensity = u8;

/// Density encoding utilities.
///
/// Densities are stored as a single byte. `0` means outside. Any non-zero
/// value means inside, with `1..=255` mapping linearly onto `0.0..=1.0`
/// "penetration depth": `1` sits exactly on the surface, `255` is a full
/// voxel deep. The extractor uses the fractional depth to place vertices
/// along edge crossings.
pub mod density {
  use super::VoxelDensity;

  /// Value written for empty space.
  pub const EMPTY: VoxelDensity = 0;

  /// Deepest-inside value.
  pub const FULL: VoxelDensity = 255;

  /// True when the sample is inside the surface.
  #[inline(always)]
  pub fn is_inside(value: VoxelDensity) -> bool {
    value != EMPTY
  }

  /// Map a raw density onto a `[0, 1]` penetration depth.
  ///
  /// Both `0` and `1` map to depth `0.0`.
  #[inline(always)]
  pub fn rescale(value: VoxelDensity) -> f32 {
    let stepped = if value > 0 { value - 1 } else { value };
    stepped as f32 / 254.0
  }

  /// Quantize a penetration depth (in voxel units) back into a raw density.
  ///
  /// Depths at or below zero are empty; depths of one voxel or more saturate.
  #[inline(always)]
  pub fn from_penetration(depth: f32) -> VoxelDensity {
    if depth <= 0.0 {
      EMPTY
    } else if depth >= 1.0 {
      FULL
    } else {
      1 + (depth * 254.0).round() as VoxelDensity
    }
  }
}

/// Axis-aligned box over integer voxel coordinates, inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IAabb {
  pub min: I64Vec3,
  pub max: I64Vec3,
}

impl IAabb {
  pub fn new(min: I64Vec3, max: I64Vec3) -> Self {
    Self { min, max }
  }

  /// Build from a center point and half widths.
  pub fn from_center_half_widths(center: I64Vec3, half_widths: I64Vec3) -> Self {
    Self {
      min: center - half_widths,
      max: center + half_widths,
    }
  }

  /// True when the boxes overlap (touching counts).
  #[inline]
  pub fn intersects(&self, other: &IAabb) -> bool {
    self.min.x <= other.max.x
      && self.max.x >= other.min.x
      && self.min.y <= other.max.y
      && self.max.y >= other.min.y
      && self.min.z <= other.max.z
      && self.max.z >= other.min.z
  }

  /// True when the point lies inside the box.
  #[inline]
  pub fn contains(&self, point: I64Vec3) -> bool {
    point.cmpge(self.min).all() && point.cmple(self.max).all()
  }
}

/// Axis-aligned bounding box in mesh space.
#[derive(Clone, Copy, Debug)]
pub struct Aabb {
  pub min: Vec3,
  pub max: Vec3,
}

impl Aabb {
  /// Create with inverted extents, ready for encapsulation.
  pub fn empty() -> Self {
    Self {
      min: Vec3::INFINITY,
      max: Vec3::NEG_INFINITY,
    }
  }

  /// Expand to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: Vec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  /// True when at least one point was encapsulated.
  pub fn is_valid(&self) -> bool {
    self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
  }
}

impl Default for Aabb {
  fn default() -> Self {
    Self::empty()
  }
}

/// Triangle mesh produced by the contouring extractor.
///
/// Positions are block-local, already scaled to the block's LOD. Normals are
/// unit length after [`crate::contouring::ContouringCubes`] finishes a block.
#[derive(Clone, Default, Debug)]
pub struct TerrainMesh {
  pub positions: Vec<Vec3>,
  pub normals: Vec<Vec3>,
  /// Triangle indices, three per triangle.
  pub indices: Vec<u32>,
  pub bounds: Aabb,
}

impl TerrainMesh {
  /// True if no geometry was generated.
  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  /// Number of triangles in the mesh.
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
