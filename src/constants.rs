//! Block layout constants shared by the octree manager and the extractor.
//!
//! # Block Layout
//!
//! A voxel block stores `32 + 2` samples per axis: 32 voxels of payload plus
//! a 2-sample overlap into the +axis neighbour so the extractor can walk
//! 3×3×3 neighbourhoods across block boundaries without fetching remote data.
//!
//! ```text
//!  Sample index:  0    1   ...   31  | 32   33
//!                 └── block payload ─┘ └ overlap ┘
//! ```
//!
//! # Coordinate System
//!
//! ```text
//!     Y
//!     |
//!     |
//!     0---- X
//!    /
//!   Z
//! ```
//!
//! # Octant Addressing
//!
//! Children of a block are addressed 0-7 in the order the subdivision walks
//! the parent volume (bottom ring counter-clockwise, then top ring):
//!
//! ```text
//!    4-----5
//!   /|    /|
//!  7-----6 |
//!  | 0---|-1
//!  |/    |/
//!  3-----2
//! ```

use glam::I64Vec3;

/// Voxels per block axis (payload, without overlap).
pub const VOXEL_BLOCK_SIZE: i64 = 32;

/// Overlap into the +axis neighbour, in samples.
pub const VOXEL_BLOCK_OVERLAP: i64 = 2;

/// Samples per axis of a block's density grid (payload + overlap).
pub const VOXEL_GRID_SIZE: usize = (VOXEL_BLOCK_SIZE + VOXEL_BLOCK_OVERLAP) as usize;

/// Grid offset of each child octant within its parent, by child address.
pub const CHILD_OFFSET_POSITION: [I64Vec3; 8] = [
  I64Vec3::new(0, 0, 0),
  I64Vec3::new(1, 0, 0),
  I64Vec3::new(1, 0, 1),
  I64Vec3::new(0, 0, 1),
  I64Vec3::new(0, 1, 0),
  I64Vec3::new(1, 1, 0),
  I64Vec3::new(1, 1, 1),
  I64Vec3::new(0, 1, 1),
];

/// Neighbour direction indices.
///
/// Order matches the `neighbours` array on a block: +X, -X, +Y, -Y, +Z, -Z.
pub const DIR_X_POS: usize = 0;
pub const DIR_X_NEG: usize = 1;
pub const DIR_Y_POS: usize = 2;
pub const DIR_Y_NEG: usize = 3;
pub const DIR_Z_POS: usize = 4;
pub const DIR_Z_NEG: usize = 5;

/// Grid offset for each neighbour direction.
pub const NEIGHBOUR_OFFSETS: [I64Vec3; 6] = [
  I64Vec3::new(1, 0, 0),
  I64Vec3::new(-1, 0, 0),
  I64Vec3::new(0, 1, 0),
  I64Vec3::new(0, -1, 0),
  I64Vec3::new(0, 0, 1),
  I64Vec3::new(0, 0, -1),
];

/// Opposite of each neighbour direction.
pub const OPPOSITE_DIRECTION: [usize; 6] = [
  DIR_X_NEG,
  DIR_X_POS,
  DIR_Y_NEG,
  DIR_Y_POS,
  DIR_Z_NEG,
  DIR_Z_POS,
];

/// Edge length in world units of a block at the given LOD.
#[inline(always)]
pub const fn block_world_size(lod: u32) -> i64 {
  VOXEL_BLOCK_SIZE << lod
}

/// World-space stride between adjacent samples at the given LOD.
#[inline(always)]
pub const fn lod_stride(lod: u32) -> i64 {
  1 << lod
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
