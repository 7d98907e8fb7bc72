//! LOD boundary blending for seam-free transitions.
//!
//! When a face of a block borders a coarser neighbour, the geometry on that
//! face must land exactly on the coarser mesh or cracks appear. Two
//! mechanisms cooperate, both driven by the 6-bit [`NeighborMask`]:
//!
//! 1. **Density override**: before the face tests run, the governing samples
//!    of a flagged face are replaced with values from the coarser grid, so
//!    fine and coarse agree on *where* the surface crosses.
//! 2. **Vertex snapping**: quad corners on a flagged face are replaced with
//!    the coarser level's own contour vertices. The coarse cell contributes
//!    8 corner vertices; edge, face and body midpoints are interpolated
//!    between them, forming a 3×3×3 vertex grid the fine cell indexes by
//!    parity.
//!
//! # Coarse vertex grid
//!
//! ```text
//!       y
//!       |
//!       18-----19-----20
//!      /|     /|     /|
//!     21-----22-----23|
//!    /| |   /| |   /| |
//!   24-----25-----26| |
//!   | | 9--|-|-10-|-|-11
//!   | |/|  | |/|  | |/|
//!   | 12---|-13---|-14|
//!   |/| |  |/| |  |/| |
//!   15-----16-----17| |
//!   | | 0--|-|-1--|-|-2--x
//!   | |/   | |/   | |/
//!   | 3----|-4----|-5
//!   |/     |/     |/
//!   6------7------8
//!  /
//! z
//! ```

use glam::{I64Vec3, Vec3};

use super::vertex_calc::calculate_vertex;
use super::{corner_octet, window_index};
use crate::types::VoxelDensity;
use crate::voxel_data::VoxelData;

/// 6-bit mask of face directions bordering a coarser (or absent) neighbour.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct NeighborMask(pub u8);

impl NeighborMask {
  pub const Z_NEG: NeighborMask = NeighborMask(0x01);
  pub const Z_POS: NeighborMask = NeighborMask(0x02);
  pub const Y_NEG: NeighborMask = NeighborMask(0x04);
  pub const Y_POS: NeighborMask = NeighborMask(0x08);
  pub const X_NEG: NeighborMask = NeighborMask(0x10);
  pub const X_POS: NeighborMask = NeighborMask(0x20);

  /// Mask bit for a neighbour direction index (see [`crate::constants`]).
  pub fn from_direction(direction: usize) -> NeighborMask {
    const BY_DIRECTION: [NeighborMask; 6] = [
      NeighborMask::X_POS,
      NeighborMask::X_NEG,
      NeighborMask::Y_POS,
      NeighborMask::Y_NEG,
      NeighborMask::Z_POS,
      NeighborMask::Z_NEG,
    ];
    BY_DIRECTION[direction]
  }

  #[inline]
  pub fn is_empty(self) -> bool {
    self.0 == 0
  }

  #[inline]
  pub fn contains(self, other: NeighborMask) -> bool {
    self.0 & other.0 != 0
  }

  #[inline]
  pub fn insert(&mut self, other: NeighborMask) {
    self.0 |= other.0;
  }

  #[inline]
  pub fn intersection(self, other: NeighborMask) -> NeighborMask {
    NeighborMask(self.0 & other.0)
  }
}

impl std::ops::BitOr for NeighborMask {
  type Output = NeighborMask;

  fn bitor(self, rhs: NeighborMask) -> NeighborMask {
    NeighborMask(self.0 | rhs.0)
  }
}

/// Mask of the three face directions a quad corner at cell-local offset
/// `(bx, by, bz)` can participate in.
pub fn corner_directions(base: (usize, usize, usize)) -> NeighborMask {
  let (bx, by, bz) = base;
  let x = if bx != 0 { NeighborMask::X_POS } else { NeighborMask::X_NEG };
  let y = if by != 0 { NeighborMask::Y_POS } else { NeighborMask::Y_NEG };
  let z = if bz != 0 { NeighborMask::Z_POS } else { NeighborMask::Z_NEG };
  x | y | z
}

/// The 8 coarse cell corners as (vertex grid index, cell offset).
const COARSE_CORNERS: [(usize, (usize, usize, usize)); 8] = [
  (0, (0, 0, 0)),
  (2, (1, 0, 0)),
  (6, (0, 0, 1)),
  (8, (1, 0, 1)),
  (18, (0, 1, 0)),
  (20, (1, 1, 0)),
  (24, (0, 1, 1)),
  (26, (1, 1, 1)),
];

/// Midpoint interpolation order: edges between corners, then face centers
/// between opposite edge midpoints, then the body center.
const COARSE_MIDPOINTS: [(usize, usize, usize); 19] = [
  // edges
  (1, 0, 2),
  (3, 0, 6),
  (5, 2, 8),
  (7, 6, 8),
  (9, 0, 18),
  (11, 2, 20),
  (15, 6, 24),
  (17, 8, 26),
  (19, 18, 20),
  (21, 18, 24),
  (23, 20, 26),
  (25, 24, 26),
  // face centers
  (4, 1, 7),
  (10, 9, 11),
  (12, 9, 15),
  (14, 11, 17),
  (16, 15, 17),
  (22, 19, 25),
  // body center
  (13, 12, 14),
];

/// Per-cell view of the next-coarser LOD around the current cube position.
pub struct LodBlend {
  /// 3×3×3 coarse density window centred on the cell.
  next_density: [VoxelDensity; 27],
  /// Coarse contour vertices in mesh space, indexed like the density window.
  snap_positions: [Vec3; 27],
  snap_visible: [bool; 27],
}

impl LodBlend {
  pub fn new() -> Self {
    Self {
      next_density: [0; 27],
      snap_positions: [Vec3::ZERO; 27],
      snap_visible: [false; 27],
    }
  }

  /// Sample the coarse grid around the cell and rebuild the snap vertex grid.
  ///
  /// `cube_position` is the climb cursor (its Y points at the top window
  /// layer), `cube_start` the block's climb origin, and `next_offset` the
  /// cell origin's offset into the coarse grid.
  pub fn calculate(
    &mut self,
    next_data: &VoxelData,
    next_offset: I64Vec3,
    cube_position: I64Vec3,
    cube_start: I64Vec3,
    scale_next: f32,
    offset_next: Vec3,
  ) {
    let cell = cube_position - I64Vec3::new(0, 2, 0);
    let base = I64Vec3::new(cell.x >> 1, cell.y >> 1, cell.z >> 1) + next_offset;

    let mut index = 0;
    for y in 0..3 {
      for z in 0..3 {
        for x in 0..3 {
          self.next_density[index] = next_data.density_at(base + I64Vec3::new(x, y, z));
          index += 1;
        }
      }
    }

    self.snap_visible = [false; 27];

    for (vertex_index, offset) in COARSE_CORNERS {
      let octet = corner_octet(offset, &self.next_density);
      if let Some(position) = calculate_vertex(&octet) {
        let (bx, by, bz) = offset;
        self.snap_positions[vertex_index] =
          position + Vec3::new(bx as f32, by as f32, bz as f32);
        self.snap_visible[vertex_index] = true;
      }
    }

    for (target, a, b) in COARSE_MIDPOINTS {
      if self.snap_visible[a] && self.snap_visible[b] {
        self.snap_positions[target] = (self.snap_positions[a] + self.snap_positions[b]) * 0.5;
        self.snap_visible[target] = true;
      }
    }

    let transformed = Vec3::new(
      ((cube_position.x - cube_start.x) >> 1) as f32,
      ((cube_position.y - 2 - cube_start.y) >> 1) as f32,
      ((cube_position.z - cube_start.z) >> 1) as f32,
    );
    for i in 0..27 {
      if self.snap_visible[i] {
        self.snap_positions[i] = (self.snap_positions[i] + transformed) * scale_next + offset_next;
      }
    }
  }

  /// Override the density window's flagged faces with coarse samples.
  ///
  /// Positive faces take the coarse face-center sample across the whole
  /// outer layer. Negative faces rebuild the centre layer from the coarse
  /// samples the fine cell's parity aligns with.
  pub fn override_densities(
    &self,
    active: NeighborMask,
    parity: I64Vec3,
    mixed: &mut [VoxelDensity; 27],
  ) {
    let coarse = |p: i64, f: usize| -> usize { ((p + f as i64 + 1) >> 1) as usize };

    for y in 0..3usize {
      for z in 0..3usize {
        for x in 0..3usize {
          let i = window_index(x, y, z);

          if active.contains(NeighborMask::X_POS) && x == 2 {
            mixed[i] = self.next_density[window_index(2, 1, 1)];
          }
          if active.contains(NeighborMask::X_NEG) && x == 1 {
            mixed[i] = self.next_density[window_index(1, coarse(parity.y, y), coarse(parity.z, z))];
          }
          if active.contains(NeighborMask::Y_POS) && y == 2 {
            mixed[i] = self.next_density[window_index(1, 2, 1)];
          }
          if active.contains(NeighborMask::Y_NEG) && y == 1 {
            mixed[i] = self.next_density[window_index(coarse(parity.x, x), 1, coarse(parity.z, z))];
          }
          if active.contains(NeighborMask::Z_POS) && z == 2 {
            mixed[i] = self.next_density[window_index(1, 1, 2)];
          }
          if active.contains(NeighborMask::Z_NEG) && z == 1 {
            mixed[i] = self.next_density[window_index(coarse(parity.x, x), coarse(parity.y, y), 1)];
          }
        }
      }
    }
  }

  /// Coarse vertex a quad corner at cell offset `base` snaps onto, selected
  /// by the cell's parity within the coarse grid.
  pub fn snap_vertex(&self, parity: I64Vec3, base: (usize, usize, usize)) -> Option<Vec3> {
    let (bx, by, bz) = base;
    let index = ((parity.y as usize + by) * 9)
      + ((parity.z as usize + bz) * 3)
      + (parity.x as usize + bx);
    self.snap_visible[index].then(|| self.snap_positions[index])
  }
}

impl Default for LodBlend {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
#[path = "lod_blend_test.rs"]
mod lod_blend_test;
