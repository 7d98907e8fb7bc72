//! Contour vertex placement for one 2×2×2 density cell.
//!
//! A cell's vertex is the average of its edge crossings: for every cube edge
//! with exactly one inside endpoint, the crossing sits `rescale(density)`
//! voxels from the inside corner toward the outside corner. Cells without
//! any crossing produce no vertex.
//!
//! Corner index layout (bit 0 = X, bit 1 = Z, bit 2 = Y):
//!
//! ```text
//!   4 = (0,1,0)    5 = (1,1,0)      Y
//!   6 = (0,1,1)    7 = (1,1,1)      |
//!   0 = (0,0,0)    1 = (1,0,0)      0---- X
//!   2 = (0,0,1)    3 = (1,0,1)     /
//!                                 Z
//! ```

use glam::Vec3;

use crate::types::{density, VoxelDensity};

/// Positions of the 8 cube corners in cell-local space.
const CORNER_POS: [Vec3; 8] = [
  Vec3::new(0.0, 0.0, 0.0),
  Vec3::new(1.0, 0.0, 0.0),
  Vec3::new(0.0, 0.0, 1.0),
  Vec3::new(1.0, 0.0, 1.0),
  Vec3::new(0.0, 1.0, 0.0),
  Vec3::new(1.0, 1.0, 0.0),
  Vec3::new(0.0, 1.0, 1.0),
  Vec3::new(1.0, 1.0, 1.0),
];

/// The 12 cube edges as corner index pairs.
const EDGE_PAIRS: [(usize, usize); 12] = [
  (0, 1),
  (2, 3),
  (4, 5),
  (6, 7), // X edges
  (0, 2),
  (1, 3),
  (4, 6),
  (5, 7), // Z edges
  (0, 4),
  (1, 5),
  (2, 6),
  (3, 7), // Y edges
];

/// Place the contour vertex for a cell from its 8 corner densities.
///
/// Returns `None` when no edge crosses the surface (fully inside or fully
/// outside), which also guards the division by the crossing count.
pub fn calculate_vertex(densities: &[VoxelDensity; 8]) -> Option<Vec3> {
  let mut accumulated = Vec3::ZERO;
  let mut crossings = 0u32;

  for &(a, b) in &EDGE_PAIRS {
    let a_inside = density::is_inside(densities[a]);
    if a_inside == density::is_inside(densities[b]) {
      continue;
    }

    let (inside, outside) = if a_inside { (a, b) } else { (b, a) };
    let depth = density::rescale(densities[inside]);
    accumulated += CORNER_POS[inside] + (CORNER_POS[outside] - CORNER_POS[inside]) * depth;
    crossings += 1;
  }

  (crossings > 0).then(|| accumulated / crossings as f32)
}

#[cfg(test)]
#[path = "vertex_calc_test.rs"]
mod vertex_calc_test;
