use glam::Vec3;

use super::*;

#[test]
fn homogeneous_cells_have_no_vertex() {
  assert_eq!(calculate_vertex(&[0; 8]), None);
  assert_eq!(calculate_vertex(&[255; 8]), None);
  // all surface-level but still inside
  assert_eq!(calculate_vertex(&[1; 8]), None);
}

/// Bottom face fully solid at surface level, top face empty: every vertical
/// edge crosses at depth 0, so the vertex sits at the center of the bottom
/// face.
#[test]
fn half_full_cell_places_vertex_on_crossing_plane() {
  let mut d = [0u8; 8];
  for corner in [0, 1, 2, 3] {
    d[corner] = 1; // depth 0.0
  }

  let v = calculate_vertex(&d).expect("cell crosses the surface");
  assert!((v - Vec3::new(0.5, 0.0, 0.5)).length() < 1e-6);
}

/// Deeper inside-densities push the crossing toward the outside corner.
#[test]
fn density_depth_moves_crossing() {
  // only corner 0 solid: crossings on the three edges out of corner 0
  let mut d = [0u8; 8];
  d[0] = 255; // full depth: crossings land on the far corners

  let v = calculate_vertex(&d).expect("corner cell crosses");
  // average of (1,0,0), (0,0,1), (0,1,0)
  assert!((v - Vec3::splat(1.0 / 3.0)).length() < 1e-6);

  d[0] = 1; // surface level: crossings collapse onto corner 0
  let v = calculate_vertex(&d).expect("corner cell crosses");
  assert!(v.length() < 1e-6);
}

/// The vertex always stays within the unit cell.
#[test]
fn vertex_stays_inside_cell() {
  // a few representative mixed configurations
  let configs: [[u8; 8]; 4] = [
    [200, 0, 0, 0, 0, 0, 0, 0],
    [255, 255, 0, 0, 128, 0, 0, 0],
    [0, 90, 0, 90, 0, 90, 0, 90],
    [10, 250, 10, 250, 0, 0, 0, 0],
  ];

  for d in configs {
    let v = calculate_vertex(&d).expect("mixed cell crosses");
    assert!(v.min_element() >= -1e-6 && v.max_element() <= 1.0 + 1e-6, "{v:?} out of cell");
  }
}
