use glam::Vec3;

use super::*;

#[test]
fn identical_positions_are_joined() {
  let mut builder = MeshBuilder::new();
  let a = builder.add_vertex(Vec3::new(1.0, 2.0, 3.0));
  let b = builder.add_vertex(Vec3::new(1.0, 2.0, 3.0));
  let c = builder.add_vertex(Vec3::new(1.0, 2.0, 3.5));

  assert_eq!(a, b);
  assert_ne!(a, c);
}

#[test]
fn degenerate_triangles_are_dropped() {
  let mut builder = MeshBuilder::new();
  let a = builder.add_vertex(Vec3::ZERO);
  let b = builder.add_vertex(Vec3::X);
  let c = builder.add_vertex(Vec3::Y);

  builder.add_triangle(a, a, b);
  builder.add_triangle(a, b, b);
  assert_eq!(builder.triangle_count(), 0);

  builder.add_triangle(a, b, c);
  assert_eq!(builder.triangle_count(), 1);
}

#[test]
fn normals_are_normalized_on_build() {
  let mut builder = MeshBuilder::new();
  let a = builder.add_vertex(Vec3::ZERO);
  let b = builder.add_vertex(Vec3::X);
  let c = builder.add_vertex(Vec3::Y);
  builder.add_triangle(a, b, c);

  builder.accumulate_normal(a, Vec3::new(0.0, 0.0, 8.0));
  builder.accumulate_normal(a, Vec3::new(0.0, 0.0, 2.0));

  let mesh = builder.build();
  assert!((mesh.normals[a as usize].length() - 1.0).abs() < 1e-6);
  assert!((mesh.normals[a as usize] - Vec3::Z).length() < 1e-6);

  // untouched vertices fall back to a unit up-normal
  assert!((mesh.normals[b as usize].length() - 1.0).abs() < 1e-6);
}

#[test]
fn bounds_track_all_vertices() {
  let mut builder = MeshBuilder::new();
  builder.add_vertex(Vec3::new(-1.0, 0.0, 2.0));
  builder.add_vertex(Vec3::new(3.0, -4.0, 0.0));

  let mesh = builder.build();
  assert_eq!(mesh.bounds.min, Vec3::new(-1.0, -4.0, 0.0));
  assert_eq!(mesh.bounds.max, Vec3::new(3.0, 0.0, 2.0));
}
