use glam::{I64Vec3, Vec3};

use super::*;

#[test]
fn density_zero_and_one_are_surface_level() {
  assert!(!density::is_inside(0));
  assert!(density::is_inside(1));
  assert_eq!(density::rescale(0), 0.0);
  assert_eq!(density::rescale(1), 0.0);
  assert_eq!(density::rescale(255), 1.0);
}

#[test]
fn density_rescale_is_monotonic() {
  let mut previous = -1.0f32;
  for value in 0u8..=255 {
    let depth = density::rescale(value);
    assert!(depth >= previous, "rescale not monotonic at {value}");
    assert!((0.0..=1.0).contains(&depth));
    previous = depth;
  }
}

#[test]
fn density_penetration_roundtrip() {
  assert_eq!(density::from_penetration(-0.5), 0);
  assert_eq!(density::from_penetration(0.0), 0);
  assert_eq!(density::from_penetration(1.0), 255);
  assert_eq!(density::from_penetration(2.0), 255);

  // mid-range depths survive quantization within one step
  for depth in [0.1f32, 0.25, 0.5, 0.75, 0.9] {
    let value = density::from_penetration(depth);
    assert!((density::rescale(value) - depth).abs() < 1.0 / 254.0 + 1e-6);
  }
}

#[test]
fn iaabb_intersection_is_inclusive() {
  let a = IAabb::new(I64Vec3::ZERO, I64Vec3::splat(10));
  let b = IAabb::new(I64Vec3::splat(10), I64Vec3::splat(20));
  let c = IAabb::new(I64Vec3::splat(11), I64Vec3::splat(20));

  assert!(a.intersects(&b), "touching boxes intersect");
  assert!(b.intersects(&a));
  assert!(!a.intersects(&c));
  assert!(a.contains(I64Vec3::splat(10)));
  assert!(!a.contains(I64Vec3::splat(11)));
}

#[test]
fn iaabb_from_center_half_widths() {
  let b = IAabb::from_center_half_widths(I64Vec3::splat(5), I64Vec3::splat(2));
  assert_eq!(b.min, I64Vec3::splat(3));
  assert_eq!(b.max, I64Vec3::splat(7));
}

#[test]
fn aabb_encapsulate() {
  let mut bounds = Aabb::empty();
  assert!(!bounds.is_valid());

  bounds.encapsulate(Vec3::new(1.0, -2.0, 3.0));
  bounds.encapsulate(Vec3::new(-1.0, 4.0, 0.0));

  assert!(bounds.is_valid());
  assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, 0.0));
  assert_eq!(bounds.max, Vec3::new(1.0, 4.0, 3.0));
}

#[test]
fn empty_mesh_reports_empty() {
  let mesh = TerrainMesh::default();
  assert!(mesh.is_empty());
  assert_eq!(mesh.triangle_count(), 0);
}
