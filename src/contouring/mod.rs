//! Contouring Cubes — dual-contouring-style surface extraction.
//!
//! The extractor walks a block's density grid column by column. For every
//! interior cell it holds a 3×3×3 sample window centred on the cell and runs
//! three face tests: center sample against its +X, +Y and +Z neighbours.
//! Each face whose two sides disagree (one inside, one outside) emits a quad
//! whose four corners are contour vertices of the cells around that face
//! (see [`vertex_calc`]). Faces flagged by the neighbour-LOD mask are blended
//! onto the next-coarser grid instead (see [`lod_blend`]).
//!
//! # Climb window
//!
//! Samples are stored in vertical poles, so the window climbs: each step up
//! shifts the three 9-sample layers down and pulls one new layer from the
//! poles.
//!
//! ```text
//!  window index = y*9 + z*3 + x            18-19-20
//!                                         / 21-22-23      <- top layer,
//!  center sample: 13                     /  24-25-26         refilled on
//!  face samples:  14 (+X)                                    every climb
//!                 16 (+Z)                    9-10-11
//!                 22 (+Y)                   12-13-14
//!                                           15-16-17
//!
//!                                            0--1--2
//!                                            3--4--5
//!                                            6--7--8
//! ```
//!
//! Output is a [`TerrainMesh`] in block-local space, scaled by `2^lod` and
//! shifted by the per-LOD alignment offset so all levels overlap in world
//! space.

pub mod lod_blend;
pub mod mesh_builder;
pub mod vertex_calc;

pub use lod_blend::NeighborMask;

use glam::{I64Vec3, Vec3};

use crate::types::{density, TerrainMesh, VoxelDensity};
use crate::voxel_data::VoxelData;
use lod_blend::{corner_directions, LodBlend};
use mesh_builder::MeshBuilder;
use vertex_calc::calculate_vertex;

/// Linear index into a 3×3×3 sample window.
#[inline(always)]
pub(crate) const fn window_index(x: usize, y: usize, z: usize) -> usize {
  y * 9 + z * 3 + x
}

/// The 8 window samples forming the cell whose minimum corner sits at
/// `base` within the window. Octet order matches [`vertex_calc`]'s corner
/// layout (bit 0 = X, bit 1 = Z, bit 2 = Y).
pub(crate) fn corner_octet(
  base: (usize, usize, usize),
  window: &[VoxelDensity; 27],
) -> [VoxelDensity; 8] {
  let (bx, by, bz) = base;
  std::array::from_fn(|k| {
    window[window_index(bx + (k & 1), by + ((k >> 2) & 1), bz + ((k >> 1) & 1))]
  })
}

/// Mesh-space scale of a LOD level.
#[inline]
pub fn lod_scale(lod: u32) -> f32 {
  (1u32 << lod) as f32
}

/// Mesh-space alignment offset of a LOD level.
///
/// Coarser levels sample at doubled stride; shifting by half the previous
/// level's scale keeps the levels' sample lattices centred on each other.
pub fn lod_offset(lod: u32) -> Vec3 {
  if lod > 0 {
    Vec3::splat(-((1u32 << (lod - 1)) as f32 - 0.5))
  } else {
    Vec3::ZERO
  }
}

/// One extracted face: the window sample it tests against the center, and
/// the cell offsets of its four quad corners (order fixes the winding).
struct Face {
  sample: usize,
  corners: [(usize, usize, usize); 4],
}

const FACES: [Face; 3] = [
  // +X face
  Face {
    sample: window_index(2, 1, 1),
    corners: [(1, 0, 0), (1, 0, 1), (1, 1, 1), (1, 1, 0)],
  },
  // +Z face
  Face {
    sample: window_index(1, 1, 2),
    corners: [(1, 0, 1), (0, 0, 1), (0, 1, 1), (1, 1, 1)],
  },
  // +Y face
  Face {
    sample: window_index(1, 2, 1),
    corners: [(1, 1, 0), (1, 1, 1), (0, 1, 1), (0, 1, 0)],
  },
];

/// Surface extractor over one block's density grid.
pub struct ContouringCubes<'a> {
  voxel_data: &'a VoxelData,
  next_lod: Option<(&'a VoxelData, I64Vec3)>,

  poles: [&'a [VoxelDensity]; 9],
  density: [VoxelDensity; 27],
  cube_position: I64Vec3,
  cube_start: I64Vec3,

  scale: f32,
  offset: Vec3,

  blend: LodBlend,
  builder: MeshBuilder,
}

impl<'a> ContouringCubes<'a> {
  pub fn new(voxel_data: &'a VoxelData) -> Self {
    Self {
      voxel_data,
      next_lod: None,
      poles: [&[]; 9],
      density: [0; 27],
      cube_position: I64Vec3::ZERO,
      cube_start: I64Vec3::ZERO,
      scale: 1.0,
      offset: Vec3::ZERO,
      blend: LodBlend::new(),
      builder: MeshBuilder::new(),
    }
  }

  /// Provide the next-coarser level's densities for LOD boundary blending.
  ///
  /// `offset` locates this block's origin within the coarser grid.
  pub fn with_next_lod(mut self, data: &'a VoxelData, offset: I64Vec3) -> Self {
    self.next_lod = Some((data, offset));
    self
  }

  /// Seed the climb window at the bottom of a 3×3 pole group.
  fn start_climb(&mut self, start: I64Vec3) {
    self.cube_position = start;

    let data: &'a VoxelData = self.voxel_data;
    for pz in 0..3 {
      for px in 0..3 {
        self.poles[pz * 3 + px] =
          data.density_pole((start.x + px as i64) as usize, (start.z + pz as i64) as usize);
      }
    }

    self.density = [0; 27];
    for i in 0..9 {
      self.density[18 + i] = self.poles[i][start.y as usize];
    }
  }

  /// Shift the window one layer up the poles.
  fn climb(&mut self) {
    self.cube_position.y += 1;
    let y = self.cube_position.y as usize;

    for i in 0..9 {
      self.density[i] = self.density[i + 9];
      self.density[i + 9] = self.density[i + 18];
      self.density[i + 18] = self.poles[i][y];
    }
  }

  /// Extract the mesh for the grid region `[pos, pos + volume)`.
  ///
  /// `neighbors` marks faces bordering a coarser LOD; those faces are
  /// blended onto the next-coarser grid (requires [`Self::with_next_lod`]).
  #[cfg_attr(
    feature = "tracing",
    tracing::instrument(skip_all, name = "contouring::compile")
  )]
  pub fn compile(
    mut self,
    pos: I64Vec3,
    volume: I64Vec3,
    lod: u32,
    neighbors: NeighborMask,
  ) -> TerrainMesh {
    debug_assert!(
      neighbors.is_empty() || self.next_lod.is_some(),
      "neighbour mask set without next-LOD data"
    );

    let dims = I64Vec3::new(
      self.voxel_data.width() as i64,
      self.voxel_data.height() as i64,
      self.voxel_data.depth() as i64,
    );
    if pos.min_element() < 0 || (pos + volume).cmpgt(dims).any() {
      return TerrainMesh::default();
    }

    self.scale = lod_scale(lod);
    self.offset = lod_offset(lod);
    let scale_next = lod_scale(lod + 1);
    let offset_next = lod_offset(lod + 1);

    // cells have a full 3×3×3 neighbourhood, so the marching region is two
    // samples smaller than the grid on each axis
    let marching = volume - I64Vec3::splat(2);
    if marching.min_element() <= 0 {
      return TerrainMesh::default();
    }

    self.cube_start = pos;
    let mut active = NeighborMask::default();

    for x in 0..marching.x {
      set_boundary_bits(
        &mut active,
        neighbors,
        x,
        marching.x,
        NeighborMask::X_NEG,
        NeighborMask::X_POS,
      );

      for z in 0..marching.z {
        set_boundary_bits(
          &mut active,
          neighbors,
          z,
          marching.z,
          NeighborMask::Z_NEG,
          NeighborMask::Z_POS,
        );

        self.start_climb(I64Vec3::new(pos.x + x, pos.y, pos.z + z));
        self.climb();

        for y in 0..marching.y {
          self.climb();

          set_boundary_bits(
            &mut active,
            neighbors,
            y,
            marching.y,
            NeighborMask::Y_NEG,
            NeighborMask::Y_POS,
          );

          self.generate_geometry(active, scale_next, offset_next);
        }
      }
    }

    self.builder.build()
  }

  /// Run the three face tests for the current cell and emit quads.
  fn generate_geometry(&mut self, active: NeighborMask, scale_next: f32, offset_next: Vec3) {
    let geometry_position =
      self.cube_position - I64Vec3::new(0, 2, 0) - self.cube_start;
    let parity = I64Vec3::new(
      geometry_position.x & 1,
      geometry_position.y & 1,
      geometry_position.z & 1,
    );

    let mut mixed = self.density;
    let blend_active = !active.is_empty() && self.next_lod.is_some();
    if blend_active {
      let (next_data, next_offset) = self.next_lod.unwrap();
      self.blend.calculate(
        next_data,
        next_offset,
        self.cube_position,
        self.cube_start,
        scale_next,
        offset_next,
      );
      self.blend.override_densities(active, parity, &mut mixed);
    }

    let center_inside = density::is_inside(mixed[window_index(1, 1, 1)]);

    for face in &FACES {
      if density::is_inside(mixed[face.sample]) == center_inside {
        continue;
      }
      self.emit_face_quad(face, center_inside, active, parity, geometry_position, blend_active);
    }
  }

  /// Emit one quad (two triangles) for a crossed face.
  fn emit_face_quad(
    &mut self,
    face: &Face,
    center_inside: bool,
    active: NeighborMask,
    parity: I64Vec3,
    geometry_position: I64Vec3,
    blend_active: bool,
  ) {
    let transformed = geometry_position.as_vec3();
    let mut corners = [Vec3::ZERO; 4];

    for (slot, &base) in face.corners.iter().enumerate() {
      let octet = corner_octet(base, &self.density);
      let vertex = calculate_vertex(&octet);

      let (bx, by, bz) = base;
      let cell_offset = Vec3::new(bx as f32, by as f32, bz as f32);
      let mut position =
        (vertex.unwrap_or(Vec3::ZERO) + cell_offset + transformed) * self.scale + self.offset;

      // corners on a flagged face coincide with the coarser mesh
      if blend_active
        && (!active.intersection(corner_directions(base)).is_empty() || vertex.is_none())
      {
        if let Some(snap) = self.blend.snap_vertex(parity, base) {
          position = snap;
        }
      }

      corners[slot] = position;
    }

    let [va, vb, vc, vd] = corners;
    let a = self.builder.add_vertex(va);
    let b = self.builder.add_vertex(vb);
    let c = self.builder.add_vertex(vc);
    let d = self.builder.add_vertex(vd);

    let ab = vb - va;
    let ac = vc - va;
    let ad = vd - va;

    // winding flips with which side of the face is solid so normals always
    // point out of the surface
    if center_inside {
      let normal_a = ac.cross(ab);
      let normal_b = ad.cross(ab);

      self.builder.accumulate_normal(a, normal_a);
      self.builder.accumulate_normal(b, normal_a);
      self.builder.accumulate_normal(c, normal_a);

      self.builder.accumulate_normal(a, normal_b);
      self.builder.accumulate_normal(c, normal_b);
      self.builder.accumulate_normal(d, normal_b);

      self.builder.add_triangle(c, b, a);
      self.builder.add_triangle(d, c, a);
    } else {
      let normal_a = ab.cross(ac);
      let normal_b = ab.cross(ad);

      self.builder.accumulate_normal(a, normal_a);
      self.builder.accumulate_normal(b, normal_a);
      self.builder.accumulate_normal(c, normal_a);

      self.builder.accumulate_normal(a, normal_b);
      self.builder.accumulate_normal(c, normal_b);
      self.builder.accumulate_normal(d, normal_b);

      self.builder.add_triangle(a, b, c);
      self.builder.add_triangle(a, c, d);
    }
  }
}

/// Restrict a direction pair of the block-wide mask to the boundary rows of
/// the marching region.
#[inline]
fn set_boundary_bits(
  active: &mut NeighborMask,
  neighbors: NeighborMask,
  index: i64,
  count: i64,
  negative: NeighborMask,
  positive: NeighborMask,
) {
  active.0 &= !(negative.0 | positive.0);
  if index == 0 {
    active.0 |= neighbors.intersection(negative).0;
  }
  if index == count - 1 {
    active.0 |= neighbors.intersection(positive).0;
  }
}
