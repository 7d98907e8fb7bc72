//! Incremental mesh assembly with vertex joining and normal accumulation.
//!
//! Vertices are joined by exact bit pattern: two quad corners computed from
//! the same edge crossings produce identical floats, so adjacent quads share
//! vertices and their face normals accumulate into a smooth vertex normal.
//! Normals are normalized once after the whole block is processed.

use std::collections::HashMap;

use glam::Vec3;

use crate::types::{Aabb, TerrainMesh};

pub struct MeshBuilder {
  positions: Vec<Vec3>,
  normals: Vec<Vec3>,
  indices: Vec<u32>,
  lookup: HashMap<[u32; 3], u32>,
  bounds: Aabb,
}

impl MeshBuilder {
  pub fn new() -> Self {
    Self {
      positions: Vec::new(),
      normals: Vec::new(),
      indices: Vec::new(),
      lookup: HashMap::new(),
      bounds: Aabb::empty(),
    }
  }

  /// Add a vertex, joining it with any previous vertex at the same position.
  pub fn add_vertex(&mut self, position: Vec3) -> u32 {
    let key = [
      position.x.to_bits(),
      position.y.to_bits(),
      position.z.to_bits(),
    ];
    if let Some(&index) = self.lookup.get(&key) {
      return index;
    }

    let index = self.positions.len() as u32;
    self.positions.push(position);
    self.normals.push(Vec3::ZERO);
    self.bounds.encapsulate(position);
    self.lookup.insert(key, index);
    index
  }

  /// Accumulate an (unnormalized) face normal onto a vertex.
  #[inline]
  pub fn accumulate_normal(&mut self, index: u32, normal: Vec3) {
    self.normals[index as usize] += normal;
  }

  /// Add a triangle unless it is degenerate (any repeated index).
  pub fn add_triangle(&mut self, a: u32, b: u32, c: u32) {
    if a == b || b == c || c == a {
      return;
    }
    self.indices.extend_from_slice(&[a, b, c]);
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// Normalize accumulated normals and produce the final mesh.
  pub fn build(mut self) -> TerrainMesh {
    for normal in &mut self.normals {
      let length_sq = normal.length_squared();
      *normal = if length_sq > 1e-12 {
        *normal / length_sq.sqrt()
      } else {
        Vec3::Y
      };
    }

    TerrainMesh {
      positions: self.positions,
      normals: self.normals,
      indices: self.indices,
      bounds: self.bounds,
    }
  }
}

impl Default for MeshBuilder {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
#[path = "mesh_builder_test.rs"]
mod mesh_builder_test;
