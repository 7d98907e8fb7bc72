//! Scene-graph collaborator contract.
//!
//! The terrain does not own a scene graph; it creates nodes through this
//! trait and queues structural mutations as typed [`SceneAction`]s. The
//! manager flushes the whole action batch exactly once per tick, so the
//! scene only ever observes frame-consistent terrain states.

use glam::Vec3;

use crate::types::TerrainMesh;

/// Opaque scene node handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SceneNodeId(pub u64);

/// Deferred scene mutation, applied in batch at the tick boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneAction {
  /// Attach `child` under `parent`.
  Insert {
    parent: SceneNodeId,
    child: SceneNodeId,
  },
  /// Detach `child` from `parent` without destroying it.
  Remove {
    parent: SceneNodeId,
    child: SceneNodeId,
  },
  /// Destroy a node and its subtree.
  Destroy(SceneNodeId),
  /// Toggle a node's visibility.
  SetActive(SceneNodeId, bool),
}

/// External scene graph consumed by the terrain.
pub trait SceneGraph {
  /// Create a detached node and return its handle.
  fn create_node(&mut self) -> SceneNodeId;

  /// Set a node's local translation.
  fn set_translation(&mut self, node: SceneNodeId, translation: Vec3);

  /// Attach finished mesh geometry to a node. `name` is unique per remesh.
  fn set_mesh(&mut self, node: SceneNodeId, name: &str, mesh: TerrainMesh);

  /// Apply a batch of deferred actions.
  fn apply(&mut self, actions: &[SceneAction]);
}

/// Recording scene graph for tests and headless runs: tracks the node tree,
/// translations, meshes and activation state.
#[derive(Default)]
pub struct RecordingScene {
  next_id: u64,
  pub nodes: std::collections::HashMap<SceneNodeId, RecordedNode>,
  pub applied_actions: Vec<SceneAction>,
}

/// State the recording scene tracks per node.
#[derive(Default, Clone)]
pub struct RecordedNode {
  pub parent: Option<SceneNodeId>,
  pub translation: Vec3,
  pub mesh_name: Option<String>,
  pub triangle_count: usize,
  pub active: bool,
  pub destroyed: bool,
}

impl RecordingScene {
  pub fn new() -> Self {
    Self::default()
  }

  /// Nodes that are attached, active, not destroyed, and carry a mesh.
  pub fn visible_mesh_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self
      .nodes
      .values()
      .filter(|node| node.active && !node.destroyed)
      .filter_map(|node| node.mesh_name.clone())
      .collect();
    names.sort();
    names
  }
}

impl SceneGraph for RecordingScene {
  fn create_node(&mut self) -> SceneNodeId {
    self.next_id += 1;
    let id = SceneNodeId(self.next_id);
    self.nodes.insert(
      id,
      RecordedNode {
        active: true,
        ..RecordedNode::default()
      },
    );
    id
  }

  fn set_translation(&mut self, node: SceneNodeId, translation: Vec3) {
    if let Some(recorded) = self.nodes.get_mut(&node) {
      recorded.translation = translation;
    }
  }

  fn set_mesh(&mut self, node: SceneNodeId, name: &str, mesh: TerrainMesh) {
    if let Some(recorded) = self.nodes.get_mut(&node) {
      recorded.mesh_name = Some(name.to_owned());
      recorded.triangle_count = mesh.triangle_count();
    }
  }

  fn apply(&mut self, actions: &[SceneAction]) {
    for &action in actions {
      self.applied_actions.push(action);
      match action {
        SceneAction::Insert { parent, child } => {
          if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
          }
        }
        SceneAction::Remove { child, .. } => {
          if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = None;
          }
        }
        SceneAction::Destroy(id) => {
          // destroying detaches the whole subtree
          let children: Vec<SceneNodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.parent == Some(id))
            .map(|(&child, _)| child)
            .collect();
          for child in children {
            if let Some(node) = self.nodes.get_mut(&child) {
              node.destroyed = true;
            }
          }
          if let Some(node) = self.nodes.get_mut(&id) {
            node.destroyed = true;
          }
        }
        SceneAction::SetActive(id, active) => {
          if let Some(node) = self.nodes.get_mut(&id) {
            node.active = active;
          }
        }
      }
    }
  }
}

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;
