//! JSON scene descriptions for headless runs and tests.
//!
//! ```json
//! {
//!   "toolkit": [{ "name": "MainMenu", "children": [
//!       { "kind": "button", "name": "Play", "text": "Play" } ] }],
//!   "legacy": [{ "name": "HUD", "children": [
//!       { "name": "Pause", "components": [
//!           { "component": "graphic", "raycast_target": true },
//!           { "component": "button" } ] } ] }]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::errors::SentinelResult;
use crate::ui::legacy::{SceneGraph, SceneObject, SharedScene};
use crate::ui::toolkit::{PickingMode, SharedToolkit, ToolkitNode, ToolkitTree};
use crate::ui::walk::NodeId;
use crate::ui::UiSurface;

#[derive(Debug, Deserialize, Default)]
pub struct SceneFixture {
    #[serde(default)]
    pub toolkit: Vec<RootSpec<ToolkitNodeSpec>>,
    #[serde(default)]
    pub legacy: Vec<RootSpec<SceneObjectSpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct RootSpec<T> {
    pub name: String,
    #[serde(default)]
    pub children: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct ToolkitNodeSpec {
    /// Falls back to the kind's default when absent.
    #[serde(default)]
    pub picking: Option<PickingMode>,
    #[serde(default)]
    pub children: Vec<ToolkitNodeSpec>,
    #[serde(flatten)]
    pub node: ToolkitNode,
}

#[derive(Debug, Deserialize)]
pub struct SceneObjectSpec {
    #[serde(default)]
    pub children: Vec<SceneObjectSpec>,
    #[serde(flatten)]
    pub object: SceneObject,
}

/// Both trees built from a fixture, ready to share with the host and the agent.
#[derive(Clone)]
pub struct LoadedScene {
    pub toolkit: SharedToolkit,
    pub legacy: SharedScene,
}

impl LoadedScene {
    pub fn surface(&self) -> UiSurface {
        UiSurface::from_trees(Some(self.toolkit.clone()), Some(self.legacy.clone()))
    }
}

impl SceneFixture {
    pub fn from_json(json: &str) -> SentinelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> SentinelResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let fixture = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            panels = fixture.toolkit.len(),
            canvases = fixture.legacy.len(),
            "scene fixture loaded"
        );
        Ok(fixture)
    }

    pub fn build(self) -> LoadedScene {
        let mut tree = ToolkitTree::new();
        for panel in self.toolkit {
            let root = tree.add_panel(&panel.name);
            let mut pending: Vec<(NodeId, ToolkitNodeSpec)> =
                panel.children.into_iter().rev().map(|c| (root, c)).collect();
            while let Some((parent, spec)) = pending.pop() {
                let mut node = spec.node;
                node.picking = spec.picking.unwrap_or(node.kind.default_picking());
                let id = tree.add_child(parent, node);
                pending.extend(spec.children.into_iter().rev().map(|c| (id, c)));
            }
        }

        let mut scene = SceneGraph::new();
        for canvas in self.legacy {
            let root = scene.add_canvas(&canvas.name);
            let mut pending: Vec<(NodeId, SceneObjectSpec)> =
                canvas.children.into_iter().rev().map(|c| (root, c)).collect();
            while let Some((parent, spec)) = pending.pop() {
                let id = scene.add_child(parent, spec.object);
                pending.extend(spec.children.into_iter().rev().map(|c| (id, c)));
            }
        }

        LoadedScene {
            toolkit: tree.into_shared(),
            legacy: scene.into_shared(),
        }
    }
}
