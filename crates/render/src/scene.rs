//! Scene graph holding shape entities.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Insertion order is
//! the discovery order the collector enumerates shapes in. Scene files are
//! JSON documents with a nested object tree plus the camera and light.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::{Camera, Light, LightKind};
use crate::shape::Shape;
use crate::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Nodes without a shape are plain transforms.
    pub shape: Option<Shape>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    nodes: Vec<SceneNode>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, name: impl Into<String>, shape: Option<Shape>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            shape,
        });
        id
    }

    /// Appends a node under `parent`.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Scene` if `parent` is not a node of this scene.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        shape: Option<Shape>,
    ) -> Result<NodeId, RenderError> {
        if parent.0 >= self.nodes.len() {
            return Err(RenderError::Scene(format!("unknown parent node {}", parent.0)));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name: name.into(),
            parent: Some(parent),
            children: Vec::new(),
            shape,
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every shape-bearing node in discovery order.
    pub fn shapes(&self) -> impl Iterator<Item = (NodeId, &Shape)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, node)| node.shape.as_ref().map(|shape| (NodeId(i), shape)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDesc {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraDesc {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            fov: 60.0,
            width: 640,
            height: 360,
        }
    }
}

impl CameraDesc {
    /// # Errors
    ///
    /// Returns `RenderError::Scene` if the camera looks at its own position.
    pub fn to_camera(&self) -> Result<Camera, RenderError> {
        let mut camera = Camera::looking_at(self.position, self.target, self.width, self.height)?;
        camera.fovy = self.fov.to_radians();
        Ok(camera)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightDesc {
    pub kind: LightKind,
    #[serde(default)]
    pub position: Vec3,
    /// Direction the light points in; used by directional and spot lights.
    #[serde(default = "default_light_direction")]
    pub direction: Vec3,
}

fn default_light_direction() -> Vec3 {
    Vec3::NEG_Y
}

impl LightDesc {
    #[must_use]
    pub fn to_light(&self) -> Light {
        let mut light = Light::directional(self.direction);
        light.kind = self.kind;
        light.position = self.position;
        light
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDesc {
    pub name: String,
    #[serde(default)]
    pub shape: Option<Shape>,
    #[serde(default)]
    pub children: Vec<ObjectDesc>,
}

/// On-disk scene description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneFile {
    pub camera: CameraDesc,
    pub light: Option<LightDesc>,
    pub objects: Vec<ObjectDesc>,
}

impl SceneFile {
    /// # Errors
    ///
    /// Returns `RenderError::Scene` if the document is not a valid scene.
    pub fn from_json(text: &str) -> Result<Self, RenderError> {
        serde_json::from_str(text).map_err(|e| RenderError::Scene(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns `RenderError::Scene` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RenderError::Scene(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Builds the node arena, adding objects depth-first in file order.
    #[must_use]
    pub fn build_scene(&self) -> Scene {
        let mut scene = Scene::new();
        for object in &self.objects {
            let id = scene.add_root(object.name.clone(), object.shape.clone());
            add_children(&mut scene, id, &object.children);
        }
        scene
    }

    /// # Errors
    ///
    /// Returns `RenderError::Scene` if the described camera is degenerate.
    pub fn camera(&self) -> Result<Camera, RenderError> {
        self.camera.to_camera()
    }

    #[must_use]
    pub fn light(&self) -> Option<Light> {
        self.light.as_ref().map(LightDesc::to_light)
    }
}

fn add_children(scene: &mut Scene, parent: NodeId, children: &[ObjectDesc]) {
    for child in children {
        // parent was just inserted, so this cannot fail
        if let Ok(id) = scene.add_child(parent, child.name.clone(), child.shape.clone()) {
            add_children(scene, id, &child.children);
        }
    }
}
