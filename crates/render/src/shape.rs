//! Shape entities authored in a scene.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Primitive evaluated by the ray-marcher. Discriminants are the wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeType {
    #[default]
    Sphere = 0,
    Cube = 1,
    Torus = 2,
}

/// How a shape is combined with the surfaces before it. Shapes are sorted by
/// the discriminant before packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Nearest surface wins.
    #[default]
    Union = 0,
    /// Smooth union controlled by the blend strength.
    Blend = 1,
    /// Subtracts this shape from the previous result.
    Cut = 2,
    /// Keeps only the overlap with the previous result.
    Mask = 3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shape {
    pub position: Vec3,
    pub scale: Vec3,
    /// RGBA; alpha is not used by the ray-marcher.
    pub colour: [f32; 4],
    /// Sphere radius, or tube radius of a torus.
    pub radius: f32,
    #[serde(rename = "type")]
    pub shape_type: ShapeType,
    pub operation: Operation,
    pub blend_strength: f32,
}

impl Default for Shape {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            colour: [1.0, 1.0, 1.0, 1.0],
            radius: 0.5,
            shape_type: ShapeType::Sphere,
            operation: Operation::Union,
            blend_strength: 0.0,
        }
    }
}

impl Shape {
    #[must_use]
    pub fn sphere(position: Vec3, radius: f32) -> Self {
        Self { position, radius, ..Self::default() }
    }

    #[must_use]
    pub fn cube(position: Vec3, half_extents: Vec3) -> Self {
        Self {
            position,
            scale: half_extents,
            shape_type: ShapeType::Cube,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn torus(position: Vec3, ring_radius: f32, tube_radius: f32) -> Self {
        Self {
            position,
            scale: Vec3::splat(ring_radius),
            radius: tube_radius,
            shape_type: ShapeType::Torus,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    #[must_use]
    pub fn with_blend_strength(mut self, blend_strength: f32) -> Self {
        self.blend_strength = blend_strength;
        self
    }

    #[must_use]
    pub fn with_colour(mut self, colour: [f32; 4]) -> Self {
        self.colour = colour;
        self
    }
}
