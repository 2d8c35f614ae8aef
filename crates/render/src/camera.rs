//! Camera and light state consumed by the frame renderer.
//!
//! Both use a right-handed convention: a camera with identity rotation looks
//! down `-Z` with `+Y` up, and a light's forward direction is its rotation
//! applied to `-Z`.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::RenderError;

/// Perspective camera with a viewport size in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    rotation: Quat,
    /// Vertical field of view in radians.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    pub pixel_width: u32,
    pub pixel_height: u32,
    has_changed: bool,
}

impl Camera {
    #[must_use]
    pub fn new(position: Vec3, rotation: Quat, pixel_width: u32, pixel_height: u32) -> Self {
        Self {
            position,
            rotation,
            fovy: 60.0f32.to_radians(),
            znear: 0.1,
            zfar: 1000.0,
            pixel_width,
            pixel_height,
            has_changed: true,
        }
    }

    /// Camera at `eye` oriented towards `target` with `+Y` up. A camera
    /// looking straight up or down keeps `-Z` at the top of the frame.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Scene` if `eye` and `target` coincide or are not
    /// finite.
    pub fn looking_at(eye: Vec3, target: Vec3, pixel_width: u32, pixel_height: u32) -> Result<Self, RenderError> {
        let direction = (target - eye).normalize_or_zero();
        if direction == Vec3::ZERO || !eye.is_finite() {
            return Err(RenderError::Scene(format!(
                "camera at {eye} cannot look at {target}"
            )));
        }
        let up = if direction.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::NEG_Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_rh(eye, target, up);
        let rotation = Quat::from_mat4(&view.inverse()).normalize();
        Ok(Self::new(eye, rotation, pixel_width, pixel_height))
    }

    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.has_changed = true;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.has_changed = true;
    }

    /// Whether the transform changed since the flag was last cleared.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.has_changed
    }

    pub fn clear_changed(&mut self) {
        self.has_changed = false;
    }

    pub fn resize(&mut self, pixel_width: u32, pixel_height: u32) {
        self.pixel_width = pixel_width;
        self.pixel_height = pixel_height;
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect(&self) -> f32 {
        if self.pixel_height == 0 {
            1.0
        } else {
            self.pixel_width as f32 / self.pixel_height as f32
        }
    }

    #[must_use]
    pub fn camera_to_world(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    #[must_use]
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy, self.aspect(), self.znear, self.zfar)
    }

    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
    pub rotation: Quat,
}

impl Light {
    /// Directional light shining along `direction`.
    #[must_use]
    pub fn directional(direction: Vec3) -> Self {
        Self {
            kind: LightKind::Directional,
            position: Vec3::ZERO,
            rotation: rotation_towards(direction),
        }
    }

    #[must_use]
    pub fn point(position: Vec3) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            rotation: Quat::IDENTITY,
        }
    }

    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    #[must_use]
    pub fn is_directional(&self) -> bool {
        self.kind == LightKind::Directional
    }

    /// The vector uploaded to the kernel and whether it is a position.
    ///
    /// Directional lights upload their forward direction, every other kind
    /// uploads its world position.
    #[must_use]
    pub fn shader_vector(&self) -> (Vec3, bool) {
        if self.is_directional() {
            (self.forward(), false)
        } else {
            (self.position, true)
        }
    }
}

/// Rotation that points `-Z` along `direction`. A zero vector keeps the identity.
#[must_use]
pub fn rotation_towards(direction: Vec3) -> Quat {
    let dir = direction.normalize_or_zero();
    if dir == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_rotation_arc(Vec3::NEG_Z, dir)
    }
}
