//! Conversions from scene types to the kernel's wire layout.

use compute::{FrameParams, ShapeRecord, SHAPE_LAYOUT_VERSION};

use crate::camera::{Camera, Light};
use crate::collector::BLEND_STRENGTH_SCALE;
use crate::shape::Shape;

/// Packs one shape. Alpha is dropped and the blend strength is scaled.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn pack_shape(shape: &Shape, num_children: usize) -> ShapeRecord {
    let [r, g, b, _] = shape.colour;
    ShapeRecord {
        position: shape.position.to_array(),
        scale: shape.scale.to_array(),
        colour: [r, g, b],
        extra: shape.radius,
        shape_type: shape.shape_type as i32,
        operation: shape.operation as i32,
        blend_strength: shape.blend_strength * BLEND_STRENGTH_SCALE,
        num_children: num_children as i32,
    }
}

/// Builds the per-frame uniform block.
#[must_use]
pub fn frame_params(camera: &Camera, light: &Light, num_shapes: u32, jitter: [f32; 2]) -> FrameParams {
    let (light_vector, positional) = light.shader_vector();
    FrameParams {
        camera_to_world: camera.camera_to_world().to_cols_array_2d(),
        inverse_projection: camera.projection().inverse().to_cols_array_2d(),
        light: light_vector.to_array(),
        position_light: u32::from(positional),
        pixel_offset: jitter,
        num_shapes,
        layout_version: SHAPE_LAYOUT_VERSION,
    }
}
