//! Binding slots and the wire layout shared with `shaders/raymarch.wgsl`.
//!
//! Any change to the field order or size of [`ShapeRecord`] must bump
//! [`SHAPE_LAYOUT_VERSION`] here and in the shader.

use bytemuck::{Pod, Zeroable};

use crate::{ComputeError, Kernel};

pub const SOURCE_TEXTURE: u32 = 0;
pub const DESTINATION_TEXTURE: u32 = 1;
pub const SHAPE_BUFFER: u32 = 2;
pub const FRAME_PARAMS: u32 = 3;

/// Edge length of a square compute workgroup, in pixels.
pub const THREAD_GROUP_SIZE: u32 = 8;

pub const SHAPE_LAYOUT_VERSION: u32 = 1;

/// Size in bytes of one packed shape record (11 floats, 3 ints).
pub const SHAPE_RECORD_SIZE: usize = 11 * 4 + 3 * 4;

const _: () = assert!(std::mem::size_of::<ShapeRecord>() == SHAPE_RECORD_SIZE);
const _: () = assert!(std::mem::size_of::<FrameParams>() == 160);

/// Return expected number of bindings for each kernel.
#[must_use]
pub const fn binding_count(kernel: &Kernel) -> u32 {
    match kernel {
        Kernel::RayMarch => 4,
    }
}

/// One shape as the ray-march kernel reads it from the storage buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ShapeRecord {
    pub position: [f32; 3],
    pub scale: [f32; 3],
    pub colour: [f32; 3],
    /// Shape specific scalar, e.g. a radius.
    pub extra: f32,
    pub shape_type: i32,
    pub operation: i32,
    /// Blend strength, already multiplied by the packing scale factor.
    pub blend_strength: f32,
    /// Number of records directly following this one that belong to its group.
    pub num_children: i32,
}

impl ShapeRecord {
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SHAPE_RECORD_SIZE] {
        let mut out = [0u8; SHAPE_RECORD_SIZE];
        out.copy_from_slice(bytemuck::bytes_of(self));
        out
    }

    /// Unpacks a single record.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::ShapeMismatch`] if `bytes` is not exactly one
    /// record long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ComputeError> {
        if bytes.len() != SHAPE_RECORD_SIZE {
            return Err(ComputeError::ShapeMismatch("shape record must be 56 bytes"));
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Unpacks a tightly packed array of records.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::ShapeMismatch`] if the length is not a multiple
    /// of the record size.
    pub fn slice_from_bytes(bytes: &[u8]) -> Result<Vec<Self>, ComputeError> {
        if bytes.len() % SHAPE_RECORD_SIZE != 0 {
            return Err(ComputeError::ShapeMismatch(
                "shape buffer length is not a multiple of the record size",
            ));
        }
        Ok(bytes
            .chunks_exact(SHAPE_RECORD_SIZE)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }
}

/// Per-frame uniform block.
///
/// Matrices are column-major, matching both `glam` and WGSL.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FrameParams {
    pub camera_to_world: [[f32; 4]; 4],
    pub inverse_projection: [[f32; 4]; 4],
    /// Light direction for directional lights, world position otherwise.
    pub light: [f32; 3],
    /// Non-zero when `light` is a position.
    pub position_light: u32,
    pub pixel_offset: [f32; 2],
    pub num_shapes: u32,
    pub layout_version: u32,
}

impl FrameParams {
    #[must_use]
    pub fn is_positional_light(&self) -> bool {
        self.position_light != 0
    }

    /// # Errors
    ///
    /// Returns [`ComputeError::ShapeMismatch`] if `bytes` is not one block long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ComputeError> {
        if bytes.len() != std::mem::size_of::<Self>() {
            return Err(ComputeError::ShapeMismatch("frame params block has the wrong size"));
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ShapeRecord {
        ShapeRecord {
            position: [1.5, -2.25, 3.0],
            scale: [0.5, 0.75, 1.0],
            colour: [0.1, 0.2, 0.3],
            extra: 0.4,
            shape_type: 2,
            operation: 1,
            blend_strength: 1.5,
            num_children: 3,
        }
    }

    #[test]
    fn record_round_trips_through_bytes() {
        let record = sample_record();
        let bytes = record.to_bytes();
        assert_eq!(bytes.len(), 56);
        assert_eq!(ShapeRecord::from_bytes(&bytes).unwrap(), record);
    }

    #[test]
    fn field_offsets_follow_the_wire_contract() {
        let bytes = sample_record().to_bytes();
        let f32_at = |offset: usize| f32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap());
        let i32_at = |offset: usize| i32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap());

        assert_eq!(f32_at(0), 1.5);
        assert_eq!(f32_at(12), 0.5);
        assert_eq!(f32_at(24), 0.1);
        assert_eq!(f32_at(36), 0.4);
        assert_eq!(i32_at(40), 2);
        assert_eq!(i32_at(44), 1);
        assert_eq!(f32_at(48), 1.5);
        assert_eq!(i32_at(52), 3);
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(matches!(
            ShapeRecord::from_bytes(&[0u8; 55]),
            Err(ComputeError::ShapeMismatch(_))
        ));
        assert!(ShapeRecord::slice_from_bytes(&[0u8; 57]).is_err());
    }

    #[test]
    fn slice_unpacks_in_order() {
        let mut second = sample_record();
        second.num_children = 0;
        let mut bytes = sample_record().to_bytes().to_vec();
        bytes.extend_from_slice(&second.to_bytes());

        let records = ShapeRecord::slice_from_bytes(&bytes).unwrap();
        assert_eq!(records, vec![sample_record(), second]);
        assert!(ShapeRecord::slice_from_bytes(&[]).unwrap().is_empty());
    }
}
