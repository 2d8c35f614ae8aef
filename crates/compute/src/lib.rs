#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Compute backends for the ray-march frame pipeline.
//!
//! A backend owns GPU-side resources (render targets, uploaded textures and
//! buffers) and executes [`Kernel`] dispatches against them. The default
//! [`CpuBackend`] runs the kernels on the host and records every allocation
//! so callers can verify their resource discipline; the `gpu` feature adds a
//! `wgpu` implementation driven by `shaders/raymarch.wgsl`.

use std::sync::Arc;
use thiserror::Error;

pub mod backend;
#[cfg(feature = "cpu")]
pub mod cpu_backend;
pub mod kernels;
pub mod layout;
pub mod texture;
#[cfg(feature = "gpu")]
pub mod wgpu_backend;

pub use backend::{Binding, BufferId, BufferUsage, ComputeBackend, TextureId};
#[cfg(feature = "cpu")]
pub use cpu_backend::{CpuBackend, DispatchRecord, ResourceStats};
pub use layout::{FrameParams, ShapeRecord, SHAPE_LAYOUT_VERSION, THREAD_GROUP_SIZE};
pub use texture::Texture2d;
#[cfg(feature = "gpu")]
pub use wgpu_backend::GpuBackend;

#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("buffer shape mismatch: {0}")]
    ShapeMismatch(&'static str),
    #[error("backend not available")]
    BackendUnavailable,
    #[error("unknown resource handle {0}")]
    UnknownResource(u64),
    #[error("shape layout version mismatch: kernel expects {expected}, got {found}")]
    LayoutMismatch { expected: u32, found: u32 },
    #[error("failed to read back GPU data: {0}")]
    Readback(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Ray-marches the packed shape buffer into the destination texture.
    RayMarch,
}

impl Kernel {
    #[must_use]
    pub const fn binding_count(&self) -> u32 {
        layout::binding_count(self)
    }

    /// Entry point name of the kernel inside its WGSL module.
    #[must_use]
    pub const fn entry_point(&self) -> &'static str {
        match self {
            Kernel::RayMarch => "main",
        }
    }
}

#[derive(Clone, Debug)]
pub struct BufferView {
    pub data: Arc<[u8]>,
    pub shape: Vec<usize>, // Number of elements per dimension
    pub element_size_in_bytes: usize, // Size of a single element described by the innermost dimension of shape
}

impl BufferView {
    #[must_use]
    pub fn new(data: Arc<[u8]>, shape: Vec<usize>, element_size_in_bytes: usize) -> Self {
        Self { data, shape, element_size_in_bytes }
    }

    /// Builds a one-dimensional view over a slice of `Pod` elements.
    #[must_use]
    pub fn from_slice<T: bytemuck::Pod>(items: &[T]) -> Self {
        let data: Arc<[u8]> = bytemuck::cast_slice(items).to_vec().into();
        Self::new(data, vec![items.len()], std::mem::size_of::<T>())
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Checks that the byte length agrees with `shape` and the element size.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::ShapeMismatch`] when the lengths disagree.
    pub fn validate(&self) -> Result<(), ComputeError> {
        let expected_bytes = self.element_count() * self.element_size_in_bytes;
        if self.data.len() != expected_bytes {
            return Err(ComputeError::ShapeMismatch(
                "Buffer data length does not match product of shape dimensions and element size",
            ));
        }
        Ok(())
    }
}
