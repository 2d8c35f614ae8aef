use crate::{BufferView, ComputeError, Kernel, Texture2d};

/// Handle to a texture owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Handle to a buffer owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Read-only structured buffer.
    Storage,
    /// Small constant block.
    Uniform,
}

/// A resource bound to one kernel slot. The slot index is the position in
/// the slice passed to [`ComputeBackend::dispatch`], see [`crate::layout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Texture(TextureId),
    Buffer(BufferId),
}

pub trait ComputeBackend: Send + Sync + 'static {
    /// Allocates a writable RGBA32F texture the kernel can store into.
    ///
    /// # Errors
    ///
    /// Returns `ComputeError::ShapeMismatch` for a zero-sized target, or a
    /// backend error if the allocation fails.
    fn create_target(&self, width: u32, height: u32) -> Result<TextureId, ComputeError>;

    /// Uploads a read-only texture.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the upload fails.
    fn upload_texture(&self, texture: &Texture2d) -> Result<TextureId, ComputeError>;

    /// Frees a texture. Releasing an unknown handle is a no-op.
    fn release_texture(&self, id: TextureId);

    /// Uploads `view` into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns `ComputeError::ShapeMismatch` if the view is inconsistent.
    fn create_buffer(&self, usage: BufferUsage, view: &BufferView) -> Result<BufferId, ComputeError>;

    /// Frees a buffer. Releasing an unknown handle is a no-op.
    fn release_buffer(&self, id: BufferId);

    /// Dispatches a compute kernel with the given bindings and workgroup configuration.
    ///
    /// # Arguments
    /// * `kernel`: The kernel to dispatch.
    /// * `binds`: One entry per binding slot, in slot order.
    /// * `workgroups`: The number of workgroups to dispatch.
    ///
    /// # Errors
    ///
    /// Returns `ComputeError::ShapeMismatch` if the bindings do not fit the
    /// kernel. May return other `ComputeError` variants depending on the
    /// backend implementation.
    fn dispatch(
        &self,
        kernel: &Kernel,
        binds: &[Binding],
        workgroups: [u32; 3],
    ) -> Result<(), ComputeError>;

    /// Copies a texture back to host memory. Blocks until prior dispatches
    /// writing to it have completed.
    ///
    /// # Errors
    ///
    /// Returns `ComputeError::UnknownResource` for a released or foreign
    /// handle, `ComputeError::Readback` if the copy cannot be mapped.
    fn read_texture(&self, id: TextureId) -> Result<Texture2d, ComputeError>;
}
