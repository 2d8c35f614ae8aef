//! Frame-scoped backend resources.

use compute::{BufferId, BufferUsage, BufferView, ComputeBackend, ComputeError, Texture2d, TextureId};
use tracing::trace;

/// Owns every resource created through it and releases them on drop, so a
/// frame that bails out early still returns its uploads to the backend.
pub struct TransientResources<'a> {
    backend: &'a dyn ComputeBackend,
    textures: Vec<TextureId>,
    buffers: Vec<BufferId>,
}

impl<'a> TransientResources<'a> {
    #[must_use]
    pub fn new(backend: &'a dyn ComputeBackend) -> Self {
        Self {
            backend,
            textures: Vec::new(),
            buffers: Vec::new(),
        }
    }

    /// # Errors
    ///
    /// Propagates the backend's upload error.
    pub fn upload_texture(&mut self, texture: &Texture2d) -> Result<TextureId, ComputeError> {
        let id = self.backend.upload_texture(texture)?;
        self.textures.push(id);
        Ok(id)
    }

    /// # Errors
    ///
    /// Propagates the backend's allocation error.
    pub fn create_buffer(&mut self, usage: BufferUsage, view: &BufferView) -> Result<BufferId, ComputeError> {
        let id = self.backend.create_buffer(usage, view)?;
        self.buffers.push(id);
        Ok(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len() + self.buffers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for TransientResources<'_> {
    fn drop(&mut self) {
        trace!(textures = self.textures.len(), buffers = self.buffers.len(), "releasing transients");
        for id in self.textures.drain(..) {
            self.backend.release_texture(id);
        }
        for id in self.buffers.drain(..) {
            self.backend.release_buffer(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute::CpuBackend;

    #[test]
    fn drop_releases_everything() {
        let backend = CpuBackend::new();
        {
            let mut scope = TransientResources::new(&backend);
            scope.upload_texture(&Texture2d::new(2, 2)).unwrap();
            scope.create_buffer(BufferUsage::Storage, &BufferView::from_slice(&[1u32, 2, 3])).unwrap();
            assert_eq!(scope.len(), 2);
            assert_eq!(backend.stats().live_buffers, 1);
        }
        let stats = backend.stats();
        assert_eq!(stats.live_textures, 0);
        assert_eq!(stats.live_buffers, 0);
        assert_eq!(stats.textures_released, 1);
        assert_eq!(stats.buffers_released, 1);
    }
}
