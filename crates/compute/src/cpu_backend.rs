use parking_lot::Mutex;
use std::collections::HashMap;

use crate::backend::{Binding, BufferId, BufferUsage, ComputeBackend, TextureId};
use crate::layout::{DESTINATION_TEXTURE, FRAME_PARAMS, SHAPE_BUFFER, SOURCE_TEXTURE};
use crate::{kernels, BufferView, ComputeError, FrameParams, Kernel, ShapeRecord, Texture2d};

/// One kernel invocation as seen by the [`CpuBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    pub kernel: Kernel,
    pub workgroups: [u32; 3],
    pub params: FrameParams,
    pub shapes: Vec<ShapeRecord>,
}

/// Allocation counters kept by the [`CpuBackend`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceStats {
    pub targets_created: usize,
    pub textures_uploaded: usize,
    pub textures_released: usize,
    pub buffers_created: usize,
    pub buffers_released: usize,
    pub live_textures: usize,
    pub live_buffers: usize,
    pub dispatches: Vec<DispatchRecord>,
}

struct StoredTexture {
    texture: Texture2d,
    writable: bool,
}

struct StoredBuffer {
    usage: BufferUsage,
    view: BufferView,
}

#[derive(Default)]
struct State {
    next_id: u64,
    textures: HashMap<u64, StoredTexture>,
    buffers: HashMap<u64, StoredBuffer>,
    stats: ResourceStats,
}

impl State {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn sync_live_counts(&mut self) {
        self.stats.live_textures = self.textures.len();
        self.stats.live_buffers = self.buffers.len();
    }
}

/// Host backend: executes kernels on the CPU and instruments every allocation.
#[derive(Default)]
pub struct CpuBackend {
    state: Mutex<State>,
}

impl CpuBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the allocation counters and dispatch log.
    #[must_use]
    pub fn stats(&self) -> ResourceStats {
        self.state.lock().stats.clone()
    }

    /// Clears the dispatch log, keeping resource counters intact.
    pub fn clear_dispatch_log(&self) {
        self.state.lock().stats.dispatches.clear();
    }
}

fn texture_slot(binds: &[Binding], slot: u32) -> Result<TextureId, ComputeError> {
    match binds.get(slot as usize) {
        Some(Binding::Texture(id)) => Ok(*id),
        _ => Err(ComputeError::ShapeMismatch("expected a texture binding")),
    }
}

fn buffer_slot(binds: &[Binding], slot: u32) -> Result<BufferId, ComputeError> {
    match binds.get(slot as usize) {
        Some(Binding::Buffer(id)) => Ok(*id),
        _ => Err(ComputeError::ShapeMismatch("expected a buffer binding")),
    }
}

impl ComputeBackend for CpuBackend {
    fn create_target(&self, width: u32, height: u32) -> Result<TextureId, ComputeError> {
        if width == 0 || height == 0 {
            return Err(ComputeError::ShapeMismatch("render target must have a non-zero size"));
        }
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.textures.insert(
            id,
            StoredTexture { texture: Texture2d::new(width, height), writable: true },
        );
        state.stats.targets_created += 1;
        state.sync_live_counts();
        Ok(TextureId(id))
    }

    fn upload_texture(&self, texture: &Texture2d) -> Result<TextureId, ComputeError> {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.textures.insert(id, StoredTexture { texture: texture.clone(), writable: false });
        state.stats.textures_uploaded += 1;
        state.sync_live_counts();
        Ok(TextureId(id))
    }

    fn release_texture(&self, id: TextureId) {
        let mut state = self.state.lock();
        if state.textures.remove(&id.0).is_some() {
            state.stats.textures_released += 1;
            state.sync_live_counts();
        }
    }

    fn create_buffer(&self, usage: BufferUsage, view: &BufferView) -> Result<BufferId, ComputeError> {
        view.validate()?;
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.buffers.insert(id, StoredBuffer { usage, view: view.clone() });
        state.stats.buffers_created += 1;
        state.sync_live_counts();
        Ok(BufferId(id))
    }

    fn release_buffer(&self, id: BufferId) {
        let mut state = self.state.lock();
        if state.buffers.remove(&id.0).is_some() {
            state.stats.buffers_released += 1;
            state.sync_live_counts();
        }
    }

    fn dispatch(
        &self,
        kernel: &Kernel,
        binds: &[Binding],
        workgroups: [u32; 3],
    ) -> Result<(), ComputeError> {
        if binds.len() != kernel.binding_count() as usize {
            return Err(ComputeError::ShapeMismatch("wrong number of bindings for kernel"));
        }

        match kernel {
            Kernel::RayMarch => {
                let source_id = texture_slot(binds, SOURCE_TEXTURE)?;
                let destination_id = texture_slot(binds, DESTINATION_TEXTURE)?;
                let shapes_id = buffer_slot(binds, SHAPE_BUFFER)?;
                let params_id = buffer_slot(binds, FRAME_PARAMS)?;

                let mut state = self.state.lock();

                let source = state
                    .textures
                    .get(&source_id.0)
                    .ok_or(ComputeError::UnknownResource(source_id.0))?
                    .texture
                    .clone();
                let shapes = match state.buffers.get(&shapes_id.0) {
                    Some(StoredBuffer { usage: BufferUsage::Storage, view }) => {
                        ShapeRecord::slice_from_bytes(&view.data)?
                    }
                    Some(_) => return Err(ComputeError::ShapeMismatch("shape buffer must be a storage buffer")),
                    None => return Err(ComputeError::UnknownResource(shapes_id.0)),
                };
                let params = match state.buffers.get(&params_id.0) {
                    Some(StoredBuffer { usage: BufferUsage::Uniform, view }) => FrameParams::from_bytes(&view.data)?,
                    Some(_) => return Err(ComputeError::ShapeMismatch("frame params must be a uniform buffer")),
                    None => return Err(ComputeError::UnknownResource(params_id.0)),
                };

                let destination = state
                    .textures
                    .get_mut(&destination_id.0)
                    .ok_or(ComputeError::UnknownResource(destination_id.0))?;
                if !destination.writable {
                    return Err(ComputeError::ShapeMismatch("destination texture is not a render target"));
                }
                kernels::handle_raymarch(&source, &mut destination.texture, &shapes, &params, workgroups)?;

                tracing::trace!(?workgroups, num_shapes = params.num_shapes, "cpu ray-march dispatched");
                state.stats.dispatches.push(DispatchRecord {
                    kernel: *kernel,
                    workgroups,
                    params,
                    shapes,
                });
                Ok(())
            }
        }
    }

    fn read_texture(&self, id: TextureId) -> Result<Texture2d, ComputeError> {
        self.state
            .lock()
            .textures
            .get(&id.0)
            .map(|stored| stored.texture.clone())
            .ok_or(ComputeError::UnknownResource(id.0))
    }
}
