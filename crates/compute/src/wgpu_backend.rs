use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use wgpu::util::DeviceExt;

use crate::backend::{Binding, BufferId, BufferUsage, ComputeBackend, TextureId};
use crate::{layout, BufferView, ComputeError, Kernel, Texture2d};

const TEXEL_SIZE: u32 = 16; // rgba32float

struct GpuTexture {
    texture: wgpu::Texture,
    width: u32,
    height: u32,
}

#[derive(Default)]
struct Resources {
    next_id: u64,
    textures: HashMap<u64, GpuTexture>,
    buffers: HashMap<u64, wgpu::Buffer>,
}

impl Resources {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

struct KernelPipeline {
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

pub struct GpuBackend {
    #[allow(dead_code)] // kept alive for the lifetime of the device
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    // Pipeline cache - Mutex for interior mutability with &self in dispatch
    pipelines: Mutex<HashMap<Kernel, Arc<KernelPipeline>>>,
    resources: Mutex<Resources>,
}

impl GpuBackend {
    /// Opens the default adapter and device.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::BackendUnavailable`] when no adapter or device
    /// can be acquired.
    pub fn try_new() -> Result<Self, ComputeError> {
        let backends = wgpu::util::backend_bits_from_env().unwrap_or_else(wgpu::Backends::all);
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let adapter = pollster::block_on(wgpu::util::initialize_adapter_from_env_or_default(
            &instance,
            None,
        ))
        .ok_or(ComputeError::BackendUnavailable)?;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("raymarch-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|err| {
            tracing::error!("failed to request device: {err:?}");
            ComputeError::BackendUnavailable
        })?;

        tracing::info!(adapter = ?adapter.get_info().name, "gpu backend ready");
        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
            pipelines: Mutex::new(HashMap::new()),
            resources: Mutex::new(Resources::default()),
        })
    }

    #[must_use]
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    fn kernel_source(kernel: &Kernel) -> &'static str {
        match kernel {
            Kernel::RayMarch => include_str!("../shaders/raymarch.wgsl"),
        }
    }

    fn pipeline(&self, kernel: &Kernel) -> Arc<KernelPipeline> {
        let mut pipelines = self.pipelines.lock();
        if let Some(existing) = pipelines.get(kernel) {
            return Arc::clone(existing);
        }

        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("raymarch_shader"),
            source: wgpu::ShaderSource::Wgsl(Self::kernel_source(kernel).into()),
        });

        let bind_group_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("raymarch_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: layout::SOURCE_TEXTURE,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: layout::DESTINATION_TEXTURE,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba32Float,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: layout::SHAPE_BUFFER,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: layout::FRAME_PARAMS,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("raymarch_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("raymarch_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: kernel.entry_point(),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        });

        let entry = Arc::new(KernelPipeline { bind_group_layout, pipeline });
        pipelines.insert(*kernel, Arc::clone(&entry));
        entry
    }

    fn insert_texture(&self, texture: wgpu::Texture, width: u32, height: u32) -> TextureId {
        let mut resources = self.resources.lock();
        let id = resources.allocate_id();
        resources.textures.insert(id, GpuTexture { texture, width, height });
        TextureId(id)
    }
}

impl ComputeBackend for GpuBackend {
    fn create_target(&self, width: u32, height: u32) -> Result<TextureId, ComputeError> {
        if width == 0 || height == 0 {
            return Err(ComputeError::ShapeMismatch("render target must have a non-zero size"));
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("raymarch_target"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        Ok(self.insert_texture(texture, width, height))
    }

    fn upload_texture(&self, source: &Texture2d) -> Result<TextureId, ComputeError> {
        if source.width == 0 || source.height == 0 {
            return Err(ComputeError::ShapeMismatch("texture must have a non-zero size"));
        }
        let size = wgpu::Extent3d {
            width: source.width,
            height: source.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("raymarch_source"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            source.as_bytes(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(source.width * TEXEL_SIZE),
                rows_per_image: Some(source.height),
            },
            size,
        );
        Ok(self.insert_texture(texture, source.width, source.height))
    }

    fn release_texture(&self, id: TextureId) {
        if let Some(entry) = self.resources.lock().textures.remove(&id.0) {
            entry.texture.destroy();
        }
    }

    fn create_buffer(&self, usage: BufferUsage, view: &BufferView) -> Result<BufferId, ComputeError> {
        view.validate()?;
        // Zero-sized bindings are invalid; an empty shape buffer is padded to
        // one zeroed element and the kernel relies on the count uniform.
        let padded;
        let contents: &[u8] = if view.data.is_empty() {
            padded = vec![0u8; view.element_size_in_bytes.max(4)];
            &padded
        } else {
            &view.data
        };
        let usage = match usage {
            BufferUsage::Storage => wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        };
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("raymarch_buffer"),
            contents,
            usage,
        });

        let mut resources = self.resources.lock();
        let id = resources.allocate_id();
        resources.buffers.insert(id, buffer);
        Ok(BufferId(id))
    }

    fn release_buffer(&self, id: BufferId) {
        if let Some(buffer) = self.resources.lock().buffers.remove(&id.0) {
            buffer.destroy();
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
        let entry = self.pipeline(kernel);
        let resources = self.resources.lock();

        let mut views = Vec::with_capacity(binds.len());
        for bind in binds {
            if let Binding::Texture(id) = bind {
                let texture = resources.textures.get(&id.0).ok_or(ComputeError::UnknownResource(id.0))?;
                views.push(texture.texture.create_view(&wgpu::TextureViewDescriptor::default()));
            }
        }

        let mut entries = Vec::with_capacity(binds.len());
        let mut next_view = views.iter();
        for (slot, bind) in (0u32..).zip(binds) {
            let resource = match bind {
                Binding::Texture(_) => {
                    let view = next_view
                        .next()
                        .ok_or(ComputeError::ShapeMismatch("texture view missing"))?;
                    wgpu::BindingResource::TextureView(view)
                }
                Binding::Buffer(id) => resources
                    .buffers
                    .get(&id.0)
                    .ok_or(ComputeError::UnknownResource(id.0))?
                    .as_entire_binding(),
            };
            entries.push(wgpu::BindGroupEntry { binding: slot, resource });
        }

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("raymarch_bind_group"),
            layout: &entry.bind_group_layout,
            entries: &entries,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("raymarch_encoder"),
        });
        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("raymarch_pass"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(&entry.pipeline);
            cpass.set_bind_group(0, &bind_group, &[]);
            cpass.dispatch_workgroups(workgroups[0], workgroups[1], workgroups[2]);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn read_texture(&self, id: TextureId) -> Result<Texture2d, ComputeError> {
        let resources = self.resources.lock();
        let entry = resources.textures.get(&id.0).ok_or(ComputeError::UnknownResource(id.0))?;
        let (width, height) = (entry.width, entry.height);

        let unpadded_row = width * TEXEL_SIZE;
        let padded_row = unpadded_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size: u64::from(padded_row) * u64::from(height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback_encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &entry.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        self.queue.submit(Some(encoder.finish()));
        drop(resources);

        let slice = staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|err| ComputeError::Readback(err.to_string()))?
            .map_err(|err| ComputeError::Readback(err.to_string()))?;

        let texels = {
            let mapped = slice.get_mapped_range();
            let mut texels = Vec::with_capacity(width as usize * height as usize);
            for row in mapped.chunks_exact(padded_row as usize) {
                let row_bytes = &row[..unpadded_row as usize];
                texels.extend(row_bytes.chunks_exact(TEXEL_SIZE as usize).map(bytemuck::pod_read_unaligned::<[f32; 4]>));
            }
            texels
        };
        staging_buffer.unmap();

        Texture2d::from_texels(width, height, texels)
    }
}
