//! Per-frame driver: packs the scene, uploads parameters and dispatches the
//! ray-march kernel into a render target sized to the viewport.

use std::sync::Arc;

use compute::layout::{DESTINATION_TEXTURE, FRAME_PARAMS, SHAPE_BUFFER, SOURCE_TEXTURE};
use compute::{
    Binding, BufferUsage, BufferView, ComputeBackend, ComputeError, Kernel, Texture2d, TextureId,
    THREAD_GROUP_SIZE,
};
use tracing::{debug, info, warn};

use crate::camera::{Camera, Light};
use crate::collector::collect_shapes;
use crate::config::RenderConfig;
use crate::gpu_types::frame_params;
use crate::scene::Scene;
use crate::transient::TransientResources;
use crate::RenderError;

/// Workgroup counts covering a `width` x `height` viewport.
#[must_use]
pub fn dispatch_size(width: u32, height: u32) -> [u32; 3] {
    [width.div_ceil(THREAD_GROUP_SIZE), height.div_ceil(THREAD_GROUP_SIZE), 1]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RenderTarget {
    id: TextureId,
    width: u32,
    height: u32,
}

/// Progressive sample counter. Frames are presented as-is; the counter only
/// tracks how many frames the current camera pose has produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accumulation {
    pub current_sample: u32,
}

impl Accumulation {
    pub fn reset(&mut self) {
        self.current_sample = 0;
    }

    fn advance(&mut self) {
        self.current_sample = self.current_sample.saturating_add(1);
    }
}

/// Summary of the most recent frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStats {
    pub num_shapes: usize,
    pub workgroups: [u32; 3],
    pub jitter: [f32; 2],
    /// Whether the render target had to be (re)allocated.
    pub reallocated: bool,
    pub sample: u32,
}

pub struct FrameRenderer {
    backend: Arc<dyn ComputeBackend>,
    kernel: Option<Kernel>,
    config: RenderConfig,
    target: Option<RenderTarget>,
    rng: fastrand::Rng,
    accumulation: Accumulation,
    last_frame: Option<FrameStats>,
}

impl FrameRenderer {
    /// Creates a renderer with no kernel assigned.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Config` if `config` is invalid.
    pub fn new(backend: Arc<dyn ComputeBackend>, config: RenderConfig) -> Result<Self, RenderError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Ok(Self {
            backend,
            kernel: None,
            config,
            target: None,
            rng,
            accumulation: Accumulation::default(),
            last_frame: None,
        })
    }

    #[must_use]
    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = Some(kernel);
        self
    }

    pub fn set_kernel(&mut self, kernel: Option<Kernel>) {
        self.kernel = kernel;
    }

    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    #[must_use]
    pub fn accumulation(&self) -> Accumulation {
        self.accumulation
    }

    #[must_use]
    pub fn last_frame(&self) -> Option<&FrameStats> {
        self.last_frame.as_ref()
    }

    /// Size of the current render target, if one is allocated.
    #[must_use]
    pub fn target_size(&self) -> Option<(u32, u32)> {
        self.target.map(|t| (t.width, t.height))
    }

    /// Restarts accumulation when the camera moved since the last call.
    pub fn update(&mut self, camera: &mut Camera) {
        if camera.has_changed() {
            self.accumulation.reset();
            camera.clear_changed();
        }
    }

    /// Renders one frame of `scene` over `source` and returns the result.
    ///
    /// # Errors
    ///
    /// Fails without dispatching when no kernel or light is assigned or the
    /// viewport is empty. Backend failures are propagated as
    /// `RenderError::Compute`. Per-frame uploads are released in every case.
    pub fn render(
        &mut self,
        camera: &Camera,
        light: Option<&Light>,
        scene: &Scene,
        source: &Texture2d,
    ) -> Result<Texture2d, RenderError> {
        let kernel = self.kernel.ok_or(RenderError::ShaderNotAssigned)?;
        let light = light.ok_or(RenderError::NoLightSource)?;
        let (width, height) = (camera.pixel_width, camera.pixel_height);
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        if (source.width, source.height) != (width, height) {
            return Err(ComputeError::ShapeMismatch("source surface does not match the viewport").into());
        }

        let reallocated = self.ensure_target(width, height)?;
        let target = self
            .target
            .ok_or(ComputeError::ShapeMismatch("render target missing after allocation"))?;

        let records = collect_shapes(scene);
        if records.is_empty() {
            warn!("scene has no shapes, rendering background only");
        }
        let jitter = [self.sample_jitter(), self.sample_jitter()];
        let num_shapes = u32::try_from(records.len())
            .map_err(|_| ComputeError::ShapeMismatch("too many shapes for one frame"))?;
        let params = frame_params(camera, light, num_shapes, jitter);

        let backend = Arc::clone(&self.backend);
        let mut transients = TransientResources::new(backend.as_ref());
        let source_id = transients.upload_texture(source)?;
        let shapes_id = transients.create_buffer(BufferUsage::Storage, &BufferView::from_slice(&records))?;
        let params_id = transients.create_buffer(BufferUsage::Uniform, &BufferView::from_slice(&[params]))?;

        let mut binds = [Binding::Texture(source_id); 4];
        binds[SOURCE_TEXTURE as usize] = Binding::Texture(source_id);
        binds[DESTINATION_TEXTURE as usize] = Binding::Texture(target.id);
        binds[SHAPE_BUFFER as usize] = Binding::Buffer(shapes_id);
        binds[FRAME_PARAMS as usize] = Binding::Buffer(params_id);

        let workgroups = dispatch_size(width, height);
        backend.dispatch(&kernel, &binds, workgroups)?;
        let frame = backend.read_texture(target.id)?;
        drop(transients);

        self.accumulation.advance();
        let stats = FrameStats {
            num_shapes: records.len(),
            workgroups,
            jitter,
            reallocated,
            sample: self.accumulation.current_sample,
        };
        debug!(?stats, "frame rendered");
        self.last_frame = Some(stats);
        Ok(frame)
    }

    fn ensure_target(&mut self, width: u32, height: u32) -> Result<bool, RenderError> {
        if let Some(target) = self.target {
            if target.width == width && target.height == height {
                return Ok(false);
            }
            self.backend.release_texture(target.id);
            self.target = None;
        }
        let id = self.backend.create_target(width, height)?;
        info!(width, height, "allocated render target");
        self.target = Some(RenderTarget { id, width, height });
        Ok(true)
    }

    /// Uniform sample strictly inside `(jitter_min, jitter_max)`.
    fn sample_jitter(&mut self) -> f32 {
        let RenderConfig { jitter_min, jitter_max, .. } = self.config;
        loop {
            let jitter = jitter_min + (jitter_max - jitter_min) * self.rng.f32();
            // rng.f32() can return 0.0 and rounding can land on either bound
            if jitter > jitter_min && jitter < jitter_max {
                return jitter;
            }
        }
    }
}

impl Drop for FrameRenderer {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            self.backend.release_texture(target.id);
        }
    }
}
