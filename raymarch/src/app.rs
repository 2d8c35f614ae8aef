//! Command implementations.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use compute::{ComputeBackend, CpuBackend, Kernel, Texture2d};
use render::{order_shapes, FrameRenderer, RenderConfig, Scene, SceneFile};
use tracing::info;

use crate::{output, watcher, BackendKind, RenderArgs};

const BACKGROUND: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

fn create_backend(kind: BackendKind) -> Result<Arc<dyn ComputeBackend>> {
    match kind {
        BackendKind::Cpu => Ok(Arc::new(CpuBackend::new())),
        #[cfg(feature = "gpu")]
        BackendKind::Gpu => {
            let backend = compute::GpuBackend::try_new().context("no usable GPU adapter")?;
            info!(adapter = %backend.adapter_info().name, "using wgpu backend");
            Ok(Arc::new(backend))
        }
        #[cfg(not(feature = "gpu"))]
        BackendKind::Gpu => bail!("raymarch was built without the `gpu` feature"),
    }
}

fn load_config(args: &RenderArgs) -> Result<RenderConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))?
        }
        None => RenderConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    Ok(config)
}

/// `render` command.
pub fn render(args: &RenderArgs) -> Result<()> {
    if args.frames == 0 {
        bail!("--frames must be at least 1");
    }
    let backend = create_backend(args.backend)?;
    let mut frames = FrameRenderer::new(backend, load_config(args)?)?.with_kernel(Kernel::RayMarch);

    render_scene(&mut frames, args)?;
    if args.watch {
        watcher::watch(&args.scene, || render_scene(&mut frames, args))?;
    }
    Ok(())
}

fn render_scene(frames: &mut FrameRenderer, args: &RenderArgs) -> Result<()> {
    let file = SceneFile::load(&args.scene)?;
    let scene = file.build_scene();
    let mut camera = file.camera()?;
    let light = file.light();
    let source = Texture2d::filled(camera.pixel_width, camera.pixel_height, BACKGROUND);

    let mut last = None;
    for _ in 0..args.frames {
        frames.update(&mut camera);
        last = Some(frames.render(&camera, light.as_ref(), &scene, &source)?);
    }
    let frame = last.context("no frame rendered")?;
    output::save_png(&frame, &args.out)?;

    if let Some(stats) = frames.last_frame() {
        info!(
            shapes = stats.num_shapes,
            width = frame.width,
            height = frame.height,
            out = %args.out.display(),
            "wrote frame"
        );
    }
    Ok(())
}

/// `inspect` command.
pub fn inspect(path: &Path) -> Result<()> {
    let scene = SceneFile::load(path)?.build_scene();
    print!("{}", shape_table(&scene));
    Ok(())
}

fn shape_table(scene: &Scene) -> String {
    let mut table = String::from("#   node                 type    op     children  blend\n");
    for (index, entry) in order_shapes(scene).iter().enumerate() {
        let Some(node) = scene.node(entry.node) else { continue };
        let Some(shape) = &node.shape else { continue };
        let indent = if node.parent.is_some() { "  " } else { "" };
        let _ = writeln!(
            table,
            "{index:<3} {:<20} {:<7} {:<6} {:<9} {:.2}",
            format!("{indent}{}", node.name),
            format!("{:?}", shape.shape_type).to_lowercase(),
            format!("{:?}", shape.operation).to_lowercase(),
            entry.num_children,
            shape.blend_strength * render::BLEND_STRENGTH_SCALE,
        );
    }
    table
}
