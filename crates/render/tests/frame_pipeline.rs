use std::sync::Arc;

use compute::{
    Binding, BufferId, BufferUsage, BufferView, ComputeBackend, ComputeError, CpuBackend, Kernel,
    Texture2d, TextureId,
};
use glam::Vec3;
use render::{
    Camera, FrameRenderer, Light, Operation, RenderConfig, RenderError, Scene, Shape,
};

const BACKGROUND: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

fn sphere_scene() -> Scene {
    let mut scene = Scene::new();
    scene.add_root("ball", Some(Shape::sphere(Vec3::ZERO, 1.0)));
    scene
}

fn camera(width: u32, height: u32) -> Camera {
    Camera::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, width, height).unwrap()
}

fn renderer(backend: Arc<dyn ComputeBackend>) -> FrameRenderer {
    FrameRenderer::new(backend, RenderConfig::default().with_seed(11))
        .unwrap()
        .with_kernel(Kernel::RayMarch)
}

#[test]
fn renders_a_lit_sphere_over_the_source() {
    let backend = Arc::new(CpuBackend::new());
    let mut frames = renderer(backend.clone());
    let light = Light::directional(Vec3::NEG_Z);
    let source = Texture2d::filled(16, 16, BACKGROUND);

    let frame = frames.render(&camera(16, 16), Some(&light), &sphere_scene(), &source).unwrap();

    let centre = frame.get(8, 8).unwrap();
    assert!(centre[0] > 0.8, "centre should face the light, got {centre:?}");
    assert_eq!(centre[3], 1.0);
    assert_eq!(frame.get(0, 0).unwrap(), BACKGROUND);
}

#[test]
fn top_down_camera_still_hits_the_scene() {
    let backend = Arc::new(CpuBackend::new());
    let mut frames = renderer(backend);
    let overhead = Camera::looking_at(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, 16, 16).unwrap();
    let light = Light::directional(Vec3::NEG_Y);
    let source = Texture2d::filled(16, 16, BACKGROUND);

    let frame = frames.render(&overhead, Some(&light), &sphere_scene(), &source).unwrap();

    let centre = frame.get(8, 8).unwrap();
    assert!(centre[0] > 0.8, "sphere top should be lit, got {centre:?}");
    assert_eq!(frame.get(0, 0).unwrap(), BACKGROUND);
}

#[test]
fn target_reallocated_only_on_resize() {
    let backend = Arc::new(CpuBackend::new());
    let mut frames = renderer(backend.clone());
    let light = Light::point(Vec3::new(0.0, 5.0, 5.0));
    let scene = sphere_scene();

    frames.render(&camera(8, 8), Some(&light), &scene, &Texture2d::new(8, 8)).unwrap();
    assert!(frames.last_frame().unwrap().reallocated);
    frames.render(&camera(8, 8), Some(&light), &scene, &Texture2d::new(8, 8)).unwrap();
    assert!(!frames.last_frame().unwrap().reallocated);
    assert_eq!(backend.stats().targets_created, 1);

    frames.render(&camera(16, 8), Some(&light), &scene, &Texture2d::new(16, 8)).unwrap();
    let stats = backend.stats();
    assert_eq!(stats.targets_created, 2);
    // old target released, new one live
    assert_eq!(stats.live_textures, 1);
    assert_eq!(frames.target_size(), Some((16, 8)));

    frames.render(&camera(16, 16), Some(&light), &scene, &Texture2d::new(16, 16)).unwrap();
    assert!(frames.last_frame().unwrap().reallocated);
    let stats = backend.stats();
    assert_eq!(stats.targets_created, 3);
    assert_eq!(stats.live_textures, 1);
    assert_eq!(frames.target_size(), Some((16, 16)));

    drop(frames);
    assert_eq!(backend.stats().live_textures, 0);
}

#[test]
fn full_hd_dispatch_size() {
    let backend = Arc::new(CpuBackend::new());
    let mut frames = renderer(backend.clone());
    let light = Light::directional(Vec3::NEG_Y);

    frames
        .render(&camera(1920, 1080), Some(&light), &Scene::new(), &Texture2d::new(1920, 1080))
        .unwrap();

    assert_eq!(frames.last_frame().unwrap().workgroups, [240, 135, 1]);
    assert_eq!(backend.stats().dispatches[0].workgroups, [240, 135, 1]);
}

#[test]
fn light_kind_selects_uploaded_vector() {
    let backend = Arc::new(CpuBackend::new());
    let mut frames = renderer(backend.clone());
    let scene = sphere_scene();
    let source = Texture2d::new(8, 8);

    let sun = Light::directional(Vec3::new(0.0, -1.0, 0.0));
    frames.render(&camera(8, 8), Some(&sun), &scene, &source).unwrap();
    let lamp = Light::point(Vec3::new(1.0, 2.0, 3.0));
    frames.render(&camera(8, 8), Some(&lamp), &scene, &source).unwrap();

    let dispatches = backend.stats().dispatches;
    assert_eq!(dispatches[0].params.position_light, 0);
    assert!((Vec3::from(dispatches[0].params.light) - Vec3::NEG_Y).length() < 1e-5);
    assert_eq!(dispatches[1].params.position_light, 1);
    assert_eq!(dispatches[1].params.light, [1.0, 2.0, 3.0]);
}

#[test]
fn empty_scene_still_dispatches() {
    let backend = Arc::new(CpuBackend::new());
    let mut frames = renderer(backend.clone());
    let light = Light::directional(Vec3::NEG_Z);
    let source = Texture2d::filled(8, 8, [0.25, 0.5, 0.75, 1.0]);

    let frame = frames.render(&camera(8, 8), Some(&light), &Scene::new(), &source).unwrap();

    let dispatches = backend.stats().dispatches;
    assert_eq!(dispatches.len(), 1);
    assert_eq!(dispatches[0].params.num_shapes, 0);
    assert!(dispatches[0].shapes.is_empty());
    assert_eq!(frame, source);
}

#[test]
fn uploaded_records_follow_collection_order() {
    let backend = Arc::new(CpuBackend::new());
    let mut frames = renderer(backend.clone());
    let mut scene = Scene::new();
    scene.add_root("cutter", Some(Shape::cube(Vec3::ZERO, Vec3::splat(0.5)).with_operation(Operation::Cut)));
    let body = scene.add_root("body", Some(Shape::sphere(Vec3::ZERO, 1.0)));
    scene.add_child(body, "bump", Some(Shape::sphere(Vec3::X, 0.3))).unwrap();

    frames
        .render(&camera(8, 8), Some(&Light::directional(Vec3::NEG_Z)), &scene, &Texture2d::new(8, 8))
        .unwrap();

    let shapes = &backend.stats().dispatches[0].shapes;
    let ops: Vec<_> = shapes.iter().map(|s| s.operation).collect();
    assert_eq!(ops, vec![0, 0, 2]);
    assert_eq!(shapes[0].num_children, 1);
    assert_eq!(backend.stats().dispatches[0].params.num_shapes, 3);
}

#[test]
fn transients_released_after_each_frame() {
    let backend = Arc::new(CpuBackend::new());
    let mut frames = renderer(backend.clone());
    let light = Light::directional(Vec3::NEG_Z);
    for _ in 0..3 {
        frames.render(&camera(8, 8), Some(&light), &sphere_scene(), &Texture2d::new(8, 8)).unwrap();
    }
    let stats = backend.stats();
    assert_eq!(stats.buffers_created, 6);
    assert_eq!(stats.buffers_released, 6);
    assert_eq!(stats.live_buffers, 0);
    // only the render target survives the frame
    assert_eq!(stats.live_textures, 1);
}

/// Forwards to a [`CpuBackend`] but fails every dispatch.
struct FailingDispatch(Arc<CpuBackend>);

impl ComputeBackend for FailingDispatch {
    fn create_target(&self, width: u32, height: u32) -> Result<TextureId, ComputeError> {
        self.0.create_target(width, height)
    }
    fn upload_texture(&self, texture: &Texture2d) -> Result<TextureId, ComputeError> {
        self.0.upload_texture(texture)
    }
    fn release_texture(&self, id: TextureId) {
        self.0.release_texture(id);
    }
    fn create_buffer(&self, usage: BufferUsage, view: &BufferView) -> Result<BufferId, ComputeError> {
        self.0.create_buffer(usage, view)
    }
    fn release_buffer(&self, id: BufferId) {
        self.0.release_buffer(id);
    }
    fn dispatch(&self, _: &Kernel, _: &[Binding], _: [u32; 3]) -> Result<(), ComputeError> {
        Err(ComputeError::BackendUnavailable)
    }
    fn read_texture(&self, id: TextureId) -> Result<Texture2d, ComputeError> {
        self.0.read_texture(id)
    }
}

#[test]
fn transients_released_when_dispatch_fails() {
    let inner = Arc::new(CpuBackend::new());
    let mut frames = renderer(Arc::new(FailingDispatch(inner.clone())));

    let result = frames.render(
        &camera(8, 8),
        Some(&Light::directional(Vec3::NEG_Z)),
        &sphere_scene(),
        &Texture2d::new(8, 8),
    );

    assert!(matches!(result, Err(RenderError::Compute(ComputeError::BackendUnavailable))));
    let stats = inner.stats();
    assert_eq!(stats.textures_uploaded, 1);
    assert_eq!(stats.textures_released, 1);
    assert_eq!(stats.buffers_created, 2);
    assert_eq!(stats.live_buffers, 0);
    assert!(frames.last_frame().is_none());
}

#[test]
fn missing_light_or_kernel_fails_before_dispatch() {
    let backend = Arc::new(CpuBackend::new());
    let source = Texture2d::new(8, 8);

    let mut unassigned = FrameRenderer::new(backend.clone(), RenderConfig::default()).unwrap();
    let light = Light::directional(Vec3::NEG_Z);
    assert!(matches!(
        unassigned.render(&camera(8, 8), Some(&light), &sphere_scene(), &source),
        Err(RenderError::ShaderNotAssigned)
    ));

    let mut frames = renderer(backend.clone());
    assert!(matches!(
        frames.render(&camera(8, 8), None, &sphere_scene(), &source),
        Err(RenderError::NoLightSource)
    ));

    assert!(matches!(
        frames.render(&camera(0, 8), Some(&light), &sphere_scene(), &source),
        Err(RenderError::InvalidViewport { width: 0, height: 8 })
    ));

    let stats = backend.stats();
    assert!(stats.dispatches.is_empty());
    assert_eq!(stats.targets_created, 0);
}

#[test]
fn camera_motion_resets_accumulation() {
    let backend = Arc::new(CpuBackend::new());
    let mut frames = renderer(backend);
    let mut cam = camera(8, 8);
    let light = Light::directional(Vec3::NEG_Z);
    let source = Texture2d::new(8, 8);

    frames.update(&mut cam);
    assert!(!cam.has_changed());
    frames.render(&cam, Some(&light), &Scene::new(), &source).unwrap();
    frames.render(&cam, Some(&light), &Scene::new(), &source).unwrap();
    assert_eq!(frames.accumulation().current_sample, 2);

    // unchanged camera keeps counting
    frames.update(&mut cam);
    assert_eq!(frames.accumulation().current_sample, 2);

    cam.set_position(Vec3::new(0.0, 1.0, 5.0));
    frames.update(&mut cam);
    assert_eq!(frames.accumulation().current_sample, 0);
    assert!(!cam.has_changed());
}

#[test]
fn jitter_stays_in_range_and_is_seeded() {
    let light = Light::directional(Vec3::NEG_Z);
    let source = Texture2d::new(8, 8);
    let run = |seed: u64| {
        let config = RenderConfig::default().with_seed(seed);
        let mut frames = FrameRenderer::new(Arc::new(CpuBackend::new()), config)
            .unwrap()
            .with_kernel(Kernel::RayMarch);
        (0..20)
            .map(|_| {
                frames.render(&camera(8, 8), Some(&light), &Scene::new(), &source).unwrap();
                frames.last_frame().unwrap().jitter
            })
            .collect::<Vec<_>>()
    };

    let first = run(3);
    assert_eq!(first, run(3));
    for [x, y] in first {
        assert!(x > 0.1 && x < 0.9 && y > 0.1 && y < 0.9);
    }
}
