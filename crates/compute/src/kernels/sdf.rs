//! Signed distance functions and the boolean combine rules of the ray-marcher.
//!
//! These mirror the functions of the same name in `shaders/raymarch.wgsl`.

use glam::{Vec2, Vec3};

use crate::ShapeRecord;

pub const SHAPE_SPHERE: i32 = 0;
pub const SHAPE_CUBE: i32 = 1;
pub const SHAPE_TORUS: i32 = 2;

pub const OP_UNION: i32 = 0;
pub const OP_BLEND: i32 = 1;
pub const OP_CUT: i32 = 2;
pub const OP_MASK: i32 = 3;

/// Distance and colour of the closest surface found so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub distance: f32,
    pub colour: Vec3,
}

impl SurfaceSample {
    #[must_use]
    pub const fn new(distance: f32, colour: Vec3) -> Self {
        Self { distance, colour }
    }
}

#[must_use]
pub fn sphere_distance(eye: Vec3, centre: Vec3, radius: f32) -> f32 {
    eye.distance(centre) - radius
}

#[must_use]
pub fn cube_distance(eye: Vec3, centre: Vec3, half_size: Vec3) -> f32 {
    let o = (eye - centre).abs() - half_size;
    let outside = o.max(Vec3::ZERO).length();
    let inside = o.x.max(o.y).max(o.z).min(0.0);
    outside + inside
}

#[must_use]
pub fn torus_distance(eye: Vec3, centre: Vec3, major_radius: f32, minor_radius: f32) -> f32 {
    let p = eye - centre;
    let q = Vec2::new(Vec2::new(p.x, p.z).length() - major_radius, p.y);
    q.length() - minor_radius
}

/// Distance from `eye` to a single packed shape.
///
/// Spheres use `extra` as radius, cubes use `scale` as half extents, tori use
/// `scale.x` as the ring radius and `extra` as the tube radius. Unknown shape
/// types never produce a surface.
#[must_use]
pub fn shape_distance(shape: &ShapeRecord, eye: Vec3) -> f32 {
    let centre = Vec3::from(shape.position);
    match shape.shape_type {
        SHAPE_SPHERE => sphere_distance(eye, centre, shape.extra),
        SHAPE_CUBE => cube_distance(eye, centre, Vec3::from(shape.scale)),
        SHAPE_TORUS => torus_distance(eye, centre, shape.scale[0], shape.extra),
        _ => f32::MAX,
    }
}

/// Polynomial smooth minimum of two surfaces, blending colour by the same weight.
#[must_use]
pub fn blend(a: SurfaceSample, b: SurfaceSample, k: f32) -> SurfaceSample {
    let h = (0.5 + 0.5 * (b.distance - a.distance) / k).clamp(0.0, 1.0);
    let distance = b.distance + (a.distance - b.distance) * h - k * h * (1.0 - h);
    let colour = b.colour.lerp(a.colour, h);
    SurfaceSample::new(distance, colour)
}

/// Combines surface `b` into `a` using the boolean `operation` of `b`.
#[must_use]
pub fn combine(a: SurfaceSample, b: SurfaceSample, operation: i32, blend_strength: f32) -> SurfaceSample {
    match operation {
        OP_BLEND if blend_strength > 0.0 => blend(a, b, blend_strength),
        OP_UNION | OP_BLEND => {
            if b.distance < a.distance {
                b
            } else {
                a
            }
        }
        OP_CUT => {
            if -b.distance > a.distance {
                SurfaceSample::new(-b.distance, b.colour)
            } else {
                a
            }
        }
        OP_MASK => {
            if b.distance > a.distance {
                b
            } else {
                a
            }
        }
        _ => a,
    }
}

/// Evaluates the whole packed scene at `eye`.
///
/// Each top-level record is first combined with the `num_children` records
/// that follow it, then the group is combined into the running result with
/// the top-level record's operation. Child counts that overrun the buffer are
/// clamped to its end.
#[must_use]
pub fn scene_sample(shapes: &[ShapeRecord], eye: Vec3, max_distance: f32) -> SurfaceSample {
    let mut global = SurfaceSample::new(max_distance, Vec3::ONE);
    let mut index = 0;
    while index < shapes.len() {
        let shape = &shapes[index];
        let children = usize::try_from(shape.num_children).unwrap_or(0);
        let end = (index + 1 + children).min(shapes.len());

        let mut local = SurfaceSample::new(shape_distance(shape, eye), Vec3::from(shape.colour));
        for child in &shapes[index + 1..end] {
            let child_sample = SurfaceSample::new(shape_distance(child, eye), Vec3::from(child.colour));
            local = combine(local, child_sample, child.operation, child.blend_strength);
        }

        global = combine(global, local, shape.operation, shape.blend_strength);
        index = end;
    }
    global
}
