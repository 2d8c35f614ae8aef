use glam::{Mat4, Vec2, Vec3, Vec4, Vec4Swizzles};

use super::sdf::{scene_sample, SurfaceSample};
use crate::{ComputeError, FrameParams, ShapeRecord, Texture2d, SHAPE_LAYOUT_VERSION, THREAD_GROUP_SIZE};

pub const MAX_DST: f32 = 80.0;
pub const EPSILON: f32 = 0.001;
pub const MAX_STEPS: u32 = 256;

struct Ray {
    origin: Vec3,
    direction: Vec3,
}

fn camera_ray(camera_to_world: &Mat4, inverse_projection: &Mat4, uv: Vec2) -> Ray {
    let origin = camera_to_world.transform_point3(Vec3::ZERO);
    let direction = (*inverse_projection * Vec4::new(uv.x, uv.y, 0.0, 1.0)).xyz();
    let direction = camera_to_world.transform_vector3(direction).normalize();
    Ray { origin, direction }
}

fn estimate_normal(shapes: &[ShapeRecord], p: Vec3) -> Vec3 {
    let d = |offset: Vec3| scene_sample(shapes, p + offset, MAX_DST).distance;
    Vec3::new(
        d(Vec3::X * EPSILON) - d(-Vec3::X * EPSILON),
        d(Vec3::Y * EPSILON) - d(-Vec3::Y * EPSILON),
        d(Vec3::Z * EPSILON) - d(-Vec3::Z * EPSILON),
    )
    .normalize_or_zero()
}

/// Marches one ray and returns the shaded surface colour, or `None` on a miss.
fn march(shapes: &[ShapeRecord], params: &FrameParams, mut ray: Ray) -> Option<[f32; 4]> {
    let light = Vec3::from(params.light);
    let mut travelled = 0.0;
    let mut steps = 0;

    while travelled < MAX_DST && steps < MAX_STEPS {
        steps += 1;
        let SurfaceSample { distance, colour } = scene_sample(shapes, ray.origin, MAX_DST);

        if distance <= EPSILON {
            let surface = ray.origin + ray.direction * distance;
            let normal = estimate_normal(shapes, surface - ray.direction * EPSILON);
            let light_dir = if params.is_positional_light() {
                (light - ray.origin).normalize_or_zero()
            } else {
                -light
            };
            let lighting = normal.dot(light_dir).clamp(0.0, 1.0);
            let shaded = colour * lighting;
            return Some([shaded.x, shaded.y, shaded.z, 1.0]);
        }

        ray.origin += ray.direction * distance;
        travelled += distance;
    }
    None
}

/// Runs the ray-march kernel over every invocation covered by `workgroups`.
///
/// Each pixel starts as the matching source texel; pixels whose ray hits a
/// surface are overwritten with the lit surface colour.
///
/// # Errors
///
/// Returns [`ComputeError::LayoutMismatch`] if `params` was packed for another
/// record layout, and [`ComputeError::ShapeMismatch`] if `params.num_shapes`
/// exceeds the records in `shapes`.
#[allow(clippy::cast_precision_loss)]
pub fn handle_raymarch(
    source: &Texture2d,
    destination: &mut Texture2d,
    shapes: &[ShapeRecord],
    params: &FrameParams,
    workgroups: [u32; 3],
) -> Result<(), ComputeError> {
    if params.layout_version != SHAPE_LAYOUT_VERSION {
        return Err(ComputeError::LayoutMismatch {
            expected: SHAPE_LAYOUT_VERSION,
            found: params.layout_version,
        });
    }
    let num_shapes = params.num_shapes as usize;
    if num_shapes > shapes.len() {
        return Err(ComputeError::ShapeMismatch(
            "shape count exceeds the records in the shape buffer",
        ));
    }
    let shapes = &shapes[..num_shapes];

    let camera_to_world = Mat4::from_cols_array_2d(&params.camera_to_world);
    let inverse_projection = Mat4::from_cols_array_2d(&params.inverse_projection);
    let pixel_offset = Vec2::from(params.pixel_offset);

    let (width, height) = (destination.width, destination.height);
    let span_x = workgroups[0].saturating_mul(THREAD_GROUP_SIZE).min(width);
    let span_y = workgroups[1].saturating_mul(THREAD_GROUP_SIZE).min(height);
    if workgroups[2] == 0 {
        return Ok(());
    }

    let dims = Vec2::new(width as f32, height as f32);
    for y in 0..span_y {
        for x in 0..span_x {
            let background = source.get(x, y).unwrap_or([0.0, 0.0, 0.0, 1.0]);
            let pixel = (Vec2::new(x as f32, y as f32) + pixel_offset) / dims;
            let uv = Vec2::new(pixel.x * 2.0 - 1.0, 1.0 - pixel.y * 2.0);
            let ray = camera_ray(&camera_to_world, &inverse_projection, uv);
            let texel = march(shapes, params, ray).unwrap_or(background);
            destination.set(x, y, texel);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::sdf::{OP_UNION, SHAPE_SPHERE};

    fn params(num_shapes: u32, light: [f32; 3], positional: bool) -> FrameParams {
        let camera_to_world = Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0));
        let projection = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
        FrameParams {
            camera_to_world: camera_to_world.to_cols_array_2d(),
            inverse_projection: projection.inverse().to_cols_array_2d(),
            light,
            position_light: u32::from(positional),
            pixel_offset: [0.5, 0.5],
            num_shapes,
            layout_version: SHAPE_LAYOUT_VERSION,
        }
    }

    fn red_sphere() -> ShapeRecord {
        ShapeRecord {
            position: [0.0, 0.0, 0.0],
            scale: [1.0; 3],
            colour: [1.0, 0.0, 0.0],
            extra: 1.0,
            shape_type: SHAPE_SPHERE,
            operation: OP_UNION,
            blend_strength: 0.0,
            num_children: 0,
        }
    }

    #[test]
    fn empty_scene_copies_the_source() {
        let source = Texture2d::filled(16, 16, [0.2, 0.3, 0.4, 1.0]);
        let mut destination = Texture2d::new(16, 16);
        handle_raymarch(&source, &mut destination, &[], &params(0, [0.0, 0.0, -1.0], false), [2, 2, 1])
            .unwrap();
        assert_eq!(destination, source);
    }

    #[test]
    fn sphere_in_view_is_lit_from_the_camera_side() {
        let source = Texture2d::new(16, 16);
        let mut destination = Texture2d::new(16, 16);
        // Directional light travelling away from the camera lights the visible face.
        let frame = params(1, [0.0, 0.0, -1.0], false);
        handle_raymarch(&source, &mut destination, &[red_sphere()], &frame, [2, 2, 1]).unwrap();

        let centre = destination.get(8, 8).unwrap();
        assert!(centre[0] > 0.9, "centre pixel should be lit red, got {centre:?}");
        assert_eq!(centre[1], 0.0);
        assert_eq!(destination.get(0, 0).unwrap(), [0.0; 4]);
    }

    #[test]
    fn positional_light_behind_the_sphere_leaves_it_dark() {
        let source = Texture2d::new(16, 16);
        let mut destination = Texture2d::new(16, 16);
        let frame = params(1, [0.0, 0.0, -20.0], true);
        handle_raymarch(&source, &mut destination, &[red_sphere()], &frame, [2, 2, 1]).unwrap();
        assert_eq!(destination.get(8, 8).unwrap(), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn pixels_outside_the_workgroups_are_untouched() {
        let source = Texture2d::filled(16, 16, [1.0; 4]);
        let mut destination = Texture2d::new(16, 16);
        handle_raymarch(&source, &mut destination, &[], &params(0, [0.0, 0.0, -1.0], false), [1, 1, 1])
            .unwrap();
        assert_eq!(destination.get(7, 7).unwrap(), [1.0; 4]);
        assert_eq!(destination.get(8, 8).unwrap(), [0.0; 4]);
    }

    #[test]
    fn layout_version_is_checked() {
        let source = Texture2d::new(8, 8);
        let mut destination = Texture2d::new(8, 8);
        let mut frame = params(0, [0.0, 0.0, -1.0], false);
        frame.layout_version = SHAPE_LAYOUT_VERSION + 1;
        let result = handle_raymarch(&source, &mut destination, &[], &frame, [1, 1, 1]);
        assert!(matches!(result, Err(ComputeError::LayoutMismatch { .. })));
    }

    #[test]
    fn count_larger_than_buffer_is_rejected() {
        let source = Texture2d::new(8, 8);
        let mut destination = Texture2d::new(8, 8);
        let result = handle_raymarch(&source, &mut destination, &[], &params(2, [0.0; 3], false), [1, 1, 1]);
        assert!(matches!(result, Err(ComputeError::ShapeMismatch(_))));
    }
}
