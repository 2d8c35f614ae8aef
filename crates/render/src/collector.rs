//! Flattens a scene into the ordered shape table the ray-marcher consumes.
//!
//! Top-level shapes are stable-sorted by combine operation. Each one is
//! followed directly by its shape-bearing children in child order. Deeper
//! descendants are not collected.

use compute::ShapeRecord;
use tracing::debug;

use crate::gpu_types::pack_shape;
use crate::scene::{NodeId, Scene};

/// Multiplier applied to the authored blend strength when packing.
pub const BLEND_STRENGTH_SCALE: f32 = 3.0;

/// One entry of the ordered shape table before packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedShape {
    pub node: NodeId,
    /// Immediate children of a top-level node, 0 for children.
    ///
    /// Counts every child, including ones without a shape, so it can exceed
    /// the number of records that follow. The kernel clamps its reads.
    pub num_children: usize,
}

#[must_use]
pub fn order_shapes(scene: &Scene) -> Vec<OrderedShape> {
    let mut candidates: Vec<_> = scene.shapes().collect();
    candidates.sort_by_key(|(_, shape)| shape.operation);

    let mut ordered = Vec::with_capacity(candidates.len());
    for (id, _) in candidates {
        let Some(node) = scene.node(id) else { continue };
        if node.parent.is_some() {
            continue;
        }
        ordered.push(OrderedShape {
            node: id,
            num_children: node.children.len(),
        });
        for &child in &node.children {
            if scene.node(child).is_some_and(|c| c.shape.is_some()) {
                ordered.push(OrderedShape { node: child, num_children: 0 });
            }
        }
    }
    ordered
}

/// Packs the ordered shape table into wire records.
#[must_use]
pub fn collect_shapes(scene: &Scene) -> Vec<ShapeRecord> {
    let records: Vec<ShapeRecord> = order_shapes(scene)
        .into_iter()
        .filter_map(|entry| {
            let shape = scene.node(entry.node)?.shape.as_ref()?;
            Some(pack_shape(shape, entry.num_children))
        })
        .collect();
    debug!(shapes = records.len(), "collected shape records");
    records
}
