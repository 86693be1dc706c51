use index_vec::IndexVec;

use super::{BvhAccel, Node, NodeIdx, NodeKind, PrimitiveIdx};
use crate::{
    geometry::{FloatType, WorldBox},
    scene::{Object as _, Primitive},
};

impl BvhAccel {
    /// Builds the hierarchy, reordering `primitives` so that every leaf refers to a
    /// contiguous range. Nodes with at most `max_leaf_size` primitives become leaves.
    pub fn build(primitives: Vec<Primitive>, max_leaf_size: usize) -> BvhAccel {
        let mut primitives = IndexVec::from_vec(primitives);
        let mut nodes = IndexVec::new();

        let root = if primitives.is_empty() {
            None
        } else {
            Some(build_recursive(
                &mut nodes,
                &mut primitives.raw,
                0,
                max_leaf_size.max(1),
            ))
        };

        let bvh = BvhAccel {
            primitives,
            nodes,
            root,
        };
        log::debug!(
            "Built BVH with {} nodes over {} primitives",
            bvh.nodes.len(),
            bvh.primitives.len()
        );
        bvh
    }
}

/// `offset` is the position of `primitives` in the full primitive array.
fn build_recursive(
    nodes: &mut IndexVec<NodeIdx, Node>,
    primitives: &mut [Primitive],
    offset: usize,
    max_leaf_size: usize,
) -> NodeIdx {
    let bounding_box = primitives
        .iter()
        .fold(WorldBox::empty(), |b, p| b.union(&p.bounding_box()));

    let split = if primitives.len() > max_leaf_size {
        partition(primitives, &bounding_box)
    } else {
        None
    };

    let Some(split) = split else {
        return nodes.push(Node {
            bounding_box,
            kind: NodeKind::Leaf {
                primitives: PrimitiveIdx::from_usize(offset)
                    ..PrimitiveIdx::from_usize(offset + primitives.len()),
            },
        });
    };

    // Create placeholder node that will be overwriten once the children exist
    let node_index = nodes.push(Node {
        bounding_box,
        kind: NodeKind::Leaf {
            primitives: PrimitiveIdx::from_usize(offset)..PrimitiveIdx::from_usize(offset),
        },
    });

    let (left_primitives, right_primitives) = primitives.split_at_mut(split);
    let left = build_recursive(nodes, left_primitives, offset, max_leaf_size);
    let right = build_recursive(nodes, right_primitives, offset + split, max_leaf_size);
    nodes[node_index].kind = NodeKind::Inner { left, right };

    node_index
}

/// Reorders the primitives so that those with centroid at or below the mean centroid
/// along the longest axis come first. Relative order within each side is kept.
/// Returns the size of the first part, or None if one of the sides would be empty.
fn partition(primitives: &mut [Primitive], bounding_box: &WorldBox) -> Option<usize> {
    let axis = bounding_box.longest_axis();
    let split = primitives
        .iter()
        .map(|p| p.centroid()[axis])
        .sum::<FloatType>()
        / primitives.len() as FloatType;

    primitives.sort_by_key(|p| p.centroid()[axis] > split);
    let left_count = primitives
        .iter()
        .take_while(|p| p.centroid()[axis] <= split)
        .count();

    if left_count == 0 || left_count == primitives.len() {
        None
    } else {
        Some(left_count)
    }
}
