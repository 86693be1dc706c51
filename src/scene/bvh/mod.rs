//! Binary bounding volume hierarchy over scene primitives.
//!
//! Nodes live in a flat arena and refer to their children by index. Leaves own
//! a contiguous range of the primitive array, which is reordered during
//! construction.

mod building;
mod printing;
mod ray_bvh_intersection;

use std::ops::Range;

use index_vec::{IndexSlice, IndexVec};

use super::Primitive;
use crate::geometry::WorldBox;

pub use printing::BvhStatistics;
pub use ray_bvh_intersection::TraversalCache;

index_vec::define_index_type! {
    /// Index of a primitive in the BVH's (reordered) primitive array.
    pub struct PrimitiveIdx = u32;
}

index_vec::define_index_type! {
    struct NodeIdx = u32;
}

#[derive(Clone, Debug)]
pub struct BvhAccel {
    primitives: IndexVec<PrimitiveIdx, Primitive>,
    nodes: IndexVec<NodeIdx, Node>,
    /// None for an empty scene
    root: Option<NodeIdx>,
}

#[derive(Clone, Debug)]
struct Node {
    bounding_box: WorldBox,
    kind: NodeKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum NodeKind {
    Leaf { primitives: Range<PrimitiveIdx> },
    Inner { left: NodeIdx, right: NodeIdx },
}

impl BvhAccel {
    /// Bounding box of the whole scene, empty if there are no primitives.
    pub fn bounding_box(&self) -> WorldBox {
        match self.root {
            Some(root) => self.nodes[root].bounding_box.clone(),
            None => WorldBox::empty(),
        }
    }

    pub fn primitives(&self) -> &IndexSlice<PrimitiveIdx, [Primitive]> {
        &self.primitives
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }
}

#[cfg(test)]
impl BvhAccel {
    /// Panics if a node's box differs from the union of its contents, or if leaves
    /// don't partition the primitive array.
    fn check_invariants(&self) {
        use super::Object as _;

        let mut covered = vec![false; self.primitives.len()];
        for node in self.nodes.iter() {
            let expected = match &node.kind {
                NodeKind::Leaf { primitives } => {
                    assert2::assert!(primitives.start < primitives.end);
                    for i in primitives.start.index()..primitives.end.index() {
                        assert2::assert!(!covered[i]);
                        covered[i] = true;
                    }
                    self.primitives[primitives.clone()]
                        .iter()
                        .fold(WorldBox::empty(), |b, p| b.union(&p.bounding_box()))
                }
                NodeKind::Inner { left, right } => self.nodes[*left]
                    .bounding_box
                    .union(&self.nodes[*right].bounding_box),
            };
            assert2::assert!(node.bounding_box == expected);
        }
        assert2::assert!(covered.iter().all(|c| *c));
    }
}
