use assert2::debug_assert;

use super::{BvhAccel, NodeIdx, NodeKind, PrimitiveIdx};
use crate::{
    geometry::{Ray, RayIntersectionExt as _},
    scene::{Intersection, Object as _},
};

/// Per-thread scratch space for traversals.
#[derive(Clone, Debug, Default)]
pub struct TraversalCache {
    stack: Vec<NodeIdx>,
    intersection_tests: u64,
}

impl TraversalCache {
    /// Number of ray/primitive tests performed since the last `take_intersection_tests`.
    pub fn intersection_tests(&self) -> u64 {
        self.intersection_tests
    }

    pub fn take_intersection_tests(&mut self) -> u64 {
        std::mem::take(&mut self.intersection_tests)
    }
}

impl BvhAccel {
    /// Finds the nearest hit along the ray within `[ray.min_t, ray.max_t]`.
    pub fn intersect(&self, ray: &Ray, cache: &mut TraversalCache) -> Option<Intersection> {
        let root = self.root?;

        debug_assert!(cache.stack.is_empty());
        cache.stack.push(root);

        let mut best_t = ray.max_t;
        let mut best = None;

        while let Some(index) = cache.stack.pop() {
            let node = &self.nodes[index];
            if node.bounding_box.intersect(ray, ray.min_t, best_t).is_none() {
                continue;
            }

            match &node.kind {
                NodeKind::Inner { left, right } => {
                    cache.stack.push(*right);
                    cache.stack.push(*left);
                }
                NodeKind::Leaf { primitives } => {
                    for i in primitives.start.index()..primitives.end.index() {
                        let primitive_index = PrimitiveIdx::from_usize(i);
                        cache.intersection_tests += 1;
                        if let Some(hit) = self.primitives[primitive_index].intersect(ray, &mut best_t)
                        {
                            best = Some(Intersection {
                                t: hit.t,
                                normal: hit.normal,
                                bsdf: hit.bsdf,
                                primitive: primitive_index,
                            });
                        }
                    }
                }
            }
        }

        best
    }

    /// Returns true if anything lies along the ray within `[ray.min_t, ray.max_t]`.
    pub fn has_intersection(&self, ray: &Ray, cache: &mut TraversalCache) -> bool {
        let Some(root) = self.root else {
            return false;
        };

        debug_assert!(cache.stack.is_empty());
        cache.stack.push(root);

        while let Some(index) = cache.stack.pop() {
            let node = &self.nodes[index];
            if node.bounding_box.intersect(ray, ray.min_t, ray.max_t).is_none() {
                continue;
            }

            match &node.kind {
                NodeKind::Inner { left, right } => {
                    cache.stack.push(*right);
                    cache.stack.push(*left);
                }
                NodeKind::Leaf { primitives } => {
                    for i in primitives.start.index()..primitives.end.index() {
                        cache.intersection_tests += 1;
                        if self.primitives[PrimitiveIdx::from_usize(i)].has_intersection(ray) {
                            cache.stack.clear();
                            return true;
                        }
                    }
                }
            }
        }

        false
    }
}
