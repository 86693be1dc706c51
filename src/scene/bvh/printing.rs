use std::fmt::Write as _;

use super::{BvhAccel, NodeIdx, NodeKind};
use crate::util::Stats;

/// Shape of a built hierarchy.
#[derive(Clone, Debug)]
pub struct BvhStatistics {
    pub node_count: usize,
    /// Depth of each leaf, root leaf has depth 1
    pub depth: Stats,
    /// Number of primitives per leaf
    pub leaf_size: Stats,
}

impl BvhAccel {
    pub fn statistics(&self) -> BvhStatistics {
        let leaf_size = self
            .nodes
            .iter()
            .filter_map(|node| match &node.kind {
                NodeKind::Leaf { primitives } => Some(primitives.end.index() - primitives.start.index()),
                NodeKind::Inner { .. } => None,
            })
            .collect();

        BvhStatistics {
            node_count: self.nodes.len(),
            depth: self
                .root
                .map(|root| self.depth_statistics_recursive(root))
                .unwrap_or_default(),
            leaf_size,
        }
    }

    pub fn log_statistics(&self) {
        let stats = self.statistics();
        log::info!(
            "BVH: {} primitives, {} nodes",
            self.primitives.len(),
            stats.node_count
        );
        log::info!("BVH depth: {}", stats.depth);
        log::info!("BVH leaf size: {}", stats.leaf_size);
    }

    /// Indented dump of the node boxes, one node per line.
    pub fn tree_string(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.root {
            self.print_recursive(&mut out, 0, root);
        }
        out
    }

    fn depth_statistics_recursive(&self, node: NodeIdx) -> Stats {
        match &self.nodes[node].kind {
            NodeKind::Leaf { .. } => Stats::single(1),
            NodeKind::Inner { left, right } => self
                .depth_statistics_recursive(*left)
                .merge(&self.depth_statistics_recursive(*right))
                .shifted(1),
        }
    }

    fn print_recursive(&self, out: &mut String, indent: usize, node: NodeIdx) {
        let node = &self.nodes[node];
        let (tag, label) = match &node.kind {
            NodeKind::Leaf { primitives } => (
                "L",
                format!("{}..{}", primitives.start.index(), primitives.end.index()),
            ),
            NodeKind::Inner { .. } => ("I", String::new()),
        };
        // Writing to a String can't fail
        let _ = writeln!(
            out,
            "{}- {}{}: {:?}-{:?}",
            "  ".repeat(indent),
            tag,
            label,
            node.bounding_box.min.coords.as_slice(),
            node.bounding_box.max.coords.as_slice(),
        );

        if let NodeKind::Inner { left, right } = &node.kind {
            self.print_recursive(out, indent + 1, *left);
            self.print_recursive(out, indent + 1, *right);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        bsdf::BsdfIdx,
        geometry::{FloatType, WorldPoint},
        scene::Sphere,
    };
    use assert2::{assert, check};

    #[test]
    fn balanced_tree_statistics() {
        let primitives = (0..8)
            .map(|i| {
                Sphere {
                    center: WorldPoint::new(i as FloatType, 0.0, 0.0),
                    radius: 0.5,
                    bsdf: BsdfIdx::from_raw(0),
                }
                .into()
            })
            .collect();
        let bvh = BvhAccel::build(primitives, 2);
        let stats = bvh.statistics();

        check!(stats.node_count == 7);
        check!(stats.depth.min == 3);
        check!(stats.depth.max == 3);
        check!(stats.leaf_size.count == 4);
        check!(stats.leaf_size.min == 2);
        check!(stats.leaf_size.max == 2);

        let tree = bvh.tree_string();
        assert!(tree.lines().count() == 7);
        assert!(tree.starts_with("- I"));
    }

    #[test]
    fn empty_tree_statistics() {
        let bvh = BvhAccel::build(Vec::new(), 2);
        let stats = bvh.statistics();
        check!(stats.node_count == 0);
        check!(stats.depth.count == 0);
        check!(bvh.tree_string().is_empty());
    }
}
