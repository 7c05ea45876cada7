//! Quadtree over the XZ ground plane
//!
//! Same partitioning rules as the octree, but cells always span the full
//! height of the index bounds and split into 4 quadrants.

use crate::bodies::BodyIndex;
use crate::foundation::math::Vec3;
use crate::spatial::spatial_index::{
    gather_neighbors, root_bounds, IndexBackend, LeafCell, PartitionConfig, PartitionNode, SpatialIndex,
};
use crate::spatial::AABB;

#[derive(Debug, Clone)]
struct QuadNode {
    bounds: AABB,
    occupants: Vec<(BodyIndex, Vec3)>,
    children: Option<Box<[QuadNode; 4]>>,
    depth: u32,
    leaf_slot: usize,
}

impl QuadNode {
    const fn new(bounds: AABB, depth: u32) -> Self {
        Self {
            bounds,
            occupants: Vec::new(),
            children: None,
            depth,
            leaf_slot: 0,
        }
    }

    // 0: -X -Z, 1: +X -Z, 2: -X +Z, 3: +X +Z
    fn quadrant_index(&self, position: Vec3) -> usize {
        let center = self.bounds.center();
        let x_bit = usize::from(position.x >= center.x);
        let z_bit = usize::from(position.z >= center.z);
        (z_bit << 1) | x_bit
    }

    fn child_size(&self) -> f32 {
        let extents = self.bounds.extents();
        extents.x.min(extents.z)
    }

    fn subdivide(&mut self) {
        if self.children.is_some() {
            return;
        }

        let center = self.bounds.center();
        let depth = self.depth + 1;

        let children: [Self; 4] = std::array::from_fn(|quadrant| {
            let (min_x, max_x) = if quadrant & 1 != 0 {
                (center.x, self.bounds.max.x)
            } else {
                (self.bounds.min.x, center.x)
            };
            let (min_z, max_z) = if quadrant & 2 != 0 {
                (center.z, self.bounds.max.z)
            } else {
                (self.bounds.min.z, center.z)
            };
            Self::new(
                AABB::new(
                    Vec3::new(min_x, self.bounds.min.y, min_z),
                    Vec3::new(max_x, self.bounds.max.y, max_z),
                ),
                depth,
            )
        });
        let mut children = Box::new(children);

        for (index, position) in std::mem::take(&mut self.occupants) {
            let quadrant = self.quadrant_index(position);
            children[quadrant].occupants.push((index, position));
        }

        self.children = Some(children);
    }

    fn insert(&mut self, index: BodyIndex, position: Vec3, config: &PartitionConfig) -> bool {
        if !self.bounds.contains_point(position) {
            return false;
        }

        if self.children.is_none() {
            if !config.allows_split(self.occupants.len(), self.depth, self.child_size()) {
                self.occupants.push((index, position));
                return true;
            }
            self.subdivide();
        }

        let quadrant = self.quadrant_index(position);
        self.children
            .as_mut()
            .is_some_and(|children| children[quadrant].insert(index, position, config))
    }

    fn collect_leaves(&mut self, leaves: &mut Vec<LeafCell>) {
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                child.collect_leaves(leaves);
            }
        } else {
            self.leaf_slot = leaves.len();
            leaves.push(LeafCell {
                bounds: self.bounds,
                occupants: self.occupants.iter().map(|&(index, _)| index).collect(),
                depth: self.depth,
            });
        }
    }
}

impl PartitionNode for QuadNode {
    fn bounds(&self) -> &AABB {
        &self.bounds
    }

    fn children(&self) -> Option<&[Self]> {
        self.children.as_deref().map(<[Self; 4]>::as_slice)
    }

    fn leaf_slot(&self) -> usize {
        self.leaf_slot
    }
}

/// Quadtree spatial index; the Y coordinate only matters for root bounds
#[derive(Debug, Clone)]
pub struct QuadTree {
    root: QuadNode,
    region: AABB,
    config: PartitionConfig,
    leaves: Vec<LeafCell>,
}

impl QuadTree {
    /// Create an empty quadtree covering `region`
    #[must_use]
    pub fn new(region: AABB, config: PartitionConfig) -> Self {
        Self {
            root: QuadNode::new(region, 0),
            region,
            config,
            leaves: vec![LeafCell { bounds: region, occupants: Vec::new(), depth: 0 }],
        }
    }
}

impl SpatialIndex for QuadTree {
    fn rebuild(&mut self, positions: &[Vec3]) {
        self.root = QuadNode::new(root_bounds(&self.region, positions), 0);
        for (index, &position) in positions.iter().enumerate() {
            if !self.root.insert(index, position, &self.config) {
                log::warn!("QuadTree rejected body {index} at {position:?}");
            }
        }

        self.leaves.clear();
        self.root.collect_leaves(&mut self.leaves);
        log::trace!("QuadTree rebuilt: {} leaves", self.leaves.len());
    }

    fn leaf_cells(&self) -> &[LeafCell] {
        &self.leaves
    }

    fn neighbor_occupants(&self, cell: usize) -> Vec<BodyIndex> {
        gather_neighbors(&self.root, &self.leaves, cell, AABB::intersects_xz)
    }

    fn backend(&self) -> IndexBackend {
        IndexBackend::QuadTree
    }
}
