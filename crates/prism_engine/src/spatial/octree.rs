//! Octree spatial partitioning structure
//!
//! Divides 3D space into hierarchical regions. Each node subdivides into 8
//! octants when its occupant count reaches the leaf capacity.

use crate::bodies::BodyIndex;
use crate::foundation::math::Vec3;
use crate::spatial::spatial_index::{
    gather_neighbors, root_bounds, IndexBackend, LeafCell, PartitionConfig, PartitionNode, SpatialIndex,
};
use crate::spatial::AABB;

/// Body stored in the octree with its indexing position
#[derive(Debug, Clone, Copy)]
struct Occupant {
    index: BodyIndex,
    position: Vec3,
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// World-space bounds of this node
    pub bounds: AABB,

    /// Occupants contained in this node (if leaf)
    occupants: Vec<Occupant>,

    /// Child nodes (8 octants), None if this is a leaf
    pub children: Option<Box<[OctreeNode; 8]>>,

    /// Depth in the tree (0 = root)
    pub depth: u32,

    /// Index into the flat leaf list, set when leaves are collected
    leaf_slot: usize,
}

impl OctreeNode {
    /// Create a new leaf node
    #[must_use]
    pub const fn new(bounds: AABB, depth: u32) -> Self {
        Self {
            bounds,
            occupants: Vec::new(),
            children: None,
            depth,
            leaf_slot: 0,
        }
    }

    /// Check if this node is a leaf (has no children)
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Get the octant index (0-7) for a position within this node's bounds
    fn octant_index(&self, position: Vec3) -> usize {
        let center = self.bounds.center();
        let x_bit = usize::from(position.x >= center.x);
        let y_bit = usize::from(position.y >= center.y);
        let z_bit = usize::from(position.z >= center.z);

        // Octant layout:
        // 0: -X, -Y, -Z (back-bottom-left)
        // 1: +X, -Y, -Z (back-bottom-right)
        // 2: -X, +Y, -Z (back-top-left)
        // 3: +X, +Y, -Z (back-top-right)
        // 4: -X, -Y, +Z (front-bottom-left)
        // 5: +X, -Y, +Z (front-bottom-right)
        // 6: -X, +Y, +Z (front-top-left)
        // 7: +X, +Y, +Z (front-top-right)
        (z_bit << 2) | (y_bit << 1) | x_bit
    }

    /// Full edge length of a child cell along the shortest axis
    fn child_size(&self) -> f32 {
        self.bounds.extents().min()
    }

    /// Subdivide this node into 8 children and push occupants down
    fn subdivide(&mut self) {
        if self.children.is_some() {
            return;
        }

        let (min, max) = (self.bounds.min, self.bounds.max);
        let center = self.bounds.center();
        let depth = self.depth + 1;

        // Children share the parent's exact corner and center coordinates,
        // so sibling faces compare equal
        let split = |upper: bool, axis: usize| {
            if upper {
                (center[axis], max[axis])
            } else {
                (min[axis], center[axis])
            }
        };
        let children: [Self; 8] = std::array::from_fn(|octant| {
            let (min_x, max_x) = split(octant & 1 != 0, 0);
            let (min_y, max_y) = split(octant & 2 != 0, 1);
            let (min_z, max_z) = split(octant & 4 != 0, 2);
            Self::new(
                AABB::new(Vec3::new(min_x, min_y, min_z), Vec3::new(max_x, max_y, max_z)),
                depth,
            )
        });
        let mut children = Box::new(children);

        // Redistribution keeps insertion order inside every child
        for occupant in std::mem::take(&mut self.occupants) {
            let octant = self.octant_index(occupant.position);
            children[octant].occupants.push(occupant);
        }

        self.children = Some(children);
    }

    /// Insert an occupant into this node
    fn insert(&mut self, occupant: Occupant, config: &PartitionConfig) -> bool {
        if !self.bounds.contains_point(occupant.position) {
            return false;
        }

        if self.is_leaf() {
            if !config.allows_split(self.occupants.len(), self.depth, self.child_size()) {
                self.occupants.push(occupant);
                return true;
            }
            self.subdivide();
        }

        let octant = self.octant_index(occupant.position);
        match self.children.as_mut() {
            Some(children) => children[octant].insert(occupant, config),
            None => false,
        }
    }

    /// Append every leaf to the flat leaf list, recording each one's slot
    fn collect_leaves(&mut self, leaves: &mut Vec<LeafCell>) {
        match self.children.as_mut() {
            None => {
                self.leaf_slot = leaves.len();
                leaves.push(LeafCell {
                    bounds: self.bounds,
                    occupants: self.occupants.iter().map(|o| o.index).collect(),
                    depth: self.depth,
                });
            }
            Some(children) => {
                for child in children.iter_mut() {
                    child.collect_leaves(leaves);
                }
            }
        }
    }

    /// Count total occupants in this node and all children
    #[must_use]
    pub fn count_occupants(&self) -> usize {
        let own = self.occupants.len();
        self.children
            .as_ref()
            .map_or(own, |children| own + children.iter().map(Self::count_occupants).sum::<usize>())
    }
}

impl PartitionNode for OctreeNode {
    fn bounds(&self) -> &AABB {
        &self.bounds
    }

    fn children(&self) -> Option<&[Self]> {
        self.children.as_deref().map(<[Self; 8]>::as_slice)
    }

    fn leaf_slot(&self) -> usize {
        self.leaf_slot
    }
}

/// Octree spatial partitioning structure
#[derive(Debug, Clone)]
pub struct Octree {
    /// Root node of the latest rebuild
    pub root: OctreeNode,

    /// Region the root always covers, even when empty
    region: AABB,

    /// Configuration
    config: PartitionConfig,

    /// Leaves of the latest rebuild, in depth-first octant order
    leaves: Vec<LeafCell>,
}

impl Octree {
    /// Create an empty octree covering `region`
    #[must_use]
    pub fn new(region: AABB, config: PartitionConfig) -> Self {
        Self {
            root: OctreeNode::new(region, 0),
            region,
            config,
            leaves: vec![LeafCell { bounds: region, occupants: Vec::new(), depth: 0 }],
        }
    }

    /// Get maximum depth reached by the current partition
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.leaves.iter().map(|leaf| leaf.depth).max().unwrap_or(0)
    }
}

impl SpatialIndex for Octree {
    fn rebuild(&mut self, positions: &[Vec3]) {
        self.root = OctreeNode::new(root_bounds(&self.region, positions), 0);
        for (index, &position) in positions.iter().enumerate() {
            if !self.root.insert(Occupant { index, position }, &self.config) {
                log::warn!("Octree rejected body {index} at {position:?}");
            }
        }

        self.leaves.clear();
        self.root.collect_leaves(&mut self.leaves);
        log::trace!(
            "Octree rebuilt: {} bodies in {} leaves (depth {})",
            self.root.count_occupants(),
            self.leaves.len(),
            self.depth()
        );
    }

    fn leaf_cells(&self) -> &[LeafCell] {
        &self.leaves
    }

    fn neighbor_occupants(&self, cell: usize) -> Vec<BodyIndex> {
        gather_neighbors(&self.root, &self.leaves, cell, AABB::intersects)
    }

    fn backend(&self) -> IndexBackend {
        IndexBackend::Octree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> AABB {
        AABB::new(Vec3::new(-100.0, -100.0, -100.0), Vec3::new(100.0, 100.0, 100.0))
    }

    #[test]
    fn test_octree_basic_insertion() {
        let mut octree = Octree::new(bounds(), PartitionConfig::default());
        octree.rebuild(&[Vec3::new(0.0, 0.0, 0.0)]);

        assert_eq!(octree.occupant_count(), 1);
        assert_eq!(octree.leaf_cells().len(), 1);
        assert_eq!(octree.leaf_cells()[0].representative(), Some(0));
    }

    #[test]
    fn test_octree_subdivision() {
        let config = PartitionConfig {
            max_occupants_per_leaf: 4,
            max_depth: 3,
            min_cell_size: 1.0,
        };
        let mut octree = Octree::new(bounds(), config);

        // Same position forces subdivision down to max depth
        let positions = vec![Vec3::new(1.0, 1.0, 1.0); 10];
        octree.rebuild(&positions);

        assert_eq!(octree.occupant_count(), 10);
        assert!(octree.root.children.is_some());
        assert_eq!(octree.depth(), 3);
        assert_eq!(octree.leaf_cells().len(), 1 + 7 * 3);
    }

    #[test]
    fn test_insertion_order_survives_subdivision() {
        let config = PartitionConfig {
            max_occupants_per_leaf: 2,
            max_depth: 4,
            min_cell_size: 1.0,
        };
        let mut octree = Octree::new(bounds(), config);
        octree.rebuild(&[
            Vec3::new(10.0, 10.0, 10.0),
            Vec3::new(-10.0, -10.0, -10.0),
            Vec3::new(12.0, 12.0, 12.0),
        ]);

        let cell = octree
            .leaf_cells()
            .iter()
            .find(|cell| cell.occupants.contains(&2))
            .unwrap();
        assert_eq!(cell.occupants, vec![0, 2]);
        assert_eq!(cell.representative(), Some(0));
    }

    #[test]
    fn test_neighbors_cover_adjacent_leaves_only() {
        let config = PartitionConfig {
            max_occupants_per_leaf: 1,
            max_depth: 2,
            min_cell_size: 1.0,
        };
        let mut octree = Octree::new(bounds(), config);
        // Level-2 cells are 50 units wide; 0 and 1 share a face, 2 sits in
        // the opposite corner of the root
        octree.rebuild(&[
            Vec3::new(-75.0, -75.0, -75.0),
            Vec3::new(-25.0, -75.0, -75.0),
            Vec3::new(75.0, 75.0, 75.0),
        ]);

        let cell_of = |body: BodyIndex| {
            octree
                .leaf_cells()
                .iter()
                .position(|cell| cell.occupants.contains(&body))
                .unwrap()
        };

        let near = octree.neighbor_occupants(cell_of(0));
        assert!(near.contains(&1));
        assert!(!near.contains(&2));
        assert!(!near.contains(&0));
    }

    #[test]
    fn test_sibling_faces_match_exactly() {
        let region = AABB::new(Vec3::new(-3.7, -1.3, -6.1), Vec3::new(9.4, 4.9, 2.3));
        let mut node = OctreeNode::new(region, 0);
        node.subdivide();
        let children = node.children.as_ref().unwrap();

        for octant in 0..8 {
            let child = &children[octant];
            for (axis, bit) in [(0, 1), (1, 2), (2, 4)] {
                if octant & bit == 0 {
                    let sibling = &children[octant | bit];
                    assert_eq!(child.bounds.max[axis], sibling.bounds.min[axis]);
                    assert!(child.bounds.intersects(&sibling.bounds));
                } else {
                    assert_eq!(child.bounds.max[axis], region.max[axis]);
                }
            }
        }
    }

    #[test]
    fn test_neighbors_across_depths() {
        let region = AABB::new(Vec3::new(-3.7, -1.3, -6.1), Vec3::new(9.4, 4.9, 2.3));
        let config = PartitionConfig {
            max_occupants_per_leaf: 2,
            max_depth: 4,
            min_cell_size: 0.05,
        };
        let mut octree = Octree::new(region, config);
        let center = region.center();
        // Three bodies crowd the low octant so it splits; one sits just
        // across the x split plane in the undivided neighbour
        octree.rebuild(&[
            center - Vec3::new(0.1, 0.1, 0.1),
            center - Vec3::new(0.2, 0.2, 0.2),
            center - Vec3::new(3.0, 2.0, 3.0),
            center + Vec3::new(0.1, -0.1, -0.1),
        ]);

        let leaves = octree.leaf_cells();
        let cell_of = |body: BodyIndex| leaves.iter().position(|cell| cell.occupants.contains(&body)).unwrap();
        assert!(leaves[cell_of(0)].depth > leaves[cell_of(3)].depth);

        assert!(octree.neighbor_occupants(cell_of(3)).contains(&0));
        assert!(octree.neighbor_occupants(cell_of(0)).contains(&3));
    }

    #[test]
    fn test_rebuild_discards_previous_partition() {
        let mut octree = Octree::new(bounds(), PartitionConfig::default());
        octree.rebuild(&vec![Vec3::new(5.0, 5.0, 5.0); 20]);
        assert!(octree.leaf_cells().len() > 1);

        octree.rebuild(&[Vec3::zeros()]);
        assert_eq!(octree.occupant_count(), 1);
        assert_eq!(octree.leaf_cells().len(), 1);
    }
}
