//! Abstract spatial index interface for broad-phase candidate generation
//!
//! Based on Game Engine Architecture 3rd Edition, Section 13.3.2:
//! "Spatial partitioning schemes... allow us to quickly cull out pairs of
//! objects that cannot possibly be colliding."
//!
//! The broad phase only ever talks to [`SpatialIndex`], so the quadtree and
//! the octree are interchangeable. Which one is used is decided once, when
//! the index is built from an [`IndexBackend`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::bodies::BodyIndex;
use crate::config::ConfigError;
use crate::foundation::math::Vec3;
use crate::spatial::{QuadTree, Octree, AABB};

/// Padding added around the index bounds so bodies sitting exactly on the
/// region boundary still land inside the root cell
const BOUNDS_MARGIN: f32 = 1e-3;

/// Subdivision limits shared by both tree backends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Occupants a leaf may hold before it splits
    pub max_occupants_per_leaf: usize,

    /// Maximum subdivision depth
    pub max_depth: u32,

    /// Minimum child cell size (prevents excessive subdivision)
    pub min_cell_size: f32,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            max_occupants_per_leaf: 4,
            max_depth: 6,
            min_cell_size: 0.5,
        }
    }
}

impl PartitionConfig {
    /// Whether a leaf with `occupants` entries at `depth` may split into
    /// children of size `child_size` along every partitioned axis
    #[must_use]
    pub fn allows_split(&self, occupants: usize, depth: u32, child_size: f32) -> bool {
        occupants >= self.max_occupants_per_leaf
            && depth < self.max_depth
            && child_size >= self.min_cell_size
    }

    /// Validate the limits
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero leaf capacity or a
    /// non-positive minimum cell size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_occupants_per_leaf == 0 {
            return Err(ConfigError::Invalid(
                "partition.max_occupants_per_leaf must be at least 1".to_string(),
            ));
        }
        if !self.min_cell_size.is_finite() || self.min_cell_size <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "partition.min_cell_size must be positive, got {}",
                self.min_cell_size
            )));
        }
        Ok(())
    }
}

/// A leaf of the partition and the bodies whose centroid falls inside it
#[derive(Debug, Clone, PartialEq)]
pub struct LeafCell {
    /// World-space bounds of the cell
    pub bounds: AABB,
    /// Occupants in insertion order; the first one represents the cell
    pub occupants: Vec<BodyIndex>,
    /// Depth in the tree (0 = root)
    pub depth: u32,
}

impl LeafCell {
    /// The cell's canonical representative, if it has any occupant
    #[must_use]
    pub fn representative(&self) -> Option<BodyIndex> {
        self.occupants.first().copied()
    }
}

/// Abstract interface for the spatial partition used by the broad phase
pub trait SpatialIndex: Send + Sync {
    /// Discard the previous partition and build a new one from scratch
    ///
    /// `positions[i]` is the indexing position of body `i`.
    fn rebuild(&mut self, positions: &[Vec3]);

    /// Leaf cells of the current partition, empty ones included
    fn leaf_cells(&self) -> &[LeafCell];

    /// Occupants sharing or neighbouring the given leaf
    ///
    /// Covers the leaf's own occupants and those of every leaf touching it,
    /// but never the queried leaf's representative.
    fn neighbor_occupants(&self, cell: usize) -> Vec<BodyIndex>;

    /// Which backend this is
    fn backend(&self) -> IndexBackend;

    /// Total number of indexed bodies
    fn occupant_count(&self) -> usize {
        self.leaf_cells().iter().map(|cell| cell.occupants.len()).sum()
    }

    /// Number of leaves holding at least one body
    fn occupied_leaf_count(&self) -> usize {
        self.leaf_cells().iter().filter(|cell| !cell.occupants.is_empty()).count()
    }
}

/// Selects the spatial index implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IndexBackend {
    /// Quadtree over the XZ plane; height is ignored
    QuadTree,
    /// Octree over full 3D space
    #[default]
    Octree,
}

impl IndexBackend {
    /// Build an empty index of this kind covering `region`
    #[must_use]
    pub fn build(self, region: AABB, config: PartitionConfig) -> Box<dyn SpatialIndex> {
        match self {
            Self::QuadTree => Box::new(QuadTree::new(region, config)),
            Self::Octree => Box::new(Octree::new(region, config)),
        }
    }
}

impl fmt::Display for IndexBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuadTree => f.write_str("quadtree"),
            Self::Octree => f.write_str("octree"),
        }
    }
}

impl FromStr for IndexBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quadtree" | "quad" => Ok(Self::QuadTree),
            "octree" | "oct" => Ok(Self::Octree),
            other => Err(ConfigError::Invalid(format!("unknown index backend: {other}"))),
        }
    }
}

/// Root bounds for a rebuild: the configured region, grown to cover any body
/// that has been pushed outside it
pub(crate) fn root_bounds(region: &AABB, positions: &[Vec3]) -> AABB {
    AABB::enclosing(positions)
        .map_or(*region, |occupied| region.union(&occupied))
        .expanded(BOUNDS_MARGIN)
}

/// Tree node shape the neighbour descent needs from either backend
pub(crate) trait PartitionNode: Sized {
    /// World-space bounds of the node
    fn bounds(&self) -> &AABB;

    /// Children, or `None` for a leaf
    fn children(&self) -> Option<&[Self]>;

    /// Position of this leaf in the flat leaf list
    fn leaf_slot(&self) -> usize;
}

/// Slack added around a queried leaf, scaled to the magnitude of the root
/// coordinates so it only ever absorbs rounding
fn query_padding(root: &AABB) -> f32 {
    let magnitude = root.min.abs().max().max(root.max.abs().max()).max(1.0);
    magnitude * 4.0 * f32::EPSILON
}

/// Occupants sharing or neighbouring leaf `cell`, found by descending from
/// `root` into every node that touches the leaf's padded bounds
///
/// `touches` decides adjacency; leaves of different depths count as
/// neighbours whenever their bounds meet. The leaf's own representative is
/// never returned.
pub(crate) fn gather_neighbors<N: PartitionNode>(
    root: &N,
    leaves: &[LeafCell],
    cell: usize,
    touches: impl Fn(&AABB, &AABB) -> bool,
) -> Vec<BodyIndex> {
    let Some(leaf) = leaves.get(cell) else {
        return Vec::new();
    };

    let query = leaf.bounds.expanded(query_padding(root.bounds()));
    let mut out: Vec<BodyIndex> = leaf.occupants.iter().skip(1).copied().collect();
    descend(root, &query, cell, leaves, &touches, &mut out);
    out
}

fn descend<N: PartitionNode>(
    node: &N,
    query: &AABB,
    cell: usize,
    leaves: &[LeafCell],
    touches: &impl Fn(&AABB, &AABB) -> bool,
    out: &mut Vec<BodyIndex>,
) {
    if !touches(node.bounds(), query) {
        return;
    }

    match node.children() {
        Some(children) => {
            for child in children {
                descend(child, query, cell, leaves, touches, out);
            }
        }
        None => {
            let slot = node.leaf_slot();
            if slot != cell {
                if let Some(other) = leaves.get(slot) {
                    out.extend_from_slice(&other.occupants);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn region() -> AABB {
        AABB::new(Vec3::new(-10.0, -10.0, -10.0), Vec3::new(10.0, 10.0, 10.0))
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("quadtree".parse::<IndexBackend>().unwrap(), IndexBackend::QuadTree);
        assert_eq!("Octree".parse::<IndexBackend>().unwrap(), IndexBackend::Octree);
        assert!("bsp".parse::<IndexBackend>().is_err());
        assert_eq!(IndexBackend::QuadTree.to_string(), "quadtree");
    }

    #[test]
    fn test_build_selects_backend() {
        for backend in [IndexBackend::QuadTree, IndexBackend::Octree] {
            let index = backend.build(region(), PartitionConfig::default());
            assert_eq!(index.backend(), backend);
        }
    }

    #[test]
    fn test_root_bounds_grow_to_cover_strays() {
        let positions = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(25.0, 0.0, -30.0)];
        let bounds = root_bounds(&region(), &positions);
        assert!(bounds.contains_point(positions[1]));
        assert!(bounds.contains_point(region().min));
    }

    #[test]
    fn test_every_body_is_indexed_once() {
        let positions: Vec<Vec3> = (0..40)
            .map(|i| {
                let t = i as f32;
                Vec3::new((t * 1.7).sin() * 9.0, (t * 0.3).cos() * 9.0, (t * 2.3).sin() * 9.0)
            })
            .collect();

        for backend in [IndexBackend::QuadTree, IndexBackend::Octree] {
            let mut index = backend.build(region(), PartitionConfig::default());
            index.rebuild(&positions);

            let mut seen: Vec<BodyIndex> = index
                .leaf_cells()
                .iter()
                .flat_map(|cell| cell.occupants.iter().copied())
                .collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..positions.len()).collect::<Vec<_>>(), "{backend}");
        }
    }

    #[test]
    fn test_neighbors_exclude_representative() {
        let positions = [Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.1, 1.0, 1.0), Vec3::new(1.2, 1.0, 1.0)];
        for backend in [IndexBackend::QuadTree, IndexBackend::Octree] {
            let mut index = backend.build(region(), PartitionConfig::default());
            index.rebuild(&positions);

            for (cell_index, cell) in index.leaf_cells().iter().enumerate() {
                if let Some(representative) = cell.representative() {
                    let neighbors = index.neighbor_occupants(cell_index);
                    assert!(!neighbors.contains(&representative));
                }
            }
        }
    }

    /// Leaves touching once rounding is forgiven; the tolerance is far below
    /// any cell size the partition can produce
    fn touching(backend: IndexBackend, a: &AABB, b: &AABB) -> bool {
        let a = a.expanded(1e-4);
        match backend {
            IndexBackend::Octree => a.intersects(b),
            IndexBackend::QuadTree => a.intersects_xz(b),
        }
    }

    #[test]
    fn test_every_touching_leaf_is_a_neighbor() {
        // Off-centre bounds give split planes that are not round numbers
        let region = AABB::new(Vec3::new(-3.7, -1.3, -6.1), Vec3::new(9.4, 4.9, 2.3));
        let config = PartitionConfig {
            max_occupants_per_leaf: 1,
            max_depth: 6,
            min_cell_size: 0.05,
        };

        for backend in [IndexBackend::QuadTree, IndexBackend::Octree] {
            let mut mixed_depth_pairs = 0;

            for seed in 0..8 {
                let mut rng = StdRng::seed_from_u64(seed);
                let positions: Vec<Vec3> = (0..60)
                    .map(|_| {
                        Vec3::new(
                            rng.gen_range(region.min.x..region.max.x),
                            rng.gen_range(region.min.y..region.max.y),
                            rng.gen_range(region.min.z..region.max.z),
                        )
                    })
                    .collect();

                let mut index = backend.build(region, config);
                index.rebuild(&positions);
                let leaves = index.leaf_cells();

                for (cell, leaf) in leaves.iter().enumerate() {
                    if leaf.occupants.is_empty() {
                        continue;
                    }

                    let mut expected: Vec<BodyIndex> = leaf.occupants.iter().skip(1).copied().collect();
                    for (other_cell, other) in leaves.iter().enumerate() {
                        if other_cell != cell && touching(backend, &leaf.bounds, &other.bounds) {
                            expected.extend_from_slice(&other.occupants);
                            if other.depth != leaf.depth && !other.occupants.is_empty() {
                                mixed_depth_pairs += 1;
                            }
                        }
                    }

                    let mut found = index.neighbor_occupants(cell);
                    expected.sort_unstable();
                    found.sort_unstable();
                    assert_eq!(found, expected, "{backend}, seed {seed}, leaf {cell}");
                }
            }

            assert!(mixed_depth_pairs > 0, "{backend} never produced leaves of different depths");
        }
    }
}
