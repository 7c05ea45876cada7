//! Spatial partitioning for broad-phase candidate generation
//!
//! Bodies are indexed by their centroid. Both tree backends rebuild from
//! scratch every tick and expose a flat list of leaf cells.

pub mod aabb;
pub mod octree;
pub mod quadtree;
pub mod spatial_index;

pub use aabb::AABB;
pub use octree::{Octree, OctreeNode};
pub use quadtree::QuadTree;
pub use spatial_index::{IndexBackend, LeafCell, PartitionConfig, SpatialIndex};
