//! Broad phase: candidate pairs from the spatial index
//!
//! Based on Game Engine Architecture 3rd Edition, Section 13.3.1:
//! "The broad phase quickly identifies pairs of objects that might be
//! colliding using some kind of spatial partitioning scheme."
//!
//! Every non-empty leaf nominates its first occupant as the `a` side and
//! pairs it with each neighbour occupant. Bodies that are never first in a
//! leaf only ever appear on the `b` side, so two of them are never compared
//! with each other. The same pair may be produced by more than one leaf.

use std::collections::HashSet;

use crate::bodies::BodyIndex;
use crate::physics::collision::Penetration;
use crate::spatial::SpatialIndex;

/// Two distinct bodies proposed for a narrow-phase test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidatePair {
    /// Representative of the nominating leaf
    pub a: BodyIndex,
    /// Occupant of the same or a touching leaf
    pub b: BodyIndex,
}

impl CandidatePair {
    /// Order-independent key, smaller index first
    #[must_use]
    pub fn key(&self) -> (BodyIndex, BodyIndex) {
        if self.a < self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }
}

/// A candidate pair confirmed by the narrow phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    /// The bodies involved
    pub pair: CandidatePair,
    /// How far and along which axis they overlap, from A's side
    pub penetration: Penetration,
}

/// Lazy stream of candidate pairs over any [`SpatialIndex`]
pub struct CandidatePairs<'a> {
    index: &'a dyn SpatialIndex,
    next_cell: usize,
    representative: BodyIndex,
    pending: std::vec::IntoIter<BodyIndex>,
    seen: Option<HashSet<(BodyIndex, BodyIndex)>>,
}

impl<'a> CandidatePairs<'a> {
    /// Start streaming pairs from the index's current partition
    #[must_use]
    pub fn new(index: &'a dyn SpatialIndex) -> Self {
        Self {
            index,
            next_cell: 0,
            representative: 0,
            pending: Vec::new().into_iter(),
            seen: None,
        }
    }

    /// Drop pairs whose [`CandidatePair::key`] was already yielded
    #[must_use]
    pub fn deduplicated(mut self, enabled: bool) -> Self {
        self.seen = enabled.then(HashSet::new);
        self
    }

    /// Move to the next occupied leaf; false once the leaves run out
    fn advance_cell(&mut self) -> bool {
        let index = self.index;
        while let Some(cell) = index.leaf_cells().get(self.next_cell) {
            let cell_index = self.next_cell;
            self.next_cell += 1;

            if let Some(representative) = cell.representative() {
                self.representative = representative;
                self.pending = index.neighbor_occupants(cell_index).into_iter();
                return true;
            }
        }
        false
    }
}

impl Iterator for CandidatePairs<'_> {
    type Item = CandidatePair;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            for b in self.pending.by_ref() {
                if b == self.representative {
                    continue;
                }
                let pair = CandidatePair {
                    a: self.representative,
                    b,
                };
                if let Some(seen) = self.seen.as_mut() {
                    if !seen.insert(pair.key()) {
                        continue;
                    }
                }
                return Some(pair);
            }

            if !self.advance_cell() {
                return None;
            }
        }
    }
}
