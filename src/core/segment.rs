//! Dendrite segments come in two materially different kinds, kept as separate types:
//!
//! - A `ProximalDendrite` belongs to a column and owns that column's `Pool` of feed-forward
//!   synapses. There is exactly one per column and it is never destroyed.
//! - A `DistalDendrite` belongs to a cell and collects lateral synapses from other cells.
//!   Distal segments are created and destroyed while the temporal memory learns. They live in
//!   the `Connections` arena and are addressed by a recyclable flat index (`SegmentIdx`).

use super::{pool::Pool, synapses::SynapseIdx};

/// Flat index of a distal segment in the connections arena.
pub type SegmentIdx = usize;

/// The feed-forward dendrite of a column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProximalDendrite {
    column: usize,
    pool: Pool,
}

impl ProximalDendrite {
    #[inline]
    pub fn new(column: usize) -> Self {
        Self {
            column,
            pool: Pool::default(),
        }
    }

    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    #[inline]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    #[inline]
    pub fn pool_mut(&mut self) -> &mut Pool {
        &mut self.pool
    }

    /// Replaces the potential pool, discarding every permanence.
    #[inline]
    pub fn set_pool(&mut self, pool: Pool) {
        self.pool = pool;
    }
}

/// A lateral dendrite segment on a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct DistalDendrite {
    /// The cell that owns this segment.
    pub cell: usize,

    /// Slot of this segment in the arena.
    pub flat_idx: SegmentIdx,

    /// Global creation order. Orders segments of the same cell.
    pub ordinal: u64,

    /// Temporal memory iteration in which the segment was last active (or created).
    pub last_used_iteration: u64,

    /// Synapses in creation order.
    pub synapses: Vec<SynapseIdx>,
}

impl DistalDendrite {
    pub fn new(cell: usize, flat_idx: SegmentIdx, ordinal: u64, last_used_iteration: u64) -> Self {
        Self {
            cell,
            flat_idx,
            ordinal,
            last_used_iteration,
            synapses: Vec::new(),
        }
    }
}
