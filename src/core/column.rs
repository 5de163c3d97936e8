//! A `Column` in HTM represents one feature detector or receptive field in the Spatial Pooler.
//!
//! Biological inspiration:
//! Columns in HTM are inspired by cortical mini-columns found in the brain.
//! They consist of a group of neurons, which in HTM are modeled as "cells".
//!
//! Meaning in HTM:
//! Each column receives input from a subset of the input space through its proximal dendrite,
//! and competes with other columns (via inhibition) to become active. The cells of an active
//! column then decide, in the temporal memory, which context the input appeared in.
//!
//! Membership is fixed at construction: column `c` owns the cells
//! `c * cells_per_column .. (c + 1) * cells_per_column`.

use super::segment::{ProximalDendrite, SegmentIdx};
use std::ops::Range;

/// Represents a cortical column in the HTM model.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    index: usize,
    cells: Range<usize>,
    proximal: ProximalDendrite,
}

impl Column {
    /// Creates column `index` with `cells_per_column` cells.
    pub fn new(index: usize, cells_per_column: usize) -> Self {
        let first = index * cells_per_column;
        Self {
            index,
            cells: first..first + cells_per_column,
            proximal: ProximalDendrite::new(index),
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Global indices of the cells in this column.
    #[inline]
    pub fn cells(&self) -> Range<usize> {
        self.cells.clone()
    }

    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn proximal_dendrite(&self) -> &ProximalDendrite {
        &self.proximal
    }

    #[inline]
    pub fn proximal_dendrite_mut(&mut self) -> &mut ProximalDendrite {
        &mut self.proximal
    }
}

/// A cell inside a column, with the distal segments it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    index: usize,
    column: usize,
    /// Live segments in creation order.
    pub(crate) segments: Vec<SegmentIdx>,
}

impl Cell {
    pub fn new(index: usize, column: usize) -> Self {
        Self {
            index,
            column,
            segments: Vec::new(),
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    #[inline]
    pub fn segments(&self) -> &[SegmentIdx] {
        &self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_owns_contiguous_cells() {
        let column = Column::new(3, 4);
        assert_eq!(column.index(), 3);
        assert_eq!(column.cells(), 12..16);
        assert_eq!(column.num_cells(), 4);
        assert_eq!(column.proximal_dendrite().column(), 3);
        assert_eq!(column.proximal_dendrite().pool().size(), 0);
    }
}
