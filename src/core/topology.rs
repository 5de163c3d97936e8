//! Topology represents an N-dimensional space through a list of dimensions and corresponding stride values.
//! The struct converts between flat indices and coordinates in this space, and iterates over
//! neighborhoods within a radius of a center index.
//!
//! Both the input space and the column space of the spatial pooler are N-dimensional:
//! - a column samples its potential pool from a neighborhood of its mapped center in input space,
//! - local inhibition and local duty cycle floors compete within a neighborhood in column space.
//!
//! Coordinates are row-major: the last dimension varies fastest.

use serde::{Deserialize, Serialize};

/// The shape of an N-dimensional space plus precomputed strides for flat index conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    dims: Vec<usize>,
    strides: Vec<usize>,
}

impl Topology {
    /// Creates a new `Topology` from a slice of dimension sizes. `dimensions` must not be empty.
    #[inline]
    pub fn new(dimensions: &[usize]) -> Self {
        let dims = dimensions.to_vec();
        let strides = Self::strides(&dims);

        Self { dims, strides }
    }

    #[inline]
    fn strides(dims: &[usize]) -> Vec<usize> {
        let mut strides = vec![1; dims.len()];

        for i in (0..dims.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * dims[i + 1];
        }

        strides
    }

    #[inline]
    pub fn dimensions(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn num_dimensions(&self) -> usize {
        self.dims.len()
    }

    /// Number of points in the space.
    #[inline]
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    /// The largest single dimension.
    #[inline]
    pub fn max_dimension(&self) -> usize {
        self.dims.iter().copied().max().unwrap_or(0)
    }

    /// Converts a flat index into one coordinate per dimension.
    #[inline]
    pub fn coordinates(&self, index: usize) -> Vec<usize> {
        let mut remainder = index;

        self.strides
            .iter()
            .map(|&stride| {
                let coord = remainder / stride;
                remainder %= stride;
                coord
            })
            .collect()
    }

    /// Converts coordinates back into a flat index. `coords` must have one entry per dimension.
    #[inline]
    pub fn index_from_coordinates(&self, coords: &[usize]) -> usize {
        coords.iter().zip(&self.strides).map(|(&c, &s)| c * s).sum()
    }

    /// Returns an iterator over every index within `radius` of `center` (the center included).
    ///
    /// - Without wrapping, the window is clipped at the edges of each dimension.
    /// - With wrapping, the window continues on the opposite edge, and never covers a
    ///   coordinate twice even when `2 * radius + 1` exceeds the dimension.
    #[inline]
    pub fn neighborhood(&self, center: usize, radius: usize, wrapping: bool) -> NeighborhoodIter<'_> {
        let radius = radius as isize;

        let bounds: Vec<(isize, isize)> = self
            .coordinates(center)
            .iter()
            .zip(&self.dims)
            .map(|(&c, &dim)| {
                let c = c as isize;
                let dim = dim as isize;

                if wrapping {
                    (c - radius, (c - radius + dim).min(c + radius + 1))
                } else {
                    ((c - radius).max(0), (c + radius + 1).min(dim))
                }
            })
            .collect();

        let remaining = bounds
            .iter()
            .map(|&(low, high)| (high - low).max(0) as usize)
            .product();
        let current = bounds.iter().map(|&(low, _)| low).collect();

        NeighborhoodIter {
            topology: self,
            bounds,
            current,
            remaining,
            wrapping,
        }
    }

    /// Collects the neighborhood of `center` into a vector.
    #[inline]
    pub fn neighbors(&self, center: usize, radius: usize, wrapping: bool) -> Vec<usize> {
        self.neighborhood(center, radius, wrapping).collect()
    }
}

/// Iterates over the flat indices of a windowed neighborhood, last dimension fastest.
pub struct NeighborhoodIter<'a> {
    topology: &'a Topology,
    bounds: Vec<(isize, isize)>,
    current: Vec<isize>,
    remaining: usize,
    wrapping: bool,
}

impl Iterator for NeighborhoodIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let coords: Vec<usize> = self
            .current
            .iter()
            .zip(&self.topology.dims)
            .map(|(&val, &dim)| {
                if self.wrapping {
                    val.rem_euclid(dim as isize) as usize
                } else {
                    val as usize
                }
            })
            .collect();
        let result = self.topology.index_from_coordinates(&coords);

        self.remaining -= 1;
        for i in (0..self.current.len()).rev() {
            if self.current[i] + 1 < self.bounds[i].1 {
                self.current[i] += 1;
                break;
            }
            self.current[i] = self.bounds[i].0;
        }

        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for NeighborhoodIter<'_> {}
