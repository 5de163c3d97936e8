//! Three-way grouped iteration over sorted sequences keyed by column index.
//!
//! The temporal memory walks the active columns, last cycle's active segments and last cycle's
//! matching segments in a single merged pass. Each yielded `ColumnData` holds everything one column
//! needs: whether it is active now, and the slices of active and matching segments it owns. A
//! column appears if any of the three sequences mentions it, in ascending order.
//!
//! All three inputs must be sorted by column. Segment lists carry their column key alongside the
//! segment index, so the walk never needs to look back into the store.

use super::segment::SegmentIdx;

/// A segment tagged with the column of the cell that owns it.
pub type KeyedSegment = (usize, SegmentIdx);

/// Everything one column contributes to a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnData<'a> {
    pub column: usize,
    pub active: bool,
    active_segments: &'a [KeyedSegment],
    matching_segments: &'a [KeyedSegment],
}

impl<'a> ColumnData<'a> {
    pub fn active_segments(&self) -> impl Iterator<Item = SegmentIdx> + 'a {
        self.active_segments.iter().map(|&(_, segment)| segment)
    }

    pub fn matching_segments(&self) -> impl Iterator<Item = SegmentIdx> + 'a {
        self.matching_segments.iter().map(|&(_, segment)| segment)
    }

    #[inline]
    pub fn has_active_segments(&self) -> bool {
        !self.active_segments.is_empty()
    }

    #[inline]
    pub fn has_matching_segments(&self) -> bool {
        !self.matching_segments.is_empty()
    }
}

/// Merge-join over active columns, active segments and matching segments.
#[derive(Debug, Clone)]
pub struct ColumnGroups<'a> {
    columns: &'a [usize],
    active_segments: &'a [KeyedSegment],
    matching_segments: &'a [KeyedSegment],
}

impl<'a> ColumnGroups<'a> {
    pub fn new(
        columns: &'a [usize],
        active_segments: &'a [KeyedSegment],
        matching_segments: &'a [KeyedSegment],
    ) -> Self {
        Self {
            columns,
            active_segments,
            matching_segments,
        }
    }
}

/// Splits the leading run keyed by `column` off `slice`.
fn take_group<'a>(slice: &mut &'a [KeyedSegment], column: usize) -> &'a [KeyedSegment] {
    let len = slice.iter().take_while(|&&(key, _)| key == column).count();
    let (group, rest) = slice.split_at(len);
    *slice = rest;
    group
}

impl<'a> Iterator for ColumnGroups<'a> {
    type Item = ColumnData<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let column = [
            self.columns.first().copied(),
            self.active_segments.first().map(|&(key, _)| key),
            self.matching_segments.first().map(|&(key, _)| key),
        ]
        .into_iter()
        .flatten()
        .min()?;

        let repeats = self.columns.iter().take_while(|&&c| c == column).count();
        self.columns = &self.columns[repeats..];

        Some(ColumnData {
            column,
            active: repeats > 0,
            active_segments: take_group(&mut self.active_segments, column),
            matching_segments: take_group(&mut self.matching_segments, column),
        })
    }
}
