//! The `TemporalMemory` module implements a core component of HTM that learns and predicts temporal sequences.
//!
//! At a high level, it models a set of columns, where each column contains multiple cells.
//! Each cell can form multiple dendritic segments, which in turn consist of synapses.
//!
//! Bursting:
//! - When a column becomes active due to feed-forward input but no cell was correctly predicted, all cells in the column are activated.
//! - This process allows the system to learn new sequences and is called bursting.
//!
//! Winner Cells:
//! - Cells that have been selected based on their predictive state or through bursting, which then guide the learning process.
//! - Synapses only ever grow toward the winner cells of the previous time step.
//!
//! How It Works:
//! - The Temporal Memory processes input in discrete time steps.
//! - For each time step, it receives a set of active (feed-forward) columns.
//! - Active columns, last step's active segments and last step's matching segments are walked together, grouped by column.
//! - In each active column, it checks if any cell was correctly predicted by an active dendritic segment.
//! - If so, those cells are activated; otherwise, the column bursts.
//! - The algorithm then updates dendritic segments by reinforcing synapses that correctly predicted activity.
//! - Matching segments in columns that stayed inactive may be punished.
//! - Finally, segment activity is recomputed from the new active cells, which yields the next predictions.
//!
//! Like the spatial pooler, the temporal memory holds no state of its own: cells, segments,
//! synapses and the per-step activity all live in `Connections`.

use super::{
    connections::{Activity, Connections, EPSILON},
    group_by::{ColumnGroups, KeyedSegment},
    segment::SegmentIdx,
};
use crate::error::{HtmError, Result};
use fxhash::FxHashSet;
use rand::Rng;
use std::cmp::Reverse;
use std::mem;
use std::ops::Range;

/// The result of one temporal memory time step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputeCycle {
    /// Active cells, ascending.
    pub active_cells: Vec<usize>,

    /// Winner cells, ascending.
    pub winner_cells: Vec<usize>,

    /// Segments active on the new active cells, ordered by (cell, ordinal).
    pub active_segments: Vec<SegmentIdx>,

    /// Segments matching the new active cells, ordered by (cell, ordinal).
    pub matching_segments: Vec<SegmentIdx>,

    /// Cells predicted for the next step, ascending.
    pub predictive_cells: Vec<usize>,
}

impl ComputeCycle {
    /// Columns owning at least one predictive cell, ascending.
    pub fn predicted_columns(&self, cells_per_column: usize) -> Vec<usize> {
        let mut columns: Vec<usize> = self
            .predictive_cells
            .iter()
            .map(|&cell| cell / cells_per_column)
            .collect();
        columns.dedup();
        columns
    }

    /// Columns owning at least one active cell, ascending.
    pub fn active_columns(&self, cells_per_column: usize) -> Vec<usize> {
        let mut columns: Vec<usize> = self
            .active_cells
            .iter()
            .map(|&cell| cell / cells_per_column)
            .collect();
        columns.dedup();
        columns
    }
}

/// State of the previous time step that this step learns from.
#[derive(Debug, Clone, Default)]
pub struct PreviousCycle {
    pub active_cells: FxHashSet<usize>,

    /// Winner cells, ascending.
    pub winner_cells: Vec<usize>,

    /// Segment activity computed at the end of the previous step.
    pub activity: Activity,
}

/// Sequence learning over the cells and distal segments of a `Connections` store.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemporalMemory;

impl TemporalMemory {
    #[inline]
    pub fn new() -> Self {
        Self
    }

    /// Validates the distal learning parameters and clears any per-step state.
    pub fn init(&self, c: &mut Connections) -> Result<()> {
        c.params.validate_temporal()?;
        c.clear();

        log::debug!(
            "temporal memory initialized: {} cells in {} columns",
            c.num_cells(),
            c.num_columns
        );
        Ok(())
    }

    /// Executes one time step of the Temporal Memory algorithm:
    /// - `activate_cells` picks active and winner cells and learns on last step's segments.
    /// - `activate_dendrites` computes the segments (and so the cells) predicted for the next step.
    pub fn compute(&self, c: &mut Connections, active_columns: &[usize], learn: bool) -> Result<ComputeCycle> {
        if let Some(&index) = active_columns.iter().find(|&&col| col >= c.num_columns) {
            return Err(HtmError::ColumnOutOfBounds {
                index,
                num_columns: c.num_columns,
            });
        }

        let mut cycle = ComputeCycle::default();
        self.activate_cells(c, &mut cycle, active_columns, learn);
        self.activate_dendrites(c, &mut cycle, learn);

        Ok(cycle)
    }

    /// Starts a new sequence: clears active and winner cells and active and matching segments.
    /// Nothing grows toward cells that were active before the reset.
    pub fn reset(&self, c: &mut Connections) {
        c.clear();
        log::debug!("temporal memory reset at iteration {}", c.tm_iteration);
    }

    /// Calculates the active and winner cells from the active columns and last step's segments.
    ///
    /// For every column touched by the active columns or last step's segments:
    /// - active with active segments: `activate_predicted_column`,
    /// - active without active segments: `burst_column`,
    /// - inactive with matching segments (learning only): `punish_predicted_column`.
    pub fn activate_cells(
        &self,
        c: &mut Connections,
        cycle: &mut ComputeCycle,
        active_columns: &[usize],
        learn: bool,
    ) {
        let mut prev_winner_cells = mem::take(&mut c.winner_cells);
        prev_winner_cells.sort_unstable();
        let prev = PreviousCycle {
            active_cells: mem::take(&mut c.active_cells).into_iter().collect(),
            winner_cells: prev_winner_cells,
            activity: c.last_activity.take().unwrap_or_default(),
        };

        let mut columns = active_columns.to_vec();
        columns.sort_unstable();
        columns.dedup();

        let prev_active_segments = mem::take(&mut c.active_segments);
        let prev_matching_segments = mem::take(&mut c.matching_segments);
        let active_segments = Self::keyed_by_column(c, &prev_active_segments);
        let matching_segments = Self::keyed_by_column(c, &prev_matching_segments);

        for group in ColumnGroups::new(&columns, &active_segments, &matching_segments) {
            if group.active {
                if group.has_active_segments() {
                    let segments: Vec<SegmentIdx> = group.active_segments().collect();
                    let cells = self.activate_predicted_column(c, &segments, &prev, learn);
                    cycle.active_cells.extend_from_slice(&cells);
                    cycle.winner_cells.extend(cells);
                } else {
                    let segments: Vec<SegmentIdx> = group.matching_segments().collect();
                    let (cells, winner) = self.burst_column(c, group.column, &segments, &prev, learn);
                    cycle.active_cells.extend(cells);
                    cycle.winner_cells.push(winner);
                }
            } else if learn && group.has_matching_segments() {
                let segments: Vec<SegmentIdx> = group.matching_segments().collect();
                self.punish_predicted_column(c, &segments, &prev);
            }
        }

        cycle.active_cells.sort_unstable();
        cycle.active_cells.dedup();
        cycle.winner_cells.sort_unstable();
        cycle.winner_cells.dedup();
    }

    /// Tags each live segment with its column. Input ordered by cell yields output ordered by column.
    fn keyed_by_column(c: &Connections, segments: &[SegmentIdx]) -> Vec<KeyedSegment> {
        segments
            .iter()
            .filter_map(|&segment| c.column_for_segment(segment).map(|column| (column, segment)))
            .collect()
    }

    /// Calculates segment activity from this step's active cells:
    /// - active segments reach `activation_threshold` connected active synapses,
    /// - matching segments reach `min_threshold` active synapses of any permanence.
    ///
    /// Stores the new state in `c`. If learning, stamps active segments as used and advances the iteration.
    pub fn activate_dendrites(&self, c: &mut Connections, cycle: &mut ComputeCycle, learn: bool) {
        let activity = c.compute_activity(&cycle.active_cells, c.params.connected_permanence);
        let activation_threshold = c.params.activation_threshold;
        let min_threshold = c.params.min_threshold;

        let mut active_segments: Vec<SegmentIdx> = (0..c.segment_capacity())
            .filter(|&s| c.segment(s).is_some() && activity.connected(s) >= activation_threshold)
            .collect();
        let mut matching_segments: Vec<SegmentIdx> = (0..c.segment_capacity())
            .filter(|&s| c.segment(s).is_some() && activity.potential(s) >= min_threshold)
            .collect();
        active_segments.sort_by(|&a, &b| c.compare_segments(a, b));
        matching_segments.sort_by(|&a, &b| c.compare_segments(a, b));

        cycle.active_segments = active_segments.clone();
        cycle.matching_segments = matching_segments.clone();

        c.active_cells = cycle.active_cells.clone();
        c.winner_cells = cycle.winner_cells.clone();
        c.active_segments = active_segments;
        c.matching_segments = matching_segments;
        c.last_activity = Some(activity);
        cycle.predictive_cells = c.predictive_cells();

        if learn {
            for &segment in &cycle.active_segments {
                c.record_segment_activity(segment);
            }
            c.start_new_iteration();
        }

        log::trace!(
            "temporal memory iteration {}: {} active cells, {} predictive cells",
            c.tm_iteration,
            cycle.active_cells.len(),
            cycle.predictive_cells.len()
        );
    }

    /// Activates the cells of a column that were predicted in the previous time step:
    /// - Every distinct cell owning one of `active_segments` becomes active and winner.
    ///
    /// If learning is enabled, for each active segment:
    /// - Adapts its synapses toward the previously active cells.
    /// - Grows synapses toward previous winner cells, up to `max_new_synapse_count` active ones.
    ///
    /// Returns the predicted cells, ascending.
    pub fn activate_predicted_column(
        &self,
        c: &mut Connections,
        active_segments: &[SegmentIdx],
        prev: &PreviousCycle,
        learn: bool,
    ) -> Vec<usize> {
        let increment = c.params.permanence_increment;
        let decrement = c.params.permanence_decrement;
        let initial = c.params.initial_permanence;
        let max_new = c.params.max_new_synapse_count;

        let mut cells = Vec::new();
        for &segment in active_segments {
            let Some(cell) = c.cell_for_segment(segment) else {
                continue;
            };
            if cells.last() != Some(&cell) {
                cells.push(cell);
            }

            if learn {
                self.adapt_segment(c, segment, &prev.active_cells, increment, decrement);

                let desired = max_new.saturating_sub(prev.activity.potential(segment));
                if desired > 0 {
                    self.grow_synapses(c, &prev.winner_cells, segment, initial, desired);
                }
            }
        }

        cells
    }

    /// Bursts a column when no cell in the column was predicted to become active:
    /// - Marks all cells in the column as active.
    /// - With matching segments, the first one with the most active synapses picks the winner cell,
    ///   and is adapted and grown if learning.
    /// - Otherwise the least used cell wins and, if learning and there were previous winners,
    ///   gets a new segment grown toward them.
    ///
    /// Returns the column's cells and the winner cell.
    pub fn burst_column(
        &self,
        c: &mut Connections,
        column: usize,
        matching_segments: &[SegmentIdx],
        prev: &PreviousCycle,
        learn: bool,
    ) -> (Range<usize>, usize) {
        let cells = c.cells_for_column(column);
        let increment = c.params.permanence_increment;
        let decrement = c.params.permanence_decrement;
        let initial = c.params.initial_permanence;
        let max_new = c.params.max_new_synapse_count;

        let best = matching_segments
            .iter()
            .filter_map(|&segment| c.cell_for_segment(segment).map(|cell| (segment, cell)))
            .min_by_key(|&(segment, _)| Reverse(prev.activity.potential(segment)));

        let winner = match best {
            Some((segment, cell)) => {
                if learn {
                    self.adapt_segment(c, segment, &prev.active_cells, increment, decrement);

                    let desired = max_new.saturating_sub(prev.activity.potential(segment));
                    if desired > 0 {
                        self.grow_synapses(c, &prev.winner_cells, segment, initial, desired);
                    }
                }
                cell
            }
            None => {
                let cell = self.least_used_cell(c, cells.clone());
                if learn {
                    let exact = max_new.min(prev.winner_cells.len());
                    if exact > 0 {
                        let segment = c.create_segment(cell);
                        self.grow_synapses(c, &prev.winner_cells, segment, initial, exact);
                    }
                }
                cell
            }
        };

        (cells, winner)
    }

    /// Punishes the matching segments of a column that did not become active: synapses to
    /// previously active cells lose `predicted_segment_decrement`. Does nothing while that is zero.
    pub fn punish_predicted_column(
        &self,
        c: &mut Connections,
        matching_segments: &[SegmentIdx],
        prev: &PreviousCycle,
    ) {
        let decrement = c.params.predicted_segment_decrement;
        if decrement <= 0.0 {
            return;
        }

        for &segment in matching_segments {
            self.adapt_segment(c, segment, &prev.active_cells, -decrement, 0.0);
        }
    }

    /// The cell of `cells` with the fewest segments. Ties are broken at random.
    pub fn least_used_cell(&self, c: &mut Connections, cells: Range<usize>) -> usize {
        let min_segments = cells
            .clone()
            .map(|cell| c.num_segments_on_cell(cell))
            .min()
            .unwrap_or(0);
        let candidates: Vec<usize> = cells
            .filter(|&cell| c.num_segments_on_cell(cell) == min_segments)
            .collect();

        candidates[c.rng.random_range(0..candidates.len())]
    }

    /// Grows up to `desired` synapses on `segment` at `initial_permanence`:
    /// - Candidates are the previous winner cells not yet connected to the segment.
    /// - Picks are uniform without replacement.
    pub fn grow_synapses(
        &self,
        c: &mut Connections,
        prev_winner_cells: &[usize],
        segment: SegmentIdx,
        initial_permanence: f64,
        desired: usize,
    ) {
        if c.segment(segment).is_none() {
            return;
        }

        let existing: FxHashSet<usize> = c
            .synapses_for_segment(segment)
            .iter()
            .filter_map(|&syn| c.synapse(syn))
            .map(|syn| syn.presynaptic_cell)
            .collect();
        let mut candidates: Vec<usize> = prev_winner_cells
            .iter()
            .copied()
            .filter(|cell| !existing.contains(cell))
            .collect();

        let actual = desired.min(candidates.len());
        for _ in 0..actual {
            let pick = c.rng.random_range(0..candidates.len());
            let presynaptic = candidates.remove(pick);
            c.create_synapse(segment, presynaptic, initial_permanence);
        }
    }

    /// Updates the synapses on `segment`:
    /// - Strengthens synapses from previously active cells by `increment`, weakens the others by `decrement`.
    /// - Clips to [0, 1] and destroys synapses that drop below `EPSILON`.
    /// - Destroys the segment if no synapse survives.
    pub fn adapt_segment(
        &self,
        c: &mut Connections,
        segment: SegmentIdx,
        prev_active_cells: &FxHashSet<usize>,
        increment: f64,
        decrement: f64,
    ) {
        if c.segment(segment).is_none() {
            return;
        }

        let mut doomed = Vec::new();
        for syn in c.synapses_for_segment(segment).to_vec() {
            let Some(synapse) = c.synapse(syn) else {
                continue;
            };

            let permanence = if prev_active_cells.contains(&synapse.presynaptic_cell) {
                synapse.permanence + increment
            } else {
                synapse.permanence - decrement
            };
            let permanence = permanence.clamp(0.0, 1.0);

            if permanence < EPSILON {
                doomed.push(syn);
            } else {
                c.update_synapse_permanence(syn, permanence);
            }
        }

        for syn in doomed {
            c.destroy_synapse(syn);
        }

        if c.num_synapses_on_segment(segment) == 0 {
            c.destroy_segment(segment);
        }
    }
}
