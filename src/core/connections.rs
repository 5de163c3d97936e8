//! `Connections` is the shared state store both algorithms operate on.
//!
//! It owns:
//! - the column and cell arrays (fixed at construction),
//! - the distal segment arena with a free list of reclaimed flat indices,
//! - the distal synapse arena with its own free list,
//! - the reverse "receptor" map from a presynaptic cell to the synapses it drives,
//! - the spatial pooler's derived statistics (overlaps, duty cycles, boost factors, inhibition radius),
//! - the temporal memory's per-cycle state (active/winner cells, active/matching segments),
//! - the seeded random generator every random choice draws from.
//!
//! Everything is addressed by integer index, never by reference, so cells, segments and synapses
//! can point at each other without ownership cycles. All structural mutation goes through the
//! methods below, which keep the per-cell, per-segment and receptor indices in step.
//!
//! Capacity is enforced by eviction, not by error: creating a segment on a full cell first destroys
//! its least recently used segment, and creating a synapse on a full segment first destroys its
//! weakest synapse.

use super::{
    column::{Cell, Column},
    parameters::Parameters,
    segment::{DistalDendrite, SegmentIdx},
    synapses::{Synapse, SynapseIdx, SynapsePermanenceOptions},
    topology::Topology,
};
use crate::error::Result;
use fxhash::FxHashMap;
use rand::{rngs::StdRng, SeedableRng};
use std::cmp::Ordering;
use std::ops::Range;

/// Tolerance used by permanence comparisons on distal synapses.
pub const EPSILON: f64 = 0.00001;

/// Per-segment activity counts, indexed by segment flat index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activity {
    /// Active synapses at or above the connected permanence.
    pub num_active_connected: Vec<usize>,

    /// Active synapses regardless of permanence.
    pub num_active_potential: Vec<usize>,
}

impl Activity {
    #[inline]
    pub fn connected(&self, segment: SegmentIdx) -> usize {
        self.num_active_connected.get(segment).copied().unwrap_or(0)
    }

    #[inline]
    pub fn potential(&self, segment: SegmentIdx) -> usize {
        self.num_active_potential.get(segment).copied().unwrap_or(0)
    }
}

/// The aggregate HTM state store.
#[derive(Debug, Clone)]
pub struct Connections {
    pub(crate) params: Parameters,
    pub(crate) num_inputs: usize,
    pub(crate) num_columns: usize,

    /// Potential radius resolved against the input space.
    pub(crate) potential_radius: usize,
    pub(crate) proximal_options: SynapsePermanenceOptions,

    pub(crate) input_topology: Topology,
    pub(crate) column_topology: Topology,

    pub(crate) columns: Vec<Column>,
    pub(crate) cells: Vec<Cell>,

    pub(crate) segments: Vec<Option<DistalDendrite>>,
    free_segments: Vec<SegmentIdx>,
    next_segment_ordinal: u64,
    num_segments: usize,

    pub(crate) synapses: Vec<Option<Synapse>>,
    free_synapses: Vec<SynapseIdx>,
    next_synapse_ordinal: u64,
    num_synapses: usize,
    receptors: FxHashMap<usize, Vec<SynapseIdx>>,

    pub(crate) overlaps: Vec<f64>,
    pub(crate) boosted_overlaps: Vec<f64>,
    pub(crate) overlap_duty_cycles: Vec<f64>,
    pub(crate) active_duty_cycles: Vec<f64>,
    pub(crate) min_overlap_duty_cycles: Vec<f64>,
    pub(crate) min_active_duty_cycles: Vec<f64>,
    pub(crate) boost_factors: Vec<f64>,
    pub(crate) inhibition_radius: usize,
    pub(crate) sp_iteration_num: u64,
    pub(crate) sp_iteration_learn_num: u64,
    pub(crate) active_columns: Vec<usize>,
    pub(crate) sp_initialized: bool,

    pub(crate) tm_iteration: u64,
    pub(crate) active_cells: Vec<usize>,
    pub(crate) winner_cells: Vec<usize>,
    pub(crate) active_segments: Vec<SegmentIdx>,
    pub(crate) matching_segments: Vec<SegmentIdx>,
    pub(crate) last_activity: Option<Activity>,

    pub(crate) rng: StdRng,
}

impl Connections {
    /// Builds the store: columns, cells, topologies, and zeroed statistics.
    /// Potential pools stay empty until `SpatialPooler::init` fills them.
    pub fn new(params: Parameters) -> Result<Self> {
        params.validate_dimensions()?;

        let num_inputs = params.num_inputs();
        let num_columns = params.num_columns();
        let input_topology = Topology::new(&params.input_dimensions);
        let column_topology = Topology::new(&params.column_dimensions);
        let potential_radius = params
            .potential_radius
            .unwrap_or_else(|| input_topology.max_dimension());

        let proximal_options = SynapsePermanenceOptions {
            inactive_decrement: params.syn_perm_inactive_dec,
            active_increment: params.syn_perm_active_inc,
            connected: params.syn_perm_connected,
            below_stimulus_increment: params.syn_perm_connected / 10.0,
            min: params.syn_perm_min,
            max: params.syn_perm_max,
            trim_threshold: params.syn_perm_active_inc / 2.0,
        };

        let cells_per_column = params.cells_per_column;
        let columns: Vec<Column> = (0..num_columns)
            .map(|index| Column::new(index, cells_per_column))
            .collect();
        let cells: Vec<Cell> = (0..num_columns * cells_per_column)
            .map(|index| Cell::new(index, index / cells_per_column))
            .collect();

        log::debug!(
            "created connections: {} inputs, {} columns, {} cells",
            num_inputs,
            num_columns,
            cells.len()
        );

        Ok(Self {
            rng: StdRng::seed_from_u64(params.seed),
            num_inputs,
            num_columns,
            potential_radius,
            proximal_options,
            input_topology,
            column_topology,
            columns,
            cells,
            segments: Vec::new(),
            free_segments: Vec::new(),
            next_segment_ordinal: 0,
            num_segments: 0,
            synapses: Vec::new(),
            free_synapses: Vec::new(),
            next_synapse_ordinal: 0,
            num_synapses: 0,
            receptors: FxHashMap::default(),
            overlaps: vec![0.0; num_columns],
            boosted_overlaps: vec![0.0; num_columns],
            overlap_duty_cycles: vec![0.0; num_columns],
            active_duty_cycles: vec![0.0; num_columns],
            min_overlap_duty_cycles: vec![0.0; num_columns],
            min_active_duty_cycles: vec![0.0; num_columns],
            boost_factors: vec![1.0; num_columns],
            inhibition_radius: 0,
            sp_iteration_num: 0,
            sp_iteration_learn_num: 0,
            active_columns: Vec::new(),
            sp_initialized: false,
            tm_iteration: 0,
            active_cells: Vec::new(),
            winner_cells: Vec::new(),
            active_segments: Vec::new(),
            matching_segments: Vec::new(),
            last_activity: None,
            params,
        })
    }

    // ---------------------------------------------------------------------
    // Configuration and topology
    // ---------------------------------------------------------------------

    #[inline]
    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn cells_per_column(&self) -> usize {
        self.params.cells_per_column
    }

    #[inline]
    pub fn potential_radius(&self) -> usize {
        self.potential_radius
    }

    #[inline]
    pub fn proximal_options(&self) -> &SynapsePermanenceOptions {
        &self.proximal_options
    }

    #[inline]
    pub fn input_topology(&self) -> &Topology {
        &self.input_topology
    }

    #[inline]
    pub fn column_topology(&self) -> &Topology {
        &self.column_topology
    }

    #[inline]
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    #[inline]
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Global cell indices of `column`.
    #[inline]
    pub fn cells_for_column(&self, column: usize) -> Range<usize> {
        let cpc = self.params.cells_per_column;
        column * cpc..(column + 1) * cpc
    }

    #[inline]
    pub fn column_for_cell(&self, cell: usize) -> usize {
        cell / self.params.cells_per_column
    }

    // ---------------------------------------------------------------------
    // Spatial pooler statistics
    // ---------------------------------------------------------------------

    /// Raw overlaps of the last spatial pooler cycle.
    #[inline]
    pub fn overlaps(&self) -> &[f64] {
        &self.overlaps
    }

    /// Overlaps after boosting, as fed to inhibition in the last cycle.
    #[inline]
    pub fn boosted_overlaps(&self) -> &[f64] {
        &self.boosted_overlaps
    }

    #[inline]
    pub fn overlap_duty_cycles(&self) -> &[f64] {
        &self.overlap_duty_cycles
    }

    #[inline]
    pub fn active_duty_cycles(&self) -> &[f64] {
        &self.active_duty_cycles
    }

    #[inline]
    pub fn min_overlap_duty_cycles(&self) -> &[f64] {
        &self.min_overlap_duty_cycles
    }

    #[inline]
    pub fn min_active_duty_cycles(&self) -> &[f64] {
        &self.min_active_duty_cycles
    }

    #[inline]
    pub fn boost_factors(&self) -> &[f64] {
        &self.boost_factors
    }

    #[inline]
    pub fn inhibition_radius(&self) -> usize {
        self.inhibition_radius
    }

    /// Spatial pooler cycles run so far, and how many of them learned.
    #[inline]
    pub fn sp_iterations(&self) -> (u64, u64) {
        (self.sp_iteration_num, self.sp_iteration_learn_num)
    }

    /// Winning columns of the last spatial pooler cycle, ascending.
    #[inline]
    pub fn active_columns(&self) -> &[usize] {
        &self.active_columns
    }

    /// Permanences of `column`'s potential pool over the whole input space.
    pub fn permanences_for_column(&self, column: usize) -> Vec<f64> {
        self.columns[column]
            .proximal_dendrite()
            .pool()
            .dense_permanences(self.num_inputs)
    }

    /// Connected inputs of `column`, ascending.
    pub fn connected_inputs_for_column(&self, column: usize) -> &[usize] {
        self.columns[column].proximal_dendrite().pool().connected()
    }

    // ---------------------------------------------------------------------
    // Temporal memory state
    // ---------------------------------------------------------------------

    #[inline]
    pub fn tm_iteration(&self) -> u64 {
        self.tm_iteration
    }

    /// Active cells of the last temporal memory cycle, ascending.
    #[inline]
    pub fn active_cells(&self) -> &[usize] {
        &self.active_cells
    }

    #[inline]
    pub fn winner_cells(&self) -> &[usize] {
        &self.winner_cells
    }

    /// Active segments ordered by (cell, ordinal).
    #[inline]
    pub fn active_segments(&self) -> &[SegmentIdx] {
        &self.active_segments
    }

    /// Matching segments ordered by (cell, ordinal).
    #[inline]
    pub fn matching_segments(&self) -> &[SegmentIdx] {
        &self.matching_segments
    }

    #[inline]
    pub fn last_activity(&self) -> Option<&Activity> {
        self.last_activity.as_ref()
    }

    /// Cells predicted for the next cycle: the distinct owners of the active segments, ascending.
    pub fn predictive_cells(&self) -> Vec<usize> {
        let mut cells: Vec<usize> = Vec::new();
        for &segment in &self.active_segments {
            if let Some(cell) = self.cell_for_segment(segment) {
                if cells.last() != Some(&cell) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    /// Clears the per-cycle temporal memory state. Structure (segments, synapses) is kept.
    pub fn clear(&mut self) {
        self.active_cells.clear();
        self.winner_cells.clear();
        self.active_segments.clear();
        self.matching_segments.clear();
        self.last_activity = None;
    }

    // ---------------------------------------------------------------------
    // Segments
    // ---------------------------------------------------------------------

    /// Creates a segment on `cell`, evicting the least recently used one while the cell is full.
    pub fn create_segment(&mut self, cell: usize) -> SegmentIdx {
        let max = self.params.max_segments_per_cell;
        while self.cells[cell].segments.len() >= max {
            match self.least_recently_used_segment(cell) {
                Some(lru) => {
                    log::trace!("cell {cell} full, evicting segment {lru}");
                    self.destroy_segment(lru);
                }
                None => break,
            }
        }

        let ordinal = self.next_segment_ordinal;
        self.next_segment_ordinal += 1;

        let flat_idx = match self.free_segments.pop() {
            Some(idx) => idx,
            None => {
                self.segments.push(None);
                self.segments.len() - 1
            }
        };

        self.segments[flat_idx] = Some(DistalDendrite::new(
            cell,
            flat_idx,
            ordinal,
            self.tm_iteration,
        ));
        self.cells[cell].segments.push(flat_idx);
        self.num_segments += 1;

        flat_idx
    }

    /// Destroys a segment together with all its synapses and recycles its flat index.
    pub fn destroy_segment(&mut self, segment: SegmentIdx) {
        let Some(dendrite) = self.segments.get_mut(segment).and_then(Option::take) else {
            return;
        };

        for syn in dendrite.synapses {
            if let Some(synapse) = self.synapses[syn].take() {
                self.remove_receptor(synapse.presynaptic_cell, syn);
                self.free_synapses.push(syn);
                self.num_synapses -= 1;
            }
        }

        self.cells[dendrite.cell].segments.retain(|&s| s != segment);
        self.free_segments.push(segment);
        self.num_segments -= 1;
    }

    /// The segment of `cell` used least recently. Ties go to the earliest created.
    pub fn least_recently_used_segment(&self, cell: usize) -> Option<SegmentIdx> {
        self.cells[cell]
            .segments
            .iter()
            .copied()
            .min_by_key(|&s| {
                self.segments[s]
                    .as_ref()
                    .map_or(u64::MAX, |d| d.last_used_iteration)
            })
    }

    #[inline]
    pub fn segment(&self, segment: SegmentIdx) -> Option<&DistalDendrite> {
        self.segments.get(segment).and_then(Option::as_ref)
    }

    #[inline]
    pub fn cell_for_segment(&self, segment: SegmentIdx) -> Option<usize> {
        self.segment(segment).map(|d| d.cell)
    }

    #[inline]
    pub fn column_for_segment(&self, segment: SegmentIdx) -> Option<usize> {
        self.cell_for_segment(segment)
            .map(|cell| self.column_for_cell(cell))
    }

    /// Live segments of `cell` in creation order.
    #[inline]
    pub fn segments_for_cell(&self, cell: usize) -> &[SegmentIdx] {
        &self.cells[cell].segments
    }

    /// Stamps `segment` as used in the current iteration.
    #[inline]
    pub fn record_segment_activity(&mut self, segment: SegmentIdx) {
        let iteration = self.tm_iteration;
        if let Some(dendrite) = self.segments.get_mut(segment).and_then(Option::as_mut) {
            dendrite.last_used_iteration = iteration;
        }
    }

    /// Advances the temporal memory iteration counter.
    #[inline]
    pub fn start_new_iteration(&mut self) {
        self.tm_iteration += 1;
    }

    /// Orders segments by owning cell, then by creation ordinal. Dead segments sort last.
    pub fn compare_segments(&self, a: SegmentIdx, b: SegmentIdx) -> Ordering {
        let key = |s: SegmentIdx| {
            self.segment(s)
                .map_or((usize::MAX, u64::MAX), |d| (d.cell, d.ordinal))
        };
        key(a).cmp(&key(b))
    }

    /// Number of live segments, in total.
    #[inline]
    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    #[inline]
    pub fn num_segments_on_cell(&self, cell: usize) -> usize {
        self.cells[cell].segments.len()
    }

    /// Size of the segment arena, live or not. Activity vectors have this length.
    #[inline]
    pub fn segment_capacity(&self) -> usize {
        self.segments.len()
    }

    // ---------------------------------------------------------------------
    // Synapses
    // ---------------------------------------------------------------------

    /// Creates a synapse from `presynaptic_cell` onto `segment`, evicting the weakest synapse
    /// while the segment is full. Returns `None` if the segment does not exist.
    pub fn create_synapse(
        &mut self,
        segment: SegmentIdx,
        presynaptic_cell: usize,
        permanence: f64,
    ) -> Option<SynapseIdx> {
        self.segment(segment)?;

        let max = self.params.max_synapses_per_segment;
        while self.num_synapses_on_segment(segment) >= max {
            match self.min_permanence_synapse(segment) {
                Some(weakest) => {
                    log::trace!("segment {segment} full, evicting synapse {weakest}");
                    self.destroy_synapse(weakest);
                }
                None => break,
            }
        }

        let synapse = Synapse {
            presynaptic_cell,
            segment,
            permanence,
            ordinal: self.next_synapse_ordinal,
        };
        self.next_synapse_ordinal += 1;

        let idx = match self.free_synapses.pop() {
            Some(idx) => {
                self.synapses[idx] = Some(synapse);
                idx
            }
            None => {
                self.synapses.push(Some(synapse));
                self.synapses.len() - 1
            }
        };

        if let Some(dendrite) = self.segments[segment].as_mut() {
            dendrite.synapses.push(idx);
        }
        self.receptors.entry(presynaptic_cell).or_default().push(idx);
        self.num_synapses += 1;

        Some(idx)
    }

    /// Destroys a synapse. The owning segment survives even if it becomes empty.
    pub fn destroy_synapse(&mut self, synapse: SynapseIdx) {
        let Some(removed) = self.synapses.get_mut(synapse).and_then(Option::take) else {
            return;
        };

        self.remove_receptor(removed.presynaptic_cell, synapse);
        if let Some(dendrite) = self.segments[removed.segment].as_mut() {
            dendrite.synapses.retain(|&s| s != synapse);
        }
        self.free_synapses.push(synapse);
        self.num_synapses -= 1;
    }

    fn remove_receptor(&mut self, cell: usize, synapse: SynapseIdx) {
        if let Some(list) = self.receptors.get_mut(&cell) {
            if let Some(pos) = list.iter().position(|&s| s == synapse) {
                list.swap_remove(pos);
            }
            if list.is_empty() {
                self.receptors.remove(&cell);
            }
        }
    }

    /// The synapse of `segment` with the lowest permanence. Ties go to the earliest created.
    pub fn min_permanence_synapse(&self, segment: SegmentIdx) -> Option<SynapseIdx> {
        let dendrite = self.segment(segment)?;
        let mut weakest = None;
        let mut min_permanence = f64::MAX;

        for &syn in &dendrite.synapses {
            if let Some(synapse) = &self.synapses[syn] {
                if synapse.permanence < min_permanence - EPSILON {
                    min_permanence = synapse.permanence;
                    weakest = Some(syn);
                }
            }
        }

        weakest
    }

    #[inline]
    pub fn update_synapse_permanence(&mut self, synapse: SynapseIdx, permanence: f64) {
        if let Some(syn) = self.synapses.get_mut(synapse).and_then(Option::as_mut) {
            syn.permanence = permanence;
        }
    }

    #[inline]
    pub fn synapse(&self, synapse: SynapseIdx) -> Option<&Synapse> {
        self.synapses.get(synapse).and_then(Option::as_ref)
    }

    /// Synapses of `segment` in creation order.
    #[inline]
    pub fn synapses_for_segment(&self, segment: SegmentIdx) -> &[SynapseIdx] {
        self.segment(segment).map_or(&[], |d| d.synapses.as_slice())
    }

    /// Synapses driven by `cell`.
    #[inline]
    pub fn receptor_synapses(&self, cell: usize) -> &[SynapseIdx] {
        self.receptors.get(&cell).map_or(&[], Vec::as_slice)
    }

    /// Number of live synapses, in total.
    #[inline]
    pub fn num_synapses(&self) -> usize {
        self.num_synapses
    }

    #[inline]
    pub fn num_synapses_on_segment(&self, segment: SegmentIdx) -> usize {
        self.synapses_for_segment(segment).len()
    }

    /// Counts, per segment, the synapses whose presynaptic cell is in `active_cells`.
    /// A synapse counts as connected when its permanence exceeds `connected_permanence - EPSILON`.
    pub fn compute_activity(&self, active_cells: &[usize], connected_permanence: f64) -> Activity {
        let size = self.segments.len();
        let mut activity = Activity {
            num_active_connected: vec![0; size],
            num_active_potential: vec![0; size],
        };
        let threshold = connected_permanence - EPSILON;

        for cell in active_cells {
            for &syn in self.receptor_synapses(*cell) {
                if let Some(synapse) = &self.synapses[syn] {
                    activity.num_active_potential[synapse.segment] += 1;
                    if synapse.permanence > threshold {
                        activity.num_active_connected[synapse.segment] += 1;
                    }
                }
            }
        }

        activity
    }
}
