//! The `SpatialPooler` is a core component of HTM that:
//! - Initializes every column's potential pool, a subset of the input space around the column's center.
//! - Learns to increase/decrease synapse permanence (strength) values if the connected input bit was active/inactive.
//! - Computes an "overlap" score for each column based on how many connected synapses match the current input.
//! - Enforces sparse activity via inhibition, allowing only a subset of top columns to become "winner columns."
//!
//! Each column selectively "tunes" its connections to represent frequently encountered input patterns, leading to SDRs.
//!
//! What are duty cycles?
//! - They are rolling metrics that measure how often each column is meeting certain criteria over time.
//! - The SP tracks: overlap duty cycles (ODC) and active duty cycles (ADC).
//! - ODC tracks how frequently a column has a non-zero overlap score with the input.
//! - ADC tracks how frequently a column is chosen as a winner after inhibition.
//! - By comparing these metrics to per-column floors, the SP decides whether to bump or boost columns.
//! - This prevents columns from becoming inactive or uncompetitive over time.
//!
//! The pooler itself holds no state: every operation reads and writes a `Connections` store,
//! so one pooler can drive any number of independent stores.

use super::{connections::Connections, pool::Pool};
use crate::error::{HtmError, Result};
use rand::{seq::IteratorRandom, Rng};
use rayon::prelude::*;

/// Competitive sparse coding over the columns of a `Connections` store.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpatialPooler;

impl SpatialPooler {
    #[inline]
    pub fn new() -> Self {
        Self
    }

    /// Initializes the spatial pooler state of `c`:
    /// - Validates inhibition parameters.
    /// - Samples each column's potential pool and initializes its permanences.
    /// - Computes the initial inhibition radius.
    pub fn init(&self, c: &mut Connections) -> Result<()> {
        c.params.validate_inhibition()?;
        self.connect_and_configure_inputs(c)?;
        c.sp_initialized = true;

        log::debug!(
            "spatial pooler initialized: {} columns over {} inputs, inhibition radius {}",
            c.num_columns,
            c.num_inputs,
            c.inhibition_radius
        );
        Ok(())
    }

    /// Processes `input_vector` and writes the winning columns into `active_array`:
    /// - Updates iteration counters.
    /// - Calculates overlaps between columns and the input.
    /// - Applies boosting if learning is enabled.
    /// - Performs inhibition to pick winner columns.
    ///
    /// If learning is enabled:
    /// - Adapts the synapses of winner columns.
    /// - Updates duty cycles, bumps weak columns and recomputes boost factors.
    /// - Every `update_period` iterations, recomputes the inhibition radius and duty cycle floors.
    ///
    /// Returns the winning columns in ascending order.
    pub fn compute(
        &self,
        c: &mut Connections,
        input_vector: &[bool],
        active_array: &mut [bool],
        learn: bool,
    ) -> Result<Vec<usize>> {
        if !c.sp_initialized {
            return Err(HtmError::NotInitialized);
        }
        if input_vector.len() != c.num_inputs {
            return Err(HtmError::InputLengthMismatch {
                expected: c.num_inputs,
                actual: input_vector.len(),
            });
        }
        if active_array.len() != c.num_columns {
            return Err(HtmError::ActiveArrayLengthMismatch {
                expected: c.num_columns,
                actual: active_array.len(),
            });
        }

        self.update_bookkeeping_vars(c, learn);

        let overlaps = self.calculate_overlap(c, input_vector);
        let boosted: Vec<f64> = if learn {
            overlaps
                .iter()
                .zip(&c.boost_factors)
                .map(|(&overlap, &boost)| overlap * boost)
                .collect()
        } else {
            overlaps.clone()
        };
        c.overlaps = overlaps;

        let active_columns = self.inhibit_columns(c, &boosted);
        c.boosted_overlaps = boosted;

        if learn {
            self.adapt_synapses(c, input_vector, &active_columns)?;
            let overlaps = std::mem::take(&mut c.overlaps);
            self.update_duty_cycles(c, &overlaps, &active_columns);
            c.overlaps = overlaps;
            self.bump_up_weak_columns(c)?;
            self.update_boost_factors(c);
            if self.is_update_round(c) {
                self.update_inhibition_radius(c);
                self.update_min_duty_cycles(c);
            }
        }

        active_array.fill(false);
        for &column in &active_columns {
            active_array[column] = true;
        }

        log::trace!(
            "spatial pooler iteration {}: {} active columns",
            c.sp_iteration_num,
            active_columns.len()
        );
        c.active_columns = active_columns.clone();

        Ok(active_columns)
    }

    /// Removes columns that have never been active. Useful after a learning phase, before inference.
    pub fn strip_unlearned_columns(&self, c: &Connections, active_columns: &[usize]) -> Vec<usize> {
        active_columns
            .iter()
            .copied()
            .filter(|&column| c.active_duty_cycles[column] > 0.0)
            .collect()
    }

    /// Increments the iteration counters, including a separate counter if `learn` is true.
    #[inline]
    pub fn update_bookkeeping_vars(&self, c: &mut Connections, learn: bool) {
        c.sp_iteration_num += 1;
        if learn {
            c.sp_iteration_learn_num += 1;
        }
    }

    /// True on iterations where the inhibition radius and duty cycle floors get recomputed.
    #[inline]
    pub fn is_update_round(&self, c: &Connections) -> bool {
        c.sp_iteration_num % c.params.update_period == 0
    }

    /// Overlap of every column with `input_vector`. Values below the stimulus threshold become zero.
    pub fn calculate_overlap(&self, c: &Connections, input_vector: &[bool]) -> Vec<f64> {
        let threshold = c.params.stimulus_threshold;
        c.columns
            .iter()
            .map(|column| {
                let overlap = column.proximal_dendrite().pool().overlap(input_vector) as f64;
                if overlap < threshold {
                    0.0
                } else {
                    overlap
                }
            })
            .collect()
    }

    /// Overlap of every column divided by its number of connected synapses.
    pub fn calculate_overlap_pct(&self, c: &Connections, overlaps: &[f64]) -> Vec<f64> {
        overlaps
            .iter()
            .zip(&c.columns)
            .map(|(&overlap, column)| {
                let connected = column.proximal_dendrite().pool().num_connected();
                if connected == 0 {
                    0.0
                } else {
                    overlap / connected as f64
                }
            })
            .collect()
    }

    /// Samples, initializes and stores every column's potential pool, then sets the inhibition radius.
    pub fn connect_and_configure_inputs(&self, c: &mut Connections) -> Result<()> {
        let wrap_around = c.params.wrap_around;
        for column in 0..c.num_columns {
            let potential = self.map_potential(c, column, wrap_around);
            let pool = Pool::new(&potential);
            let permanences = self.init_permanence(c, pool.size());
            c.columns[column].proximal_dendrite_mut().set_pool(pool);
            self.update_permanences_for_column(c, column, permanences, true)?;
        }

        self.update_inhibition_radius(c);
        Ok(())
    }

    /// Draws `size` initial permanences, each connected with probability `init_connected_pct`.
    ///
    /// Connected values are spread over [connected, max), the others over [0, connected).
    /// Values are truncated to five decimals and values below the trim threshold become zero.
    pub fn init_permanence(&self, c: &mut Connections, size: usize) -> Vec<f64> {
        let options = c.proximal_options;
        let connected_pct = c.params.init_connected_pct;

        (0..size)
            .map(|_| {
                let raw = if c.rng.random::<f64>() <= connected_pct {
                    options.connected + (options.max - options.connected) * c.rng.random::<f64>()
                } else {
                    options.connected * c.rng.random::<f64>()
                };
                let permanence = (raw * 100_000.0).trunc() / 100_000.0;
                if permanence < options.trim_threshold {
                    0.0
                } else {
                    permanence
                }
            })
            .collect()
    }

    /// Samples the potential pool of `column`: a `potential_pct` share of the inputs within the
    /// potential radius of the column's center, ascending.
    pub fn map_potential(&self, c: &mut Connections, column: usize, wrap_around: bool) -> Vec<usize> {
        let center = self.map_column(c, column);
        let neighborhood = c
            .input_topology
            .neighborhood(center, c.potential_radius, wrap_around);
        let size = ((neighborhood.len() as f64 * c.params.potential_pct) + 0.5) as usize;

        let mut sample = neighborhood.choose_multiple(&mut c.rng, size);
        sample.sort_unstable();
        sample
    }

    /// Maps a column index to the "center" input index in the input space:
    /// - Proportionally maps the column's coordinates to the input grid coordinates.
    /// - Offset by half a column's share of the input.
    /// - Clamps the result to the valid input range.
    pub fn map_column(&self, c: &Connections, column: usize) -> usize {
        let coords: Vec<usize> = c
            .column_topology
            .coordinates(column)
            .into_iter()
            .zip(c.column_topology.dimensions())
            .zip(c.input_topology.dimensions())
            .map(|((index, &col_dim), &in_dim)| {
                let mapped = (index as f64 / col_dim as f64) * in_dim as f64
                    + (in_dim as f64 / col_dim as f64) * 0.5;
                (mapped as usize).min(in_dim - 1)
            })
            .collect();
        c.input_topology.index_from_coordinates(&coords)
    }

    /// Applies the proximal update rule to `column` with the given sparse `permanences`.
    ///
    /// When `raise` is set the column's pool must be large enough to ever reach the stimulus
    /// threshold, otherwise the potential radius is misconfigured for the input size.
    pub fn update_permanences_for_column(
        &self,
        c: &mut Connections,
        column: usize,
        permanences: Vec<f64>,
        raise: bool,
    ) -> Result<()> {
        let stimulus_threshold = c.params.stimulus_threshold;
        let options = c.proximal_options;
        let pool = c.columns[column].proximal_dendrite_mut().pool_mut();

        if raise && (pool.size() as f64) < stimulus_threshold {
            return Err(HtmError::PotentialPoolTooSmall {
                column,
                pool_size: pool.size(),
                stimulus_threshold,
            });
        }

        pool.update_permanences(permanences, raise, stimulus_threshold, &options);
        Ok(())
    }

    /// Adjusts the synapses of each winner column after an input is processed:
    /// - Increments permanence of synapses whose input bit was active.
    /// - Decrements permanence of synapses whose input bit was inactive.
    pub fn adapt_synapses(
        &self,
        c: &mut Connections,
        input_vector: &[bool],
        active_columns: &[usize],
    ) -> Result<()> {
        let increment = c.proximal_options.active_increment;
        let decrement = c.proximal_options.inactive_decrement;

        for &column in active_columns {
            let pool = c.columns[column].proximal_dendrite().pool();
            let permanences: Vec<f64> = pool
                .synapses()
                .iter()
                .map(|syn| {
                    if input_vector[syn.input] {
                        syn.permanence + increment
                    } else {
                        syn.permanence - decrement
                    }
                })
                .collect();
            self.update_permanences_for_column(c, column, permanences, true)?;
        }
        Ok(())
    }

    /// Raises every permanence of columns whose overlap duty cycle fell below their floor.
    pub fn bump_up_weak_columns(&self, c: &mut Connections) -> Result<()> {
        let weak: Vec<usize> = (0..c.num_columns)
            .filter(|&column| c.overlap_duty_cycles[column] < c.min_overlap_duty_cycles[column])
            .collect();
        let increment = c.proximal_options.below_stimulus_increment;

        for column in weak {
            let permanences: Vec<f64> = c.columns[column]
                .proximal_dendrite()
                .pool()
                .sparse_permanences()
                .into_iter()
                .map(|perm| perm + increment)
                .collect();
            self.update_permanences_for_column(c, column, permanences, true)?;
        }
        Ok(())
    }

    /// Updates the overlap and active duty cycles with this iteration's results.
    /// The averaging window grows with the iteration count until it reaches `duty_cycle_period`.
    pub fn update_duty_cycles(&self, c: &mut Connections, overlaps: &[f64], active_columns: &[usize]) {
        let period = c.params.duty_cycle_period.min(c.sp_iteration_num).max(1) as f64;

        let overlapping: Vec<f64> = overlaps
            .iter()
            .map(|&overlap| if overlap > 0.0 { 1.0 } else { 0.0 })
            .collect();
        let mut active = vec![0.0; c.num_columns];
        for &column in active_columns {
            active[column] = 1.0;
        }

        Self::update_duty_cycles_helper(&mut c.overlap_duty_cycles, &overlapping, period);
        Self::update_duty_cycles_helper(&mut c.active_duty_cycles, &active, period);
    }

    /// Moving average step: `dc = ((period - 1) * dc + new) / period`.
    pub fn update_duty_cycles_helper(duty_cycles: &mut [f64], new_values: &[f64], period: f64) {
        for (duty, &value) in duty_cycles.iter_mut().zip(new_values) {
            *duty = ((period - 1.0) * *duty + value) / period;
        }
    }

    /// Recalculates each column's boost factor from its active duty cycle:
    /// - A column at or below its floor is boosted linearly, from `max_boost` at zero activity to 1.0 at the floor.
    /// - A column above its floor gets 1.0.
    ///
    /// Leaves the factors untouched while every floor is zero.
    pub fn update_boost_factors(&self, c: &mut Connections) {
        if !c.min_active_duty_cycles.iter().any(|&min| min > 0.0) {
            return;
        }

        let max_boost = c.params.max_boost;
        for ((boost, &min), &active) in c
            .boost_factors
            .iter_mut()
            .zip(&c.min_active_duty_cycles)
            .zip(&c.active_duty_cycles)
        {
            *boost = if active > min {
                1.0
            } else {
                ((1.0 - max_boost) / min.max(f64::EPSILON)) * active + max_boost
            };
        }
    }

    /// Picks the winning columns from `overlaps`, ascending.
    ///
    /// Uses global inhibition when configured, or when the inhibition radius covers the whole column space.
    pub fn inhibit_columns(&self, c: &Connections, overlaps: &[f64]) -> Vec<usize> {
        let density = match c.params.local_area_density {
            Some(density) if density > 0.0 => density,
            _ => {
                let diameter = (2 * c.inhibition_radius + 1) as f64;
                let area = diameter
                    .powi(c.column_topology.num_dimensions() as i32)
                    .min(c.num_columns as f64);
                let target = c.params.num_active_columns_per_inh_area.unwrap_or(0.0);
                (target / area).min(0.5)
            }
        };

        if c.params.global_inhibition || c.inhibition_radius > c.column_topology.max_dimension() {
            self.inhibit_columns_global(c, overlaps, density)
        } else {
            self.inhibit_columns_local(c, overlaps, density)
        }
    }

    /// Takes the top `density * num_columns` columns by overlap, ties going to the higher index,
    /// then drops those below the stimulus threshold.
    pub fn inhibit_columns_global(&self, c: &Connections, overlaps: &[f64], density: f64) -> Vec<usize> {
        let num_active = ((density * c.num_columns as f64) as usize).min(c.num_columns);

        let mut sorted: Vec<usize> = (0..c.num_columns).collect();
        sorted.sort_by(|&a, &b| overlaps[a].total_cmp(&overlaps[b]).then(a.cmp(&b)));

        let threshold = c.params.stimulus_threshold;
        let mut start = sorted.len() - num_active;
        while start < sorted.len() && overlaps[sorted[start]] < threshold {
            start += 1;
        }

        let mut winners = sorted.split_off(start);
        winners.sort_unstable();
        winners
    }

    /// Each column competes with its neighborhood: it wins if fewer than `density * |neighborhood|`
    /// neighbors have a strictly greater overlap. Winners get a small bonus so that later columns
    /// in the same neighborhood see them as stronger.
    pub fn inhibit_columns_local(&self, c: &Connections, overlaps: &[f64], density: f64) -> Vec<usize> {
        let max_overlap = overlaps.iter().copied().fold(0.0, f64::max);
        let add_to_winners = if max_overlap == 0.0 {
            0.001
        } else {
            max_overlap / 1000.0
        };

        let threshold = c.params.stimulus_threshold;
        let mut tie_broken = overlaps.to_vec();
        let mut winners = Vec::new();

        for column in 0..c.num_columns {
            if overlaps[column] < threshold {
                continue;
            }

            let neighborhood = self.column_neighborhood(c, column, c.inhibition_radius);
            let num_bigger = neighborhood
                .iter()
                .filter(|&&n| tie_broken[n] > overlaps[column])
                .count();
            let num_active = (0.5 + density * neighborhood.len() as f64) as usize;

            if num_bigger < num_active {
                winners.push(column);
                tie_broken[column] += add_to_winners;
            }
        }

        winners
    }

    /// Columns within `radius` of `column`, the column itself included.
    #[inline]
    pub fn column_neighborhood(&self, c: &Connections, column: usize, radius: usize) -> Vec<usize> {
        c.column_topology
            .neighbors(column, radius, c.params.wrap_around)
    }

    /// Inputs within `radius` of `input`, the input itself included.
    #[inline]
    pub fn input_neighborhood(&self, c: &Connections, input: usize, radius: usize) -> Vec<usize> {
        c.input_topology.neighbors(input, radius, c.params.wrap_around)
    }

    /// Sets the inhibition radius from the average span of connected inputs, scaled to column space.
    pub fn update_inhibition_radius(&self, c: &mut Connections) {
        if c.params.global_inhibition {
            c.inhibition_radius = c.column_topology.max_dimension();
            return;
        }

        let shared: &Connections = c;
        let spans: Vec<f64> = (0..shared.num_columns)
            .into_par_iter()
            .map(|column| self.avg_connected_span_for_column(shared, column))
            .collect();
        let avg_span = spans.iter().sum::<f64>() / spans.len() as f64;

        let diameter = avg_span * self.avg_columns_per_input(c);
        let radius = ((diameter - 1.0) / 2.0).max(1.0);
        c.inhibition_radius = (radius + 0.5) as usize;

        log::trace!("inhibition radius updated to {}", c.inhibition_radius);
    }

    /// Average over dimensions of columns per input.
    pub fn avg_columns_per_input(&self, c: &Connections) -> f64 {
        let dims = c.column_topology.num_dimensions() as f64;
        c.column_topology
            .dimensions()
            .iter()
            .zip(c.input_topology.dimensions())
            .map(|(&col, &input)| col as f64 / input as f64)
            .sum::<f64>()
            / dims
    }

    /// Average over dimensions of the extent covered by `column`'s connected inputs.
    pub fn avg_connected_span_for_column(&self, c: &Connections, column: usize) -> f64 {
        let connected = c.columns[column].proximal_dendrite().pool().connected();
        if connected.is_empty() {
            return 0.0;
        }

        let num_dims = c.input_topology.num_dimensions();
        let mut min_coords = vec![usize::MAX; num_dims];
        let mut max_coords = vec![0usize; num_dims];
        for &input in connected {
            for (dim, coord) in c.input_topology.coordinates(input).into_iter().enumerate() {
                min_coords[dim] = min_coords[dim].min(coord);
                max_coords[dim] = max_coords[dim].max(coord);
            }
        }

        max_coords
            .iter()
            .zip(&min_coords)
            .map(|(&max, &min)| (max - min + 1) as f64)
            .sum::<f64>()
            / num_dims as f64
    }

    /// Recomputes the duty cycle floors, per neighborhood or over all columns.
    pub fn update_min_duty_cycles(&self, c: &mut Connections) {
        if c.params.global_inhibition || c.inhibition_radius > c.num_inputs {
            self.update_min_duty_cycles_global(c);
        } else {
            self.update_min_duty_cycles_local(c);
        }
    }

    /// Every floor becomes a fixed share of the largest duty cycle among all columns.
    pub fn update_min_duty_cycles_global(&self, c: &mut Connections) {
        let max_overlap = c.overlap_duty_cycles.iter().copied().fold(0.0, f64::max);
        let max_active = c.active_duty_cycles.iter().copied().fold(0.0, f64::max);

        c.min_overlap_duty_cycles
            .fill(max_overlap * c.params.min_pct_overlap_duty_cycles);
        c.min_active_duty_cycles
            .fill(max_active * c.params.min_pct_active_duty_cycles);
    }

    /// Each floor becomes a fixed share of the largest duty cycle within the column's neighborhood.
    pub fn update_min_duty_cycles_local(&self, c: &mut Connections) {
        let radius = c.inhibition_radius;
        let pct_overlap = c.params.min_pct_overlap_duty_cycles;
        let pct_active = c.params.min_pct_active_duty_cycles;

        let shared: &Connections = c;
        let (min_overlap, min_active): (Vec<f64>, Vec<f64>) = (0..shared.num_columns)
            .into_par_iter()
            .map(|column| {
                let neighborhood = self.column_neighborhood(shared, column, radius);
                let max_overlap = neighborhood
                    .iter()
                    .map(|&n| shared.overlap_duty_cycles[n])
                    .fold(0.0, f64::max);
                let max_active = neighborhood
                    .iter()
                    .map(|&n| shared.active_duty_cycles[n])
                    .fold(0.0, f64::max);
                (max_overlap * pct_overlap, max_active * pct_active)
            })
            .unzip();

        c.min_overlap_duty_cycles = min_overlap;
        c.min_active_duty_cycles = min_active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parameters::Parameters;

    fn params_1d(num_inputs: usize, num_columns: usize) -> Parameters {
        Parameters {
            input_dimensions: vec![num_inputs],
            column_dimensions: vec![num_columns],
            cells_per_column: 1,
            potential_radius: None,
            ..Default::default()
        }
    }

    fn set_pool(c: &mut Connections, column: usize, permanences: &[(usize, f64)]) {
        let inputs: Vec<usize> = permanences.iter().map(|&(input, _)| input).collect();
        let mut pool = Pool::new(&inputs);
        let mut sorted = permanences.to_vec();
        sorted.sort_by_key(|&(input, _)| input);
        let perms: Vec<f64> = sorted.iter().map(|&(_, perm)| perm).collect();
        pool.set_permanences(&perms, c.proximal_options.connected);
        c.columns[column].proximal_dendrite_mut().set_pool(pool);
    }

    #[test]
    fn test_init_rejects_invalid_inhibition() {
        let mut c = Connections::new(Parameters {
            local_area_density: Some(0.1),
            num_active_columns_per_inh_area: Some(10.0),
            ..params_1d(16, 8)
        })
        .unwrap();
        assert!(matches!(
            SpatialPooler.init(&mut c),
            Err(HtmError::InvalidInhibition(_))
        ));
    }

    #[test]
    fn test_compute_before_init_fails() {
        let mut c = Connections::new(params_1d(16, 8)).unwrap();
        let mut active = vec![false; 8];
        assert_eq!(
            SpatialPooler.compute(&mut c, &[false; 16], &mut active, true),
            Err(HtmError::NotInitialized)
        );
    }

    #[test]
    fn test_compute_rejects_wrong_input_length() {
        let mut c = Connections::new(params_1d(16, 8)).unwrap();
        SpatialPooler.init(&mut c).unwrap();
        let mut active = vec![false; 8];
        assert_eq!(
            SpatialPooler.compute(&mut c, &[false; 15], &mut active, true),
            Err(HtmError::InputLengthMismatch {
                expected: 16,
                actual: 15
            })
        );
        let mut short = vec![false; 7];
        assert!(matches!(
            SpatialPooler.compute(&mut c, &[false; 16], &mut short, true),
            Err(HtmError::ActiveArrayLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_pool_too_small_for_stimulus_threshold() {
        let mut c = Connections::new(Parameters {
            potential_radius: Some(1),
            stimulus_threshold: 10.0,
            ..params_1d(16, 8)
        })
        .unwrap();
        assert!(matches!(
            SpatialPooler.init(&mut c),
            Err(HtmError::PotentialPoolTooSmall { column: 0, .. })
        ));
    }

    #[test]
    fn test_map_column_1d() {
        let c = Connections::new(params_1d(12, 4)).unwrap();
        let sp = SpatialPooler;
        assert_eq!(sp.map_column(&c, 0), 1);
        assert_eq!(sp.map_column(&c, 1), 4);
        assert_eq!(sp.map_column(&c, 2), 7);
        assert_eq!(sp.map_column(&c, 3), 10);
    }

    #[test]
    fn test_map_column_2d() {
        let c = Connections::new(Parameters {
            input_dimensions: vec![36, 12],
            column_dimensions: vec![12, 4],
            cells_per_column: 1,
            ..Default::default()
        })
        .unwrap();
        let sp = SpatialPooler;
        // column (0, 0) -> input (1, 1)
        assert_eq!(sp.map_column(&c, 0), 13);
        // column (1, 3) -> input (4, 10)
        assert_eq!(sp.map_column(&c, 7), 4 * 12 + 10);
    }

    #[test]
    fn test_map_potential_sizes() {
        let mut c = Connections::new(Parameters {
            potential_radius: Some(2),
            potential_pct: 1.0,
            wrap_around: false,
            ..params_1d(12, 4)
        })
        .unwrap();
        let sp = SpatialPooler;
        // column 0 maps to input 1, clipped window 0..=3
        assert_eq!(sp.map_potential(&mut c, 0, false), vec![0, 1, 2, 3]);
        // column 3 maps to input 10, wrapped window 8..=12
        assert_eq!(sp.map_potential(&mut c, 3, true), vec![0, 8, 9, 10, 11]);

        c.params.potential_pct = 0.5;
        let sample = sp.map_potential(&mut c, 1, false);
        assert_eq!(sample.len(), 3);
        assert!(sample.iter().all(|&i| (2..=6).contains(&i)));
    }

    #[test]
    fn test_init_permanence_respects_bounds() {
        let mut c = Connections::new(params_1d(64, 8)).unwrap();
        let perms = SpatialPooler.init_permanence(&mut c, 1000);
        let trim = c.proximal_options.trim_threshold;
        assert_eq!(perms.len(), 1000);
        assert!(perms.iter().all(|&p| p == 0.0 || (trim..=1.0).contains(&p)));
        let connected = perms.iter().filter(|&&p| p >= 0.1).count();
        // about half start out connected
        assert!((350..650).contains(&connected));
    }

    #[test]
    fn test_init_builds_pools() {
        let mut c = Connections::new(Parameters {
            potential_pct: 0.5,
            ..params_1d(32, 16)
        })
        .unwrap();
        SpatialPooler.init(&mut c).unwrap();
        for column in 0..16 {
            let pool = c.column(column).unwrap().proximal_dendrite().pool();
            assert_eq!(pool.size(), 16);
        }
        assert!(c.inhibition_radius() >= 1);
    }

    #[test]
    fn test_calculate_overlap_and_stimulus_threshold() {
        let mut c = Connections::new(params_1d(10, 3)).unwrap();
        set_pool(&mut c, 0, &[(0, 0.5), (1, 0.5), (2, 0.05)]);
        set_pool(&mut c, 1, &[(3, 0.5), (4, 0.5), (5, 0.5)]);
        set_pool(&mut c, 2, &[(0, 0.5)]);

        let input = [true, true, true, true, false, true, false, false, false, false];
        let sp = SpatialPooler;
        assert_eq!(sp.calculate_overlap(&c, &input), vec![2.0, 2.0, 1.0]);
        assert_eq!(sp.calculate_overlap_pct(&c, &[2.0, 2.0, 1.0]), vec![1.0, 2.0 / 3.0, 1.0]);

        c.params.stimulus_threshold = 2.0;
        assert_eq!(sp.calculate_overlap(&c, &input), vec![2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_inhibit_columns_global() {
        let c = Connections::new(params_1d(10, 10)).unwrap();
        let overlaps = [1.0, 2.0, 1.0, 4.0, 8.0, 3.0, 12.0, 5.0, 4.0, 1.0];
        assert_eq!(
            SpatialPooler.inhibit_columns_global(&c, &overlaps, 0.3),
            vec![4, 6, 7]
        );
    }

    #[test]
    fn test_inhibit_columns_global_ties_go_to_higher_index() {
        let c = Connections::new(params_1d(10, 6)).unwrap();
        let overlaps = [3.0, 3.0, 3.0, 3.0, 1.0, 0.0];
        assert_eq!(
            SpatialPooler.inhibit_columns_global(&c, &overlaps, 0.34),
            vec![2, 3]
        );
    }

    #[test]
    fn test_inhibit_columns_global_stimulus_threshold() {
        let mut c = Connections::new(params_1d(10, 10)).unwrap();
        c.params.stimulus_threshold = 5.0;
        let overlaps = [1.0, 2.0, 1.0, 4.0, 8.0, 3.0, 12.0, 5.0, 4.0, 1.0];
        assert_eq!(
            SpatialPooler.inhibit_columns_global(&c, &overlaps, 0.5),
            vec![4, 6, 7]
        );
    }

    #[test]
    fn test_inhibit_columns_local() {
        let mut c = Connections::new(Parameters {
            wrap_around: false,
            stimulus_threshold: 1.0,
            ..params_1d(10, 10)
        })
        .unwrap();
        c.inhibition_radius = 1;
        let overlaps = [0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 0.0, 3.0, 0.0, 0.0];
        assert_eq!(
            SpatialPooler.inhibit_columns_local(&c, &overlaps, 0.34),
            vec![2, 7]
        );

        // equal neighbors: the first winner's bonus beats the second
        let overlaps = [0.0, 0.0, 5.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        assert_eq!(
            SpatialPooler.inhibit_columns_local(&c, &overlaps, 0.34),
            vec![2]
        );
    }

    #[test]
    fn test_inhibit_columns_picks_global_when_radius_covers_columns() {
        let mut c = Connections::new(Parameters {
            num_active_columns_per_inh_area: Some(3.0),
            ..params_1d(10, 10)
        })
        .unwrap();
        c.inhibition_radius = 11;
        let overlaps = [1.0, 2.0, 1.0, 4.0, 8.0, 3.0, 12.0, 5.0, 4.0, 1.0];
        // area = min(10, 23) = 10, density 0.3
        assert_eq!(SpatialPooler.inhibit_columns(&c, &overlaps), vec![4, 6, 7]);
    }

    #[test]
    fn test_update_duty_cycles_helper() {
        let mut dc = vec![1000.0; 5];
        SpatialPooler::update_duty_cycles_helper(&mut dc, &[0.0; 5], 1000.0);
        assert_eq!(dc, vec![999.0; 5]);

        let mut dc = vec![1000.0; 5];
        SpatialPooler::update_duty_cycles_helper(&mut dc, &[1000.0; 5], 1000.0);
        assert_eq!(dc, vec![1000.0; 5]);

        let mut dc = vec![1000.0; 5];
        SpatialPooler::update_duty_cycles_helper(&mut dc, &[2000.0, 4000.0, 5000.0, 6000.0, 7000.0], 1000.0);
        assert_eq!(dc, vec![1001.0, 1003.0, 1004.0, 1005.0, 1006.0]);
    }

    #[test]
    fn test_update_duty_cycles_uses_growing_window() {
        let mut c = Connections::new(params_1d(10, 4)).unwrap();
        c.sp_iteration_num = 1;
        SpatialPooler.update_duty_cycles(&mut c, &[1.0, 0.0, 2.0, 0.0], &[2]);
        assert_eq!(c.overlap_duty_cycles(), &[1.0, 0.0, 1.0, 0.0]);
        assert_eq!(c.active_duty_cycles(), &[0.0, 0.0, 1.0, 0.0]);

        c.sp_iteration_num = 2;
        SpatialPooler.update_duty_cycles(&mut c, &[0.0, 0.0, 2.0, 0.0], &[]);
        assert_eq!(c.overlap_duty_cycles(), &[0.5, 0.0, 1.0, 0.0]);
        assert_eq!(c.active_duty_cycles(), &[0.0, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn test_update_boost_factors() {
        let mut c = Connections::new(params_1d(10, 6)).unwrap();
        c.boost_factors = vec![2.0; 6];
        SpatialPooler.update_boost_factors(&mut c);
        // all floors are zero: untouched
        assert_eq!(c.boost_factors(), &[2.0; 6]);

        c.min_active_duty_cycles = vec![0.1; 6];
        c.active_duty_cycles = vec![0.1, 0.3, 0.02, 0.04, 0.7, 0.12];
        SpatialPooler.update_boost_factors(&mut c);
        let expected = [1.0, 1.0, 8.2, 6.4, 1.0, 1.0];
        for (got, want) in c.boost_factors().iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{got} != {want}");
        }
    }

    #[test]
    fn test_avg_columns_per_input() {
        let c = Connections::new(Parameters {
            input_dimensions: vec![4, 4, 4, 4],
            column_dimensions: vec![2, 2, 2, 2],
            cells_per_column: 1,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(SpatialPooler.avg_columns_per_input(&c), 0.5);

        let c = Connections::new(Parameters {
            input_dimensions: vec![4, 10],
            column_dimensions: vec![8, 5],
            cells_per_column: 1,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(SpatialPooler.avg_columns_per_input(&c), 1.25);
    }

    #[test]
    fn test_avg_connected_span_for_column() {
        let mut c = Connections::new(params_1d(10, 3)).unwrap();
        set_pool(&mut c, 0, &[(2, 0.5), (3, 0.5), (5, 0.5), (7, 0.5), (9, 0.01)]);
        set_pool(&mut c, 1, &[(4, 0.01)]);
        let sp = SpatialPooler;
        assert_eq!(sp.avg_connected_span_for_column(&c, 0), 6.0);
        assert_eq!(sp.avg_connected_span_for_column(&c, 1), 0.0);

        let mut c = Connections::new(Parameters {
            input_dimensions: vec![4, 4],
            column_dimensions: vec![2, 2],
            cells_per_column: 1,
            ..Default::default()
        })
        .unwrap();
        // inputs (0, 1) and (2, 3): spans 3 and 3
        set_pool(&mut c, 0, &[(1, 0.5), (11, 0.5)]);
        assert_eq!(sp.avg_connected_span_for_column(&c, 0), 3.0);
    }

    #[test]
    fn test_update_inhibition_radius() {
        let mut c = Connections::new(Parameters {
            global_inhibition: true,
            ..params_1d(10, 7)
        })
        .unwrap();
        SpatialPooler.update_inhibition_radius(&mut c);
        assert_eq!(c.inhibition_radius(), 7);

        let mut c = Connections::new(params_1d(10, 10)).unwrap();
        for column in 0..10 {
            set_pool(&mut c, column, &[(0, 0.5), (1, 0.5), (2, 0.5), (3, 0.5), (4, 0.5)]);
        }
        // span 5, one column per input: radius (5 - 1) / 2
        SpatialPooler.update_inhibition_radius(&mut c);
        assert_eq!(c.inhibition_radius(), 2);

        for column in 0..10 {
            set_pool(&mut c, column, &[(0, 0.01)]);
        }
        // no connected inputs: radius clamps to one
        SpatialPooler.update_inhibition_radius(&mut c);
        assert_eq!(c.inhibition_radius(), 1);
    }

    #[test]
    fn test_update_min_duty_cycles_global() {
        let mut c = Connections::new(Parameters {
            global_inhibition: true,
            min_pct_overlap_duty_cycles: 0.01,
            min_pct_active_duty_cycles: 0.02,
            ..params_1d(10, 4)
        })
        .unwrap();
        c.overlap_duty_cycles = vec![0.5, 0.2, 0.9, 0.1];
        c.active_duty_cycles = vec![0.1, 0.4, 0.2, 0.3];
        SpatialPooler.update_min_duty_cycles(&mut c);
        for &floor in c.min_overlap_duty_cycles() {
            assert!((floor - 0.009).abs() < 1e-12);
        }
        for &floor in c.min_active_duty_cycles() {
            assert!((floor - 0.008).abs() < 1e-12);
        }
    }

    #[test]
    fn test_update_min_duty_cycles_local() {
        let mut c = Connections::new(Parameters {
            wrap_around: false,
            min_pct_overlap_duty_cycles: 0.5,
            min_pct_active_duty_cycles: 0.5,
            ..params_1d(10, 6)
        })
        .unwrap();
        c.inhibition_radius = 1;
        c.overlap_duty_cycles = vec![0.2, 0.0, 0.0, 0.0, 0.8, 0.0];
        c.active_duty_cycles = vec![0.0, 0.0, 0.6, 0.0, 0.0, 0.0];
        SpatialPooler.update_min_duty_cycles(&mut c);
        assert_eq!(c.min_overlap_duty_cycles(), &[0.1, 0.1, 0.0, 0.4, 0.4, 0.4]);
        assert_eq!(c.min_active_duty_cycles(), &[0.0, 0.3, 0.3, 0.3, 0.0, 0.0]);
    }

    #[test]
    fn test_bump_up_weak_columns() {
        let mut c = Connections::new(params_1d(10, 2)).unwrap();
        set_pool(&mut c, 0, &[(0, 0.2), (1, 0.095)]);
        set_pool(&mut c, 1, &[(2, 0.2), (3, 0.095)]);
        c.min_overlap_duty_cycles = vec![0.5, 0.5];
        c.overlap_duty_cycles = vec![0.1, 0.9];

        SpatialPooler.bump_up_weak_columns(&mut c).unwrap();
        let weak = c.column(0).unwrap().proximal_dendrite().pool();
        assert!((weak.permanence(0).unwrap() - 0.21).abs() < 1e-9);
        assert!((weak.permanence(1).unwrap() - 0.105).abs() < 1e-9);
        assert_eq!(weak.connected(), &[0, 1]);

        let strong = c.column(1).unwrap().proximal_dendrite().pool();
        assert_eq!(strong.permanence(3), Some(0.095));
    }

    #[test]
    fn test_adapt_synapses() {
        let mut c = Connections::new(params_1d(4, 2)).unwrap();
        set_pool(&mut c, 0, &[(0, 0.5), (1, 0.3), (2, 0.03)]);
        set_pool(&mut c, 1, &[(0, 0.5)]);

        SpatialPooler
            .adapt_synapses(&mut c, &[true, false, false, true], &[0])
            .unwrap();
        let pool = c.column(0).unwrap().proximal_dendrite().pool();
        assert!((pool.permanence(0).unwrap() - 0.55).abs() < 1e-9);
        assert!((pool.permanence(1).unwrap() - 0.292).abs() < 1e-9);
        // 0.022 falls below the trim threshold
        assert_eq!(pool.permanence(2), Some(0.0));
        // losers are untouched
        assert_eq!(c.column(1).unwrap().proximal_dendrite().pool().permanence(0), Some(0.5));
    }

    #[test]
    fn test_strip_unlearned_columns() {
        let mut c = Connections::new(params_1d(10, 5)).unwrap();
        c.active_duty_cycles = vec![0.5, 0.0, 0.1, 0.0, 0.2];
        assert_eq!(
            SpatialPooler.strip_unlearned_columns(&c, &[0, 1, 3, 4]),
            vec![0, 4]
        );
    }

    #[test]
    fn test_compute_without_learning_leaves_permanences() {
        let mut c = Connections::new(Parameters {
            global_inhibition: true,
            num_active_columns_per_inh_area: Some(4.0),
            ..params_1d(32, 16)
        })
        .unwrap();
        SpatialPooler.init(&mut c).unwrap();
        let before: Vec<Vec<f64>> = (0..16).map(|i| c.permanences_for_column(i)).collect();

        let input: Vec<bool> = (0..32).map(|i| i % 3 == 0).collect();
        let mut active = vec![false; 16];
        let winners = SpatialPooler.compute(&mut c, &input, &mut active, false).unwrap();

        let after: Vec<Vec<f64>> = (0..16).map(|i| c.permanences_for_column(i)).collect();
        assert_eq!(before, after);
        assert!(winners.len() <= 4);
        assert_eq!(active.iter().filter(|&&a| a).count(), winners.len());
        assert_eq!(c.sp_iterations(), (1, 0));
    }
}
