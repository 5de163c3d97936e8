//! `Parameters` is the single configuration surface for both algorithms.
//!
//! It is applied once, when the `Connections` store is built, and never changes afterwards.
//! The struct derives serde traits with `#[serde(default)]`, so a partial configuration
//! document (JSON, TOML, ...) only needs to name the values it overrides.
//!
//! Validation is split by consumer:
//! - dimensions are checked when the store is built,
//! - inhibition when the spatial pooler initializes,
//! - distal learning parameters when the temporal memory initializes.

use crate::error::{HtmError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the spatial pooler, the temporal memory and the shared store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Shape of the input space. The product is the input vector width.
    pub input_dimensions: Vec<usize>,

    /// Shape of the column space. Must have as many dimensions as the input space.
    pub column_dimensions: Vec<usize>,

    /// Number of cells in every column.
    pub cells_per_column: usize,

    /// Radius (in input space) a column samples its potential pool from. `None` covers the whole input.
    pub potential_radius: Option<usize>,

    /// Fraction of the inputs within the potential radius that become potential synapses.
    pub potential_pct: f64,

    /// If true, winners are picked across the whole column space instead of per neighborhood.
    pub global_inhibition: bool,

    /// Target fraction of active columns within an inhibition area.
    pub local_area_density: Option<f64>,

    /// Target number of active columns within an inhibition area.
    pub num_active_columns_per_inh_area: Option<f64>,

    /// Minimum overlap a column needs to compete in inhibition.
    pub stimulus_threshold: f64,

    /// Permanence decrement for proximal synapses whose input bit was off.
    pub syn_perm_inactive_dec: f64,

    /// Permanence increment for proximal synapses whose input bit was on.
    pub syn_perm_active_inc: f64,

    /// Proximal permanence at or above which a synapse is connected.
    pub syn_perm_connected: f64,

    pub syn_perm_min: f64,
    pub syn_perm_max: f64,

    /// Fraction of the neighborhood's max overlap duty cycle below which a column gets bumped.
    pub min_pct_overlap_duty_cycles: f64,

    /// Fraction of the neighborhood's max active duty cycle below which a column gets boosted.
    pub min_pct_active_duty_cycles: f64,

    /// Window of the duty cycle moving average.
    pub duty_cycle_period: u64,

    /// Boost factor applied to a column that never activates.
    pub max_boost: f64,

    /// If true, neighborhoods wrap around the edges of the input and column spaces.
    pub wrap_around: bool,

    /// Every `update_period` iterations the inhibition radius and duty cycle floors are recomputed.
    pub update_period: u64,

    /// Fraction of a column's potential synapses that start out connected.
    pub init_connected_pct: f64,

    /// Connected active synapses a distal segment needs to become active.
    pub activation_threshold: usize,

    /// Potential active synapses a distal segment needs to become matching.
    pub min_threshold: usize,

    /// Upper bound on synapses grown on a segment in one learning step.
    pub max_new_synapse_count: usize,

    pub max_segments_per_cell: usize,
    pub max_synapses_per_segment: usize,

    /// Permanence of a freshly grown distal synapse.
    pub initial_permanence: f64,

    /// Distal permanence at or above which a synapse is connected.
    pub connected_permanence: f64,

    pub permanence_increment: f64,
    pub permanence_decrement: f64,

    /// Decrement applied to matching segments of columns that did not activate.
    pub predicted_segment_decrement: f64,

    /// Seed for every random choice made by either algorithm.
    pub seed: u64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            input_dimensions: vec![32, 32],
            column_dimensions: vec![64, 64],
            cells_per_column: 32,
            potential_radius: Some(16),
            potential_pct: 0.5,
            global_inhibition: false,
            local_area_density: None,
            num_active_columns_per_inh_area: Some(40.0),
            stimulus_threshold: 0.0,
            syn_perm_inactive_dec: 0.008,
            syn_perm_active_inc: 0.05,
            syn_perm_connected: 0.10,
            syn_perm_min: 0.0,
            syn_perm_max: 1.0,
            min_pct_overlap_duty_cycles: 0.001,
            min_pct_active_duty_cycles: 0.001,
            duty_cycle_period: 1000,
            max_boost: 10.0,
            wrap_around: true,
            update_period: 50,
            init_connected_pct: 0.5,
            activation_threshold: 13,
            min_threshold: 10,
            max_new_synapse_count: 20,
            max_segments_per_cell: 255,
            max_synapses_per_segment: 255,
            initial_permanence: 0.21,
            connected_permanence: 0.5,
            permanence_increment: 0.10,
            permanence_decrement: 0.10,
            predicted_segment_decrement: 0.0,
            seed: 42,
        }
    }
}

impl Parameters {
    /// Total number of input bits.
    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.input_dimensions.iter().product()
    }

    /// Total number of columns.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.column_dimensions.iter().product()
    }

    /// Checks that both spaces are non-empty and share a dimensionality.
    pub fn validate_dimensions(&self) -> Result<()> {
        if self.input_dimensions.is_empty() || self.input_dimensions.contains(&0) {
            return Err(HtmError::InvalidDimensions {
                name: "input_dimensions",
                dims: self.input_dimensions.clone(),
            });
        }
        if self.column_dimensions.is_empty() || self.column_dimensions.contains(&0) {
            return Err(HtmError::InvalidDimensions {
                name: "column_dimensions",
                dims: self.column_dimensions.clone(),
            });
        }
        if self.column_dimensions.len() != self.input_dimensions.len() {
            return Err(HtmError::InvalidDimensions {
                name: "column_dimensions",
                dims: self.column_dimensions.clone(),
            });
        }
        if self.cells_per_column == 0 {
            return Err(HtmError::InvalidParameter {
                name: "cells_per_column",
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Exactly one of density or active-column count may be set, density in (0, 0.5].
    pub fn validate_inhibition(&self) -> Result<()> {
        match (self.local_area_density, self.num_active_columns_per_inh_area) {
            (Some(_), Some(_)) => Err(HtmError::InvalidInhibition(
                "local_area_density and num_active_columns_per_inh_area are both set".into(),
            )),
            (None, None) => Err(HtmError::InvalidInhibition(
                "one of local_area_density or num_active_columns_per_inh_area must be set".into(),
            )),
            (Some(density), None) if density <= 0.0 || density > 0.5 => {
                Err(HtmError::InvalidInhibition(format!(
                    "local_area_density must lie in (0, 0.5], got {density}"
                )))
            }
            (None, Some(count)) if count <= 0.0 => Err(HtmError::InvalidInhibition(format!(
                "num_active_columns_per_inh_area must be positive, got {count}"
            ))),
            _ => {
                check_fraction("potential_pct", self.potential_pct)?;
                check_fraction("init_connected_pct", self.init_connected_pct)?;
                if self.syn_perm_min > self.syn_perm_max {
                    return Err(HtmError::InvalidParameter {
                        name: "syn_perm_min",
                        message: format!(
                            "{} exceeds syn_perm_max {}",
                            self.syn_perm_min, self.syn_perm_max
                        ),
                    });
                }
                if self.update_period == 0 || self.duty_cycle_period == 0 {
                    return Err(HtmError::InvalidParameter {
                        name: "update_period",
                        message: "update and duty cycle periods must be at least 1".into(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Checks the distal learning parameters.
    pub fn validate_temporal(&self) -> Result<()> {
        if self.max_segments_per_cell == 0 {
            return Err(HtmError::InvalidParameter {
                name: "max_segments_per_cell",
                message: "must be at least 1".into(),
            });
        }
        if self.max_synapses_per_segment == 0 {
            return Err(HtmError::InvalidParameter {
                name: "max_synapses_per_segment",
                message: "must be at least 1".into(),
            });
        }
        if self.min_threshold > self.activation_threshold {
            return Err(HtmError::InvalidParameter {
                name: "min_threshold",
                message: format!(
                    "{} exceeds activation_threshold {}",
                    self.min_threshold, self.activation_threshold
                ),
            });
        }
        check_fraction("initial_permanence", self.initial_permanence)?;
        check_fraction("connected_permanence", self.connected_permanence)?;
        if self.predicted_segment_decrement < 0.0 {
            return Err(HtmError::InvalidParameter {
                name: "predicted_segment_decrement",
                message: "must not be negative".into(),
            });
        }
        Ok(())
    }
}

fn check_fraction(name: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(HtmError::InvalidParameter {
            name,
            message: format!("must lie in [0, 1], got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = Parameters::default();
        assert!(params.validate_dimensions().is_ok());
        assert!(params.validate_inhibition().is_ok());
        assert!(params.validate_temporal().is_ok());
        assert_eq!(params.num_inputs(), 1024);
        assert_eq!(params.num_columns(), 4096);
    }

    #[test]
    fn test_inhibition_requires_exactly_one_target() {
        let both = Parameters {
            local_area_density: Some(0.1),
            ..Default::default()
        };
        assert!(matches!(
            both.validate_inhibition(),
            Err(HtmError::InvalidInhibition(_))
        ));

        let neither = Parameters {
            num_active_columns_per_inh_area: None,
            ..Default::default()
        };
        assert!(matches!(
            neither.validate_inhibition(),
            Err(HtmError::InvalidInhibition(_))
        ));
    }

    #[test]
    fn test_density_above_half_is_rejected() {
        let params = Parameters {
            local_area_density: Some(0.6),
            num_active_columns_per_inh_area: None,
            ..Default::default()
        };
        assert!(params.validate_inhibition().is_err());

        let params = Parameters {
            local_area_density: Some(0.5),
            num_active_columns_per_inh_area: None,
            ..Default::default()
        };
        assert!(params.validate_inhibition().is_ok());
    }

    #[test]
    fn test_dimension_checks() {
        let params = Parameters {
            input_dimensions: vec![],
            ..Default::default()
        };
        assert!(matches!(
            params.validate_dimensions(),
            Err(HtmError::InvalidDimensions { name: "input_dimensions", .. })
        ));

        let params = Parameters {
            input_dimensions: vec![16],
            column_dimensions: vec![4, 4],
            ..Default::default()
        };
        assert!(params.validate_dimensions().is_err());

        let params = Parameters {
            column_dimensions: vec![64, 0],
            ..Default::default()
        };
        assert!(params.validate_dimensions().is_err());
    }

    #[test]
    fn test_temporal_caps_must_be_positive() {
        let params = Parameters {
            max_segments_per_cell: 0,
            ..Default::default()
        };
        assert!(params.validate_temporal().is_err());

        let params = Parameters {
            min_threshold: 20,
            activation_threshold: 10,
            ..Default::default()
        };
        assert!(params.validate_temporal().is_err());
    }
}
