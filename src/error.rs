//! Error types shared by the spatial pooler, the temporal memory and the connections store.
//!
//! Every variant is a configuration or call-site error: structural limits (segment and synapse
//! caps) are enforced silently by eviction and never surface here.

use thiserror::Error;

/// Main error type for HTM operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HtmError {
    /// Empty, zero-sized or mismatched input/column dimensions.
    #[error("Invalid dimensions for {name}: {dims:?}")]
    InvalidDimensions {
        /// Which dimension list was rejected.
        name: &'static str,
        /// The offending dimensions.
        dims: Vec<usize>,
    },

    /// Inhibition must be configured with exactly one of density or active-column count.
    #[error("Invalid inhibition parameters: {0}")]
    InvalidInhibition(String),

    /// Invalid parameter value.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        name: &'static str,
        /// Description of the error.
        message: String,
    },

    /// The input vector handed to the spatial pooler has the wrong width.
    #[error("Input vector length mismatch: expected {expected}, got {actual}")]
    InputLengthMismatch { expected: usize, actual: usize },

    /// The output buffer handed to the spatial pooler has the wrong width.
    #[error("Active array length mismatch: expected {expected}, got {actual}")]
    ActiveArrayLengthMismatch { expected: usize, actual: usize },

    /// A column's potential pool cannot ever reach the stimulus threshold.
    #[error(
        "Potential pool of column {column} holds {pool_size} inputs, fewer than the stimulus threshold {stimulus_threshold}"
    )]
    PotentialPoolTooSmall {
        column: usize,
        pool_size: usize,
        stimulus_threshold: f64,
    },

    /// A column index outside the configured column space.
    #[error("Column {index} out of bounds (columns: {num_columns})")]
    ColumnOutOfBounds { index: usize, num_columns: usize },

    /// The spatial pooler was asked to compute before its pools were built.
    #[error("Spatial pooler has not been initialized")]
    NotInitialized,
}

/// Result type for HTM operations.
pub type Result<T> = std::result::Result<T, HtmError>;
