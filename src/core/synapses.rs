//! Synapse types and the learning constants that govern proximal permanences.
//!
//! Distal synapses live in the arena owned by `Connections`. Each one links a presynaptic cell
//! to a distal segment owned by another cell, and is addressed by a `SynapseIdx`. Freed slots
//! are recycled through a free list, so a `SynapseIdx` is only meaningful while the synapse is
//! alive.
//!
//! Proximal synapses are not stored here: they live in the column's `Pool`.

use super::segment::SegmentIdx;

/// Handle of a distal synapse in the connections arena.
pub type SynapseIdx = usize;

/// A distal synapse: a directed edge from a presynaptic cell to a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Synapse {
    /// The cell whose activity this synapse reports.
    pub presynaptic_cell: usize,

    /// The segment this synapse belongs to.
    pub segment: SegmentIdx,

    /// Strength of the connection, kept within [0, 1].
    pub permanence: f64,

    /// Global creation order.
    pub ordinal: u64,
}

/// Constants governing how proximal synapse permanences are adjusted.
///
/// `below_stimulus_increment` and `trim_threshold` are derived from the configured connected
/// threshold and active increment when the store is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynapsePermanenceOptions {
    pub inactive_decrement: f64,
    pub active_increment: f64,
    pub connected: f64,
    pub below_stimulus_increment: f64,
    pub min: f64,
    pub max: f64,
    pub trim_threshold: f64,
}
