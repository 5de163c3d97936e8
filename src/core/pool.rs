//! A `Pool` is the potential pool of a single column: the input bits its proximal dendrite may
//! connect to, together with one permanence value per bit.
//!
//! The potential inputs are fixed when the spatial pooler initializes. Only the permanence values
//! change afterwards. Synapses are stored in ascending input order, so the sparse views line up
//! with each other. A separate `connected` list holds the inputs whose permanence is at or above
//! the connected threshold, so overlap counting never scans disconnected synapses.
//!
//! The pool exposes:
//! - sparse views (potential inputs, permanences, connected inputs),
//! - dense views over the whole input space,
//! - the permanence update rule shared by initialization, learning and bumping.

use super::synapses::SynapsePermanenceOptions;

/// A proximal synapse: one input bit and its permanence.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PoolSynapse {
    /// Points to which input bit this synapse connects to.
    pub input: usize,

    /// Strength of the connection to the input bit.
    pub permanence: f64,
}

/// The potential synapses of one column.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Pool {
    /// All potential synapses, sorted by input index.
    synapses: Vec<PoolSynapse>,

    /// Input indices of connected synapses, ascending.
    connected: Vec<usize>,
}

impl Pool {
    /// Creates a pool over the given potential inputs, all at permanence zero.
    pub fn new(potential: &[usize]) -> Self {
        let mut inputs = potential.to_vec();
        inputs.sort_unstable();
        inputs.dedup();

        Self {
            synapses: inputs
                .into_iter()
                .map(|input| PoolSynapse {
                    input,
                    permanence: 0.0,
                })
                .collect(),
            connected: Vec::new(),
        }
    }

    /// Number of potential synapses.
    #[inline]
    pub fn size(&self) -> usize {
        self.synapses.len()
    }

    #[inline]
    pub fn synapses(&self) -> &[PoolSynapse] {
        &self.synapses
    }

    /// Potential input indices, ascending.
    #[inline]
    pub fn sparse_potential(&self) -> Vec<usize> {
        self.synapses.iter().map(|syn| syn.input).collect()
    }

    /// Permanences aligned with `sparse_potential`.
    #[inline]
    pub fn sparse_permanences(&self) -> Vec<f64> {
        self.synapses.iter().map(|syn| syn.permanence).collect()
    }

    /// Connected input indices, ascending.
    #[inline]
    pub fn connected(&self) -> &[usize] {
        &self.connected
    }

    #[inline]
    pub fn num_connected(&self) -> usize {
        self.connected.len()
    }

    /// Permanence of the synapse to `input`, if the input is in the pool.
    #[inline]
    pub fn permanence(&self, input: usize) -> Option<f64> {
        self.synapses
            .binary_search_by_key(&input, |syn| syn.input)
            .ok()
            .map(|i| self.synapses[i].permanence)
    }

    /// Permanences over the whole input space, zero outside the pool.
    pub fn dense_permanences(&self, num_inputs: usize) -> Vec<f64> {
        let mut dense = vec![0.0; num_inputs];
        for syn in &self.synapses {
            dense[syn.input] = syn.permanence;
        }
        dense
    }

    /// Potential pool membership over the whole input space.
    pub fn dense_potential(&self, num_inputs: usize) -> Vec<bool> {
        let mut dense = vec![false; num_inputs];
        for syn in &self.synapses {
            dense[syn.input] = true;
        }
        dense
    }

    /// Connected synapses over the whole input space.
    pub fn dense_connected(&self, num_inputs: usize) -> Vec<bool> {
        let mut dense = vec![false; num_inputs];
        for &input in &self.connected {
            dense[input] = true;
        }
        dense
    }

    /// Number of connected synapses whose input bit is on.
    #[inline]
    pub fn overlap(&self, input_vector: &[bool]) -> usize {
        self.connected
            .iter()
            .filter(|&&input| input_vector[input])
            .count()
    }

    /// Stores `permanences` (aligned with `sparse_potential`) as they are and rebuilds the connected list.
    pub fn set_permanences(&mut self, permanences: &[f64], connected_threshold: f64) {
        for (syn, &perm) in self.synapses.iter_mut().zip(permanences) {
            syn.permanence = perm;
        }
        self.rebuild_connected(connected_threshold);
    }

    /// Applies the proximal update rule to `permanences` (aligned with `sparse_potential`) and stores them:
    /// - if `raise` is true, clip, then raise every value by the below-stimulus increment until
    ///   at least `stimulus_threshold` synapses are connected,
    /// - trim values at or below the trim threshold to zero,
    /// - clip to [min, max],
    /// - rebuild the connected list.
    pub fn update_permanences(
        &mut self,
        mut permanences: Vec<f64>,
        raise: bool,
        stimulus_threshold: f64,
        options: &SynapsePermanenceOptions,
    ) {
        if raise {
            for perm in permanences.iter_mut() {
                *perm = perm.clamp(options.min, options.max);
            }
            Self::raise_to_threshold(&mut permanences, stimulus_threshold, options);
        }

        for perm in permanences.iter_mut() {
            *perm = if *perm <= options.trim_threshold {
                0.0
            } else {
                perm.clamp(options.min, options.max)
            };
        }

        self.set_permanences(&permanences, options.connected);
    }

    /// Raises every permanence until at least `stimulus_threshold` of them are connected.
    /// Does nothing when the pool is too small to ever reach the threshold.
    fn raise_to_threshold(
        permanences: &mut [f64],
        stimulus_threshold: f64,
        options: &SynapsePermanenceOptions,
    ) {
        if (permanences.len() as f64) < stimulus_threshold || options.below_stimulus_increment <= 0.0 {
            return;
        }

        while (permanences
            .iter()
            .filter(|&&perm| perm >= options.connected)
            .count() as f64)
            < stimulus_threshold
        {
            for perm in permanences.iter_mut() {
                *perm += options.below_stimulus_increment;
            }
        }
    }

    fn rebuild_connected(&mut self, connected_threshold: f64) {
        self.connected = self
            .synapses
            .iter()
            .filter(|syn| syn.permanence >= connected_threshold)
            .map(|syn| syn.input)
            .collect();
    }
}
