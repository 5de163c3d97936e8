//! Hierarchical Temporal Memory: a Spatial Pooler and a Temporal Memory over one shared
//! `Connections` store.
//!
//! A time step runs the two algorithms back to back:
//!
//! ```
//! use htm_core::{Connections, Parameters, SpatialPooler, TemporalMemory};
//!
//! # fn main() -> htm_core::Result<()> {
//! let params = Parameters {
//!     input_dimensions: vec![64],
//!     column_dimensions: vec![128],
//!     cells_per_column: 4,
//!     global_inhibition: true,
//!     num_active_columns_per_inh_area: Some(8.0),
//!     ..Default::default()
//! };
//!
//! let mut c = Connections::new(params)?;
//! let sp = SpatialPooler::new();
//! let tm = TemporalMemory::new();
//! sp.init(&mut c)?;
//! tm.init(&mut c)?;
//!
//! let input: Vec<bool> = (0..64).map(|i| i % 4 == 0).collect();
//! let mut active = vec![false; 128];
//! let columns = sp.compute(&mut c, &input, &mut active, true)?;
//! let cycle = tm.compute(&mut c, &columns, true)?;
//! assert_eq!(cycle.active_cells.len(), columns.len() * 4);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;

pub use crate::core::{
    connections::{Activity, Connections},
    parameters::Parameters,
    spatial_pooler::SpatialPooler,
    temporal_memory::{ComputeCycle, TemporalMemory},
    topology::Topology,
};
pub use error::{HtmError, Result};
