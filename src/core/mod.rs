pub mod column;
pub mod connections;
pub mod group_by;
pub mod parameters;
pub mod pool;
pub mod segment;
pub mod spatial_pooler;
pub mod synapses;
pub mod temporal_memory;
pub mod topology;
