//! A pharmacy model built on the [`serial`](crate::serial) engine.
//!
//! Customers arrive, queue for one of a few counters and may renege if kept waiting. At a counter they take medicine
//! from one of two stock containers, waiting there if the shelf is short, and are served. A restock monitor tops the
//! containers up after a travel delay. [`Experiment`] replicates the model and reduces each replication to
//! [`ReplicationMetrics`]; [`batch`] runs sets of named experiments read from CSV.

pub mod batch;
mod config;
mod experiment;
mod processes;
mod results;

pub use config::{
    validate_run_length, ConfigError, PharmacyConfig, DEFAULT_HORIZON, DEFAULT_REPLICATIONS, DEFAULT_WARMUP,
    REQUIRED_STREAMS,
};
pub use experiment::{Experiment, ExperimentError};
pub use processes::{Medicine, MedicineOrder, Minutes, ModelError, Pharmacy, RandomStream};
pub use results::{MetricInfo, ReplicationMetrics, ReplicationRow, ReplicationTable, Results};
