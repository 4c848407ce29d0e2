//! # Overview
//!
//! pharmacy-des is a discrete-event simulation of a pharmacy's counters, customer reneging and stock restocking,
//! together with the small event-driven engine it runs on.
//!
//! The engine in [`serial`] is an event queue and a runner. Every activity of a model is a chain of [`Event`]s: an
//! event executes with exclusive access to the simulation's state and queue, then schedules the event that continues
//! its process. Events at equal times execute in the order they were scheduled, so a replication is fully determined
//! by its seed.
//!
//! * [`resources`] provides the shared resources processes contend for: a pool of counters with a FIFO wait queue and
//!   cancellable requests, and stock containers with blocking FIFO withdrawals.
//! * [`sampling`] derives independent random streams from a replication seed.
//! * [`pharmacy`] is the model itself and its experiment driver.
//!
//! ```
//! use pharmacy_des::pharmacy::{Experiment, PharmacyConfig};
//!
//! let experiment = Experiment::new(PharmacyConfig::default()).unwrap();
//! let metrics = experiment.run(42, 60.0, 480.0).unwrap();
//! assert!((0.0..=100.0).contains(&metrics.reneging_rate));
//! ```
//!
//! # Features
//!
//! `parallel` (on by default) adds [`Experiment::run_replications_parallel`], which spreads replications over a
//! [`rayon`](https://docs.rs/rayon/1) thread pool.
//!
//! [`Event`]: serial::Event
//! [`Experiment::run_replications_parallel`]: pharmacy::Experiment::run_replications_parallel

mod error;
mod generic_parameters;
pub mod pharmacy;
pub mod resources;
pub mod sampling;
pub mod serial;

pub use error::{Error, Result};
pub use generic_parameters::{SimState, SimTime};
