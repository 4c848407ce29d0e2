//! The experiment driver: runs replications of one validated configuration.

use super::config::{validate_run_length, ConfigError, PharmacyConfig};
use super::processes::Pharmacy;
use super::results::{ReplicationMetrics, ReplicationTable, Results};
use crate::Error;

use ordered_float::OrderedFloat;
use tracing::{debug, info};

/// A replication could not be completed, or the experiment could not be started.
#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// Replication `index` (0-based) aborted. No metrics are reported for the experiment.
    #[error("replication {index} failed: {source}")]
    Replication {
        index: u64,
        #[source]
        source: Error,
    },
    /// A single run started through [`Experiment::run()`] or [`Experiment::simulate()`] aborted.
    #[error("simulation with seed {seed} failed: {source}")]
    Run {
        seed: u64,
        #[source]
        source: Error,
    },
}

/// A validated configuration, ready to be replicated.
///
/// ```
/// use pharmacy_des::pharmacy::{Experiment, PharmacyConfig};
///
/// let experiment = Experiment::new(PharmacyConfig::default().with_counters(2)).unwrap();
/// let table = experiment.run_replications(3, 30.0, 240.0).unwrap();
/// assert_eq!(3, table.len());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    config: PharmacyConfig,
}

impl Experiment {
    /// # Errors
    ///
    /// The first [`ConfigError`] found by [`PharmacyConfig::validate()`].
    pub fn new(config: PharmacyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PharmacyConfig {
        &self.config
    }

    /// Seed of replication `index`.
    pub fn replication_seed(&self, index: u64) -> u64 {
        self.config.seed.wrapping_add(index)
    }

    /// Run one replication to `warmup + horizon` and return its raw post-warmup observations.
    ///
    /// # Errors
    ///
    /// [`ExperimentError::Config`] for a negative warmup or a horizon that is not positive and finite, otherwise
    /// [`ExperimentError::Run`] with whatever [`Error`] aborted the replication.
    pub fn simulate(&self, seed: u64, warmup: f64, horizon: f64) -> Result<Results, ExperimentError> {
        validate_run_length(warmup, horizon)?;
        self.simulate_unchecked(seed, warmup, horizon)
            .map_err(|source| ExperimentError::Run { seed, source })
    }

    /// Run one replication and reduce it to its metrics.
    ///
    /// # Errors
    ///
    /// As for [`simulate()`](Experiment::simulate).
    pub fn run(&self, seed: u64, warmup: f64, horizon: f64) -> Result<ReplicationMetrics, ExperimentError> {
        self.simulate(seed, warmup, horizon)
            .map(|results| results.metrics(horizon, self.config.n_counters))
    }

    /// The run length must already have passed [`validate_run_length()`].
    fn simulate_unchecked(&self, seed: u64, warmup: f64, horizon: f64) -> Result<Results, Error> {
        let mut sim = Pharmacy::simulation(&self.config, seed, warmup)?;
        sim.run_until(OrderedFloat(warmup + horizon))?;
        debug!(seed, events_pending = sim.event_queue().len(), "replication finished");
        Ok(sim.into_state().into_results())
    }

    fn run_indexed(&self, index: u64, warmup: f64, horizon: f64) -> Result<ReplicationMetrics, ExperimentError> {
        let seed = self.replication_seed(index);
        let metrics = self
            .simulate_unchecked(seed, warmup, horizon)
            .map(|results| results.metrics(horizon, self.config.n_counters))
            .map_err(|source| ExperimentError::Replication { index, source })?;
        info!(
            replication = index + 1,
            seed,
            mean_queue_waiting_time = metrics.mean_queue_waiting_time,
            counter_util = metrics.counter_util,
            reneging_rate = metrics.reneging_rate,
            "replication complete"
        );
        Ok(metrics)
    }

    /// Run replications `0..n` one after another, each with its own seed.
    ///
    /// # Errors
    ///
    /// [`ExperimentError::Config`] for an invalid run length, or [`ExperimentError::Replication`] for the first
    /// replication that fails.
    pub fn run_replications(&self, n: u64, warmup: f64, horizon: f64) -> Result<ReplicationTable, ExperimentError> {
        validate_run_length(warmup, horizon)?;
        let metrics = (0..n)
            .map(|index| self.run_indexed(index, warmup, horizon))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ReplicationTable::from_metrics(metrics))
    }

    /// Same as [`run_replications()`](Experiment::run_replications), with replications spread over the rayon thread
    /// pool. The table is identical to the sequential one.
    ///
    /// # Errors
    ///
    /// As for [`run_replications()`](Experiment::run_replications). If several replications fail, the one with the
    /// lowest index is reported.
    #[cfg(feature = "parallel")]
    pub fn run_replications_parallel(
        &self,
        n: u64,
        warmup: f64,
        horizon: f64,
    ) -> Result<ReplicationTable, ExperimentError> {
        use rayon::prelude::*;

        validate_run_length(warmup, horizon)?;
        let metrics = (0..n)
            .into_par_iter()
            .map(|index| self.run_indexed(index, warmup, horizon))
            .collect::<Vec<_>>()
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ReplicationTable::from_metrics(metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn invalid_configuration_is_rejected_up_front() {
        let result = Experiment::new(PharmacyConfig::default().with_counters(0));
        assert_eq!(Err(ConfigError::NoCounters), result);
    }

    #[test]
    fn invalid_run_length_is_rejected() {
        let experiment = Experiment::new(PharmacyConfig::default()).unwrap();
        assert!(matches!(
            experiment.run_replications(1, -1.0, 100.0),
            Err(ExperimentError::Config(ConfigError::Negative { name: "warmup", .. }))
        ));
        assert!(matches!(
            experiment.run_replications(1, 0.0, 0.0),
            Err(ExperimentError::Config(ConfigError::NotPositive { name: "horizon", .. }))
        ));
    }

    #[test]
    fn single_runs_reject_unbounded_or_negative_lengths() {
        let experiment = Experiment::new(PharmacyConfig::default()).unwrap();
        for horizon in [f64::INFINITY, f64::NAN, -1.0] {
            assert!(
                matches!(
                    experiment.run(1, 0.0, horizon),
                    Err(ExperimentError::Config(ConfigError::NotPositive { name: "horizon", .. }))
                ),
                "horizon {horizon} should be rejected"
            );
        }
        assert!(matches!(
            experiment.simulate(1, -5.0, 100.0),
            Err(ExperimentError::Config(ConfigError::Negative { name: "warmup", .. }))
        ));
        assert!(matches!(
            experiment.run(1, f64::MAX, f64::MAX),
            Err(ExperimentError::Config(ConfigError::NotPositive { name: "horizon", .. }))
        ));
    }

    #[test]
    fn replications_use_consecutive_seeds() {
        let experiment = Experiment::new(PharmacyConfig::default().with_seed(u64::MAX)).unwrap();
        assert_eq!(u64::MAX, experiment.replication_seed(0));
        assert_eq!(0, experiment.replication_seed(1));
    }

    #[test]
    fn failed_replication_reports_its_index() {
        let error = ExperimentError::Replication {
            index: 3,
            source: Error::BackInTime,
        };
        assert_eq!(
            "replication 3 failed: event execution time is less than current simulation time",
            error.to_string()
        );
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    #[traced_test]
    fn logs_each_replication() {
        let experiment = Experiment::new(PharmacyConfig::default()).unwrap();
        experiment.run_replications(2, 10.0, 60.0).unwrap();
        assert!(logs_contain("replication complete"));
        assert!(logs_contain("warmup complete"));
    }

    #[test]
    fn zero_replications_yield_an_empty_table() {
        let experiment = Experiment::new(PharmacyConfig::default()).unwrap();
        let table = experiment.run_replications(0, 10.0, 10.0).unwrap();
        assert!(table.is_empty());
        assert_eq!(ReplicationMetrics::default(), table.means());
    }
}
