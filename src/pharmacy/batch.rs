//! Batches of named experiments, read from and written to CSV.
//!
//! A batch file has one row per experiment. The `experiment` column names it; every other column is optional and
//! overrides the matching [`PharmacyConfig`] field:
//!
//! ```text
//! experiment,n_counters,arrival_lambda,choice_p,travel_time,travel_noise,check_interval
//! standard,3,1.3,0.6,30,10,60
//! ```

use super::config::{ConfigError, PharmacyConfig};
use super::experiment::{Experiment, ExperimentError};
use super::results::{ReplicationMetrics, ReplicationTable};

use serde::{Deserialize, Serialize};
use std::io;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("malformed batch file: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("experiment '{name}' has an invalid configuration: {source}")]
    Config {
        name: String,
        #[source]
        source: ConfigError,
    },
    #[error("experiment '{name}' failed: {source}")]
    Experiment {
        name: String,
        #[source]
        source: ExperimentError,
    },
}

/// One row of a batch file. Empty or absent cells keep the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentRow {
    pub experiment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_rng_streams: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_counters: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_lambda: Option<f64>,
    #[serde(default, alias = "service_mu", skip_serializing_if = "Option::is_none")]
    pub service_mean: Option<f64>,
    #[serde(default, alias = "service_sigma", skip_serializing_if = "Option::is_none")]
    pub service_stdev: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patience_shape: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patience_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_low: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_high: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub med_thresh: Option<u32>,
    #[serde(default, alias = "stock_init", skip_serializing_if = "Option::is_none")]
    pub max_stock: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_stock: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_noise: Option<f64>,
    #[serde(
        default,
        rename = "check_interval",
        alias = "restock_check_interval",
        skip_serializing_if = "Option::is_none"
    )]
    pub restock_check_interval: Option<f64>,
}

impl ExperimentRow {
    /// Defaults overridden by every cell present in the row.
    pub fn config(&self) -> PharmacyConfig {
        let defaults = PharmacyConfig::default();
        PharmacyConfig {
            seed: self.seed.unwrap_or(defaults.seed),
            n_rng_streams: self.n_rng_streams.unwrap_or(defaults.n_rng_streams),
            n_counters: self.n_counters.unwrap_or(defaults.n_counters),
            arrival_lambda: self.arrival_lambda.unwrap_or(defaults.arrival_lambda),
            service_mean: self.service_mean.unwrap_or(defaults.service_mean),
            service_stdev: self.service_stdev.unwrap_or(defaults.service_stdev),
            patience_shape: self.patience_shape.unwrap_or(defaults.patience_shape),
            patience_scale: self.patience_scale.unwrap_or(defaults.patience_scale),
            choice_p: self.choice_p.unwrap_or(defaults.choice_p),
            choice_low: self.choice_low.unwrap_or(defaults.choice_low),
            choice_high: self.choice_high.unwrap_or(defaults.choice_high),
            med_thresh: self.med_thresh.unwrap_or(defaults.med_thresh),
            max_stock: self.max_stock.unwrap_or(defaults.max_stock),
            initial_stock: self.initial_stock.or(defaults.initial_stock),
            restock_check_interval: self.restock_check_interval.unwrap_or(defaults.restock_check_interval),
            travel_time: self.travel_time.unwrap_or(defaults.travel_time),
            travel_noise: self.travel_noise.unwrap_or(defaults.travel_noise),
        }
    }

    fn into_experiment(self) -> Result<(String, Experiment), BatchError> {
        match Experiment::new(self.config()) {
            Ok(experiment) => Ok((self.experiment, experiment)),
            Err(source) => Err(BatchError::Config {
                name: self.experiment,
                source,
            }),
        }
    }
}

/// Parse and validate every experiment of a batch file, in file order.
///
/// # Errors
///
/// [`BatchError::Csv`] for a malformed file or unknown column, [`BatchError::Config`] for the first invalid experiment.
pub fn read_experiments<R: io::Read>(reader: R) -> Result<Vec<(String, Experiment)>, BatchError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut experiments = Vec::new();
    for row in reader.deserialize::<ExperimentRow>() {
        experiments.push(row?.into_experiment()?);
    }
    Ok(experiments)
}

fn example(
    name: &str,
    n_counters: usize,
    arrival_lambda: f64,
    choice_p: f64,
    travel_time: f64,
    check_interval: f64,
) -> ExperimentRow {
    ExperimentRow {
        experiment: name.to_string(),
        n_counters: Some(n_counters),
        arrival_lambda: Some(arrival_lambda),
        choice_p: Some(choice_p),
        travel_time: Some(travel_time),
        travel_noise: Some(10.0),
        restock_check_interval: Some(check_interval),
        ..ExperimentRow::default()
    }
}

/// The three stock scenarios shipped as a batch template.
pub fn example_rows() -> Vec<ExperimentRow> {
    vec![
        example("standard", 3, 1.3, 0.6, 30.0, 60.0),
        example("busy_day", 4, 1.75, 0.6, 40.0, 90.0),
        example("flu_season", 3, 1.6, 0.2, 30.0, 30.0),
    ]
}

/// The example scenarios as validated experiments.
///
/// # Errors
///
/// Never in practice; the examples are valid against the defaults.
pub fn example_experiments() -> Result<Vec<(String, Experiment)>, BatchError> {
    example_rows().into_iter().map(ExperimentRow::into_experiment).collect()
}

/// Write the example scenarios as a batch file.
///
/// # Errors
///
/// Any error raised by the underlying writer.
pub fn write_template<W: io::Write>(writer: W) -> Result<(), BatchError> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in example_rows() {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Batch-wide stock settings laid over every experiment of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StockOverride {
    /// Initial and maximum stock of both containers.
    pub stock: Option<u32>,
    /// Restock threshold as a percentage of the maximum stock, rounded down to whole units.
    pub threshold_percent: Option<f64>,
}

impl StockOverride {
    /// `config` with the overrides applied.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ThresholdPercent`] for a percentage outside `[0, 100]`.
    pub fn apply(&self, mut config: PharmacyConfig) -> Result<PharmacyConfig, ConfigError> {
        if let Some(stock) = self.stock {
            config = config.with_stock(stock);
        }
        if let Some(percent) = self.threshold_percent {
            if !(0.0..=100.0).contains(&percent) {
                return Err(ConfigError::ThresholdPercent(percent));
            }
            let threshold = (percent * f64::from(config.max_stock) / 100.0).floor() as u32;
            config = config.with_threshold(threshold);
        }
        Ok(config)
    }
}

/// Lay `stock` over every experiment and validate the results again.
///
/// # Errors
///
/// [`BatchError::Config`] for the first experiment the override makes invalid.
pub fn override_stock(
    experiments: Vec<(String, Experiment)>,
    stock: StockOverride,
) -> Result<Vec<(String, Experiment)>, BatchError> {
    experiments
        .into_iter()
        .map(|(name, experiment)| {
            match stock.apply(experiment.config().clone()).and_then(Experiment::new) {
                Ok(experiment) => Ok((name, experiment)),
                Err(source) => Err(BatchError::Config { name, source }),
            }
        })
        .collect()
}

/// Replicate every experiment with the same run length, returning the tables in input order.
///
/// # Errors
///
/// [`BatchError::Experiment`] for the first experiment that fails.
pub fn run_batch(
    experiments: &[(String, Experiment)],
    n: u64,
    warmup: f64,
    horizon: f64,
) -> Result<Vec<(String, ReplicationTable)>, BatchError> {
    experiments
        .iter()
        .map(|(name, experiment)| {
            info!(experiment = %name, replications = n, "running experiment");
            #[cfg(feature = "parallel")]
            let table = experiment.run_replications_parallel(n, warmup, horizon);
            #[cfg(not(feature = "parallel"))]
            let table = experiment.run_replications(n, warmup, horizon);

            table.map(|table| (name.clone(), table)).map_err(|source| BatchError::Experiment {
                name: name.clone(),
                source,
            })
        })
        .collect()
}

/// Mean metrics of one experiment in a [`BatchSummary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub experiment: String,
    pub mean_queue_waiting_time: f64,
    pub counter_util: f64,
    pub reneging_rate: f64,
}

impl SummaryRow {
    pub fn metrics(&self) -> ReplicationMetrics {
        ReplicationMetrics {
            mean_queue_waiting_time: self.mean_queue_waiting_time,
            counter_util: self.counter_util,
            reneging_rate: self.reneging_rate,
        }
    }
}

/// Per-experiment column means of a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    rows: Vec<SummaryRow>,
}

impl BatchSummary {
    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn get(&self, experiment: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|row| row.experiment == experiment)
    }

    /// # Errors
    ///
    /// Any error raised by the underlying writer.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

pub fn summarize(tables: &[(String, ReplicationTable)]) -> BatchSummary {
    let rows = tables
        .iter()
        .map(|(name, table)| {
            let means = table.means();
            SummaryRow {
                experiment: name.clone(),
                mean_queue_waiting_time: means.mean_queue_waiting_time,
                counter_util: means.counter_util,
                reneging_rate: means.reneging_rate,
            }
        })
        .collect();
    BatchSummary { rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_partial_rows_over_defaults() {
        let file = "experiment,n_counters,arrival_lambda,check_interval\nquiet,2,0.5,45\ndefaulted,,,\n";
        let experiments = read_experiments(file.as_bytes()).unwrap();

        assert_eq!(2, experiments.len());
        let (name, quiet) = &experiments[0];
        assert_eq!("quiet", name);
        assert_eq!(2, quiet.config().n_counters);
        assert_eq!(0.5, quiet.config().arrival_lambda);
        assert_eq!(45.0, quiet.config().restock_check_interval);
        assert_eq!(PharmacyConfig::default().travel_time, quiet.config().travel_time);

        assert_eq!(&PharmacyConfig::default(), experiments[1].1.config());
    }

    #[test]
    fn rejects_unknown_columns_and_invalid_rows() {
        let unknown = "experiment,n_countres\nx,2\n";
        assert!(matches!(read_experiments(unknown.as_bytes()), Err(BatchError::Csv(_))));

        let invalid = "experiment,n_counters\nok,2\nbroken,0\n";
        match read_experiments(invalid.as_bytes()) {
            Err(BatchError::Config { name, source }) => {
                assert_eq!("broken", name);
                assert_eq!(ConfigError::NoCounters, source);
            },
            other => panic!("expected a config error, got {other:?}"),
        }
    }

    #[test]
    fn template_reads_back_as_the_examples() {
        let mut buffer = Vec::new();
        write_template(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            Some("experiment,n_counters,arrival_lambda,choice_p,travel_time,travel_noise,check_interval"),
            text.lines().next()
        );

        let read = read_experiments(text.as_bytes()).unwrap();
        assert_eq!(example_experiments().unwrap(), read);
        assert_eq!(
            vec!["standard", "busy_day", "flu_season"],
            read.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn stock_override_sets_stock_and_threshold_for_every_experiment() {
        let stock = StockOverride {
            stock: Some(400),
            threshold_percent: Some(25.5),
        };
        let experiments = override_stock(example_experiments().unwrap(), stock).unwrap();

        assert_eq!(3, experiments.len());
        for (_, experiment) in &experiments {
            assert_eq!(400, experiment.config().max_stock);
            assert_eq!(400, experiment.config().starting_stock());
            assert_eq!(102, experiment.config().med_thresh);
        }
        assert_eq!(1.75, experiments[1].1.config().arrival_lambda, "other settings are kept");

        let untouched = override_stock(example_experiments().unwrap(), StockOverride::default()).unwrap();
        assert_eq!(example_experiments().unwrap(), untouched);
    }

    #[test]
    fn stock_override_rejects_bad_percentages() {
        let stock = StockOverride {
            stock: None,
            threshold_percent: Some(120.0),
        };
        match override_stock(example_experiments().unwrap(), stock) {
            Err(BatchError::Config { name, source }) => {
                assert_eq!("standard", name);
                assert_eq!(ConfigError::ThresholdPercent(120.0), source);
            },
            other => panic!("expected a config error, got {other:?}"),
        }
    }

    #[test]
    fn summary_holds_one_row_of_means_per_experiment() {
        let table = |util: f64| {
            ReplicationTable::from_metrics([
                ReplicationMetrics {
                    mean_queue_waiting_time: 1.0,
                    counter_util: util,
                    reneging_rate: 2.0,
                },
                ReplicationMetrics {
                    mean_queue_waiting_time: 3.0,
                    counter_util: util,
                    reneging_rate: 4.0,
                },
            ])
        };
        let summary = summarize(&[("a".to_string(), table(10.0)), ("b".to_string(), table(20.0))]);

        assert_eq!(2, summary.rows().len());
        assert_eq!(20.0, summary.get("b").unwrap().counter_util);
        assert_eq!(
            ReplicationMetrics {
                mean_queue_waiting_time: 2.0,
                counter_util: 10.0,
                reneging_rate: 3.0,
            },
            summary.get("a").unwrap().metrics()
        );

        let mut buffer = Vec::new();
        summary.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            Some("experiment,mean_queue_waiting_time,counter_util,reneging_rate"),
            text.lines().next()
        );
    }
}
