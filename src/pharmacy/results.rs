//! Observations collected during a replication, and the metrics derived from them.

use serde::{Deserialize, Serialize};
use std::io;

/// Mutable observations of one replication. Replaced by a fresh value at the warmup boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Results {
    /// Time each customer spent queueing before reaching a counter.
    pub queue_waiting_times: Vec<f64>,
    /// Time each customer spent at a counter waiting for stock before service could start.
    pub stock_waiting_times: Vec<f64>,
    /// Sum of completed service durations.
    pub total_service_time: f64,
    /// Customers that gave up queueing.
    pub reneged: u64,
    /// Customers that arrived.
    pub arrivals: u64,
    /// Customers that finished service.
    pub completed: u64,
}

impl Results {
    /// Customers that reached a counter.
    pub fn served(&self) -> usize {
        self.queue_waiting_times.len()
    }

    /// Reduce the observations to the reported metrics. `horizon` is the post-warmup collection period.
    pub fn metrics(&self, horizon: f64, n_counters: usize) -> ReplicationMetrics {
        let mean_queue_waiting_time = mean(&self.queue_waiting_times);
        let counter_util = self.total_service_time / (horizon * n_counters as f64) * 100.0;
        let reneging_rate = if self.arrivals == 0 {
            0.0
        } else {
            self.reneged as f64 / self.arrivals as f64 * 100.0
        };

        ReplicationMetrics {
            mean_queue_waiting_time,
            counter_util,
            reneging_rate,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Display metadata for one reported metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricInfo {
    pub column: &'static str,
    pub name: &'static str,
    pub units: &'static str,
}

/// Outcome of one replication.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReplicationMetrics {
    /// Mean minutes spent queueing by customers that reached a counter, or 0 if none did.
    pub mean_queue_waiting_time: f64,
    /// Percentage of available counter time spent serving.
    pub counter_util: f64,
    /// Percentage of arrivals that reneged.
    pub reneging_rate: f64,
}

impl ReplicationMetrics {
    pub const METRICS: [MetricInfo; 3] = [
        MetricInfo {
            column: "mean_queue_waiting_time",
            name: "Queue Waiting Time",
            units: "minutes",
        },
        MetricInfo {
            column: "counter_util",
            name: "Pharmacist Utilization",
            units: "%",
        },
        MetricInfo {
            column: "reneging_rate",
            name: "Reneging Rate",
            units: "%",
        },
    ];

    /// Values in the order of [`ReplicationMetrics::METRICS`].
    pub fn values(&self) -> [f64; 3] {
        [self.mean_queue_waiting_time, self.counter_util, self.reneging_rate]
    }

    /// Column-wise mean of a set of metrics. All zero for an empty set.
    pub fn mean_of<'a>(metrics: impl IntoIterator<Item = &'a ReplicationMetrics>) -> Self {
        let mut count = 0usize;
        let mut sums = [0.0; 3];
        for row in metrics {
            count += 1;
            for (sum, value) in sums.iter_mut().zip(row.values()) {
                *sum += value;
            }
        }
        if count == 0 {
            return Self::default();
        }

        let [mean_queue_waiting_time, counter_util, reneging_rate] = sums.map(|sum| sum / count as f64);
        Self {
            mean_queue_waiting_time,
            counter_util,
            reneging_rate,
        }
    }
}

/// One row of a [`ReplicationTable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicationRow {
    /// 1-based replication number.
    pub replication: usize,
    pub metrics: ReplicationMetrics,
}

/// Flat CSV shape of a [`ReplicationRow`].
#[derive(Serialize)]
struct CsvRow {
    replication: usize,
    mean_queue_waiting_time: f64,
    counter_util: f64,
    reneging_rate: f64,
}

impl From<&ReplicationRow> for CsvRow {
    fn from(row: &ReplicationRow) -> Self {
        Self {
            replication: row.replication,
            mean_queue_waiting_time: row.metrics.mean_queue_waiting_time,
            counter_util: row.metrics.counter_util,
            reneging_rate: row.metrics.reneging_rate,
        }
    }
}

/// Metrics of every replication of an experiment, in replication order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplicationTable {
    rows: Vec<ReplicationRow>,
}

impl ReplicationTable {
    /// Number the metrics `1..=n` in the order given.
    pub fn from_metrics(metrics: impl IntoIterator<Item = ReplicationMetrics>) -> Self {
        let rows = metrics
            .into_iter()
            .enumerate()
            .map(|(index, metrics)| ReplicationRow {
                replication: index + 1,
                metrics,
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[ReplicationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column-wise means across replications.
    pub fn means(&self) -> ReplicationMetrics {
        ReplicationMetrics::mean_of(self.rows.iter().map(|row| &row.metrics))
    }

    /// Column-wise sample standard deviations across replications. All zero for fewer than two rows.
    pub fn std_devs(&self) -> ReplicationMetrics {
        if self.rows.len() < 2 {
            return ReplicationMetrics::default();
        }
        let means = self.means().values();
        let mut squares = [0.0; 3];
        for row in &self.rows {
            for ((square, value), mean) in squares.iter_mut().zip(row.metrics.values()).zip(means) {
                *square += (value - mean).powi(2);
            }
        }

        let [mean_queue_waiting_time, counter_util, reneging_rate] =
            squares.map(|square| (square / (self.rows.len() - 1) as f64).sqrt());
        ReplicationMetrics {
            mean_queue_waiting_time,
            counter_util,
            reneging_rate,
        }
    }

    /// Write the table as CSV with a header row.
    ///
    /// # Errors
    ///
    /// Any error raised by the underlying writer.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            writer.serialize(CsvRow::from(row))?;
        }
        writer.flush()?;
        Ok(())
    }
}
