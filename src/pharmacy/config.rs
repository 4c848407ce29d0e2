//! Parameters of one pharmacy experiment.

use serde::{Deserialize, Serialize};

/// Default warmup period, in minutes, whose observations are discarded.
pub const DEFAULT_WARMUP: f64 = 60.0;

/// Default data collection period after warmup: one day, in minutes.
pub const DEFAULT_HORIZON: f64 = 24.0 * 60.0;

/// Default number of replications per experiment.
pub const DEFAULT_REPLICATIONS: usize = 10;

/// Number of independent random streams one replication draws from.
pub const REQUIRED_STREAMS: usize = 6;

/// Immutable parameters of a pharmacy experiment. Time is measured in minutes throughout.
///
/// Fields missing from a deserialized record fall back to [`PharmacyConfig::default()`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PharmacyConfig {
    /// Base seed; replication `i` runs with `seed + i`.
    pub seed: u64,
    /// Number of independent random streams declared for a replication.
    pub n_rng_streams: usize,
    /// Number of service counters.
    pub n_counters: usize,
    /// Customer arrival rate per minute (exponential inter-arrival times).
    pub arrival_lambda: f64,
    /// Mean service duration (lognormal).
    #[serde(alias = "service_mu")]
    pub service_mean: f64,
    /// Standard deviation of the service duration.
    #[serde(alias = "service_sigma")]
    pub service_stdev: f64,
    /// Weibull shape of customer patience.
    pub patience_shape: f64,
    /// Weibull scale of customer patience. An infinite scale means customers never renege.
    pub patience_scale: f64,
    /// Probability that a customer wants prescription rather than over-the-counter medicine.
    pub choice_p: f64,
    /// Smallest quantity a customer buys.
    pub choice_low: u32,
    /// Exclusive upper bound on the quantity a customer buys.
    pub choice_high: u32,
    /// A category is restocked once its level is at or below this.
    pub med_thresh: u32,
    /// Capacity of each stock container, and the level restock orders fill up to.
    #[serde(alias = "stock_init")]
    pub max_stock: u32,
    /// Level each container starts at. `None` starts full.
    pub initial_stock: Option<u32>,
    /// Minutes between restock checks.
    #[serde(alias = "check_interval")]
    pub restock_check_interval: f64,
    /// Mean one-way time for a restock delivery.
    pub travel_time: f64,
    /// Deliveries take `travel_time` plus uniform noise in `[-travel_noise, travel_noise]`.
    pub travel_noise: f64,
}

impl Default for PharmacyConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_rng_streams: REQUIRED_STREAMS,
            n_counters: 3,
            arrival_lambda: 1.6,
            service_mean: 1.25,
            service_stdev: 0.25,
            patience_shape: 4.5,
            patience_scale: 6.0,
            choice_p: 0.6,
            choice_low: 1,
            choice_high: 3,
            med_thresh: 100,
            max_stock: 250,
            initial_stock: None,
            restock_check_interval: 30.0,
            travel_time: 30.0,
            travel_noise: 10.0,
        }
    }
}

/// A parameter that would make the model meaningless or unable to run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one counter is required")]
    NoCounters,
    #[error("at least {required} random streams are required, got {declared}")]
    TooFewStreams { declared: usize, required: usize },
    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("{name} must be non-negative and finite, got {value}")]
    Negative { name: &'static str, value: f64 },
    #[error("prescription probability must be within [0, 1], got {0}")]
    Probability(f64),
    #[error("restock threshold percentage must be within [0, 100], got {0}")]
    ThresholdPercent(f64),
    #[error("quantity range [{low}, {high}) must be non-empty and start at 1 or more")]
    QuantityRange { low: u32, high: u32 },
    #[error("largest quantity {largest} exceeds the stock capacity {capacity}")]
    QuantityAboveCapacity { largest: u32, capacity: u32 },
    #[error("restock threshold {threshold} exceeds the stock capacity {capacity}")]
    ThresholdAboveCapacity { threshold: u32, capacity: u32 },
    #[error("initial stock {initial} exceeds the stock capacity {capacity}")]
    InitialAboveCapacity { initial: u32, capacity: u32 },
    #[error("travel noise {noise} exceeds the travel time {travel_time}")]
    NoiseAboveTravelTime { noise: f64, travel_time: f64 },
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

impl PharmacyConfig {
    /// Set the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of counters.
    pub fn with_counters(mut self, n_counters: usize) -> Self {
        self.n_counters = n_counters;
        self
    }

    /// Set the arrival rate per minute.
    pub fn with_arrival_rate(mut self, arrival_lambda: f64) -> Self {
        self.arrival_lambda = arrival_lambda;
        self
    }

    /// Set the mean and standard deviation of the service duration.
    pub fn with_service_time(mut self, mean: f64, stdev: f64) -> Self {
        self.service_mean = mean;
        self.service_stdev = stdev;
        self
    }

    /// Set the Weibull shape and scale of customer patience.
    pub fn with_patience(mut self, shape: f64, scale: f64) -> Self {
        self.patience_shape = shape;
        self.patience_scale = scale;
        self
    }

    /// Customers wait as long as it takes and never renege.
    pub fn with_unlimited_patience(mut self) -> Self {
        self.patience_scale = f64::INFINITY;
        self
    }

    /// Set the probability of a prescription purchase.
    pub fn with_prescription_probability(mut self, choice_p: f64) -> Self {
        self.choice_p = choice_p;
        self
    }

    /// Set the half-open range `[low, high)` purchase quantities are drawn from.
    pub fn with_quantity_range(mut self, low: u32, high: u32) -> Self {
        self.choice_low = low;
        self.choice_high = high;
        self
    }

    /// Set the capacity of each container; containers start full.
    pub fn with_stock(mut self, max_stock: u32) -> Self {
        self.max_stock = max_stock;
        self.initial_stock = None;
        self
    }

    /// Set the level each container starts at, independent of its capacity.
    pub fn with_initial_stock(mut self, initial_stock: u32) -> Self {
        self.initial_stock = Some(initial_stock);
        self
    }

    /// Set the restock threshold.
    pub fn with_threshold(mut self, med_thresh: u32) -> Self {
        self.med_thresh = med_thresh;
        self
    }

    /// Set the restock check interval.
    pub fn with_check_interval(mut self, minutes: f64) -> Self {
        self.restock_check_interval = minutes;
        self
    }

    /// Set the delivery travel time and the bound of its uniform noise.
    pub fn with_travel(mut self, travel_time: f64, travel_noise: f64) -> Self {
        self.travel_time = travel_time;
        self.travel_noise = travel_noise;
        self
    }

    /// Level each container starts at.
    pub fn starting_stock(&self) -> u32 {
        self.initial_stock.unwrap_or(self.max_stock)
    }

    /// Check every parameter, reporting the first one that is out of range.
    ///
    /// # Errors
    ///
    /// The [`ConfigError`] describing the offending parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_counters == 0 {
            return Err(ConfigError::NoCounters);
        }
        if self.n_rng_streams < REQUIRED_STREAMS {
            return Err(ConfigError::TooFewStreams {
                declared: self.n_rng_streams,
                required: REQUIRED_STREAMS,
            });
        }

        positive("arrival_lambda", self.arrival_lambda)?;
        positive("service_mean", self.service_mean)?;
        non_negative("service_stdev", self.service_stdev)?;
        positive("patience_shape", self.patience_shape)?;
        if self.patience_scale != f64::INFINITY {
            positive("patience_scale", self.patience_scale)?;
        }
        positive("restock_check_interval", self.restock_check_interval)?;
        non_negative("travel_noise", self.travel_noise)?;
        positive("travel_time", self.travel_time)?;

        if !(0.0..=1.0).contains(&self.choice_p) {
            return Err(ConfigError::Probability(self.choice_p));
        }
        if self.choice_low == 0 || self.choice_low >= self.choice_high {
            return Err(ConfigError::QuantityRange {
                low: self.choice_low,
                high: self.choice_high,
            });
        }
        if self.choice_high - 1 > self.max_stock {
            return Err(ConfigError::QuantityAboveCapacity {
                largest: self.choice_high - 1,
                capacity: self.max_stock,
            });
        }
        if self.med_thresh > self.max_stock {
            return Err(ConfigError::ThresholdAboveCapacity {
                threshold: self.med_thresh,
                capacity: self.max_stock,
            });
        }
        if self.starting_stock() > self.max_stock {
            return Err(ConfigError::InitialAboveCapacity {
                initial: self.starting_stock(),
                capacity: self.max_stock,
            });
        }
        if self.travel_noise > self.travel_time {
            return Err(ConfigError::NoiseAboveTravelTime {
                noise: self.travel_noise,
                travel_time: self.travel_time,
            });
        }
        Ok(())
    }
}

/// Validate the length of a run: a non-negative warmup followed by a positive collection horizon, ending at a finite
/// time.
///
/// # Errors
///
/// [`ConfigError::Negative`] or [`ConfigError::NotPositive`] naming the offending value.
pub fn validate_run_length(warmup: f64, horizon: f64) -> Result<(), ConfigError> {
    non_negative("warmup", warmup)?;
    positive("horizon", horizon)?;
    if (warmup + horizon).is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive {
            name: "horizon",
            value: horizon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(Ok(()), PharmacyConfig::default().validate());
        assert_eq!(250, PharmacyConfig::default().starting_stock());
    }

    #[test]
    fn rejects_zero_counters() {
        let config = PharmacyConfig::default().with_counters(0);
        assert_eq!(Err(ConfigError::NoCounters), config.validate());
    }

    #[test]
    fn rejects_non_positive_rates() {
        let config = PharmacyConfig::default().with_arrival_rate(0.0);
        assert_eq!(
            Err(ConfigError::NotPositive {
                name: "arrival_lambda",
                value: 0.0
            }),
            config.validate()
        );
        assert!(PharmacyConfig::default().with_check_interval(-5.0).validate().is_err());
    }

    #[test]
    fn rejects_threshold_above_capacity() {
        let config = PharmacyConfig::default().with_stock(50).with_threshold(60);
        assert_eq!(
            Err(ConfigError::ThresholdAboveCapacity {
                threshold: 60,
                capacity: 50
            }),
            config.validate()
        );
    }

    #[test]
    fn rejects_noise_that_could_rewind_a_delivery() {
        let config = PharmacyConfig::default().with_travel(5.0, 6.0);
        assert!(matches!(config.validate(), Err(ConfigError::NoiseAboveTravelTime { .. })));
    }

    #[test]
    fn unlimited_patience_is_valid() {
        assert_eq!(Ok(()), PharmacyConfig::default().with_unlimited_patience().validate());
    }

    #[test]
    fn empty_start_with_capacity_is_valid() {
        let config = PharmacyConfig::default().with_initial_stock(0).with_threshold(0);
        assert_eq!(Ok(()), config.validate());
        assert_eq!(0, config.starting_stock());
        assert!(PharmacyConfig::default().with_initial_stock(251).validate().is_err());
    }

    #[test]
    fn run_length_must_be_sensible() {
        assert_eq!(Ok(()), validate_run_length(0.0, 100.0));
        assert!(validate_run_length(-1.0, 100.0).is_err());
        assert!(validate_run_length(30.0, 0.0).is_err());
        assert!(validate_run_length(30.0, f64::INFINITY).is_err());
    }
}
