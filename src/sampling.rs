//! Random stream provider.
//!
//! Every source of randomness in a replication owns its own [`Sampler`]: one distribution with fixed parameters and
//! one [`Pcg64`] stream derived from the replication seed and a stream index. Drawing more from one source never
//! shifts the numbers another source sees, so changing e.g. the patience parameters leaves the arrival sequence of a
//! seed untouched.

use rand::distr::{Bernoulli, Uniform};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, LogNormal, Weibull};
use rand_pcg::Pcg64;

/// A distribution could not be built from the parameters it was given.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {family} parameters: {reason}")]
pub struct SamplingError {
    family: &'static str,
    reason: String,
}

impl SamplingError {
    fn new(family: &'static str, reason: impl ToString) -> Self {
        Self {
            family,
            reason: reason.to_string(),
        }
    }
}

/// Derive the generator for stream `stream_index` of the seed tree rooted at `seed`.
///
/// All streams of one seed start from the same state but advance along different PCG increments, which is the
/// generator's own mechanism for independent streams. The result depends only on `(seed, stream_index)`, never on
/// which other streams were created first.
pub fn new_stream(seed: u64, stream_index: u64) -> Pcg64 {
    let mut root = Pcg64::seed_from_u64(seed);
    Pcg64::new(root.random(), u128::from(stream_index))
}

/// One distribution paired with the stream it draws from.
#[derive(Debug, Clone)]
pub struct Sampler<D> {
    distribution: D,
    rng: Pcg64,
}

impl<D> Sampler<D> {
    pub fn new(distribution: D, rng: Pcg64) -> Self {
        Self { distribution, rng }
    }

    /// Shorthand for `Sampler::new(distribution, new_stream(seed, stream_index))`.
    pub fn from_seed(distribution: D, seed: u64, stream_index: u64) -> Self {
        Self::new(distribution, new_stream(seed, stream_index))
    }

    pub fn sample<T>(&mut self) -> T
    where
        D: Distribution<T>,
    {
        self.distribution.sample(&mut self.rng)
    }

    pub fn sample_n<T>(&mut self, n: usize) -> Vec<T>
    where
        D: Distribution<T>,
    {
        (&self.distribution).sample_iter(&mut self.rng).take(n).collect()
    }

    pub fn distribution(&self) -> &D {
        &self.distribution
    }
}

/// Exponential distribution with the given rate (mean `1 / rate`).
pub fn exponential(rate: f64) -> Result<Exp<f64>, SamplingError> {
    Exp::new(rate).map_err(|e| SamplingError::new("exponential", e))
}

/// Bernoulli distribution yielding `true` with probability `p`.
pub fn bernoulli(p: f64) -> Result<Bernoulli, SamplingError> {
    Bernoulli::new(p).map_err(|e| SamplingError::new("bernoulli", e))
}

/// Uniform integers in the half-open range `[low, high)`.
pub fn uniform_integer(low: u32, high: u32) -> Result<Uniform<u32>, SamplingError> {
    Uniform::new(low, high).map_err(|e| SamplingError::new("uniform", e))
}

/// Uniform reals in `[-bound, bound]`. A zero bound always yields zero.
pub fn symmetric_noise(bound: f64) -> Result<Uniform<f64>, SamplingError> {
    Uniform::new_inclusive(-bound, bound).map_err(|e| SamplingError::new("uniform", e))
}

/// Lognormal distribution described by the mean and standard deviation of the lognormal values themselves, rather
/// than of the underlying normal.
pub fn lognormal_from_moments(mean: f64, stdev: f64) -> Result<LogNormal<f64>, SamplingError> {
    if !(mean > 0.0) {
        return Err(SamplingError::new("lognormal", format!("mean must be positive, got {mean}")));
    }
    let phi = (stdev * stdev + mean * mean).sqrt();
    let mu = (mean * mean / phi).ln();
    let sigma = (phi * phi / (mean * mean)).ln().sqrt();
    LogNormal::new(mu, sigma).map_err(|e| SamplingError::new("lognormal", e))
}

/// How long a customer tolerates queueing: Weibull distributed, or unlimited when the scale is infinite.
#[derive(Debug, Clone, Copy)]
pub enum Patience {
    Weibull(Weibull<f64>),
    Unlimited,
}

impl Patience {
    pub fn new(shape: f64, scale: f64) -> Result<Self, SamplingError> {
        if scale == f64::INFINITY {
            return Ok(Self::Unlimited);
        }
        Weibull::new(scale, shape)
            .map(Self::Weibull)
            .map_err(|e| SamplingError::new("weibull", e))
    }
}

impl Distribution<f64> for Patience {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Weibull(weibull) => weibull.sample(rng),
            Self::Unlimited => f64::INFINITY,
        }
    }
}
