//! Pluggable noise sources for update rules.
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

/// A probability distribution used to inject noise into a rule's pre-clip value.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum NoiseSource {
    /// Uniform distribution on [low, high).
    UniformReal { low: f64, high: f64 },
    /// Normal distribution with the given mean and standard deviation.
    Normal { mean: f64, std_dev: f64 },
}

impl Default for NoiseSource {
    fn default() -> Self {
        NoiseSource::UniformReal { low: 0.0, high: 1.0 }
    }
}

impl NoiseSource {
    /// Draw one sample from the distribution.
    /// Degenerate parameters (inverted ranges, non-positive deviations) collapse
    /// to a point mass rather than failing, in line with the numeric-tolerant design.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        match *self {
            NoiseSource::UniformReal { low, high } => {
                if high > low {
                    Uniform::new(low, high).sample(rng)
                } else {
                    low
                }
            }
            NoiseSource::Normal { mean, std_dev } => {
                // Normal::new accepts negative deviations (mirrored
                // distribution), so the point-mass collapse needs an
                // explicit guard.
                if std_dev > 0.0 {
                    match Normal::new(mean, std_dev) {
                        Ok(normal) => normal.sample(rng),
                        Err(_) => mean,
                    }
                } else {
                    mean
                }
            }
        }
    }
}
