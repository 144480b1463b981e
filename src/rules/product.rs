//! The product rule: output is the product of the node's inputs rather than
//! their sum.
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::noise::NoiseSource;
use super::Clipping;

/// A rule whose output is the product of the (optionally weighted) source
/// activations, clipped into [lower, upper].
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ProductRule {
    /// Whether incoming weights multiply into the product. When false, only
    /// the raw source activations are multiplied.
    pub use_weights: bool,
    pub clipped: bool,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub add_noise: bool,
    pub noise: NoiseSource,
}

impl Default for ProductRule {
    fn default() -> Self {
        ProductRule {
            use_weights: false,
            clipped: true,
            lower_bound: -1.0,
            upper_bound: 1.0,
            add_noise: false,
            noise: NoiseSource::default(),
        }
    }
}

impl ProductRule {
    /// Multiply the input terms together. An empty fan-in yields 1.0.
    pub fn aggregate<I>(&self, terms: I) -> f64
    where
        I: Iterator<Item = (f64, f64)>,
    {
        if self.use_weights {
            terms.fold(1.0, |acc, (weight, activation)| acc * weight * activation)
        } else {
            terms.fold(1.0, |acc, (_, activation)| acc * activation)
        }
    }

    /// Apply the rule to the aggregated product, producing the new activation.
    pub fn apply<R: Rng>(&self, input: f64, rng: &mut R) -> f64 {
        let mut val = input;
        if self.add_noise {
            val += self.noise.sample(rng);
        }
        if self.clipped {
            Clipping::PiecewiseLinear.clip(val, self.lower_bound, self.upper_bound)
        } else {
            val
        }
    }
}
