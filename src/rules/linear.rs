//! The standard linear update rule.
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::noise::NoiseSource;
use super::Clipping;

/// The default upper bound.
pub const DEFAULT_UPPER_BOUND: f64 = 10.0;
/// The default lower bound.
pub const DEFAULT_LOWER_BOUND: f64 = -10.0;

/// A linear rule: `output = input * slope + bias [+ noise]`, clipped per mode.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct LinearRule {
    /// Slope of the linear map.
    pub slope: f64,
    /// Bias added to the scaled input.
    pub bias: f64,
    /// Clipping mode applied to the forward value and the derivative.
    pub clipping: Clipping,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Whether to add one noise sample to the pre-clip value each tick.
    pub add_noise: bool,
    pub noise: NoiseSource,
}

impl Default for LinearRule {
    fn default() -> Self {
        LinearRule {
            slope: 1.0,
            bias: 0.0,
            clipping: Clipping::PiecewiseLinear,
            lower_bound: DEFAULT_LOWER_BOUND,
            upper_bound: DEFAULT_UPPER_BOUND,
            add_noise: false,
            noise: NoiseSource::default(),
        }
    }
}

impl LinearRule {
    /// Apply the rule to an aggregated input, producing the new activation.
    pub fn apply<R: Rng>(&self, input: f64, rng: &mut R) -> f64 {
        let mut val = input * self.slope + self.bias;
        if self.add_noise {
            val += self.noise.sample(rng);
        }
        self.clipping.clip(val, self.lower_bound, self.upper_bound)
    }

    /// The noise-free forward value, as used when fitting weights.
    pub fn forward(&self, input: f64) -> f64 {
        self.clipping
            .clip(input * self.slope + self.bias, self.lower_bound, self.upper_bound)
    }

    /// The derivative of the rule at the given value.
    /// The clipping mode zeroes the derivative in the clipped region.
    pub fn derivative(&self, val: f64) -> f64 {
        match self.clipping {
            Clipping::NoClipping => self.slope,
            Clipping::Relu => {
                if val <= 0.0 {
                    0.0
                } else {
                    self.slope
                }
            }
            Clipping::PiecewiseLinear => {
                if val <= self.lower_bound || val >= self.upper_bound {
                    0.0
                } else {
                    self.slope
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_linear_rule_no_clipping() {
        let mut rng = StdRng::seed_from_u64(42);
        let rule = LinearRule {
            slope: 2.0,
            bias: 0.5,
            clipping: Clipping::NoClipping,
            ..LinearRule::default()
        };
        assert_eq!(rule.apply(3.0, &mut rng), 6.5);
        assert_eq!(rule.apply(-100.0, &mut rng), -199.5);
    }

    #[test]
    fn test_linear_rule_relu() {
        let mut rng = StdRng::seed_from_u64(42);
        let rule = LinearRule {
            clipping: Clipping::Relu,
            ..LinearRule::default()
        };
        assert_eq!(rule.apply(-3.0, &mut rng), 0.0);
        // Relu ignores the provided bounds.
        assert_eq!(rule.apply(100.0, &mut rng), 100.0);
    }

    #[test]
    fn test_linear_rule_piecewise() {
        let mut rng = StdRng::seed_from_u64(42);
        let rule = LinearRule::default();
        assert_eq!(rule.apply(3.0, &mut rng), 3.0);
        assert_eq!(rule.apply(100.0, &mut rng), 10.0);
        assert_eq!(rule.apply(-100.0, &mut rng), -10.0);
    }

    #[test]
    fn test_linear_rule_noise_shifts_value() {
        let mut rng = StdRng::seed_from_u64(42);
        let rule = LinearRule {
            clipping: Clipping::NoClipping,
            add_noise: true,
            noise: NoiseSource::UniformReal { low: 1.0, high: 2.0 },
            ..LinearRule::default()
        };
        let val = rule.apply(0.0, &mut rng);
        assert!(val >= 1.0 && val < 2.0);
    }

    #[test]
    fn test_derivative() {
        let rule = LinearRule {
            slope: 3.0,
            ..LinearRule::default()
        };
        assert_eq!(rule.derivative(0.0), 3.0);
        assert_eq!(rule.derivative(10.0), 0.0);
        assert_eq!(rule.derivative(-10.0), 0.0);

        let rule = LinearRule {
            slope: 3.0,
            clipping: Clipping::Relu,
            ..LinearRule::default()
        };
        assert_eq!(rule.derivative(-1.0), 0.0);
        assert_eq!(rule.derivative(1.0), 3.0);

        let rule = LinearRule {
            slope: 3.0,
            clipping: Clipping::NoClipping,
            ..LinearRule::default()
        };
        assert_eq!(rule.derivative(1e6), 3.0);
    }
}
