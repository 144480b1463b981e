//! The Naka-Rushton firing-rate rule, after Wilson, "Spikes, Decisions, and
//! Actions", p. 20-21 and p. 81 for the adaptation term.
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::noise::NoiseSource;
use super::RuleState;

/// The default activation ceiling.
pub const DEFAULT_UPPER_BOUND: f64 = 100.0;

/// A continuous-time firing-rate rule relaxing toward the sigmoidal-like
/// steady state `S(input)`, with optional spike-rate adaptation.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct NakaRushtonRule {
    /// Steepness of S(input).
    pub steepness: f64,
    /// Input at which S reaches half of its maximum value.
    pub semi_saturation: f64,
    /// Rate at which the activation tends to the fixed point S(input).
    pub time_constant: f64,
    /// Whether spike-rate adaptation is utilized.
    pub use_adaptation: bool,
    /// Rate at which the adaptation variable tends to its rest value.
    pub adaptation_time_constant: f64,
    /// Target scale of the adaptation variable relative to the activation.
    pub adaptation_parameter: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub add_noise: bool,
    pub noise: NoiseSource,
}

impl Default for NakaRushtonRule {
    fn default() -> Self {
        NakaRushtonRule {
            steepness: 2.0,
            semi_saturation: 120.0,
            time_constant: 1.0,
            use_adaptation: false,
            adaptation_time_constant: 1.0,
            adaptation_parameter: 0.7,
            lower_bound: 0.0,
            upper_bound: DEFAULT_UPPER_BOUND,
            add_noise: false,
            noise: NoiseSource::default(),
        }
    }
}

impl NakaRushtonRule {
    /// Apply one Euler step of size `dt`, producing the new activation.
    /// The adaptation variable is carried in `state` and relaxes toward
    /// `adaptation_parameter * activation`, shifting the effective
    /// semi-saturation point.
    pub fn apply<R: Rng>(
        &self,
        input: f64,
        activation: f64,
        state: &mut RuleState,
        dt: f64,
        rng: &mut R,
    ) -> f64 {
        let mut val = activation;

        let mut a = match *state {
            RuleState::NakaRushton { a } => a,
            _ => 0.0,
        };
        if self.use_adaptation {
            a += (dt / self.adaptation_time_constant) * (self.adaptation_parameter * val - a);
        } else {
            a = 0.0;
        }

        let s = if input > 0.0 {
            (self.upper_bound * input.powf(self.steepness))
                / ((self.semi_saturation + a).powf(self.steepness) + input.powf(self.steepness))
        } else {
            0.0
        };

        if self.add_noise {
            val += dt * ((1.0 / self.time_constant) * (-val + s) + self.noise.sample(rng));
        } else {
            val += dt * ((1.0 / self.time_constant) * (-val + s));
        }

        *state = RuleState::NakaRushton { a };
        val
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_negative_input_decays_to_zero() {
        let mut rng = StdRng::seed_from_u64(42);
        let rule = NakaRushtonRule::default();
        let mut state = RuleState::NakaRushton { a: 0.0 };
        let mut val = 50.0;
        for _ in 0..1000 {
            val = rule.apply(-1.0, val, &mut state, 0.1, &mut rng);
        }
        assert!(val.abs() < 1e-6);
    }

    #[test]
    fn test_steady_state_at_semi_saturation() {
        // At input = semi-saturation, S(input) = upper_bound / 2.
        let mut rng = StdRng::seed_from_u64(42);
        let rule = NakaRushtonRule::default();
        let mut state = RuleState::NakaRushton { a: 0.0 };
        let mut val = 0.0;
        for _ in 0..2000 {
            val = rule.apply(120.0, val, &mut state, 0.1, &mut rng);
        }
        assert!((val - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_adaptation_lowers_steady_state() {
        let mut rng = StdRng::seed_from_u64(42);
        let plain = NakaRushtonRule::default();
        let adapted = NakaRushtonRule {
            use_adaptation: true,
            ..NakaRushtonRule::default()
        };

        let mut state_plain = RuleState::NakaRushton { a: 0.0 };
        let mut state_adapted = RuleState::NakaRushton { a: 0.0 };
        let mut val_plain = 0.0;
        let mut val_adapted = 0.0;
        for _ in 0..2000 {
            val_plain = plain.apply(120.0, val_plain, &mut state_plain, 0.1, &mut rng);
            val_adapted = adapted.apply(120.0, val_adapted, &mut state_adapted, 0.1, &mut rng);
        }
        assert!(val_adapted < val_plain);
    }

    #[test]
    fn test_single_step_formula() {
        let mut rng = StdRng::seed_from_u64(42);
        let rule = NakaRushtonRule::default();
        let mut state = RuleState::NakaRushton { a: 0.0 };

        let input: f64 = 60.0;
        let s = (100.0 * input.powf(2.0)) / (120.0_f64.powf(2.0) + input.powf(2.0));
        let expected = 0.0 + 0.1 * (1.0 / 1.0) * (-0.0 + s);
        let val = rule.apply(input, 0.0, &mut state, 0.1, &mut rng);
        assert!((val - expected).abs() < 1e-12);
    }
}
