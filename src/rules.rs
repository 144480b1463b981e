//! Update rules: pure numeric strategies mapping a node's aggregated input
//! (and internal state) to a new activation value.
//!
//! Rules are modeled as a tagged variant ([`UpdateRule`]) rather than a trait
//! hierarchy. Each variant is a small parameter struct with a pure update
//! function; capabilities (bounds, noise, differentiability) are queried
//! through methods on the enum. Every rule supports both a scalar path
//! ([`UpdateRule::apply`]) and a batched path ([`UpdateRule::apply_batch`])
//! producing bit-identical results elementwise.
pub mod linear;
pub mod naka_rushton;
pub mod noise;
pub mod product;

use nalgebra::DVector;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub use linear::LinearRule;
pub use naka_rushton::NakaRushtonRule;
pub use noise::NoiseSource;
pub use product::ProductRule;

/// Integration semantics of a rule.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum TimeType {
    Discrete,
    Continuous,
}

/// How a rule's output (and derivative) is clipped.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Clipping {
    /// No clipping: the value passes through unchanged.
    NoClipping,
    /// Clip into [lower, upper].
    PiecewiseLinear,
    /// Clip the floor at zero; the provided bounds are ignored.
    Relu,
}

impl Clipping {
    /// Clip a value according to the mode.
    pub fn clip(&self, val: f64, lower: f64, upper: f64) -> f64 {
        match self {
            Clipping::NoClipping => val,
            Clipping::PiecewiseLinear => val.clamp(lower, upper),
            Clipping::Relu => val.max(0.0),
        }
    }
}

/// Per-node mutable state owned by a rule instance (scalar path).
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum RuleState {
    Empty,
    /// Spike-rate adaptation term of the Naka-Rushton rule.
    NakaRushton { a: f64 },
}

impl Default for RuleState {
    fn default() -> Self {
        RuleState::Empty
    }
}

/// Per-layer mutable rule state (batched path).
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum LayerRuleState {
    Empty,
    NakaRushton { a: DVector<f64> },
}

impl LayerRuleState {
    fn scalar_at(&self, i: usize) -> RuleState {
        match self {
            LayerRuleState::Empty => RuleState::Empty,
            LayerRuleState::NakaRushton { a } => RuleState::NakaRushton { a: a[i] },
        }
    }

    fn store(&mut self, i: usize, state: RuleState) {
        if let (LayerRuleState::NakaRushton { a }, RuleState::NakaRushton { a: ai }) =
            (self, state)
        {
            a[i] = ai;
        }
    }
}

/// A node update rule with pluggable per-variant parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum UpdateRule {
    Linear(LinearRule),
    NakaRushton(NakaRushtonRule),
    Product(ProductRule),
}

impl Default for UpdateRule {
    fn default() -> Self {
        UpdateRule::Linear(LinearRule::default())
    }
}

impl UpdateRule {
    /// The display name of the rule.
    pub fn name(&self) -> &'static str {
        match self {
            UpdateRule::Linear(_) => "Linear",
            UpdateRule::NakaRushton(_) => "Naka-Rushton",
            UpdateRule::Product(_) => "Product",
        }
    }

    /// The integration semantics of the rule.
    pub fn time_type(&self) -> TimeType {
        match self {
            UpdateRule::Linear(_) => TimeType::Discrete,
            UpdateRule::NakaRushton(_) => TimeType::Continuous,
            UpdateRule::Product(_) => TimeType::Discrete,
        }
    }

    /// The initial per-node state for this rule.
    pub fn initial_state(&self) -> RuleState {
        match self {
            UpdateRule::NakaRushton(_) => RuleState::NakaRushton { a: 0.0 },
            _ => RuleState::Empty,
        }
    }

    /// The initial per-layer state for a layer of the given size.
    pub fn initial_layer_state(&self, size: usize) -> LayerRuleState {
        match self {
            UpdateRule::NakaRushton(_) => LayerRuleState::NakaRushton {
                a: DVector::zeros(size),
            },
            _ => LayerRuleState::Empty,
        }
    }

    /// Aggregate the weighted input terms of a node into its scalar input.
    /// Terms are `(weight, source activation)` pairs in a deterministic order.
    /// Most rules sum; the product rule multiplies.
    pub fn aggregate<I>(&self, terms: I) -> f64
    where
        I: Iterator<Item = (f64, f64)>,
    {
        match self {
            UpdateRule::Product(rule) => rule.aggregate(terms),
            _ => terms.map(|(weight, activation)| weight * activation).sum(),
        }
    }

    /// Apply the rule to a single node, producing its new activation.
    ///
    /// `input` is the aggregated input as of the start of the tick, `activation`
    /// the start-of-tick activation, `dt` the network time step.
    pub fn apply<R: Rng>(
        &self,
        input: f64,
        activation: f64,
        state: &mut RuleState,
        dt: f64,
        rng: &mut R,
    ) -> f64 {
        match self {
            UpdateRule::Linear(rule) => rule.apply(input, rng),
            UpdateRule::NakaRushton(rule) => rule.apply(input, activation, state, dt, rng),
            UpdateRule::Product(rule) => rule.apply(input, rng),
        }
    }

    /// Apply the rule to an entire layer in one pass.
    ///
    /// The batched path exists purely for performance: it is defined as the
    /// scalar path applied elementwise in index order and must not be
    /// observably different.
    pub fn apply_batch<R: Rng>(
        &self,
        inputs: &DVector<f64>,
        outputs: &mut DVector<f64>,
        state: &mut LayerRuleState,
        dt: f64,
        rng: &mut R,
    ) {
        for i in 0..inputs.len() {
            let mut scalar_state = state.scalar_at(i);
            outputs[i] = self.apply(inputs[i], outputs[i], &mut scalar_state, dt, rng);
            state.store(i, scalar_state);
        }
    }

    /// The derivative of the rule at the given value, if the rule is differentiable.
    pub fn derivative(&self, val: f64) -> Option<f64> {
        match self {
            UpdateRule::Linear(rule) => Some(rule.derivative(val)),
            _ => None,
        }
    }

    /// The (lower, upper) bounds of the rule, if it is bounded.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match self {
            UpdateRule::Linear(rule) => Some((rule.lower_bound, rule.upper_bound)),
            UpdateRule::NakaRushton(rule) => Some((rule.lower_bound, rule.upper_bound)),
            UpdateRule::Product(rule) => Some((rule.lower_bound, rule.upper_bound)),
        }
    }

    /// Whether the rule injects noise into its pre-clip value.
    pub fn is_noisy(&self) -> bool {
        match self {
            UpdateRule::Linear(rule) => rule.add_noise,
            UpdateRule::NakaRushton(rule) => rule.add_noise,
            UpdateRule::Product(rule) => rule.add_noise,
        }
    }

    /// An independent copy of the rule with identical parameters.
    pub fn deep_copy(&self) -> UpdateRule {
        self.clone()
    }
}
