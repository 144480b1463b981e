//! This module provides the `Neuron` structure which composes the `Network` structure.
use serde::{Deserialize, Serialize};

use super::NeuronId;
use crate::rules::{RuleState, UpdateRule};

/// Sign of the influence a neuron exerts on its targets, used by
/// distance-biased connection strategies.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Polarity {
    Excitatory,
    Inhibitory,
}

impl Polarity {
    /// +1 for excitatory, -1 for inhibitory.
    pub fn sign(&self) -> f64 {
        match self {
            Polarity::Excitatory => 1.0,
            Polarity::Inhibitory => -1.0,
        }
    }
}

/// A scalar-state graph vertex with a pluggable update rule.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Neuron {
    pub id: NeuronId,
    /// Current activation value.
    pub activation: f64,
    /// Input accumulator, refreshed from incoming synapses each tick.
    pub input: f64,
    /// A clamped neuron holds its activation; its rule is not applied.
    pub clamped: bool,
    pub polarity: Polarity,
    /// 2-D layout coordinates.
    pub location: (f64, f64),
    pub rule: UpdateRule,
    /// Per-node mutable state owned by the rule (e.g. an adaptation term).
    pub state: RuleState,
}

impl Neuron {
    /// Create a neuron with the given rule, zero activation and default layout.
    pub fn new(id: NeuronId, rule: UpdateRule) -> Self {
        let state = rule.initial_state();
        Neuron {
            id,
            activation: 0.0,
            input: 0.0,
            clamped: false,
            polarity: Polarity::Excitatory,
            location: (0.0, 0.0),
            rule,
            state,
        }
    }

    /// Euclidean distance between the layout positions of two neurons.
    pub fn distance_to(&self, other: &Neuron) -> f64 {
        let dx = self.location.0 - other.location.0;
        let dy = self.location.1 - other.location.1;
        (dx * dx + dy * dy).sqrt()
    }
}
