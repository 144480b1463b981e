//! Synaptic connections between neurons.
use serde::{Deserialize, Serialize};

use super::{NeuronId, SynapseId};

/// A weighted directed edge between two neurons.
///
/// Both endpoints must exist in the same network when the synapse is created;
/// deleting either endpoint deletes the synapse.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Synapse {
    pub id: SynapseId,
    /// The neuron whose activation feeds this edge.
    pub source: NeuronId,
    /// The neuron receiving the weighted activation.
    pub target: NeuronId,
    pub weight: f64,
}

impl Synapse {
    pub fn new(id: SynapseId, source: NeuronId, target: NeuronId, weight: f64) -> Self {
        Synapse {
            id,
            source,
            target,
            weight,
        }
    }

    /// Whether the synapse touches the given neuron as source or target.
    pub fn is_incident_to(&self, neuron: NeuronId) -> bool {
        self.source == neuron || self.target == neuron
    }
}
