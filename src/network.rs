//! Network structure and utilities: neurons, synapses, groups, subnetworks,
//! connection strategies and the persistence walk.
pub mod archive;
pub mod connectors;
pub mod group;
pub mod network;
pub mod neuron;
pub mod synapse;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use archive::NetworkArchive;
pub use connectors::ConnectionStrategy;
pub use group::{GroupUpdate, NeuronGroup, Subnetwork};
pub use network::Network;
pub use neuron::{Neuron, Polarity};
pub use synapse::Synapse;

/// Identifier of a neuron, unique within one network.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct NeuronId(pub u32);

/// Identifier of a synapse, unique within one network.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct SynapseId(pub u32);

/// Identifier of a neuron group, unique within one network.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct GroupId(pub u32);

/// Identifier of a subnetwork, unique within one network.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct SubnetId(pub u32);

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Neuron_{}", self.0)
    }
}

impl fmt::Display for SynapseId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Synapse_{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NeuronGroup_{}", self.0)
    }
}

impl fmt::Display for SubnetId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Subnetwork_{}", self.0)
    }
}

/// A reference to any element owned by a network. Groups, subnetworks and
/// synapses hold ids rather than owning references, so the graph is free of
/// reference cycles.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum ModelRef {
    Neuron(NeuronId),
    Synapse(SynapseId),
    Group(GroupId),
    Subnetwork(SubnetId),
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelRef::Neuron(id) => write!(f, "{}", id),
            ModelRef::Synapse(id) => write!(f, "{}", id),
            ModelRef::Group(id) => write!(f, "{}", id),
            ModelRef::Subnetwork(id) => write!(f, "{}", id),
        }
    }
}

/// A structural notification emitted by a network, consumed read-only by
/// presentation or bookkeeping collaborators.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum NetworkEvent {
    Added(ModelRef),
    Removed(ModelRef),
    LocationChanged(NeuronId),
}

/// Issues unique, monotonically-increasing ids per element kind.
#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct IdManager {
    next_neuron: u32,
    next_synapse: u32,
    next_group: u32,
    next_subnet: u32,
}

impl IdManager {
    pub fn next_neuron_id(&mut self) -> NeuronId {
        let id = NeuronId(self.next_neuron);
        self.next_neuron += 1;
        id
    }

    pub fn next_synapse_id(&mut self) -> SynapseId {
        let id = SynapseId(self.next_synapse);
        self.next_synapse += 1;
        id
    }

    pub fn next_group_id(&mut self) -> GroupId {
        let id = GroupId(self.next_group);
        self.next_group += 1;
        id
    }

    pub fn next_subnet_id(&mut self) -> SubnetId {
        let id = SubnetId(self.next_subnet);
        self.next_subnet += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_per_kind() {
        let mut ids = IdManager::default();
        assert_eq!(ids.next_neuron_id(), NeuronId(0));
        assert_eq!(ids.next_neuron_id(), NeuronId(1));
        assert_eq!(ids.next_synapse_id(), SynapseId(0));
        assert_eq!(ids.next_neuron_id(), NeuronId(2));
        assert_eq!(ids.next_group_id(), GroupId(0));
    }

    #[test]
    fn test_display_ids() {
        assert_eq!(NeuronId(3).to_string(), "Neuron_3");
        assert_eq!(ModelRef::Group(GroupId(1)).to_string(), "NeuronGroup_1");
    }
}
