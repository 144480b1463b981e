//! The owning container of all graph elements reachable from one root.
use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::group::{GroupUpdate, NeuronGroup, Subnetwork};
use super::neuron::Neuron;
use super::synapse::Synapse;
use super::{GroupId, IdManager, ModelRef, NetworkEvent, NeuronId, SubnetId, SynapseId};
use crate::error::NetError;
use crate::rules::UpdateRule;
use crate::DEFAULT_TIME_STEP;

/// A mutable graph of neurons and synapses composed into groups and
/// subnetworks, updated once per discrete tick.
///
/// All elements live in per-kind arenas keyed by integer ids; groups,
/// subnetworks and synapses hold ids rather than references. Iteration always
/// follows the stored reconstruction order, so the floating-point behavior of
/// a tick (e.g. order of summation) is reproducible across save and restore.
#[derive(Debug)]
pub struct Network {
    neurons: BTreeMap<NeuronId, Neuron>,
    synapses: BTreeMap<SynapseId, Synapse>,
    groups: BTreeMap<GroupId, NeuronGroup>,
    subnetworks: BTreeMap<SubnetId, Subnetwork>,
    /// The exact element order used at load time and at each tick.
    pub(super) order: Vec<ModelRef>,
    pub(super) ids: IdManager,
    pub(super) time: f64,
    pub(super) time_step: f64,
    pub(super) noise_seed: u64,
    pub(super) rng: ChaCha8Rng,
    // Behind a mutex only so the network stays Sync for the read-only
    // coupling evaluation phase; all mutation happens through &mut self.
    subscribers: Mutex<Vec<Sender<NetworkEvent>>>,
}

impl Network {
    /// Create an empty network with the default time step and noise seed.
    pub fn new() -> Self {
        Self::with_noise_seed(0)
    }

    /// Create an empty network whose noise stream is seeded deterministically.
    pub fn with_noise_seed(noise_seed: u64) -> Self {
        Network {
            neurons: BTreeMap::new(),
            synapses: BTreeMap::new(),
            groups: BTreeMap::new(),
            subnetworks: BTreeMap::new(),
            order: Vec::new(),
            ids: IdManager::default(),
            time: 0.0,
            time_step: DEFAULT_TIME_STEP,
            noise_seed,
            rng: ChaCha8Rng::seed_from_u64(noise_seed),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// The simulation time, advanced by one time step per tick.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The Euler step size used by continuous-time rules.
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn set_time_step(&mut self, time_step: f64) {
        self.time_step = time_step;
    }

    pub fn num_neurons(&self) -> usize {
        self.neurons.len()
    }

    pub fn num_synapses(&self) -> usize {
        self.synapses.len()
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn num_subnetworks(&self) -> usize {
        self.subnetworks.len()
    }

    /// Subscribe to the structural notification feed. Disconnected receivers
    /// are pruned on the next emission.
    pub fn subscribe(&mut self) -> Receiver<NetworkEvent> {
        let (tx, rx) = mpsc::channel();
        if let Ok(subscribers) = self.subscribers.get_mut() {
            subscribers.push(tx);
        }
        rx
    }

    fn emit(&mut self, event: NetworkEvent) {
        if let Ok(subscribers) = self.subscribers.get_mut() {
            subscribers.retain(|tx| tx.send(event).is_ok());
        }
    }

    // ------------------------------------------------------------------
    // Factories
    // ------------------------------------------------------------------

    /// Add a neuron with the given update rule, returning its id.
    pub fn add_neuron(&mut self, rule: UpdateRule) -> NeuronId {
        let id = self.ids.next_neuron_id();
        self.neurons.insert(id, Neuron::new(id, rule));
        self.order.push(ModelRef::Neuron(id));
        self.emit(NetworkEvent::Added(ModelRef::Neuron(id)));
        id
    }

    /// Add a synapse between two existing neurons.
    /// Fails with [`NetError::DanglingReference`] if either endpoint is missing.
    pub fn add_synapse(
        &mut self,
        source: NeuronId,
        target: NeuronId,
        weight: f64,
    ) -> Result<SynapseId, NetError> {
        if !self.neurons.contains_key(&source) {
            return Err(NetError::DanglingReference(format!(
                "synapse source {} does not exist",
                source
            )));
        }
        if !self.neurons.contains_key(&target) {
            return Err(NetError::DanglingReference(format!(
                "synapse target {} does not exist",
                target
            )));
        }
        let id = self.ids.next_synapse_id();
        self.synapses.insert(id, Synapse::new(id, source, target, weight));
        self.order.push(ModelRef::Synapse(id));
        self.emit(NetworkEvent::Added(ModelRef::Synapse(id)));
        Ok(id)
    }

    /// Add a group owning the given neurons exclusively.
    /// Fails if a member is missing or already owned by another group.
    pub fn add_group(
        &mut self,
        label: impl Into<String>,
        members: Vec<NeuronId>,
        update: GroupUpdate,
    ) -> Result<GroupId, NetError> {
        for member in &members {
            if !self.neurons.contains_key(member) {
                return Err(NetError::DanglingReference(format!(
                    "group member {} does not exist",
                    member
                )));
            }
            if let Some(owner) = self.groups.values().find(|g| g.members.contains(member)) {
                return Err(NetError::InvalidParameter(format!(
                    "{} is already owned by {}",
                    member, owner.id
                )));
            }
        }
        let id = self.ids.next_group_id();
        let mut group = NeuronGroup::new(id, label, members);
        group.update = update;
        self.groups.insert(id, group);
        self.order.push(ModelRef::Group(id));
        self.emit(NetworkEvent::Added(ModelRef::Group(id)));
        Ok(id)
    }

    /// Add a subnetwork aggregating the given models into one deletable unit.
    pub fn add_subnetwork(
        &mut self,
        label: impl Into<String>,
        members: Vec<ModelRef>,
    ) -> Result<SubnetId, NetError> {
        for member in &members {
            if !self.contains(*member) {
                return Err(NetError::DanglingReference(format!(
                    "subnetwork member {} does not exist",
                    member
                )));
            }
        }
        let id = self.ids.next_subnet_id();
        self.subnetworks.insert(id, Subnetwork::new(id, label, members));
        self.order.push(ModelRef::Subnetwork(id));
        self.emit(NetworkEvent::Added(ModelRef::Subnetwork(id)));
        Ok(id)
    }

    pub(super) fn insert_raw_neuron(&mut self, neuron: Neuron) {
        self.neurons.insert(neuron.id, neuron);
    }

    pub(super) fn insert_raw_synapse(&mut self, synapse: Synapse) {
        self.synapses.insert(synapse.id, synapse);
    }

    pub(super) fn insert_raw_group(&mut self, group: NeuronGroup) {
        self.groups.insert(group.id, group);
    }

    pub(super) fn insert_raw_subnetwork(&mut self, subnetwork: Subnetwork) {
        self.subnetworks.insert(subnetwork.id, subnetwork);
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    pub fn contains(&self, model: ModelRef) -> bool {
        match model {
            ModelRef::Neuron(id) => self.neurons.contains_key(&id),
            ModelRef::Synapse(id) => self.synapses.contains_key(&id),
            ModelRef::Group(id) => self.groups.contains_key(&id),
            ModelRef::Subnetwork(id) => self.subnetworks.contains_key(&id),
        }
    }

    pub fn neuron_ref(&self, id: NeuronId) -> Option<&Neuron> {
        self.neurons.get(&id)
    }

    pub fn neuron_mut(&mut self, id: NeuronId) -> Option<&mut Neuron> {
        self.neurons.get_mut(&id)
    }

    pub fn synapse_ref(&self, id: SynapseId) -> Option<&Synapse> {
        self.synapses.get(&id)
    }

    pub fn synapse_mut(&mut self, id: SynapseId) -> Option<&mut Synapse> {
        self.synapses.get_mut(&id)
    }

    pub fn group_ref(&self, id: GroupId) -> Option<&NeuronGroup> {
        self.groups.get(&id)
    }

    pub fn subnetwork_ref(&self, id: SubnetId) -> Option<&Subnetwork> {
        self.subnetworks.get(&id)
    }

    pub fn neurons_iter(&self) -> impl Iterator<Item = &Neuron> + '_ {
        self.neurons.values()
    }

    pub fn synapses_iter(&self) -> impl Iterator<Item = &Synapse> + '_ {
        self.synapses.values()
    }

    pub fn groups_iter(&self) -> impl Iterator<Item = &NeuronGroup> + '_ {
        self.groups.values()
    }

    /// The reconstruction order: the exact element order used at load time
    /// and at each tick.
    pub fn order(&self) -> &[ModelRef] {
        &self.order
    }

    /// Find the synapse connecting two neurons, if any.
    pub fn synapse_between(&self, source: NeuronId, target: NeuronId) -> Option<&Synapse> {
        self.synapses
            .values()
            .find(|s| s.source == source && s.target == target)
    }

    /// Set a neuron's activation directly (e.g. from a coupling consumer).
    pub fn set_activation(&mut self, id: NeuronId, activation: f64) -> Result<(), NetError> {
        let neuron = self
            .neurons
            .get_mut(&id)
            .ok_or_else(|| NetError::DanglingReference(format!("{} does not exist", id)))?;
        neuron.activation = activation;
        Ok(())
    }

    /// Move a neuron in layout space, firing a location-changed notification.
    pub fn set_location(&mut self, id: NeuronId, x: f64, y: f64) -> Result<(), NetError> {
        let neuron = self
            .neurons
            .get_mut(&id)
            .ok_or_else(|| NetError::DanglingReference(format!("{} does not exist", id)))?;
        neuron.location = (x, y);
        self.emit(NetworkEvent::LocationChanged(id));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Advance the network by one tick.
    ///
    /// The pass is two-phase: (1) every neuron's input is aggregated from the
    /// activations as they stood at the start of the tick, visiting synapses
    /// in reconstruction order; (2) every unclamped neuron applies its rule.
    /// No neuron ever reads a neighbor's already-updated value within the
    /// same tick, so the result is independent of internal iteration order.
    pub fn update(&mut self) {
        // Phase 1: gather weighted input terms per target, in synapse
        // reconstruction order (this fixes the order of summation).
        let mut terms: BTreeMap<NeuronId, Vec<(f64, f64)>> = BTreeMap::new();
        for model in &self.order {
            if let ModelRef::Synapse(id) = model {
                if let Some(synapse) = self.synapses.get(id) {
                    if let Some(source) = self.neurons.get(&synapse.source) {
                        terms
                            .entry(synapse.target)
                            .or_default()
                            .push((synapse.weight, source.activation));
                    }
                }
            }
        }

        let mut inputs: Vec<(NeuronId, f64)> = Vec::with_capacity(self.neurons.len());
        for model in &self.order {
            if let ModelRef::Neuron(id) = model {
                if let Some(neuron) = self.neurons.get(id) {
                    let input = match terms.get(id) {
                        Some(list) => neuron.rule.aggregate(list.iter().copied()),
                        None => neuron.rule.aggregate(std::iter::empty()),
                    };
                    inputs.push((*id, input));
                }
            }
        }
        for (id, input) in inputs {
            if let Some(neuron) = self.neurons.get_mut(&id) {
                neuron.input = input;
            }
        }

        // Group-level update logic shapes inputs before any rule fires.
        {
            let Network { groups, neurons, order, .. } = self;
            for model in order.iter() {
                if let ModelRef::Group(id) = model {
                    if let Some(group) = groups.get(id) {
                        group.shape_inputs(neurons);
                    }
                }
            }
        }

        // Phase 2: apply rules in reconstruction order. Clamped neurons hold
        // their activation.
        let dt = self.time_step;
        {
            let Network { neurons, order, rng, .. } = self;
            for model in order.iter() {
                if let ModelRef::Neuron(id) = model {
                    if let Some(neuron) = neurons.get_mut(id) {
                        if neuron.clamped {
                            continue;
                        }
                        let new_activation = neuron.rule.apply(
                            neuron.input,
                            neuron.activation,
                            &mut neuron.state,
                            dt,
                            rng,
                        );
                        neuron.activation = new_activation;
                    }
                }
            }
        }

        self.time += self.time_step;
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    /// Delete an element, cascading to its dependents. A removal notification
    /// fires exactly once per destroyed element.
    pub fn delete(&mut self, model: ModelRef) {
        match model {
            ModelRef::Neuron(id) => self.delete_neuron(id),
            ModelRef::Synapse(id) => self.delete_synapse(id),
            ModelRef::Group(id) => self.delete_group(id),
            ModelRef::Subnetwork(id) => self.delete_subnetwork(id),
        }
    }

    fn delete_neuron(&mut self, id: NeuronId) {
        if self.neurons.remove(&id).is_none() {
            return;
        }
        self.order.retain(|m| *m != ModelRef::Neuron(id));

        // Deleting an endpoint deletes the synapse.
        let incident: Vec<SynapseId> = self
            .synapses
            .values()
            .filter(|s| s.is_incident_to(id))
            .map(|s| s.id)
            .collect();
        for synapse_id in incident {
            self.delete_synapse(synapse_id);
        }

        for group in self.groups.values_mut() {
            group.members.retain(|m| *m != id);
        }
        self.detach_from_subnetworks(ModelRef::Neuron(id));
        self.emit(NetworkEvent::Removed(ModelRef::Neuron(id)));
    }

    fn delete_synapse(&mut self, id: SynapseId) {
        if self.synapses.remove(&id).is_none() {
            return;
        }
        self.order.retain(|m| *m != ModelRef::Synapse(id));
        self.detach_from_subnetworks(ModelRef::Synapse(id));
        self.emit(NetworkEvent::Removed(ModelRef::Synapse(id)));
    }

    fn delete_group(&mut self, id: GroupId) {
        let Some(group) = self.groups.remove(&id) else {
            return;
        };
        self.order.retain(|m| *m != ModelRef::Group(id));
        // The group owns its members exclusively.
        for member in group.members {
            self.delete_neuron(member);
        }
        self.detach_from_subnetworks(ModelRef::Group(id));
        self.emit(NetworkEvent::Removed(ModelRef::Group(id)));
    }

    fn delete_subnetwork(&mut self, id: SubnetId) {
        let Some(subnetwork) = self.subnetworks.remove(&id) else {
            return;
        };
        self.order.retain(|m| *m != ModelRef::Subnetwork(id));
        for member in subnetwork.members {
            self.delete(member);
        }
        // Subnetworks nest: the deleted one must leave its parents too.
        self.detach_from_subnetworks(ModelRef::Subnetwork(id));
        self.emit(NetworkEvent::Removed(ModelRef::Subnetwork(id)));
    }

    /// Remove a deleted member from all subnetworks; a subnetwork whose
    /// member count reaches zero self-deletes.
    fn detach_from_subnetworks(&mut self, member: ModelRef) {
        let mut emptied: Vec<SubnetId> = Vec::new();
        for (id, subnetwork) in self.subnetworks.iter_mut() {
            let before = subnetwork.members.len();
            subnetwork.members.retain(|m| *m != member);
            if before > 0 && subnetwork.members.is_empty() {
                emptied.push(*id);
            }
        }
        for id in emptied {
            self.delete_subnetwork(id);
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}
