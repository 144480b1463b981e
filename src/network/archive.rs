//! The persistence walk of a network: enough structure to reconstruct an
//! isomorphic graph, in the exact element order used at each tick.
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::group::{NeuronGroup, Subnetwork};
use super::network::Network;
use super::neuron::Neuron;
use super::synapse::Synapse;
use super::{IdManager, ModelRef};
use crate::error::NetError;

/// A full structural snapshot of a [`Network`]: ordered elements, ids,
/// synapse endpoint ids and group membership.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct NetworkArchive {
    pub neurons: Vec<Neuron>,
    pub synapses: Vec<Synapse>,
    pub groups: Vec<NeuronGroup>,
    pub subnetworks: Vec<Subnetwork>,
    pub order: Vec<ModelRef>,
    pub ids: IdManager,
    pub time: f64,
    pub time_step: f64,
    pub noise_seed: u64,
}

impl NetworkArchive {
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), NetError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<NetworkArchive, NetError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl Network {
    /// Walk the network into an archive, visiting elements in reconstruction
    /// order.
    pub fn archive(&self) -> NetworkArchive {
        let mut neurons = Vec::new();
        let mut synapses = Vec::new();
        let mut groups = Vec::new();
        let mut subnetworks = Vec::new();
        for model in self.order() {
            match model {
                ModelRef::Neuron(id) => {
                    if let Some(neuron) = self.neuron_ref(*id) {
                        neurons.push(neuron.clone());
                    }
                }
                ModelRef::Synapse(id) => {
                    if let Some(synapse) = self.synapse_ref(*id) {
                        synapses.push(synapse.clone());
                    }
                }
                ModelRef::Group(id) => {
                    if let Some(group) = self.group_ref(*id) {
                        groups.push(group.clone());
                    }
                }
                ModelRef::Subnetwork(id) => {
                    if let Some(subnetwork) = self.subnetwork_ref(*id) {
                        subnetworks.push(subnetwork.clone());
                    }
                }
            }
        }
        NetworkArchive {
            neurons,
            synapses,
            groups,
            subnetworks,
            order: self.order().to_vec(),
            ids: self.ids.clone(),
            time: self.time,
            time_step: self.time_step,
            noise_seed: self.noise_seed,
        }
    }

    /// Reconstruct a network from an archive.
    ///
    /// A synapse or membership entry referring to a missing element is
    /// dropped with a reported diagnostic; reconstruction of the rest
    /// continues.
    pub fn from_archive(archive: NetworkArchive) -> Network {
        let mut net = Network::with_noise_seed(archive.noise_seed);
        net.ids = archive.ids;
        net.time = archive.time;
        net.time_step = archive.time_step;

        for neuron in archive.neurons {
            net.insert_raw_neuron(neuron);
        }

        for synapse in archive.synapses {
            if net.neuron_ref(synapse.source).is_none() || net.neuron_ref(synapse.target).is_none()
            {
                log::warn!(
                    "Dropping {}: endpoint {} -> {} missing after reconstruction",
                    synapse.id,
                    synapse.source,
                    synapse.target
                );
                continue;
            }
            net.insert_raw_synapse(synapse);
        }

        for mut group in archive.groups {
            group.members.retain(|member| {
                let present = net.neuron_ref(*member).is_some();
                if !present {
                    log::warn!("Dropping member {} of {}: missing after reconstruction", member, group.id);
                }
                present
            });
            net.insert_raw_group(group);
        }

        for mut subnetwork in archive.subnetworks {
            subnetwork.members.retain(|member| {
                let present = net.contains(*member);
                if !present {
                    log::warn!(
                        "Dropping member {} of {}: missing after reconstruction",
                        member,
                        subnetwork.id
                    );
                }
                present
            });
            net.insert_raw_subnetwork(subnetwork);
        }

        net.order = archive
            .order
            .into_iter()
            .filter(|model| net.contains(*model))
            .collect();
        net
    }
}
