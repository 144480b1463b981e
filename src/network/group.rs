//! Neuron groups and subnetworks: nested, deletable aggregates of graph
//! elements with optional custom update logic.
use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{GroupId, ModelRef, Neuron, NeuronId, SubnetId};

/// Group-level update logic, applied between input gathering and rule
/// application so that the snapshot-then-apply discipline is preserved.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum GroupUpdate {
    /// Members update individually through their own rules.
    Default,
    /// k-winner-take-all after O'Reilly & Munakata, "Computational
    /// Explorations in Cognitive Neuroscience", p. 110. Members are re-sorted
    /// by excitatory drive every tick; an inhibitory threshold conductance
    /// between the kth and (k+1)th most excited units (eq. 3.3, p. 101) is
    /// subtracted from every member's input.
    KWinnerTakeAll { k: usize, q: f64 },
}

impl GroupUpdate {
    /// Build a k-winner-take-all update. Out-of-range arguments are clamped
    /// to the nearest valid value rather than rejected.
    pub fn k_winner_take_all(k: i64, q: f64) -> GroupUpdate {
        GroupUpdate::KWinnerTakeAll {
            k: k.max(1) as usize,
            q: q.clamp(0.0, 1.0),
        }
    }
}

/// An ordered, named collection of neurons sharing group-level update logic.
/// The group owns its neurons exclusively: an owned neuron is destroyed when
/// the group is destroyed and is never shared into a second group.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct NeuronGroup {
    pub id: GroupId,
    pub label: String,
    pub members: Vec<NeuronId>,
    pub update: GroupUpdate,
}

impl NeuronGroup {
    pub fn new(id: GroupId, label: impl Into<String>, members: Vec<NeuronId>) -> Self {
        NeuronGroup {
            id,
            label: label.into(),
            members,
            update: GroupUpdate::Default,
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Apply the group's custom update to its members' freshly-gathered
    /// inputs. Reads and writes inputs only, never activations, so no member
    /// observes a neighbor's already-updated value within the tick.
    pub fn shape_inputs(&self, neurons: &mut BTreeMap<NeuronId, Neuron>) {
        let GroupUpdate::KWinnerTakeAll { k, q } = self.update else {
            return;
        };

        let mut drives: Vec<(NeuronId, f64)> = self
            .members
            .iter()
            .filter_map(|id| neurons.get(id).map(|n| (*id, n.input)))
            .collect();
        if drives.len() < 2 {
            return;
        }

        // Full re-sort by excitatory drive, descending, every tick.
        drives.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let k = k.clamp(1, drives.len() - 1);
        let g_above = drives[k - 1].1;
        let g_below = drives[k].1;
        let threshold = g_below + q * (g_above - g_below);

        for (id, _) in &drives {
            if let Some(neuron) = neurons.get_mut(id) {
                neuron.input -= threshold;
            }
        }
    }
}

/// A composite of network models that behaves as one movable, deletable unit.
/// A subnetwork self-deletes when its member count reaches zero and cascades
/// deletion to its members when deleted itself.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Subnetwork {
    pub id: SubnetId,
    pub label: String,
    pub members: Vec<ModelRef>,
}

impl Subnetwork {
    pub fn new(id: SubnetId, label: impl Into<String>, members: Vec<ModelRef>) -> Self {
        Subnetwork {
            id,
            label: label.into(),
            members,
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }
}
