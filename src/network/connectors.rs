//! Connection strategies: algorithms generating synapse sets between two
//! neuron collections.
use itertools::Itertools;
use rand::seq::index;
use rand::Rng;

use super::network::Network;
use super::neuron::Polarity;
use super::{NeuronId, SynapseId};
use crate::error::NetError;

/// A stateless synapse-generation algorithm over two ordered neuron lists.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ConnectionStrategy {
    /// Connect every source to every target.
    AllToAll { self_connect: bool },
    /// Select `round(density * |sources| * |targets|)` edges uniformly at
    /// random without replacement.
    Sparse { density: f64, self_connect: bool },
    /// Distance-biased connectivity: each pair connects with probability
    /// `c * exp(-d^2 / (2 * sigma^2))`, where `d` is the Euclidean layout
    /// distance and `c` one of four constants keyed by the source/target
    /// polarity pair.
    RadialGaussian {
        sigma: f64,
        ee: f64,
        ei: f64,
        ie: f64,
        ii: f64,
    },
}

impl ConnectionStrategy {
    /// A radial Gaussian strategy with the stock polarity constants.
    pub fn radial_gaussian(sigma: f64) -> ConnectionStrategy {
        ConnectionStrategy::RadialGaussian {
            sigma,
            ee: 0.3,
            ei: 0.2,
            ie: 0.4,
            ii: 0.1,
        }
    }

    /// Generate synapses between the two neuron lists, returning the new
    /// synapse ids in creation order. New synapses carry the source's
    /// polarity as their weight sign.
    pub fn connect<R: Rng>(
        &self,
        network: &mut Network,
        sources: &[NeuronId],
        targets: &[NeuronId],
        rng: &mut R,
    ) -> Result<Vec<SynapseId>, NetError> {
        match *self {
            ConnectionStrategy::AllToAll { self_connect } => {
                let pairs = candidate_pairs(sources, targets, self_connect);
                pairs
                    .into_iter()
                    .map(|(source, target)| add_polar_synapse(network, source, target))
                    .collect()
            }
            ConnectionStrategy::Sparse {
                density,
                self_connect,
            } => {
                let pairs = candidate_pairs(sources, targets, self_connect);
                let requested = (density.clamp(0.0, 1.0)
                    * (sources.len() * targets.len()) as f64)
                    .round() as usize;
                let amount = requested.min(pairs.len());
                index::sample(rng, pairs.len(), amount)
                    .into_iter()
                    .map(|i| {
                        let (source, target) = pairs[i];
                        add_polar_synapse(network, source, target)
                    })
                    .collect()
            }
            ConnectionStrategy::RadialGaussian { sigma, ee, ei, ie, ii } => {
                let mut synapses = Vec::new();
                for (source, target) in candidate_pairs(sources, targets, false) {
                    let (source_polarity, target_polarity, distance) = {
                        let src = network.neuron_ref(source).ok_or_else(|| {
                            NetError::DanglingReference(format!("{} does not exist", source))
                        })?;
                        let tgt = network.neuron_ref(target).ok_or_else(|| {
                            NetError::DanglingReference(format!("{} does not exist", target))
                        })?;
                        (src.polarity, tgt.polarity, src.distance_to(tgt))
                    };
                    let c = match (source_polarity, target_polarity) {
                        (Polarity::Excitatory, Polarity::Excitatory) => ee,
                        (Polarity::Excitatory, Polarity::Inhibitory) => ei,
                        (Polarity::Inhibitory, Polarity::Excitatory) => ie,
                        (Polarity::Inhibitory, Polarity::Inhibitory) => ii,
                    };
                    let p = c * (-distance * distance / (2.0 * sigma * sigma)).exp();
                    if rng.gen::<f64>() < p {
                        synapses.push(add_polar_synapse(network, source, target)?);
                    }
                }
                Ok(synapses)
            }
        }
    }
}

/// All source/target pairs, excluding self-loops unless allowed.
fn candidate_pairs(
    sources: &[NeuronId],
    targets: &[NeuronId],
    self_connect: bool,
) -> Vec<(NeuronId, NeuronId)> {
    sources
        .iter()
        .cartesian_product(targets.iter())
        .filter(|(s, t)| self_connect || s != t)
        .map(|(s, t)| (*s, *t))
        .collect()
}

fn add_polar_synapse(
    network: &mut Network,
    source: NeuronId,
    target: NeuronId,
) -> Result<SynapseId, NetError> {
    let weight = network
        .neuron_ref(source)
        .map(|n| n.polarity.sign())
        .unwrap_or(1.0);
    network.add_synapse(source, target, weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::UpdateRule;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn net_with_neurons(n: usize) -> (Network, Vec<NeuronId>) {
        let mut net = Network::new();
        let ids = (0..n).map(|_| net.add_neuron(UpdateRule::default())).collect();
        (net, ids)
    }

    #[test]
    fn test_all_to_all() {
        let (mut net, ids) = net_with_neurons(3);
        let mut rng = StdRng::seed_from_u64(42);
        let strategy = ConnectionStrategy::AllToAll { self_connect: false };
        let synapses = strategy.connect(&mut net, &ids, &ids, &mut rng).unwrap();
        assert_eq!(synapses.len(), 6);

        let strategy = ConnectionStrategy::AllToAll { self_connect: true };
        let (mut net, ids) = net_with_neurons(3);
        let synapses = strategy.connect(&mut net, &ids, &ids, &mut rng).unwrap();
        assert_eq!(synapses.len(), 9);
    }

    #[test]
    fn test_sparse_edge_count() {
        let (mut net, ids) = net_with_neurons(10);
        let mut rng = StdRng::seed_from_u64(42);
        let strategy = ConnectionStrategy::Sparse {
            density: 0.25,
            self_connect: true,
        };
        let synapses = strategy.connect(&mut net, &ids, &ids, &mut rng).unwrap();
        assert_eq!(synapses.len(), 25);

        // No duplicate pairs: sampling is without replacement.
        let mut pairs: Vec<(NeuronId, NeuronId)> = synapses
            .iter()
            .map(|id| {
                let s = net.synapse_ref(*id).unwrap();
                (s.source, s.target)
            })
            .collect();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), 25);
    }

    #[test]
    fn test_sparse_density_is_clamped() {
        let (mut net, ids) = net_with_neurons(3);
        let mut rng = StdRng::seed_from_u64(42);
        let strategy = ConnectionStrategy::Sparse {
            density: 7.5,
            self_connect: true,
        };
        let synapses = strategy.connect(&mut net, &ids, &ids, &mut rng).unwrap();
        assert_eq!(synapses.len(), 9);
    }

    #[test]
    fn test_radial_gaussian_prefers_near_neighbors() {
        let (mut net, ids) = net_with_neurons(3);
        net.set_location(ids[0], 0.0, 0.0).unwrap();
        net.set_location(ids[1], 1.0, 0.0).unwrap();
        net.set_location(ids[2], 1000.0, 0.0).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let strategy = ConnectionStrategy::RadialGaussian {
            sigma: 2.5,
            ee: 1.0,
            ei: 1.0,
            ie: 1.0,
            ii: 1.0,
        };
        let synapses = strategy
            .connect(&mut net, &[ids[0]], &[ids[1], ids[2]], &mut rng)
            .unwrap();
        // The far neuron's connection probability is effectively zero.
        for id in &synapses {
            assert_eq!(net.synapse_ref(*id).unwrap().target, ids[1]);
        }
    }

    #[test]
    fn test_inhibitory_source_yields_negative_weight() {
        let (mut net, ids) = net_with_neurons(2);
        net.neuron_mut(ids[0]).unwrap().polarity = Polarity::Inhibitory;
        let mut rng = StdRng::seed_from_u64(42);
        let strategy = ConnectionStrategy::AllToAll { self_connect: false };
        let synapses = strategy
            .connect(&mut net, &[ids[0]], &[ids[1]], &mut rng)
            .unwrap();
        assert_eq!(net.synapse_ref(synapses[0]).unwrap().weight, -1.0);
    }
}
