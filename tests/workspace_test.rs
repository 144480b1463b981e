use std::sync::atomic::AtomicBool;

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::SeedableRng;

use netloom::network::archive::NetworkArchive;
use netloom::network::connectors::ConnectionStrategy;
use netloom::network::group::GroupUpdate;
use netloom::network::network::Network;
use netloom::network::NeuronId;
use netloom::rules::{Clipping, LinearRule, UpdateRule};
use netloom::workspace::{
    AttributeRef, AttributeValue, NetworkComponent, VectorComponent, Workspace,
    WorkspaceComponent,
};

fn pass_through_rule() -> UpdateRule {
    UpdateRule::Linear(LinearRule {
        clipping: Clipping::NoClipping,
        ..LinearRule::default()
    })
}

#[test]
fn test_vector_coupling_transfers_into_network() {
    let mut net = Network::new();
    let members: Vec<NeuronId> = (0..3).map(|_| net.add_neuron(pass_through_rule())).collect();
    for member in &members {
        net.neuron_mut(*member).unwrap().clamped = true;
    }
    let group = net
        .add_group("layer", members.clone(), GroupUpdate::Default)
        .unwrap();

    let mut ws = Workspace::new();
    ws.add_component(Box::new(VectorComponent::new(
        "sensor",
        DVector::from_vec(vec![0.1, 0.2, 0.3]),
    )))
    .unwrap();
    ws.add_component(Box::new(NetworkComponent::new("net", net)))
        .unwrap();
    ws.bind(
        AttributeRef::new("sensor", VectorComponent::CONTAINER, "values"),
        AttributeRef::new("net", group.to_string(), "activations"),
    )
    .unwrap();

    ws.tick();
    let component = ws.component_as::<NetworkComponent>("net").unwrap();
    let activations: Vec<f64> = members
        .iter()
        .map(|id| component.network.neuron_ref(*id).unwrap().activation)
        .collect();
    assert_eq!(activations, vec![0.1, 0.2, 0.3]);
}

#[test]
fn test_length_mismatch_is_rejected_at_bind_time() {
    let mut net = Network::new();
    let members: Vec<NeuronId> = (0..3).map(|_| net.add_neuron(pass_through_rule())).collect();
    let group = net.add_group("layer", members, GroupUpdate::Default).unwrap();

    let mut ws = Workspace::new();
    ws.add_component(Box::new(VectorComponent::new("sensor", DVector::zeros(5))))
        .unwrap();
    ws.add_component(Box::new(NetworkComponent::new("net", net)))
        .unwrap();

    let err = ws
        .bind(
            AttributeRef::new("sensor", VectorComponent::CONTAINER, "values"),
            AttributeRef::new("net", group.to_string(), "activations"),
        )
        .unwrap_err();
    assert!(matches!(err, netloom::error::NetError::TypeMismatch { .. }));
    assert_eq!(ws.couplings().num_couplings(), 0);
}

#[test]
fn test_update_result_is_independent_of_construction_order() {
    // The same fan-in wired in two different orders must produce the same
    // activation: inputs are snapshots of start-of-tick state, and addition
    // order is fixed by the stored element order only within one network.
    let run = |weights: &[(f64, f64)]| -> f64 {
        let mut net = Network::new();
        let out = net.add_neuron(pass_through_rule());
        for &(activation, weight) in weights {
            let input = net.add_neuron(pass_through_rule());
            let neuron = net.neuron_mut(input).unwrap();
            neuron.activation = activation;
            neuron.clamped = true;
            net.add_synapse(input, out, weight).unwrap();
        }
        net.update();
        net.neuron_ref(out).unwrap().activation
    };

    let forward = run(&[(0.5, 1.0), (0.25, 2.0), (0.125, 4.0)]);
    let reversed = run(&[(0.125, 4.0), (0.25, 2.0), (0.5, 1.0)]);
    assert_eq!(forward, 1.5);
    assert_eq!(forward, reversed);
}

#[test]
fn test_full_round_trip_through_archives() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut net = Network::with_noise_seed(7);
    let members: Vec<NeuronId> = (0..4).map(|_| net.add_neuron(pass_through_rule())).collect();
    ConnectionStrategy::AllToAll { self_connect: false }
        .connect(&mut net, &members, &members, &mut rng)
        .unwrap();
    let group = net
        .add_group("layer", members, GroupUpdate::k_winner_take_all(2, 0.25))
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let net_path = dir.path().join("network.json");
    let ws_path = dir.path().join("workspace.json");

    let mut ws = Workspace::new();
    ws.add_component(Box::new(VectorComponent::new("readout", DVector::zeros(4))))
        .unwrap();
    ws.add_component(Box::new(NetworkComponent::new("net", net)))
        .unwrap();
    ws.bind(
        AttributeRef::new("net", group.to_string(), "activations"),
        AttributeRef::new("readout", VectorComponent::CONTAINER, "values"),
    )
    .unwrap();

    ws.component_as::<NetworkComponent>("net")
        .unwrap()
        .network
        .archive()
        .save_to(&net_path)
        .unwrap();
    ws.archive().save_to(&ws_path).unwrap();

    // Reconstruct an isomorphic workspace from the two archives.
    let restored_net = Network::from_archive(NetworkArchive::load_from(&net_path).unwrap());
    let original = &ws.component_as::<NetworkComponent>("net").unwrap().network;
    assert_eq!(restored_net.num_neurons(), original.num_neurons());
    assert_eq!(restored_net.num_synapses(), original.num_synapses());
    assert_eq!(restored_net.num_groups(), original.num_groups());
    assert_eq!(restored_net.order(), original.order());

    let mut restored = Workspace::new();
    restored
        .add_component(Box::new(VectorComponent::new("readout", DVector::zeros(4))))
        .unwrap();
    restored
        .add_component(Box::new(NetworkComponent::new("net", restored_net)))
        .unwrap();
    restored.rebind(netloom::workspace::WorkspaceArchive::load_from(&ws_path).unwrap());
    assert_eq!(restored.couplings().num_couplings(), 1);

    // The rebound coupling still moves values.
    restored.tick();
    let readout = restored.component_as::<VectorComponent>("readout").unwrap();
    assert_eq!(readout.values.len(), 4);
}

#[test]
fn test_rebind_drops_couplings_with_missing_components() {
    let mut ws = Workspace::new();
    ws.add_component(Box::new(VectorComponent::new("a", DVector::zeros(2))))
        .unwrap();
    ws.add_component(Box::new(VectorComponent::new("b", DVector::zeros(2))))
        .unwrap();
    ws.bind(
        AttributeRef::new("a", VectorComponent::CONTAINER, "values"),
        AttributeRef::new("b", VectorComponent::CONTAINER, "values"),
    )
    .unwrap();
    let archive = ws.archive();

    // Restore into a workspace missing the producer component.
    let mut restored = Workspace::new();
    restored
        .add_component(Box::new(VectorComponent::new("b", DVector::zeros(2))))
        .unwrap();
    restored.rebind(archive);
    assert_eq!(restored.couplings().num_couplings(), 0);
}

#[test]
fn test_stop_flag_halts_between_ticks() {
    let mut ws = Workspace::new();
    ws.add_component(Box::new(VectorComponent::new("a", DVector::zeros(1))))
        .unwrap();

    let stop = AtomicBool::new(false);
    assert_eq!(ws.run_until(Some(3), &stop), 3);
    assert_eq!(ws.clock(), 3);

    let stop = AtomicBool::new(true);
    assert_eq!(ws.run_until(None, &stop), 0);
    assert_eq!(ws.clock(), 3);
}

#[test]
fn test_scalar_coupling_between_networks() {
    let mut source_net = Network::new();
    let source = source_net.add_neuron(pass_through_rule());
    {
        let neuron = source_net.neuron_mut(source).unwrap();
        neuron.activation = 0.9;
        neuron.clamped = true;
    }

    let mut sink_net = Network::new();
    let sink = sink_net.add_neuron(pass_through_rule());
    sink_net.neuron_mut(sink).unwrap().clamped = true;

    let mut ws = Workspace::new();
    ws.add_component(Box::new(NetworkComponent::new("source", source_net)))
        .unwrap();
    ws.add_component(Box::new(NetworkComponent::new("sink", sink_net)))
        .unwrap();
    ws.bind(
        AttributeRef::new("source", source.to_string(), "activation"),
        AttributeRef::new("sink", sink.to_string(), "activation"),
    )
    .unwrap();

    ws.tick();
    let value = ws
        .component("sink")
        .unwrap()
        .produce(&sink.to_string(), "activation")
        .unwrap();
    assert_eq!(value, AttributeValue::Scalar(0.9));
}
