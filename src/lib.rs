//! This crate provides the simulation kernel of a neural network workbench:
//! rate-coded networks, connection strategies, and a workspace coupling the
//! networks to other components once per tick.
//!
//! # Building Networks
//!
//! ```rust
//! use netloom::network::network::Network;
//! use netloom::rules::UpdateRule;
//!
//! // Init an empty network
//! let mut network = Network::new();
//!
//! // Add neurons and wire them up
//! let a = network.add_neuron(UpdateRule::default());
//! let b = network.add_neuron(UpdateRule::default());
//! network.add_synapse(a, b, 0.5).unwrap();
//!
//! // Check the number of neurons and synapses
//! assert_eq!(network.num_neurons(), 2);
//! assert_eq!(network.num_synapses(), 1);
//! ```
//!
//! ## With a Connection Strategy
//!
//! ```rust
//! use netloom::network::connectors::ConnectionStrategy;
//! use netloom::network::network::Network;
//! use netloom::rules::UpdateRule;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let mut network = Network::new();
//! let neurons: Vec<_> = (0..10).map(|_| network.add_neuron(UpdateRule::default())).collect();
//!
//! // Connect a quarter of all possible pairs, at random
//! let strategy = ConnectionStrategy::Sparse { density: 0.25, self_connect: true };
//! strategy.connect(&mut network, &neurons, &neurons, &mut rng).unwrap();
//!
//! assert_eq!(network.num_synapses(), 25);
//! ```
//!
//! # Simulating Networks
//!
//! Each call to [`Network::update`](network::network::Network::update)
//! advances the network by one tick: inputs are gathered from the activations
//! as they stood at the start of the tick, then every unclamped neuron
//! applies its update rule.
//!
//! # Coupling Components
//!
//! ```rust
//! use nalgebra::DVector;
//! use netloom::workspace::{AttributeRef, VectorComponent, Workspace};
//!
//! let mut workspace = Workspace::new();
//! workspace.add_component(Box::new(VectorComponent::new("sensor", DVector::zeros(3)))).unwrap();
//! workspace.add_component(Box::new(VectorComponent::new("motor", DVector::zeros(3)))).unwrap();
//!
//! // Couplings are typed: a 3-vector producer only binds to a 3-vector consumer
//! workspace.bind(
//!     AttributeRef::new("sensor", VectorComponent::CONTAINER, "values"),
//!     AttributeRef::new("motor", VectorComponent::CONTAINER, "values"),
//! ).unwrap();
//!
//! workspace.tick();
//! assert_eq!(workspace.clock(), 1);
//! ```

pub mod error;
pub mod network;
pub mod rules;
pub mod trainer;
pub mod workspace;

/// The default Euler step size used by continuous-time rules.
pub const DEFAULT_TIME_STEP: f64 = 0.1;
