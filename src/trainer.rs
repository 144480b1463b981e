//! Least-mean-squares training of the weights feeding a layer of linear
//! neurons.
use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::NetError;
use crate::network::network::Network;
use crate::network::NeuronId;
use crate::rules::UpdateRule;

/// Paired input and target rows. Row `i` of `inputs` is presented to the
/// source neurons while row `i` of `targets` is the desired output layer
/// activation.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct TrainingSet {
    pub inputs: DMatrix<f64>,
    pub targets: DMatrix<f64>,
}

impl TrainingSet {
    /// Build a training set, requiring one target row per input row.
    pub fn build(inputs: DMatrix<f64>, targets: DMatrix<f64>) -> Result<Self, NetError> {
        if inputs.nrows() != targets.nrows() {
            return Err(NetError::IllegalArgument(format!(
                "inputs have {} rows but targets have {}",
                inputs.nrows(),
                targets.nrows()
            )));
        }
        Ok(TrainingSet { inputs, targets })
    }

    pub fn num_rows(&self) -> usize {
        self.inputs.nrows()
    }
}

/// When iterative training stops on its own.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum StoppingCondition {
    /// Train until stopped externally.
    None,
    /// Stop once the root-mean-square error falls below the threshold.
    ThresholdError(f64),
    /// Stop after a fixed number of iterations.
    NumIterations(usize),
}

/// An iterative delta-rule trainer over the synapses connecting a source
/// layer to a target layer.
///
/// Each iteration presents every training row once: source activations are
/// set from the input row, each target neuron's noise-free prediction is
/// formed from the current weights, and every source-to-target weight moves
/// along the error gradient. Neurons whose rule is not differentiable train
/// with a unit derivative.
#[derive(Debug)]
pub struct LmsTrainer {
    pub sources: Vec<NeuronId>,
    pub targets: Vec<NeuronId>,
    pub learning_rate: f64,
    pub stopping: StoppingCondition,
    iteration: usize,
    training_set: Option<TrainingSet>,
}

impl LmsTrainer {
    pub fn new(sources: Vec<NeuronId>, targets: Vec<NeuronId>) -> Self {
        LmsTrainer {
            sources,
            targets,
            learning_rate: 0.01,
            stopping: StoppingCondition::NumIterations(100),
            iteration: 0,
            training_set: None,
        }
    }

    /// The number of completed iterations.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn set_training_set(&mut self, training_set: TrainingSet) {
        self.training_set = Some(training_set);
    }

    /// Run one pass over the training set, returning the root-mean-square
    /// error across all rows and target neurons.
    ///
    /// Fails with [`NetError::DataNotInitialized`] when no training set has
    /// been attached, and with [`NetError::IllegalArgument`] when the set's
    /// column counts do not match the layer sizes.
    pub fn iterate(&mut self, network: &mut Network) -> Result<f64, NetError> {
        let training_set = self
            .training_set
            .as_ref()
            .ok_or_else(|| NetError::DataNotInitialized("no training set attached".to_string()))?;
        if training_set.inputs.ncols() != self.sources.len() {
            return Err(NetError::IllegalArgument(format!(
                "inputs have {} columns but the source layer has {} neurons",
                training_set.inputs.ncols(),
                self.sources.len()
            )));
        }
        if training_set.targets.ncols() != self.targets.len() {
            return Err(NetError::IllegalArgument(format!(
                "targets have {} columns but the target layer has {} neurons",
                training_set.targets.ncols(),
                self.targets.len()
            )));
        }

        let mut squared_error = 0.0;
        for row in 0..training_set.num_rows() {
            for (col, source) in self.sources.iter().enumerate() {
                network.set_activation(*source, training_set.inputs[(row, col)])?;
            }

            for (col, target) in self.targets.iter().enumerate() {
                let weighted_input: f64 = self
                    .sources
                    .iter()
                    .filter_map(|source| {
                        let synapse = network.synapse_between(*source, *target)?;
                        let activation = network.neuron_ref(*source)?.activation;
                        Some(synapse.weight * activation)
                    })
                    .sum();

                let neuron = network.neuron_ref(*target).ok_or_else(|| {
                    NetError::DanglingReference(format!("{} does not exist", target))
                })?;
                let (predicted, derivative) = match &neuron.rule {
                    UpdateRule::Linear(rule) => {
                        (rule.forward(weighted_input), rule.derivative(weighted_input))
                    }
                    _ => (weighted_input, 1.0),
                };

                let error = training_set.targets[(row, col)] - predicted;
                squared_error += error * error;

                let deltas: Vec<(crate::network::SynapseId, f64)> = self
                    .sources
                    .iter()
                    .filter_map(|source| {
                        let synapse = network.synapse_between(*source, *target)?;
                        let activation = network.neuron_ref(*source)?.activation;
                        Some((
                            synapse.id,
                            self.learning_rate * error * derivative * activation,
                        ))
                    })
                    .collect();
                for (id, delta) in deltas {
                    if let Some(synapse) = network.synapse_mut(id) {
                        synapse.weight += delta;
                    }
                }
            }
        }

        self.iteration += 1;
        let samples = (training_set.num_rows() * self.targets.len()).max(1);
        Ok((squared_error / samples as f64).sqrt())
    }

    /// Iterate until the stopping condition holds or `stop` is raised.
    /// The flag is checked between iterations, so a pass in flight always
    /// completes. Returns the last iteration's error.
    pub fn train(&mut self, network: &mut Network, stop: &AtomicBool) -> Result<f64, NetError> {
        let mut error = f64::INFINITY;
        loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            match self.stopping {
                StoppingCondition::None => {}
                StoppingCondition::ThresholdError(threshold) => {
                    if error < threshold {
                        break;
                    }
                }
                StoppingCondition::NumIterations(n) => {
                    if self.iteration >= n {
                        break;
                    }
                }
            }
            error = self.iterate(network)?;
            log::debug!("Iteration {}: error {}", self.iteration, error);
        }
        Ok(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Clipping, LinearRule};

    fn two_input_one_output() -> (Network, LmsTrainer) {
        let mut net = Network::new();
        let rule = UpdateRule::Linear(LinearRule {
            clipping: Clipping::NoClipping,
            ..LinearRule::default()
        });
        let a = net.add_neuron(rule.deep_copy());
        let b = net.add_neuron(rule.deep_copy());
        let out = net.add_neuron(rule.deep_copy());
        net.add_synapse(a, out, 0.0).unwrap();
        net.add_synapse(b, out, 0.0).unwrap();
        (net, LmsTrainer::new(vec![a, b], vec![out]))
    }

    fn and_gate_set() -> TrainingSet {
        TrainingSet::build(
            DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0]),
            DMatrix::from_row_slice(4, 1, &[0.0, 0.0, 0.0, 1.0]),
        )
        .unwrap()
    }

    #[test]
    fn test_build_rejects_row_mismatch() {
        let err = TrainingSet::build(DMatrix::zeros(4, 2), DMatrix::zeros(3, 1)).unwrap_err();
        assert!(matches!(err, NetError::IllegalArgument(_)));
    }

    #[test]
    fn test_iterate_without_data_fails() {
        let (mut net, mut trainer) = two_input_one_output();
        let err = trainer.iterate(&mut net).unwrap_err();
        assert!(matches!(err, NetError::DataNotInitialized(_)));
    }

    #[test]
    fn test_iterate_rejects_wrong_layer_width() {
        let (mut net, mut trainer) = two_input_one_output();
        trainer.set_training_set(
            TrainingSet::build(DMatrix::zeros(4, 3), DMatrix::zeros(4, 1)).unwrap(),
        );
        let err = trainer.iterate(&mut net).unwrap_err();
        assert!(matches!(err, NetError::IllegalArgument(_)));
    }

    #[test]
    fn test_error_decreases_over_iterations() {
        let (mut net, mut trainer) = two_input_one_output();
        trainer.learning_rate = 0.1;
        trainer.set_training_set(and_gate_set());

        let first = trainer.iterate(&mut net).unwrap();
        let mut last = first;
        for _ in 0..50 {
            last = trainer.iterate(&mut net).unwrap();
        }
        assert!(last < first);
        assert_eq!(trainer.iteration(), 51);
    }

    #[test]
    fn test_train_stops_at_iteration_limit() {
        let (mut net, mut trainer) = two_input_one_output();
        trainer.set_training_set(and_gate_set());
        trainer.stopping = StoppingCondition::NumIterations(5);

        let stop = AtomicBool::new(false);
        trainer.train(&mut net, &stop).unwrap();
        assert_eq!(trainer.iteration(), 5);
    }

    #[test]
    fn test_train_honors_stop_flag() {
        let (mut net, mut trainer) = two_input_one_output();
        trainer.set_training_set(and_gate_set());
        trainer.stopping = StoppingCondition::None;

        let stop = AtomicBool::new(true);
        trainer.train(&mut net, &stop).unwrap();
        assert_eq!(trainer.iteration(), 0);
    }
}
