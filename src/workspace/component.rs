//! Workspace components: anything that owns state, updates once per tick and
//! exposes attribute endpoints for coupling.
use std::any::Any;
use std::collections::BTreeMap;

use nalgebra::DVector;

use super::couplings::{AttributeDescriptor, AttributeType, AttributeValue, Direction};
use crate::error::NetError;
use crate::network::network::Network;
use crate::network::{GroupId, NeuronId};

/// A simulation model hosted in a workspace.
///
/// A component's attribute surface is described by [`descriptors`], a static
/// table of typed endpoints. Producers must be side-effect-free reads: the
/// coupling read phase may evaluate them in parallel.
///
/// [`descriptors`]: WorkspaceComponent::descriptors
pub trait WorkspaceComponent: Send + Sync {
    fn name(&self) -> &str;

    /// Advance the component's own dynamics by one tick.
    fn update(&mut self) -> Result<(), NetError>;

    /// The component's current attribute endpoints.
    fn descriptors(&self) -> Vec<AttributeDescriptor>;

    /// Read a producer endpoint.
    fn produce(&self, container: &str, attribute: &str) -> Result<AttributeValue, NetError>;

    /// Write a consumer endpoint.
    fn consume(
        &mut self,
        container: &str,
        attribute: &str,
        value: AttributeValue,
    ) -> Result<(), NetError>;

    /// Look up the type of an endpoint, if it exists with the given direction.
    fn attribute_type(
        &self,
        container: &str,
        attribute: &str,
        direction: Direction,
    ) -> Option<AttributeType> {
        self.descriptors()
            .iter()
            .find(|d| d.container == container && d.attribute == attribute && d.direction == direction)
            .map(|d| d.ty)
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Components keyed by their unique workspace name.
pub type ComponentMap = BTreeMap<String, Box<dyn WorkspaceComponent>>;

/// A [`Network`] hosted as a workspace component.
///
/// Each neuron is a container exposing a scalar `activation` endpoint in both
/// directions; each neuron group is a container exposing a vector
/// `activations` endpoint whose length is the group size.
#[derive(Debug)]
pub struct NetworkComponent {
    name: String,
    pub network: Network,
}

impl NetworkComponent {
    pub fn new(name: impl Into<String>, network: Network) -> Self {
        NetworkComponent {
            name: name.into(),
            network,
        }
    }

    // Container names are the Display form of the element ids
    // ("Neuron_3", "NeuronGroup_1"), so resolution is a parse plus an
    // arena lookup rather than a scan.
    fn neuron_id(&self, container: &str) -> Option<NeuronId> {
        let id = NeuronId(container.strip_prefix("Neuron_")?.parse().ok()?);
        self.network.neuron_ref(id).map(|n| n.id)
    }

    fn group_id(&self, container: &str) -> Option<GroupId> {
        let id = GroupId(container.strip_prefix("NeuronGroup_")?.parse().ok()?);
        self.network.group_ref(id).map(|g| g.id)
    }
}

impl WorkspaceComponent for NetworkComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self) -> Result<(), NetError> {
        self.network.update();
        Ok(())
    }

    fn descriptors(&self) -> Vec<AttributeDescriptor> {
        let mut descriptors = Vec::new();
        for neuron in self.network.neurons_iter() {
            for direction in [Direction::Producer, Direction::Consumer] {
                descriptors.push(AttributeDescriptor {
                    container: neuron.id.to_string(),
                    attribute: "activation".to_string(),
                    direction,
                    ty: AttributeType::Scalar,
                });
            }
        }
        for group in self.network.groups_iter() {
            for direction in [Direction::Producer, Direction::Consumer] {
                descriptors.push(AttributeDescriptor {
                    container: group.id.to_string(),
                    attribute: "activations".to_string(),
                    direction,
                    ty: AttributeType::Vector(group.size()),
                });
            }
        }
        descriptors
    }

    fn produce(&self, container: &str, attribute: &str) -> Result<AttributeValue, NetError> {
        if attribute == "activation" {
            if let Some(id) = self.neuron_id(container) {
                let neuron = self.network.neuron_ref(id).ok_or_else(|| {
                    NetError::DanglingReference(format!("{} does not exist", id))
                })?;
                return Ok(AttributeValue::Scalar(neuron.activation));
            }
        }
        if attribute == "activations" {
            if let Some(id) = self.group_id(container) {
                let group = self.network.group_ref(id).ok_or_else(|| {
                    NetError::DanglingReference(format!("{} does not exist", id))
                })?;
                let values: Vec<f64> = group
                    .members
                    .iter()
                    .filter_map(|m| self.network.neuron_ref(*m))
                    .map(|n| n.activation)
                    .collect();
                return Ok(AttributeValue::Vector(DVector::from_vec(values)));
            }
        }
        Err(NetError::DanglingReference(format!(
            "producer {}/{}/{} does not exist",
            self.name, container, attribute
        )))
    }

    fn consume(
        &mut self,
        container: &str,
        attribute: &str,
        value: AttributeValue,
    ) -> Result<(), NetError> {
        if attribute == "activation" {
            if let Some(id) = self.neuron_id(container) {
                let activation = match value {
                    AttributeValue::Scalar(v) => v,
                    other => {
                        return Err(NetError::TypeMismatch {
                            expected: AttributeType::Scalar.to_string(),
                            found: other.type_of().to_string(),
                        })
                    }
                };
                return self.network.set_activation(id, activation);
            }
        }
        if attribute == "activations" {
            if let Some(id) = self.group_id(container) {
                let group = self.network.group_ref(id).ok_or_else(|| {
                    NetError::DanglingReference(format!("{} does not exist", id))
                })?;
                let members = group.members.clone();
                let values = match value {
                    AttributeValue::Vector(v) => v,
                    other => {
                        return Err(NetError::TypeMismatch {
                            expected: AttributeType::Vector(members.len()).to_string(),
                            found: other.type_of().to_string(),
                        })
                    }
                };
                if values.len() != members.len() {
                    return Err(NetError::TypeMismatch {
                        expected: AttributeType::Vector(members.len()).to_string(),
                        found: AttributeType::Vector(values.len()).to_string(),
                    });
                }
                for (member, activation) in members.iter().zip(values.iter()) {
                    self.network.set_activation(*member, *activation)?;
                }
                return Ok(());
            }
        }
        Err(NetError::DanglingReference(format!(
            "consumer {}/{}/{} does not exist",
            self.name, container, attribute
        )))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A plain vector buffer component, standing in for sensor or actuator
/// surfaces that feed a network from outside.
#[derive(Debug, PartialEq, Clone)]
pub struct VectorComponent {
    name: String,
    pub values: DVector<f64>,
}

impl VectorComponent {
    pub const CONTAINER: &'static str = "buffer";

    pub fn new(name: impl Into<String>, values: DVector<f64>) -> Self {
        VectorComponent {
            name: name.into(),
            values,
        }
    }
}

impl WorkspaceComponent for VectorComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self) -> Result<(), NetError> {
        Ok(())
    }

    fn descriptors(&self) -> Vec<AttributeDescriptor> {
        [Direction::Producer, Direction::Consumer]
            .into_iter()
            .map(|direction| AttributeDescriptor {
                container: Self::CONTAINER.to_string(),
                attribute: "values".to_string(),
                direction,
                ty: AttributeType::Vector(self.values.len()),
            })
            .collect()
    }

    fn produce(&self, container: &str, attribute: &str) -> Result<AttributeValue, NetError> {
        if container == Self::CONTAINER && attribute == "values" {
            return Ok(AttributeValue::Vector(self.values.clone()));
        }
        Err(NetError::DanglingReference(format!(
            "producer {}/{}/{} does not exist",
            self.name, container, attribute
        )))
    }

    fn consume(
        &mut self,
        container: &str,
        attribute: &str,
        value: AttributeValue,
    ) -> Result<(), NetError> {
        if container == Self::CONTAINER && attribute == "values" {
            let values = match value {
                AttributeValue::Vector(v) => v,
                other => {
                    return Err(NetError::TypeMismatch {
                        expected: AttributeType::Vector(self.values.len()).to_string(),
                        found: other.type_of().to_string(),
                    })
                }
            };
            if values.len() != self.values.len() {
                return Err(NetError::TypeMismatch {
                    expected: AttributeType::Vector(self.values.len()).to_string(),
                    found: AttributeType::Vector(values.len()).to_string(),
                });
            }
            self.values = values;
            return Ok(());
        }
        Err(NetError::DanglingReference(format!(
            "consumer {}/{}/{} does not exist",
            self.name, container, attribute
        )))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
