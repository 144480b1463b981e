//! The attribute/coupling layer: typed producer/consumer bindings between
//! components exposing attributes.
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::component::ComponentMap;
use super::MIN_PARALLEL_COUPLINGS;
use crate::error::NetError;

/// Direction of an attribute endpoint.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Direction {
    /// A side-effect-free read of component state.
    Producer,
    /// A write into component state.
    Consumer,
}

/// The value type of an attribute endpoint. Vector and matrix types carry
/// their dimensions, so compatibility is fully decided at bind time.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum AttributeType {
    Scalar,
    Vector(usize),
    Matrix(usize, usize),
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttributeType::Scalar => write!(f, "scalar"),
            AttributeType::Vector(len) => write!(f, "vector of length {}", len),
            AttributeType::Matrix(rows, cols) => write!(f, "{}x{} matrix", rows, cols),
        }
    }
}

/// A value moved across a coupling.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum AttributeValue {
    Scalar(f64),
    Vector(nalgebra::DVector<f64>),
    Matrix(nalgebra::DMatrix<f64>),
}

impl AttributeValue {
    pub fn type_of(&self) -> AttributeType {
        match self {
            AttributeValue::Scalar(_) => AttributeType::Scalar,
            AttributeValue::Vector(v) => AttributeType::Vector(v.len()),
            AttributeValue::Matrix(m) => AttributeType::Matrix(m.nrows(), m.ncols()),
        }
    }
}

/// One entry of a component's static descriptor table.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub container: String,
    pub attribute: String,
    pub direction: Direction,
    pub ty: AttributeType,
}

/// Address of an attribute endpoint within a workspace.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct AttributeRef {
    pub component: String,
    pub container: String,
    pub attribute: String,
}

impl AttributeRef {
    pub fn new(
        component: impl Into<String>,
        container: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        AttributeRef {
            component: component.into(),
            container: container.into(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}/{}", self.component, self.container, self.attribute)
    }
}

fn default_valid() -> bool {
    true
}

/// An immutable directed binding of one producer to one consumer of a
/// compatible type. A coupling whose endpoint vanishes is marked invalid and
/// skipped on subsequent ticks until rebound.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Coupling {
    pub producer: AttributeRef,
    pub consumer: AttributeRef,
    #[serde(skip, default = "default_valid")]
    valid: bool,
}

impl Coupling {
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl fmt::Display for Coupling {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} > {}", self.producer, self.consumer)
    }
}

/// Owns the coupling table of a workspace and moves values across it once
/// per tick.
#[derive(Debug, Default)]
pub struct CouplingManager {
    couplings: Vec<Coupling>,
}

impl CouplingManager {
    pub fn new() -> Self {
        CouplingManager::default()
    }

    pub fn couplings(&self) -> &[Coupling] {
        &self.couplings
    }

    pub fn num_couplings(&self) -> usize {
        self.couplings.len()
    }

    /// Bind a producer to a consumer.
    ///
    /// Binding fails at creation time, never during execution: the endpoints
    /// must exist with the right direction ([`NetError::DanglingReference`])
    /// and carry exactly the same value type ([`NetError::TypeMismatch`],
    /// including vector-length and matrix-shape mismatches).
    pub fn bind(
        &mut self,
        components: &ComponentMap,
        producer: AttributeRef,
        consumer: AttributeRef,
    ) -> Result<(), NetError> {
        let producer_ty = endpoint_type(components, &producer, Direction::Producer)?;
        let consumer_ty = endpoint_type(components, &consumer, Direction::Consumer)?;
        if producer_ty != consumer_ty {
            return Err(NetError::TypeMismatch {
                expected: consumer_ty.to_string(),
                found: producer_ty.to_string(),
            });
        }
        self.couplings.push(Coupling {
            producer,
            consumer,
            valid: true,
        });
        Ok(())
    }

    /// Remove the coupling between the given endpoints, if present.
    pub fn unbind(&mut self, producer: &AttributeRef, consumer: &AttributeRef) {
        self.couplings
            .retain(|c| !(c.producer == *producer && c.consumer == *consumer));
    }

    /// Execute all valid couplings for one tick.
    ///
    /// Producers are evaluated first, against the tick's start-of-tick state;
    /// every value is then pushed into its consumer. Producers are pure reads
    /// with no mutual dependencies, so the evaluation pass is parallelized
    /// once the table is large enough. A coupling whose endpoint has vanished
    /// is invalidated and skipped from then on.
    pub fn update(&mut self, components: &mut ComponentMap) {
        let values: Vec<Option<Result<AttributeValue, NetError>>> = {
            let components: &ComponentMap = components;
            if self.couplings.len() >= MIN_PARALLEL_COUPLINGS {
                self.couplings
                    .par_iter()
                    .map(|coupling| read_producer(components, coupling))
                    .collect()
            } else {
                self.couplings
                    .iter()
                    .map(|coupling| read_producer(components, coupling))
                    .collect()
            }
        };

        for (coupling, value) in self.couplings.iter_mut().zip(values) {
            let value = match value {
                None => continue,
                Some(Ok(value)) => value,
                Some(Err(e)) => {
                    log::warn!("Invalidating coupling {}: {}", coupling, e);
                    coupling.valid = false;
                    continue;
                }
            };
            let consumed = components
                .get_mut(&coupling.consumer.component)
                .ok_or_else(|| {
                    NetError::DanglingReference(format!(
                        "component {} does not exist",
                        coupling.consumer.component
                    ))
                })
                .and_then(|component| {
                    component.consume(
                        &coupling.consumer.container,
                        &coupling.consumer.attribute,
                        value,
                    )
                });
            if let Err(e) = consumed {
                log::warn!("Invalidating coupling {}: {}", coupling, e);
                coupling.valid = false;
            }
        }
    }
}

fn endpoint_type(
    components: &ComponentMap,
    endpoint: &AttributeRef,
    direction: Direction,
) -> Result<AttributeType, NetError> {
    let component = components.get(&endpoint.component).ok_or_else(|| {
        NetError::DanglingReference(format!("component {} does not exist", endpoint.component))
    })?;
    component
        .attribute_type(&endpoint.container, &endpoint.attribute, direction)
        .ok_or_else(|| {
            NetError::DanglingReference(format!(
                "attribute {} ({:?}) does not exist",
                endpoint, direction
            ))
        })
}

fn read_producer(
    components: &ComponentMap,
    coupling: &Coupling,
) -> Option<Result<AttributeValue, NetError>> {
    if !coupling.valid {
        return None;
    }
    let result = components
        .get(&coupling.producer.component)
        .ok_or_else(|| {
            NetError::DanglingReference(format!(
                "component {} does not exist",
                coupling.producer.component
            ))
        })
        .and_then(|component| {
            component.produce(&coupling.producer.container, &coupling.producer.attribute)
        });
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::component::{VectorComponent, WorkspaceComponent};
    use nalgebra::DVector;
    use std::collections::BTreeMap;

    fn components_with_vectors(lens: &[(&str, usize)]) -> ComponentMap {
        let mut components: ComponentMap = BTreeMap::new();
        for (name, len) in lens {
            components.insert(
                name.to_string(),
                Box::new(VectorComponent::new(*name, DVector::zeros(*len))),
            );
        }
        components
    }

    fn vector_ref(component: &str) -> AttributeRef {
        AttributeRef::new(component, VectorComponent::CONTAINER, "values")
    }

    #[test]
    fn test_bind_rejects_length_mismatch() {
        let components = components_with_vectors(&[("a", 3), ("b", 5)]);
        let mut manager = CouplingManager::new();
        let err = manager
            .bind(&components, vector_ref("a"), vector_ref("b"))
            .unwrap_err();
        assert_eq!(
            err,
            NetError::TypeMismatch {
                expected: "vector of length 5".to_string(),
                found: "vector of length 3".to_string(),
            }
        );
        assert_eq!(manager.num_couplings(), 0);
    }

    #[test]
    fn test_bind_rejects_missing_endpoint() {
        let components = components_with_vectors(&[("a", 3)]);
        let mut manager = CouplingManager::new();
        let err = manager
            .bind(&components, vector_ref("a"), vector_ref("ghost"))
            .unwrap_err();
        assert!(matches!(err, NetError::DanglingReference(_)));
    }

    #[test]
    fn test_matching_lengths_transfer_values() {
        let mut components = components_with_vectors(&[("a", 3), ("b", 3)]);
        if let Some(component) = components.get_mut("a") {
            component
                .consume(
                    VectorComponent::CONTAINER,
                    "values",
                    AttributeValue::Vector(DVector::from_vec(vec![1.0, 2.0, 3.0])),
                )
                .unwrap();
        }

        let mut manager = CouplingManager::new();
        manager
            .bind(&components, vector_ref("a"), vector_ref("b"))
            .unwrap();
        manager.update(&mut components);

        let value = components
            .get("b")
            .unwrap()
            .produce(VectorComponent::CONTAINER, "values")
            .unwrap();
        assert_eq!(
            value,
            AttributeValue::Vector(DVector::from_vec(vec![1.0, 2.0, 3.0]))
        );
    }

    #[test]
    fn test_vanished_endpoint_invalidates_coupling() {
        let mut components = components_with_vectors(&[("a", 3), ("b", 3)]);
        let mut manager = CouplingManager::new();
        manager
            .bind(&components, vector_ref("a"), vector_ref("b"))
            .unwrap();

        components.remove("a");
        manager.update(&mut components);
        assert!(!manager.couplings()[0].is_valid());

        // Restoring the component does not resurrect the coupling.
        let mut components = components_with_vectors(&[("a", 3), ("b", 3)]);
        manager.update(&mut components);
        assert!(!manager.couplings()[0].is_valid());
    }
}
