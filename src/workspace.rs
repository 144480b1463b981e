//! The workspace: a container of named components, a typed coupling table
//! between them, and an ordered action list executed once per tick.
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::mem;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::NetError;

pub mod component;
pub mod couplings;

pub use component::{ComponentMap, NetworkComponent, VectorComponent, WorkspaceComponent};
pub use couplings::{
    AttributeDescriptor, AttributeRef, AttributeType, AttributeValue, Coupling, CouplingManager,
    Direction,
};

/// Minimum number of couplings before the producer read phase is evaluated in
/// parallel.
pub const MIN_PARALLEL_COUPLINGS: usize = 64;

/// What one entry of the tick's action list does.
pub enum ActionKind {
    /// Update every component, in name order.
    UpdateComponents,
    /// Execute the coupling table.
    UpdateCouplings,
    /// Advance the workspace clock by one.
    AdvanceTime,
    /// An arbitrary user action with full access to the workspace.
    Custom(Box<dyn FnMut(&mut Workspace) -> Result<(), NetError> + Send>),
}

/// A named step of the per-tick update sequence.
pub struct UpdateAction {
    pub name: String,
    pub kind: ActionKind,
}

impl UpdateAction {
    pub fn new(name: impl Into<String>, kind: ActionKind) -> Self {
        UpdateAction {
            name: name.into(),
            kind,
        }
    }

    /// A custom action wrapping the given closure.
    pub fn custom(
        name: impl Into<String>,
        f: impl FnMut(&mut Workspace) -> Result<(), NetError> + Send + 'static,
    ) -> Self {
        UpdateAction::new(name, ActionKind::Custom(Box::new(f)))
    }
}

impl fmt::Debug for UpdateAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ActionKind::UpdateComponents => "UpdateComponents",
            ActionKind::UpdateCouplings => "UpdateCouplings",
            ActionKind::AdvanceTime => "AdvanceTime",
            ActionKind::Custom(_) => "Custom",
        };
        f.debug_struct("UpdateAction")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

/// A collection of components coupled into one simulation, advanced by an
/// ordered action list.
///
/// The default action list updates all components, then executes the coupling
/// table, then advances the clock. Actions can be inserted anywhere in the
/// sequence; a failing custom action is reported and skipped, never aborting
/// the remainder of the tick.
pub struct Workspace {
    components: ComponentMap,
    couplings: CouplingManager,
    actions: Vec<UpdateAction>,
    clock: u64,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace {
            components: BTreeMap::new(),
            couplings: CouplingManager::new(),
            actions: vec![
                UpdateAction::new("update components", ActionKind::UpdateComponents),
                UpdateAction::new("update couplings", ActionKind::UpdateCouplings),
                UpdateAction::new("advance time", ActionKind::AdvanceTime),
            ],
            clock: 0,
        }
    }

    /// The number of completed ticks.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    pub fn couplings(&self) -> &CouplingManager {
        &self.couplings
    }

    /// Add a component under its own name.
    /// Fails with [`NetError::InvalidParameter`] if the name is taken.
    pub fn add_component(
        &mut self,
        component: Box<dyn WorkspaceComponent>,
    ) -> Result<(), NetError> {
        let name = component.name().to_string();
        if self.components.contains_key(&name) {
            return Err(NetError::InvalidParameter(format!(
                "component name {} is already taken",
                name
            )));
        }
        self.components.insert(name, component);
        Ok(())
    }

    pub fn remove_component(&mut self, name: &str) -> Option<Box<dyn WorkspaceComponent>> {
        self.components.remove(name)
    }

    pub fn component(&self, name: &str) -> Option<&dyn WorkspaceComponent> {
        self.components.get(name).map(|c| c.as_ref())
    }

    /// Borrow a component downcast to its concrete type.
    pub fn component_as<T: WorkspaceComponent + 'static>(&self, name: &str) -> Option<&T> {
        self.components
            .get(name)
            .and_then(|c| c.as_any().downcast_ref::<T>())
    }

    pub fn component_as_mut<T: WorkspaceComponent + 'static>(
        &mut self,
        name: &str,
    ) -> Option<&mut T> {
        self.components
            .get_mut(name)
            .and_then(|c| c.as_any_mut().downcast_mut::<T>())
    }

    /// Bind a producer endpoint to a consumer endpoint.
    pub fn bind(&mut self, producer: AttributeRef, consumer: AttributeRef) -> Result<(), NetError> {
        self.couplings.bind(&self.components, producer, consumer)
    }

    pub fn unbind(&mut self, producer: &AttributeRef, consumer: &AttributeRef) {
        self.couplings.unbind(producer, consumer);
    }

    pub fn actions(&self) -> &[UpdateAction] {
        &self.actions
    }

    /// Insert an action at the given position of the per-tick sequence.
    /// An out-of-range index appends.
    pub fn insert_action(&mut self, index: usize, action: UpdateAction) {
        let index = index.min(self.actions.len());
        self.actions.insert(index, action);
    }

    /// Advance the workspace by one tick, executing the action list in order.
    ///
    /// A failing component update or custom action is reported and skipped.
    /// Actions added from within a custom action run starting with the next
    /// tick, appended after the existing sequence.
    pub fn tick(&mut self) {
        let mut actions = mem::take(&mut self.actions);
        for action in &mut actions {
            match &mut action.kind {
                ActionKind::UpdateComponents => {
                    for (name, component) in self.components.iter_mut() {
                        if let Err(e) = component.update() {
                            log::warn!("Component {} failed to update: {}", name, e);
                        }
                    }
                }
                ActionKind::UpdateCouplings => {
                    self.couplings.update(&mut self.components);
                }
                ActionKind::AdvanceTime => {
                    self.clock += 1;
                }
                ActionKind::Custom(f) => {
                    if let Err(e) = f(self) {
                        log::warn!("Action {} failed: {}", action.name, e);
                    }
                }
            }
        }
        // Anything queued during the tick lands after the original sequence.
        actions.append(&mut self.actions);
        self.actions = actions;
    }

    /// Run the given number of ticks.
    pub fn run(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Run until `stop` is raised or `max` ticks have elapsed, whichever comes
    /// first. The flag is checked between ticks only, so a tick in flight
    /// always completes. Returns the number of ticks executed.
    pub fn run_until(&mut self, max: Option<usize>, stop: &AtomicBool) -> usize {
        let mut executed = 0;
        while max.map_or(true, |m| executed < m) {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            self.tick();
            executed += 1;
        }
        executed
    }

    /// Snapshot the coupling table for persistence.
    pub fn archive(&self) -> WorkspaceArchive {
        WorkspaceArchive {
            couplings: self.couplings.couplings().to_vec(),
        }
    }

    /// Rebind the couplings of an archive against the current components.
    ///
    /// A coupling whose endpoint no longer exists, or whose endpoint types no
    /// longer match, is dropped with a reported diagnostic; the rest rebind.
    pub fn rebind(&mut self, archive: WorkspaceArchive) {
        for coupling in archive.couplings {
            let label = coupling.to_string();
            if let Err(e) = self.bind(coupling.producer, coupling.consumer) {
                log::warn!("Dropping coupling {}: {}", label, e);
            }
        }
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

/// The persistent part of a workspace: its coupling table. Components archive
/// themselves separately (e.g. [`crate::network::archive::NetworkArchive`]).
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct WorkspaceArchive {
    pub couplings: Vec<Coupling>,
}

impl WorkspaceArchive {
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), NetError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<WorkspaceArchive, NetError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    fn vector_workspace() -> Workspace {
        let mut ws = Workspace::new();
        ws.add_component(Box::new(VectorComponent::new(
            "a",
            DVector::from_vec(vec![1.0, 2.0, 3.0]),
        )))
        .unwrap();
        ws.add_component(Box::new(VectorComponent::new("b", DVector::zeros(3))))
            .unwrap();
        ws
    }

    #[test]
    fn test_duplicate_component_name_is_rejected() {
        let mut ws = vector_workspace();
        let err = ws
            .add_component(Box::new(VectorComponent::new("a", DVector::zeros(1))))
            .unwrap_err();
        assert!(matches!(err, NetError::InvalidParameter(_)));
    }

    #[test]
    fn test_tick_moves_values_and_advances_clock() {
        let mut ws = vector_workspace();
        ws.bind(
            AttributeRef::new("a", VectorComponent::CONTAINER, "values"),
            AttributeRef::new("b", VectorComponent::CONTAINER, "values"),
        )
        .unwrap();

        ws.tick();
        assert_eq!(ws.clock(), 1);
        let b = ws.component_as::<VectorComponent>("b").unwrap();
        assert_eq!(b.values, DVector::from_vec(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_failing_custom_action_does_not_abort_tick() {
        let mut ws = vector_workspace();
        ws.insert_action(
            0,
            UpdateAction::custom("always fails", |_| {
                Err(NetError::IllegalArgument("deliberate".to_string()))
            }),
        );

        ws.run(3);
        assert_eq!(ws.clock(), 3);
    }

    #[test]
    fn test_action_added_during_tick_runs_next_tick() {
        let mut ws = vector_workspace();
        let mut queued = false;
        ws.insert_action(
            0,
            UpdateAction::custom("queue doubler", move |ws| {
                if !queued {
                    queued = true;
                    ws.insert_action(
                        usize::MAX,
                        UpdateAction::custom("doubler", |ws| {
                            let a = ws
                                .component_as_mut::<VectorComponent>("a")
                                .ok_or_else(|| {
                                    NetError::DanglingReference("a".to_string())
                                })?;
                            a.values *= 2.0;
                            Ok(())
                        }),
                    );
                }
                Ok(())
            }),
        );

        ws.tick();
        // The doubler was queued but must not have run yet.
        let a = ws.component_as::<VectorComponent>("a").unwrap();
        assert_eq!(a.values, DVector::from_vec(vec![1.0, 2.0, 3.0]));

        ws.tick();
        let a = ws.component_as::<VectorComponent>("a").unwrap();
        assert_eq!(a.values, DVector::from_vec(vec![2.0, 4.0, 6.0]));
    }

    #[test]
    fn test_run_until_honors_stop_flag() {
        let mut ws = vector_workspace();
        let stop = AtomicBool::new(true);
        assert_eq!(ws.run_until(Some(100), &stop), 0);

        let stop = AtomicBool::new(false);
        assert_eq!(ws.run_until(Some(5), &stop), 5);
        assert_eq!(ws.clock(), 5);
    }
}
