use super::{ComponentState, EviveOrchestrator};
use std::collections::HashMap;
use tracing::debug;

/// Lifecycle bookkeeping for the station's parts ("session", "console").
/// Startup and shutdown write here; callers read snapshots.
impl EviveOrchestrator {
    /// Record where `component` is in its lifecycle, replacing any earlier entry
    pub async fn set_component_state(&self, component: &str, state: ComponentState) {
        let mut states = self.component_states.lock().await;
        let previous = states.insert(component.to_string(), state.clone());
        debug!("{} lifecycle: {:?} -> {:?}", component, previous, state);
    }

    /// `None` until the component has been initialized
    pub async fn get_component_state(&self, component: &str) -> Option<ComponentState> {
        self.component_states.lock().await.get(component).cloned()
    }

    pub async fn get_all_component_states(&self) -> HashMap<String, ComponentState> {
        self.component_states.lock().await.clone()
    }

    /// Names of components whose start or stop went wrong, sorted
    pub async fn failed_components(&self) -> Vec<String> {
        let mut failed: Vec<String> = self
            .component_states
            .lock()
            .await
            .iter()
            .filter(|(_, state)| **state == ComponentState::Failed)
            .map(|(name, _)| name.clone())
            .collect();
        failed.sort();
        failed
    }
}
