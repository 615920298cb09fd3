use std::time::Instant;

use crate::orchestrator::Orchestrator;
use crate::state::{AppState, ProviderCommand, Tab};

/// Switches views so that only the visible one polls.
#[derive(Debug, Clone)]
pub struct TabController {
    orchestrator: Orchestrator,
}

impl TabController {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator {
        &mut self.orchestrator
    }

    /// Deactivate the current view, then activate `tab`.
    pub fn switch(&mut self, tab: Tab, state: &mut AppState, now: Instant) -> Vec<ProviderCommand> {
        if state.tab == tab && self.orchestrator.is_active(tab) {
            return Vec::new();
        }
        self.orchestrator.deactivate(state.tab);
        state.tab = tab;
        state.input_mode = crate::state::InputMode::Normal;
        state.input_buffer.clear();
        self.orchestrator.activate(tab, state, now)
    }

    pub fn next(&mut self, state: &mut AppState, now: Instant) -> Vec<ProviderCommand> {
        let tab = state.tab.next();
        self.switch(tab, state, now)
    }

    pub fn prev(&mut self, state: &mut AppState, now: Instant) -> Vec<ProviderCommand> {
        let tab = state.tab.prev();
        self.switch(tab, state, now)
    }

    /// Start the visible view over, e.g. once identity or the subject changes.
    pub fn reactivate(&mut self, state: &mut AppState, now: Instant) -> Vec<ProviderCommand> {
        self.orchestrator.deactivate(state.tab);
        self.orchestrator.activate(state.tab, state, now)
    }
}
