use crate::buffer::TriggerBuffer;
use crate::context::ContextGate;
use crate::expansion::ExpansionEngine;
use crate::keyboard::KeyEvent;
use crate::storage::{lock_repository, SharedRepository};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Everything the keystroke stream mutates, owned by the one component that
/// consumes it. Events are handled strictly one after another.
pub struct KeystrokePipeline {
    buffer: TriggerBuffer,
    gate: ContextGate,
    repository: SharedRepository,
    engine: Arc<ExpansionEngine>,
    triggers_disabled: Arc<AtomicBool>,
}

impl KeystrokePipeline {
    pub fn new(gate: ContextGate, repository: SharedRepository, engine: Arc<ExpansionEngine>) -> Self {
        Self {
            buffer: TriggerBuffer::new(),
            gate,
            repository,
            engine,
            triggers_disabled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an externally controlled on/off switch.
    pub fn with_triggers_switch(mut self, disabled: Arc<AtomicBool>) -> Self {
        self.triggers_disabled = disabled;
        self
    }

    pub fn triggers_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.triggers_disabled)
    }

    pub fn set_triggers_disabled(&self, disabled: bool) {
        self.triggers_disabled.store(disabled, Ordering::SeqCst);
    }

    pub fn triggers_disabled(&self) -> bool {
        self.triggers_disabled.load(Ordering::SeqCst)
    }

    pub fn buffer(&self) -> &TriggerBuffer {
        &self.buffer
    }

    pub fn engine(&self) -> &Arc<ExpansionEngine> {
        &self.engine
    }

    /// Feed one raw event. Returns the expansion task when a trigger fired.
    pub fn handle(&mut self, event: &KeyEvent) -> Option<JoinHandle<()>> {
        if !event.is_down() {
            return None;
        }
        // Dropped, not queued, while an expansion is in flight.
        if self.engine.guard().is_held() || self.triggers_disabled() {
            return None;
        }

        let eligibility = self.gate.check();
        if !eligibility.is_eligible() {
            if !self.buffer.is_empty() {
                debug!("Left allowed context ({:?}), clearing buffer", eligibility);
                self.buffer.clear();
            }
            return None;
        }

        let update = self.buffer.apply(event.input());
        trace!(buffer = %self.buffer.as_string(), ?update, "Key processed");
        if !update.should_match() {
            return None;
        }

        let snippet = {
            let repository = lock_repository(&self.repository);
            self.buffer.find_match(repository.list()).cloned()
        }?;

        info!("Trigger matched: {}", snippet.trigger);
        self.buffer.clear();
        Some(self.engine.expand(snippet))
    }
}
