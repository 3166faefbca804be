//! Callback system for breaker state transitions

use std::sync::Arc;

/// Hook receiving the breaker name
pub type Callback = Arc<dyn Fn(&str) + Send + Sync>;

/// Callbacks for breaker events
///
/// Hooks run on the calling thread after the state lock is released, so a
/// hook may inspect the breaker it is attached to.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_open: Option<Callback>,
    pub on_close: Option<Callback>,
    pub on_half_open: Option<Callback>,
    pub on_reject: Option<Callback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger_open(&self, circuit: &str) {
        if let Some(ref callback) = self.on_open {
            callback(circuit);
        }
    }

    pub fn trigger_close(&self, circuit: &str) {
        if let Some(ref callback) = self.on_close {
            callback(circuit);
        }
    }

    pub fn trigger_half_open(&self, circuit: &str) {
        if let Some(ref callback) = self.on_half_open {
            callback(circuit);
        }
    }

    pub fn trigger_reject(&self, circuit: &str) {
        if let Some(ref callback) = self.on_reject {
            callback(circuit);
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_half_open", &self.on_half_open.is_some())
            .field("on_reject", &self.on_reject.is_some())
            .finish()
    }
}
