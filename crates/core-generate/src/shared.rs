//! State shared between the runtime and the generation task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::watch;

/// Generations still to run. Checked at the top of each loop iteration.
#[derive(Debug, Clone, Default)]
pub struct RemainingCounter(Arc<AtomicU32>);

impl RemainingCounter {
    pub fn new(n: u32) -> Self {
        Self(Arc::new(AtomicU32::new(n)))
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, n: u32) {
        self.0.store(n, Ordering::SeqCst);
    }

    pub fn zero(&self) {
        self.set(0);
    }

    /// Take up to `max` generations for the next request. Returns how many
    /// were taken; zero once the counter is drained.
    pub fn reserve(&self, max: u32) -> u32 {
        let prev = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some(v.saturating_sub(max))
            })
            .unwrap_or_default();
        prev.min(max)
    }
}

/// The editable text buffer. The generation task reads it at the top of each
/// iteration and writes the server's text back after each batch.
#[derive(Debug, Clone)]
pub struct ContextBuffer {
    tx: Arc<watch::Sender<String>>,
}

impl Default for ContextBuffer {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl ContextBuffer {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(initial.into())),
        }
    }

    pub fn get(&self) -> String {
        self.tx.borrow().clone()
    }

    pub fn set(&self, text: impl Into<String>) {
        self.tx.send_replace(text.into());
    }

    pub fn append(&self, text: &str) {
        self.tx.send_modify(|s| s.push_str(text));
    }

    pub fn clear(&self) {
        self.tx.send_modify(String::clear);
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Receiver that observes every change.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }
}
