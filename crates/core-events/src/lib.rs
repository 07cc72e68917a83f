//! Core event types and channel helpers for Artois.
//!
//! Every producer (stdin commands, the generation task) pushes into one bounded
//! mpsc channel; the runtime drains it and renders once per drain.

use core_model::ContextSnapshot;
use std::sync::atomic::AtomicU64;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

/// Bounded channel capacity. Producers await on a full channel instead of dropping events.
pub const EVENT_CHANNEL_CAP: usize = 1024;

pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static INPUT_LINES: AtomicU64 = AtomicU64::new(0); // stdin lines read
pub static INPUT_COMMANDS: AtomicU64 = AtomicU64::new(0); // lines parsed as `:` commands
// Input task lifecycle
pub static ASYNC_INPUT_STARTS: AtomicU64 = AtomicU64::new(0);
pub static ASYNC_INPUT_STOP_CHANNEL: AtomicU64 = AtomicU64::new(0);
pub static ASYNC_INPUT_STOP_EOF: AtomicU64 = AtomicU64::new(0);
pub static ASYNC_INPUT_STOP_ERROR: AtomicU64 = AtomicU64::new(0);

/// Top-level event enum consumed by the central event loop.
#[derive(Debug, Clone)]
pub enum Event {
    Input(InputEvent),
    Generation(GenerationEvent),
    Shutdown,
}

/// User intents decoded from the input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Replace the whole buffer.
    Edit(String),
    /// Append text to the end of the buffer.
    Append(String),
    /// Start (or restart) generation; `None` uses the configured count.
    Generate { count: Option<u32> },
    Stop,
    /// Empty the buffer and forget the current snapshot.
    Clear,
    /// Move the batch-size control to a step position.
    SetBatchStep(u32),
    SetParam { key: String, value: String },
    Quit,
}

/// Progress reported by the generation task.
#[derive(Debug, Clone)]
pub enum GenerationEvent {
    /// One batch came back; `remaining` is the counter after this batch.
    BatchCompleted {
        snapshot: ContextSnapshot,
        remaining: u32,
    },
    /// A request failed; the loop has halted.
    Failed(String),
    /// The counter reached zero or a stop was honored.
    Finished,
}

impl Event {
    /// Short stable name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Input(_) => "input",
            Event::Generation(GenerationEvent::BatchCompleted { .. }) => "batch_completed",
            Event::Generation(GenerationEvent::Failed(_)) => "generation_failed",
            Event::Generation(GenerationEvent::Finished) => "generation_finished",
            Event::Shutdown => "shutdown",
        }
    }
}

/// Trait implemented by any async event producer. Implementors usually hold configuration and
/// spawn one background task that pushes `Event`s into the shared channel.
pub trait AsyncEventSource: Send + 'static {
    /// Stable identifier used in logs.
    fn name(&self) -> &'static str;
    /// Consume self and spawn the background task. Implementors stop when
    /// `tx.send(..).await` returns Err (channel closed) or on their own stop condition.
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources, spawned together at startup.
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl Default for EventSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Spawn all registered sources, returning their JoinHandles. Each source receives its own
    /// `Sender` clone; the caller drops its last clone during shutdown so sources observe the
    /// closed channel and exit.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        // Drain so a second call spawns nothing.
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}
