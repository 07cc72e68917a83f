//! Generation task supervisor.
//!
//! At most one generation task runs at a time. `generate(n)` stores `n` in the
//! remaining counter; if no task is running it spawns one, otherwise the
//! running task simply keeps going with the new count. Each iteration reserves
//! its batch from the counter before sending, and reads the batch size and the
//! buffer afresh, so a `stop()` or a batch-size change applies from the next
//! request on. A request already in flight is never cancelled: its result is
//! written back and reported, and it does not count against a `generate`
//! issued while it was outstanding.
//!
//! The task reports through the runtime channel:
//! `BatchCompleted` per response, then `Finished`; or `Failed` when a request
//! errors, after which the counter is zeroed and the task halts.

use crate::batch::{batch_size_to_slider, slider_to_batch_size};
use crate::params::GenerationParams;
use crate::shared::{ContextBuffer, RemainingCounter};
use core_client::{GenerateRequest, InferenceClient};
use core_events::{CHANNEL_SEND_FAILURES, Event, GenerationEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::Sender;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info};

/// Per-request settings, re-read at the top of every iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    pub batch_size: u32,
    pub params: GenerationParams,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            batch_size: 1,
            params: GenerationParams::default(),
        }
    }
}

/// What a `generate` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateStart {
    /// A new task was spawned.
    Spawned,
    /// A task was already running; only its counter was reset.
    Reset,
    /// Count was zero; nothing to do.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationStatus {
    pub running: bool,
    /// Generations not yet sent; an in-flight batch is already subtracted.
    pub remaining: u32,
    pub batch_size: u32,
    /// Batch-size control position matching `batch_size`; fractional when the
    /// size was set directly and lies between two steps.
    pub batch_step: f64,
}

pub struct GenerationController {
    client: InferenceClient,
    buffer: ContextBuffer,
    remaining: RemainingCounter,
    running: Arc<AtomicBool>,
    settings: Arc<watch::Sender<GenerationSettings>>,
    events: Sender<Event>,
    task: Option<JoinHandle<()>>,
}

impl GenerationController {
    pub fn new(
        client: InferenceClient,
        buffer: ContextBuffer,
        settings: GenerationSettings,
        events: Sender<Event>,
    ) -> Self {
        Self {
            client,
            buffer,
            remaining: RemainingCounter::default(),
            running: Arc::new(AtomicBool::new(false)),
            settings: Arc::new(watch::Sender::new(settings)),
            events,
            task: None,
        }
    }

    pub fn buffer(&self) -> &ContextBuffer {
        &self.buffer
    }

    /// Run `count` more generations.
    pub fn generate(&mut self, count: u32) -> GenerateStart {
        self.remaining.set(count);
        if count == 0 {
            return GenerateStart::Idle;
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!(target: "generate.loop", count, "generation_counter_reset");
            return GenerateStart::Reset;
        }
        let task = GenerationTask {
            client: self.client.clone(),
            buffer: self.buffer.clone(),
            remaining: self.remaining.clone(),
            running: self.running.clone(),
            settings: self.settings.clone(),
            events: self.events.clone(),
        };
        info!(target: "generate.loop", count, "generation_spawned");
        let span = tracing::debug_span!(target: "generate.loop", "generation_task");
        self.task = Some(tokio::spawn(task.run().instrument(span)));
        GenerateStart::Spawned
    }

    /// Request a stop after the in-flight request (if any) completes.
    pub fn stop(&self) {
        let left = self.remaining.get();
        self.remaining.zero();
        info!(target: "generate.loop", discarded = left, "generation_stop");
    }

    pub fn status(&self) -> GenerationStatus {
        let batch_size = self.settings.borrow().batch_size;
        GenerationStatus {
            running: self.running.load(Ordering::SeqCst),
            remaining: self.remaining.get(),
            batch_size,
            batch_step: batch_size_to_slider(batch_size),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_batch_size(&self, batch_size: u32) {
        let batch_size = batch_size.max(1);
        self.settings.send_modify(|s| s.batch_size = batch_size);
        debug!(target: "generate.loop", batch_size, "batch_size_set");
    }

    /// Move the batch-size control; returns the resulting batch size.
    pub fn set_batch_step(&self, step: u32) -> u32 {
        let size = slider_to_batch_size(step);
        self.set_batch_size(size);
        size
    }

    pub fn set_param(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        debug!(target: "generate.loop", key = %key, "param_set");
        self.settings.send_modify(|s| s.params.set(key, value));
    }

    pub fn settings(&self) -> GenerationSettings {
        self.settings.borrow().clone()
    }

    /// Stop and abort the task without waiting for an in-flight request.
    pub async fn shutdown(&mut self) {
        self.remaining.zero();
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

struct GenerationTask {
    client: InferenceClient,
    buffer: ContextBuffer,
    remaining: RemainingCounter,
    running: Arc<AtomicBool>,
    settings: Arc<watch::Sender<GenerationSettings>>,
    events: Sender<Event>,
}

enum Outcome {
    Drained,
    Failed,
    ChannelClosed,
}

impl GenerationTask {
    async fn run(self) {
        loop {
            let outcome = self.drain().await;
            if matches!(outcome, Outcome::ChannelClosed) {
                self.running.store(false, Ordering::SeqCst);
                return;
            }
            if matches!(outcome, Outcome::Drained) {
                self.emit(GenerationEvent::Finished).await;
            }
            self.running.store(false, Ordering::SeqCst);
            // A `generate` that raced with the exit saw `running == true` and
            // only set the counter; pick that work up here.
            if self.remaining.get() == 0
                || self
                    .running
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
            {
                break;
            }
            debug!(target: "generate.loop", remaining = self.remaining.get(), "generation_resumed");
        }
        info!(target: "generate.loop", "generation_task_exit");
    }

    async fn drain(&self) -> Outcome {
        loop {
            let settings = self.settings.borrow().clone();
            let batch = self.remaining.reserve(settings.batch_size.max(1));
            if batch == 0 {
                return Outcome::Drained;
            }
            let request = GenerateRequest::new(self.buffer.get(), batch, settings.params.as_map());
            match self.client.generate(&request).await {
                Ok(snapshot) => {
                    if snapshot.token_count() > 0 {
                        self.buffer.set(snapshot.text());
                    }
                    let left = self.remaining.get();
                    debug!(
                        target: "generate.loop",
                        batch,
                        remaining = left,
                        tokens = snapshot.token_count(),
                        "batch_completed"
                    );
                    if !self
                        .emit(GenerationEvent::BatchCompleted {
                            snapshot,
                            remaining: left,
                        })
                        .await
                    {
                        return Outcome::ChannelClosed;
                    }
                }
                Err(err) => {
                    error!(target: "generate.loop", error = %err, batch, "generation_failed");
                    self.remaining.zero();
                    if !self.emit(GenerationEvent::Failed(err.to_string())).await {
                        return Outcome::ChannelClosed;
                    }
                    return Outcome::Failed;
                }
            }
        }
    }

    async fn emit(&self, event: GenerationEvent) -> bool {
        if self.events.send(Event::Generation(event)).await.is_ok() {
            true
        } else {
            CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
            false
        }
    }
}
