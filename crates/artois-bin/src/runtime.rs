//! Event loop: drain events, collapse render intents, render once, write the page.

use crate::page::PageWriter;
use anyhow::Result;
use core_events::{Event, GenerationEvent, InputEvent};
use core_generate::{ContextBuffer, GenerateStart, GenerationController};
use core_input::InputShutdown;
use core_model::ContextSnapshot;
use core_render::scheduler::{RenderDelta, RenderScheduler};
use core_render::{BackdropFrame, RenderEngine};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    CommandQuit,
    InputClosed,
    ChannelClosed,
}

impl ShutdownReason {
    fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::CommandQuit => "command_quit",
            ShutdownReason::InputClosed => "input_closed",
            ShutdownReason::ChannelClosed => "channel_closed",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) enum LoopControl {
    Continue,
    Break { reason: ShutdownReason },
}

fn log_shutdown_stage(reason: ShutdownReason, stage: &'static str) {
    info!(
        target: "runtime.shutdown",
        reason = reason.as_str(),
        stage = stage,
        "shutdown_stage"
    );
}

pub struct Runtime {
    controller: GenerationController,
    buffer: ContextBuffer,
    engine: RenderEngine,
    scheduler: RenderScheduler,
    page: PageWriter,
    default_count: u32,
    /// Newest snapshot received since the last render.
    pending_snapshot: Option<ContextSnapshot>,
    /// Input ended while generation was still running; exit once it finishes.
    exit_when_idle: bool,
    last_frame: Option<BackdropFrame>,
    rx: mpsc::Receiver<Event>,
    tx: Option<mpsc::Sender<Event>>,
    source_handles: Vec<JoinHandle<()>>,
    input_shutdown: Option<InputShutdown>,
}

impl Runtime {
    pub fn new(
        controller: GenerationController,
        page: PageWriter,
        default_count: u32,
        rx: mpsc::Receiver<Event>,
        tx: mpsc::Sender<Event>,
    ) -> Self {
        let buffer = controller.buffer().clone();
        Self {
            controller,
            buffer,
            engine: RenderEngine::new(),
            scheduler: RenderScheduler::new(),
            page,
            default_count,
            pending_snapshot: None,
            exit_when_idle: false,
            last_frame: None,
            rx,
            tx: Some(tx),
            source_handles: Vec::new(),
            input_shutdown: None,
        }
    }

    pub fn attach_sources(&mut self, handles: Vec<JoinHandle<()>>, input: Option<InputShutdown>) {
        self.source_handles.extend(handles);
        self.input_shutdown = input;
    }

    pub fn controller_mut(&mut self) -> &mut GenerationController {
        &mut self.controller
    }

    pub fn engine(&self) -> &RenderEngine {
        &self.engine
    }

    pub fn last_frame(&self) -> Option<&BackdropFrame> {
        self.last_frame.as_ref()
    }

    pub async fn run(&mut self) -> Result<ShutdownReason> {
        self.scheduler.mark(RenderDelta::Partial);
        self.finish_cycle();

        let mut reason = ShutdownReason::ChannelClosed;
        'outer: while let Some(event) = self.rx.recv().await {
            if let LoopControl::Break { reason: r } = self.handle_event(event) {
                reason = r;
                break;
            }
            // Everything already queued joins this render.
            while let Ok(event) = self.rx.try_recv() {
                if let LoopControl::Break { reason: r } = self.handle_event(event) {
                    reason = r;
                    break 'outer;
                }
            }
            self.finish_cycle();
        }

        // Batches already queued still reach the page.
        while let Ok(event) = self.rx.try_recv() {
            if let Event::Generation(generation) = event {
                let _ = self.handle_generation(generation);
            }
        }
        self.finish_cycle();

        self.rx.close();
        self.finalize_shutdown(reason).await;
        Ok(reason)
    }

    pub(crate) fn handle_event(&mut self, event: Event) -> LoopControl {
        trace!(target: "runtime.events", kind = event.kind(), "event");
        match event {
            Event::Input(input) => self.handle_input(input),
            Event::Generation(generation) => self.handle_generation(generation),
            Event::Shutdown => self.handle_input_closed(),
        }
    }

    fn handle_input(&mut self, input: InputEvent) -> LoopControl {
        match input {
            InputEvent::Edit(text) => {
                self.buffer.set(text);
                self.scheduler.mark(RenderDelta::Partial);
            }
            InputEvent::Append(text) => {
                self.buffer.append(&text);
                self.scheduler.mark(RenderDelta::Partial);
            }
            InputEvent::Clear => {
                self.buffer.clear();
                self.engine.clear();
                self.pending_snapshot = None;
                self.scheduler.mark(RenderDelta::Partial);
            }
            InputEvent::Generate { count } => {
                let count = count.unwrap_or(self.default_count);
                let start = self.controller.generate(count);
                debug!(target: "runtime.events", count, ?start, "generate");
                if start == GenerateStart::Idle {
                    info!(target: "runtime.events", "generate_zero_count");
                }
            }
            InputEvent::Stop => self.controller.stop(),
            InputEvent::SetBatchStep(step) => {
                let size = self.controller.set_batch_step(step);
                info!(target: "runtime.events", step, batch_size = size, "batch_size_changed");
            }
            InputEvent::SetParam { key, value } => self.controller.set_param(key, value),
            InputEvent::Quit => {
                return LoopControl::Break {
                    reason: ShutdownReason::CommandQuit,
                };
            }
        }
        LoopControl::Continue
    }

    fn handle_generation(&mut self, event: GenerationEvent) -> LoopControl {
        match event {
            GenerationEvent::BatchCompleted {
                snapshot,
                remaining,
            } => {
                debug!(
                    target: "runtime.events",
                    tokens = snapshot.token_count(),
                    remaining,
                    "batch_received"
                );
                self.pending_snapshot = Some(snapshot);
                self.scheduler.mark(RenderDelta::Full);
            }
            GenerationEvent::Failed(message) => {
                warn!(target: "runtime.events", error = %message, "generation_failed");
                if self.exit_when_idle {
                    return LoopControl::Break {
                        reason: ShutdownReason::InputClosed,
                    };
                }
            }
            GenerationEvent::Finished => {
                info!(target: "runtime.events", "generation_finished");
                if self.exit_when_idle {
                    return LoopControl::Break {
                        reason: ShutdownReason::InputClosed,
                    };
                }
            }
        }
        LoopControl::Continue
    }

    fn handle_input_closed(&mut self) -> LoopControl {
        if self.controller.is_running() {
            info!(target: "runtime.events", "input_closed_waiting_for_generation");
            self.exit_when_idle = true;
            LoopControl::Continue
        } else {
            LoopControl::Break {
                reason: ShutdownReason::InputClosed,
            }
        }
    }

    pub(crate) fn finish_cycle(&mut self) {
        let Some(decision) = self.scheduler.consume() else {
            return;
        };
        debug!(
            target: "render.scheduler",
            semantic = ?decision.semantic,
            trailing_partial = decision.trailing_partial,
            "render_decision"
        );

        let mut frame = None;
        if decision.needs_full()
            && let Some(snapshot) = self.pending_snapshot.take()
        {
            frame = Some(self.engine.render_full(snapshot));
        }
        let buffer = self.buffer.get();
        // An edit applied after the task wrote the server text leaves the buffer
        // ahead of the snapshot; reconcile it with a partial pass.
        let diverged = frame.as_ref().is_some_and(|f| f.plain_text != buffer);
        if frame.is_none() || decision.needs_partial() || diverged {
            frame = Some(self.engine.render_partial(&buffer));
        }
        let Some(frame) = frame else {
            return;
        };

        if let Err(e) = self.page.write(&buffer, &frame) {
            error!(target: "runtime.page", error = %e, "page_write_failed");
        }
        self.last_frame = Some(frame);
    }

    async fn finalize_shutdown(&mut self, reason: ShutdownReason) {
        log_shutdown_stage(reason, "begin");
        self.controller.shutdown().await;

        if let Some(shutdown) = self.input_shutdown.take() {
            trace!(target: "runtime.shutdown", "input_task_shutdown_signal");
            shutdown.signal();
        }
        if let Some(tx) = self.tx.take() {
            trace!(target: "runtime.shutdown", "dropping_runtime_sender");
            drop(tx);
        }

        while let Some(handle) = self.source_handles.pop() {
            match tokio::time::timeout(Duration::from_millis(200), handle).await {
                Ok(Ok(_)) => trace!(target: "runtime.shutdown", "event_source_task_stopped"),
                Ok(Err(err)) if err.is_cancelled() => {
                    trace!(target: "runtime.shutdown", "event_source_task_cancelled")
                }
                Ok(Err(err)) => {
                    error!(target: "runtime.shutdown", ?err, "event_source_task_error")
                }
                Err(_) => warn!(target: "runtime.shutdown", "event_source_task_timeout"),
            }
        }

        let metrics = self.engine.metrics_snapshot();
        let deltas = self.scheduler.metrics_snapshot();
        info!(
            target: "runtime.shutdown",
            full_frames = metrics.full_frames,
            partial_frames = metrics.partial_frames,
            empty_frames = metrics.empty_frames,
            highlights_reused = metrics.highlights_reused,
            cache_hits = metrics.cache_hits,
            tokens_recomputed = metrics.tokens_recomputed,
            collapsed_partials = deltas.collapsed_partials,
            "render_metrics"
        );
        log_shutdown_stage(reason, "complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_client::InferenceClient;
    use core_generate::GenerationSettings;
    use core_model::{AttentionMatrix, Token};
    use core_render::RenderKind;

    fn runtime(dir: &tempfile::TempDir, initial: &str) -> Runtime {
        // Endpoint is never contacted by these tests.
        let client = InferenceClient::builder()
            .endpoint("http://127.0.0.1:1/")
            .build()
            .unwrap();
        let (tx, rx) = mpsc::channel(16);
        let controller = GenerationController::new(
            client,
            ContextBuffer::new(initial),
            GenerationSettings::default(),
            tx.clone(),
        );
        Runtime::new(
            controller,
            PageWriter::new(dir.path().join("page.html")),
            20,
            rx,
            tx,
        )
    }

    fn hello_world() -> ContextSnapshot {
        ContextSnapshot::new(
            vec![Token::new("Hello "), Token::new("world")],
            AttentionMatrix::new(vec![vec![0.0], vec![0.0, 0.9]]),
        )
    }

    fn batch(snapshot: ContextSnapshot) -> Event {
        Event::Generation(GenerationEvent::BatchCompleted {
            snapshot,
            remaining: 0,
        })
    }

    #[test]
    fn batch_renders_full_and_writes_page() {
        let dir = tempfile::tempdir().unwrap();
        let mut rt = runtime(&dir, "Hello world");
        rt.handle_event(batch(hello_world()));
        rt.finish_cycle();
        let frame = rt.last_frame().unwrap();
        assert_eq!(frame.kind, RenderKind::Full);
        let html = std::fs::read_to_string(dir.path().join("page.html")).unwrap();
        assert!(html.contains("rgb(255,25,25)"));
    }

    #[test]
    fn edits_in_one_drain_collapse_to_one_partial() {
        let dir = tempfile::tempdir().unwrap();
        let mut rt = runtime(&dir, "Hello world");
        rt.handle_event(batch(hello_world()));
        rt.finish_cycle();
        for text in ["Hello world!", "Hello world!!", "Hello"] {
            rt.handle_event(Event::Input(InputEvent::Edit(text.to_string())));
        }
        rt.finish_cycle();
        let m = rt.engine().metrics_snapshot();
        assert_eq!(m.partial_frames, 1);
        let frame = rt.last_frame().unwrap();
        assert_eq!(frame.plain_text, "Hello");
        assert_eq!(frame.highlighted, 0);
    }

    #[test]
    fn edit_after_batch_in_same_drain_is_reconciled() {
        let dir = tempfile::tempdir().unwrap();
        let mut rt = runtime(&dir, "Hello world");
        rt.handle_event(batch(hello_world()));
        rt.handle_event(Event::Input(InputEvent::Append(" again".into())));
        rt.finish_cycle();
        let frame = rt.last_frame().unwrap();
        assert_eq!(frame.kind, RenderKind::Partial);
        assert_eq!(frame.plain_text, "Hello world again");
        assert_eq!(frame.highlighted, 1);
    }

    #[test]
    fn clear_forgets_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut rt = runtime(&dir, "Hello world");
        rt.handle_event(batch(hello_world()));
        rt.finish_cycle();
        rt.handle_event(Event::Input(InputEvent::Clear));
        rt.finish_cycle();
        assert!(rt.engine().snapshot().is_none());
        let frame = rt.last_frame().unwrap();
        assert_eq!(frame.kind, RenderKind::Empty);
        assert!(frame.plain_text.is_empty());
    }

    #[test]
    fn quit_and_idle_shutdown_break() {
        let dir = tempfile::tempdir().unwrap();
        let mut rt = runtime(&dir, "");
        assert!(matches!(
            rt.handle_event(Event::Input(InputEvent::Quit)),
            LoopControl::Break {
                reason: ShutdownReason::CommandQuit
            }
        ));
        assert!(matches!(
            rt.handle_event(Event::Shutdown),
            LoopControl::Break {
                reason: ShutdownReason::InputClosed
            }
        ));
    }

    #[test]
    fn batch_step_updates_controller_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut rt = runtime(&dir, "");
        rt.handle_event(Event::Input(InputEvent::SetBatchStep(6)));
        rt.handle_event(Event::Input(InputEvent::SetParam {
            key: "max_tokens".into(),
            value: "40".into(),
        }));
        let settings = rt.controller_mut().settings();
        assert_eq!(settings.batch_size, 8);
        assert_eq!(settings.params.get("max_tokens"), Some("40"));
    }
}
