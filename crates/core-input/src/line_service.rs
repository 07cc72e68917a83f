use crate::command::parse_line;
use core_events::{
    ASYNC_INPUT_STARTS, ASYNC_INPUT_STOP_CHANNEL, ASYNC_INPUT_STOP_EOF, ASYNC_INPUT_STOP_ERROR,
    AsyncEventSource, CHANNEL_SEND_FAILURES, Event, INPUT_COMMANDS, INPUT_LINES, InputEvent,
};
use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{Notify, mpsc, mpsc::Sender};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{LinesStream, ReceiverStream};
use tokio_stream::{Stream, StreamExt};
use tracing::{Instrument, debug, info, trace, warn};

#[derive(Clone, Debug)]
pub struct InputShutdown {
    notify: Arc<Notify>,
}

impl InputShutdown {
    pub fn signal(&self) {
        self.notify.notify_one();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExitReason {
    ShutdownSignal,
    ChannelClosed,
    EndOfInput,
    ReadError,
}

impl ExitReason {
    fn as_str(&self) -> &'static str {
        match self {
            ExitReason::ShutdownSignal => "shutdown_signal",
            ExitReason::ChannelClosed => "channel_closed",
            ExitReason::EndOfInput => "end_of_input",
            ExitReason::ReadError => "read_error",
        }
    }
}

/// Line-oriented input source. Reads lines from a stream (a buffered async
/// reader, or the stdin thread in the binary) and forwards decoded commands
/// as events.
///
/// On end of input the source sends `Event::Shutdown`; the runtime decides
/// when to actually exit.
pub struct LineInputSource<S> {
    lines: S,
    notify: Arc<Notify>,
}

impl<R> LineInputSource<LinesStream<R>>
where
    R: AsyncBufRead + Send + Unpin + 'static,
{
    pub fn new(reader: R) -> (Self, InputShutdown) {
        Self::from_lines(LinesStream::new(reader.lines()))
    }
}

impl<S> LineInputSource<S>
where
    S: Stream<Item = io::Result<String>> + Send + Unpin + 'static,
{
    pub fn from_lines(lines: S) -> (Self, InputShutdown) {
        let notify = Arc::new(Notify::new());
        (
            Self {
                lines,
                notify: notify.clone(),
            },
            InputShutdown { notify },
        )
    }

    pub async fn run(self, sender: Sender<Event>) {
        info!(target: "input.stdin", "input_task_started");
        ASYNC_INPUT_STARTS.fetch_add(1, Ordering::Relaxed);
        let mut lines = self.lines;
        let reason = loop {
            let next = tokio::select! {
                biased;
                _ = self.notify.notified() => break ExitReason::ShutdownSignal,
                next = lines.next() => next,
            };
            let line = match next {
                None => break ExitReason::EndOfInput,
                Some(Ok(line)) => line,
                Some(Err(err)) => {
                    warn!(target: "input.stdin", error_kind = ?err.kind(), "input_read_error");
                    break ExitReason::ReadError;
                }
            };
            INPUT_LINES.fetch_add(1, Ordering::Relaxed);
            let Some(event) = decode(&line) else {
                continue;
            };
            if !send(&sender, Event::Input(event)).await {
                break ExitReason::ChannelClosed;
            }
        };

        match reason {
            ExitReason::EndOfInput => {
                ASYNC_INPUT_STOP_EOF.fetch_add(1, Ordering::Relaxed);
                let _ = send(&sender, Event::Shutdown).await;
            }
            ExitReason::ReadError => {
                ASYNC_INPUT_STOP_ERROR.fetch_add(1, Ordering::Relaxed);
                let _ = send(&sender, Event::Shutdown).await;
            }
            ExitReason::ChannelClosed => {
                ASYNC_INPUT_STOP_CHANNEL.fetch_add(1, Ordering::Relaxed);
            }
            ExitReason::ShutdownSignal => {}
        }
        info!(target: "input.stdin", reason = reason.as_str(), "input_task_stopped");
    }
}

impl<S> AsyncEventSource for LineInputSource<S>
where
    S: Stream<Item = io::Result<String>> + Send + Unpin + 'static,
{
    fn name(&self) -> &'static str {
        "line_input"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let span = tracing::debug_span!(target: "input.stdin", "input_task");
        tokio::spawn(self.run(tx).instrument(span))
    }
}

fn decode(line: &str) -> Option<InputEvent> {
    match parse_line(line) {
        Ok(event) => {
            if line.starts_with(':') && !line.starts_with("::") {
                INPUT_COMMANDS.fetch_add(1, Ordering::Relaxed);
                debug!(target: "input.stdin", ?event, "command");
            } else {
                trace!(target: "input.stdin", len = line.len(), "append_line");
            }
            Some(event)
        }
        Err(err) => {
            warn!(target: "input.stdin", error = %err, "command_rejected");
            None
        }
    }
}

async fn send(sender: &Sender<Event>, event: Event) -> bool {
    if sender.send(event).await.is_ok() {
        true
    } else {
        CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
        false
    }
}

pub type ReaderLines = ReceiverStream<io::Result<String>>;

/// Stdin-backed source used by the binary.
///
/// Stdin is read on a detached OS thread. A blocked read there never holds up
/// runtime shutdown, so `:quit` exits while the terminal is still open.
pub fn stdin_source() -> io::Result<(LineInputSource<ReaderLines>, InputShutdown)> {
    let lines = spawn_line_reader("artois-stdin", io::BufReader::new(io::stdin()))?;
    Ok(LineInputSource::from_lines(lines))
}

/// Forward lines from a blocking reader through a channel, one OS thread per
/// reader. The thread ends at end of input, on a read error (forwarded as the
/// last item), or once the receiving side is gone.
pub fn spawn_line_reader<R>(name: &str, reader: R) -> io::Result<ReaderLines>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(64);
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
            trace!(target: "input.stdin", "line_reader_thread_exit");
        })?;
    Ok(ReceiverStream::new(rx))
}
