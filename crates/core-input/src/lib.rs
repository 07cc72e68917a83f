//! Line-oriented input for the runtime.
//!
//! `LineInputSource` turns lines from stdin (or any buffered reader) into
//! `InputEvent`s using the `command` grammar and registers with the event
//! source registry like every other producer.

pub mod command;
mod line_service;

pub use command::{CommandError, parse_line};
pub use line_service::{
    InputShutdown, LineInputSource, ReaderLines, spawn_line_reader, stdin_source,
};
