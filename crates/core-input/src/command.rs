//! Line command grammar.
//!
//! A line starting with `:` is a command; `::` escapes a literal leading
//! colon. Every other line is text appended to the buffer, newline included.

use core_events::InputEvent;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` expects {expected}")]
    BadArgument {
        command: &'static str,
        expected: &'static str,
    },
}

/// Decode one input line (without its terminator) into an event.
pub fn parse_line(line: &str) -> Result<InputEvent, CommandError> {
    if let Some(escaped) = line.strip_prefix("::") {
        return Ok(InputEvent::Append(format!(":{escaped}\n")));
    }
    let Some(body) = line.strip_prefix(':') else {
        return Ok(InputEvent::Append(format!("{line}\n")));
    };

    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim_start()),
        None => (body, ""),
    };

    match name {
        "generate" | "g" => {
            let count = if rest.trim().is_empty() {
                None
            } else {
                Some(rest.trim().parse::<u32>().map_err(|_| CommandError::BadArgument {
                    command: "generate",
                    expected: "a non-negative count",
                })?)
            };
            Ok(InputEvent::Generate { count })
        }
        "stop" => Ok(InputEvent::Stop),
        "clear" => Ok(InputEvent::Clear),
        "batch" => {
            let step = rest
                .trim()
                .parse::<u32>()
                .map_err(|_| CommandError::BadArgument {
                    command: "batch",
                    expected: "a step between 1 and 26",
                })?;
            Ok(InputEvent::SetBatchStep(step))
        }
        "set" => {
            let (key, value) = rest
                .split_once(char::is_whitespace)
                .map(|(k, v)| (k, v.trim()))
                .unwrap_or((rest.trim(), ""));
            if key.is_empty() {
                return Err(CommandError::BadArgument {
                    command: "set",
                    expected: "a key and a value",
                });
            }
            Ok(InputEvent::SetParam {
                key: key.to_string(),
                value: value.to_string(),
            })
        }
        // Verbatim: the rest of the line replaces the buffer, spaces included.
        "edit" => Ok(InputEvent::Edit(rest.to_string())),
        "quit" | "q" => Ok(InputEvent::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_lines_append_with_newline() {
        assert_eq!(
            parse_line("Once upon a time"),
            Ok(InputEvent::Append("Once upon a time\n".into()))
        );
        assert_eq!(parse_line(""), Ok(InputEvent::Append("\n".into())));
    }

    #[test]
    fn double_colon_escapes() {
        assert_eq!(
            parse_line("::quit"),
            Ok(InputEvent::Append(":quit\n".into()))
        );
    }

    #[test]
    fn generate_with_and_without_count() {
        assert_eq!(
            parse_line(":generate"),
            Ok(InputEvent::Generate { count: None })
        );
        assert_eq!(
            parse_line(":generate 5"),
            Ok(InputEvent::Generate { count: Some(5) })
        );
        assert_eq!(parse_line(":g 0"), Ok(InputEvent::Generate { count: Some(0) }));
        assert!(matches!(
            parse_line(":generate lots"),
            Err(CommandError::BadArgument { command: "generate", .. })
        ));
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse_line(":stop"), Ok(InputEvent::Stop));
        assert_eq!(parse_line(":clear"), Ok(InputEvent::Clear));
        assert_eq!(parse_line(":quit"), Ok(InputEvent::Quit));
        assert_eq!(parse_line(":q"), Ok(InputEvent::Quit));
    }

    #[test]
    fn batch_requires_number() {
        assert_eq!(parse_line(":batch 4"), Ok(InputEvent::SetBatchStep(4)));
        assert!(parse_line(":batch").is_err());
    }

    #[test]
    fn set_splits_key_and_value() {
        assert_eq!(
            parse_line(":set temperature 0.7"),
            Ok(InputEvent::SetParam {
                key: "temperature".into(),
                value: "0.7".into()
            })
        );
        assert_eq!(
            parse_line(":set stop two words"),
            Ok(InputEvent::SetParam {
                key: "stop".into(),
                value: "two words".into()
            })
        );
        assert!(parse_line(":set").is_err());
    }

    #[test]
    fn edit_keeps_text_verbatim() {
        assert_eq!(
            parse_line(":edit The cat  sat"),
            Ok(InputEvent::Edit("The cat  sat".into()))
        );
        assert_eq!(parse_line(":edit"), Ok(InputEvent::Edit(String::new())));
    }

    #[test]
    fn unknown_command_is_error() {
        assert_eq!(
            parse_line(":frobnicate now"),
            Err(CommandError::Unknown("frobnicate".into()))
        );
    }
}
