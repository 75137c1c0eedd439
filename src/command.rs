//! Parsing of raw queue message bodies into a normalized command.
//!
//! Three wire shapes are accepted, tried in strict order:
//!
//! 1. A JSON string: the whole payload decodes to a string that is
//!    whitespace-tokenized (`"ls -la"` becomes `ls` with args `["-la"]`).
//! 2. A JSON object with a string `command` field, an optional `args` array
//!    and an optional `cwd` string.
//! 3. Legacy plain text, used only when JSON decoding fails: either a
//!    `command=<rest>]` pattern whose `<rest>` is tokenized as in shape 1,
//!    or the entire body tokenized as in shape 1.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("message body is empty")]
    EmptyBody,

    #[error("message body does not contain a command")]
    MissingCommand,
}

/// A normalized command ready for the allowlist check and execution.
///
/// `program` keeps whatever the sender supplied, including any leading path;
/// only the allowlist comparison strips path segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

/// The two JSON wire shapes. With `untagged`, serde tries the variants in
/// declaration order and the first one that decodes wins.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WirePayload {
    Line(String),
    Structured(StructuredCommand),
}

#[derive(Debug, Deserialize)]
struct StructuredCommand {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    cwd: Option<String>,
}

impl CommandRequest {
    /// Parse a raw message body into a command.
    ///
    /// Never panics; a body that fits none of the accepted shapes yields a
    /// [`ParseError`].
    pub fn parse(body: &str) -> Result<Self, ParseError> {
        if body.trim().is_empty() {
            return Err(ParseError::EmptyBody);
        }

        match serde_json::from_str::<WirePayload>(body) {
            Ok(WirePayload::Line(line)) => Self::from_line(&line),
            Ok(WirePayload::Structured(cmd)) => Self::from_structured(cmd),
            Err(_) => Self::from_legacy(body),
        }
    }

    /// Tokenize a command line on runs of whitespace; the first token is the
    /// program, the rest are its arguments.
    fn from_line(line: &str) -> Result<Self, ParseError> {
        let mut tokens = line.split_whitespace();
        let program = tokens.next().ok_or(ParseError::MissingCommand)?;
        Ok(Self {
            program: program.to_string(),
            args: tokens.map(String::from).collect(),
            working_dir: None,
        })
    }

    fn from_structured(cmd: StructuredCommand) -> Result<Self, ParseError> {
        if cmd.command.trim().is_empty() {
            return Err(ParseError::MissingCommand);
        }
        Ok(Self {
            program: cmd.command,
            args: cmd.args,
            working_dir: cmd.cwd.map(PathBuf::from),
        })
    }

    /// Legacy plain-text fallback. A body containing the literal `command=`
    /// marker is tokenized from the marker up to (excluding) the next `]`;
    /// anything else is tokenized whole.
    fn from_legacy(body: &str) -> Result<Self, ParseError> {
        if let Some(start) = body.find("command=") {
            let rest = &body[start + "command=".len()..];
            let rest = rest.split(']').next().unwrap_or(rest);
            return Self::from_line(rest);
        }
        Self::from_line(body)
    }
}
