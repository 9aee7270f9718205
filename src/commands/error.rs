//! Command errors and their wire replies.

use crate::protocol::{ParseError, RespValue};
use thiserror::Error;

/// Errors a command invocation can produce. Each one becomes exactly one
/// error reply; none of them closes the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Known command called with the wrong number of arguments
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    /// Malformed option clause or non-integer duration
    #[error("ERR syntax error")]
    Syntax,

    /// Zero or negative duration
    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(&'static str),

    /// Command name not recognized (lower-cased)
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    /// The request could not be decoded into an array of bulk strings
    #[error("ERR protocol error: {0}")]
    Protocol(String),
}

impl From<ParseError> for CommandError {
    fn from(err: ParseError) -> Self {
        CommandError::Protocol(err.to_string())
    }
}

impl From<CommandError> for RespValue {
    fn from(err: CommandError) -> Self {
        RespValue::error(err.to_string())
    }
}
