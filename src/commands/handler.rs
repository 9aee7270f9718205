//! Command Handler
//!
//! Turns a decoded request into a reply. A request must be an array of bulk
//! strings; the first element names the command (case-insensitive) and the
//! rest are its operands.
//!
//! ## Supported Commands
//!
//! - `PING` - Replies `PONG`, ignoring any arguments
//! - `ECHO [message]` - Replies with the message (empty if absent)
//! - `SET key value [KEEPTTL | NX | XX]`
//! - `SET key value EX seconds | PX milliseconds [NX | XX]`
//! - `GET key` - Replies with the value, or a null bulk string
//! - `INFO section` - Only `replication` has content
//!
//! ```text
//! RespValue ──► execute() ──► dispatch() ──► cmd_*() ──► StorageEngine
//!                   │                           │
//!                   └──── CommandError ◄────────┘
//!                              │
//!                              ▼
//!                        -ERR ... reply
//! ```

use crate::commands::error::CommandError;
use crate::info::ReplicationInfo;
use crate::protocol::RespValue;
use crate::storage::{SetOptions, StorageEngine};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

/// Executes commands against the shared storage engine.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    /// The storage engine
    storage: Arc<StorageEngine>,
    /// Static replication section for INFO
    replication: Arc<ReplicationInfo>,
}

impl CommandHandler {
    /// Creates a new command handler over the given storage engine.
    pub fn new(storage: Arc<StorageEngine>, replication: Arc<ReplicationInfo>) -> Self {
        Self {
            storage,
            replication,
        }
    }

    /// Executes a decoded request and returns the reply to send.
    ///
    /// Every invocation produces exactly one reply; failures become error
    /// replies rather than closing the connection.
    pub fn execute(&self, command: RespValue) -> RespValue {
        match self.try_execute(command) {
            Ok(reply) => reply,
            Err(err) => err.into(),
        }
    }

    fn try_execute(&self, command: RespValue) -> Result<RespValue, CommandError> {
        let args = into_arguments(command)?;
        let (name, operands) = args
            .split_first()
            .ok_or_else(|| CommandError::Protocol("empty command".to_string()))?;

        let name = String::from_utf8_lossy(name).to_lowercase();
        trace!(command = %name, operands = operands.len(), "Dispatching command");

        self.dispatch(&name, operands)
    }

    /// Dispatches a command to its handler.
    fn dispatch(&self, cmd: &str, args: &[Bytes]) -> Result<RespValue, CommandError> {
        match cmd {
            "ping" => Ok(RespValue::pong()),
            "echo" => Ok(self.cmd_echo(args)),
            "set" => self.cmd_set(args),
            "get" => self.cmd_get(args),
            "info" => self.cmd_info(args),
            _ => Err(CommandError::UnknownCommand(cmd.to_string())),
        }
    }

    /// ECHO [message]
    fn cmd_echo(&self, args: &[Bytes]) -> RespValue {
        match args.first() {
            Some(msg) => RespValue::simple_string(String::from_utf8_lossy(msg)),
            None => RespValue::simple_string(""),
        }
    }

    /// SET key value [option clause]
    fn cmd_set(&self, args: &[Bytes]) -> Result<RespValue, CommandError> {
        if args.len() < 2 {
            return Err(CommandError::WrongArity("set"));
        }

        let options = SetOptions::parse(&args[2..], Instant::now())?;

        if self.storage.set(args[0].clone(), args[1].clone(), options) {
            Ok(RespValue::ok())
        } else {
            Ok(RespValue::null())
        }
    }

    /// GET key
    fn cmd_get(&self, args: &[Bytes]) -> Result<RespValue, CommandError> {
        let key = args.first().ok_or(CommandError::WrongArity("get"))?;

        Ok(match self.storage.read(key) {
            Some(value) => RespValue::simple_string(String::from_utf8_lossy(&value)),
            None => RespValue::null(),
        })
    }

    /// INFO section
    fn cmd_info(&self, args: &[Bytes]) -> Result<RespValue, CommandError> {
        let section = args.first().ok_or(CommandError::WrongArity("info"))?;

        if section.eq_ignore_ascii_case(b"replication") {
            Ok(RespValue::bulk_string(self.replication.render()))
        } else {
            Ok(RespValue::bulk_string(Bytes::new()))
        }
    }
}

/// Unwraps a request into its bulk-string arguments.
fn into_arguments(command: RespValue) -> Result<Vec<Bytes>, CommandError> {
    let elements = command.into_array().ok_or_else(|| {
        CommandError::Protocol("expected an array of bulk strings".to_string())
    })?;

    elements
        .into_iter()
        .map(|element| match element {
            RespValue::BulkString(b) => Ok(b),
            _ => Err(CommandError::Protocol(
                "expected an array of bulk strings".to_string(),
            )),
        })
        .collect()
}
