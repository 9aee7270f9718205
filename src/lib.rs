//! # QuillKV - A Small In-Memory Key-Value Server
//!
//! QuillKV speaks a subset of the Redis Serialization Protocol (RESP) over
//! TCP. Clients send commands as arrays of bulk strings; the server executes
//! them against one shared keyspace and writes back a reply.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           QuillKV                            │
//! │                                                              │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐       │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │       │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │       │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘       │
//! │                            │                  │              │
//! │                            ▼                  ▼              │
//! │                     ┌─────────────┐    ┌─────────────────┐   │
//! │                     │ RESP Parser │    │ StorageEngine   │   │
//! │                     └─────────────┘    │ Mutex<HashMap>  │   │
//! │                                        └─────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use quillkv::commands::CommandHandler;
//! use quillkv::connection::handle_connection;
//! use quillkv::info::ReplicationInfo;
//! use quillkv::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = Arc::new(StorageEngine::new());
//!     let replication = Arc::new(ReplicationInfo::generate()?);
//!     let handler = CommandHandler::new(storage, replication);
//!
//!     let listener = TcpListener::bind("0.0.0.0:6379").await?;
//!     loop {
//!         let (stream, addr) = listener.accept().await?;
//!         tokio::spawn(handle_connection(stream, addr, handler.clone()));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`
//! - `ECHO [message]`
//! - `SET key value [KEEPTTL | NX | XX]`
//! - `SET key value EX seconds | PX milliseconds [NX | XX]`
//! - `GET key`
//! - `INFO replication`
//!
//! ## Expiry
//!
//! Keys expire lazily: an expired key is removed by the first command that
//! reads or overwrites it. There is no background sweeper.

pub mod commands;
pub mod config;
pub mod connection;
pub mod info;
pub mod protocol;
pub mod storage;

pub use commands::CommandHandler;
pub use config::Config;
pub use connection::handle_connection;
pub use info::ReplicationInfo;
pub use protocol::{ParseError, RespParser, RespValue};
pub use storage::StorageEngine;

/// The default port QuillKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// Version of QuillKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
