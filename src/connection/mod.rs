//! Connection Module
//!
//! Each accepted client is served by its own Tokio task running a
//! [`ConnectionHandler`] loop. Tasks share nothing but the storage engine held
//! by their [`CommandHandler`](crate::commands::CommandHandler).
//!
//! ## Example
//!
//! ```ignore
//! use quillkv::connection::handle_connection;
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler.clone()));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler};
