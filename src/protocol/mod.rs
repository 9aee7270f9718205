//! RESP Protocol Implementation
//!
//! This module implements the subset of the Redis Serialization Protocol
//! (RESP) the server speaks.
//!
//! ## Modules
//!
//! - `types`: Defines the `RespValue` enum and reply serialization
//! - `parser`: Line-oriented decoder for incoming command frames
//!
//! ## Example
//!
//! ```
//! use quillkv::protocol::{parse_message, RespValue};
//! use bytes::Bytes;
//!
//! // Decoding a client request
//! let value = parse_message(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n").unwrap();
//! assert_eq!(value.into_array().map(|args| args.len()), Some(2));
//!
//! // Building a reply
//! let reply = RespValue::bulk_string(Bytes::from("Ariz"));
//! assert_eq!(reply.serialize(), b"$4\r\nAriz\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_message, ParseError, ParseResult, RespParser};
pub use types::RespValue;
