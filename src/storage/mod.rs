//! Storage Engine Module
//!
//! A single mutex-guarded map from key to value with optional expiry.
//! Expired keys are removed lazily, by the first operation that notices them.
//!
//! ## Example
//!
//! ```
//! use quillkv::storage::{ExpiryOption, SetCondition, SetOptions, StorageEngine};
//! use bytes::Bytes;
//! use std::time::{Duration, Instant};
//!
//! let engine = StorageEngine::new();
//!
//! // SET session token123 EX 3600 NX
//! let written = engine.set(
//!     Bytes::from("session"),
//!     Bytes::from("token123"),
//!     SetOptions {
//!         condition: SetCondition::IfAbsent,
//!         expiry: ExpiryOption::At(Instant::now() + Duration::from_secs(3600)),
//!     },
//! );
//! assert!(written);
//! ```

pub mod engine;

pub use engine::{Entry, ExpiryOption, SetCondition, SetOptions, StorageEngine, StorageStats};
