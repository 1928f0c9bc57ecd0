//! # Storage Module
//!
//! Persistence seams for the state layer.
//!
//! ## Key Responsibilities
//!
//! - **Remote tables**: owner-scoped row access plus a push channel of change
//!   events (`RemoteTable`, `ChangeStream`)
//! - **Backends**: an in-memory backend with fault injection, and a CSV-file
//!   backend for running against a local data directory
//! - **Key/value storage**: durable string settings and notification
//!   bookkeeping (`KeyValueStore`)

pub mod csv;
pub mod feed;
pub mod kv;
pub mod memory;
pub mod table_ops;
pub mod traits;

pub use self::csv::{CsvBackend, CsvConnection};
pub use feed::ChangeFeed;
pub use kv::{keys, MemoryKeyValueStore, YamlKeyValueStore};
pub use memory::MemoryBackend;
pub use traits::{BackendError, ChangeStream, KeyValueStore, RemoteTable};
