//! Storage backends
//!
//! Backends implement the `GraphStore` trait. The primary implementation is
//! `SqliteStore` for persistent storage shared between engine processes.

mod sqlite;
#[cfg(test)]
pub(crate) mod testing;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{EdgeRecord, GraphStore, OpenStore, StorageError, StorageResult};
