//! SQLite backend for the forum store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every [`ForumStore`] call is one
//! closure on that thread, and multi-row writes run inside a transaction.
//!
//! [`ForumStore`]: forum_core::store::ForumStore

mod encode;
mod schema;
mod store;
mod teardown;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
