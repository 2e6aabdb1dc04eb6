//! SQLite backend for the Shelfmark lending store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every mutation runs inside a
//! `BEGIN IMMEDIATE` transaction, which takes the database write lock up
//! front; that lock is what serializes concurrent approvals, allocations and
//! deletions, across threads and across processes sharing the file.

mod allocator;
mod broker;
mod catalog;
mod encode;
mod fines;
mod lending;
mod members;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
