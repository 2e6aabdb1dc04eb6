//! Core types and trait definitions for Shelfmark, a lending-library
//! inventory engine.
//!
//! This crate is free of HTTP and database dependencies. Backends implement
//! [`store::LibraryStore`]; everything else depends on that trait.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod accession;
pub mod book;
pub mod clock;
pub mod copy;
pub mod error;
pub mod fine;
pub mod identity;
pub mod lending;
pub mod notification;
pub mod store;

pub use error::{DomainError, Error, Result};
