//! Core types and trait definitions for Quire.
//!
//! Quire captures the text of a remote catalog's subject pages on a schedule,
//! keeps every distinct version, and serves diffs addressed by a
//! reverse-chronological index (0 = newest).
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! implement [`store::SnapshotStore`]; content sources implement
//! [`fetch::Fetcher`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod cycle;
pub mod diff;
pub mod entity;
pub mod error;
pub mod fetch;
pub mod gate;
pub mod history;
pub mod navigate;
pub mod roster;
pub mod store;
pub mod version;

pub use error::{Error, Result};
