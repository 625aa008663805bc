//! SQLite backend for the Quire snapshot store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each write is one transaction, and the
//! database runs in WAL mode, so concurrent readers never see a half-written
//! version.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
