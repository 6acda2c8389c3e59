//! SQLite backend for the fluent ORM.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Structured statements from
//! `fluent-core` are rendered to SQLite SQL here and nowhere else.

mod client;
mod exec;
mod rebuild;
mod render;

pub mod error;

pub use client::SqliteClient;
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
