//! SQLite-backed store for named cache generations.
//!
//! This module provides the persistent request/response store using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Request-addressed entries (SHA-256 over method and normalized URL)
//! - Named generations, created idempotently and deleted atomically
//! - A per-generation byte quota
//! - Automatic schema migrations

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntry;
pub use generations::{GenerationHandle, GenerationKind, GenerationStats};
