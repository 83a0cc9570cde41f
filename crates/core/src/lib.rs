//! Core of the ZUBID offline caching worker.
//!
//! This crate provides:
//! - Request/response boundary types
//! - Generation-scoped cache store with SQLite backend
//! - Request routing and the fetch-and-reconcile engine
//! - Install/activate lifecycle and push notification handling
//! - Unified error types and layered configuration

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod origin;
pub mod platform;
pub mod push;
pub mod request;
pub mod router;
pub mod worker;

#[cfg(test)]
mod testing;

pub use cache::{CacheDb, GenerationKind, GenerationStats};
pub use config::AppConfig;
pub use engine::FetchEngine;
pub use error::Error;
pub use lifecycle::GenerationSet;
pub use origin::Origin;
pub use platform::Platform;
pub use push::{NotificationData, NotificationDescriptor};
pub use request::{Headers, Request, Response, ResponseSource, Served};
pub use router::RoutingDecision;
pub use worker::{EventOutcome, EventResponse, LifecyclePhase, WaitUntil, Worker, WorkerEvent, WorkerSettings};
