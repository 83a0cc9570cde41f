//! Network side of the ZUBID offline worker.
//!
//! This crate provides the reqwest-backed origin client the worker uses for
//! live requests.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig};
