//! services/api/src/lib.rs
//!
//! The service crate: concrete adapters for the core ports, configuration,
//! the error type and the HTTP layer shared by the binaries.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
