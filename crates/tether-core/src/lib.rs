//! Core types and trait definitions for tether.
//!
//! This crate is deliberately free of HTTP and runtime dependencies. The
//! request client and the path monitor both depend on it; it depends on
//! nothing but serde and chrono.

pub mod error;
pub mod model;
pub mod monitor;
pub mod path;

pub use error::{Error, Result};
