//! Connectivity monitoring for tether.
//!
//! [`NetworkMonitor`] polls a [`PathSource`] on the tokio runtime and
//! publishes changes to subscribers through the
//! [`tether_core::monitor::PathMonitor`] interface.

mod monitor;
mod source;
mod sysfs;

pub mod error;

pub use error::{Error, Result};
pub use monitor::NetworkMonitor;
pub use source::{PathSource, StaticSource};
pub use sysfs::SysfsSource;
