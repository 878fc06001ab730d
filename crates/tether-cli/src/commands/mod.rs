//! One module per sample program.

pub mod messages;
pub mod monitor;
pub mod upload;
