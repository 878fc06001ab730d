//! Async request helpers for tether.
//!
//! [`HttpClient`] issues the three kinds of call the sample programs make:
//!
//! - [`HttpClient::fetch`]: GET and decode, retrying once on transport failure
//!   and falling back to a caller-supplied default.
//! - [`HttpClient::fetch_both`]: two fetches in flight at once, combined once
//!   both have finished.
//! - [`HttpClient::upload`]: POST a JSON record and decode the reply, with a
//!   typed [`UploadError`].
//!
//! The `*_with` variants deliver their result on a [`MainContext`] instead of
//! returning it.

mod client;
mod main_context;
mod policy;

pub mod error;

pub use client::{ClientConfig, HttpClient, UploadOptions};
pub use error::{FetchError, Refusal, RequestError, UploadError};
pub use main_context::{MainContext, MainHandle};
pub use policy::SessionPolicy;

#[cfg(test)]
mod tests;
