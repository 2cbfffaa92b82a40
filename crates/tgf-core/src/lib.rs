//! Core domain + forwarding logic for the Telegram message forwarder.
//!
//! This crate is intentionally framework-agnostic. The Telegram client lives
//! behind a port (trait) implemented in the adapter crate.

pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod store;
pub mod tracked;
pub mod transport;

pub use errors::{Error, Result};
