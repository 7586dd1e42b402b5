//! Shared utilities for passvote.

pub mod http;
pub mod logging;

pub use logging::{init_logging, LogFormat};
