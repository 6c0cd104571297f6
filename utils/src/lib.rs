//! Shared utilities for the Devflation burn pipeline.

pub mod cache;
pub mod logging;
pub mod retry;

pub use cache::TtlCache;
pub use logging::{init_logging, LogFormat};
pub use retry::{retry_async, RetryPolicy};
