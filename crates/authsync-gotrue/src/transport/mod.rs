//! HTTP transports.
//!
//! [`ReqwestTransport`] performs single exchanges; [`RetryingTransport`]
//! wraps any transport with failure classification and exponential backoff.
//! Neither emits log records: reporting is left to the caller.

mod client;
mod retry;

pub use client::ReqwestTransport;
pub use retry::{RetryPolicy, RetryingTransport};
