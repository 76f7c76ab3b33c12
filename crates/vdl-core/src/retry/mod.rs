//! Retry and backoff for interrupted transfers.
//!
//! Classification decides whether a transfer error is worth another attempt;
//! the policy decides how long to wait and when to give up.

mod classify;
mod policy;

pub use classify::{classify, classify_http_status};
pub use policy::{RetryDecision, RetryKind, RetryPolicy};
