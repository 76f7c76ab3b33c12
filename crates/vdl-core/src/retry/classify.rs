//! Map transfer errors onto retry kinds.

use super::policy::RetryKind;
use crate::error::TransferError;

pub fn classify_http_status(code: u32) -> RetryKind {
    match code {
        429 | 503 => RetryKind::Throttled,
        500..=599 => RetryKind::Http5xx(code as u16),
        408 => RetryKind::Interrupted,
        _ => RetryKind::Fatal,
    }
}

/// Only interruptions are retried; an `"HTTP n"` interruption is classified
/// by its status code.
pub fn classify(e: &TransferError) -> RetryKind {
    match e {
        TransferError::TransferInterrupted(msg) => match msg
            .strip_prefix("HTTP ")
            .and_then(|c| c.trim().parse::<u32>().ok())
        {
            Some(code) => classify_http_status(code),
            None => RetryKind::Interrupted,
        },
        TransferError::DestinationUnwritable(_) | TransferError::Aborted => RetryKind::Fatal,
    }
}
