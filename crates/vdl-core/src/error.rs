//! Error taxonomy for resolution, transfer and job state.
//!
//! Resolution and transfer errors are captured on the owning job and reported
//! as outcomes. `StateError` is a caller contract violation and is returned
//! from the offending call instead.

use std::fmt;

use thiserror::Error;

use crate::job::JobState;

/// Machine-readable failure category shown next to each failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidUrl,
    Unavailable,
    NoRenditions,
    ResolutionFailed,
    DestinationUnwritable,
    TransferInterrupted,
    Aborted,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "invalid-url",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::NoRenditions => "no-renditions",
            ErrorKind::ResolutionFailed => "resolution-failed",
            ErrorKind::DestinationUnwritable => "destination-unwritable",
            ErrorKind::TransferInterrupted => "transfer-interrupted",
            ErrorKind::Aborted => "aborted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure while turning a URL into metadata and renditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("invalid video URL: {0}")]
    InvalidUrl(String),
    #[error("video unavailable: {0}")]
    Unavailable(String),
    #[error("no downloadable renditions found")]
    NoRenditions,
    #[error("resolution failed: {0}")]
    ResolutionFailed(String),
    #[error("resolution aborted")]
    Aborted,
}

impl ResolutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolutionError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            ResolutionError::Unavailable(_) => ErrorKind::Unavailable,
            ResolutionError::NoRenditions => ErrorKind::NoRenditions,
            ResolutionError::ResolutionFailed(_) => ErrorKind::ResolutionFailed,
            ResolutionError::Aborted => ErrorKind::Aborted,
        }
    }
}

/// Failure while moving rendition bytes to the destination directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("destination not writable: {0}")]
    DestinationUnwritable(String),
    #[error("transfer interrupted: {0}")]
    TransferInterrupted(String),
    #[error("transfer aborted")]
    Aborted,
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::DestinationUnwritable(_) => ErrorKind::DestinationUnwritable,
            TransferError::TransferInterrupted(_) => ErrorKind::TransferInterrupted,
            TransferError::Aborted => ErrorKind::Aborted,
        }
    }
}

/// Error stored on a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::Resolution(e) => e.kind(),
            JobError::Transfer(e) => e.kind(),
        }
    }
}

/// Caller contract violation on a job's state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("job {job_id}: cannot {action} while {from:?}")]
    IllegalTransition {
        job_id: u64,
        from: JobState,
        action: &'static str,
    },
    #[error("job {job_id}: rendition index {index} out of range ({available} available)")]
    SelectionOutOfRange {
        job_id: u64,
        index: usize,
        available: usize,
    },
}
