pub mod config;
pub mod logging;

pub mod batch;
pub mod catalog;
pub mod control;
pub mod error;
pub mod format;
pub mod http_transfer;
pub mod job;
pub mod progress;
pub mod provider;
pub mod retry;
pub mod url_model;

pub use batch::{BatchOrchestrator, BatchSettings, JobProgress};
pub use catalog::{CatalogEntry, Rendition, RenditionCatalog, TransferHandle, VideoMetadata};
pub use control::{AbortToken, JobControl};
pub use error::{ErrorKind, JobError, ResolutionError, StateError, TransferError};
pub use job::{DownloadJob, DownloadOutcome, JobId, JobState};
pub use progress::{ProgressSample, ProgressTracker, ProgressView};
pub use provider::{SourceProvider, YtDlpProvider};
