//! Source provider interface: where metadata, renditions and bytes come from.
//!
//! The catalog and the batch orchestrator only depend on this trait; they do
//! not know about yt-dlp or any other specific backend.

pub mod ytdlp;

#[cfg(test)]
pub(crate) mod fake;

use std::path::{Path, PathBuf};

use crate::catalog::{Rendition, TransferHandle, VideoMetadata};
use crate::control::AbortToken;
use crate::error::{ResolutionError, TransferError};
use crate::url_model::is_http_url;

pub use ytdlp::YtDlpProvider;

/// Backend that knows how to describe and fetch videos from one source.
///
/// All methods block; the orchestrator runs them on blocking worker threads.
pub trait SourceProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Rejects strings that are not video URLs for this source.
    fn validate_url(&self, url: &str) -> Result<(), ResolutionError> {
        if is_http_url(url) {
            Ok(())
        } else {
            Err(ResolutionError::InvalidUrl(url.to_string()))
        }
    }

    fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ResolutionError>;

    /// Renditions that need no separate audio/video remux, in provider order.
    fn enumerate_renditions(&self, url: &str) -> Result<Vec<Rendition>, ResolutionError>;

    /// Metadata and renditions together. Providers that get both from one
    /// round-trip should override this.
    fn probe(
        &self,
        url: &str,
        abort: &AbortToken,
    ) -> Result<(VideoMetadata, Vec<Rendition>), ResolutionError> {
        let metadata = self.fetch_metadata(url)?;
        if abort.is_aborted() {
            return Err(ResolutionError::Aborted);
        }
        let renditions = self.enumerate_renditions(url)?;
        Ok((metadata, renditions))
    }

    /// Streams `handle` into `dest_dir/filename`, calling `on_chunk(bytes_downloaded,
    /// bytes_total)` as data arrives. Returns the saved path.
    fn open_transfer(
        &self,
        handle: &TransferHandle,
        dest_dir: &Path,
        filename: &str,
        abort: &AbortToken,
        on_chunk: &mut dyn FnMut(u64, u64),
    ) -> Result<PathBuf, TransferError>;
}
