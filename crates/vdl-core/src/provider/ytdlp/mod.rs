//! yt-dlp backed provider: metadata and renditions from `yt-dlp --dump-json`,
//! bytes through the curl HTTP executor.

mod classify;
mod parse;

pub use classify::classify_stderr;
pub use parse::{YtDlpFormat, YtDlpInfo};

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use super::SourceProvider;
use crate::catalog::{Rendition, TransferHandle, VideoMetadata};
use crate::control::AbortToken;
use crate::error::{ResolutionError, TransferError};
use crate::http_transfer;
use crate::url_model::youtube_video_id;

/// How often a running yt-dlp child is checked for exit or abort.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Provider for YouTube links using an external `yt-dlp` binary.
#[derive(Debug, Clone)]
pub struct YtDlpProvider {
    binary: PathBuf,
}

impl YtDlpProvider {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Runs `yt-dlp --dump-json` for one video. Kills the child if `abort` is set.
    fn dump_json(&self, url: &str, abort: &AbortToken) -> Result<YtDlpInfo, ResolutionError> {
        let mut child = Command::new(&self.binary)
            .args(["--dump-json", "--no-warnings", "--no-playlist", url])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ResolutionError::ResolutionFailed(format!(
                    "failed to run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        // Drain pipes on their own threads so a large JSON document cannot stall the child.
        let stdout_reader = child.stdout.take().map(|mut out| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = out.read_to_end(&mut buf);
                buf
            })
        });
        let stderr_reader = child.stderr.take().map(|mut err| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = err.read_to_end(&mut buf);
                buf
            })
        });

        let status = loop {
            if abort.is_aborted() {
                let _ = child.kill();
                let _ = child.wait();
                tracing::debug!(url, "yt-dlp killed on abort");
                return Err(ResolutionError::Aborted);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ResolutionError::ResolutionFailed(format!(
                        "waiting for yt-dlp: {}",
                        e
                    )));
                }
            }
        };

        let stdout = stdout_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        let stderr = stderr_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            tracing::warn!(url, %status, "yt-dlp failed: {}", stderr.trim());
            return Err(classify_stderr(&stderr));
        }

        let info: YtDlpInfo = serde_json::from_slice(&stdout).map_err(|e| {
            ResolutionError::ResolutionFailed(format!("yt-dlp returned invalid JSON: {}", e))
        })?;
        if info.is_live == Some(true) {
            return Err(ResolutionError::Unavailable(
                "live streams are not supported".to_string(),
            ));
        }
        Ok(info)
    }
}

impl Default for YtDlpProvider {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl SourceProvider for YtDlpProvider {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    fn validate_url(&self, url: &str) -> Result<(), ResolutionError> {
        match youtube_video_id(url) {
            Some(_) => Ok(()),
            None => Err(ResolutionError::InvalidUrl(url.to_string())),
        }
    }

    fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ResolutionError> {
        Ok(self.dump_json(url, &AbortToken::new())?.metadata())
    }

    fn enumerate_renditions(&self, url: &str) -> Result<Vec<Rendition>, ResolutionError> {
        Ok(self.dump_json(url, &AbortToken::new())?.renditions())
    }

    fn probe(
        &self,
        url: &str,
        abort: &AbortToken,
    ) -> Result<(VideoMetadata, Vec<Rendition>), ResolutionError> {
        let info = self.dump_json(url, abort)?;
        Ok((info.metadata(), info.renditions()))
    }

    fn open_transfer(
        &self,
        handle: &TransferHandle,
        dest_dir: &Path,
        filename: &str,
        abort: &AbortToken,
        on_chunk: &mut dyn FnMut(u64, u64),
    ) -> Result<PathBuf, TransferError> {
        let dest = dest_dir.join(filename);
        http_transfer::download_to_file(handle, &dest, abort, on_chunk)?;
        Ok(dest)
    }
}
