//! One download job: URL → resolved renditions → selection → transfer.
//!
//! State machine:
//! `Pending → Resolving → Ready → Downloading → Completed`, with `Failed`
//! reachable from `Resolving` and `Downloading`. Every transition is checked;
//! an illegal one returns [`StateError`] and leaves the job untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;

use crate::catalog::{CatalogEntry, Rendition, VideoMetadata};
use crate::control::AbortToken;
use crate::error::{ErrorKind, JobError, ResolutionError, StateError};
use crate::progress::{ProgressTracker, ProgressView};

/// Job identifier, unique per orchestrator.
pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Pending,
    Resolving,
    Ready,
    Downloading,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Resolving => "resolving",
            JobState::Ready => "ready",
            JobState::Downloading => "downloading",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

/// Terminal result of one job in a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success(PathBuf),
    Failure { kind: ErrorKind, message: String },
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Success(_))
    }

    pub fn failure(error: &JobError) -> Self {
        DownloadOutcome::Failure {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct DownloadJob {
    id: JobId,
    source_url: String,
    state: JobState,
    entry: Option<Arc<CatalogEntry>>,
    selected: Option<usize>,
    progress: ProgressTracker,
    error: Option<JobError>,
    saved_path: Option<PathBuf>,
    abort: AbortToken,
}

impl DownloadJob {
    pub fn new(id: JobId, source_url: impl Into<String>) -> Self {
        Self {
            id,
            source_url: source_url.into(),
            state: JobState::Pending,
            entry: None,
            selected: None,
            progress: ProgressTracker::new(),
            error: None,
            saved_path: None,
            abort: AbortToken::new(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn metadata(&self) -> Option<&VideoMetadata> {
        self.entry.as_deref().map(|e| &e.metadata)
    }

    /// Resolved renditions, ascending by resolution; empty until resolved.
    pub fn renditions(&self) -> &[Rendition] {
        self.entry
            .as_deref()
            .map(|e| e.renditions.as_slice())
            .unwrap_or(&[])
    }

    /// `"{label} ({size})"` per rendition, same order as [`renditions`](Self::renditions).
    pub fn rendition_labels(&self) -> Vec<String> {
        self.renditions().iter().map(Rendition::display_label).collect()
    }

    pub fn selected_rendition_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_rendition(&self) -> Option<&Rendition> {
        self.selected.and_then(|i| self.renditions().get(i))
    }

    pub fn progress(&self) -> ProgressView {
        self.progress.snapshot()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressView> {
        self.progress.subscribe()
    }

    pub fn error(&self) -> Option<&JobError> {
        self.error.as_ref()
    }

    pub fn saved_path(&self) -> Option<&Path> {
        self.saved_path.as_deref()
    }

    /// Handle the caller can use to cancel this job from anywhere.
    pub fn abort_token(&self) -> AbortToken {
        self.abort.clone()
    }

    /// Outcome for a terminal job; `None` while the job is still in progress.
    pub fn outcome(&self) -> Option<DownloadOutcome> {
        match self.state {
            JobState::Completed => self.saved_path.clone().map(DownloadOutcome::Success),
            JobState::Failed => self.error.as_ref().map(DownloadOutcome::failure),
            _ => None,
        }
    }

    fn illegal(&self, action: &'static str) -> StateError {
        StateError::IllegalTransition {
            job_id: self.id,
            from: self.state,
            action,
        }
    }

    /// Pending → Resolving.
    pub fn begin_resolving(&mut self) -> Result<(), StateError> {
        if self.state != JobState::Pending {
            return Err(self.illegal("start resolving"));
        }
        self.state = JobState::Resolving;
        Ok(())
    }

    /// Resolving → Ready on success, Resolving → Failed on error.
    pub fn finish_resolving(
        &mut self,
        result: Result<Arc<CatalogEntry>, ResolutionError>,
    ) -> Result<(), StateError> {
        if self.state != JobState::Resolving {
            return Err(self.illegal("finish resolving"));
        }
        match result {
            Ok(entry) if entry.renditions.is_empty() => {
                self.set_failed(ResolutionError::NoRenditions.into());
            }
            Ok(entry) => {
                self.entry = Some(entry);
                self.state = JobState::Ready;
            }
            Err(e) => self.set_failed(e.into()),
        }
        Ok(())
    }

    /// Chooses a rendition by index into this job's own rendition list.
    pub fn select_rendition(&mut self, index: usize) -> Result<(), StateError> {
        if self.state != JobState::Ready {
            return Err(self.illegal("select a rendition"));
        }
        let available = self.renditions().len();
        if index >= available {
            return Err(StateError::SelectionOutOfRange {
                job_id: self.id,
                index,
                available,
            });
        }
        self.selected = Some(index);
        Ok(())
    }

    /// Ready (with a selection) → Downloading. Restarts the progress tracker.
    pub fn begin_download(&mut self) -> Result<(), StateError> {
        if self.state != JobState::Ready {
            return Err(self.illegal("start download"));
        }
        if self.selected.is_none() {
            return Err(self.illegal("start download without a selected rendition"));
        }
        self.state = JobState::Downloading;
        self.progress.start();
        Ok(())
    }

    /// Restarts the tracker for another transfer attempt of the same rendition.
    pub fn restart_attempt(&mut self) -> Result<(), StateError> {
        if self.state != JobState::Downloading {
            return Err(self.illegal("restart transfer"));
        }
        self.progress.start();
        Ok(())
    }

    /// Forwards one chunk callback to the tracker.
    pub fn on_chunk(&mut self, bytes_downloaded: u64, bytes_total: u64) {
        if self.state == JobState::Downloading {
            self.progress.on_sample(bytes_downloaded, bytes_total);
        }
    }

    /// Downloading → Completed.
    pub fn complete(&mut self, saved_path: PathBuf) -> Result<(), StateError> {
        if self.state != JobState::Downloading {
            return Err(self.illegal("complete"));
        }
        self.saved_path = Some(saved_path);
        self.state = JobState::Completed;
        Ok(())
    }

    /// Resolving or Downloading → Failed.
    pub fn fail(&mut self, error: JobError) -> Result<(), StateError> {
        if !matches!(self.state, JobState::Resolving | JobState::Downloading) {
            return Err(self.illegal("fail"));
        }
        self.set_failed(error);
        Ok(())
    }

    fn set_failed(&mut self, error: JobError) {
        tracing::warn!(job_id = self.id, url = %self.source_url, "job failed: {}", error);
        self.error = Some(error);
        self.state = JobState::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TransferHandle;
    use crate::error::TransferError;

    fn entry(labels: &[&str]) -> Arc<CatalogEntry> {
        Arc::new(CatalogEntry {
            metadata: VideoMetadata {
                id: "a".into(),
                title: "Alpha".into(),
                length_seconds: 5,
                thumbnail_ref: String::new(),
            },
            renditions: labels
                .iter()
                .map(|l| Rendition {
                    resolution_label: l.to_string(),
                    size_bytes: 2048,
                    container_format: "mp4".into(),
                    transfer_handle: TransferHandle::new(format!("https://cdn.example.com/{}", l)),
                })
                .collect(),
        })
    }

    fn ready_job(labels: &[&str]) -> DownloadJob {
        let mut job = DownloadJob::new(1, "https://example.com/v");
        job.begin_resolving().unwrap();
        job.finish_resolving(Ok(entry(labels))).unwrap();
        job
    }

    #[test]
    fn happy_path() {
        let mut job = ready_job(&["360p", "720p"]);
        assert_eq!(job.state(), JobState::Ready);
        assert_eq!(job.rendition_labels(), ["360p (2.00 KB)", "720p (2.00 KB)"]);
        job.select_rendition(1).unwrap();
        assert_eq!(job.selected_rendition().unwrap().resolution_label, "720p");
        job.begin_download().unwrap();
        job.on_chunk(1024, 2048);
        assert_eq!(job.progress().bytes_downloaded, 1024);
        job.complete(PathBuf::from("/tmp/Alpha_720p.mp4")).unwrap();
        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(
            job.outcome(),
            Some(DownloadOutcome::Success(PathBuf::from("/tmp/Alpha_720p.mp4")))
        );
    }

    #[test]
    fn duplicate_display_strings_select_by_position() {
        let mut job = ready_job(&["720p", "720p"]);
        assert_eq!(job.rendition_labels()[0], job.rendition_labels()[1]);
        job.select_rendition(1).unwrap();
        assert_eq!(
            job.selected_rendition().unwrap().transfer_handle,
            job.renditions()[1].transfer_handle
        );
    }

    #[test]
    fn resolution_error_fails_job() {
        let mut job = DownloadJob::new(2, "bad");
        job.begin_resolving().unwrap();
        job.finish_resolving(Err(ResolutionError::InvalidUrl("bad".into())))
            .unwrap();
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(job.error().unwrap().kind(), ErrorKind::InvalidUrl);
        assert!(matches!(
            job.outcome(),
            Some(DownloadOutcome::Failure { kind: ErrorKind::InvalidUrl, .. })
        ));
    }

    #[test]
    fn empty_renditions_force_failure() {
        let mut job = DownloadJob::new(3, "https://example.com/v");
        job.begin_resolving().unwrap();
        job.finish_resolving(Ok(entry(&[]))).unwrap();
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(job.error().unwrap().kind(), ErrorKind::NoRenditions);
    }

    #[test]
    fn download_requires_ready_and_selection() {
        let mut pending = DownloadJob::new(4, "https://example.com/v");
        assert!(matches!(
            pending.begin_download(),
            Err(StateError::IllegalTransition { from: JobState::Pending, .. })
        ));

        let mut job = ready_job(&["360p"]);
        assert!(job.begin_download().is_err());
        assert_eq!(job.state(), JobState::Ready);
    }

    #[test]
    fn selection_out_of_range() {
        let mut job = ready_job(&["360p"]);
        assert_eq!(
            job.select_rendition(1),
            Err(StateError::SelectionOutOfRange {
                job_id: 1,
                index: 1,
                available: 1
            })
        );
        assert_eq!(job.selected_rendition_index(), None);
    }

    #[test]
    fn completed_is_terminal() {
        let mut job = ready_job(&["360p"]);
        job.select_rendition(0).unwrap();
        job.begin_download().unwrap();
        job.complete(PathBuf::from("x.mp4")).unwrap();
        assert!(job.begin_download().is_err());
        assert!(job.select_rendition(0).is_err());
        assert!(job.fail(TransferError::Aborted.into()).is_err());
        assert!(job.begin_resolving().is_err());
        assert_eq!(job.state(), JobState::Completed);
    }

    #[test]
    fn transfer_failure_from_downloading() {
        let mut job = ready_job(&["360p"]);
        job.select_rendition(0).unwrap();
        job.begin_download().unwrap();
        job.fail(TransferError::TransferInterrupted("reset".into()).into())
            .unwrap();
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(job.error().unwrap().kind(), ErrorKind::TransferInterrupted);
    }

    #[test]
    fn restart_attempt_clears_progress() {
        let mut job = ready_job(&["360p"]);
        job.select_rendition(0).unwrap();
        job.begin_download().unwrap();
        job.on_chunk(1000, 2048);
        job.restart_attempt().unwrap();
        assert_eq!(job.progress().bytes_downloaded, 0);
    }

    #[test]
    fn chunks_outside_downloading_are_ignored() {
        let mut job = ready_job(&["360p"]);
        job.on_chunk(10, 20);
        assert_eq!(job.progress().bytes_downloaded, 0);
    }
}
