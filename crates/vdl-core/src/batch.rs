//! Batch orchestration: resolve many URLs, then transfer the selected renditions.
//!
//! Every URL becomes an independent [`DownloadJob`]; one job failing never
//! changes another. Resolution and transfer are blocking work, run on
//! `spawn_blocking` with at most `resolve_workers` / `transfer_workers` jobs in
//! flight. Queued jobs start in submission order, so one transfer worker
//! means strictly sequential downloads.
//!
//! Destination names are planned before any transfer starts: two different
//! videos that would share a filename get their video id inserted, and jobs
//! for the same video and rendition share one path but transfer one after
//! the other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::catalog::RenditionCatalog;
use crate::config::VdlConfig;
use crate::control::{AbortToken, JobControl};
use crate::error::{ErrorKind, ResolutionError, StateError, TransferError};
use crate::job::{DownloadJob, DownloadOutcome, JobId, JobState};
use crate::progress::ProgressView;
use crate::retry::{self, RetryDecision, RetryPolicy};
use crate::url_model::{output_filename, output_filename_tagged};

/// Granularity of abort checks while backing off between attempts.
const ABORT_POLL: Duration = Duration::from_millis(20);

/// Progress update for one job, sent on the orchestrator's progress channel.
#[derive(Debug, Clone, PartialEq)]
pub struct JobProgress {
    pub job_id: JobId,
    pub view: ProgressView,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    pub resolve_workers: usize,
    pub transfer_workers: usize,
    pub retry: RetryPolicy,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::from(&VdlConfig::default())
    }
}

impl From<&VdlConfig> for BatchSettings {
    fn from(cfg: &VdlConfig) -> Self {
        Self {
            resolve_workers: cfg.resolve_workers.max(1),
            transfer_workers: cfg.transfer_workers.max(1),
            retry: RetryPolicy::from(&cfg.retry_config()),
        }
    }
}

pub struct BatchOrchestrator {
    catalog: Arc<RenditionCatalog>,
    settings: BatchSettings,
    control: Arc<JobControl>,
    next_id: AtomicU64,
    progress_tx: Option<mpsc::Sender<JobProgress>>,
}

impl BatchOrchestrator {
    pub fn new(catalog: Arc<RenditionCatalog>, settings: BatchSettings) -> Self {
        Self {
            catalog,
            settings,
            control: Arc::new(JobControl::new()),
            next_id: AtomicU64::new(1),
            progress_tx: None,
        }
    }

    /// Sends a [`JobProgress`] for every forwarded chunk. Updates are dropped
    /// rather than blocking the transfer when the channel is full.
    pub fn with_progress(mut self, tx: mpsc::Sender<JobProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn catalog(&self) -> &Arc<RenditionCatalog> {
        &self.catalog
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Abort registry for jobs currently resolving or transferring.
    pub fn control(&self) -> Arc<JobControl> {
        Arc::clone(&self.control)
    }

    /// Creates a Pending job with a fresh id.
    pub fn new_job(&self, url: impl Into<String>) -> DownloadJob {
        DownloadJob::new(self.next_id.fetch_add(1, Ordering::Relaxed), url)
    }

    /// One job per URL, in input order, each resolved independently. Every
    /// returned job is `Ready` or `Failed`.
    pub async fn submit_all<I, S>(&self, urls: I) -> Vec<DownloadJob>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut jobs: Vec<DownloadJob> = urls.into_iter().map(|u| self.new_job(u)).collect();
        for job in &mut jobs {
            // Fresh jobs are Pending.
            let _ = job.begin_resolving();
            self.control.register(job.id(), job.abort_token());
        }
        tracing::info!(jobs = jobs.len(), "resolving batch");

        let ids: Vec<JobId> = jobs.iter().map(DownloadJob::id).collect();
        let queue: Vec<Vec<usize>> = (0..jobs.len()).map(|i| vec![i]).collect();
        let slots = into_slots(jobs);
        let catalog = Arc::clone(&self.catalog);
        let control = Arc::clone(&self.control);
        run_bounded(&slots, queue, self.settings.resolve_workers, move |job| {
            let result = catalog.resolve_with(job.source_url(), &job.abort_token());
            control.unregister(job.id());
            if let Err(e) = job.finish_resolving(result) {
                tracing::error!("{}", e);
            }
            if job.state() == JobState::Ready {
                tracing::info!(job_id = job.id(), renditions = job.renditions().len(), "job ready");
            }
        })
        .await;

        for id in ids {
            self.control.unregister(id);
        }
        let jobs = from_slots(slots);
        let failed = jobs.iter().filter(|j| j.state() == JobState::Failed).count();
        tracing::info!(jobs = jobs.len(), failed, "batch resolved");
        jobs
    }

    /// Transfers every `Ready` job's selected rendition into `dest_dir`.
    ///
    /// `Failed` jobs are skipped and reported with their stored error. Any
    /// other job state (including `Ready` without a selection) is rejected
    /// before anything starts. Returns one outcome per job, in order.
    pub async fn run_all(
        &self,
        jobs: &mut Vec<DownloadJob>,
        dest_dir: &Path,
    ) -> Result<Vec<DownloadOutcome>, StateError> {
        let mut eligible = Vec::new();
        for (i, job) in jobs.iter().enumerate() {
            match job.state() {
                JobState::Failed => {}
                JobState::Ready if job.selected_rendition().is_some() => eligible.push(i),
                JobState::Ready => {
                    return Err(StateError::IllegalTransition {
                        job_id: job.id(),
                        from: JobState::Ready,
                        action: "download without a selected rendition",
                    })
                }
                from => {
                    return Err(StateError::IllegalTransition {
                        job_id: job.id(),
                        from,
                        action: "download",
                    })
                }
            }
        }
        tracing::info!(
            jobs = jobs.len(),
            eligible = eligible.len(),
            dest = %dest_dir.display(),
            "starting transfers"
        );

        if let Err(e) = tokio::fs::create_dir_all(dest_dir).await {
            let reason = format!("{}: {}", dest_dir.display(), e);
            tracing::warn!("cannot create destination {}", reason);
            for &i in &eligible {
                let job = &mut jobs[i];
                job.begin_download()?;
                job.fail(TransferError::DestinationUnwritable(reason.clone()).into())?;
            }
            return Ok(outcomes(jobs));
        }

        for &i in &eligible {
            self.control.register(jobs[i].id(), jobs[i].abort_token());
        }
        let ids: Vec<JobId> = eligible.iter().map(|&i| jobs[i].id()).collect();
        let (filenames, groups) = plan_destinations(jobs, &eligible);

        let worker = TransferWorker {
            catalog: Arc::clone(&self.catalog),
            control: Arc::clone(&self.control),
            retry: self.settings.retry,
            dest_dir: dest_dir.to_path_buf(),
            filenames,
            progress_tx: self.progress_tx.clone(),
        };
        let slots = into_slots(std::mem::take(jobs));
        run_bounded(&slots, groups, self.settings.transfer_workers, move |job| {
            worker.run(job)
        })
        .await;
        *jobs = from_slots(slots);

        // A panic earlier in a shared-path group leaves the rest unstarted.
        for &i in &eligible {
            let job = &mut jobs[i];
            if job.state() == JobState::Ready {
                self.control.unregister(job.id());
                job.begin_download()?;
                job.fail(
                    TransferError::TransferInterrupted(
                        "not started: an earlier transfer to the same file failed".to_string(),
                    )
                    .into(),
                )?;
            }
        }

        for id in ids {
            self.control.unregister(id);
        }
        let outcomes = outcomes(jobs);
        let ok = outcomes.iter().filter(|o| o.is_success()).count();
        tracing::info!(completed = ok, failed = outcomes.len() - ok, "batch finished");
        Ok(outcomes)
    }
}

fn outcomes(jobs: &[DownloadJob]) -> Vec<DownloadOutcome> {
    jobs.iter()
        .map(|job| {
            job.outcome().unwrap_or_else(|| DownloadOutcome::Failure {
                kind: ErrorKind::TransferInterrupted,
                message: format!("job {} did not finish ({})", job.id(), job.state().as_str()),
            })
        })
        .collect()
}

/// Picks a destination filename for every eligible job and groups the jobs
/// that end up sharing one. Groups keep submission order, by first member.
fn plan_destinations(
    jobs: &[DownloadJob],
    eligible: &[usize],
) -> (HashMap<JobId, String>, Vec<Vec<usize>>) {
    // (video id, transfer handle) identifies the bytes a job would write.
    let mut planned: Vec<(usize, (String, String), String)> = Vec::new();
    for &i in eligible {
        let job = &jobs[i];
        if let (Some(meta), Some(r)) = (job.metadata(), job.selected_rendition()) {
            let identity = (meta.id.clone(), r.transfer_handle.url.clone());
            planned.push((i, identity, output_filename(meta, r)));
        }
    }

    for pass in 0..2 {
        let mut owners: HashMap<&str, &(String, String)> = HashMap::new();
        let mut clashing: Vec<String> = Vec::new();
        for (_, identity, name) in &planned {
            match owners.get(name.as_str()) {
                Some(owner) if *owner != identity => clashing.push(name.clone()),
                Some(_) => {}
                None => {
                    owners.insert(name.as_str(), identity);
                }
            }
        }
        if clashing.is_empty() {
            break;
        }
        for (i, _, name) in &mut planned {
            if !clashing.contains(name) {
                continue;
            }
            let job = &jobs[*i];
            if let (Some(meta), Some(r)) = (job.metadata(), job.selected_rendition()) {
                let tag = if pass == 0 {
                    meta.id.clone()
                } else {
                    format!("{}_{}", meta.id, job.id())
                };
                *name = output_filename_tagged(meta, r, &tag);
            }
        }
        tracing::debug!(clashes = clashing.len(), pass, "renamed clashing destinations");
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of: HashMap<&str, usize> = HashMap::new();
    for (i, _, name) in &planned {
        match group_of.get(name.as_str()) {
            Some(&g) => groups[g].push(*i),
            None => {
                group_of.insert(name.as_str(), groups.len());
                groups.push(vec![*i]);
            }
        }
    }
    let filenames = planned
        .iter()
        .map(|(i, _, name)| (jobs[*i].id(), name.clone()))
        .collect();
    (filenames, groups)
}

type Slot = Arc<Mutex<DownloadJob>>;

fn into_slots(jobs: Vec<DownloadJob>) -> Vec<Slot> {
    jobs.into_iter().map(|j| Arc::new(Mutex::new(j))).collect()
}

/// Unwraps the slots after all workers are joined. A job whose worker
/// panicked mid-phase is failed here.
fn from_slots(slots: Vec<Slot>) -> Vec<DownloadJob> {
    slots
        .into_iter()
        .map(|slot| {
            let mut job = match Arc::try_unwrap(slot) {
                Ok(m) => m.into_inner().unwrap_or_else(|e| e.into_inner()),
                Err(shared) => {
                    let mut guard = shared.lock().unwrap_or_else(|e| e.into_inner());
                    let placeholder = DownloadJob::new(guard.id(), guard.source_url());
                    std::mem::replace(&mut *guard, placeholder)
                }
            };
            settle_abandoned(&mut job);
            job
        })
        .collect()
}

fn settle_abandoned(job: &mut DownloadJob) {
    match job.state() {
        JobState::Resolving => {
            let _ = job.finish_resolving(Err(ResolutionError::ResolutionFailed(
                "resolver task panicked".to_string(),
            )));
        }
        JobState::Downloading => {
            let _ = job.fail(
                TransferError::TransferInterrupted("transfer task panicked".to_string()).into(),
            );
        }
        _ => {}
    }
}

/// Runs `work` on the job groups in `queue` with up to `limit` blocking tasks
/// in flight; the next queued group starts whenever one finishes. Jobs within
/// a group run one after another on the same task.
async fn run_bounded<F>(slots: &[Slot], queue: Vec<Vec<usize>>, limit: usize, work: F)
where
    F: Fn(&mut DownloadJob) + Send + Sync + 'static,
{
    let limit = limit.max(1);
    let work = Arc::new(work);
    let mut queue = queue.into_iter();
    let mut join_set = JoinSet::new();

    loop {
        while join_set.len() < limit {
            let Some(group) = queue.next() else {
                break;
            };
            let group: Vec<Slot> = group.into_iter().map(|i| Arc::clone(&slots[i])).collect();
            let work = Arc::clone(&work);
            join_set.spawn_blocking(move || {
                for slot in group {
                    let mut job = slot.lock().unwrap_or_else(|e| e.into_inner());
                    work(&mut job);
                }
            });
        }

        let Some(res) = join_set.join_next().await else {
            break;
        };
        if let Err(e) = res {
            tracing::error!("batch worker task failed: {}", e);
        }
    }
}

/// Transfer of one job with retries, on a blocking thread.
struct TransferWorker {
    catalog: Arc<RenditionCatalog>,
    control: Arc<JobControl>,
    retry: RetryPolicy,
    dest_dir: PathBuf,
    filenames: HashMap<JobId, String>,
    progress_tx: Option<mpsc::Sender<JobProgress>>,
}

impl TransferWorker {
    fn run(&self, job: &mut DownloadJob) {
        let id = job.id();
        if let Err(e) = job.begin_download() {
            tracing::error!("{}", e);
            return;
        }
        let result = self.transfer(job);
        self.control.unregister(id);

        let finished = match result {
            Ok(path) => {
                tracing::info!(job_id = id, path = %path.display(), "download complete");
                job.complete(path)
            }
            Err(e) => job.fail(e.into()),
        };
        if let Err(e) = finished {
            tracing::error!("{}", e);
        }
    }

    fn transfer(&self, job: &mut DownloadJob) -> Result<PathBuf, TransferError> {
        let (handle, filename) = match (job.metadata(), job.selected_rendition()) {
            (Some(meta), Some(r)) => {
                let name = self
                    .filenames
                    .get(&job.id())
                    .cloned()
                    .unwrap_or_else(|| output_filename(meta, r));
                (r.transfer_handle.clone(), name)
            }
            _ => {
                return Err(TransferError::TransferInterrupted(
                    "no rendition selected".to_string(),
                ))
            }
        };
        let abort = job.abort_token();
        let provider = self.catalog.provider();
        let id = job.id();

        let mut attempt = 1u32;
        loop {
            if abort.is_aborted() {
                return Err(TransferError::Aborted);
            }
            tracing::debug!(job_id = id, attempt, file = %filename, "transfer attempt");

            let result = {
                let mut on_chunk = |done: u64, total: u64| {
                    if abort.is_aborted() {
                        return;
                    }
                    job.on_chunk(done, total);
                    if let Some(tx) = &self.progress_tx {
                        let _ = tx.try_send(JobProgress {
                            job_id: id,
                            view: job.progress(),
                        });
                    }
                };
                provider.open_transfer(&handle, &self.dest_dir, &filename, &abort, &mut on_chunk)
            };

            let err = match result {
                Ok(path) => return Ok(path),
                Err(_) if abort.is_aborted() => return Err(TransferError::Aborted),
                Err(e) => e,
            };
            match self.retry.decide(attempt, retry::classify(&err)) {
                RetryDecision::NoRetry => return Err(err),
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(job_id = id, attempt, ?delay, "retrying after: {}", err);
                    if !backoff(delay, &abort) {
                        return Err(TransferError::Aborted);
                    }
                    if job.restart_attempt().is_err() {
                        return Err(err);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// Sleeps for `delay`; returns false as soon as `abort` is set.
fn backoff(delay: Duration, abort: &AbortToken) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if abort.is_aborted() {
            return false;
        }
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return true;
        }
        thread::sleep(left.min(ABORT_POLL));
    }
}
