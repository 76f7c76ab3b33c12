//! Job cancellation: per-job abort tokens and a shared registry of running jobs.
//!
//! Every job owns an `AbortToken`. While the orchestrator is resolving or
//! transferring a job it registers the token here, so a caller (e.g. the CLI's
//! Ctrl-C handler) can abort one job by id or all of them at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Shared abort flag. Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortToken(Arc<AtomicBool>);

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests abort. Workers observe it at their next chunk or poll.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Registry of job id -> abort token for jobs currently in flight.
#[derive(Debug, Default)]
pub struct JobControl {
    jobs: RwLock<HashMap<u64, AbortToken>>,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job that is about to resolve or transfer.
    pub fn register(&self, job_id: u64, token: AbortToken) {
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job_id, token);
    }

    /// Unregister a job (call when its phase ends, success or failure).
    pub fn unregister(&self, job_id: u64) {
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&job_id);
    }

    /// Request abort for one in-flight job. Returns false if the job is not registered.
    pub fn request_abort(&self, job_id: u64) -> bool {
        match self
            .jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&job_id)
        {
            Some(token) => {
                token.abort();
                true
            }
            None => false,
        }
    }

    /// Request abort for every in-flight job; returns how many were signalled.
    pub fn abort_all(&self) -> usize {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        for token in jobs.values() {
            token.abort();
        }
        jobs.len()
    }

    pub fn in_flight(&self) -> usize {
        self.jobs.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
