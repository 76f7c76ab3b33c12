//! `vdl get` – resolve, pick a rendition per URL, download with live progress.

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use vdl_core::config::VdlConfig;
use vdl_core::{DownloadOutcome, JobId, JobProgress, JobState};

use super::orchestrator;
use super::select::{choose, prompt, Selection};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Exit status after an interrupt (128 + SIGINT).
const INTERRUPTED_EXIT: i32 = 130;

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// Jobs were signalled; keep waiting for them to settle.
    Aborting(usize),
    Quit,
}

/// What Ctrl-C press number `presses` does when `aborted` jobs were signalled.
fn on_interrupt(presses: u32, aborted: usize) -> Interrupt {
    if presses > 1 || aborted == 0 {
        Interrupt::Quit
    } else {
        Interrupt::Aborting(aborted)
    }
}

pub async fn run_get(
    cfg: &VdlConfig,
    urls: &[String],
    selection: &Selection,
    dir: &Path,
    transfer_workers: Option<usize>,
) -> Result<()> {
    let (progress_tx, mut progress_rx) = mpsc::channel::<JobProgress>(64);
    let orch = orchestrator(cfg, transfer_workers).with_progress(progress_tx);

    let control = orch.control();
    let ctrl_c = tokio::spawn(async move {
        let mut presses = 0u32;
        while tokio::signal::ctrl_c().await.is_ok() {
            presses += 1;
            match on_interrupt(presses, control.abort_all()) {
                Interrupt::Aborting(n) => {
                    eprintln!("\ninterrupted, aborting {} job(s); press Ctrl-C again to quit", n);
                }
                Interrupt::Quit => {
                    eprintln!("\ninterrupted");
                    std::process::exit(INTERRUPTED_EXIT);
                }
            }
        }
    });

    let resolved = orch.submit_all(urls.iter().cloned()).await;
    let total = resolved.len();

    let mut jobs = Vec::with_capacity(total);
    let mut skipped = 0usize;
    for mut job in resolved {
        if job.state() == JobState::Ready {
            let choice = match selection {
                Selection::Interactive => {
                    let stdin = std::io::stdin();
                    prompt(&job, &mut stdin.lock(), &mut std::io::stdout())
                }
                other => choose(job.renditions(), other),
            };
            match choice.map(|i| job.select_rendition(i).map_err(anyhow::Error::from)) {
                Ok(Ok(())) => {}
                Ok(Err(e)) | Err(e) => {
                    println!("skip {}: {:#}", job.source_url(), e);
                    skipped += 1;
                    continue;
                }
            }
        }
        jobs.push(job);
    }

    let names: HashMap<JobId, String> = jobs
        .iter()
        .map(|j| {
            let name = j
                .metadata()
                .map(|m| m.title.clone())
                .unwrap_or_else(|| j.source_url().to_string());
            (j.id(), name)
        })
        .collect();
    let progress_handle = tokio::spawn(async move {
        let mut last_print: HashMap<JobId, Instant> = HashMap::new();
        while let Some(p) = progress_rx.recv().await {
            let now = Instant::now();
            let due = last_print
                .get(&p.job_id)
                .map_or(true, |t| now.duration_since(*t) >= PROGRESS_INTERVAL);
            if due || p.view.fraction >= 1.0 {
                let name = names.get(&p.job_id).map(String::as_str).unwrap_or("?");
                println!(
                    "  [{}] {}  {:5.1}%  {} left  {}  ETA {:.0}s",
                    p.job_id,
                    name,
                    p.view.fraction * 100.0,
                    p.view.remaining,
                    p.view.speed,
                    p.view.eta_secs
                );
                last_print.insert(p.job_id, now);
            }
        }
    });

    let outcomes = orch.run_all(&mut jobs, dir).await?;
    drop(orch);
    let _ = progress_handle.await;
    ctrl_c.abort();

    let mut failed = skipped;
    for (job, outcome) in jobs.iter().zip(&outcomes) {
        match outcome {
            DownloadOutcome::Success(path) => {
                println!("ok   {} -> {}", job.source_url(), path.display());
            }
            DownloadOutcome::Failure { kind, message } => {
                println!("FAIL {} [{}]: {}", job.source_url(), kind, message);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} downloads failed", failed, total);
    }
    tracing::info!("downloaded {} video(s) into {}", total, dir.display());
    Ok(())
}
