//! `vdl info` – resolve URLs and print what can be downloaded.

use anyhow::Result;
use vdl_core::config::VdlConfig;
use vdl_core::format::format_length;
use vdl_core::JobState;

use super::orchestrator;

pub async fn run_info(cfg: &VdlConfig, urls: &[String]) -> Result<()> {
    let orch = orchestrator(cfg, None);
    let jobs = orch.submit_all(urls.iter().cloned()).await;

    for job in &jobs {
        println!("{}", job.source_url());
        if job.state() != JobState::Ready {
            if let Some(e) = job.error() {
                println!("  error: {}", e);
            }
            continue;
        }
        if let Some(m) = job.metadata() {
            println!("  Title:     {}", m.title);
            println!("  Length:    {}", format_length(m.length_seconds));
            if !m.thumbnail_ref.is_empty() {
                println!("  Thumbnail: {}", m.thumbnail_ref);
            }
        }
        for (i, label) in job.rendition_labels().iter().enumerate() {
            println!("  {:>3}. {}", i + 1, label);
        }
    }
    Ok(())
}
