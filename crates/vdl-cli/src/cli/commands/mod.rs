//! CLI command handlers, one file per command.

mod completions;
mod get;
mod info;
mod man;
mod select;

use std::sync::Arc;

use vdl_core::config::VdlConfig;
use vdl_core::{BatchOrchestrator, BatchSettings, RenditionCatalog, SourceProvider, YtDlpProvider};

pub use completions::run_completions;
pub use get::run_get;
pub use info::run_info;
pub use man::run_man;
pub use select::Selection;

/// Orchestrator over the yt-dlp provider as configured.
fn orchestrator(cfg: &VdlConfig, transfer_workers: Option<usize>) -> BatchOrchestrator {
    let provider: Arc<dyn SourceProvider> = Arc::new(YtDlpProvider::new(&cfg.ytdlp_path));
    let catalog = Arc::new(RenditionCatalog::new(provider, cfg.container_format.as_str()));
    let mut settings = BatchSettings::from(cfg);
    if let Some(n) = transfer_workers {
        settings.transfer_workers = n.max(1);
    }
    BatchOrchestrator::new(catalog, settings)
}
