//! CLI for the VDL batch video downloader.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vdl_core::config;

use commands::{run_completions, run_get, run_info, run_man, Selection};

/// Top-level CLI for the VDL batch video downloader.
#[derive(Debug, Parser)]
#[command(name = "vdl", version)]
#[command(about = "VDL: resolve and download videos in batches", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Show title, length and available renditions for each URL.
    Info {
        /// Video page URLs.
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,
    },

    /// Download one rendition of each URL (highest resolution by default).
    Get {
        /// Video page URLs.
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,

        #[command(flatten)]
        select: SelectArgs,

        /// Destination directory (default: `download_dir` from config).
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Download up to N videos at once (default: `transfer_workers` from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Print the man page (roff).
    Man,
}

#[derive(Debug, Args, Default)]
#[group(multiple = false)]
pub struct SelectArgs {
    /// Resolution label, e.g. 720p; falls back to the next lower one available.
    #[arg(long, value_name = "LABEL")]
    pub quality: Option<String>,

    /// Rendition number as listed by `vdl info` (1 = lowest).
    #[arg(long, value_name = "N")]
    pub index: Option<usize>,

    /// Ask for each video which rendition to download.
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

impl SelectArgs {
    pub fn selection(&self) -> Selection {
        if self.interactive {
            Selection::Interactive
        } else if let Some(n) = self.index {
            Selection::Index(n)
        } else if let Some(q) = &self.quality {
            Selection::Quality(q.clone())
        } else {
            Selection::Highest
        }
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Info { urls } => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_info(&cfg, &urls).await?;
            }
            CliCommand::Get {
                urls,
                select,
                dir,
                jobs,
            } => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                let dir = dir.unwrap_or_else(|| cfg.download_dir.clone());
                run_get(&cfg, &urls, &select.selection(), &dir, jobs).await?;
            }
            CliCommand::Completions { shell } => run_completions(shell)?,
            CliCommand::Man => run_man()?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
