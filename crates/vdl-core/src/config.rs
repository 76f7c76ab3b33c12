use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Retry policy for interrupted transfers (optional `[retry]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per transfer, including the first.
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.5,
            max_delay_secs: 10,
        }
    }
}

/// Global configuration loaded from `~/.config/vdl/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VdlConfig {
    /// Where downloads are written when `--dir` is not given.
    pub download_dir: PathBuf,
    /// Only renditions in this container are offered.
    pub container_format: String,
    /// Concurrent URL resolutions.
    pub resolve_workers: usize,
    /// Concurrent transfers; 1 downloads strictly in submission order.
    pub transfer_workers: usize,
    /// yt-dlp executable, looked up on `PATH` if not absolute.
    pub ytdlp_path: PathBuf,
    /// If missing, built-in defaults are used.
    pub retry: Option<RetryConfig>,
}

impl Default for VdlConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            container_format: crate::catalog::DEFAULT_CONTAINER.to_string(),
            resolve_workers: 4,
            transfer_workers: 1,
            ytdlp_path: PathBuf::from("yt-dlp"),
            retry: None,
        }
    }
}

impl VdlConfig {
    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VdlConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<VdlConfig> {
    if !path.exists() {
        let default_cfg = VdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: VdlConfig =
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}
