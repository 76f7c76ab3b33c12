//! Subset of the `yt-dlp --dump-json` document needed to build renditions.

use std::collections::HashMap;

use serde::Deserialize;

use crate::catalog::{Rendition, TransferHandle, VideoMetadata};

#[derive(Debug, Deserialize)]
pub struct YtDlpInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub is_live: Option<bool>,
    #[serde(default)]
    pub formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
pub struct YtDlpFormat {
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub filesize: Option<f64>,
    #[serde(default)]
    pub filesize_approx: Option<f64>,
    #[serde(default)]
    pub http_headers: HashMap<String, String>,
}

fn has_codec(codec: &Option<String>) -> bool {
    matches!(codec.as_deref(), Some(c) if !c.is_empty() && c != "none")
}

impl YtDlpFormat {
    /// Audio and video in one file, fetched with a plain HTTP GET.
    pub fn is_progressive(&self) -> bool {
        let plain_http = match self.protocol.as_deref() {
            Some(p) => p == "http" || p == "https",
            None => self
                .url
                .as_deref()
                .is_some_and(|u| u.starts_with("http://") || u.starts_with("https://")),
        };
        plain_http
            && self.url.is_some()
            && has_codec(&self.vcodec)
            && has_codec(&self.acodec)
            && self.height.unwrap_or(0) > 0
    }

    pub fn size_bytes(&self) -> u64 {
        self.filesize
            .or(self.filesize_approx)
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(|s| s as u64)
            .unwrap_or(0)
    }

    fn to_rendition(&self) -> Option<Rendition> {
        if !self.is_progressive() {
            return None;
        }
        let size_bytes = self.size_bytes();
        Some(Rendition {
            resolution_label: format!("{}p", self.height?),
            size_bytes,
            container_format: self.ext.clone(),
            transfer_handle: TransferHandle {
                url: self.url.clone()?,
                headers: self.http_headers.clone(),
                format_id: Some(self.format_id.clone()).filter(|f| !f.is_empty()),
                size_hint: size_bytes,
            },
        })
    }
}

impl YtDlpInfo {
    pub fn metadata(&self) -> VideoMetadata {
        let length_seconds = self
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d.round() as u64)
            .unwrap_or(0);
        VideoMetadata {
            id: self.id.clone(),
            title: self.title.clone(),
            length_seconds,
            thumbnail_ref: self.thumbnail.clone().unwrap_or_default(),
        }
    }

    /// Progressive renditions in the order yt-dlp listed them.
    pub fn renditions(&self) -> Vec<Rendition> {
        self.formats.iter().filter_map(YtDlpFormat::to_rendition).collect()
    }
}
