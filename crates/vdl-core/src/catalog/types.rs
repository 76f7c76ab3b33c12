//! Resolved video data: metadata, renditions and transfer handles.

use std::collections::HashMap;

use crate::format::format_file_size;

/// Immutable description of one video, produced by a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    /// Source-assigned identifier.
    pub id: String,
    pub title: String,
    pub length_seconds: u64,
    /// Opaque thumbnail URI (may be empty).
    pub thumbnail_ref: String,
}

/// What a transfer executor needs to stream a rendition's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferHandle {
    /// Direct media URL.
    pub url: String,
    /// Request headers the source requires for the GET.
    pub headers: HashMap<String, String>,
    /// Provider-side format identifier, if any.
    pub format_id: Option<String>,
    /// Expected byte count when the server omits Content-Length (0 = unknown).
    pub size_hint: u64,
}

impl TransferHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            format_id: None,
            size_hint: 0,
        }
    }
}

/// One directly downloadable encoding of a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    /// e.g. `"720p"`.
    pub resolution_label: String,
    pub size_bytes: u64,
    /// e.g. `"mp4"`.
    pub container_format: String,
    pub transfer_handle: TransferHandle,
}

impl Rendition {
    /// Numeric sort key taken from the first digit run of the label
    /// (`"720p"` → 720, `"1080p60"` → 1080, `"audio"` → 0).
    pub fn resolution_key(&self) -> u32 {
        resolution_key(&self.resolution_label)
    }

    /// `"{label} ({human size})"`, e.g. `"720p (12.40 MB)"`.
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.resolution_label, format_file_size(self.size_bytes))
    }
}

pub fn resolution_key(label: &str) -> u32 {
    label
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .fold(0u32, |acc, c| {
            acc.saturating_mul(10)
                .saturating_add(c.to_digit(10).unwrap_or(0))
        })
}

/// Cached resolution result for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub metadata: VideoMetadata,
    /// Sorted ascending by resolution key; never empty.
    pub renditions: Vec<Rendition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_keys() {
        assert_eq!(resolution_key("720p"), 720);
        assert_eq!(resolution_key("1080p60"), 1080);
        assert_eq!(resolution_key("hd360"), 360);
        assert_eq!(resolution_key("audio"), 0);
        assert_eq!(resolution_key(""), 0);
    }

    #[test]
    fn display_label_uses_human_size() {
        let r = Rendition {
            resolution_label: "360p".into(),
            size_bytes: 900,
            container_format: "mp4".into(),
            transfer_handle: TransferHandle::new("https://cdn.example.com/a"),
        };
        assert_eq!(r.display_label(), "360p (0.88 KB)");
    }
}
