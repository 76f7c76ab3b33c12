//! URL recognition and output filename derivation.
//!
//! Output names are derived from the video title and the selected quality
//! label only, so re-running a batch with the same selections overwrites the
//! previous files instead of accumulating copies.

mod sanitize;
mod video;

pub use sanitize::sanitize_component;
pub use video::{is_http_url, youtube_video_id};

use crate::catalog::{Rendition, VideoMetadata};

/// Stem used when neither the title nor the id yields anything usable.
const DEFAULT_STEM: &str = "video";

/// Default filename stem for a video: the sanitized title up to its first `.`,
/// falling back to the sanitized video id.
pub fn default_stem(metadata: &VideoMetadata) -> String {
    let title = sanitize_component(&metadata.title);
    let stem = title.split('.').next().unwrap_or("").trim_matches('_');
    if !stem.is_empty() {
        return stem.to_string();
    }
    let id = sanitize_component(&metadata.id);
    if id.is_empty() {
        DEFAULT_STEM.to_string()
    } else {
        id
    }
}

/// Derives `{stem}_{label}.{container}` for saving `rendition` of `metadata`.
///
/// # Examples
///
/// - title `"My Trip"`, label `"720p"`, container `"mp4"` → `"My_Trip_720p.mp4"`
/// - title `"v1.2 release notes"`, label `"360p"` → `"v1_360p.mp4"`
pub fn output_filename(metadata: &VideoMetadata, rendition: &Rendition) -> String {
    compose(default_stem(metadata), rendition)
}

/// Like [`output_filename`] with `tag` inserted after the stem:
/// `{stem}_{tag}_{label}.{container}`. Used to keep two different videos in
/// one batch from sharing a destination.
pub fn output_filename_tagged(
    metadata: &VideoMetadata,
    rendition: &Rendition,
    tag: &str,
) -> String {
    let tag = sanitize_component(tag);
    let stem = default_stem(metadata);
    if tag.is_empty() {
        compose(stem, rendition)
    } else {
        compose(format!("{}_{}", stem, tag), rendition)
    }
}

fn compose(stem: String, rendition: &Rendition) -> String {
    let label = sanitize_component(&rendition.resolution_label);
    let ext = sanitize_component(&rendition.container_format).to_ascii_lowercase();
    let ext = if ext.is_empty() { "bin".to_string() } else { ext };
    if label.is_empty() {
        format!("{}.{}", stem, ext)
    } else {
        format!("{}_{}.{}", stem, label, ext)
    }
}
