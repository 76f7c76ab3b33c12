//! Video URL recognition.

/// Returns true for an absolute `http`/`https` URL with a host.
pub fn is_http_url(url: &str) -> bool {
    match url::Url::parse(url.trim()) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// Extracts the YouTube video id from watch, short-link, embed and shorts URLs.
///
/// Returns `None` for anything that is not a recognizable single-video link.
pub fn youtube_video_id(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    let id = match host {
        "youtu.be" => segments.first().map(|s| s.to_string()),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
            match segments.first().copied() {
                Some("watch") => parsed
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("shorts") | Some("embed") | Some("live") | Some("v") => {
                    segments.get(1).map(|s| s.to_string())
                }
                _ => None,
            }
        }
        _ => None,
    }?;

    is_plausible_video_id(&id).then_some(id)
}

/// YouTube ids are 11 characters of `[A-Za-z0-9_-]`.
fn is_plausible_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
