//! Classify yt-dlp failure output into resolution error kinds.

use crate::error::ResolutionError;

const UNAVAILABLE_MARKERS: &[&str] = &[
    "video unavailable",
    "private video",
    "has been removed",
    "is not available",
    "available in your country",
    "blocked it in your country",
    "sign in to confirm your age",
    "members-only",
    "this live event will begin",
    "account associated with this video has been terminated",
];

const INVALID_URL_MARKERS: &[&str] = &[
    "is not a valid url",
    "unsupported url",
    "incomplete youtube id",
];

/// Picks the most specific error line from yt-dlp's stderr.
fn error_line(stderr: &str) -> Option<&str> {
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .copied()
        .map(|l| l.trim_start_matches("ERROR:").trim())
}

/// Maps a failed yt-dlp run to a resolution error.
pub fn classify_stderr(stderr: &str) -> ResolutionError {
    let Some(line) = error_line(stderr) else {
        return ResolutionError::ResolutionFailed("yt-dlp exited with an error".to_string());
    };
    let lower = line.to_lowercase();
    if INVALID_URL_MARKERS.iter().any(|m| lower.contains(m)) {
        return ResolutionError::InvalidUrl(line.to_string());
    }
    if UNAVAILABLE_MARKERS.iter().any(|m| lower.contains(m)) {
        return ResolutionError::Unavailable(line.to_string());
    }
    ResolutionError::ResolutionFailed(line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_and_removed_are_unavailable() {
        let e = classify_stderr("ERROR: [youtube] abcdefghijk: Private video. Sign in if you've been granted access\n");
        assert!(matches!(e, ResolutionError::Unavailable(ref m) if m.contains("Private video")));
        let e = classify_stderr("WARNING: something\nERROR: [youtube] x: Video unavailable. This video has been removed by the uploader");
        assert!(matches!(e, ResolutionError::Unavailable(_)));
    }

    #[test]
    fn region_block_is_unavailable() {
        let e = classify_stderr("ERROR: [youtube] x: The uploader has not made this video available in your country");
        assert!(matches!(e, ResolutionError::Unavailable(_)));
    }

    #[test]
    fn unsupported_url_is_invalid() {
        let e = classify_stderr("ERROR: Unsupported URL: https://example.com/nothing");
        assert!(matches!(e, ResolutionError::InvalidUrl(_)));
    }

    #[test]
    fn other_errors_keep_the_cause() {
        let e = classify_stderr("ERROR: unable to download webpage: HTTP Error 500");
        assert_eq!(
            e,
            ResolutionError::ResolutionFailed("unable to download webpage: HTTP Error 500".into())
        );
    }

    #[test]
    fn empty_stderr_still_reports() {
        assert!(matches!(classify_stderr("  \n"), ResolutionError::ResolutionFailed(_)));
    }
}
