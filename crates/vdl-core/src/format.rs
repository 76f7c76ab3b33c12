//! Human-readable sizes and durations for display.

const MIB: u64 = 1024 * 1024;

/// Formats a byte count as kilobytes below 1 MiB and megabytes from 1 MiB up,
/// always with two decimals (e.g. `900` → `"0.88 KB"`, `2 MiB` → `"2.00 MB"`).
pub fn format_file_size(bytes: u64) -> String {
    if bytes < MIB {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.2} MB", bytes as f64 / MIB as f64)
    }
}

/// Same rule as [`format_file_size`] for a fractional rate, suffixed with `/s`.
pub fn format_speed(bytes_per_sec: f64) -> String {
    let rate = if bytes_per_sec.is_finite() && bytes_per_sec > 0.0 {
        bytes_per_sec
    } else {
        0.0
    };
    if rate < MIB as f64 {
        format!("{:.2} KB/s", rate / 1024.0)
    } else {
        format!("{:.2} MB/s", rate / MIB as f64)
    }
}

/// Formats a video length as `h:mm:ss`, or `m:ss` when under an hour.
pub fn format_length(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
