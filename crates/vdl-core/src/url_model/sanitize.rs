//! Filesystem-safe filename components.

/// Sanitizes a video title or label for use as part of a filename.
///
/// - Replaces NUL, path separators, control characters and `:*?"<>|` with `_`
/// - Turns whitespace into `_` and collapses consecutive underscores
/// - Trims leading/trailing dots, spaces and underscores
/// - Limits length to 200 bytes so suffixes still fit under NAME_MAX
pub fn sanitize_component(name: &str) -> String {
    const MAX_LEN: usize = 200;

    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let unsafe_char = matches!(c, '\0' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            || c.is_control()
            || c.is_whitespace();
        if unsafe_char || c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');

    if trimmed.len() > MAX_LEN {
        let mut take = MAX_LEN;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].trim_end_matches(['.', '_']).to_string()
    } else {
        trimmed.to_string()
    }
}
