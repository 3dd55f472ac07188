//! String helpers for previews and summaries.

/// Shorten `s` to at most `max_chars` characters, appending `...` when cut.
///
/// Counts characters rather than bytes so multi-byte text is never split.
pub fn preview(s: &str, max_chars: usize) -> String {
    let mut chars = s.char_indices();
    match chars.nth(max_chars) {
        None => s.to_string(),
        Some(_) => {
            let keep = max_chars.saturating_sub(3);
            let cut = s
                .char_indices()
                .nth(keep)
                .map(|(idx, _)| idx)
                .unwrap_or(s.len());
            format!("{}...", &s[..cut])
        }
    }
}

/// Collapse a multi-line text into a single line for log fields.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
