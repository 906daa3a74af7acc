/// Truncate to at most `max_chars` Unicode scalar values.
///
/// Column limits in the schema are in characters, not bytes.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Character count as Postgres and users see it.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}
