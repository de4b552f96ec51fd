/// Byte-bounded prefix that never splits a UTF-8 sequence. Used to keep
/// backend bodies short in log lines.
pub fn preview(value: &str, max_bytes: usize) -> String {
    if value.len() <= max_bytes {
        return value.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &value[..end])
}

pub fn char_prefix(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

/// Case-insensitive substring test; `needle` must already be lowercase.
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::{char_prefix, contains_folded, preview};

    #[test]
    fn preview_keeps_short_text() {
        assert_eq!(preview("hello", 10), "hello");
    }

    #[test]
    fn preview_does_not_split_utf8() {
        assert_eq!(preview("a\u{1F600}b", 2), "a...");
        assert_eq!(preview("a\u{1F600}b", 5), "a\u{1F600}...");
    }

    #[test]
    fn char_prefix_counts_characters() {
        assert_eq!(char_prefix("\u{00E9}t\u{00E9}", 2), "\u{00E9}t");
        assert_eq!(char_prefix("ab", 100), "ab");
    }

    #[test]
    fn contains_folded_ignores_case() {
        assert!(contains_folded("ACME Corp", "acme"));
        assert!(!contains_folded("Globex", "acme"));
    }
}
