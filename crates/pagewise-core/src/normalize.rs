//! Whitespace canonicalization for page text.

/// Canonicalize whitespace in raw page text.
///
/// Newlines become spaces, every whitespace run collapses to a single
/// space, and leading/trailing whitespace is removed. Total and idempotent.
///
/// ```rust
/// use pagewise_core::normalize::normalize;
///
/// assert_eq!(normalize("Hello\nworld"), "Hello world");
/// assert_eq!(normalize("  Second   page  "), "Second page");
/// ```
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for word in raw.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
