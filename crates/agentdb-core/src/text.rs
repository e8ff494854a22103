//! Text helpers shared by the interceptor and the awakening engine.

/// Marker appended to any value cut by [`truncate_chars`].
pub const TRUNCATION_MARKER: &str = "...";

/// Truncate to at most `max_chars` Unicode scalars, appending
/// [`TRUNCATION_MARKER`] when anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((boundary, _)) => format!("{}{TRUNCATION_MARKER}", &text[..boundary]),
    }
}

/// Estimate token count for text content.
/// Approximation: bytes / 4, rounded up.
pub fn estimate_text_tokens(text: &str) -> u32 {
    tokens_for_len(text.len())
}

/// Token estimate for `len` bytes, saturating at `u32::MAX`.
pub fn tokens_for_len(len: usize) -> u32 {
    u32::try_from(len.div_ceil(4)).unwrap_or(u32::MAX)
}

/// Estimate tokens for any serializable value by its compact JSON form.
pub fn estimate_json_tokens<T: serde::Serialize + ?Sized>(value: &T) -> u32 {
    serde_json::to_string(value)
        .map(|s| estimate_text_tokens(&s))
        .unwrap_or(0)
}
