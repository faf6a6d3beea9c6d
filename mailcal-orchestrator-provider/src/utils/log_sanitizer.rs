//! Log sanitization utilities
//!
//! Keeps message bodies, feed documents and bearer tokens out of debug/error logs.

/// Maximum number of characters kept by [`truncate_for_log`].
const TRUNCATE_LIMIT: usize = 256;

/// Characters of a secret left visible by [`mask_secret`].
const VISIBLE_SECRET_CHARS: usize = 4;

/// Truncate a response body or document for logging.
///
/// Counts characters, not bytes, so multi-byte text is never split.
pub fn truncate_for_log(s: &str) -> String {
    match s.char_indices().nth(TRUNCATE_LIMIT) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}... [truncated, total {} bytes]", &s[..cut], s.len()),
    }
}

/// Mask a token so only its first few characters reach the log.
pub fn mask_secret(secret: &str) -> String {
    let secret = secret.trim();
    let count = secret.chars().count();
    if count <= VISIBLE_SECRET_CHARS * 2 {
        return "*".repeat(count.max(3));
    }
    let visible: String = secret.chars().take(VISIBLE_SECRET_CHARS).collect();
    format!("{visible}…({count} chars)")
}
