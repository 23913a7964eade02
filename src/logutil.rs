//! Logging helpers that keep rendered menu text on a single log line.

/// Default preview length for menu text in debug logs.
pub const MAX_PREVIEW: usize = 300;

/// Escape a string for single-line logging, truncating after [`MAX_PREVIEW`] characters.
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
/// - other control characters => `\xNN`
pub fn escape_log(s: &str) -> String {
    escape_log_with_limit(s, MAX_PREVIEW)
}

/// Same as [`escape_log`] with a caller chosen preview length. Output past the limit is
/// replaced by an ellipsis.
pub fn escape_log_with_limit(s: &str, max_preview: usize) -> String {
    let mut out = String::with_capacity(s.len().min(max_preview) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= max_preview {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// First line of a menu (usually its title) with trailing padding removed.
pub fn headline(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim_end()
}
