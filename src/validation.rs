//! Validation of operator supplied identifiers (language tags, page sizes).

/// Language tag validation errors with helpful messages
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LanguageTagError {
    #[error("Language tag cannot be empty")]
    Empty,

    #[error("Language tag is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Language tag must start with a letter")]
    BadStart,

    #[error("Language tag contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },
}

pub const MAX_LANGUAGE_TAG_LEN: usize = 16;

/// Validate a language tag such as `en`, `de`, `pt-br` or `zh_TW`.
///
/// Returns the tag lowercased; lookups elsewhere compare lowercase tags.
pub fn validate_language_tag(tag: &str) -> Result<String, LanguageTagError> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return Err(LanguageTagError::Empty);
    }
    if trimmed.len() > MAX_LANGUAGE_TAG_LEN {
        return Err(LanguageTagError::TooLong {
            max: MAX_LANGUAGE_TAG_LEN,
        });
    }
    if !trimmed.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(LanguageTagError::BadStart);
    }
    let invalid: String = trimmed
        .chars()
        .filter(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        .collect();
    if !invalid.is_empty() {
        return Err(LanguageTagError::InvalidCharacters { chars: invalid });
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Page size for paged lists: at least one entry, and small enough to fit a client screen.
pub fn validate_list_page_size(size: usize) -> Result<usize, String> {
    match size {
        0 => Err("list_options_per_page must be at least 1".to_string()),
        1..=10 => Ok(size),
        _ => Err(format!(
            "list_options_per_page {} too large (maximum 10)",
            size
        )),
    }
}
