use thiserror::Error;

use super::menu::MenuId;
use super::UserId;

/// Errors reported to application code driving the popup registry.
///
/// Failures raised by response callbacks never surface here: they are logged and the session
/// moves on as if the callback returned nothing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PopupError {
    /// The user directory has no profile for this id (not connected, or already gone).
    #[error("unknown user id: {0}")]
    UnknownUser(UserId),

    /// The handle refers to a menu that was removed or never existed.
    #[error("unknown menu: {0}")]
    UnknownMenu(MenuId),

    /// The handle refers to a retraction or language group that was dropped.
    #[error("unknown menu group: {0}")]
    UnknownGroup(String),

    /// Requested page is outside `1..=pages` for the paged menu.
    #[error("invalid page {page} (menu has {pages} pages)")]
    InvalidPage { page: usize, pages: usize },

    /// A language group was asked to pick a menu but holds none.
    #[error("language group has no menus")]
    EmptyLanguageGroup,

    /// Language tag failed validation.
    #[error("invalid language tag: {0}")]
    InvalidLanguage(String),
}

pub type PopupResult<T> = std::result::Result<T, PopupError>;
