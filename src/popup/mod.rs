//! # Popup Menu Engine
//!
//! Numbered "radio" menus for game clients that answer with a single digit. Each connected
//! user owns a queue of pending menus; only the head is on screen, and the user's answer is
//! routed back to that menu's response callback.
//!
//! ## Pieces
//!
//! - [`menu`] - shared menu definitions, ids, handles and the callback protocol
//! - [`view`] / [`session`] - per-user page position, built content, queue and history
//! - [`group`] - retraction groups and language groups
//! - [`registry`] - the [`SessionRegistry`] state machine that owns all of the above
//! - [`hooks`] - traits for the display, user directory, strings and refresh timers
//! - [`server`] - [`MenuServer`], a channel driven loop around the registry
//!
//! ## Example
//!
//! ```rust
//! use radiomenu::popup::{
//!     ChannelDisplay, Menu, RegistrySettings, SendArgs, SendResult, SessionRegistry,
//!     StaticDirectory, UserProfile,
//! };
//!
//! let (display, mut frames) = ChannelDisplay::channel();
//! let users = StaticDirectory::accept_all(UserProfile::default());
//! let mut registry = SessionRegistry::new(RegistrySettings::default(), display, users);
//!
//! let mut maps = Menu::paged("Vote for a map");
//! maps.add("dust", "de_dust", true);
//! maps.add("aztec", "de_aztec", true);
//! let maps = registry.create_menu(maps.with_callback(|_, params| {
//!     println!("user {} voted {}", params.user, params.choice);
//!     Ok(SendResult::Advance)
//! }));
//!
//! registry.send(7, maps.into(), SendArgs::default())?;
//! assert!(frames.try_recv().is_ok());
//! registry.got_response(7, 2);
//! assert!(registry.queue_of(7).is_empty());
//! # Ok::<(), radiomenu::popup::PopupError>(())
//! ```

pub mod errors;
pub mod group;
pub mod hooks;
pub mod keys;
pub mod menu;
pub mod option;
pub mod registry;
pub mod resources;
pub mod server;
pub mod session;
pub mod template;
pub mod view;

/// Connection scoped user identifier handed out by the host server.
pub type UserId = u32;

pub use errors::{PopupError, PopupResult};
pub use group::{GroupedMenu, LanguageDefaults, LanguageGroup, MenuGroup};
pub use hooks::{
    ChannelDisplay, ChannelRefreshScheduler, DisplayFrame, Localizer, MenuDisplay, NoRefresh,
    RefreshScheduler, StaticDirectory, UserDirectory, UserProfile,
};
pub use keys::KeySet;
pub use menu::{
    BuildContext, GroupedMenuId, LanguageGroupId, Menu, MenuGroupId, MenuHandle, MenuId, MenuKind,
    ResponseParams, SendArgs, SendResult, ViewContent,
};
pub use option::{Entry, MenuOption};
pub use registry::{CommandDisposition, RegistryEvent, RegistrySettings, SessionRegistry};
pub use resources::StringTable;
pub use server::MenuServer;
pub use session::Session;
pub use view::SessionView;
