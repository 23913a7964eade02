//! # Radiomenu - Per-User Popup Menu Engine
//!
//! Radiomenu drives numbered "radio" menus for game servers whose clients answer with a single
//! digit. Every connected user gets a queue of pending menus; the engine shows the head,
//! routes the answer to the menu's response callback and moves on, keeping paging, submenu
//! navigation, mutually exclusive menus and localized variants consistent per user.
//!
//! ## Features
//!
//! - **Per-User Queues**: One menu on screen per user, the rest wait in order without duplicates.
//! - **Paged Menus**: Seven options per page with `8`/`9` paging links, plus long numbered lists.
//! - **Submenu Navigation**: Callbacks can replace the answered menu; the back key returns to it.
//! - **Retraction Groups**: Sending one member of a group withdraws the others from that user.
//! - **Language Groups**: One logical menu, a localized variant per client language.
//! - **Callback Menus**: Content built per user on every display.
//! - **Async Friendly**: A Tokio channel loop with refresh timers for clients that expire menus.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use radiomenu::config::Config;
//! use radiomenu::popup::{ChannelDisplay, MenuServer, StaticDirectory, UserProfile};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let (display, _frames) = ChannelDisplay::channel();
//!     let users = StaticDirectory::accept_all(UserProfile::default());
//!
//!     let mut server = MenuServer::new(config, display, users);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`popup`] - menus, sessions, groups and the session registry state machine
//! - [`config`] - TOML configuration, defaults and validation
//! - [`console`] - stdin transport and demo menus used by the binary
//! - [`validation`] - language tag and page size checks
//! - [`metrics`] - process wide counters
//! - [`logutil`] - single line log formatting helpers

pub mod config;
pub mod console;
pub mod logutil;
pub mod metrics;
pub mod popup;
pub mod validation;

#[cfg(feature = "api-reexports")]
pub use popup::{
    Menu, MenuHandle, MenuId, MenuServer, PopupError, RegistryEvent, SendArgs, SendResult,
    SessionRegistry,
};
