//! Collaborator interfaces the registry calls out to, plus the stock implementations.
//!
//! The registry never talks to a client directly. Rendering goes through [`MenuDisplay`],
//! profile facts come from [`UserDirectory`], strings from [`Localizer`] and delayed
//! re-display through [`RefreshScheduler`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{trace, warn};
use tokio::sync::mpsc;

use super::keys::KeySet;
use super::registry::RegistryEvent;
use super::UserId;

/// Fire-and-forget output towards a user's client.
pub trait MenuDisplay: Send {
    fn render(&self, user: UserId, text: &str, keys: KeySet);
    fn close(&self, user: UserId);
}

/// Facts about a user needed when their session is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub language: Option<String>,
    /// Bots and other automated clients never get menus.
    pub automated: bool,
}

pub trait UserDirectory: Send {
    /// `None` when the id does not belong to a connected user.
    fn profile(&self, user: UserId) -> Option<UserProfile>;
}

pub trait Localizer: Send {
    fn lookup(&self, key: &str, language: &str) -> String;
}

pub trait RefreshScheduler: Send {
    /// Arrange for `RegistryEvent::RefreshDue(user)` to be delivered after `after`.
    fn schedule(&self, user: UserId, after: Duration);
}

/// Frames emitted by [`ChannelDisplay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayFrame {
    Render {
        user: UserId,
        text: String,
        keys: String,
    },
    Close {
        user: UserId,
    },
}

impl DisplayFrame {
    pub fn user(&self) -> UserId {
        match self {
            DisplayFrame::Render { user, .. } | DisplayFrame::Close { user } => *user,
        }
    }
}

/// Hands frames to a writer task over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelDisplay {
    tx: mpsc::UnboundedSender<DisplayFrame>,
}

impl ChannelDisplay {
    pub fn new(tx: mpsc::UnboundedSender<DisplayFrame>) -> Self {
        ChannelDisplay { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DisplayFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelDisplay { tx }, rx)
    }
}

impl MenuDisplay for ChannelDisplay {
    fn render(&self, user: UserId, text: &str, keys: KeySet) {
        let _ = self.tx.send(DisplayFrame::Render {
            user,
            text: text.to_string(),
            keys: keys.to_string(),
        });
    }

    fn close(&self, user: UserId) {
        let _ = self.tx.send(DisplayFrame::Close { user });
    }
}

/// In-memory directory. Clones share the same table, so a transport can register users after
/// the registry has taken its copy.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    inner: Arc<Mutex<DirectoryTable>>,
}

#[derive(Debug, Default)]
struct DirectoryTable {
    profiles: HashMap<UserId, UserProfile>,
    fallback: Option<UserProfile>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory that knows every id, answering with `profile` for ids never inserted.
    pub fn accept_all(profile: UserProfile) -> Self {
        let dir = Self::default();
        dir.table().fallback = Some(profile);
        dir
    }

    fn table(&self) -> std::sync::MutexGuard<'_, DirectoryTable> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn insert(&self, user: UserId, profile: UserProfile) {
        self.table().profiles.insert(user, profile);
    }

    pub fn remove(&self, user: UserId) -> Option<UserProfile> {
        self.table().profiles.remove(&user)
    }
}

impl UserDirectory for StaticDirectory {
    fn profile(&self, user: UserId) -> Option<UserProfile> {
        let table = self.table();
        let found = table
            .profiles
            .get(&user)
            .cloned()
            .or_else(|| table.fallback.clone());
        found
    }
}

/// Posts `RefreshDue` back into the registry's event channel after a tokio sleep.
#[derive(Debug, Clone)]
pub struct ChannelRefreshScheduler {
    tx: mpsc::UnboundedSender<RegistryEvent>,
}

impl ChannelRefreshScheduler {
    pub fn new(tx: mpsc::UnboundedSender<RegistryEvent>) -> Self {
        ChannelRefreshScheduler { tx }
    }
}

impl RefreshScheduler for ChannelRefreshScheduler {
    fn schedule(&self, user: UserId, after: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime; periodic refresh for user {} skipped", user);
            return;
        };
        let tx = self.tx.clone();
        runtime.spawn(async move {
            tokio::time::sleep(after).await;
            trace!("refresh timer fired for user {}", user);
            let _ = tx.send(RegistryEvent::RefreshDue(user));
        });
    }
}

/// Scheduler for deployments whose clients never time menus out.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRefresh;

impl RefreshScheduler for NoRefresh {
    fn schedule(&self, _user: UserId, _after: Duration) {}
}
