//! Per-user popup queue, navigation history and view cache.
//!
//! The session only manipulates its own lists. Anything that has to reach the display or the
//! active-user set goes through [`SessionRegistry`](super::registry::SessionRegistry), which
//! owns every session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::hooks::UserProfile;
use super::menu::MenuId;
use super::view::SessionView;
use super::UserId;

/// Popup state for one connected user.
///
/// Invariants kept by the methods here:
/// - a menu appears in `queue` at most once, except transiently while a response is being
///   routed and the head re-queues itself (the head is popped right after)
/// - `queue[0]`, when present, is the menu currently shown to the user
/// - the history never holds the shown menu once the registry has refreshed the display
#[derive(Debug)]
pub struct Session {
    id: UserId,
    pub(crate) language: Option<String>,
    pub(crate) automated: bool,
    pub(crate) queue: Vec<MenuId>,
    pub(crate) history: Vec<MenuId>,
    pub(crate) views: HashMap<MenuId, SessionView>,
    pub(crate) activated: bool,
    pub(crate) pending_refresh: u32,
    handling_response: Arc<AtomicBool>,
}

/// Marks a session as routing a response until dropped.
///
/// While held, display refreshes for the session are suppressed. Release happens on drop, so
/// an early return or a panic inside a callback cannot leave the flag stuck.
#[must_use]
pub struct ResponseGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for ResponseGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Session {
    pub fn new(id: UserId, profile: UserProfile) -> Self {
        Session {
            id,
            language: profile.language,
            automated: profile.automated,
            queue: Vec::new(),
            history: Vec::new(),
            views: HashMap::new(),
            activated: false,
            pending_refresh: 0,
            handling_response: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn is_automated(&self) -> bool {
        self.automated
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn queue(&self) -> &[MenuId] {
        &self.queue
    }

    pub fn history(&self) -> &[MenuId] {
        &self.history
    }

    pub fn view(&self, menu: MenuId) -> Option<&SessionView> {
        self.views.get(&menu)
    }

    pub(crate) fn view_entry(&mut self, menu: MenuId) -> &mut SessionView {
        self.views
            .entry(menu)
            .or_insert_with(|| SessionView::new(menu))
    }

    pub fn head(&self) -> Option<MenuId> {
        self.queue.first().copied()
    }

    pub fn position(&self, menu: MenuId) -> Option<usize> {
        self.queue.iter().position(|m| *m == menu)
    }

    pub fn is_handling_response(&self) -> bool {
        self.handling_response.load(Ordering::SeqCst)
    }

    pub(crate) fn begin_response(&self) -> ResponseGuard {
        self.handling_response.store(true, Ordering::SeqCst);
        ResponseGuard {
            flag: Arc::clone(&self.handling_response),
        }
    }

    /// Queue a menu unless it is already waiting. Returns its queue index.
    ///
    /// The head re-queuing itself while its own response is being routed gets one trailing
    /// copy: the head is about to be popped, and the copy keeps it on screen afterwards.
    pub(crate) fn want(&mut self, menu: MenuId) -> usize {
        let requeue_head = self.is_handling_response() && self.head() == Some(menu);
        let existing = if requeue_head {
            self.queue
                .iter()
                .skip(1)
                .position(|m| *m == menu)
                .map(|index| index + 1)
        } else {
            self.position(menu)
        };
        match existing {
            Some(index) => index,
            None => {
                self.queue.push(menu);
                self.queue.len() - 1
            }
        }
    }

    pub(crate) fn pop_head(&mut self) -> Option<MenuId> {
        if self.queue.is_empty() {
            None
        } else {
            Some(self.queue.remove(0))
        }
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> Option<MenuId> {
        (index < self.queue.len()).then(|| self.queue.remove(index))
    }

    /// Put `menu` at the head in place of whatever is there, dropping any later copy.
    pub(crate) fn replace_head(&mut self, menu: MenuId) {
        if self.queue.is_empty() {
            self.queue.push(menu);
            return;
        }
        self.queue[0] = menu;
        let mut seen_head = false;
        self.queue.retain(|m| {
            if *m != menu {
                return true;
            }
            let keep = !seen_head;
            seen_head = true;
            keep
        });
    }

    pub(crate) fn history_top(&self) -> Option<MenuId> {
        self.history.last().copied()
    }

    pub(crate) fn push_history(&mut self, menu: MenuId) {
        self.history.push(menu);
    }

    pub(crate) fn forget_history(&mut self, menu: MenuId) {
        if let Some(index) = self.history.iter().position(|m| *m == menu) {
            self.history.remove(index);
        }
    }

    /// Move the most recent history entry right behind the head so it shows once the head is
    /// discarded. Always asks the caller to re-check the queue.
    pub(crate) fn go_back(&mut self) -> bool {
        if let Some(previous) = self.history.pop() {
            let at = self.queue.len().min(1);
            self.queue.insert(at, previous);
        }
        true
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
        self.history.clear();
    }

    /// Drop everything that refers to a removed menu.
    pub(crate) fn purge_menu(&mut self, menu: MenuId) {
        self.queue.retain(|m| *m != menu);
        self.history.retain(|m| *m != menu);
        self.views.remove(&menu);
    }
}
