//! The session registry: owner of every menu, group and user session, and the state machine
//! that routes user input back to the menu on screen.
//!
//! ## Queue model
//!
//! Each user has a queue of pending menus. The head is what the client shows; answering it
//! either *advances* (head discarded, next one shown) or *stays* (a submenu replaced the head,
//! or a paged menu flipped its page). Menus that replaced a head are remembered on a
//! navigation history so the back key (`0` on the client, code 10) can return to them.
//!
//! ```text
//!  input ──► filter_command ──► got_response ──► respond (kind specific)
//!                                   │                 │
//!                                   │          response callback ──► SendResult
//!                                   ▼
//!                     advance: pop head, show next / stay: remember history, redisplay
//! ```
//!
//! ## Re-entrancy
//!
//! Response callbacks receive `&mut SessionRegistry` and may send or retract menus. While a
//! response is being routed the user's session holds a [`ResponseGuard`](super::session::ResponseGuard)
//! and every display refresh for that user is skipped; the router redisplays once it has
//! settled the new head.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use log::{debug, error, info, trace, warn};
use serde_json::{Map, Value};

use super::errors::{PopupError, PopupResult};
use super::group::{GroupedMenu, LanguageDefaults, LanguageGroup, MenuGroup};
use super::hooks::{Localizer, MenuDisplay, NoRefresh, RefreshScheduler, UserDirectory};
use super::keys::{KeySet, KEY_BACK, KEY_NEXT, KEY_PREV, MAX_OPTION_KEY};
use super::menu::{
    slot_index, GroupedMenuId, LanguageGroupId, Menu, MenuGroupId, MenuHandle, MenuId, MenuKind,
    ResponseParams, SendArgs, SendResult,
};
use super::resources::StringTable;
use super::session::Session;
use super::UserId;
use crate::config::MenuConfig;
use crate::logutil::{escape_log, headline};
use crate::metrics;
use crate::validation::validate_language_tag;

/// Inbound notifications the registry reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    UserConnected(UserId),
    UserDisconnected(UserId),
    /// Map change or similar: every queue is emptied.
    WorldReset,
    /// A periodic refresh timer armed by the registry has fired.
    RefreshDue(UserId),
    /// Raw client command, e.g. `["menuselect", "3"]`.
    Command { user: UserId, args: Vec<String> },
    /// Stop the owning dispatch loop. The registry itself ignores it.
    Shutdown,
}

/// Whether a client command was taken by the menu engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandDisposition {
    Consumed,
    PassThrough,
}

/// Deployment wide knobs, usually taken from [`MenuConfig`].
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Re-display interval countering client side menu timeouts; zero disables it.
    pub refresh_interval: Duration,
    pub default_language: String,
    pub accepted_keys: KeySet,
    pub list_options_per_page: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        RegistrySettings {
            refresh_interval: Duration::ZERO,
            default_language: "en".to_string(),
            accepted_keys: KeySet::ALL,
            list_options_per_page: super::menu::LIST_OPTIONS_PER_PAGE,
        }
    }
}

impl RegistrySettings {
    pub fn from_config(cfg: &MenuConfig) -> Self {
        RegistrySettings {
            refresh_interval: Duration::from_secs(cfg.refresh_seconds),
            default_language: cfg.default_language.to_ascii_lowercase(),
            accepted_keys: cfg.accepted_keys.parse().unwrap_or_else(|e| {
                warn!("accepted_keys '{}' invalid ({}); using all digits", cfg.accepted_keys, e);
                KeySet::ALL
            }),
            list_options_per_page: cfg.list_options_per_page.max(1),
        }
    }
}

pub struct SessionRegistry {
    settings: RegistrySettings,
    menus: HashMap<MenuId, Menu>,
    groups: HashMap<MenuGroupId, MenuGroup>,
    grouped: HashMap<GroupedMenuId, GroupedMenu>,
    languages: HashMap<LanguageGroupId, LanguageGroup>,
    sessions: HashMap<UserId, Session>,
    active: BTreeSet<UserId>,
    next_id: u64,
    display: Box<dyn MenuDisplay>,
    directory: Box<dyn UserDirectory>,
    strings: Box<dyn Localizer>,
    scheduler: Box<dyn RefreshScheduler>,
}

impl SessionRegistry {
    pub fn new(
        settings: RegistrySettings,
        display: impl MenuDisplay + 'static,
        directory: impl UserDirectory + 'static,
    ) -> Self {
        SessionRegistry {
            settings,
            menus: HashMap::new(),
            groups: HashMap::new(),
            grouped: HashMap::new(),
            languages: HashMap::new(),
            sessions: HashMap::new(),
            active: BTreeSet::new(),
            next_id: 1,
            display: Box::new(display),
            directory: Box::new(directory),
            strings: Box::new(StringTable::builtin()),
            scheduler: Box::new(NoRefresh),
        }
    }

    pub fn with_localizer(mut self, strings: impl Localizer + 'static) -> Self {
        self.strings = Box::new(strings);
        self
    }

    pub fn with_scheduler(mut self, scheduler: impl RefreshScheduler + 'static) -> Self {
        self.scheduler = Box::new(scheduler);
        self
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ----- menus ---------------------------------------------------------------------------

    /// Register a menu. Menus built without explicit keys get the deployment's key set, and
    /// lists get the configured page size.
    pub fn create_menu(&mut self, mut menu: Menu) -> MenuId {
        if menu.accepted_keys == KeySet::ALL {
            menu.accepted_keys = self.settings.accepted_keys;
        }
        if menu.kind() == MenuKind::List
            && menu.options_per_page() == super::menu::LIST_OPTIONS_PER_PAGE
        {
            menu.set_options_per_page(self.settings.list_options_per_page);
        }
        let id = MenuId(self.alloc_id());
        debug!("registered {} ({})", id, menu.kind().name());
        self.menus.insert(id, menu);
        id
    }

    pub fn menu(&self, id: MenuId) -> Option<&Menu> {
        self.menus.get(&id)
    }

    /// Edits apply to every user on their next display.
    pub fn menu_mut(&mut self, id: MenuId) -> Option<&mut Menu> {
        self.menus.get_mut(&id)
    }

    /// Unregister a menu and retract it from every user. Groups forget it too.
    pub fn remove_menu(&mut self, id: MenuId) -> Option<Menu> {
        if !self.menus.contains_key(&id) {
            return None;
        }
        let users: Vec<UserId> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.view(id).is_some() || s.position(id).is_some())
            .map(|(user, _)| *user)
            .collect();
        for user in users {
            self.remove_popup(user, id);
            if let Some(session) = self.sessions.get_mut(&user) {
                session.purge_menu(id);
            }
        }
        for group in self.languages.values_mut() {
            group.remove_menu(id);
        }
        debug!("unregistered {}", id);
        self.menus.remove(&id)
    }

    // ----- retraction groups ---------------------------------------------------------------

    pub fn create_menu_group(&mut self) -> MenuGroupId {
        let id = MenuGroupId(self.alloc_id());
        self.groups.insert(id, MenuGroup::default());
        id
    }

    /// Add a menu (or language group) to a retraction group. Adding a handle that already
    /// belongs to another group moves it. Returns the handle to send through.
    pub fn add_to_group(&mut self, group: MenuGroupId, target: MenuHandle) -> PopupResult<MenuHandle> {
        if !self.groups.contains_key(&group) {
            return Err(PopupError::UnknownGroup(group.to_string()));
        }
        let member = match target {
            MenuHandle::Grouped(existing) => {
                let record = self
                    .grouped
                    .get_mut(&existing)
                    .ok_or_else(|| PopupError::UnknownGroup(existing.to_string()))?;
                let old_group = std::mem::replace(&mut record.group, group);
                if let Some(old) = self.groups.get_mut(&old_group) {
                    old.members.retain(|m| *m != existing);
                }
                existing
            }
            MenuHandle::Menu(_) | MenuHandle::Language(_) => {
                let id = GroupedMenuId(self.alloc_id());
                self.grouped.insert(id, GroupedMenu { group, target });
                id
            }
        };
        if let Some(g) = self.groups.get_mut(&group) {
            if !g.members.contains(&member) {
                g.members.push(member);
            }
        }
        Ok(MenuHandle::Grouped(member))
    }

    pub fn menu_group(&self, group: MenuGroupId) -> Option<&MenuGroup> {
        self.groups.get(&group)
    }

    pub fn grouped_menu(&self, member: GroupedMenuId) -> Option<&GroupedMenu> {
        self.grouped.get(&member)
    }

    /// Drop the grouping relationship. Member handles keep working as plain sends.
    pub fn drop_menu_group(&mut self, group: MenuGroupId) -> bool {
        self.groups.remove(&group).is_some()
    }

    // ----- language groups -----------------------------------------------------------------

    pub fn create_language_group(&mut self) -> LanguageGroupId {
        let id = LanguageGroupId(self.alloc_id());
        self.languages.insert(id, LanguageGroup::default());
        id
    }

    pub fn language_group(&self, id: LanguageGroupId) -> Option<&LanguageGroup> {
        self.languages.get(&id)
    }

    /// Register `menu` as the `language` variant. The menu takes the tag as its language and
    /// inherits any group attribute it does not set itself.
    pub fn set_language_variant(
        &mut self,
        group: LanguageGroupId,
        language: &str,
        menu: MenuId,
    ) -> PopupResult<Option<MenuId>> {
        let tag = validate_language_tag(language)
            .map_err(|_| PopupError::InvalidLanguage(language.to_string()))?;
        let lang_group = self
            .languages
            .get_mut(&group)
            .ok_or_else(|| PopupError::UnknownGroup(group.to_string()))?;
        let target = self.menus.get_mut(&menu).ok_or(PopupError::UnknownMenu(menu))?;
        target.language = Some(tag.clone());
        lang_group.defaults.apply_to(target);
        Ok(lang_group.insert(tag, menu))
    }

    /// Change group level attributes and push them to members lacking their own value.
    pub fn configure_language_group<F>(&mut self, group: LanguageGroupId, update: F) -> PopupResult<()>
    where
        F: FnOnce(&mut LanguageDefaults),
    {
        let lang_group = self
            .languages
            .get_mut(&group)
            .ok_or_else(|| PopupError::UnknownGroup(group.to_string()))?;
        update(&mut lang_group.defaults);
        for id in lang_group.menus() {
            if let Some(menu) = self.menus.get_mut(&id) {
                lang_group.defaults.apply_to(menu);
            }
        }
        Ok(())
    }

    pub fn drop_language_group(&mut self, group: LanguageGroupId) -> bool {
        debug!("dropping {}", group);
        self.languages.remove(&group).is_some()
    }

    // ----- sessions ------------------------------------------------------------------------

    pub fn session(&self, user: UserId) -> Option<&Session> {
        self.sessions.get(&user)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn active_users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.active.iter().copied()
    }

    pub fn is_active(&self, user: UserId) -> bool {
        self.active.contains(&user)
    }

    pub fn queue_of(&self, user: UserId) -> Vec<MenuId> {
        self.sessions
            .get(&user)
            .map(|s| s.queue().to_vec())
            .unwrap_or_default()
    }

    pub fn page_of(&self, user: UserId, menu: MenuId) -> Option<usize> {
        self.sessions.get(&user)?.view(menu).map(|v| v.page())
    }

    /// Session for `user`, created from the directory profile on first use.
    fn ensure_session(&mut self, user: UserId) -> PopupResult<&mut Session> {
        if !self.sessions.contains_key(&user) {
            let profile = self
                .directory
                .profile(user)
                .ok_or(PopupError::UnknownUser(user))?;
            let profile = match profile.language.as_deref().map(validate_language_tag) {
                Some(Err(e)) => {
                    warn!("user {} has unusable language tag: {}", user, e);
                    super::hooks::UserProfile {
                        language: None,
                        ..profile
                    }
                }
                Some(Ok(tag)) => super::hooks::UserProfile {
                    language: Some(tag),
                    ..profile
                },
                None => profile,
            };
            debug!(
                "creating session for user {} (language={:?}, automated={})",
                user, profile.language, profile.automated
            );
            metrics::inc_sessions_created();
            self.sessions.insert(user, Session::new(user, profile));
        }
        self.sessions
            .get_mut(&user)
            .ok_or(PopupError::UnknownUser(user))
    }

    fn activate(&mut self, user: UserId) {
        if self.active.is_empty() {
            trace!("first active user; menuselect filter engaged");
        }
        self.active.insert(user);
        if let Some(session) = self.sessions.get_mut(&user) {
            session.activated = true;
        }
    }

    /// Mark the user idle: queue and history emptied, input no longer routed.
    fn deactivate(&mut self, user: UserId) {
        if let Some(session) = self.sessions.get_mut(&user) {
            session.clear();
            session.activated = false;
        }
        if self.active.remove(&user) && self.active.is_empty() {
            trace!("no active users left; menuselect filter idle");
        }
    }

    /// Concrete menu a handle stands for, for this user.
    fn resolve(&mut self, user: UserId, handle: MenuHandle) -> PopupResult<MenuId> {
        match handle {
            MenuHandle::Menu(id) => {
                if self.menus.contains_key(&id) {
                    Ok(id)
                } else {
                    Err(PopupError::UnknownMenu(id))
                }
            }
            MenuHandle::Language(group) => {
                let language = self.ensure_session(user)?.language.clone();
                let lang_group = self
                    .languages
                    .get(&group)
                    .ok_or_else(|| PopupError::UnknownGroup(group.to_string()))?;
                let id = lang_group.pick(language.as_deref(), &self.settings.default_language)?;
                if self.menus.contains_key(&id) {
                    Ok(id)
                } else {
                    Err(PopupError::UnknownMenu(id))
                }
            }
            MenuHandle::Grouped(member) => {
                let target = self
                    .grouped
                    .get(&member)
                    .map(|g| g.target)
                    .ok_or_else(|| PopupError::UnknownGroup(member.to_string()))?;
                self.resolve(user, target)
            }
        }
    }

    /// Resolve a handle and make sure the user has a view for it.
    fn view_for(&mut self, user: UserId, handle: MenuHandle) -> PopupResult<MenuId> {
        let id = self.resolve(user, handle)?;
        self.ensure_session(user)?.view_entry(id);
        Ok(id)
    }

    // ----- public send surface -------------------------------------------------------------

    /// Queue a menu for a user, showing it right away when nothing else is on screen.
    pub fn send(&mut self, user: UserId, handle: MenuHandle, args: SendArgs) -> PopupResult<()> {
        if let MenuHandle::Grouped(member) = handle {
            return self.send_grouped(user, member, args);
        }
        let id = self.resolve(user, handle)?;
        self.send_menu(user, id, args)
    }

    fn send_grouped(&mut self, user: UserId, member: GroupedMenuId, args: SendArgs) -> PopupResult<()> {
        let record = *self
            .grouped
            .get(&member)
            .ok_or_else(|| PopupError::UnknownGroup(member.to_string()))?;
        self.send(user, record.target, args)?;
        let siblings: Vec<GroupedMenuId> = self
            .groups
            .get(&record.group)
            .map(|g| g.members.iter().copied().filter(|m| *m != member).collect())
            .unwrap_or_default();
        for sibling in siblings {
            if let Err(e) = self.unsend(user, MenuHandle::Grouped(sibling)) {
                debug!("retracting {} from user {} skipped: {}", sibling, user, e);
            }
        }
        Ok(())
    }

    fn send_menu(&mut self, user: UserId, id: MenuId, args: SendArgs) -> PopupResult<()> {
        self.ensure_session(user)?;
        let menu = self.menus.get(&id).ok_or(PopupError::UnknownMenu(id))?;
        let session = self
            .sessions
            .get_mut(&user)
            .ok_or(PopupError::UnknownUser(user))?;
        if session.automated {
            debug!("not sending {} to automated user {}", id, user);
            metrics::inc_sends_ignored();
            return Ok(());
        }

        let cached = session.view(id).is_some();
        let view = session.view_entry(id);
        if menu.kind().is_paged() {
            let page = args.page.unwrap_or(1);
            let previous = cached.then(|| view.clone());
            view.args = args;
            if menu.kind().is_built() {
                view.rebuild(menu, user);
            }
            let pages = view.pages(menu);
            if page == 0 || page > pages.max(1) {
                // A rejected send leaves the user's view as it was
                match previous {
                    Some(previous) => *view = previous,
                    None => {
                        session.views.remove(&id);
                    }
                }
                return Err(PopupError::InvalidPage { page, pages });
            }
            view.page = page;
        } else {
            view.args = args;
            if menu.kind().is_built() {
                view.rebuild(menu, user);
            }
        }

        let index = session.want(id);
        debug!("user {} wants {}, queue index {}", user, id, index);
        self.refresh(user);
        Ok(())
    }

    /// Take a menu out of the user's queue. Returns whether it was queued.
    pub fn unsend(&mut self, user: UserId, handle: MenuHandle) -> PopupResult<bool> {
        let id = self.resolve(user, handle)?;
        self.ensure_session(user)?;
        Ok(self.remove_popup(user, id))
    }

    /// 0 when on screen, N when N-th in line, `None` when not queued.
    pub fn queue_position(&mut self, user: UserId, handle: MenuHandle) -> PopupResult<Option<usize>> {
        let id = self.view_for(user, handle)?;
        Ok(self.sessions.get(&user).and_then(|s| s.position(id)))
    }

    // ----- queue mechanics -----------------------------------------------------------------

    /// Show the head of the user's queue. No-op while the user's response is being routed.
    fn refresh(&mut self, user: UserId) -> bool {
        let Some(session) = self.sessions.get_mut(&user) else {
            return false;
        };
        if session.is_handling_response() {
            trace!("refresh for user {} deferred: response in progress", user);
            return false;
        }
        let Some(head) = session.head() else {
            self.deactivate(user);
            return false;
        };
        session.forget_history(head);
        let Some(menu) = self.menus.get(&head) else {
            warn!("user {} queue head {} no longer registered", user, head);
            session.pop_head();
            return self.refresh(user);
        };
        let language = menu
            .language
            .clone()
            .or_else(|| session.language.clone())
            .unwrap_or_else(|| self.settings.default_language.clone());
        let text = session
            .view_entry(head)
            .render(menu, user, &language, self.strings.as_ref());
        debug!("displaying {} '{}' to user {}", head, headline(&text), user);
        trace!("menu text for user {}: {}", user, escape_log(&text));
        self.display.render(user, &text, menu.accepted_keys);
        metrics::record_display(menu.kind().name());

        let interval = self.settings.refresh_interval;
        if session.pending_refresh == 0 && !interval.is_zero() {
            session.pending_refresh += 1;
            self.scheduler.schedule(user, interval);
        }
        self.activate(user);
        true
    }

    /// A refresh timer fired: redisplay (which re-arms the timer while menus remain).
    fn delayed_refresh(&mut self, user: UserId) {
        let Some(session) = self.sessions.get_mut(&user) else {
            return;
        };
        session.pending_refresh = session.pending_refresh.saturating_sub(1);
        if !session.queue.is_empty() {
            self.refresh(user);
        }
    }

    /// Discard the head. True when another menu took its place on screen.
    fn next_popup(&mut self, user: UserId) -> bool {
        let Some(session) = self.sessions.get_mut(&user) else {
            return false;
        };
        session.pop_head();
        if session.queue.is_empty() {
            return false;
        }
        self.refresh(user);
        true
    }

    fn remove_popup(&mut self, user: UserId, id: MenuId) -> bool {
        let Some(index) = self.sessions.get(&user).and_then(|s| s.position(id)) else {
            return false;
        };
        if index == 0 {
            if !self.next_popup(user) {
                self.deactivate(user);
                if let Some(view) = self.sessions.get_mut(&user).and_then(|s| s.views.get_mut(&id)) {
                    view.hidden = true;
                }
                self.display.close(user);
            }
        } else if let Some(session) = self.sessions.get_mut(&user) {
            session.remove_at(index);
        }
        true
    }

    // ----- response routing ----------------------------------------------------------------

    /// Route a menu answer from `user` to the menu on their screen.
    pub fn got_response(&mut self, user: UserId, choice: u8) {
        let Some(session) = self.sessions.get(&user) else {
            debug!("response {} from user {} without session ignored", choice, user);
            return;
        };
        let Some(head) = session.head() else {
            debug!("response {} from user {} with empty queue", choice, user);
            self.deactivate(user);
            return;
        };
        debug!("user {} answered {} with {}", user, head, choice);
        metrics::inc_responses();

        let advance = {
            let _guard = session.begin_response();
            self.respond(user, head, choice)
        };

        let Some(session) = self.sessions.get_mut(&user) else {
            debug!("user {} left while their response was handled", user);
            return;
        };
        if advance {
            if session.head() != Some(head) {
                // The callback already took its menu off the queue; the new head is unseen
                debug!("{} left the queue of user {} while answering", head, user);
                self.refresh(user);
            } else if !self.next_popup(user) {
                debug!("user {} has no more menus", user);
                self.deactivate(user);
            }
        } else {
            if session.history_top().is_some() && session.history_top() == session.head() {
                debug!("user {} went back in navigation history", user);
            } else {
                session.push_history(head);
            }
            self.refresh(user);
        }
    }

    /// Kind specific answer handling. True means discard the view and show the next one.
    fn respond(&mut self, user: UserId, id: MenuId, choice: u8) -> bool {
        let Some(kind) = self.menus.get(&id).map(Menu::kind) else {
            return true;
        };
        match kind {
            MenuKind::Paged | MenuKind::CallbackPaged => self.respond_paged(user, id, choice),
            MenuKind::List => self.respond_list(user, id, choice),
            MenuKind::Plain | MenuKind::Template | MenuKind::Callback => {
                let hidden = self
                    .sessions
                    .get(&user)
                    .and_then(|s| s.view(id))
                    .map_or(false, |v| v.is_hidden());
                if hidden {
                    return true;
                }
                self.menu_response(user, id, Value::from(choice), Map::new())
            }
        }
    }

    fn respond_paged(&mut self, user: UserId, id: MenuId, choice: u8) -> bool {
        let (Some(menu), Some(view)) = (
            self.menus.get(&id),
            self.sessions.get(&user).and_then(|s| s.view(id)),
        ) else {
            return true;
        };
        let page = view.page();
        let mut special = Map::new();
        special.insert("raw_choice".into(), Value::from(choice));
        special.insert("page".into(), Value::from(page));
        special.insert("option".into(), Value::Null);

        let mut picked = Value::Null;
        if choice <= MAX_OPTION_KEY {
            let option = slot_index(page, menu.options_per_page(), choice)
                .and_then(|index| view.entries(menu).get(index))
                .and_then(|entry| entry.as_option())
                .cloned();
            if let Some(option) = option {
                picked = option.choice.clone();
                special.insert(
                    "option".into(),
                    serde_json::to_value(&option).unwrap_or(Value::Null),
                );
                if option.selectable {
                    special.insert("special".into(), Value::Bool(false));
                    return self.menu_response(user, id, picked, special);
                }
            }
        }
        self.special_input(user, id, choice, picked, special)
    }

    fn respond_list(&mut self, user: UserId, id: MenuId, choice: u8) -> bool {
        let Some(page) = self.page_of(user, id) else {
            return true;
        };
        let mut special = Map::new();
        special.insert("raw_choice".into(), Value::from(choice));
        special.insert("page".into(), Value::from(page));
        self.special_input(user, id, choice, Value::from(choice), special)
    }

    /// Paging keys and keys that did not land on a selectable option.
    fn special_input(
        &mut self,
        user: UserId,
        id: MenuId,
        choice: u8,
        picked: Value,
        mut special: Map<String, Value>,
    ) -> bool {
        let call_special = self.menus.get(&id).map_or(false, |m| m.call_special_inputs);
        let mut proceed = true;
        if call_special {
            special.insert("special".into(), Value::Bool(true));
            proceed = self.menu_response(user, id, picked, special);
        }
        if !proceed {
            return false;
        }

        let (Some(menu), Some(session)) = (self.menus.get(&id), self.sessions.get_mut(&user)) else {
            return true;
        };
        if session.head() != Some(id) {
            debug!("{} retracted from user {} by its own callback; no paging", id, user);
            return true;
        }
        if let Some(view) = session.views.get_mut(&id) {
            let pages = view.pages(menu);
            match choice {
                KEY_PREV if view.page > 1 => view.page -= 1,
                KEY_NEXT if view.page < pages => view.page += 1,
                _ => {}
            }
        }
        if choice == KEY_BACK {
            return session.go_back();
        }
        session.replace_head(id);
        false
    }

    /// Run the menu's response callback and apply what it asks for.
    fn menu_response(
        &mut self,
        user: UserId,
        id: MenuId,
        choice: Value,
        special: Map<String, Value>,
    ) -> bool {
        let Some(menu) = self.menus.get(&id) else {
            return true;
        };
        let Some(callback) = menu.callback() else {
            return true;
        };
        let mut extra = menu.response_args.clone();
        let session = self.sessions.get(&user);
        if let Some(view) = session.and_then(|s| s.view(id)) {
            for (key, value) in &view.content().response_args {
                extra.insert(key.clone(), value.clone());
            }
        }
        extra.extend(special);
        let params = ResponseParams {
            user,
            choice,
            menu: id,
            previous: session.and_then(|s| s.history_top()),
            extra,
        };

        let outcome = match callback(&mut *self, &params) {
            Ok(outcome) => outcome,
            Err(e) => {
                metrics::inc_callback_failures();
                error!("response callback of {} failed for user {}: {:#}", id, user, e);
                SendResult::Advance
            }
        };
        trace!("{} callback for user {} returned {:?}", id, user, outcome);

        match outcome {
            SendResult::Advance => true,
            SendResult::ReplaceWith(handle) => {
                if !self.sessions.contains_key(&user) {
                    return true;
                }
                match self.view_for(user, handle) {
                    Ok(next) => {
                        if let Some(session) = self.sessions.get_mut(&user) {
                            session.replace_head(next);
                        }
                        false
                    }
                    Err(e) => {
                        metrics::inc_malformed_returns();
                        warn!(
                            "{} callback returned unusable submenu {:?} for user {}: {}",
                            id, handle, user, e
                        );
                        true
                    }
                }
            }
            SendResult::Chain(handle) => {
                if self.sessions.contains_key(&user) {
                    if let Err(e) = self.send(user, handle, SendArgs::default()) {
                        metrics::inc_malformed_returns();
                        warn!(
                            "{} callback chained unusable menu {:?} for user {}: {}",
                            id, handle, user, e
                        );
                    }
                }
                true
            }
        }
    }

    // ----- events --------------------------------------------------------------------------

    /// Input filter. Takes `menuselect <n>` from users with menus up; everything else passes.
    pub fn filter_command<S: AsRef<str>>(&mut self, user: UserId, args: &[S]) -> CommandDisposition {
        let is_menuselect = args
            .first()
            .map_or(false, |a| a.as_ref().eq_ignore_ascii_case("menuselect"));
        if !is_menuselect || !self.active.contains(&user) {
            return CommandDisposition::PassThrough;
        }
        match args.get(1).and_then(|a| a.as_ref().trim().parse::<u8>().ok()) {
            Some(choice) => {
                self.got_response(user, choice);
                CommandDisposition::Consumed
            }
            None => CommandDisposition::PassThrough,
        }
    }

    pub fn handle_event(&mut self, event: RegistryEvent) -> CommandDisposition {
        match event {
            RegistryEvent::UserConnected(user) => {
                if let Err(e) = self.ensure_session(user) {
                    warn!("connect for user {} ignored: {}", user, e);
                }
            }
            RegistryEvent::UserDisconnected(user) => self.user_disconnected(user),
            RegistryEvent::WorldReset => self.world_reset(),
            RegistryEvent::RefreshDue(user) => self.delayed_refresh(user),
            RegistryEvent::Command { user, args } => return self.filter_command(user, args.as_slice()),
            RegistryEvent::Shutdown => trace!("shutdown event reached the registry"),
        }
        CommandDisposition::PassThrough
    }

    /// Forget the user entirely, views included.
    pub fn user_disconnected(&mut self, user: UserId) {
        self.active.remove(&user);
        if let Some(session) = self.sessions.remove(&user) {
            metrics::inc_sessions_dropped();
            debug!(
                "dropped session for user {} ({} cached views)",
                user,
                session.views.len()
            );
        }
    }

    /// Empty every queue and history. Cached views survive until their user disconnects.
    pub fn world_reset(&mut self) {
        metrics::inc_world_resets();
        info!(
            "world reset: clearing menus of {} sessions ({} active)",
            self.sessions.len(),
            self.active.len()
        );
        for session in self.sessions.values_mut() {
            session.clear();
            session.activated = false;
        }
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::popup::hooks::{ChannelDisplay, DisplayFrame, StaticDirectory, UserProfile};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn registry() -> (SessionRegistry, UnboundedReceiver<DisplayFrame>) {
        let (display, rx) = ChannelDisplay::channel();
        let dir = StaticDirectory::accept_all(UserProfile {
            language: Some("en".into()),
            automated: false,
        });
        (
            SessionRegistry::new(RegistrySettings::default(), display, dir),
            rx,
        )
    }

    #[test]
    fn unknown_user_is_a_caller_error() {
        let (display, _rx) = ChannelDisplay::channel();
        let mut reg =
            SessionRegistry::new(RegistrySettings::default(), display, StaticDirectory::new());
        let menu = reg.create_menu(Menu::plain().with_lines(["hi"]));
        assert_eq!(
            reg.send(7, menu.into(), SendArgs::default()),
            Err(PopupError::UnknownUser(7))
        );
    }

    #[test]
    fn first_send_displays_and_activates() {
        let (mut reg, mut rx) = registry();
        let menu = reg.create_menu(Menu::plain().with_lines(["hello"]));
        reg.send(1, menu.into(), SendArgs::default()).unwrap();
        assert!(reg.is_active(1));
        assert_eq!(reg.queue_of(1), vec![menu]);
        match rx.try_recv().unwrap() {
            DisplayFrame::Render { user, text, keys } => {
                assert_eq!(user, 1);
                assert_eq!(text, "hello");
                assert_eq!(keys, "0123456789");
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn invalid_page_is_rejected() {
        let (mut reg, _rx) = registry();
        let mut paged = Menu::paged("Maps");
        for i in 0..8 {
            paged.add(i, format!("m{}", i), true);
        }
        let id = reg.create_menu(paged);
        assert_eq!(
            reg.send(1, id.into(), SendArgs::page(3)),
            Err(PopupError::InvalidPage { page: 3, pages: 2 })
        );
        assert!(reg.queue_of(1).is_empty());
        assert!(reg.send(1, id.into(), SendArgs::page(2)).is_ok());
        assert_eq!(reg.page_of(1, id), Some(2));
    }

    #[test]
    fn empty_paged_menu_can_be_shown() {
        let (mut reg, _rx) = registry();
        let id = reg.create_menu(Menu::paged("Nothing here"));
        assert!(reg.send(1, id.into(), SendArgs::default()).is_ok());
        assert_eq!(reg.queue_position(1, id.into()), Ok(Some(0)));
    }

    #[test]
    fn menuselect_only_consumed_for_active_users() {
        let (mut reg, _rx) = registry();
        assert_eq!(
            reg.filter_command(1, &["menuselect", "1"]),
            CommandDisposition::PassThrough
        );
        let id = reg.create_menu(Menu::plain().with_lines(["x"]));
        reg.send(1, id.into(), SendArgs::default()).unwrap();
        assert_eq!(
            reg.filter_command(1, &["menuselect", "x"]),
            CommandDisposition::PassThrough
        );
        assert_eq!(
            reg.filter_command(1, &["say", "1"]),
            CommandDisposition::PassThrough
        );
        assert_eq!(
            reg.filter_command(1, &["menuselect", "1"]),
            CommandDisposition::Consumed
        );
        assert!(!reg.is_active(1));
    }

    #[test]
    fn automated_users_never_get_menus() {
        let (display, mut rx) = ChannelDisplay::channel();
        let dir = StaticDirectory::new();
        dir.insert(
            50,
            UserProfile {
                language: None,
                automated: true,
            },
        );
        let mut reg = SessionRegistry::new(RegistrySettings::default(), display, dir);
        let id = reg.create_menu(Menu::plain().with_lines(["x"]));
        assert!(reg.send(50, id.into(), SendArgs::default()).is_ok());
        assert!(reg.queue_of(50).is_empty());
        assert!(rx.try_recv().is_err());
    }
}
