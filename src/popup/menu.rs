//! Menu definitions shared by every user they are sent to.
//!
//! A [`Menu`] is registered with the [`SessionRegistry`] and addressed through a [`MenuId`].
//! Per-user state (page, send values, built content) lives in the session's
//! [`SessionView`](super::view::SessionView), never in the menu itself, so one menu can be
//! open for hundreds of users at once.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::keys::KeySet;
use super::option::{Entry, MenuOption};
use super::registry::SessionRegistry;
use super::UserId;

/// Options per page for grid style menus. Keys 8, 9 and 0 are reserved for paging and exit,
/// which leaves 1-7 for options.
pub const GRID_OPTIONS_PER_PAGE: usize = 7;
/// Default options per page for paged lists.
pub const LIST_OPTIONS_PER_PAGE: usize = 10;

macro_rules! registry_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        pub struct $name(pub(crate) u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

registry_id!(MenuId, "menu");
registry_id!(MenuGroupId, "group");
registry_id!(GroupedMenuId, "grouped");
registry_id!(LanguageGroupId, "langgroup");

/// Anything that can be sent to a user: a concrete menu, a language group that picks a
/// localized menu, or a member of a retraction group.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MenuHandle {
    Menu(MenuId),
    Language(LanguageGroupId),
    Grouped(GroupedMenuId),
}

impl From<MenuId> for MenuHandle {
    fn from(id: MenuId) -> Self {
        MenuHandle::Menu(id)
    }
}

impl From<LanguageGroupId> for MenuHandle {
    fn from(id: LanguageGroupId) -> Self {
        MenuHandle::Language(id)
    }
}

impl From<GroupedMenuId> for MenuHandle {
    fn from(id: GroupedMenuId) -> Self {
        MenuHandle::Grouped(id)
    }
}

/// What a response callback wants to happen next.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SendResult {
    /// Discard the answered menu and show the next queued one, if any.
    Advance,
    /// Show this menu in place of the answered one (submenu). The answered menu is pushed onto
    /// the navigation history so the back key returns to it.
    ReplaceWith(MenuHandle),
    /// Queue this menu for the user and discard the answered one.
    Chain(MenuHandle),
}

/// Values supplied at send time. Template menus substitute them, build callbacks read them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SendArgs {
    pub page: Option<usize>,
    pub values: BTreeMap<String, String>,
}

impl SendArgs {
    pub fn page(page: usize) -> Self {
        SendArgs {
            page: Some(page),
            ..Default::default()
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

/// Everything a response callback gets to know about the answer.
#[derive(Clone, Debug)]
pub struct ResponseParams {
    pub user: UserId,
    /// Input code for plain menus, the option's choice value for paged menus
    /// (`Value::Null` when the input did not land on an option).
    pub choice: Value,
    pub menu: MenuId,
    /// Top of the user's navigation history, i.e. where the back key would go.
    pub previous: Option<MenuId>,
    /// Stored response args merged with per-view and paging details.
    pub extra: Map<String, Value>,
}

impl ResponseParams {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Input code as pressed, present for paged kinds.
    pub fn raw_choice(&self) -> Option<u8> {
        self.extra
            .get("raw_choice")
            .and_then(Value::as_u64)
            .and_then(|c| u8::try_from(c).ok())
    }

    pub fn page(&self) -> Option<usize> {
        self.extra
            .get("page")
            .and_then(Value::as_u64)
            .map(|p| p as usize)
    }

    /// The option under the pressed key, even when it is not selectable.
    pub fn option(&self) -> Option<MenuOption> {
        self.extra
            .get("option")
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// True when the callback fires for a navigation or out of range key.
    pub fn is_special(&self) -> bool {
        self.extra
            .get("special")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Response callback. Gets the registry so it can send or retract other menus while the answer
/// is being routed.
pub type ResponseFn =
    Arc<dyn Fn(&mut SessionRegistry, &ResponseParams) -> anyhow::Result<SendResult> + Send + Sync>;

/// Box a closure as a [`ResponseFn`], e.g. for [`LanguageDefaults`](super::group::LanguageDefaults).
pub fn response_fn<F>(callback: F) -> ResponseFn
where
    F: Fn(&mut SessionRegistry, &ResponseParams) -> anyhow::Result<SendResult>
        + Send
        + Sync
        + 'static,
{
    Arc::new(callback)
}

/// Content builder for callback menus, run on every send and every display.
pub type BuildFn = Arc<dyn Fn(&BuildContext<'_>, &mut ViewContent) -> anyhow::Result<()> + Send + Sync>;

pub struct BuildContext<'a> {
    pub user: UserId,
    pub args: &'a SendArgs,
}

/// Per-user content produced by a build callback. Starts empty on each build.
#[derive(Clone, Debug, Default)]
pub struct ViewContent {
    pub entries: Vec<Entry>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Merged into the response callback's `extra` for this user.
    pub response_args: Map<String, Value>,
}

impl ViewContent {
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.entries.push(Entry::Text(line.into()));
    }

    pub fn add(
        &mut self,
        choice: impl Into<Value>,
        label: impl Into<String>,
        selectable: bool,
    ) -> MenuOption {
        let opt = MenuOption::new(choice, label, selectable);
        self.entries.push(Entry::Option(opt.clone()));
        opt
    }

    pub fn find(&self, choice: &Value) -> Option<&MenuOption> {
        find_option(&self.entries, choice)
    }

    pub fn remove(&mut self, choice: &Value) -> Option<MenuOption> {
        remove_option(&mut self.entries, choice)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MenuKind {
    /// Static text lines.
    Plain,
    /// Text lines with `$name` placeholders filled from the send values.
    Template,
    /// Static lines followed by lines from a build callback.
    Callback,
    /// Grid of selectable options, seven per page.
    Paged,
    /// Numbered list, paged but not selectable.
    List,
    /// Paged grid whose options come partly from a build callback.
    CallbackPaged,
}

impl MenuKind {
    pub fn is_paged(self) -> bool {
        matches!(self, MenuKind::Paged | MenuKind::List | MenuKind::CallbackPaged)
    }

    pub fn is_built(self) -> bool {
        matches!(self, MenuKind::Callback | MenuKind::CallbackPaged)
    }

    pub fn name(self) -> &'static str {
        match self {
            MenuKind::Plain => "plain menu",
            MenuKind::Template => "template menu",
            MenuKind::Callback => "callback menu",
            MenuKind::Paged => "paged menu",
            MenuKind::List => "paged list",
            MenuKind::CallbackPaged => "callback paged menu",
        }
    }
}

pub struct Menu {
    kind: MenuKind,
    /// Body entries. Editing them is allowed at any time and shows up on the next display.
    pub entries: Vec<Entry>,
    /// Language of this menu's built-in strings. Set when the menu joins a language group.
    pub language: Option<String>,
    pub accepted_keys: KeySet,
    pub response_args: Map<String, Value>,
    pub title: String,
    pub description: String,
    /// Run the response callback for paging keys and empty slots too.
    pub call_special_inputs: bool,
    options_per_page: usize,
    callback: Option<ResponseFn>,
    build: Option<BuildFn>,
}

impl Menu {
    pub fn new(kind: MenuKind) -> Self {
        let (options_per_page, call_special_inputs) = match kind {
            MenuKind::List => (LIST_OPTIONS_PER_PAGE, true),
            _ => (GRID_OPTIONS_PER_PAGE, false),
        };
        Menu {
            kind,
            entries: Vec::new(),
            language: None,
            accepted_keys: KeySet::default(),
            response_args: Map::new(),
            title: String::new(),
            description: String::new(),
            call_special_inputs,
            options_per_page,
            callback: None,
            build: None,
        }
    }

    pub fn plain() -> Self {
        Menu::new(MenuKind::Plain)
    }

    pub fn template() -> Self {
        Menu::new(MenuKind::Template)
    }

    pub fn paged(title: impl Into<String>) -> Self {
        Menu::new(MenuKind::Paged).with_title(title)
    }

    pub fn list(title: impl Into<String>) -> Self {
        Menu::new(MenuKind::List).with_title(title)
    }

    pub fn built<F>(build: F) -> Self
    where
        F: Fn(&BuildContext<'_>, &mut ViewContent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut menu = Menu::new(MenuKind::Callback);
        menu.build = Some(Arc::new(build));
        menu
    }

    pub fn built_paged<F>(title: impl Into<String>, build: F) -> Self
    where
        F: Fn(&BuildContext<'_>, &mut ViewContent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut menu = Menu::new(MenuKind::CallbackPaged).with_title(title);
        menu.build = Some(Arc::new(build));
        menu
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .extend(lines.into_iter().map(|l| Entry::Text(l.into())));
        self
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut SessionRegistry, &ResponseParams) -> anyhow::Result<SendResult>
            + Send
            + Sync
            + 'static,
    {
        self.set_callback(callback);
        self
    }

    pub fn with_response_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.response_args.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> MenuKind {
        self.kind
    }

    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: Fn(&mut SessionRegistry, &ResponseParams) -> anyhow::Result<SendResult>
            + Send
            + Sync
            + 'static,
    {
        self.callback = Some(Arc::new(callback));
    }

    pub fn set_callback_fn(&mut self, callback: Option<ResponseFn>) {
        self.callback = callback;
    }

    pub fn callback(&self) -> Option<ResponseFn> {
        self.callback.clone()
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub fn build_callback(&self) -> Option<BuildFn> {
        self.build.clone()
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        self.entries.push(Entry::Text(line.into()));
    }

    /// Append an option. Returns a copy of what was added.
    pub fn add(
        &mut self,
        choice: impl Into<Value>,
        label: impl Into<String>,
        selectable: bool,
    ) -> MenuOption {
        let opt = MenuOption::new(choice, label, selectable);
        self.entries.push(Entry::Option(opt.clone()));
        opt
    }

    pub fn find(&self, choice: &Value) -> Option<&MenuOption> {
        find_option(&self.entries, choice)
    }

    pub fn remove(&mut self, choice: &Value) -> Option<MenuOption> {
        remove_option(&mut self.entries, choice)
    }

    pub fn options_per_page(&self) -> usize {
        self.options_per_page
    }

    /// Grid menus are capped at seven per page since keys 8-0 are taken; lists may use any
    /// positive size.
    pub fn set_options_per_page(&mut self, per_page: usize) {
        self.options_per_page = match self.kind {
            MenuKind::List => per_page.max(1),
            _ => per_page.clamp(1, GRID_OPTIONS_PER_PAGE),
        };
    }

    /// Page count for the static entries. Callback paged menus also count per-user content,
    /// see [`SessionView::pages`](super::view::SessionView::pages).
    pub fn pages(&self) -> usize {
        page_count(self.entries.len(), self.options_per_page)
    }

    pub fn is_valid_page(&self, page: usize) -> bool {
        (1..=self.pages()).contains(&page)
    }
}

impl fmt::Debug for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Menu")
            .field("kind", &self.kind)
            .field("title", &self.title)
            .field("entries", &self.entries.len())
            .field("language", &self.language)
            .field("accepted_keys", &self.accepted_keys)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

pub(crate) fn page_count(entries: usize, per_page: usize) -> usize {
    if per_page == 0 {
        return 0;
    }
    entries.div_ceil(per_page)
}

/// Absolute entry index for an option key on a page, `None` when the key is not an option key.
pub(crate) fn slot_index(page: usize, per_page: usize, key: u8) -> Option<usize> {
    let offset = (key as usize).checked_sub(1)?;
    if offset >= per_page {
        return None;
    }
    Some(page.saturating_sub(1) * per_page + offset)
}

fn find_option<'a>(entries: &'a [Entry], choice: &Value) -> Option<&'a MenuOption> {
    entries
        .iter()
        .filter_map(Entry::as_option)
        .find(|opt| &opt.choice == choice)
}

fn remove_option(entries: &mut Vec<Entry>, choice: &Value) -> Option<MenuOption> {
    let index = entries
        .iter()
        .position(|e| matches!(e, Entry::Option(opt) if &opt.choice == choice))?;
    match entries.remove(index) {
        Entry::Option(opt) => Some(opt),
        Entry::Text(_) => None,
    }
}
