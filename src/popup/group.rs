//! Retraction groups and language groups.
//!
//! Both are plain records owned by the registry; members refer to their group by id only, so
//! dropping a group never drops a menu.

use serde_json::{Map, Value};

use super::errors::{PopupError, PopupResult};
use super::menu::{GroupedMenuId, Menu, MenuGroupId, MenuHandle, MenuId, ResponseFn};

/// Menus that exclude each other: sending one member retracts the others from that user.
#[derive(Debug, Clone, Default)]
pub struct MenuGroup {
    pub(crate) members: Vec<GroupedMenuId>,
}

impl MenuGroup {
    pub fn members(&self) -> &[GroupedMenuId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Membership record wrapping a menu (or language group) inside a retraction group.
#[derive(Debug, Clone, Copy)]
pub struct GroupedMenu {
    /// Back reference by id. Stale once the group is dropped; sends then skip retraction.
    pub(crate) group: MenuGroupId,
    pub(crate) target: MenuHandle,
}

impl GroupedMenu {
    pub fn group(&self) -> MenuGroupId {
        self.group
    }

    pub fn target(&self) -> MenuHandle {
        self.target
    }
}

/// Group level attributes copied onto member menus that do not set their own.
#[derive(Clone, Default)]
pub struct LanguageDefaults {
    pub title: Option<String>,
    pub description: Option<String>,
    pub callback: Option<ResponseFn>,
    pub response_args: Map<String, Value>,
    pub call_special_inputs: bool,
}

impl std::fmt::Debug for LanguageDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageDefaults")
            .field("title", &self.title)
            .field("description", &self.description)
            .field("has_callback", &self.callback.is_some())
            .field("response_args", &self.response_args)
            .field("call_special_inputs", &self.call_special_inputs)
            .finish()
    }
}

impl LanguageDefaults {
    /// Fill unset attributes of `menu`. An attribute the menu already has is never replaced.
    pub fn apply_to(&self, menu: &mut Menu) {
        if let Some(title) = &self.title {
            if menu.title.is_empty() {
                menu.title = title.clone();
            }
        }
        if let Some(description) = &self.description {
            if menu.description.is_empty() {
                menu.description = description.clone();
            }
        }
        if self.callback.is_some() && !menu.has_callback() {
            menu.set_callback_fn(self.callback.clone());
        }
        for (key, value) in &self.response_args {
            if !menu.response_args.contains_key(key) {
                menu.response_args.insert(key.clone(), value.clone());
            }
        }
        if self.call_special_inputs && !menu.call_special_inputs {
            menu.call_special_inputs = true;
        }
    }
}

/// Localized variants of one logical menu, keyed by language tag in insertion order.
#[derive(Debug, Clone, Default)]
pub struct LanguageGroup {
    pub(crate) menus: Vec<(String, MenuId)>,
    pub(crate) defaults: LanguageDefaults,
}

impl LanguageGroup {
    pub fn get(&self, language: &str) -> Option<MenuId> {
        self.menus
            .iter()
            .find(|(tag, _)| tag == language)
            .map(|(_, id)| *id)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.menus.iter().map(|(tag, _)| tag.as_str())
    }

    pub fn menus(&self) -> impl Iterator<Item = MenuId> + '_ {
        self.menus.iter().map(|(_, id)| *id)
    }

    pub fn defaults(&self) -> &LanguageDefaults {
        &self.defaults
    }

    pub fn len(&self) -> usize {
        self.menus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }

    /// Set (or replace) the menu for a tag. Returns the menu previously stored under it.
    pub(crate) fn insert(&mut self, language: String, menu: MenuId) -> Option<MenuId> {
        match self.menus.iter_mut().find(|(tag, _)| *tag == language) {
            Some(slot) => Some(std::mem::replace(&mut slot.1, menu)),
            None => {
                self.menus.push((language, menu));
                None
            }
        }
    }

    pub(crate) fn remove_menu(&mut self, menu: MenuId) {
        self.menus.retain(|(_, id)| *id != menu);
    }

    /// Pick the variant for a user: their own language, then the server default, then the
    /// first variant added.
    pub fn pick(&self, user_language: Option<&str>, default_language: &str) -> PopupResult<MenuId> {
        if self.menus.is_empty() {
            return Err(PopupError::EmptyLanguageGroup);
        }
        user_language
            .and_then(|lang| self.get(&lang.to_ascii_lowercase()))
            .or_else(|| self.get(default_language))
            .or_else(|| self.menus.first().map(|(_, id)| *id))
            .ok_or(PopupError::EmptyLanguageGroup)
    }
}
