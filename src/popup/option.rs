//! Menu options and the entries menus are built from.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A selectable (or greyed out) line in a paged menu.
///
/// The `choice` value is handed back to the response callback when the option is picked, so it
/// can be anything serde can represent: a number, a string id, a small object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuOption {
    pub choice: Value,
    pub label: String,
    pub selectable: bool,
}

impl MenuOption {
    pub fn new(choice: impl Into<Value>, label: impl Into<String>, selectable: bool) -> Self {
        MenuOption {
            choice: choice.into(),
            label: label.into(),
            selectable,
        }
    }

    /// Render as a numbered menu line. Selectable options get the `->` marker.
    pub fn line(&self, number: usize) -> String {
        if self.selectable {
            format!("->{}. {}", number, self.label)
        } else {
            format!("{}. {}", number, self.label)
        }
    }
}

/// One element of a menu body.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Text(String),
    Option(MenuOption),
}

impl Entry {
    pub fn as_option(&self) -> Option<&MenuOption> {
        match self {
            Entry::Option(opt) => Some(opt),
            Entry::Text(_) => None,
        }
    }

    /// Label without numbering: the option label, or the raw text.
    pub fn label(&self) -> &str {
        match self {
            Entry::Option(opt) => &opt.label,
            Entry::Text(text) => text,
        }
    }

    /// Line for a grid page slot. Plain text entries are shown as unselectable.
    pub fn grid_line(&self, number: usize) -> String {
        match self {
            Entry::Option(opt) => opt.line(number),
            Entry::Text(text) => format!("{}. {}", number, text),
        }
    }
}

impl From<MenuOption> for Entry {
    fn from(opt: MenuOption) -> Self {
        Entry::Option(opt)
    }
}

impl From<&str> for Entry {
    fn from(text: &str) -> Self {
        Entry::Text(text.to_string())
    }
}

impl From<String> for Entry {
    fn from(text: String) -> Self {
        Entry::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectable_options_are_marked() {
        let on = MenuOption::new("kick", "Kick player", true);
        let off = MenuOption::new("ban", "Ban player", false);
        assert_eq!(on.line(3), "->3. Kick player");
        assert_eq!(off.line(4), "4. Ban player");
    }

    #[test]
    fn percent_signs_are_left_alone() {
        let opt = MenuOption::new(1, "100% health", true);
        assert_eq!(opt.line(1), "->1. 100% health");
    }

    #[test]
    fn text_entries_render_as_unselectable() {
        let entry = Entry::from("Header");
        assert!(entry.as_option().is_none());
        assert_eq!(entry.grid_line(2), "2. Header");
        assert_eq!(entry.label(), "Header");
    }
}
