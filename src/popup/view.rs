//! Per-user view of a menu and the text it renders to.

use log::{debug, error, warn};

use super::hooks::Localizer;
use super::menu::{page_count, BuildContext, Menu, MenuId, MenuKind, SendArgs, ViewContent};
use super::option::Entry;
use super::template::substitute;
use super::UserId;
use crate::metrics;

/// Shown by a callback menu whose builder has never succeeded.
pub const NO_CONTENT_LINE: &str = "No content due to errors.";

const TITLE_WIDTH: usize = 25;
const RULE_WIDTH: usize = 30;

/// One user's state for one menu: page position, send values and built content.
///
/// Created the first time the menu is sent to (or queried for) the user and cached in the
/// user's session until disconnect. Its identity is the `(user, menu)` pair, which is what the
/// session queue holds.
#[derive(Debug, Clone)]
pub struct SessionView {
    menu: MenuId,
    pub(crate) page: usize,
    pub(crate) args: SendArgs,
    pub(crate) hidden: bool,
    content: ViewContent,
    built_entries: Vec<Entry>,
    built_once: bool,
}

impl SessionView {
    pub fn new(menu: MenuId) -> Self {
        SessionView {
            menu,
            page: 1,
            args: SendArgs::default(),
            hidden: false,
            content: ViewContent::default(),
            built_entries: Vec::new(),
            built_once: false,
        }
    }

    pub fn menu(&self) -> MenuId {
        self.menu
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn args(&self) -> &SendArgs {
        &self.args
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Per-user content from the last successful build.
    pub fn content(&self) -> &ViewContent {
        &self.content
    }

    /// Entries the user actually sees: the menu's own, plus built ones for callback kinds.
    pub fn entries<'a>(&'a self, menu: &'a Menu) -> &'a [Entry] {
        if menu.kind().is_built() && self.built_once {
            &self.built_entries
        } else {
            &menu.entries
        }
    }

    pub fn pages(&self, menu: &Menu) -> usize {
        page_count(self.entries(menu).len(), menu.options_per_page())
    }

    /// Run the menu's build callback against fresh content.
    ///
    /// On failure the previous content is kept. A plain callback menu that never built shows a
    /// single error line instead.
    pub(crate) fn rebuild(&mut self, menu: &Menu, user: UserId) {
        let Some(build) = menu.build_callback() else {
            return;
        };
        let mut fresh = ViewContent::default();
        let ctx = BuildContext {
            user,
            args: &self.args,
        };
        match build(&ctx, &mut fresh) {
            Ok(()) => {
                let mut entries = menu.entries.clone();
                entries.append(&mut fresh.entries);
                self.built_entries = entries;
                self.content = fresh;
                self.built_once = true;
            }
            Err(e) => {
                metrics::inc_build_failures();
                error!(
                    "build callback for {} failed for user {}: {:#}",
                    self.menu, user, e
                );
                if !self.built_once && menu.kind() == MenuKind::Callback {
                    self.built_entries = vec![Entry::Text(NO_CONTENT_LINE.to_string())];
                    self.built_once = true;
                }
            }
        }
    }

    /// Produce the text to hand to the display collaborator.
    pub(crate) fn render(
        &mut self,
        menu: &Menu,
        user: UserId,
        language: &str,
        strings: &dyn Localizer,
    ) -> String {
        self.hidden = false;
        if menu.kind().is_built() {
            self.rebuild(menu, user);
        }
        debug!("{} building text for user {}", self.menu, user);
        match menu.kind() {
            MenuKind::Plain | MenuKind::Callback => join_labels(self.entries(menu)),
            MenuKind::Template => {
                let sub = substitute(&join_labels(&menu.entries), &self.args.values);
                if !sub.missing.is_empty() {
                    warn!(
                        "{} sent to user {} without values for: {}",
                        self.menu,
                        user,
                        sub.missing.join(", ")
                    );
                }
                sub.text
            }
            MenuKind::Paged | MenuKind::List => self.render_grid(menu, language, strings),
            MenuKind::CallbackPaged => self.render_built_grid(menu, language, strings),
        }
    }

    fn page_slice<'a>(&'a self, menu: &'a Menu) -> (usize, &'a [Entry]) {
        let entries = self.entries(menu);
        let per_page = menu.options_per_page();
        let start = (self.page.saturating_sub(1) * per_page).min(entries.len());
        let end = (start + per_page).min(entries.len());
        (start, &entries[start..end])
    }

    fn push_page_lines(&self, menu: &Menu, lines: &mut Vec<String>) {
        let per_page = menu.options_per_page();
        let (start, slice) = self.page_slice(menu);
        match menu.kind() {
            MenuKind::List => {
                for (i, entry) in slice.iter().enumerate() {
                    lines.push(format!("{}. {}", start + i + 1, entry.label()));
                }
                // First page of a list stays compact; later pages keep the layout steady.
                if self.page > 1 {
                    pad_blank(lines, per_page.saturating_sub(slice.len()));
                }
            }
            _ => {
                for (i, entry) in slice.iter().enumerate() {
                    lines.push(entry.grid_line(i + 1));
                }
                pad_blank(lines, per_page.saturating_sub(slice.len()));
            }
        }
    }

    fn render_grid(&self, menu: &Menu, language: &str, strings: &dyn Localizer) -> String {
        let pages = self.pages(menu);
        let mut lines = Vec::new();
        lines.push(format!("{:<width$}", menu.title, width = TITLE_WIDTH));
        if !menu.description.is_empty() {
            lines.push(format!("{}\n", menu.description));
        }
        if pages == 0 {
            lines.push(strings.lookup("empty", language));
        } else {
            self.push_page_lines(menu, &mut lines);
            lines.push(" ".to_string());
            if pages > 1 {
                if self.page == 1 {
                    lines.push(" ".to_string());
                } else {
                    lines.push(format!("->8. {}\n", strings.lookup("prev", language)));
                }
                if self.page == pages {
                    lines.push(" ".to_string());
                } else {
                    lines.push(format!("->9. {}\n", strings.lookup("next", language)));
                }
            } else {
                pad_blank(&mut lines, 2);
            }
        }
        lines.push(format!("0. {}", strings.lookup("cancel", language)));
        lines.join("\n")
    }

    fn render_built_grid(&self, menu: &Menu, language: &str, strings: &dyn Localizer) -> String {
        let pages = self.pages(menu);
        let title = self.content.title.as_deref().unwrap_or(&menu.title);
        let description = self
            .content
            .description
            .as_deref()
            .unwrap_or(&menu.description);
        let rule = "-".repeat(RULE_WIDTH);

        let mut lines = Vec::new();
        lines.push(format!(
            "{:<width$}({}/{})",
            title,
            self.page,
            pages.max(1),
            width = TITLE_WIDTH
        ));
        if !description.is_empty() {
            lines.push(format!("{}\n", description));
        }
        lines.push(rule.clone());
        if pages == 0 {
            lines.push(strings.lookup("empty", language));
        } else {
            self.push_page_lines(menu, &mut lines);
            lines.push(rule);
            if pages > 1 {
                let prev = strings.lookup("prev", language);
                let next = strings.lookup("next", language);
                if self.page == 1 {
                    lines.push(format!("8. {}", prev));
                } else {
                    lines.push(format!("->8. {}\n", prev));
                }
                if self.page == pages {
                    lines.push(format!("9. {}\n", next));
                } else {
                    lines.push(format!("->9. {}\n", next));
                }
            } else {
                pad_blank(&mut lines, 2);
            }
        }
        lines.push(format!("0. {}", strings.lookup("cancel", language)));
        lines.join("\n")
    }
}

fn join_labels(entries: &[Entry]) -> String {
    entries
        .iter()
        .map(Entry::label)
        .collect::<Vec<_>>()
        .join("\n")
}

fn pad_blank(lines: &mut Vec<String>, count: usize) {
    lines.extend(std::iter::repeat(" ".to_string()).take(count));
}
