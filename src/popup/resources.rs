//! Localized strings for the text the engine adds itself (paging links, cancel, empty).

use std::collections::HashMap;

use super::hooks::Localizer;

const BUILTIN_LANGUAGE: &str = "en";

const BUILTIN_STRINGS: &[(&str, &str)] = &[
    ("prev", "Previous"),
    ("next", "Next"),
    ("cancel", "Cancel"),
    ("empty", "(empty)"),
];

/// String table keyed by language then string id.
///
/// Lookup order: requested language, configured default language, built-in English, and
/// finally the key itself so a missing translation is visible rather than blank.
#[derive(Debug, Clone)]
pub struct StringTable {
    default_language: String,
    table: HashMap<String, HashMap<String, String>>,
}

impl StringTable {
    pub fn builtin() -> Self {
        let mut table = HashMap::new();
        table.insert(
            BUILTIN_LANGUAGE.to_string(),
            BUILTIN_STRINGS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        StringTable {
            default_language: BUILTIN_LANGUAGE.to_string(),
            table,
        }
    }

    /// Built-in strings overlaid with configured ones.
    pub fn from_config(
        default_language: &str,
        strings: &HashMap<String, HashMap<String, String>>,
    ) -> Self {
        let mut out = Self::builtin();
        out.default_language = default_language.to_ascii_lowercase();
        for (language, entries) in strings {
            let slot = out.table.entry(language.to_ascii_lowercase()).or_default();
            for (key, value) in entries {
                slot.insert(key.clone(), value.clone());
            }
        }
        out
    }

    pub fn set(&mut self, language: &str, key: &str, value: impl Into<String>) {
        self.table
            .entry(language.to_ascii_lowercase())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self.table.keys().map(String::as_str).collect();
        langs.sort_unstable();
        langs
    }

    fn get(&self, language: &str, key: &str) -> Option<&String> {
        self.table.get(language).and_then(|t| t.get(key))
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Localizer for StringTable {
    fn lookup(&self, key: &str, language: &str) -> String {
        let language = language.to_ascii_lowercase();
        self.get(&language, key)
            .or_else(|| self.get(&self.default_language, key))
            .or_else(|| self.get(BUILTIN_LANGUAGE, key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
