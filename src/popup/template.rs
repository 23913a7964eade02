//! `$name` placeholder substitution for template menus.
//!
//! Supported forms: `$name`, `${name}` and `$$` for a literal dollar sign. Names follow
//! identifier rules (`[A-Za-z_][A-Za-z0-9_]*`). Placeholders without a value are left in the
//! output untouched and reported back so the caller can log them.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    pub missing: Vec<String>,
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

pub fn substitute(template: &str, values: &BTreeMap<String, String>) -> Substitution {
    let mut out = String::with_capacity(template.len());
    let mut missing = Vec::new();
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '$' {
            out.push(c);
            i += 1;
            continue;
        }
        match chars.get(i + 1) {
            Some('$') => {
                out.push('$');
                i += 2;
            }
            Some('{') => {
                let start = i + 2;
                let mut end = start;
                while end < chars.len() && is_ident_char(chars[end]) {
                    end += 1;
                }
                let valid = end > start
                    && is_ident_start(chars[start])
                    && chars.get(end) == Some(&'}');
                if !valid {
                    out.push('$');
                    i += 1;
                    continue;
                }
                let name: String = chars[start..end].iter().collect();
                push_value(&mut out, &mut missing, values, &name, &chars[i..=end]);
                i = end + 1;
            }
            Some(&next) if is_ident_start(next) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_ident_char(chars[end]) {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                push_value(&mut out, &mut missing, values, &name, &chars[i..end]);
                i = end;
            }
            _ => {
                out.push('$');
                i += 1;
            }
        }
    }

    Substitution { text: out, missing }
}

fn push_value(
    out: &mut String,
    missing: &mut Vec<String>,
    values: &BTreeMap<String, String>,
    name: &str,
    raw: &[char],
) {
    match values.get(name) {
        Some(value) => out.push_str(value),
        None => {
            out.extend(raw.iter());
            if !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_both_placeholder_forms() {
        let v = values(&[("name", "alice"), ("hp", "42")]);
        let sub = substitute("Hi $name, ${hp}hp left", &v);
        assert_eq!(sub.text, "Hi alice, 42hp left");
        assert!(sub.missing.is_empty());
    }

    #[test]
    fn dollar_escape_and_stray_dollars() {
        let sub = substitute("Cost: $$5 or $ 3 or $9", &BTreeMap::new());
        assert_eq!(sub.text, "Cost: $5 or $ 3 or $9");
        assert!(sub.missing.is_empty());
    }

    #[test]
    fn missing_values_stay_verbatim() {
        let sub = substitute("$who owes ${amount} to $who", &values(&[]));
        assert_eq!(sub.text, "$who owes ${amount} to $who");
        assert_eq!(sub.missing, vec!["who".to_string(), "amount".to_string()]);
    }

    #[test]
    fn malformed_braces_are_literal() {
        let sub = substitute("${1abc} ${open", &values(&[("open", "x")]));
        assert_eq!(sub.text, "${1abc} ${open");
    }
}
