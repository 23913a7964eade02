//! Input key sets and the reserved paging codes.

use std::fmt;
use std::str::FromStr;

/// Code sent for the "previous page" key.
pub const KEY_PREV: u8 = 8;
/// Code sent for the "next page" key.
pub const KEY_NEXT: u8 = 9;
/// Code sent for the exit key (`0` on the client keypad); pops navigation history.
pub const KEY_BACK: u8 = 10;
/// Highest code that can pick an option on a grid page.
pub const MAX_OPTION_KEY: u8 = 7;

/// Set of digit keys a client may press while a menu is shown.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySet(u16);

impl KeySet {
    pub const ALL: KeySet = KeySet(0b11_1111_1111);
    pub const NONE: KeySet = KeySet(0);

    pub fn contains(&self, digit: u8) -> bool {
        digit <= 9 && self.0 & (1 << digit) != 0
    }

    pub fn insert(&mut self, digit: u8) {
        if digit <= 9 {
            self.0 |= 1 << digit;
        }
    }

    pub fn remove(&mut self, digit: u8) {
        if digit <= 9 {
            self.0 &= !(1 << digit);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl Default for KeySet {
    fn default() -> Self {
        KeySet::ALL
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid key '{0}' (only digits 0-9 are accepted)")]
pub struct InvalidKey(pub char);

impl FromStr for KeySet {
    type Err = InvalidKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = KeySet::NONE;
        for ch in s.chars() {
            let digit = ch.to_digit(10).ok_or(InvalidKey(ch))?;
            set.insert(digit as u8);
        }
        Ok(set)
    }
}

/// Renders in the `"0123456789"` form clients expect.
impl fmt::Display for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for digit in 0..=9u8 {
            if self.contains(digit) {
                write!(f, "{}", digit)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeySet(\"{}\")", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let keys: KeySet = "1290".parse().unwrap();
        assert!(keys.contains(0));
        assert!(keys.contains(9));
        assert!(!keys.contains(5));
        assert_eq!(keys.to_string(), "0129");
        assert_eq!(KeySet::default().to_string(), "0123456789");
    }

    #[test]
    fn rejects_non_digits() {
        assert_eq!("12a".parse::<KeySet>(), Err(InvalidKey('a')));
    }

    #[test]
    fn out_of_range_codes_are_never_members() {
        let mut keys = KeySet::ALL;
        keys.insert(KEY_BACK);
        assert!(!keys.contains(KEY_BACK));
        keys.remove(3);
        assert!(!keys.contains(3));
        assert!(!KeySet::NONE.contains(0));
        assert!(KeySet::NONE.is_empty());
    }
}
