//! Key symbol table.
//!
//! Maps lowercase key names to Windows-style virtual-key codes. Backends that
//! do not speak VK codes natively translate from these values.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Virtual-key code understood by the injection backends.
pub type KeyCode = u16;

const NAMED_KEYS: &[(&str, KeyCode)] = &[
    ("enter", 0x0D),
    ("return", 0x0D),
    ("space", 0x20),
    ("tab", 0x09),
    ("esc", 0x1B),
    ("escape", 0x1B),
    ("backspace", 0x08),
    ("delete", 0x2E),
    ("home", 0x24),
    ("end", 0x23),
    ("pageup", 0x21),
    ("pagedown", 0x22),
    ("up", 0x26),
    ("down", 0x28),
    ("left", 0x25),
    ("right", 0x27),
];

/// Immutable symbol to key-code lookup, built once on first use.
#[derive(Debug)]
pub struct KeySymbolTable {
    codes: HashMap<String, KeyCode>,
}

impl KeySymbolTable {
    /// The process-wide table.
    pub fn global() -> &'static KeySymbolTable {
        static TABLE: OnceLock<KeySymbolTable> = OnceLock::new();
        TABLE.get_or_init(KeySymbolTable::build)
    }

    fn build() -> Self {
        let mut codes = HashMap::new();

        for c in b'a'..=b'z' {
            codes.insert((c as char).to_string(), c.to_ascii_uppercase() as KeyCode);
        }
        for c in b'0'..=b'9' {
            codes.insert((c as char).to_string(), c as KeyCode);
        }
        for n in 1..=12u16 {
            codes.insert(format!("f{n}"), 0x6F + n);
        }
        for (name, code) in NAMED_KEYS {
            codes.insert((*name).to_string(), *code);
        }

        Self { codes }
    }

    /// Look up a symbol. Case and surrounding whitespace are ignored.
    pub fn resolve(&self, symbol: &str) -> Option<KeyCode> {
        self.codes.get(&symbol.trim().to_lowercase()).copied()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.resolve(symbol).is_some()
    }

    /// All known symbols, sorted by code and then by name.
    pub fn symbols(&self) -> Vec<(&str, KeyCode)> {
        let mut entries: Vec<_> = self
            .codes
            .iter()
            .map(|(name, code)| (name.as_str(), *code))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        entries
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_and_digits() {
        let table = KeySymbolTable::global();
        assert_eq!(table.resolve("a"), Some(0x41));
        assert_eq!(table.resolve("z"), Some(0x5A));
        assert_eq!(table.resolve("0"), Some(0x30));
        assert_eq!(table.resolve("9"), Some(0x39));
    }

    #[test]
    fn test_named_keys() {
        let table = KeySymbolTable::global();
        assert_eq!(table.resolve("enter"), Some(0x0D));
        assert_eq!(table.resolve("space"), Some(0x20));
        assert_eq!(table.resolve("esc"), Some(0x1B));
        assert_eq!(table.resolve("left"), Some(0x25));
        assert_eq!(table.resolve("f1"), Some(0x70));
        assert_eq!(table.resolve("f12"), Some(0x7B));
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let table = KeySymbolTable::global();
        assert_eq!(table.resolve(" Enter "), Some(0x0D));
        assert_eq!(table.resolve("A"), table.resolve("a"));
        assert_eq!(table.resolve("F5"), Some(0x74));
    }

    #[test]
    fn test_unknown_symbols() {
        let table = KeySymbolTable::global();
        assert_eq!(table.resolve(""), None);
        assert_eq!(table.resolve("f13"), None);
        assert_eq!(table.resolve("ctrl"), None);
        assert!(!table.contains("invalid_key_xyz"));
    }

    #[test]
    fn test_resolution_is_stable() {
        let table = KeySymbolTable::global();
        for (name, code) in table.symbols() {
            assert_eq!(table.resolve(name), Some(code));
            assert_eq!(KeySymbolTable::global().resolve(name), Some(code));
        }
        // 26 letters, 10 digits, 12 function keys, named keys
        assert_eq!(table.len(), 26 + 10 + 12 + NAMED_KEYS.len());
    }
}
