//! Virtual-key codes as they appear in configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A Windows virtual-key code.
///
/// Parsed from names (`"F1"`, `"2"`, `"R"`, `"ENTER"`, `"NUMPAD3"`) or from
/// hex (`"0x52"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VirtualKey(pub u16);

const NAMED_KEYS: &[(&str, u16)] = &[
    ("BACKSPACE", 0x08),
    ("TAB", 0x09),
    ("ENTER", 0x0D),
    ("SHIFT", 0x10),
    ("CTRL", 0x11),
    ("ALT", 0x12),
    ("ESC", 0x1B),
    ("SPACE", 0x20),
    ("PAGEUP", 0x21),
    ("PAGEDOWN", 0x22),
    ("END", 0x23),
    ("HOME", 0x24),
    ("LEFT", 0x25),
    ("UP", 0x26),
    ("RIGHT", 0x27),
    ("DOWN", 0x28),
    ("INSERT", 0x2D),
    ("DELETE", 0x2E),
];

const ALIASES: &[(&str, &str)] = &[
    ("RETURN", "ENTER"),
    ("ESCAPE", "ESC"),
    ("CONTROL", "CTRL"),
    ("DEL", "DELETE"),
    ("INS", "INSERT"),
];

impl VirtualKey {
    pub const F1: VirtualKey = VirtualKey(0x70);
    pub const R: VirtualKey = VirtualKey(0x52);

    pub fn code(self) -> u16 {
        self.0
    }

    /// Keys that need the extended-key flag when sent as scan codes.
    pub fn is_extended(self) -> bool {
        matches!(self.0, 0x21..=0x28 | 0x2D | 0x2E)
    }

    fn name(self) -> Option<String> {
        let code = self.0;
        match code {
            0x30..=0x39 | 0x41..=0x5A => Some(char::from(code as u8).to_string()),
            0x60..=0x69 => Some(format!("NUMPAD{}", code - 0x60)),
            0x70..=0x87 => Some(format!("F{}", code - 0x70 + 1)),
            _ => NAMED_KEYS
                .iter()
                .find(|(_, c)| *c == code)
                .map(|(name, _)| name.to_string()),
        }
    }
}

impl FromStr for VirtualKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim().to_ascii_uppercase();
        let invalid = || Error::InvalidKey(s.to_string());

        if let Some(hex) = token.strip_prefix("0X") {
            let code = u16::from_str_radix(hex, 16).map_err(|_| invalid())?;
            if code == 0 || code > 0xFF {
                return Err(invalid());
            }
            return Ok(VirtualKey(code));
        }

        let mut chars = token.chars();
        if let (Some(c), None) = (chars.next(), chars.next())
            && c.is_ascii_alphanumeric()
        {
            return Ok(VirtualKey(c as u16));
        }

        if let Some(n) = token.strip_prefix("NUMPAD") {
            let n: u16 = n.parse().map_err(|_| invalid())?;
            if n > 9 {
                return Err(invalid());
            }
            return Ok(VirtualKey(0x60 + n));
        }

        if let Some(n) = token.strip_prefix('F')
            && let Ok(n) = n.parse::<u16>()
        {
            if !(1..=24).contains(&n) {
                return Err(invalid());
            }
            return Ok(VirtualKey(0x70 + n - 1));
        }

        let name = ALIASES
            .iter()
            .find(|(alias, _)| *alias == token)
            .map(|(_, name)| *name)
            .unwrap_or(token.as_str());
        NAMED_KEYS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, code)| VirtualKey(*code))
            .ok_or_else(invalid)
    }
}

impl fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(&name),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

impl TryFrom<String> for VirtualKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<VirtualKey> for String {
    fn from(key: VirtualKey) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_function_keys() {
        assert_eq!("F1".parse::<VirtualKey>().unwrap(), VirtualKey::F1);
        assert_eq!("f12".parse::<VirtualKey>().unwrap(), VirtualKey(0x7B));
        assert_eq!("F24".parse::<VirtualKey>().unwrap(), VirtualKey(0x87));
        assert!("F25".parse::<VirtualKey>().is_err());
        assert!("F0".parse::<VirtualKey>().is_err());
    }

    #[test]
    fn test_parse_alphanumeric() {
        assert_eq!("2".parse::<VirtualKey>().unwrap(), VirtualKey(0x32));
        assert_eq!("r".parse::<VirtualKey>().unwrap(), VirtualKey::R);
        // A lone "F" is the letter, not a function key.
        assert_eq!("F".parse::<VirtualKey>().unwrap(), VirtualKey(0x46));
    }

    #[test]
    fn test_parse_named_and_aliases() {
        assert_eq!("ENTER".parse::<VirtualKey>().unwrap(), VirtualKey(0x0D));
        assert_eq!("return".parse::<VirtualKey>().unwrap(), VirtualKey(0x0D));
        assert_eq!("Escape".parse::<VirtualKey>().unwrap(), VirtualKey(0x1B));
        assert_eq!("numpad7".parse::<VirtualKey>().unwrap(), VirtualKey(0x67));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!("0x52".parse::<VirtualKey>().unwrap(), VirtualKey::R);
        assert!("0x0".parse::<VirtualKey>().is_err());
        assert!("0x100".parse::<VirtualKey>().is_err());
        assert!("0xZZ".parse::<VirtualKey>().is_err());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            "HYPER".parse::<VirtualKey>(),
            Err(Error::InvalidKey(_))
        ));
        assert!("".parse::<VirtualKey>().is_err());
        assert!("NUMPAD10".parse::<VirtualKey>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(VirtualKey::F1.to_string(), "F1");
        assert_eq!(VirtualKey(0x31).to_string(), "1");
        assert_eq!(VirtualKey(0x0D).to_string(), "ENTER");
        assert_eq!(VirtualKey(0x64).to_string(), "NUMPAD4");
        assert_eq!(VirtualKey(0xBA).to_string(), "0xBA");
    }

    #[test]
    fn test_extended() {
        assert!("UP".parse::<VirtualKey>().unwrap().is_extended());
        assert!(!VirtualKey::F1.is_extended());
    }

    #[test]
    fn test_deserialize_list() {
        #[derive(Deserialize)]
        struct Action {
            keys: Vec<VirtualKey>,
        }
        let action: Action = toml::from_str(r#"keys = ["F1", "1"]"#).unwrap();
        assert_eq!(action.keys, vec![VirtualKey(0x70), VirtualKey(0x31)]);
    }
}
