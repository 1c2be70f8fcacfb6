//! Faction identification and faction-aware match selection.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::debug;

use crate::error::{Error, Result};
use crate::pattern::BytePattern;
use crate::process::ReadMemory;
use crate::snapshot::MemorySnapshot;

/// Faction of the local player.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum NationTag {
    Karus,
    #[strum(to_string = "ElMorad", serialize = "el_morad", serialize = "human")]
    ElMorad,
}

/// Raw byte values that identify each faction at some location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationTags {
    pub karus: u8,
    pub el_morad: u8,
}

impl NationTags {
    pub fn tag_of(&self, nation: NationTag) -> u8 {
        match nation {
            NationTag::Karus => self.karus,
            NationTag::ElMorad => self.el_morad,
        }
    }

    pub fn nation_of(&self, byte: u8) -> Option<NationTag> {
        if byte == self.karus {
            Some(NationTag::Karus)
        } else if byte == self.el_morad {
            Some(NationTag::ElMorad)
        } else {
            None
        }
    }
}

/// Where the local player's faction byte lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationIdentification {
    pub pattern: BytePattern,
    pub offset: i64,
    #[serde(default = "default_player_tags")]
    pub tags: NationTags,
}

/// How a faction-specific match is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disambiguation {
    pub offset: i64,
    #[serde(default = "default_match_tags")]
    pub tags: NationTags,
}

fn default_player_tags() -> NationTags {
    NationTags {
        karus: 75,
        el_morad: 69,
    }
}

fn default_match_tags() -> NationTags {
    NationTags {
        karus: 62,
        el_morad: 38,
    }
}

/// Read one byte, preferring the snapshot when it actually holds that byte.
fn read_tag_byte<R: ReadMemory + ?Sized>(
    snapshot: &MemorySnapshot,
    reader: &R,
    address: u64,
) -> Result<u8> {
    if snapshot.is_readable_at(address) {
        snapshot.read_u8(address)
    } else {
        reader.read_u8(address)
    }
}

/// Resolve the local player's faction.
///
/// An unrecognized byte means the identification fingerprint no longer
/// matches this client build and is reported as `UnknownNation`.
pub fn resolve_nation<R: ReadMemory + ?Sized>(
    snapshot: &MemorySnapshot,
    reader: &R,
    identification: &NationIdentification,
) -> Result<NationTag> {
    let anchor = snapshot.find(&identification.pattern, None)?;
    let address = anchor.wrapping_add_signed(identification.offset);
    let byte = read_tag_byte(snapshot, reader, address)?;

    let nation = identification
        .tags
        .nation_of(byte)
        .ok_or(Error::UnknownNation(byte))?;
    debug!(
        "Nation byte {} at {:#x} (anchor {:#x}) -> {}",
        byte, address, anchor, nation
    );
    Ok(nation)
}

/// Find the occurrence of `pattern` that belongs to `nation`.
///
/// The first match is used when its tag byte equals the expected tag;
/// otherwise the next match after it is checked. When neither qualifies the
/// result is `AmbiguousMatch`.
pub fn locate_for_nation<R: ReadMemory + ?Sized>(
    snapshot: &MemorySnapshot,
    reader: &R,
    field: &str,
    pattern: &BytePattern,
    nation: NationTag,
    rule: &Disambiguation,
) -> Result<u64> {
    let expected = rule.tags.tag_of(nation);

    let first = snapshot.find(pattern, None)?;
    let first_tag = read_tag_byte(snapshot, reader, first.wrapping_add_signed(rule.offset))?;
    if first_tag == expected {
        debug!("{}: first match {:#x} belongs to {}", field, first, nation);
        return Ok(first);
    }

    let second = match snapshot.find(pattern, Some(first + 1)) {
        Ok(address) => address,
        Err(Error::PatternNotFound(_)) | Err(Error::AddressOutOfRange { .. }) => {
            return Err(Error::AmbiguousMatch {
                field: field.to_string(),
                first,
                second: None,
            });
        }
        Err(e) => return Err(e),
    };

    let second_tag = read_tag_byte(snapshot, reader, second.wrapping_add_signed(rule.offset))?;
    if second_tag == expected {
        debug!(
            "{}: first match {:#x} has tag {}, using second match {:#x}",
            field, first, first_tag, second
        );
        return Ok(second);
    }

    Err(Error::AmbiguousMatch {
        field: field.to_string(),
        first,
        second: Some(second),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{MockMemoryBuilder, MockMemoryReader};

    const RULE: Disambiguation = Disambiguation {
        offset: 0x10,
        tags: NationTags {
            karus: 62,
            el_morad: 38,
        },
    };

    fn pattern() -> BytePattern {
        "AA BB CC".parse().unwrap()
    }

    fn two_matches(first_tag: u8, second_tag: u8) -> (MemorySnapshot, MockMemoryReader) {
        let reader = MockMemoryBuilder::new()
            .with_size(0x200)
            .write_bytes(0x20, &[0xAA, 0xBB, 0xCC])
            .write_u8(0x30, first_tag)
            .write_bytes(0x100, &[0xAA, 0xBB, 0xCC])
            .write_u8(0x110, second_tag)
            .build();
        let snapshot = MemorySnapshot::create(&reader, 0x1000, 0x200).unwrap();
        (snapshot, reader)
    }

    #[test]
    fn test_nation_tag_parse_and_display() {
        assert_eq!("karus".parse::<NationTag>().unwrap(), NationTag::Karus);
        assert_eq!("ElMorad".parse::<NationTag>().unwrap(), NationTag::ElMorad);
        assert_eq!("human".parse::<NationTag>().unwrap(), NationTag::ElMorad);
        assert_eq!(NationTag::Karus.to_string(), "Karus");
        assert!("orc".parse::<NationTag>().is_err());
    }

    #[test]
    fn test_tags_lookup() {
        let tags = RULE.tags;
        assert_eq!(tags.tag_of(NationTag::Karus), 62);
        assert_eq!(tags.nation_of(38), Some(NationTag::ElMorad));
        assert_eq!(tags.nation_of(1), None);
    }

    #[test]
    fn test_first_match_accepted() {
        let (snapshot, reader) = two_matches(62, 38);
        let address =
            locate_for_nation(&snapshot, &reader, "spike", &pattern(), NationTag::Karus, &RULE)
                .unwrap();
        assert_eq!(address, 0x1020);
    }

    #[test]
    fn test_second_match_selected() {
        let (snapshot, reader) = two_matches(62, 38);
        let address = locate_for_nation(
            &snapshot,
            &reader,
            "spike",
            &pattern(),
            NationTag::ElMorad,
            &RULE,
        )
        .unwrap();
        assert_eq!(address, 0x1100);
    }

    #[test]
    fn test_both_wrong_is_ambiguous() {
        let (snapshot, reader) = two_matches(62, 62);
        let result = locate_for_nation(
            &snapshot,
            &reader,
            "spike",
            &pattern(),
            NationTag::ElMorad,
            &RULE,
        );
        match result {
            Err(Error::AmbiguousMatch {
                field,
                first,
                second,
            }) => {
                assert_eq!(field, "spike");
                assert_eq!(first, 0x1020);
                assert_eq!(second, Some(0x1100));
            }
            other => panic!("expected AmbiguousMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_second_is_ambiguous() {
        let reader = MockMemoryBuilder::new()
            .with_size(0x100)
            .write_bytes(0x20, &[0xAA, 0xBB, 0xCC])
            .write_u8(0x30, 62)
            .build();
        let snapshot = MemorySnapshot::create(&reader, 0x1000, 0x100).unwrap();

        let result = locate_for_nation(
            &snapshot,
            &reader,
            "spike",
            &pattern(),
            NationTag::ElMorad,
            &RULE,
        );
        assert!(matches!(
            result,
            Err(Error::AmbiguousMatch { second: None, .. })
        ));
    }

    #[test]
    fn test_no_match_is_pattern_not_found() {
        let snapshot = MemorySnapshot::from_bytes(0x1000, vec![0; 0x40]);
        let reader = MockMemoryReader::new(vec![0; 0x40]);
        assert!(matches!(
            locate_for_nation(&snapshot, &reader, "x", &pattern(), NationTag::Karus, &RULE),
            Err(Error::PatternNotFound(_))
        ));
    }

    #[test]
    fn test_tag_outside_window_read_live() {
        // The snapshot ends right after the match; the tag byte is only
        // available from the live reader.
        let reader = MockMemoryBuilder::new()
            .with_size(0x100)
            .write_bytes(0x20, &[0xAA, 0xBB, 0xCC])
            .write_u8(0x30, 38)
            .build();
        let snapshot = MemorySnapshot::create(&reader, 0x1000, 0x23).unwrap();

        let address = locate_for_nation(
            &snapshot,
            &reader,
            "spike",
            &pattern(),
            NationTag::ElMorad,
            &RULE,
        )
        .unwrap();
        assert_eq!(address, 0x1020);
    }

    #[test]
    fn test_resolve_nation() {
        let reader = MockMemoryBuilder::new()
            .with_size(0x100)
            .write_bytes(0x40, b"Text_Nation")
            .write_u8(0x40 + 0xC4 - 0x80, 75)
            .build();
        let snapshot = MemorySnapshot::create(&reader, 0x1000, 0x100).unwrap();
        let identification = NationIdentification {
            pattern: BytePattern::exact(b"Text_Nation").unwrap(),
            offset: 0xC4 - 0x80,
            tags: default_player_tags(),
        };

        assert_eq!(
            resolve_nation(&snapshot, &reader, &identification).unwrap(),
            NationTag::Karus
        );
    }

    #[test]
    fn test_resolve_nation_unknown_byte() {
        let reader = MockMemoryBuilder::new()
            .with_size(0x100)
            .write_bytes(0x40, b"Text_Nation")
            .write_u8(0x50, 1)
            .build();
        let snapshot = MemorySnapshot::create(&reader, 0x1000, 0x100).unwrap();
        let identification = NationIdentification {
            pattern: BytePattern::exact(b"Text_Nation").unwrap(),
            offset: 0x10,
            tags: default_player_tags(),
        };

        assert!(matches!(
            resolve_nation(&snapshot, &reader, &identification),
            Err(Error::UnknownNation(1))
        ));
    }
}
