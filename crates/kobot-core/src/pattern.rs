//! Byte fingerprints with don't-care positions.
//!
//! A [`BytePattern`] is written as space separated hex tokens, with `??` (or
//! `?`) marking a byte that matches anything:
//!
//! ```
//! use kobot_core::pattern::BytePattern;
//!
//! let pattern: BytePattern = "53 70 ?? 6B".parse().unwrap();
//! assert_eq!(pattern.find_first(&[0, 0x53, 0x70, 0xFF, 0x6B], 0), Some(1));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Fixed-length byte sequence plus a per-position compare mask.
///
/// `mask[i] == true` means position `i` is compared; `false` is a wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BytePattern {
    bytes: Vec<u8>,
    mask: Vec<bool>,
}

impl BytePattern {
    /// Pattern where every byte is compared.
    pub fn exact(bytes: &[u8]) -> Result<Self> {
        Self::with_mask(bytes.to_vec(), vec![true; bytes.len()])
    }

    pub fn with_mask(bytes: Vec<u8>, mask: Vec<bool>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidPattern("Pattern is empty".to_string()));
        }
        if bytes.len() != mask.len() {
            return Err(Error::InvalidPattern(format!(
                "Pattern has {} bytes but {} mask entries",
                bytes.len(),
                mask.len()
            )));
        }
        if !mask.iter().any(|&m| m) {
            return Err(Error::InvalidPattern(
                "Pattern has no compared bytes".to_string(),
            ));
        }
        Ok(Self { bytes, mask })
    }

    /// Build a pattern from a byte array in which `placeholder` marks
    /// don't-care positions (fingerprints captured with `0x3F` holes).
    pub fn from_placeholder(bytes: &[u8], placeholder: u8) -> Result<Self> {
        let mask = bytes.iter().map(|&b| b != placeholder).collect();
        Self::with_mask(bytes.to_vec(), mask)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Number of positions that are compared.
    pub fn significant_len(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// Whether the pattern matches `buffer` starting at `pos`.
    pub fn matches_at(&self, buffer: &[u8], pos: usize) -> bool {
        let Some(window) = buffer.get(pos..pos + self.bytes.len()) else {
            return false;
        };
        window
            .iter()
            .zip(self.bytes.iter().zip(&self.mask))
            .all(|(&actual, (&expected, &compared))| !compared || actual == expected)
    }

    /// First match at or after `from`.
    ///
    /// Positions whose first compared byte differs are skipped before the
    /// rest of the pattern is compared.
    pub fn find_first(&self, buffer: &[u8], from: usize) -> Option<usize> {
        if buffer.len() < self.bytes.len() {
            return None;
        }
        let last = buffer.len() - self.bytes.len();
        if from > last {
            return None;
        }

        let anchor = self.anchor();
        let anchor_byte = self.bytes[anchor];

        let mut pos = from;
        while pos <= last {
            // Jump straight to the next candidate whose anchor byte matches.
            let haystack = &buffer[pos + anchor..=last + anchor];
            let skip = haystack.iter().position(|&b| b == anchor_byte)?;
            pos += skip;
            if self.matches_at(buffer, pos) {
                return Some(pos);
            }
            pos += 1;
        }
        None
    }

    /// Every match offset in ascending order. Overlapping matches are reported.
    pub fn find_all(&self, buffer: &[u8]) -> Vec<usize> {
        let mut results = Vec::new();
        let mut from = 0;
        while let Some(pos) = self.find_first(buffer, from) {
            results.push(pos);
            from = pos + 1;
        }
        results
    }

    fn anchor(&self) -> usize {
        // with_mask guarantees at least one compared position
        self.mask.iter().position(|&m| m).unwrap_or(0)
    }
}

impl FromStr for BytePattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = Vec::new();
        let mut mask = Vec::new();
        for token in s.split_whitespace() {
            if token == "??" || token == "?" {
                bytes.push(0);
                mask.push(false);
                continue;
            }

            let value = u8::from_str_radix(token, 16).map_err(|e| {
                Error::InvalidPattern(format!("Invalid pattern token '{}': {}", token, e))
            })?;
            bytes.push(value);
            mask.push(true);
        }
        Self::with_mask(bytes, mask)
    }
}

impl TryFrom<String> for BytePattern {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<BytePattern> for String {
    fn from(pattern: BytePattern) -> Self {
        pattern.to_string()
    }
}

impl fmt::Display for BytePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (byte, compared)) in self.bytes.iter().zip(&self.mask).enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if *compared {
                write!(f, "{:02X}", byte)?;
            } else {
                f.write_str("??")?;
            }
        }
        Ok(())
    }
}
