//! Steganography for plain text.
//!
//! Two methods:
//! - **Whitespace**: each bit becomes a trailing space (0) or tab (1)
//!   appended to successive lines.
//! - **Zero-width**: each bit becomes an invisible code point, U+200B
//!   (zero width space, 0) or U+200C (zero width non-joiner, 1), inserted
//!   after successive characters.
//!
//! Lines and characters past the end marker stay untouched.

use std::path::Path;

use crate::crypto;
use crate::stego::bitstream::{marked_bit_len, marked_bits, BitCollector, MARKER_BITS};
use crate::stego::{StegoError, TextMethod};

/// Zero-width space, encodes bit 0.
const ZW_ZERO: char = '\u{200B}';

/// Zero-width non-joiner, encodes bit 1.
const ZW_ONE: char = '\u{200C}';

/// Text steganography handler.
pub struct TextStego {
    text: String,
}

impl TextStego {
    /// Creates a new TextStego from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StegoError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self { text })
    }

    /// Creates a new TextStego from carrier text.
    pub fn from_text<S: Into<String>>(text: S) -> Self {
        Self { text: text.into() }
    }

    /// Returns the whitespace payload capacity in bytes (1 bit per line).
    pub fn whitespace_capacity(&self) -> usize {
        self.text.lines().count().saturating_sub(MARKER_BITS) / 8
    }

    /// Returns the zero-width payload capacity in bytes (1 bit per character).
    pub fn zero_width_capacity(&self) -> usize {
        self.text.chars().count().saturating_sub(MARKER_BITS) / 8
    }

    /// Returns the largest message length (bytes) embeddable with whitespace.
    pub fn whitespace_message_capacity(&self) -> usize {
        crypto::max_message_len(self.whitespace_capacity())
    }

    /// Returns the largest message length (bytes) embeddable with zero-width.
    pub fn zero_width_message_capacity(&self) -> usize {
        crypto::max_message_len(self.zero_width_capacity())
    }

    /// Hides a payload token as trailing whitespace, one bit per line.
    pub fn hide_whitespace(&self, token: &str) -> Result<String, StegoError> {
        let payload = token.as_bytes();
        let available = self.text.lines().count();
        if marked_bit_len(payload.len()) > available {
            return Err(StegoError::CapacityExceeded {
                needed: payload.len(),
                capacity: self.whitespace_capacity(),
            });
        }

        let mut bits = marked_bits(payload);
        let encoded: Vec<String> = self
            .text
            .split('\n')
            .map(|line| match bits.next() {
                Some(0) => format!("{} ", line),
                Some(_) => format!("{}\t", line),
                None => line.to_string(),
            })
            .collect();

        Ok(encoded.join("\n"))
    }

    /// Extracts a payload token from trailing whitespace.
    ///
    /// Lines ending in neither space nor tab contribute no bit.
    pub fn extract_whitespace(&self) -> Result<String, StegoError> {
        let mut collector = BitCollector::new();
        for line in self.text.split('\n') {
            let bit = if line.ends_with('\t') {
                1
            } else if line.ends_with(' ') {
                0
            } else {
                continue;
            };
            if collector.push(bit) {
                break;
            }
        }

        let payload = collector.into_payload().ok_or(StegoError::NoHiddenData)?;
        String::from_utf8(payload).map_err(|_| StegoError::NoHiddenData)
    }

    /// Hides a payload token as zero-width characters, one bit after each
    /// successive source character.
    pub fn hide_zero_width(&self, token: &str) -> Result<String, StegoError> {
        let payload = token.as_bytes();
        let available = self.text.chars().count();
        if marked_bit_len(payload.len()) > available {
            return Err(StegoError::CapacityExceeded {
                needed: payload.len(),
                capacity: self.zero_width_capacity(),
            });
        }

        let mut bits = marked_bits(payload);
        let mut result = String::with_capacity(self.text.len() + marked_bit_len(payload.len()) * 3);
        for ch in self.text.chars() {
            result.push(ch);
            match bits.next() {
                Some(0) => result.push(ZW_ZERO),
                Some(_) => result.push(ZW_ONE),
                None => {}
            }
        }

        Ok(result)
    }

    /// Extracts a payload token from zero-width characters.
    ///
    /// Other incidental zero-width code points are ignored.
    pub fn extract_zero_width(&self) -> Result<String, StegoError> {
        let mut collector = BitCollector::new();
        for ch in self.text.chars() {
            let bit = match ch {
                ZW_ZERO => 0,
                ZW_ONE => 1,
                _ => continue,
            };
            if collector.push(bit) {
                break;
            }
        }

        let payload = collector.into_payload().ok_or(StegoError::NoHiddenData)?;
        String::from_utf8(payload).map_err(|_| StegoError::NoHiddenData)
    }

    /// Returns the carrier text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Encrypts `message` and embeds it in the carrier text.
pub fn encode_text(
    stego: &TextStego,
    method: TextMethod,
    message: &str,
    passphrase: &str,
) -> Result<String, StegoError> {
    let token = crypto::encrypt_message(message, passphrase)?;

    match method {
        TextMethod::Whitespace => stego.hide_whitespace(&token),
        TextMethod::ZeroWidth => stego.hide_zero_width(&token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_carrier(lines: usize) -> String {
        (0..lines)
            .map(|i| format!("line number {} of the carrier document", i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_whitespace_roundtrip() {
        let carrier = long_carrier(500);
        let stego = TextStego::from_text(&carrier);
        let token = "d2hpdGVzcGFjZSB0b2tlbg";

        let encoded = stego.hide_whitespace(token).unwrap();
        let extracted = TextStego::from_text(encoded).extract_whitespace().unwrap();

        assert_eq!(extracted, token);
    }

    #[test]
    fn test_whitespace_leaves_later_lines_untouched() {
        let carrier = long_carrier(500);
        let stego = TextStego::from_text(&carrier);
        let token = "YQ"; // 2 bytes -> 32 bits with marker

        let encoded = stego.hide_whitespace(token).unwrap();
        let lines: Vec<&str> = encoded.split('\n').collect();

        for line in &lines[..32] {
            assert!(line.ends_with(' ') || line.ends_with('\t'));
        }
        for line in &lines[32..] {
            assert!(!line.ends_with(' ') && !line.ends_with('\t'));
        }
    }

    #[test]
    fn test_whitespace_capacity_exceeded() {
        let stego = TextStego::from_text("one\ntwo\nthree");
        let result = stego.hide_whitespace("dG9vIGxvbmc");

        assert!(matches!(result, Err(StegoError::CapacityExceeded { .. })));
    }

    #[test]
    fn test_whitespace_no_data() {
        let stego = TextStego::from_text(long_carrier(100));
        assert!(matches!(
            stego.extract_whitespace(),
            Err(StegoError::NoHiddenData)
        ));
    }

    #[test]
    fn test_zero_width_roundtrip() {
        let carrier = long_carrier(20);
        let stego = TextStego::from_text(&carrier);
        let token = "emVyby13aWR0aCB0b2tlbg";

        let encoded = stego.hide_zero_width(token).unwrap();
        let extracted = TextStego::from_text(encoded).extract_zero_width().unwrap();

        assert_eq!(extracted, token);
    }

    #[test]
    fn test_zero_width_invisible() {
        let carrier = long_carrier(20);
        let stego = TextStego::from_text(&carrier);

        let encoded = stego.hide_zero_width("dG9rZW4").unwrap();
        let stripped: String = encoded
            .chars()
            .filter(|c| *c != ZW_ZERO && *c != ZW_ONE)
            .collect();

        assert_eq!(stripped, carrier);
    }

    #[test]
    fn test_zero_width_ignores_other_invisibles() {
        let carrier = long_carrier(20);
        let stego = TextStego::from_text(&carrier);
        let token = "aWdub3JlZA";

        let encoded = stego.hide_zero_width(token).unwrap();
        // Sprinkle in unrelated zero-width characters
        let noisy = format!("\u{FEFF}{}\u{200D}", encoded);

        let extracted = TextStego::from_text(noisy).extract_zero_width().unwrap();
        assert_eq!(extracted, token);
    }

    #[test]
    fn test_zero_width_capacity_exceeded() {
        let stego = TextStego::from_text("short");
        let result = stego.hide_zero_width("dG9vIGxvbmcgZm9yIHRoaXM");

        assert!(matches!(result, Err(StegoError::CapacityExceeded { .. })));
    }

    #[test]
    fn test_capacities() {
        let stego = TextStego::from_text(long_carrier(100));
        assert_eq!(stego.whitespace_capacity(), (100 - 16) / 8);
        let chars = stego.text().chars().count();
        assert_eq!(stego.zero_width_capacity(), (chars - 16) / 8);
    }
}
