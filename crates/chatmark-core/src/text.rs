//! Byte/char offset conversion for a composer buffer.
//!
//! Rules match on UTF-8 byte offsets; every range handed to a host counts
//! Unicode scalar values (chars).

use std::ops::Range;

/// Offset conversion between UTF-8 bytes and chars.
pub trait CharOffsets {
    fn len_bytes(&self) -> usize;

    fn len_chars(&self) -> usize;

    /// Char offset of a byte offset. Clamped to the end of the text.
    fn byte_to_char(&self, byte_offset: usize) -> usize;

    /// Byte offset of a char offset. Clamped to the end of the text.
    fn char_to_byte(&self, char_offset: usize) -> usize;

    fn byte_range_to_chars(&self, bytes: Range<usize>) -> Range<usize> {
        self.byte_to_char(bytes.start)..self.byte_to_char(bytes.end)
    }

    fn char_range_to_bytes(&self, chars: Range<usize>) -> Range<usize> {
        self.char_to_byte(chars.start)..self.char_to_byte(chars.end)
    }
}

/// Rope snapshot of a buffer, O(log n) per conversion.
///
/// A decoration pass converts every range it emits, so long messages with
/// many markers would go quadratic with a linear scan.
#[derive(Clone, Default)]
pub struct SourceText {
    rope: ropey::Rope,
}

impl SourceText {
    pub fn new(text: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(text),
        }
    }
}

impl CharOffsets for SourceText {
    fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn byte_to_char(&self, byte_offset: usize) -> usize {
        self.rope.byte_to_char(byte_offset.min(self.rope.len_bytes()))
    }

    fn char_to_byte(&self, char_offset: usize) -> usize {
        self.rope.char_to_byte(char_offset.min(self.rope.len_chars()))
    }
}

/// Linear conversion straight off a `str`, for short one-off lookups.
impl CharOffsets for str {
    fn len_bytes(&self) -> usize {
        self.len()
    }

    fn len_chars(&self) -> usize {
        self.chars().count()
    }

    fn byte_to_char(&self, byte_offset: usize) -> usize {
        self.char_indices().take_while(|(i, _)| *i < byte_offset).count()
    }

    fn char_to_byte(&self, char_offset: usize) -> usize {
        self.char_indices()
            .nth(char_offset)
            .map(|(i, _)| i)
            .unwrap_or(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rope_conversion() {
        // the flame is 4 bytes, 1 char
        let text = SourceText::new("hey 🔥 *x*");
        assert_eq!(text.len_chars(), 9);
        assert_eq!(text.len_bytes(), 12);
        assert_eq!(text.char_to_byte(5), 8);
        assert_eq!(text.byte_to_char(8), 5);
        assert_eq!(text.byte_range_to_chars(4..8), 4..5);
        assert_eq!(text.char_range_to_bytes(6..9), 9..12);
    }

    #[test]
    fn test_clamps_past_end() {
        let text = SourceText::new("ab");
        assert_eq!(text.byte_to_char(99), 2);
        assert_eq!(text.char_to_byte(99), 2);
    }

    #[test]
    fn test_str_agrees_with_rope() {
        let s = "é🔥a\nß";
        let rope = SourceText::new(s);
        for byte in 0..=s.len() {
            if s.is_char_boundary(byte) {
                assert_eq!(s.byte_to_char(byte), rope.byte_to_char(byte), "byte {byte}");
            }
        }
        for ch in 0..=s.len_chars() {
            assert_eq!(s.char_to_byte(ch), rope.char_to_byte(ch), "char {ch}");
        }
    }
}
