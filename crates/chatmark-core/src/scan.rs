//! Per-call scan state shared by every matcher.
//!
//! A [`Scan`] wraps the source text together with its escape mask. The mask
//! is computed once per `decorate`/`render` call; matchers never look behind
//! a delimiter for a backslash, they ask the mask instead.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// `\` followed by a reserved symbol or a pictographic character.
pub static ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([*_@|`~<\\]|\p{Extended_Pictographic})").unwrap());

/// A window of the source a matcher may look at.
///
/// `start..end` is the context (line starts, delimiter adjacency), `from` is
/// where the search begins. The decorator and the renderer's post-match loop
/// advance `from` while keeping the context fixed, so a match never depends
/// on where the previous one ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub from: usize,
}

impl Window {
    pub fn new(range: Range<usize>) -> Self {
        Self {
            start: range.start,
            end: range.end,
            from: range.start,
        }
    }

    pub fn starting_at(self, from: usize) -> Self {
        Self {
            from: from.clamp(self.start, self.end),
            ..self
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn remaining(&self) -> Range<usize> {
        self.from..self.end
    }

    pub fn is_exhausted(&self) -> bool {
        self.from >= self.end
    }
}

/// Source text plus its escape mask.
#[derive(Debug, Clone)]
pub struct Scan<'t> {
    text: &'t str,
    masked: Vec<bool>,
    escapes: Vec<Range<usize>>,
}

impl<'t> Scan<'t> {
    pub fn new(text: &'t str) -> Self {
        let mut masked = vec![false; text.len()];
        let mut escapes = Vec::new();
        for m in ESCAPE.find_iter(text) {
            masked[m.range()].fill(true);
            escapes.push(m.range());
        }
        Self {
            text,
            masked,
            escapes,
        }
    }

    pub fn text(&self) -> &'t str {
        self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn slice(&self, range: Range<usize>) -> &'t str {
        &self.text[range]
    }

    /// Whether the byte at `pos` belongs to an escape sequence.
    pub fn is_masked(&self, pos: usize) -> bool {
        self.masked.get(pos).copied().unwrap_or(false)
    }

    /// Whether any byte of `range` is masked.
    pub fn any_masked(&self, range: Range<usize>) -> bool {
        self.masked
            .get(range)
            .is_some_and(|bytes| bytes.iter().any(|&m| m))
    }

    /// Escape sequences, in source order.
    pub fn escapes(&self) -> &[Range<usize>] {
        &self.escapes
    }

    /// First escape sequence fully inside the remaining window.
    pub fn next_escape(&self, window: Window) -> Option<Range<usize>> {
        let idx = self.escapes.partition_point(|e| e.start < window.from);
        self.escapes
            .get(idx)
            .filter(|e| e.end <= window.end)
            .cloned()
    }

    /// Whether `token` sits unmasked at `pos` and fits in the window.
    pub fn delimiter_at(&self, window: Window, pos: usize, token: &str) -> bool {
        pos + token.len() <= window.end
            && self.text.as_bytes()[pos..].starts_with(token.as_bytes())
            && !self.any_masked(pos..pos + token.len())
    }

    /// The character ending at `pos`, if it lies inside the window.
    pub fn char_before(&self, window: Window, pos: usize) -> Option<char> {
        if pos <= window.start {
            return None;
        }
        self.text[window.start..pos].chars().next_back()
    }

    /// The character starting at `pos`, if it lies inside the window.
    pub fn char_at(&self, window: Window, pos: usize) -> Option<char> {
        if pos >= window.end {
            return None;
        }
        self.text[pos..window.end].chars().next()
    }

    /// Whether `pos` begins a line: the window start or right after `\n`.
    pub fn is_line_start(&self, window: Window, pos: usize) -> bool {
        pos == window.start || self.text.as_bytes().get(pos.wrapping_sub(1)) == Some(&b'\n')
    }

    /// End of the line containing `pos`, clamped to the window.
    pub fn line_end(&self, window: Window, pos: usize) -> usize {
        self.text[pos..window.end]
            .find('\n')
            .map(|i| pos + i)
            .unwrap_or(window.end)
    }

    /// Next line start at or after `pos`, inside the window.
    pub fn next_line_start(&self, window: Window, pos: usize) -> Option<usize> {
        if self.is_line_start(window, pos) {
            return Some(pos);
        }
        let eol = self.line_end(window, pos);
        (eol < window.end).then_some(eol + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_mask() {
        let scan = Scan::new(r"a \*b\* c");
        assert!(!scan.is_masked(0));
        assert!(scan.is_masked(2));
        assert!(scan.is_masked(3));
        assert!(!scan.is_masked(4));
        assert_eq!(scan.escapes(), &[2..4, 5..7]);
    }

    #[test]
    fn test_escaped_backslash() {
        // `\\` consumes both backslashes, the star stays live
        let scan = Scan::new(r"\\*");
        assert_eq!(scan.escapes(), &[0..2]);
        assert!(!scan.is_masked(2));
    }

    #[test]
    fn test_escape_pictographic() {
        let scan = Scan::new("\\🔥");
        assert_eq!(scan.escapes(), &[0..5]);
    }

    #[test]
    fn test_plain_backslash_not_escape() {
        let scan = Scan::new(r"\n\a");
        assert!(scan.escapes().is_empty());
    }

    #[test]
    fn test_delimiter_at() {
        let scan = Scan::new(r"**a\**");
        let w = Window::new(0..scan.len());
        assert!(scan.delimiter_at(w, 0, "**"));
        assert!(!scan.delimiter_at(w, 3, "**"));
        assert!(!scan.delimiter_at(w, 4, "**"));
        assert!(!scan.delimiter_at(Window::new(0..1), 0, "**"));
    }

    #[test]
    fn test_char_context_is_window_relative() {
        let scan = Scan::new("x*y");
        let w = Window::new(1..3);
        assert_eq!(scan.char_before(w, 1), None);
        assert_eq!(scan.char_before(w, 2), Some('*'));
        assert_eq!(scan.char_at(w, 2), Some('y'));
        assert_eq!(scan.char_at(w, 3), None);
    }

    #[test]
    fn test_lines() {
        let scan = Scan::new("ab\ncd");
        let w = Window::new(0..scan.len());
        assert!(scan.is_line_start(w, 0));
        assert!(!scan.is_line_start(w, 1));
        assert!(scan.is_line_start(w, 3));
        assert_eq!(scan.line_end(w, 0), 2);
        assert_eq!(scan.line_end(w, 3), 5);
        assert_eq!(scan.next_line_start(w, 1), Some(3));
        assert_eq!(scan.next_line_start(w, 4), None);
    }

    #[test]
    fn test_next_escape_respects_window() {
        let scan = Scan::new(r"\* a \_");
        let w = Window::new(0..scan.len());
        assert_eq!(scan.next_escape(w), Some(0..2));
        assert_eq!(scan.next_escape(w.starting_at(1)), Some(5..7));
        assert_eq!(scan.next_escape(Window::new(0..6).starting_at(1)), None);
    }
}
