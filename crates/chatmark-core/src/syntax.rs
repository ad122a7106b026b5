//! Syntax marker tracking for conditional visibility.
//!
//! Every delimiter the decorator highlights as `mds` is also reported as a
//! [`SyntaxSpanInfo`], so the host can hide markers while the cursor is
//! outside the construct they belong to.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};

use crate::markup::Markup;

/// Classification of syntax markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxType {
    /// Inline formatting: `**`, `*`, `~~`, `` ` ``, `[`, `](`, `<color:..>`, `\`
    Inline,
    /// Line or block formatting: `#`, `-#`, `>`, `-`, ```` ``` ````
    Block,
}

impl SyntaxType {
    pub fn of(markup: Markup) -> Self {
        if markup.is_block() {
            SyntaxType::Block
        } else {
            SyntaxType::Inline
        }
    }
}

/// A syntax marker and the construct it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxSpanInfo {
    /// Identifier unique within one decoration pass (`s0`, `s1`, ...)
    pub syn_id: SmolStr,
    /// Char range of this marker only.
    pub char_range: Range<usize>,
    pub syntax_type: SyntaxType,
    /// Rule the marker belongs to.
    pub kind: Markup,
    /// Char range of the whole construct, markers and content. When the
    /// cursor is anywhere in here, the marker is visible.
    pub formatted_range: Option<Range<usize>>,
}

impl SyntaxSpanInfo {
    /// Whether the cursor makes this marker visible.
    ///
    /// Uses `formatted_range` when present, otherwise the marker itself.
    /// Both ends are inclusive so a cursor right after `**bold**` still shows
    /// the markers.
    pub fn cursor_in_range(&self, cursor_pos: usize) -> bool {
        let range = self.formatted_range.as_ref().unwrap_or(&self.char_range);
        cursor_pos >= range.start && cursor_pos <= range.end
    }
}

pub fn make_syntax_id(index: usize) -> SmolStr {
    format_smolstr!("s{}", index)
}

/// Markers that should be shown for a cursor at `cursor_pos`.
pub fn visible_syntax(
    spans: &[SyntaxSpanInfo],
    cursor_pos: usize,
) -> impl Iterator<Item = &SyntaxSpanInfo> {
    spans.iter().filter(move |s| s.cursor_in_range(cursor_pos))
}

#[cfg(test)]
mod tests {
    use smol_str::ToSmolStr;

    use super::*;

    #[test]
    fn test_syntax_type_of() {
        assert_eq!(SyntaxType::of(Markup::Header), SyntaxType::Block);
        assert_eq!(SyntaxType::of(Markup::CodeBlock), SyntaxType::Block);
        assert_eq!(SyntaxType::of(Markup::ListItem), SyntaxType::Block);
        assert_eq!(SyntaxType::of(Markup::Bold), SyntaxType::Inline);
        assert_eq!(SyntaxType::of(Markup::Link), SyntaxType::Inline);
        assert_eq!(SyntaxType::of(Markup::Escape), SyntaxType::Inline);
    }

    #[test]
    fn test_cursor_in_range() {
        let span = SyntaxSpanInfo {
            syn_id: "s0".to_smolstr(),
            char_range: 0..2,
            syntax_type: SyntaxType::Inline,
            kind: Markup::Bold,
            formatted_range: Some(0..10),
        };
        assert!(span.cursor_in_range(0));
        assert!(span.cursor_in_range(5));
        assert!(span.cursor_in_range(10));
        assert!(!span.cursor_in_range(11));

        let span = SyntaxSpanInfo {
            syn_id: "s1".to_smolstr(),
            char_range: 0..2,
            syntax_type: SyntaxType::Block,
            kind: Markup::Header,
            formatted_range: None,
        };
        assert!(span.cursor_in_range(2));
        assert!(!span.cursor_in_range(3));
    }

    #[test]
    fn test_visible_syntax() {
        let spans = vec![
            SyntaxSpanInfo {
                syn_id: make_syntax_id(0),
                char_range: 0..2,
                syntax_type: SyntaxType::Inline,
                kind: Markup::Bold,
                formatted_range: Some(0..7),
            },
            SyntaxSpanInfo {
                syn_id: make_syntax_id(1),
                char_range: 10..11,
                syntax_type: SyntaxType::Inline,
                kind: Markup::Italic,
                formatted_range: Some(10..14),
            },
        ];
        let ids: Vec<_> = visible_syntax(&spans, 12).map(|s| s.syn_id.as_str()).collect();
        assert_eq!(ids, vec!["s1"]);
        assert_eq!(visible_syntax(&spans, 8).count(), 0);
    }
}
