//! Live decoration of a composer buffer.
//!
//! Every rule scans the whole buffer on its own, so ranges from different
//! rules may overlap; they are additive style bits. Offsets are chars into
//! the buffer formed by joining the editor's blocks with `\n`.

use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::blocks::{BlockSpan, join_blocks};
use crate::markup::{Attributes, Markup};
use crate::render_cache::DecorationCache;
use crate::rules::{Mode, RawRange, RuleTable};
use crate::scan::{Scan, Window};
use crate::syntax::{SyntaxSpanInfo, SyntaxType, make_syntax_id};
use crate::text::{CharOffsets, SourceText};

/// A highlighted span, half-open `[anchor, focus)` in chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecorationRange {
    pub anchor: usize,
    pub focus: usize,
    #[serde(rename = "type")]
    pub kind: Markup,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl DecorationRange {
    pub fn new(range: Range<usize>, kind: Markup) -> Self {
        Self {
            anchor: range.start,
            focus: range.end,
            kind,
            attributes: Attributes::new(),
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.anchor..self.focus
    }

    pub fn len(&self) -> usize {
        self.focus - self.anchor
    }

    pub fn is_empty(&self) -> bool {
        self.anchor >= self.focus
    }
}

/// Ranges plus the syntax markers among them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoration {
    pub ranges: Vec<DecorationRange>,
    pub syntax_spans: Vec<SyntaxSpanInfo>,
}

/// Highlight ranges for a buffer.
pub fn decorate(buffer: &str) -> Vec<DecorationRange> {
    decorate_full(buffer).ranges
}

/// Highlight ranges and syntax spans for a buffer.
pub fn decorate_full(buffer: &str) -> Decoration {
    decorate_with(RuleTable::standard(), buffer)
}

pub fn decorate_with(table: &RuleTable, buffer: &str) -> Decoration {
    let scan = Scan::new(buffer);
    let source = SourceText::new(buffer);
    let window = Window::new(0..buffer.len());
    let mut decoration = Decoration::default();
    let mut raw = Vec::new();

    for rule in table.iter() {
        let mut from = 0;
        while let Some(m) = rule.try_match(&scan, window.starting_at(from), Mode::Decorate) {
            if m.span.end <= from || m.span.start < from {
                break;
            }
            raw.clear();
            rule.decorate(&scan, &m, &mut raw);

            let formatted = source.byte_range_to_chars(m.span.clone());
            for marker in &m.markers {
                decoration.syntax_spans.push(SyntaxSpanInfo {
                    syn_id: make_syntax_id(decoration.syntax_spans.len()),
                    char_range: source.byte_range_to_chars(marker.clone()),
                    syntax_type: SyntaxType::of(rule.markup()),
                    kind: rule.markup(),
                    formatted_range: Some(formatted.clone()),
                });
            }
            decoration
                .ranges
                .extend(raw.drain(..).map(|r| to_chars(&source, r)));
            from = m.span.end;
        }
    }

    if tracing::enabled!(target: "chatmark::decorate", tracing::Level::TRACE) {
        tracing::trace!(
            target: "chatmark::decorate",
            buffer_len = buffer.len(),
            ranges = decoration.ranges.len(),
            syntax_spans = decoration.syntax_spans.len(),
            "decorated buffer"
        );
    }
    decoration
}

fn to_chars(source: &SourceText, raw: RawRange) -> DecorationRange {
    DecorationRange {
        anchor: source.byte_to_char(raw.bytes.start),
        focus: source.byte_to_char(raw.bytes.end),
        kind: raw.kind,
        attributes: raw.attributes,
    }
}

/// One decoration pass over the host document, frozen.
///
/// The offset mapper checks leaves against this snapshot's blocks, so a
/// document edited after capture never receives ranges computed for the old
/// text.
#[derive(Debug, Clone)]
pub struct DecorationSnapshot {
    pub generation: u64,
    pub text: String,
    pub blocks: Vec<BlockSpan>,
    pub decoration: Arc<Decoration>,
}

impl DecorationSnapshot {
    /// Join `blocks` and decorate them.
    pub fn capture<S: AsRef<str>>(generation: u64, blocks: &[S]) -> Self {
        let (text, spans) = join_blocks(blocks);
        let decoration = Arc::new(decorate_full(&text));
        Self {
            generation,
            text,
            blocks: spans,
            decoration,
        }
    }

    /// Like [`capture`](Self::capture), reusing a cached decoration when the
    /// joined text was seen before.
    pub fn capture_cached<S: AsRef<str>>(
        generation: u64,
        blocks: &[S],
        cache: &mut DecorationCache,
    ) -> Self {
        let (text, spans) = join_blocks(blocks);
        let decoration = cache.get_or_decorate(&text);
        Self {
            generation,
            text,
            blocks: spans,
            decoration,
        }
    }

    pub fn ranges(&self) -> &[DecorationRange] {
        &self.decoration.ranges
    }

    pub fn syntax_spans(&self) -> &[SyntaxSpanInfo] {
        &self.decoration.syntax_spans
    }

    pub fn block(&self, index: usize) -> Option<&BlockSpan> {
        self.blocks.get(index)
    }

    pub fn len_chars(&self) -> usize {
        self.blocks.last().map(|b| b.char_range.end).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(ranges: &[DecorationRange]) -> Vec<(Range<usize>, Markup)> {
        ranges.iter().map(|r| (r.range(), r.kind)).collect()
    }

    #[test]
    fn test_bold_ranges() {
        assert_eq!(
            kinds(&decorate("a **b** c")),
            vec![
                (2..4, Markup::Syntax),
                (5..7, Markup::Syntax),
                (4..5, Markup::Bold),
            ]
        );
    }

    #[test]
    fn test_consecutive_runs_of_one_type() {
        assert_eq!(
            kinds(&decorate("**a** **b**")),
            vec![
                (0..2, Markup::Syntax),
                (3..5, Markup::Syntax),
                (2..3, Markup::Bold),
                (6..8, Markup::Syntax),
                (9..11, Markup::Syntax),
                (8..9, Markup::Bold),
            ]
        );
        let ranges = decorate("`x` ||s||");
        assert!(ranges.iter().any(|r| r.kind == Markup::Code && r.range() == (1..2)));
        assert!(ranges.iter().any(|r| r.kind == Markup::Spoiler && r.range() == (6..7)));
    }

    #[test]
    fn test_offsets_are_chars() {
        let ranges = decorate("🔥 *x*");
        assert_eq!(
            kinds(&ranges),
            vec![
                (2..3, Markup::Syntax),
                (4..5, Markup::Syntax),
                (3..4, Markup::Italic),
                (0..1, Markup::Emoji),
            ]
        );
    }

    #[test]
    fn test_escaped_bold_has_no_bold() {
        let ranges = decorate(r"\*\*bold\*\*");
        assert!(ranges.iter().all(|r| r.kind == Markup::Syntax));
        assert_eq!(ranges.len(), 4);
    }

    #[test]
    fn test_header_carries_size() {
        let ranges = decorate("### hi");
        assert_eq!(ranges[0].range(), 0..3);
        assert_eq!(ranges[0].kind, Markup::Syntax);
        assert_eq!(ranges[1].range(), 0..6);
        assert_eq!(ranges[1].kind, Markup::Header);
        assert_eq!(ranges[1].attributes.get("size"), Some("3"));
    }

    #[test]
    fn test_unterminated_fence_runs_to_end() {
        let ranges = decorate("x\n```rs\nfn main");
        let block = ranges.iter().find(|r| r.kind == Markup::CodeBlock).unwrap();
        assert_eq!(block.range(), 8..15);
        assert!(ranges.iter().any(|r| r.kind == Markup::Syntax && r.range() == (2..7)));
    }

    #[test]
    fn test_invalid_color_has_no_ranges() {
        assert!(decorate("<color:bogus>text</color>").is_empty());
        let ranges = decorate("<c:red>x</c>");
        assert_eq!(
            kinds(&ranges),
            vec![
                (0..7, Markup::Syntax),
                (8..12, Markup::Syntax),
                (7..8, Markup::Color),
            ]
        );
        assert_eq!(ranges[2].attributes.get("hex"), Some("red"));
    }

    #[test]
    fn test_mentions_carry_id() {
        let ranges = decorate("<@42> @here");
        assert_eq!(
            kinds(&ranges),
            vec![(6..11, Markup::MentionEveryone), (0..5, Markup::MentionUser)]
        );
        assert_eq!(ranges[1].attributes.get("id"), Some("42"));
    }

    #[test]
    fn test_bracket_link() {
        let ranges = decorate("[x](https://a.b)");
        assert_eq!(
            kinds(&ranges),
            vec![
                (0..1, Markup::Syntax),
                (2..4, Markup::Syntax),
                (15..16, Markup::Syntax),
                (4..15, Markup::Link),
            ]
        );
        assert_eq!(ranges[3].attributes.get("link"), Some("https://a.b"));
    }

    #[test]
    fn test_big_emoji() {
        let ranges = decorate("🔥🔥");
        assert!(ranges.iter().any(|r| r.kind == Markup::BigEmoji && r.range() == (0..2)));
        assert_eq!(ranges.iter().filter(|r| r.kind == Markup::Emoji).count(), 2);
    }

    #[test]
    fn test_syntax_spans_follow_markers() {
        let decoration = decorate_full("**b**");
        assert_eq!(decoration.syntax_spans.len(), 2);
        assert_eq!(decoration.syntax_spans[0].char_range, 0..2);
        assert_eq!(decoration.syntax_spans[1].char_range, 3..5);
        assert_eq!(decoration.syntax_spans[1].formatted_range, Some(0..5));
        assert_eq!(decoration.syntax_spans[1].syn_id, "s1");
    }

    #[test]
    fn test_ranges_in_bounds() {
        for buffer in ["", "*", "**", "```", "<c:red>", "\\", "# ", "> x\n> y"] {
            let len = buffer.chars().count();
            for r in decorate(buffer) {
                assert!(r.anchor <= r.focus && r.focus <= len, "{buffer:?}: {r:?}");
            }
        }
    }

    #[test]
    fn test_snapshot_capture() {
        let snap = DecorationSnapshot::capture(3, &["**a**", "b"]);
        assert_eq!(snap.generation, 3);
        assert_eq!(snap.text, "**a**\nb");
        assert_eq!(snap.blocks.len(), 2);
        assert_eq!(snap.len_chars(), 7);
        assert!(snap.ranges().iter().any(|r| r.kind == Markup::Bold));
    }

    #[test]
    fn test_range_json_shape() {
        let ranges = decorate("## a");
        let json = serde_json::to_value(&ranges[1]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"anchor": 0, "focus": 4, "type": "header", "attributes": {"size": "2"}})
        );
    }
}
