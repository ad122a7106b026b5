//! Inline emoji and the all-emoji ("big emoji") message.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use smol_str::ToSmolStr;

use super::{Mode, Payload, RawRange, Rule, RuleMatch};
use crate::markup::{Attributes, Markup};
use crate::render::{EmojiRef, EmojiSize, RenderContext, RenderNode, ResolvedRef};
use crate::scan::{Scan, Window};

/// One emoji glyph: a pictographic char with an optional presentation
/// selector or skin tone, joined into ZWJ sequences.
pub static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\p{Extended_Pictographic}(?:\x{FE0F}|\p{Emoji_Modifier})?",
        r"(?:\x{200D}\p{Extended_Pictographic}(?:\x{FE0F}|\p{Emoji_Modifier})?)*",
    ))
    .unwrap()
});

/// Most glyphs a message may hold and still render big.
pub const BIG_EMOJI_LIMIT: usize = 64;

fn emoji_node(scan: &Scan<'_>, glyph: Range<usize>, size: EmojiSize, cx: &RenderContext<'_>) -> RenderNode {
    RenderNode::Void {
        kind: Markup::Emoji,
        reference: ResolvedRef::Emoji(EmojiRef {
            glyph: scan.slice(glyph).to_smolstr(),
            size,
            style: cx.options.emoji_style,
        }),
    }
}

/// A message made of nothing but 1 to 64 emoji (surrounding whitespace
/// allowed).
pub struct BigEmojiRule;

impl Rule for BigEmojiRule {
    fn markup(&self) -> Markup {
        Markup::BigEmoji
    }

    fn try_match(&self, scan: &Scan<'_>, window: Window, _mode: Mode) -> Option<RuleMatch> {
        let text = scan.text();
        let start = text.len() - text.trim_start().len();
        let end = text.trim_end().len();
        // only ever the whole message
        if start >= end || window.from > start || window.start > start || window.end < end {
            return None;
        }

        let mut glyphs = Vec::new();
        let mut pos = start;
        while pos < end {
            let m = EMOJI.find_at(&text[..end], pos)?;
            if m.start() != pos || scan.is_masked(pos) || glyphs.len() == BIG_EMOJI_LIMIT {
                return None;
            }
            glyphs.push(m.range());
            pos = m.end();
        }

        Some(RuleMatch::new(window.from..window.end, start..end).payload(Payload::Glyphs(glyphs)))
    }

    fn parse_inner(&self, _m: &RuleMatch) -> bool {
        false
    }

    fn decorate(&self, _scan: &Scan<'_>, m: &RuleMatch, out: &mut Vec<RawRange>) {
        out.push(RawRange::new(m.inner.clone(), Markup::BigEmoji));
    }

    fn render(
        &self,
        scan: &Scan<'_>,
        m: &RuleMatch,
        _children: Vec<RenderNode>,
        cx: &RenderContext<'_>,
        out: &mut Vec<RenderNode>,
    ) {
        let Payload::Glyphs(glyphs) = &m.payload else {
            return;
        };
        if cx.options.no_big_emoji {
            out.extend(
                glyphs
                    .iter()
                    .map(|g| emoji_node(scan, g.clone(), EmojiSize::Inline, cx)),
            );
            return;
        }
        let children = glyphs
            .iter()
            .map(|g| emoji_node(scan, g.clone(), EmojiSize::Big, cx))
            .collect();
        out.push(RenderNode::styled(Markup::BigEmoji, Attributes::new(), children));
    }
}

/// A single emoji glyph anywhere in text.
pub struct EmojiRule;

impl Rule for EmojiRule {
    fn markup(&self) -> Markup {
        Markup::Emoji
    }

    fn try_match(&self, scan: &Scan<'_>, window: Window, _mode: Mode) -> Option<RuleMatch> {
        let text = &scan.text()[..window.end];
        let mut pos = window.from;
        while pos < window.end {
            let m = EMOJI.find_at(text, pos)?;
            if !scan.is_masked(m.start()) {
                return Some(RuleMatch::new(m.range(), m.range()));
            }
            pos = m.end();
        }
        None
    }

    fn parse_inner(&self, _m: &RuleMatch) -> bool {
        false
    }

    fn decorate(&self, _scan: &Scan<'_>, m: &RuleMatch, out: &mut Vec<RawRange>) {
        out.push(RawRange::new(m.span.clone(), Markup::Emoji));
    }

    fn render(
        &self,
        scan: &Scan<'_>,
        m: &RuleMatch,
        _children: Vec<RenderNode>,
        cx: &RenderContext<'_>,
        out: &mut Vec<RenderNode>,
    ) {
        out.push(emoji_node(scan, m.span.clone(), EmojiSize::Inline, cx));
    }
}
