//! Leaf segmentation.
//!
//! Overlapping [`LeafRange`]s are flattened into consecutive runs that each
//! carry one uniform set of marks, which is what a host needs to emit one
//! styled span per run.

use std::ops::Range;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::markup::Markup;
use crate::offset_map::LeafRange;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
    pub struct MarkSet: u32 {
        const SYNTAX = 1 << 0;
        const BOLD = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const STRIKETHROUGH = 1 << 4;
        const SPOILER = 1 << 5;
        const CODE = 1 << 6;
        const CODE_BLOCK = 1 << 7;
        const HEADER = 1 << 8;
        const SUBHEADER = 1 << 9;
        const QUOTE = 1 << 10;
        const LIST = 1 << 11;
        const COLOR = 1 << 12;
        const LINK = 1 << 13;
        const MENTION = 1 << 14;
        const EMOJI = 1 << 15;
        const BIG_EMOJI = 1 << 16;
        const ESCAPE = 1 << 17;
    }
}

const CLASSES: &[(MarkSet, &str)] = &[
    (MarkSet::SYNTAX, "mds"),
    (MarkSet::BOLD, "bold"),
    (MarkSet::ITALIC, "italic"),
    (MarkSet::UNDERLINE, "underline"),
    (MarkSet::STRIKETHROUGH, "strikethrough"),
    (MarkSet::SPOILER, "spoiler"),
    (MarkSet::CODE, "code"),
    (MarkSet::CODE_BLOCK, "multicode"),
    (MarkSet::HEADER, "header"),
    (MarkSet::SUBHEADER, "subheader"),
    (MarkSet::QUOTE, "quote"),
    (MarkSet::LIST, "list"),
    (MarkSet::COLOR, "color"),
    (MarkSet::LINK, "link"),
    (MarkSet::MENTION, "mention"),
    (MarkSet::EMOJI, "emoji"),
    (MarkSet::BIG_EMOJI, "big_emoji"),
    (MarkSet::ESCAPE, "escape"),
];

impl MarkSet {
    pub fn of(markup: Markup) -> Self {
        match markup {
            Markup::Syntax => Self::SYNTAX,
            Markup::Escape => Self::ESCAPE,
            Markup::Bold => Self::BOLD,
            Markup::Italic => Self::ITALIC,
            Markup::BoldItalic => Self::BOLD | Self::ITALIC,
            Markup::Underline => Self::UNDERLINE,
            Markup::Strikethrough => Self::STRIKETHROUGH,
            Markup::Spoiler => Self::SPOILER,
            Markup::Code => Self::CODE,
            Markup::CodeBlock => Self::CODE_BLOCK,
            Markup::Header => Self::HEADER,
            Markup::Subheader => Self::SUBHEADER,
            Markup::Quote => Self::QUOTE,
            Markup::ListItem => Self::LIST,
            Markup::Color => Self::COLOR,
            Markup::Link => Self::LINK,
            Markup::MentionEveryone
            | Markup::MentionUser
            | Markup::MentionRole
            | Markup::MentionChannel
            | Markup::MentionServer => Self::MENTION,
            Markup::BigEmoji => Self::BIG_EMOJI,
            Markup::Emoji => Self::EMOJI,
        }
    }

    /// Class names for the set marks, in a fixed order.
    pub fn class_names(self) -> impl Iterator<Item = &'static str> {
        CLASSES
            .iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
    }
}

/// A run of a leaf with uniform styling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafSegment {
    pub range: Range<usize>,
    pub marks: MarkSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_size: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<SmolStr>,
}

impl LeafSegment {
    fn same_style(&self, other: &LeafSegment) -> bool {
        self.marks == other.marks
            && self.header_size == other.header_size
            && self.color == other.color
            && self.link == other.link
    }
}

/// Split a leaf of `len` chars into uniformly styled runs.
///
/// The runs cover `0..len` exactly, in order; unstyled stretches get an
/// empty [`MarkSet`]. Adjacent runs never share the same style.
pub fn segment_leaf(len: usize, ranges: &[LeafRange]) -> Vec<LeafSegment> {
    if len == 0 {
        return Vec::new();
    }

    let mut cuts = Vec::with_capacity(ranges.len() * 2 + 2);
    cuts.push(0);
    cuts.push(len);
    for r in ranges {
        cuts.push(r.anchor.min(len));
        cuts.push(r.focus.min(len));
    }
    cuts.sort_unstable();
    cuts.dedup();

    let mut segments: Vec<LeafSegment> = Vec::with_capacity(cuts.len());
    for pair in cuts.windows(2) {
        let range = pair[0]..pair[1];
        let mut segment = LeafSegment {
            range: range.clone(),
            marks: MarkSet::empty(),
            header_size: None,
            color: None,
            link: None,
        };
        for r in ranges
            .iter()
            .filter(|r| r.anchor <= range.start && r.focus >= range.end)
        {
            segment.marks |= MarkSet::of(r.kind);
            match r.kind {
                Markup::Header => {
                    segment.header_size = r.attributes.get("size").and_then(|s| s.parse().ok());
                }
                Markup::Color => segment.color = r.attributes.get("hex").map(SmolStr::new),
                Markup::Link => segment.link = r.attributes.get("link").map(SmolStr::new),
                _ => {}
            }
        }

        match segments.last_mut() {
            Some(prev) if prev.same_style(&segment) => prev.range.end = segment.range.end,
            _ => segments.push(segment),
        }
    }
    segments
}
