//! The rule table: one ordered registry driving both the decorator and the
//! renderer.
//!
//! A [`Rule`] finds its earliest match in a [`Window`] and knows how to turn
//! that match into decoration ranges and into render nodes. Rules are
//! stateless; everything a matcher needs comes from the [`Scan`].

use std::ops::Range;
use std::sync::LazyLock;

use smol_str::SmolStr;

use crate::markup::{Attributes, Markup, MentionToken};
use crate::render::{RenderContext, RenderNode};
use crate::scan::{Scan, Window};

mod block;
mod emoji;
mod inline;
mod mention;
mod paired;

pub use emoji::EMOJI;

/// Which consumer a match is for.
///
/// The grammar is shared; the only behavioral difference is that the
/// decorator highlights an unterminated fence up to the end of the buffer,
/// while the renderer treats it as literal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Decorate,
    Render,
}

/// Rule-specific data captured while matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    None,
    /// Header level, 1 to 6.
    Level(u8),
    /// Color token as written in the tag.
    Color(SmolStr),
    Link { url: Range<usize>, bracketed: bool },
    Mention(MentionToken),
    Fence { lang: Option<SmolStr>, closed: bool },
    /// Byte ranges of each emoji glyph in a big-emoji run.
    Glyphs(Vec<Range<usize>>),
}

/// One match of one rule, in source byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    /// Everything the match consumes.
    pub span: Range<usize>,
    /// Delimiter tokens, highlighted as syntax.
    pub markers: Vec<Range<usize>>,
    /// The content window handed to the child parse.
    pub inner: Range<usize>,
    pub payload: Payload,
}

impl RuleMatch {
    pub fn new(span: Range<usize>, inner: Range<usize>) -> Self {
        Self {
            span,
            markers: Vec::new(),
            inner,
            payload: Payload::None,
        }
    }

    pub fn marker(mut self, range: Range<usize>) -> Self {
        if !range.is_empty() {
            self.markers.push(range);
        }
        self
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }
}

/// A decoration range before char conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRange {
    pub bytes: Range<usize>,
    pub kind: Markup,
    pub attributes: Attributes,
}

impl RawRange {
    pub fn new(bytes: Range<usize>, kind: Markup) -> Self {
        Self {
            bytes,
            kind,
            attributes: Attributes::new(),
        }
    }

    pub fn syntax(bytes: Range<usize>) -> Self {
        Self::new(bytes, Markup::Syntax)
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// A markup rule.
pub trait Rule: Send + Sync {
    /// Semantic name of the construct this rule produces.
    fn markup(&self) -> Markup;

    /// Earliest match starting at or after `window.from`, within the window.
    fn try_match(&self, scan: &Scan<'_>, window: Window, mode: Mode) -> Option<RuleMatch>;

    /// Whether the match's inner content is parsed for nested markup.
    fn parse_inner(&self, _m: &RuleMatch) -> bool {
        true
    }

    /// Attributes carried by the content range and the styled node.
    fn attributes(&self, _scan: &Scan<'_>, _m: &RuleMatch) -> Attributes {
        Attributes::new()
    }

    /// Decoration ranges for one match: syntax over each marker, the rule's
    /// own type over the inner content.
    fn decorate(&self, scan: &Scan<'_>, m: &RuleMatch, out: &mut Vec<RawRange>) {
        out.extend(m.markers.iter().cloned().map(RawRange::syntax));
        if !m.inner.is_empty() {
            out.push(
                RawRange::new(m.inner.clone(), self.markup())
                    .with_attributes(self.attributes(scan, m)),
            );
        }
    }

    /// Render nodes for one match, given its already-rendered children.
    fn render(
        &self,
        scan: &Scan<'_>,
        m: &RuleMatch,
        children: Vec<RenderNode>,
        _cx: &RenderContext<'_>,
        out: &mut Vec<RenderNode>,
    ) {
        out.push(RenderNode::styled(
            self.markup(),
            self.attributes(scan, m),
            children,
        ));
    }
}

/// Ordered rule registry. Earlier rules win ties on the same start offset.
pub struct RuleTable {
    rules: Vec<Box<dyn Rule>>,
}

static STANDARD: LazyLock<RuleTable> = LazyLock::new(RuleTable::build_standard);

impl RuleTable {
    /// The shared, immutable standard table.
    pub fn standard() -> &'static RuleTable {
        &STANDARD
    }

    /// A table from custom rules, in priority order.
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// The standard rules minus the named ones.
    pub fn standard_without(excluded: &[Markup]) -> RuleTable {
        let mut table = Self::build_standard();
        table.rules.retain(|rule| !excluded.contains(&rule.markup()));
        table
    }

    fn build_standard() -> RuleTable {
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(inline::EscapeRule),
            Box::new(block::FenceRule),
            Box::new(paired::PairedRule::CODE),
            Box::new(paired::PairedRule::BOLD_ITALIC),
            Box::new(paired::PairedRule::BOLD),
            Box::new(paired::PairedRule::UNDERLINE),
            Box::new(paired::PairedRule::ITALIC),
            Box::new(paired::PairedRule::STRIKETHROUGH),
            Box::new(paired::PairedRule::SPOILER),
            Box::new(block::LineRule::HEADER),
            Box::new(block::LineRule::SUBHEADER),
            Box::new(block::LineRule::QUOTE),
            Box::new(block::LineRule::LIST),
            Box::new(inline::ColorRule),
            Box::new(inline::LinkRule),
            Box::new(mention::EveryoneRule),
            Box::new(mention::MentionRule::USER),
            Box::new(mention::MentionRule::ROLE),
            Box::new(mention::MentionRule::CHANNEL),
            Box::new(mention::MentionRule::SERVER),
            Box::new(emoji::BigEmojiRule),
            Box::new(emoji::EmojiRule),
        ];
        RuleTable { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule(&self, index: usize) -> &dyn Rule {
        self.rules[index].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Rule names in priority order.
    pub fn names(&self) -> Vec<Markup> {
        self.iter().map(|r| r.markup()).collect()
    }
}

/// Earliest-match search over one window, reused as the search start
/// advances.
///
/// A rule's earliest match from `from` is still its earliest match from any
/// later `from` up to that match's start, so each rule's last answer is kept
/// until the cursor passes it. A rule that found nothing never finds anything
/// later in the same window.
pub struct MatchCursor<'r, 's, 't> {
    table: &'r RuleTable,
    scan: &'s Scan<'t>,
    window: Window,
    mode: Mode,
    pending: Vec<Option<Option<RuleMatch>>>,
}

impl<'r, 's, 't> MatchCursor<'r, 's, 't> {
    pub fn new(table: &'r RuleTable, scan: &'s Scan<'t>, window: Window, mode: Mode) -> Self {
        Self {
            table,
            scan,
            window,
            mode,
            pending: vec![None; table.len()],
        }
    }

    /// Earliest match at or after `from`, ties broken by table order.
    pub fn next_from(&mut self, from: usize) -> Option<(usize, RuleMatch)> {
        let window = self.window.starting_at(from);
        // (rule index, match start)
        let mut best: Option<(usize, usize)> = None;
        for idx in 0..self.table.len() {
            let stale = match &self.pending[idx] {
                None => true,
                Some(Some(m)) => m.span.start < window.from,
                Some(None) => false,
            };
            if stale {
                let found = self
                    .table
                    .rule(idx)
                    .try_match(self.scan, window, self.mode)
                    .filter(|m| m.span.start >= window.from && m.span.end > m.span.start);
                self.pending[idx] = Some(found);
            }
            if let Some(Some(m)) = &self.pending[idx] {
                if best.is_none_or(|(_, start)| m.span.start < start) {
                    best = Some((idx, m.span.start));
                }
            }
        }
        let (idx, _) = best?;
        let m = self.pending[idx].clone().flatten()?;
        Some((idx, m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_order() {
        let names = RuleTable::standard().names();
        assert_eq!(
            names,
            vec![
                Markup::Escape,
                Markup::CodeBlock,
                Markup::Code,
                Markup::BoldItalic,
                Markup::Bold,
                Markup::Underline,
                Markup::Italic,
                Markup::Strikethrough,
                Markup::Spoiler,
                Markup::Header,
                Markup::Subheader,
                Markup::Quote,
                Markup::ListItem,
                Markup::Color,
                Markup::Link,
                Markup::MentionEveryone,
                Markup::MentionUser,
                Markup::MentionRole,
                Markup::MentionChannel,
                Markup::MentionServer,
                Markup::BigEmoji,
                Markup::Emoji,
            ]
        );
    }

    #[test]
    fn test_standard_without() {
        let table = RuleTable::standard_without(&[Markup::BigEmoji, Markup::Emoji]);
        assert_eq!(table.len(), RuleTable::standard().len() - 2);
        assert!(!table.names().contains(&Markup::Emoji));
    }

    #[test]
    fn test_cursor_prefers_earliest_start() {
        let scan = Scan::new("a *b* **c**");
        let table = RuleTable::standard();
        let mut cursor = MatchCursor::new(table, &scan, Window::new(0..scan.len()), Mode::Render);
        let (idx, m) = cursor.next_from(0).unwrap();
        assert_eq!(table.rule(idx).markup(), Markup::Italic);
        assert_eq!(m.span, 2..5);
        let (idx, m) = cursor.next_from(5).unwrap();
        assert_eq!(table.rule(idx).markup(), Markup::Bold);
        assert_eq!(m.span, 6..11);
        assert!(cursor.next_from(11).is_none());
    }

    #[test]
    fn test_cursor_ties_go_to_table_order() {
        // bold_italic is listed before bold
        let scan = Scan::new("***x***");
        let table = RuleTable::standard();
        let mut cursor = MatchCursor::new(table, &scan, Window::new(0..scan.len()), Mode::Render);
        let (idx, m) = cursor.next_from(0).unwrap();
        assert_eq!(table.rule(idx).markup(), Markup::BoldItalic);
        assert_eq!(m.span, 0..7);
    }
}
