//! Paired inline delimiters: `**bold**`, `*italic*`, `__underline__`, ...
//!
//! Hand-written scanners rather than regexes, so that adjacency ("not
//! preceded by another `*`") is checked against the escape mask and the
//! window instead of by lookbehind, and so that a failed closer search ends
//! the scan instead of being retried from every later opener.

use super::{Mode, RawRange, Rule, RuleMatch};
use crate::markup::{Attributes, Markup};
use crate::render::{RenderContext, RenderNode};
use crate::scan::{Scan, Window};

/// One spelling of a paired delimiter.
#[derive(Debug, Clone, Copy)]
pub struct Delimiter {
    pub token: &'static str,
    /// Opener may not follow, closer may not precede, an alphanumeric char.
    pub word_bounded: bool,
    /// Content may not start or end with whitespace.
    pub flanking: bool,
}

impl Delimiter {
    const fn plain(token: &'static str) -> Self {
        Self {
            token,
            word_bounded: false,
            flanking: false,
        }
    }

    fn byte(&self) -> u8 {
        self.token.as_bytes()[0]
    }

    fn is_single(&self) -> bool {
        self.token.len() == 1
    }
}

pub struct PairedRule {
    markup: Markup,
    delimiters: &'static [Delimiter],
    /// Content is shown verbatim, never parsed.
    literal: bool,
}

impl PairedRule {
    pub const BOLD_ITALIC: PairedRule = PairedRule {
        markup: Markup::BoldItalic,
        delimiters: &[Delimiter::plain("***")],
        literal: false,
    };
    pub const BOLD: PairedRule = PairedRule {
        markup: Markup::Bold,
        delimiters: &[Delimiter::plain("**")],
        literal: false,
    };
    pub const UNDERLINE: PairedRule = PairedRule {
        markup: Markup::Underline,
        delimiters: &[Delimiter {
            token: "__",
            word_bounded: true,
            flanking: false,
        }],
        literal: false,
    };
    pub const ITALIC: PairedRule = PairedRule {
        markup: Markup::Italic,
        delimiters: &[
            Delimiter {
                token: "*",
                word_bounded: false,
                flanking: true,
            },
            Delimiter {
                token: "_",
                word_bounded: true,
                flanking: true,
            },
        ],
        literal: false,
    };
    pub const STRIKETHROUGH: PairedRule = PairedRule {
        markup: Markup::Strikethrough,
        delimiters: &[Delimiter::plain("~~")],
        literal: false,
    };
    pub const SPOILER: PairedRule = PairedRule {
        markup: Markup::Spoiler,
        delimiters: &[Delimiter::plain("||")],
        literal: false,
    };
    pub const CODE: PairedRule = PairedRule {
        markup: Markup::Code,
        delimiters: &[Delimiter::plain("`")],
        literal: true,
    };

    fn find_with(&self, scan: &Scan<'_>, window: Window, d: &Delimiter) -> Option<RuleMatch> {
        let bytes = scan.text().as_bytes();
        let ch = d.byte();
        let len = d.token.len();
        let mut pos = window.from;

        while pos < window.end {
            let start = pos + bytes[pos..window.end].iter().position(|&b| b == ch)?;
            pos = start + 1;
            if !is_opener(scan, window, d, start) {
                continue;
            }
            let content_start = start + len;

            if d.is_single() {
                // content holds no unmasked delimiter, so the closer is the
                // next one; if it is rejected it may still open a later pair
                let close = next_unmasked(scan, window, ch, content_start)?;
                if closes(scan, window, d, content_start, close) {
                    return Some(pair(start, content_start, close, len));
                }
                pos = close;
            } else {
                // lazy closer; none here means none for any later opener
                let close = find_closer(scan, window, d, content_start + 1)?;
                return Some(pair(start, content_start, close, len));
            }
        }
        None
    }
}

fn pair(start: usize, content_start: usize, close: usize, len: usize) -> RuleMatch {
    RuleMatch::new(start..close + len, content_start..close)
        .marker(start..content_start)
        .marker(close..close + len)
}

fn unmasked_byte(scan: &Scan<'_>, pos: usize, ch: u8) -> bool {
    scan.text().as_bytes().get(pos) == Some(&ch) && !scan.is_masked(pos)
}

fn is_opener(scan: &Scan<'_>, window: Window, d: &Delimiter, start: usize) -> bool {
    let ch = d.byte();
    let after = start + d.token.len();
    if !scan.delimiter_at(window, start, d.token) {
        return false;
    }
    // exact run: no live delimiter char directly before or after
    if start > window.start && unmasked_byte(scan, start - 1, ch) {
        return false;
    }
    if after < window.end && unmasked_byte(scan, after, ch) {
        return false;
    }
    if d.word_bounded
        && scan
            .char_before(window, start)
            .is_some_and(char::is_alphanumeric)
    {
        return false;
    }
    if d.flanking && scan.char_at(window, after).is_none_or(char::is_whitespace) {
        return false;
    }
    true
}

fn next_unmasked(scan: &Scan<'_>, window: Window, ch: u8, from: usize) -> Option<usize> {
    let bytes = scan.text().as_bytes();
    let mut pos = from;
    while pos < window.end {
        let hit = pos + bytes[pos..window.end].iter().position(|&b| b == ch)?;
        if !scan.is_masked(hit) {
            return Some(hit);
        }
        pos = hit + 1;
    }
    None
}

/// Whether a single-char closer at `close` completes the pair.
fn closes(
    scan: &Scan<'_>,
    window: Window,
    d: &Delimiter,
    content_start: usize,
    close: usize,
) -> bool {
    let after = close + 1;
    if close <= content_start {
        return false;
    }
    if after < window.end && unmasked_byte(scan, after, d.byte()) {
        return false;
    }
    if d.word_bounded && scan.char_at(window, after).is_some_and(char::is_alphanumeric) {
        return false;
    }
    if d.flanking
        && scan
            .char_before(window, close)
            .is_none_or(char::is_whitespace)
    {
        return false;
    }
    true
}

/// First multi-char closer at or after `from` not followed by the delimiter
/// char (and, when word-bounded, not by an alphanumeric).
fn find_closer(scan: &Scan<'_>, window: Window, d: &Delimiter, from: usize) -> Option<usize> {
    let ch = d.byte();
    let len = d.token.len();
    let mut pos = from;
    while pos < window.end {
        let close = next_unmasked(scan, window, ch, pos)?;
        pos = close + 1;
        if !scan.delimiter_at(window, close, d.token) {
            continue;
        }
        let after = close + len;
        if after < window.end && unmasked_byte(scan, after, ch) {
            continue;
        }
        if d.word_bounded && scan.char_at(window, after).is_some_and(char::is_alphanumeric) {
            continue;
        }
        return Some(close);
    }
    None
}

impl Rule for PairedRule {
    fn markup(&self) -> Markup {
        self.markup
    }

    fn try_match(&self, scan: &Scan<'_>, window: Window, _mode: Mode) -> Option<RuleMatch> {
        self.delimiters
            .iter()
            .filter_map(|d| self.find_with(scan, window, d))
            .min_by_key(|m| m.span.start)
    }

    fn parse_inner(&self, _m: &RuleMatch) -> bool {
        !self.literal
    }

    fn decorate(&self, _scan: &Scan<'_>, m: &RuleMatch, out: &mut Vec<RawRange>) {
        out.extend(m.markers.iter().cloned().map(RawRange::syntax));
        match self.markup {
            Markup::BoldItalic => {
                out.push(RawRange::new(m.inner.clone(), Markup::Bold));
                out.push(RawRange::new(m.inner.clone(), Markup::Italic));
            }
            markup => out.push(RawRange::new(m.inner.clone(), markup)),
        }
    }

    fn render(
        &self,
        _scan: &Scan<'_>,
        _m: &RuleMatch,
        children: Vec<RenderNode>,
        _cx: &RenderContext<'_>,
        out: &mut Vec<RenderNode>,
    ) {
        let node = match self.markup {
            Markup::BoldItalic => RenderNode::styled(
                Markup::Bold,
                Attributes::new(),
                vec![RenderNode::styled(Markup::Italic, Attributes::new(), children)],
            ),
            markup => RenderNode::styled(markup, Attributes::new(), children),
        };
        out.push(node);
    }
}
