//! Line-anchored rules (headers, subheader, quote, list item) and the fenced
//! code block.

use std::sync::LazyLock;

use regex::Regex;
use smol_str::{SmolStr, ToSmolStr};

use super::{Mode, Payload, RawRange, Rule, RuleMatch};
use crate::markup::{Attributes, Markup};
use crate::render::{RenderContext, RenderNode};
use crate::scan::{Scan, Window};

/// Language tag allowed right after an opening fence.
static FENCE_LANG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_+#.-]{1,32}$").unwrap());

const FENCE: &str = "```";

/// ```` ```lang\n ... ``` ````
pub struct FenceRule;

impl FenceRule {
    /// Content start and language tag for an opener ending at `after`.
    fn header(scan: &Scan<'_>, window: Window, after: usize) -> (usize, Option<SmolStr>) {
        let eol = scan.line_end(window, after);
        if eol < window.end {
            let rest = scan.slice(after..eol);
            if rest.is_empty() {
                return (eol + 1, None);
            }
            if FENCE_LANG.is_match(rest) {
                return (eol + 1, Some(rest.to_smolstr()));
            }
        }
        (after, None)
    }

    fn find_closer(scan: &Scan<'_>, window: Window, from: usize) -> Option<usize> {
        let text = &scan.text()[..window.end];
        let mut pos = from;
        while pos < window.end {
            let close = pos + text[pos..].find(FENCE)?;
            pos = close + 1;
            if scan.any_masked(close..close + FENCE.len()) {
                continue;
            }
            if text.as_bytes().get(close + FENCE.len()) == Some(&b'`') {
                continue;
            }
            return Some(close);
        }
        None
    }
}

impl Rule for FenceRule {
    fn markup(&self) -> Markup {
        Markup::CodeBlock
    }

    fn try_match(&self, scan: &Scan<'_>, window: Window, mode: Mode) -> Option<RuleMatch> {
        let text = &scan.text()[..window.end];
        let mut pos = window.from;
        while pos < window.end {
            let start = pos + text[pos..].find(FENCE)?;
            pos = start + 1;
            if !scan.delimiter_at(window, start, FENCE) {
                continue;
            }
            if start > window.start && text.as_bytes()[start - 1] == b'`' {
                continue;
            }
            let after = start + FENCE.len();
            let (content_start, lang) = Self::header(scan, window, after);
            let marker_end = if lang.is_some() {
                content_start - 1
            } else {
                after
            };

            // the closer may not share the opener's first content char
            let search_from = if content_start > after {
                content_start
            } else {
                after
                    + scan.text()[after..window.end]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8)
            };
            match Self::find_closer(scan, window, search_from) {
                Some(close) => {
                    let m = RuleMatch::new(start..close + FENCE.len(), content_start..close)
                        .marker(start..marker_end)
                        .marker(close..close + FENCE.len())
                        .payload(Payload::Fence { lang, closed: true });
                    return Some(m);
                }
                None if mode == Mode::Decorate => {
                    // unterminated: highlight through to the end while typing
                    let m = RuleMatch::new(start..window.end, content_start..window.end)
                        .marker(start..marker_end)
                        .payload(Payload::Fence {
                            lang,
                            closed: false,
                        });
                    return Some(m);
                }
                None => return None,
            }
        }
        None
    }

    fn parse_inner(&self, _m: &RuleMatch) -> bool {
        false
    }

    fn attributes(&self, _scan: &Scan<'_>, m: &RuleMatch) -> Attributes {
        match &m.payload {
            Payload::Fence {
                lang: Some(lang), ..
            } => Attributes::new().with("lang", lang.clone()),
            _ => Attributes::new(),
        }
    }
}

/// A rule anchored at a line start: `marker`, whitespace, non-empty content.
pub struct LineRule {
    markup: Markup,
    kind: LineKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Header,
    Subheader,
    Quote,
    List,
}

impl LineRule {
    pub const HEADER: LineRule = LineRule {
        markup: Markup::Header,
        kind: LineKind::Header,
    };
    pub const SUBHEADER: LineRule = LineRule {
        markup: Markup::Subheader,
        kind: LineKind::Subheader,
    };
    pub const QUOTE: LineRule = LineRule {
        markup: Markup::Quote,
        kind: LineKind::Quote,
    };
    pub const LIST: LineRule = LineRule {
        markup: Markup::ListItem,
        kind: LineKind::List,
    };

    /// Marker length and header level for a line starting at `pos`.
    fn marker(&self, line: &str) -> Option<(usize, u8)> {
        let bytes = line.as_bytes();
        let (len, level) = match self.kind {
            LineKind::Header => {
                let hashes = bytes.iter().take_while(|&&b| b == b'#').count();
                if !(1..=6).contains(&hashes) {
                    return None;
                }
                (hashes, hashes as u8)
            }
            LineKind::Subheader => (line.starts_with("-#").then_some(2)?, 0),
            LineKind::Quote => (line.starts_with('>').then_some(1)?, 0),
            LineKind::List => (matches!(bytes.first(), Some(b'-' | b'*')).then_some(1)?, 0),
        };
        // quote takes exactly one space, the others any single blank
        let sep = *bytes.get(len)?;
        let ok = match self.kind {
            LineKind::Quote => sep == b' ',
            _ => sep == b' ' || sep == b'\t',
        };
        // content needs at least one visible char
        let content = line.get(len + 1..)?;
        (ok && content.chars().any(|c| !c.is_whitespace())).then_some((len, level))
    }
}

impl Rule for LineRule {
    fn markup(&self) -> Markup {
        self.markup
    }

    fn try_match(&self, scan: &Scan<'_>, window: Window, _mode: Mode) -> Option<RuleMatch> {
        let mut pos = scan.next_line_start(window, window.from)?;
        loop {
            let eol = scan.line_end(window, pos);
            let line = scan.slice(pos..eol);
            if !scan.is_masked(pos) {
                if let Some((len, level)) = self.marker(line) {
                    let payload = if self.kind == LineKind::Header {
                        Payload::Level(level)
                    } else {
                        Payload::None
                    };
                    return Some(
                        RuleMatch::new(pos..eol, pos + len + 1..eol)
                            .marker(pos..pos + len)
                            .payload(payload),
                    );
                }
            }
            if eol >= window.end {
                return None;
            }
            pos = eol + 1;
        }
    }

    fn attributes(&self, _scan: &Scan<'_>, m: &RuleMatch) -> Attributes {
        match m.payload {
            Payload::Level(level) => Attributes::new().with("size", level.to_smolstr()),
            _ => Attributes::new(),
        }
    }

    /// Content type spans the whole line, marker included.
    fn decorate(&self, scan: &Scan<'_>, m: &RuleMatch, out: &mut Vec<RawRange>) {
        out.extend(m.markers.iter().cloned().map(RawRange::syntax));
        out.push(RawRange::new(m.span.clone(), self.markup).with_attributes(self.attributes(scan, m)));
    }

    fn render(
        &self,
        scan: &Scan<'_>,
        m: &RuleMatch,
        children: Vec<RenderNode>,
        _cx: &RenderContext<'_>,
        out: &mut Vec<RenderNode>,
    ) {
        out.push(RenderNode::styled(self.markup, self.attributes(scan, m), children));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(rule: &LineRule, text: &str) -> Option<RuleMatch> {
        let scan = Scan::new(text);
        rule.try_match(&scan, Window::new(0..text.len()), Mode::Render)
    }

    fn fence(text: &str, mode: Mode) -> Option<RuleMatch> {
        let scan = Scan::new(text);
        FenceRule.try_match(&scan, Window::new(0..text.len()), mode)
    }

    #[test]
    fn test_header_levels() {
        let m = line(&LineRule::HEADER, "## Title").unwrap();
        assert_eq!(m.span, 0..8);
        assert_eq!(m.inner, 3..8);
        assert_eq!(m.markers, vec![0..2]);
        assert_eq!(m.payload, Payload::Level(2));
        assert!(line(&LineRule::HEADER, "####### seven").is_none());
        assert!(line(&LineRule::HEADER, "#nospace").is_none());
        assert!(line(&LineRule::HEADER, "# ").is_none());
    }

    #[test]
    fn test_blank_content_is_not_a_line() {
        assert!(line(&LineRule::HEADER, "#  ").is_none());
        assert!(line(&LineRule::HEADER, "##\t \t").is_none());
        assert!(line(&LineRule::QUOTE, "> \t").is_none());
        assert!(line(&LineRule::LIST, "-   ").is_none());
        assert_eq!(line(&LineRule::HEADER, "#  x").unwrap().inner, 2..4);
        let m = line(&LineRule::QUOTE, ">  \n> next").unwrap();
        assert_eq!(m.span, 4..10);
    }

    #[test]
    fn test_header_only_at_line_start() {
        assert!(line(&LineRule::HEADER, "a # b").is_none());
        let m = line(&LineRule::HEADER, "intro\n# Title\nrest").unwrap();
        assert_eq!(m.span, 6..13);
    }

    #[test]
    fn test_subheader_quote_list() {
        assert_eq!(line(&LineRule::SUBHEADER, "-# small").unwrap().inner, 3..8);
        assert_eq!(line(&LineRule::QUOTE, "> said").unwrap().inner, 2..6);
        assert!(line(&LineRule::QUOTE, ">said").is_none());
        assert_eq!(line(&LineRule::LIST, "- item").unwrap().inner, 2..6);
        assert_eq!(line(&LineRule::LIST, "* item").unwrap().inner, 2..6);
        assert!(line(&LineRule::LIST, "-# small").is_none());
    }

    #[test]
    fn test_fence_with_lang() {
        let m = fence("```rust\nfn x() {}\n```", Mode::Render).unwrap();
        assert_eq!(m.span, 0..21);
        assert_eq!(m.markers, vec![0..7, 18..21]);
        assert_eq!(m.inner, 8..18);
        assert_eq!(
            m.payload,
            Payload::Fence {
                lang: Some("rust".into()),
                closed: true
            }
        );
    }

    #[test]
    fn test_fence_inline() {
        let m = fence("```a b```", Mode::Render).unwrap();
        assert_eq!(m.inner, 3..6);
        assert_eq!(m.payload, Payload::Fence { lang: None, closed: true });
    }

    #[test]
    fn test_unterminated_fence_depends_on_mode() {
        assert!(fence("```\nopen", Mode::Render).is_none());
        let m = fence("```\nopen", Mode::Decorate).unwrap();
        assert_eq!(m.span, 0..8);
        assert_eq!(m.inner, 4..8);
        assert_eq!(m.markers, vec![0..3]);
    }

    #[test]
    fn test_multibyte_after_fence() {
        let m = fence("```é```", Mode::Render).unwrap();
        assert_eq!(m.inner, 3..5);
        assert!(fence("```🔥", Mode::Render).is_none());
        let m = fence("```🔥", Mode::Decorate).unwrap();
        assert_eq!(m.span, 0..7);
        assert_eq!(m.inner, 3..7);
    }

    #[test]
    fn test_escaped_fence() {
        assert!(fence(r"\```a```", Mode::Render).is_none());
    }
}
