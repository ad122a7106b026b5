//! Escapes, color tags and links.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use smol_str::{SmolStr, ToSmolStr};

use super::{Mode, Payload, RawRange, Rule, RuleMatch};
use crate::markup::{Attributes, Markup, is_valid_color, normalize_color};
use crate::render::{RenderContext, RenderNode};
use crate::scan::{Scan, Window};

/// `\*` and friends: the escaped character, verbatim.
pub struct EscapeRule;

impl Rule for EscapeRule {
    fn markup(&self) -> Markup {
        Markup::Escape
    }

    fn try_match(&self, scan: &Scan<'_>, window: Window, _mode: Mode) -> Option<RuleMatch> {
        let esc = scan.next_escape(window)?;
        Some(RuleMatch::new(esc.clone(), esc.start + 1..esc.end).marker(esc.start..esc.start + 1))
    }

    fn parse_inner(&self, _m: &RuleMatch) -> bool {
        false
    }

    /// Only the backslash is highlighted.
    fn decorate(&self, _scan: &Scan<'_>, m: &RuleMatch, out: &mut Vec<RawRange>) {
        out.extend(m.markers.iter().cloned().map(RawRange::syntax));
    }

    fn render(
        &self,
        _scan: &Scan<'_>,
        _m: &RuleMatch,
        children: Vec<RenderNode>,
        _cx: &RenderContext<'_>,
        out: &mut Vec<RenderNode>,
    ) {
        out.extend(children);
    }
}

static COLOR_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(color|c):(#[0-9a-f]+|[a-z]{1,21})>").unwrap());
static COLOR_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</color>").unwrap());
static C_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</c>").unwrap());

/// `<color:red>..</color>`, `<c:#f00>..</c>`.
pub struct ColorRule;

impl ColorRule {
    fn find_closer(scan: &Scan<'_>, window: Window, closer: &Regex, from: usize) -> Option<Range<usize>> {
        let text = &scan.text()[..window.end];
        let mut pos = from;
        while pos <= window.end {
            let m = closer.find_at(text, pos)?;
            if !scan.is_masked(m.start()) {
                return Some(m.range());
            }
            pos = m.start() + 1;
        }
        None
    }
}

impl Rule for ColorRule {
    fn markup(&self) -> Markup {
        Markup::Color
    }

    fn try_match(&self, scan: &Scan<'_>, window: Window, _mode: Mode) -> Option<RuleMatch> {
        let text = &scan.text()[..window.end];
        // closer searches that already failed, per tag spelling
        let mut no_color_close = false;
        let mut no_c_close = false;
        let mut pos = window.from;
        while pos <= window.end {
            let caps = COLOR_OPEN.captures_at(text, pos)?;
            let open = caps.get(0)?;
            pos = open.start() + 1;
            if scan.is_masked(open.start()) {
                continue;
            }
            let token = caps.get(2)?.as_str();
            if !is_valid_color(token) {
                continue;
            }
            let long = caps.get(1)?.as_str().len() > 1;
            let (closer, exhausted) = if long {
                (&*COLOR_CLOSE, &mut no_color_close)
            } else {
                (&*C_CLOSE, &mut no_c_close)
            };
            if *exhausted {
                continue;
            }
            match Self::find_closer(scan, window, closer, open.end()) {
                Some(close) => {
                    return Some(
                        RuleMatch::new(open.start()..close.end, open.end()..close.start)
                            .marker(open.range())
                            .marker(close)
                            .payload(Payload::Color(token.to_smolstr())),
                    );
                }
                None => *exhausted = true,
            }
        }
        None
    }

    fn attributes(&self, _scan: &Scan<'_>, m: &RuleMatch) -> Attributes {
        color_of(m)
            .map(|hex| Attributes::new().with("hex", hex))
            .unwrap_or_default()
    }
}

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\[(?P<label>[^\]\n]+)\]\((?P<url>https?://[^\s/$.?#]+?\.[^\s]+?)\)",
        r"|(?P<bare>https?://[^\s/$.?#]+?\.[^\s]+)",
    ))
    .unwrap()
});

/// Characters dropped from the end of a bare link.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"'];

/// Strip sentence punctuation a bare link picked up, and a closing paren
/// that has no opening one inside the link.
fn trim_bare(url: &str) -> &str {
    let mut url = url;
    loop {
        let trimmed = url.trim_end_matches(TRAILING_PUNCTUATION);
        let trimmed = match trimmed.strip_suffix(')') {
            Some(rest) if !rest.contains('(') => rest,
            _ => trimmed,
        };
        if trimmed.len() == url.len() {
            return url;
        }
        url = trimmed;
    }
}

/// `[label](https://...)` and bare `https://...`.
pub struct LinkRule;

impl LinkRule {
    pub fn url<'t>(scan: &Scan<'t>, m: &RuleMatch) -> Option<&'t str> {
        match &m.payload {
            Payload::Link { url, .. } => Some(scan.slice(url.clone())),
            _ => None,
        }
    }
}

impl Rule for LinkRule {
    fn markup(&self) -> Markup {
        Markup::Link
    }

    fn try_match(&self, scan: &Scan<'_>, window: Window, _mode: Mode) -> Option<RuleMatch> {
        let text = &scan.text()[..window.end];
        let mut pos = window.from;
        while pos <= window.end {
            let caps = LINK.captures_at(text, pos)?;
            let whole = caps.get(0)?;
            pos = whole.start() + 1;
            if scan.is_masked(whole.start()) {
                continue;
            }
            if let (Some(label), Some(url)) = (caps.name("label"), caps.name("url")) {
                return Some(
                    RuleMatch::new(whole.range(), label.range())
                        .marker(whole.start()..label.start())
                        .marker(label.end()..url.start())
                        .marker(url.end()..whole.end())
                        .payload(Payload::Link {
                            url: url.range(),
                            bracketed: true,
                        }),
                );
            }
            if let Some(bare) = caps.name("bare") {
                let end = bare.start() + trim_bare(bare.as_str()).len();
                if !scan.slice(bare.start()..end).contains('.') {
                    continue;
                }
                let span = bare.start()..end;
                return Some(RuleMatch::new(span.clone(), span.clone()).payload(Payload::Link {
                    url: span,
                    bracketed: false,
                }));
            }
        }
        None
    }

    /// Bracket labels are parsed; urls never are.
    fn parse_inner(&self, m: &RuleMatch) -> bool {
        matches!(m.payload, Payload::Link { bracketed: true, .. })
    }

    fn attributes(&self, scan: &Scan<'_>, m: &RuleMatch) -> Attributes {
        match Self::url(scan, m) {
            Some(url) => Attributes::new().with("link", url),
            None => Attributes::new(),
        }
    }

    fn decorate(&self, scan: &Scan<'_>, m: &RuleMatch, out: &mut Vec<RawRange>) {
        out.extend(m.markers.iter().cloned().map(RawRange::syntax));
        if let Payload::Link { url, .. } = &m.payload {
            out.push(RawRange::new(url.clone(), Markup::Link).with_attributes(self.attributes(scan, m)));
        }
    }
}

/// The color token, normalized, for a color match.
pub fn color_of(m: &RuleMatch) -> Option<SmolStr> {
    match &m.payload {
        Payload::Color(token) => Some(normalize_color(token)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(rule: &dyn Rule, text: &str) -> Option<RuleMatch> {
        let scan = Scan::new(text);
        rule.try_match(&scan, Window::new(0..text.len()), Mode::Render)
    }

    #[test]
    fn test_escape_match() {
        let m = run(&EscapeRule, r"a \* b").unwrap();
        assert_eq!(m.span, 2..4);
        assert_eq!(m.inner, 3..4);
        assert_eq!(m.markers, vec![2..3]);
    }

    #[test]
    fn test_color_named_and_hex() {
        let m = run(&ColorRule, "<color:red>hi</color>").unwrap();
        assert_eq!(m.span, 0..21);
        assert_eq!(m.inner, 11..13);
        assert_eq!(color_of(&m).as_deref(), Some("red"));

        let m = run(&ColorRule, "<c:#FF0000>hi</C>").unwrap();
        assert_eq!(m.inner, 11..13);
        assert_eq!(color_of(&m).as_deref(), Some("#FF0000"));
    }

    #[test]
    fn test_color_rejects_invalid_token() {
        assert!(run(&ColorRule, "<color:bogus>text</color>").is_none());
        assert!(run(&ColorRule, "<color:#ff00>text</color>").is_none());
    }

    #[test]
    fn test_color_closer_must_match_opener() {
        assert!(run(&ColorRule, "<c:red>text</color>").is_none());
        let m = run(&ColorRule, "<color:red>a</c>b</color>").unwrap();
        assert_eq!(m.inner, 11..17);
    }

    #[test]
    fn test_color_escaped_opener() {
        assert!(run(&ColorRule, r"\<color:red>x</color>").is_none());
    }

    #[test]
    fn test_bracket_link() {
        let text = "[x](http://a.com/*bold*)";
        let m = run(&LinkRule, text).unwrap();
        assert_eq!(m.span, 0..text.len());
        assert_eq!(&text[m.inner.clone()], "x");
        let scan = Scan::new(text);
        assert_eq!(LinkRule::url(&scan, &m), Some("http://a.com/*bold*"));
        assert!(LinkRule.parse_inner(&m));
        assert_eq!(m.markers, vec![0..1, 2..4, 23..24]);
    }

    #[test]
    fn test_bare_link_trims_punctuation() {
        let text = "see https://example.com/a.";
        let m = run(&LinkRule, text).unwrap();
        assert_eq!(&text[m.span.clone()], "https://example.com/a");
        assert!(!LinkRule.parse_inner(&m));

        let text = "(https://example.com)";
        let m = run(&LinkRule, text).unwrap();
        assert_eq!(&text[m.span.clone()], "https://example.com");
    }

    #[test]
    fn test_trim_keeps_balanced_paren() {
        assert_eq!(trim_bare("https://w.org/a_(b)"), "https://w.org/a_(b)");
        assert_eq!(trim_bare("https://w.org/a)."), "https://w.org/a");
    }

    #[test]
    fn test_not_a_link() {
        assert!(run(&LinkRule, "http://localhost").is_none());
        assert!(run(&LinkRule, "ftp://a.com").is_none());
    }
}
