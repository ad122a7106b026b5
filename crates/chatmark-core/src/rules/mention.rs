//! `<@id>`, `<@&id>`, `<#id>`, `<~id>` and `@everyone` / `@here`.
//!
//! Matching only captures a [`MentionToken`]; the directories are consulted
//! at render time.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::{Mode, Payload, RawRange, Rule, RuleMatch};
use crate::directory;
use crate::markup::{Attributes, Markup, MentionKind, MentionToken, format_color};
use crate::render::{
    ChannelRef, RenderContext, RenderNode, ResolvedRef, RoleRef, ServerRef, UserRef,
};
use crate::scan::{Scan, Window};

static USER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<@(-?[0-9]+)>").unwrap());
static ROLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<@&([0-9]+)>").unwrap());
static CHANNEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<#(-?[0-9]+)>").unwrap());
static SERVER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<~(-?[0-9]+)>").unwrap());
static EVERYONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@(everyone|here)").unwrap());

fn token_of(m: &RuleMatch) -> Option<&MentionToken> {
    match &m.payload {
        Payload::Mention(token) => Some(token),
        _ => None,
    }
}

/// First unmasked match of `re` in the remaining window, with its id group.
fn find_token(scan: &Scan<'_>, window: Window, re: &Regex) -> Option<(Range<usize>, Range<usize>)> {
    let text = &scan.text()[..window.end];
    let mut pos = window.from;
    while pos <= window.end {
        let caps = re.captures_at(text, pos)?;
        let whole = caps.get(0)?;
        pos = whole.start() + 1;
        if scan.is_masked(whole.start()) {
            continue;
        }
        return Some((whole.range(), caps.get(1)?.range()));
    }
    None
}

pub struct MentionRule {
    kind: MentionKind,
    pattern: fn() -> &'static Regex,
}

impl MentionRule {
    pub const USER: MentionRule = MentionRule {
        kind: MentionKind::User,
        pattern: || &USER,
    };
    pub const ROLE: MentionRule = MentionRule {
        kind: MentionKind::Role,
        pattern: || &ROLE,
    };
    pub const CHANNEL: MentionRule = MentionRule {
        kind: MentionKind::Channel,
        pattern: || &CHANNEL,
    };
    pub const SERVER: MentionRule = MentionRule {
        kind: MentionKind::Server,
        pattern: || &SERVER,
    };

    fn resolve(&self, token: &MentionToken, cx: &RenderContext<'_>) -> Option<ResolvedRef> {
        let id = token.id()?;
        match self.kind {
            MentionKind::User => {
                let user = cx.users.user(id)?;
                let member = cx
                    .scope
                    .current_server
                    .and_then(|server_id| cx.users.member(server_id, id));
                let color = match cx.scope.current_server {
                    None => user.dm_color,
                    Some(server_id) => cx
                        .servers
                        .server(server_id)
                        .zip(member)
                        .and_then(|(server, member)| directory::role_color(server, member)),
                };
                Some(ResolvedRef::User(UserRef {
                    id,
                    label: directory::display_name(user, member),
                    color: color.map(format_color),
                    font: directory::name_font(user, member),
                    avatar: directory::avatar(user, member),
                }))
            }
            MentionKind::Role => {
                // roles only mean something inside the server being viewed
                let server = cx.servers.server(cx.scope.current_server?)?;
                let role = server.role(id)?;
                Some(ResolvedRef::Role(RoleRef {
                    id,
                    server_id: server.id,
                    label: role.name.clone(),
                    color: role.color.map(format_color),
                }))
            }
            MentionKind::Channel => {
                let channel = cx.channels.channel(id)?;
                Some(ResolvedRef::Channel(ChannelRef {
                    id,
                    label: channel.name.clone(),
                    channel_type: channel.channel_type,
                    is_current: cx.scope.current_channel == Some(id),
                }))
            }
            MentionKind::Server => {
                let server = cx.servers.server(id)?;
                Some(ResolvedRef::Server(ServerRef {
                    id,
                    label: server.name.clone(),
                }))
            }
            MentionKind::Everyone => None,
        }
    }
}

impl Rule for MentionRule {
    fn markup(&self) -> Markup {
        self.kind.markup()
    }

    fn try_match(&self, scan: &Scan<'_>, window: Window, _mode: Mode) -> Option<RuleMatch> {
        let (span, id) = find_token(scan, window, (self.pattern)())?;
        let token = MentionToken::new(self.kind, scan.slice(id));
        Some(RuleMatch::new(span.clone(), span).payload(Payload::Mention(token)))
    }

    fn parse_inner(&self, _m: &RuleMatch) -> bool {
        false
    }

    fn attributes(&self, _scan: &Scan<'_>, m: &RuleMatch) -> Attributes {
        token_of(m)
            .map(|token| Attributes::new().with("id", token.raw_id.clone()))
            .unwrap_or_default()
    }

    fn decorate(&self, scan: &Scan<'_>, m: &RuleMatch, out: &mut Vec<RawRange>) {
        out.push(RawRange::new(m.span.clone(), self.markup()).with_attributes(self.attributes(scan, m)));
    }

    fn render(
        &self,
        _scan: &Scan<'_>,
        m: &RuleMatch,
        _children: Vec<RenderNode>,
        cx: &RenderContext<'_>,
        out: &mut Vec<RenderNode>,
    ) {
        let Some(token) = token_of(m) else {
            return;
        };
        match self.resolve(token, cx) {
            Some(reference) => out.push(RenderNode::Void {
                kind: self.markup(),
                reference,
            }),
            None => {
                tracing::trace!(
                    target: "chatmark::render",
                    kind = ?token.kind,
                    raw_id = %token.raw_id,
                    "unresolved mention"
                );
                out.push(RenderNode::text(token.fallback()));
            }
        }
    }
}

/// `@everyone` / `@here`, not glued to a word.
pub struct EveryoneRule;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl Rule for EveryoneRule {
    fn markup(&self) -> Markup {
        Markup::MentionEveryone
    }

    fn try_match(&self, scan: &Scan<'_>, window: Window, _mode: Mode) -> Option<RuleMatch> {
        let mut window = window;
        loop {
            let (span, word) = find_token(scan, window, &EVERYONE)?;
            let before = scan.char_before(window, span.start);
            let after = scan.char_at(window, span.end);
            if !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char) {
                let token = MentionToken::new(MentionKind::Everyone, scan.slice(word));
                return Some(RuleMatch::new(span.clone(), span).payload(Payload::Mention(token)));
            }
            window = window.starting_at(span.start + 1);
        }
    }

    fn parse_inner(&self, _m: &RuleMatch) -> bool {
        false
    }

    fn decorate(&self, _scan: &Scan<'_>, m: &RuleMatch, out: &mut Vec<RawRange>) {
        out.push(RawRange::new(m.span.clone(), Markup::MentionEveryone));
    }

    fn render(
        &self,
        _scan: &Scan<'_>,
        m: &RuleMatch,
        _children: Vec<RenderNode>,
        _cx: &RenderContext<'_>,
        out: &mut Vec<RenderNode>,
    ) {
        if let Some(token) = token_of(m) {
            out.push(RenderNode::Void {
                kind: Markup::MentionEveryone,
                reference: ResolvedRef::Everyone {
                    token: token.raw_id.clone(),
                },
            });
        }
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
    fn test_user_mention_token() {
        let m = run(&MentionRule::USER, "hi <@42>!").unwrap();
        assert_eq!(m.span, 3..8);
        assert_eq!(
            token_of(&m),
            Some(&MentionToken::new(MentionKind::User, "42"))
        );
    }

    #[test]
    fn test_role_is_not_user() {
        assert!(run(&MentionRule::USER, "<@&5>").is_none());
        assert!(run(&MentionRule::ROLE, "<@&5>").is_some());
        assert!(run(&MentionRule::ROLE, "<@&-5>").is_none());
    }

    #[test]
    fn test_negative_ids_match_but_may_not_resolve() {
        let m = run(&MentionRule::CHANNEL, "<#-1>").unwrap();
        assert_eq!(token_of(&m).and_then(MentionToken::id), Some(-1));
        let m = run(&MentionRule::SERVER, "<~-7>").unwrap();
        assert_eq!(token_of(&m).and_then(MentionToken::id), None);
    }

    #[test]
    fn test_escaped_mention() {
        assert!(run(&MentionRule::USER, r"\<@42>").is_none());
    }

    #[test]
    fn test_everyone_boundaries() {
        assert_eq!(run(&EveryoneRule, "hey @everyone!").unwrap().span, 4..13);
        assert_eq!(run(&EveryoneRule, "@here").unwrap().span, 0..5);
        assert!(run(&EveryoneRule, "mail@everyone").is_none());
        assert!(run(&EveryoneRule, "@everyones").is_none());
        assert!(run(&EveryoneRule, r"\@here").is_none());
        assert_eq!(run(&EveryoneRule, "x@here @here").unwrap().span, 7..12);
    }
}
