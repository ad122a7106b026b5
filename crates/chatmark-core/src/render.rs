//! Finalized message rendering.
//!
//! [`render`] parses persisted content into a tree of [`RenderNode`]s by
//! repeated first-match: find the earliest match of any rule in the window,
//! emit the text before it, render the match (recursing into its content
//! when the rule allows), continue after it. Mentions are resolved against
//! the directories in the [`RenderContext`]; misses fall back to literal text.

use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};

use crate::directory::{
    ChannelDirectory, ChannelType, DirectorySnapshot, EntityId, ServerDirectory, UserDirectory,
};
use crate::markup::{Attributes, Markup};
use crate::rules::{MatchCursor, Mode, RuleTable};
use crate::scan::{Scan, Window};

/// One node of a rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderNode {
    Text(String),
    Styled {
        kind: Markup,
        #[serde(default, skip_serializing_if = "Attributes::is_empty")]
        attributes: Attributes,
        children: Vec<RenderNode>,
    },
    Void {
        kind: Markup,
        reference: ResolvedRef,
    },
}

impl RenderNode {
    pub fn text(text: impl Into<String>) -> Self {
        RenderNode::Text(text.into())
    }

    pub fn styled(kind: Markup, attributes: Attributes, children: Vec<RenderNode>) -> Self {
        RenderNode::Styled {
            kind,
            attributes,
            children,
        }
    }

    pub fn kind(&self) -> Option<Markup> {
        match self {
            RenderNode::Text(_) => None,
            RenderNode::Styled { kind, .. } | RenderNode::Void { kind, .. } => Some(*kind),
        }
    }

    pub fn children(&self) -> &[RenderNode] {
        match self {
            RenderNode::Styled { children, .. } => children,
            _ => &[],
        }
    }

    /// Visible text of this node, mentions shown by their display label.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.write_plain(&mut out);
        out
    }

    fn write_plain(&self, out: &mut String) {
        match self {
            RenderNode::Text(text) => out.push_str(text),
            RenderNode::Styled { children, .. } => {
                for child in children {
                    child.write_plain(out);
                }
            }
            RenderNode::Void { reference, .. } => out.push_str(&reference.display()),
        }
    }
}

/// Visible text of a rendered message.
pub fn to_plain_text(nodes: &[RenderNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.write_plain(&mut out);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: EntityId,
    /// Nickname, display name or username, in that order of preference.
    pub label: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: EntityId,
    pub server_id: EntityId,
    pub label: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: EntityId,
    pub label: SmolStr,
    pub channel_type: ChannelType,
    /// The mention points at the channel being viewed.
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRef {
    pub id: EntityId,
    pub label: SmolStr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmojiSize {
    Inline,
    Big,
}

/// How the host draws emoji glyphs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmojiStyle {
    /// The platform's emoji font.
    #[default]
    System,
    /// Image sprites keyed by codepoint.
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiRef {
    pub glyph: SmolStr,
    pub size: EmojiSize,
    pub style: EmojiStyle,
}

/// What a void node refers to, resolved at render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolvedRef {
    User(UserRef),
    Role(RoleRef),
    Channel(ChannelRef),
    Server(ServerRef),
    Everyone { token: SmolStr },
    Emoji(EmojiRef),
}

impl ResolvedRef {
    /// Text shown for the reference.
    pub fn display(&self) -> SmolStr {
        match self {
            ResolvedRef::User(user) => format_smolstr!("@{}", user.label),
            ResolvedRef::Role(role) => format_smolstr!("@{}", role.label),
            ResolvedRef::Channel(channel) => format_smolstr!("#{}", channel.label),
            ResolvedRef::Server(server) => format_smolstr!("~{}", server.label),
            ResolvedRef::Everyone { token } => format_smolstr!("@{}", token),
            ResolvedRef::Emoji(emoji) => emoji.glyph.clone(),
        }
    }
}

/// The server and channel being viewed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// `None` in direct messages.
    #[serde(default)]
    pub current_server: Option<EntityId>,
    #[serde(default)]
    pub current_channel: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub emoji_style: EmojiStyle,
    /// Render all-emoji messages at text size.
    pub no_big_emoji: bool,
    /// Nesting depth past which content renders as plain text.
    pub max_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            emoji_style: EmojiStyle::System,
            no_big_emoji: false,
            max_depth: 32,
        }
    }
}

/// Everything the renderer reads besides the content itself.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub users: &'a dyn UserDirectory,
    pub servers: &'a dyn ServerDirectory,
    pub channels: &'a dyn ChannelDirectory,
    pub scope: Scope,
    pub options: RenderOptions,
}

impl Default for RenderContext<'_> {
    fn default() -> Self {
        Self {
            users: &(),
            servers: &(),
            channels: &(),
            scope: Scope::default(),
            options: RenderOptions::default(),
        }
    }
}

impl<'a> RenderContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use one snapshot for users, servers and channels.
    pub fn with_directory(mut self, directory: &'a DirectorySnapshot) -> Self {
        self.users = directory;
        self.servers = directory;
        self.channels = directory;
        self
    }

    pub fn with_users(mut self, users: &'a dyn UserDirectory) -> Self {
        self.users = users;
        self
    }

    pub fn with_servers(mut self, servers: &'a dyn ServerDirectory) -> Self {
        self.servers = servers;
        self
    }

    pub fn with_channels(mut self, channels: &'a dyn ChannelDirectory) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }
}

/// Render message content with the standard rule table.
pub fn render(content: &str, cx: &RenderContext<'_>) -> Vec<RenderNode> {
    render_with(RuleTable::standard(), content, cx)
}

/// Render message content with a specific rule table.
pub fn render_with(table: &RuleTable, content: &str, cx: &RenderContext<'_>) -> Vec<RenderNode> {
    let scan = Scan::new(content);
    let mut out = Vec::new();
    render_window(table, &scan, Window::new(0..content.len()), cx, 0, &mut out);
    let nodes = coalesce(out);

    if tracing::enabled!(target: "chatmark::render", tracing::Level::TRACE) {
        tracing::trace!(
            target: "chatmark::render",
            content_len = content.len(),
            escapes = scan.escapes().len(),
            nodes = nodes.len(),
            "rendered message"
        );
    }
    nodes
}

fn render_window(
    table: &RuleTable,
    scan: &Scan<'_>,
    window: Window,
    cx: &RenderContext<'_>,
    depth: usize,
    out: &mut Vec<RenderNode>,
) {
    if window.is_exhausted() {
        return;
    }
    if depth >= cx.options.max_depth {
        tracing::debug!(
            target: "chatmark::render",
            depth,
            "nesting limit reached, rendering the rest as text"
        );
        out.push(RenderNode::text(scan.slice(window.range())));
        return;
    }

    let mut cursor = MatchCursor::new(table, scan, window, Mode::Render);
    let mut from = window.start;
    // post-match text is handled by looping over the same window
    while let Some((idx, m)) = cursor.next_from(from) {
        // nothing in [from, m.span.start) matches: m is the earliest match
        if m.span.start > from {
            out.push(RenderNode::text(scan.slice(from..m.span.start)));
        }
        let rule = table.rule(idx);
        let children = if rule.parse_inner(&m) {
            let mut children = Vec::new();
            render_window(table, scan, Window::new(m.inner.clone()), cx, depth + 1, &mut children);
            coalesce(children)
        } else if m.inner.is_empty() {
            Vec::new()
        } else {
            vec![RenderNode::text(scan.slice(m.inner.clone()))]
        };
        rule.render(scan, &m, children, cx, out);
        from = m.span.end;
    }
    if from < window.end {
        out.push(RenderNode::text(scan.slice(from..window.end)));
    }
}

/// Merge adjacent text nodes and drop empty ones.
fn coalesce(nodes: Vec<RenderNode>) -> Vec<RenderNode> {
    let mut out: Vec<RenderNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            RenderNode::Text(text) if text.is_empty() => {}
            RenderNode::Text(text) => match out.last_mut() {
                Some(RenderNode::Text(prev)) => prev.push_str(&text),
                _ => out.push(RenderNode::Text(text)),
            },
            node => out.push(node),
        }
    }
    out
}
