//! Mention suggestions for the composer.
//!
//! Typing `@al` with the cursor right after it opens a suggestion list of
//! users whose display name starts with `al`. Picking one replaces the query
//! with a `<@id>` token.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, ToSmolStr, format_smolstr};

use crate::directory::{User, display_name};

/// Most suggestions shown at once.
pub const SUGGESTION_LIMIT: usize = 10;

/// Text selection with anchor and head positions, in chars.
///
/// The anchor is where the selection started, the head is where the cursor is now.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    pub fn to_range(&self) -> Range<usize> {
        self.start()..self.end()
    }
}

/// An `@word` being typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionQuery {
    /// The word after `@`.
    pub query: SmolStr,
    /// Char range of `@word`, replaced on completion.
    pub range: Range<usize>,
}

fn is_query_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// The mention query ending at the cursor, if any.
///
/// The selection must be collapsed, the cursor must sit right after `@word`
/// and be followed by whitespace or the end of the text. The `@` must start
/// the text or follow whitespace.
pub fn mention_query(text: &str, selection: Selection) -> Option<MentionQuery> {
    if !selection.is_collapsed() {
        return None;
    }
    let chars: Vec<char> = text.chars().collect();
    let cursor = selection.head;
    if cursor > chars.len() {
        return None;
    }
    if chars.get(cursor).is_some_and(|c| !c.is_whitespace()) {
        return None;
    }

    let word_start = chars[..cursor]
        .iter()
        .rposition(|c| !is_query_char(*c))
        .map(|i| i + 1)
        .unwrap_or(0);
    if word_start == cursor || word_start == 0 || chars[word_start - 1] != '@' {
        return None;
    }
    let at = word_start - 1;
    if at > 0 && !chars[at - 1].is_whitespace() {
        return None;
    }

    Some(MentionQuery {
        query: chars[word_start..cursor].iter().collect::<String>().to_smolstr(),
        range: at..cursor,
    })
}

/// Users whose display name starts with `query`, ignoring case.
///
/// An empty query suggests nobody.
pub fn suggest_users<'u>(
    users: impl IntoIterator<Item = &'u User>,
    query: &str,
    limit: usize,
) -> Vec<&'u User> {
    if query.is_empty() {
        return Vec::new();
    }
    let query = query.to_lowercase();
    users
        .into_iter()
        .filter(|user| display_name(user, None).to_lowercase().starts_with(&query))
        .take(limit)
        .collect()
}

/// Replace the query with a mention token for `user`.
///
/// Returns the new text and the cursor position (chars) after the token.
pub fn complete_mention(text: &str, query: &MentionQuery, user: &User) -> (String, usize) {
    let token = format_smolstr!("<@{}>", user.id);
    let mut out = String::with_capacity(text.len() + token.len());
    let mut chars = text.chars();
    out.extend(chars.by_ref().take(query.range.start));
    out.push_str(&token);
    out.extend(chars.skip(query.range.len()));
    let cursor = query.range.start + token.chars().count();
    (out, cursor)
}

/// Open suggestion list with a highlighted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestions<'u> {
    pub query: MentionQuery,
    pub users: Vec<&'u User>,
    pub index: usize,
}

impl<'u> Suggestions<'u> {
    /// `None` when nothing matches; the list is only shown with results.
    pub fn open(
        query: MentionQuery,
        users: impl IntoIterator<Item = &'u User>,
    ) -> Option<Self> {
        let users = suggest_users(users, &query.query, SUGGESTION_LIMIT);
        if users.is_empty() {
            return None;
        }
        Some(Self {
            query,
            users,
            index: 0,
        })
    }

    pub fn select_next(&mut self) {
        self.index = (self.index + 1) % self.users.len();
    }

    pub fn select_prev(&mut self) {
        self.index = (self.index + self.users.len() - 1) % self.users.len();
    }

    pub fn selected(&self) -> &'u User {
        self.users[self.index]
    }

    /// Complete with the highlighted user.
    pub fn accept(&self, text: &str) -> (String, usize) {
        complete_mention(text, &self.query, self.selected())
    }
}

/// Drops suggestion results computed for outdated input.
///
/// Each keystroke takes a [`Ticket`]; a lookup that finishes after a newer
/// ticket was issued is discarded.
#[derive(Debug, Default)]
pub struct SuggestionGate {
    latest: AtomicU64,
}

/// Generation marker handed out by [`SuggestionGate::issue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl SuggestionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    /// `results` if `ticket` is still the latest, otherwise `None`.
    pub fn accept<T>(&self, ticket: Ticket, results: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(results)
        } else {
            tracing::trace!(
                target: "chatmark::suggest",
                ticket = ticket.0,
                latest = self.latest.load(Ordering::Acquire),
                "dropping stale suggestions"
            );
            None
        }
    }
}
