//! chatmark-core: rich-text markup for chat messages.
//!
//! One ordered rule table drives two consumers:
//! - [`decorate`] highlights raw markup in an editable buffer as char ranges
//! - [`render`] turns finalized content into a tree of [`RenderNode`]s,
//!   resolving mentions against injected directories
//!
//! Around those sit the pieces an editor host needs: mapping ranges onto its
//! text leaves ([`offset_map`], [`leaf`]), marker visibility ([`syntax`]),
//! caching ([`render_cache`]) and mention suggestions ([`suggest`]).

pub mod blocks;
pub mod decorate;
pub mod directory;
pub mod error;
pub mod html;
pub mod leaf;
pub mod markup;
pub mod offset_map;
pub mod render;
pub mod render_cache;
pub mod rules;
pub mod scan;
pub mod suggest;
pub mod syntax;
pub mod text;

pub use blocks::{BlockSpan, hash_source, join_blocks, make_block_id};
pub use decorate::{
    Decoration, DecorationRange, DecorationSnapshot, decorate, decorate_full, decorate_with,
};
pub use directory::{
    Channel, ChannelDirectory, ChannelType, DirectorySnapshot, EntityId, Member, Role, Server,
    ServerDirectory, User, UserDirectory,
};
pub use error::MapError;
pub use html::{HtmlWriter, to_html};
pub use leaf::{LeafSegment, MarkSet, segment_leaf};
pub use markup::{Attributes, Markup, MentionKind, MentionToken};
pub use offset_map::{EditorNode, LeafRange, map_leaf, map_leaf_in, try_map_leaf};
pub use render::{
    EmojiStyle, RenderContext, RenderNode, RenderOptions, ResolvedRef, Scope, render,
    render_with, to_plain_text,
};
pub use render_cache::DecorationCache;
pub use rules::{Mode, Rule, RuleTable};
pub use smol_str::SmolStr;
pub use suggest::{
    MentionQuery, SUGGESTION_LIMIT, Selection, SuggestionGate, Suggestions, Ticket,
    complete_mention, mention_query, suggest_users,
};
pub use syntax::{SyntaxSpanInfo, SyntaxType, visible_syntax};
pub use text::{CharOffsets, SourceText};
