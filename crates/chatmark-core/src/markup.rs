//! Markup vocabulary shared by the decorator and the renderer.
//!
//! Every rule in the table, every decoration range and every styled render
//! node is tagged with a [`Markup`]. On the wire it is the rule's semantic
//! name (`bold`, `multicode`, `mention_user`, ...), with `mds` reserved for
//! syntax markers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, ToSmolStr, format_smolstr};

/// Semantic name of a markup construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Markup {
    /// Delimiter characters (`**`, `#`, `<color:red>`, ...).
    #[serde(rename = "mds")]
    Syntax,
    Escape,
    Bold,
    Italic,
    BoldItalic,
    Underline,
    Strikethrough,
    Spoiler,
    Code,
    #[serde(rename = "multicode")]
    CodeBlock,
    Header,
    Subheader,
    Quote,
    #[serde(rename = "list")]
    ListItem,
    Color,
    Link,
    MentionEveryone,
    MentionUser,
    MentionRole,
    MentionChannel,
    MentionServer,
    BigEmoji,
    Emoji,
}

impl Markup {
    /// Wire name of this construct.
    pub const fn as_str(self) -> &'static str {
        match self {
            Markup::Syntax => "mds",
            Markup::Escape => "escape",
            Markup::Bold => "bold",
            Markup::Italic => "italic",
            Markup::BoldItalic => "bold_italic",
            Markup::Underline => "underline",
            Markup::Strikethrough => "strikethrough",
            Markup::Spoiler => "spoiler",
            Markup::Code => "code",
            Markup::CodeBlock => "multicode",
            Markup::Header => "header",
            Markup::Subheader => "subheader",
            Markup::Quote => "quote",
            Markup::ListItem => "list",
            Markup::Color => "color",
            Markup::Link => "link",
            Markup::MentionEveryone => "mention_everyone",
            Markup::MentionUser => "mention_user",
            Markup::MentionRole => "mention_role",
            Markup::MentionChannel => "mention_channel",
            Markup::MentionServer => "mention_server",
            Markup::BigEmoji => "big_emoji",
            Markup::Emoji => "emoji",
        }
    }

    /// Whether this construct is anchored to a line (or a fenced block)
    /// rather than flowing inline.
    pub const fn is_block(self) -> bool {
        matches!(
            self,
            Markup::CodeBlock
                | Markup::Header
                | Markup::Subheader
                | Markup::Quote
                | Markup::ListItem
        )
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Small string map carried by decoration ranges and styled nodes
/// (`size` for headers, `hex` for colors, `link` for links, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<SmolStr, SmolStr>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(SmolStr::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// What a mention token points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionKind {
    User,
    Role,
    Channel,
    Server,
    Everyone,
}

impl MentionKind {
    /// Opening characters of the bracket form.
    pub const fn sigil(self) -> &'static str {
        match self {
            MentionKind::User => "<@",
            MentionKind::Role => "<@&",
            MentionKind::Channel => "<#",
            MentionKind::Server => "<~",
            MentionKind::Everyone => "@",
        }
    }

    pub const fn markup(self) -> Markup {
        match self {
            MentionKind::User => Markup::MentionUser,
            MentionKind::Role => Markup::MentionRole,
            MentionKind::Channel => Markup::MentionChannel,
            MentionKind::Server => Markup::MentionServer,
            MentionKind::Everyone => Markup::MentionEveryone,
        }
    }
}

/// An unresolved reference found in message text.
///
/// Decoration never resolves tokens; the renderer resolves them against the
/// directories in its context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MentionToken {
    pub kind: MentionKind,
    /// Digits as written (may carry a leading `-`), or `everyone`/`here`.
    pub raw_id: SmolStr,
}

impl MentionToken {
    pub fn new(kind: MentionKind, raw_id: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            raw_id: raw_id.into(),
        }
    }

    /// Numeric id, if the token carries a usable one.
    ///
    /// `-1` is the system id and is accepted; any other negative id is not.
    pub fn id(&self) -> Option<i64> {
        if self.kind == MentionKind::Everyone {
            return None;
        }
        match self.raw_id.parse::<i64>() {
            Ok(id) if id >= 0 || id == -1 => Some(id),
            _ => None,
        }
    }

    /// The literal text shown when the token can't be resolved.
    pub fn fallback(&self) -> SmolStr {
        match self.kind {
            MentionKind::Everyone => format_smolstr!("@{}", self.raw_id),
            kind => format_smolstr!("{}{}>", kind.sigil(), self.raw_id),
        }
    }
}

/// CSS color names accepted by `<color:NAME>` tags.
pub const NAMED_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue",
    "darkcyan", "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki",
    "darkmagenta", "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon",
    "darkseagreen", "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise",
    "darkviolet", "deeppink", "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick",
    "floralwhite", "forestgreen", "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod",
    "gray", "green", "greenyellow", "grey", "honeydew", "hotpink", "indianred", "indigo",
    "ivory", "khaki", "lavender", "lavenderblush", "lawngreen", "lemonchiffon", "lightblue",
    "lightcoral", "lightcyan", "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey",
    "lightpink", "lightsalmon", "lightseagreen", "lightskyblue", "lightslategray",
    "lightslategrey", "lightsteelblue", "lightyellow", "lime", "limegreen", "linen",
    "magenta", "maroon", "mediumaquamarine", "mediumblue", "mediumorchid", "mediumpurple",
    "mediumseagreen", "mediumslateblue", "mediumspringgreen", "mediumturquoise",
    "mediumvioletred", "midnightblue", "mintcream", "mistyrose", "moccasin", "navajowhite",
    "navy", "oldlace", "olive", "olivedrab", "orange", "orangered", "orchid", "palegoldenrod",
    "palegreen", "paleturquoise", "palevioletred", "papayawhip", "peachpuff", "peru", "pink",
    "plum", "powderblue", "purple", "rebeccapurple", "red", "rosybrown", "royalblue",
    "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell", "sienna", "silver",
    "skyblue", "slateblue", "slategray", "slategrey", "snow", "springgreen", "steelblue",
    "tan", "teal", "thistle", "tomato", "turquoise", "violet", "wheat", "white", "whitesmoke",
    "yellow", "yellowgreen",
];

/// Validation gate for color tags: a known color name (any case) or
/// `#RGB` / `#RRGGBB`.
pub fn is_valid_color(token: &str) -> bool {
    if let Some(hex) = token.strip_prefix('#') {
        return matches!(hex.len(), 3 | 6) && hex.bytes().all(|b| b.is_ascii_hexdigit());
    }
    let lower = token.to_ascii_lowercase();
    NAMED_COLORS.binary_search(&lower.as_str()).is_ok()
}

/// Format a packed `0xRRGGBB` color the way the host expects it.
pub fn format_color(color: u32) -> SmolStr {
    format_smolstr!("#{:06x}", color & 0x00ff_ffff)
}

/// Normalize a color token for display (`RED` -> `red`, hex kept as written).
pub fn normalize_color(token: &str) -> SmolStr {
    if token.starts_with('#') {
        token.to_smolstr()
    } else {
        token.to_ascii_lowercase().to_smolstr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_colors_sorted() {
        // binary_search depends on it
        let mut sorted = NAMED_COLORS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, NAMED_COLORS);
    }

    #[test]
    fn test_valid_colors() {
        assert!(is_valid_color("red"));
        assert!(is_valid_color("Red"));
        assert!(is_valid_color("green"));
        assert!(is_valid_color("#fff"));
        assert!(is_valid_color("#FF0000"));
        assert!(!is_valid_color("bogus"));
        assert!(!is_valid_color("#ff00"));
        assert!(!is_valid_color("#ggg"));
        assert!(!is_valid_color("#"));
    }

    #[test]
    fn test_format_color() {
        assert_eq!(format_color(0xff0000), "#ff0000");
        assert_eq!(format_color(0x00ff), "#0000ff");
    }

    #[test]
    fn test_markup_wire_names() {
        assert_eq!(
            serde_json::to_string(&Markup::Syntax).unwrap(),
            "\"mds\""
        );
        assert_eq!(
            serde_json::to_string(&Markup::CodeBlock).unwrap(),
            "\"multicode\""
        );
        assert_eq!(
            serde_json::to_string(&Markup::MentionUser).unwrap(),
            "\"mention_user\""
        );
        assert_eq!(Markup::ListItem.as_str(), "list");
    }

    #[test]
    fn test_mention_token_ids() {
        assert_eq!(MentionToken::new(MentionKind::User, "42").id(), Some(42));
        assert_eq!(MentionToken::new(MentionKind::User, "-1").id(), Some(-1));
        assert_eq!(MentionToken::new(MentionKind::User, "-5").id(), None);
        assert_eq!(
            MentionToken::new(MentionKind::User, "99999999999999999999999").id(),
            None
        );
    }

    #[test]
    fn test_mention_fallback() {
        assert_eq!(MentionToken::new(MentionKind::User, "7").fallback(), "<@7>");
        assert_eq!(MentionToken::new(MentionKind::Role, "7").fallback(), "<@&7>");
        assert_eq!(MentionToken::new(MentionKind::Channel, "7").fallback(), "<#7>");
        assert_eq!(MentionToken::new(MentionKind::Server, "7").fallback(), "<~7>");
        assert_eq!(
            MentionToken::new(MentionKind::Everyone, "here").fallback(),
            "@here"
        );
    }
}
