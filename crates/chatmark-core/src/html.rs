//! HTML output for rendered messages.

use std::fmt::Write;

use crate::markup::{Attributes, Markup};
use crate::render::{EmojiRef, EmojiSize, EmojiStyle, RenderNode, ResolvedRef};

pub struct HtmlWriter<W: Write> {
    writer: W,
}

impl<W: Write> HtmlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn write_nodes(&mut self, nodes: &[RenderNode]) -> std::fmt::Result {
        for node in nodes {
            self.write_node(node)?;
        }
        Ok(())
    }

    pub fn write_node(&mut self, node: &RenderNode) -> std::fmt::Result {
        match node {
            RenderNode::Text(text) => self.write_text(text),
            RenderNode::Styled {
                kind,
                attributes,
                children,
            } => {
                self.start_styled(*kind, attributes)?;
                self.write_nodes(children)?;
                self.end_styled(*kind)
            }
            RenderNode::Void { reference, .. } => self.write_void(reference),
        }
    }

    fn write_text(&mut self, text: &str) -> std::fmt::Result {
        for c in text.chars() {
            match c {
                '&' => self.writer.write_str("&amp;")?,
                '<' => self.writer.write_str("&lt;")?,
                '>' => self.writer.write_str("&gt;")?,
                _ => self.writer.write_char(c)?,
            }
        }
        Ok(())
    }

    fn write_attr(&mut self, value: &str) -> std::fmt::Result {
        for c in value.chars() {
            match c {
                '&' => self.writer.write_str("&amp;")?,
                '<' => self.writer.write_str("&lt;")?,
                '>' => self.writer.write_str("&gt;")?,
                '"' => self.writer.write_str("&quot;")?,
                _ => self.writer.write_char(c)?,
            }
        }
        Ok(())
    }

    fn start_styled(&mut self, kind: Markup, attributes: &Attributes) -> std::fmt::Result {
        match kind {
            Markup::Bold => write!(self.writer, "<b>"),
            Markup::Italic => write!(self.writer, "<i>"),
            Markup::BoldItalic => write!(self.writer, "<b><i>"),
            Markup::Underline => write!(self.writer, "<u>"),
            Markup::Strikethrough => write!(self.writer, "<s>"),
            Markup::Code => write!(self.writer, "<code>"),
            Markup::CodeBlock => {
                write!(self.writer, "<pre><code")?;
                if let Some(lang) = attributes.get("lang") {
                    write!(self.writer, " class=\"language-")?;
                    self.write_attr(lang)?;
                    write!(self.writer, "\"")?;
                }
                write!(self.writer, ">")
            }
            Markup::Header => {
                let size = attributes.get("size").unwrap_or("1");
                write!(self.writer, "<span class=\"h")?;
                self.write_attr(size)?;
                write!(self.writer, "\">")
            }
            Markup::Color => {
                write!(self.writer, "<span style=\"color: ")?;
                self.write_attr(attributes.get("hex").unwrap_or("inherit"))?;
                write!(self.writer, "\">")
            }
            Markup::Link => {
                write!(self.writer, "<a target=\"_blank\" href=\"")?;
                for c in attributes.get("link").unwrap_or_default().chars() {
                    match c {
                        '"' => self.writer.write_str("%22")?,
                        '&' => self.writer.write_str("&amp;")?,
                        _ => self.writer.write_char(c)?,
                    }
                }
                write!(self.writer, "\">")
            }
            Markup::BigEmoji => write!(self.writer, "<span class=\"big-emoji\">"),
            other => write!(self.writer, "<span class=\"{}\">", css_class(other)),
        }
    }

    fn end_styled(&mut self, kind: Markup) -> std::fmt::Result {
        match kind {
            Markup::Bold => write!(self.writer, "</b>"),
            Markup::Italic => write!(self.writer, "</i>"),
            Markup::BoldItalic => write!(self.writer, "</i></b>"),
            Markup::Underline => write!(self.writer, "</u>"),
            Markup::Strikethrough => write!(self.writer, "</s>"),
            Markup::Code => write!(self.writer, "</code>"),
            Markup::CodeBlock => write!(self.writer, "</code></pre>"),
            Markup::Link => write!(self.writer, "</a>"),
            _ => write!(self.writer, "</span>"),
        }
    }

    fn write_void(&mut self, reference: &ResolvedRef) -> std::fmt::Result {
        match reference {
            ResolvedRef::User(user) => {
                write!(self.writer, "<span class=\"mention int\" data-user=\"{}\"", user.id)?;
                if user.color.is_some() || user.font.is_some() {
                    write!(self.writer, " style=\"")?;
                    if let Some(font) = &user.font {
                        write!(self.writer, "font-family: ")?;
                        self.write_attr(font)?;
                        write!(self.writer, ";")?;
                    }
                    if let Some(color) = &user.color {
                        write!(self.writer, "--special-mention-color: ")?;
                        self.write_attr(color)?;
                        write!(self.writer, ";")?;
                    }
                    write!(self.writer, "\"")?;
                }
                write!(self.writer, ">")?;
            }
            ResolvedRef::Role(role) => {
                write!(self.writer, "<span class=\"mention int\" data-role=\"{}\"", role.id)?;
                if let Some(color) = &role.color {
                    write!(self.writer, " style=\"--special-mention-color: ")?;
                    self.write_attr(color)?;
                    write!(self.writer, ";\"")?;
                }
                write!(self.writer, ">")?;
            }
            ResolvedRef::Channel(channel) => {
                write!(
                    self.writer,
                    "<span class=\"mention int{}\" data-channel=\"{}\" data-channel-type=\"{}\">",
                    if channel.is_current { " current" } else { "" },
                    channel.id,
                    channel.channel_type.code()
                )?;
            }
            ResolvedRef::Server(server) => {
                write!(self.writer, "<span class=\"mention int\" data-server=\"{}\">", server.id)?;
            }
            ResolvedRef::Everyone { .. } => write!(self.writer, "<span class=\"mention int\">")?,
            ResolvedRef::Emoji(emoji) => return self.write_emoji(emoji),
        }
        self.write_text(&reference.display())?;
        write!(self.writer, "</span>")
    }

    fn write_emoji(&mut self, emoji: &EmojiRef) -> std::fmt::Result {
        let class = match emoji.size {
            EmojiSize::Inline => "emoji-text",
            EmojiSize::Big => "emoji-big",
        };
        match emoji.style {
            EmojiStyle::System => write!(self.writer, "<span class=\"{}-system\">", class)?,
            EmojiStyle::Image => {
                write!(self.writer, "<span class=\"{}\" data-codepoints=\"", class)?;
                for (i, c) in emoji.glyph.chars().filter(|c| *c != '\u{fe0f}').enumerate() {
                    if i > 0 {
                        self.writer.write_char('-')?;
                    }
                    write!(self.writer, "{:x}", c as u32)?;
                }
                write!(self.writer, "\">")?;
            }
        }
        self.write_text(&emoji.glyph)?;
        write!(self.writer, "</span>")
    }
}

fn css_class(kind: Markup) -> &'static str {
    match kind {
        Markup::Spoiler => "spoiler",
        Markup::Subheader => "subheader",
        Markup::Quote => "quote",
        Markup::ListItem => "list",
        other => other.as_str(),
    }
}

/// Render nodes as an HTML fragment.
pub fn to_html(nodes: &[RenderNode]) -> Result<String, std::fmt::Error> {
    let mut output = HtmlWriter::new(String::new());
    output.write_nodes(nodes)?;
    Ok(output.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DirectorySnapshot, User};
    use crate::render::{RenderContext, RenderOptions, render};

    fn html(content: &str) -> String {
        to_html(&render(content, &RenderContext::default())).unwrap()
    }

    #[test]
    fn test_escapes_text() {
        assert_eq!(html("a < b & c"), "a &lt; b &amp; c");
    }

    #[test]
    fn test_inline_styles() {
        assert_eq!(
            html("**a *b*** __u__ ~~s~~ ||x||"),
            "<b>a <i>b</i></b> <u>u</u> <s>s</s> <span class=\"spoiler\">x</span>"
        );
    }

    #[test]
    fn test_link_and_color() {
        assert_eq!(
            html("[hi](https://a.com/?q=\"x\")"),
            "<a target=\"_blank\" href=\"https://a.com/?q=%22x%22\">hi</a>"
        );
        assert_eq!(
            html("<c:red>r</c>"),
            "<span style=\"color: red\">r</span>"
        );
    }

    #[test]
    fn test_blocks() {
        assert_eq!(html("# t"), "<span class=\"h1\">t</span>");
        assert_eq!(
            html("```rs\n<x>\n```"),
            "<pre><code class=\"language-rs\">&lt;x&gt;\n</code></pre>"
        );
    }

    #[test]
    fn test_mentions() {
        let dir = DirectorySnapshot::default().with_user(User::new(7, "al"));
        let cx = RenderContext::default().with_directory(&dir);
        let out = to_html(&render("<@7> <@8>", &cx)).unwrap();
        assert_eq!(
            out,
            "<span class=\"mention int\" data-user=\"7\">@al</span> &lt;@8&gt;"
        );
    }

    #[test]
    fn test_emoji_styles() {
        assert_eq!(
            html("🔥"),
            "<span class=\"big-emoji\"><span class=\"emoji-big-system\">🔥</span></span>"
        );
        let cx = RenderContext::default().with_options(RenderOptions {
            emoji_style: EmojiStyle::Image,
            ..RenderOptions::default()
        });
        assert_eq!(
            to_html(&render("a ❤️", &cx)).unwrap(),
            "a <span class=\"emoji-text\" data-codepoints=\"2764\">❤️</span>"
        );
    }
}
