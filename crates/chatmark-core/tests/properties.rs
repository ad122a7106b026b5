//! Invariants over an adversarial corpus.

use chatmark_core::{RenderContext, RenderNode, decorate, render, to_plain_text};

fn corpus() -> Vec<String> {
    let mut corpus: Vec<String> = [
        "",
        "*",
        "**",
        "***",
        "****",
        "_",
        "__",
        "~",
        "||",
        "`",
        "```",
        "````",
        "```\n",
        "```rs",
        "\\",
        "\\\\",
        "\\*",
        "#",
        "# ",
        "-#",
        "-# x",
        "> ",
        ">",
        "- ",
        "<",
        "<c:",
        "<c:red>",
        "</c>",
        "<color:#ff>x</color>",
        "<color:#ff0000>x</c>",
        "<@",
        "<@>",
        "<@-1>",
        "<@-2>",
        "<@&>",
        "<#",
        "<~1",
        "@",
        "@everyone",
        "x@here",
        "[",
        "[](",
        "[x](https://",
        "https://",
        "https://.",
        "🔥",
        "🔥\u{fe0f}",
        "👍🏽",
        "👩\u{200d}💻",
        "\u{fe0f}",
        "**a *b* c**",
        "*a **b** c*",
        "***a** b*",
        "**a __b** c__",
        "`a **b` c**",
        "> # deep\n> - *list*",
        "é**ü**ß",
        "a\r\n**b**\r\n",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    corpus.push("*".repeat(10_000));
    corpus.push("_".repeat(5_000));
    corpus.push("`".repeat(3_001));
    corpus.push("\\".repeat(4_001));
    corpus.push("**a".repeat(2_000));
    corpus.push("<c:red>".repeat(1_000));
    corpus.push("[x](".repeat(1_000));
    corpus.push("> ".repeat(500) + "x");
    corpus.push("**".repeat(200) + "x" + &"**".repeat(200));
    corpus.push("🔥".repeat(64));
    corpus.push("🔥".repeat(65));

    // multibyte chars right after and before every delimiter
    let delimiters = [
        "```", "`", "*", "**", "***", "_", "__", "~~", "||", "# ", "> ", "<c:", "<@", "\\",
    ];
    for delim in delimiters {
        for ch in ["é", "🔥", "\u{200d}", "日本"] {
            corpus.push(format!("{delim}{ch}"));
            corpus.push(format!("{delim}{ch}{delim}"));
            corpus.push(format!("{ch}{delim}{ch}\n{delim}"));
        }
    }
    corpus
}

#[test]
fn test_ranges_stay_in_bounds() {
    for text in corpus() {
        let len = text.chars().count();
        for range in decorate(&text) {
            assert!(
                range.anchor <= range.focus && range.focus <= len,
                "{range:?} out of bounds for {:?}",
                text.chars().take(40).collect::<String>()
            );
        }
    }
}

#[test]
fn test_decorate_is_deterministic() {
    for text in corpus() {
        assert_eq!(decorate(&text), decorate(&text));
    }
}

#[test]
fn test_render_never_drops_plain_text() {
    // with no directory, every visible char comes from the source, and
    // unmatched input survives verbatim
    let cx = RenderContext::default();
    for text in corpus() {
        let nodes = render(&text, &cx);
        assert!(to_plain_text(&nodes).chars().count() <= text.chars().count());
        assert_eq!(render(&text, &cx), nodes);
    }
}

#[test]
fn test_no_adjacent_text_nodes() {
    fn check(nodes: &[RenderNode]) {
        for pair in nodes.windows(2) {
            assert!(
                !matches!(pair, [RenderNode::Text(_), RenderNode::Text(_)]),
                "adjacent text nodes: {pair:?}"
            );
        }
        for node in nodes {
            check(node.children());
        }
    }
    let cx = RenderContext::default();
    for text in corpus() {
        check(&render(&text, &cx));
    }
}

#[test]
fn test_big_emoji_limit() {
    let cx = RenderContext::default();
    let big = render(&"🔥".repeat(64), &cx);
    assert_eq!(big.len(), 1);
    assert_eq!(big[0].children().len(), 64);

    let inline = render(&"🔥".repeat(65), &cx);
    assert_eq!(inline.len(), 65);
}
