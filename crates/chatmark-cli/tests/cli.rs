use std::path::PathBuf;
use std::process::{Command, Output};

fn chatmark(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chatmark"))
        .args(args)
        .env("RUST_LOG", "off")
        .env_remove("CHATMARK_CONFIG")
        .output()
        .expect("failed to run chatmark")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "chatmark failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn fixture(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("chatmark-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

const DIRECTORY: &str = r#"{
    "users": [
        {"id": 42, "username": "al"},
        {"id": 7, "username": "bea", "display_name": "Alberta"}
    ],
    "servers": [{"id": 1, "name": "home"}],
    "channels": [{"id": 5, "name": "general", "channel_type": "text"}]
}"#;

#[test]
fn test_decorate_prints_ranges() {
    let out = stdout(&chatmark(&["decorate", "a **b**"]));
    let ranges: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(
        ranges,
        serde_json::json!([
            {"anchor": 2, "focus": 4, "type": "mds"},
            {"anchor": 5, "focus": 7, "type": "mds"},
            {"anchor": 4, "focus": 5, "type": "bold"}
        ])
    );
}

#[test]
fn test_decorate_with_spans() {
    let out = stdout(&chatmark(&["decorate", "--spans", "*i*"]));
    let decoration: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(decoration["syntax_spans"].as_array().unwrap().len(), 2);
    assert_eq!(decoration["syntax_spans"][0]["syn_id"], "s0");
}

#[test]
fn test_render_text_and_html() {
    let dir = fixture("directory.json", DIRECTORY);
    let dir = dir.to_str().unwrap();

    let text = stdout(&chatmark(&[
        "render", "--format", "text", "--directory", dir, "hi <@42> in <#5> <@9>",
    ]));
    assert_eq!(text.trim_end(), "hi @al in #general <@9>");

    let html = stdout(&chatmark(&["render", "--format", "html", "**b** & <c:red>r</c>"]));
    assert_eq!(
        html.trim_end(),
        "<b>b</b> &amp; <span style=\"color: red\">r</span>"
    );
}

#[test]
fn test_render_json_escapes() {
    let out = stdout(&chatmark(&["render", r"\*\*bold\*\*"]));
    let nodes: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(nodes, serde_json::json!([{"text": "**bold**"}]));
}

#[test]
fn test_render_reads_config() {
    let config = fixture("config.toml", "no_big_emoji = true\n");
    let out = stdout(&chatmark(&[
        "--config",
        config.to_str().unwrap(),
        "render",
        "--format",
        "html",
        "🔥",
    ]));
    assert_eq!(out.trim_end(), "<span class=\"emoji-text-system\">🔥</span>");
}

#[test]
fn test_suggest() {
    let dir = fixture("suggest.json", DIRECTORY);
    let out = stdout(&chatmark(&[
        "suggest",
        "--directory",
        dir.to_str().unwrap(),
        "hey @al",
    ]));
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["query"]["query"], "al");
    assert_eq!(
        value["users"],
        serde_json::json!([{"id": 7, "label": "Alberta"}, {"id": 42, "label": "al"}])
    );
}

#[test]
fn test_suggest_cursor_past_end_fails() {
    let output = chatmark(&["suggest", "--cursor", "99", "@al"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("past the end"), "{stderr}");
}

#[test]
fn test_bad_config_reports_path() {
    let config = fixture("broken.json", "{not json");
    let output = chatmark(&["--config", config.to_str().unwrap(), "decorate", "x"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("broken.json"), "{stderr}");
}
