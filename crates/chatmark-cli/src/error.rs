use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("failed to read {}", path.display())]
    #[diagnostic(code(chatmark::io::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read message from stdin")]
    #[diagnostic(code(chatmark::io::stdin))]
    Stdin(#[source] std::io::Error),

    #[error("invalid JSON in {}", path.display())]
    #[diagnostic(code(chatmark::config::json))]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid TOML in {}", path.display())]
    #[diagnostic(code(chatmark::config::toml))]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cursor {cursor} is past the end of the message ({len} chars)")]
    #[diagnostic(
        code(chatmark::suggest::cursor),
        help("cursor positions count chars, not bytes")
    )]
    CursorOutOfRange { cursor: usize, len: usize },
}
