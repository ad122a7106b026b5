use miette::Diagnostic;
use thiserror::Error;

/// Why a leaf could not be mapped onto the decorated buffer.
///
/// These come from transient host state (a path into a node that was just
/// removed, a block edited after the snapshot was taken). The public mapping
/// functions log them and return no ranges.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum MapError {
    #[error("leaf path is empty")]
    #[diagnostic(code(chatmark::offset::empty_path))]
    EmptyPath,

    #[error("block {index} out of range ({len} blocks)")]
    #[diagnostic(code(chatmark::offset::block_out_of_range))]
    BlockOutOfRange { index: usize, len: usize },

    #[error("child {index} out of range at depth {depth} ({len} children)")]
    #[diagnostic(code(chatmark::offset::child_out_of_range))]
    ChildOutOfRange {
        depth: usize,
        index: usize,
        len: usize,
    },

    #[error("node at path {path:?} is not a text leaf")]
    #[diagnostic(code(chatmark::offset::not_text))]
    NotText { path: Vec<usize> },

    #[error("block {index} changed since decoration snapshot {generation}")]
    #[diagnostic(
        code(chatmark::offset::stale_block),
        help("decorate the document again before mapping leaves")
    )]
    StaleBlock { index: usize, generation: u64 },
}
