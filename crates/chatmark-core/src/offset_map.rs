//! Mapping decoration ranges onto the host editor's text leaves.
//!
//! The decorator works on one buffer: the host's blocks joined with `\n`.
//! Editors ask for ranges one text leaf at a time, addressed by a path
//! `[block, child, grandchild, ...]`. The leaf's global start is the length of
//! every earlier block plus one separator each, plus the text length of every
//! earlier sibling on the way down.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::blocks::hash_source;
use crate::decorate::{DecorationRange, DecorationSnapshot};
use crate::error::MapError;
use crate::markup::{Attributes, Markup};

/// A node of the host editor's document tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorNode {
    Text {
        text: String,
    },
    Element {
        kind: SmolStr,
        #[serde(default)]
        children: Vec<EditorNode>,
    },
}

impl EditorNode {
    pub fn text(text: impl Into<String>) -> Self {
        EditorNode::Text { text: text.into() }
    }

    pub fn element(kind: impl Into<SmolStr>, children: Vec<EditorNode>) -> Self {
        EditorNode::Element {
            kind: kind.into(),
            children,
        }
    }

    /// A paragraph holding a single text leaf.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::element("paragraph", vec![Self::text(text)])
    }

    /// Text length in chars.
    pub fn char_len(&self) -> usize {
        match self {
            EditorNode::Text { text } => text.chars().count(),
            EditorNode::Element { children, .. } => children.iter().map(Self::char_len).sum(),
        }
    }

    /// Concatenated text of all leaves.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        match self {
            EditorNode::Text { text } => out.push_str(text),
            EditorNode::Element { children, .. } => {
                for child in children {
                    child.push_text(out);
                }
            }
        }
    }

    pub fn children(&self) -> &[EditorNode] {
        match self {
            EditorNode::Text { .. } => &[],
            EditorNode::Element { children, .. } => children,
        }
    }
}

/// A decoration range relative to one leaf, in chars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafRange {
    pub anchor: usize,
    pub focus: usize,
    #[serde(rename = "type")]
    pub kind: Markup,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl LeafRange {
    pub fn range(&self) -> Range<usize> {
        self.anchor..self.focus
    }
}

/// Global char range covered by the text leaf at `path`.
pub fn leaf_range(blocks: &[EditorNode], path: &[usize]) -> Result<Range<usize>, MapError> {
    let (&block_index, rest) = path.split_first().ok_or(MapError::EmptyPath)?;
    let block = blocks.get(block_index).ok_or(MapError::BlockOutOfRange {
        index: block_index,
        len: blocks.len(),
    })?;
    let block_start = blocks[..block_index]
        .iter()
        .map(EditorNode::char_len)
        .sum::<usize>()
        + block_index;
    range_in_block(block, block_start, rest, path)
}

/// Walk `rest` down from a block starting at `block_start`.
fn range_in_block(
    block: &EditorNode,
    block_start: usize,
    rest: &[usize],
    path: &[usize],
) -> Result<Range<usize>, MapError> {
    let mut start = block_start;
    let mut node = block;
    for (depth, &index) in rest.iter().enumerate() {
        let children = node.children();
        let child = children.get(index).ok_or(MapError::ChildOutOfRange {
            depth: depth + 1,
            index,
            len: children.len(),
        })?;
        start += children[..index].iter().map(EditorNode::char_len).sum::<usize>();
        node = child;
    }

    match node {
        EditorNode::Text { text } => Ok(start..start + text.chars().count()),
        EditorNode::Element { .. } => Err(MapError::NotText {
            path: path.to_vec(),
        }),
    }
}

/// Leaf-local pieces of `ranges` for the text leaf at `path`.
pub fn try_map_leaf(
    blocks: &[EditorNode],
    path: &[usize],
    ranges: &[DecorationRange],
) -> Result<Vec<LeafRange>, MapError> {
    let leaf = leaf_range(blocks, path)?;
    Ok(intersect(leaf, ranges))
}

/// Like [`try_map_leaf`], but a leaf that can't be mapped gets no ranges.
pub fn map_leaf(
    blocks: &[EditorNode],
    path: &[usize],
    ranges: &[DecorationRange],
) -> Vec<LeafRange> {
    try_map_leaf(blocks, path, ranges).unwrap_or_else(|err| {
        tracing::debug!(target: "chatmark::offset", ?path, %err, "leaf not mapped");
        Vec::new()
    })
}

/// Map a leaf against a captured snapshot.
///
/// Every live block must still match the snapshot's text, since a range in
/// one block can depend on delimiters in another. The leaf is placed by the
/// snapshot's block offsets.
pub fn try_map_leaf_in(
    snapshot: &DecorationSnapshot,
    blocks: &[EditorNode],
    path: &[usize],
) -> Result<Vec<LeafRange>, MapError> {
    let (&block_index, rest) = path.split_first().ok_or(MapError::EmptyPath)?;
    if let Some(index) = first_stale_block(snapshot, blocks) {
        return Err(MapError::StaleBlock {
            index,
            generation: snapshot.generation,
        });
    }
    let (Some(block), Some(captured)) = (blocks.get(block_index), snapshot.block(block_index))
    else {
        return Err(MapError::BlockOutOfRange {
            index: block_index,
            len: blocks.len(),
        });
    };
    let leaf = range_in_block(block, captured.char_range.start, rest, path)?;
    Ok(intersect(leaf, snapshot.ranges()))
}

/// First block whose text differs from the snapshot. A block count change
/// reports the first index past the shorter side.
fn first_stale_block(snapshot: &DecorationSnapshot, blocks: &[EditorNode]) -> Option<usize> {
    let changed = blocks.iter().zip(&snapshot.blocks).position(|(live, captured)| {
        live.char_len() != captured.char_len()
            || hash_source(&live.plain_text()) != captured.source_hash
    });
    match changed {
        Some(index) => Some(index),
        None if blocks.len() != snapshot.blocks.len() => {
            Some(blocks.len().min(snapshot.blocks.len()))
        }
        None => None,
    }
}

pub fn map_leaf_in(
    snapshot: &DecorationSnapshot,
    blocks: &[EditorNode],
    path: &[usize],
) -> Vec<LeafRange> {
    try_map_leaf_in(snapshot, blocks, path).unwrap_or_else(|err| {
        tracing::debug!(
            target: "chatmark::offset",
            ?path,
            generation = snapshot.generation,
            %err,
            "leaf not mapped against snapshot"
        );
        Vec::new()
    })
}

fn intersect(leaf: Range<usize>, ranges: &[DecorationRange]) -> Vec<LeafRange> {
    ranges
        .iter()
        .filter_map(|r| {
            let start = r.anchor.max(leaf.start);
            let end = r.focus.min(leaf.end);
            (start < end).then(|| LeafRange {
                anchor: start - leaf.start,
                focus: end - leaf.start,
                kind: r.kind,
                attributes: r.attributes.clone(),
            })
        })
        .collect()
}
