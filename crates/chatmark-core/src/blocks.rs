//! Block layout of a composer buffer.
//!
//! Hosts hand over their document as a list of block texts. The engine
//! decorates them as one buffer joined with a single `\n`, and keeps each
//! block's char range and content hash so offset mapping can tell when the
//! live document has moved on from the snapshot.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::ops::Range;

use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};

/// One block of the joined buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpan {
    /// Stable positional ID (format: `b-{index}`)
    pub id: SmolStr,
    pub index: usize,
    /// Char range in the joined buffer, excluding the separator.
    pub char_range: Range<usize>,
    /// Hash of the block text for quick change detection.
    pub source_hash: u64,
}

impl BlockSpan {
    pub fn contains_char(&self, offset: usize) -> bool {
        self.char_range.contains(&offset)
    }

    pub fn char_len(&self) -> usize {
        self.char_range.len()
    }
}

/// Simple hash function for source text comparison.
pub fn hash_source(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

pub fn make_block_id(index: usize) -> SmolStr {
    format_smolstr!("b-{}", index)
}

/// Join block texts with `\n` and describe where each block landed.
pub fn join_blocks<S: AsRef<str>>(blocks: &[S]) -> (String, Vec<BlockSpan>) {
    let mut text = String::new();
    let mut spans = Vec::with_capacity(blocks.len());
    let mut offset = 0;
    for (index, block) in blocks.iter().enumerate() {
        let block = block.as_ref();
        if index > 0 {
            text.push('\n');
            offset += 1;
        }
        let len = block.chars().count();
        text.push_str(block);
        spans.push(BlockSpan {
            id: make_block_id(index),
            index,
            char_range: offset..offset + len,
            source_hash: hash_source(block),
        });
        offset += len;
    }
    (text, spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_source() {
        let h1 = hash_source("hello world");
        let h2 = hash_source("hello world");
        let h3 = hash_source("hello world!");

        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_make_block_id() {
        assert_eq!(make_block_id(0), "b-0");
        assert_eq!(make_block_id(42), "b-42");
    }

    #[test]
    fn test_join_blocks() {
        let (text, spans) = join_blocks(&["ab", "", "🔥c"]);
        assert_eq!(text, "ab\n\n🔥c");
        assert_eq!(spans[0].char_range, 0..2);
        assert_eq!(spans[1].char_range, 3..3);
        assert_eq!(spans[2].char_range, 4..6);
        assert!(spans[2].contains_char(5));
        assert!(!spans[2].contains_char(6));
        assert_eq!(spans[2].source_hash, hash_source("🔥c"));
    }

    #[test]
    fn test_join_no_blocks() {
        let (text, spans) = join_blocks::<&str>(&[]);
        assert!(text.is_empty());
        assert!(spans.is_empty());
    }
}
