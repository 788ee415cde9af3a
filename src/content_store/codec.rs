//! Block codec: splitting document text into fixed-length character blocks
//! and compressing each block independently with zstd.
//!
//! Blocks are compressed as separate zstd frames so a substring read only
//! has to decompress the blocks that overlap it.

use crate::error::{Result, TesseraError};

/// Maximum UTF-8 width of a single `char`.
const MAX_UTF8_BYTES_PER_CHAR: usize = 4;

/// Compresses and decompresses individual blocks.
#[derive(Debug, Clone, Copy)]
pub struct BlockCodec {
    level: i32,
    block_size_chars: usize,
}

impl BlockCodec {
    pub fn new(level: i32, block_size_chars: usize) -> Self {
        BlockCodec {
            level,
            block_size_chars,
        }
    }

    pub fn block_size_chars(&self) -> usize {
        self.block_size_chars
    }

    /// Compress one block of text.
    pub fn encode(&self, block: &str) -> Result<Vec<u8>> {
        Ok(zstd::bulk::compress(block.as_bytes(), self.level)?)
    }

    /// Decompress one block and check it holds valid UTF-8.
    pub fn decode(&self, data: &[u8]) -> Result<String> {
        let capacity = self.block_size_chars * MAX_UTF8_BYTES_PER_CHAR;
        let bytes = zstd::bulk::decompress(data, capacity)
            .map_err(|e| TesseraError::corrupt(format!("Undecodable block: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| TesseraError::corrupt(format!("Block is not valid UTF-8: {e}")))
    }

    /// Split `text` into blocks of at most `block_size_chars` characters.
    pub fn split<'a>(&self, text: &'a str) -> BlockSplitter<'a> {
        BlockSplitter::new(text, self.block_size_chars)
    }
}

/// Iterator over `(block_text, char_length)` pairs of a string.
///
/// Every block but the last holds exactly `block_size_chars` characters.
#[derive(Debug, Clone)]
pub struct BlockSplitter<'a> {
    rest: &'a str,
    block_size_chars: usize,
}

impl<'a> BlockSplitter<'a> {
    pub fn new(text: &'a str, block_size_chars: usize) -> Self {
        BlockSplitter {
            rest: text,
            block_size_chars,
        }
    }

    /// The unsplit remainder of the text.
    pub fn remainder(&self) -> &'a str {
        self.rest
    }
}

impl<'a> Iterator for BlockSplitter<'a> {
    type Item = (&'a str, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let (byte_end, chars) = match self.rest.char_indices().nth(self.block_size_chars) {
            Some((idx, _)) => (idx, self.block_size_chars),
            None => (self.rest.len(), self.rest.chars().count()),
        };
        let (block, rest) = self.rest.split_at(byte_end);
        self.rest = rest;
        Some((block, chars))
    }
}

/// Byte offset of the `char_offset`-th character of `text`
/// (`text.len()` when `char_offset` equals the character count).
pub fn byte_offset(text: &str, char_offset: usize) -> Option<usize> {
    if char_offset == 0 {
        return Some(0);
    }
    let mut indices = text.char_indices().map(|(i, _)| i).chain(Some(text.len()));
    indices.nth(char_offset)
}
