//! Incremental writer for documents that arrive in parts.

use crate::content_store::codec::BlockSplitter;
use crate::content_store::entry::BlockRef;
use crate::content_store::store::ContentStore;
use crate::content_store::ContentId;
use crate::error::Result;

/// Compressed blocks held back before they are appended in one batch.
const MAX_BUFFERED_BLOCKS: usize = 16;

/// Stores a document piece by piece.
///
/// Full blocks are compressed as soon as they fill up, so memory use stays
/// bounded by a few blocks however large the document is. The id is only
/// allocated by [`ContentWriter::finish`]; a writer that is dropped instead
/// leaves its blocks unreferenced and consumes no id.
///
/// ```
/// use std::sync::Arc;
/// use tessera::content_store::{ContentStore, ContentStoreConfig};
/// use tessera::storage::memory::{MemoryStorage, MemoryStorageConfig};
///
/// let storage = Arc::new(MemoryStorage::new(MemoryStorageConfig::default()));
/// let store = ContentStore::open(storage, ContentStoreConfig::default()).unwrap();
///
/// let mut writer = store.writer().unwrap();
/// writer.write_part("<doc>").unwrap();
/// writer.write_part("Hello").unwrap();
/// writer.write_part("</doc>").unwrap();
/// let id = writer.finish().unwrap();
///
/// assert_eq!(store.retrieve(id).unwrap().as_deref(), Some("<doc>Hello</doc>"));
/// ```
#[derive(Debug)]
pub struct ContentWriter<'a> {
    store: &'a ContentStore,
    pending: String,
    pending_chars: usize,
    compressed: Vec<(Vec<u8>, u32)>,
    appended: Vec<BlockRef>,
    char_length: usize,
}

impl<'a> ContentWriter<'a> {
    pub(crate) fn new(store: &'a ContentStore) -> Self {
        ContentWriter {
            store,
            pending: String::new(),
            pending_chars: 0,
            compressed: Vec::new(),
            appended: Vec::new(),
            char_length: 0,
        }
    }

    /// Append the next part of the document.
    pub fn write_part(&mut self, part: &str) -> Result<()> {
        let block_size = self.store.codec().block_size_chars();
        let mut rest = part;

        while !rest.is_empty() {
            let mut splitter = BlockSplitter::new(rest, block_size - self.pending_chars);
            let Some((chunk, chars)) = splitter.next() else {
                break;
            };
            self.pending.push_str(chunk);
            self.pending_chars += chars;
            self.char_length += chars;
            rest = splitter.remainder();

            if self.pending_chars == block_size {
                self.seal_pending()?;
            }
        }

        if self.compressed.len() >= MAX_BUFFERED_BLOCKS {
            self.store
                .append_blocks(&mut self.compressed, &mut self.appended)?;
        }
        Ok(())
    }

    /// Number of characters written so far.
    pub fn char_length(&self) -> usize {
        self.char_length
    }

    /// Write the final block and allocate the document's id.
    pub fn finish(mut self) -> Result<ContentId> {
        if self.pending_chars > 0 {
            self.seal_pending()?;
        }
        let compressed = std::mem::take(&mut self.compressed);
        let appended = std::mem::take(&mut self.appended);
        self.store.commit(compressed, appended)
    }

    fn seal_pending(&mut self) -> Result<()> {
        let data = self.store.codec().encode(&self.pending)?;
        self.compressed.push((data, self.pending_chars as u32));
        self.pending.clear();
        self.pending_chars = 0;
        Ok(())
    }
}
