//! The content store: id allocation, entry table, retrieval and persistence.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

use crate::content_store::codec::{BlockCodec, byte_offset};
use crate::content_store::config::ContentStoreConfig;
use crate::content_store::data_file::{BlockReader, DataFileManager, data_file_name};
use crate::content_store::entry::{BlockRef, ContentEntry, TableOfContents};
use crate::content_store::writer::ContentWriter;
use crate::content_store::ContentId;
use crate::error::{Result, TesseraError};
use crate::storage::file::FileStorageConfig;
use crate::storage::{Storage, StorageConfig, StorageFactory};

/// Append-side state, guarded by a single mutex.
#[derive(Debug)]
struct WriterState {
    data_files: DataFileManager,
    next_id: ContentId,
    closed: bool,
}

/// A compressed, block-structured, append-only store of document texts.
///
/// Any number of threads may call [`ContentStore::store`] and the retrieval
/// methods concurrently. Appending blocks, allocating the id and publishing
/// the entry happen under one lock, so an entry becomes visible only once
/// all of its blocks are written. Readers never block writers for longer
/// than an entry-table lookup.
///
/// Deleted blocks are never reclaimed, so a [`ContentStore::delete`] racing
/// with a retrieval of the same id cannot corrupt the read; callers that need
/// "deleted means unreadable" semantics must still make sure no read of the
/// id is in flight when they delete it.
#[derive(Debug)]
pub struct ContentStore {
    storage: Arc<dyn Storage>,
    config: ContentStoreConfig,
    codec: BlockCodec,
    entries: RwLock<BTreeMap<ContentId, Arc<ContentEntry>>>,
    writer: Mutex<WriterState>,
    read_only: bool,
}

impl ContentStore {
    /// Open the store held by `storage`, creating an empty one if there is
    /// none yet.
    ///
    /// Block size and data file size hint of an existing store come from its
    /// metadata; `config` only supplies them for new stores.
    pub fn open(storage: Arc<dyn Storage>, config: ContentStoreConfig) -> Result<Self> {
        Self::open_with_mode(storage, config, false)
    }

    /// Open an existing store for retrieval only.
    ///
    /// Writes fail with [`TesseraError::InvalidOperation`], and neither
    /// `close` nor drop touches the storage. A storage without a table of
    /// contents is [`TesseraError::NotFound`].
    pub fn open_read_only(storage: Arc<dyn Storage>) -> Result<Self> {
        Self::open_with_mode(storage, ContentStoreConfig::default(), true)
    }

    fn open_with_mode(
        storage: Arc<dyn Storage>,
        config: ContentStoreConfig,
        read_only: bool,
    ) -> Result<Self> {
        config.validate()?;
        let mut config = config;

        if !read_only {
            TableOfContents::discard_temp(storage.as_ref())?;
        }

        let (entries, next_id, data_file_count) = match TableOfContents::read(storage.as_ref())? {
            Some(toc) => {
                if toc.block_size_chars != config.block_size_chars
                    || toc.data_file_size_hint != config.data_file_size_hint
                {
                    warn!(
                        "content store was created with block_size_chars={} data_file_size_hint={}; ignoring configured {} / {}",
                        toc.block_size_chars,
                        toc.data_file_size_hint,
                        config.block_size_chars,
                        config.data_file_size_hint
                    );
                    config.block_size_chars = toc.block_size_chars;
                    config.data_file_size_hint = toc.data_file_size_hint;
                }
                Self::check_data_files(storage.as_ref(), &toc)?;

                let entries: BTreeMap<ContentId, Arc<ContentEntry>> = toc
                    .entries
                    .into_iter()
                    .map(|entry| (entry.id, Arc::new(entry)))
                    .collect();
                info!(
                    "opened content store with {} entries, next id {}",
                    entries.len(),
                    toc.next_id
                );
                (entries, toc.next_id, toc.data_file_count)
            }
            None if read_only => {
                return Err(TesseraError::not_found("Content store table of contents"));
            }
            None => {
                let orphans = storage
                    .list_files()?
                    .into_iter()
                    .any(|name| name.starts_with("data") && name.ends_with(".dat"));
                if orphans {
                    return Err(TesseraError::corrupt(
                        "Data files present but table of contents missing",
                    ));
                }
                let toc = TableOfContents {
                    block_size_chars: config.block_size_chars,
                    data_file_size_hint: config.data_file_size_hint,
                    next_id: 1,
                    data_file_count: 0,
                    entries: Vec::new(),
                };
                toc.write(storage.as_ref())?;
                info!("created content store");
                (BTreeMap::new(), 1, 0)
            }
        };

        let data_files =
            DataFileManager::new(Arc::clone(&storage), config.data_file_size_hint, data_file_count);

        Ok(ContentStore {
            codec: BlockCodec::new(config.compression_level, config.block_size_chars),
            storage,
            config,
            entries: RwLock::new(entries),
            writer: Mutex::new(WriterState {
                data_files,
                next_id,
                closed: false,
            }),
            read_only,
        })
    }

    /// Open (or create) a store in a directory on disk.
    pub fn open_dir<P: AsRef<Path>>(path: P, config: ContentStoreConfig) -> Result<Self> {
        let storage = StorageFactory::create(StorageConfig::File(FileStorageConfig::new(path)))?;
        Self::open(storage, config)
    }

    /// Open an existing on-disk store for retrieval only. Nothing is created
    /// if the directory does not exist.
    pub fn open_dir_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(TesseraError::not_found(format!(
                "Content store directory {}",
                path.display()
            )));
        }
        let storage = StorageFactory::create(StorageConfig::File(FileStorageConfig::new(path)))?;
        Self::open_read_only(storage)
    }

    fn check_data_files(storage: &dyn Storage, toc: &TableOfContents) -> Result<()> {
        let referenced: HashSet<u32> = toc
            .entries
            .iter()
            .flat_map(|entry| entry.block_refs.iter().map(|block| block.data_file_id))
            .collect();
        for id in referenced {
            if !storage.file_exists(&data_file_name(id)) {
                return Err(TesseraError::corrupt(format!(
                    "Referenced data file {} is missing",
                    data_file_name(id)
                )));
            }
        }
        Ok(())
    }

    /// Store a document and return its new id.
    pub fn store(&self, text: &str) -> Result<ContentId> {
        let mut writer = self.writer()?;
        writer.write_part(text)?;
        writer.finish()
    }

    /// Start storing a document that arrives in several parts.
    pub fn writer(&self) -> Result<ContentWriter<'_>> {
        self.check_writable(&self.writer.lock())?;
        Ok(ContentWriter::new(self))
    }

    pub(crate) fn codec(&self) -> &BlockCodec {
        &self.codec
    }

    /// Append compressed blocks ahead of the entry that will own them.
    pub(crate) fn append_blocks(
        &self,
        compressed: &mut Vec<(Vec<u8>, u32)>,
        appended: &mut Vec<BlockRef>,
    ) -> Result<()> {
        let mut state = self.writer.lock();
        self.check_writable(&state)?;
        for (data, char_length) in compressed.drain(..) {
            appended.push(state.data_files.append_block(&data, char_length)?);
        }
        Ok(())
    }

    /// Append the remaining blocks, allocate the next id and publish the entry.
    pub(crate) fn commit(
        &self,
        compressed: Vec<(Vec<u8>, u32)>,
        mut block_refs: Vec<BlockRef>,
    ) -> Result<ContentId> {
        let mut state = self.writer.lock();
        self.check_writable(&state)?;

        for (data, char_length) in compressed {
            block_refs.push(state.data_files.append_block(&data, char_length)?);
        }
        state.data_files.flush(self.config.sync_on_store)?;

        let id = state.next_id;
        state.next_id = id
            .checked_add(1)
            .ok_or_else(|| TesseraError::invalid_operation("Content id space exhausted"))?;

        let entry = ContentEntry::new(id, block_refs);
        debug!(
            "stored content {id}: {} chars in {} blocks",
            entry.total_char_length,
            entry.block_refs.len()
        );
        self.entries.write().insert(id, Arc::new(entry));
        Ok(id)
    }

    fn live_entry(&self, id: ContentId) -> Option<Arc<ContentEntry>> {
        self.entries
            .read()
            .get(&id)
            .filter(|entry| !entry.deleted)
            .cloned()
    }

    fn decode_block(&self, reader: &mut BlockReader<'_>, block: &BlockRef) -> Result<String> {
        let text = self.codec.decode(&reader.read(block)?)?;
        if text.chars().count() != block.char_length as usize {
            return Err(TesseraError::corrupt(format!(
                "Block at {}:{} holds a different number of characters than recorded",
                data_file_name(block.data_file_id),
                block.byte_offset
            )));
        }
        Ok(text)
    }

    /// Retrieve a whole document, or `None` if the id is unknown or deleted.
    pub fn retrieve(&self, id: ContentId) -> Result<Option<String>> {
        let Some(entry) = self.live_entry(id) else {
            return Ok(None);
        };

        let mut reader = BlockReader::new(self.storage.as_ref());
        let mut text = String::with_capacity(entry.total_char_length);
        for block in &entry.block_refs {
            text.push_str(&self.decode_block(&mut reader, block)?);
        }
        Ok(Some(text))
    }

    /// Retrieve several character ranges `[starts[i], ends[i])` of a document.
    ///
    /// Only the blocks overlapping each range are decompressed, each at most
    /// once per call. Every slot is `None` if the id is unknown or deleted.
    pub fn retrieve_parts(
        &self,
        id: ContentId,
        starts: &[usize],
        ends: &[usize],
    ) -> Result<Vec<Option<String>>> {
        if starts.len() != ends.len() {
            return Err(TesseraError::invalid_argument(format!(
                "Starts has {} elements but ends has {}",
                starts.len(),
                ends.len()
            )));
        }
        let Some(entry) = self.live_entry(id) else {
            return Ok(vec![None; starts.len()]);
        };

        let length = entry.total_char_length;
        for (&start, &end) in starts.iter().zip(ends) {
            if start > end || end > length {
                return Err(TesseraError::invalid_range(start, end, length));
            }
        }

        let mut reader = BlockReader::new(self.storage.as_ref());
        let mut decoded: AHashMap<usize, String> = AHashMap::new();
        let mut parts = Vec::with_capacity(starts.len());

        for (&start, &end) in starts.iter().zip(ends) {
            let (blocks, first_char) = entry.blocks_overlapping(start, end);
            if blocks.is_empty() {
                parts.push(Some(String::new()));
                continue;
            }

            let mut window = String::new();
            for index in blocks {
                let text = match decoded.entry(index) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(e) => {
                        e.insert(self.decode_block(&mut reader, &entry.block_refs[index])?)
                    }
                };
                window.push_str(text);
            }

            let from = byte_offset(&window, start - first_char);
            let to = byte_offset(&window, end - first_char);
            match (from, to) {
                (Some(from), Some(to)) => parts.push(Some(window[from..to].to_string())),
                _ => {
                    return Err(TesseraError::corrupt(format!(
                        "Blocks of content {id} shorter than recorded"
                    )));
                }
            }
        }

        Ok(parts)
    }

    /// Mark a document as deleted. Its id is never reused.
    ///
    /// Deleting an already deleted document is a no-op; deleting an id that
    /// was never allocated fails with [`TesseraError::NotFound`]. A closed or
    /// read-only store rejects deletes like any other write.
    pub fn delete(&self, id: ContentId) -> Result<()> {
        let state = self.writer.lock();
        self.check_writable(&state)?;

        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| TesseraError::not_found(format!("content id {id}")))?;
        if !entry.deleted {
            Arc::make_mut(entry).deleted = true;
            debug!("deleted content {id}");
        }
        Ok(())
    }

    /// Persist the entry table and make all data durable without closing.
    pub fn flush(&self) -> Result<()> {
        let mut state = self.writer.lock();
        self.check_writable(&state)?;
        self.persist(&mut state)
    }

    /// Persist everything and stop accepting new documents.
    ///
    /// No `store` or `delete` may be in flight when `close` is called.
    /// Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut state = self.writer.lock();
        if state.closed {
            return Ok(());
        }
        if self.read_only {
            state.closed = true;
            return Ok(());
        }
        self.persist(&mut state)?;
        state.data_files.close()?;
        state.closed = true;
        info!(
            "closed content store: {} entries, next id {}",
            self.entries.read().len(),
            state.next_id
        );
        Ok(())
    }

    fn persist(&self, state: &mut WriterState) -> Result<()> {
        state.data_files.flush(true)?;
        let toc = TableOfContents {
            block_size_chars: self.config.block_size_chars,
            data_file_size_hint: self.config.data_file_size_hint,
            next_id: state.next_id,
            data_file_count: state.data_files.data_file_count(),
            entries: self
                .entries
                .read()
                .values()
                .map(|entry| entry.as_ref().clone())
                .collect(),
        };
        toc.write(self.storage.as_ref())
    }

    fn check_writable(&self, state: &WriterState) -> Result<()> {
        if state.closed {
            Err(TesseraError::invalid_operation("Content store is closed"))
        } else if self.read_only {
            Err(TesseraError::invalid_operation("Content store is read-only"))
        } else {
            Ok(())
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Ids of all live (not deleted) documents, ascending.
    pub fn doc_ids(&self) -> Vec<ContentId> {
        self.entries
            .read()
            .values()
            .filter(|entry| !entry.deleted)
            .map(|entry| entry.id)
            .collect()
    }

    /// Number of live documents.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|entry| !entry.deleted)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` was allocated and has since been deleted.
    pub fn is_deleted(&self, id: ContentId) -> bool {
        self.entries
            .read()
            .get(&id)
            .is_some_and(|entry| entry.deleted)
    }

    /// Length in characters of a live document.
    pub fn doc_length(&self, id: ContentId) -> Option<usize> {
        self.live_entry(id).map(|entry| entry.total_char_length)
    }

    /// The id the next stored document will receive.
    pub fn next_id(&self) -> ContentId {
        self.writer.lock().next_id
    }

    pub fn data_file_count(&self) -> u32 {
        self.writer.lock().data_files.data_file_count()
    }

    pub fn config(&self) -> &ContentStoreConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }
}

impl Drop for ContentStore {
    fn drop(&mut self) {
        if !self.writer.get_mut().closed {
            if let Err(e) = self.close() {
                warn!("failed to close content store on drop: {e}");
            }
        }
    }
}
