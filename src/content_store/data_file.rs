//! Data file manager: appends compressed blocks to rolling data files.
//!
//! Data files are named `dataNNNNNN.dat` and numbered from 1. Blocks are
//! written back to back; a new file is started before a block is appended
//! whenever the current file has reached the size hint, so a file exceeds
//! the hint by at most one block. Once written, a block never moves.

use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use ahash::AHashMap;
use log::debug;

use crate::content_store::entry::BlockRef;
use crate::error::{Result, TesseraError};
use crate::storage::{Storage, StorageInput, StorageOutput};

/// Name of the data file with the given id.
pub fn data_file_name(id: u32) -> String {
    format!("data{id:06}.dat")
}

#[derive(Debug)]
struct CurrentDataFile {
    id: u32,
    output: Box<dyn StorageOutput>,
}

/// Owns the append side of the data files. Not thread-safe on its own; the
/// content store serializes access to it.
#[derive(Debug)]
pub struct DataFileManager {
    storage: Arc<dyn Storage>,
    size_hint: u64,
    data_file_count: u32,
    current: Option<CurrentDataFile>,
}

impl DataFileManager {
    /// Create a manager over `data_file_count` existing data files. The last
    /// one is reused if it still has room under the hint.
    pub fn new(storage: Arc<dyn Storage>, size_hint: u64, data_file_count: u32) -> Self {
        DataFileManager {
            storage,
            size_hint,
            data_file_count,
            current: None,
        }
    }

    pub fn data_file_count(&self) -> u32 {
        self.data_file_count
    }

    /// Append one compressed block and return where it landed.
    pub fn append_block(&mut self, compressed: &[u8], char_length: u32) -> Result<BlockRef> {
        let byte_length = u32::try_from(compressed.len())
            .map_err(|_| TesseraError::invalid_argument("Compressed block exceeds 4 GiB"))?;

        let file = self.current_file()?;
        let byte_offset = file.output.position();
        let data_file_id = file.id;

        if let Err(e) = file.output.write_all(compressed) {
            // The tail of this file is now unknown; continue in a fresh one.
            self.current = None;
            self.data_file_count += 1;
            return Err(e.into());
        }

        Ok(BlockRef {
            data_file_id,
            byte_offset,
            byte_length,
            char_length,
        })
    }

    /// Make everything appended so far visible to readers, and durable if
    /// `sync` is set.
    pub fn flush(&mut self, sync: bool) -> Result<()> {
        if let Some(file) = self.current.as_mut() {
            if sync {
                file.output.flush_and_sync()?;
            } else {
                file.output.flush()?;
            }
        }
        Ok(())
    }

    /// Flush, sync and release the current data file.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.current.take() {
            file.output.close()?;
        }
        Ok(())
    }

    fn current_file(&mut self) -> Result<&mut CurrentDataFile> {
        let full = match &self.current {
            Some(file) => file.output.position() >= self.size_hint,
            None => true,
        };

        if full {
            if let Some(mut file) = self.current.take() {
                file.output.close()?;
                debug!(
                    "data file {} reached size hint, rolling over",
                    data_file_name(file.id)
                );
            }
            self.current = Some(self.open_next()?);
        }

        self.current
            .as_mut()
            .ok_or_else(|| TesseraError::storage("No current data file"))
    }

    fn open_next(&mut self) -> Result<CurrentDataFile> {
        if self.current.is_none() && self.data_file_count > 0 {
            let id = self.data_file_count;
            let name = data_file_name(id);
            let size = if self.storage.file_exists(&name) {
                self.storage.file_size(&name)?
            } else {
                0
            };
            if size < self.size_hint {
                debug!("resuming data file {name} at {size} bytes");
                return Ok(CurrentDataFile {
                    id,
                    output: self.storage.create_output_append(&name)?,
                });
            }
        }

        let id = self.data_file_count + 1;
        let name = data_file_name(id);
        debug!("opening data file {name}");
        let output = self.storage.create_output(&name)?;
        self.data_file_count = id;
        Ok(CurrentDataFile { id, output })
    }
}

/// Reads raw blocks, keeping one open input per data file it touches.
pub struct BlockReader<'a> {
    storage: &'a dyn Storage,
    inputs: AHashMap<u32, Box<dyn StorageInput>>,
}

impl<'a> BlockReader<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        BlockReader {
            storage,
            inputs: AHashMap::new(),
        }
    }

    /// Read the compressed bytes of one block.
    pub fn read(&mut self, block: &BlockRef) -> Result<Vec<u8>> {
        let input = match self.inputs.entry(block.data_file_id) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => e.insert(
                self.storage
                    .open_input(&data_file_name(block.data_file_id))
                    .map_err(|e| {
                        TesseraError::corrupt(format!(
                            "Missing data file {}: {e}",
                            data_file_name(block.data_file_id)
                        ))
                    })?,
            ),
        };

        let mut bytes = vec![0u8; block.byte_length as usize];
        input.seek(SeekFrom::Start(block.byte_offset))?;
        input.read_exact(&mut bytes).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                TesseraError::corrupt(format!(
                    "Block at {}:{} extends past end of file",
                    data_file_name(block.data_file_id),
                    block.byte_offset
                ))
            } else {
                TesseraError::Io(e)
            }
        })?;
        Ok(bytes)
    }
}
