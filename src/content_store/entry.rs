//! Content entries and the persisted table of contents.
//!
//! The table of contents (`toc.dat`) is the store's metadata: the
//! configuration it was created with, the id counter, the number of data
//! files, and every entry ever allocated (tombstoned ones included, so ids
//! are never handed out twice). It is a structured file with a CRC32
//! trailer and is replaced atomically through a temporary file.

use std::ops::Range;

use log::debug;

use crate::content_store::ContentId;
use crate::error::{Result, TesseraError};
use crate::storage::Storage;
use crate::storage::structured::{StructReader, StructWriter};

/// Name of the metadata file.
pub const TOC_FILE_NAME: &str = "toc.dat";

const TOC_TEMP_FILE_NAME: &str = "toc.dat.tmp";

const TOC_MAGIC: &[u8; 4] = b"TSCS";

const TOC_VERSION: u32 = 1;

/// Location of one compressed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    pub data_file_id: u32,
    pub byte_offset: u64,
    pub byte_length: u32,
    pub char_length: u32,
}

/// Metadata of one stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    pub id: ContentId,
    pub total_char_length: usize,
    pub deleted: bool,
    pub block_refs: Vec<BlockRef>,
}

impl ContentEntry {
    pub fn new(id: ContentId, block_refs: Vec<BlockRef>) -> Self {
        let total_char_length = block_refs.iter().map(|b| b.char_length as usize).sum();
        ContentEntry {
            id,
            total_char_length,
            deleted: false,
            block_refs,
        }
    }

    /// Indices of the blocks overlapping the character range `[start, end)`,
    /// together with the character offset at which the first of them starts.
    ///
    /// An empty range touches no blocks.
    pub fn blocks_overlapping(&self, start: usize, end: usize) -> (Range<usize>, usize) {
        let mut first = None;
        let mut first_char = 0;
        let mut last = 0;
        let mut block_start = 0;

        for (i, block) in self.block_refs.iter().enumerate() {
            let block_end = block_start + block.char_length as usize;
            if block_start >= end {
                break;
            }
            if block_end > start {
                if first.is_none() {
                    first = Some(i);
                    first_char = block_start;
                }
                last = i + 1;
            }
            block_start = block_end;
        }

        match first {
            Some(first) => (first..last, first_char),
            None => (0..0, start),
        }
    }
}

/// In-memory image of `toc.dat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOfContents {
    pub block_size_chars: usize,
    pub data_file_size_hint: u64,
    pub next_id: ContentId,
    pub data_file_count: u32,
    pub entries: Vec<ContentEntry>,
}

impl TableOfContents {
    /// Write the table to a temporary file and rename it into place.
    pub fn write(&self, storage: &dyn Storage) -> Result<()> {
        let mut writer = StructWriter::new(storage.create_output(TOC_TEMP_FILE_NAME)?);
        writer.write_raw(TOC_MAGIC)?;
        writer.write_u32(TOC_VERSION)?;
        writer.write_u64(self.block_size_chars as u64)?;
        writer.write_u64(self.data_file_size_hint)?;
        writer.write_u32(self.next_id)?;
        writer.write_u32(self.data_file_count)?;
        writer.write_varint(self.entries.len() as u64)?;

        for entry in &self.entries {
            writer.write_varint(entry.id as u64)?;
            writer.write_u8(entry.deleted as u8)?;
            writer.write_varint(entry.block_refs.len() as u64)?;
            for block in &entry.block_refs {
                writer.write_varint(block.data_file_id as u64)?;
                writer.write_varint(block.byte_offset)?;
                writer.write_varint(block.byte_length as u64)?;
                writer.write_varint(block.char_length as u64)?;
            }
        }
        writer.close()?;

        storage.rename_file(TOC_TEMP_FILE_NAME, TOC_FILE_NAME)?;
        storage.sync()
    }

    /// Remove a temporary table left behind by a write that never reached
    /// its rename. Returns whether there was one.
    pub fn discard_temp(storage: &dyn Storage) -> Result<bool> {
        if !storage.file_exists(TOC_TEMP_FILE_NAME) {
            return Ok(false);
        }
        storage.delete_file(TOC_TEMP_FILE_NAME)?;
        debug!("removed stale {TOC_TEMP_FILE_NAME}");
        Ok(true)
    }

    /// Read the table, or `None` if the storage holds no table yet.
    pub fn read(storage: &dyn Storage) -> Result<Option<Self>> {
        if !storage.file_exists(TOC_FILE_NAME) {
            return Ok(None);
        }
        let mut reader = StructReader::open(storage.open_input(TOC_FILE_NAME)?)?;

        if reader.read_raw(TOC_MAGIC.len())? != TOC_MAGIC {
            return Err(TesseraError::corrupt("Not a content store table of contents"));
        }
        let version = reader.read_u32()?;
        if version != TOC_VERSION {
            return Err(TesseraError::corrupt(format!(
                "Unsupported table of contents version {version}"
            )));
        }

        let block_size_chars = reader.read_u64()? as usize;
        let data_file_size_hint = reader.read_u64()?;
        let next_id = reader.read_u32()?;
        let data_file_count = reader.read_u32()?;
        if block_size_chars == 0 || data_file_size_hint == 0 || next_id == 0 {
            return Err(TesseraError::corrupt("Invalid store parameters"));
        }

        let entry_count = reader.read_varint()? as usize;
        let mut entries = Vec::with_capacity(entry_count.min(reader.remaining() as usize));
        let mut previous_id = 0;

        for _ in 0..entry_count {
            let id = narrow_u32(reader.read_varint()?, "content id")?;
            if id <= previous_id || id >= next_id {
                return Err(TesseraError::corrupt(format!(
                    "Entry id {id} out of order or beyond next id {next_id}"
                )));
            }
            previous_id = id;

            let deleted = match reader.read_u8()? {
                0 => false,
                1 => true,
                flag => {
                    return Err(TesseraError::corrupt(format!(
                        "Invalid deletion flag {flag} for entry {id}"
                    )));
                }
            };

            let block_count = reader.read_varint()? as usize;
            let mut block_refs = Vec::with_capacity(block_count.min(reader.remaining() as usize));
            for _ in 0..block_count {
                let block = BlockRef {
                    data_file_id: narrow_u32(reader.read_varint()?, "data file id")?,
                    byte_offset: reader.read_varint()?,
                    byte_length: narrow_u32(reader.read_varint()?, "block length")?,
                    char_length: narrow_u32(reader.read_varint()?, "block char length")?,
                };
                if block.data_file_id == 0 || block.data_file_id > data_file_count {
                    return Err(TesseraError::corrupt(format!(
                        "Entry {id} references unknown data file {}",
                        block.data_file_id
                    )));
                }
                block_refs.push(block);
            }

            let mut entry = ContentEntry::new(id, block_refs);
            entry.deleted = deleted;
            entries.push(entry);
        }

        if !reader.is_eof() {
            return Err(TesseraError::corrupt(
                "Trailing bytes after table of contents",
            ));
        }

        Ok(Some(TableOfContents {
            block_size_chars,
            data_file_size_hint,
            next_id,
            data_file_count,
            entries,
        }))
    }
}

fn narrow_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| TesseraError::corrupt(format!("{what} {value} too large")))
}
