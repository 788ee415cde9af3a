//! Structured file I/O for checksummed binary metadata.
//!
//! A structured file is a sequence of little-endian fixed-width integers,
//! varints and raw byte runs, followed by a CRC32 of everything
//! before it. [`StructReader`] verifies the checksum up front, so parse
//! errors past that point indicate a format mismatch rather than damage.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Result, TesseraError};
use crate::storage::{StorageInput, StorageOutput};
use crate::util::varint::{decode_u64, encode_u64};

/// A structured file writer for binary data.
pub struct StructWriter<W: StorageOutput> {
    writer: W,
    hasher: crc32fast::Hasher,
}

impl<W: StorageOutput> StructWriter<W> {
    /// Create a new structured file writer.
    pub fn new(writer: W) -> Self {
        StructWriter {
            writer,
            hasher: crc32fast::Hasher::new(),
        }
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_raw(&[value])
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Write a variable-length integer.
    pub fn write_varint(&mut self, value: u64) -> Result<()> {
        self.write_raw(&encode_u64(value))
    }

    /// Write raw bytes without length prefix.
    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value)?;
        self.hasher.update(value);
        Ok(())
    }

    /// Append the checksum trailer, then flush, sync and close the output.
    pub fn close(mut self) -> Result<()> {
        let checksum = self.hasher.clone().finalize();
        self.writer.write_u32::<LittleEndian>(checksum)?;
        self.writer.flush_and_sync()?;
        self.writer.close()
    }
}

/// A structured file reader for binary data.
pub struct StructReader {
    cursor: Cursor<Vec<u8>>,
    body_len: u64,
}

impl StructReader {
    /// Read a whole structured file and verify its checksum trailer.
    pub fn open<R: StorageInput>(mut reader: R) -> Result<Self> {
        let mut data = Vec::with_capacity(reader.size()? as usize);
        reader.read_to_end(&mut data)?;

        if data.len() < 4 {
            return Err(TesseraError::corrupt("File too short for checksum"));
        }
        let body_len = data.len() - 4;
        let stored = (&data[body_len..]).read_u32::<LittleEndian>()?;
        let actual = crc32fast::hash(&data[..body_len]);
        if stored != actual {
            return Err(TesseraError::corrupt(format!(
                "Checksum mismatch: stored {stored:#010x}, computed {actual:#010x}"
            )));
        }

        data.truncate(body_len);
        Ok(StructReader {
            cursor: Cursor::new(data),
            body_len: body_len as u64,
        })
    }

    /// Read a u8 value.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(Self::truncated)
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(Self::truncated)
    }

    /// Read a u64 value (little-endian).
    pub fn read_u64(&mut self) -> Result<u64> {
        self.cursor
            .read_u64::<LittleEndian>()
            .map_err(Self::truncated)
    }

    /// Read a variable-length integer.
    pub fn read_varint(&mut self) -> Result<u64> {
        let start = self.cursor.position() as usize;
        let (value, used) = decode_u64(&self.cursor.get_ref()[start..])?;
        self.cursor.set_position((start + used) as u64);
        Ok(value)
    }

    /// Read exact number of raw bytes.
    pub fn read_raw(&mut self, length: usize) -> Result<Vec<u8>> {
        if self.remaining() < length as u64 {
            return Err(TesseraError::corrupt("Unexpected end of structured file"));
        }
        let mut bytes = vec![0u8; length];
        self.cursor.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Bytes left before the checksum trailer.
    pub fn remaining(&self) -> u64 {
        self.body_len - self.cursor.position()
    }

    /// Check if we're at the end of the body.
    pub fn is_eof(&self) -> bool {
        self.remaining() == 0
    }

    fn truncated(e: std::io::Error) -> TesseraError {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            TesseraError::corrupt("Unexpected end of structured file")
        } else {
            TesseraError::Io(e)
        }
    }
}
