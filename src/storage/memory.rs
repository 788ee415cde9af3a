//! In-memory storage implementation for testing and ephemeral stores.
//!
//! Writes become visible to readers when the output is flushed (or closed,
//! or dropped), matching the visibility rules of [`super::file::FileStorage`].

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::Result;
use crate::storage::{Storage, StorageError, StorageInput, StorageOutput};

type SharedFile = Arc<RwLock<Vec<u8>>>;

/// Configuration for [`MemoryStorage`].
#[derive(Debug, Clone)]
pub struct MemoryStorageConfig {
    /// Initial capacity of the file table.
    pub initial_capacity: usize,
}

impl Default for MemoryStorageConfig {
    fn default() -> Self {
        MemoryStorageConfig {
            initial_capacity: 16,
        }
    }
}

/// An in-memory storage implementation.
#[derive(Debug)]
pub struct MemoryStorage {
    files: Mutex<HashMap<String, SharedFile>>,
}

impl MemoryStorage {
    /// Create a new memory storage.
    pub fn new(config: MemoryStorageConfig) -> Self {
        MemoryStorage {
            files: Mutex::new(HashMap::with_capacity(config.initial_capacity)),
        }
    }

    /// Overwrite the contents of a file. Mostly useful for tests that need
    /// to simulate on-disk damage.
    pub fn put_file(&self, name: &str, data: Vec<u8>) {
        self.files
            .lock()
            .insert(name.to_string(), Arc::new(RwLock::new(data)));
    }

    fn shared(&self, name: &str) -> Result<SharedFile> {
        self.files
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()).into())
    }
}

impl Storage for MemoryStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        Ok(Box::new(MemoryInput {
            data: self.shared(name)?,
            position: 0,
        }))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let data: SharedFile = Arc::new(RwLock::new(Vec::new()));
        self.files.lock().insert(name.to_string(), Arc::clone(&data));
        Ok(Box::new(MemoryOutput::new(data, 0)))
    }

    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let data = Arc::clone(
            self.files
                .lock()
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(Vec::new()))),
        );
        let position = data.read().len() as u64;
        Ok(Box::new(MemoryOutput::new(data, position)))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.files.lock().contains_key(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.files.lock().remove(name);
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.files.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        Ok(self.shared(name)?.read().len() as u64)
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        let mut files = self.files.lock();
        let data = files
            .remove(old_name)
            .ok_or_else(|| StorageError::FileNotFound(old_name.to_string()))?;
        files.insert(new_name.to_string(), data);
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

/// A memory-based input implementation reading a shared file in place.
#[derive(Debug)]
pub struct MemoryInput {
    data: SharedFile,
    position: u64,
}

impl Read for MemoryInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let data = self.data.read();
        let start = (self.position as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for MemoryInput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let len = self.data.read().len() as i64;
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => len + offset,
            SeekFrom::Current(offset) => self.position as i64 + offset,
        };
        if new_pos < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Invalid seek position",
            ));
        }
        self.position = new_pos as u64;
        Ok(self.position)
    }
}

impl StorageInput for MemoryInput {
    fn size(&self) -> Result<u64> {
        Ok(self.data.read().len() as u64)
    }
}

/// A memory-based output. Bytes are staged locally and published to the
/// shared file on flush.
#[derive(Debug)]
pub struct MemoryOutput {
    data: SharedFile,
    pending: Vec<u8>,
    position: u64,
}

impl MemoryOutput {
    fn new(data: SharedFile, position: u64) -> Self {
        MemoryOutput {
            data,
            pending: Vec::new(),
            position,
        }
    }
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.position += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.pending.is_empty() {
            self.data.write().append(&mut self.pending);
        }
        Ok(())
    }
}

impl StorageOutput for MemoryOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.flush()?;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn close(&mut self) -> Result<()> {
        self.flush_and_sync()
    }
}

impl Drop for MemoryOutput {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
