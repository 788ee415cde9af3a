//! Integration tests for the content store.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use tessera::content_store::{ContentStore, ContentStoreConfig};
use tessera::error::{Result, TesseraError};
use tessera::storage::{Storage, StorageInput, StorageOutput};
use tessera::storage::file::{FileStorage, FileStorageConfig};
use tessera::storage::memory::{MemoryStorage, MemoryStorageConfig};

const DOCS: [&str; 4] = [
    "The quick brown fox ",
    "jumps over the lazy ",
    "dog.           ",
    "Leentje leerde Lotje lopen lan",
];

fn small_blocks() -> ContentStoreConfig {
    ContentStoreConfig::default()
        .with_block_size_chars(15)
        .with_data_file_size_hint(25)
}

/// Store the four sample documents, close, and reopen.
fn setup(dir: &Path) -> Result<ContentStore> {
    let store = ContentStore::open_dir(dir, small_blocks())?;
    for (i, doc) in DOCS.iter().enumerate() {
        assert_eq!(store.store(doc)? as usize, i + 1);
    }
    store.close()?;
    ContentStore::open_dir(dir, small_blocks())
}

#[test]
fn test_retrieve() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup(dir.path())?;

    for (i, doc) in DOCS.iter().enumerate() {
        assert_eq!(store.retrieve(i as u32 + 1)?.as_deref(), Some(*doc));
    }
    assert_eq!(store.retrieve(5)?, None);
    assert_eq!(store.retrieve(0)?, None);
    Ok(())
}

#[test]
fn test_retrieve_parts() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup(dir.path())?;

    let parts = store.retrieve_parts(2, &[5, 15], &[7, 18])?;
    assert_eq!(parts, vec![Some(" o".to_string()), Some("laz".to_string())]);

    // Unordered and overlapping ranges spanning the block boundary.
    let parts = store.retrieve_parts(4, &[20, 0, 10], &[30, 30, 20])?;
    assert_eq!(
        parts,
        vec![
            Some("Lotje lopen lan"[5..].to_string()),
            Some(DOCS[3].to_string()),
            Some("erde Lotje".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn test_delete() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup(dir.path())?;

    store.delete(2)?;
    assert_eq!(store.retrieve(2)?, None);
    assert_eq!(store.retrieve_parts(2, &[0], &[3])?, vec![None]);
    assert_eq!(store.retrieve(1)?.as_deref(), Some(DOCS[0]));
    assert_eq!(store.doc_ids(), vec![1, 3, 4]);
    Ok(())
}

#[test]
fn test_close_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup(dir.path())?;
    store.close()?;

    let store = ContentStore::open_dir(dir.path(), small_blocks())?;
    assert_eq!(store.retrieve(1)?.as_deref(), Some(DOCS[0]));
    assert_eq!(store.len(), 4);
    Ok(())
}

#[test]
fn test_close_reopen_append() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup(dir.path())?;
    store.close()?;

    let store = ContentStore::open_dir(dir.path(), small_blocks())?;
    assert_eq!(store.store("test")?, 5);
    Ok(())
}

#[test]
fn test_deleted_id_not_reused_after_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup(dir.path())?;
    store.delete(2)?;
    store.delete(4)?;
    store.close()?;

    let store = ContentStore::open_dir(dir.path(), small_blocks())?;
    assert!(store.is_deleted(2));
    assert!(store.is_deleted(4));
    assert_eq!(store.retrieve(4)?, None);
    assert_eq!(store.store("test")?, 5);
    assert_eq!(store.retrieve(5)?.as_deref(), Some("test"));
    Ok(())
}

#[test]
fn test_delete_unknown_id() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup(dir.path())?;
    assert!(matches!(store.delete(17), Err(TesseraError::NotFound(_))));
    assert_eq!(store.len(), 4);
    Ok(())
}

#[test]
fn test_data_files_roll_over() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup(dir.path())?;

    // Seven compressed blocks cannot fit a 25 byte hint in one file.
    assert!(store.data_file_count() > 1);
    assert!(dir.path().join("data000002.dat").exists());
    for (i, doc) in DOCS.iter().enumerate() {
        assert_eq!(store.retrieve(i as u32 + 1)?.as_deref(), Some(*doc));
    }
    Ok(())
}

#[test]
fn test_reopen_keeps_persisted_layout() -> Result<()> {
    let dir = TempDir::new()?;
    setup(dir.path())?.close()?;

    let store = ContentStore::open_dir(dir.path(), ContentStoreConfig::default())?;
    assert_eq!(store.config().block_size_chars, 15);
    assert_eq!(store.config().data_file_size_hint, 25);
    assert_eq!(store.retrieve_parts(2, &[11], &[19])?, vec![Some("the lazy".to_string())]);
    Ok(())
}

#[test]
fn test_invalid_ranges() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup(dir.path())?;

    assert!(matches!(
        store.retrieve_parts(1, &[0], &[21]),
        Err(TesseraError::InvalidRange {
            start: 0,
            end: 21,
            length: 20
        })
    ));
    assert!(matches!(
        store.retrieve_parts(1, &[4], &[3]),
        Err(TesseraError::InvalidRange { .. })
    ));
    assert!(matches!(
        store.retrieve_parts(1, &[0, 1], &[1]),
        Err(TesseraError::InvalidArgument(_))
    ));
    // Full-length and empty ranges at the end are valid.
    assert_eq!(
        store.retrieve_parts(1, &[0, 20], &[20, 20])?,
        vec![Some(DOCS[0].to_string()), Some(String::new())]
    );
    Ok(())
}

#[test]
fn test_random_substrings() -> Result<()> {
    let alphabet = ['a', 'b', 'Z', ' ', 'é', 'ж', '日', '😀', '\n'];
    let mut rng = StdRng::seed_from_u64(20240917);

    for block_size in [1, 7, 64] {
        let storage: Arc<dyn Storage> =
            Arc::new(MemoryStorage::new(MemoryStorageConfig::default()));
        let store = ContentStore::open(
            storage,
            ContentStoreConfig::default()
                .with_block_size_chars(block_size)
                .with_data_file_size_hint(512),
        )?;

        for _ in 0..20 {
            let length = rng.random_range(0..300);
            let chars: Vec<char> = (0..length)
                .map(|_| alphabet[rng.random_range(0..alphabet.len())])
                .collect();
            let text: String = chars.iter().collect();
            let id = store.store(&text)?;

            assert_eq!(store.retrieve(id)?.as_deref(), Some(text.as_str()));
            assert_eq!(store.doc_length(id), Some(length));

            let mut starts = Vec::new();
            let mut ends = Vec::new();
            for _ in 0..10 {
                let start = rng.random_range(0..=length);
                let end = rng.random_range(start..=length);
                starts.push(start);
                ends.push(end);
            }
            let parts = store.retrieve_parts(id, &starts, &ends)?;
            for ((start, end), part) in starts.iter().zip(&ends).zip(parts) {
                let expected: String = chars[*start..*end].iter().collect();
                assert_eq!(part, Some(expected));
            }
        }
    }
    Ok(())
}

#[test]
fn test_concurrent_store_and_retrieve() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ContentStore::open_dir(
        dir.path(),
        ContentStoreConfig::default()
            .with_block_size_chars(16)
            .with_data_file_size_hint(1024),
    )?;
    let first = store.store("seed document that readers poll")?;

    let stored: Vec<Vec<(u32, String)>> = std::thread::scope(|scope| {
        let reader = scope.spawn(|| {
            for _ in 0..200 {
                let text = store.retrieve(first).unwrap();
                assert_eq!(text.as_deref(), Some("seed document that readers poll"));
            }
        });

        let writers: Vec<_> = (0..4)
            .map(|thread| {
                let store = &store;
                scope.spawn(move || {
                    (0..50)
                        .map(|n| {
                            let text = format!("thread {thread} document {n} ").repeat(n % 5 + 1);
                            (store.store(&text).unwrap(), text)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        reader.join().unwrap();
        writers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    let mut ids: Vec<u32> = stored.iter().flatten().map(|(id, _)| *id).collect();
    ids.sort_unstable();
    assert_eq!(ids, (2..=201).collect::<Vec<u32>>());

    for (id, text) in stored.iter().flatten() {
        assert_eq!(store.retrieve(*id)?.as_deref(), Some(text.as_str()));
    }

    store.close()?;
    let store = ContentStore::open_dir(dir.path(), ContentStoreConfig::default())?;
    assert_eq!(store.len(), 201);
    assert_eq!(store.next_id(), 202);
    Ok(())
}

#[test]
fn test_multi_part_writer() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ContentStore::open_dir(dir.path(), small_blocks())?;

    let mut writer = store.writer()?;
    for part in ["<doc>", "Leentje leerde ", "Lotje lopen", "</doc>"] {
        writer.write_part(part)?;
    }
    let id = writer.finish()?;
    store.close()?;

    let store = ContentStore::open_dir(dir.path(), small_blocks())?;
    assert_eq!(
        store.retrieve(id)?.as_deref(),
        Some("<doc>Leentje leerde Lotje lopen</doc>")
    );
    assert_eq!(
        store.retrieve_parts(id, &[5], &[12])?,
        vec![Some("Leentje".to_string())]
    );
    Ok(())
}

#[test]
fn test_flush_survives_crash() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ContentStore::open_dir(dir.path(), small_blocks())?;
    store.store(DOCS[0])?;
    store.store(DOCS[1])?;
    store.flush()?;
    store.store(DOCS[2])?;
    // Simulate a crash: no close, no drop.
    std::mem::forget(store);

    let store = ContentStore::open_dir(dir.path(), small_blocks())?;
    assert_eq!(store.retrieve(1)?.as_deref(), Some(DOCS[0]));
    assert_eq!(store.retrieve(2)?.as_deref(), Some(DOCS[1]));
    assert_eq!(store.retrieve(3)?, None);
    let id = store.store(DOCS[3])?;
    assert_eq!(store.retrieve(id)?.as_deref(), Some(DOCS[3]));
    Ok(())
}

#[test]
fn test_corrupt_toc_fails_to_open() -> Result<()> {
    let dir = TempDir::new()?;
    setup(dir.path())?.close()?;

    let toc = dir.path().join("toc.dat");
    let mut bytes = std::fs::read(&toc)?;
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xff;
    std::fs::write(&toc, bytes)?;

    let result = ContentStore::open_dir(dir.path(), small_blocks());
    assert!(matches!(result, Err(TesseraError::CorruptStore(_))));
    Ok(())
}

#[test]
fn test_missing_data_file_fails_to_open() -> Result<()> {
    let dir = TempDir::new()?;
    setup(dir.path())?.close()?;
    std::fs::remove_file(dir.path().join("data000001.dat"))?;

    let result = ContentStore::open_dir(dir.path(), small_blocks());
    assert!(matches!(result, Err(TesseraError::CorruptStore(_))));
    Ok(())
}

#[test]
fn test_missing_toc_with_data_fails_to_open() -> Result<()> {
    let dir = TempDir::new()?;
    setup(dir.path())?.close()?;
    std::fs::remove_file(dir.path().join("toc.dat"))?;

    let result = ContentStore::open_dir(dir.path(), small_blocks());
    assert!(matches!(result, Err(TesseraError::CorruptStore(_))));
    Ok(())
}

#[test]
fn test_sync_on_store_with_explicit_storage() -> Result<()> {
    let dir = TempDir::new()?;
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(
        dir.path(),
        FileStorageConfig::new(dir.path()),
    )?);
    let store = ContentStore::open(
        Arc::clone(&storage),
        small_blocks().with_sync_on_store(true),
    )?;
    let id = store.store("durable")?;
    assert!(storage.file_size("data000001.dat")? > 0);
    assert_eq!(store.retrieve(id)?.as_deref(), Some("durable"));
    Ok(())
}

/// Storage whose data file outputs reject writes while `fail_writes` is set.
#[derive(Debug)]
struct FlakyStorage {
    inner: Arc<dyn Storage>,
    fail_writes: Arc<AtomicBool>,
}

#[derive(Debug)]
struct FlakyOutput {
    inner: Box<dyn StorageOutput>,
    fail_writes: Arc<AtomicBool>,
}

impl FlakyStorage {
    fn wrap(&self, name: &str, output: Box<dyn StorageOutput>) -> Box<dyn StorageOutput> {
        if name.starts_with("data") {
            Box::new(FlakyOutput {
                inner: output,
                fail_writes: Arc::clone(&self.fail_writes),
            })
        } else {
            output
        }
    }
}

impl Write for FlakyOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("device full"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl StorageOutput for FlakyOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.inner.flush_and_sync()
    }

    fn position(&self) -> u64 {
        self.inner.position()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

impl Storage for FlakyStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        self.inner.open_input(name)
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        Ok(self.wrap(name, self.inner.create_output(name)?))
    }

    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        Ok(self.wrap(name, self.inner.create_output_append(name)?))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.inner.file_exists(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.inner.delete_file(name)
    }

    fn list_files(&self) -> Result<Vec<String>> {
        self.inner.list_files()
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        self.inner.file_size(name)
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.inner.rename_file(old_name, new_name)
    }

    fn sync(&self) -> Result<()> {
        self.inner.sync()
    }
}

#[test]
fn test_failed_store_allocates_no_id() -> Result<()> {
    let inner: Arc<dyn Storage> = Arc::new(MemoryStorage::new(MemoryStorageConfig::default()));
    let fail_writes = Arc::new(AtomicBool::new(false));
    let storage: Arc<dyn Storage> = Arc::new(FlakyStorage {
        inner: Arc::clone(&inner),
        fail_writes: Arc::clone(&fail_writes),
    });
    let config = ContentStoreConfig::default()
        .with_block_size_chars(15)
        .with_data_file_size_hint(1024);

    let store = ContentStore::open(storage, config.clone())?;
    assert_eq!(store.store(DOCS[0])?, 1);
    assert_eq!(store.data_file_count(), 1);

    fail_writes.store(true, Ordering::SeqCst);
    assert!(matches!(store.store(DOCS[1]), Err(TesseraError::Io(_))));
    assert_eq!(store.next_id(), 2);
    assert_eq!(store.doc_ids(), vec![1]);
    assert_eq!(store.retrieve(2)?, None);
    // The file with the failed write is abandoned for a fresh one.
    assert_eq!(store.data_file_count(), 2);

    fail_writes.store(false, Ordering::SeqCst);
    assert_eq!(store.store(DOCS[1])?, 2);
    assert!(inner.file_exists("data000002.dat"));
    assert_eq!(store.retrieve(1)?.as_deref(), Some(DOCS[0]));
    assert_eq!(store.retrieve(2)?.as_deref(), Some(DOCS[1]));
    store.close()?;

    let store = ContentStore::open(inner, config)?;
    assert_eq!(store.doc_ids(), vec![1, 2]);
    assert_eq!(store.next_id(), 3);
    assert_eq!(store.retrieve(2)?.as_deref(), Some(DOCS[1]));
    Ok(())
}

#[test]
fn test_delete_after_close_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let store = setup(dir.path())?;
    store.close()?;

    assert!(matches!(
        store.delete(2),
        Err(TesseraError::InvalidOperation(_))
    ));
    drop(store);

    let store = ContentStore::open_dir(dir.path(), small_blocks())?;
    assert_eq!(store.retrieve(2)?.as_deref(), Some(DOCS[1]));
    Ok(())
}
