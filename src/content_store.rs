//! Compressed, block-structured document content store.
//!
//! Each stored document gets a positive integer id that is never reused.
//! Its text is split into blocks of a fixed number of characters, each
//! block compressed independently and appended to rolling data files, so
//! that any character range can be read back by decompressing only the
//! blocks that overlap it.
//!
//! ```
//! use std::sync::Arc;
//! use tessera::content_store::{ContentStore, ContentStoreConfig};
//! use tessera::storage::memory::{MemoryStorage, MemoryStorageConfig};
//!
//! let storage = Arc::new(MemoryStorage::new(MemoryStorageConfig::default()));
//! let config = ContentStoreConfig::default().with_block_size_chars(15);
//! let store = ContentStore::open(storage, config).unwrap();
//!
//! let id = store.store("jumps over the lazy ").unwrap();
//! let parts = store.retrieve_parts(id, &[0, 11], &[5, 14]).unwrap();
//! assert_eq!(parts, vec![Some("jumps".to_string()), Some("the".to_string())]);
//! ```

pub mod codec;
pub mod config;
pub mod data_file;
pub mod entry;
pub mod store;
pub mod writer;

/// Identifier of a stored document. Allocated from 1 upwards.
pub type ContentId = u32;

pub use config::ContentStoreConfig;
pub use entry::{BlockRef, ContentEntry};
pub use store::ContentStore;
pub use writer::ContentWriter;
