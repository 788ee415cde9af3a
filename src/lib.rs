//! # Tessera
//!
//! Document persistence for corpus search engines.
//!
//! ## Features
//!
//! - Block-compressed, append-only content store with random access to
//!   arbitrary character ranges
//! - Ids that are never reused, soft deletion, crash-safe metadata
//! - Annotated fields: parallel, position-synchronized properties with
//!   case and diacritics sensitivity alternatives
//! - Pluggable storage backends (file system, memory)

pub mod annotation;
pub mod cli;
pub mod content_store;
pub mod error;
pub mod storage;
pub mod util;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
