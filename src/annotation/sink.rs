//! Collaborators that receive flushed annotations, and the per-document
//! output record.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashMap;
use serde::Serialize;

use crate::annotation::token::{AnnotatedToken, PropertyTokens};
use crate::error::{Result, TesseraError};

/// Receives one token stream per property alternative.
pub trait TokenSink {
    fn add_token_stream(&mut self, index_field: &str, tokens: PropertyTokens<'_>) -> Result<()>;
}

/// Stores the canonical value sequence of a property and returns its id.
pub trait ForwardIndexWriter {
    fn submit(&mut self, field: &str, values: &[Arc<str>]) -> Result<u32>;
}

/// Everything produced for one document: token streams by index field and
/// stored integer fields (content id, forward index ids).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    streams: BTreeMap<String, Vec<AnnotatedToken>>,
    stored: BTreeMap<String, u32>,
}

impl DocumentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stored_int<S: Into<String>>(&mut self, name: S, value: u32) {
        self.stored.insert(name.into(), value);
    }

    pub fn stored_int(&self, name: &str) -> Option<u32> {
        self.stored.get(name).copied()
    }

    pub fn stored_ints(&self) -> &BTreeMap<String, u32> {
        &self.stored
    }

    pub fn stream(&self, index_field: &str) -> Option<&[AnnotatedToken]> {
        self.streams.get(index_field).map(Vec::as_slice)
    }

    /// Names of all index fields that received a stream, sorted.
    pub fn stream_names(&self) -> impl Iterator<Item = &str> {
        self.streams.keys().map(String::as_str)
    }
}

impl TokenSink for DocumentRecord {
    fn add_token_stream(&mut self, index_field: &str, tokens: PropertyTokens<'_>) -> Result<()> {
        self.streams
            .entry(index_field.to_string())
            .or_default()
            .extend(tokens);
        Ok(())
    }
}

/// Forward index kept in memory; ids are assigned sequentially per field,
/// starting at 0.
#[derive(Debug, Default)]
pub struct MemoryForwardIndex {
    fields: AHashMap<String, Vec<Vec<Arc<str>>>>,
}

impl MemoryForwardIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str, id: u32) -> Option<&[Arc<str>]> {
        self.fields
            .get(field)
            .and_then(|docs| docs.get(id as usize))
            .map(Vec::as_slice)
    }

    /// Number of sequences stored for `field`.
    pub fn len(&self, field: &str) -> usize {
        self.fields.get(field).map_or(0, Vec::len)
    }

    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ForwardIndexWriter for MemoryForwardIndex {
    fn submit(&mut self, field: &str, values: &[Arc<str>]) -> Result<u32> {
        let docs = self.fields.entry(field.to_string()).or_default();
        let id = u32::try_from(docs.len())
            .map_err(|_| TesseraError::invalid_operation(format!("Forward index {field} is full")))?;
        docs.push(values.to_vec());
        Ok(id)
    }
}
