//! End-of-document assembly: content store, token streams and forward
//! index ids combined into one [`DocumentRecord`].

use log::debug;

use crate::annotation::field::AnnotatedField;
use crate::annotation::naming;
use crate::annotation::sink::{DocumentRecord, ForwardIndexWriter};
use crate::content_store::ContentStore;
use crate::error::Result;

/// Runs the end-of-document sequence against a shared content store.
///
/// Several assemblers (one per indexing thread, each with its own field)
/// may share one store.
///
/// ```
/// use std::sync::Arc;
/// use tessera::annotation::{AnnotatedField, AnnotationConfig, DocumentAssembler, MemoryForwardIndex};
/// use tessera::content_store::{ContentStore, ContentStoreConfig};
/// use tessera::storage::memory::{MemoryStorage, MemoryStorageConfig};
///
/// let storage = Arc::new(MemoryStorage::new(MemoryStorageConfig::default()));
/// let store = ContentStore::open(storage, ContentStoreConfig::default()).unwrap();
/// let assembler = DocumentAssembler::new(&store);
///
/// let mut field = AnnotatedField::with_standard_properties(&AnnotationConfig::default());
/// field.add_start_char(0);
/// field.add_value("Hallo");
/// field.add_end_char(5);
///
/// let mut forward_index = MemoryForwardIndex::new();
/// let record = assembler
///     .finish_document(&mut field, "Hallo", 5, &mut forward_index)
///     .unwrap();
///
/// assert_eq!(record.stored_int("contents#cid"), Some(1));
/// assert!(field.main_property().is_empty());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DocumentAssembler<'a> {
    store: &'a ContentStore,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(store: &'a ContentStore) -> Self {
        DocumentAssembler { store }
    }

    /// Synchronize and flush `field`, store `content`, and clear the field.
    ///
    /// `content_position` is the character position reached in the content,
    /// used for the offsets of main property padding. The content is only
    /// stored once the flush succeeded, so a failed flush allocates no
    /// content id. The field is not cleared on error: its properties may
    /// already be padded and values submitted to the forward index before
    /// the failure stay there. Call [`AnnotatedField::clear`] before the
    /// next document.
    pub fn finish_document(
        &self,
        field: &mut AnnotatedField,
        content: &str,
        content_position: usize,
        forward_index: &mut dyn ForwardIndexWriter,
    ) -> Result<DocumentRecord> {
        let mut record = DocumentRecord::new();

        field.finish_document(content_position);
        let flushed = field.flush(&mut record, forward_index)?;

        let content_id = self.store.store(content)?;
        record.add_stored_int(naming::content_id_field(field.name()), content_id);
        flushed.store_ids(&mut record);

        debug!(
            "assembled document {content_id}: {} positions in field {}",
            field.main_property().last_value_position() + 1,
            field.name()
        );
        field.clear();
        Ok(record)
    }
}
