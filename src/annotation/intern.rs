//! Per-document term interning.

use std::sync::Arc;

use ahash::AHashSet;

/// Hands out one shared instance per distinct term.
///
/// A property keeps a single copy of each value it has seen since its last
/// [`TermInterner::clear`], so long documents with a small vocabulary stay
/// small in memory.
#[derive(Debug, Default, Clone)]
pub struct TermInterner {
    terms: AHashSet<Arc<str>>,
}

impl TermInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared instance equal to `term`, creating it if needed.
    pub fn intern(&mut self, term: &str) -> Arc<str> {
        if let Some(existing) = self.terms.get(term) {
            return Arc::clone(existing);
        }
        let term: Arc<str> = Arc::from(term);
        self.terms.insert(Arc::clone(&term));
        term
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }
}
