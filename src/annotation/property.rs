//! A single annotation layer of a field.

use std::sync::Arc;

use crate::annotation::intern::TermInterner;
use crate::annotation::sensitivity::{AlternativeKind, SensitivityMode};
use crate::annotation::token::PropertyTokens;

/// One annotation layer (word form, lemma, tag boundaries, ...) of a
/// document, kept as a sequence of terms with position increments.
///
/// Several terms can share a position by adding them with increment 0.
///
/// ```
/// use tessera::annotation::{AnnotatedProperty, SensitivityMode};
///
/// let mut lemma = AnnotatedProperty::new("lemma", SensitivityMode::SensitiveAndInsensitive);
/// lemma.add_value("de");
/// lemma.add_value("kat");
/// assert_eq!(lemma.last_value_position(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct AnnotatedProperty {
    name: String,
    values: Vec<Arc<str>>,
    increments: Vec<u32>,
    last_position: i64,
    sensitivity: SensitivityMode,
    has_forward_index: bool,
    interner: TermInterner,
}

impl AnnotatedProperty {
    pub fn new<S: Into<String>>(name: S, sensitivity: SensitivityMode) -> Self {
        AnnotatedProperty {
            name: name.into(),
            values: Vec::new(),
            increments: Vec::new(),
            last_position: -1,
            sensitivity,
            has_forward_index: true,
            interner: TermInterner::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sensitivity(&self) -> SensitivityMode {
        self.sensitivity
    }

    pub fn alternatives(&self) -> &'static [AlternativeKind] {
        self.sensitivity.alternatives()
    }

    pub fn main_alternative(&self) -> AlternativeKind {
        self.sensitivity.main_alternative()
    }

    pub fn has_forward_index(&self) -> bool {
        self.has_forward_index
    }

    pub fn set_forward_index(&mut self, has_forward_index: bool) {
        self.has_forward_index = has_forward_index;
    }

    /// Add a term at the next position.
    pub fn add_value(&mut self, term: &str) {
        self.add_value_with_increment(term, 1);
    }

    /// Add a term `increment` positions after the previous one.
    ///
    /// If the previous term is the empty placeholder and `increment` is 0,
    /// the placeholder is replaced instead, so a padded position can still
    /// receive its real value later. The first term always lands on
    /// position 0, so an increment of 0 is raised to 1 there.
    pub fn add_value_with_increment(&mut self, term: &str, mut increment: u32) {
        let term = self.interner.intern(term);
        if self.values.is_empty() {
            increment = increment.max(1);
        }

        if increment == 0 {
            if let Some(last) = self.values.last_mut() {
                if last.is_empty() {
                    *last = term;
                    return;
                }
            }
        }

        self.values.push(term);
        self.increments.push(increment);
        self.last_position += i64::from(increment);
    }

    /// Position of the last term, or -1 if there is none.
    pub fn last_value_position(&self) -> i64 {
        self.last_position
    }

    /// Terms in insertion order, untransformed.
    pub fn values(&self) -> &[Arc<str>] {
        &self.values
    }

    pub fn increments(&self) -> &[u32] {
        &self.increments
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Token stream for one alternative, without character offsets.
    pub fn tokens(&self, alternative: AlternativeKind) -> PropertyTokens<'_> {
        PropertyTokens::new(&self.values, &self.increments, None, alternative)
    }

    /// Token stream carrying `[starts[i], ends[i])` on the i-th term.
    /// Both slices must be as long as [`AnnotatedProperty::values`].
    pub(crate) fn tokens_with_offsets<'a>(
        &'a self,
        alternative: AlternativeKind,
        starts: &'a [usize],
        ends: &'a [usize],
    ) -> PropertyTokens<'a> {
        PropertyTokens::new(
            &self.values,
            &self.increments,
            Some((starts, ends)),
            alternative,
        )
    }

    /// Forget all terms and the intern cache.
    pub fn clear(&mut self) {
        self.values.clear();
        self.increments.clear();
        self.last_position = -1;
        self.interner.clear();
    }
}
