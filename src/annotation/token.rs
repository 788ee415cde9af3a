//! Tokens emitted from an annotated property.
//!
//! A property is stored as parallel value/increment sequences; at flush time
//! each alternative turns them into a stream of [`AnnotatedToken`]s for the
//! index writer. Positions follow the usual increment convention:
//!
//! ```text
//! values:      "the"  "cat"  "@pos__n"  ""  "sat"
//! increments:    1      1        0       1     1
//! position:      0      1        1       2     3
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::annotation::sensitivity::AlternativeKind;

/// One term as handed to the index writer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedToken {
    /// The term after the alternative's transform.
    pub term: String,

    /// Token position (0-based).
    pub position: usize,

    /// Distance from the previous token's position.
    pub position_increment: u32,

    /// Character range `[start, end)` in the document content, present only
    /// on the main alternative of a field's main property.
    pub offsets: Option<(usize, usize)>,
}

impl AnnotatedToken {
    pub fn new<S: Into<String>>(term: S, position: usize, position_increment: u32) -> Self {
        AnnotatedToken {
            term: term.into(),
            position,
            position_increment,
            offsets: None,
        }
    }

    pub fn with_offsets(mut self, start: usize, end: usize) -> Self {
        self.offsets = Some((start, end));
        self
    }
}

/// Iterator producing the token stream of one property alternative.
#[derive(Debug, Clone)]
pub struct PropertyTokens<'a> {
    values: &'a [Arc<str>],
    increments: &'a [u32],
    offsets: Option<(&'a [usize], &'a [usize])>,
    alternative: AlternativeKind,
    index: usize,
    cumulative: usize,
}

impl<'a> PropertyTokens<'a> {
    /// `offsets`, when given, must be as long as `values`.
    pub(crate) fn new(
        values: &'a [Arc<str>],
        increments: &'a [u32],
        offsets: Option<(&'a [usize], &'a [usize])>,
        alternative: AlternativeKind,
    ) -> Self {
        PropertyTokens {
            values,
            increments,
            offsets,
            alternative,
            index: 0,
            cumulative: 0,
        }
    }

    pub fn alternative(&self) -> AlternativeKind {
        self.alternative
    }

    pub fn has_offsets(&self) -> bool {
        self.offsets.is_some()
    }
}

impl Iterator for PropertyTokens<'_> {
    type Item = AnnotatedToken;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.values.get(self.index)?;
        let increment = self.increments[self.index];
        self.cumulative += increment as usize;

        let mut token = AnnotatedToken::new(
            self.alternative.fold(value),
            self.cumulative.saturating_sub(1),
            increment,
        );
        if let Some((starts, ends)) = self.offsets {
            token = token.with_offsets(starts[self.index], ends[self.index]);
        }

        self.index += 1;
        Some(token)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.values.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PropertyTokens<'_> {}
