//! Annotated field and property model.
//!
//! Each document is indexed as one annotated field made of several
//! parallel properties (word form, lemma, punctuation, inline tag
//! boundaries), each a position-synchronized term sequence that can be
//! indexed with several case/diacritics sensitivities.

pub mod assembler;
pub mod config;
pub mod field;
pub mod intern;
pub mod naming;
pub mod property;
pub mod sensitivity;
pub mod sink;
pub mod token;

pub use assembler::DocumentAssembler;
pub use config::AnnotationConfig;
pub use field::{AnnotatedField, FlushedField};
pub use property::AnnotatedProperty;
pub use sensitivity::{AlternativeKind, SensitivityMode};
pub use sink::{DocumentRecord, ForwardIndexWriter, MemoryForwardIndex, TokenSink};
pub use token::{AnnotatedToken, PropertyTokens};
