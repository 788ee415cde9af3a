//! Annotated field: a main property plus auxiliary properties, kept
//! position-synchronized per document.
//!
//! Typical per-document cycle:
//!
//! 1. the markup source adds terms to the properties, brackets every main
//!    property term with [`AnnotatedField::add_start_char`] /
//!    [`AnnotatedField::add_end_char`], and records inline tags;
//! 2. [`AnnotatedField::finish_document`] pads lagging properties so all of
//!    them end at the same position;
//! 3. [`AnnotatedField::flush`] emits one token stream per property
//!    alternative and submits each forward-indexed property's values;
//! 4. [`AnnotatedField::clear`] readies the field for the next document.

use log::debug;

use crate::annotation::config::AnnotationConfig;
use crate::annotation::naming;
use crate::annotation::property::AnnotatedProperty;
use crate::annotation::sensitivity::SensitivityMode;
use crate::annotation::sink::{DocumentRecord, ForwardIndexWriter, TokenSink};
use crate::error::{Result, TesseraError};

pub const PUNCT_PROPERTY: &str = "punct";
pub const START_TAG_PROPERTY: &str = "starttag";
pub const END_TAG_PROPERTY: &str = "endtag";

/// A multi-layer annotated field. The main property is always the first.
#[derive(Debug, Clone)]
pub struct AnnotatedField {
    name: String,
    properties: Vec<AnnotatedProperty>,
    start_chars: Vec<usize>,
    end_chars: Vec<usize>,
}

/// What [`AnnotatedField::flush`] handed out besides token streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushedField {
    pub field_name: String,

    /// Forward index id per forward-indexed property, in property order.
    pub forward_index_ids: Vec<(String, u32)>,
}

impl FlushedField {
    pub fn forward_index_id(&self, property: &str) -> Option<u32> {
        self.forward_index_ids
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, id)| *id)
    }

    /// Store the forward index ids as `field%prop#fiid` integer fields.
    pub fn store_ids(&self, record: &mut DocumentRecord) {
        for (property, id) in &self.forward_index_ids {
            record.add_stored_int(
                naming::forward_index_id_field(&self.field_name, property),
                *id,
            );
        }
    }
}

impl AnnotatedField {
    pub fn new<N, M>(name: N, main_property: M, sensitivity: SensitivityMode) -> Self
    where
        N: Into<String>,
        M: Into<String>,
    {
        AnnotatedField {
            name: name.into(),
            properties: vec![AnnotatedProperty::new(main_property, sensitivity)],
            start_chars: Vec::new(),
            end_chars: Vec::new(),
        }
    }

    /// Field with the configured main property plus `punct`, `starttag`
    /// and `endtag`. The tag properties have no forward index.
    pub fn with_standard_properties(config: &AnnotationConfig) -> Self {
        let mut field = Self::new(
            config.field_name.clone(),
            config.main_property.clone(),
            config.sensitivity_for(&config.main_property),
        );

        for name in [PUNCT_PROPERTY, START_TAG_PROPERTY, END_TAG_PROPERTY] {
            if field.property(name).is_some() {
                continue;
            }
            let mut property = AnnotatedProperty::new(name, config.sensitivity_for(name));
            if name != PUNCT_PROPERTY {
                property.set_forward_index(false);
            }
            field.properties.push(property);
        }
        field
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an auxiliary property. Names must be unique within the field.
    pub fn add_property<S: Into<String>>(
        &mut self,
        name: S,
        sensitivity: SensitivityMode,
    ) -> Result<&mut AnnotatedProperty> {
        let name = name.into();
        if self.property(&name).is_some() {
            return Err(TesseraError::invalid_argument(format!(
                "Field {} already has a property named {name}",
                self.name
            )));
        }
        self.properties
            .push(AnnotatedProperty::new(name, sensitivity));
        let index = self.properties.len() - 1;
        Ok(&mut self.properties[index])
    }

    pub fn property(&self, name: &str) -> Option<&AnnotatedProperty> {
        self.properties.iter().find(|p| p.name() == name)
    }

    pub fn property_mut(&mut self, name: &str) -> Option<&mut AnnotatedProperty> {
        self.properties.iter_mut().find(|p| p.name() == name)
    }

    /// All properties, main property first, then in insertion order.
    pub fn properties(&self) -> &[AnnotatedProperty] {
        &self.properties
    }

    pub fn main_property(&self) -> &AnnotatedProperty {
        &self.properties[0]
    }

    pub fn main_property_mut(&mut self) -> &mut AnnotatedProperty {
        &mut self.properties[0]
    }

    /// Add a term to the main property.
    pub fn add_value(&mut self, term: &str) {
        self.main_property_mut().add_value(term);
    }

    pub fn add_start_char(&mut self, position: usize) {
        self.start_chars.push(position);
    }

    pub fn add_end_char(&mut self, position: usize) {
        self.end_chars.push(position);
    }

    pub fn start_chars(&self) -> &[usize] {
        &self.start_chars
    }

    pub fn end_chars(&self) -> &[usize] {
        &self.end_chars
    }

    /// Record an opening inline tag at the position of the next main
    /// property term, with one `@name__value` term per attribute.
    pub fn add_start_tag(&mut self, tag: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let increment = self.tag_increment(START_TAG_PROPERTY)?;
        let property = self.tag_property(START_TAG_PROPERTY)?;
        property.add_value_with_increment(tag, increment);
        for (name, value) in attributes {
            let term = format!("@{}__{}", name.to_lowercase(), value.to_lowercase());
            property.add_value_with_increment(&term, 0);
        }
        Ok(())
    }

    /// Record a closing inline tag after the last main property term.
    pub fn add_end_tag(&mut self, tag: &str) -> Result<()> {
        let increment = self.tag_increment(END_TAG_PROPERTY)?;
        self.tag_property(END_TAG_PROPERTY)?
            .add_value_with_increment(tag, increment);
        Ok(())
    }

    fn tag_property(&mut self, name: &str) -> Result<&mut AnnotatedProperty> {
        let field = self.name.clone();
        self.property_mut(name).ok_or_else(|| {
            TesseraError::field(format!("Field {field} has no {name} property"))
        })
    }

    fn tag_increment(&self, name: &str) -> Result<u32> {
        let last_tag = self
            .property(name)
            .ok_or_else(|| {
                TesseraError::field(format!("Field {} has no {name} property", self.name))
            })?
            .last_value_position();
        let current = self.main_property().last_value_position();
        u32::try_from((current - last_tag + 1).max(0))
            .map_err(|_| TesseraError::field(format!("Position gap too large for {name}")))
    }

    /// Pad every property lagging behind the furthest one with empty terms.
    ///
    /// Padding the main property also adds a zero-length offset pair at
    /// `content_position`, keeping offsets aligned with its terms.
    pub fn finish_document(&mut self, content_position: usize) {
        let target = self
            .properties
            .iter()
            .map(AnnotatedProperty::last_value_position)
            .max()
            .unwrap_or(-1);

        for (index, property) in self.properties.iter_mut().enumerate() {
            let mut padded = 0;
            while property.last_value_position() < target {
                property.add_value("");
                if index == 0 {
                    self.start_chars.push(content_position);
                    self.end_chars.push(content_position);
                }
                padded += 1;
            }
            if padded > 0 {
                debug!(
                    "padded {} of field {} with {padded} empty terms",
                    property.name(),
                    self.name
                );
            }
        }
    }

    /// Emit all token streams to `sink` and submit forward-indexed values.
    ///
    /// Only the main alternative of the main property carries offsets.
    ///
    /// # Panics
    ///
    /// If the properties end at different positions, i.e.
    /// [`AnnotatedField::finish_document`] was not called after the last
    /// term was added.
    pub fn flush(
        &self,
        sink: &mut dyn TokenSink,
        forward_index: &mut dyn ForwardIndexWriter,
    ) -> Result<FlushedField> {
        let main = self.main_property();
        if self.start_chars.len() != main.len() || self.end_chars.len() != main.len() {
            return Err(TesseraError::field(format!(
                "Field {}: {} start and {} end offsets for {} terms of {}",
                self.name,
                self.start_chars.len(),
                self.end_chars.len(),
                main.len(),
                main.name()
            )));
        }

        let end = main.last_value_position();
        for property in &self.properties {
            assert_eq!(
                property.last_value_position(),
                end,
                "property {} of field {} is out of sync with {}",
                property.name(),
                self.name,
                main.name()
            );
        }

        for (index, property) in self.properties.iter().enumerate() {
            for &alternative in property.alternatives() {
                let index_field = naming::alternative_field(&self.name, property.name(), alternative);
                let tokens = if index == 0 && alternative == property.main_alternative() {
                    property.tokens_with_offsets(alternative, &self.start_chars, &self.end_chars)
                } else {
                    property.tokens(alternative)
                };
                sink.add_token_stream(&index_field, tokens)?;
            }
        }

        let mut forward_index_ids = Vec::new();
        for property in self.properties.iter().filter(|p| p.has_forward_index()) {
            let fi_field = naming::property_field(&self.name, property.name());
            let id = forward_index.submit(&fi_field, property.values())?;
            forward_index_ids.push((property.name().to_string(), id));
        }

        Ok(FlushedField {
            field_name: self.name.clone(),
            forward_index_ids,
        })
    }

    /// Reset all properties and offsets for the next document.
    pub fn clear(&mut self) {
        for property in &mut self.properties {
            property.clear();
        }
        self.start_chars.clear();
        self.end_chars.clear();
    }
}
