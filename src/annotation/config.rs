//! Configuration of annotated fields.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::annotation::sensitivity::SensitivityMode;
use crate::error::Result;

/// Default name of the annotated field holding document contents.
pub const DEFAULT_FIELD_NAME: &str = "contents";

/// Default main property.
pub const DEFAULT_MAIN_PROPERTY: &str = "word";

/// How the annotated field of a document is laid out.
///
/// ```
/// use tessera::annotation::{AnnotationConfig, SensitivityMode};
///
/// let config: AnnotationConfig =
///     serde_json::from_str(r#"{"sensitivities": {"pos": "only_sensitive"}}"#).unwrap();
/// assert_eq!(config.main_property, "word");
/// assert_eq!(config.sensitivity_for("pos"), SensitivityMode::OnlySensitive);
/// assert_eq!(config.sensitivity_for("lemma"), SensitivityMode::SensitiveAndInsensitive);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    pub field_name: String,

    /// Property that carries character offsets.
    pub main_property: String,

    /// Explicit sensitivity per property; others use name-based defaults.
    pub sensitivities: BTreeMap<String, SensitivityMode>,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        AnnotationConfig {
            field_name: DEFAULT_FIELD_NAME.to_string(),
            main_property: DEFAULT_MAIN_PROPERTY.to_string(),
            sensitivities: BTreeMap::new(),
        }
    }
}

impl AnnotationConfig {
    pub fn with_field_name<S: Into<String>>(mut self, field_name: S) -> Self {
        self.field_name = field_name.into();
        self
    }

    pub fn with_main_property<S: Into<String>>(mut self, main_property: S) -> Self {
        self.main_property = main_property.into();
        self
    }

    pub fn with_sensitivity<S: Into<String>>(mut self, property: S, mode: SensitivityMode) -> Self {
        self.sensitivities.insert(property.into(), mode);
        self
    }

    pub fn sensitivity_for(&self, property: &str) -> SensitivityMode {
        self.sensitivities
            .get(property)
            .copied()
            .unwrap_or_else(|| SensitivityMode::default_for_property(property))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
