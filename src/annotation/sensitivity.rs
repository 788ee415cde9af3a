//! Case and diacritics sensitivity.
//!
//! A property can be indexed in up to four ways ("alternatives"), each a
//! pure text transform applied to every stored value:
//!
//! | Alternative             | Suffix | Transform                       |
//! |-------------------------|--------|---------------------------------|
//! | `Sensitive`             | `s`    | identity                        |
//! | `Insensitive`           | `i`    | lower-case and strip diacritics |
//! | `CaseInsensitive`       | `ci`   | lower-case                      |
//! | `DiacriticsInsensitive` | `di`   | strip diacritics                |
//!
//! Which alternatives a property gets is selected by its [`SensitivityMode`].
//!
//! ```
//! use tessera::annotation::sensitivity::AlternativeKind;
//!
//! assert_eq!(AlternativeKind::Insensitive.fold("Één"), "een");
//! assert_eq!(AlternativeKind::CaseInsensitive.fold("Één"), "één");
//! assert_eq!(AlternativeKind::DiacriticsInsensitive.fold("Één"), "Een");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::error::{Result, TesseraError};

/// One way of indexing a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlternativeKind {
    Sensitive,
    Insensitive,
    CaseInsensitive,
    DiacriticsInsensitive,
}

impl AlternativeKind {
    /// All alternatives, in the order they are emitted.
    pub const ALL: [AlternativeKind; 4] = [
        AlternativeKind::Sensitive,
        AlternativeKind::Insensitive,
        AlternativeKind::CaseInsensitive,
        AlternativeKind::DiacriticsInsensitive,
    ];

    /// Suffix used in index field names.
    pub fn suffix(self) -> &'static str {
        match self {
            AlternativeKind::Sensitive => "s",
            AlternativeKind::Insensitive => "i",
            AlternativeKind::CaseInsensitive => "ci",
            AlternativeKind::DiacriticsInsensitive => "di",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        AlternativeKind::ALL
            .into_iter()
            .find(|alt| alt.suffix() == suffix)
    }

    /// Apply this alternative's transform. Borrows when nothing changes.
    pub fn fold(self, value: &str) -> Cow<'_, str> {
        match self {
            AlternativeKind::Sensitive => Cow::Borrowed(value),
            AlternativeKind::Insensitive => match lowercase(value) {
                Cow::Borrowed(lower) => strip_diacritics(lower),
                Cow::Owned(lower) => Cow::Owned(strip_diacritics(&lower).into_owned()),
            },
            AlternativeKind::CaseInsensitive => lowercase(value),
            AlternativeKind::DiacriticsInsensitive => strip_diacritics(value),
        }
    }
}

impl fmt::Display for AlternativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

fn lowercase(value: &str) -> Cow<'_, str> {
    let lower = value.to_lowercase();
    if lower == value {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(lower)
    }
}

fn strip_diacritics(value: &str) -> Cow<'_, str> {
    if value.is_ascii() {
        return Cow::Borrowed(value);
    }
    let stripped: String = value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .nfc()
        .collect();
    if stripped == value {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(stripped)
    }
}

/// Which alternatives a property is indexed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityMode {
    OnlyInsensitive,
    OnlySensitive,
    SensitiveAndInsensitive,
    AllFourCombinations,
}

impl SensitivityMode {
    /// The alternatives this mode produces, in emission order.
    pub fn alternatives(self) -> &'static [AlternativeKind] {
        use AlternativeKind::*;
        match self {
            SensitivityMode::OnlyInsensitive => &[Insensitive],
            SensitivityMode::OnlySensitive => &[Sensitive],
            SensitivityMode::SensitiveAndInsensitive => &[Sensitive, Insensitive],
            SensitivityMode::AllFourCombinations => {
                &[Sensitive, Insensitive, CaseInsensitive, DiacriticsInsensitive]
            }
        }
    }

    /// The alternative eligible for character offsets: sensitive whenever
    /// the mode indexes sensitively, insensitive otherwise.
    pub fn main_alternative(self) -> AlternativeKind {
        match self {
            SensitivityMode::OnlyInsensitive => AlternativeKind::Insensitive,
            _ => AlternativeKind::Sensitive,
        }
    }

    /// Mode used for a property that has no explicit configuration.
    pub fn default_for_property(name: &str) -> Self {
        match name {
            "word" | "lemma" => SensitivityMode::SensitiveAndInsensitive,
            "starttag" | "endtag" => SensitivityMode::OnlySensitive,
            _ => SensitivityMode::OnlyInsensitive,
        }
    }
}

impl FromStr for SensitivityMode {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "i" => Ok(SensitivityMode::OnlyInsensitive),
            "s" => Ok(SensitivityMode::OnlySensitive),
            "si" | "is" => Ok(SensitivityMode::SensitiveAndInsensitive),
            "all" => Ok(SensitivityMode::AllFourCombinations),
            other => Err(TesseraError::invalid_argument(format!(
                "Unknown sensitivity setting '{other}' (expected i, s, si or all)"
            ))),
        }
    }
}
