//! Index field naming.
//!
//! An annotated field `contents` with property `lemma` is indexed as
//! `contents%lemma@s`, `contents%lemma@i`, ... (one index field per
//! alternative). Its forward index is registered as `contents%lemma`, and
//! the ids handed back by the content store and forward index are stored as
//! `contents#cid` and `contents%lemma#fiid`.

use crate::annotation::sensitivity::AlternativeKind;

pub const PROPERTY_SEPARATOR: char = '%';
pub const ALTERNATIVE_SEPARATOR: char = '@';
pub const BOOKKEEPING_SEPARATOR: char = '#';

/// `field%property`
pub fn property_field(field: &str, property: &str) -> String {
    format!("{field}{PROPERTY_SEPARATOR}{property}")
}

/// `field%property@alt`
pub fn alternative_field(field: &str, property: &str, alternative: AlternativeKind) -> String {
    format!(
        "{}{ALTERNATIVE_SEPARATOR}{}",
        property_field(field, property),
        alternative.suffix()
    )
}

/// `field#cid`
pub fn content_id_field(field: &str) -> String {
    format!("{field}{BOOKKEEPING_SEPARATOR}cid")
}

/// `field%property#fiid`
pub fn forward_index_id_field(field: &str, property: &str) -> String {
    format!(
        "{}{BOOKKEEPING_SEPARATOR}fiid",
        property_field(field, property)
    )
}

/// Split an index field name back into field, property and alternative.
pub fn parse_alternative_field(name: &str) -> Option<(&str, &str, AlternativeKind)> {
    let (field, rest) = name.split_once(PROPERTY_SEPARATOR)?;
    let (property, suffix) = rest.rsplit_once(ALTERNATIVE_SEPARATOR)?;
    Some((field, property, AlternativeKind::from_suffix(suffix)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(property_field("contents", "lemma"), "contents%lemma");
        assert_eq!(
            alternative_field("contents", "word", AlternativeKind::CaseInsensitive),
            "contents%word@ci"
        );
        assert_eq!(content_id_field("contents"), "contents#cid");
        assert_eq!(
            forward_index_id_field("contents", "punct"),
            "contents%punct#fiid"
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            parse_alternative_field("contents%word@di"),
            Some(("contents", "word", AlternativeKind::DiacriticsInsensitive))
        );
        assert_eq!(parse_alternative_field("contents%word"), None);
        assert_eq!(parse_alternative_field("contents%word@zz"), None);
    }
}
