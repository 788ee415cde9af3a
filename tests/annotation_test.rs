//! Integration tests for the annotated field model.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use tessera::annotation::field::{END_TAG_PROPERTY, PUNCT_PROPERTY, START_TAG_PROPERTY};
use tessera::annotation::naming;
use tessera::annotation::{
    AlternativeKind, AnnotatedField, AnnotatedToken, AnnotationConfig, DocumentAssembler,
    DocumentRecord, ForwardIndexWriter, MemoryForwardIndex, SensitivityMode,
};
use tessera::content_store::{ContentStore, ContentStoreConfig};
use tessera::error::{Result, TesseraError};

fn terms(tokens: &[AnnotatedToken]) -> Vec<(&str, usize)> {
    tokens
        .iter()
        .map(|t| (t.term.as_str(), t.position))
        .collect()
}

#[test]
fn test_lagging_property_padded_to_main() -> Result<()> {
    let mut field = AnnotatedField::new("contents", "word", SensitivityMode::OnlySensitive);
    field.add_property("tag", SensitivityMode::OnlySensitive)?;

    for (word, start) in [("a", 0), ("b", 2), ("c", 4)] {
        field.add_value(word);
        field.add_start_char(start);
        field.add_end_char(start + 1);
    }
    field
        .property_mut("tag")
        .ok_or_else(|| TesseraError::field("missing tag property"))?
        .add_value("x");

    field.finish_document(5);

    let tag = field.property("tag").unwrap();
    assert_eq!(tag.last_value_position(), 2);
    let values: Vec<&str> = tag.values().iter().map(|v| &**v).collect();
    assert_eq!(values, vec!["x", "", ""]);
    assert_eq!(field.main_property().last_value_position(), 2);
    assert_eq!(field.start_chars(), &[0, 2, 4]);
    Ok(())
}

#[test]
fn test_document_with_inline_tags() -> Result<()> {
    let mut field = AnnotatedField::with_standard_properties(&AnnotationConfig::default());

    field.add_start_tag("s", &[])?;
    field.add_value("The");
    field.add_start_char(0);
    field.add_end_char(3);
    field.add_start_tag("b", &[("Class", "Big")])?;
    field.add_value("quick");
    field.add_start_char(4);
    field.add_end_char(9);
    field.add_end_tag("b")?;
    field.add_end_tag("s")?;

    field.finish_document(9);
    for property in field.properties() {
        assert_eq!(property.last_value_position(), 2, "{}", property.name());
    }

    let mut record = DocumentRecord::new();
    let mut forward_index = MemoryForwardIndex::new();
    let flushed = field.flush(&mut record, &mut forward_index)?;

    let word = record.stream("contents%word@s").unwrap();
    assert_eq!(terms(word), vec![("The", 0), ("quick", 1), ("", 2)]);
    let offsets: Vec<_> = word.iter().map(|t| t.offsets).collect();
    assert_eq!(offsets, vec![Some((0, 3)), Some((4, 9)), Some((9, 9))]);

    let folded = record.stream("contents%word@i").unwrap();
    assert_eq!(terms(folded), vec![("the", 0), ("quick", 1), ("", 2)]);
    assert!(folded.iter().all(|t| t.offsets.is_none()));

    let start_tags = record.stream("contents%starttag@s").unwrap();
    assert_eq!(
        terms(start_tags),
        vec![("s", 0), ("b", 1), ("@class__big", 1), ("", 2)]
    );
    let end_tags = record.stream("contents%endtag@s").unwrap();
    assert_eq!(terms(end_tags), vec![("b", 2), ("s", 2)]);

    let punct = record.stream("contents%punct@i").unwrap();
    assert_eq!(terms(punct), vec![("", 0), ("", 1), ("", 2)]);

    assert_eq!(
        forward_index.field_names(),
        vec!["contents%punct", "contents%word"]
    );
    assert_eq!(flushed.forward_index_id("word"), Some(0));
    assert_eq!(flushed.forward_index_id(PUNCT_PROPERTY), Some(0));
    assert_eq!(flushed.forward_index_id(START_TAG_PROPERTY), None);
    assert_eq!(flushed.forward_index_id(END_TAG_PROPERTY), None);

    let word_values: Vec<&str> = forward_index
        .get("contents%word", 0)
        .unwrap()
        .iter()
        .map(|v| &**v)
        .collect();
    assert_eq!(word_values, vec!["The", "quick", ""]);
    Ok(())
}

#[test]
fn test_all_four_alternatives() -> Result<()> {
    let config = AnnotationConfig::default()
        .with_field_name("text")
        .with_sensitivity("word", SensitivityMode::AllFourCombinations);
    let mut field = AnnotatedField::with_standard_properties(&config);
    field.add_value("Élan");
    field.add_start_char(0);
    field.add_end_char(4);
    field.finish_document(4);

    let mut record = DocumentRecord::new();
    field.flush(&mut record, &mut MemoryForwardIndex::new())?;

    let expected = [
        (AlternativeKind::Sensitive, "Élan"),
        (AlternativeKind::Insensitive, "elan"),
        (AlternativeKind::CaseInsensitive, "élan"),
        (AlternativeKind::DiacriticsInsensitive, "Elan"),
    ];
    for (alternative, term) in expected {
        let name = naming::alternative_field("text", "word", alternative);
        let stream = record.stream(&name).unwrap();
        assert_eq!(stream[0].term, term, "{name}");
        assert_eq!(
            stream[0].offsets.is_some(),
            alternative == AlternativeKind::Sensitive
        );
        assert_eq!(naming::parse_alternative_field(&name), Some(("text", "word", alternative)));
    }
    Ok(())
}

#[test]
fn test_only_insensitive_main_property_carries_offsets() -> Result<()> {
    let mut field = AnnotatedField::new("contents", "word", SensitivityMode::OnlyInsensitive);
    field.add_value("Hallo");
    field.add_start_char(0);
    field.add_end_char(5);
    field.finish_document(5);

    let mut record = DocumentRecord::new();
    field.flush(&mut record, &mut MemoryForwardIndex::new())?;
    let stream = record.stream("contents%word@i").unwrap();
    assert_eq!(stream[0].term, "hallo");
    assert_eq!(stream[0].offsets, Some((0, 5)));
    assert!(record.stream("contents%word@s").is_none());
    Ok(())
}

#[test]
fn test_properties_end_in_sync() -> Result<()> {
    let words = ["Dit", "is", "één", "Zin", "ÉN", "nog", "één"];
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..50 {
        let mut field =
            AnnotatedField::new("contents", "word", SensitivityMode::SensitiveAndInsensitive);
        field.add_property("lemma", SensitivityMode::OnlyInsensitive)?;
        field.add_property("pos", SensitivityMode::OnlySensitive)?;

        let mut offset = 0;
        for _ in 0..rng.random_range(0..30) {
            let word = words[rng.random_range(0..words.len())];
            match rng.random_range(0..3) {
                0 => {
                    field.add_value(word);
                    field.add_start_char(offset);
                    offset += word.chars().count();
                    field.add_end_char(offset);
                    offset += 1;
                }
                1 => {
                    let increment = rng.random_range(1..3);
                    field
                        .property_mut("lemma")
                        .unwrap()
                        .add_value_with_increment(&word.to_lowercase(), increment);
                }
                _ => field.property_mut("pos").unwrap().add_value("NOU"),
            }
        }

        let target = field
            .properties()
            .iter()
            .map(|p| p.last_value_position())
            .max()
            .unwrap();
        field.finish_document(offset);
        for property in field.properties() {
            assert_eq!(property.last_value_position(), target);
        }
        assert_eq!(field.start_chars().len(), field.main_property().len());

        let mut record = DocumentRecord::new();
        field.flush(&mut record, &mut MemoryForwardIndex::new())?;
        for name in record.stream_names() {
            let stream = record.stream(name).unwrap();
            let last = stream.last().map_or(-1, |t| t.position as i64);
            assert_eq!(last, target, "{name}");
            assert!(stream.windows(2).all(|w| w[0].position <= w[1].position));
        }
    }
    Ok(())
}

#[test]
fn test_fold_is_idempotent() {
    let alphabet = ['a', 'Z', 'é', 'É', 'ß', 'İ', 'ñ', '\u{301}', ' ', 'ж', 'Ж'];
    let mut rng = StdRng::seed_from_u64(11);

    for _ in 0..200 {
        let value: String = (0..rng.random_range(0..12))
            .map(|_| alphabet[rng.random_range(0..alphabet.len())])
            .collect();
        for alternative in AlternativeKind::ALL {
            let once = alternative.fold(&value).into_owned();
            assert_eq!(alternative.fold(&once), once, "{alternative} of {value:?}");
        }
    }
}

#[test]
fn test_flush_out_of_sync_panics() {
    let result = std::panic::catch_unwind(|| {
        let mut field = AnnotatedField::new("contents", "word", SensitivityMode::OnlySensitive);
        field.add_property("lemma", SensitivityMode::OnlyInsensitive).unwrap();
        field.add_value("a");
        field.add_start_char(0);
        field.add_end_char(1);
        let _ = field.flush(&mut DocumentRecord::new(), &mut MemoryForwardIndex::new());
    });
    assert!(result.is_err());
}

/// Forward index that refuses every submission.
struct RejectingForwardIndex;

impl ForwardIndexWriter for RejectingForwardIndex {
    fn submit(&mut self, field: &str, _values: &[Arc<str>]) -> Result<u32> {
        Err(TesseraError::invalid_operation(format!("{field} is read-only")))
    }
}

#[test]
fn test_forward_index_error_propagates() {
    let mut field = AnnotatedField::new("contents", "word", SensitivityMode::OnlySensitive);
    field.add_value("a");
    field.add_start_char(0);
    field.add_end_char(1);
    field.finish_document(1);

    let result = field.flush(&mut DocumentRecord::new(), &mut RejectingForwardIndex);
    assert!(matches!(result, Err(TesseraError::InvalidOperation(_))));
}

#[test]
fn test_assemble_documents_with_content_store() -> Result<()> {
    let dir = TempDir::new()?;
    let store = ContentStore::open_dir(dir.path(), ContentStoreConfig::default())?;
    let assembler = DocumentAssembler::new(&store);
    let mut field = AnnotatedField::with_standard_properties(&AnnotationConfig::default());
    let mut forward_index = MemoryForwardIndex::new();

    let documents = ["Leentje leerde Lotje lopen", "Lotje loopt niet"];
    let mut records = Vec::new();
    for content in documents {
        let mut position = 0;
        for word in content.split(' ') {
            let length = word.chars().count();
            field.add_value(word);
            field.add_start_char(position);
            field.add_end_char(position + length);
            position += length + 1;
        }
        let length = content.chars().count();
        records.push(assembler.finish_document(&mut field, content, length, &mut forward_index)?);
        assert!(field.main_property().is_empty());
    }

    for (i, record) in records.iter().enumerate() {
        let cid = record.stored_int(&naming::content_id_field("contents")).unwrap();
        assert_eq!(cid, i as u32 + 1);
        assert_eq!(
            record.stored_int(&naming::forward_index_id_field("contents", "word")),
            Some(i as u32)
        );

        // Offsets on the main stream point back into the stored content.
        let stream = record.stream("contents%word@s").unwrap();
        let (starts, ends): (Vec<usize>, Vec<usize>) =
            stream.iter().filter_map(|t| t.offsets).unzip();
        let parts = store.retrieve_parts(cid, &starts, &ends)?;
        let words: Vec<Option<String>> = stream.iter().map(|t| Some(t.term.clone())).collect();
        assert_eq!(parts, words);
    }
    assert_eq!(forward_index.len("contents%word"), 2);
    assert_eq!(forward_index.len("contents%punct"), 2);
    Ok(())
}

#[test]
fn test_config_from_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("annotation.json");
    std::fs::write(
        &path,
        r#"{"field_name": "body", "main_property": "form", "sensitivities": {"form": "all_four_combinations"}}"#,
    )?;

    let config = AnnotationConfig::from_file(&path)?;
    let field = AnnotatedField::with_standard_properties(&config);
    assert_eq!(field.name(), "body");
    assert_eq!(field.main_property().name(), "form");
    assert_eq!(field.main_property().alternatives().len(), 4);
    assert_eq!(
        field.property(START_TAG_PROPERTY).map(|p| p.sensitivity()),
        Some(SensitivityMode::OnlySensitive)
    );
    assert_eq!(field.properties().len(), 4);
    Ok(())
}
