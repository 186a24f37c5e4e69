use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Label used when the predicted index has no entry in the mapping.
pub const UNKNOWN_LABEL: &str = "Desconocido";

/// Index → label lookup built from a label → index JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMapping {
    labels: BTreeMap<usize, String>,
}

impl ClassMapping {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(&index).map(String::as_str)
    }

    /// Label for `index`, or [`UNKNOWN_LABEL`] when the index is not mapped.
    pub fn resolve(&self, index: usize) -> &str {
        self.get(index).unwrap_or(UNKNOWN_LABEL)
    }

    /// Indices missing from `0..=max_index`.
    pub fn gaps(&self) -> Vec<usize> {
        let Some(&max) = self.labels.keys().next_back() else {
            return Vec::new();
        };
        (0..=max).filter(|i| !self.labels.contains_key(i)).collect()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_indices(serde_json::from_str(text)?)
    }

    /// Inverts a parsed label → index object.
    pub fn from_indices(indices: Map<String, Value>) -> Result<Self> {
        let mut labels = BTreeMap::new();
        for (label, value) in indices {
            let index = parse_index(&label, &value)?;
            if let Some(previous) = labels.insert(index, label.clone()) {
                return Err(Error::ClassIndex {
                    label,
                    reason: format!("index {index} is already used by {previous:?}"),
                });
            }
        }
        Ok(Self { labels })
    }
}

impl FromIterator<(usize, String)> for ClassMapping {
    fn from_iter<I: IntoIterator<Item = (usize, String)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

/// Accepts JSON integers and decimal strings such as `"7"`.
fn parse_index(label: &str, value: &Value) -> Result<usize> {
    let invalid = |reason: String| Error::ClassIndex {
        label: label.to_string(),
        reason,
    };
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| invalid(format!("{n} is not a non-negative integer"))),
        Value::String(s) => s
            .trim()
            .parse::<usize>()
            .map_err(|_| invalid(format!("{s:?} is not a decimal index"))),
        other => Err(invalid(format!("unexpected value {other}"))),
    }
}

pub fn load_class_mapping(file_path: impl AsRef<Path>) -> Result<ClassMapping> {
    let file = File::open(file_path.as_ref())?;
    let mapping = ClassMapping::from_indices(serde_json::from_reader(BufReader::new(file))?)?;

    let gaps = mapping.gaps();
    if !gaps.is_empty() {
        tracing::warn!(?gaps, "class index file leaves indices unmapped");
    }
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverts_label_to_index() {
        let mapping = ClassMapping::from_json(r#"{"Hammer": 0, "Electric Drill Collection": 1}"#).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get(0), Some("Hammer"));
        assert_eq!(mapping.get(1), Some("Electric Drill Collection"));
    }

    #[test]
    fn accepts_decimal_string_indices() {
        let mapping = ClassMapping::from_json(r#"{"Hammer": "0", "Wrench": " 1 "}"#).unwrap();
        assert_eq!(mapping.get(1), Some("Wrench"));
    }

    #[test]
    fn rejects_bad_indices() {
        for text in [
            r#"{"Hammer": -1}"#,
            r#"{"Hammer": 1.5}"#,
            r#"{"Hammer": "one"}"#,
            r#"{"Hammer": null}"#,
            r#"{"Hammer": 0, "Wrench": 0}"#,
        ] {
            assert!(
                matches!(ClassMapping::from_json(text), Err(Error::ClassIndex { .. })),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_non_object() {
        assert!(matches!(ClassMapping::from_json("[1, 2]"), Err(Error::Json(_))));
    }

    #[test]
    fn unknown_index_resolves_to_sentinel() {
        let mapping = ClassMapping::from_json(r#"{"Hammer": 0, "Clamp": 2}"#).unwrap();
        assert_eq!(mapping.resolve(2), "Clamp");
        assert_eq!(mapping.resolve(1), UNKNOWN_LABEL);
        assert_eq!(mapping.resolve(99), UNKNOWN_LABEL);
        assert_eq!(mapping.gaps(), vec![1]);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.json");
        std::fs::write(&path, r#"{"Chisel": 0, "Mallet": 1}"#).unwrap();
        let mapping = load_class_mapping(&path).unwrap();
        assert_eq!(mapping.resolve(1), "Mallet");

        assert!(matches!(
            load_class_mapping(dir.path().join("missing.json")),
            Err(Error::Io(_))
        ));
    }
}
