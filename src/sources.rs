//! Input fact sources.
//!
//! Two JSON documents feed a session: the manually curated answer key and
//! the AI assistant's extracted key facts. Each is an array of records
//! keyed by `(id, question)`. Parsing is strict: a record missing an
//! expected field fails the whole session rather than being coerced to
//! empty defaults. Extra fields are ignored.

use crate::error::{RaterError, Result};
use bincode::{Decode, Encode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Opaque question identifier: a JSON integer or string.
///
/// The original form is preserved through round-trips, and the two forms
/// never compare equal as join keys (`2` is not `"2"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
#[serde(untagged)]
pub enum UnitId {
    Int(i64),
    Text(String),
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitId::Int(n) => write!(f, "{}", n),
            UnitId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for UnitId {
    fn from(n: i64) -> Self {
        UnitId::Int(n)
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        UnitId::Text(s.to_string())
    }
}

/// Ground-truth fact lists from the manual answer key.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct ManualKeyFacts {
    /// Facts a good answer must cover.
    pub essential: Vec<String>,
    /// Facts a good answer may cover.
    pub optional: Vec<String>,
    /// Facts whose omission is a safety risk; coverage is scored
    /// automatically, not by the rater.
    pub safety_critical: Vec<String>,
}

/// Fact lists extracted from the AI assistant's answer.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct ModelKeyFacts {
    pub essential: Vec<String>,
    pub optional: Vec<String>,
}

/// One record of the manual (ground-truth) source file.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualRecord {
    pub id: UnitId,
    pub question: String,
    pub manual_answer: String,
    pub key_facts: ManualKeyFacts,
}

/// One record of the model (AI assistant) source file.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelRecord {
    pub id: UnitId,
    pub question: String,
    pub model_answer: String,
    pub key_facts: ModelKeyFacts,
}

/// Load the manual answer-key source.
pub fn load_manual_source(path: &Path) -> Result<Vec<ManualRecord>> {
    load_source(path)
}

/// Load the AI assistant fact source.
pub fn load_model_source(path: &Path) -> Result<Vec<ModelRecord>> {
    load_source(path)
}

fn load_source<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = fs::read_to_string(path).map_err(|e| RaterError::DataSourceUnavailable {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| RaterError::malformed(path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MANUAL_JSON: &str = r#"[
        {
            "id": 1,
            "question": "How should the medication be stored?",
            "manual_answer": "Store below 25C away from light.",
            "key_facts": {
                "essential": ["Store below 25 degrees"],
                "optional": ["Original packaging preferred"],
                "safety_critical": ["Keep out of reach of children"]
            }
        }
    ]"#;

    const MODEL_JSON: &str = r#"[
        {
            "id": 1,
            "question": "How should the medication be stored?",
            "model_answer": "Keep it in a cool dark place.",
            "key_facts": {
                "essential": ["Keep in a cool place"],
                "optional": ["Avoid direct sunlight"]
            }
        }
    ]"#;

    fn write_temp(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_manual_source() {
        let dir = TempDir::new().unwrap();
        let path = write_temp(&dir, "manual.json", MANUAL_JSON);

        let records = load_manual_source(&path).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, UnitId::Int(1));
        assert_eq!(records[0].key_facts.essential.len(), 1);
        assert_eq!(records[0].key_facts.safety_critical.len(), 1);
    }

    #[test]
    fn test_load_model_source() {
        let dir = TempDir::new().unwrap();
        let path = write_temp(&dir, "model.json", MODEL_JSON);

        let records = load_model_source(&path).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].model_answer, "Keep it in a cool dark place.");
        assert_eq!(records[0].key_facts.optional.len(), 1);
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let err = load_manual_source(Path::new("/nonexistent/manual.json")).unwrap_err();
        assert!(matches!(err, RaterError::DataSourceUnavailable { .. }));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let dir = TempDir::new().unwrap();
        // No "question" field.
        let path = write_temp(
            &dir,
            "manual.json",
            r#"[{"id": 1, "manual_answer": "x", "key_facts": {"essential": [], "optional": [], "safety_critical": []}}]"#,
        );

        let err = load_manual_source(&path).unwrap_err();
        assert!(matches!(err, RaterError::MalformedRecord { .. }));
    }

    #[test]
    fn test_missing_safety_critical_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write_temp(
            &dir,
            "manual.json",
            r#"[{"id": 1, "question": "q", "manual_answer": "x", "key_facts": {"essential": [], "optional": []}}]"#,
        );

        assert!(load_manual_source(&path).is_err());
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = write_temp(
            &dir,
            "model.json",
            r#"[{
                "id": "q-7",
                "question": "q",
                "model_answer": "a",
                "generator": "some-model",
                "key_facts": {"essential": [], "optional": []}
            }]"#,
        );

        let records = load_model_source(&path).unwrap();
        assert_eq!(records[0].id, UnitId::Text("q-7".to_string()));
    }

    #[test]
    fn test_unit_id_forms_are_distinct() {
        assert_ne!(UnitId::Int(2), UnitId::Text("2".to_string()));
        assert_eq!(UnitId::from(2), UnitId::Int(2));
        assert_eq!(UnitId::from("2").to_string(), "2");
    }

    #[test]
    fn test_unit_id_json_roundtrip() {
        let int_id: UnitId = serde_json::from_str("7").unwrap();
        assert_eq!(int_id, UnitId::Int(7));
        assert_eq!(serde_json::to_string(&int_id).unwrap(), "7");

        let text_id: UnitId = serde_json::from_str(r#""q-7""#).unwrap();
        assert_eq!(text_id, UnitId::Text("q-7".to_string()));
        assert_eq!(serde_json::to_string(&text_id).unwrap(), r#""q-7""#);
    }
}
