//! Stage documents: the JSON snapshot persisted after each stage.
//!
//! A document is an open JSON object. Only `chain_id` and `timestamp` are
//! required; `stage` and `stages_complete` are conventional, and everything
//! else is stage-specific payload the store never interprets.

use crate::chain::ChainId;
use crate::error::{Result, SpecliftError};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CHAIN_ID: &str = "chain_id";
pub const TIMESTAMP: &str = "timestamp";
pub const STAGE: &str = "stage";
pub const STAGES_COMPLETE: &str = "stages_complete";

// ---------------------------------------------------------------------------
// StageDocument
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageDocument(Map<String, Value>);

impl StageDocument {
    /// A fresh document for `chain` produced by `stage`, stamped now.
    pub fn new(chain: &ChainId, stage: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(CHAIN_ID.into(), Value::String(chain.to_string()));
        fields.insert(TIMESTAMP.into(), Value::String(now_timestamp()));
        fields.insert(STAGE.into(), Value::String(stage.into()));
        fields.insert(STAGES_COMPLETE.into(), Value::Array(Vec::new()));
        StageDocument(fields)
    }

    /// Parse candidate text. Anything that is not a JSON object is malformed.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| SpecliftError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(StageDocument(fields)),
            other => Err(SpecliftError::Malformed(format!(
                "expected a JSON object, found {}",
                kind_of(&other)
            ))),
        }
    }

    pub fn chain_id(&self) -> Option<&str> {
        self.0.get(CHAIN_ID).and_then(Value::as_str)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.0.get(TIMESTAMP).and_then(Value::as_str)
    }

    pub fn stage(&self) -> Option<&str> {
        self.0.get(STAGE).and_then(Value::as_str)
    }

    /// Completed stage names, in order. Non-string entries are skipped.
    pub fn stages_complete(&self) -> Vec<&str> {
        self.0
            .get(STAGES_COMPLETE)
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.0)?)
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum Validation {
    Pass,
    Fail(String),
}

impl Validation {
    pub fn is_pass(&self) -> bool {
        matches!(self, Validation::Pass)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Validation::Pass => None,
            Validation::Fail(r) => Some(r),
        }
    }

    /// Convert a failure into `InvalidState`.
    pub fn into_result(self) -> Result<()> {
        match self {
            Validation::Pass => Ok(()),
            Validation::Fail(reason) => Err(SpecliftError::InvalidState(reason)),
        }
    }
}

/// Check the minimum shape of a document: non-empty string `chain_id` and
/// `timestamp`. Everything else is opaque payload.
pub fn validate(doc: &StageDocument) -> Validation {
    for key in [CHAIN_ID, TIMESTAMP] {
        match doc.get(key) {
            None => return Validation::Fail(format!("missing required field '{key}'")),
            Some(Value::String(s)) if s.is_empty() => {
                return Validation::Fail(format!("required field '{key}' is empty"))
            }
            Some(Value::String(_)) => {}
            Some(other) => {
                return Validation::Fail(format!(
                    "required field '{key}' must be a string, found {}",
                    kind_of(other)
                ))
            }
        }
    }
    Validation::Pass
}

// ---------------------------------------------------------------------------
// Merge / mark-complete
// ---------------------------------------------------------------------------

/// Layer `new` over `old` at the top level: keys in `new` win, keys only in
/// `old` carry forward. Neither input is modified.
pub fn merge(old: &StageDocument, new: &StageDocument) -> StageDocument {
    let mut out = old.0.clone();
    for (k, v) in &new.0 {
        out.insert(k.clone(), v.clone());
    }
    StageDocument(out)
}

/// Copy of `doc` with `stage` appended to `stages_complete` and the
/// timestamp refreshed. A missing or non-array `stages_complete` starts over
/// as a one-element list.
pub fn mark_complete(doc: &StageDocument, stage: &str) -> StageDocument {
    let mut completed = match doc.get(STAGES_COMPLETE) {
        Some(Value::Array(a)) => a.clone(),
        _ => Vec::new(),
    };
    completed.push(Value::String(stage.to_string()));

    let mut update = Map::new();
    update.insert(STAGES_COMPLETE.into(), Value::Array(completed));
    update.insert(TIMESTAMP.into(), Value::String(now_timestamp()));
    merge(doc, &StageDocument(update))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> StageDocument {
        StageDocument::from_value(v).unwrap()
    }

    #[test]
    fn parse_rejects_non_json() {
        let err = StageDocument::parse("{not valid json").unwrap_err();
        assert!(matches!(err, SpecliftError::Malformed(_)));
    }

    #[test]
    fn parse_rejects_non_objects() {
        for text in ["[]", "42", "\"chain\"", "null"] {
            let err = StageDocument::parse(text).unwrap_err();
            assert!(matches!(err, SpecliftError::Malformed(_)), "{text}");
        }
    }

    #[test]
    fn new_document_is_valid() {
        let chain: ChainId = "a3f7c8d1".parse().unwrap();
        let d = StageDocument::new(&chain, "00-bootstrap");
        assert!(validate(&d).is_pass());
        assert_eq!(d.chain_id(), Some("a3f7c8d1"));
        assert_eq!(d.stage(), Some("00-bootstrap"));
        assert!(d.stages_complete().is_empty());
    }

    #[test]
    fn validate_requires_both_fields() {
        let cases = [
            (json!({"chain_id": "a", "timestamp": "t"}), true),
            (json!({"chain_id": "a", "timestamp": "t", "extra": [1, 2]}), true),
            (json!({"chain_id": "", "timestamp": "t"}), false),
            (json!({"chain_id": "a", "timestamp": ""}), false),
            (json!({"chain_id": " ", "timestamp": "t"}), true),
            (json!({"timestamp": "t"}), false),
            (json!({"chain_id": "a"}), false),
            (json!({"chain_id": 7, "timestamp": "t"}), false),
            (json!({"chain_id": "a", "timestamp": null}), false),
            (json!({}), false),
        ];
        for (v, expected) in cases {
            let text = v.to_string();
            assert_eq!(validate(&doc(v)).is_pass(), expected, "{text}");
        }
    }

    #[test]
    fn validate_reports_reason() {
        let v = validate(&doc(json!({"chain_id": "", "timestamp": "t"})));
        assert!(v.reason().unwrap().contains("chain_id"));
        let v = validate(&doc(json!({"chain_id": "a"})));
        assert!(v.reason().unwrap().contains("timestamp"));
        assert!(matches!(
            v.into_result(),
            Err(SpecliftError::InvalidState(_))
        ));
    }

    #[test]
    fn validate_does_not_mutate() {
        let d = doc(json!({"chain_id": "", "x": 1}));
        let before = d.clone();
        let _ = validate(&d);
        assert_eq!(d, before);
    }

    #[test]
    fn merge_is_right_biased() {
        let old = doc(json!({"chain_id": "a", "timestamp": "t1", "files": 10, "nested": {"x": 1}}));
        let new = doc(json!({"timestamp": "t2", "nested": {"y": 2}, "findings": ["f"]}));
        let merged = merge(&old, &new);

        for (k, v) in new.fields() {
            assert_eq!(merged.get(k), Some(v), "key {k} should come from new");
        }
        assert_eq!(merged.get("chain_id"), Some(&json!("a")));
        assert_eq!(merged.get("files"), Some(&json!(10)));
        assert_eq!(merged.fields().len(), 5);
    }

    #[test]
    fn merge_leaves_inputs_untouched() {
        let old = doc(json!({"a": 1, "b": 2}));
        let new = doc(json!({"b": 3}));
        let (old_before, new_before) = (old.clone(), new.clone());
        let _ = merge(&old, &new);
        assert_eq!(old, old_before);
        assert_eq!(new, new_before);
    }

    #[test]
    fn mark_complete_appends_and_restamps() {
        let original = doc(json!({
            "chain_id": "a3f7c8d1",
            "timestamp": "2025-01-01T00:00:00Z",
            "stage": "bootstrap",
            "stages_complete": []
        }));
        let marked = mark_complete(&original, "01-setup");
        assert_eq!(marked.stages_complete(), vec!["01-setup"]);
        assert!(marked.timestamp().unwrap() > "2025-01-01T00:00:00Z");
        assert_eq!(marked.stage(), Some("bootstrap"));
        assert!(original.stages_complete().is_empty());

        let again = mark_complete(&marked, "02-x");
        assert_eq!(again.stages_complete(), vec!["01-setup", "02-x"]);
    }

    #[test]
    fn mark_complete_creates_missing_list() {
        let marked = mark_complete(&doc(json!({"chain_id": "a"})), "00-bootstrap");
        assert_eq!(marked.stages_complete(), vec!["00-bootstrap"]);
        assert!(validate(&marked).is_pass());
    }

    #[test]
    fn validation_serializes_for_output() {
        let pass = serde_json::to_value(Validation::Pass).unwrap();
        assert_eq!(pass, json!({"result": "pass"}));
        let fail = serde_json::to_value(Validation::Fail("bad".into())).unwrap();
        assert_eq!(fail, json!({"result": "fail", "reason": "bad"}));
    }
}
