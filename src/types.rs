#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::coerce;
use crate::error::{MinioError, Result};

/// A single value inside a [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<DocumentValue>),
    Map(Document),
}

impl DocumentValue {
    pub fn is_map(&self) -> bool {
        matches!(self, DocumentValue::Map(_))
    }
}

impl From<Value> for DocumentValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => DocumentValue::Null,
            Value::Bool(b) => DocumentValue::Bool(b),
            Value::Number(n) => DocumentValue::Number(n),
            Value::String(s) => DocumentValue::String(s),
            Value::Array(items) => {
                DocumentValue::Array(items.into_iter().map(DocumentValue::from).collect())
            }
            Value::Object(map) => DocumentValue::Map(Document::from(map)),
        }
    }
}

impl From<&str> for DocumentValue {
    fn from(value: &str) -> Self {
        DocumentValue::String(value.to_string())
    }
}

impl From<bool> for DocumentValue {
    fn from(value: bool) -> Self {
        DocumentValue::Bool(value)
    }
}

impl From<i64> for DocumentValue {
    fn from(value: i64) -> Self {
        DocumentValue::Number(Number::from(value))
    }
}

impl From<Vec<u8>> for DocumentValue {
    fn from(value: Vec<u8>) -> Self {
        DocumentValue::Bytes(value)
    }
}

impl From<Document> for DocumentValue {
    fn from(value: Document) -> Self {
        DocumentValue::Map(value)
    }
}

impl Serialize for DocumentValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            DocumentValue::Null => serializer.serialize_unit(),
            DocumentValue::Bool(b) => serializer.serialize_bool(*b),
            DocumentValue::Number(n) => n.serialize(serializer),
            DocumentValue::String(s) => serializer.serialize_str(s),
            // Byte sequences travel as base64 text in JSON.
            DocumentValue::Bytes(bytes) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            DocumentValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            DocumentValue::Map(document) => document.serialize(serializer),
        }
    }
}

/// Nested key/value payload handed to `PutObject`.
///
/// Keys are kept in sorted order so every rendering of a document is stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document(BTreeMap<String, DocumentValue>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<DocumentValue>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<DocumentValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&DocumentValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DocumentValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(
            map.into_iter()
                .map(|(key, value)| (key, DocumentValue::from(value)))
                .collect(),
        )
    }
}

impl TryFrom<Value> for Document {
    type Error = MinioError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Document::from(map)),
            other => Err(MinioError::InvalidInput(format!(
                "data must be an object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Encoding applied to the payload before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataFormat {
    Json,
    Csv,
}

impl DataFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Json => "JSON",
            DataFormat::Csv => "CSV",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            DataFormat::Json => "application/json",
            DataFormat::Csv => "text/csv",
        }
    }
}

impl FromStr for DataFormat {
    type Err = MinioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "JSON" => Ok(DataFormat::Json),
            "CSV" => Ok(DataFormat::Csv),
            _ => Err(MinioError::InvalidInput(format!(
                "unsupported format '{}', expected JSON or CSV",
                s
            ))),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-invocation input supplied by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Input {
    pub object_name: String,
    pub format: String,
    pub data: Option<Value>,
}

impl Input {
    pub fn new(object_name: &str) -> Self {
        Self {
            object_name: object_name.to_string(),
            ..Self::default()
        }
    }

    pub fn format(mut self, format: &str) -> Self {
        self.format = format.to_string();
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Builds the input from the host's loosely-typed input map.
    ///
    /// A `data` string holding a JSON object is parsed into that object; any
    /// other non-null value is kept as-is.
    pub fn from_map(values: &Map<String, Value>) -> Result<Self> {
        let data = match values.get("data") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
                Ok(parsed @ Value::Object(_)) => Some(parsed),
                _ => Some(Value::String(s.clone())),
            },
            Some(other) => Some(other.clone()),
        };

        Ok(Self {
            object_name: coerce::to_string(values.get("objectName"))?,
            format: coerce::to_string(values.get("format"))?,
            data,
        })
    }

    /// The payload as a [`Document`]; absent payloads are rejected.
    pub fn document(&self) -> Result<Document> {
        match &self.data {
            None | Some(Value::Null) => Err(MinioError::InvalidInput("data is nil".to_string())),
            Some(value) => Document::try_from(value.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Success,
    Error,
}

/// Output handed back to the host after every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub status: Status,
    pub result: Map<String, Value>,
}

impl Output {
    pub fn success(result: Map<String, Value>) -> Self {
        Self {
            status: Status::Success,
            result,
        }
    }

    pub fn error(message: String) -> Self {
        let mut result = Map::new();
        result.insert("errorMessage".to_string(), Value::String(message));
        Self {
            status: Status::Error,
            result,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn error_message(&self) -> Option<&str> {
        self.result.get("errorMessage").and_then(Value::as_str)
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            "status".to_string(),
            serde_json::to_value(self.status).unwrap_or(Value::Null),
        );
        map.insert("result".to_string(), Value::Object(self.result.clone()));
        map
    }
}

/// Content type for an object: guessed from its name, else the format's own.
pub fn get_content_type(object_name: &str, format: DataFormat) -> String {
    mime_guess::from_path(object_name)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| format.content_type().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_document_from_json_keeps_nesting() {
        let doc = Document::try_from(json!({"abc": "123", "bcd": {"efg": false}})).unwrap();
        assert_eq!(doc.len(), 2);
        assert!(doc.get("bcd").unwrap().is_map());
    }

    #[test]
    fn test_document_rejects_non_objects() {
        let err = Document::try_from(json!([1, 2])).unwrap_err();
        assert!(matches!(err, MinioError::InvalidInput(_)));
    }

    #[test]
    fn test_bytes_serialize_as_base64() {
        let doc = Document::new().with("raw", b"hi".to_vec());
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"raw":"aGk="}"#);
    }

    #[test]
    fn test_data_format_parsing() {
        assert_eq!("JSON".parse::<DataFormat>().unwrap(), DataFormat::Json);
        assert_eq!("csv".parse::<DataFormat>().unwrap(), DataFormat::Csv);
        assert!("XML".parse::<DataFormat>().is_err());
    }

    #[test]
    fn test_input_from_map_parses_string_payload() {
        let values = json!({
            "objectName": "inbox/testing.csv",
            "format": "CSV",
            "data": "{\"abc\": \"123\"}"
        });
        let input = Input::from_map(values.as_object().unwrap()).unwrap();
        assert_eq!(input.object_name, "inbox/testing.csv");
        assert_eq!(input.data, Some(json!({"abc": "123"})));
    }

    #[test]
    fn test_input_without_data_is_invalid() {
        let input = Input::new("a.json").format("JSON");
        assert!(matches!(
            input.document().unwrap_err(),
            MinioError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_output_shapes() {
        let ok = Output::success(json!({"exist": true}).as_object().unwrap().clone());
        assert!(ok.is_success());
        assert_eq!(
            Value::Object(ok.to_map()),
            json!({"status": "SUCCESS", "result": {"exist": true}})
        );

        let failed = Output::error("boom".to_string());
        assert!(!failed.is_success());
        assert_eq!(failed.error_message(), Some("boom"));
    }

    #[test]
    fn test_content_type_detection() {
        assert_eq!(get_content_type("inbox/a.json", DataFormat::Json), "application/json");
        assert_eq!(get_content_type("inbox/a.csv", DataFormat::Csv), "text/csv");
        assert_eq!(get_content_type("inbox/data", DataFormat::Csv), "text/csv");
    }
}
