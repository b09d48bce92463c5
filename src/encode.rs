//! Payload encoding for `PutObject`.
//!
//! JSON payloads are serialized as-is. CSV payloads are flattened into
//! dotted keys and rendered as exactly two lines, a header row and a single
//! value row:
//!
//! ```text
//! "abc","bcd.cde","bcd.efg"
//! "123","123",false
//! ```
//!
//! Headers and string values are wrapped in double quotes verbatim. Embedded
//! quotes are not escaped, so keys or values containing `"` produce malformed
//! CSV; stored objects depend on this exact output.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::error::{MinioError, Result};
use crate::types::{DataFormat, Document, DocumentValue};

/// Dotted-path keys to leaf values, in lexicographic key order.
pub type FlattenedRecord = BTreeMap<String, DocumentValue>;

/// Encodes a document into the bytes to store.
pub fn encode(document: Option<&Document>, format: DataFormat) -> Result<Vec<u8>> {
    let document =
        document.ok_or_else(|| MinioError::InvalidInput("data is nil".to_string()))?;

    match format {
        DataFormat::Json => serde_json::to_vec(document)
            .map_err(|e| MinioError::EncodingFailure(format!("unable to marshal JSON: {}", e))),
        DataFormat::Csv => encode_csv(document).map(String::into_bytes),
    }
}

/// Like [`encode`], starting from an untyped payload.
pub fn encode_value(data: Option<&Value>, format: DataFormat) -> Result<Vec<u8>> {
    let document = match data {
        None | Some(Value::Null) => None,
        Some(value) => Some(Document::try_from(value.clone())?),
    };
    encode(document.as_ref(), format)
}

/// Flattens nested maps into dotted keys.
///
/// Arrays are flattened by element index (`items.0`, `items.1`). Empty maps
/// and empty arrays are kept as leaves under their own key.
///
/// Fails with [`MinioError::EncodingFailure`] when two leaves flatten to the
/// same key, e.g. `{"a.b": 1, "a": {"b": 2}}`.
pub fn flatten(document: &Document) -> Result<FlattenedRecord> {
    let mut record = FlattenedRecord::new();
    for (key, value) in document.iter() {
        flatten_into(key.clone(), value, &mut record)?;
    }
    Ok(record)
}

fn flatten_into(
    path: String,
    value: &DocumentValue,
    record: &mut FlattenedRecord,
) -> Result<()> {
    match value {
        DocumentValue::Map(child) if !child.is_empty() => {
            for (key, nested) in child.iter() {
                flatten_into(format!("{}.{}", path, key), nested, record)?;
            }
        }
        DocumentValue::Array(items) if !items.is_empty() => {
            for (index, nested) in items.iter().enumerate() {
                flatten_into(format!("{}.{}", path, index), nested, record)?;
            }
        }
        leaf => {
            if record.contains_key(&path) {
                return Err(MinioError::EncodingFailure(format!(
                    "duplicate flattened key: {}",
                    path
                )));
            }
            record.insert(path, leaf.clone());
        }
    }
    Ok(())
}

/// Renders a document as a header line and a value line joined by `\n`.
pub fn encode_csv(document: &Document) -> Result<String> {
    let record = flatten(document)?;
    debug!("Flattened record has {} fields", record.len());

    let headers: Vec<String> = record.keys().map(|key| quote(key)).collect();
    let values = record
        .values()
        .map(render_value)
        .collect::<Result<Vec<String>>>()?;

    Ok(format!("{}\n{}", headers.join(","), values.join(",")))
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text)
}

fn render_value(value: &DocumentValue) -> Result<String> {
    match value {
        DocumentValue::String(s) => Ok(quote(s)),
        DocumentValue::Bytes(bytes) => std::str::from_utf8(bytes).map(quote).map_err(|e| {
            MinioError::EncodingFailure(format!("byte value is not valid UTF-8: {}", e))
        }),
        DocumentValue::Bool(b) => Ok(b.to_string()),
        DocumentValue::Number(n) => Ok(render_number(n)),
        DocumentValue::Null => Ok("null".to_string()),
        // Only empty containers survive flattening.
        DocumentValue::Array(_) | DocumentValue::Map(_) => serde_json::to_string(value)
            .map_err(|e| MinioError::EncodingFailure(e.to_string())),
    }
}

// Integral floats print without a fraction: `1.0` renders as `1`.
fn render_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f)
            if n.is_f64() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
        {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}
