//! Coercion of loosely-typed host values.
//!
//! Settings and inputs arrive from the workflow host as JSON values whose
//! concrete type is not guaranteed: a port may be sent as `"9000"` or `9000`,
//! a flag as `"true"` or `true`. These helpers apply the host's conversion
//! rules so the rest of the crate can work with concrete types.

use serde_json::{Map, Value};

use crate::error::{MinioError, Result};

/// Coerces a value to a string. `null` and absent values become `""`.
pub fn to_string(value: Option<&Value>) -> Result<String> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Ok(serde_json::to_string(other)?),
    }
}

/// Coerces a value to a boolean. `null`, absent and empty strings are `false`.
pub fn to_bool(value: Option<&Value>) -> Result<bool> {
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Some(Value::String(s)) => match s.trim() {
            "" => Ok(false),
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            other => Err(MinioError::Config(format!(
                "unable to coerce '{}' to bool",
                other
            ))),
        },
        Some(other) => Err(MinioError::Config(format!(
            "unable to coerce {} to bool",
            other
        ))),
    }
}

/// Coerces a value to an integer. Floats are truncated.
pub fn to_int(value: Option<&Value>) -> Result<i64> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Bool(b)) => Ok(i64::from(*b)),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| MinioError::Config(format!("unable to coerce {} to int", n))),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            trimmed
                .parse::<i64>()
                .or_else(|_| trimmed.parse::<f64>().map(|f| f as i64))
                .map_err(|_| MinioError::Config(format!("unable to coerce '{}' to int", s)))
        }
        Some(other) => Err(MinioError::Config(format!(
            "unable to coerce {} to int",
            other
        ))),
    }
}

/// Coerces a value to an object. A string holding a JSON object is parsed.
///
/// Returns `None` for `null` or absent values.
pub fn to_object(value: Option<&Value>) -> Result<Option<Map<String, Value>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map.clone())),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s)? {
            Value::Object(map) => Ok(Some(map)),
            other => Err(MinioError::Config(format!(
                "unable to coerce {} to object",
                other
            ))),
        },
        Some(other) => Err(MinioError::Config(format!(
            "unable to coerce {} to object",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_string() {
        assert_eq!(to_string(None).unwrap(), "");
        assert_eq!(to_string(Some(&json!(null))).unwrap(), "");
        assert_eq!(to_string(Some(&json!("abc"))).unwrap(), "abc");
        assert_eq!(to_string(Some(&json!(9000))).unwrap(), "9000");
        assert_eq!(to_string(Some(&json!(true))).unwrap(), "true");
    }

    #[test]
    fn test_to_bool() {
        assert!(!to_bool(None).unwrap());
        assert!(to_bool(Some(&json!(true))).unwrap());
        assert!(to_bool(Some(&json!("TRUE"))).unwrap());
        assert!(!to_bool(Some(&json!("0"))).unwrap());
        assert!(!to_bool(Some(&json!(""))).unwrap());
        assert!(to_bool(Some(&json!(1))).unwrap());
        assert!(to_bool(Some(&json!("maybe"))).is_err());
    }

    #[test]
    fn test_to_int() {
        assert_eq!(to_int(None).unwrap(), 0);
        assert_eq!(to_int(Some(&json!(42))).unwrap(), 42);
        assert_eq!(to_int(Some(&json!(4.9))).unwrap(), 4);
        assert_eq!(to_int(Some(&json!("30"))).unwrap(), 30);
        assert!(to_int(Some(&json!("thirty"))).is_err());
    }

    #[test]
    fn test_to_object_parses_json_strings() {
        let parsed = to_object(Some(&json!("{\"abc\": \"123\"}"))).unwrap().unwrap();
        assert_eq!(parsed.get("abc"), Some(&json!("123")));

        assert!(to_object(Some(&json!(null))).unwrap().is_none());
        assert!(to_object(Some(&json!("[1, 2]"))).is_err());
        assert!(to_object(Some(&json!(5))).is_err());
    }
}
