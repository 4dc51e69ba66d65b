use crate::constants::GENERIC_ERROR_MESSAGE;
use crate::error::NormalizedError;
use crate::transport::model::ResponseBody;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Maps a backend error body onto [`NormalizedError`].
///
/// Shapes are tried in order and the first match wins:
///
/// 1. a JSON string becomes a `FormError` carrying it;
/// 2. an object with a top-level `detail` becomes a `FormError` (first element when `detail`
///    is an array), even when field errors sit next to it;
/// 3. an object whose values are all arrays of strings becomes a `FieldError` keyed by field,
///    keeping the first message of each;
/// 4. an object whose values are all strings becomes a `FieldError` as-is;
/// 5. anything else is a `FormError` with a generic message.
pub fn normalize(body: &Value) -> NormalizedError {
    match body {
        Value::String(message) => NormalizedError::form(message.clone()),
        Value::Object(map) => normalize_object(map),
        _ => generic(),
    }
}

/// Like [`normalize`], with non-JSON bodies collapsing to the generic message.
pub fn normalize_body(body: &ResponseBody) -> NormalizedError {
    match body {
        ResponseBody::Json(value) => normalize(value),
        ResponseBody::Malformed(_) => generic(),
    }
}

fn normalize_object(map: &Map<String, Value>) -> NormalizedError {
    if let Some(detail) = map.get("detail") {
        return match detail_message(detail) {
            Some(message) => NormalizedError::form(message),
            None => generic(),
        };
    }
    if map.is_empty() {
        return generic();
    }
    if let Some(fields) = first_of_string_arrays(map) {
        return NormalizedError::FieldError { fields };
    }
    if let Some(fields) = plain_strings(map) {
        return NormalizedError::FieldError { fields };
    }
    generic()
}

fn detail_message(detail: &Value) -> Option<String> {
    match detail {
        Value::Array(items) => items.first().map(stringify),
        Value::Null => None,
        other => Some(stringify(other)),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn first_of_string_arrays(map: &Map<String, Value>) -> Option<BTreeMap<String, String>> {
    map.iter()
        .map(|(field, value)| {
            let items = value.as_array()?;
            if !items.iter().all(Value::is_string) {
                return None;
            }
            let first = items.first()?.as_str()?;
            Some((field.clone(), first.to_string()))
        })
        .collect()
}

fn plain_strings(map: &Map<String, Value>) -> Option<BTreeMap<String, String>> {
    map.iter()
        .map(|(field, value)| Some((field.clone(), value.as_str()?.to_string())))
        .collect()
}

fn generic() -> NormalizedError {
    NormalizedError::form(GENERIC_ERROR_MESSAGE)
}
