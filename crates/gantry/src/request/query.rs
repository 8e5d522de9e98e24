//! Query-string encoding for residual call parameters.

use serde_json::Value;

/// Text form of a scalar JSON value as it appears in a URL.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Encode parameters in insertion order.
///
/// Arrays become repeated `key[]=v` pairs, objects become `key[sub]=v`, `null` is a bare key.
pub fn to_query_string(params: &serde_json::Map<String, Value>) -> String {
    let mut pairs = Vec::with_capacity(params.len());
    for (key, value) in params {
        encode_pair(key, value, &mut pairs);
    }
    pairs.join("&")
}

fn encode_pair(key: &str, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => out.push(urlencoding::encode(key).into_owned()),
        Value::Array(items) => {
            let nested = format!("{key}[]");
            for item in items {
                encode_pair(&nested, item, out);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                encode_pair(&format!("{key}[{sub}]"), item, out);
            }
        }
        scalar => out.push(format!(
            "{}={}",
            urlencoding::encode(key),
            urlencoding::encode(&scalar_text(scalar))
        )),
    }
}
