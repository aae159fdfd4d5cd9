//! Action normalization and DJB2 hashing.

use serde_json::{Map, Value};

/// DJB2: `h=5381; h=h*33+c`, masked to 32 bits, lower-case hex, zero-padded to 8.
pub fn djb2_hex(input: &str) -> String {
    let mut hash: u32 = 5381;
    for byte in input.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(byte as u32);
    }
    format!("{hash:08x}")
}

/// Builds the hash key for one `(tool, params)` pair per the normalization
/// rules in 4.2, then hashes it.
pub fn action_hash(tool: &str, params: &Map<String, Value>) -> String {
    djb2_hex(&normalize(tool, params))
}

fn normalize(tool: &str, params: &Map<String, Value>) -> String {
    match tool {
        "navigate" => {
            let url = str_param(params, "url");
            format!("navigate|{url}")
        }
        "click-element" => {
            if let Some(index) = params.get("index").and_then(Value::as_i64) {
                format!("click|{index}")
            } else if let (Some(x), Some(y)) = (
                params.get("x").and_then(Value::as_f64),
                params.get("y").and_then(Value::as_f64),
            ) {
                format!("click|{x},{y}")
            } else {
                format!("click|{}", str_param(params, "selector"))
            }
        }
        "type-text" => {
            let target = if let Some(index) = params.get("index").and_then(Value::as_i64) {
                index.to_string()
            } else if let Some(selector) = params.get("selector").and_then(Value::as_str) {
                selector.to_string()
            } else {
                "focused".to_string()
            };
            let text = str_param(params, "text").to_lowercase().trim().to_string();
            format!("input|{target}|{text}")
        }
        "scroll" => {
            let direction = str_param(params, "direction");
            let target = if let Some(index) = params.get("index").and_then(Value::as_i64) {
                index.to_string()
            } else {
                "page".to_string()
            };
            format!("scroll|{direction}|{target}")
        }
        "search-page" => {
            let query = str_param(params, "query");
            let mut tokens: Vec<String> = query
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| !t.is_empty())
                .map(|t| t.to_lowercase())
                .collect();
            tokens.sort();
            format!("search|{}", tokens.join("|"))
        }
        other => {
            let sorted = sorted_stripped(params);
            format!("{other}|{sorted}")
        }
    }
}

fn str_param<'a>(params: &'a Map<String, Value>, key: &str) -> &'a str {
    params.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Re-serialises `params` with keys sorted and `null` entries stripped, so
/// that key order and explicit-null-vs-absent differences hash identically.
fn sorted_stripped(params: &Map<String, Value>) -> String {
    let mut sorted = Map::new();
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();
    for key in keys {
        let value = &params[key];
        if !value.is_null() {
            sorted.insert(key.clone(), value.clone());
        }
    }
    Value::Object(sorted).to_string()
}
