//! Lenient extraction of typed config values from a `serde_json::Value` object.
//!
//! Each helper takes a JSON value, a key name, and a default. If the key is
//! missing or the value has the wrong shape, the default is returned. They
//! never fail; range checks belong to [`SimConfig::validate`](crate::SimConfig::validate).

use glam::DVec2;
use serde_json::Value;

/// Extracts an `f64` from `params[name]`, accepting integers as well.
pub fn param_f64(params: &Value, name: &str, default: f64) -> f64 {
    params.get(name).and_then(Value::as_f64).unwrap_or(default)
}

/// Extracts a `usize` from `params[name]`; only non-negative integers qualify.
pub fn param_usize(params: &Value, name: &str, default: usize) -> usize {
    params
        .get(name)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

/// Extracts an optional `u64`. A JSON `null` clears the value.
pub fn param_opt_u64(params: &Value, name: &str, default: Option<u64>) -> Option<u64> {
    match params.get(name) {
        Some(Value::Null) => None,
        Some(v) => v.as_u64().or(default),
        None => default,
    }
}

/// Extracts a `String` from `params[name]`.
pub fn param_string(params: &Value, name: &str, default: &str) -> String {
    params
        .get(name)
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| default.to_owned())
}

/// Extracts a 2-D point written either as `[x, y]` or as `{"x": .., "y": ..}`.
pub fn param_vec2(params: &Value, name: &str, default: DVec2) -> DVec2 {
    let Some(value) = params.get(name) else {
        return default;
    };
    let pair = match value {
        Value::Array(items) if items.len() == 2 => items[0].as_f64().zip(items[1].as_f64()),
        Value::Object(_) => value
            .get("x")
            .and_then(Value::as_f64)
            .zip(value.get("y").and_then(Value::as_f64)),
        _ => None,
    };
    pair.map(|(x, y)| DVec2::new(x, y)).unwrap_or(default)
}
