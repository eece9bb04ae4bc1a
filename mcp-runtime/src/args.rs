//! Typed access to tool argument objects.

use attio_core::ToolError;
use serde_json::{Map, Value};

/// Any string, empty included; only an absent or null key counts as missing.
pub fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(ToolError::missing(key)),
        Some(Value::String(v)) => Ok(v.clone()),
        Some(_) => Err(ToolError::invalid_field(
            key,
            format!("'{key}' must be a string"),
        )),
    }
}

pub fn required_object(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Map<String, Value>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(ToolError::missing(key)),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(ToolError::invalid_field(
            key,
            format!("'{key}' must be an object"),
        )),
    }
}

pub fn arg_string(args: &Map<String, Value>, key: &str, default: &str) -> Result<String, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default.to_string()),
        Some(Value::String(v)) => Ok(v.clone()),
        Some(_) => Err(ToolError::invalid_field(
            key,
            format!("'{key}' must be a string"),
        )),
    }
}

/// Present, non-blank string or `None`.
pub fn arg_optional_string(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<String>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) if v.trim().is_empty() => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(ToolError::invalid_field(
            key,
            format!("'{key}' must be a string"),
        )),
    }
}

/// Any supplied string, including an empty one. Used by partial updates
/// where presence of the key is what matters.
pub fn arg_supplied_string(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<String>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(ToolError::invalid_field(
            key,
            format!("'{key}' must be a string"),
        )),
    }
}

pub fn arg_bool(args: &Map<String, Value>, key: &str, default: bool) -> Result<bool, ToolError> {
    Ok(arg_optional_bool(args, key)?.unwrap_or(default))
}

pub fn arg_optional_bool(args: &Map<String, Value>, key: &str) -> Result<Option<bool>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(v)) => Ok(Some(*v)),
        Some(_) => Err(ToolError::invalid_field(
            key,
            format!("'{key}' must be a boolean"),
        )),
    }
}

pub fn arg_u64(args: &Map<String, Value>, key: &str, default: u64) -> Result<u64, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| {
            ToolError::invalid_field(key, format!("'{key}' must be an unsigned integer"))
        }),
        Some(_) => Err(ToolError::invalid_field(
            key,
            format!("'{key}' must be an unsigned integer"),
        )),
    }
}

pub fn arg_optional_object(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<Map<String, Value>>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map.clone())),
        Some(_) => Err(ToolError::invalid_field(
            key,
            format!("'{key}' must be an object"),
        )),
    }
}

pub fn arg_array(args: &Map<String, Value>, key: &str) -> Result<Vec<Value>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err(ToolError::invalid_field(
            key,
            format!("'{key}' must be an array"),
        )),
    }
}

/// Pass-through payload (filters, sorts) forwarded only when non-empty.
pub fn arg_optional_payload(args: &Map<String, Value>, key: &str) -> Option<Value> {
    args.get(key)
        .filter(|value| match value {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::String(text) => !text.is_empty(),
            _ => true,
        })
        .cloned()
}

/// Value of a string argument restricted to `allowed`.
pub fn required_enum(
    args: &Map<String, Value>,
    key: &str,
    allowed: &[&str],
) -> Result<String, ToolError> {
    let value = required_string(args, key)?;
    if allowed.contains(&value.as_str()) {
        Ok(value)
    } else {
        Err(ToolError::invalid_field(
            key,
            format!("'{key}' must be one of: {}", allowed.join(", ")),
        ))
    }
}
