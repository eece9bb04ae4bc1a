//! Decoding of Attio's polymorphic attribute values into display text.
//!
//! Attio returns every attribute as an array of value objects whose shape
//! depends on the attribute type. A single object may carry several
//! recognizable keys at once; decoding always picks the first one in
//! [`FieldValue`] declaration order.

use std::fmt;

use serde_json::Value;

/// Prefix of the display text produced for record references. Formatters use
/// it to hide raw references from listings.
pub const RECORD_REF_PREFIX: &str = "[record:";

/// One decoded unit of attribute data.
///
/// Variant order is the extraction priority: `display_value` beats
/// `full_name`, which beats `value`, and so on down to `target_record_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    DisplayValue(String),
    FullName(String),
    PlainValue(String),
    EmailAddress(String),
    Domain(String),
    PhoneNumber(String),
    OptionRef { title: String },
    StatusRef { title: String },
    Currency { code: String, amount: String },
    DateValue(String),
    RecordRef { target_id: String },
}

const SCALAR_KEYS: [(&str, fn(String) -> FieldValue); 6] = [
    ("display_value", FieldValue::DisplayValue),
    ("full_name", FieldValue::FullName),
    ("value", FieldValue::PlainValue),
    ("email_address", FieldValue::EmailAddress),
    ("domain", FieldValue::Domain),
    ("phone_number", FieldValue::PhoneNumber),
];

impl FieldValue {
    /// Decode one raw value object. Returns `None` when no recognized key is
    /// present (or the payload is not an object at all).
    pub fn decode(raw: &Value) -> Option<FieldValue> {
        let obj = raw.as_object()?;

        for (key, variant) in SCALAR_KEYS {
            if let Some(value) = obj.get(key).filter(|v| !v.is_null()) {
                return Some(variant(scalar_text(value)));
            }
        }

        if let Some(option) = obj.get("option").filter(|v| is_truthy(v)) {
            return Some(FieldValue::OptionRef {
                title: nested_title(option),
            });
        }
        if let Some(status) = obj.get("status").filter(|v| is_truthy(v)) {
            return Some(FieldValue::StatusRef {
                title: nested_title(status),
            });
        }

        if let Some(amount) = obj.get("currency_value").filter(|v| !v.is_null()) {
            let code = obj.get("currency_code").map(scalar_text).unwrap_or_default();
            return Some(FieldValue::Currency {
                code,
                amount: scalar_text(amount),
            });
        }

        if let Some(date) = obj.get("date").filter(|v| !v.is_null()) {
            return Some(FieldValue::DateValue(scalar_text(date)));
        }

        if let Some(target) = obj.get("target_record_id").filter(|v| is_truthy(v)) {
            return Some(FieldValue::RecordRef {
                target_id: scalar_text(target),
            });
        }

        None
    }

    pub fn is_record_ref(&self) -> bool {
        matches!(self, FieldValue::RecordRef { .. })
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::DisplayValue(text)
            | FieldValue::FullName(text)
            | FieldValue::PlainValue(text)
            | FieldValue::EmailAddress(text)
            | FieldValue::Domain(text)
            | FieldValue::PhoneNumber(text)
            | FieldValue::DateValue(text) => f.write_str(text),
            FieldValue::OptionRef { title } | FieldValue::StatusRef { title } => {
                f.write_str(title)
            }
            FieldValue::Currency { code, amount } => write!(f, "{code} {amount}"),
            FieldValue::RecordRef { target_id } => write!(f, "{RECORD_REF_PREFIX}{target_id}]"),
        }
    }
}

/// Display text for one raw value object; empty when nothing is recognized.
pub fn extract_value(raw: &Value) -> String {
    FieldValue::decode(raw)
        .map(|value| value.to_string())
        .unwrap_or_default()
}

/// Display text for a multi-valued attribute: non-empty extractions joined
/// with `", "`.
pub fn extract_values(raw: &[Value]) -> String {
    raw.iter()
        .map(extract_value)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Same as [`extract_values`] for already decoded values.
pub fn join_values(values: &[FieldValue]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Attribute slug to decoded values, in the order the API returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeValues {
    entries: Vec<(String, Vec<FieldValue>)>,
}

impl AttributeValues {
    pub fn from_json(raw: Option<&Value>) -> Self {
        let Some(map) = raw.and_then(Value::as_object) else {
            return Self::default();
        };
        let entries = map
            .iter()
            .map(|(slug, values)| {
                let decoded = match values {
                    Value::Array(items) => items.iter().filter_map(FieldValue::decode).collect(),
                    Value::Object(_) => FieldValue::decode(values).into_iter().collect(),
                    _ => Vec::new(),
                };
                (slug.clone(), decoded)
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, slug: &str) -> Option<&[FieldValue]> {
        self.entries
            .iter()
            .find(|(key, _)| key == slug)
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FieldValue])> {
        self.entries
            .iter()
            .map(|(slug, values)| (slug.as_str(), values.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First non-empty joined display among `slugs`, checked in order. A slug
    /// that is present but extracts to nothing does not stop the search.
    pub fn first_display(&self, slugs: &[&str]) -> String {
        slugs
            .iter()
            .filter_map(|slug| self.get(slug))
            .map(join_values)
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    }
}

/// Plain-text rendering of a JSON scalar. Strings are returned verbatim,
/// null becomes empty, everything else uses its JSON text.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn nested_title(value: &Value) -> String {
    match value.get("title") {
        Some(title) => scalar_text(title),
        None => scalar_text(value),
    }
}
