//! Plain-text rendering of records, list entries, notes and tasks.

use std::collections::HashMap;

use serde_json::Value;

use crate::values::{AttributeValues, RECORD_REF_PREFIX, join_values, scalar_text};

/// Slugs probed, in order, for a record's display name.
pub const NAME_SLUGS: [&str; 3] = ["name", "full_name", "first_name"];
/// Slugs probed when resolving a parent record name or confirming a write.
pub const SHORT_NAME_SLUGS: [&str; 2] = ["name", "full_name"];
const SECONDARY_SLUGS: [&str; 4] = [
    "primary_domain",
    "domains",
    "email_addresses",
    "primary_email_address",
];
const RECORD_SKIP_SLUGS: [&str; 3] = ["name", "full_name", "record_id"];
const ENTRY_SKIP_SLUGS: [&str; 4] = ["entry_id", "owner", "created_by", "created_at"];

const NOTE_CONTENT_MAX_CHARS: usize = 500;
const DATE_PREFIX_CHARS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub values: AttributeValues,
}

impl Record {
    pub fn from_json(raw: &Value) -> Self {
        Self {
            id: id_text(raw.get("id"), "record_id"),
            values: AttributeValues::from_json(raw.get("values")),
        }
    }

    pub fn display_name(&self) -> String {
        self.values.first_display(&NAME_SLUGS)
    }
}

/// Membership of a record in a list. The parent record is only referenced;
/// its name is looked up separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEntry {
    pub id: String,
    pub parent_object: String,
    pub parent_record_id: String,
    pub values: AttributeValues,
}

impl ListEntry {
    pub fn from_json(raw: &Value) -> Self {
        let id = match raw.get("entry_id").filter(|v| !is_blank(v)) {
            Some(entry_id) => scalar_text(entry_id),
            None => id_text(raw.get("id"), "entry_id"),
        };
        let values = raw.get("entry_values").or_else(|| raw.get("values"));
        Self {
            id,
            parent_object: string_field(raw, "parent_object"),
            parent_record_id: string_field(raw, "parent_record_id"),
            values: AttributeValues::from_json(values),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Note {
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub created_at: Option<String>,
}

impl Note {
    pub fn from_json(raw: &Value) -> Self {
        let title = raw
            .get("title")
            .filter(|v| !v.is_null())
            .map(scalar_text)
            .unwrap_or_else(|| "(no title)".to_string());
        let content = raw
            .get("content_plaintext")
            .or_else(|| raw.get("content"))
            .map(scalar_text)
            .unwrap_or_default();
        let author = raw
            .get("author")
            .filter(|v| v.as_object().is_some_and(|m| !m.is_empty()))
            .and_then(|author| author.get("name"))
            .map(scalar_text)
            .filter(|name| !name.is_empty());
        Self {
            title,
            content,
            author,
            created_at: non_empty(string_field(raw, "created_at")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub content: String,
    pub is_completed: bool,
    pub deadline: Option<String>,
    /// Display name per assignee, falling back to the email address. May
    /// contain empty strings for assignees with neither.
    pub assignees: Vec<String>,
    pub linked_record_ids: Vec<String>,
}

impl Task {
    pub fn from_json(raw: &Value) -> Self {
        let content = raw
            .get("content_plaintext")
            .or_else(|| raw.get("content"))
            .map(scalar_text)
            .unwrap_or_else(|| "(no content)".to_string());
        let assignees = array_field(raw, "assignees")
            .iter()
            .map(|assignee| match assignee.get("name") {
                Some(name) => scalar_text(name),
                None => assignee
                    .get("email_address")
                    .map(scalar_text)
                    .unwrap_or_default(),
            })
            .collect();
        let linked_record_ids = array_field(raw, "linked_records")
            .iter()
            .map(|linked| {
                linked
                    .get("target_record_id")
                    .map(scalar_text)
                    .unwrap_or_default()
            })
            .collect();
        Self {
            id: id_text(raw.get("id"), "task_id"),
            content,
            is_completed: raw
                .get("is_completed")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            deadline: non_empty(string_field(raw, "deadline_at")),
            assignees,
            linked_record_ids,
        }
    }
}

/// Full record view: a header line, then one indented line per attribute
/// that has something worth showing.
pub fn format_record(record: &Record, object_type: &str) -> String {
    let name = record.display_name();
    let header = if object_type.is_empty() {
        "Record".to_string()
    } else {
        singular_label(object_type)
    };

    let mut lines = vec![format!(
        "{header}: {} (ID: {})",
        or_unnamed(&name),
        record.id
    )];
    for (slug, values) in record.values.iter() {
        if RECORD_SKIP_SLUGS.contains(&slug) {
            continue;
        }
        let display = join_values(values);
        if is_displayable(&display) {
            lines.push(format!("  {}: {display}", attribute_label(slug)));
        }
    }
    lines.join("\n")
}

/// One-line summary used by search and query listings.
pub fn format_record_short(record: &Record) -> String {
    let name = record.display_name();
    let secondary = record.values.first_display(&SECONDARY_SLUGS);

    let mut parts = vec![or_unnamed(&name).to_string()];
    if !secondary.is_empty() {
        parts.push(format!("({secondary})"));
    }
    parts.push(format!("— ID: {}", record.id));
    parts.join(" ")
}

/// One line per entry. `record_names` maps parent record ids to resolved
/// names; unresolved parents show their raw id.
pub fn format_list_entry(
    entry: &ListEntry,
    index: usize,
    record_names: &HashMap<String, String>,
) -> String {
    let name = record_names
        .get(&entry.parent_record_id)
        .filter(|name| !name.is_empty())
        .unwrap_or(&entry.parent_record_id);

    let mut parts = vec![format!("{index}. {name}")];
    for (slug, values) in entry.values.iter() {
        if ENTRY_SKIP_SLUGS.contains(&slug) {
            continue;
        }
        let display = join_values(values);
        if is_displayable(&display) {
            parts.push(format!("{}: {display}", attribute_label(slug)));
        }
    }
    parts.join(" — ")
}

pub fn format_note(note: &Note) -> String {
    let mut lines = vec![format!("Note: {}", note.title)];
    if let Some(author) = &note.author {
        lines.push(format!("  By: {author}"));
    }
    if let Some(created_at) = &note.created_at {
        lines.push(format!(
            "  Created: {}",
            truncate_chars(created_at, DATE_PREFIX_CHARS)
        ));
    }
    if !note.content.is_empty() {
        lines.push(format!(
            "  {}",
            truncate_chars(&note.content, NOTE_CONTENT_MAX_CHARS)
        ));
    }
    lines.join("\n")
}

pub fn format_task(task: &Task) -> String {
    let status = if task.is_completed { "Done" } else { "Open" };
    let mut lines = vec![format!("Task: {} [{status}] (ID: {})", task.content, task.id)];
    if let Some(deadline) = &task.deadline {
        lines.push(format!(
            "  Deadline: {}",
            truncate_chars(deadline, DATE_PREFIX_CHARS)
        ));
    }
    if !task.assignees.is_empty() {
        let names: Vec<&str> = task
            .assignees
            .iter()
            .map(String::as_str)
            .filter(|name| !name.is_empty())
            .collect();
        lines.push(format!("  Assigned to: {}", names.join(", ")));
    }
    if !task.linked_record_ids.is_empty() {
        lines.push(format!(
            "  Linked records: {}",
            task.linked_record_ids.join(", ")
        ));
    }
    lines.join("\n")
}

/// `companies` → `Company`, `people` → `Person`, `deals` → `Deal`; anything
/// else loses its trailing `s` characters and is capitalized.
pub fn singular_label(object_type: &str) -> String {
    match object_type {
        "companies" => "Company".to_string(),
        "people" => "Person".to_string(),
        "deals" => "Deal".to_string(),
        other => capitalize(other.trim_end_matches('s')),
    }
}

/// Object slug with every trailing `s` removed, as used in confirmations
/// (`companies` → `companie`, `deals` → `deal`).
pub fn strip_plural(object_type: &str) -> &str {
    object_type.trim_end_matches('s')
}

/// `next_step` → `Next Step`, `annual-revenue` → `Annual Revenue`.
pub fn attribute_label(slug: &str) -> String {
    let spaced = slug.replace(['_', '-'], " ");
    let mut label = String::with_capacity(spaced.len());
    let mut previous_alphabetic = false;
    for ch in spaced.chars() {
        if ch.is_alphabetic() {
            if previous_alphabetic {
                label.extend(ch.to_lowercase());
            } else {
                label.extend(ch.to_uppercase());
            }
            previous_alphabetic = true;
        } else {
            label.push(ch);
            previous_alphabetic = false;
        }
    }
    label
}

/// Prefix of at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Identifier of an Attio object. Ids arrive either as plain strings or as
/// composite objects (`{"workspace_id": .., "record_id": ..}`).
pub fn id_text(raw: Option<&Value>, key: &str) -> String {
    match raw {
        Some(Value::Object(map)) => map
            .get(key)
            .map(scalar_text)
            .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
        Some(other) => scalar_text(other),
        None => String::new(),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn is_displayable(display: &str) -> bool {
    !display.is_empty() && !display.starts_with(RECORD_REF_PREFIX)
}

fn or_unnamed(name: &str) -> &str {
    if name.is_empty() { "(unnamed)" } else { name }
}

fn string_field(raw: &Value, key: &str) -> String {
    raw.get(key).map(scalar_text).unwrap_or_default()
}

fn array_field<'a>(raw: &'a Value, key: &str) -> &'a [Value] {
    raw.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}
