//! List/pipeline tools: list, create, archive, query entries, add/update and
//! remove entries.

use std::collections::HashMap;

use attio_core::ToolError;
use attio_core::format::{ListEntry, Record, SHORT_NAME_SLUGS, format_list_entry, id_text};
use attio_core::normalize::derive_api_slug;
use attio_core::values::scalar_text;
use serde_json::{Map, Value, json};

use super::{ToolDefinition, response_data, response_items, text_or};
use crate::args::{
    arg_bool, arg_optional_object, arg_optional_payload, arg_optional_string, arg_string, arg_u64,
    required_string,
};
use crate::gateway::Gateway;

pub(crate) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_lists",
            description: "Get all lists/pipelines in the workspace.",
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolDefinition {
            name: "create_list",
            description: "Create a new list/pipeline. Specify the parent object (companies, people, deals) and a name. A slug is auto-generated from the name.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Name for the new list"
                    },
                    "api_slug": {
                        "type": "string",
                        "description": "API slug (snake_case). Auto-generated from name if not provided."
                    },
                    "parent_object": {
                        "type": "string",
                        "description": "Parent object slug: companies, people, or deals",
                        "default": "companies"
                    },
                    "workspace_access": {
                        "type": "string",
                        "description": "Access level: full-access, read-and-write, or read-only",
                        "default": "full-access"
                    }
                },
                "required": ["name"]
            }),
        },
        ToolDefinition {
            name: "query_list_entries",
            description: "View entries in a list/pipeline with optional filtering and sorting. Returns formatted entries with all field values.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "list_id": {
                        "type": "string",
                        "description": "List ID or slug (e.g. 'sales')"
                    },
                    "filter": {
                        "type": "object",
                        "description": "Optional Attio filter object. Example: {\"attribute\": \"stage\", \"condition\": \"equals\", \"value\": \"Meeting\"}"
                    },
                    "sorts": {
                        "type": "array",
                        "description": "Optional sort array. Example: [{\"attribute\": \"created_at\", \"direction\": \"desc\"}]"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Max entries to return (default 50)",
                        "default": 50
                    }
                },
                "required": ["list_id"]
            }),
        },
        ToolDefinition {
            name: "create_or_update_entry",
            description: "Add a record to a list or update an existing entry. If the record is already in the list, it updates the entry values.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "list_id": {
                        "type": "string",
                        "description": "List ID or slug"
                    },
                    "parent_record_id": {
                        "type": "string",
                        "description": "The record ID to add/update in the list"
                    },
                    "parent_object": {
                        "type": "string",
                        "description": "Object type slug: companies, people, or deals",
                        "default": "companies"
                    },
                    "entry_values": {
                        "type": "object",
                        "description": "Values for list-specific fields (stage, next_step, etc.)",
                        "default": {}
                    }
                },
                "required": ["list_id", "parent_record_id", "parent_object"]
            }),
        },
        ToolDefinition {
            name: "delete_entry",
            description: "Remove a record from a list/pipeline.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "list_id": {
                        "type": "string",
                        "description": "List ID or slug"
                    },
                    "entry_id": {
                        "type": "string",
                        "description": "The entry ID to remove"
                    }
                },
                "required": ["list_id", "entry_id"]
            }),
        },
        ToolDefinition {
            name: "archive_list",
            description: "Archive a list/pipeline. Hides it from the sidebar but preserves data. Use is_archived=false to unarchive.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "list_id": {
                        "type": "string",
                        "description": "List ID or slug to archive"
                    },
                    "is_archived": {
                        "type": "boolean",
                        "description": "True to archive, false to unarchive",
                        "default": true
                    }
                },
                "required": ["list_id"]
            }),
        },
    ]
}

pub(crate) async fn handle(
    gateway: &dyn Gateway,
    name: &str,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    match name {
        "list_lists" => list_lists(gateway).await,
        "create_list" => create_list(gateway, args).await,
        "query_list_entries" => query_list_entries(gateway, args).await,
        "create_or_update_entry" => create_or_update_entry(gateway, args).await,
        "delete_entry" => delete_entry(gateway, args).await,
        "archive_list" => archive_list(gateway, args).await,
        _ => Err(ToolError::validation(format!("Unknown list tool: {name}"))),
    }
}

async fn list_lists(gateway: &dyn Gateway) -> Result<String, ToolError> {
    let data = gateway.get("/lists", &[]).await?;
    let lists = response_items(&data);

    if lists.is_empty() {
        return Ok("No lists found in workspace.".to_string());
    }

    let mut lines = vec!["Lists in workspace:".to_string()];
    for list in lists {
        let list_id = id_text(list.get("id"), "list_id");
        let name = text_or(list, "name", "(unnamed)");
        let slug = text_or(list, "api_slug", "");
        let parent = match list.get("parent_object") {
            Some(Value::Array(parents)) => parents.first().map(scalar_text).unwrap_or_default(),
            Some(parent) => scalar_text(parent),
            None => String::new(),
        };

        let mut parts = vec![format!("  {name}")];
        if !slug.is_empty() {
            parts.push(format!("slug: {slug}"));
        }
        parts.push(format!("ID: {list_id}"));
        if !parent.is_empty() {
            parts.push(format!("parent: {parent}"));
        }
        lines.push(parts.join(" — "));
    }
    Ok(lines.join("\n"))
}

async fn create_list(gateway: &dyn Gateway, args: &Map<String, Value>) -> Result<String, ToolError> {
    let name = required_string(args, "name")?;
    let parent = arg_string(args, "parent_object", "companies")?;
    let access = arg_string(args, "workspace_access", "full-access")?;
    let slug = match arg_optional_string(args, "api_slug")? {
        Some(slug) => slug,
        None => derive_api_slug(&name),
    };

    let body = json!({
        "data": {
            "name": name,
            "api_slug": slug,
            "parent_object": parent,
            "workspace_access": access,
            "workspace_member_access": [],
        },
    });
    let data = gateway.post("/lists", body).await?;
    let list = response_data(&data);
    let list_id = id_text(list.get("id"), "list_id");
    let actual_slug = text_or(list, "api_slug", &slug);

    Ok(format!(
        "Created list: {name} (ID: {list_id}, slug: {actual_slug})"
    ))
}

async fn query_list_entries(
    gateway: &dyn Gateway,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let list_id = required_string(args, "list_id")?;
    let limit = arg_u64(args, "limit", 50)?;

    let mut body = json!({ "limit": limit });
    if let Some(filter) = arg_optional_payload(args, "filter") {
        body["filter"] = filter;
    }
    if let Some(sorts) = arg_optional_payload(args, "sorts") {
        body["sorts"] = sorts;
    }

    let data = gateway
        .post(&format!("/lists/{list_id}/entries/query"), body)
        .await?;
    let entries: Vec<ListEntry> = response_items(&data)
        .iter()
        .map(ListEntry::from_json)
        .collect();

    if entries.is_empty() {
        return Ok(format!("No entries in list '{list_id}'."));
    }

    let record_names = resolve_parent_names(gateway, &entries).await;

    let mut lines = vec![format!("List '{list_id}' ({} entries):", entries.len())];
    for (index, entry) in entries.iter().enumerate() {
        lines.push(format_list_entry(entry, index + 1, &record_names));
    }
    Ok(lines.join("\n"))
}

/// Looks up display names for the parent records of `entries`.
///
/// One GET per distinct record id within each parent object type, issued
/// sequentially. A failed lookup maps the id to itself instead of failing
/// the batch; a record without a usable name is left out of the map.
pub(crate) async fn resolve_parent_names(
    gateway: &dyn Gateway,
    entries: &[ListEntry],
) -> HashMap<String, String> {
    let mut by_object: Vec<(&str, Vec<&str>)> = Vec::new();
    for entry in entries {
        if entry.parent_object.is_empty() || entry.parent_record_id.is_empty() {
            continue;
        }
        let record_id = entry.parent_record_id.as_str();
        match by_object
            .iter_mut()
            .find(|(object, _)| *object == entry.parent_object)
        {
            Some((_, record_ids)) => {
                if !record_ids.contains(&record_id) {
                    record_ids.push(record_id);
                }
            }
            None => by_object.push((entry.parent_object.as_str(), vec![record_id])),
        }
    }

    let mut names = HashMap::new();
    for (object, record_ids) in by_object {
        for record_id in record_ids {
            match gateway
                .get(&format!("/objects/{object}/records/{record_id}"), &[])
                .await
            {
                Ok(data) => {
                    let record = Record::from_json(response_data(&data));
                    let name = record.values.first_display(&SHORT_NAME_SLUGS);
                    if !name.is_empty() {
                        names.insert(record_id.to_string(), name);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        object,
                        record_id,
                        error = %err,
                        "parent record lookup failed; showing raw id"
                    );
                    names.insert(record_id.to_string(), record_id.to_string());
                }
            }
        }
    }
    names
}

async fn create_or_update_entry(
    gateway: &dyn Gateway,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let list_id = required_string(args, "list_id")?;
    let parent_record_id = required_string(args, "parent_record_id")?;
    let parent_object = required_string(args, "parent_object")?;
    let entry_values = arg_optional_object(args, "entry_values")?.unwrap_or_default();

    let body = json!({
        "data": {
            "parent_record_id": parent_record_id,
            "parent_object": parent_object,
            "entry_values": entry_values,
        },
    });
    let data = gateway
        .put(&format!("/lists/{list_id}/entries"), body, &[])
        .await?;
    let entry = ListEntry::from_json(response_data(&data));

    Ok(format!(
        "Added/updated entry in '{list_id}' (entry ID: {})",
        entry.id
    ))
}

async fn delete_entry(gateway: &dyn Gateway, args: &Map<String, Value>) -> Result<String, ToolError> {
    let list_id = required_string(args, "list_id")?;
    let entry_id = required_string(args, "entry_id")?;

    gateway
        .delete(&format!("/lists/{list_id}/entries/{entry_id}"))
        .await?;
    Ok(format!("Removed entry {entry_id} from list '{list_id}'."))
}

async fn archive_list(gateway: &dyn Gateway, args: &Map<String, Value>) -> Result<String, ToolError> {
    let list_id = required_string(args, "list_id")?;
    let is_archived = arg_bool(args, "is_archived", true)?;

    let body = json!({ "data": { "is_archived": is_archived } });
    let data = gateway.patch(&format!("/lists/{list_id}"), body).await?;
    let name = text_or(response_data(&data), "name", &list_id);

    let action = if is_archived { "Archived" } else { "Unarchived" };
    Ok(format!("{action} list: {name}"))
}
