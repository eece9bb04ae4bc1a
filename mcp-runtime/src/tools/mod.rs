//! Tool registry and dispatch.
//!
//! Each group module declares its tools and handles calls by name; the
//! routing table from tool name to group is built once from those
//! declarations.

use std::collections::HashMap;
use std::sync::LazyLock;

use attio_core::ToolError;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::gateway::Gateway;

pub mod lists;
pub mod notes;
pub mod records;
pub mod schema;
pub mod tasks;

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolGroup {
    Records,
    Lists,
    Schema,
    Notes,
    Tasks,
}

impl ToolGroup {
    pub const ALL: [ToolGroup; 5] = [
        ToolGroup::Records,
        ToolGroup::Lists,
        ToolGroup::Schema,
        ToolGroup::Notes,
        ToolGroup::Tasks,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolGroup::Records => "records",
            ToolGroup::Lists => "lists",
            ToolGroup::Schema => "schema",
            ToolGroup::Notes => "notes",
            ToolGroup::Tasks => "tasks",
        }
    }

    fn definitions(self) -> Vec<ToolDefinition> {
        match self {
            ToolGroup::Records => records::definitions(),
            ToolGroup::Lists => lists::definitions(),
            ToolGroup::Schema => schema::definitions(),
            ToolGroup::Notes => notes::definitions(),
            ToolGroup::Tasks => tasks::definitions(),
        }
    }

    async fn handle(
        self,
        gateway: &dyn Gateway,
        name: &str,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        match self {
            ToolGroup::Records => records::handle(gateway, name, args).await,
            ToolGroup::Lists => lists::handle(gateway, name, args).await,
            ToolGroup::Schema => schema::handle(gateway, name, args).await,
            ToolGroup::Notes => notes::handle(gateway, name, args).await,
            ToolGroup::Tasks => tasks::handle(gateway, name, args).await,
        }
    }
}

static TOOL_ROUTES: LazyLock<HashMap<&'static str, ToolGroup>> = LazyLock::new(|| {
    let mut routes = HashMap::new();
    for group in ToolGroup::ALL {
        for tool in group.definitions() {
            routes.insert(tool.name, group);
        }
    }
    routes
});

/// Every tool, grouped as records, lists, schema, notes, tasks.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolGroup::ALL
        .into_iter()
        .flat_map(ToolGroup::definitions)
        .collect()
}

pub fn tool_group(name: &str) -> Option<ToolGroup> {
    TOOL_ROUTES.get(name).copied()
}

/// Runs one tool. Non-object arguments are treated as `{}`.
pub async fn call_tool(
    gateway: &dyn Gateway,
    name: &str,
    arguments: Value,
) -> Result<String, ToolError> {
    let group = tool_group(name).ok_or_else(|| ToolError::unknown_tool(name))?;
    let args = match arguments {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    group.handle(gateway, name, &args).await
}

/// Runs one tool and always yields text: failures become `Error: <message>`.
pub async fn dispatch(gateway: &dyn Gateway, name: &str, arguments: Value) -> String {
    match call_tool(gateway, name, arguments).await {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(
                tool = name,
                group = tool_group(name).map(ToolGroup::as_str).unwrap_or("unknown"),
                error_code = err.code(),
                error = %err,
                "tool call failed"
            );
            format!("Error: {err}")
        }
    }
}

/// Payload under `data`, or the whole body when there is none.
pub(crate) fn response_data(body: &Value) -> &Value {
    body.get("data").unwrap_or(body)
}

/// Items of a listing response; empty when `data` is missing or not an array.
pub(crate) fn response_items(body: &Value) -> &[Value] {
    body.get("data")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Text of a string field on a response object, with a fallback for
/// missing or null values.
pub(crate) fn text_or(raw: &Value, key: &str, default: &str) -> String {
    match raw.get(key) {
        Some(Value::Null) | None => default.to_string(),
        Some(value) => attio_core::values::scalar_text(value),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::FakeGateway;

    #[test]
    fn registry_exposes_every_tool_in_group_order() {
        let names: Vec<&str> = tool_definitions().iter().map(|tool| tool.name).collect();
        assert_eq!(
            names,
            vec![
                "search_records",
                "get_record",
                "create_or_update_record",
                "update_record",
                "list_record_entries",
                "query_records",
                "get_attribute_history",
                "delete_record",
                "list_lists",
                "create_list",
                "query_list_entries",
                "create_or_update_entry",
                "delete_entry",
                "archive_list",
                "list_attributes",
                "create_attribute",
                "list_select_options",
                "create_select_option",
                "create_note",
                "list_notes",
                "delete_note",
                "create_task",
                "list_tasks",
                "update_task",
            ]
        );
    }

    #[test]
    fn every_schema_is_an_object_schema() {
        for tool in tool_definitions() {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
            assert!(tool.input_schema["properties"].is_object(), "{}", tool.name);
        }
    }

    #[test]
    fn routes_map_names_to_owning_group() {
        assert_eq!(tool_group("search_records"), Some(ToolGroup::Records));
        assert_eq!(tool_group("archive_list"), Some(ToolGroup::Lists));
        assert_eq!(tool_group("create_select_option"), Some(ToolGroup::Schema));
        assert_eq!(tool_group("delete_note"), Some(ToolGroup::Notes));
        assert_eq!(tool_group("update_task"), Some(ToolGroup::Tasks));
        assert_eq!(tool_group("nonexistent_tool"), None);
    }

    #[tokio::test]
    async fn unknown_tool_returns_error_text_without_remote_calls() {
        let gateway = FakeGateway::new();
        let text = dispatch(&gateway, "nonexistent_tool", json!({})).await;
        assert_eq!(text, "Error: Unknown tool: nonexistent_tool");
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_required_argument_fails_before_remote_call() {
        let gateway = FakeGateway::new();
        let text = dispatch(&gateway, "get_record", json!({ "object": "companies" })).await;
        assert_eq!(text, "Error: Missing required argument 'record_id'");
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn non_object_arguments_are_coerced_to_empty() {
        let gateway = FakeGateway::new().respond(
            reqwest::Method::GET,
            "/lists",
            json!({ "data": [] }),
        );
        let text = dispatch(&gateway, "list_lists", json!(["unexpected"])).await;
        assert_eq!(text, "No lists found in workspace.");

        let text = dispatch(&gateway, "search_records", Value::Null).await;
        assert_eq!(text, "Error: Missing required argument 'query'");
    }

    #[tokio::test]
    async fn empty_required_string_still_reaches_the_api() {
        let gateway = FakeGateway::new().respond(
            reqwest::Method::POST,
            "/objects/companies/records/query",
            json!({ "data": [] }),
        );
        let text = dispatch(&gateway, "search_records", json!({ "query": "" })).await;
        assert_eq!(text, "No companies found matching ''");
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn remote_failure_is_rendered_as_error_text() {
        let gateway = FakeGateway::new().fail(
            reqwest::Method::GET,
            "/objects/companies/records/rec_1",
            ToolError::Remote {
                status: 404,
                message: "Record not found".to_string(),
            },
        );
        let text = dispatch(
            &gateway,
            "get_record",
            json!({ "object": "companies", "record_id": "rec_1" }),
        )
        .await;
        assert_eq!(text, "Error: Attio API error (404): Record not found");
        assert_eq!(gateway.calls().len(), 1);
    }

    #[test]
    fn response_helpers_tolerate_missing_data() {
        let body = json!({ "id": "x" });
        assert_eq!(response_data(&body), &body);
        assert!(response_items(&body).is_empty());
        assert!(response_items(&json!({ "data": { "id": "x" } })).is_empty());
        assert_eq!(text_or(&json!({ "name": null }), "name", "(unnamed)"), "(unnamed)");
    }
}
