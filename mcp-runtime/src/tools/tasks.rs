//! Task tools.

use attio_core::ToolError;
use attio_core::format::{Task, format_task, id_text, truncate_chars};
use attio_core::normalize::deadline_date;
use attio_core::values::scalar_text;
use serde_json::{Map, Value, json};

use super::{ToolDefinition, response_data, response_items};
use crate::args::{
    arg_array, arg_bool, arg_optional_bool, arg_optional_string, arg_supplied_string, arg_u64,
    required_string,
};
use crate::gateway::Gateway;

const CONFIRMATION_CONTENT_CHARS: usize = 80;

pub(crate) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "create_task",
            description: "Create a follow-up task with optional deadline and linked records.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "content": {
                        "type": "string",
                        "description": "Task description"
                    },
                    "deadline_at": {
                        "type": "string",
                        "description": "Deadline in ISO format (e.g. '2026-03-01T00:00:00.000Z'). Optional."
                    },
                    "is_completed": {
                        "type": "boolean",
                        "description": "Whether the task starts completed (default false)",
                        "default": false
                    },
                    "linked_records": {
                        "type": "array",
                        "description": "Records to link. Array of {\"target_object\": \"companies\", \"target_record_id\": \"...\"}",
                        "items": {
                            "type": "object",
                            "properties": {
                                "target_object": { "type": "string" },
                                "target_record_id": { "type": "string" }
                            }
                        }
                    },
                    "assignees": {
                        "type": "array",
                        "description": "Workspace member IDs to assign. Array of {\"referenced_actor_type\": \"workspace-member\", \"referenced_actor_id\": \"...\"}",
                        "items": { "type": "object" }
                    }
                },
                "required": ["content"]
            }),
        },
        ToolDefinition {
            name: "list_tasks",
            description: "List tasks, optionally filtered by linked record or completion status.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "linked_object": {
                        "type": "string",
                        "description": "Filter by linked object type (companies, people, deals). Optional."
                    },
                    "linked_record_id": {
                        "type": "string",
                        "description": "Filter by linked record ID. Requires linked_object."
                    },
                    "is_completed": {
                        "type": "boolean",
                        "description": "Filter by completion status. Omit to show all."
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Max tasks to return (default 50)",
                        "default": 50
                    }
                }
            }),
        },
        ToolDefinition {
            name: "update_task",
            description: "Update a task: mark complete, change deadline, update content.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": {
                        "type": "string",
                        "description": "The task ID to update"
                    },
                    "content": {
                        "type": "string",
                        "description": "New task description"
                    },
                    "deadline_at": {
                        "type": "string",
                        "description": "New deadline in ISO format"
                    },
                    "is_completed": {
                        "type": "boolean",
                        "description": "Set to true to mark complete"
                    }
                },
                "required": ["task_id"]
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
        "create_task" => create_task(gateway, args).await,
        "list_tasks" => list_tasks(gateway, args).await,
        "update_task" => update_task(gateway, args).await,
        _ => Err(ToolError::validation(format!("Unknown task tool: {name}"))),
    }
}

async fn create_task(gateway: &dyn Gateway, args: &Map<String, Value>) -> Result<String, ToolError> {
    let content = required_string(args, "content")?;

    let mut data = json!({
        "content": content,
        "format": "plaintext",
        "is_completed": arg_bool(args, "is_completed", false)?,
        "linked_records": arg_array(args, "linked_records")?,
        "assignees": arg_array(args, "assignees")?,
    });
    if let Some(deadline) = arg_optional_string(args, "deadline_at")? {
        data["deadline_at"] = json!(deadline_date(&deadline));
    }

    let response = gateway.post("/tasks", json!({ "data": data })).await?;
    let task_id = id_text(response_data(&response).get("id"), "task_id");

    Ok(format!(
        "Created task: {} (ID: {task_id})",
        truncate_chars(&content, CONFIRMATION_CONTENT_CHARS)
    ))
}

async fn list_tasks(gateway: &dyn Gateway, args: &Map<String, Value>) -> Result<String, ToolError> {
    let limit = arg_u64(args, "limit", 50)?;

    let mut query = vec![("limit".to_string(), limit.to_string())];
    if let (Some(object), Some(record_id)) = (
        arg_optional_string(args, "linked_object")?,
        arg_optional_string(args, "linked_record_id")?,
    ) {
        query.push(("linked_object".to_string(), object));
        query.push(("linked_record_id".to_string(), record_id));
    }
    if let Some(is_completed) = arg_optional_bool(args, "is_completed")? {
        query.push(("is_completed".to_string(), is_completed.to_string()));
    }

    let data = gateway.get("/tasks", &query).await?;
    let tasks = response_items(&data);

    if tasks.is_empty() {
        return Ok("No tasks found.".to_string());
    }

    let mut lines = vec![format!("Tasks ({}):", tasks.len())];
    for raw in tasks {
        lines.push(format_task(&Task::from_json(raw)));
        lines.push(String::new());
    }
    Ok(lines.join("\n"))
}

/// Sends only the fields the caller supplied.
async fn update_task(gateway: &dyn Gateway, args: &Map<String, Value>) -> Result<String, ToolError> {
    let task_id = required_string(args, "task_id")?;

    let mut data = Map::new();
    if let Some(content) = arg_supplied_string(args, "content")? {
        data.insert("content".to_string(), json!(content));
        data.insert("format".to_string(), json!("plaintext"));
    }
    if let Some(deadline) = arg_supplied_string(args, "deadline_at")? {
        data.insert("deadline_at".to_string(), json!(deadline_date(&deadline)));
    }
    if let Some(is_completed) = arg_optional_bool(args, "is_completed")? {
        data.insert("is_completed".to_string(), json!(is_completed));
    }

    let response = gateway
        .patch(&format!("/tasks/{task_id}"), json!({ "data": data }))
        .await?;
    let task = response_data(&response);
    let content = task
        .get("content_plaintext")
        .or_else(|| task.get("content"))
        .map(scalar_text)
        .unwrap_or_default();

    Ok(format!(
        "Updated task: {}",
        truncate_chars(&content, CONFIRMATION_CONTENT_CHARS)
    ))
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::testing::{FakeGateway, args};

    #[tokio::test]
    async fn create_task_truncates_deadline_to_date() {
        let gateway = FakeGateway::new().respond(
            Method::POST,
            "/tasks",
            json!({ "data": { "id": { "workspace_id": "ws", "task_id": "t_1" } } }),
        );
        let text = handle(
            &gateway,
            "create_task",
            &args(json!({
                "content": "Send proposal",
                "deadline_at": "2026-03-01T12:00:00Z",
                "linked_records": [{ "target_object": "companies", "target_record_id": "rec_acme" }]
            })),
        )
        .await
        .unwrap();

        assert_eq!(text, "Created task: Send proposal (ID: t_1)");
        assert_eq!(
            gateway.only_call().body,
            Some(json!({
                "data": {
                    "content": "Send proposal",
                    "format": "plaintext",
                    "is_completed": false,
                    "linked_records": [{ "target_object": "companies", "target_record_id": "rec_acme" }],
                    "assignees": [],
                    "deadline_at": "2026-03-01"
                }
            }))
        );
    }

    #[tokio::test]
    async fn create_task_confirmation_caps_content() {
        let gateway = FakeGateway::new().respond(
            Method::POST,
            "/tasks",
            json!({ "data": { "id": { "task_id": "t_2" } } }),
        );
        let content = "a".repeat(120);
        let text = handle(&gateway, "create_task", &args(json!({ "content": content })))
            .await
            .unwrap();
        assert_eq!(text, format!("Created task: {} (ID: t_2)", "a".repeat(80)));
        assert!(gateway.only_call().body.unwrap()["data"].get("deadline_at").is_none());
    }

    #[tokio::test]
    async fn list_tasks_applies_linked_filter_only_when_complete() {
        let gateway = FakeGateway::new().respond(Method::GET, "/tasks", json!({ "data": [] }));

        let text = handle(
            &gateway,
            "list_tasks",
            &args(json!({ "linked_object": "companies", "is_completed": false })),
        )
        .await
        .unwrap();
        assert_eq!(text, "No tasks found.");

        handle(
            &gateway,
            "list_tasks",
            &args(json!({ "linked_object": "companies", "linked_record_id": "rec_acme", "limit": 10 })),
        )
        .await
        .unwrap();

        let queries: Vec<Vec<(String, String)>> =
            gateway.calls().into_iter().map(|call| call.query).collect();
        let pair = |k: &str, v: &str| (k.to_string(), v.to_string());
        assert_eq!(
            queries,
            vec![
                vec![pair("limit", "50"), pair("is_completed", "false")],
                vec![
                    pair("limit", "10"),
                    pair("linked_object", "companies"),
                    pair("linked_record_id", "rec_acme")
                ],
            ]
        );
    }

    #[tokio::test]
    async fn list_tasks_renders_each_task_followed_by_blank_line() {
        let gateway = FakeGateway::new().respond(
            Method::GET,
            "/tasks",
            json!({ "data": [
                { "id": { "task_id": "t_1" }, "content_plaintext": "Call back", "is_completed": false },
                { "id": { "task_id": "t_2" }, "content_plaintext": "Ship", "is_completed": true }
            ] }),
        );
        let text = handle(&gateway, "list_tasks", &Map::new()).await.unwrap();
        assert_eq!(
            text,
            "Tasks (2):\nTask: Call back [Open] (ID: t_1)\n\nTask: Ship [Done] (ID: t_2)\n"
        );
    }

    #[tokio::test]
    async fn update_task_sends_only_supplied_fields() {
        let gateway = FakeGateway::new().respond(
            Method::PATCH,
            "/tasks/t_1",
            json!({ "data": { "content_plaintext": "Call back" } }),
        );
        let text = handle(
            &gateway,
            "update_task",
            &args(json!({ "task_id": "t_1", "is_completed": true })),
        )
        .await
        .unwrap();
        assert_eq!(text, "Updated task: Call back");
        assert_eq!(
            gateway.only_call().body,
            Some(json!({ "data": { "is_completed": true } }))
        );
    }

    #[tokio::test]
    async fn update_task_content_adds_format_and_deadline_is_truncated() {
        let gateway = FakeGateway::new().respond(
            Method::PATCH,
            "/tasks/t_1",
            json!({ "data": { "content": "Renegotiate" } }),
        );
        handle(
            &gateway,
            "update_task",
            &args(json!({
                "task_id": "t_1",
                "content": "Renegotiate",
                "deadline_at": "2026-04-15T09:00:00.000Z"
            })),
        )
        .await
        .unwrap();
        assert_eq!(
            gateway.only_call().body,
            Some(json!({
                "data": {
                    "content": "Renegotiate",
                    "format": "plaintext",
                    "deadline_at": "2026-04-15"
                }
            }))
        );
    }
}
