//! Note tools.

use attio_core::ToolError;
use attio_core::format::{Note, format_note, id_text};
use attio_core::values::scalar_text;
use serde_json::{Map, Value, json};

use super::{ToolDefinition, response_data, response_items};
use crate::args::{arg_u64, required_string};
use crate::gateway::Gateway;

pub(crate) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "create_note",
            description: "Add a note to a record (company, person, or deal).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "parent_object": {
                        "type": "string",
                        "description": "Object type: companies, people, or deals"
                    },
                    "parent_record_id": {
                        "type": "string",
                        "description": "The record ID to attach the note to"
                    },
                    "title": {
                        "type": "string",
                        "description": "Note title"
                    },
                    "content": {
                        "type": "string",
                        "description": "Note body text (plain text or markdown)"
                    }
                },
                "required": ["parent_object", "parent_record_id", "title", "content"]
            }),
        },
        ToolDefinition {
            name: "list_notes",
            description: "List notes on a record.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "parent_object": {
                        "type": "string",
                        "description": "Object type: companies, people, or deals"
                    },
                    "parent_record_id": {
                        "type": "string",
                        "description": "The record ID to list notes for"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Max notes to return (default 20)",
                        "default": 20
                    }
                },
                "required": ["parent_object", "parent_record_id"]
            }),
        },
        ToolDefinition {
            name: "delete_note",
            description: "Permanently delete a note. This is irreversible.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "note_id": {
                        "type": "string",
                        "description": "The note ID to delete"
                    }
                },
                "required": ["note_id"]
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
        "create_note" => create_note(gateway, args).await,
        "list_notes" => list_notes(gateway, args).await,
        "delete_note" => delete_note(gateway, args).await,
        _ => Err(ToolError::validation(format!("Unknown note tool: {name}"))),
    }
}

async fn create_note(gateway: &dyn Gateway, args: &Map<String, Value>) -> Result<String, ToolError> {
    let parent_object = required_string(args, "parent_object")?;
    let parent_record_id = required_string(args, "parent_record_id")?;
    let title = required_string(args, "title")?;
    let content = required_string(args, "content")?;

    let body = json!({
        "data": {
            "parent_object": parent_object,
            "parent_record_id": parent_record_id,
            "title": title,
            "format": "plaintext",
            "content": content,
        },
    });
    let data = gateway.post("/notes", body).await?;
    let note = response_data(&data);
    let note_id = match note.get("note_id").filter(|v| !v.is_null()) {
        Some(note_id) => scalar_text(note_id),
        None => id_text(note.get("id"), "note_id"),
    };

    Ok(format!("Created note: {title} (ID: {note_id})"))
}

async fn list_notes(gateway: &dyn Gateway, args: &Map<String, Value>) -> Result<String, ToolError> {
    let parent_object = required_string(args, "parent_object")?;
    let parent_record_id = required_string(args, "parent_record_id")?;
    let limit = arg_u64(args, "limit", 20)?;

    let query = [
        ("parent_object".to_string(), parent_object),
        ("parent_record_id".to_string(), parent_record_id),
        ("limit".to_string(), limit.to_string()),
    ];
    let data = gateway.get("/notes", &query).await?;
    let notes = response_items(&data);

    if notes.is_empty() {
        return Ok("No notes found on this record.".to_string());
    }

    let mut lines = vec![format!("Notes ({}):", notes.len())];
    for raw in notes {
        lines.push(format_note(&Note::from_json(raw)));
        lines.push(String::new());
    }
    Ok(lines.join("\n"))
}

async fn delete_note(gateway: &dyn Gateway, args: &Map<String, Value>) -> Result<String, ToolError> {
    let note_id = required_string(args, "note_id")?;

    gateway.delete(&format!("/notes/{note_id}")).await?;
    Ok(format!("Permanently deleted note {note_id}."))
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::testing::{FakeGateway, args};

    #[tokio::test]
    async fn create_note_posts_plaintext_body() {
        let gateway = FakeGateway::new().respond(
            Method::POST,
            "/notes",
            json!({ "data": { "id": { "workspace_id": "ws", "note_id": "n_1" } } }),
        );
        let text = handle(
            &gateway,
            "create_note",
            &args(json!({
                "parent_object": "companies",
                "parent_record_id": "rec_acme",
                "title": "Call recap",
                "content": "Discussed pricing."
            })),
        )
        .await
        .unwrap();

        assert_eq!(text, "Created note: Call recap (ID: n_1)");
        assert_eq!(
            gateway.only_call().body,
            Some(json!({
                "data": {
                    "parent_object": "companies",
                    "parent_record_id": "rec_acme",
                    "title": "Call recap",
                    "format": "plaintext",
                    "content": "Discussed pricing."
                }
            }))
        );
    }

    #[tokio::test]
    async fn create_note_requires_every_field() {
        let gateway = FakeGateway::new();
        let err = handle(
            &gateway,
            "create_note",
            &args(json!({
                "parent_object": "companies",
                "parent_record_id": "rec_acme",
                "title": "No body"
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing required argument 'content'");
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn create_note_accepts_empty_content() {
        let gateway = FakeGateway::new().respond(
            Method::POST,
            "/notes",
            json!({ "data": { "id": { "note_id": "n_2" } } }),
        );
        let text = handle(
            &gateway,
            "create_note",
            &args(json!({
                "parent_object": "deals",
                "parent_record_id": "d_1",
                "title": "Placeholder",
                "content": ""
            })),
        )
        .await
        .unwrap();

        assert_eq!(text, "Created note: Placeholder (ID: n_2)");
        assert_eq!(gateway.only_call().body.unwrap()["data"]["content"], "");
    }

    #[tokio::test]
    async fn list_notes_sends_query_and_separates_notes() {
        let gateway = FakeGateway::new().respond(
            Method::GET,
            "/notes",
            json!({ "data": [
                { "title": "First", "content_plaintext": "One", "created_at": "2026-02-01T10:00:00Z" },
                { "title": "Second" }
            ] }),
        );
        let text = handle(
            &gateway,
            "list_notes",
            &args(json!({ "parent_object": "people", "parent_record_id": "p_1" })),
        )
        .await
        .unwrap();

        assert_eq!(
            text,
            "Notes (2):\nNote: First\n  Created: 2026-02-01\n  One\n\nNote: Second\n"
        );
        assert_eq!(
            gateway.only_call().query,
            vec![
                ("parent_object".to_string(), "people".to_string()),
                ("parent_record_id".to_string(), "p_1".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn list_notes_reports_empty_record() {
        let gateway = FakeGateway::new().respond(Method::GET, "/notes", json!({ "data": [] }));
        let text = handle(
            &gateway,
            "list_notes",
            &args(json!({ "parent_object": "people", "parent_record_id": "p_1", "limit": 5 })),
        )
        .await
        .unwrap();
        assert_eq!(text, "No notes found on this record.");
    }

    #[tokio::test]
    async fn delete_note_confirms() {
        let gateway = FakeGateway::new().respond(Method::DELETE, "/notes/n_1", json!({}));
        let text = handle(&gateway, "delete_note", &args(json!({ "note_id": "n_1" })))
            .await
            .unwrap();
        assert_eq!(text, "Permanently deleted note n_1.");
        assert_eq!(gateway.only_call().method, Method::DELETE);
    }
}
