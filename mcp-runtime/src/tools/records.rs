//! Record tools: search, get, upsert, update, list memberships, structured
//! query, attribute history, delete.

use attio_core::ToolError;
use attio_core::format::{
    Record, SHORT_NAME_SLUGS, format_record, format_record_short, id_text, strip_plural,
};
use attio_core::normalize::normalize_write_values;
use attio_core::values::{extract_value, scalar_text};
use serde_json::{Map, Value, json};

use super::{ToolDefinition, response_data, response_items};
use crate::args::{arg_optional_payload, arg_string, arg_u64, required_object, required_string};
use crate::gateway::Gateway;

pub(crate) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "search_records",
            description: "Search for records (companies, people, deals) by name, email, or domain. Returns formatted results.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search text (name, email, domain, etc.)"
                    },
                    "object": {
                        "type": "string",
                        "description": "Object type to search: companies, people, or deals",
                        "enum": ["companies", "people", "deals"],
                        "default": "companies"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Max results (default 10)",
                        "default": 10
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "get_record",
            description: "Get a single record by ID with all its field values, formatted cleanly.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object": {
                        "type": "string",
                        "description": "Object type: companies, people, or deals"
                    },
                    "record_id": {
                        "type": "string",
                        "description": "The record ID"
                    }
                },
                "required": ["object", "record_id"]
            }),
        },
        ToolDefinition {
            name: "create_or_update_record",
            description: "Create or update a record (upsert). Matches by matching_attribute to avoid duplicates. Use 'domains' for companies, 'email_addresses' for people.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object": {
                        "type": "string",
                        "description": "Object type: companies, people, deals"
                    },
                    "matching_attribute": {
                        "type": "string",
                        "description": "Attribute to match on for upsert (e.g. 'domains' for companies, 'email_addresses' for people)"
                    },
                    "values": {
                        "type": "object",
                        "description": "Field values to set. Each key is an attribute slug, value is the raw value or array of values. Example: {\"name\": \"Acme Corp\", \"domains\": [\"acme.com\"]}"
                    }
                },
                "required": ["object", "matching_attribute", "values"]
            }),
        },
        ToolDefinition {
            name: "update_record",
            description: "Update specific fields on an existing record by ID.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object": {
                        "type": "string",
                        "description": "Object type: companies, people, deals"
                    },
                    "record_id": {
                        "type": "string",
                        "description": "The record ID to update"
                    },
                    "values": {
                        "type": "object",
                        "description": "Field values to update. Same format as create_or_update_record."
                    }
                },
                "required": ["object", "record_id", "values"]
            }),
        },
        ToolDefinition {
            name: "list_record_entries",
            description: "See what lists/pipelines a record belongs to.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object": {
                        "type": "string",
                        "description": "Object type: companies, people, deals"
                    },
                    "record_id": {
                        "type": "string",
                        "description": "The record ID"
                    }
                },
                "required": ["object", "record_id"]
            }),
        },
        ToolDefinition {
            name: "query_records",
            description: "Query records with structured filters and sorting. More powerful than search_records. Supports $and, $or, $not, $contains, $starts_with, $gt, $lt, $gte, $lte, $is_empty, $not_empty.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object": {
                        "type": "string",
                        "description": "Object type: companies, people, or deals"
                    },
                    "filter": {
                        "type": "object",
                        "description": "Attio filter object. Examples: {\"name\": {\"$contains\": \"rapid\"}}, {\"$or\": [{\"stage\": \"Meeting\"}, {\"stage\": \"Proposal\"}]}, {\"created_at\": {\"$gt\": \"2026-02-01\"}}"
                    },
                    "sorts": {
                        "type": "array",
                        "description": "Sort array. Example: [{\"attribute\": \"name\", \"direction\": \"asc\"}]"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Max results (default 20)",
                        "default": 20
                    }
                },
                "required": ["object"]
            }),
        },
        ToolDefinition {
            name: "get_attribute_history",
            description: "Get the full history of a field's values on a record. Shows when values changed and what they changed to. Useful for auditing stage changes, tracking when contacts were updated, etc.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object": {
                        "type": "string",
                        "description": "Object type: companies, people, or deals"
                    },
                    "record_id": {
                        "type": "string",
                        "description": "The record ID"
                    },
                    "attribute": {
                        "type": "string",
                        "description": "Attribute slug (e.g. 'name', 'stage', 'email_addresses')"
                    }
                },
                "required": ["object", "record_id", "attribute"]
            }),
        },
        ToolDefinition {
            name: "delete_record",
            description: "Permanently delete a record (company, person, or deal). This is irreversible.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object": {
                        "type": "string",
                        "description": "Object type: companies, people, deals"
                    },
                    "record_id": {
                        "type": "string",
                        "description": "The record ID to delete"
                    }
                },
                "required": ["object", "record_id"]
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
        "search_records" => search_records(gateway, args).await,
        "get_record" => get_record(gateway, args).await,
        "create_or_update_record" => create_or_update_record(gateway, args).await,
        "update_record" => update_record(gateway, args).await,
        "list_record_entries" => list_record_entries(gateway, args).await,
        "query_records" => query_records(gateway, args).await,
        "get_attribute_history" => get_attribute_history(gateway, args).await,
        "delete_record" => delete_record(gateway, args).await,
        _ => Err(ToolError::validation(format!("Unknown record tool: {name}"))),
    }
}

/// Name/identifier filter used by `search_records`. People also match on
/// email, companies on domain, anything else on name only.
pub fn search_filter(object_type: &str, query: &str) -> Value {
    match object_type {
        "people" => json!({
            "$or": [
                { "name": { "$contains": query } },
                { "email_addresses": { "$contains": query } }
            ]
        }),
        "companies" => json!({
            "$or": [
                { "name": { "$contains": query } },
                { "domains": { "$contains": query } }
            ]
        }),
        _ => json!({ "name": { "$contains": query } }),
    }
}

async fn search_records(gateway: &dyn Gateway, args: &Map<String, Value>) -> Result<String, ToolError> {
    let query = required_string(args, "query")?;
    let object_type = arg_string(args, "object", "companies")?;
    let limit = arg_u64(args, "limit", 10)?;

    let body = json!({
        "filter": search_filter(&object_type, &query),
        "limit": limit,
    });
    let data = gateway
        .post(&format!("/objects/{object_type}/records/query"), body)
        .await?;
    let records = response_items(&data);

    if records.is_empty() {
        return Ok(format!("No {object_type} found matching '{query}'"));
    }
    Ok(record_listing(&object_type, records))
}

async fn get_record(gateway: &dyn Gateway, args: &Map<String, Value>) -> Result<String, ToolError> {
    let object_type = required_string(args, "object")?;
    let record_id = required_string(args, "record_id")?;

    let data = gateway
        .get(&format!("/objects/{object_type}/records/{record_id}"), &[])
        .await?;
    let record = Record::from_json(response_data(&data));
    Ok(format_record(&record, &object_type))
}

async fn create_or_update_record(
    gateway: &dyn Gateway,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let object_type = required_string(args, "object")?;
    let matching = required_string(args, "matching_attribute")?;
    let values = required_object(args, "values")?;

    let body = json!({
        "data": {
            "values": normalize_write_values(&values),
        },
    });
    let data = gateway
        .put(
            &format!("/objects/{object_type}/records"),
            body,
            &[("matching_attribute".to_string(), matching)],
        )
        .await?;
    let record = Record::from_json(response_data(&data));
    let name = record.values.first_display(&SHORT_NAME_SLUGS);

    Ok(format!(
        "Created/updated {}: {} (ID: {})",
        strip_plural(&object_type),
        if name.is_empty() { "(unnamed)" } else { name.as_str() },
        record.id
    ))
}

async fn update_record(gateway: &dyn Gateway, args: &Map<String, Value>) -> Result<String, ToolError> {
    let object_type = required_string(args, "object")?;
    let record_id = required_string(args, "record_id")?;
    let values = required_object(args, "values")?;

    let body = json!({ "data": { "values": normalize_write_values(&values) } });
    let data = gateway
        .patch(&format!("/objects/{object_type}/records/{record_id}"), body)
        .await?;
    let record = Record::from_json(response_data(&data));
    let name = record.values.first_display(&SHORT_NAME_SLUGS);

    Ok(format!(
        "Updated {}: {}",
        strip_plural(&object_type),
        if name.is_empty() { &record_id } else { &name }
    ))
}

async fn list_record_entries(
    gateway: &dyn Gateway,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let object_type = required_string(args, "object")?;
    let record_id = required_string(args, "record_id")?;

    let data = gateway
        .get(&format!("/objects/{object_type}/records/{record_id}/entries"), &[])
        .await?;
    let entries = response_items(&data);

    if entries.is_empty() {
        return Ok("This record is not in any lists/pipelines.".to_string());
    }

    let mut lines = vec![format!("Record belongs to {} list(s):", entries.len())];
    for entry in entries {
        let list_id = entry.get("list_id").map(scalar_text).unwrap_or_default();
        let entry_id = match entry.get("entry_id").filter(|v| !v.is_null()) {
            Some(entry_id) => scalar_text(entry_id),
            None => id_text(entry.get("id"), "entry_id"),
        };
        lines.push(format!("  List: {list_id} — Entry ID: {entry_id}"));
    }
    Ok(lines.join("\n"))
}

async fn query_records(gateway: &dyn Gateway, args: &Map<String, Value>) -> Result<String, ToolError> {
    let object_type = required_string(args, "object")?;
    let limit = arg_u64(args, "limit", 20)?;

    let mut body = json!({ "limit": limit });
    if let Some(filter) = arg_optional_payload(args, "filter") {
        body["filter"] = filter;
    }
    if let Some(sorts) = arg_optional_payload(args, "sorts") {
        body["sorts"] = sorts;
    }

    let data = gateway
        .post(&format!("/objects/{object_type}/records/query"), body)
        .await?;
    let records = response_items(&data);

    if records.is_empty() {
        return Ok(format!("No {object_type} matched the query."));
    }
    Ok(record_listing(&object_type, records))
}

async fn get_attribute_history(
    gateway: &dyn Gateway,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let object_type = required_string(args, "object")?;
    let record_id = required_string(args, "record_id")?;
    let attribute = required_string(args, "attribute")?;

    let data = gateway
        .get(
            &format!("/objects/{object_type}/records/{record_id}/attributes/{attribute}/values"),
            &[("show_historic".to_string(), "true".to_string())],
        )
        .await?;
    let values = response_items(&data);

    if values.is_empty() {
        return Ok(format!("No values found for {attribute} on this record."));
    }

    let mut lines = vec![format!(
        "History for '{attribute}' ({} values):",
        values.len()
    )];
    for value in values {
        let active_from = match value.get("active_from") {
            Some(Value::Null) | None => "unknown".to_string(),
            Some(from) => scalar_text(from),
        };
        let status = match value.get("active_until") {
            Some(Value::Null) | None => " [current]".to_string(),
            Some(until) => format!(" → ended {}", scalar_text(until)),
        };
        lines.push(format!("  {active_from}: {}{status}", extract_value(value)));
    }
    Ok(lines.join("\n"))
}

async fn delete_record(gateway: &dyn Gateway, args: &Map<String, Value>) -> Result<String, ToolError> {
    let object_type = required_string(args, "object")?;
    let record_id = required_string(args, "record_id")?;

    gateway
        .delete(&format!("/objects/{object_type}/records/{record_id}"))
        .await?;
    Ok(format!(
        "Permanently deleted {} record {record_id}.",
        strip_plural(&object_type)
    ))
}

fn record_listing(object_type: &str, records: &[Value]) -> String {
    let mut lines = vec![format!("Found {} {object_type}:", records.len())];
    for (index, raw) in records.iter().enumerate() {
        let record = Record::from_json(raw);
        lines.push(format!("{}. {}", index + 1, format_record_short(&record)));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::testing::{FakeGateway, args};

    fn acme() -> Value {
        json!({
            "id": { "workspace_id": "ws", "object_id": "obj", "record_id": "rec_acme" },
            "values": {
                "name": [{ "value": "Acme" }],
                "domains": [{ "domain": "acme.com" }]
            }
        })
    }

    #[tokio::test]
    async fn search_companies_matches_name_or_domain() {
        let gateway = FakeGateway::new().respond(
            Method::POST,
            "/objects/companies/records/query",
            json!({ "data": [acme()] }),
        );
        let text = handle(&gateway, "search_records", &args(json!({ "query": "acme" })))
            .await
            .unwrap();

        assert_eq!(text, "Found 1 companies:\n1. Acme (acme.com) — ID: rec_acme");
        let call = gateway.only_call();
        assert_eq!(
            call.body,
            Some(json!({
                "filter": {
                    "$or": [
                        { "name": { "$contains": "acme" } },
                        { "domains": { "$contains": "acme" } }
                    ]
                },
                "limit": 10
            }))
        );
    }

    #[test]
    fn search_filter_depends_on_object_type() {
        assert_eq!(
            search_filter("people", "ada")["$or"][1],
            json!({ "email_addresses": { "$contains": "ada" } })
        );
        assert_eq!(
            search_filter("deals", "big"),
            json!({ "name": { "$contains": "big" } })
        );
    }

    #[tokio::test]
    async fn search_without_results_names_the_query() {
        let gateway = FakeGateway::new().respond(
            Method::POST,
            "/objects/deals/records/query",
            json!({ "data": [] }),
        );
        let text = handle(
            &gateway,
            "search_records",
            &args(json!({ "query": "zzz", "object": "deals", "limit": 3 })),
        )
        .await
        .unwrap();
        assert_eq!(text, "No deals found matching 'zzz'");
        assert_eq!(gateway.only_call().body.unwrap()["limit"], 3);
    }

    #[tokio::test]
    async fn get_record_formats_full_view() {
        let gateway = FakeGateway::new().respond(
            Method::GET,
            "/objects/companies/records/rec_acme",
            json!({ "data": acme() }),
        );
        let text = handle(
            &gateway,
            "get_record",
            &args(json!({ "object": "companies", "record_id": "rec_acme" })),
        )
        .await
        .unwrap();
        assert_eq!(text, "Company: Acme (ID: rec_acme)\n  Domains: acme.com");
    }

    #[tokio::test]
    async fn upsert_passes_matching_attribute_and_values_through() {
        let gateway = FakeGateway::new().respond(
            Method::PUT,
            "/objects/companies/records",
            json!({ "data": acme() }),
        );
        let text = handle(
            &gateway,
            "create_or_update_record",
            &args(json!({
                "object": "companies",
                "matching_attribute": "domains",
                "values": { "name": "Acme", "domains": ["acme.com"] }
            })),
        )
        .await
        .unwrap();

        assert_eq!(text, "Created/updated companie: Acme (ID: rec_acme)");
        let call = gateway.only_call();
        assert_eq!(
            call.query,
            vec![("matching_attribute".to_string(), "domains".to_string())]
        );
        // Scalar "name" is forwarded as-is, not wrapped in an array.
        assert_eq!(
            call.body,
            Some(json!({ "data": { "values": { "name": "Acme", "domains": ["acme.com"] } } }))
        );
    }

    #[tokio::test]
    async fn update_falls_back_to_record_id_when_unnamed() {
        let gateway = FakeGateway::new().respond(
            Method::PATCH,
            "/objects/deals/records/d_1",
            json!({ "data": { "id": { "record_id": "d_1" }, "values": {} } }),
        );
        let text = handle(
            &gateway,
            "update_record",
            &args(json!({ "object": "deals", "record_id": "d_1", "values": { "stage": "Won" } })),
        )
        .await
        .unwrap();
        assert_eq!(text, "Updated deal: d_1");
    }

    #[tokio::test]
    async fn update_requires_values_object() {
        let gateway = FakeGateway::new();
        let err = handle(
            &gateway,
            "update_record",
            &args(json!({ "object": "deals", "record_id": "d_1", "values": "Won" })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "'values' must be an object");
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn record_entries_list_memberships() {
        let gateway = FakeGateway::new().respond(
            Method::GET,
            "/objects/people/records/p_1/entries",
            json!({ "data": [
                { "list_id": "l_sales", "entry_id": "e_1" },
                { "list_id": "l_hiring", "id": { "entry_id": "e_2" } }
            ] }),
        );
        let text = handle(
            &gateway,
            "list_record_entries",
            &args(json!({ "object": "people", "record_id": "p_1" })),
        )
        .await
        .unwrap();
        assert_eq!(
            text,
            "Record belongs to 2 list(s):\n  List: l_sales — Entry ID: e_1\n  List: l_hiring — Entry ID: e_2"
        );
    }

    #[tokio::test]
    async fn query_records_forwards_filter_and_sorts_only_when_present() {
        let gateway = FakeGateway::new().respond(
            Method::POST,
            "/objects/deals/records/query",
            json!({ "data": [] }),
        );
        let text = handle(
            &gateway,
            "query_records",
            &args(json!({
                "object": "deals",
                "filter": { "stage": "Meeting" },
                "sorts": []
            })),
        )
        .await
        .unwrap();
        assert_eq!(text, "No deals matched the query.");
        assert_eq!(
            gateway.only_call().body,
            Some(json!({ "limit": 20, "filter": { "stage": "Meeting" } }))
        );
    }

    #[tokio::test]
    async fn attribute_history_marks_current_and_ended_values() {
        let gateway = FakeGateway::new().respond(
            Method::GET,
            "/objects/deals/records/d_1/attributes/stage/values",
            json!({ "data": [
                {
                    "active_from": "2026-01-01T00:00:00Z",
                    "active_until": "2026-02-01T00:00:00Z",
                    "status": { "title": "Lead" }
                },
                {
                    "active_from": "2026-02-01T00:00:00Z",
                    "active_until": null,
                    "status": { "title": "Won" }
                }
            ] }),
        );
        let text = handle(
            &gateway,
            "get_attribute_history",
            &args(json!({ "object": "deals", "record_id": "d_1", "attribute": "stage" })),
        )
        .await
        .unwrap();
        assert_eq!(
            text,
            "History for 'stage' (2 values):\n  2026-01-01T00:00:00Z: Lead → ended 2026-02-01T00:00:00Z\n  2026-02-01T00:00:00Z: Won [current]"
        );
        assert_eq!(
            gateway.only_call().query,
            vec![("show_historic".to_string(), "true".to_string())]
        );
    }

    #[tokio::test]
    async fn delete_record_confirms() {
        let gateway = FakeGateway::new().respond(
            Method::DELETE,
            "/objects/people/records/p_1",
            json!({}),
        );
        let text = handle(
            &gateway,
            "delete_record",
            &args(json!({ "object": "people", "record_id": "p_1" })),
        )
        .await
        .unwrap();
        assert_eq!(text, "Permanently deleted people record p_1.");
    }

    #[tokio::test]
    async fn unknown_operation_is_rejected() {
        let gateway = FakeGateway::new();
        let err = handle(&gateway, "merge_records", &Map::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown record tool: merge_records");
    }
}
