//! Schema tools: attributes on objects and lists, and the options or
//! statuses of select and status attributes.

use attio_core::ToolError;
use attio_core::normalize::derive_api_slug;
use serde_json::{Map, Value, json};

use super::{ToolDefinition, response_data, response_items, text_or};
use crate::args::{
    arg_bool, arg_optional_object, arg_optional_payload, arg_optional_string, required_enum,
    required_string,
};
use crate::gateway::Gateway;

const TARGETS: [&str; 2] = ["objects", "lists"];

pub(crate) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_attributes",
            description: "List all attributes (fields) on an object or list. Use target='objects' for companies/people/deals, target='lists' for list-specific attributes.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "target": {
                        "type": "string",
                        "description": "Either 'objects' or 'lists'",
                        "enum": ["objects", "lists"]
                    },
                    "target_id": {
                        "type": "string",
                        "description": "Object slug (companies, people, deals) or list ID/slug"
                    }
                },
                "required": ["target", "target_id"]
            }),
        },
        ToolDefinition {
            name: "create_attribute",
            description: "Create a new attribute (field) on an object or list. Types: text, number, checkbox, date, timestamp, currency, select, status, rating, record-reference, etc.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "target": {
                        "type": "string",
                        "description": "Either 'objects' or 'lists'",
                        "enum": ["objects", "lists"]
                    },
                    "target_id": {
                        "type": "string",
                        "description": "Object slug or list ID/slug"
                    },
                    "title": {
                        "type": "string",
                        "description": "Display name for the attribute"
                    },
                    "api_slug": {
                        "type": "string",
                        "description": "API slug (snake_case). Auto-generated from title if not provided."
                    },
                    "type": {
                        "type": "string",
                        "description": "Attribute type: text, number, checkbox, date, timestamp, currency, select, status, rating, record-reference, personal-name, email-address, phone-number, domain, interaction"
                    },
                    "is_multiselect": {
                        "type": "boolean",
                        "description": "For select/status types, allow multiple selections",
                        "default": false
                    },
                    "relationship": {
                        "type": "object",
                        "description": "For record-reference type: {\"target_object\": \"companies\"} etc."
                    },
                    "default_currency_code": {
                        "type": "string",
                        "description": "For currency type: ISO currency code (e.g. 'USD')"
                    }
                },
                "required": ["target", "target_id", "title", "type"]
            }),
        },
        ToolDefinition {
            name: "list_select_options",
            description: "List options for a select attribute, or statuses for a status attribute.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "target": {
                        "type": "string",
                        "description": "Either 'objects' or 'lists'",
                        "enum": ["objects", "lists"]
                    },
                    "target_id": {
                        "type": "string",
                        "description": "Object slug or list ID/slug"
                    },
                    "attribute": {
                        "type": "string",
                        "description": "Attribute slug"
                    },
                    "is_status": {
                        "type": "boolean",
                        "description": "Set true if this is a status attribute (uses /statuses endpoint instead of /options)",
                        "default": false
                    }
                },
                "required": ["target", "target_id", "attribute"]
            }),
        },
        ToolDefinition {
            name: "create_select_option",
            description: "Add a new option to a select attribute, or a new status to a status attribute.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "target": {
                        "type": "string",
                        "description": "Either 'objects' or 'lists'",
                        "enum": ["objects", "lists"]
                    },
                    "target_id": {
                        "type": "string",
                        "description": "Object slug or list ID/slug"
                    },
                    "attribute": {
                        "type": "string",
                        "description": "Attribute slug"
                    },
                    "title": {
                        "type": "string",
                        "description": "Display name for the option/status"
                    },
                    "is_status": {
                        "type": "boolean",
                        "description": "Set true for status attributes",
                        "default": false
                    }
                },
                "required": ["target", "target_id", "attribute", "title"]
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
        "list_attributes" => list_attributes(gateway, args).await,
        "create_attribute" => create_attribute(gateway, args).await,
        "list_select_options" => list_select_options(gateway, args).await,
        "create_select_option" => create_select_option(gateway, args).await,
        _ => Err(ToolError::validation(format!("Unknown schema tool: {name}"))),
    }
}

/// Which sub-collection of a select-like attribute a call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChoiceKind {
    Option,
    Status,
}

impl ChoiceKind {
    fn from_args(args: &Map<String, Value>) -> Result<Self, ToolError> {
        Ok(if arg_bool(args, "is_status", false)? {
            ChoiceKind::Status
        } else {
            ChoiceKind::Option
        })
    }

    fn endpoint(self) -> &'static str {
        match self {
            ChoiceKind::Option => "options",
            ChoiceKind::Status => "statuses",
        }
    }

    fn singular(self) -> &'static str {
        match self {
            ChoiceKind::Option => "option",
            ChoiceKind::Status => "status",
        }
    }

    fn heading(self) -> &'static str {
        match self {
            ChoiceKind::Option => "Options",
            ChoiceKind::Status => "Statuses",
        }
    }
}

fn attribute_target(args: &Map<String, Value>) -> Result<(String, String), ToolError> {
    let target = required_enum(args, "target", &TARGETS)?;
    let target_id = required_string(args, "target_id")?;
    Ok((target, target_id))
}

async fn list_attributes(
    gateway: &dyn Gateway,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let (target, target_id) = attribute_target(args)?;

    let data = gateway
        .get(&format!("/{target}/{target_id}/attributes"), &[])
        .await?;
    let attributes = response_items(&data);

    if attributes.is_empty() {
        return Ok(format!("No attributes found on {target}/{target_id}."));
    }

    let mut lines = vec![format!(
        "Attributes on {target}/{target_id} ({}):",
        attributes.len()
    )];
    for attribute in attributes {
        let slug = text_or(attribute, "api_slug", "");
        let title = text_or(attribute, "title", "");
        let kind = text_or(attribute, "type", "");
        let is_system = attribute
            .get("is_system")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let is_writable = attribute
            .get("is_writable")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let mut flags = Vec::new();
        if is_system {
            flags.push("system");
        }
        if !is_writable {
            flags.push("read-only");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        lines.push(format!("  {slug} ({kind}) — {title}{flags}"));
    }
    Ok(lines.join("\n"))
}

async fn create_attribute(
    gateway: &dyn Gateway,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let (target, target_id) = attribute_target(args)?;
    let title = required_string(args, "title")?;
    let kind = required_string(args, "type")?;
    let slug = match arg_optional_string(args, "api_slug")? {
        Some(slug) => slug,
        None => derive_api_slug(&title),
    };

    let mut config = arg_optional_object(args, "config")?.unwrap_or_default();
    if let Some(currency) = arg_optional_string(args, "default_currency_code")? {
        config.insert(
            "currency".to_string(),
            json!({ "default_currency_code": currency }),
        );
    }

    let mut data = json!({
        "title": title,
        "api_slug": slug,
        "type": kind,
        "description": arg_optional_string(args, "description")?,
        "is_required": arg_bool(args, "is_required", false)?,
        "is_unique": arg_bool(args, "is_unique", false)?,
        "is_multiselect": arg_bool(args, "is_multiselect", false)?,
        "config": config,
    });
    if let Some(relationship) = arg_optional_payload(args, "relationship") {
        data["relationship"] = relationship;
    }

    let response = gateway
        .post(
            &format!("/{target}/{target_id}/attributes"),
            json!({ "data": data }),
        )
        .await?;
    let attribute = response_data(&response);
    let created_slug = text_or(attribute, "api_slug", &slug);
    let created_title = text_or(attribute, "title", &title);

    Ok(format!(
        "Created attribute: {created_title} (slug: {created_slug}, type: {kind})"
    ))
}

/// Option and status ids are composite; either key identifies the choice.
fn choice_id(raw: &Value) -> String {
    match raw.get("id") {
        Some(Value::Object(id)) => ["option_id", "status_id"]
            .iter()
            .filter_map(|key| id.get(*key))
            .map(attio_core::values::scalar_text)
            .find(|text| !text.is_empty())
            .unwrap_or_else(|| Value::Object(id.clone()).to_string()),
        Some(other) => attio_core::values::scalar_text(other),
        None => String::new(),
    }
}

async fn list_select_options(
    gateway: &dyn Gateway,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let (target, target_id) = attribute_target(args)?;
    let attribute = required_string(args, "attribute")?;
    let kind = ChoiceKind::from_args(args)?;

    let data = gateway
        .get(
            &format!(
                "/{target}/{target_id}/attributes/{attribute}/{}",
                kind.endpoint()
            ),
            &[],
        )
        .await?;
    let items = response_items(&data);

    if items.is_empty() {
        return Ok(format!("No {} for {attribute}.", kind.endpoint()));
    }

    let mut lines = vec![format!(
        "{} for {attribute} ({}):",
        kind.heading(),
        items.len()
    )];
    for item in items {
        let title = text_or(item, "title", "");
        let archived = if item
            .get("is_archived")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            " [archived]"
        } else {
            ""
        };
        lines.push(format!("  {title}{archived} (ID: {})", choice_id(item)));
    }
    Ok(lines.join("\n"))
}

async fn create_select_option(
    gateway: &dyn Gateway,
    args: &Map<String, Value>,
) -> Result<String, ToolError> {
    let (target, target_id) = attribute_target(args)?;
    let attribute = required_string(args, "attribute")?;
    let title = required_string(args, "title")?;
    let kind = ChoiceKind::from_args(args)?;

    let data = gateway
        .post(
            &format!(
                "/{target}/{target_id}/attributes/{attribute}/{}",
                kind.endpoint()
            ),
            json!({ "data": { "title": title } }),
        )
        .await?;
    let item = response_data(&data);

    Ok(format!(
        "Created {}: {title} (ID: {})",
        kind.singular(),
        choice_id(item)
    ))
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::testing::{FakeGateway, args};

    fn attributes_response() -> Value {
        json!({ "data": [
            {
                "api_slug": "name",
                "title": "Name",
                "type": "text",
                "is_system": true,
                "is_writable": true
            },
            {
                "api_slug": "record_id",
                "title": "Record ID",
                "type": "text",
                "is_system": true,
                "is_writable": false
            },
            { "api_slug": "tier", "title": "Tier", "type": "select" }
        ] })
    }

    #[tokio::test]
    async fn list_attributes_flags_system_and_read_only() {
        let gateway = FakeGateway::new().respond(
            Method::GET,
            "/objects/companies/attributes",
            attributes_response(),
        );
        let text = handle(
            &gateway,
            "list_attributes",
            &args(json!({ "target": "objects", "target_id": "companies" })),
        )
        .await
        .unwrap();
        assert_eq!(
            text,
            "Attributes on objects/companies (3):\n  name (text) — Name [system]\n  record_id (text) — Record ID [system, read-only]\n  tier (select) — Tier"
        );
    }

    #[tokio::test]
    async fn list_attributes_is_stable_across_calls() {
        let gateway = FakeGateway::new().respond(
            Method::GET,
            "/lists/sales/attributes",
            attributes_response(),
        );
        let call = args(json!({ "target": "lists", "target_id": "sales" }));
        let first = handle(&gateway, "list_attributes", &call).await.unwrap();
        let second = handle(&gateway, "list_attributes", &call).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(gateway.calls().len(), 2);
    }

    #[tokio::test]
    async fn list_attributes_reports_empty_target() {
        let gateway = FakeGateway::new().respond(
            Method::GET,
            "/objects/deals/attributes",
            json!({ "data": [] }),
        );
        let text = handle(
            &gateway,
            "list_attributes",
            &args(json!({ "target": "objects", "target_id": "deals" })),
        )
        .await
        .unwrap();
        assert_eq!(text, "No attributes found on objects/deals.");
    }

    #[tokio::test]
    async fn unknown_target_is_rejected_without_remote_call() {
        let gateway = FakeGateway::new();
        let err = handle(
            &gateway,
            "list_attributes",
            &args(json!({ "target": "records", "target_id": "companies" })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "'target' must be one of: objects, lists");
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn create_attribute_builds_full_body() {
        let gateway = FakeGateway::new().respond(
            Method::POST,
            "/objects/deals/attributes",
            json!({ "data": { "api_slug": "deal_value", "title": "Deal Value" } }),
        );
        let text = handle(
            &gateway,
            "create_attribute",
            &args(json!({
                "target": "objects",
                "target_id": "deals",
                "title": "Deal Value",
                "type": "currency",
                "default_currency_code": "EUR"
            })),
        )
        .await
        .unwrap();

        assert_eq!(
            text,
            "Created attribute: Deal Value (slug: deal_value, type: currency)"
        );
        assert_eq!(
            gateway.only_call().body,
            Some(json!({
                "data": {
                    "title": "Deal Value",
                    "api_slug": "deal_value",
                    "type": "currency",
                    "description": null,
                    "is_required": false,
                    "is_unique": false,
                    "is_multiselect": false,
                    "config": { "currency": { "default_currency_code": "EUR" } }
                }
            }))
        );
    }

    #[tokio::test]
    async fn create_attribute_forwards_relationship_and_falls_back_to_sent_slug() {
        let gateway = FakeGateway::new().respond(
            Method::POST,
            "/lists/sales/attributes",
            json!({ "data": {} }),
        );
        let text = handle(
            &gateway,
            "create_attribute",
            &args(json!({
                "target": "lists",
                "target_id": "sales",
                "title": "Champion",
                "api_slug": "champion_contact",
                "type": "record-reference",
                "is_multiselect": true,
                "relationship": { "target_object": "people" }
            })),
        )
        .await
        .unwrap();

        assert_eq!(
            text,
            "Created attribute: Champion (slug: champion_contact, type: record-reference)"
        );
        let body = gateway.only_call().body.unwrap();
        assert_eq!(body["data"]["relationship"], json!({ "target_object": "people" }));
        assert_eq!(body["data"]["is_multiselect"], true);
        assert_eq!(body["data"]["config"], json!({}));
    }

    #[tokio::test]
    async fn list_statuses_uses_status_endpoint() {
        let gateway = FakeGateway::new().respond(
            Method::GET,
            "/lists/sales/attributes/stage/statuses",
            json!({ "data": [
                { "id": { "status_id": "st_1" }, "title": "Lead" },
                { "id": { "status_id": "st_2" }, "title": "Old", "is_archived": true }
            ] }),
        );
        let text = handle(
            &gateway,
            "list_select_options",
            &args(json!({
                "target": "lists",
                "target_id": "sales",
                "attribute": "stage",
                "is_status": true
            })),
        )
        .await
        .unwrap();
        assert_eq!(
            text,
            "Statuses for stage (2):\n  Lead (ID: st_1)\n  Old [archived] (ID: st_2)"
        );
    }

    #[tokio::test]
    async fn empty_options_are_reported() {
        let gateway = FakeGateway::new().respond(
            Method::GET,
            "/objects/companies/attributes/tier/options",
            json!({ "data": [] }),
        );
        let text = handle(
            &gateway,
            "list_select_options",
            &args(json!({ "target": "objects", "target_id": "companies", "attribute": "tier" })),
        )
        .await
        .unwrap();
        assert_eq!(text, "No options for tier.");
    }

    #[tokio::test]
    async fn create_option_confirms_with_id() {
        let gateway = FakeGateway::new().respond(
            Method::POST,
            "/objects/companies/attributes/tier/options",
            json!({ "data": { "id": { "option_id": "opt_9" }, "title": "Gold" } }),
        );
        let text = handle(
            &gateway,
            "create_select_option",
            &args(json!({
                "target": "objects",
                "target_id": "companies",
                "attribute": "tier",
                "title": "Gold"
            })),
        )
        .await
        .unwrap();
        assert_eq!(text, "Created option: Gold (ID: opt_9)");
        assert_eq!(
            gateway.only_call().body,
            Some(json!({ "data": { "title": "Gold" } }))
        );
    }
}
