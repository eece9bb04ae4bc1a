use thiserror::Error;

/// Error codes used across the tool surface
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const REMOTE_ERROR: &str = "remote_error";
    pub const UNEXPECTED_ERROR: &str = "unexpected_error";
}

/// Failure of a single tool invocation.
///
/// Every variant is terminal for the invocation: nothing is retried, and the
/// dispatcher renders the `Display` text behind an `Error: ` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// Missing or mistyped argument, unknown tool or operation. Raised before
    /// any remote call is issued.
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },
    /// Non-2xx response from the Attio API.
    #[error("Attio API error ({status}): {message}")]
    Remote { status: u16, message: String },
    /// Anything else: transport failure, undecodable body.
    #[error("{0}")]
    Unexpected(String),
}

impl ToolError {
    pub fn validation(message: impl Into<String>) -> Self {
        ToolError::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ToolError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    pub fn missing(field: &str) -> Self {
        Self::invalid_field(field, format!("Missing required argument '{field}'"))
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::validation(format!("Unknown tool: {name}"))
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        ToolError::Unexpected(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            ToolError::Validation { .. } => codes::VALIDATION_FAILED,
            ToolError::Remote { .. } => codes::REMOTE_ERROR,
            ToolError::Unexpected(_) => codes::UNEXPECTED_ERROR,
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            ToolError::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}
