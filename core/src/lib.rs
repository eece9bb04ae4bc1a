//! Pure translation logic for the Attio MCP server: decoding Attio's field
//! values, rendering entities as text, and shaping write payloads.

pub mod error;
pub mod format;
pub mod normalize;
pub mod values;

pub use error::ToolError;
