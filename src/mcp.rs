use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One item of tool output. Only text content is produced by the current
/// tools; the wire shape matches the MCP `TextContent` block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".into(),
            text: text.into(),
        }
    }
}

/// Wrap tool output into the result envelope for tools/call.
pub fn tool_result(items: Vec<ContentItem>) -> Value {
    serde_json::json!({ "content": items })
}
