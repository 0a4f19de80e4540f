//! Text Tool Protocol
//!
//! For models without native function calling. Tools are described in the
//! system prompt and the model requests them with fenced blocks:
//!
//! ````text
//! ```tool
//! {"tool": "add", "arguments": {"a": 40, "b": 6}}
//! ```
//! ````

use std::collections::HashMap;

use serde::Deserialize;
use turnloop_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    tool::{ToolCall, ToolStatus},
};

const TOOL_START: &str = "```tool";
const TOOL_END: &str = "```";

#[derive(Deserialize)]
struct TextToolCall {
    #[serde(alias = "name")]
    tool: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

impl TextToolCall {
    fn into_call(self) -> Result<ToolCall> {
        let arguments: HashMap<String, serde_json::Value> = match self.arguments {
            serde_json::Value::Null => HashMap::new(),
            serde_json::Value::Object(map) => map.into_iter().collect(),
            other => {
                return Err(AgentError::MalformedToolCall(format!(
                    "arguments for '{}' must be an object, got {other}",
                    self.tool
                )));
            }
        };
        Ok(ToolCall::new(self.tool, arguments))
    }
}

/// Split a model reply into its prose and the tool calls it requests.
///
/// Fenced blocks that do not decode are an error. Without fenced blocks a
/// bare JSON object carrying a `"tool"` key is accepted; anything else is
/// plain prose.
pub fn parse_reply(content: &str) -> Result<(String, Vec<ToolCall>)> {
    let mut prose = String::new();
    let mut calls = Vec::new();
    let mut rest = content;

    while let Some(start) = rest.find(TOOL_START) {
        prose.push_str(&rest[..start]);
        let after_marker = &rest[start + TOOL_START.len()..];
        let end = after_marker.find(TOOL_END).ok_or_else(|| {
            AgentError::MalformedToolCall("unterminated ```tool block".into())
        })?;

        let json_str = after_marker[..end].trim();
        let parsed: TextToolCall = serde_json::from_str(json_str)
            .map_err(|e| AgentError::MalformedToolCall(format!("{e}: {json_str}")))?;
        calls.push(parsed.into_call()?);

        rest = &after_marker[end + TOOL_END.len()..];
    }
    prose.push_str(rest);

    if calls.is_empty() {
        if let Some(call) = parse_inline(content) {
            return Ok((String::new(), vec![call]));
        }
    }

    Ok((prose.trim().to_string(), calls))
}

/// Try to parse a bare JSON tool call
fn parse_inline(content: &str) -> Option<ToolCall> {
    if !content.contains(r#""tool""#) {
        return None;
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }

    serde_json::from_str::<TextToolCall>(&content[start..=end])
        .ok()
        .and_then(|c| c.into_call().ok())
}

/// Render an assistant's tool calls back into fenced blocks
pub fn render_calls(calls: &[ToolCall]) -> String {
    calls
        .iter()
        .map(|call| {
            let body = serde_json::json!({ "tool": call.name, "arguments": call.arguments });
            format!("{TOOL_START}\n{body}\n{TOOL_END}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text a model without native tool support sees for a message
pub fn render_message(message: &Message) -> String {
    match message.role {
        Role::Assistant if message.has_tool_calls() => {
            let calls = render_calls(&message.tool_calls);
            if message.content.is_empty() {
                calls
            } else {
                format!("{}\n{calls}", message.content)
            }
        }
        Role::Tool => {
            let id = message.tool_call_id.as_deref().unwrap_or("?");
            let verdict = if message.status == Some(ToolStatus::Failure) { "failed" } else { "returned" };
            format!("[Tool call {id} {verdict}]\n{}", message.content)
        }
        _ => message.content.clone(),
    }
}
