//! Tool System
//!
//! Tools are registered once at startup and invoked by the turn loop.
//! A tool receives the session's state by `&mut`, so every session carries
//! its own copy of whatever a tool mutates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::Message;

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,

    /// Call ID linking the eventual tool result to this request
    #[serde(default)]
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: HashMap<String, serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
            id: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Fetch a string argument
    pub fn str_arg(&self, key: &str) -> Result<&str> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::ToolValidation(format!("'{key}' must be a string")))
    }

    /// Fetch an integer argument
    pub fn int_arg(&self, key: &str) -> Result<i64> {
        self.arguments
            .get(key)
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| AgentError::ToolValidation(format!("'{key}' must be an integer")))
    }
}

/// Structured outcome of a tool execution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Tool ran and the loop should carry on
    Success,
    /// Tool failed; the output describes why
    Failure,
    /// Tool ran and finished the task; the loop halts
    Completed,
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call ID (copied from the request)
    pub id: Option<String>,

    /// Execution outcome
    pub status: ToolStatus,

    /// Output (success message or error)
    pub output: String,
}

impl ToolResult {
    fn with_status(name: impl Into<String>, status: ToolStatus, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            status,
            output: output.into(),
        }
    }

    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self::with_status(name, ToolStatus::Success, output)
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self::with_status(name, ToolStatus::Failure, error)
    }

    /// Successful result that also signals task completion
    pub fn completed(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self::with_status(name, ToolStatus::Completed, output)
    }

    /// Convert into the tool message appended to the conversation
    pub fn into_message(self) -> Message {
        Message::tool(self.output, self.id.unwrap_or_default(), self.status)
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, integer, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

impl ParameterSchema {
    pub fn required(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
        }
    }

    fn accepts(&self, value: &serde_json::Value) -> bool {
        match self.param_type.as_str() {
            "string" => value.is_string(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "object" => value.is_object(),
            "array" => value.is_array(),
            _ => true,
        }
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    /// JSON Schema object describing the parameters
    pub fn parameters_json(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({ "type": p.param_type, "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Tool trait - implement to add new capabilities.
///
/// `S` is the session state the tool may read or mutate.
#[async_trait]
pub trait Tool<S: Send>: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, call: &ToolCall, state: &mut S) -> Result<ToolResult>;

    /// Validate arguments before execution
    fn validate(&self, call: &ToolCall) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            match call.arguments.get(&param.name) {
                None if param.required => {
                    return Err(AgentError::ToolValidation(format!(
                        "Missing required parameter: {}",
                        param.name
                    )));
                }
                Some(value) if !param.accepts(value) => {
                    return Err(AgentError::ToolValidation(format!(
                        "Parameter '{}' must be of type {}",
                        param.name, param.param_type
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Registry for available tools
pub struct ToolRegistry<S: Send> {
    tools: BTreeMap<String, Arc<dyn Tool<S>>>,
}

impl<S: Send> Default for ToolRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Send> ToolRegistry<S> {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a new tool. Names must be non-empty and unique.
    pub fn register<T: Tool<S> + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_shared(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_shared(&mut self, tool: Arc<dyn Tool<S>>) -> Result<()> {
        let name = tool.schema().name;
        if name.trim().is_empty() {
            return Err(AgentError::Config("tool name must not be empty".into()));
        }
        if self.tools.contains_key(&name) {
            return Err(AgentError::Config(format!("duplicate tool name: {name}")));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool<S>>> {
        self.tools.get(name).cloned()
    }

    /// Execute a tool call and wrap the outcome as a tool message.
    ///
    /// Only an unknown tool name is an error. Validation and execution
    /// failures come back as a message with [`ToolStatus::Failure`].
    pub async fn invoke(&self, call: &ToolCall, state: &mut S) -> Result<Message> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        tracing::debug!(tool = %call.name, id = ?call.id, "Executing tool");

        let outcome = match tool.validate(call) {
            Ok(()) => tool.execute(call, state).await,
            Err(e) => Err(e),
        };

        let mut result = outcome.unwrap_or_else(|e| {
            tracing::warn!(tool = %call.name, error = %e, "Tool failed");
            ToolResult::failure(call.name.clone(), format!("Error: {e}"))
        });
        result.id.clone_from(&call.id);
        tracing::debug!(tool = %result.name, status = ?result.status, "Tool finished");

        Ok(result.into_message())
    }

    /// Get all tool schemas, ordered by name
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Render a system prompt section describing tools, for providers without
/// native function calling.
pub fn prompt_section(schemas: &[ToolSchema]) -> String {
    let mut prompt = String::from("## Available Tools\n\n");
    prompt.push_str("You can use the following tools by responding with one JSON block per call:\n\n");
    prompt.push_str("```tool\n{\"tool\": \"tool_name\", \"arguments\": {\"arg\": \"value\"}}\n```\n\n");

    for schema in schemas {
        prompt.push_str(&format!("### {}\n", schema.name));
        prompt.push_str(&format!("{}\n", schema.description));

        if !schema.parameters.is_empty() {
            prompt.push_str("**Parameters:**\n");
            for param in &schema.parameters {
                let required = if param.required { " (required)" } else { "" };
                prompt.push_str(&format!(
                    "- `{}` ({}){}: {}\n",
                    param.name, param.param_type, required, param.description
                ));
            }
        }
        prompt.push('\n');
    }

    prompt
}
