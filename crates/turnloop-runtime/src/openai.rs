//! OpenAI-compatible Provider
//!
//! Chat Completions over HTTP with native function calling. Works with the
//! hosted API and with compatible local servers.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use turnloop_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Completion, CompletionRequest, FinishReason, LlmProvider, ModelInfo, ProviderInfo,
        TokenUsage,
    },
    tool::{ToolCall, ToolSchema},
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API base, without the trailing `/chat/completions`
    pub base_url: String,

    pub api_key: String,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            timeout_secs: 120,
        }
    }

    /// Read `OPENAI_API_KEY` and optional `OPENAI_BASE_URL`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AgentError::Config("OPENAI_API_KEY is not set".into()))?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        Ok(config)
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// Raw JSON string
    #[serde(default)]
    arguments: String,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: WireFunction<'a>,
}

#[derive(Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

fn function_type() -> String {
    "function".into()
}

fn to_wire(message: &Message) -> WireMessage {
    let tool_calls = message.has_tool_calls().then(|| {
        message
            .tool_calls
            .iter()
            .map(|call| WireToolCall {
                id: call.id.clone().unwrap_or_default(),
                call_type: function_type(),
                function: WireFunctionCall {
                    name: call.name.clone(),
                    arguments: serde_json::to_string(&call.arguments)
                        .unwrap_or_else(|_| "{}".into()),
                },
            })
            .collect()
    });

    WireMessage {
        role: message.role.to_string(),
        content: Some(message.content.clone()),
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
    }
}

fn wire_tool(schema: &ToolSchema) -> WireTool<'_> {
    WireTool {
        tool_type: "function",
        function: WireFunction {
            name: &schema.name,
            description: &schema.description,
            parameters: schema.parameters_json(),
        },
    }
}

fn from_wire_call(call: WireToolCall) -> Result<ToolCall> {
    let raw = call.function.arguments.trim();
    let arguments: HashMap<String, serde_json::Value> = if raw.is_empty() {
        HashMap::new()
    } else {
        serde_json::from_str(raw).map_err(|e| {
            AgentError::MalformedToolCall(format!(
                "arguments for '{}' are not a JSON object: {e}",
                call.function.name
            ))
        })?
    };
    Ok(ToolCall::new(call.function.name, arguments).with_id(call.id))
}

fn finish_reason(raw: Option<&str>) -> Option<FinishReason> {
    match raw? {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "tool_calls" | "function_call" => Some(FinishReason::ToolUse),
        "content_filter" => Some(FinishReason::ContentFilter),
        _ => Some(FinishReason::Error),
    }
}

fn map_http_error(err: &reqwest::Error) -> AgentError {
    if err.is_connect() || err.is_timeout() {
        AgentError::ProviderUnavailable(err.to_string())
    } else {
        AgentError::Provider(err.to_string())
    }
}

// ============================================================================
// Provider
// ============================================================================

/// OpenAI-compatible LLM provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn from_config(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(OpenAiConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url)
    }

    fn build_request<'a>(request: &CompletionRequest<'a>) -> ChatRequest<'a> {
        let mut messages = vec![WireMessage {
            role: Role::System.to_string(),
            content: Some(request.system_prompt.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }];
        messages.extend(request.messages.iter().map(to_wire));

        ChatRequest {
            model: &request.options.model,
            messages,
            tools: request.tools.iter().map(wire_tool).collect(),
            temperature: request.options.temperature,
            top_p: request.options.top_p,
            max_tokens: request.options.max_tokens,
            stop: (!request.options.stop_sequences.is_empty())
                .then_some(request.options.stop_sequences.as_slice()),
        }
    }

    fn parse_response(response: ChatResponse) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("response contained no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(from_wire_call)
            .collect::<Result<Vec<_>>>()?;

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            model: response.model,
            usage: response.usage,
            finish_reason: finish_reason(choice.finish_reason.as_deref()),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        let models = self.list_models().await.unwrap_or_default();

        Ok(ProviderInfo {
            name: "OpenAI".into(),
            models,
            supports_tools: true,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        let body = Self::build_request(request);

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_http_error(&e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(AgentError::ProviderUnavailable(format!("HTTP {status}")));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::Provider(format!("HTTP {status}: {detail}")));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| map_http_error(&e))?;
        Self::parse_response(parsed)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let list: ModelList = self
            .client
            .get(self.url("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        Ok(list
            .data
            .into_iter()
            .map(|m| ModelInfo {
                name: m.id.clone(),
                id: m.id,
                context_length: None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turnloop_core::{GenerationOptions, ParameterSchema, ToolStatus};

    fn response(message: serde_json::Value) -> ChatResponse {
        serde_json::from_value(json!({
            "model": "gpt-4o",
            "choices": [{ "message": message, "finish_reason": "tool_calls" }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        }))
        .unwrap()
    }

    #[test]
    fn test_request_body() {
        let mut args = HashMap::new();
        args.insert("a".to_string(), json!(40));
        let mut messages = vec![
            Message::user("add 40 and 6"),
            Message::assistant("").with_tool_calls(vec![ToolCall::new("add", args).with_id("c1")]),
        ];
        messages.push(Message::tool("46", "c1", ToolStatus::Success));
        let tools = vec![ToolSchema {
            name: "add".into(),
            description: "Add two integers".into(),
            parameters: vec![ParameterSchema::required("a", "integer", "First")],
        }];
        let options = GenerationOptions { model: "gpt-4o".into(), ..Default::default() };
        let request = CompletionRequest {
            system_prompt: "Be precise.",
            messages: &messages,
            tools: &tools,
            options: &options,
        };

        let body = serde_json::to_value(OpenAiProvider::build_request(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][2]["tool_calls"][0]["function"]["name"], "add");
        assert_eq!(body["messages"][2]["tool_calls"][0]["function"]["arguments"], r#"{"a":40}"#);
        assert_eq!(body["messages"][3]["role"], "tool");
        assert_eq!(body["messages"][3]["tool_call_id"], "c1");
        assert_eq!(body["tools"][0]["function"]["parameters"]["required"], json!(["a"]));
        assert!(body.get("stop").is_none());
    }

    #[test]
    fn test_parse_tool_calls() {
        let parsed = OpenAiProvider::parse_response(response(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": { "name": "add", "arguments": "{\"a\": 40, \"b\": 6}" }
            }]
        })))
        .unwrap();

        assert_eq!(parsed.content, "");
        assert_eq!(parsed.tool_calls[0].id.as_deref(), Some("call_1"));
        assert_eq!(parsed.tool_calls[0].arguments["b"], json!(6));
        assert_eq!(parsed.finish_reason, Some(FinishReason::ToolUse));
        assert_eq!(parsed.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_malformed_arguments_rejected() {
        let err = OpenAiProvider::parse_response(response(json!({
            "role": "assistant",
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": { "name": "add", "arguments": "[40, 6]" }
            }]
        })))
        .unwrap_err();

        assert!(matches!(err, AgentError::MalformedToolCall(_)));
    }

    #[test]
    fn test_no_choices() {
        let empty: ChatResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(OpenAiProvider::parse_response(empty).is_err());
    }
}
