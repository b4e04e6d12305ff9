//! Completion provider interface and the Anthropic HTTP implementation
//!
//! The pipeline only sees `CompletionProvider`; tests substitute mocks and
//! the generation step stays independent of any one vendor.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{PipelineError, ProviderErrorKind};

/// Default model for CV generation
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Request timeout. Generation calls are long-running (seconds) and block
/// the session until they complete or fail.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// A role-tagged message ("system" or "user")
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// A single completion request: model, ordered messages, and an optional
/// output-schema constraint. Providers that cannot enforce the schema may
/// ignore it; the caller validates the response regardless.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    /// JSON Schema the reply must conform to. The Anthropic client sends
    /// it as a forced tool so the API constrains its own output.
    pub output_schema: Option<serde_json::Value>,
    pub max_tokens: u32,
}

/// External completion provider. Blocking: one request per session at a
/// time, no partial results.
pub trait CompletionProvider {
    fn complete(&self, request: &CompletionRequest) -> Result<String, PipelineError>;
}

/// Tool name under which the output schema is registered
const RECORD_TOOL: &str = "emit_record";

/// Anthropic API request format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<AnthropicToolChoice>,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct AnthropicToolChoice {
    #[serde(rename = "type")]
    choice_type: String,
    name: String,
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

/// One content block. Text blocks carry `text`, tool_use blocks carry the
/// structured `input`; either satisfies a completion.
#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    input: Option<serde_json::Value>,
}

/// Split system messages into Anthropic's dedicated `system` slot; all
/// other roles go through as the message list. An output schema becomes a
/// single forced tool, so the reply arrives as that tool's input.
fn to_api_request(request: &CompletionRequest) -> AnthropicRequest {
    let system: Vec<&str> = request
        .messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect();
    let messages: Vec<Message> = request
        .messages
        .iter()
        .filter(|m| m.role != "system")
        .cloned()
        .collect();

    let tools = request.output_schema.clone().map(|schema| {
        vec![AnthropicTool {
            name: RECORD_TOOL.to_string(),
            description: "Emit the structured record".to_string(),
            input_schema: schema,
        }]
    });
    let tool_choice = tools.as_ref().map(|_| AnthropicToolChoice {
        choice_type: "tool".to_string(),
        name: RECORD_TOOL.to_string(),
    });

    AnthropicRequest {
        model: request.model.clone(),
        max_tokens: request.max_tokens,
        system: if system.is_empty() { None } else { Some(system.join("\n\n")) },
        messages,
        tools,
        tool_choice,
    }
}

/// Anthropic Messages API client
pub struct AnthropicClient {
    api_key: String,
    http: reqwest::blocking::Client,
}

impl AnthropicClient {
    pub fn new(api_key: String) -> Result<Self, PipelineError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                PipelineError::provider(
                    ProviderErrorKind::Transport,
                    format!("failed to build HTTP client: {}", e),
                )
            })?;
        Ok(Self { api_key, http })
    }
}

impl CompletionProvider for AnthropicClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, PipelineError> {
        let api_request = to_api_request(request);

        let response = self
            .http
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .map_err(|e| {
                let kind = if e.is_timeout() {
                    ProviderErrorKind::Timeout
                } else {
                    ProviderErrorKind::Transport
                };
                PipelineError::provider(kind, format!("HTTP request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let kind = match status.as_u16() {
                401 | 403 => ProviderErrorKind::Auth,
                429 => ProviderErrorKind::RateLimit,
                _ => ProviderErrorKind::Transport,
            };
            return Err(PipelineError::provider(kind, format!("API error {}: {}", status, body)));
        }

        let api_response: AnthropicResponse = response.json().map_err(|e| {
            PipelineError::provider(
                ProviderErrorKind::MalformedResponse,
                format!("failed to parse response: {}", e),
            )
        })?;

        // A forced tool replies with structured input; otherwise fall back
        // to the first text block.
        if let Some(input) = api_response.content.iter().find_map(|c| c.input.as_ref()) {
            return serde_json::to_string(input).map_err(|e| {
                PipelineError::provider(
                    ProviderErrorKind::MalformedResponse,
                    format!("tool input was not serializable JSON: {}", e),
                )
            });
        }
        api_response
            .content
            .iter()
            .find_map(|c| c.text.clone())
            .ok_or_else(|| {
                PipelineError::provider(
                    ProviderErrorKind::MalformedResponse,
                    "response contained no content blocks",
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_messages_split_into_system_slot() {
        let request = CompletionRequest {
            model: DEFAULT_MODEL.to_string(),
            messages: vec![
                Message::system("You are a CV writer."),
                Message::user("Resume: ..."),
            ],
            output_schema: None,
            max_tokens: 4096,
        };
        let api = to_api_request(&request);
        assert_eq!(api.system.as_deref(), Some("You are a CV writer."));
        assert_eq!(api.messages.len(), 1);
        assert_eq!(api.messages[0].role, "user");
    }

    #[test]
    fn test_no_system_slot_when_absent() {
        let request = CompletionRequest {
            model: DEFAULT_MODEL.to_string(),
            messages: vec![Message::user("hello")],
            output_schema: None,
            max_tokens: 64,
        };
        let api = to_api_request(&request);
        assert!(api.system.is_none());
        assert_eq!(api.messages.len(), 1);
        assert!(api.tools.is_none());
        assert!(api.tool_choice.is_none());
    }

    #[test]
    fn test_output_schema_becomes_forced_tool() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"]
        });
        let request = CompletionRequest {
            model: DEFAULT_MODEL.to_string(),
            messages: vec![Message::user("Resume: ...")],
            output_schema: Some(schema.clone()),
            max_tokens: 4096,
        };
        let api = to_api_request(&request);

        let tools = api.tools.as_ref().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, RECORD_TOOL);
        assert_eq!(tools[0].input_schema, schema);

        let choice = api.tool_choice.as_ref().unwrap();
        assert_eq!(choice.choice_type, "tool");
        assert_eq!(choice.name, RECORD_TOOL);
    }

    #[test]
    fn test_tool_input_block_wins_over_text() {
        let raw = r#"{"content": [
            {"type": "text", "text": "emitting record"},
            {"type": "tool_use", "id": "t1", "name": "emit_record",
             "input": {"name": "Alice Example"}}
        ]}"#;
        let parsed: AnthropicResponse = serde_json::from_str(raw).unwrap();
        let input = parsed.content.iter().find_map(|c| c.input.as_ref()).unwrap();
        assert_eq!(input["name"], "Alice Example");
    }
}
