//! Model provider abstractions.
//!
//! Defines the [`ModelProvider`] trait, the [`ChatMessage`] type, the
//! tool-calling aware [`ProviderResponse`], and the concrete
//! [`OpenAIProvider`] for OpenAI-compatible chat completion APIs.

pub mod openai;

use async_trait::async_trait;

pub use openai::OpenAIProvider;

// ---------------------------------------------------------------------------
// ChatMessage – shared message representation
// ---------------------------------------------------------------------------

/// A single chat message with a role and content.
///
/// Optionally carries OpenAI tool-calling metadata so that
/// `tool` role messages and assistant `tool_calls` responses
/// are serialised correctly for the API.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    /// For assistant messages that invoke tools: the raw
    /// OpenAI-format `tool_calls` array.
    pub tool_calls: Option<Vec<serde_json::Value>>,
    /// For `role: "tool"` messages: the id of the tool call
    /// this result corresponds to.
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Convenience constructor for a plain message (no tool metadata).
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Assistant message announcing the given tool calls.
    pub fn assistant_tool_calls(calls: &[FunctionCallItem]) -> Self {
        let tool_calls = calls
            .iter()
            .map(|c| {
                serde_json::json!({
                    "id": c.id,
                    "type": "function",
                    "function": { "name": c.name, "arguments": c.arguments },
                })
            })
            .collect();
        Self {
            role: "assistant".into(),
            content: String::new(),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// `tool` role message carrying the result of call `id`.
    pub fn tool_result(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".into(),
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(id.into()),
        }
    }
}

/// Serialise a slice of [`ChatMessage`]s into the OpenAI-compatible
/// JSON array format, including `tool_calls` and `tool_call_id` when
/// present.
pub fn serialize_messages(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|m| {
            let mut msg = serde_json::json!({ "role": m.role });
            if let Some(ref tcs) = m.tool_calls {
                msg["tool_calls"] = serde_json::json!(tcs);
                // OpenAI expects content to be null on assistant
                // messages that only carry tool_calls.
                if m.content.is_empty() {
                    msg["content"] = serde_json::Value::Null;
                } else {
                    msg["content"] = serde_json::json!(m.content);
                }
            } else {
                msg["content"] = serde_json::json!(m.content);
            }
            if let Some(ref tcid) = m.tool_call_id {
                msg["tool_call_id"] = serde_json::json!(tcid);
            }
            msg
        })
        .collect()
}

// ---------------------------------------------------------------------------
// ProviderResponse – function-calling aware response
// ---------------------------------------------------------------------------

/// Token usage statistics returned by the API.
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// A single function call requested by the model.
#[derive(Debug, Clone)]
pub struct FunctionCallItem {
    /// Tool call id (from the API).
    pub id: String,
    pub name: String,
    /// Raw JSON-encoded arguments string.
    pub arguments: String,
}

/// Response from a model that is either a final text reply or a batch
/// of tool calls to execute before asking again.
#[derive(Debug, Clone)]
pub enum ProviderResponse {
    /// Plain text reply from the model.
    Final(String),
    /// The model wants to invoke one or more tools.
    ToolCalls(Vec<FunctionCallItem>),
}

// ---------------------------------------------------------------------------
// ModelProvider trait
// ---------------------------------------------------------------------------

/// Trait implemented by every LLM backend.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send chat messages together with OpenAI-style tool definitions.
    ///
    /// Returns [`ProviderResponse::ToolCalls`] when the model wants to
    /// invoke tools, or [`ProviderResponse::Final`] for a normal reply.
    async fn send_chat_with_functions(
        &self,
        messages: &[ChatMessage],
        functions: &[serde_json::Value],
    ) -> Result<(ProviderResponse, Option<TokenUsage>), anyhow::Error>;
}

/// Extract token usage statistics from an OpenAI response JSON.
pub fn parse_token_usage(json: &serde_json::Value) -> Option<TokenUsage> {
    let usage = json.get("usage")?;
    Some(TokenUsage {
        prompt_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0),
        completion_tokens: usage["completion_tokens"].as_u64().unwrap_or(0),
        total_tokens: usage["total_tokens"].as_u64().unwrap_or(0),
    })
}

/// Parse `tool_calls` from an OpenAI-style chat completion response.
///
/// Returns `Some(ProviderResponse::ToolCalls)` if the response contains
/// at least one tool call.  Falls back to the legacy `function_call`
/// field.  Calls without an id get a generated one so tool results can
/// still be paired with them.
pub fn parse_tool_calls(json: &serde_json::Value) -> Option<ProviderResponse> {
    let message = json.get("choices")?.get(0)?.get("message")?;

    if let Some(tool_calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
        let items: Vec<FunctionCallItem> = tool_calls
            .iter()
            .filter_map(|tc| {
                let func = tc.get("function")?;
                let name = func.get("name")?.as_str()?.to_string();
                let arguments = func
                    .get("arguments")
                    .and_then(|a| a.as_str())
                    .unwrap_or("{}")
                    .to_string();
                let id = tc
                    .get("id")
                    .and_then(|i| i.as_str())
                    .filter(|i| !i.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(generated_call_id);
                Some(FunctionCallItem { id, name, arguments })
            })
            .collect();

        if !items.is_empty() {
            return Some(ProviderResponse::ToolCalls(items));
        }
    }

    // Legacy `function_call` field.
    if let Some(fc) = message.get("function_call").and_then(|v| v.as_object()) {
        let name = fc
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let arguments = fc
            .get("arguments")
            .and_then(|v| v.as_str())
            .unwrap_or("{}")
            .to_string();
        return Some(ProviderResponse::ToolCalls(vec![FunctionCallItem {
            id: generated_call_id(),
            name,
            arguments,
        }]));
    }

    None
}

fn generated_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}
