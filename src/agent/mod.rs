//! The DataGen agent.
//!
//! [`AgentRuntime`] is the single seam the WebSocket layer talks to:
//! given the history and a new user message, produce the next assistant
//! message.  [`DataGenAgent`] implements it with a bounded tool-calling
//! loop over a [`ModelProvider`] and a [`ToolRegistry`].

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::models::{ChatMessage, FunctionCallItem, ModelProvider, ProviderResponse, TokenUsage};
use crate::session::Turn;
use crate::tools::ToolRegistry;

/// Fixed instructions sent as the first message of every request.
pub const SYSTEM_PROMPT: &str = "You are DataGen, a helpful assistant that generates sample data for applications. \
To generate users, you need: first_names (list), last_names (list), domains (list), min_age, max_age. \
Fill in these values yourself without asking for them. \
When asked to save users, first generate them with the tool, then immediately use write_json with the result. \
If the user refers to 'those users' from a previous request, ask them to specify the details again.";

/// Default cap on model calls per reply.
pub const DEFAULT_MAX_STEPS: usize = 25;

/// Produces assistant replies.  Implementations must either return the
/// complete reply or a single error; nothing is partially applied.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn generate_reply(&self, history: &[Turn], user_text: &str) -> anyhow::Result<String>;
}

/// Tool-calling agent backed by an OpenAI-compatible model.
pub struct DataGenAgent {
    provider: Arc<dyn ModelProvider>,
    tools: ToolRegistry,
    system_prompt: String,
    /// Maximum model calls for one reply, tool rounds included.
    max_steps: usize,
}

impl DataGenAgent {
    pub fn new(provider: Arc<dyn ModelProvider>, tools: ToolRegistry) -> Self {
        Self {
            provider,
            tools,
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Override the step budget (clamped to at least one model call).
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    fn build_messages(&self, history: &[Turn], user_text: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::new("system", self.system_prompt.as_str()));
        messages.extend(history.iter().map(|t| ChatMessage::new(t.role(), t.text())));
        messages.push(ChatMessage::new("user", user_text));
        messages
    }

    /// Run one tool call.  Failures are turned into an `{"error": …}`
    /// payload for the model instead of aborting the reply.
    async fn run_tool(&self, call: &FunctionCallItem) -> String {
        let args: serde_json::Value = match serde_json::from_str(&call.arguments) {
            Ok(v) => v,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool arguments are not valid JSON");
                return serde_json::json!({ "error": format!("invalid JSON arguments: {e}") })
                    .to_string();
            }
        };

        let timer = std::time::Instant::now();
        let result = self.tools.call(&call.name, args).await;
        let elapsed_ms = timer.elapsed().as_millis() as u64;

        match result {
            Ok(serde_json::Value::String(s)) => {
                debug!(tool = %call.name, elapsed_ms, "tool call finished");
                s
            }
            Ok(v) => {
                debug!(tool = %call.name, elapsed_ms, "tool call finished");
                v.to_string()
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call failed, feeding error back");
                serde_json::json!({ "error": format!("{e:#}") }).to_string()
            }
        }
    }
}

#[async_trait]
impl AgentRuntime for DataGenAgent {
    async fn generate_reply(&self, history: &[Turn], user_text: &str) -> anyhow::Result<String> {
        let mut messages = self.build_messages(history, user_text);
        let function_defs = self.tools.function_defs();
        let mut tokens = TokenUsage::default();

        for step in 1..=self.max_steps {
            let (response, usage) = self
                .provider
                .send_chat_with_functions(&messages, &function_defs)
                .await
                .context("model call failed")?;

            if let Some(u) = usage {
                tokens.prompt_tokens += u.prompt_tokens;
                tokens.completion_tokens += u.completion_tokens;
                tokens.total_tokens += u.total_tokens;
            }

            match response {
                ProviderResponse::Final(text) => {
                    info!(
                        steps = step,
                        total_tokens = tokens.total_tokens,
                        "agent reply ready"
                    );
                    return Ok(text);
                }
                ProviderResponse::ToolCalls(calls) => {
                    debug!(
                        step,
                        tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                        "model requested tool calls"
                    );
                    messages.push(ChatMessage::assistant_tool_calls(&calls));
                    // Tools run in order; write_json often depends on the
                    // output of an earlier generate call in the same batch.
                    for call in &calls {
                        let output = self.run_tool(call).await;
                        messages.push(ChatMessage::tool_result(call.id.clone(), output));
                    }
                }
            }
        }

        anyhow::bail!(
            "agent exceeded step budget of {} model calls without a final reply",
            self.max_steps
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays canned responses and records every request.
    struct Scripted {
        responses: Mutex<Vec<ProviderResponse>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<ProviderResponse>) -> Arc<Self> {
            responses.reverse();
            Arc::new(Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ModelProvider for Scripted {
        async fn send_chat_with_functions(
            &self,
            messages: &[ChatMessage],
            _functions: &[serde_json::Value],
        ) -> Result<(ProviderResponse, Option<TokenUsage>), anyhow::Error> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let next = self.responses.lock().unwrap().pop();
            next.map(|r| (r, None))
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }
    }

    fn call(id: &str, name: &str, args: serde_json::Value) -> FunctionCallItem {
        FunctionCallItem {
            id: id.into(),
            name: name.into(),
            arguments: args.to_string(),
        }
    }

    #[tokio::test]
    async fn history_is_sent_between_system_and_user() {
        let provider = Scripted::new(vec![ProviderResponse::Final("hello".into())]);
        let agent = DataGenAgent::new(provider.clone(), ToolRegistry::with_builtins("."));

        let history = vec![Turn::User("earlier".into()), Turn::Assistant("noted".into())];
        let reply = agent.generate_reply(&history, "hi").await.unwrap();
        assert_eq!(reply, "hello");

        let seen = provider.seen.lock().unwrap();
        let roles: Vec<&str> = seen[0].iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(seen[0][0].content, SYSTEM_PROMPT);
        assert_eq!(seen[0][3].content, "hi");
    }

    #[tokio::test]
    async fn tool_results_are_fed_back() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Scripted::new(vec![
            ProviderResponse::ToolCalls(vec![
                call("c1", "write_json", serde_json::json!({"filepath": "u.json", "data": {"a": 1}})),
                call("c2", "read_json", serde_json::json!({"filepath": "u.json"})),
            ]),
            ProviderResponse::Final("saved".into()),
        ]);
        let agent = DataGenAgent::new(provider.clone(), ToolRegistry::with_builtins(dir.path()));

        let reply = agent.generate_reply(&[], "save it").await.unwrap();
        assert_eq!(reply, "saved");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let second = &seen[1];
        // system, user, assistant(tool_calls), tool, tool
        assert_eq!(second.len(), 5);
        assert!(second[2].tool_calls.is_some());
        assert_eq!(second[3].tool_call_id.as_deref(), Some("c1"));
        assert!(second[3].content.starts_with("Successfully wrote JSON data"));
        assert_eq!(second[4].tool_call_id.as_deref(), Some("c2"));
        assert_eq!(second[4].content, "{\n  \"a\": 1\n}");
    }

    #[tokio::test]
    async fn tool_failures_become_error_payloads() {
        let provider = Scripted::new(vec![
            ProviderResponse::ToolCalls(vec![
                FunctionCallItem {
                    id: "c1".into(),
                    name: "read_json".into(),
                    arguments: "{not json".into(),
                },
                call("c2", "drop_tables", serde_json::json!({})),
            ]),
            ProviderResponse::Final("sorry".into()),
        ]);
        let agent = DataGenAgent::new(provider.clone(), ToolRegistry::with_builtins("."));

        assert_eq!(agent.generate_reply(&[], "x").await.unwrap(), "sorry");
        let seen = provider.seen.lock().unwrap();
        let bad_args: serde_json::Value = serde_json::from_str(&seen[1][3].content).unwrap();
        assert!(bad_args["error"].as_str().unwrap().contains("invalid JSON"));
        let unknown: serde_json::Value = serde_json::from_str(&seen[1][4].content).unwrap();
        assert!(unknown["error"].as_str().unwrap().contains("unknown tool"));
    }

    #[tokio::test]
    async fn step_budget_is_enforced() {
        let looping: Vec<ProviderResponse> = (0..5)
            .map(|i| {
                ProviderResponse::ToolCalls(vec![call(
                    &format!("c{i}"),
                    "read_json",
                    serde_json::json!({"filepath": "missing.json"}),
                )])
            })
            .collect();
        let provider = Scripted::new(looping);
        let agent =
            DataGenAgent::new(provider.clone(), ToolRegistry::with_builtins(".")).with_max_steps(3);

        let err = agent.generate_reply(&[], "loop").await.unwrap_err();
        assert!(err.to_string().contains("step budget of 3"));
        assert_eq!(provider.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn provider_errors_propagate() {
        let provider = Scripted::new(vec![]);
        let agent = DataGenAgent::new(provider, ToolRegistry::with_builtins("."));
        let err = agent.generate_reply(&[], "hi").await.unwrap_err();
        assert!(format!("{err:#}").contains("script exhausted"));
    }
}
