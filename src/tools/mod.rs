//! Tool runner for the DataGen agent.
//!
//! A [`ToolRegistry`] tracks every tool's name, description and
//! JSON-Schema for its arguments together with an async handler.  The
//! agent turns the registry into OpenAI function definitions and
//! dispatches the model's tool calls back through [`ToolRegistry::call`].
//!
//! Tools report their own failures (missing file, bad JSON, invalid
//! generation parameters) as ordinary return values so the model can
//! react to them.  An `Err` from a handler means the call itself was
//! malformed, e.g. a required argument is missing.

pub mod ascii_json;
pub mod builtins;

use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

pub use builtins::generate_users::{generate_sample_users, GenerateParams, SampleUser};
pub use builtins::read_json::read_json;
pub use builtins::write_json::write_json;

/// Metadata describing a tool available to the agent.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolMeta {
    /// Short machine-friendly name (e.g. `"read_json"`).
    pub name: String,
    /// Human-readable one-liner describing what the tool does.
    pub description: String,
    /// JSON Schema object describing the expected `args` value.
    pub args_schema: Value,
}

/// Async handler: `(args, data_dir) -> result`.
pub type ToolHandler = Arc<
    dyn Fn(Value, PathBuf) -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>
        + Send
        + Sync,
>;

struct ToolEntry {
    meta: ToolMeta,
    handler: ToolHandler,
}

/// The set of tools bound to one agent.
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
    /// Base directory for relative file paths.
    data_dir: PathBuf,
}

impl ToolRegistry {
    /// Empty registry resolving relative paths against `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            entries: Vec::new(),
            data_dir: data_dir.into(),
        }
    }

    /// Registry with the three DataGen tools registered.
    pub fn with_builtins(data_dir: impl Into<PathBuf>) -> Self {
        let mut reg = Self::new(data_dir);
        builtins::register_all(&mut reg);
        debug!(tools = ?reg.names(), "tool registry ready");
        reg
    }

    /// Register a tool.  Duplicate names are ignored (first registration wins).
    pub fn register(&mut self, meta: ToolMeta, handler: ToolHandler) {
        if self.entries.iter().any(|e| e.meta.name == meta.name) {
            return;
        }
        self.entries.push(ToolEntry { meta, handler });
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.meta.name.as_str()).collect()
    }

    /// OpenAI `tools` array for every registered tool.
    pub fn function_defs(&self) -> Vec<Value> {
        self.entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": e.meta.name,
                        "description": e.meta.description,
                        "parameters": e.meta.args_schema,
                    }
                })
            })
            .collect()
    }

    /// Call a tool by name.
    pub async fn call(&self, name: &str, args: Value) -> anyhow::Result<Value> {
        let handler = self
            .entries
            .iter()
            .find(|e| e.meta.name == name)
            .map(|e| e.handler.clone())
            .ok_or_else(|| anyhow::anyhow!("unknown tool: {name}"))?;
        handler(args, self.data_dir.clone()).await
    }
}

/// Resolve a tool-supplied path: absolute paths are used as given,
/// relative ones are joined onto `data_dir`.
pub(crate) fn resolve_path(data_dir: &Path, raw: &str) -> PathBuf {
    let p = Path::new(raw);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        data_dir.join(p)
    }
}

/// Fetch a required string argument.
pub(crate) fn str_arg<'a>(args: &'a Value, tool: &str, key: &str) -> anyhow::Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("{tool}: missing `{key}` argument"))
}
