//! Built-in `read_json` tool: reads a JSON file and returns it pretty-printed.

use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use crate::tools::{ascii_json, resolve_path, str_arg, ToolMeta, ToolRegistry};

/// Read `path` and return its JSON re-serialized with 2-space indents,
/// non-ASCII characters escaped.
///
/// Failures are returned as text and stay distinguishable:
/// `Error: File '…' not found.`, `Error: Invalid JSON in file - …`, or
/// `Error reading JSON: …` for any other I/O problem.
pub async fn read_json(path: &Path) -> String {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return format!("Error: File '{}' not found.", path.display());
        }
        Err(e) => return format!("Error reading JSON: {e}"),
    };

    let data: Value = match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(e) => return format!("Error: Invalid JSON in file - {e}"),
    };

    match ascii_json::to_string_pretty(&data) {
        Ok(s) => s,
        Err(e) => format!("Error reading JSON: {e}"),
    }
}

/// Tool entry point: `{ "filepath": "…" }`.
async fn handle(args: Value, data_dir: &Path) -> anyhow::Result<Value> {
    let raw = str_arg(&args, "read_json", "filepath")?;
    let path = resolve_path(data_dir, raw);
    Ok(Value::String(read_json(&path).await))
}

/// Register the `read_json` tool.
pub fn register(reg: &mut ToolRegistry) {
    reg.register(
        ToolMeta {
            name: "read_json".into(),
            description: "Read and return the contents of a JSON file.".into(),
            args_schema: json!({
                "type": "object",
                "properties": {
                    "filepath": {
                        "type": "string",
                        "description": "Path of the JSON file to read."
                    }
                },
                "required": ["filepath"]
            }),
        },
        Arc::new(|args, dir| Box::pin(async move { handle(args, &dir).await })),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_message() {
        let dir = tempfile::tempdir().unwrap();
        let msg = read_json(&dir.path().join("nope.json")).await;
        assert!(msg.starts_with("Error: File '"), "{msg}");
        assert!(msg.ends_with("not found."), "{msg}");
    }

    #[tokio::test]
    async fn invalid_json_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let msg = read_json(&path).await;
        assert!(msg.starts_with("Error: Invalid JSON in file - "), "{msg}");
    }

    #[tokio::test]
    async fn output_escapes_non_ascii_and_keeps_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u.json");
        std::fs::write(&path, r#"{"name": "Zoë", "age": 30}"#).unwrap();
        let msg = read_json(&path).await;
        assert_eq!(msg, "{\n  \"name\": \"Zo\\u00eb\",\n  \"age\": 30\n}");
    }

    #[tokio::test]
    async fn directory_is_a_generic_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let msg = read_json(dir.path()).await;
        assert!(msg.starts_with("Error reading JSON: "), "{msg}");
    }

    #[tokio::test]
    async fn handler_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), r#"{"k":1}"#).unwrap();
        let out = handle(json!({"filepath": "a.json"}), dir.path()).await.unwrap();
        assert_eq!(out, Value::String("{\n  \"k\": 1\n}".into()));
    }
}
