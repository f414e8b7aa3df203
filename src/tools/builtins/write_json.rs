//! Built-in `write_json` tool: writes a JSON value to a file, pretty-printed.

use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use crate::tools::{ascii_json, resolve_path, str_arg, ToolMeta, ToolRegistry};

/// Write `data` to `path` as 2-space indented UTF-8 JSON, replacing any
/// existing file.  Missing parent directories are created.
///
/// Never fails: I/O problems come back as an `"Error writing JSON: …"`
/// message so the agent can report them.
pub async fn write_json(path: &Path, data: &Value) -> String {
    match try_write(path, data).await {
        Ok(chars) => format!(
            "Successfully wrote JSON data to '{}' ({chars} characters).",
            path.display()
        ),
        Err(e) => format!("Error writing JSON: {e:#}"),
    }
}

/// Returns the length of the single-line ASCII-escaped serialization
/// (`", "` / `": "` separators), not of what lands on disk.
async fn try_write(path: &Path, data: &Value) -> anyhow::Result<usize> {
    let pretty = serde_json::to_string_pretty(data)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, pretty.as_bytes()).await?;
    Ok(ascii_json::to_string(data)?.len())
}

/// Tool entry point: `{ "filepath": "…", "data": <any JSON> }`.
async fn handle(args: Value, data_dir: &Path) -> anyhow::Result<Value> {
    let raw = str_arg(&args, "write_json", "filepath")?;
    let data = args
        .get("data")
        .ok_or_else(|| anyhow::anyhow!("write_json: missing `data` argument"))?;
    let path = resolve_path(data_dir, raw);
    Ok(Value::String(write_json(&path, data).await))
}

/// Register the `write_json` tool.
pub fn register(reg: &mut ToolRegistry) {
    reg.register(
        ToolMeta {
            name: "write_json".into(),
            description: "Write a JSON object to a file with pretty formatting.".into(),
            args_schema: json!({
                "type": "object",
                "properties": {
                    "filepath": {
                        "type": "string",
                        "description": "Path of the file to write. Overwritten if it exists."
                    },
                    "data": {
                        "type": "object",
                        "description": "The JSON data to write."
                    }
                },
                "required": ["filepath", "data"]
            }),
        },
        Arc::new(|args, dir| Box::pin(async move { handle(args, &dir).await })),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_escaped_single_line_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let data = json!({"name": "Zoë"});

        let msg = write_json(&path, &data).await;
        // {"name": "Zo\u00eb"} is 20 characters.
        assert!(msg.starts_with("Successfully wrote JSON data to"), "{msg}");
        assert!(msg.ends_with("(20 characters)."), "{msg}");

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk, "{\n  \"name\": \"Zoë\"\n}");
    }

    #[tokio::test]
    async fn nested_payload_length_counts_separator_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let data = json!({"users": [{"id": 1, "firstName": "Ana"}], "count": 1});
        let msg = write_json(&dir.path().join("u.json"), &data).await;
        assert!(msg.ends_with("(54 characters)."), "{msg}");
    }

    #[tokio::test]
    async fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.json");
        let msg = write_json(&path, &json!([1, 2])).await;
        assert!(msg.starts_with("Successfully"), "{msg}");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn failure_is_returned_as_text() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be overwritten with a file.
        let msg = write_json(dir.path(), &json!({})).await;
        assert!(msg.starts_with("Error writing JSON:"), "{msg}");
    }

    #[tokio::test]
    async fn handler_requires_filepath() {
        let dir = tempfile::tempdir().unwrap();
        let err = handle(json!({"data": {}}), dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("filepath"));
    }
}
