//! Integration tests for the DataGen tools, called both directly and
//! through the registry the agent uses.

use datagen_bridge::tools::{self, GenerateParams, ToolRegistry};
use serde_json::json;
use tempfile::TempDir;

/// Helper: create a fresh temp data directory.
fn workspace() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

fn params(first: &[&str], last: &[&str], domains: &[&str], min_age: i64, max_age: i64) -> GenerateParams {
    let owned = |xs: &[&str]| -> Vec<String> { xs.iter().map(|s| s.to_string()).collect() };
    GenerateParams {
        first_names: owned(first),
        last_names: owned(last),
        domains: owned(domains),
        min_age,
        max_age,
    }
}

// ── write_json / read_json ───────────────────────────────────

#[tokio::test]
async fn write_then_read_round_trip() {
    let ws = workspace();
    let path = ws.path().join("out/users.json");
    let data = json!({"users": [{"id": 1, "firstName": "Ana"}], "count": 1});

    let msg = tools::write_json(&path, &data).await;
    assert!(msg.starts_with("Successfully wrote JSON data to '"), "{msg}");
    assert!(msg.ends_with(" characters)."), "{msg}");

    let text = tools::read_json(&path).await;
    let back: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(back, data);
    assert_eq!(text, serde_json::to_string_pretty(&data).unwrap());
}

#[tokio::test]
async fn write_json_reports_errors_as_text() {
    let ws = workspace();
    // A directory cannot be overwritten with a file.
    let msg = tools::write_json(ws.path(), &json!({"a": 1})).await;
    assert!(msg.starts_with("Error writing JSON: "), "{msg}");
}

#[tokio::test]
async fn read_json_distinguishes_missing_from_invalid() {
    let ws = workspace();

    let missing = ws.path().join("missing.json");
    let msg = tools::read_json(&missing).await;
    assert_eq!(msg, format!("Error: File '{}' not found.", missing.display()));

    let broken = ws.path().join("broken.json");
    std::fs::write(&broken, "{\"a\": ").unwrap();
    let msg = tools::read_json(&broken).await;
    assert!(msg.starts_with("Error: Invalid JSON in file - "), "{msg}");
}

// ── generate_sample_users ────────────────────────────────────

#[test]
fn generated_users_follow_their_inputs() {
    let p = params(&["Ana", "Bo", "Cy"], &["Lee", "Ng"], &["example.com"], 20, 30);
    let out = tools::generate_sample_users(&p);

    assert_eq!(out["count"], 3);
    let users = out["users"].as_array().unwrap();
    assert_eq!(users.len(), 3);

    assert_eq!(users[0]["id"], 1);
    assert_eq!(users[0]["email"], "ana.lee@example.com");
    assert_eq!(users[1]["lastName"], "Ng");
    // Last names wrap around.
    assert_eq!(users[2]["lastName"], "Lee");
    assert_eq!(users[2]["email"], "cy.lee@example.com");

    for u in users {
        let age = u["age"].as_i64().unwrap();
        assert!((20..=30).contains(&age));
        let username = u["username"].as_str().unwrap();
        let first = u["firstName"].as_str().unwrap().to_lowercase();
        let suffix: u32 = username.strip_prefix(first.as_str()).unwrap().parse().unwrap();
        assert!((100..=999).contains(&suffix));
        assert!(chrono::DateTime::parse_from_rfc3339(u["registeredAt"].as_str().unwrap()).is_ok());
    }
}

#[test]
fn invalid_parameters_produce_error_objects() {
    let cases = [
        (params(&[], &["Lee"], &["x.io"], 1, 2), "first_names list cannot be empty"),
        (params(&["Ana"], &[], &["x.io"], 1, 2), "last_names list cannot be empty"),
        (params(&["Ana"], &["Lee"], &[], 1, 2), "domains list cannot be empty"),
        (
            params(&["Ana"], &["Lee"], &["x.io"], 40, 30),
            "min_age (40) cannot be greater than max_age (30)",
        ),
        (params(&["Ana"], &["Lee"], &["x.io"], -5, 3), "ages must be non-negative"),
    ];
    for (p, expected) in cases {
        assert_eq!(tools::generate_sample_users(&p), json!({ "error": expected }));
    }
}

// ── registry ─────────────────────────────────────────────────

#[tokio::test]
async fn registry_resolves_relative_paths_against_data_dir() {
    let ws = workspace();
    let reg = ToolRegistry::with_builtins(ws.path());
    assert_eq!(reg.names(), vec!["write_json", "read_json", "generate_sample_users"]);

    let generated = reg
        .call(
            "generate_sample_users",
            json!({
                "first_names": ["Ana", "Bo"],
                "last_names": ["Lee"],
                "domains": ["example.org"],
                "min_age": 18,
                "max_age": 18
            }),
        )
        .await
        .unwrap();
    assert_eq!(generated["count"], 2);

    let written = reg
        .call("write_json", json!({"filepath": "users.json", "data": generated}))
        .await
        .unwrap();
    assert!(written.as_str().unwrap().starts_with("Successfully wrote"));
    assert!(ws.path().join("users.json").exists());

    let read = reg
        .call("read_json", json!({"filepath": "users.json"}))
        .await
        .unwrap();
    let back: serde_json::Value = serde_json::from_str(read.as_str().unwrap()).unwrap();
    assert_eq!(back, generated);
}

#[tokio::test]
async fn saved_users_keep_field_order() {
    let ws = workspace();
    let reg = ToolRegistry::with_builtins(ws.path());

    let generated = reg
        .call(
            "generate_sample_users",
            json!({
                "first_names": ["Ana"],
                "last_names": ["Lee"],
                "domains": ["example.com"],
                "min_age": 30,
                "max_age": 30
            }),
        )
        .await
        .unwrap();
    reg.call("write_json", json!({"filepath": "users.json", "data": generated}))
        .await
        .unwrap();

    let on_disk = std::fs::read_to_string(ws.path().join("users.json")).unwrap();
    let pos = |key: &str| {
        on_disk
            .find(&format!("\"{key}\""))
            .unwrap_or_else(|| panic!("{key} missing from {on_disk}"))
    };
    assert!(pos("users") < pos("count"), "{on_disk}");
    let fields = ["id", "firstName", "lastName", "email", "username", "age", "registeredAt"];
    for pair in fields.windows(2) {
        assert!(pos(pair[0]) < pos(pair[1]), "{} should precede {}: {on_disk}", pair[0], pair[1]);
    }
}

#[tokio::test]
async fn registry_rejects_unknown_tools_and_missing_arguments() {
    let reg = ToolRegistry::with_builtins(workspace().path());
    let err = reg.call("delete_everything", json!({})).await.unwrap_err();
    assert!(err.to_string().contains("unknown tool"));

    let err = reg.call("read_json", json!({})).await.unwrap_err();
    assert!(err.to_string().contains("filepath"));
}
