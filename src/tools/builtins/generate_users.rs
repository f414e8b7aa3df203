//! Built-in `generate_sample_users` tool: synthesizes fake user records.
//!
//! One record is produced per first name.  Last names and domains are
//! paired cyclically, so the three lists need not have equal length.
//! Username suffix, age and registration date are random.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::tools::{ToolMeta, ToolRegistry};

/// Arguments accepted by `generate_sample_users`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateParams {
    pub first_names: Vec<String>,
    pub last_names: Vec<String>,
    pub domains: Vec<String>,
    pub min_age: i64,
    pub max_age: i64,
}

/// One synthetic user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleUser {
    pub id: usize,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub age: i64,
    /// RFC 3339, UTC.
    pub registered_at: String,
}

/// Check the preconditions, returning the message for the first one
/// violated.
pub fn validate(p: &GenerateParams) -> Result<(), String> {
    if p.first_names.is_empty() {
        return Err("first_names list cannot be empty".into());
    }
    if p.last_names.is_empty() {
        return Err("last_names list cannot be empty".into());
    }
    if p.domains.is_empty() {
        return Err("domains list cannot be empty".into());
    }
    if p.min_age > p.max_age {
        return Err(format!(
            "min_age ({}) cannot be greater than max_age ({})",
            p.min_age, p.max_age
        ));
    }
    if p.min_age < 0 || p.max_age < 0 {
        return Err("ages must be non-negative".into());
    }
    Ok(())
}

/// Build the records with an explicit RNG and clock.
pub fn generate_with<R: Rng>(
    p: &GenerateParams,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<Vec<SampleUser>, String> {
    validate(p)?;

    let users = p
        .first_names
        .iter()
        .enumerate()
        .map(|(i, first)| {
            let last = &p.last_names[i % p.last_names.len()];
            let domain = &p.domains[i % p.domains.len()];
            let days_ago = rng.gen_range(1..=365);
            SampleUser {
                id: i + 1,
                first_name: first.clone(),
                last_name: last.clone(),
                email: format!("{}.{}@{}", first.to_lowercase(), last.to_lowercase(), domain),
                username: format!("{}{}", first.to_lowercase(), rng.gen_range(100..=999)),
                age: rng.gen_range(p.min_age..=p.max_age),
                registered_at: (now - chrono::Duration::days(days_ago))
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            }
        })
        .collect();
    Ok(users)
}

/// Generate users and shape the tool result: `{ "users": [...], "count": N }`
/// on success, `{ "error": "…" }` when a precondition fails.
pub fn generate_sample_users(p: &GenerateParams) -> Value {
    match generate_with(p, &mut rand::thread_rng(), Utc::now()) {
        Ok(users) => {
            let count = users.len();
            json!({ "users": users, "count": count })
        }
        Err(msg) => json!({ "error": msg }),
    }
}

/// Tool entry point.  Argument shape errors are call errors; parameter
/// violations are reported inside the result object.
fn handle(args: Value) -> anyhow::Result<Value> {
    let params: GenerateParams = serde_json::from_value(args)
        .map_err(|e| anyhow::anyhow!("generate_sample_users: invalid arguments: {e}"))?;
    Ok(generate_sample_users(&params))
}

/// Register the `generate_sample_users` tool.
pub fn register(reg: &mut ToolRegistry) {
    let list = |what: &str| {
        json!({
            "type": "array",
            "items": { "type": "string" },
            "description": what,
        })
    };
    reg.register(
        ToolMeta {
            name: "generate_sample_users".into(),
            description: "Generate sample user data. The number of users equals the number of first names; last names and domains are reused cyclically.".into(),
            args_schema: json!({
                "type": "object",
                "properties": {
                    "first_names": list("First names, one per generated user."),
                    "last_names": list("Last names to pair with the first names."),
                    "domains": list("Email domains, e.g. example.com."),
                    "min_age": { "type": "integer", "description": "Minimum age (inclusive)." },
                    "max_age": { "type": "integer", "description": "Maximum age (inclusive)." }
                },
                "required": ["first_names", "last_names", "domains", "min_age", "max_age"]
            }),
        },
        Arc::new(|args, _dir| Box::pin(async move { handle(args) })),
    );
}
