//! JSON frames exchanged over the socket.
//!
//! Inbound: `{"text": "…"}`.  Outbound: `{"type": "system"|"agent"|"error", "text": "…"}`.

use serde::{Deserialize, Serialize};

/// Sent once, right after the socket opens.
pub const WELCOME_TEXT: &str = "Connected to DataGen agent 🚀";

/// Outbound frame kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    System,
    Agent,
    Error,
}

/// One outbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outbound {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    pub text: String,
}

impl Outbound {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            kind: EnvelopeKind::System,
            text: text.into(),
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            kind: EnvelopeKind::Agent,
            text: text.into(),
        }
    }

    /// Error frame; `detail` is prefixed with `Server error: `.
    pub fn server_error(detail: impl std::fmt::Display) -> Self {
        Self {
            kind: EnvelopeKind::Error,
            text: format!("Server error: {detail}"),
        }
    }
}

/// Extract the trimmed user text from an inbound frame.
///
/// Returns `None` for anything that is not a JSON object with a
/// non-blank string `text` field; such frames are ignored.
pub fn parse_inbound(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let text = value.as_object()?.get("text")?.as_str()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
