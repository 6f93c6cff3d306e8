//! The `AdvisoryClient` trait: the adapter interface for the external
//! natural-language coaching endpoint.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tricoach_db::models::MessageRole;

use super::context::AthleteContext;

/// Prompt framing requested from the advisory endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryMode {
    Chat,
    Summary,
    Nutrition,
}

impl fmt::Display for AdvisoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Chat => "chat",
            Self::Summary => "summary",
            Self::Nutrition => "nutrition",
        })
    }
}

/// One replayed conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
}

/// Body of `POST {advisory url}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryRequest {
    pub mode: AdvisoryMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    pub athlete_context: AthleteContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_history: Option<Vec<ChatTurn>>,
}

/// Successful advisory reply.
///
/// `plan_changes` is kept as raw JSON and validated element by element by
/// [`super::changes::parse_changes`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryResponse {
    pub message: String,
    #[serde(default)]
    pub plan_changes: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum AdvisoryError {
    #[error("advisory endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("advisory request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed advisory response: {0}")]
    Malformed(String),

    #[error("advisory call timed out after {0:?}")]
    Timeout(Duration),

    #[error("advisory call cancelled")]
    Cancelled,
}

/// Adapter for the advisory endpoint.
///
/// # Object Safety
///
/// This trait is object-safe so callers can hold `Arc<dyn AdvisoryClient>`
/// and tests can substitute a scripted client.
#[async_trait]
pub trait AdvisoryClient: Send + Sync {
    /// Send one request and wait for the full reply. No retries.
    async fn advise(&self, request: &AdvisoryRequest) -> Result<AdvisoryResponse, AdvisoryError>;
}

// Compile-time assertion: AdvisoryClient must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn AdvisoryClient) {}
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&AdvisoryMode::Nutrition).unwrap(), "\"nutrition\"");
        assert_eq!(AdvisoryMode::Chat.to_string(), "chat");
    }

    #[test]
    fn response_without_plan_changes_is_null() {
        let r: AdvisoryResponse = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(r.message, "hi");
        assert!(r.plan_changes.is_null());
    }

    #[test]
    fn response_reads_camel_case() {
        let r: AdvisoryResponse =
            serde_json::from_str(r#"{"message":"ok","planChanges":[{"action":"add"}]}"#).unwrap();
        assert!(r.plan_changes.is_array());
    }
}
