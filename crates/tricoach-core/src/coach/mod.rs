//! Coach protocol: context assembly, the advisory call, and the embedded
//! plan-change channel.
//!
//! A call runs in three steps:
//! 1. Assemble the athlete context (and, in chat mode, the recent turns).
//! 2. Call the advisory endpoint, bounded by a timeout and a cancellation
//!    token. Any failure returns here with no state touched.
//! 3. Strip and parse the `[PLAN_CHANGES]` block, apply the changes under
//!    the athlete's lock, and in chat mode persist both turns.

pub mod advisory;
pub mod apply;
pub mod changes;
pub mod context;
pub mod http;

use std::time::Duration;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use tricoach_db::TrainingStore;
use tricoach_db::models::MessageRole;

use crate::lock::AthleteLocks;

pub use advisory::{
    AdvisoryClient, AdvisoryError, AdvisoryMode, AdvisoryRequest, AdvisoryResponse, ChatTurn,
};
pub use apply::{ChangeOutcome, apply_changes};
pub use changes::{Change, extract_plan_changes, parse_changes};
pub use context::{AthleteContext, assemble_context};
pub use http::HttpAdvisoryClient;

/// Overall deadline for one advisory call when none is configured.
pub const DEFAULT_ADVISORY_TIMEOUT: Duration = Duration::from_secs(60);

/// One coach request.
#[derive(Debug, Clone)]
pub struct CoachCall {
    pub athlete_id: Uuid,
    pub mode: AdvisoryMode,
    /// Required in chat mode.
    pub user_message: Option<String>,
    pub today: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct CoachReply {
    /// Prose with the change block removed.
    pub message: String,
    pub outcomes: Vec<ChangeOutcome>,
}

async fn call_advisory(
    advisor: &dyn AdvisoryClient,
    request: &AdvisoryRequest,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<AdvisoryResponse, AdvisoryError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(AdvisoryError::Cancelled),
        result = tokio::time::timeout(timeout, advisor.advise(request)) => match result {
            Ok(inner) => inner,
            Err(_elapsed) => Err(AdvisoryError::Timeout(timeout)),
        },
    }
}

/// Run one coach exchange end to end.
///
/// Errors from the advisory call are returned as [`AdvisoryError`] inside
/// the `anyhow::Error` and leave the plan and the conversation untouched.
pub async fn run_coach(
    store: &dyn TrainingStore,
    locks: &AthleteLocks,
    advisor: &dyn AdvisoryClient,
    call: &CoachCall,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<CoachReply> {
    let athlete_id = call.athlete_id;
    let user_message = call
        .user_message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());
    if call.mode == AdvisoryMode::Chat && user_message.is_none() {
        bail!("chat mode needs a message");
    }

    let athlete_context = assemble_context(store, athlete_id, call.today).await?;
    let chat_history = match call.mode {
        AdvisoryMode::Chat => Some(context::chat_history(store, athlete_id).await?),
        AdvisoryMode::Summary | AdvisoryMode::Nutrition => None,
    };
    let request = AdvisoryRequest {
        mode: call.mode,
        user_message: user_message.map(str::to_string),
        athlete_context,
        chat_history,
    };

    tracing::info!(athlete_id = %athlete_id, mode = %call.mode, "calling advisory endpoint");
    let response = match call_advisory(advisor, &request, timeout, cancel).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(athlete_id = %athlete_id, error = %e, "advisory call failed");
            return Err(e.into());
        }
    };

    let extracted = extract_plan_changes(&response.message);
    let changes = match extracted.changes {
        Some(from_block) => from_block,
        None => parse_changes(&response.plan_changes),
    };

    let outcomes = {
        let _guard = locks.lock(athlete_id).await;
        apply_changes(store, athlete_id, &changes).await
    };

    if let (AdvisoryMode::Chat, Some(text)) = (call.mode, user_message) {
        store.append_message(athlete_id, MessageRole::User, text).await?;
        store
            .append_message(athlete_id, MessageRole::Assistant, &extracted.message)
            .await?;
    }

    tracing::info!(
        athlete_id = %athlete_id,
        proposed = changes.len(),
        applied = outcomes.iter().filter(|o| o.is_applied()).count(),
        "coach exchange finished"
    );

    Ok(CoachReply {
        message: extracted.message,
        outcomes,
    })
}
