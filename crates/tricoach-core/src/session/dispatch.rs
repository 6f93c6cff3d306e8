//! Convenience helpers that wrap [`super::SessionStateMachine`]
//! transitions with semantic names.

use anyhow::Result;
use uuid::Uuid;

use tricoach_db::TrainingStore;
use tricoach_db::models::SessionStatus;

use super::{Actor, SessionStateMachine};

/// Athlete skips a session: `planned -> skipped`. Counts against compliance.
pub async fn skip_session(store: &dyn TrainingStore, session_id: Uuid) -> Result<()> {
    SessionStateMachine::transition(
        store,
        session_id,
        SessionStatus::Planned,
        SessionStatus::Skipped,
        Actor::Athlete,
        None,
    )
    .await
}

/// Athlete takes a skip back: `skipped -> planned`.
pub async fn unskip_session(store: &dyn TrainingStore, session_id: Uuid) -> Result<()> {
    SessionStateMachine::transition(
        store,
        session_id,
        SessionStatus::Skipped,
        SessionStatus::Planned,
        Actor::Athlete,
        None,
    )
    .await
}

/// Coach replaces a session: `planned -> cancelled`. Terminal.
pub async fn cancel_session(store: &dyn TrainingStore, session_id: Uuid) -> Result<()> {
    SessionStateMachine::transition(
        store,
        session_id,
        SessionStatus::Planned,
        SessionStatus::Cancelled,
        Actor::Coach,
        None,
    )
    .await
}

/// A log satisfied the session: `planned -> completed`.
pub async fn complete_session(
    store: &dyn TrainingStore,
    session_id: Uuid,
    log_id: Uuid,
) -> Result<()> {
    SessionStateMachine::transition(
        store,
        session_id,
        SessionStatus::Planned,
        SessionStatus::Completed,
        Actor::System,
        Some(log_id),
    )
    .await
}
