//! Planned-session state machine.
//!
//! Validates and executes status transitions for planned sessions,
//! enforcing the transition graph, the actor allowed to take each edge,
//! the completed/back-reference invariant, and optimistic locking.

pub mod compliance;
pub mod dispatch;
pub mod matching;

use std::fmt;

use anyhow::{Context, Result, bail};
use uuid::Uuid;

use tricoach_db::TrainingStore;
use tricoach_db::models::SessionStatus;

pub use compliance::{Compliance, compute_compliance};
pub use matching::{LogOutcome, MatchOutcome, MatchPolicy, record_log};

/// Who is asking for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Athlete,
    Coach,
    /// The log-to-plan matcher.
    System,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Athlete => "athlete",
            Self::Coach => "coach",
            Self::System => "system",
        })
    }
}

/// The planned-session state machine.
///
/// ```text
/// planned -> completed   (system, on a matching log)
/// planned -> skipped     (athlete)
/// skipped -> planned     (athlete)
/// planned -> cancelled   (coach; terminal)
/// ```
pub struct SessionStateMachine;

impl SessionStateMachine {
    /// Check whether `from -> to` is an edge of the graph.
    pub fn is_valid_transition(from: SessionStatus, to: SessionStatus) -> bool {
        matches!(
            (from, to),
            (SessionStatus::Planned, SessionStatus::Completed)
                | (SessionStatus::Planned, SessionStatus::Skipped)
                | (SessionStatus::Skipped, SessionStatus::Planned)
                | (SessionStatus::Planned, SessionStatus::Cancelled)
        )
    }

    /// Check whether `actor` may take the edge `from -> to`.
    pub fn actor_may(actor: Actor, from: SessionStatus, to: SessionStatus) -> bool {
        match (from, to) {
            (SessionStatus::Planned, SessionStatus::Completed) => actor == Actor::System,
            (SessionStatus::Planned, SessionStatus::Skipped)
            | (SessionStatus::Skipped, SessionStatus::Planned) => actor == Actor::Athlete,
            (SessionStatus::Planned, SessionStatus::Cancelled) => actor == Actor::Coach,
            _ => false,
        }
    }

    /// Execute a transition with optimistic locking on `from`.
    ///
    /// `completed_log_id` must be given exactly when `to` is `completed`.
    ///
    /// Returns an error if the edge is not in the graph, the actor may not
    /// take it, the session does not exist, or its stored status is not
    /// `from` (the message names the actual status).
    pub async fn transition(
        store: &dyn TrainingStore,
        session_id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
        actor: Actor,
        completed_log_id: Option<Uuid>,
    ) -> Result<()> {
        if !Self::is_valid_transition(from, to) {
            bail!("invalid session transition: {from} -> {to} for session {session_id}");
        }
        if !Self::actor_may(actor, from, to) {
            bail!("{actor} may not move session {session_id} from {from} to {to}");
        }
        if (to == SessionStatus::Completed) != completed_log_id.is_some() {
            bail!("session {session_id}: a log reference is required exactly when completing");
        }

        let rows = store
            .transition_session_status(session_id, from, to, completed_log_id)
            .await
            .with_context(|| {
                format!("failed to transition session {session_id} from {from} to {to}")
            })?;

        if rows == 0 {
            match store.get_session(session_id).await? {
                None => bail!("session {session_id} not found"),
                Some(s) => bail!(
                    "optimistic lock failed: session {session_id} has status {}, expected {from}",
                    s.status
                ),
            }
        }

        tracing::info!(session_id = %session_id, %from, %to, %actor, "session transitioned");
        Ok(())
    }
}
