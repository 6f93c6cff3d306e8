//! Apply validated coach changes to the plan.

use anyhow::{Context, Result, bail};
use uuid::Uuid;

use tricoach_db::TrainingStore;
use tricoach_db::models::{
    Intensity, NewPlannedSession, PlannedSession, SessionOrigin, SessionStatus,
};

use crate::session::dispatch;

use super::changes::{AddSession, Change};

pub const DEFAULT_WORKOUT_TYPE: &str = "Z2";
pub const DEFAULT_DURATION_MIN: i32 = 45;
pub const DEFAULT_INTENSITY: Intensity = Intensity::Easy;

/// Result of applying one change.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOutcome {
    Applied {
        change: Change,
        /// Session inserted by `add` or `reschedule`.
        created: Option<Uuid>,
    },
    Skipped {
        change: Change,
        reason: String,
    },
}

impl ChangeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

async fn owned_session(
    store: &dyn TrainingStore,
    athlete_id: Uuid,
    session_id: Uuid,
) -> Result<PlannedSession> {
    let session = store
        .get_session(session_id)
        .await?
        .with_context(|| format!("session {session_id} not found"))?;
    if session.athlete_id != athlete_id {
        bail!("session {session_id} does not belong to athlete {athlete_id}");
    }
    Ok(session)
}

fn added_session(athlete_id: Uuid, add: &AddSession) -> NewPlannedSession {
    let workout_type = add
        .workout_type
        .clone()
        .unwrap_or_else(|| DEFAULT_WORKOUT_TYPE.to_string());
    let description = add
        .description
        .clone()
        .unwrap_or_else(|| format!("{} {} (added by coach)", add.sport, workout_type));
    NewPlannedSession {
        athlete_id,
        date: add.date,
        sport: add.sport,
        workout_type,
        duration_min: add.duration_min.unwrap_or(DEFAULT_DURATION_MIN),
        distance_km: add.distance_km,
        intensity: add.intensity.unwrap_or(DEFAULT_INTENSITY),
        description,
        origin: SessionOrigin::Coach,
    }
}

async fn apply_one(
    store: &dyn TrainingStore,
    athlete_id: Uuid,
    change: &Change,
) -> Result<Option<Uuid>> {
    match change {
        Change::Cancel { session_id } => {
            owned_session(store, athlete_id, *session_id).await?;
            dispatch::cancel_session(store, *session_id).await?;
            Ok(None)
        }
        Change::Reschedule {
            session_id,
            new_date,
        } => {
            let original = owned_session(store, athlete_id, *session_id).await?;
            if original.status != SessionStatus::Planned {
                bail!(
                    "session {session_id} has status {}, only planned sessions can be rescheduled",
                    original.status
                );
            }
            let clone = NewPlannedSession {
                athlete_id,
                date: *new_date,
                sport: original.sport,
                workout_type: original.workout_type,
                duration_min: original.duration_min,
                distance_km: original.distance_km,
                intensity: original.intensity,
                description: original.description,
                origin: SessionOrigin::Coach,
            };
            // Insert first: a failed insert leaves the original untouched.
            let inserted = store.insert_session(&clone).await?;
            if let Err(e) = dispatch::cancel_session(store, *session_id).await {
                if let Err(undo) = store.delete_sessions(&[inserted.id]).await {
                    tracing::warn!(
                        athlete_id = %athlete_id,
                        session_id = %inserted.id,
                        error = %format!("{undo:#}"),
                        "failed to remove rescheduled copy"
                    );
                }
                return Err(e);
            }
            Ok(Some(inserted.id))
        }
        Change::Add(add) => {
            let inserted = store.insert_session(&added_session(athlete_id, add)).await?;
            Ok(Some(inserted.id))
        }
    }
}

/// Apply `changes` in order. A failing change is recorded as skipped and
/// the rest still run; nothing is rolled back.
///
/// The caller must hold the athlete's lock.
pub async fn apply_changes(
    store: &dyn TrainingStore,
    athlete_id: Uuid,
    changes: &[Change],
) -> Vec<ChangeOutcome> {
    let mut outcomes = Vec::with_capacity(changes.len());
    for change in changes {
        match apply_one(store, athlete_id, change).await {
            Ok(created) => {
                tracing::info!(
                    athlete_id = %athlete_id,
                    action = change.action(),
                    created = ?created,
                    "coach change applied"
                );
                outcomes.push(ChangeOutcome::Applied {
                    change: change.clone(),
                    created,
                });
            }
            Err(e) => {
                tracing::warn!(
                    athlete_id = %athlete_id,
                    action = change.action(),
                    error = %format!("{e:#}"),
                    "coach change skipped"
                );
                outcomes.push(ChangeOutcome::Skipped {
                    change: change.clone(),
                    reason: format!("{e:#}"),
                });
            }
        }
    }
    outcomes
}
