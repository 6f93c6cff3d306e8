//! Regenerate future sessions without touching history.
//!
//! Destructive-then-rebuild, not a merge:
//! 1. Load every session of the athlete.
//! 2. Regenerate set: `planned` sessions dated today or later. Everything
//!    else is kept, including completed and skipped sessions of any date
//!    and cancelled future sessions.
//! 3. Delete the regenerate set.
//! 4. Generate the template over the horizon.
//! 5. Drop generated sessions whose (date, sport) collides with a kept one.
//! 6. Insert the remainder.
//!
//! A coach-added future session still `planned` falls in the regenerate
//! set and is lost. This is logged, not prevented.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use tricoach_db::TrainingStore;
use tricoach_db::models::{PlannedSession, SessionOrigin, SessionStatus};

use crate::lock::AthleteLocks;
use crate::planning::{WeeklyTargets, generate_sessions};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub kept: usize,
    pub deleted: usize,
    /// Deleted sessions the coach had added.
    pub deleted_coach: usize,
    pub generated: usize,
    /// Generated sessions dropped for colliding with a kept key.
    pub collisions: usize,
    pub inserted: usize,
}

/// Whether refresh may delete and regenerate `session`.
pub fn is_regenerable(session: &PlannedSession, today: NaiveDate) -> bool {
    session.date >= today && session.status == SessionStatus::Planned
}

/// Rebuild the athlete's future sessions from the stored plan.
pub async fn refresh_future_sessions(
    store: &dyn TrainingStore,
    locks: &AthleteLocks,
    athlete_id: Uuid,
    today: NaiveDate,
    horizon_days: u32,
) -> Result<RefreshSummary> {
    let _guard = locks.lock(athlete_id).await;
    refresh_locked(store, athlete_id, today, horizon_days).await
}

/// [`refresh_future_sessions`] for callers already holding the lock.
pub(crate) async fn refresh_locked(
    store: &dyn TrainingStore,
    athlete_id: Uuid,
    today: NaiveDate,
    horizon_days: u32,
) -> Result<RefreshSummary> {
    let plan = store
        .get_plan(athlete_id)
        .await?
        .with_context(|| format!("athlete {athlete_id} has no plan; complete onboarding first"))?;

    let existing = store.list_sessions(athlete_id).await?;
    let (regenerate, keep): (Vec<_>, Vec<_>) = existing
        .into_iter()
        .partition(|s| is_regenerable(s, today));

    let mut summary = RefreshSummary {
        kept: keep.len(),
        ..RefreshSummary::default()
    };

    summary.deleted_coach = regenerate
        .iter()
        .filter(|s| s.origin == SessionOrigin::Coach)
        .count();
    if summary.deleted_coach > 0 {
        tracing::warn!(
            athlete_id = %athlete_id,
            count = summary.deleted_coach,
            "refresh drops coach-added future sessions"
        );
    }

    let ids: Vec<Uuid> = regenerate.iter().map(|s| s.id).collect();
    summary.deleted = store
        .delete_sessions(&ids)
        .await
        .context("failed to delete future sessions")? as usize;

    let kept_keys: HashSet<_> = keep.iter().map(PlannedSession::key).collect();
    let generated = generate_sessions(athlete_id, &WeeklyTargets::from(&plan), today, horizon_days);
    summary.generated = generated.len();

    for session in generated {
        if kept_keys.contains(&session.key()) {
            summary.collisions += 1;
            continue;
        }
        store.insert_session(&session).await?;
        summary.inserted += 1;
    }

    tracing::info!(
        athlete_id = %athlete_id,
        kept = summary.kept,
        deleted = summary.deleted,
        inserted = summary.inserted,
        collisions = summary.collisions,
        "future sessions refreshed"
    );
    Ok(summary)
}
