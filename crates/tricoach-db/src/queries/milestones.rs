//! Database query functions for the `milestones` table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{Milestone, NewMilestone};

pub async fn insert_milestone(pool: &PgPool, m: &NewMilestone) -> Result<Milestone> {
    let row = sqlx::query_as::<_, Milestone>(
        "INSERT INTO milestones (athlete_id, title, kind, target_date, rule, status, achieved_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING *",
    )
    .bind(m.athlete_id)
    .bind(&m.title)
    .bind(m.kind)
    .bind(m.target_date)
    .bind(m.rule.clone().map(Json))
    .bind(m.status)
    .bind(m.achieved_at)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert milestone {:?}", m.title))?;

    Ok(row)
}

/// All milestones of an athlete, by target date then creation time.
pub async fn list_milestones(pool: &PgPool, athlete_id: Uuid) -> Result<Vec<Milestone>> {
    let rows = sqlx::query_as::<_, Milestone>(
        "SELECT * FROM milestones WHERE athlete_id = $1 \
         ORDER BY target_date ASC NULLS LAST, created_at ASC",
    )
    .bind(athlete_id)
    .fetch_all(pool)
    .await
    .context("failed to list milestones")?;

    Ok(rows)
}

/// Flip an upcoming milestone to achieved. The `status = 'upcoming'` guard
/// makes the transition one-way: an achieved row is never re-stamped.
/// Returns the number of rows affected.
pub async fn mark_milestone_achieved(
    pool: &PgPool,
    id: Uuid,
    achieved_at: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE milestones SET status = 'achieved', achieved_at = $1 \
         WHERE id = $2 AND status = 'upcoming'",
    )
    .bind(achieved_at)
    .bind(id)
    .execute(pool)
    .await
    .context("failed to mark milestone achieved")?;

    Ok(result.rows_affected())
}

/// Remove the athlete's upcoming date-based milestones (before re-seeding
/// them from a regenerated plan).
pub async fn delete_upcoming_date_milestones(pool: &PgPool, athlete_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM milestones \
         WHERE athlete_id = $1 AND kind = 'date_based' AND status = 'upcoming'",
    )
    .bind(athlete_id)
    .execute(pool)
    .await
    .context("failed to delete upcoming date milestones")?;

    Ok(result.rows_affected())
}
