//! Database query functions for the `planned_sessions` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewPlannedSession, PlannedSession, SessionStatus, Sport};

/// Insert a planned session. Status is always `planned`.
pub async fn insert_session(pool: &PgPool, s: &NewPlannedSession) -> Result<PlannedSession> {
    let session = sqlx::query_as::<_, PlannedSession>(
        "INSERT INTO planned_sessions (athlete_id, date, sport, workout_type, duration_min, \
             distance_km, intensity, description, origin) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING *",
    )
    .bind(s.athlete_id)
    .bind(s.date)
    .bind(s.sport)
    .bind(&s.workout_type)
    .bind(s.duration_min)
    .bind(s.distance_km)
    .bind(s.intensity)
    .bind(&s.description)
    .bind(s.origin)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert {} session on {}", s.sport, s.date))?;

    Ok(session)
}

/// Fetch a single session by ID.
pub async fn get_session(pool: &PgPool, id: Uuid) -> Result<Option<PlannedSession>> {
    let session =
        sqlx::query_as::<_, PlannedSession>("SELECT * FROM planned_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch planned session")?;

    Ok(session)
}

/// List every session of an athlete, ordered by date then creation time.
pub async fn list_sessions(pool: &PgPool, athlete_id: Uuid) -> Result<Vec<PlannedSession>> {
    let sessions = sqlx::query_as::<_, PlannedSession>(
        "SELECT * FROM planned_sessions WHERE athlete_id = $1 ORDER BY date ASC, created_at ASC",
    )
    .bind(athlete_id)
    .fetch_all(pool)
    .await
    .context("failed to list planned sessions")?;

    Ok(sessions)
}

/// List an athlete's sessions with `from <= date <= to`.
pub async fn list_sessions_in_range(
    pool: &PgPool,
    athlete_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<PlannedSession>> {
    let sessions = sqlx::query_as::<_, PlannedSession>(
        "SELECT * FROM planned_sessions \
         WHERE athlete_id = $1 AND date BETWEEN $2 AND $3 \
         ORDER BY date ASC, created_at ASC",
    )
    .bind(athlete_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .context("failed to list planned sessions in range")?;

    Ok(sessions)
}

/// Sessions in `planned` status for the given (date, sport), oldest first.
/// These are the candidates of the log-to-plan matching rule.
pub async fn find_planned_sessions(
    pool: &PgPool,
    athlete_id: Uuid,
    date: NaiveDate,
    sport: Sport,
) -> Result<Vec<PlannedSession>> {
    let sessions = sqlx::query_as::<_, PlannedSession>(
        "SELECT * FROM planned_sessions \
         WHERE athlete_id = $1 AND date = $2 AND sport = $3 AND status = 'planned' \
         ORDER BY created_at ASC, id ASC",
    )
    .bind(athlete_id)
    .bind(date)
    .bind(sport)
    .fetch_all(pool)
    .await
    .context("failed to find matching planned sessions")?;

    Ok(sessions)
}

/// Upcoming `planned` sessions on or after `from`, soonest first.
pub async fn upcoming_sessions(
    pool: &PgPool,
    athlete_id: Uuid,
    from: NaiveDate,
    limit: i64,
) -> Result<Vec<PlannedSession>> {
    let sessions = sqlx::query_as::<_, PlannedSession>(
        "SELECT * FROM planned_sessions \
         WHERE athlete_id = $1 AND date >= $2 AND status = 'planned' \
         ORDER BY date ASC, created_at ASC \
         LIMIT $3",
    )
    .bind(athlete_id)
    .bind(from)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to list upcoming sessions")?;

    Ok(sessions)
}

/// Atomically transition a session from one status to another.
///
/// Optimistic locking: the row only changes if its current status is
/// `from`. `completed_log_id` is written as given, so leaving the
/// `completed` state always clears the back-reference. Returns the number of
/// rows affected (0 means the status did not match or the row is missing).
pub async fn transition_session_status(
    pool: &PgPool,
    id: Uuid,
    from: SessionStatus,
    to: SessionStatus,
    completed_log_id: Option<Uuid>,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE planned_sessions \
         SET status = $1, completed_log_id = $2 \
         WHERE id = $3 AND status = $4",
    )
    .bind(to)
    .bind(completed_log_id)
    .bind(id)
    .bind(from)
    .execute(pool)
    .await
    .context("failed to transition session status")?;

    Ok(result.rows_affected())
}

/// Delete sessions by ID. Returns the number of rows removed.
pub async fn delete_sessions(pool: &PgPool, ids: &[Uuid]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query("DELETE FROM planned_sessions WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await
        .context("failed to delete planned sessions")?;

    Ok(result.rows_affected())
}
