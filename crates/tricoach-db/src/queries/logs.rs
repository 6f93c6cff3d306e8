//! Database query functions for the append-only `session_logs` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewSessionLog, SessionLog, Sport};

/// Append an activity log.
pub async fn insert_log(pool: &PgPool, log: &NewSessionLog) -> Result<SessionLog> {
    let row = sqlx::query_as::<_, SessionLog>(
        "INSERT INTO session_logs (athlete_id, date, sport, workout_type, duration_min, \
             distance_km, rpe, notes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING *",
    )
    .bind(log.athlete_id)
    .bind(log.date)
    .bind(log.sport)
    .bind(&log.workout_type)
    .bind(log.duration_min)
    .bind(log.distance_km)
    .bind(log.rpe)
    .bind(&log.notes)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert {} log on {}", log.sport, log.date))?;

    Ok(row)
}

/// The athlete's most recent logs, newest first.
pub async fn recent_logs(pool: &PgPool, athlete_id: Uuid, limit: i64) -> Result<Vec<SessionLog>> {
    let logs = sqlx::query_as::<_, SessionLog>(
        "SELECT * FROM session_logs WHERE athlete_id = $1 \
         ORDER BY date DESC, created_at DESC \
         LIMIT $2",
    )
    .bind(athlete_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to list recent logs")?;

    Ok(logs)
}

/// The athlete's most recent logs of one sport, newest first.
pub async fn recent_logs_for_sport(
    pool: &PgPool,
    athlete_id: Uuid,
    sport: Sport,
    limit: i64,
) -> Result<Vec<SessionLog>> {
    let logs = sqlx::query_as::<_, SessionLog>(
        "SELECT * FROM session_logs WHERE athlete_id = $1 AND sport = $2 \
         ORDER BY date DESC, created_at DESC \
         LIMIT $3",
    )
    .bind(athlete_id)
    .bind(sport)
    .bind(limit)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list recent {sport} logs"))?;

    Ok(logs)
}

/// Logs with `from <= date <= to`, oldest first.
pub async fn logs_in_range(
    pool: &PgPool,
    athlete_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<SessionLog>> {
    let logs = sqlx::query_as::<_, SessionLog>(
        "SELECT * FROM session_logs \
         WHERE athlete_id = $1 AND date BETWEEN $2 AND $3 \
         ORDER BY date ASC, created_at ASC",
    )
    .bind(athlete_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list logs between {from} and {to}"))?;

    Ok(logs)
}
