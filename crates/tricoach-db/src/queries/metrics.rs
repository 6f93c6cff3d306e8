//! Database query functions for the `body_metrics` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{BodyMetricsEntry, NewBodyMetrics};

/// Record the day's body metrics. A second entry on the same day merges into
/// the first: provided fields overwrite, absent fields keep their value.
pub async fn upsert_body_metrics(pool: &PgPool, m: &NewBodyMetrics) -> Result<BodyMetricsEntry> {
    let row = sqlx::query_as::<_, BodyMetricsEntry>(
        "INSERT INTO body_metrics (athlete_id, date, weight_kg, sleep_hours, fatigue, notes) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (athlete_id, date) DO UPDATE SET \
             weight_kg = COALESCE(EXCLUDED.weight_kg, body_metrics.weight_kg), \
             sleep_hours = COALESCE(EXCLUDED.sleep_hours, body_metrics.sleep_hours), \
             fatigue = COALESCE(EXCLUDED.fatigue, body_metrics.fatigue), \
             notes = COALESCE(EXCLUDED.notes, body_metrics.notes) \
         RETURNING *",
    )
    .bind(m.athlete_id)
    .bind(m.date)
    .bind(m.weight_kg)
    .bind(m.sleep_hours)
    .bind(m.fatigue)
    .bind(&m.notes)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to record body metrics for {}", m.date))?;

    Ok(row)
}

/// The athlete's most recent entries, newest first.
pub async fn recent_body_metrics(
    pool: &PgPool,
    athlete_id: Uuid,
    limit: i64,
) -> Result<Vec<BodyMetricsEntry>> {
    let rows = sqlx::query_as::<_, BodyMetricsEntry>(
        "SELECT * FROM body_metrics WHERE athlete_id = $1 ORDER BY date DESC LIMIT $2",
    )
    .bind(athlete_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to list body metrics")?;

    Ok(rows)
}
