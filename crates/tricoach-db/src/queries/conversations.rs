//! Database query functions for the append-only `coach_messages` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{CoachMessage, MessageRole};

pub async fn append_message(
    pool: &PgPool,
    athlete_id: Uuid,
    role: MessageRole,
    content: &str,
) -> Result<CoachMessage> {
    let row = sqlx::query_as::<_, CoachMessage>(
        "INSERT INTO coach_messages (athlete_id, role, content) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(athlete_id)
    .bind(role)
    .bind(content)
    .fetch_one(pool)
    .await
    .context("failed to append coach message")?;

    Ok(row)
}

/// The last `limit` turns of the conversation, in chronological order.
pub async fn recent_messages(
    pool: &PgPool,
    athlete_id: Uuid,
    limit: i64,
) -> Result<Vec<CoachMessage>> {
    let mut rows = sqlx::query_as::<_, CoachMessage>(
        "SELECT * FROM coach_messages WHERE athlete_id = $1 ORDER BY id DESC LIMIT $2",
    )
    .bind(athlete_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to list coach messages")?;

    rows.reverse();
    Ok(rows)
}
