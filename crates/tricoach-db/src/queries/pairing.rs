//! Database query functions for `pairing_codes` and `channel_links`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ChannelLink, PairingCode};

/// Issue a new pairing code for an athlete, consuming any code still active.
///
/// Both statements run in one transaction so an athlete never holds two
/// active codes.
pub async fn replace_pairing_code(
    pool: &PgPool,
    athlete_id: Uuid,
    code_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<PairingCode> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    sqlx::query(
        "UPDATE pairing_codes SET consumed_at = NOW() \
         WHERE athlete_id = $1 AND consumed_at IS NULL",
    )
    .bind(athlete_id)
    .execute(&mut *tx)
    .await
    .context("failed to consume previous pairing codes")?;

    let code = sqlx::query_as::<_, PairingCode>(
        "INSERT INTO pairing_codes (athlete_id, code_hash, expires_at) \
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(athlete_id)
    .bind(code_hash)
    .bind(expires_at)
    .fetch_one(&mut *tx)
    .await
    .context("failed to insert pairing code")?;

    tx.commit().await.context("failed to commit transaction")?;

    Ok(code)
}

/// Whether an unconsumed, unexpired code with this digest exists.
pub async fn pairing_code_active(
    pool: &PgPool,
    code_hash: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM pairing_codes \
         WHERE code_hash = $1 AND consumed_at IS NULL AND expires_at > $2)",
    )
    .bind(code_hash)
    .bind(now)
    .fetch_one(pool)
    .await
    .context("failed to look up pairing code")?;

    Ok(exists)
}

/// Consume the active code with this digest. Returns `None` when the code is
/// unknown, expired, or already consumed; nothing is written in that case.
pub async fn consume_pairing_code(
    pool: &PgPool,
    code_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<PairingCode>> {
    let code = sqlx::query_as::<_, PairingCode>(
        "UPDATE pairing_codes SET consumed_at = $2 \
         WHERE id = ( \
             SELECT id FROM pairing_codes \
             WHERE code_hash = $1 AND consumed_at IS NULL AND expires_at > $2 \
             ORDER BY created_at DESC \
             LIMIT 1 \
             FOR UPDATE SKIP LOCKED) \
         RETURNING *",
    )
    .bind(code_hash)
    .bind(now)
    .fetch_optional(pool)
    .await
    .context("failed to consume pairing code")?;

    Ok(code)
}

/// Bind a channel identity to an athlete, replacing any earlier binding.
pub async fn upsert_channel_link(
    pool: &PgPool,
    channel: &str,
    external_id: &str,
    athlete_id: Uuid,
) -> Result<ChannelLink> {
    let link = sqlx::query_as::<_, ChannelLink>(
        "INSERT INTO channel_links (channel, external_id, athlete_id) VALUES ($1, $2, $3) \
         ON CONFLICT (channel, external_id) DO UPDATE SET \
             athlete_id = EXCLUDED.athlete_id, linked_at = NOW() \
         RETURNING *",
    )
    .bind(channel)
    .bind(external_id)
    .bind(athlete_id)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to link {channel} identity"))?;

    Ok(link)
}

pub async fn find_channel_link(
    pool: &PgPool,
    channel: &str,
    external_id: &str,
) -> Result<Option<ChannelLink>> {
    let link = sqlx::query_as::<_, ChannelLink>(
        "SELECT * FROM channel_links WHERE channel = $1 AND external_id = $2",
    )
    .bind(channel)
    .bind(external_id)
    .fetch_optional(pool)
    .await
    .context("failed to look up channel link")?;

    Ok(link)
}
