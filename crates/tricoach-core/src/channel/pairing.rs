//! One-time pairing codes linking a chat identity to an athlete.
//!
//! Codes are 6 random digits valid for ten minutes. Only their SHA-256
//! digest is stored. Issuing a code consumes any code the athlete still
//! holds, so at most one is active per athlete.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use tricoach_db::TrainingStore;
use tricoach_db::models::ChannelLink;

pub const PAIRING_CODE_TTL_MINUTES: i64 = 10;
const MAX_ISSUE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairingError {
    #[error("pairing code must be 6 digits")]
    Malformed,

    #[error("pairing code is invalid, expired, or already used")]
    Rejected,
}

/// A freshly issued code. The plaintext exists only here.
#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Hex-encoded SHA-256 of a code.
pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

fn generate_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

/// Issue a new code for `athlete_id`, consuming the previous one.
pub async fn issue_pairing_code(
    store: &dyn TrainingStore,
    athlete_id: Uuid,
    now: DateTime<Utc>,
) -> Result<IssuedCode> {
    let expires_at = now + Duration::minutes(PAIRING_CODE_TTL_MINUTES);

    for _ in 0..MAX_ISSUE_ATTEMPTS {
        let code = generate_code();
        let digest = hash_code(&code);
        // Two live codes with the same digest would be ambiguous on redeem.
        if store.pairing_code_active(&digest, now).await? {
            continue;
        }
        store
            .replace_pairing_code(athlete_id, &digest, expires_at)
            .await
            .context("failed to store pairing code")?;
        tracing::info!(athlete_id = %athlete_id, %expires_at, "pairing code issued");
        return Ok(IssuedCode { code, expires_at });
    }

    bail!("could not find a free pairing code after {MAX_ISSUE_ATTEMPTS} attempts")
}

/// Redeem `code` for (`channel`, `external_id`).
///
/// Fails with [`PairingError`] (inside the `anyhow::Error`) when the code
/// is malformed, unknown, expired or already used; nothing is written then.
pub async fn redeem_pairing_code(
    store: &dyn TrainingStore,
    channel: &str,
    external_id: &str,
    code: &str,
    now: DateTime<Utc>,
) -> Result<ChannelLink> {
    let code = code.trim();
    if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PairingError::Malformed.into());
    }

    let Some(consumed) = store.consume_pairing_code(&hash_code(code), now).await? else {
        tracing::info!(%channel, "pairing code rejected");
        return Err(PairingError::Rejected.into());
    };

    let link = store
        .upsert_channel_link(channel, external_id, consumed.athlete_id)
        .await
        .context("failed to link channel")?;
    tracing::info!(athlete_id = %link.athlete_id, %channel, "channel linked");
    Ok(link)
}
