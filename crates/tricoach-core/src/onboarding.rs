//! Onboarding: saving profile steps and the completion hook that derives
//! the plan, its sessions and the default milestones.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use tricoach_db::TrainingStore;
use tricoach_db::models::{AthleteProfile, TrainingPlan};

use crate::lock::AthleteLocks;
use crate::milestone;
use crate::planning::generate_initial_plan;
use crate::refresh::{self, RefreshSummary};

/// Persist an in-progress profile. Derived data is untouched until
/// [`complete_onboarding`].
pub async fn save_profile_step(
    store: &dyn TrainingStore,
    profile: &AthleteProfile,
) -> Result<AthleteProfile> {
    let saved = store
        .upsert_profile(profile)
        .await
        .context("failed to save profile")?;
    tracing::debug!(
        athlete_id = %saved.athlete_id,
        step = saved.onboarding_step,
        "profile step saved"
    );
    Ok(saved)
}

#[derive(Debug, Clone)]
pub struct OnboardingOutcome {
    pub profile: AthleteProfile,
    pub plan: TrainingPlan,
    pub refresh: RefreshSummary,
    pub milestones_seeded: usize,
}

/// Mark the profile completed and regenerate everything derived from it:
/// the plan (replaced wholesale), future sessions, and milestones.
///
/// Re-running it after a profile edit is how the plan follows the profile.
pub async fn complete_onboarding(
    store: &dyn TrainingStore,
    locks: &AthleteLocks,
    athlete_id: Uuid,
    today: NaiveDate,
    horizon_days: u32,
    now: DateTime<Utc>,
) -> Result<OnboardingOutcome> {
    let _guard = locks.lock(athlete_id).await;

    let mut profile = store
        .get_profile(athlete_id)
        .await?
        .with_context(|| format!("no profile for athlete {athlete_id}"))?;
    profile.completed = true;
    let profile = store.upsert_profile(&profile).await?;

    let plan = store
        .upsert_plan(&generate_initial_plan(&profile, today))
        .await
        .context("failed to store plan")?;

    let refresh = refresh::refresh_locked(store, athlete_id, today, horizon_days).await?;
    let milestones_seeded =
        milestone::seed_milestones(store, athlete_id, profile.race_date, today, now).await?;

    tracing::info!(
        athlete_id = %athlete_id,
        phase = %plan.phase,
        sessions = refresh.inserted,
        "onboarding completed"
    );

    Ok(OnboardingOutcome {
        profile,
        plan,
        refresh,
        milestones_seeded,
    })
}
