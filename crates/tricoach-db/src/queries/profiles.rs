//! Database query functions for the `athlete_profiles` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::AthleteProfile;

/// Fetch an athlete's profile.
pub async fn get_profile(pool: &PgPool, athlete_id: Uuid) -> Result<Option<AthleteProfile>> {
    let profile =
        sqlx::query_as::<_, AthleteProfile>("SELECT * FROM athlete_profiles WHERE athlete_id = $1")
            .bind(athlete_id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch athlete profile")?;

    Ok(profile)
}

/// Insert or replace an athlete's profile. `created_at` survives updates;
/// `updated_at` is refreshed.
pub async fn upsert_profile(pool: &PgPool, p: &AthleteProfile) -> Result<AthleteProfile> {
    let profile = sqlx::query_as::<_, AthleteProfile>(
        "INSERT INTO athlete_profiles (\
             athlete_id, display_name, age, weight_kg, height_cm, experience, goal, \
             race_date, priority, weekly_hours, pool_days, gym_access, \
             can_swim_race_distance, swim_pace_per_100m_sec, bike_ftp_watts, run_5k_minutes, \
             race_name, race_location, travel_notes, onboarding_step, completed) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                 $17, $18, $19, $20, $21) \
         ON CONFLICT (athlete_id) DO UPDATE SET \
             display_name = EXCLUDED.display_name, \
             age = EXCLUDED.age, \
             weight_kg = EXCLUDED.weight_kg, \
             height_cm = EXCLUDED.height_cm, \
             experience = EXCLUDED.experience, \
             goal = EXCLUDED.goal, \
             race_date = EXCLUDED.race_date, \
             priority = EXCLUDED.priority, \
             weekly_hours = EXCLUDED.weekly_hours, \
             pool_days = EXCLUDED.pool_days, \
             gym_access = EXCLUDED.gym_access, \
             can_swim_race_distance = EXCLUDED.can_swim_race_distance, \
             swim_pace_per_100m_sec = EXCLUDED.swim_pace_per_100m_sec, \
             bike_ftp_watts = EXCLUDED.bike_ftp_watts, \
             run_5k_minutes = EXCLUDED.run_5k_minutes, \
             race_name = EXCLUDED.race_name, \
             race_location = EXCLUDED.race_location, \
             travel_notes = EXCLUDED.travel_notes, \
             onboarding_step = EXCLUDED.onboarding_step, \
             completed = EXCLUDED.completed, \
             updated_at = NOW() \
         RETURNING *",
    )
    .bind(p.athlete_id)
    .bind(&p.display_name)
    .bind(p.age)
    .bind(p.weight_kg)
    .bind(p.height_cm)
    .bind(p.experience)
    .bind(p.goal)
    .bind(p.race_date)
    .bind(&p.priority)
    .bind(p.weekly_hours)
    .bind(p.pool_days)
    .bind(p.gym_access)
    .bind(p.can_swim_race_distance)
    .bind(p.swim_pace_per_100m_sec)
    .bind(p.bike_ftp_watts)
    .bind(p.run_5k_minutes)
    .bind(&p.race_name)
    .bind(&p.race_location)
    .bind(&p.travel_notes)
    .bind(p.onboarding_step)
    .bind(p.completed)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to upsert profile for athlete {}", p.athlete_id))?;

    Ok(profile)
}
