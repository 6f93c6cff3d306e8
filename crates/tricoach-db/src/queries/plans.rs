//! Database query functions for the `training_plans` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewTrainingPlan, TrainingPlan};

/// Fetch the athlete's active plan.
pub async fn get_plan(pool: &PgPool, athlete_id: Uuid) -> Result<Option<TrainingPlan>> {
    let plan =
        sqlx::query_as::<_, TrainingPlan>("SELECT * FROM training_plans WHERE athlete_id = $1")
            .bind(athlete_id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch training plan")?;

    Ok(plan)
}

/// Replace the athlete's plan wholesale. Plans are not versioned: the
/// previous row is overwritten and receives a fresh id.
pub async fn upsert_plan(pool: &PgPool, plan: &NewTrainingPlan) -> Result<TrainingPlan> {
    let row = sqlx::query_as::<_, TrainingPlan>(
        "INSERT INTO training_plans (athlete_id, phase, weekly_swim_sessions, weekly_bike_km, \
             weekly_run_km, weekly_strength_sessions, start_date, end_date) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (athlete_id) DO UPDATE SET \
             id = gen_random_uuid(), \
             phase = EXCLUDED.phase, \
             weekly_swim_sessions = EXCLUDED.weekly_swim_sessions, \
             weekly_bike_km = EXCLUDED.weekly_bike_km, \
             weekly_run_km = EXCLUDED.weekly_run_km, \
             weekly_strength_sessions = EXCLUDED.weekly_strength_sessions, \
             start_date = EXCLUDED.start_date, \
             end_date = EXCLUDED.end_date, \
             created_at = NOW() \
         RETURNING *",
    )
    .bind(plan.athlete_id)
    .bind(plan.phase)
    .bind(plan.weekly_swim_sessions)
    .bind(plan.weekly_bike_km)
    .bind(plan.weekly_run_km)
    .bind(plan.weekly_strength_sessions)
    .bind(plan.start_date)
    .bind(plan.end_date)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to upsert plan for athlete {}", plan.athlete_id))?;

    Ok(row)
}
