//! Athlete context sent with every advisory call.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use tricoach_db::TrainingStore;
use tricoach_db::models::{
    AthleteProfile, BodyMetricsEntry, PlannedSession, SessionLog, Sport, TrainingPlan,
};

use crate::session::compliance::{WeekSummary, this_week_summary};

use super::advisory::ChatTurn;

pub const METRICS_WINDOW: i64 = 5;
pub const LOG_WINDOW: i64 = 7;
pub const STRENGTH_WINDOW: i64 = 5;
pub const UPCOMING_WINDOW: i64 = 14;
pub const HISTORY_WINDOW: i64 = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AthleteContext {
    pub today: NaiveDate,
    pub profile: AthleteProfile,
    pub plan: Option<TrainingPlan>,
    pub this_week: WeekSummary,
    pub recent_metrics: Vec<BodyMetricsEntry>,
    pub recent_logs: Vec<SessionLog>,
    pub recent_strength: Vec<SessionLog>,
    /// Carries session ids so the advisory layer can reference them.
    pub upcoming_sessions: Vec<PlannedSession>,
}

/// Pull everything the advisory layer sees for `athlete_id`.
pub async fn assemble_context(
    store: &dyn TrainingStore,
    athlete_id: Uuid,
    today: NaiveDate,
) -> Result<AthleteContext> {
    let profile = store
        .get_profile(athlete_id)
        .await?
        .with_context(|| format!("no profile for athlete {athlete_id}"))?;
    let plan = store.get_plan(athlete_id).await?;
    let this_week = this_week_summary(store, athlete_id, today).await?;
    let recent_metrics = store.recent_body_metrics(athlete_id, METRICS_WINDOW).await?;
    let recent_logs = store.recent_logs(athlete_id, LOG_WINDOW).await?;
    let recent_strength = store
        .recent_logs_for_sport(athlete_id, Sport::Strength, STRENGTH_WINDOW)
        .await?;
    let upcoming_sessions = store
        .upcoming_sessions(athlete_id, today, UPCOMING_WINDOW)
        .await?;

    Ok(AthleteContext {
        today,
        profile,
        plan,
        this_week,
        recent_metrics,
        recent_logs,
        recent_strength,
        upcoming_sessions,
    })
}

/// The last [`HISTORY_WINDOW`] conversation turns, oldest first.
pub async fn chat_history(store: &dyn TrainingStore, athlete_id: Uuid) -> Result<Vec<ChatTurn>> {
    let turns = store
        .recent_messages(athlete_id, HISTORY_WINDOW)
        .await?
        .into_iter()
        .map(|m| ChatTurn {
            role: m.role,
            content: m.content,
        })
        .collect();
    Ok(turns)
}
