//! Milestone evaluation and seeding.
//!
//! Achievement milestones carry a [`MilestoneRule`] checked against every
//! new log; date milestones are achieved once their date arrives. Both
//! move `upcoming -> achieved` exactly once.

pub mod seed;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use tricoach_db::TrainingStore;
use tricoach_db::models::{Milestone, MilestoneKind, MilestoneRule, MilestoneStatus, SessionLog};

pub use seed::seed_milestones;

/// Whether `rule` is satisfied by `log`.
///
/// The sport must match. Duration and distance thresholds are alternatives:
/// meeting any threshold that is set fires the rule. A rule with neither
/// threshold fires on any log of its sport.
pub fn rule_fires(rule: &MilestoneRule, log: &SessionLog) -> bool {
    if rule.sport != log.sport {
        return false;
    }
    if rule.min_duration.is_none() && rule.min_distance.is_none() {
        return true;
    }
    let duration_met = rule.min_duration.is_some_and(|min| log.duration_min >= min);
    let distance_met = match (rule.min_distance, log.distance_km) {
        (Some(min), Some(km)) => km >= min,
        _ => false,
    };
    duration_met || distance_met
}

async fn achieve(
    store: &dyn TrainingStore,
    mut milestone: Milestone,
    now: DateTime<Utc>,
) -> Result<Option<Milestone>> {
    let rows = store
        .mark_milestone_achieved(milestone.id, now)
        .await
        .with_context(|| format!("failed to mark milestone {:?} achieved", milestone.title))?;
    if rows == 0 {
        return Ok(None);
    }
    tracing::info!(
        athlete_id = %milestone.athlete_id,
        milestone = %milestone.title,
        "milestone achieved"
    );
    milestone.status = MilestoneStatus::Achieved;
    milestone.achieved_at = Some(now);
    Ok(Some(milestone))
}

/// Evaluate the athlete's upcoming achievement milestones against a new log.
/// Returns the milestones that were achieved by it.
pub async fn evaluate_log_milestones(
    store: &dyn TrainingStore,
    log: &SessionLog,
    now: DateTime<Utc>,
) -> Result<Vec<Milestone>> {
    let mut achieved = Vec::new();
    for m in store.list_milestones(log.athlete_id).await? {
        if m.kind != MilestoneKind::AchievementBased || m.status != MilestoneStatus::Upcoming {
            continue;
        }
        let fires = m.rule.as_ref().is_some_and(|rule| rule_fires(rule, log));
        if !fires {
            continue;
        }
        if let Some(done) = achieve(store, m, now).await? {
            achieved.push(done);
        }
    }
    Ok(achieved)
}

/// Achieve every upcoming date milestone whose date is not after `today`.
pub async fn evaluate_date_milestones(
    store: &dyn TrainingStore,
    athlete_id: Uuid,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Vec<Milestone>> {
    let mut achieved = Vec::new();
    for m in store.list_milestones(athlete_id).await? {
        let due = m.kind == MilestoneKind::DateBased
            && m.status == MilestoneStatus::Upcoming
            && m.target_date.is_some_and(|d| d <= today);
        if !due {
            continue;
        }
        if let Some(done) = achieve(store, m, now).await? {
            achieved.push(done);
        }
    }
    Ok(achieved)
}
