//! Log-to-plan matching.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tricoach_db::TrainingStore;
use tricoach_db::models::{Milestone, NewSessionLog, PlannedSession, SessionLog, SessionStatus};

use crate::lock::AthleteLocks;
use crate::milestone;

use super::dispatch;

/// How a new log picks the planned session it completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Complete only when exactly one planned session matches.
    #[default]
    RequireUnique,
    /// Complete the oldest of several matches.
    EarliestCreated,
}

impl MatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequireUnique => "require_unique",
            Self::EarliestCreated => "earliest_created",
        }
    }

    /// Pick the session to complete from candidates ordered oldest first.
    fn select<'a>(&self, candidates: &'a [PlannedSession]) -> Option<&'a PlannedSession> {
        match (self, candidates) {
            (_, [only]) => Some(only),
            (Self::EarliestCreated, [first, ..]) => Some(first),
            _ => None,
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "require_unique" => Ok(Self::RequireUnique),
            "earliest_created" => Ok(Self::EarliestCreated),
            other => Err(format!(
                "invalid match policy {other:?} (expected require_unique or earliest_created)"
            )),
        }
    }
}

/// What happened to the plan when a log was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// This planned session is now completed by the log.
    Completed(Uuid),
    /// Nothing planned for that date and sport.
    NoCandidate,
    /// Several candidates and the policy would not choose.
    Ambiguous(usize),
    /// The selected session could not be completed, typically because
    /// another writer changed it first. `actual` is its status as re-read.
    Lost {
        session_id: Uuid,
        actual: Option<SessionStatus>,
    },
    /// The candidate lookup failed; the log is stored unmatched.
    Unreconciled,
}

#[derive(Debug, Clone)]
pub struct LogOutcome {
    pub log: SessionLog,
    pub matched: MatchOutcome,
    /// Milestones that flipped to achieved because of this log.
    pub milestones_achieved: Vec<Milestone>,
}

fn validate(log: &NewSessionLog) -> Result<()> {
    if log.duration_min < 0 {
        bail!("duration must not be negative (got {} min)", log.duration_min);
    }
    if log.distance_km.is_some_and(|km| km < 0.0 || !km.is_finite()) {
        bail!("distance must be a non-negative number of km");
    }
    if let Some(rpe) = log.rpe.filter(|r| !(1..=10).contains(r)) {
        bail!("rpe must be between 1 and 10 (got {rpe})");
    }
    Ok(())
}

async fn reconcile(
    store: &dyn TrainingStore,
    log: &SessionLog,
    policy: MatchPolicy,
) -> MatchOutcome {
    let candidates = match store
        .find_planned_sessions(log.athlete_id, log.date, log.sport)
        .await
    {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::warn!(
                athlete_id = %log.athlete_id,
                log_id = %log.id,
                error = %format!("{e:#}"),
                "planned session lookup failed, log kept unmatched"
            );
            return MatchOutcome::Unreconciled;
        }
    };

    let Some(session) = policy.select(&candidates) else {
        return if candidates.is_empty() {
            MatchOutcome::NoCandidate
        } else {
            MatchOutcome::Ambiguous(candidates.len())
        };
    };

    match dispatch::complete_session(store, session.id, log.id).await {
        Ok(()) => MatchOutcome::Completed(session.id),
        Err(e) => {
            let actual = store
                .get_session(session.id)
                .await
                .ok()
                .flatten()
                .map(|s| s.status);
            tracing::warn!(
                athlete_id = %log.athlete_id,
                log_id = %log.id,
                session_id = %session.id,
                actual = ?actual,
                error = %format!("{e:#}"),
                "could not complete matched session, log kept unmatched"
            );
            MatchOutcome::Lost {
                session_id: session.id,
                actual,
            }
        }
    }
}

/// Record an activity and reconcile it against the plan.
///
/// Under the athlete's lock: append the log, look up `planned` sessions
/// for the log's (date, sport), complete the one the policy selects, then
/// evaluate achievement milestones.
///
/// Only validation and the log insert itself return `Err`. Once the log is
/// stored, reconciliation and milestone failures are logged and reported
/// through the outcome, so a caller never retries a log that exists.
pub async fn record_log(
    store: &dyn TrainingStore,
    locks: &AthleteLocks,
    new_log: &NewSessionLog,
    policy: MatchPolicy,
    now: DateTime<Utc>,
) -> Result<LogOutcome> {
    validate(new_log)?;
    let _guard = locks.lock(new_log.athlete_id).await;

    let log = store
        .insert_log(new_log)
        .await
        .context("failed to record activity log")?;

    let matched = reconcile(store, &log, policy).await;
    match matched {
        MatchOutcome::Completed(session_id) => tracing::info!(
            athlete_id = %log.athlete_id,
            log_id = %log.id,
            session_id = %session_id,
            "log completed planned session"
        ),
        MatchOutcome::NoCandidate => tracing::debug!(
            athlete_id = %log.athlete_id,
            log_id = %log.id,
            "no planned session for log"
        ),
        MatchOutcome::Ambiguous(n) => tracing::debug!(
            athlete_id = %log.athlete_id,
            log_id = %log.id,
            candidates = n,
            %policy,
            "ambiguous match, no session completed"
        ),
        MatchOutcome::Lost { .. } | MatchOutcome::Unreconciled => {}
    }

    let milestones_achieved = milestone::evaluate_log_milestones(store, &log, now)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(
                athlete_id = %log.athlete_id,
                log_id = %log.id,
                error = %format!("{e:#}"),
                "milestone evaluation failed"
            );
            Vec::new()
        });

    Ok(LogOutcome {
        log,
        matched,
        milestones_achieved,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tricoach_db::models::Sport;

    use super::*;

    fn new_log(duration_min: i32, distance_km: Option<f64>, rpe: Option<i16>) -> NewSessionLog {
        NewSessionLog {
            athlete_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            sport: Sport::Run,
            workout_type: None,
            duration_min,
            distance_km,
            rpe,
            notes: None,
        }
    }

    #[test]
    fn policy_parses_and_displays() {
        assert_eq!(
            "earliest_created".parse::<MatchPolicy>().unwrap(),
            MatchPolicy::EarliestCreated
        );
        assert_eq!(MatchPolicy::default().to_string(), "require_unique");
        assert!("newest".parse::<MatchPolicy>().is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(validate(&new_log(45, Some(8.0), Some(6))).is_ok());
        assert!(validate(&new_log(-1, None, None)).is_err());
        assert!(validate(&new_log(30, Some(-2.0), None)).is_err());
        assert!(validate(&new_log(30, None, Some(11))).is_err());
        assert!(validate(&new_log(30, None, Some(0))).is_err());
    }
}
