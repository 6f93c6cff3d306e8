//! Compliance and weekly volume aggregates.

use anyhow::Result;
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use tricoach_db::TrainingStore;
use tricoach_db::models::{PlannedSession, SessionLog, SessionStatus, Sport};

/// Status counts over a set of sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Compliance {
    pub completed: usize,
    pub skipped: usize,
    pub planned: usize,
    pub cancelled: usize,
    /// Non-cancelled sessions.
    pub total: usize,
    /// `round(100 * completed / total)`, 0 when `total` is 0.
    pub percent: u8,
}

/// Count statuses and compute the compliance percentage. Cancelled
/// (coach-replaced) sessions are excluded from the denominator.
pub fn compute_compliance(sessions: &[PlannedSession]) -> Compliance {
    let mut c = Compliance::default();
    for s in sessions {
        match s.status {
            SessionStatus::Completed => c.completed += 1,
            SessionStatus::Skipped => c.skipped += 1,
            SessionStatus::Planned => c.planned += 1,
            SessionStatus::Cancelled => c.cancelled += 1,
        }
    }
    c.total = c.completed + c.skipped + c.planned;
    c.percent = if c.total == 0 {
        0
    } else {
        (100.0 * c.completed as f64 / c.total as f64).round() as u8
    };
    c
}

/// Monday and Sunday of the week containing `day`.
pub fn week_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let since_monday = u64::from(day.weekday().num_days_from_monday());
    let monday = day - Days::new(since_monday);
    (monday, monday + Days::new(6))
}

/// Logged minutes and kilometres for one sport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SportVolume {
    pub sport: Sport,
    pub sessions: usize,
    pub minutes: i64,
    pub km: f64,
}

/// Aggregate logs per sport, in [`Sport::ALL`] order.
pub fn volume_by_sport(logs: &[SessionLog]) -> Vec<SportVolume> {
    Sport::ALL
        .iter()
        .map(|&sport| {
            let mine = logs.iter().filter(|l| l.sport == sport);
            SportVolume {
                sport,
                sessions: mine.clone().count(),
                minutes: mine.clone().map(|l| i64::from(l.duration_min)).sum(),
                km: mine.filter_map(|l| l.distance_km).sum(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub compliance: Compliance,
    pub volume: Vec<SportVolume>,
}

/// Compliance over `from <= date <= to`.
pub async fn compliance_in_range(
    store: &dyn TrainingStore,
    athlete_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Compliance> {
    let sessions = store.list_sessions_in_range(athlete_id, from, to).await?;
    Ok(compute_compliance(&sessions))
}

/// Compliance and logged volume for the Monday-Sunday week holding `today`.
pub async fn this_week_summary(
    store: &dyn TrainingStore,
    athlete_id: Uuid,
    today: NaiveDate,
) -> Result<WeekSummary> {
    let (from, to) = week_bounds(today);
    let compliance = compliance_in_range(store, athlete_id, from, to).await?;
    let logs = store.logs_in_range(athlete_id, from, to).await?;
    Ok(WeekSummary {
        from,
        to,
        compliance,
        volume: volume_by_sport(&logs),
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tricoach_db::models::{Intensity, SessionOrigin};

    use super::*;

    fn session(status: SessionStatus) -> PlannedSession {
        PlannedSession {
            id: Uuid::new_v4(),
            athlete_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            sport: Sport::Run,
            workout_type: "Z2".into(),
            duration_min: 45,
            distance_km: None,
            intensity: Intensity::Easy,
            description: String::new(),
            status,
            completed_log_id: None,
            origin: SessionOrigin::System,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_is_zero() {
        let c = compute_compliance(&[]);
        assert_eq!(c.total, 0);
        assert_eq!(c.percent, 0);
    }

    #[test]
    fn only_cancelled_is_zero() {
        let c = compute_compliance(&[session(SessionStatus::Cancelled)]);
        assert_eq!(c.total, 0);
        assert_eq!(c.cancelled, 1);
        assert_eq!(c.percent, 0);
    }

    #[test]
    fn cancelled_excluded_from_denominator() {
        let c = compute_compliance(&[
            session(SessionStatus::Completed),
            session(SessionStatus::Skipped),
            session(SessionStatus::Cancelled),
            session(SessionStatus::Cancelled),
        ]);
        assert_eq!(c.total, 2);
        assert_eq!(c.percent, 50);
    }

    #[test]
    fn rounds_to_nearest() {
        let c = compute_compliance(&[
            session(SessionStatus::Completed),
            session(SessionStatus::Completed),
            session(SessionStatus::Planned),
        ]);
        assert_eq!(c.percent, 67);
    }

    #[test]
    fn percent_stays_in_range() {
        let all_done: Vec<_> = (0..7).map(|_| session(SessionStatus::Completed)).collect();
        assert_eq!(compute_compliance(&all_done).percent, 100);
        let none_done: Vec<_> = (0..7).map(|_| session(SessionStatus::Skipped)).collect();
        assert_eq!(compute_compliance(&none_done).percent, 0);
    }

    #[test]
    fn week_runs_monday_to_sunday() {
        let thursday = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
        let (from, to) = week_bounds(thursday);
        assert_eq!(from, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2025, 6, 8).unwrap());

        let sunday = NaiveDate::from_ymd_opt(2025, 6, 8).unwrap();
        assert_eq!(week_bounds(sunday).0, from);
    }
}
