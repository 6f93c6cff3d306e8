//! Default milestones created when onboarding completes.

use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Days, NaiveDate, Utc};
use uuid::Uuid;

use tricoach_db::TrainingStore;
use tricoach_db::models::{MilestoneKind, MilestoneRule, MilestoneStatus, NewMilestone, Sport};

/// (title, weeks before race). The weeks mirror the phase breakpoints.
const DATE_MILESTONES: &[(&str, u64)] = &[
    ("Build phase begins", 20),
    ("Peak phase begins", 12),
    ("Taper begins", 3),
    ("Race day", 0),
];

fn achievement_milestones() -> Vec<(&'static str, MilestoneRule)> {
    vec![
        (
            "Swim the race distance (1.9 km)",
            MilestoneRule {
                sport: Sport::Swim,
                min_duration: None,
                min_distance: Some(1.9),
            },
        ),
        (
            "First 90 km or 3-hour ride",
            MilestoneRule {
                sport: Sport::Bike,
                min_duration: Some(180),
                min_distance: Some(90.0),
            },
        ),
        (
            "First half-marathon run",
            MilestoneRule {
                sport: Sport::Run,
                min_duration: None,
                min_distance: Some(21.1),
            },
        ),
        (
            "First 2-hour run",
            MilestoneRule {
                sport: Sport::Run,
                min_duration: Some(120),
                min_distance: None,
            },
        ),
    ]
}

/// Replace upcoming date milestones from `race_date` and add any default
/// achievement milestone the athlete does not have yet (matched by title).
///
/// Date milestones that are not in the future are stored achieved.
/// Returns the number of milestones inserted.
pub async fn seed_milestones(
    store: &dyn TrainingStore,
    athlete_id: Uuid,
    race_date: Option<NaiveDate>,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<usize> {
    store.delete_upcoming_date_milestones(athlete_id).await?;
    let existing: HashSet<String> = store
        .list_milestones(athlete_id)
        .await?
        .into_iter()
        .map(|m| m.title)
        .collect();

    let mut inserted = 0;

    if let Some(race) = race_date {
        for &(title, weeks_before) in DATE_MILESTONES {
            if existing.contains(title) {
                continue;
            }
            let Some(date) = race.checked_sub_days(Days::new(weeks_before * 7)) else {
                continue;
            };
            let reached = date <= today;
            store
                .insert_milestone(&NewMilestone {
                    athlete_id,
                    title: title.to_string(),
                    kind: MilestoneKind::DateBased,
                    target_date: Some(date),
                    rule: None,
                    status: if reached {
                        MilestoneStatus::Achieved
                    } else {
                        MilestoneStatus::Upcoming
                    },
                    achieved_at: reached.then_some(now),
                })
                .await?;
            inserted += 1;
        }
    }

    for (title, rule) in achievement_milestones() {
        if existing.contains(title) {
            continue;
        }
        store
            .insert_milestone(&NewMilestone {
                athlete_id,
                title: title.to_string(),
                kind: MilestoneKind::AchievementBased,
                target_date: None,
                rule: Some(rule),
                status: MilestoneStatus::Upcoming,
                achieved_at: None,
            })
            .await?;
        inserted += 1;
    }

    tracing::info!(athlete_id = %athlete_id, inserted, "milestones seeded");
    Ok(inserted)
}
