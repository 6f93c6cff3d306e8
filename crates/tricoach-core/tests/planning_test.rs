//! Plan generation and onboarding against the in-memory store.

use chrono::{Days, Utc};

use tricoach_core::AthleteLocks;
use tricoach_core::onboarding::{complete_onboarding, save_profile_step};
use tricoach_core::planning::{
    DEFAULT_HORIZON_DAYS, RealismClass, check_goal_realism, generate_initial_plan,
    phase_for_weeks, weeks_to_race,
};
use tricoach_db::TrainingStore;
use tricoach_db::models::{MilestoneKind, MilestoneStatus, Phase, SessionOrigin, SessionStatus};
use tricoach_test_utils::MemoryStore;
use tricoach_test_utils::fixtures::{beginner_profile, monday, sub5_profile};

#[test]
fn sub5_intermediate_ten_weeks_out() {
    let today = monday();
    let profile = sub5_profile(today, 10);
    let plan = generate_initial_plan(&profile, today);

    assert_eq!(plan.phase, Phase::Peak);
    assert_eq!(plan.weekly_swim_sessions, 3);
    assert_eq!(plan.weekly_bike_km, 70.0);
    assert_eq!(plan.weekly_run_km, 30.0);
    assert_eq!(plan.weekly_strength_sessions, 2);
}

#[test]
fn phase_around_each_breakpoint() {
    let today = monday();
    let cases = [
        (21, Phase::Base),
        (20, Phase::Build),
        (13, Phase::Build),
        (12, Phase::Peak),
        (4, Phase::Peak),
        (3, Phase::Taper),
        (0, Phase::Taper),
    ];
    for (weeks, expected) in cases {
        let profile = sub5_profile(today, weeks);
        assert_eq!(
            generate_initial_plan(&profile, today).phase,
            expected,
            "{weeks} weeks out"
        );
    }
}

#[test]
fn partial_weeks_floor() {
    let today = monday();
    // 12 weeks and 6 days is still 12 whole weeks: Peak.
    let race = today.checked_add_days(Days::new(12 * 7 + 6)).unwrap();
    assert_eq!(weeks_to_race(race, today), 12);
    assert_eq!(phase_for_weeks(weeks_to_race(race, today)), Phase::Peak);
    // One more day crosses into Build.
    let race = race.checked_add_days(Days::new(1)).unwrap();
    assert_eq!(phase_for_weeks(weeks_to_race(race, today)), Phase::Build);
}

#[test]
fn fixture_athlete_is_realistic_for_sub5() {
    let profile = sub5_profile(monday(), 10);
    assert_eq!(check_goal_realism(&profile).class, RealismClass::Achievable);
}

#[tokio::test]
async fn onboarding_builds_plan_sessions_and_milestones() {
    let store = MemoryStore::new();
    let locks = AthleteLocks::new();
    let today = monday();
    let mut profile = sub5_profile(today, 10);
    profile.onboarding_step = 3;
    let athlete = profile.athlete_id;

    let saved = save_profile_step(&store, &profile).await.unwrap();
    assert!(!saved.completed);
    assert!(store.get_plan(athlete).await.unwrap().is_none());

    let outcome = complete_onboarding(&store, &locks, athlete, today, DEFAULT_HORIZON_DAYS, Utc::now())
        .await
        .unwrap();

    assert!(outcome.profile.completed);
    assert_eq!(outcome.plan.phase, Phase::Peak);
    assert!(outcome.refresh.inserted > 0);

    let sessions = store.list_sessions(athlete).await.unwrap();
    assert_eq!(sessions.len(), outcome.refresh.inserted);
    assert!(sessions.iter().all(|s| s.status == SessionStatus::Planned));
    assert!(sessions.iter().all(|s| s.origin == SessionOrigin::System));

    let milestones = store.list_milestones(athlete).await.unwrap();
    assert_eq!(milestones.len(), outcome.milestones_seeded);
    let date_based: Vec<_> = milestones
        .iter()
        .filter(|m| m.kind == MilestoneKind::DateBased)
        .collect();
    assert_eq!(date_based.len(), 4);
    // Build (20 weeks before) and Peak (12 weeks before) have already begun.
    let reached = date_based
        .iter()
        .filter(|m| m.status == MilestoneStatus::Achieved)
        .count();
    assert_eq!(reached, 2);
}

#[tokio::test]
async fn reonboarding_replaces_plan_without_duplicating() {
    let store = MemoryStore::new();
    let locks = AthleteLocks::new();
    let today = monday();
    let profile = beginner_profile(today, 30);
    let athlete = profile.athlete_id;
    save_profile_step(&store, &profile).await.unwrap();

    let first = complete_onboarding(&store, &locks, athlete, today, 14, Utc::now())
        .await
        .unwrap();
    assert_eq!(first.plan.phase, Phase::Base);
    let sessions_before = store.list_sessions(athlete).await.unwrap().len();
    let milestones_before = store.list_milestones(athlete).await.unwrap().len();

    let second = complete_onboarding(&store, &locks, athlete, today, 14, Utc::now())
        .await
        .unwrap();
    assert_ne!(first.plan.id, second.plan.id);
    assert_eq!(store.list_sessions(athlete).await.unwrap().len(), sessions_before);
    assert_eq!(store.list_milestones(athlete).await.unwrap().len(), milestones_before);
}

#[tokio::test]
async fn onboarding_requires_a_profile() {
    let store = MemoryStore::new();
    let locks = AthleteLocks::new();
    let err = complete_onboarding(
        &store,
        &locks,
        uuid::Uuid::new_v4(),
        monday(),
        DEFAULT_HORIZON_DAYS,
        Utc::now(),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("no profile"));
}
