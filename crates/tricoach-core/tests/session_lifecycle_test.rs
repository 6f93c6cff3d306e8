//! Session state machine, log-to-plan matching and compliance.

use chrono::{Days, Utc};
use uuid::Uuid;

use tricoach_core::AthleteLocks;
use tricoach_core::session::compliance::{compliance_in_range, this_week_summary};
use tricoach_core::session::dispatch::{cancel_session, complete_session, skip_session, unskip_session};
use tricoach_core::session::{Actor, MatchOutcome, MatchPolicy, SessionStateMachine, record_log};
use tricoach_db::TrainingStore;
use tricoach_db::models::{SessionStatus, Sport};
use tricoach_test_utils::{Fault, MemoryStore};
use tricoach_test_utils::fixtures::{activity, monday, planned};

#[tokio::test]
async fn single_match_is_completed_with_back_reference() {
    let store = MemoryStore::new();
    let locks = AthleteLocks::new();
    let athlete = Uuid::new_v4();
    let day = monday();

    let run = store.insert_session(&planned(athlete, day, Sport::Run)).await.unwrap();

    let outcome = record_log(
        &store,
        &locks,
        &activity(athlete, day, Sport::Run, 50, Some(9.0)),
        MatchPolicy::RequireUnique,
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.matched, MatchOutcome::Completed(run.id));
    let run = store.get_session(run.id).await.unwrap().unwrap();
    assert_eq!(run.status, SessionStatus::Completed);
    assert_eq!(run.completed_log_id, Some(outcome.log.id));
}

#[tokio::test]
async fn unrelated_logs_leave_session_untouched() {
    let store = MemoryStore::new();
    let locks = AthleteLocks::new();
    let athlete = Uuid::new_v4();
    let day = monday();
    let run = store.insert_session(&planned(athlete, day, Sport::Run)).await.unwrap();

    let other_sport = activity(athlete, day, Sport::Bike, 60, Some(25.0));
    let other_day = activity(athlete, day.succ_opt().unwrap(), Sport::Run, 40, Some(7.0));
    let other_athlete = activity(Uuid::new_v4(), day, Sport::Run, 40, Some(7.0));
    for log in [other_sport, other_day, other_athlete] {
        let outcome = record_log(&store, &locks, &log, MatchPolicy::RequireUnique, Utc::now())
            .await
            .unwrap();
        assert_eq!(outcome.matched, MatchOutcome::NoCandidate);
    }

    let run = store.get_session(run.id).await.unwrap().unwrap();
    assert_eq!(run.status, SessionStatus::Planned);
    assert_eq!(run.completed_log_id, None);
    assert_eq!(store.log_count(), 3);
}

#[tokio::test]
async fn ambiguous_match_depends_on_policy() {
    let store = MemoryStore::new();
    let locks = AthleteLocks::new();
    let athlete = Uuid::new_v4();
    let day = monday();
    let first = store.insert_session(&planned(athlete, day, Sport::Swim)).await.unwrap();
    let second = store.insert_session(&planned(athlete, day, Sport::Swim)).await.unwrap();

    let log = activity(athlete, day, Sport::Swim, 45, Some(2.0));
    let unique = record_log(&store, &locks, &log, MatchPolicy::RequireUnique, Utc::now())
        .await
        .unwrap();
    assert_eq!(unique.matched, MatchOutcome::Ambiguous(2));
    assert_eq!(store.log_count(), 1, "the log is recorded anyway");

    let earliest = record_log(&store, &locks, &log, MatchPolicy::EarliestCreated, Utc::now())
        .await
        .unwrap();
    assert_eq!(earliest.matched, MatchOutcome::Completed(first.id));
    let second = store.get_session(second.id).await.unwrap().unwrap();
    assert_eq!(second.status, SessionStatus::Planned);
}

#[tokio::test]
async fn skipped_session_is_not_auto_completed() {
    let store = MemoryStore::new();
    let locks = AthleteLocks::new();
    let athlete = Uuid::new_v4();
    let day = monday();
    let s = store.insert_session(&planned(athlete, day, Sport::Bike)).await.unwrap();
    skip_session(&store, s.id).await.unwrap();

    let outcome = record_log(
        &store,
        &locks,
        &activity(athlete, day, Sport::Bike, 60, None),
        MatchPolicy::RequireUnique,
        Utc::now(),
    )
    .await
    .unwrap();
    assert_eq!(outcome.matched, MatchOutcome::NoCandidate);
}

#[tokio::test]
async fn invalid_log_is_rejected_before_writing() {
    let store = MemoryStore::new();
    let locks = AthleteLocks::new();
    let mut log = activity(Uuid::new_v4(), monday(), Sport::Run, 30, None);
    log.rpe = Some(14);
    assert!(
        record_log(&store, &locks, &log, MatchPolicy::RequireUnique, Utc::now())
            .await
            .is_err()
    );
    assert_eq!(store.log_count(), 0);
}

#[tokio::test]
async fn skip_and_unskip_round_trip() {
    let store = MemoryStore::new();
    let athlete = Uuid::new_v4();
    let s = store.insert_session(&planned(athlete, monday(), Sport::Run)).await.unwrap();

    skip_session(&store, s.id).await.unwrap();
    assert_eq!(
        store.get_session(s.id).await.unwrap().unwrap().status,
        SessionStatus::Skipped
    );
    unskip_session(&store, s.id).await.unwrap();
    assert_eq!(
        store.get_session(s.id).await.unwrap().unwrap().status,
        SessionStatus::Planned
    );
}

#[tokio::test]
async fn cancelled_is_terminal() {
    let store = MemoryStore::new();
    let s = store
        .insert_session(&planned(Uuid::new_v4(), monday(), Sport::Run))
        .await
        .unwrap();
    cancel_session(&store, s.id).await.unwrap();

    let err = skip_session(&store, s.id).await.unwrap_err();
    assert!(
        err.to_string().contains("has status cancelled, expected planned"),
        "unexpected error: {err}"
    );
    assert!(unskip_session(&store, s.id).await.is_err());
}

#[tokio::test]
async fn skipped_session_cannot_be_cancelled() {
    let store = MemoryStore::new();
    let s = store
        .insert_session(&planned(Uuid::new_v4(), monday(), Sport::Swim))
        .await
        .unwrap();
    skip_session(&store, s.id).await.unwrap();
    let err = cancel_session(&store, s.id).await.unwrap_err();
    assert!(err.to_string().contains("has status skipped"));
}

#[tokio::test]
async fn athlete_cannot_cancel_directly() {
    let store = MemoryStore::new();
    let s = store
        .insert_session(&planned(Uuid::new_v4(), monday(), Sport::Run))
        .await
        .unwrap();
    let err = SessionStateMachine::transition(
        &store,
        s.id,
        SessionStatus::Planned,
        SessionStatus::Cancelled,
        Actor::Athlete,
        None,
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("athlete may not"));
    assert_eq!(
        store.get_session(s.id).await.unwrap().unwrap().status,
        SessionStatus::Planned
    );
}

#[tokio::test]
async fn completing_twice_fails_cleanly() {
    let store = MemoryStore::new();
    let s = store
        .insert_session(&planned(Uuid::new_v4(), monday(), Sport::Run))
        .await
        .unwrap();
    let first_log = Uuid::new_v4();
    complete_session(&store, s.id, first_log).await.unwrap();

    let err = complete_session(&store, s.id, Uuid::new_v4()).await.unwrap_err();
    assert!(err.to_string().contains("has status completed"));
    let s = store.get_session(s.id).await.unwrap().unwrap();
    assert_eq!(s.completed_log_id, Some(first_log));
}

#[tokio::test]
async fn unknown_session_is_reported() {
    let store = MemoryStore::new();
    let missing = Uuid::new_v4();
    let err = skip_session(&store, missing).await.unwrap_err();
    assert_eq!(err.to_string(), format!("session {missing} not found"));
}

#[tokio::test]
async fn compliance_excludes_cancelled() {
    let store = MemoryStore::new();
    let athlete = Uuid::new_v4();
    let day = monday();

    let mut ids = Vec::new();
    for offset in 0..4 {
        let date = day.checked_add_days(Days::new(offset)).unwrap();
        ids.push(store.insert_session(&planned(athlete, date, Sport::Run)).await.unwrap().id);
    }
    complete_session(&store, ids[0], Uuid::new_v4()).await.unwrap();
    skip_session(&store, ids[1]).await.unwrap();
    cancel_session(&store, ids[2]).await.unwrap();

    let to = day.checked_add_days(Days::new(6)).unwrap();
    let c = compliance_in_range(&store, athlete, day, to).await.unwrap();
    assert_eq!(c.total, 3);
    assert_eq!(c.cancelled, 1);
    assert_eq!(c.percent, 33);

    let empty = compliance_in_range(&store, Uuid::new_v4(), day, to).await.unwrap();
    assert_eq!(empty.percent, 0);
}

#[tokio::test]
async fn week_summary_aggregates_logged_volume() {
    let store = MemoryStore::new();
    let locks = AthleteLocks::new();
    let athlete = Uuid::new_v4();
    let wednesday = monday().checked_add_days(Days::new(2)).unwrap();

    for log in [
        activity(athlete, monday(), Sport::Run, 40, Some(8.0)),
        activity(athlete, wednesday, Sport::Run, 30, Some(6.0)),
        activity(athlete, wednesday, Sport::Bike, 90, Some(40.0)),
        // Previous week: excluded.
        activity(athlete, monday().pred_opt().unwrap(), Sport::Run, 100, Some(20.0)),
    ] {
        record_log(&store, &locks, &log, MatchPolicy::RequireUnique, Utc::now())
            .await
            .unwrap();
    }

    let week = this_week_summary(&store, athlete, wednesday).await.unwrap();
    assert_eq!(week.from, monday());
    let run = week.volume.iter().find(|v| v.sport == Sport::Run).unwrap();
    assert_eq!(run.sessions, 2);
    assert_eq!(run.minutes, 70);
    assert!((run.km - 14.0).abs() < 1e-9);
    let swim = week.volume.iter().find(|v| v.sport == Sport::Swim).unwrap();
    assert_eq!(swim.sessions, 0);
}

#[tokio::test]
async fn concurrent_logs_complete_the_session_once() {
    use std::sync::Arc;

    let store = Arc::new(MemoryStore::new());
    let locks = Arc::new(AthleteLocks::new());
    let athlete = Uuid::new_v4();
    let day = monday();
    let s = store.insert_session(&planned(athlete, day, Sport::Run)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let store = Arc::clone(&store);
        let locks = Arc::clone(&locks);
        handles.push(tokio::spawn(async move {
            record_log(
                store.as_ref(),
                &locks,
                &activity(athlete, day, Sport::Run, 30, None),
                MatchPolicy::RequireUnique,
                Utc::now(),
            )
            .await
            .unwrap()
        }));
    }
    let mut completed = 0;
    for h in handles {
        if matches!(h.await.unwrap().matched, MatchOutcome::Completed(_)) {
            completed += 1;
        }
    }
    assert_eq!(completed, 1);
    assert_eq!(
        store.get_session(s.id).await.unwrap().unwrap().status,
        SessionStatus::Completed
    );
}

#[tokio::test]
async fn failed_completion_keeps_the_log() {
    let store = MemoryStore::new();
    let locks = AthleteLocks::new();
    let athlete = Uuid::new_v4();
    let day = monday();
    let run = store.insert_session(&planned(athlete, day, Sport::Run)).await.unwrap();
    store.fail(Fault::TransitionSession);

    let outcome = record_log(
        &store,
        &locks,
        &activity(athlete, day, Sport::Run, 40, Some(8.0)),
        MatchPolicy::RequireUnique,
        Utc::now(),
    )
    .await
    .expect("log is stored even when completion fails");

    assert_eq!(
        outcome.matched,
        MatchOutcome::Lost {
            session_id: run.id,
            actual: Some(SessionStatus::Planned),
        }
    );
    assert_eq!(store.log_count(), 1);
    let run = store.get_session(run.id).await.unwrap().unwrap();
    assert_eq!(run.status, SessionStatus::Planned);
    assert_eq!(run.completed_log_id, None);
}

#[tokio::test]
async fn lookup_and_milestone_failures_do_not_fail_the_log() {
    let store = MemoryStore::new();
    let locks = AthleteLocks::new();
    let athlete = Uuid::new_v4();
    let day = monday();
    store.insert_session(&planned(athlete, day, Sport::Swim)).await.unwrap();
    store.fail(Fault::FindPlannedSessions);
    store.fail(Fault::ListMilestones);

    let outcome = record_log(
        &store,
        &locks,
        &activity(athlete, day, Sport::Swim, 30, Some(1.5)),
        MatchPolicy::RequireUnique,
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.matched, MatchOutcome::Unreconciled);
    assert!(outcome.milestones_achieved.is_empty());
    assert_eq!(store.log_count(), 1);

    store.heal(Fault::FindPlannedSessions);
    let retry = record_log(
        &store,
        &locks,
        &activity(athlete, day, Sport::Swim, 30, Some(1.5)),
        MatchPolicy::RequireUnique,
        Utc::now(),
    )
    .await
    .unwrap();
    assert!(matches!(retry.matched, MatchOutcome::Completed(_)));
}
