//! Coach protocol: change application, the advisory call contract, and
//! failure handling.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tricoach_core::AthleteLocks;
use tricoach_core::coach::{
    AdvisoryClient, AdvisoryError, AdvisoryMode, AdvisoryRequest, AdvisoryResponse, Change,
    ChangeOutcome, CoachCall, HttpAdvisoryClient, apply_changes, parse_changes, run_coach,
};
use tricoach_db::TrainingStore;
use tricoach_db::models::{Intensity, MessageRole, SessionOrigin, SessionStatus, Sport};
use tricoach_test_utils::{Fault, MemoryStore};
use tricoach_test_utils::fixtures::{monday, planned, sub5_profile};

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// Returns a canned reply and records the requests it saw.
struct ScriptedAdvisor {
    reply: Result<AdvisoryResponse, fn() -> AdvisoryError>,
    delay: Duration,
    seen: Mutex<Vec<AdvisoryRequest>>,
}

impl ScriptedAdvisor {
    fn replying(message: &str, plan_changes: serde_json::Value) -> Self {
        Self {
            reply: Ok(AdvisoryResponse {
                message: message.to_string(),
                plan_changes,
            }),
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            reply: Err(|| AdvisoryError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            }),
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn slow(message: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::replying(message, serde_json::Value::Null)
        }
    }

    fn requests(&self) -> Vec<AdvisoryRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl AdvisoryClient for ScriptedAdvisor {
    async fn advise(&self, request: &AdvisoryRequest) -> Result<AdvisoryResponse, AdvisoryError> {
        self.seen.lock().unwrap().push(request.clone());
        tokio::time::sleep(self.delay).await;
        match &self.reply {
            Ok(r) => Ok(r.clone()),
            Err(make) => Err(make()),
        }
    }
}

struct Fixture {
    store: MemoryStore,
    locks: AthleteLocks,
    athlete: Uuid,
}

impl Fixture {
    async fn new() -> Self {
        let store = MemoryStore::new();
        let profile = sub5_profile(monday(), 10);
        let athlete = profile.athlete_id;
        store.upsert_profile(&profile).await.unwrap();
        Self {
            store,
            locks: AthleteLocks::new(),
            athlete,
        }
    }

    fn call(&self, mode: AdvisoryMode, message: Option<&str>) -> CoachCall {
        CoachCall {
            athlete_id: self.athlete,
            mode,
            user_message: message.map(str::to_string),
            today: monday(),
        }
    }
}

// ---------------------------------------------------------------------------
// Change application
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_inserts_one_coach_session_with_defaults() {
    let f = Fixture::new().await;
    let changes = parse_changes(&json!([{"action": "add", "date": "2025-06-01", "sport": "Run"}]));

    let outcomes = apply_changes(&f.store, f.athlete, &changes).await;
    assert!(outcomes[0].is_applied());

    let sessions = f.store.list_sessions(f.athlete).await.unwrap();
    assert_eq!(sessions.len(), 1);
    let s = &sessions[0];
    assert_eq!(s.date, date("2025-06-01"));
    assert_eq!(s.sport, Sport::Run);
    assert_eq!(s.status, SessionStatus::Planned);
    assert_eq!(s.origin, SessionOrigin::Coach);
    assert_eq!(s.duration_min, 45);
    assert_eq!(s.intensity, Intensity::Easy);
    assert_eq!(s.workout_type, "Z2");
}

#[tokio::test]
async fn reschedule_cancels_and_clones() {
    let f = Fixture::new().await;
    let mut original = planned(f.athlete, date("2025-06-03"), Sport::Bike);
    original.workout_type = "Intervals".to_string();
    original.duration_min = 75;
    original.distance_km = Some(32.0);
    original.intensity = Intensity::Hard;
    let x = f.store.insert_session(&original).await.unwrap();

    let changes = parse_changes(&json!([
        {"action": "reschedule", "sessionId": x.id, "newDate": "2025-06-05"}
    ]));
    let outcomes = apply_changes(&f.store, f.athlete, &changes).await;
    let ChangeOutcome::Applied { created: Some(clone_id), .. } = &outcomes[0] else {
        panic!("expected applied reschedule, got {:?}", outcomes[0]);
    };

    let x = f.store.get_session(x.id).await.unwrap().unwrap();
    assert_eq!(x.status, SessionStatus::Cancelled);

    let on_new_date: Vec<_> = f
        .store
        .list_sessions(f.athlete)
        .await
        .unwrap()
        .into_iter()
        .filter(|s| s.date == date("2025-06-05"))
        .collect();
    assert_eq!(on_new_date.len(), 1);
    let clone = &on_new_date[0];
    assert_eq!(clone.id, *clone_id);
    assert_eq!(clone.status, SessionStatus::Planned);
    assert_eq!(clone.origin, SessionOrigin::Coach);
    assert_eq!(clone.sport, Sport::Bike);
    assert_eq!(clone.workout_type, "Intervals");
    assert_eq!(clone.duration_min, 75);
    assert_eq!(clone.distance_km, Some(32.0));
    assert_eq!(clone.intensity, Intensity::Hard);
    assert_eq!(clone.description, x.description);
}

#[tokio::test]
async fn failed_change_does_not_abort_the_rest() {
    let f = Fixture::new().await;
    let keep = f
        .store
        .insert_session(&planned(f.athlete, date("2025-06-04"), Sport::Swim))
        .await
        .unwrap();

    let changes = vec![
        Change::Cancel { session_id: Uuid::new_v4() },
        Change::Cancel { session_id: keep.id },
        // Already cancelled by the previous change.
        Change::Reschedule { session_id: keep.id, new_date: date("2025-06-06") },
    ];
    let outcomes = apply_changes(&f.store, f.athlete, &changes).await;

    assert!(matches!(&outcomes[0], ChangeOutcome::Skipped { reason, .. } if reason.contains("not found")));
    assert!(outcomes[1].is_applied());
    assert!(matches!(&outcomes[2], ChangeOutcome::Skipped { reason, .. } if reason.contains("has status cancelled")));
    assert_eq!(f.store.session_count(), 1, "no clone for the failed reschedule");
}

#[tokio::test]
async fn reschedule_with_failed_insert_keeps_the_original() {
    let f = Fixture::new().await;
    let x = f
        .store
        .insert_session(&planned(f.athlete, date("2025-06-03"), Sport::Run))
        .await
        .unwrap();
    f.store.fail(Fault::InsertSession);

    let changes = [Change::Reschedule { session_id: x.id, new_date: date("2025-06-05") }];
    let outcomes = apply_changes(&f.store, f.athlete, &changes).await;

    assert!(matches!(&outcomes[0], ChangeOutcome::Skipped { reason, .. } if reason.contains("injected")));
    assert_eq!(
        f.store.get_session(x.id).await.unwrap().unwrap().status,
        SessionStatus::Planned
    );
    assert_eq!(f.store.session_count(), 1);
}

#[tokio::test]
async fn reschedule_with_failed_cancel_removes_the_copy() {
    let f = Fixture::new().await;
    let x = f
        .store
        .insert_session(&planned(f.athlete, date("2025-06-03"), Sport::Run))
        .await
        .unwrap();
    f.store.fail(Fault::TransitionSession);

    let changes = [Change::Reschedule { session_id: x.id, new_date: date("2025-06-05") }];
    let outcomes = apply_changes(&f.store, f.athlete, &changes).await;

    assert!(!outcomes[0].is_applied());
    let sessions = f.store.list_sessions(f.athlete).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, x.id);
    assert_eq!(sessions[0].status, SessionStatus::Planned);
}

#[tokio::test]
async fn reschedule_reports_skipped_when_the_copy_cannot_be_removed() {
    let f = Fixture::new().await;
    let x = f
        .store
        .insert_session(&planned(f.athlete, date("2025-06-03"), Sport::Run))
        .await
        .unwrap();
    f.store.fail(Fault::TransitionSession);
    f.store.fail(Fault::DeleteSessions);

    let changes = [Change::Reschedule { session_id: x.id, new_date: date("2025-06-05") }];
    let outcomes = apply_changes(&f.store, f.athlete, &changes).await;

    assert!(!outcomes[0].is_applied());
    assert_eq!(
        f.store.get_session(x.id).await.unwrap().unwrap().status,
        SessionStatus::Planned
    );
    assert_eq!(f.store.session_count(), 2);
}

#[tokio::test]
async fn changes_cannot_touch_another_athletes_sessions() {
    let f = Fixture::new().await;
    let foreign = f
        .store
        .insert_session(&planned(Uuid::new_v4(), date("2025-06-04"), Sport::Run))
        .await
        .unwrap();

    let outcomes =
        apply_changes(&f.store, f.athlete, &[Change::Cancel { session_id: foreign.id }]).await;
    assert!(!outcomes[0].is_applied());
    assert_eq!(
        f.store.get_session(foreign.id).await.unwrap().unwrap().status,
        SessionStatus::Planned
    );
}

// ---------------------------------------------------------------------------
// run_coach
// ---------------------------------------------------------------------------

#[tokio::test]
async fn block_in_prose_is_stripped_and_applied() {
    let f = Fixture::new().await;
    let s = f
        .store
        .insert_session(&planned(f.athlete, date("2025-06-04"), Sport::Run))
        .await
        .unwrap();
    let prose = format!(
        "Your legs need a break.\n[PLAN_CHANGES][{{\"action\":\"skip\",\"sessionId\":\"{}\"}}][/PLAN_CHANGES]",
        s.id
    );
    let advisor = ScriptedAdvisor::replying(&prose, serde_json::Value::Null);

    let reply = run_coach(
        &f.store,
        &f.locks,
        &advisor,
        &f.call(AdvisoryMode::Chat, Some("I'm exhausted")),
        Duration::from_secs(5),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(reply.message, "Your legs need a break.");
    assert_eq!(reply.outcomes.len(), 1);
    assert_eq!(
        f.store.get_session(s.id).await.unwrap().unwrap().status,
        SessionStatus::Cancelled
    );
}

#[tokio::test]
async fn plan_changes_field_is_used_without_a_block() {
    let f = Fixture::new().await;
    let advisor = ScriptedAdvisor::replying(
        "Adding an easy run.",
        json!([{"action": "add", "date": "2025-06-07", "sport": "run"}]),
    );
    let reply = run_coach(
        &f.store,
        &f.locks,
        &advisor,
        &f.call(AdvisoryMode::Summary, None),
        Duration::from_secs(5),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(reply.outcomes.len(), 1);
    assert_eq!(f.store.session_count(), 1);
}

#[tokio::test]
async fn block_takes_precedence_over_field() {
    let f = Fixture::new().await;
    let advisor = ScriptedAdvisor::replying(
        "No changes needed. [PLAN_CHANGES][][/PLAN_CHANGES]",
        json!([{"action": "add", "date": "2025-06-07", "sport": "Run"}]),
    );
    let reply = run_coach(
        &f.store,
        &f.locks,
        &advisor,
        &f.call(AdvisoryMode::Summary, None),
        Duration::from_secs(5),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert!(reply.outcomes.is_empty());
    assert_eq!(f.store.session_count(), 0);
}

#[tokio::test]
async fn malformed_block_still_shows_prose() {
    let f = Fixture::new().await;
    let advisor = ScriptedAdvisor::replying(
        "Keep going! [PLAN_CHANGES] {oops [/PLAN_CHANGES]",
        serde_json::Value::Null,
    );
    let reply = run_coach(
        &f.store,
        &f.locks,
        &advisor,
        &f.call(AdvisoryMode::Chat, Some("How am I doing?")),
        Duration::from_secs(5),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(reply.message, "Keep going!");
    assert!(reply.outcomes.is_empty());
}

#[tokio::test]
async fn chat_turns_are_persisted_and_replayed() {
    let f = Fixture::new().await;
    let advisor = ScriptedAdvisor::replying("Sure thing.", serde_json::Value::Null);

    for msg in ["first question", "second question"] {
        run_coach(
            &f.store,
            &f.locks,
            &advisor,
            &f.call(AdvisoryMode::Chat, Some(msg)),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    }

    let history = f.store.recent_messages(f.athlete, 20).await.unwrap();
    let roles: Vec<_> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        [MessageRole::User, MessageRole::Assistant, MessageRole::User, MessageRole::Assistant]
    );

    let requests = advisor.requests();
    assert_eq!(requests[0].chat_history.as_ref().unwrap().len(), 0);
    let replayed = requests[1].chat_history.as_ref().unwrap();
    assert_eq!(replayed.len(), 2);
    assert_eq!(replayed[0].content, "first question");
}

#[tokio::test]
async fn summary_mode_sends_no_history_and_persists_nothing() {
    let f = Fixture::new().await;
    let advisor = ScriptedAdvisor::replying("Solid week.", serde_json::Value::Null);
    run_coach(
        &f.store,
        &f.locks,
        &advisor,
        &f.call(AdvisoryMode::Summary, None),
        Duration::from_secs(5),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let req = &advisor.requests()[0];
    assert!(req.chat_history.is_none());
    assert!(req.user_message.is_none());
    assert!(f.store.recent_messages(f.athlete, 20).await.unwrap().is_empty());
}

#[tokio::test]
async fn context_carries_upcoming_session_ids() {
    let f = Fixture::new().await;
    let s = f
        .store
        .insert_session(&planned(f.athlete, monday(), Sport::Swim))
        .await
        .unwrap();
    let advisor = ScriptedAdvisor::replying("ok", serde_json::Value::Null);
    run_coach(
        &f.store,
        &f.locks,
        &advisor,
        &f.call(AdvisoryMode::Nutrition, None),
        Duration::from_secs(5),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let body = serde_json::to_value(&advisor.requests()[0]).unwrap();
    assert_eq!(body["mode"], "nutrition");
    assert_eq!(
        body["athleteContext"]["upcomingSessions"][0]["id"],
        json!(s.id.to_string())
    );
}

#[tokio::test]
async fn advisory_failure_mutates_nothing() {
    let f = Fixture::new().await;
    let advisor = ScriptedAdvisor::failing();
    let err = run_coach(
        &f.store,
        &f.locks,
        &advisor,
        &f.call(AdvisoryMode::Chat, Some("hello")),
        Duration::from_secs(5),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<AdvisoryError>(),
        Some(AdvisoryError::Status { status: 502, .. })
    ));
    assert!(f.store.recent_messages(f.athlete, 20).await.unwrap().is_empty());
    assert_eq!(f.store.session_count(), 0);
}

#[tokio::test]
async fn slow_advisory_times_out() {
    let f = Fixture::new().await;
    let advisor = ScriptedAdvisor::slow("too late", Duration::from_secs(5));
    let err = run_coach(
        &f.store,
        &f.locks,
        &advisor,
        &f.call(AdvisoryMode::Chat, Some("hello")),
        Duration::from_millis(50),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AdvisoryError>(),
        Some(AdvisoryError::Timeout(_))
    ));
    assert!(f.store.recent_messages(f.athlete, 20).await.unwrap().is_empty());
}

#[tokio::test]
async fn cancelled_call_mutates_nothing() {
    let f = Fixture::new().await;
    let advisor = ScriptedAdvisor::slow("never", Duration::from_secs(5));
    let token = CancellationToken::new();
    token.cancel();
    let err = run_coach(
        &f.store,
        &f.locks,
        &advisor,
        &f.call(AdvisoryMode::Chat, Some("hello")),
        Duration::from_secs(10),
        &token,
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AdvisoryError>(),
        Some(AdvisoryError::Cancelled)
    ));
}

#[tokio::test]
async fn chat_without_message_is_rejected() {
    let f = Fixture::new().await;
    let advisor = ScriptedAdvisor::replying("unused", serde_json::Value::Null);
    assert!(
        run_coach(
            &f.store,
            &f.locks,
            &advisor,
            &f.call(AdvisoryMode::Chat, Some("   ")),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .is_err()
    );
    assert!(advisor.requests().is_empty());
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

#[tokio::test]
async fn http_client_posts_camel_case_with_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/advise"))
        .and(header("authorization", "Bearer secret-key"))
        .and(body_partial_json(json!({"mode": "chat", "userMessage": "hi"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Hello! [PLAN_CHANGES][{\"action\":\"add\",\"date\":\"2025-06-07\",\"sport\":\"Swim\"}][/PLAN_CHANGES]",
            "planChanges": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let f = Fixture::new().await;
    let client = HttpAdvisoryClient::new(
        format!("{}/advise", server.uri()),
        Some("secret-key".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();

    let reply = run_coach(
        &f.store,
        &f.locks,
        &client,
        &f.call(AdvisoryMode::Chat, Some("hi")),
        Duration::from_secs(5),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(reply.message, "Hello!");
    assert_eq!(f.store.session_count(), 1);
}

#[tokio::test]
async fn http_client_surfaces_non_2xx() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let f = Fixture::new().await;
    let client = HttpAdvisoryClient::new(server.uri(), None, Duration::from_secs(5)).unwrap();
    let err = run_coach(
        &f.store,
        &f.locks,
        &client,
        &f.call(AdvisoryMode::Summary, None),
        Duration::from_secs(5),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    match err.downcast_ref::<AdvisoryError>() {
        Some(AdvisoryError::Status { status, body }) => {
            assert_eq!(*status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn http_client_rejects_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let f = Fixture::new().await;
    let client = HttpAdvisoryClient::new(server.uri(), None, Duration::from_secs(5)).unwrap();
    let err = run_coach(
        &f.store,
        &f.locks,
        &client,
        &f.call(AdvisoryMode::Summary, None),
        Duration::from_secs(5),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AdvisoryError>(),
        Some(AdvisoryError::Malformed(_))
    ));
}
