//! The `TrainingStore` trait: the persistence interface the engine talks to.
//!
//! Every operation in `tricoach-core` takes a `&dyn TrainingStore`, so the
//! engine does not care whether rows live in PostgreSQL ([`PgStore`]) or in
//! memory (`tricoach_test_utils::MemoryStore`). Each call is an
//! independently committed unit; there is no cross-call transaction.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    AthleteProfile, BodyMetricsEntry, ChannelLink, CoachMessage, MessageRole, Milestone,
    NewBodyMetrics, NewMilestone, NewPlannedSession, NewSessionLog, NewTrainingPlan, PairingCode,
    PlannedSession, SessionLog, SessionStatus, Sport, TrainingPlan,
};
use crate::queries::{
    conversations, logs, metrics, milestones, pairing, plans, profiles, sessions,
};

/// Persistence interface for athlete-partitioned training data.
///
/// # Object Safety
///
/// The trait is object-safe so services can hold `Arc<dyn TrainingStore>`.
#[async_trait]
pub trait TrainingStore: Send + Sync {
    // -- profiles ----------------------------------------------------------

    async fn get_profile(&self, athlete_id: Uuid) -> Result<Option<AthleteProfile>>;

    async fn upsert_profile(&self, profile: &AthleteProfile) -> Result<AthleteProfile>;

    // -- plans -------------------------------------------------------------

    async fn get_plan(&self, athlete_id: Uuid) -> Result<Option<TrainingPlan>>;

    async fn upsert_plan(&self, plan: &NewTrainingPlan) -> Result<TrainingPlan>;

    // -- planned sessions --------------------------------------------------

    async fn insert_session(&self, session: &NewPlannedSession) -> Result<PlannedSession>;

    async fn get_session(&self, id: Uuid) -> Result<Option<PlannedSession>>;

    /// Every session of the athlete, by date then creation time.
    async fn list_sessions(&self, athlete_id: Uuid) -> Result<Vec<PlannedSession>>;

    /// Sessions with `from <= date <= to`, by date then creation time.
    async fn list_sessions_in_range(
        &self,
        athlete_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PlannedSession>>;

    /// `planned` sessions for (date, sport), oldest first.
    async fn find_planned_sessions(
        &self,
        athlete_id: Uuid,
        date: NaiveDate,
        sport: Sport,
    ) -> Result<Vec<PlannedSession>>;

    /// Up to `limit` `planned` sessions dated on or after `from`, soonest first.
    async fn upcoming_sessions(
        &self,
        athlete_id: Uuid,
        from: NaiveDate,
        limit: i64,
    ) -> Result<Vec<PlannedSession>>;

    /// Compare-and-set on status. Returns rows affected (0 or 1).
    async fn transition_session_status(
        &self,
        id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
        completed_log_id: Option<Uuid>,
    ) -> Result<u64>;

    async fn delete_sessions(&self, ids: &[Uuid]) -> Result<u64>;

    // -- activity logs -----------------------------------------------------

    async fn insert_log(&self, log: &NewSessionLog) -> Result<SessionLog>;

    /// Newest first.
    async fn recent_logs(&self, athlete_id: Uuid, limit: i64) -> Result<Vec<SessionLog>>;

    /// Newest first.
    async fn recent_logs_for_sport(
        &self,
        athlete_id: Uuid,
        sport: Sport,
        limit: i64,
    ) -> Result<Vec<SessionLog>>;

    /// Logs with `from <= date <= to`, oldest first.
    async fn logs_in_range(
        &self,
        athlete_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SessionLog>>;

    // -- body metrics ------------------------------------------------------

    async fn upsert_body_metrics(&self, entry: &NewBodyMetrics) -> Result<BodyMetricsEntry>;

    /// Newest first.
    async fn recent_body_metrics(&self, athlete_id: Uuid, limit: i64)
    -> Result<Vec<BodyMetricsEntry>>;

    // -- milestones --------------------------------------------------------

    async fn insert_milestone(&self, milestone: &NewMilestone) -> Result<Milestone>;

    async fn list_milestones(&self, athlete_id: Uuid) -> Result<Vec<Milestone>>;

    /// One-way upcoming -> achieved. Returns rows affected (0 if already achieved).
    async fn mark_milestone_achieved(&self, id: Uuid, achieved_at: DateTime<Utc>) -> Result<u64>;

    async fn delete_upcoming_date_milestones(&self, athlete_id: Uuid) -> Result<u64>;

    // -- coach conversation ------------------------------------------------

    async fn append_message(
        &self,
        athlete_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<CoachMessage>;

    /// The last `limit` turns in chronological order.
    async fn recent_messages(&self, athlete_id: Uuid, limit: i64) -> Result<Vec<CoachMessage>>;

    // -- pairing & channel links -------------------------------------------

    /// Issue a code, consuming any code the athlete still holds.
    async fn replace_pairing_code(
        &self,
        athlete_id: Uuid,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PairingCode>;

    async fn pairing_code_active(&self, code_hash: &str, now: DateTime<Utc>) -> Result<bool>;

    /// Consume an active code; `None` when unknown, expired, or consumed.
    async fn consume_pairing_code(
        &self,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PairingCode>>;

    async fn upsert_channel_link(
        &self,
        channel: &str,
        external_id: &str,
        athlete_id: Uuid,
    ) -> Result<ChannelLink>;

    async fn find_channel_link(&self, channel: &str, external_id: &str)
    -> Result<Option<ChannelLink>>;
}

// Compile-time assertion: TrainingStore must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn TrainingStore) {}
};

/// [`TrainingStore`] backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TrainingStore for PgStore {
    async fn get_profile(&self, athlete_id: Uuid) -> Result<Option<AthleteProfile>> {
        profiles::get_profile(&self.pool, athlete_id).await
    }

    async fn upsert_profile(&self, profile: &AthleteProfile) -> Result<AthleteProfile> {
        profiles::upsert_profile(&self.pool, profile).await
    }

    async fn get_plan(&self, athlete_id: Uuid) -> Result<Option<TrainingPlan>> {
        plans::get_plan(&self.pool, athlete_id).await
    }

    async fn upsert_plan(&self, plan: &NewTrainingPlan) -> Result<TrainingPlan> {
        plans::upsert_plan(&self.pool, plan).await
    }

    async fn insert_session(&self, session: &NewPlannedSession) -> Result<PlannedSession> {
        sessions::insert_session(&self.pool, session).await
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<PlannedSession>> {
        sessions::get_session(&self.pool, id).await
    }

    async fn list_sessions(&self, athlete_id: Uuid) -> Result<Vec<PlannedSession>> {
        sessions::list_sessions(&self.pool, athlete_id).await
    }

    async fn list_sessions_in_range(
        &self,
        athlete_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PlannedSession>> {
        sessions::list_sessions_in_range(&self.pool, athlete_id, from, to).await
    }

    async fn find_planned_sessions(
        &self,
        athlete_id: Uuid,
        date: NaiveDate,
        sport: Sport,
    ) -> Result<Vec<PlannedSession>> {
        sessions::find_planned_sessions(&self.pool, athlete_id, date, sport).await
    }

    async fn upcoming_sessions(
        &self,
        athlete_id: Uuid,
        from: NaiveDate,
        limit: i64,
    ) -> Result<Vec<PlannedSession>> {
        sessions::upcoming_sessions(&self.pool, athlete_id, from, limit).await
    }

    async fn transition_session_status(
        &self,
        id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
        completed_log_id: Option<Uuid>,
    ) -> Result<u64> {
        sessions::transition_session_status(&self.pool, id, from, to, completed_log_id).await
    }

    async fn delete_sessions(&self, ids: &[Uuid]) -> Result<u64> {
        sessions::delete_sessions(&self.pool, ids).await
    }

    async fn insert_log(&self, log: &NewSessionLog) -> Result<SessionLog> {
        logs::insert_log(&self.pool, log).await
    }

    async fn recent_logs(&self, athlete_id: Uuid, limit: i64) -> Result<Vec<SessionLog>> {
        logs::recent_logs(&self.pool, athlete_id, limit).await
    }

    async fn recent_logs_for_sport(
        &self,
        athlete_id: Uuid,
        sport: Sport,
        limit: i64,
    ) -> Result<Vec<SessionLog>> {
        logs::recent_logs_for_sport(&self.pool, athlete_id, sport, limit).await
    }

    async fn logs_in_range(
        &self,
        athlete_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SessionLog>> {
        logs::logs_in_range(&self.pool, athlete_id, from, to).await
    }

    async fn upsert_body_metrics(&self, entry: &NewBodyMetrics) -> Result<BodyMetricsEntry> {
        metrics::upsert_body_metrics(&self.pool, entry).await
    }

    async fn recent_body_metrics(
        &self,
        athlete_id: Uuid,
        limit: i64,
    ) -> Result<Vec<BodyMetricsEntry>> {
        metrics::recent_body_metrics(&self.pool, athlete_id, limit).await
    }

    async fn insert_milestone(&self, milestone: &NewMilestone) -> Result<Milestone> {
        milestones::insert_milestone(&self.pool, milestone).await
    }

    async fn list_milestones(&self, athlete_id: Uuid) -> Result<Vec<Milestone>> {
        milestones::list_milestones(&self.pool, athlete_id).await
    }

    async fn mark_milestone_achieved(&self, id: Uuid, achieved_at: DateTime<Utc>) -> Result<u64> {
        milestones::mark_milestone_achieved(&self.pool, id, achieved_at).await
    }

    async fn delete_upcoming_date_milestones(&self, athlete_id: Uuid) -> Result<u64> {
        milestones::delete_upcoming_date_milestones(&self.pool, athlete_id).await
    }

    async fn append_message(
        &self,
        athlete_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<CoachMessage> {
        conversations::append_message(&self.pool, athlete_id, role, content).await
    }

    async fn recent_messages(&self, athlete_id: Uuid, limit: i64) -> Result<Vec<CoachMessage>> {
        conversations::recent_messages(&self.pool, athlete_id, limit).await
    }

    async fn replace_pairing_code(
        &self,
        athlete_id: Uuid,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PairingCode> {
        pairing::replace_pairing_code(&self.pool, athlete_id, code_hash, expires_at).await
    }

    async fn pairing_code_active(&self, code_hash: &str, now: DateTime<Utc>) -> Result<bool> {
        pairing::pairing_code_active(&self.pool, code_hash, now).await
    }

    async fn consume_pairing_code(
        &self,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PairingCode>> {
        pairing::consume_pairing_code(&self.pool, code_hash, now).await
    }

    async fn upsert_channel_link(
        &self,
        channel: &str,
        external_id: &str,
        athlete_id: Uuid,
    ) -> Result<ChannelLink> {
        pairing::upsert_channel_link(&self.pool, channel, external_id, athlete_id).await
    }

    async fn find_channel_link(
        &self,
        channel: &str,
        external_id: &str,
    ) -> Result<Option<ChannelLink>> {
        pairing::find_channel_link(&self.pool, channel, external_id).await
    }
}
