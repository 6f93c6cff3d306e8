//! In-memory [`TrainingStore`] mirroring the PostgreSQL semantics: the same
//! orderings, the compare-and-set guards, and the `completed` back-reference
//! check constraint.
//!
//! [`MemoryStore::fail`] arms a [`Fault`] so tests can drive the error paths
//! of multi-step operations.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use tricoach_db::TrainingStore;
use tricoach_db::models::{
    AthleteProfile, BodyMetricsEntry, ChannelLink, CoachMessage, MessageRole, Milestone,
    MilestoneKind, MilestoneStatus, NewBodyMetrics, NewMilestone, NewPlannedSession,
    NewSessionLog, NewTrainingPlan, PairingCode, PlannedSession, SessionStatus, SessionLog, Sport,
    TrainingPlan,
};

/// A store operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    InsertSession,
    FindPlannedSessions,
    TransitionSession,
    DeleteSessions,
    ListMilestones,
}

#[derive(Default)]
struct Inner {
    faults: HashSet<Fault>,
    profiles: HashMap<Uuid, AthleteProfile>,
    plans: HashMap<Uuid, TrainingPlan>,
    sessions: Vec<PlannedSession>,
    logs: Vec<SessionLog>,
    metrics: Vec<BodyMetricsEntry>,
    milestones: Vec<Milestone>,
    messages: Vec<CoachMessage>,
    pairing_codes: Vec<PairingCode>,
    links: Vec<ChannelLink>,
}

/// A [`TrainingStore`] holding everything in a mutex-guarded struct.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every later call of `fault`'s operation return an error.
    pub fn fail(&self, fault: Fault) {
        self.lock().faults.insert(fault);
    }

    /// Disarm a fault set with [`fail`](Self::fail).
    pub fn heal(&self, fault: Fault) {
        self.lock().faults.remove(&fault);
    }

    fn check(&self, fault: Fault) -> Result<()> {
        if self.lock().faults.contains(&fault) {
            bail!("injected {fault:?} failure");
        }
        Ok(())
    }

    /// Total number of activity logs across all athletes.
    pub fn log_count(&self) -> usize {
        self.lock().logs.len()
    }

    /// Total number of planned sessions across all athletes.
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }
}

fn sorted_by_date(mut sessions: Vec<PlannedSession>) -> Vec<PlannedSession> {
    sessions.sort_by_key(|s| (s.date, s.created_at));
    sessions
}

fn newest_logs_first(mut logs: Vec<SessionLog>, limit: i64) -> Vec<SessionLog> {
    logs.sort_by(|a, b| (b.date, b.created_at).cmp(&(a.date, a.created_at)));
    logs.truncate(limit.max(0) as usize);
    logs
}

#[async_trait]
impl TrainingStore for MemoryStore {
    async fn get_profile(&self, athlete_id: Uuid) -> Result<Option<AthleteProfile>> {
        Ok(self.lock().profiles.get(&athlete_id).cloned())
    }

    async fn upsert_profile(&self, profile: &AthleteProfile) -> Result<AthleteProfile> {
        let mut inner = self.lock();
        let mut row = profile.clone();
        if let Some(existing) = inner.profiles.get(&profile.athlete_id) {
            row.created_at = existing.created_at;
        }
        row.updated_at = Utc::now();
        inner.profiles.insert(row.athlete_id, row.clone());
        Ok(row)
    }

    async fn get_plan(&self, athlete_id: Uuid) -> Result<Option<TrainingPlan>> {
        Ok(self.lock().plans.get(&athlete_id).cloned())
    }

    async fn upsert_plan(&self, plan: &NewTrainingPlan) -> Result<TrainingPlan> {
        let row = TrainingPlan {
            id: Uuid::new_v4(),
            athlete_id: plan.athlete_id,
            phase: plan.phase,
            weekly_swim_sessions: plan.weekly_swim_sessions,
            weekly_bike_km: plan.weekly_bike_km,
            weekly_run_km: plan.weekly_run_km,
            weekly_strength_sessions: plan.weekly_strength_sessions,
            start_date: plan.start_date,
            end_date: plan.end_date,
            created_at: Utc::now(),
        };
        self.lock().plans.insert(row.athlete_id, row.clone());
        Ok(row)
    }

    async fn insert_session(&self, session: &NewPlannedSession) -> Result<PlannedSession> {
        self.check(Fault::InsertSession)?;
        let row = PlannedSession {
            id: Uuid::new_v4(),
            athlete_id: session.athlete_id,
            date: session.date,
            sport: session.sport,
            workout_type: session.workout_type.clone(),
            duration_min: session.duration_min,
            distance_km: session.distance_km,
            intensity: session.intensity,
            description: session.description.clone(),
            status: SessionStatus::Planned,
            completed_log_id: None,
            origin: session.origin,
            created_at: Utc::now(),
        };
        self.lock().sessions.push(row.clone());
        Ok(row)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<PlannedSession>> {
        Ok(self.lock().sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn list_sessions(&self, athlete_id: Uuid) -> Result<Vec<PlannedSession>> {
        let rows = self
            .lock()
            .sessions
            .iter()
            .filter(|s| s.athlete_id == athlete_id)
            .cloned()
            .collect();
        Ok(sorted_by_date(rows))
    }

    async fn list_sessions_in_range(
        &self,
        athlete_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PlannedSession>> {
        let rows = self
            .lock()
            .sessions
            .iter()
            .filter(|s| s.athlete_id == athlete_id && s.date >= from && s.date <= to)
            .cloned()
            .collect();
        Ok(sorted_by_date(rows))
    }

    async fn find_planned_sessions(
        &self,
        athlete_id: Uuid,
        date: NaiveDate,
        sport: Sport,
    ) -> Result<Vec<PlannedSession>> {
        self.check(Fault::FindPlannedSessions)?;
        let mut rows: Vec<PlannedSession> = self
            .lock()
            .sessions
            .iter()
            .filter(|s| {
                s.athlete_id == athlete_id
                    && s.date == date
                    && s.sport == sport
                    && s.status == SessionStatus::Planned
            })
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.created_at);
        Ok(rows)
    }

    async fn upcoming_sessions(
        &self,
        athlete_id: Uuid,
        from: NaiveDate,
        limit: i64,
    ) -> Result<Vec<PlannedSession>> {
        let rows = self
            .lock()
            .sessions
            .iter()
            .filter(|s| {
                s.athlete_id == athlete_id && s.date >= from && s.status == SessionStatus::Planned
            })
            .cloned()
            .collect();
        let mut rows = sorted_by_date(rows);
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn transition_session_status(
        &self,
        id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
        completed_log_id: Option<Uuid>,
    ) -> Result<u64> {
        self.check(Fault::TransitionSession)?;
        if (to == SessionStatus::Completed) != completed_log_id.is_some() {
            bail!("check constraint violated: completed_log_id must be set iff status is completed");
        }
        let mut inner = self.lock();
        match inner
            .sessions
            .iter_mut()
            .find(|s| s.id == id && s.status == from)
        {
            Some(session) => {
                session.status = to;
                session.completed_log_id = completed_log_id;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_sessions(&self, ids: &[Uuid]) -> Result<u64> {
        self.check(Fault::DeleteSessions)?;
        let mut inner = self.lock();
        let before = inner.sessions.len();
        inner.sessions.retain(|s| !ids.contains(&s.id));
        Ok((before - inner.sessions.len()) as u64)
    }

    async fn insert_log(&self, log: &NewSessionLog) -> Result<SessionLog> {
        let row = SessionLog {
            id: Uuid::new_v4(),
            athlete_id: log.athlete_id,
            date: log.date,
            sport: log.sport,
            workout_type: log.workout_type.clone(),
            duration_min: log.duration_min,
            distance_km: log.distance_km,
            rpe: log.rpe,
            notes: log.notes.clone(),
            created_at: Utc::now(),
        };
        self.lock().logs.push(row.clone());
        Ok(row)
    }

    async fn recent_logs(&self, athlete_id: Uuid, limit: i64) -> Result<Vec<SessionLog>> {
        let rows = self
            .lock()
            .logs
            .iter()
            .filter(|l| l.athlete_id == athlete_id)
            .cloned()
            .collect();
        Ok(newest_logs_first(rows, limit))
    }

    async fn recent_logs_for_sport(
        &self,
        athlete_id: Uuid,
        sport: Sport,
        limit: i64,
    ) -> Result<Vec<SessionLog>> {
        let rows = self
            .lock()
            .logs
            .iter()
            .filter(|l| l.athlete_id == athlete_id && l.sport == sport)
            .cloned()
            .collect();
        Ok(newest_logs_first(rows, limit))
    }

    async fn logs_in_range(
        &self,
        athlete_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SessionLog>> {
        let mut rows: Vec<SessionLog> = self
            .lock()
            .logs
            .iter()
            .filter(|l| l.athlete_id == athlete_id && l.date >= from && l.date <= to)
            .cloned()
            .collect();
        rows.sort_by_key(|l| (l.date, l.created_at));
        Ok(rows)
    }

    async fn upsert_body_metrics(&self, entry: &NewBodyMetrics) -> Result<BodyMetricsEntry> {
        let mut inner = self.lock();
        if let Some(existing) = inner
            .metrics
            .iter_mut()
            .find(|m| m.athlete_id == entry.athlete_id && m.date == entry.date)
        {
            existing.weight_kg = entry.weight_kg.or(existing.weight_kg);
            existing.sleep_hours = entry.sleep_hours.or(existing.sleep_hours);
            existing.fatigue = entry.fatigue.or(existing.fatigue);
            existing.notes = entry.notes.clone().or(existing.notes.take());
            return Ok(existing.clone());
        }
        let row = BodyMetricsEntry {
            id: Uuid::new_v4(),
            athlete_id: entry.athlete_id,
            date: entry.date,
            weight_kg: entry.weight_kg,
            sleep_hours: entry.sleep_hours,
            fatigue: entry.fatigue,
            notes: entry.notes.clone(),
            created_at: Utc::now(),
        };
        inner.metrics.push(row.clone());
        Ok(row)
    }

    async fn recent_body_metrics(
        &self,
        athlete_id: Uuid,
        limit: i64,
    ) -> Result<Vec<BodyMetricsEntry>> {
        let mut rows: Vec<BodyMetricsEntry> = self
            .lock()
            .metrics
            .iter()
            .filter(|m| m.athlete_id == athlete_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn insert_milestone(&self, milestone: &NewMilestone) -> Result<Milestone> {
        let row = Milestone {
            id: Uuid::new_v4(),
            athlete_id: milestone.athlete_id,
            title: milestone.title.clone(),
            kind: milestone.kind,
            target_date: milestone.target_date,
            rule: milestone.rule.clone().map(Json),
            status: milestone.status,
            achieved_at: milestone.achieved_at,
            created_at: Utc::now(),
        };
        self.lock().milestones.push(row.clone());
        Ok(row)
    }

    async fn list_milestones(&self, athlete_id: Uuid) -> Result<Vec<Milestone>> {
        self.check(Fault::ListMilestones)?;
        let mut rows: Vec<Milestone> = self
            .lock()
            .milestones
            .iter()
            .filter(|m| m.athlete_id == athlete_id)
            .cloned()
            .collect();
        // NULLS LAST on target_date.
        rows.sort_by_key(|m| (m.target_date.is_none(), m.target_date, m.created_at));
        Ok(rows)
    }

    async fn mark_milestone_achieved(&self, id: Uuid, achieved_at: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.lock();
        match inner
            .milestones
            .iter_mut()
            .find(|m| m.id == id && m.status == MilestoneStatus::Upcoming)
        {
            Some(m) => {
                m.status = MilestoneStatus::Achieved;
                m.achieved_at = Some(achieved_at);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_upcoming_date_milestones(&self, athlete_id: Uuid) -> Result<u64> {
        let mut inner = self.lock();
        let before = inner.milestones.len();
        inner.milestones.retain(|m| {
            !(m.athlete_id == athlete_id
                && m.kind == MilestoneKind::DateBased
                && m.status == MilestoneStatus::Upcoming)
        });
        Ok((before - inner.milestones.len()) as u64)
    }

    async fn append_message(
        &self,
        athlete_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<CoachMessage> {
        let mut inner = self.lock();
        let row = CoachMessage {
            id: inner.messages.len() as i64 + 1,
            athlete_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        inner.messages.push(row.clone());
        Ok(row)
    }

    async fn recent_messages(&self, athlete_id: Uuid, limit: i64) -> Result<Vec<CoachMessage>> {
        let inner = self.lock();
        let mine: Vec<&CoachMessage> = inner
            .messages
            .iter()
            .filter(|m| m.athlete_id == athlete_id)
            .collect();
        let skip = mine.len().saturating_sub(limit.max(0) as usize);
        Ok(mine.into_iter().skip(skip).cloned().collect())
    }

    async fn replace_pairing_code(
        &self,
        athlete_id: Uuid,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PairingCode> {
        let now = Utc::now();
        let mut inner = self.lock();
        for code in inner
            .pairing_codes
            .iter_mut()
            .filter(|c| c.athlete_id == athlete_id && c.consumed_at.is_none())
        {
            code.consumed_at = Some(now);
        }
        let row = PairingCode {
            id: Uuid::new_v4(),
            athlete_id,
            code_hash: code_hash.to_string(),
            expires_at,
            consumed_at: None,
            created_at: now,
        };
        inner.pairing_codes.push(row.clone());
        Ok(row)
    }

    async fn pairing_code_active(&self, code_hash: &str, now: DateTime<Utc>) -> Result<bool> {
        Ok(self
            .lock()
            .pairing_codes
            .iter()
            .any(|c| c.code_hash == code_hash && c.consumed_at.is_none() && c.expires_at > now))
    }

    async fn consume_pairing_code(
        &self,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PairingCode>> {
        let mut inner = self.lock();
        let newest = inner
            .pairing_codes
            .iter_mut()
            .filter(|c| c.code_hash == code_hash && c.consumed_at.is_none() && c.expires_at > now)
            .max_by_key(|c| c.created_at);
        Ok(newest.map(|code| {
            code.consumed_at = Some(now);
            code.clone()
        }))
    }

    async fn upsert_channel_link(
        &self,
        channel: &str,
        external_id: &str,
        athlete_id: Uuid,
    ) -> Result<ChannelLink> {
        let mut inner = self.lock();
        inner
            .links
            .retain(|l| !(l.channel == channel && l.external_id == external_id));
        let link = ChannelLink {
            channel: channel.to_string(),
            external_id: external_id.to_string(),
            athlete_id,
            linked_at: Utc::now(),
        };
        inner.links.push(link.clone());
        Ok(link)
    }

    async fn find_channel_link(
        &self,
        channel: &str,
        external_id: &str,
    ) -> Result<Option<ChannelLink>> {
        Ok(self
            .lock()
            .links
            .iter()
            .find(|l| l.channel == channel && l.external_id == external_id)
            .cloned())
    }
}
