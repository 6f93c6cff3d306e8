//! Maps parsed channel commands to engine operations. Every chat transport
//! goes through the same [`ChannelRouter::handle`], so a command does the
//! same thing on every channel.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use tricoach_db::TrainingStore;
use tricoach_db::models::{NewBodyMetrics, NewSessionLog};

use crate::coach::{self, AdvisoryClient, AdvisoryMode, CoachCall};
use crate::lock::AthleteLocks;
use crate::session::compliance::this_week_summary;
use crate::session::{MatchOutcome, MatchPolicy, record_log};

use super::command::{ChannelCommand, LogCommand, MetricsCommand, USAGE, parse_command};
use super::pairing::{PairingError, redeem_pairing_code};

const NOT_LINKED: &str = "This chat is not linked to an athlete yet. \
Create a pairing code in the app and send the 6 digits here.";

#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub match_policy: MatchPolicy,
    pub coach_timeout: Duration,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            match_policy: MatchPolicy::default(),
            coach_timeout: coach::DEFAULT_ADVISORY_TIMEOUT,
        }
    }
}

pub struct ChannelRouter {
    store: Arc<dyn TrainingStore>,
    locks: Arc<AthleteLocks>,
    advisor: Option<Arc<dyn AdvisoryClient>>,
    settings: RouterSettings,
    shutdown: CancellationToken,
}

impl ChannelRouter {
    pub fn new(
        store: Arc<dyn TrainingStore>,
        locks: Arc<AthleteLocks>,
        advisor: Option<Arc<dyn AdvisoryClient>>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            store,
            locks,
            advisor,
            settings,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token whose cancellation aborts in-flight coach calls.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Handle one inbound message and return the reply text.
    ///
    /// User mistakes (bad syntax, rejected pairing code, unavailable coach)
    /// come back as reply text; only store failures are errors.
    pub async fn handle(
        &self,
        channel: &str,
        external_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let command = match parse_command(text) {
            Ok(command) => command,
            Err(e) => return Ok(format!("Sorry, I didn't get that: {e}.\n\n{USAGE}")),
        };

        match command {
            ChannelCommand::Pair(code) => self.pair(channel, external_id, &code, now).await,
            ChannelCommand::Help => Ok(USAGE.to_string()),
            other => {
                let Some(link) = self.store.find_channel_link(channel, external_id).await? else {
                    return Ok(NOT_LINKED.to_string());
                };
                self.dispatch(link.athlete_id, other, now).await
            }
        }
    }

    async fn pair(
        &self,
        channel: &str,
        external_id: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        match redeem_pairing_code(self.store.as_ref(), channel, external_id, code, now).await {
            Ok(_) => Ok("Linked! Log workouts here or ask your coach anything.".to_string()),
            Err(e) => match e.downcast_ref::<PairingError>() {
                Some(reason) => Ok(format!("Could not link this chat: {reason}.")),
                None => Err(e),
            },
        }
    }

    async fn dispatch(
        &self,
        athlete_id: Uuid,
        command: ChannelCommand,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let today = now.date_naive();
        match command {
            ChannelCommand::Log(log) => self.log(athlete_id, log, now).await,
            ChannelCommand::Metrics(m) => self.metrics(athlete_id, m, now).await,
            ChannelCommand::Today => self.today(athlete_id, now).await,
            ChannelCommand::Summary => match &self.advisor {
                Some(_) => self.coach(athlete_id, AdvisoryMode::Summary, None, now).await,
                None => {
                    let week = this_week_summary(self.store.as_ref(), athlete_id, today).await?;
                    Ok(format!(
                        "This week ({} to {}): {}% compliance, {} of {} sessions completed.",
                        week.from,
                        week.to,
                        week.compliance.percent,
                        week.compliance.completed,
                        week.compliance.total
                    ))
                }
            },
            ChannelCommand::Chat(text) => {
                self.coach(athlete_id, AdvisoryMode::Chat, Some(text), now).await
            }
            ChannelCommand::Pair(_) | ChannelCommand::Help => Ok(USAGE.to_string()),
        }
    }

    async fn log(&self, athlete_id: Uuid, log: LogCommand, now: DateTime<Utc>) -> Result<String> {
        let new_log = NewSessionLog {
            athlete_id,
            date: now.date_naive(),
            sport: log.sport,
            workout_type: None,
            duration_min: log.duration_min,
            distance_km: log.distance_km,
            rpe: log.rpe,
            notes: log.notes,
        };
        let outcome = record_log(
            self.store.as_ref(),
            &self.locks,
            &new_log,
            self.settings.match_policy,
            now,
        )
        .await?;

        let mut reply = format!("Logged {} {} min", outcome.log.sport, outcome.log.duration_min);
        if let Some(km) = outcome.log.distance_km {
            let _ = write!(reply, ", {km:.1} km");
        }
        reply.push('.');
        match outcome.matched {
            MatchOutcome::Completed(_) => reply.push_str(" Planned session marked completed."),
            MatchOutcome::Ambiguous(n) => {
                let _ = write!(reply, " {n} planned sessions match; none marked completed.");
            }
            MatchOutcome::Lost { .. } | MatchOutcome::Unreconciled => {
                reply.push_str(" The planned session could not be marked completed.");
            }
            MatchOutcome::NoCandidate => {}
        }
        for m in &outcome.milestones_achieved {
            let _ = write!(reply, "\nMilestone reached: {}!", m.title);
        }
        Ok(reply)
    }

    async fn metrics(
        &self,
        athlete_id: Uuid,
        m: MetricsCommand,
        now: DateTime<Utc>,
    ) -> Result<String> {
        self.store
            .upsert_body_metrics(&NewBodyMetrics {
                athlete_id,
                date: now.date_naive(),
                weight_kg: m.weight_kg,
                sleep_hours: m.sleep_hours,
                fatigue: m.fatigue,
                notes: m.notes,
            })
            .await?;
        Ok("Body metrics saved for today.".to_string())
    }

    async fn today(&self, athlete_id: Uuid, now: DateTime<Utc>) -> Result<String> {
        let today = now.date_naive();
        let sessions = self
            .store
            .list_sessions_in_range(athlete_id, today, today)
            .await?;
        if sessions.is_empty() {
            return Ok("Nothing planned today. Rest well.".to_string());
        }
        let mut reply = String::from("Today:");
        for s in sessions {
            let _ = write!(
                reply,
                "\n- {} {} {} min ({}) [{}]",
                s.sport, s.workout_type, s.duration_min, s.intensity, s.status
            );
        }
        Ok(reply)
    }

    async fn coach(
        &self,
        athlete_id: Uuid,
        mode: AdvisoryMode,
        user_message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let Some(advisor) = &self.advisor else {
            return Ok("The coach is not configured.".to_string());
        };
        let call = CoachCall {
            athlete_id,
            mode,
            user_message,
            today: now.date_naive(),
        };
        let result = coach::run_coach(
            self.store.as_ref(),
            &self.locks,
            advisor.as_ref(),
            &call,
            self.settings.coach_timeout,
            &self.shutdown.child_token(),
        )
        .await;

        match result {
            Ok(reply) => {
                let applied = reply.outcomes.iter().filter(|o| o.is_applied()).count();
                if applied > 0 {
                    Ok(format!("{}\n\n({applied} plan change(s) applied)", reply.message))
                } else {
                    Ok(reply.message)
                }
            }
            Err(e) if e.downcast_ref::<coach::AdvisoryError>().is_some() => {
                Ok(format!("Your coach is unavailable right now ({e}). Please try again later."))
            }
            Err(e) => Err(e),
        }
    }
}
