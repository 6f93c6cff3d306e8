use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Declares a text-backed enum together with its `Display`, `FromStr` and
/// parse error type. Parsing ignores ASCII case and surrounding whitespace,
/// and deserialization goes through the same parser.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident / $err:ident ($label:literal) {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, sqlx::Type)]
        #[sqlx(type_name = "text")]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                #[sqlx(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            /// The stored text representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = $err;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| $err(s.to_owned()))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                String::deserialize(deserializer)?
                    .parse()
                    .map_err(serde::de::Error::custom)
            }
        }

        #[doc = concat!("Error returned when parsing an invalid [`", stringify!($name), "`] string.")]
        #[derive(Debug, Clone)]
        pub struct $err(pub String);

        impl fmt::Display for $err {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!("invalid ", $label, ": {:?}"), self.0)
            }
        }

        impl std::error::Error for $err {}
    };
}

text_enum! {
    /// Macro-periodization stage derived from weeks-to-race.
    pub enum Phase / PhaseParseError ("phase") {
        Base => "Base",
        Build => "Build",
        Peak => "Peak",
        Taper => "Taper",
    }
}

text_enum! {
    /// Discipline of a planned session or logged activity.
    pub enum Sport / SportParseError ("sport") {
        Swim => "Swim",
        Bike => "Bike",
        Run => "Run",
        Strength => "Strength",
    }
}

text_enum! {
    pub enum Intensity / IntensityParseError ("intensity") {
        Easy => "Easy",
        Moderate => "Moderate",
        Hard => "Hard",
    }
}

text_enum! {
    /// Completion status of a planned session.
    ///
    /// See `tricoach_core::session::SessionStateMachine` for the legal
    /// transitions between these states.
    pub enum SessionStatus / SessionStatusParseError ("session status") {
        Planned => "planned",
        Completed => "completed",
        Skipped => "skipped",
        Cancelled => "cancelled",
    }
}

text_enum! {
    /// Who created a planned session.
    pub enum SessionOrigin / SessionOriginParseError ("session origin") {
        System => "system",
        Coach => "coach",
    }
}

text_enum! {
    pub enum Experience / ExperienceParseError ("experience level") {
        Beginner => "beginner",
        Intermediate => "intermediate",
        Advanced => "advanced",
    }
}

text_enum! {
    /// Target finish time tier, slowest first.
    pub enum GoalTier / GoalTierParseError ("goal tier") {
        Finish => "finish",
        Sub6 => "sub6",
        Sub5 => "sub5",
    }
}

text_enum! {
    pub enum MilestoneKind / MilestoneKindParseError ("milestone kind") {
        DateBased => "date_based",
        AchievementBased => "achievement_based",
    }
}

text_enum! {
    pub enum MilestoneStatus / MilestoneStatusParseError ("milestone status") {
        Upcoming => "upcoming",
        Achieved => "achieved",
    }
}

text_enum! {
    pub enum MessageRole / MessageRoleParseError ("message role") {
        User => "user",
        Assistant => "assistant",
    }
}

impl GoalTier {
    /// The most ambitious tier; realism checks only apply here.
    pub const FASTEST: GoalTier = GoalTier::Sub5;
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// Onboarding attributes of an athlete. One row per athlete.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AthleteProfile {
    pub athlete_id: Uuid,
    pub display_name: Option<String>,
    pub age: Option<i32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub experience: Experience,
    pub goal: GoalTier,
    pub race_date: Option<NaiveDate>,
    pub priority: Option<String>,
    pub weekly_hours: Option<f64>,
    pub pool_days: Option<i32>,
    pub gym_access: bool,
    /// Binary swim-endurance benchmark: can swim the race distance nonstop.
    pub can_swim_race_distance: bool,
    pub swim_pace_per_100m_sec: Option<i32>,
    pub bike_ftp_watts: Option<i32>,
    pub run_5k_minutes: Option<f64>,
    pub race_name: Option<String>,
    pub race_location: Option<String>,
    pub travel_notes: Option<String>,
    /// Cursor into the onboarding flow while `completed` is false.
    pub onboarding_step: i32,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AthleteProfile {
    /// An empty, not-yet-onboarded profile.
    pub fn new(athlete_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            athlete_id,
            display_name: None,
            age: None,
            weight_kg: None,
            height_cm: None,
            experience: Experience::Beginner,
            goal: GoalTier::Finish,
            race_date: None,
            priority: None,
            weekly_hours: None,
            pool_days: None,
            gym_access: false,
            can_swim_race_distance: false,
            swim_pace_per_100m_sec: None,
            bike_ftp_watts: None,
            run_5k_minutes: None,
            race_name: None,
            race_location: None,
            travel_notes: None,
            onboarding_step: 0,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The single active plan of an athlete.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainingPlan {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub phase: Phase,
    pub weekly_swim_sessions: i32,
    pub weekly_bike_km: f64,
    pub weekly_run_km: f64,
    pub weekly_strength_sessions: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A schedulable unit of training.
///
/// `completed_log_id` is set iff `status` is [`SessionStatus::Completed`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlannedSession {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub date: NaiveDate,
    pub sport: Sport,
    pub workout_type: String,
    pub duration_min: i32,
    pub distance_km: Option<f64>,
    pub intensity: Intensity,
    pub description: String,
    pub status: SessionStatus,
    pub completed_log_id: Option<Uuid>,
    pub origin: SessionOrigin,
    pub created_at: DateTime<Utc>,
}

/// An actual-activity record. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionLog {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub date: NaiveDate,
    pub sport: Sport,
    pub workout_type: Option<String>,
    pub duration_min: i32,
    pub distance_km: Option<f64>,
    pub rpe: Option<i16>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BodyMetricsEntry {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub date: NaiveDate,
    pub weight_kg: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub fatigue: Option<i16>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Threshold rule of an achievement milestone. Duration (minutes) and
/// distance (km) are alternatives: meeting either one fires the milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneRule {
    pub sport: Sport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_duration: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_distance: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Milestone {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub title: String,
    pub kind: MilestoneKind,
    pub target_date: Option<NaiveDate>,
    pub rule: Option<Json<MilestoneRule>>,
    pub status: MilestoneStatus,
    pub achieved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One turn of the coach conversation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CoachMessage {
    pub id: i64,
    pub athlete_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// An issued pairing code. Only the SHA-256 digest of the code is stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PairingCode {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Binds a messaging-channel identity to an athlete.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChannelLink {
    pub channel: String,
    pub external_id: String,
    pub athlete_id: Uuid,
    pub linked_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Insert structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrainingPlan {
    pub athlete_id: Uuid,
    pub phase: Phase,
    pub weekly_swim_sessions: i32,
    pub weekly_bike_km: f64,
    pub weekly_run_km: f64,
    pub weekly_strength_sessions: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPlannedSession {
    pub athlete_id: Uuid,
    pub date: NaiveDate,
    pub sport: Sport,
    pub workout_type: String,
    pub duration_min: i32,
    pub distance_km: Option<f64>,
    pub intensity: Intensity,
    pub description: String,
    pub origin: SessionOrigin,
}

impl NewPlannedSession {
    /// The (date, sport) key used for de-duplication.
    pub fn key(&self) -> (NaiveDate, Sport) {
        (self.date, self.sport)
    }
}

impl PlannedSession {
    /// The (date, sport) key used for de-duplication.
    pub fn key(&self) -> (NaiveDate, Sport) {
        (self.date, self.sport)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSessionLog {
    pub athlete_id: Uuid,
    pub date: NaiveDate,
    pub sport: Sport,
    pub workout_type: Option<String>,
    pub duration_min: i32,
    pub distance_km: Option<f64>,
    pub rpe: Option<i16>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBodyMetrics {
    pub athlete_id: Uuid,
    pub date: NaiveDate,
    pub weight_kg: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub fatigue: Option<i16>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMilestone {
    pub athlete_id: Uuid,
    pub title: String,
    pub kind: MilestoneKind,
    pub target_date: Option<NaiveDate>,
    pub rule: Option<MilestoneRule>,
    pub status: MilestoneStatus,
    pub achieved_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
