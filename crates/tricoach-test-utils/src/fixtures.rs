//! Sample rows shared by the engine test suites.

use chrono::{Days, NaiveDate};
use uuid::Uuid;

use tricoach_db::models::{
    AthleteProfile, Experience, GoalTier, Intensity, NewPlannedSession, NewSessionLog,
    SessionOrigin, Sport,
};

/// A fixed Monday, so week-relative assertions are stable.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date")
}

/// An onboarded intermediate athlete aiming for sub-5 with the race
/// `weeks_out` weeks after `today`.
pub fn sub5_profile(today: NaiveDate, weeks_out: u64) -> AthleteProfile {
    let mut profile = AthleteProfile::new(Uuid::new_v4());
    profile.display_name = Some("Test Athlete".to_string());
    profile.age = Some(34);
    profile.weight_kg = Some(72.0);
    profile.height_cm = Some(178.0);
    profile.experience = Experience::Intermediate;
    profile.goal = GoalTier::Sub5;
    profile.race_date = today.checked_add_days(Days::new(weeks_out * 7));
    profile.weekly_hours = Some(10.0);
    profile.pool_days = Some(3);
    profile.gym_access = true;
    profile.can_swim_race_distance = true;
    profile.bike_ftp_watts = Some(250);
    profile.run_5k_minutes = Some(21.0);
    profile.race_name = Some("Lakeside 70.3".to_string());
    profile
}

/// A first-timer with no benchmarks aiming to finish.
pub fn beginner_profile(today: NaiveDate, weeks_out: u64) -> AthleteProfile {
    let mut profile = AthleteProfile::new(Uuid::new_v4());
    profile.experience = Experience::Beginner;
    profile.goal = GoalTier::Finish;
    profile.race_date = today.checked_add_days(Days::new(weeks_out * 7));
    profile.weekly_hours = Some(6.0);
    profile
}

/// A system-origin planned session.
pub fn planned(athlete_id: Uuid, date: NaiveDate, sport: Sport) -> NewPlannedSession {
    NewPlannedSession {
        athlete_id,
        date,
        sport,
        workout_type: "Z2".to_string(),
        duration_min: 60,
        distance_km: None,
        intensity: Intensity::Easy,
        description: format!("{sport} endurance"),
        origin: SessionOrigin::System,
    }
}

/// An activity log without notes or RPE.
pub fn activity(
    athlete_id: Uuid,
    date: NaiveDate,
    sport: Sport,
    duration_min: i32,
    distance_km: Option<f64>,
) -> NewSessionLog {
    NewSessionLog {
        athlete_id,
        date,
        sport,
        workout_type: None,
        duration_min,
        distance_km,
        rpe: None,
        notes: None,
    }
}
