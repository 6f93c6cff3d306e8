//! The weekly session template.
//!
//! Each weekday carries a fixed list of slots. Swim and strength slots are
//! ranked and kept only while the rank fits the plan's weekly count; bike
//! and run slots take a fixed share of the weekly kilometre target.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use uuid::Uuid;

use tricoach_db::models::{Intensity, NewPlannedSession, SessionOrigin, Sport};

use super::engine::WeeklyTargets;

/// Days generated ahead of "today" when no horizon is configured.
pub const DEFAULT_HORIZON_DAYS: u32 = 30;

/// Assumed paces for turning kilometres into session minutes.
const BIKE_KMH: f64 = 27.0;
const RUN_MIN_PER_KM: f64 = 6.0;

#[derive(Debug, Clone, Copy)]
enum Load {
    /// Included when `rank <= weekly count` for the sport.
    Ranked { rank: i32, duration_min: i32, distance_km: Option<f64> },
    /// Fraction of the sport's weekly kilometres.
    Share(f64),
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    sport: Sport,
    workout_type: &'static str,
    intensity: Intensity,
    description: &'static str,
    load: Load,
}

const fn slot(
    sport: Sport,
    workout_type: &'static str,
    intensity: Intensity,
    description: &'static str,
    load: Load,
) -> Slot {
    Slot {
        sport,
        workout_type,
        intensity,
        description,
        load,
    }
}

const MONDAY: &[Slot] = &[
    slot(
        Sport::Swim,
        "Technique",
        Intensity::Easy,
        "Drills and form work, 10x100m with rest",
        Load::Ranked {
            rank: 1,
            duration_min: 45,
            distance_km: Some(1.5),
        },
    ),
    slot(
        Sport::Strength,
        "Strength",
        Intensity::Moderate,
        "Full-body strength: squats, deadlifts, core",
        Load::Ranked {
            rank: 1,
            duration_min: 40,
            distance_km: None,
        },
    ),
];

const TUESDAY: &[Slot] = &[
    slot(
        Sport::Bike,
        "Intervals",
        Intensity::Hard,
        "5x5min at threshold, easy spin between",
        Load::Share(0.25),
    ),
    slot(
        Sport::Run,
        "Z2",
        Intensity::Easy,
        "Conversational aerobic run",
        Load::Share(0.20),
    ),
];

const WEDNESDAY: &[Slot] = &[
    slot(
        Sport::Swim,
        "Endurance",
        Intensity::Moderate,
        "Continuous aerobic swim, build to race distance",
        Load::Ranked {
            rank: 2,
            duration_min: 50,
            distance_km: Some(2.0),
        },
    ),
    slot(
        Sport::Run,
        "Tempo",
        Intensity::Hard,
        "20min at half-marathon effort",
        Load::Share(0.25),
    ),
];

const THURSDAY: &[Slot] = &[
    slot(
        Sport::Bike,
        "Z2",
        Intensity::Easy,
        "Steady aerobic ride, high cadence",
        Load::Share(0.25),
    ),
    slot(
        Sport::Strength,
        "Strength",
        Intensity::Moderate,
        "Single-leg work, hip stability, mobility",
        Load::Ranked {
            rank: 2,
            duration_min: 35,
            distance_km: None,
        },
    ),
];

const FRIDAY: &[Slot] = &[slot(
    Sport::Swim,
    "CSS",
    Intensity::Moderate,
    "Critical swim speed sets, open-water sighting",
    Load::Ranked {
        rank: 3,
        duration_min: 45,
        distance_km: Some(1.8),
    },
)];

const SATURDAY: &[Slot] = &[
    slot(
        Sport::Bike,
        "Long",
        Intensity::Moderate,
        "Long ride with race-pace blocks",
        Load::Share(0.50),
    ),
    slot(
        Sport::Run,
        "Brick",
        Intensity::Moderate,
        "Run straight off the bike",
        Load::Share(0.15),
    ),
];

const SUNDAY: &[Slot] = &[slot(
    Sport::Run,
    "Long",
    Intensity::Easy,
    "Long aerobic run, fuel as on race day",
    Load::Share(0.40),
)];

fn slots_for(weekday: Weekday) -> &'static [Slot] {
    match weekday {
        Weekday::Mon => MONDAY,
        Weekday::Tue => TUESDAY,
        Weekday::Wed => WEDNESDAY,
        Weekday::Thu => THURSDAY,
        Weekday::Fri => FRIDAY,
        Weekday::Sat => SATURDAY,
        Weekday::Sun => SUNDAY,
    }
}

fn round_to_5(minutes: f64) -> i32 {
    ((minutes / 5.0).round() * 5.0) as i32
}

fn round_km(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

fn weekly_count(targets: &WeeklyTargets, sport: Sport) -> i32 {
    match sport {
        Sport::Swim => targets.swim_sessions,
        Sport::Strength => targets.strength_sessions,
        Sport::Bike | Sport::Run => 0,
    }
}

fn weekly_km(targets: &WeeklyTargets, sport: Sport) -> f64 {
    match sport {
        Sport::Bike => targets.bike_km,
        Sport::Run => targets.run_km,
        Sport::Swim | Sport::Strength => 0.0,
    }
}

fn materialize(
    slot: &Slot,
    athlete_id: Uuid,
    date: NaiveDate,
    targets: &WeeklyTargets,
) -> Option<NewPlannedSession> {
    let (duration_min, distance_km) = match slot.load {
        Load::Ranked { rank, duration_min, distance_km } => {
            if rank > weekly_count(targets, slot.sport) {
                return None;
            }
            (duration_min, distance_km)
        }
        Load::Share(share) => {
            let km = round_km(weekly_km(targets, slot.sport) * share);
            if km <= 0.0 {
                return None;
            }
            let minutes = match slot.sport {
                Sport::Bike => km / BIKE_KMH * 60.0,
                _ => km * RUN_MIN_PER_KM,
            };
            (round_to_5(minutes).max(20), Some(km))
        }
    };

    Some(NewPlannedSession {
        athlete_id,
        date,
        sport: slot.sport,
        workout_type: slot.workout_type.to_string(),
        duration_min,
        distance_km,
        intensity: slot.intensity,
        description: slot.description.to_string(),
        origin: SessionOrigin::System,
    })
}

/// Lay the template over `horizon_days` calendar days starting at `today`.
///
/// Every row is `planned` with origin `system`. Calling this twice yields
/// the same shape twice; de-duplication against existing rows is the
/// caller's job.
pub fn generate_sessions(
    athlete_id: Uuid,
    targets: &WeeklyTargets,
    today: NaiveDate,
    horizon_days: u32,
) -> Vec<NewPlannedSession> {
    (0..u64::from(horizon_days))
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .flat_map(|date| {
            slots_for(date.weekday())
                .iter()
                .filter_map(move |slot| materialize(slot, athlete_id, date, targets))
        })
        .collect()
}
