//! Closed-form finish-time projection and goal-realism checks for a
//! half-distance race (1.9 km swim, 90 km bike, 21.1 km run).

use std::fmt;

use serde::Serialize;

use tricoach_db::models::{AthleteProfile, Experience, GoalTier};

const BIKE_KM: f64 = 90.0;
const RUN_KM: f64 = 21.1;

const SWIM_MIN_CONFIDENT: f64 = 40.0;
const SWIM_MIN_UNPROVEN: f64 = 55.0;
const BIKE_KMH_DEFAULT: f64 = 26.0;
const BIKE_KMH_MIN: f64 = 20.0;
const BIKE_KMH_MAX: f64 = 40.0;
const RUN_MIN_DEFAULT: f64 = 150.0;
/// Off-the-bike slowdown applied to open 5K pace.
const RUN_FADE: f64 = 1.15;
const TRANSITION_MIN: f64 = 10.0;

const MIN_WATTS_PER_KG: f64 = 3.0;
const MAX_5K_MINUTES: f64 = 25.0;
const MIN_WEEKLY_HOURS: f64 = 8.0;

/// Per-leg minutes of a projected finish.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinishProjection {
    pub swim_min: f64,
    pub bike_min: f64,
    pub run_min: f64,
    pub transition_min: f64,
}

impl FinishProjection {
    pub fn total_min(&self) -> f64 {
        self.swim_min + self.bike_min + self.run_min + self.transition_min
    }

    /// Whether the projection beats the tier's cut-off. `Finish` has none.
    pub fn meets(&self, goal: GoalTier) -> bool {
        match goal {
            GoalTier::Finish => true,
            GoalTier::Sub6 => self.total_min() < 360.0,
            GoalTier::Sub5 => self.total_min() < 300.0,
        }
    }
}

impl fmt::Display for FinishProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total_min().round() as i64;
        write!(f, "{}:{:02}", total / 60, total % 60)
    }
}

fn bike_speed_kmh(profile: &AthleteProfile) -> f64 {
    match (profile.bike_ftp_watts, profile.weight_kg) {
        (Some(ftp), Some(weight)) if ftp > 0 && weight > 0.0 => {
            let watts_per_kg = f64::from(ftp) / weight;
            (15.0 + 5.0 * watts_per_kg).clamp(BIKE_KMH_MIN, BIKE_KMH_MAX)
        }
        _ => BIKE_KMH_DEFAULT,
    }
}

/// Estimate the athlete's finish time. Deterministic and total.
pub fn project_finish_time(profile: &AthleteProfile) -> FinishProjection {
    let swim_min = if profile.can_swim_race_distance {
        SWIM_MIN_CONFIDENT
    } else {
        SWIM_MIN_UNPROVEN
    };

    let bike_min = BIKE_KM / bike_speed_kmh(profile) * 60.0;

    let run_min = match profile.run_5k_minutes {
        Some(five_k) if five_k > 0.0 => five_k / 5.0 * RUN_KM * RUN_FADE,
        _ => RUN_MIN_DEFAULT,
    };

    FinishProjection {
        swim_min,
        bike_min,
        run_min,
        transition_min: TRANSITION_MIN,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RealismClass {
    Achievable,
    Stretch,
    /// A more conservative target is advised.
    Conservative,
}

impl fmt::Display for RealismClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Achievable => "achievable",
            Self::Stretch => "stretch",
            Self::Conservative => "conservative",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalRealism {
    pub class: RealismClass,
    pub warnings: Vec<String>,
}

/// Check the prerequisites of the fastest tier. Slower tiers are always
/// achievable.
pub fn check_goal_realism(profile: &AthleteProfile) -> GoalRealism {
    let mut warnings = Vec::new();

    if profile.goal == GoalTier::FASTEST {
        if !profile.can_swim_race_distance {
            warnings.push("cannot yet swim the 1.9 km race distance continuously".to_string());
        }
        match (profile.bike_ftp_watts, profile.weight_kg) {
            (Some(ftp), Some(weight)) if weight > 0.0 => {
                let wkg = f64::from(ftp) / weight;
                if wkg < MIN_WATTS_PER_KG {
                    warnings.push(format!(
                        "bike FTP is {wkg:.1} W/kg, below {MIN_WATTS_PER_KG:.1} W/kg"
                    ));
                }
            }
            _ => warnings.push("no bike FTP benchmark recorded".to_string()),
        }
        match profile.run_5k_minutes {
            Some(five_k) if five_k <= MAX_5K_MINUTES => {}
            Some(five_k) => warnings.push(format!(
                "5K time of {five_k:.1} min is slower than {MAX_5K_MINUTES:.0} min"
            )),
            None => warnings.push("no 5K run benchmark recorded".to_string()),
        }
        if profile.weekly_hours.unwrap_or(0.0) < MIN_WEEKLY_HOURS {
            warnings.push(format!(
                "fewer than {MIN_WEEKLY_HOURS:.0} training hours available per week"
            ));
        }
        if profile.experience == Experience::Beginner {
            warnings.push("first-season athletes rarely go under five hours".to_string());
        }
    }

    let class = match warnings.len() {
        0 => RealismClass::Achievable,
        1 => RealismClass::Stretch,
        _ => RealismClass::Conservative,
    };

    GoalRealism { class, warnings }
}
