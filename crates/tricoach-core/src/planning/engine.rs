//! Phase selection and weekly volume targets.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use tricoach_db::models::{
    AthleteProfile, Experience, GoalTier, NewTrainingPlan, Phase, TrainingPlan,
};

/// Plan length when the profile has no race date.
pub const OPEN_ENDED_PLAN_WEEKS: u64 = 16;

/// Whole weeks from `today` until `race_date`, floored. Negative once the
/// race is in the past.
pub fn weeks_to_race(race_date: NaiveDate, today: NaiveDate) -> i64 {
    (race_date - today).num_days().div_euclid(7)
}

/// Breakpoints: more than 20 weeks out is Base, more than 12 Build, more
/// than 3 Peak, anything closer Taper.
pub fn phase_for_weeks(weeks: i64) -> Phase {
    if weeks > 20 {
        Phase::Base
    } else if weeks > 12 {
        Phase::Build
    } else if weeks > 3 {
        Phase::Peak
    } else {
        Phase::Taper
    }
}

/// Weekly volume targets carried by a plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTargets {
    pub swim_sessions: i32,
    pub bike_km: f64,
    pub run_km: f64,
    pub strength_sessions: i32,
}

impl WeeklyTargets {
    const BASELINE: WeeklyTargets = WeeklyTargets {
        swim_sessions: 3,
        bike_km: 60.0,
        run_km: 25.0,
        strength_sessions: 2,
    };

    /// Targets for a goal tier and experience level.
    pub fn for_athlete(goal: GoalTier, experience: Experience) -> Self {
        let mut targets = Self::BASELINE;
        match goal {
            GoalTier::Finish => {}
            GoalTier::Sub6 => {
                targets.bike_km = 65.0;
                targets.run_km = 27.0;
            }
            GoalTier::Sub5 => {
                targets.bike_km = 70.0;
                targets.run_km = 30.0;
            }
        }
        if experience == Experience::Beginner {
            targets.swim_sessions -= 1;
            targets.bike_km = (targets.bike_km * 0.7).round();
            targets.run_km = (targets.run_km * 0.7).round();
        }
        targets
    }
}

impl From<&TrainingPlan> for WeeklyTargets {
    fn from(plan: &TrainingPlan) -> Self {
        Self {
            swim_sessions: plan.weekly_swim_sessions,
            bike_km: plan.weekly_bike_km,
            run_km: plan.weekly_run_km,
            strength_sessions: plan.weekly_strength_sessions,
        }
    }
}

impl From<&NewTrainingPlan> for WeeklyTargets {
    fn from(plan: &NewTrainingPlan) -> Self {
        Self {
            swim_sessions: plan.weekly_swim_sessions,
            bike_km: plan.weekly_bike_km,
            run_km: plan.weekly_run_km,
            strength_sessions: plan.weekly_strength_sessions,
        }
    }
}

/// Build the plan row for a profile as of `today`.
///
/// Never fails: without a race date the athlete is treated as far out
/// (Base) and the plan runs for [`OPEN_ENDED_PLAN_WEEKS`].
pub fn generate_initial_plan(profile: &AthleteProfile, today: NaiveDate) -> NewTrainingPlan {
    let phase = match profile.race_date {
        Some(race) => phase_for_weeks(weeks_to_race(race, today)),
        None => Phase::Base,
    };
    let end_date = match profile.race_date {
        Some(race) if race >= today => race,
        Some(_) => today,
        None => today
            .checked_add_days(Days::new(OPEN_ENDED_PLAN_WEEKS * 7))
            .unwrap_or(today),
    };
    let targets = WeeklyTargets::for_athlete(profile.goal, profile.experience);

    NewTrainingPlan {
        athlete_id: profile.athlete_id,
        phase,
        weekly_swim_sessions: targets.swim_sessions,
        weekly_bike_km: targets.bike_km,
        weekly_run_km: targets.run_km,
        weekly_strength_sessions: targets.strength_sessions,
        start_date: today,
        end_date,
    }
}
