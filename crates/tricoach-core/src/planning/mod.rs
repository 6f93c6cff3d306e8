//! Plan generation: phase and weekly targets, the session template, and
//! finish-time projection with goal-realism checks.
//!
//! Everything here is pure; persistence happens in
//! [`crate::onboarding`] and [`crate::refresh`].

pub mod engine;
pub mod projection;
pub mod template;

pub use engine::{WeeklyTargets, generate_initial_plan, phase_for_weeks, weeks_to_race};
pub use projection::{
    FinishProjection, GoalRealism, RealismClass, check_goal_realism, project_finish_time,
};
pub use template::{DEFAULT_HORIZON_DAYS, generate_sessions};
