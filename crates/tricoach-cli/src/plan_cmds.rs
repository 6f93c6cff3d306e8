//! CLI handlers for `tricoach onboard` and the `tricoach plan` subcommands.
//!
//! Implements:
//! - `tricoach onboard`          -- complete onboarding, derive plan and sessions
//! - `tricoach plan show`        -- show the active plan and its weekly targets
//! - `tricoach plan refresh`     -- regenerate future sessions
//! - `tricoach plan projection`  -- finish-time projection and goal realism

use anyhow::{Context, Result};
use chrono::Utc;

use tricoach_core::onboarding::complete_onboarding;
use tricoach_core::planning::{check_goal_realism, project_finish_time, weeks_to_race};
use tricoach_core::refresh::{RefreshSummary, refresh_future_sessions};
use tricoach_db::TrainingStore;

use crate::PlanCommands;
use crate::app::App;

pub async fn run_plan_command(app: &App, command: PlanCommands) -> Result<()> {
    match command {
        PlanCommands::Show => cmd_show(app).await,
        PlanCommands::Refresh { horizon } => cmd_refresh(app, horizon).await,
        PlanCommands::Projection => cmd_projection(app).await,
    }
}

fn print_refresh(summary: &RefreshSummary) {
    println!(
        "  Sessions: {} inserted, {} kept, {} replaced, {} skipped as duplicates",
        summary.inserted, summary.kept, summary.deleted, summary.collisions
    );
    if summary.deleted_coach > 0 {
        println!(
            "  Note: {} coach-added session(s) were replaced by the template.",
            summary.deleted_coach
        );
    }
}

// -----------------------------------------------------------------------
// tricoach onboard
// -----------------------------------------------------------------------

pub async fn run_onboard(app: &App) -> Result<()> {
    let athlete_id = app.athlete()?;
    let outcome = complete_onboarding(
        app.store.as_ref(),
        &app.locks,
        athlete_id,
        app.today(),
        app.config.horizon_days,
        Utc::now(),
    )
    .await?;

    println!("Onboarding complete.");
    println!();
    println!("  Plan ID:    {}", outcome.plan.id);
    println!("  Phase:      {}", outcome.plan.phase);
    println!("  Runs until: {}", outcome.plan.end_date);
    print_refresh(&outcome.refresh);
    println!("  Milestones: {} added", outcome.milestones_seeded);

    let realism = check_goal_realism(&outcome.profile);
    if !realism.warnings.is_empty() {
        println!();
        println!("Goal check ({}):", realism.class);
        for w in &realism.warnings {
            println!("  - {w}");
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// tricoach plan show
// -----------------------------------------------------------------------

async fn cmd_show(app: &App) -> Result<()> {
    let athlete_id = app.athlete()?;
    let Some(plan) = app.store.get_plan(athlete_id).await? else {
        println!("No plan yet. Run `tricoach onboard` first.");
        return Ok(());
    };

    println!("Plan: {}", plan.id);
    println!("Phase: {}", plan.phase);
    println!("Period: {} to {}", plan.start_date, plan.end_date);
    if let Some(race_date) = app
        .store
        .get_profile(athlete_id)
        .await?
        .and_then(|p| p.race_date)
    {
        println!(
            "Race: {race_date} ({} weeks out)",
            weeks_to_race(race_date, app.today())
        );
    }
    println!();
    println!("Weekly targets:");
    println!("  Swim:     {} sessions", plan.weekly_swim_sessions);
    println!("  Bike:     {:.0} km", plan.weekly_bike_km);
    println!("  Run:      {:.0} km", plan.weekly_run_km);
    println!("  Strength: {} sessions", plan.weekly_strength_sessions);
    Ok(())
}

// -----------------------------------------------------------------------
// tricoach plan refresh
// -----------------------------------------------------------------------

async fn cmd_refresh(app: &App, horizon: Option<u32>) -> Result<()> {
    let athlete_id = app.athlete()?;
    let horizon = horizon.unwrap_or(app.config.horizon_days);
    anyhow::ensure!(horizon > 0, "--horizon must be at least 1");

    let summary = refresh_future_sessions(
        app.store.as_ref(),
        &app.locks,
        athlete_id,
        app.today(),
        horizon,
    )
    .await?;
    println!("Future sessions refreshed ({horizon} days).");
    print_refresh(&summary);
    Ok(())
}

// -----------------------------------------------------------------------
// tricoach plan projection
// -----------------------------------------------------------------------

async fn cmd_projection(app: &App) -> Result<()> {
    let athlete_id = app.athlete()?;
    let profile = app
        .store
        .get_profile(athlete_id)
        .await?
        .with_context(|| format!("no profile for athlete {athlete_id}"))?;

    let projection = project_finish_time(&profile);
    println!("Projected finish: {projection}");
    println!("  Swim:        {:.0} min", projection.swim_min);
    println!("  Bike:        {:.0} min", projection.bike_min);
    println!("  Run:         {:.0} min", projection.run_min);
    println!("  Transitions: {:.0} min", projection.transition_min);
    println!(
        "Goal {}: {}",
        profile.goal,
        if projection.meets(profile.goal) {
            "on track"
        } else {
            "not on track yet"
        }
    );

    let realism = check_goal_realism(&profile);
    println!("Realism: {}", realism.class);
    for w in &realism.warnings {
        println!("  - {w}");
    }
    Ok(())
}
