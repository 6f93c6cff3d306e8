//! Session, activity-log, metrics, compliance and milestone commands.

use anyhow::{Context, Result, bail};
use chrono::{Days, NaiveDate, Utc};
use uuid::Uuid;

use tricoach_core::milestone::evaluate_date_milestones;
use tricoach_core::session::compliance::{compliance_in_range, this_week_summary, week_bounds};
use tricoach_core::session::dispatch::{skip_session, unskip_session};
use tricoach_core::session::{MatchOutcome, record_log};
use tricoach_db::TrainingStore;
use tricoach_db::models::{MilestoneStatus, NewBodyMetrics, NewSessionLog, Sport};

use crate::SessionCommands;
use crate::app::App;

const DEFAULT_LIST_DAYS: u64 = 7;

pub async fn run_session_command(app: &App, command: SessionCommands) -> Result<()> {
    match command {
        SessionCommands::List { from, to } => cmd_list(app, from, to).await,
        SessionCommands::Skip { session_id } => {
            ensure_owned(app, session_id).await?;
            skip_session(app.store.as_ref(), session_id).await?;
            println!("Session {session_id} skipped.");
            Ok(())
        }
        SessionCommands::Unskip { session_id } => {
            ensure_owned(app, session_id).await?;
            unskip_session(app.store.as_ref(), session_id).await?;
            println!("Session {session_id} is planned again.");
            Ok(())
        }
    }
}

async fn ensure_owned(app: &App, session_id: Uuid) -> Result<()> {
    let athlete_id = app.athlete()?;
    let session = app
        .store
        .get_session(session_id)
        .await?
        .with_context(|| format!("session {session_id} not found"))?;
    if session.athlete_id != athlete_id {
        bail!("session {session_id} belongs to another athlete");
    }
    Ok(())
}

async fn cmd_list(app: &App, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<()> {
    let athlete_id = app.athlete()?;
    let from = from.unwrap_or_else(|| app.today());
    let to = match to {
        Some(to) => to,
        None => from
            .checked_add_days(Days::new(DEFAULT_LIST_DAYS - 1))
            .context("date out of range")?,
    };

    let sessions = app
        .store
        .list_sessions_in_range(athlete_id, from, to)
        .await?;
    if sessions.is_empty() {
        println!("No sessions between {from} and {to}.");
        return Ok(());
    }

    println!(
        "{:<10}  {:<8}  {:<10}  {:>4}  {:>6}  {:<8}  {:<9}  ID",
        "DATE", "SPORT", "TYPE", "MIN", "KM", "INTENS.", "STATUS"
    );
    for s in &sessions {
        let km = s
            .distance_km
            .map(|km| format!("{km:.1}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10}  {:<8}  {:<10}  {:>4}  {:>6}  {:<8}  {:<9}  {}",
            s.date.to_string(),
            s.sport.to_string(),
            s.workout_type,
            s.duration_min,
            km,
            s.intensity.to_string(),
            s.status.to_string(),
            s.id
        );
    }
    Ok(())
}

// -----------------------------------------------------------------------
// tricoach log
// -----------------------------------------------------------------------

pub struct LogArgs {
    pub sport: Sport,
    pub minutes: i32,
    pub km: Option<f64>,
    pub rpe: Option<i16>,
    pub workout_type: Option<String>,
    pub notes: Option<String>,
    pub date: Option<NaiveDate>,
}

pub async fn run_log(app: &App, args: LogArgs) -> Result<()> {
    let athlete_id = app.athlete()?;
    let log = NewSessionLog {
        athlete_id,
        date: args.date.unwrap_or_else(|| app.today()),
        sport: args.sport,
        workout_type: args.workout_type,
        duration_min: args.minutes,
        distance_km: args.km,
        rpe: args.rpe,
        notes: args.notes,
    };
    let outcome = record_log(
        app.store.as_ref(),
        &app.locks,
        &log,
        app.config.match_policy,
        Utc::now(),
    )
    .await?;

    println!("Logged {} on {} ({}).", outcome.log.sport, outcome.log.date, outcome.log.id);
    match outcome.matched {
        MatchOutcome::Completed(id) => println!("Planned session {id} marked completed."),
        MatchOutcome::Ambiguous(n) => println!(
            "{n} planned {} sessions that day; none marked completed (policy: {}).",
            outcome.log.sport, app.config.match_policy
        ),
        MatchOutcome::Lost {
            session_id,
            actual,
        } => match actual {
            Some(status) => println!(
                "Planned session {session_id} is {status} and was not marked completed."
            ),
            None => println!("Planned session {session_id} could not be marked completed."),
        },
        MatchOutcome::Unreconciled => {
            println!("Planned sessions could not be checked; the log is stored unmatched.")
        }
        MatchOutcome::NoCandidate => {}
    }
    for m in &outcome.milestones_achieved {
        println!("Milestone reached: {}", m.title);
    }
    Ok(())
}

// -----------------------------------------------------------------------
// tricoach metrics
// -----------------------------------------------------------------------

pub async fn run_metrics(
    app: &App,
    weight_kg: Option<f64>,
    sleep_hours: Option<f64>,
    fatigue: Option<i16>,
    notes: Option<String>,
    date: Option<NaiveDate>,
) -> Result<()> {
    if weight_kg.is_none() && sleep_hours.is_none() && fatigue.is_none() && notes.is_none() {
        bail!("give at least one of --weight, --sleep, --fatigue or --notes");
    }
    if let Some(f) = fatigue.filter(|f| !(1..=10).contains(f)) {
        bail!("fatigue must be between 1 and 10, got {f}");
    }

    let athlete_id = app.athlete()?;
    let entry = app
        .store
        .upsert_body_metrics(&NewBodyMetrics {
            athlete_id,
            date: date.unwrap_or_else(|| app.today()),
            weight_kg,
            sleep_hours,
            fatigue,
            notes,
        })
        .await?;
    println!("Body metrics saved for {}.", entry.date);
    Ok(())
}

// -----------------------------------------------------------------------
// tricoach compliance
// -----------------------------------------------------------------------

pub async fn run_compliance(
    app: &App,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<()> {
    let athlete_id = app.athlete()?;

    if from.is_none() && to.is_none() {
        let week = this_week_summary(app.store.as_ref(), athlete_id, app.today()).await?;
        let c = &week.compliance;
        println!("Week {} to {}: {}% compliance", week.from, week.to, c.percent);
        println!(
            "  completed={} skipped={} planned={} cancelled={}",
            c.completed, c.skipped, c.planned, c.cancelled
        );
        println!();
        println!("Logged volume:");
        for v in &week.volume {
            println!(
                "  {:<8} {:>2} sessions  {:>4} min  {:>6.1} km",
                v.sport.to_string(),
                v.sessions,
                v.minutes,
                v.km
            );
        }
        return Ok(());
    }

    let (week_from, week_to) = week_bounds(app.today());
    let from = from.unwrap_or(week_from);
    let to = to.unwrap_or(week_to);
    if to < from {
        bail!("--to ({to}) is before --from ({from})");
    }
    let c = compliance_in_range(app.store.as_ref(), athlete_id, from, to).await?;
    println!(
        "{from} to {to}: {}% compliance ({} of {} sessions completed)",
        c.percent, c.completed, c.total
    );
    println!(
        "  completed={} skipped={} planned={} cancelled={}",
        c.completed, c.skipped, c.planned, c.cancelled
    );
    Ok(())
}

// -----------------------------------------------------------------------
// tricoach milestones
// -----------------------------------------------------------------------

pub async fn run_milestones(app: &App) -> Result<()> {
    let athlete_id = app.athlete()?;
    let flipped =
        evaluate_date_milestones(app.store.as_ref(), athlete_id, app.today(), Utc::now()).await?;
    for m in &flipped {
        println!("Milestone reached: {}", m.title);
    }

    let milestones = app.store.list_milestones(athlete_id).await?;
    if milestones.is_empty() {
        println!("No milestones. Run `tricoach onboard` to add the defaults.");
        return Ok(());
    }
    for m in &milestones {
        let mark = match m.status {
            MilestoneStatus::Achieved => "x",
            MilestoneStatus::Upcoming => " ",
        };
        let when = match (m.achieved_at, m.target_date) {
            (Some(at), _) => format!("achieved {}", at.format("%Y-%m-%d")),
            (None, Some(date)) => format!("on {date}"),
            (None, None) => String::new(),
        };
        println!("[{mark}] {:<40} {when}", m.title);
    }
    Ok(())
}
