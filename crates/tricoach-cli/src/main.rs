mod app;
mod channel_cmds;
mod coach_cmd;
mod config;
mod plan_cmds;
mod profile_cmd;
mod session_cmds;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use tricoach_db::models::{Experience, GoalTier, Sport};
use tricoach_db::pool;

use app::App;
use config::TricoachConfig;

#[derive(Parser)]
#[command(name = "tricoach", about = "Triathlon training plans with a coach in the loop")]
struct Cli {
    /// Database URL (overrides TRICOACH_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Athlete ID (overrides TRICOACH_ATHLETE_ID env var and the config file)
    #[arg(long, global = true)]
    athlete: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a tricoach config file with a fresh athlete ID (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/tricoach")]
        db_url: String,
        /// Advisory endpoint URL
        #[arg(long)]
        advisory_url: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create and migrate the tricoach database
    DbInit,
    /// Athlete profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Finish onboarding: derive the plan, sessions and milestones
    Onboard,
    /// Training plan
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Planned sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Record a completed activity
    Log {
        /// swim, bike, run or strength
        sport: Sport,
        /// Duration in minutes
        #[arg(long)]
        minutes: i32,
        /// Distance in kilometres
        #[arg(long)]
        km: Option<f64>,
        /// Perceived effort, 1-10
        #[arg(long)]
        rpe: Option<i16>,
        /// Workout type (e.g. Intervals)
        #[arg(long = "type")]
        workout_type: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Activity date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Record body metrics for a day
    Metrics {
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        sleep: Option<f64>,
        /// Fatigue, 1-10
        #[arg(long)]
        fatigue: Option<i16>,
        #[arg(long)]
        notes: Option<String>,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show compliance for a date range (defaults to the current week)
    Compliance {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// List milestones, flipping any date milestone that has come due
    Milestones,
    /// Ask the coach
    Coach {
        #[command(subcommand)]
        command: CoachCommands,
    },
    /// Issue a pairing code for linking a chat
    Pair,
    /// Feed one inbound chat message through the channel router
    Message {
        /// Channel name (e.g. telegram)
        #[arg(long, default_value = "cli")]
        channel: String,
        /// External chat ID on that channel
        #[arg(long)]
        from: String,
        /// Message text
        text: String,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Create or update profile fields (saves one onboarding step)
    Set(ProfileArgs),
    /// Show the profile
    Show,
}

#[derive(clap::Args, Debug, Default)]
pub struct ProfileArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub age: Option<i32>,
    /// Body weight in kg
    #[arg(long)]
    pub weight: Option<f64>,
    /// Height in cm
    #[arg(long)]
    pub height: Option<f64>,
    /// beginner, intermediate or advanced
    #[arg(long)]
    pub experience: Option<Experience>,
    /// finish, sub6 or sub5
    #[arg(long)]
    pub goal: Option<GoalTier>,
    #[arg(long)]
    pub race_date: Option<NaiveDate>,
    #[arg(long)]
    pub race_name: Option<String>,
    #[arg(long)]
    pub race_location: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long)]
    pub weekly_hours: Option<f64>,
    #[arg(long)]
    pub pool_days: Option<i32>,
    #[arg(long)]
    pub gym_access: Option<bool>,
    /// Can swim the race distance without stopping
    #[arg(long)]
    pub can_swim_race_distance: Option<bool>,
    /// Swim pace in seconds per 100 m
    #[arg(long)]
    pub swim_pace: Option<i32>,
    /// Functional threshold power in watts
    #[arg(long)]
    pub ftp: Option<i32>,
    /// 5K run time in minutes
    #[arg(long)]
    pub run_5k: Option<f64>,
    #[arg(long)]
    pub travel_notes: Option<String>,
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Show the active plan
    Show,
    /// Regenerate future sessions from the plan
    Refresh {
        /// Days to generate ahead (defaults to planning.horizon_days)
        #[arg(long)]
        horizon: Option<u32>,
    },
    /// Projected finish time and goal realism
    Projection,
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// List sessions in a date range (defaults to the next 7 days)
    List {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Skip a planned session
    Skip {
        /// Session ID
        session_id: Uuid,
    },
    /// Take a skip back
    Unskip {
        /// Session ID
        session_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum CoachCommands {
    /// Send a chat message to the coach
    Chat {
        /// Message text
        message: String,
    },
    /// Weekly review
    Summary,
    /// Fueling advice for the coming sessions
    Nutrition,
}

/// Execute the `tricoach init` command: write config file.
fn cmd_init(db_url: &str, advisory_url: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let athlete_id = Uuid::new_v4();
    let cfg = config::ConfigFile {
        athlete_id: Some(athlete_id),
        database: config::DatabaseSection {
            url: db_url.to_string(),
            max_connections: None,
        },
        advisory: advisory_url.map(|url| config::AdvisorySection {
            url,
            api_key: None,
            timeout_secs: None,
        }),
        planning: config::PlanningSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  athlete_id = {athlete_id}");
    println!("  database.url = {db_url}");
    if let Some(advisory) = &cfg.advisory {
        println!("  advisory.url = {}", advisory.url);
    }
    println!();
    println!("Next: run `tricoach db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `tricoach db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &TricoachConfig) -> anyhow::Result<()> {
    println!("Initializing tricoach database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("tricoach db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Init {
        db_url,
        advisory_url,
        force,
    } = cli.command
    {
        return cmd_init(&db_url, advisory_url, force);
    }

    let resolved = TricoachConfig::resolve(cli.database_url.as_deref(), cli.athlete)?;
    if let Commands::DbInit = cli.command {
        return cmd_db_init(&resolved).await;
    }

    let app = App::connect(resolved).await?;
    let result = run(&app, cli.command).await;
    app.close().await;
    result
}

async fn run(app: &App, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init { .. } | Commands::DbInit => Ok(()),
        Commands::Profile { command } => profile_cmd::run_profile_command(app, command).await,
        Commands::Onboard => plan_cmds::run_onboard(app).await,
        Commands::Plan { command } => plan_cmds::run_plan_command(app, command).await,
        Commands::Sessions { command } => session_cmds::run_session_command(app, command).await,
        Commands::Log {
            sport,
            minutes,
            km,
            rpe,
            workout_type,
            notes,
            date,
        } => {
            let log = session_cmds::LogArgs {
                sport,
                minutes,
                km,
                rpe,
                workout_type,
                notes,
                date,
            };
            session_cmds::run_log(app, log).await
        }
        Commands::Metrics {
            weight,
            sleep,
            fatigue,
            notes,
            date,
        } => session_cmds::run_metrics(app, weight, sleep, fatigue, notes, date).await,
        Commands::Compliance { from, to } => session_cmds::run_compliance(app, from, to).await,
        Commands::Milestones => session_cmds::run_milestones(app).await,
        Commands::Coach { command } => coach_cmd::run_coach_command(app, command).await,
        Commands::Pair => channel_cmds::run_pair(app).await,
        Commands::Message {
            channel,
            from,
            text,
        } => channel_cmds::run_message(app, &channel, &from, &text).await,
    }
}
