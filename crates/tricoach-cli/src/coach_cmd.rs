//! `tricoach coach chat|summary|nutrition`.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use tricoach_core::coach::{AdvisoryMode, ChangeOutcome, CoachCall, run_coach};

use crate::CoachCommands;
use crate::app::App;

pub async fn run_coach_command(app: &App, command: CoachCommands) -> Result<()> {
    let (mode, user_message) = match command {
        CoachCommands::Chat { message } => (AdvisoryMode::Chat, Some(message)),
        CoachCommands::Summary => (AdvisoryMode::Summary, None),
        CoachCommands::Nutrition => (AdvisoryMode::Nutrition, None),
    };

    let athlete_id = app.athlete()?;
    let advisor = app.advisor()?.with_context(|| {
        format!(
            "no advisory endpoint configured; set {} or [advisory].url",
            crate::config::ADVISORY_URL_ENV
        )
    })?;
    let timeout = app
        .config
        .advisory
        .as_ref()
        .map(|a| a.timeout)
        .unwrap_or(tricoach_core::coach::DEFAULT_ADVISORY_TIMEOUT);

    // Ctrl+C abandons the call; nothing is applied or persisted then.
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling coach request...");
            cancel_on_signal.cancel();
        }
    });

    let call = CoachCall {
        athlete_id,
        mode,
        user_message,
        today: app.today(),
    };
    let result = run_coach(
        app.store.as_ref(),
        &app.locks,
        advisor.as_ref(),
        &call,
        timeout,
        &cancel,
    )
    .await;
    signal_task.abort();
    let reply = result?;

    println!("{}", reply.message);
    if !reply.outcomes.is_empty() {
        println!();
        println!("Plan changes:");
        for outcome in &reply.outcomes {
            match outcome {
                ChangeOutcome::Applied { change, created } => match created {
                    Some(id) => println!("  applied  {} (new session {id})", change.action()),
                    None => println!("  applied  {}", change.action()),
                },
                ChangeOutcome::Skipped { change, reason } => {
                    println!("  skipped  {}: {reason}", change.action())
                }
            }
        }
    }
    Ok(())
}
