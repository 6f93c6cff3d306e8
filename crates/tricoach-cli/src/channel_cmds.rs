//! `tricoach pair` and `tricoach message`.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;

use tricoach_core::channel::{ChannelRouter, RouterSettings, issue_pairing_code};
use tricoach_db::TrainingStore;

use crate::app::App;

pub async fn run_pair(app: &App) -> Result<()> {
    let athlete_id = app.athlete()?;
    let issued = issue_pairing_code(app.store.as_ref(), athlete_id, Utc::now()).await?;
    println!("Pairing code: {}", issued.code);
    println!(
        "Send it to the bot before {}. Any earlier code no longer works.",
        issued.expires_at.format("%H:%M UTC")
    );
    Ok(())
}

/// Route one message as if it arrived on `channel` from `external_id` and
/// print the reply. The chat identity, not `--athlete`, selects the athlete.
pub async fn run_message(app: &App, channel: &str, external_id: &str, text: &str) -> Result<()> {
    let store: Arc<dyn TrainingStore> = app.store.clone();
    let settings = RouterSettings {
        match_policy: app.config.match_policy,
        coach_timeout: app
            .config
            .advisory
            .as_ref()
            .map(|a| a.timeout)
            .unwrap_or(RouterSettings::default().coach_timeout),
    };
    let router = ChannelRouter::new(store, Arc::clone(&app.locks), app.advisor()?, settings);

    let reply = router.handle(channel, external_id, text, Utc::now()).await?;
    println!("{reply}");
    Ok(())
}
