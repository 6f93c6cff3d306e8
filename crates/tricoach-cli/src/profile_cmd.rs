//! `tricoach profile set|show`.

use anyhow::Result;

use tricoach_core::onboarding::save_profile_step;
use tricoach_db::TrainingStore;
use tricoach_db::models::AthleteProfile;

use crate::app::App;
use crate::{ProfileArgs, ProfileCommands};

pub async fn run_profile_command(app: &App, command: ProfileCommands) -> Result<()> {
    match command {
        ProfileCommands::Set(args) => cmd_set(app, args).await,
        ProfileCommands::Show => cmd_show(app).await,
    }
}

/// Overlay the flags that were given onto `profile`. Returns whether any was.
fn apply_args(profile: &mut AthleteProfile, args: ProfileArgs) -> bool {
    let before = serde_json::to_value(&*profile).ok();

    if let Some(v) = args.name {
        profile.display_name = Some(v);
    }
    if let Some(v) = args.age {
        profile.age = Some(v);
    }
    if let Some(v) = args.weight {
        profile.weight_kg = Some(v);
    }
    if let Some(v) = args.height {
        profile.height_cm = Some(v);
    }
    if let Some(v) = args.experience {
        profile.experience = v;
    }
    if let Some(v) = args.goal {
        profile.goal = v;
    }
    if let Some(v) = args.race_date {
        profile.race_date = Some(v);
    }
    if let Some(v) = args.race_name {
        profile.race_name = Some(v);
    }
    if let Some(v) = args.race_location {
        profile.race_location = Some(v);
    }
    if let Some(v) = args.priority {
        profile.priority = Some(v);
    }
    if let Some(v) = args.weekly_hours {
        profile.weekly_hours = Some(v);
    }
    if let Some(v) = args.pool_days {
        profile.pool_days = Some(v);
    }
    if let Some(v) = args.gym_access {
        profile.gym_access = v;
    }
    if let Some(v) = args.can_swim_race_distance {
        profile.can_swim_race_distance = v;
    }
    if let Some(v) = args.swim_pace {
        profile.swim_pace_per_100m_sec = Some(v);
    }
    if let Some(v) = args.ftp {
        profile.bike_ftp_watts = Some(v);
    }
    if let Some(v) = args.run_5k {
        profile.run_5k_minutes = Some(v);
    }
    if let Some(v) = args.travel_notes {
        profile.travel_notes = Some(v);
    }

    before != serde_json::to_value(&*profile).ok()
}

async fn cmd_set(app: &App, args: ProfileArgs) -> Result<()> {
    let athlete_id = app.athlete()?;
    let mut profile = app
        .store
        .get_profile(athlete_id)
        .await?
        .unwrap_or_else(|| AthleteProfile::new(athlete_id));

    if !apply_args(&mut profile, args) {
        println!("Nothing to change.");
        return Ok(());
    }
    if !profile.completed {
        profile.onboarding_step += 1;
    }

    let saved = save_profile_step(app.store.as_ref(), &profile).await?;
    println!("Profile saved (step {}).", saved.onboarding_step);
    if saved.completed {
        println!("Run `tricoach onboard` to rebuild the plan from the new profile.");
    } else {
        println!("Run `tricoach onboard` when the profile is complete.");
    }
    Ok(())
}

fn opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

async fn cmd_show(app: &App) -> Result<()> {
    let athlete_id = app.athlete()?;
    let Some(p) = app.store.get_profile(athlete_id).await? else {
        println!("No profile for athlete {athlete_id}. Start with `tricoach profile set`.");
        return Ok(());
    };

    println!("Athlete:     {} ({})", opt(&p.display_name), p.athlete_id);
    let onboarding = if p.completed {
        "completed".to_string()
    } else {
        format!("step {}", p.onboarding_step)
    };
    println!("Onboarding:  {onboarding}");
    println!("Experience:  {}", p.experience);
    println!("Goal:        {}", p.goal);
    println!(
        "Race:        {} on {} at {}",
        opt(&p.race_name),
        opt(&p.race_date),
        opt(&p.race_location)
    );
    println!("Age:         {}", opt(&p.age));
    println!("Weight:      {} kg", opt(&p.weight_kg));
    println!("Height:      {} cm", opt(&p.height_cm));
    println!("Weekly hrs:  {}", opt(&p.weekly_hours));
    println!("Pool days:   {}", opt(&p.pool_days));
    println!("Gym access:  {}", p.gym_access);
    println!("Swim 1.9 km: {}", if p.can_swim_race_distance { "yes" } else { "not yet" });
    println!("Swim pace:   {} s/100m", opt(&p.swim_pace_per_100m_sec));
    println!("Bike FTP:    {} W", opt(&p.bike_ftp_watts));
    println!("Run 5K:      {} min", opt(&p.run_5k_minutes));
    if let Some(notes) = &p.travel_notes {
        println!("Travel:      {notes}");
    }
    Ok(())
}
