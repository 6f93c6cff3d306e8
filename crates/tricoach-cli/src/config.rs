//! Configuration file management for tricoach.
//!
//! Provides a TOML-based config file at `~/.config/tricoach/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tricoach_core::coach::DEFAULT_ADVISORY_TIMEOUT;
use tricoach_core::planning::DEFAULT_HORIZON_DAYS;
use tricoach_core::session::MatchPolicy;
use tricoach_db::config::DbConfig;

pub const ATHLETE_ENV: &str = "TRICOACH_ATHLETE_ID";
pub const ADVISORY_URL_ENV: &str = "TRICOACH_ADVISORY_URL";
pub const ADVISORY_KEY_ENV: &str = "TRICOACH_ADVISORY_KEY";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Athlete used when `--athlete` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub athlete_id: Option<Uuid>,
    pub database: DatabaseSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory: Option<AdvisorySection>,
    #[serde(default)]
    pub planning: PlanningSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdvisorySection {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanningSection {
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    #[serde(default)]
    pub match_policy: MatchPolicy,
}

fn default_horizon_days() -> u32 {
    DEFAULT_HORIZON_DAYS
}

impl Default for PlanningSection {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            match_policy: MatchPolicy::default(),
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the tricoach config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/tricoach` or `~/.config/tricoach`,
/// also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("tricoach");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("tricoach")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents).context("failed to parse config file")
}

/// Serialize and write the config file, creating parent dirs as needed.
/// The file may hold the advisory API key, so it is made owner-only on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AdvisoryConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct TricoachConfig {
    pub db_config: DbConfig,
    pub athlete_id: Option<Uuid>,
    /// `None` when no advisory endpoint is configured.
    pub advisory: Option<AdvisoryConfig>,
    pub horizon_days: u32,
    pub match_policy: MatchPolicy,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl TricoachConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `TRICOACH_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Athlete: `cli_athlete` > `TRICOACH_ATHLETE_ID` > `athlete_id` > unset
    /// - Advisory URL: `TRICOACH_ADVISORY_URL` > `advisory.url` > unset; the key
    ///   follows the same chain with `TRICOACH_ADVISORY_KEY` and `advisory.api_key`
    pub fn resolve(cli_db_url: Option<&str>, cli_athlete: Option<Uuid>) -> Result<Self> {
        let file_config = load_config().ok();

        let max_connections = file_config.as_ref().and_then(|cfg| cfg.database.max_connections);
        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Some(url) = env_var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let athlete_id = if let Some(id) = cli_athlete {
            Some(id)
        } else if let Some(raw) = env_var(ATHLETE_ENV) {
            Some(
                Uuid::parse_str(raw.trim())
                    .with_context(|| format!("{ATHLETE_ENV} is not a valid UUID: {raw}"))?,
            )
        } else {
            file_config.as_ref().and_then(|cfg| cfg.athlete_id)
        };

        let file_advisory = file_config.as_ref().and_then(|cfg| cfg.advisory.as_ref());
        let advisory_url =
            env_var(ADVISORY_URL_ENV).or_else(|| file_advisory.map(|a| a.url.clone()));
        let advisory = advisory_url.map(|url| AdvisoryConfig {
            url,
            api_key: env_var(ADVISORY_KEY_ENV)
                .or_else(|| file_advisory.and_then(|a| a.api_key.clone())),
            timeout: file_advisory
                .and_then(|a| a.timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_ADVISORY_TIMEOUT),
        });

        let planning = file_config.map(|cfg| cfg.planning).unwrap_or_default();
        if planning.horizon_days == 0 {
            bail!("planning.horizon_days must be at least 1");
        }

        Ok(Self {
            db_config: match max_connections {
                Some(n) => DbConfig::new(db_url).with_max_connections(n),
                None => DbConfig::new(db_url),
            },
            athlete_id,
            advisory,
            horizon_days: planning.horizon_days,
            match_policy: planning.match_policy,
        })
    }

    /// The athlete to act on, or an error pointing at the ways to set one.
    pub fn require_athlete(&self) -> Result<Uuid> {
        self.athlete_id.with_context(|| {
            format!("no athlete selected; pass --athlete, set {ATHLETE_ENV}, or run `tricoach init`")
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
