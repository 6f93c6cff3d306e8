//! Shared state for commands that talk to the database.

use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use tricoach_core::AthleteLocks;
use tricoach_core::coach::{AdvisoryClient, HttpAdvisoryClient};
use tricoach_db::PgStore;
use tricoach_db::pool;

use crate::config::TricoachConfig;

pub struct App {
    pub store: Arc<PgStore>,
    pub locks: Arc<AthleteLocks>,
    pub config: TricoachConfig,
}

impl App {
    pub async fn connect(config: TricoachConfig) -> Result<Self> {
        let db_pool = pool::create_pool(&config.db_config).await?;
        Ok(Self {
            store: Arc::new(PgStore::new(db_pool)),
            locks: Arc::new(AthleteLocks::new()),
            config,
        })
    }

    pub async fn close(&self) {
        self.store.pool().close().await;
    }

    pub fn athlete(&self) -> Result<Uuid> {
        self.config.require_athlete()
    }

    /// Dates are UTC calendar days, matching the channel router.
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    /// The configured advisory client, if any.
    pub fn advisor(&self) -> Result<Option<Arc<dyn AdvisoryClient>>> {
        let Some(advisory) = &self.config.advisory else {
            return Ok(None);
        };
        let client = HttpAdvisoryClient::new(
            advisory.url.clone(),
            advisory.api_key.clone(),
            advisory.timeout,
        )?;
        Ok(Some(Arc::new(client)))
    }
}
