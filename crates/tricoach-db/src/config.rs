use std::time::Duration;

/// Connection settings for the tricoach database.
///
/// The CLI resolves the URL (flag, `TRICOACH_DATABASE_URL`, config file);
/// this type only carries the result plus pool sizing.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/tricoach";

    /// Environment variable the CLI consults for the URL.
    pub const ENV_VAR: &str = "TRICOACH_DATABASE_URL";

    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
    pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Self::DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    /// Override the pool size. Zero is raised to one.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    /// The database name in the URL path, without query parameters.
    pub fn database_name(&self) -> Option<&str> {
        let (_, tail) = self.database_url.rsplit_once('/')?;
        let name = tail.split('?').next().unwrap_or(tail);
        (!name.is_empty()).then_some(name)
    }

    /// Same server, `postgres` database. `CREATE DATABASE` runs there.
    pub fn maintenance_url(&self) -> String {
        match self.database_url.rsplit_once('/') {
            Some((server, _)) => format!("{server}/postgres"),
            None => self.database_url.clone(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_tricoach() {
        let cfg = DbConfig::default();
        assert_eq!(cfg.database_name(), Some("tricoach"));
        assert_eq!(cfg.max_connections, DbConfig::DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn database_name_ignores_query_string() {
        let cfg = DbConfig::new("postgresql://db:5432/coach?sslmode=require");
        assert_eq!(cfg.database_name(), Some("coach"));
    }

    #[test]
    fn missing_name_is_none() {
        assert_eq!(DbConfig::new("postgresql://localhost:5432/").database_name(), None);
        assert_eq!(DbConfig::new("not a url").database_name(), None);
    }

    #[test]
    fn maintenance_url_swaps_the_database() {
        let cfg = DbConfig::new("postgresql://u:p@db.internal:6432/tricoach");
        assert_eq!(cfg.maintenance_url(), "postgresql://u:p@db.internal:6432/postgres");
    }

    #[test]
    fn pool_size_is_at_least_one() {
        let cfg = DbConfig::default().with_max_connections(0);
        assert_eq!(cfg.max_connections, 1);
        assert_eq!(DbConfig::default().with_max_connections(12).max_connections, 12);
    }
}
