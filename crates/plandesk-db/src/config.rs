use std::path::PathBuf;

/// Database configuration.
///
/// The URL is chosen by the caller; [`DbConfig::default_url`] names a SQLite
/// file under the platform data directory.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full SQLite connection URL (`sqlite://<path>` or `sqlite::memory:`).
    pub database_url: String,
}

impl DbConfig {
    /// URL of a private in-memory database.
    pub const IN_MEMORY_URL: &str = "sqlite::memory:";

    /// Build a config from an explicit URL (useful for tests and CLI flags).
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// The default connection URL: `<data dir>/plandesk/plandesk.db`.
    pub fn default_url() -> String {
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plandesk");
        format!("sqlite://{}", dir.join("plandesk.db").display())
    }

    /// Whether this config points at an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    /// Filesystem path of the database file, if the URL names one.
    ///
    /// Returns `None` for in-memory URLs and URLs without a path.
    pub fn database_path(&self) -> Option<PathBuf> {
        if self.is_in_memory() {
            return None;
        }
        let rest = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().filter(|s| !s.is_empty())?;
        Some(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_is_sqlite_file() {
        let url = DbConfig::default_url();
        assert!(url.starts_with("sqlite://"), "got {url}");
        assert!(url.ends_with("plandesk.db"), "got {url}");
    }

    #[test]
    fn database_path_extraction() {
        let cfg = DbConfig::new("sqlite:///var/lib/plandesk/app.db?mode=rwc");
        assert_eq!(
            cfg.database_path(),
            Some(PathBuf::from("/var/lib/plandesk/app.db"))
        );
    }

    #[test]
    fn in_memory_has_no_path() {
        let cfg = DbConfig::new(DbConfig::IN_MEMORY_URL);
        assert!(cfg.is_in_memory());
        assert_eq!(cfg.database_path(), None);
    }

    #[test]
    fn explicit_new() {
        let cfg = DbConfig::new("sqlite://relative/other.db");
        assert_eq!(cfg.database_url, "sqlite://relative/other.db");
        assert_eq!(cfg.database_path(), Some(PathBuf::from("relative/other.db")));
    }
}
