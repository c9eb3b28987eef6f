//! Configuration file management for plandesk.
//!
//! Provides a TOML-based config file at `~/.config/plandesk/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use plandesk_db::config::DbConfig;

/// Environment variable naming the default working directory for plans.
pub const PROJECT_ROOT_ENV: &str = "PROJECT_ROOT";

/// Environment variable overriding the database URL.
pub const DATABASE_URL_ENV: &str = "PLANDESK_DATABASE_URL";

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Working directory used when a request does not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_working_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the plandesk config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/plandesk` or `~/.config/plandesk`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("plandesk");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("plandesk")
}

/// Return the path to the plandesk config file.
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
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
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

    Ok(path)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Settings the plan API needs at request time.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Working directory for requests that do not supply `workingDir`.
    pub default_working_dir: PathBuf,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct PlandeskConfig {
    pub db_config: DbConfig,
    pub api: ApiConfig,
    pub bind: String,
    pub port: u16,
}

impl PlandeskConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// A missing or unreadable config file is treated as empty.
    pub fn resolve(cli_db_url: Option<&str>, cli_working_dir: Option<&str>) -> Result<Self> {
        Self::resolve_from(load_config().ok(), cli_db_url, cli_working_dir)
    }

    /// Resolution against an already-loaded config file.
    ///
    /// - DB URL: `cli_db_url` > `PLANDESK_DATABASE_URL` > `database.url` > [`DbConfig::default_url`]
    /// - Working dir: `cli_working_dir` > `PROJECT_ROOT` > `server.default_working_dir` > current dir
    pub fn resolve_from(
        file_config: Option<ConfigFile>,
        cli_db_url: Option<&str>,
        cli_working_dir: Option<&str>,
    ) -> Result<Self> {
        let file_config = file_config.unwrap_or_default();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Some(url) = non_empty_env(DATABASE_URL_ENV) {
            url
        } else if let Some(url) = file_config.database.url {
            url
        } else {
            DbConfig::default_url()
        };

        let default_working_dir = if let Some(dir) = cli_working_dir {
            PathBuf::from(dir)
        } else if let Some(dir) = non_empty_env(PROJECT_ROOT_ENV) {
            PathBuf::from(dir)
        } else if let Some(dir) = file_config.server.default_working_dir {
            dir
        } else {
            std::env::current_dir().context("failed to get current directory")?
        };

        Ok(Self {
            db_config: DbConfig::new(db_url),
            api: ApiConfig {
                default_working_dir,
            },
            bind: file_config
                .server
                .bind
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port: file_config.server.port.unwrap_or(DEFAULT_PORT),
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    fn clear_env() {
        unsafe { std::env::remove_var(PROJECT_ROOT_ENV) };
        unsafe { std::env::remove_var(DATABASE_URL_ENV) };
    }

    fn file_with(dir: Option<&str>, url: Option<&str>) -> ConfigFile {
        ConfigFile {
            server: ServerSection {
                bind: Some("0.0.0.0".into()),
                port: Some(8080),
                default_working_dir: dir.map(PathBuf::from),
            },
            database: DatabaseSection {
                url: url.map(str::to_string),
            },
        }
    }

    #[test]
    fn config_file_roundtrip_omits_unset_fields() {
        let original = file_with(Some("/srv/project"), None);
        let contents = toml::to_string_pretty(&original).unwrap();
        assert!(!contents.contains("url"));

        let loaded: ConfigFile = toml::from_str(&contents).unwrap();
        assert_eq!(
            loaded.server.default_working_dir,
            Some(PathBuf::from("/srv/project"))
        );
        assert_eq!(loaded.server.port, Some(8080));
        assert!(loaded.database.url.is_none());
    }

    #[test]
    fn empty_config_file_parses() {
        let loaded: ConfigFile = toml::from_str("").unwrap();
        assert!(loaded.server.bind.is_none());
        assert!(loaded.database.url.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let path = save_config(&ConfigFile::default()).unwrap();
        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };

        assert_eq!(path, tmp.path().join("plandesk").join("config.toml"));
        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn cli_flags_override_all() {
        let _lock = lock_env();
        unsafe { std::env::set_var(PROJECT_ROOT_ENV, "/env/root") };
        unsafe { std::env::set_var(DATABASE_URL_ENV, "sqlite://env.db") };

        let config = PlandeskConfig::resolve_from(
            Some(file_with(Some("/file/root"), Some("sqlite://file.db"))),
            Some("sqlite://cli.db"),
            Some("/cli/root"),
        )
        .unwrap();
        clear_env();

        assert_eq!(config.db_config.database_url, "sqlite://cli.db");
        assert_eq!(config.api.default_working_dir, PathBuf::from("/cli/root"));
    }

    #[test]
    fn env_overrides_config_file() {
        let _lock = lock_env();
        unsafe { std::env::set_var(PROJECT_ROOT_ENV, "/env/root") };
        unsafe { std::env::set_var(DATABASE_URL_ENV, "sqlite://env.db") };

        let config = PlandeskConfig::resolve_from(
            Some(file_with(Some("/file/root"), Some("sqlite://file.db"))),
            None,
            None,
        )
        .unwrap();
        clear_env();

        assert_eq!(config.db_config.database_url, "sqlite://env.db");
        assert_eq!(config.api.default_working_dir, PathBuf::from("/env/root"));
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn config_file_used_when_env_unset() {
        let _lock = lock_env();
        clear_env();

        let config = PlandeskConfig::resolve_from(
            Some(file_with(Some("/file/root"), Some("sqlite://file.db"))),
            None,
            None,
        )
        .unwrap();

        assert_eq!(config.db_config.database_url, "sqlite://file.db");
        assert_eq!(config.api.default_working_dir, PathBuf::from("/file/root"));
    }

    #[test]
    fn falls_back_to_current_dir_and_defaults() {
        let _lock = lock_env();
        clear_env();

        let config = PlandeskConfig::resolve_from(None, None, None).unwrap();

        assert_eq!(
            config.api.default_working_dir,
            std::env::current_dir().unwrap()
        );
        assert_eq!(config.db_config.database_url, DbConfig::default_url());
        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn blank_project_root_is_ignored() {
        let _lock = lock_env();
        clear_env();
        unsafe { std::env::set_var(PROJECT_ROOT_ENV, "   ") };

        let config =
            PlandeskConfig::resolve_from(Some(file_with(Some("/file/root"), None)), None, None)
                .unwrap();
        clear_env();

        assert_eq!(config.api.default_working_dir, PathBuf::from("/file/root"));
    }
}
