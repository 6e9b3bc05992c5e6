//! Runtime configuration
//!
//! Defaults work out of the box. `PROMPT_MASTER_*` environment variables
//! override individual fields after an optional `.env` file is loaded.

use std::{path::PathBuf, time::Duration};

use crate::errors::{CompanionError, Result};

/// Application configuration, owned by the `App`
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the preference/mirror database
    pub data_dir: PathBuf,

    /// Database filename inside `data_dir`
    pub db_file: String,

    /// Interface the pairing transport listens on
    pub bind_host: String,

    /// Port for the pairing transport; 0 asks the OS for a free one
    pub bind_port: u16,

    /// Presentational pause before an accepted snapshot is surfaced.
    /// Zero by default; correctness never depends on it.
    pub accept_delay: Duration,

    /// Locale used until a preference is persisted
    pub default_locale: String,

    /// Theme used until a preference is persisted
    pub default_theme: String,

    /// Optional directory of `<locale>.json` tables overriding the bundled ones
    pub locale_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|d| d.join("prompt-master"))
            .unwrap_or_else(|| PathBuf::from(".prompt-master"));

        Self {
            data_dir,
            db_file: "prompt-master.db".to_string(),
            bind_host: "127.0.0.1".to_string(),
            bind_port: 0,
            accept_delay: Duration::ZERO,
            default_locale: "en".to_string(),
            default_theme: "light".to_string(),
            locale_dir: None,
        }
    }
}

impl AppConfig {
    /// Full path of the SQLite database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    /// Bind address string for the transport listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }

    /// Build a config from defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, get: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = get("PROMPT_MASTER_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(file) = get("PROMPT_MASTER_DB_FILE") {
            self.db_file = file;
        }
        if let Some(host) = get("PROMPT_MASTER_BIND_HOST") {
            self.bind_host = host;
        }
        if let Some(port) = get("PROMPT_MASTER_BIND_PORT") {
            self.bind_port = port.parse().map_err(|_| {
                CompanionError::Config(format!("invalid PROMPT_MASTER_BIND_PORT: {}", port))
            })?;
        }
        if let Some(ms) = get("PROMPT_MASTER_ACCEPT_DELAY_MS") {
            let ms: u64 = ms.parse().map_err(|_| {
                CompanionError::Config(format!("invalid PROMPT_MASTER_ACCEPT_DELAY_MS: {}", ms))
            })?;
            self.accept_delay = Duration::from_millis(ms);
        }
        if let Some(locale) = get("PROMPT_MASTER_LOCALE") {
            self.default_locale = locale;
        }
        if let Some(theme) = get("PROMPT_MASTER_THEME") {
            self.default_theme = theme;
        }
        if let Some(dir) = get("PROMPT_MASTER_LOCALE_DIR") {
            self.locale_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }
}
