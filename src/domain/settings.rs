//! Runtime settings assembled from the INI config and environment overrides.
//!
//! Precedence for every value: environment variable, then config key, then
//! built-in default. The environment is passed in as a lookup function so the
//! same code runs against `std::env::var` in the binary and a fixed map in tests.

use std::path::{Path, PathBuf};

use crate::domain::error::SegviewError;
use crate::domain::session::{DEFAULT_SESSION_END_MIN, DEFAULT_SESSION_START_MIN, SessionWindow};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_DATA_BASE: &str = "~/Fin/Data";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8000";
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Data root plus the optional per-kind overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDirs {
    pub base: PathBuf,
    pub classified_dir: Option<PathBuf>,
    pub raw_vectors_dir: Option<PathBuf>,
    pub alerts_dir: Option<PathBuf>,
    pub alerts_file: Option<PathBuf>,
    pub trades_dir: Option<PathBuf>,
    pub trades_file: Option<PathBuf>,
}

impl DataDirs {
    /// Data root with no overrides.
    pub fn rooted_at(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            classified_dir: None,
            raw_vectors_dir: None,
            alerts_dir: None,
            alerts_file: None,
            trades_dir: None,
            trades_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub dirs: DataDirs,
    pub session: SessionWindow,
    pub listen: String,
    pub static_dir: PathBuf,
}

impl Settings {
    pub fn load<F>(config: &dyn ConfigPort, env: F) -> Result<Self, SegviewError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let home = env("HOME");
        let path = |env_names: &[&str], key: &str| -> Option<PathBuf> {
            env_names
                .iter()
                .find_map(|name| env(name))
                .or_else(|| config.get_nonempty("data", key))
                .map(|raw| expand_home(&raw, home.as_deref()))
        };

        let base = path(&["DATA_BASE", "FIN_DATA"], "base")
            .unwrap_or_else(|| expand_home(DEFAULT_DATA_BASE, home.as_deref()));

        let dirs = DataDirs {
            base,
            classified_dir: path(&["CLASSIFIED_DIR"], "classified_dir"),
            raw_vectors_dir: path(&["RAW_VECTORS_DIR"], "raw_vectors_dir"),
            alerts_dir: path(&["ALERTS_DIR"], "alerts_dir"),
            alerts_file: path(&["ALERTS_FILE"], "alerts_file"),
            trades_dir: path(&["TRADES_DIR"], "trades_dir"),
            trades_file: path(&["TRADES_FILE"], "trades_file"),
        };

        let start = session_minute(config, "start", DEFAULT_SESSION_START_MIN)?;
        let end = session_minute(config, "end", DEFAULT_SESSION_END_MIN)?;
        let session = SessionWindow::new(start, end)?;

        let mut listen = config
            .get_nonempty("web", "listen")
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        if let Some(port) = env("PORT") {
            listen = with_port(&listen, &port)?;
        }

        let static_dir = config
            .get_nonempty("web", "static_dir")
            .map(|raw| expand_home(&raw, home.as_deref()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        Ok(Self {
            dirs,
            session,
            listen,
            static_dir,
        })
    }
}

fn session_minute(config: &dyn ConfigPort, key: &str, default: u32) -> Result<u32, SegviewError> {
    config
        .get_time_of_day("session", key, default)
        .ok_or_else(|| SegviewError::ConfigInvalid {
            section: "session".into(),
            key: key.into(),
            reason: "expected HH:MM or minutes since midnight".into(),
        })
}

fn with_port(listen: &str, port: &str) -> Result<String, SegviewError> {
    if port.parse::<u16>().is_err() {
        return Err(SegviewError::ConfigInvalid {
            section: "web".into(),
            key: "PORT".into(),
            reason: format!("not a port number: {port}"),
        });
    }
    let host = listen.rsplit_once(':').map_or(listen, |(host, _)| host);
    Ok(format!("{host}:{port}"))
}

/// Leading `~` becomes the home directory when one is known.
pub fn expand_home(raw: &str, home: Option<&str>) -> PathBuf {
    match (raw.strip_prefix('~'), home) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            Path::new(home).join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(raw),
    }
}
