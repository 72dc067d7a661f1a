//! Configuration for the chess arena server
//!
//! Every setting comes from a `CHESS_ARENA_*` environment variable with a
//! compiled-in default. Values that fail to parse fall back to the default.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::session::SessionSettings;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DATA_DIR: &str = ".local/share/chess-arena";
const DEV_DATA_DIR: &str = "./data";
const DEFAULT_GRACE_SECS: u64 = 30;
const DEFAULT_START_WINDOW_SECS: u64 = 60;
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 100;
const DEFAULT_CLOCK_UPDATE_MS: u64 = 1000;
const DEFAULT_RETENTION_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn env_parsed<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparsable setting");
                default
            }
        },
        Err(_) => default,
    }
}

pub fn get_bind_addr() -> SocketAddr {
    let fallback = SocketAddr::from(([0, 0, 0, 0], 8080));
    let default = DEFAULT_BIND_ADDR.parse().unwrap_or(fallback);
    env_parsed("CHESS_ARENA_BIND_ADDR", default)
}

/// Get the data directory for the archive.
///
/// Priority:
/// 1. CHESS_ARENA_DATA_DIR env variable if set
/// 2. $HOME/.local/share/chess-arena if HOME is set
/// 3. ./data as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHESS_ARENA_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_DATA_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

/// Directory for rolling log files; file logging is off when unset.
pub fn get_log_dir() -> Option<PathBuf> {
    std::env::var("CHESS_ARENA_LOG_DIR").ok().map(PathBuf::from)
}

pub fn get_grace() -> Duration {
    Duration::from_secs(env_parsed("CHESS_ARENA_GRACE_SECS", DEFAULT_GRACE_SECS))
}

pub fn get_start_window() -> Duration {
    Duration::from_secs(env_parsed(
        "CHESS_ARENA_START_WINDOW_SECS",
        DEFAULT_START_WINDOW_SECS,
    ))
}

pub fn get_sweep_interval() -> Duration {
    // A zero interval would panic in tokio::time::interval.
    let ms = env_parsed("CHESS_ARENA_SWEEP_INTERVAL_MS", DEFAULT_SWEEP_INTERVAL_MS).max(1);
    Duration::from_millis(ms)
}

pub fn get_clock_update_interval() -> Duration {
    Duration::from_millis(env_parsed(
        "CHESS_ARENA_CLOCK_UPDATE_MS",
        DEFAULT_CLOCK_UPDATE_MS,
    ))
}

pub fn get_retention() -> Duration {
    Duration::from_secs(env_parsed(
        "CHESS_ARENA_RETENTION_SECS",
        DEFAULT_RETENTION_SECS,
    ))
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub sweep_interval: Duration,
    pub session: SessionSettings,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: get_bind_addr(),
            data_dir: get_data_dir(),
            log_dir: get_log_dir(),
            sweep_interval: get_sweep_interval(),
            session: SessionSettings {
                grace: get_grace(),
                start_window: get_start_window(),
                clock_update_interval: get_clock_update_interval(),
                retention: get_retention(),
            },
        }
    }

    pub fn ensure_data_dir(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_dir).map_err(|source| ConfigError::DataDir {
            path: self.data_dir.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parsed_falls_back() {
        std::env::set_var("CHESS_ARENA_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_parsed("CHESS_ARENA_TEST_GARBAGE", 7u64), 7);
        std::env::set_var("CHESS_ARENA_TEST_NUMBER", " 42 ");
        assert_eq!(env_parsed("CHESS_ARENA_TEST_NUMBER", 7u64), 42);
        assert_eq!(env_parsed("CHESS_ARENA_TEST_UNSET_KEY", 7u64), 7);
    }

    #[test]
    fn test_get_data_dir_fallback() {
        // Returns whichever source applies in the test environment.
        let dir = get_data_dir();
        assert!(!dir.as_os_str().is_empty());
    }

    #[test]
    fn test_sweep_interval_is_positive() {
        assert!(!get_sweep_interval().is_zero());
    }

    #[test]
    fn test_ensure_data_dir_creates_nested_path() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::from_env();
        config.data_dir = tmp.path().join("a").join("b");
        config.ensure_data_dir().unwrap();
        assert!(config.data_dir.is_dir());
    }
}
