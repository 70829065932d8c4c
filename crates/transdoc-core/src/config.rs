//! Client configuration: built-in defaults, an optional TOML file, and overrides
//! applied by the binaries from environment variables and flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::CoreError;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_millis(1000);
const DEFAULT_FINAL_REFRESH_DELAY: Duration = Duration::from_millis(800);
const DEFAULT_BLOCK_PAGE_LIMIT: usize = 5000;
const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(25);

/// Cadences of the two poll loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Progress tracker tick.
    pub status_interval: Duration,
    /// Block synchronizer tick, slower than the tracker.
    pub block_interval: Duration,
    /// Grace delay before the single block refresh that follows `finished`.
    pub final_refresh_delay: Duration,
    /// Page size of the single-page block fetch.
    pub block_page_limit: usize,
}

impl PollConfig {
    /// Derive the block cadence as 2.5x the status cadence.
    pub fn from_status_interval(status_interval: Duration) -> Self {
        Self {
            status_interval,
            block_interval: status_interval * 5 / 2,
            final_refresh_delay: DEFAULT_FINAL_REFRESH_DELAY,
            block_page_limit: DEFAULT_BLOCK_PAGE_LIMIT,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::from_status_interval(DEFAULT_STATUS_INTERVAL)
    }
}

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    /// Port file written by a locally spawned backend; takes precedence over
    /// `backend_url` when set.
    pub port_file: Option<PathBuf>,
    pub request_timeout: Option<Duration>,
    pub health_timeout: Duration,
    pub poll: PollConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            port_file: None,
            request_timeout: None,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            poll: PollConfig::default(),
        }
    }
}

impl Config {
    /// Defaults overlaid with the values present in `file`.
    pub fn from_file(file: &ConfigFile) -> Self {
        let mut config = Self::default();
        config.merge(file);
        config
    }

    /// Overlay every value present in `file`.
    pub fn merge(&mut self, file: &ConfigFile) {
        if let Some(url) = &file.backend_url {
            self.backend_url = url.clone();
        }
        if let Some(path) = &file.port_file {
            self.port_file = Some(path.clone());
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = file.health_timeout_secs {
            self.health_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = file.status_interval_ms {
            self.set_status_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = file.block_interval_ms {
            self.poll.block_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = file.final_refresh_delay_ms {
            self.poll.final_refresh_delay = Duration::from_millis(ms);
        }
        if let Some(limit) = file.block_page_limit {
            self.poll.block_page_limit = limit;
        }
    }

    /// Overlay the `TRANSDOC_*` environment variables, read through `lookup`.
    ///
    /// Values that don't parse are rejected rather than silently ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("TRANSDOC_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(path) = lookup("TRANSDOC_PORT_FILE") {
            self.port_file = Some(PathBuf::from(path));
        }
        if let Some(ms) = parse_env(&lookup, "TRANSDOC_STATUS_INTERVAL_MS")? {
            self.set_status_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_env(&lookup, "TRANSDOC_BLOCK_INTERVAL_MS")? {
            self.poll.block_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_env(&lookup, "TRANSDOC_REQUEST_TIMEOUT")? {
            self.request_timeout = Some(Duration::from_secs(secs));
        }
        Ok(())
    }

    /// Set the tracker cadence, rederiving the block cadence from it.
    pub fn set_status_interval(&mut self, interval: Duration) {
        self.poll.status_interval = interval;
        self.poll.block_interval = interval * 5 / 2;
    }

    /// Reject values the poll loops can't run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll.status_interval.is_zero() || self.poll.block_interval.is_zero() {
            return Err(CoreError::Config("poll intervals must be non-zero".into()));
        }
        if self.poll.block_page_limit == 0 {
            return Err(CoreError::Config("block_page_limit must be positive".into()));
        }
        if self.backend_url.trim().is_empty() && self.port_file.is_none() {
            return Err(CoreError::Config(
                "either backend_url or port_file is required".into(),
            ));
        }
        Ok(())
    }
}

fn parse_env<F>(lookup: &F, key: &str) -> Result<Option<u64>, CoreError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CoreError::Config(format!("{key}: expected an integer, got {raw:?}"))),
    }
}

/// On-disk shape of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub backend_url: Option<String>,
    pub port_file: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub health_timeout_secs: Option<u64>,
    pub status_interval_ms: Option<u64>,
    pub block_interval_ms: Option<u64>,
    pub final_refresh_delay_ms: Option<u64>,
    pub block_page_limit: Option<usize>,
}

impl ConfigFile {
    /// `<config_dir>/transdoc/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("transdoc").join("config.toml"))
    }

    pub fn parse(text: &str) -> Result<Self, CoreError> {
        toml::from_str(text).map_err(|e| CoreError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))
    }

    /// Load `path`, or the default location when `None`. A missing file yields the
    /// empty config.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, CoreError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            log::debug!("no config file at {}", path.display());
            return Ok(Self::default());
        }
        log::info!("loading config from {}", path.display());
        Self::load(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cadences() {
        let poll = PollConfig::default();
        assert_eq!(poll.status_interval, Duration::from_millis(1000));
        assert_eq!(poll.block_interval, Duration::from_millis(2500));
        assert_eq!(poll.block_page_limit, 5000);
    }

    #[test]
    fn status_interval_rederives_block_interval() {
        let mut config = Config::default();
        config.set_status_interval(Duration::from_millis(200));
        assert_eq!(config.poll.block_interval, Duration::from_millis(500));
    }

    #[test]
    fn file_overrides_defaults() {
        let file = ConfigFile::parse(
            r#"
backend_url = "http://localhost:9000"
status_interval_ms = 500
final_refresh_delay_ms = 100
"#,
        )
        .unwrap();
        let config = Config::from_file(&file);
        assert_eq!(config.backend_url, "http://localhost:9000");
        assert_eq!(config.poll.status_interval, Duration::from_millis(500));
        assert_eq!(config.poll.block_interval, Duration::from_millis(1250));
        assert_eq!(config.poll.final_refresh_delay, Duration::from_millis(100));
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn explicit_block_interval_wins() {
        let file = ConfigFile::parse("status_interval_ms = 500\nblock_interval_ms = 4000\n").unwrap();
        let config = Config::from_file(&file);
        assert_eq!(config.poll.block_interval, Duration::from_millis(4000));
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(matches!(
            ConfigFile::parse("colour = \"green\""),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = ConfigFile::load_or_default(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(file, ConfigFile::default());
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "block_page_limit = 100\n").unwrap();
        let file = ConfigFile::load_or_default(Some(&path)).unwrap();
        assert_eq!(file.block_page_limit, Some(100));
    }

    #[test]
    fn env_overrides_file() {
        let file = ConfigFile::parse("backend_url = \"http://file:1\"\nstatus_interval_ms = 500\n").unwrap();
        let mut config = Config::from_file(&file);
        config
            .apply_env(|key| match key {
                "TRANSDOC_BACKEND_URL" => Some("http://env:2".into()),
                "TRANSDOC_STATUS_INTERVAL_MS" => Some("2000".into()),
                "TRANSDOC_REQUEST_TIMEOUT" => Some("30".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.backend_url, "http://env:2");
        assert_eq!(config.poll.block_interval, Duration::from_millis(5000));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert!(config.port_file.is_none());
    }

    #[test]
    fn bad_env_value_is_an_error() {
        let mut config = Config::default();
        let err = config
            .apply_env(|key| (key == "TRANSDOC_BLOCK_INTERVAL_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("TRANSDOC_BLOCK_INTERVAL_MS"));
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.set_status_interval(Duration::ZERO);
        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }
}
