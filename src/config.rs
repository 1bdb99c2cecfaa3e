//! Client configuration: a JSON file with per-field environment overrides.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/krumi.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "KRUMI_CONFIG_PATH";
const API_URL_ENV: &str = "KRUMI_KRUMNET_URL";
const SESSION_KEY_ENV: &str = "KRUMI_SESSION_KEY";
const STORAGE_DIR_ENV: &str = "KRUMI_STORAGE_DIR";
const LOGGING_URL_ENV: &str = "KRUMI_LOGGING_URL";
const LOGGING_ENABLED_ENV: &str = "KRUMI_LOGGING_ENABLED";

const DEFAULT_API_URL: &str = "http://0.0.0.0:8080";
const DEFAULT_SESSION_KEY: &str = "krumi:session";
const DEFAULT_STORAGE_DIR: &str = ".krumi";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2_000);
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1_000);
const MAX_POLL_INTERVAL: Duration = Duration::from_millis(5_000);
const DEFAULT_JOB_POLL_LIMIT: u32 = 1_000;

/// Immutable runtime configuration shared across the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the krumnet API.
    pub api_url: String,
    /// Key under which the session token is persisted.
    pub session_key: String,
    /// Directory holding durable client state.
    pub storage_dir: PathBuf,
    /// Cadence of the game polling loop.
    pub poll_interval: Duration,
    /// Attempts before a provisioning job is abandoned.
    pub job_poll_limit: u32,
    /// Collector that receives shipped log lines.
    pub logging_url: Option<String>,
    /// Remote log shipping is opt-in.
    pub logging_enabled: bool,
}

impl ClientConfig {
    /// Load the configuration from disk and the environment, falling back to defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let base = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded client config");
                    raw.into()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        base.with_overrides(|key| env::var(key).ok())
    }

    /// Apply per-field overrides looked up through `lookup`; empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = present(API_URL_ENV) {
            self.api_url = url;
        }
        if let Some(key) = present(SESSION_KEY_ENV) {
            self.session_key = key;
        }
        if let Some(dir) = present(STORAGE_DIR_ENV) {
            self.storage_dir = PathBuf::from(dir);
        }
        if let Some(url) = present(LOGGING_URL_ENV) {
            self.logging_url = Some(url);
        }
        if let Some(flag) = present(LOGGING_ENABLED_ENV) {
            self.logging_enabled = matches!(flag.trim(), "1" | "true" | "yes");
        }
        self
    }

    /// Collector URL, only when shipping is enabled and a URL is set.
    pub fn remote_logging_url(&self) -> Option<&str> {
        self.logging_url
            .as_deref()
            .filter(|url| self.logging_enabled && !url.is_empty())
    }

    /// Where the browser-style login flow starts.
    pub fn login_url(&self) -> String {
        format!("{}/auth/redirect", self.api_url.trim_end_matches('/'))
    }

    /// Server endpoint that destroys the session bound to `token`.
    pub fn logout_url(&self, token: &str) -> String {
        format!(
            "{}/auth/destroy?token={}",
            self.api_url.trim_end_matches('/'),
            token
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            session_key: DEFAULT_SESSION_KEY.into(),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            poll_interval: DEFAULT_POLL_INTERVAL,
            job_poll_limit: DEFAULT_JOB_POLL_LIMIT,
            logging_url: None,
            logging_enabled: false,
        }
    }
}

/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    api_url: Option<String>,
    session_key: Option<String>,
    storage_dir: Option<PathBuf>,
    poll_interval_ms: Option<u64>,
    job_poll_limit: Option<u32>,
    logging: RawLogging,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLogging {
    enabled: bool,
    url: Option<String>,
}

impl From<RawConfig> for ClientConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            api_url: value.api_url.unwrap_or(defaults.api_url),
            session_key: value.session_key.unwrap_or(defaults.session_key),
            storage_dir: value.storage_dir.unwrap_or(defaults.storage_dir),
            poll_interval: value
                .poll_interval_ms
                .map(Duration::from_millis)
                .map(|interval| interval.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL))
                .unwrap_or(defaults.poll_interval),
            job_poll_limit: value
                .job_poll_limit
                .filter(|limit| *limit > 0)
                .unwrap_or(defaults.job_poll_limit),
            logging_url: value.logging.url,
            logging_enabled: value.logging.enabled,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
