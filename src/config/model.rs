// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [run]
/// max_attempts = 3
/// retry_delay_secs = 60
///
/// [schedule]
/// interval = "daily"
///
/// [api]
/// base_url = "https://api.openweathermap.org"
/// api_key_env = "WEATHERMAP_API_KEY"
///
/// [storage]
/// staging_dir = "weather_data"
/// destination = "weather_store"
///
/// [[source]]
/// name = "chennai"
/// query = "Chennai"
/// ```
///
/// All sections except `[[source]]` are optional and have defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub run: RunSection,

    #[serde(default)]
    pub schedule: ScheduleSection,

    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub storage: StorageSection,

    /// Ordered list of sources; order is preserved into the graph.
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceSpec>,
}

/// `[run]` section: retry behaviour for every pipeline task.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RunSection {
    /// Retry ceiling per task (total invocations, not extra retries).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed inter-attempt wait in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    60
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

/// `[schedule]` section.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct ScheduleSection {
    #[serde(default)]
    pub interval: ScheduleInterval,
}

/// Calendar interval between runs. Missed ticks are never caught up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleInterval {
    #[default]
    Daily,
    Hourly,
}

/// `[api]` section: where the weather API lives and how the gate polls it.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Window within which the readiness gate must pass.
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,

    /// Interval between readiness probes.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_api_key_env() -> String {
    "WEATHERMAP_API_KEY".to_string()
}

fn default_ready_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_secs() -> u64 {
    10
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            ready_timeout_secs: default_ready_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// `[storage]` section: staging area and upload destination.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    #[serde(default = "default_destination")]
    pub destination: PathBuf,
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("weather_data")
}

fn default_destination() -> PathBuf {
    PathBuf::from("weather_store")
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            destination: default_destination(),
        }
    }
}

/// One `[[source]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceSpec {
    /// Identifier used in task ids and staging filenames.
    pub name: String,

    /// Query string sent to the API (e.g. the city name).
    pub query: String,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see
/// [`crate::config::validate`]), so holding a `ConfigFile` means the source
/// list and sections passed semantic validation.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub run: RunSection,
    pub schedule: ScheduleSection,
    pub api: ApiSection,
    pub storage: StorageSection,
    pub sources: Vec<SourceSpec>,
}

impl ConfigFile {
    /// Construct without re-validating. Only called from `validate`.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            run: raw.run,
            schedule: raw.schedule,
            api: raw.api,
            storage: raw.storage,
            sources: raw.sources,
        }
    }
}
