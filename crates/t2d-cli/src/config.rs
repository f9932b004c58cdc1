//! TOML configuration file schema and parsing.
//!
//! Example config file:
//!
//! ```toml
//! [logging]
//! log_format = "json"
//!
//! [state]
//! dir = "/var/lib/tautulli2discord"
//!
//! [tautulli]
//! url = "http://localhost:8181"
//! api_key = "abc123"
//!
//! [tmdb]
//! api_key = "def456"
//!
//! [jobs.current_streams]
//! webhook = "https://discord.com/api/webhooks/1/current"
//!
//! [jobs.top_users]
//! webhook = "https://discord.com/api/webhooks/1/top"
//! count = 10
//! days = 7
//! media_types = ["TV", "Movies"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use t2d_core::{HttpConfig, LibraryStatsConfig, StatsWindow, TopUsersConfig, TMDB_BASE_URL};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub http: HttpSection,

    #[serde(default)]
    pub state: StateConfig,

    pub tautulli: Option<ServiceConfig>,

    pub tmdb: Option<TmdbConfig>,

    pub sabnzbd: Option<ServiceConfig>,

    #[serde(default)]
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
        }
    }
}

fn default_log_format() -> String {
    "pretty".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl HttpSection {
    pub fn to_http_config(&self) -> HttpConfig {
        HttpConfig::default().with_request_timeout_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_dir")]
    pub dir: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: default_state_dir(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".")
}

impl StateConfig {
    pub fn counter_path(&self, job: &str) -> PathBuf {
        self.dir.join(format!("{job}.count"))
    }
}

/// Base URL plus API key, as Tautulli and SABnzbd take them.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbConfig {
    pub api_key: String,

    #[serde(default = "default_tmdb_base_url")]
    pub base_url: String,
}

fn default_tmdb_base_url() -> String {
    TMDB_BASE_URL.into()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobsConfig {
    pub current_streams: Option<WebhookJob>,
    pub library_stats: Option<LibraryStatsJob>,
    pub popular: Option<RankedJob>,
    pub sabnzbd_status: Option<WebhookJob>,
    pub top_stats: Option<RankedJob>,
    pub top_users: Option<TopUsersJob>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookJob {
    pub webhook: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryStatsJob {
    pub webhook: String,

    #[serde(default)]
    pub excluded_libraries: Vec<String>,
}

impl LibraryStatsJob {
    pub fn to_library_stats_config(&self) -> LibraryStatsConfig {
        LibraryStatsConfig {
            excluded_libraries: self.excluded_libraries.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankedJob {
    pub webhook: String,

    #[serde(default = "default_count")]
    pub count: u32,

    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_count() -> u32 {
    5
}

fn default_days() -> u32 {
    30
}

impl RankedJob {
    pub fn to_window(&self) -> StatsWindow {
        StatsWindow::default()
            .with_count(self.count)
            .with_days(self.days)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopUsersJob {
    pub webhook: String,

    #[serde(default = "default_count")]
    pub count: u32,

    #[serde(default = "default_days")]
    pub days: u32,

    #[serde(default)]
    pub media_types: Vec<String>,
}

impl TopUsersJob {
    pub fn to_top_users_config(&self) -> TopUsersConfig {
        TopUsersConfig {
            window: StatsWindow::default()
                .with_count(self.count)
                .with_days(self.days),
            media_types: self.media_types.clone(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(ref t) = self.tautulli {
            check_http_url("tautulli.url", &t.url)?;
        }
        if let Some(ref s) = self.sabnzbd {
            check_http_url("sabnzbd.url", &s.url)?;
        }
        if let Some(ref t) = self.tmdb {
            check_http_url("tmdb.base_url", &t.base_url)?;
        }

        let jobs = &self.jobs;
        let webhooks = [
            ("current_streams", jobs.current_streams.as_ref().map(|j| &j.webhook)),
            ("library_stats", jobs.library_stats.as_ref().map(|j| &j.webhook)),
            ("popular", jobs.popular.as_ref().map(|j| &j.webhook)),
            ("sabnzbd_status", jobs.sabnzbd_status.as_ref().map(|j| &j.webhook)),
            ("top_stats", jobs.top_stats.as_ref().map(|j| &j.webhook)),
            ("top_users", jobs.top_users.as_ref().map(|j| &j.webhook)),
        ];
        for (job, webhook) in webhooks {
            if let Some(url) = webhook {
                check_http_url(&format!("jobs.{job}.webhook"), url)?;
            }
        }

        let counts = [
            ("popular", jobs.popular.as_ref().map(|j| j.count)),
            ("top_stats", jobs.top_stats.as_ref().map(|j| j.count)),
            ("top_users", jobs.top_users.as_ref().map(|j| j.count)),
        ];
        for (job, count) in counts {
            if count == Some(0) {
                return Err(format!("jobs.{job}.count must be at least 1"));
            }
        }

        match self.logging.log_format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(format!(
                    "Invalid log_format '{}': must be 'pretty' or 'json'",
                    other
                ));
            }
        }

        Ok(())
    }

    pub fn tautulli(&self) -> Result<&ServiceConfig, String> {
        self.tautulli
            .as_ref()
            .ok_or_else(|| missing_section("tautulli"))
    }

    pub fn tmdb(&self) -> Result<&TmdbConfig, String> {
        self.tmdb.as_ref().ok_or_else(|| missing_section("tmdb"))
    }

    pub fn sabnzbd(&self) -> Result<&ServiceConfig, String> {
        self.sabnzbd
            .as_ref()
            .ok_or_else(|| missing_section("sabnzbd"))
    }
}

/// Resolve an optional `[jobs.*]` section, naming it when absent.
pub fn job_section<'a, T>(section: &'a Option<T>, name: &str) -> Result<&'a T, String> {
    section
        .as_ref()
        .ok_or_else(|| missing_section(&format!("jobs.{name}")))
}

fn missing_section(name: &str) -> String {
    format!("Missing [{name}] section in config file")
}

fn check_http_url(field: &str, value: &str) -> Result<(), String> {
    let parsed = url::Url::parse(value)
        .map_err(|e| format!("Invalid URL for {}: {} ({})", field, value, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(format!("{} must use http or https: {}", field, value));
    }
    Ok(())
}
