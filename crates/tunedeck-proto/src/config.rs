use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Route the server uses for interactive sign-in.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_now_playing_secs")]
    pub now_playing_secs: u64,
    /// Dashboard refresh period. Deployments have used anything from 2 to 10 seconds.
    #[serde(default = "default_dashboard_secs")]
    pub dashboard_secs: u64,
    /// Window during which a fetched metrics snapshot is reused instead of refetched.
    #[serde(default = "default_metrics_freshness_ms")]
    pub metrics_freshness_ms: u64,
    /// Delay between a play request and the follow-up now-playing poll.
    #[serde(default = "default_replay_delay_ms")]
    pub replay_delay_ms: u64,
    /// Upper bound on how long quitting waits for the final play report.
    #[serde(default = "default_exit_flush_timeout_ms")]
    pub exit_flush_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartVariant {
    /// Precision@5 / precision@10 per search, as lines.
    #[default]
    Precision,
    /// Likes per search, as bars.
    Likes,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub chart: ChartVariant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// A stored session older than this is discarded on start.
    #[serde(default = "default_idle_ttl_minutes")]
    pub idle_ttl_minutes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            login_path: default_login_path(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            now_playing_secs: default_now_playing_secs(),
            dashboard_secs: default_dashboard_secs(),
            metrics_freshness_ms: default_metrics_freshness_ms(),
            replay_delay_ms: default_replay_delay_ms(),
            exit_flush_timeout_ms: default_exit_flush_timeout_ms(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_minutes: default_idle_ttl_minutes(),
        }
    }
}

impl PollingConfig {
    pub fn now_playing_period(&self) -> Duration {
        Duration::from_secs(self.now_playing_secs.max(1))
    }

    pub fn dashboard_period(&self) -> Duration {
        Duration::from_secs(self.dashboard_secs.clamp(2, 10))
    }

    pub fn metrics_freshness(&self) -> Duration {
        Duration::from_millis(self.metrics_freshness_ms.clamp(1_000, 5_000))
    }

    pub fn replay_delay(&self) -> Duration {
        Duration::from_millis(self.replay_delay_ms)
    }

    pub fn exit_flush_timeout(&self) -> Duration {
        Duration::from_millis(self.exit_flush_timeout_ms)
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl SessionConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_minutes * 60)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_now_playing_secs() -> u64 {
    3
}

fn default_dashboard_secs() -> u64 {
    5
}

fn default_metrics_freshness_ms() -> u64 {
    2_000
}

fn default_replay_delay_ms() -> u64 {
    500
}

fn default_exit_flush_timeout_ms() -> u64 {
    800
}

fn default_idle_ttl_minutes() -> u64 {
    30
}

impl Config {
    /// Load `config_path`, writing a default file there on first run.
    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.server.login_path, "/login");
        assert_eq!(config.polling.now_playing_period(), Duration::from_secs(3));
        assert_eq!(config.dashboard.chart, ChartVariant::Precision);
        assert_eq!(config.session.idle_ttl(), Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            base_url = "http://music.local:8080"

            [dashboard]
            chart = "likes"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.base_url, "http://music.local:8080");
        assert_eq!(config.server.request_timeout_secs, 10);
        assert_eq!(config.polling.dashboard_secs, 5);
        assert_eq!(config.dashboard.chart, ChartVariant::Likes);
    }

    #[test]
    fn test_periods_are_clamped() {
        let polling = PollingConfig {
            dashboard_secs: 60,
            metrics_freshness_ms: 50,
            ..PollingConfig::default()
        };
        assert_eq!(polling.dashboard_period(), Duration::from_secs(10));
        assert_eq!(polling.metrics_freshness(), Duration::from_millis(1_000));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.polling.replay_delay(), Duration::from_millis(500));
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.server.base_url, config.server.base_url);
    }
}
