//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Channel feed and HTTP behavior settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Poll loop settings
    #[serde(default)]
    pub poll: PollConfig,

    /// Alert keyword and ignore tables
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// State file locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Load and validate; for commands that must not run on defaults.
    pub fn load_required(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::load(path)
            .map_err(|e| AppError::config(format!("cannot load {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.feed.host.trim().is_empty() {
            return Err(AppError::validation("feed.host is empty"));
        }
        if self.feed.channel.trim().is_empty() {
            return Err(AppError::validation("feed.channel is empty"));
        }
        if self.feed.user_agent.trim().is_empty() {
            return Err(AppError::validation("feed.user_agent is empty"));
        }
        if self.feed.timeout_secs == 0 {
            return Err(AppError::validation("feed.timeout_secs must be > 0"));
        }
        if self.feed.backlog_size == 0 {
            return Err(AppError::validation("feed.backlog_size must be > 0"));
        }
        if self.feed.max_retries == 0 {
            return Err(AppError::validation("feed.max_retries must be > 0"));
        }
        if self.feed.timezone.parse::<Tz>().is_err() {
            return Err(AppError::validation(format!(
                "feed.timezone '{}' is not a known timezone",
                self.feed.timezone
            )));
        }
        if self.classifier.keywords.is_empty() {
            return Err(AppError::validation("No alert keywords defined"));
        }
        if self
            .classifier
            .keywords
            .iter()
            .any(|rule| rule.keyword.trim().is_empty())
        {
            return Err(AppError::validation("Alert keywords must not be empty"));
        }
        if self.storage.states_file.trim().is_empty() {
            return Err(AppError::validation("storage.states_file is empty"));
        }
        Ok(())
    }
}

/// Where the `before` pagination cursor is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorPlacement {
    /// As a form-encoded request body field
    #[default]
    Form,
    /// As a URL query parameter
    Query,
}

/// Channel feed and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Host serving the public channel preview
    #[serde(default = "defaults::host")]
    pub host: String,

    /// Channel name
    #[serde(default = "defaults::channel")]
    pub channel: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Messages to load on the first fetch
    #[serde(default = "defaults::backlog_size")]
    pub backlog_size: usize,

    /// Attempts per page before giving up
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Fixed delay between attempts in seconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_secs: u64,

    /// Display timezone for message timestamps
    #[serde(default = "defaults::timezone")]
    pub timezone: String,

    #[serde(default)]
    pub cursor_placement: CursorPlacement,
}

impl FeedConfig {
    /// Public preview URL of the channel.
    pub fn channel_url(&self) -> Result<url::Url> {
        let url = url::Url::parse(&format!("https://{}/", self.host.trim()))?;
        Ok(url.join(&format!("s/{}", self.channel.trim()))?)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Parsed display timezone, UTC when the name is unknown.
    pub fn tz(&self) -> Tz {
        self.timezone.parse::<Tz>().unwrap_or_else(|_| {
            log::error!(
                "Invalid timezone \"{}\". Falling back to UTC.",
                self.timezone
            );
            Tz::UTC
        })
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            channel: defaults::channel(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            backlog_size: defaults::backlog_size(),
            max_retries: defaults::max_retries(),
            retry_delay_secs: defaults::retry_delay(),
            timezone: defaults::timezone(),
            cursor_placement: CursorPlacement::default(),
        }
    }
}

/// Poll loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Pause between fetch cycles in seconds
    #[serde(default = "defaults::poll_interval")]
    pub interval_secs: u64,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::poll_interval(),
        }
    }
}

/// One row of the alert keyword table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    /// Substring to look for
    pub keyword: String,

    /// Whether the keyword raises (true) or clears (false) an alert
    pub alert: bool,
}

impl KeywordRule {
    pub fn new(keyword: impl Into<String>, alert: bool) -> Self {
        Self {
            keyword: keyword.into(),
            alert,
        }
    }
}

/// Keyword tables driving line classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Ordered keyword table; order breaks ties between equally long keywords
    #[serde(default = "defaults::keywords")]
    pub keywords: Vec<KeywordRule>,

    /// Lines containing any of these phrases are skipped
    #[serde(default = "defaults::ignore")]
    pub ignore: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            keywords: defaults::keywords(),
            ignore: defaults::ignore(),
        }
    }
}

/// State file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Persisted hierarchy file
    #[serde(default = "defaults::states_file")]
    pub states_file: String,

    /// Optional replacement for the bundled default dataset
    #[serde(default)]
    pub seed_file: Option<String>,
}

impl StorageConfig {
    /// Resolve the states file against a base directory.
    pub fn states_path(&self, base: &Path) -> PathBuf {
        base.join(&self.states_file)
    }

    /// Resolve the seed override against a base directory, if any.
    pub fn seed_path(&self, base: &Path) -> Option<PathBuf> {
        self.seed_file.as_ref().map(|file| base.join(file))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            states_file: defaults::states_file(),
            seed_file: None,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use super::KeywordRule;

    // Feed defaults
    pub fn host() -> String {
        "t.me".into()
    }
    pub fn channel() -> String {
        "air_alert_ua".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; skogen/1.0)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn backlog_size() -> usize {
        100
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn retry_delay() -> u64 {
        5
    }
    pub fn timezone() -> String {
        "Europe/Kyiv".into()
    }

    // Poll defaults
    pub fn poll_interval() -> u64 {
        5
    }

    // Classifier defaults
    pub fn keywords() -> Vec<KeywordRule> {
        vec![
            KeywordRule::new("Повітряна тривога", true),
            KeywordRule::new("Відбій тривоги", false),
            KeywordRule::new("🟢", false),
            KeywordRule::new("🔴", true),
            KeywordRule::new("🟠", true),
            KeywordRule::new("🟡", true),
        ]
    }
    pub fn ignore() -> Vec<String> {
        vec!["БЕЗКОШТОВНА ЕВАКУАЦІЯ".into()]
    }

    // Storage defaults
    pub fn states_file() -> String {
        "data/states.json".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_channel() {
        let mut config = Config::default();
        config.feed.channel = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_backlog_and_retries() {
        let mut config = Config::default();
        config.feed.backlog_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.feed.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_timezone() {
        let mut config = Config::default();
        config.feed.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());
        assert_eq!(config.feed.tz(), Tz::UTC);
    }

    #[test]
    fn validate_rejects_blank_keyword() {
        let mut config = Config::default();
        config.classifier.keywords.push(KeywordRule::new(" ", true));
        assert!(config.validate().is_err());
    }

    #[test]
    fn keyword_table_keeps_file_order() {
        let config: Config = toml::from_str(
            r#"
            [feed]
            channel = "alerts"

            [classifier]
            keywords = [
                { keyword = "b", alert = true },
                { keyword = "a", alert = false },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(config.feed.channel, "alerts");
        assert_eq!(config.feed.backlog_size, 100);
        assert_eq!(
            config.classifier.keywords,
            vec![KeywordRule::new("b", true), KeywordRule::new("a", false)]
        );
        assert_eq!(config.classifier.ignore, vec!["БЕЗКОШТОВНА ЕВАКУАЦІЯ"]);
        assert_eq!(config.feed.cursor_placement, CursorPlacement::Form);
    }

    #[test]
    fn channel_url_uses_preview_path() {
        let config = FeedConfig::default();
        assert_eq!(
            config.channel_url().unwrap().as_str(),
            "https://t.me/s/air_alert_ua"
        );
    }

    #[test]
    fn sample_config_file_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/config.toml");
        let config = Config::load(&path).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.classifier.keywords.len(), 6);
        assert_eq!(config.poll.interval(), Duration::from_secs(5));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load_or_default("does/not/exist.toml");
        assert_eq!(config.feed.channel, "air_alert_ua");
        assert!(Config::load("does/not/exist.toml").is_err());
    }

    #[test]
    fn required_config_must_exist_and_parse() {
        assert!(matches!(
            Config::load_required("does/not/exist.toml"),
            Err(AppError::Config(_))
        ));

        let tmp = tempfile::TempDir::new().unwrap();
        let broken = tmp.path().join("broken.toml");
        fs::write(&broken, "[feed\nchannel = ").unwrap();
        assert!(matches!(
            Config::load_required(&broken),
            Err(AppError::Config(_))
        ));

        let invalid = tmp.path().join("invalid.toml");
        fs::write(&invalid, "[feed]\nchannel = \"\"\n").unwrap();
        assert!(matches!(
            Config::load_required(&invalid),
            Err(AppError::Validation(_))
        ));

        let sample = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/config.toml");
        assert!(Config::load_required(&sample).is_ok());
    }
}
