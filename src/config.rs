use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::filter::{DISCUSSION_FLAIR, RAW_MARKER};
use crate::sink::OutputFormat;

/// Configuration for the manga notifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where submissions come from
    pub feed: FeedConfig,

    /// Submission filter settings
    pub filter: FilterConfig,

    /// Output and logging settings
    pub output: OutputConfig,
}

/// Source of submissions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedSource {
    /// Poll the subreddit's newest listing
    Reddit,
    /// Read JSON lines from `input_path`
    JsonLines,
    /// Read JSON lines from standard input
    Stdin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedConfig {
    /// Feed implementation to use
    pub source: FeedSource,

    /// Subreddit to watch (without the "r/" prefix)
    pub subreddit: String,

    /// Base URL of the listing API
    pub base_url: String,

    /// User agent sent with every request
    pub user_agent: String,

    /// Posts requested per poll (1-100)
    pub listing_limit: u32,

    /// Longest wait between polls when nothing new arrives (seconds)
    pub poll_interval_seconds: u64,

    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Consecutive failed polls tolerated before giving up
    pub max_retries: u32,

    /// Input file for the `json_lines` source
    pub input_path: Option<PathBuf>,
}

/// Configuration for the submission filter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    /// Flair carried by discussion threads; any other flair is rejected
    pub discussion_flair: String,

    /// Case-sensitive title marker for untranslated releases
    pub raw_marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Episode output format
    pub format: OutputFormat,

    /// Log level
    pub log_level: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            source: FeedSource::Reddit,
            subreddit: "manga".to_string(),
            base_url: "https://www.reddit.com".to_string(),
            user_agent: "manga-notifier".to_string(),
            listing_limit: 100,
            poll_interval_seconds: 16,
            request_timeout_seconds: 30,
            max_retries: 5,
            input_path: None,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            discussion_flair: DISCUSSION_FLAIR.to_string(),
            raw_marker: RAW_MARKER.to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            log_level: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            filter: FilterConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the first config file found on the search path,
    /// falling back to defaults plus environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::search_paths())
    }

    /// Config file locations, in priority order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut config_paths = vec![
            PathBuf::from("manga-notifier.toml"),
            PathBuf::from("config/manga-notifier.toml"),
        ];
        if let Ok(home) = std::env::var("HOME") {
            config_paths.push(Path::new(&home).join(".config/manga-notifier/config.toml"));
        }
        config_paths.push(PathBuf::from("/etc/manga-notifier/config.toml"));
        config_paths
    }

    /// Load the first existing file from `config_paths`. A file that exists but does not
    /// parse is an error rather than a silent fallback to defaults.
    pub fn load_from(config_paths: &[PathBuf]) -> Result<Self> {
        for path in config_paths {
            if path.is_file() {
                return Self::from_file(path);
            }
        }

        tracing::info!("📄 No configuration file found, using defaults");
        Ok(Self::from_env())
    }

    /// Load configuration from an explicit path; the file must exist and parse
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config.with_env_overrides())
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(subreddit) = std::env::var("MANGA_NOTIFIER_SUBREDDIT") {
            self.feed.subreddit = subreddit;
        }

        if let Ok(user_agent) = std::env::var("MANGA_NOTIFIER_USER_AGENT") {
            self.feed.user_agent = user_agent;
        }

        if let Ok(log_level) = std::env::var("MANGA_NOTIFIER_LOG_LEVEL") {
            self.output.log_level = log_level;
        }

        if let Ok(format) = std::env::var("MANGA_NOTIFIER_FORMAT") {
            match format.parse() {
                Ok(format) => self.output.format = format,
                Err(e) => tracing::warn!("Ignoring MANGA_NOTIFIER_FORMAT: {}", e),
            }
        }

        self
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.feed.subreddit.trim().is_empty() {
            return Err(anyhow!("subreddit must not be empty"));
        }

        if self.feed.user_agent.trim().is_empty() {
            return Err(anyhow!("user_agent must not be empty"));
        }

        if !(1..=100).contains(&self.feed.listing_limit) {
            return Err(anyhow!(
                "listing_limit must be between 1 and 100, got {}",
                self.feed.listing_limit
            ));
        }

        if self.feed.poll_interval_seconds == 0 {
            return Err(anyhow!("poll_interval_seconds must be greater than 0"));
        }

        if self.feed.request_timeout_seconds == 0 {
            return Err(anyhow!("request_timeout_seconds must be greater than 0"));
        }

        if self.feed.source == FeedSource::JsonLines && self.feed.input_path.is_none() {
            return Err(anyhow!("input_path is required for the json_lines feed"));
        }

        if self.filter.discussion_flair.is_empty() || self.filter.raw_marker.is_empty() {
            return Err(anyhow!("filter markers must not be empty"));
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        let input = self
            .feed
            .input_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "Manga Notifier Configuration:\n\
            - Feed Source: {:?}\n\
            - Subreddit: r/{}\n\
            - Base URL: {}\n\
            - Listing Limit: {}\n\
            - Max Poll Interval: {}s\n\
            - Input File: {}\n\
            - Discussion Flair: {}\n\
            - Raw Marker: {}\n\
            - Output Format: {}\n\
            - Log Level: {}",
            self.feed.source,
            self.feed.subreddit,
            self.feed.base_url,
            self.feed.listing_limit,
            self.feed.poll_interval_seconds,
            input,
            self.filter.discussion_flair,
            self.filter.raw_marker,
            self.output.format,
            self.output.log_level
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    pub fn with_source(mut self, source: FeedSource) -> Self {
        self.config.feed.source = source;
        self
    }

    pub fn with_subreddit(mut self, subreddit: impl Into<String>) -> Self {
        self.config.feed.subreddit = subreddit.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.feed.base_url = base_url.into();
        self
    }

    pub fn with_input_path(mut self, path: PathBuf) -> Self {
        self.config.feed.input_path = Some(path);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.config.output.format = format;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.output.log_level = level.into();
        self
    }

    pub fn with_discussion_flair(mut self, flair: impl Into<String>) -> Self {
        self.config.filter.discussion_flair = flair.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.feed.source, FeedSource::Reddit);
        assert_eq!(config.feed.subreddit, "manga");
        assert_eq!(config.filter.discussion_flair, "DISC");
        assert_eq!(config.filter.raw_marker, "RAW");
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_source(FeedSource::JsonLines)
            .with_input_path(PathBuf::from("posts.jsonl"))
            .with_format(OutputFormat::Json)
            .build();

        assert_eq!(config.feed.source, FeedSource::JsonLines);
        assert_eq!(config.feed.input_path, Some(PathBuf::from("posts.jsonl")));
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_lines_requires_input() {
        let config = ConfigBuilder::new().with_source(FeedSource::JsonLines).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_listing_limit_bounds() {
        let mut config = Config::default();
        config.feed.listing_limit = 0;
        assert!(config.validate().is_err());

        config.feed.listing_limit = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [feed]
            subreddit = "manhwa"

            [output]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.feed.subreddit, "manhwa");
        assert_eq!(config.feed.listing_limit, 100);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.filter, FilterConfig::default());
    }

    #[test]
    fn test_malformed_file_on_search_path_is_reported() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let broken = temp_dir.path().join("manga-notifier.toml");
        std::fs::write(&broken, "[feed\nsubreddit = \"manhwa\"\n").unwrap();

        let error = Config::load_from(&[temp_dir.path().join("missing.toml"), broken.clone()])
            .unwrap_err();
        assert!(format!("{:#}", error).contains(&broken.display().to_string()));
    }

    #[test]
    fn test_search_path_uses_first_existing_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let first = temp_dir.path().join("first.toml");
        let second = temp_dir.path().join("second.toml");
        std::fs::write(&first, "[feed]\nsubreddit = \"manhwa\"\n").unwrap();
        std::fs::write(&second, "[feed]\nsubreddit = \"webtoons\"\n").unwrap();

        let config = Config::load_from(&[temp_dir.path().join("missing.toml"), first, second]).unwrap();
        assert_eq!(config.feed.subreddit, "manhwa");
    }

    #[test]
    fn test_summary_mentions_subreddit() {
        let summary = ConfigBuilder::new().with_subreddit("manhwa").build().summary();
        assert!(summary.contains("r/manhwa"));
    }
}
