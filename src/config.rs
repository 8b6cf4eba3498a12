//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! the bot-wide constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application settings loaded from config files and environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub bot_token: String,

    /// Telegram ID of the administrator (0 disables admin features)
    #[serde(default)]
    pub admin_id: i64,

    /// Base URL of the variant API, the KIM is appended to it
    #[serde(default = "default_content_api_url")]
    pub content_api_url: String,
    /// Base URL of the public homework page, the KIM is appended to it
    #[serde(default = "default_homework_url")]
    pub homework_url: String,

    /// `OpenRouter` API key
    pub openrouter_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible chat completion API
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,
    /// Model used for hints and code analysis
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    /// Path of the SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Wizard sessions idle longer than this are dropped
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    /// Upper bound for a single wizard side effect, see [`Settings::effect_timeout`]
    #[serde(default = "default_effect_timeout_secs")]
    pub effect_timeout_secs: u64,
    /// HTTP timeout for the content and LLM clients
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_content_api_url() -> String {
    "https://kompege.ru/api/v1/variant/kim/".to_string()
}

fn default_homework_url() -> String {
    "https://kompege.ru/homework?kim=".to_string()
}

fn default_llm_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_llm_model() -> String {
    "qwen/qwen3-coder".to_string()
}

fn default_db_path() -> String {
    "homework_bot.db".to_string()
}

const fn default_session_idle_secs() -> u64 {
    SESSION_IDLE_SECS
}

const fn default_effect_timeout_secs() -> u64 {
    EFFECT_TIMEOUT_SECS
}

const fn default_http_timeout_secs() -> u64 {
    HTTP_TIMEOUT_SECS
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use homework_hint_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or `bot_token` is absent.
    pub fn new() -> Result<Self, ConfigError> {
        build_config()?.try_deserialize()
    }

    /// Returns true if `user_id` is the configured administrator
    #[must_use]
    pub const fn is_admin(&self, user_id: i64) -> bool {
        self.admin_id != 0 && self.admin_id == user_id
    }

    /// Idle period after which a wizard session expires
    #[must_use]
    pub const fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    /// Upper bound for one wizard side effect.
    ///
    /// Code analysis fetches the variant and then calls the model, each
    /// bounded by [`Settings::http_timeout`], so the bound never drops below
    /// two HTTP timeouts plus [`EFFECT_TIMEOUT_MARGIN_SECS`].
    #[must_use]
    pub const fn effect_timeout(&self) -> Duration {
        let floor = self
            .http_timeout_secs
            .saturating_mul(2)
            .saturating_add(EFFECT_TIMEOUT_MARGIN_SECS);
        if self.effect_timeout_secs > floor {
            Duration::from_secs(self.effect_timeout_secs)
        } else {
            Duration::from_secs(floor)
        }
    }

    /// Timeout for outbound HTTP requests
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Build the layered configuration source.
///
/// # Errors
///
/// Returns a `ConfigError` if one of the sources cannot be read.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        // Prefixed settings, nested keys separated by `__`
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Plain UPPER_SNAKE_CASE variables, empty values count as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

/// Default idle expiry for wizard sessions (30 minutes)
pub const SESSION_IDLE_SECS: u64 = 1800;
/// Maximum number of concurrently tracked wizard sessions
pub const SESSION_MAX_CAPACITY: u64 = 10_000;
/// Default bound for one wizard side effect
pub const EFFECT_TIMEOUT_SECS: u64 = 75;
/// Slack for storage calls on top of the HTTP calls of one side effect
pub const EFFECT_TIMEOUT_MARGIN_SECS: u64 = 5;
/// Default timeout for outbound HTTP requests
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// How long a fetched variant stays cached
pub const VARIANT_CACHE_TTL_SECS: u64 = 300;
/// Maximum number of cached variants
pub const VARIANT_CACHE_MAX_SIZE: u64 = 1_000;

/// Items per page in admin lists
pub const PAGE_SIZE: usize = 5;
/// Period covered by the hint statistics screen
pub const HINT_STATS_DAYS: i64 = 7;
/// Number of hints on the "recent hints" screen
pub const RECENT_HINTS_LIMIT: usize = 10;

/// Max tokens for the start hint completion
pub const START_HINT_MAX_TOKENS: u32 = 300;
/// Max tokens for the code analysis completion
pub const ANALYZE_MAX_TOKENS: u32 = 150;
/// Sampling temperature for both hint kinds
pub const HINT_TEMPERATURE: f32 = 0.7;

/// Telegram's limit is 4096, 4000 leaves room for markup
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;
/// Retries for transient Telegram API failures
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Initial backoff for Telegram API retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 200;
/// Backoff ceiling for Telegram API retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 2_000;
