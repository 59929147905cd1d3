//! Configuration for scroll runs
//!
//! Settings come from a YAML file, then `SCROLLKIT_*` environment variables
//! are applied on top:
//!
//! ```yaml
//! backend:
//!   url: "http://localhost:9200"
//!   index: "pages"
//!   auth: { type: basic, username: "elastic", password: "changeme" }
//! http:
//!   timeout_seconds: 30
//!   max_retries: 0
//! scroll:
//!   page_size: 100
//!   ttl: "1m"
//!   terminal_conditions: ["search_phase_execution_exception"]
//! ```

use crate::auth::AuthConfig;
use crate::backend::HttpSearchBackend;
use crate::decode::HitsDecoder;
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::scroll::{ScrollRequest, ScrollSession, TerminalConditions, DEFAULT_PAGE_SIZE};
use crate::types::{BackoffType, JsonValue, OptionStringExt, ScrollTtl};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Overrides `backend.url`
pub const ENV_URL: &str = "SCROLLKIT_URL";
/// Overrides `backend.index`
pub const ENV_INDEX: &str = "SCROLLKIT_INDEX";
/// Sets the basic-auth username
pub const ENV_USERNAME: &str = "SCROLLKIT_USERNAME";
/// Sets the basic-auth password
pub const ENV_PASSWORD: &str = "SCROLLKIT_PASSWORD";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete configuration loaded from YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where the search backend lives
    #[serde(default)]
    pub backend: BackendConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Scroll engine settings
    #[serde(default)]
    pub scroll: ScrollConfig,
}

// ============================================================================
// Backend Config
// ============================================================================

/// Search backend location and credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Cluster base URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Default index to scroll
    #[serde(default)]
    pub index: Option<String>,

    /// Credentials
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            index: None,
            auth: AuthConfig::None,
        }
    }
}

fn default_url() -> String {
    "http://localhost:9200".to_string()
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Retries for transient transport failures (0 = none)
    #[serde(default)]
    pub max_retries: u32,

    /// Backoff between retries
    #[serde(default)]
    pub backoff: BackoffType,

    /// First retry delay in milliseconds
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Upper bound on retry delay in milliseconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Request rate limit; `null` disables it
    #[serde(default = "default_rate_limit")]
    pub rate_limit: Option<RateLimiterConfig>,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Custom user agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: 0,
            backoff: BackoffType::default(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            rate_limit: default_rate_limit(),
            headers: HashMap::new(),
            user_agent: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_initial_backoff() -> u64 {
    100
}

fn default_max_backoff() -> u64 {
    60_000
}

fn default_rate_limit() -> Option<RateLimiterConfig> {
    Some(RateLimiterConfig::default())
}

// ============================================================================
// Scroll Config
// ============================================================================

/// Scroll engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Records per backend round trip
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Scan state keep-alive, e.g. `"1m"`
    #[serde(default)]
    pub ttl: ScrollTtl,

    /// Record channel capacity
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Backend error types that mean "no more data"
    #[serde(default = "default_terminal_conditions")]
    pub terminal_conditions: Vec<String>,

    /// Copy `_id` and `_index` into each record
    #[serde(default)]
    pub include_metadata: bool,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            ttl: ScrollTtl::default(),
            channel_capacity: default_channel_capacity(),
            terminal_conditions: default_terminal_conditions(),
            include_metadata: false,
        }
    }
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_channel_capacity() -> usize {
    1
}

fn default_terminal_conditions() -> Vec<String> {
    vec!["search_phase_execution_exception".to_string()]
}

// ============================================================================
// Loading
// ============================================================================

/// Load a config file, apply environment overrides, and validate
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        }
    })?;

    let mut config = Config::from_yaml_str(&content)?;
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Parse YAML without applying overrides or validating
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply `SCROLLKIT_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_URL).none_if_empty() {
            self.backend.url = url;
        }
        if let Some(index) = lookup(ENV_INDEX).none_if_empty() {
            self.backend.index = Some(index);
        }

        let username = lookup(ENV_USERNAME).none_if_empty();
        let password = lookup(ENV_PASSWORD).none_if_empty();
        if username.is_none() && password.is_none() {
            return;
        }

        let (current_user, current_pass) = match &self.backend.auth {
            AuthConfig::Basic { username, password } => (username.clone(), password.clone()),
            _ => (String::new(), String::new()),
        };
        self.backend.auth = AuthConfig::basic(
            username.unwrap_or(current_user),
            password.unwrap_or(current_pass),
        );
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.backend.url)
            .map_err(|e| Error::invalid_value("backend.url", format!("'{}': {e}", self.backend.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "backend.url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if matches!(self.backend.index.as_deref(), Some(index) if index.trim().is_empty()) {
            return Err(Error::invalid_value("backend.index", "must not be empty"));
        }

        if let AuthConfig::Basic { username, .. } = &self.backend.auth {
            if username.is_empty() {
                return Err(Error::invalid_value(
                    "backend.auth.username",
                    "must not be empty",
                ));
            }
        }

        if self.http.timeout_seconds == 0 {
            return Err(Error::invalid_value(
                "http.timeout_seconds",
                "must be greater than zero",
            ));
        }
        if let Some(rate_limit) = &self.http.rate_limit {
            if rate_limit.requests_per_second == 0 {
                return Err(Error::invalid_value(
                    "http.rate_limit.requests_per_second",
                    "must be greater than zero",
                ));
            }
        }

        if self.scroll.page_size == 0 {
            return Err(Error::invalid_value(
                "scroll.page_size",
                "must be greater than zero",
            ));
        }
        if self.scroll.channel_capacity == 0 {
            return Err(Error::invalid_value(
                "scroll.channel_capacity",
                "must be at least 1",
            ));
        }

        Ok(())
    }

    // ========================================================================
    // Builders
    // ========================================================================

    /// HTTP client settings
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.http.timeout_seconds))
            .max_retries(self.http.max_retries)
            .backoff(
                self.http.backoff,
                Duration::from_millis(self.http.initial_backoff_ms),
                Duration::from_millis(self.http.max_backoff_ms),
            );

        builder = match &self.http.rate_limit {
            Some(rate_limit) => builder.rate_limit(rate_limit.clone()),
            None => builder.no_rate_limit(),
        };
        for (key, value) in &self.http.headers {
            builder = builder.header(key, value);
        }
        if let Some(agent) = &self.http.user_agent {
            builder = builder.user_agent(agent);
        }

        builder.build()
    }

    /// HTTP search backend for `backend.url`
    pub fn build_backend(&self) -> Result<HttpSearchBackend> {
        HttpSearchBackend::new(
            &self.backend.url,
            self.http_client_config(),
            self.backend.auth.clone(),
        )
    }

    /// Terminal-condition allow-list
    pub fn terminal_conditions(&self) -> TerminalConditions {
        TerminalConditions::from_types(&self.scroll.terminal_conditions)
    }

    /// Page decoder
    pub fn decoder(&self) -> HitsDecoder {
        HitsDecoder::new().with_metadata(self.scroll.include_metadata)
    }

    /// Session factory wired to the configured backend
    pub fn session(&self) -> Result<ScrollSession> {
        let backend = Arc::new(self.build_backend()?);
        Ok(ScrollSession::new(backend)
            .with_decoder(Arc::new(self.decoder()))
            .with_terminal_conditions(self.terminal_conditions()))
    }

    /// Build a request, falling back to `backend.index` when `index` is `None`
    pub fn scroll_request(&self, index: Option<&str>, query: JsonValue) -> Result<ScrollRequest> {
        let index = index
            .map(str::to_string)
            .or_else(|| self.backend.index.clone())
            .none_if_empty()
            .ok_or_else(|| Error::missing_field("backend.index"))?;

        Ok(ScrollRequest::new(index, query)
            .with_page_size(self.scroll.page_size)
            .with_ttl(self.scroll.ttl)
            .with_channel_capacity(self.scroll.channel_capacity))
    }
}
