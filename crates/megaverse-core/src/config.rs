//! Run configuration
//!
//! Values come from, in increasing precedence: defaults, an optional TOML
//! file, `MEGAVERSE_*` environment variables, and whatever the caller sets
//! through the `with_*` builders (the CLI maps its flags onto those).

use crate::error::CanvasError;
use crate::reconciler::DEFAULT_PARALLEL_DEGREE;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Placeholder substituted in path templates
pub const CANDIDATE_PLACEHOLDER: &str = "{candidateId}";

/// Environment variable overriding the base URL
pub const ENV_BASE_URL: &str = "MEGAVERSE_BASE_URL";
/// Environment variable overriding the candidate identifier
pub const ENV_CANDIDATE_ID: &str = "MEGAVERSE_CANDIDATE_ID";
/// Environment variable overriding the parallel degree
pub const ENV_PARALLELISM: &str = "MEGAVERSE_PARALLELISM";

/// Megaverse client and reconciler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    /// API base URL, paths are appended verbatim
    pub base_url: String,
    /// Candidate identifier sent with every request
    pub candidate_id: String,
    /// Maximum simultaneous remote calls in a batch
    pub parallel_degree: usize,
    /// Additional attempts for retryable failures
    pub max_retry_attempts: u32,
    /// Delay before the first retry, in milliseconds
    pub backoff_ms: u64,
    /// Ceiling of the un-jittered backoff, in milliseconds
    pub max_backoff_ms: u64,
    /// Jitter fraction in `[0, 1]`
    pub jitter_factor: f64,
    /// Pause after each successful call, in milliseconds
    pub request_delay_ms: u64,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Goal endpoint template
    pub goal_path: String,
    /// Current map endpoint template
    pub map_path: String,
}

impl CanvasConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML; absent keys keep their defaults
    ///
    /// # Errors
    /// `CanvasError::Config` if the document is invalid.
    pub fn from_toml_str(source: &str) -> Result<Self, CanvasError> {
        toml::from_str(source).map_err(|e| CanvasError::config(format!("invalid TOML: {e}")))
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `CanvasError::Config` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, CanvasError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            CanvasError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Apply `MEGAVERSE_*` overrides, e.g. `|key| std::env::var(key).ok()`
    ///
    /// # Errors
    /// `CanvasError::Config` if an override cannot be parsed.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, CanvasError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(id) = lookup(ENV_CANDIDATE_ID) {
            self.candidate_id = id;
        }
        if let Some(raw) = lookup(ENV_PARALLELISM) {
            self.parallel_degree = raw.trim().parse().map_err(|_| {
                CanvasError::config(format!("{ENV_PARALLELISM} must be a positive integer, got '{raw}'"))
            })?;
        }
        Ok(self)
    }

    /// With base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// With candidate identifier
    #[inline]
    #[must_use]
    pub fn with_candidate_id(mut self, candidate_id: impl Into<String>) -> Self {
        self.candidate_id = candidate_id.into();
        self
    }

    /// With parallel degree
    #[inline]
    #[must_use]
    pub fn with_parallel_degree(mut self, parallel_degree: usize) -> Self {
        self.parallel_degree = parallel_degree;
        self
    }

    /// With retry budget and backoff
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, max_retry_attempts: u32, backoff: Duration, jitter_factor: f64) -> Self {
        self.max_retry_attempts = max_retry_attempts;
        self.backoff_ms = duration_ms(backoff);
        self.jitter_factor = jitter_factor;
        self
    }

    /// With pause after successful calls
    #[inline]
    #[must_use]
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay_ms = duration_ms(delay);
        self
    }

    /// Check the values are usable
    ///
    /// # Errors
    /// `CanvasError::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<(), CanvasError> {
        if self.candidate_id.trim().is_empty() {
            return Err(CanvasError::config(format!(
                "candidate id is required (set {ENV_CANDIDATE_ID} or --candidate-id)"
            )));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(CanvasError::config(format!(
                "base url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.parallel_degree == 0 {
            return Err(CanvasError::config("parallel degree must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(CanvasError::config(format!(
                "jitter factor must be within [0, 1], got {}",
                self.jitter_factor
            )));
        }
        for (name, template) in [("goal_path", &self.goal_path), ("map_path", &self.map_path)] {
            if !template.contains(CANDIDATE_PLACEHOLDER) {
                return Err(CanvasError::config(format!(
                    "{name} must contain {CANDIDATE_PLACEHOLDER}, got '{template}'"
                )));
            }
        }
        Ok(())
    }

    /// Goal endpoint path for the configured candidate
    #[must_use]
    pub fn goal_endpoint(&self) -> String {
        self.goal_path.replace(CANDIDATE_PLACEHOLDER, &self.candidate_id)
    }

    /// Current map endpoint path for the configured candidate
    #[must_use]
    pub fn map_endpoint(&self) -> String {
        self.map_path.replace(CANDIDATE_PLACEHOLDER, &self.candidate_id)
    }

    /// Retry policy derived from the retry settings
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retry_attempts,
            Duration::from_millis(self.backoff_ms),
            self.jitter_factor,
        )
        .with_max_backoff(Duration::from_millis(self.max_backoff_ms))
    }

    /// Pause after successful calls
    #[inline]
    #[must_use]
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Per-request timeout
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            base_url: "https://challenge.crossmint.io/api".to_string(),
            candidate_id: String::new(),
            parallel_degree: DEFAULT_PARALLEL_DEGREE,
            max_retry_attempts: 5,
            backoff_ms: 2_000,
            max_backoff_ms: 300_000,
            jitter_factor: 0.5,
            request_delay_ms: 1_000,
            request_timeout_secs: 30,
            goal_path: format!("/map/{CANDIDATE_PLACEHOLDER}/goal"),
            map_path: format!("/map/{CANDIDATE_PLACEHOLDER}"),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
