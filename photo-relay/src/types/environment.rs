//! Environment configuration for different deployment stages

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::generation::DEFAULT_ENHANCE_PROMPT;

/// Default cap for a single uploaded photo: 15 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-preview-image-generation";
const DEFAULT_GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_RESULT_TTL_SECS: u64 = 15 * 60;
const DEFAULT_RESULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Application environment configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment
    Development,
}

#[allow(clippy::unused_self)]
impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development | Self::Staging)
    }

    /// Whether logs should be emitted as JSON
    #[must_use]
    pub const fn json_logs(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }

    /// API key for the generative image API
    ///
    /// There is no fallback value; startup fails without a key.
    ///
    /// # Panics
    ///
    /// Panics if the `GEMINI_API_KEY` environment variable is not set or blank
    #[must_use]
    pub fn gemini_api_key(&self) -> String {
        env::var("GEMINI_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .expect("GEMINI_API_KEY environment variable is not set")
    }

    /// Model used for image generation
    #[must_use]
    pub fn gemini_model(&self) -> String {
        non_empty_var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string())
    }

    /// Base URL of the generative image API, without a trailing slash
    #[must_use]
    pub fn gemini_api_base_url(&self) -> String {
        non_empty_var("GEMINI_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Instruction sent alongside every uploaded photo
    #[must_use]
    pub fn enhance_prompt(&self) -> String {
        non_empty_var("ENHANCE_PROMPT").unwrap_or_else(|| DEFAULT_ENHANCE_PROMPT.to_string())
    }

    /// Root directory for staged uploads and stored results
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        non_empty_var("WORK_DIR")
            .map_or_else(|| env::temp_dir().join("photo-relay"), PathBuf::from)
    }

    /// Maximum accepted request body size in bytes
    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        parsed_var("MAX_UPLOAD_BYTES").unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Timeout for a single call to the generative image API
    #[must_use]
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(
            parsed_var("GENERATION_TIMEOUT_SECS").unwrap_or(DEFAULT_GENERATION_TIMEOUT_SECS),
        )
    }

    /// How long a stored result stays downloadable
    #[must_use]
    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(parsed_var("RESULT_TTL_SECS").unwrap_or(DEFAULT_RESULT_TTL_SECS))
    }

    /// How often expired results are swept
    #[must_use]
    pub fn result_sweep_interval(&self) -> Duration {
        Duration::from_secs(
            parsed_var("RESULT_SWEEP_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_RESULT_SWEEP_INTERVAL_SECS),
        )
    }

    /// Server-side timeout for a whole request, slightly above the generation timeout
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.generation_timeout() + Duration::from_secs(10)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Staging => write!(f, "staging"),
            Self::Development => write!(f, "development"),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.trim().parse::<T>().ok())
}
