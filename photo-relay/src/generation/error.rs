//! Error types for calls to the generative image API

use thiserror::Error;

/// Errors that can occur while generating an image
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Request never got a response (connect, TLS, timeout)
    #[error("network error: {0}")]
    Network(#[from] reqwest_middleware::Error),

    /// API answered with a non-success status
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Sanitized error message from the response body
        message: String,
    },

    /// Prompt or output was blocked by the provider's safety filters
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Response parsed but carried no image payload
    #[error("response did not contain an image")]
    MissingImage,

    /// Image payload was not valid base64
    #[error("failed to decode image payload: {0}")]
    Decode(String),

    /// Request body could not be serialized
    #[error("failed to encode request: {0}")]
    Encode(String),

    /// Response body was not the expected JSON
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(reqwest_middleware::Error::Reqwest(error))
    }
}

impl GenerationError {
    /// Whether the failure is likely transient
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Keeps upstream error text short and single-line before it reaches logs
pub(crate) fn sanitize_error_message(text: &str) -> String {
    const MAX_LEN: usize = 300;

    // Google APIs wrap errors as {"error": {"message": "..."}}
    let message = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(ToString::to_string))
        .unwrap_or_else(|| text.to_string());

    let single_line = message.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() > MAX_LEN {
        let truncated: String = single_line.chars().take(MAX_LEN).collect();
        format!("{truncated}...")
    } else {
        single_line
    }
}
