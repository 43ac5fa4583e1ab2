//! Client for the external generative image API
//!
//! The relay only depends on [`ImageGenerator`]; [`GeminiClient`] is the
//! production implementation and `mock::MockImageGenerator` backs the tests.

mod error;
mod wire;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use tracing::{debug, instrument};

use crate::image::GeneratedImage;

pub use error::GenerationError;
pub(crate) use error::sanitize_error_message;
use wire::{GenerateContentRequest, GenerateContentResponse};

/// Instruction sent with every photo unless `ENHANCE_PROMPT` overrides it
pub const DEFAULT_ENHANCE_PROMPT: &str = "Ubah background foto ini menjadi [super realistik HD sore hari langit tajam refleksi cahaya matahari HD sore hari].
Jangan ubah apapun dari objek utama di depan (misalnya orang, hewan, atau benda).
Tingkatkan kualitas foto jadi HD: buat lebih tajam, detail, dan bersih, tapi tetap alami dan realistis.";

/// Maximum number of idle connections to maintain per host
const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 10;

/// One image plus the instruction to apply to it
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    /// Raw image bytes
    pub image: &'a [u8],
    /// MIME type of `image`
    pub mime_type: &'a str,
    /// Natural-language instruction
    pub prompt: &'a str,
}

/// Trait for the generative image API
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Sends one image and instruction, returning the generated image
    async fn generate(
        &self,
        input: &GenerationInput<'_>,
    ) -> Result<GeneratedImage, GenerationError>;
}

/// HTTP client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    endpoint: String,
    api_key: String,
    http_client: ClientWithMiddleware,
}

impl GeminiClient {
    /// Creates a new Gemini client
    ///
    /// # Arguments
    ///
    /// * `base_url` - API base URL without trailing slash
    /// * `model` - Model identifier, e.g. `gemini-2.0-flash-preview-image-generation`
    /// * `api_key` - Secret key sent in the `x-goog-api-key` header
    /// * `timeout` - Timeout for a whole generation call
    ///
    /// # Panics
    ///
    /// If the HTTP client fails to be created
    #[must_use]
    pub fn new(base_url: &str, model: &str, api_key: String, timeout: Duration) -> Self {
        let reqwest_client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_HOST)
            .user_agent(format!("photo-relay/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        let http_client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .build();

        Self {
            endpoint: format!(
                "{}/v1beta/models/{model}:generateContent",
                base_url.trim_end_matches('/')
            ),
            api_key,
            http_client,
        }
    }

    /// Full URL of the generation endpoint
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    #[instrument(skip_all, fields(mime_type = input.mime_type, size = input.image.len()))]
    async fn generate(
        &self,
        input: &GenerationInput<'_>,
    ) -> Result<GeneratedImage, GenerationError> {
        let json_body = serde_json::to_vec(&GenerateContentRequest::from_input(input))
            .map_err(|e| GenerationError::Encode(e.to_string()))?;

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .body(json_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: sanitize_error_message(&text),
            });
        }

        let bytes = response.bytes().await?;
        let parsed: GenerateContentResponse = serde_json::from_slice(&bytes)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        let image = parsed.into_image()?;
        debug!(
            mime_type = %image.mime_type,
            size = image.data.len(),
            "Received generated image"
        );

        Ok(image)
    }
}

/// In-memory generator used by tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::sync::{Mutex, PoisonError};

    use async_trait::async_trait;

    use super::{GenerationError, GenerationInput, ImageGenerator};
    use crate::image::GeneratedImage;

    /// A call observed by the mock
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedCall {
        /// Image bytes as received
        pub image: Vec<u8>,
        /// MIME type as received
        pub mime_type: String,
        /// Instruction as received
        pub prompt: String,
    }

    #[derive(Debug, Clone)]
    enum Outcome {
        Image(GeneratedImage),
        MissingImage,
        ApiError(u16),
    }

    /// In-memory generator recording every call
    pub struct MockImageGenerator {
        outcome: Outcome,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl MockImageGenerator {
        /// Succeeds with `image` on every call
        #[must_use]
        pub const fn returning(image: GeneratedImage) -> Self {
            Self::with_outcome(Outcome::Image(image))
        }

        /// Answers like an API response without an image payload
        #[must_use]
        pub const fn missing_image() -> Self {
            Self::with_outcome(Outcome::MissingImage)
        }

        /// Fails with an upstream error status
        #[must_use]
        pub const fn api_error(status: u16) -> Self {
            Self::with_outcome(Outcome::ApiError(status))
        }

        const fn with_outcome(outcome: Outcome) -> Self {
            Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Every call received so far
        #[must_use]
        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Number of calls received so far
        #[must_use]
        pub fn call_count(&self) -> usize {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }
    }

    #[async_trait]
    impl ImageGenerator for MockImageGenerator {
        async fn generate(
            &self,
            input: &GenerationInput<'_>,
        ) -> Result<GeneratedImage, GenerationError> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(RecordedCall {
                    image: input.image.to_vec(),
                    mime_type: input.mime_type.to_string(),
                    prompt: input.prompt.to_string(),
                });

            match &self.outcome {
                Outcome::Image(image) => Ok(image.clone()),
                Outcome::MissingImage => Err(GenerationError::MissingImage),
                Outcome::ApiError(status) => Err(GenerationError::Api {
                    status: *status,
                    message: "mock failure".to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_construction() {
        let client = GeminiClient::new(
            "https://generativelanguage.googleapis.com/",
            "gemini-2.0-flash-preview-image-generation",
            "key".to_string(),
            Duration::from_secs(5),
        );

        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-preview-image-generation:generateContent"
        );
    }

    #[tokio::test]
    async fn test_mock_records_calls() {
        let mock = mock::MockImageGenerator::returning(GeneratedImage::new(vec![9], "image/png"));
        let input = GenerationInput {
            image: &[1, 2],
            mime_type: "image/jpeg",
            prompt: "enhance",
        };

        let image = mock.generate(&input).await.unwrap();

        assert_eq!(image.data, vec![9]);
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.calls()[0].mime_type, "image/jpeg");
    }
}
