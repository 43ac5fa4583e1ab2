use std::sync::Arc;

use axum::{
    body::Body, extract::DefaultBodyLimit, http::Request, response::Response, Extension, Router,
};
use photo_relay::{
    generation::mock::MockImageGenerator, image::GeneratedImage, relay::PhotoRelay, routes,
    storage::TempStorage, types::Environment,
};
use tempfile::TempDir;
use tower::ServiceExt;

use super::utils::MultipartBody;

pub const TEST_PROMPT: &str = "Replace the background with a sharp golden-hour sky";

/// Setup test environment variables and tracing
pub fn setup_test_env() {
    dotenvy::from_path(".env.example").ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Router wired to a mock generator and a throwaway work directory
pub struct TestSetup {
    pub router: Router,
    pub storage: Arc<TempStorage>,
    pub generator: Arc<MockImageGenerator>,
    // Keep the work directory alive for the duration of the test
    _work_dir: TempDir,
}

impl TestSetup {
    pub fn new(generator: MockImageGenerator) -> Self {
        Self::with_body_limit(generator, 1024 * 1024)
    }

    pub fn returning(image: GeneratedImage) -> Self {
        Self::new(MockImageGenerator::returning(image))
    }

    pub fn with_body_limit(generator: MockImageGenerator, body_limit: usize) -> Self {
        setup_test_env();

        let work_dir = tempfile::tempdir().expect("Failed to create work dir");
        let storage =
            Arc::new(TempStorage::new(work_dir.path()).expect("Failed to create storage"));
        let generator = Arc::new(generator);
        let relay = Arc::new(PhotoRelay::new(
            generator.clone(),
            storage.clone(),
            TEST_PROMPT,
        ));

        let router = routes::handler()
            .layer(Extension(Environment::Development))
            .layer(Extension(relay))
            .layer(Extension(storage.clone()))
            .layer(DefaultBodyLimit::max(body_limit))
            .into();

        Self {
            router,
            storage,
            generator,
            _work_dir: work_dir,
        }
    }

    pub async fn send_multipart(
        &self,
        route: &str,
        body: MultipartBody,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("POST")
            .header("Content-Type", body.content_type())
            .body(Body::from(body.finish()))?;

        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_get_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    /// Number of files currently staged in the uploads directory
    pub fn staged_uploads(&self) -> usize {
        std::fs::read_dir(self.storage.uploads_dir())
            .expect("uploads dir exists")
            .count()
    }

    /// Names of all stored results
    pub fn stored_results(&self) -> Vec<String> {
        std::fs::read_dir(self.storage.results_dir())
            .expect("results dir exists")
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }
}
