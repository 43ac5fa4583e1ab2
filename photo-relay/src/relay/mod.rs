//! Upload relay: stage the photo, call the generator once, hand back the result

mod error;

use std::sync::Arc;

use tracing::{info, instrument};

use crate::generation::{GenerationInput, ImageGenerator};
use crate::image::{GeneratedImage, UploadedImage};
use crate::storage::{StagedUpload, TempStorage};

pub use error::RelayError;

/// Relays uploaded photos to an [`ImageGenerator`]
pub struct PhotoRelay {
    generator: Arc<dyn ImageGenerator>,
    storage: Arc<TempStorage>,
    prompt: String,
}

impl PhotoRelay {
    /// Creates a new relay
    #[must_use]
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        storage: Arc<TempStorage>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            storage,
            prompt: prompt.into(),
        }
    }

    /// Sends one upload through the generator
    ///
    /// The staged copy of the upload is removed before this returns, on every path.
    ///
    /// # Errors
    ///
    /// - `EmptyImage` / `NotAnImage` before anything touches disk or network
    /// - `Storage` if staging fails
    /// - `Generation` if the external call fails or returns no image
    #[instrument(
        skip_all,
        fields(
            mime_type = %upload.mime_type,
            size = upload.data.len(),
            file_name = upload.file_name.as_deref(),
        )
    )]
    pub async fn enhance(&self, upload: UploadedImage) -> Result<GeneratedImage, RelayError> {
        if upload.data.is_empty() {
            return Err(RelayError::EmptyImage);
        }
        if !upload.is_image() {
            return Err(RelayError::NotAnImage(upload.mime_type));
        }

        let UploadedImage {
            data, mime_type, ..
        } = upload;

        let staged = self.storage.stage_upload(data).await?;
        let result = self.generate_from(&staged, &mime_type).await;
        staged.discard();

        let image = result?;
        info!(
            output_mime_type = %image.mime_type,
            output_size = image.data.len(),
            "Photo enhanced"
        );

        Ok(image)
    }

    /// Runs [`Self::enhance`] and keeps the result for a later download
    ///
    /// # Errors
    ///
    /// Same as [`Self::enhance`], plus `Storage` if the result cannot be written
    pub async fn enhance_and_store(
        &self,
        upload: UploadedImage,
    ) -> Result<(GeneratedImage, String), RelayError> {
        let image = self.enhance(upload).await?;
        let name = self.storage.store_result(&image).await?;
        Ok((image, name))
    }

    async fn generate_from(
        &self,
        staged: &StagedUpload,
        mime_type: &str,
    ) -> Result<GeneratedImage, RelayError> {
        let bytes = staged.read().await?;
        let input = GenerationInput {
            image: &bytes,
            mime_type,
            prompt: &self.prompt,
        };

        Ok(self.generator.generate(&input).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::mock::MockImageGenerator;
    use crate::generation::GenerationError;
    use pretty_assertions::assert_eq;

    struct Fixture {
        _dir: tempfile::TempDir,
        storage: Arc<TempStorage>,
        generator: Arc<MockImageGenerator>,
        relay: PhotoRelay,
    }

    fn fixture(generator: MockImageGenerator) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(TempStorage::new(dir.path()).unwrap());
        let generator = Arc::new(generator);
        let relay = PhotoRelay::new(generator.clone(), storage.clone(), "make it golden hour");

        Fixture {
            _dir: dir,
            storage,
            generator,
            relay,
        }
    }

    fn upload(data: &[u8], mime_type: &str) -> UploadedImage {
        UploadedImage {
            data: data.to_vec(),
            mime_type: mime_type.to_string(),
            file_name: Some("photo.jpg".to_string()),
        }
    }

    fn uploads_left(storage: &TempStorage) -> usize {
        std::fs::read_dir(storage.uploads_dir()).unwrap().count()
    }

    #[tokio::test]
    async fn test_enhance_calls_generator_once() {
        let f = fixture(MockImageGenerator::returning(GeneratedImage::new(
            vec![4, 5, 6],
            "image/png",
        )));

        let image = f
            .relay
            .enhance(upload(&[1, 2, 3], "image/jpeg"))
            .await
            .unwrap();

        assert_eq!(image, GeneratedImage::new(vec![4, 5, 6], "image/png"));
        let calls = f.generator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].image, vec![1, 2, 3]);
        assert_eq!(calls[0].mime_type, "image/jpeg");
        assert_eq!(calls[0].prompt, "make it golden hour");
        assert_eq!(uploads_left(&f.storage), 0);
    }

    #[tokio::test]
    async fn test_empty_upload_rejected_without_call() {
        let f = fixture(MockImageGenerator::missing_image());

        let err = f.relay.enhance(upload(&[], "image/png")).await.unwrap_err();

        assert!(matches!(err, RelayError::EmptyImage));
        assert_eq!(f.generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_image_rejected_without_call() {
        let f = fixture(MockImageGenerator::missing_image());

        let err = f
            .relay
            .enhance(upload(b"hello", "text/plain"))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::NotAnImage(m) if m == "text/plain"));
        assert_eq!(f.generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_staged_upload_removed_on_failure() {
        let f = fixture(MockImageGenerator::api_error(500));

        let err = f
            .relay
            .enhance(upload(&[1], "image/png"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RelayError::Generation(GenerationError::Api { status: 500, .. })
        ));
        assert_eq!(f.generator.call_count(), 1);
        assert_eq!(uploads_left(&f.storage), 0);
    }

    #[tokio::test]
    async fn test_enhance_and_store() {
        let f = fixture(MockImageGenerator::returning(GeneratedImage::new(
            vec![9, 9],
            "image/jpeg",
        )));

        let (image, name) = f
            .relay
            .enhance_and_store(upload(&[1], "image/png"))
            .await
            .unwrap();

        assert!(name.ends_with(".jpg"));
        let stored = std::fs::read(f.storage.resolve_result(&name).unwrap()).unwrap();
        assert_eq!(stored, image.data);
    }
}
