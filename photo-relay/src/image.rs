//! Image payloads flowing through the relay

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Image formats the relay knows how to store and serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG
    Png,
    /// JPEG
    Jpeg,
    /// WebP
    WebP,
    /// GIF
    Gif,
    /// AVIF
    Avif,
    /// HEIC
    Heic,
    /// HEIF
    Heif,
}

impl ImageFormat {
    /// File extension used for stored results
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Avif => "avif",
            Self::Heic => "heic",
            Self::Heif => "heif",
        }
    }

    /// MIME type for this format
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Avif => "image/avif",
            Self::Heic => "image/heic",
            Self::Heif => "image/heif",
        }
    }

    /// Maps a MIME type (parameters ignored) to a known format
    #[must_use]
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        let essence = mime_type.parse::<mime::Mime>().ok()?;
        match essence.essence_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            "image/avif" => Some(Self::Avif),
            "image/heic" => Some(Self::Heic),
            "image/heif" => Some(Self::Heif),
            _ => None,
        }
    }

    /// Maps a stored file extension back to a format
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            "avif" => Some(Self::Avif),
            "heic" => Some(Self::Heic),
            "heif" => Some(Self::Heif),
            _ => None,
        }
    }
}

/// A photo received from the browser
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Raw bytes as uploaded
    pub data: Vec<u8>,
    /// MIME type reported by the client
    pub mime_type: String,
    /// Original file name, if the client sent one
    pub file_name: Option<String>,
}

impl UploadedImage {
    /// Whether the reported MIME type is an `image/*` type
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type
            .parse::<mime::Mime>()
            .is_ok_and(|m| m.type_() == mime::IMAGE)
    }
}

/// An image returned by the generative API
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "generated image should be returned or stored"]
pub struct GeneratedImage {
    /// Decoded image bytes
    pub data: Vec<u8>,
    /// MIME type reported by the API
    pub mime_type: String,
}

impl GeneratedImage {
    /// Creates a new generated image
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Storage format, if the reported MIME type is one the relay can serve
    #[must_use]
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_mime_type(&self.mime_type)
    }

    /// Reported MIME type without parameters
    ///
    /// Unparseable values become `application/octet-stream`.
    #[must_use]
    pub fn content_type(&self) -> String {
        self.mime_type.parse::<mime::Mime>().map_or_else(
            |_| mime::APPLICATION_OCTET_STREAM.to_string(),
            |m| m.essence_str().to_string(),
        )
    }

    /// Returns the image as a `data:` URL for inline previews
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type(),
            STANDARD.encode(&self.data)
        )
    }
}
