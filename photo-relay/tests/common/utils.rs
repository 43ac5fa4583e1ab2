use axum::response::Response;
use http_body_util::BodyExt;

const BOUNDARY: &str = "photo-relay-test-boundary";

/// Minimal multipart/form-data body builder
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file part
    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Adds a plain text part
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

/// Parse response body to JSON
pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = response_bytes(response).await;
    serde_json::from_slice(&body).unwrap()
}

/// Collect the full response body
pub async fn response_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Collect the full response body as text
pub async fn response_text(response: Response) -> String {
    String::from_utf8(response_bytes(response).await).unwrap()
}

/// Extracts the download name from a rendered result page
pub fn download_name(html: &str) -> Option<String> {
    let start = html.find("/download/")? + "/download/".len();
    let end = start + html[start..].find('"')?;
    Some(html[start..end].to_string())
}

/// A small JPEG-looking payload
pub fn sample_jpeg() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.extend((0..=255u8).cycle().take(2048));
    data.extend([0xFF, 0xD9]);
    data
}
