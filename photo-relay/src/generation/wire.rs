//! JSON bodies exchanged with the generative image API

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use super::{GenerationError, GenerationInput};
use crate::image::GeneratedImage;

const DEFAULT_OUTPUT_MIME: &str = "image/png";

/// Finish reasons that mean the output was withheld by safety filters
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "IMAGE_SAFETY",
    "IMAGE_PROHIBITED_CONTENT",
    "PROHIBITED_CONTENT",
    "RECITATION",
    "IMAGE_RECITATION",
    "BLOCKLIST",
    "SPII",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: OutgoingInlineData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutgoingInlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 2],
}

impl<'a> GenerateContentRequest<'a> {
    /// Image first, then the instruction, in a single user turn
    pub fn from_input(input: &GenerationInput<'a>) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    RequestPart::InlineData {
                        inline_data: OutgoingInlineData {
                            mime_type: input.mime_type,
                            data: STANDARD.encode(input.image),
                        },
                    },
                    RequestPart::Text { text: input.prompt },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["TEXT", "IMAGE"],
            },
        }
    }
}

/// Response body; covers both `generateContent` candidates and `predict` predictions
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default, alias = "inline_data")]
    inline_data: Option<IncomingInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomingInlineData {
    #[serde(default, alias = "mime_type")]
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

impl GenerateContentResponse {
    /// Extracts the first generated image
    ///
    /// # Errors
    ///
    /// - `ContentBlocked` when the prompt or every output was blocked
    /// - `MissingImage` when no part carries image data
    /// - `Decode` when the payload is not valid base64
    pub fn into_image(self) -> Result<GeneratedImage, GenerationError> {
        if let Some(feedback) = self.prompt_feedback {
            if let Some(reason) = feedback.block_reason {
                return Err(GenerationError::ContentBlocked(
                    feedback
                        .block_reason_message
                        .unwrap_or_else(|| format!("prompt blocked: {reason}")),
                ));
            }
        }

        let mut blocked_reason = None;
        for candidate in self.candidates {
            let inline = candidate
                .content
                .into_iter()
                .flat_map(|content| content.parts)
                .find_map(|part| part.inline_data);

            if let Some(inline) = inline {
                return decode(&inline.data, inline.mime_type);
            }

            if let Some(reason) = candidate
                .finish_reason
                .filter(|reason| BLOCKING_FINISH_REASONS.contains(&reason.as_str()))
            {
                blocked_reason.get_or_insert(reason);
            }
        }

        if let Some((data, mime_type)) = self
            .predictions
            .into_iter()
            .find_map(|p| p.bytes_base64_encoded.map(|data| (data, p.mime_type)))
        {
            return decode(&data, mime_type);
        }

        match blocked_reason {
            Some(reason) => Err(GenerationError::ContentBlocked(format!(
                "output blocked: {reason}"
            ))),
            None => Err(GenerationError::MissingImage),
        }
    }
}

fn decode(data: &str, mime_type: Option<String>) -> Result<GeneratedImage, GenerationError> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| GenerationError::Decode(e.to_string()))?;

    if bytes.is_empty() {
        return Err(GenerationError::MissingImage);
    }

    let mime_type = mime_type
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_OUTPUT_MIME.to_string());

    Ok(GeneratedImage::new(bytes, mime_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).expect("valid response")
    }

    #[test]
    fn test_request_serialization() {
        let input = GenerationInput {
            image: &[0xFF, 0xD8, 0xFF],
            mime_type: "image/jpeg",
            prompt: "make it HD",
        };

        let body = serde_json::to_value(GenerateContentRequest::from_input(&input)).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"inlineData": {"mimeType": "image/jpeg", "data": "/9j/"}},
                        {"text": "make it HD"}
                    ]
                }],
                "generationConfig": {"responseModalities": ["TEXT", "IMAGE"]}
            })
        );
    }

    #[test]
    fn test_inline_image_after_text_part() {
        let response = parse(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here is your photo"},
                    {"inlineData": {"mimeType": "image/jpeg", "data": "AQID"}}
                ]},
                "finishReason": "STOP"
            }]
        }));

        let image = response.into_image().unwrap();
        assert_eq!(image, GeneratedImage::new(vec![1, 2, 3], "image/jpeg"));
    }

    #[test]
    fn test_inline_image_without_mime_defaults_to_png() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": [{"inline_data": {"data": "AQID"}}]}}]
        }));

        assert_eq!(response.into_image().unwrap().mime_type, "image/png");
    }

    #[test]
    fn test_predictions_shape() {
        let response = parse(json!({
            "predictions": [
                {"mimeType": "image/png"},
                {"bytesBase64Encoded": "BAUG", "mimeType": "image/webp"}
            ]
        }));

        let image = response.into_image().unwrap();
        assert_eq!(image, GeneratedImage::new(vec![4, 5, 6], "image/webp"));
    }

    #[test]
    fn test_text_only_response_is_missing_image() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": [{"text": "I cannot do that"}]}}]
        }));

        assert!(matches!(
            response.into_image(),
            Err(GenerationError::MissingImage)
        ));
    }

    #[test]
    fn test_empty_response_is_missing_image() {
        assert!(matches!(
            parse(json!({})).into_image(),
            Err(GenerationError::MissingImage)
        ));
    }

    #[test]
    fn test_prompt_feedback_block() {
        let response = parse(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        }));

        match response.into_image() {
            Err(GenerationError::ContentBlocked(msg)) => assert_eq!(msg, "prompt blocked: SAFETY"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_safety_finish_reason_without_image() {
        let response = parse(json!({
            "candidates": [{"finishReason": "IMAGE_SAFETY"}]
        }));

        assert!(matches!(
            response.into_image(),
            Err(GenerationError::ContentBlocked(_))
        ));
    }

    #[test]
    fn test_invalid_base64() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "not base64!"}}]}}]
        }));

        assert!(matches!(
            response.into_image(),
            Err(GenerationError::Decode(_))
        ));
    }

    #[test]
    fn test_empty_payload_is_missing_image() {
        let response = parse(json!({
            "predictions": [{"bytesBase64Encoded": ""}]
        }));

        assert!(matches!(
            response.into_image(),
            Err(GenerationError::MissingImage)
        ));
    }
}
