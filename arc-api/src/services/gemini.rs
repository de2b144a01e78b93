//! Gemini API client
//!
//! Thin client for the Google Generative Language REST API, plus the
//! content reviewer built on it. The reviewer absorbs every failure mode
//! (network, auth, unparseable output) into a review record that defers
//! the artifact to manual review; callers never see an error from it.

use crate::services::moderation::{ArtifactSubmission, ContentReviewer, ReviewError};
use arc_common::moderation::AiReview;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when the config doesn't name one
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Confidence assumed when the model omits one from an otherwise valid
/// verdict
const DEFAULT_VERDICT_CONFIDENCE: f64 = 0.8;

/// Gemini client errors
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One part of a Gemini request: text or inline image data
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    /// Inline image, base64-encoded
    pub fn inline_image(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Client for one Gemini model endpoint
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        http: reqwest::Client,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        GeminiClient {
            http,
            base_url: GEMINI_BASE_URL.to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Point the client at a different endpoint (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The underlying HTTP client (shared connection pool)
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Send one generation request and return the model's text output.
    ///
    /// JSON output is requested via `responseMimeType`, but callers must
    /// still tolerate prose around the JSON (see `extract_json_object`).
    pub async fn generate(&self, parts: Vec<Part>) -> Result<String, GeminiError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = GenerateRequest {
            contents: vec![RequestContent { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        debug!(model = %self.model, "Sending generateContent request");

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GeminiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeminiError::Api(status.as_u16(), error_text));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::Parse(e.to_string()))?;

        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.is_empty())
            .ok_or(GeminiError::EmptyResponse)
    }
}

/// Locate the first balanced `{...}` substring.
///
/// Models occasionally wrap their JSON verdict in commentary or markdown
/// fences despite being told not to; this ignores everything around the
/// object. Braces inside JSON strings (and escaped quotes inside those)
/// don't count toward nesting.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Verdict shape the moderation prompt asks the model for
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVerdict {
    is_appropriate: Option<bool>,
    confidence: Option<f64>,
    reason: Option<String>,
}

/// Interpret the model's raw text output as a review record.
///
/// Absent fields in a parsed verdict are defaulted (`confidence` 0.8,
/// generic `reason`); anything unparseable becomes a manual-review record.
/// This function never fails.
pub fn interpret_review_text(text: &str) -> AiReview {
    let Some(json_str) = extract_json_object(text) else {
        return AiReview::manual_review("AI review returned no JSON object");
    };

    match serde_json::from_str::<RawVerdict>(json_str) {
        Ok(verdict) => AiReview {
            is_appropriate: verdict.is_appropriate,
            confidence: verdict.confidence.unwrap_or(DEFAULT_VERDICT_CONFIDENCE),
            reason: verdict
                .reason
                .unwrap_or_else(|| "Content reviewed by AI".to_string()),
            reviewed_at: Utc::now(),
        },
        Err(e) => AiReview::manual_review(format!("AI review returned malformed JSON: {}", e)),
    }
}

/// Build the fixed moderation instruction prompt
fn build_review_prompt(submission: &ArtifactSubmission) -> String {
    format!(
        "You are a content moderator for a cultural heritage preservation platform called CultureArc. \
         Your job is to review artifact submissions and determine if they are appropriate for the platform.\n\
         \n\
         Criteria for approval:\n\
         1. The content must be related to cultural heritage, history, art, or archaeology\n\
         2. The content must be educational, informative, or culturally significant\n\
         3. No offensive, hateful, sexual, or violent content\n\
         4. No spam, advertisements, or irrelevant content\n\
         5. The description should provide meaningful cultural or historical context\n\
         \n\
         Please review the following artifact submission:\n\
         \n\
         Title: {}\n\
         Description: {}\n\
         Category: {}\n\
         Era: {}\n\
         Region: {}\n\
         \n\
         Respond in JSON format only with no markdown formatting:\n\
         {{\n\
             \"isAppropriate\": true/false,\n\
             \"confidence\": 0.0-1.0 (how confident you are in this decision),\n\
             \"reason\": \"Brief explanation of the decision\"\n\
         }}",
        submission.title,
        submission.description,
        submission.category,
        submission.era,
        submission.region
    )
}

/// Content reviewer backed by a Gemini model
pub struct GeminiReviewer {
    client: GeminiClient,
}

impl GeminiReviewer {
    pub fn new(client: GeminiClient) -> Self {
        GeminiReviewer { client }
    }
}

#[async_trait]
impl ContentReviewer for GeminiReviewer {
    /// One outbound call per invocation, no retries. Every failure is
    /// folded into the returned record; this implementation never errors.
    async fn review(&self, submission: &ArtifactSubmission) -> Result<AiReview, ReviewError> {
        let prompt = build_review_prompt(submission);

        match self.client.generate(vec![Part::text(prompt)]).await {
            Ok(text) => Ok(interpret_review_text(&text)),
            Err(e) => {
                warn!("AI review call failed: {}", e);
                Ok(AiReview::manual_review(format!("AI review failed: {}", e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bare_object() {
        let text = r#"{"isAppropriate":true,"confidence":0.9,"reason":"ok"}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn extracts_object_embedded_in_prose() {
        let text = "Here is the result: {\"isAppropriate\":true,\"confidence\":0.9,\"reason\":\"ok\"} hope that helps!";
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"isAppropriate":true,"confidence":0.9,"reason":"ok"}"#)
        );
    }

    #[test]
    fn extraction_handles_nested_objects_and_braces_in_strings() {
        let text = r#"```json
{"outer": {"inner": 1}, "reason": "contains } and { in a string"}
```"#;
        let extracted = extract_json_object(text).unwrap();
        assert!(extracted.starts_with("{\"outer\""));
        assert!(extracted.ends_with("string\"}"));
        assert!(serde_json::from_str::<serde_json::Value>(extracted).is_ok());
    }

    #[test]
    fn extraction_fails_without_balanced_object() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{\"unterminated\": true"), None);
    }

    #[test]
    fn interprets_embedded_verdict_unmodified() {
        let review = interpret_review_text(
            "Here is the result: {\"isAppropriate\":true,\"confidence\":0.9,\"reason\":\"ok\"}",
        );
        assert_eq!(review.is_appropriate, Some(true));
        assert_eq!(review.confidence, 0.9);
        assert_eq!(review.reason, "ok");
    }

    #[test]
    fn missing_fields_are_defaulted() {
        let review = interpret_review_text(r#"{"isAppropriate": false}"#);
        assert_eq!(review.is_appropriate, Some(false));
        assert_eq!(review.confidence, 0.8);
        assert!(!review.reason.is_empty());
    }

    #[test]
    fn non_json_response_defers_to_manual_review() {
        let review = interpret_review_text("I can't help with that.");
        assert_eq!(review.is_appropriate, None);
        assert_eq!(review.confidence, 0.0);
        assert!(review.reason.ends_with("Requires manual review."));
    }

    #[test]
    fn malformed_json_defers_to_manual_review() {
        let review = interpret_review_text(r#"{"isAppropriate": "maybe?", "confidence": []}"#);
        assert_eq!(review.is_appropriate, None);
        assert_eq!(review.confidence, 0.0);
        assert!(review.reason.ends_with("Requires manual review."));
    }

    #[test]
    fn prompt_includes_all_submission_fields() {
        let submission = ArtifactSubmission {
            title: "Bronze mirror".to_string(),
            description: "Han dynasty bronze mirror".to_string(),
            category: "Metalwork".to_string(),
            era: "Han dynasty".to_string(),
            region: "China".to_string(),
        };
        let prompt = build_review_prompt(&submission);
        assert!(prompt.contains("Title: Bronze mirror"));
        assert!(prompt.contains("Era: Han dynasty"));
        assert!(prompt.contains("isAppropriate"));
    }

    #[tokio::test]
    async fn transport_failure_yields_failure_record_not_error() {
        // Port 9 (discard) is unroutable on loopback; the request fails
        // fast with a connection error.
        let client = GeminiClient::new(reqwest::Client::new(), "test-model", "test-key")
            .with_base_url("http://127.0.0.1:9");
        let reviewer = GeminiReviewer::new(client);

        let submission = ArtifactSubmission {
            title: "t".to_string(),
            description: "d".to_string(),
            category: "c".to_string(),
            era: "e".to_string(),
            region: "r".to_string(),
        };

        let review = reviewer
            .review(&submission)
            .await
            .expect("reviewer must not error");
        assert_eq!(review.is_appropriate, None);
        assert_eq!(review.confidence, 0.0);
        assert!(review.reason.starts_with("AI review failed:"));
        assert!(review.reason.ends_with("Requires manual review."));
    }
}
