//! AI cape suggestions.
//!
//! Sends the current skin to Gemini's `generateContent` endpoint and asks
//! for a cape concept constrained to a JSON schema. The operation is total
//! from the caller's point of view: every failure path (network, HTTP
//! status, malformed payload, schema mismatch) collapses into one fixed
//! fallback suggestion, so callers never branch on errors.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::texture::{self, TextureRef};

const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:generateContent";

const INSTRUCTION: &str = "Analyze this Minecraft skin and suggest a creative cape design that \
                           would match its style. Provide the response in JSON format including \
                           name, description, colorPalette (hex codes), and theme.";

// =============================================================================
// Suggestion
// =============================================================================

/// A cape concept produced by the analysis service. Display-only; never
/// written back into the visual config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapeSuggestion {
    pub name: String,
    pub description: String,
    pub color_palette: Vec<String>,
    pub theme: String,
}

impl CapeSuggestion {
    /// Deterministic stand-in returned when the analysis service fails.
    pub fn fallback() -> Self {
        Self {
            name: "Classic Complement".to_string(),
            description: "A simple, elegant cape that matches your skin's primary colors."
                .to_string(),
            color_palette: vec!["#333333".to_string(), "#ffffff".to_string()],
            theme: "Minimalist".to_string(),
        }
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Schema constraining the model's output to the [`CapeSuggestion`] shape.
fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING" },
            "description": { "type": "STRING" },
            "colorPalette": { "type": "ARRAY", "items": { "type": "STRING" } },
            "theme": { "type": "STRING" }
        },
        "required": ["name", "description", "colorPalette", "theme"]
    })
}

// =============================================================================
// Client
// =============================================================================

/// Client for the cape analysis service.
#[derive(Clone)]
pub struct SuggestionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl SuggestionClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, GEMINI_ENDPOINT)
    }

    /// Point the client at a different endpoint. Used by tests.
    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Analyze `skin` and produce a cape suggestion.
    ///
    /// Never fails: any error is logged and replaced with
    /// [`CapeSuggestion::fallback`].
    pub async fn suggest(&self, skin: &TextureRef) -> CapeSuggestion {
        match self.try_suggest(skin).await {
            Ok(suggestion) => {
                info!(name = %suggestion.name, "Received cape suggestion");
                suggestion
            }
            Err(e) => {
                warn!(error = %e, "Cape analysis failed, using fallback suggestion");
                CapeSuggestion::fallback()
            }
        }
    }

    async fn try_suggest(&self, skin: &TextureRef) -> Result<CapeSuggestion> {
        // The analysis service requires inline bytes, not URLs.
        let (bytes, mime) = texture::fetch_bytes(&self.http, skin)
            .await
            .context("fetching skin bytes")?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: mime,
                            data: BASE64.encode(&bytes),
                        }),
                        text: None,
                    },
                    Part {
                        inline_data: None,
                        text: Some(INSTRUCTION.to_string()),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("sending analysis request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("analysis service returned {}: {}", status, body);
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .context("decoding analysis response")?;
        parse_suggestion(&payload)
    }
}

fn parse_suggestion(payload: &GenerateContentResponse) -> Result<CapeSuggestion> {
    let text = payload
        .candidates
        .first()
        .and_then(|candidate| candidate.content.parts.first())
        .map(|part| part.text.as_str())
        .ok_or_else(|| anyhow!("analysis response contained no candidates"))?;

    serde_json::from_str(text).context("analysis response did not match the suggestion schema")
}

// =============================================================================
// Tests
// =============================================================================
