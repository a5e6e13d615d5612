//! Google Gemini Oracle implementation.
//!
//! Calls the Gemini `generateContent` endpoint. Auth via URL query param.
//! Any non-well-formed response maps to `QuillError::Oracle` — callers
//! decide whether to fall back.

use async_trait::async_trait;
use quill_core::{
    error::QuillError,
    insight::{GeneratedInsight, InsightRequest},
    traits::Oracle,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default insight title when the Oracle omits one.
const FALLBACK_TITLE: &str = "Scheduled Update";
/// Default notification body when the Oracle omits one.
const FALLBACK_DESCRIPTION: &str = "I have a new personal insight for you.";

/// Google Gemini Oracle.
pub struct GeminiOracle {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiOracle {
    /// Create from config values.
    pub fn from_config(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    /// POST one prompt and return the first candidate's text.
    async fn generate_content(&self, prompt: String) -> Result<String, QuillError> {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let url = format!(
            "{GEMINI_BASE_URL}/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        debug!("gemini: POST models/{}:generateContent", self.model);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| QuillError::Oracle(format!("gemini request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(QuillError::Oracle(format!("gemini returned {status}: {text}")));
        }

        let parsed: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| QuillError::Oracle(format!("gemini: failed to parse response: {e}")))?;

        parsed
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| QuillError::Oracle("gemini: response has no candidates".to_string()))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

/// Wire shape of a scheduled-insight payload. All fields optional so a
/// partially filled response can still be validated explicitly.
#[derive(Deserialize)]
struct RawInsight {
    title: Option<String>,
    short_description: Option<String>,
    full_formatted_result: Option<String>,
}

/// Normalize a canonical intent label the way the store keys expect:
/// trim, uppercase, spaces to underscores, double quotes stripped.
fn normalize_label(raw: &str) -> String {
    raw.trim().to_uppercase().replace(' ', "_").replace('"', "")
}

/// Strip a leading/trailing markdown code fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the fence line.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

/// Decode the strict insight JSON. Title and description fall back to
/// fixed defaults; a missing or empty body makes the payload malformed.
fn decode_insight(text: &str) -> Result<GeneratedInsight, QuillError> {
    let raw: RawInsight = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| QuillError::Oracle(format!("malformed insight payload: {e}")))?;

    let full_result = match raw.full_formatted_result {
        Some(body) if !body.trim().is_empty() => body,
        _ => {
            return Err(QuillError::Oracle(
                "insight payload missing full_formatted_result".to_string(),
            ))
        }
    };

    Ok(GeneratedInsight {
        title: raw
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_TITLE.to_string()),
        short_description: raw
            .short_description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string()),
        full_result,
    })
}

fn canonicalize_prompt(sentence: &str) -> String {
    format!(
        "Identify the core 'Semantic Intent' of the following sentence.\n\
         Rules:\n\
         1. Return a single, short, capitalized label (snake_case).\n\
         2. Be highly consistent: if the sentence means the same thing, the label must be EXACTLY the same.\n\
         3. Remove specific fluff (e.g. \"I want to eat rice\" -> EAT_RICE, \"I'm eating rice\" -> EAT_RICE).\n\
         4. For general chat, return a simple summary (e.g. GREETING).\n\n\
         Sentence: \"{sentence}\"\n\n\
         Canonical Label:"
    )
}

fn insight_prompt(request: &InsightRequest) -> String {
    let action = match request.action_description.as_deref() {
        Some(a) if !a.trim().is_empty() => a.to_string(),
        _ => "Find the most important or insightful thing to tell me right now.".to_string(),
    };

    format!(
        "This is a scheduled moment for a personal insight.\n\
         Current time: {time}\n\n\
         MY RECENT TYPING HISTORY:\n{history}\n\n\
         MY MEMORIES:\n{memories}\n\n\
         MY RECENT ACTION DECISIONS:\n{actions}\n\n\
         SCHEDULED ACTION: \"{action}\"\n\n\
         Relate everything to me personally.\n\
         OUTPUT FORMAT (Strict JSON):\n\
         {{\n\
           \"title\": \"Short title for the insight\",\n\
           \"short_description\": \"2-sentence summary for the push notification body.\",\n\
           \"full_formatted_result\": \"Detailed, markdown-formatted full findings to be stored in my memory.\"\n\
         }}",
        time = request.current_time,
        history = bullet_block(&request.typing_history),
        memories = bullet_block(&request.memories),
        actions = bullet_block(&request.action_history),
        action = action,
    )
}

fn bullet_block(lines: &[String]) -> String {
    if lines.is_empty() {
        return "(none)".to_string();
    }
    lines
        .iter()
        .map(|l| format!("- {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Oracle for GeminiOracle {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn canonicalize(&self, sentence: &str) -> Result<String, QuillError> {
        let text = self.generate_content(canonicalize_prompt(sentence)).await?;
        let label = normalize_label(&text);
        if label.is_empty() {
            return Err(QuillError::Oracle("gemini: empty canonical label".to_string()));
        }
        debug!("gemini: canonical label '{label}'");
        Ok(label)
    }

    async fn generate(&self, request: &InsightRequest) -> Result<GeneratedInsight, QuillError> {
        let text = self.generate_content(insight_prompt(request)).await?;
        decode_insight(&text)
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("gemini: no API key configured");
            return false;
        }
        let url = format!("{GEMINI_BASE_URL}/models?key={}", self.api_key);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("gemini not available: {e}");
                false
            }
        }
    }
}
