use serde::{Deserialize, Serialize};

use crate::guide::GuideOutline;

// POST /analyze body
#[derive(Deserialize, Debug, Default)]
pub struct AnalyzeRequest {
    pub code: Option<String>,
    #[serde(default)]
    pub dockerfile: Option<String>,
    #[serde(default)]
    pub jenkinsfile: Option<String>,
}

// POST /analyze response
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub response: String,
    pub artifacts: GenerationResult,
    pub guide_outline: GuideOutline,
}

// POST /comment body
#[derive(Deserialize, Debug, Default)]
pub struct CommentRequest {
    pub code: Option<String>,
}

// POST /comment response
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub response: String,
    pub commented_code: String,
    pub metadata: CommentMetadata,
}

#[derive(Serialize, Debug)]
pub struct CommentMetadata {
    // milliseconds
    pub duration: u64,
    pub language: String,
    pub model: String,
    pub timestamp: String,
}

/// The three artifacts; every field is always populated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub dockerfile: String,
    pub jenkinsfile: String,
    pub guide: String,
}

// Chat-completion API request format
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

// Chat-completion API response format, only the parts we read
#[derive(Deserialize, Debug, Default)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
pub struct ChatChoice {
    pub message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize, Debug)]
pub struct ChatChoiceMessage {
    pub content: Option<String>,
}

impl ChatResponse {
    pub fn first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty())
    }
}

// Error body returned by the upstream API on non-2xx
#[derive(Deserialize, Debug, Default)]
pub struct UpstreamErrorBody {
    pub error: Option<UpstreamErrorDetail>,
}

#[derive(Deserialize, Debug)]
pub struct UpstreamErrorDetail {
    pub message: Option<String>,
}

/// Length and presence rules for a text field. Lengths count characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldRules {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

/// Returns the first violated rule as a user-facing message.
pub fn validate_field(value: Option<&str>, rules: FieldRules) -> Option<String> {
    let value = value.filter(|v| !v.trim().is_empty());

    let Some(value) = value else {
        return rules
            .required
            .then(|| "This field is required".to_string());
    };

    let length = value.chars().count();
    if let Some(min) = rules.min_length {
        if length < min {
            return Some(format!("Must be at least {min} characters"));
        }
    }
    if let Some(max) = rules.max_length {
        if length > max {
            return Some(format!("Must be less than {max} characters"));
        }
    }
    None
}

pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
