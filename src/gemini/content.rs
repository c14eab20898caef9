//! Wire types of the `generateContent` endpoint.
//!
//! Only the fields needed to send a text prompt and pull text parts out of
//! the answer are modelled; everything else in the response is ignored.

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
}
impl GenerateContentRequest {
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(prompt)],
            }],
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

/// A piece of content. Parts that carry something other than text (inline
/// data, function calls) deserialize with `text: None`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}
impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}
impl GenerateContentResponse {
    /// Text parts of the first candidate, in order.
    pub fn texts(&self) -> Vec<String> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
    }
    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_deref())
    }
}

#[derive(Debug, Clone, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Error envelope returned with non-success statuses.
#[derive(Debug, Clone, serde::Deserialize, PartialEq, Eq)]
pub(crate) struct ApiErrorResponse {
    pub(crate) error: ApiErrorBody,
}
#[derive(Debug, Clone, serde::Deserialize, PartialEq, Eq)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub(crate) code: u16,
    #[serde(default)]
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) status: String,
}

/// Generated text, one entry per text part.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Generation {
    parts: Vec<String>,
}
impl Generation {
    pub fn new(parts: Vec<String>) -> Self {
        Self { parts }
    }
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(vec![text.into()])
    }
    pub fn parts(&self) -> &[String] {
        &self.parts
    }
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
impl From<GenerateContentResponse> for Generation {
    fn from(res: GenerateContentResponse) -> Self {
        Self::new(res.texts())
    }
}
