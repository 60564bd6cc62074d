use std::fmt;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::media::NormalizedMedia;

/// The providers a chat request fans out to. Order matches the aggregated
/// response keys.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// OpenAI chat completions
    #[value(name = "chatgpt")]
    ChatGpt,
    /// Google Gemini generateContent
    Gemini,
    /// Anthropic messages
    Claude,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [ProviderId::ChatGpt, ProviderId::Gemini, ProviderId::Claude];

    /// Key used in the aggregated response and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatGpt => "chatgpt",
            Self::Gemini => "gemini",
            Self::Claude => "claude",
        }
    }

    pub fn default_secret_name(&self) -> &'static str {
        match self {
            Self::ChatGpt => "openai-api-key",
            Self::Gemini => "google-api-key",
            Self::Claude => "anthropic-api-key",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::ChatGpt => "gpt-4o",
            Self::Gemini => "gemini-1.5-flash",
            Self::Claude => "claude-3-5-sonnet-latest",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user turn sent to every provider.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub prompt: Option<String>,
    pub media: Option<NormalizedMedia>,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Send the request and return the primary text of the answer
    async fn chat(&self, request: &ChatRequest) -> Result<String>;
}

/// Maps the common request content onto one provider's content schema.
pub trait ContentAdapter {
    type Part: Serialize;

    fn text_part(&self, text: &str) -> Self::Part;

    fn media_part(&self, media: &NormalizedMedia) -> Self::Part;

    /// Prompt text first, then the attachment.
    fn user_parts(&self, request: &ChatRequest) -> Vec<Self::Part> {
        let mut parts = Vec::with_capacity(2);
        if let Some(prompt) = &request.prompt {
            parts.push(self.text_part(prompt));
        }
        if let Some(media) = &request.media {
            parts.push(self.media_part(media));
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_ids_serialize_as_response_keys() {
        for id in ProviderId::ALL {
            let json = serde_json::to_value(id).unwrap();
            assert_eq!(json, serde_json::Value::String(id.as_str().to_string()));
        }
        assert_eq!(
            ProviderId::from_str("chatgpt", false).unwrap(),
            ProviderId::ChatGpt
        );
    }
}
