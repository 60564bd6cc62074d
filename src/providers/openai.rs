use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RelayError, Result};
use crate::media::NormalizedMedia;
use crate::providers::http::{join_url, send_json, validate_api_key};
use crate::providers::traits::{ChatProvider, ChatRequest, ContentAdapter, ProviderId};

pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl OpenAIProvider {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        max_tokens: u32,
    ) -> Result<Self> {
        validate_api_key(ProviderId::ChatGpt, &api_key)?;

        Ok(Self {
            client: Client::new(),
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com".to_string()),
            max_tokens,
        })
    }

    pub(crate) fn build_request(&self, request: &ChatRequest) -> OpenAIRequest {
        OpenAIRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: self.user_parts(request),
            }],
            max_tokens: Some(self.max_tokens),
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAIProvider {
    fn id(&self) -> ProviderId {
        ProviderId::ChatGpt
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let url = join_url(&self.base_url, "/v1/chat/completions");
        let api_request = self.build_request(request);

        debug!(model = %self.model, "Sending chat completion request");

        let api_response: OpenAIResponse = send_json(
            self.id(),
            self.client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&api_request),
        )
        .await?;

        api_response.into_text()
    }
}

impl ContentAdapter for OpenAIProvider {
    type Part = OpenAIContentPart;

    fn text_part(&self, text: &str) -> OpenAIContentPart {
        OpenAIContentPart::Text {
            text: text.to_string(),
        }
    }

    fn media_part(&self, media: &NormalizedMedia) -> OpenAIContentPart {
        OpenAIContentPart::ImageUrl {
            image_url: OpenAIImageUrl {
                url: media.data_url(),
            },
        }
    }
}

// OpenAI API types

#[derive(Serialize)]
pub(crate) struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: Vec<OpenAIContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpenAIContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAIImageUrl },
}

#[derive(Debug, Serialize)]
pub struct OpenAIImageUrl {
    url: String,
}

#[derive(Deserialize)]
pub(crate) struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

impl OpenAIResponse {
    /// `choices[0].message.content`
    pub(crate) fn into_text(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RelayError::ProviderResponse {
                provider: ProviderId::ChatGpt.to_string(),
                reason: "response has no message content".to_string(),
            })
    }
}
