use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RelayError, Result};
use crate::media::NormalizedMedia;
use crate::providers::http::{join_url, send_json, validate_api_key};
use crate::providers::traits::{ChatProvider, ChatRequest, ContentAdapter, ProviderId};

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        max_tokens: u32,
    ) -> Result<Self> {
        validate_api_key(ProviderId::Claude, &api_key)?;

        Ok(Self {
            client: Client::new(),
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| "https://api.anthropic.com".to_string()),
            max_tokens,
        })
    }

    pub(crate) fn build_request(&self, request: &ChatRequest) -> AnthropicRequest {
        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: self.user_parts(request),
            }],
        }
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Claude
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let url = join_url(&self.base_url, "/v1/messages");
        let api_request = self.build_request(request);

        debug!(model = %self.model, "Sending messages request");

        let api_response: AnthropicResponse = send_json(
            self.id(),
            self.client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("content-type", "application/json")
                .json(&api_request),
        )
        .await?;

        api_response.into_text()
    }
}

impl ContentAdapter for AnthropicProvider {
    type Part = AnthropicContentBlock;

    fn text_part(&self, text: &str) -> AnthropicContentBlock {
        AnthropicContentBlock::Text {
            text: text.to_string(),
        }
    }

    fn media_part(&self, media: &NormalizedMedia) -> AnthropicContentBlock {
        AnthropicContentBlock::Image {
            source: AnthropicImageSource {
                source_type: "base64".to_string(),
                media_type: media.mime_type().to_string(),
                data: media.base64().to_string(),
            },
        }
    }
}

// Anthropic API types

#[derive(Serialize)]
pub(crate) struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContentBlock {
    Text { text: String },
    Image { source: AnthropicImageSource },
}

#[derive(Debug, Serialize)]
pub struct AnthropicImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

#[derive(Deserialize)]
pub(crate) struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

impl AnthropicResponse {
    /// First text block of the answer.
    pub(crate) fn into_text(self) -> Result<String> {
        self.content
            .into_iter()
            .find_map(|block| match block {
                AnthropicResponseBlock::Text { text } => Some(text),
                AnthropicResponseBlock::Other => None,
            })
            .ok_or_else(|| RelayError::ProviderResponse {
                provider: ProviderId::Claude.to_string(),
                reason: "response has no text block".to_string(),
            })
    }
}
