//! Fan-out of one chat request to every configured provider.
//!
//! All provider calls run concurrently and are awaited together. A provider
//! that fails, times out or answers with nothing contributes `null`; only an
//! empty request fails the aggregate.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{RelayError, Result};
use crate::media::NormalizedMedia;
use crate::providers::{ChatProvider, ChatRequest, ProviderId, ProviderRegistry};

/// One nullable answer per known provider. The key set never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedResponse {
    pub chatgpt: Option<String>,
    pub gemini: Option<String>,
    pub claude: Option<String>,
}

impl AggregatedResponse {
    pub fn get(&self, id: ProviderId) -> Option<&str> {
        match id {
            ProviderId::ChatGpt => self.chatgpt.as_deref(),
            ProviderId::Gemini => self.gemini.as_deref(),
            ProviderId::Claude => self.claude.as_deref(),
        }
    }

    fn set(&mut self, id: ProviderId, value: Option<String>) {
        match id {
            ProviderId::ChatGpt => self.chatgpt = value,
            ProviderId::Gemini => self.gemini = value,
            ProviderId::Claude => self.claude = value,
        }
    }
}

pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    provider_timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<ProviderRegistry>, provider_timeout: Duration) -> Self {
        Self {
            registry,
            provider_timeout,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Send `prompt` and/or `media` to every configured provider.
    ///
    /// A blank prompt counts as absent. Fails with `InvalidRequest`, before
    /// any provider is called, when neither is present.
    pub async fn dispatch(
        &self,
        prompt: Option<String>,
        media: Option<NormalizedMedia>,
    ) -> Result<AggregatedResponse> {
        let prompt = prompt.filter(|prompt| !prompt.trim().is_empty());
        if prompt.is_none() && media.is_none() {
            return Err(RelayError::InvalidRequest(
                "Missing prompt or media file".to_string(),
            ));
        }

        let request = ChatRequest { prompt, media };
        let providers: Vec<&Arc<dyn ChatProvider>> = self.registry.configured().collect();

        info!(
            providers = providers.len(),
            has_prompt = request.prompt.is_some(),
            has_media = request.media.is_some(),
            "Dispatching chat request"
        );

        let calls = providers.into_iter().map(|provider| {
            let request = &request;
            async move { (provider.id(), self.call(provider.as_ref(), request).await) }
        });
        let settled = join_all(calls).await;

        let mut response = AggregatedResponse::default();
        for (id, outcome) in settled {
            match outcome {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(provider = %id, chars = text.len(), "Provider answered");
                    response.set(id, Some(text));
                }
                Ok(_) => {
                    warn!(provider = %id, "Provider returned empty text");
                }
                Err(e) => {
                    error!(provider = %id, error = %e, "Provider call failed");
                }
            }
        }

        Ok(response)
    }

    async fn call(&self, provider: &dyn ChatProvider, request: &ChatRequest) -> Result<String> {
        match tokio::time::timeout(self.provider_timeout, provider.chat(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RelayError::ProviderTimeout {
                provider: provider.id().to_string(),
                seconds: self.provider_timeout.as_secs(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::normalize;
    use async_trait::async_trait;
    use std::sync::Mutex;

    enum Behavior {
        Answer(&'static str),
        Fail,
        Hang,
        Slow(Duration, &'static str),
    }

    struct StubProvider {
        id: ProviderId,
        behavior: Behavior,
        calls: Mutex<Vec<ChatRequest>>,
    }

    impl StubProvider {
        fn new(id: ProviderId, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                id,
                behavior,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatProvider for StubProvider {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn chat(&self, request: &ChatRequest) -> Result<String> {
            self.calls.lock().unwrap().push(request.clone());
            match self.behavior {
                Behavior::Answer(text) => Ok(text.to_string()),
                Behavior::Fail => Err(RelayError::ProviderApi {
                    provider: self.id.to_string(),
                    message: "boom".to_string(),
                    status: Some(500),
                }),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok("too late".to_string())
                }
                Behavior::Slow(delay, text) => {
                    tokio::time::sleep(delay).await;
                    Ok(text.to_string())
                }
            }
        }
    }

    fn dispatcher(providers: Vec<Arc<dyn ChatProvider>>) -> Dispatcher {
        Dispatcher::new(
            Arc::new(ProviderRegistry::from_providers(providers)),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected_without_calls() {
        let chatgpt = StubProvider::new(ProviderId::ChatGpt, Behavior::Answer("hi"));
        let dispatcher = dispatcher(vec![chatgpt.clone()]);

        let err = dispatcher.dispatch(None, None).await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidRequest(_)));

        let err = dispatcher
            .dispatch(Some("   ".to_string()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidRequest(_)));
        assert_eq!(chatgpt.calls(), 0);
    }

    #[tokio::test]
    async fn test_prompt_only_reaches_configured_providers() {
        let chatgpt = StubProvider::new(ProviderId::ChatGpt, Behavior::Answer("from gpt"));
        let claude = StubProvider::new(ProviderId::Claude, Behavior::Answer("from claude"));
        let dispatcher = dispatcher(vec![chatgpt.clone(), claude.clone()]);

        let response = dispatcher
            .dispatch(Some("Hello".to_string()), None)
            .await
            .unwrap();

        assert_eq!(
            response,
            AggregatedResponse {
                chatgpt: Some("from gpt".to_string()),
                gemini: None,
                claude: Some("from claude".to_string()),
            }
        );
        let sent = chatgpt.calls.lock().unwrap();
        assert_eq!(sent[0].prompt.as_deref(), Some("Hello"));
        assert!(sent[0].media.is_none());
    }

    #[tokio::test]
    async fn test_media_is_shared_by_every_provider() {
        let providers: Vec<Arc<StubProvider>> = ProviderId::ALL
            .into_iter()
            .map(|id| StubProvider::new(id, Behavior::Answer("ok")))
            .collect();
        let dispatcher = dispatcher(
            providers
                .iter()
                .map(|p| p.clone() as Arc<dyn ChatProvider>)
                .collect(),
        );

        let media = normalize(vec![0x89, b'P', b'N', b'G'], "image/png");
        dispatcher
            .dispatch(Some("Describe this logo".to_string()), Some(media.clone()))
            .await
            .unwrap();

        for provider in &providers {
            let sent = provider.calls.lock().unwrap();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].media.as_ref(), Some(&media));
        }
    }

    #[tokio::test]
    async fn test_failing_provider_does_not_fail_aggregate() {
        let dispatcher = dispatcher(vec![
            StubProvider::new(ProviderId::ChatGpt, Behavior::Answer("fine")),
            StubProvider::new(ProviderId::Gemini, Behavior::Fail),
            StubProvider::new(ProviderId::Claude, Behavior::Answer("")),
        ]);

        let response = dispatcher
            .dispatch(Some("Hello".to_string()), None)
            .await
            .unwrap();

        assert_eq!(response.get(ProviderId::ChatGpt), Some("fine"));
        assert_eq!(response.get(ProviderId::Gemini), None);
        assert_eq!(response.get(ProviderId::Claude), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out_to_null() {
        let dispatcher = Dispatcher::new(
            Arc::new(ProviderRegistry::from_providers(vec![
                StubProvider::new(ProviderId::ChatGpt, Behavior::Answer("quick"))
                    as Arc<dyn ChatProvider>,
                StubProvider::new(ProviderId::Gemini, Behavior::Hang) as Arc<dyn ChatProvider>,
            ])),
            Duration::from_secs(30),
        );

        let response = dispatcher
            .dispatch(Some("Hello".to_string()), None)
            .await
            .unwrap();

        assert_eq!(response.chatgpt.as_deref(), Some("quick"));
        assert!(response.gemini.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_calls_overlap() {
        let delay = Duration::from_secs(3);
        let dispatcher = dispatcher(vec![
            StubProvider::new(ProviderId::ChatGpt, Behavior::Slow(delay, "gpt")),
            StubProvider::new(ProviderId::Gemini, Behavior::Slow(delay, "gemini")),
            StubProvider::new(ProviderId::Claude, Behavior::Slow(delay, "claude")),
        ]);

        let started = tokio::time::Instant::now();
        let response = dispatcher
            .dispatch(Some("Hello".to_string()), None)
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(response.gemini.as_deref(), Some("gemini"));
        assert!(elapsed >= delay);
        assert!(elapsed < delay * 2, "calls ran one after another: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_empty_registry_returns_all_nulls() {
        let dispatcher = dispatcher(Vec::new());
        let response = dispatcher
            .dispatch(Some("Hello".to_string()), None)
            .await
            .unwrap();

        assert_eq!(response, AggregatedResponse::default());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({"chatgpt": null, "gemini": null, "claude": null})
        );
    }

    #[tokio::test]
    async fn test_repeated_requests_are_independent() {
        let chatgpt = StubProvider::new(ProviderId::ChatGpt, Behavior::Answer("same"));
        let dispatcher = dispatcher(vec![chatgpt.clone()]);

        let first = dispatcher
            .dispatch(Some("Hello".to_string()), None)
            .await
            .unwrap();
        let second = dispatcher
            .dispatch(Some("Hello".to_string()), None)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(chatgpt.calls(), 2);
        assert_eq!(dispatcher.registry().configured_ids(), vec![ProviderId::ChatGpt]);
    }
}
