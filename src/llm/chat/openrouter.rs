use async_trait::async_trait;
use log::info;
use reqwest::Client as HttpClient;
use serde::Serialize;
use serde_json::{ Map, Value };

use super::{ apply_system_prompt, build_http_client, post_chat_completion, system_prompt_for, ChatClient, CompletionParams, Overrides };
use crate::config::models::ModelSpec;
use crate::error::ProviderError;
use crate::llm::{ ProviderConfig, ProviderKind };
use crate::models::chat::Message;

/// OpenRouter client. Identifying `HTTP-Referer`/`X-Title` headers come from
/// `ProviderConfig::extra_headers`.
pub struct OpenRouterChatClient {
    http: HttpClient,
    config: ProviderConfig,
}

#[derive(Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl OpenRouterChatClient {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_http_client(config)?,
            config: config.clone(),
        })
    }

    fn build_request(&self, spec: &ModelSpec, messages: Vec<Message>, overrides: Overrides) -> OpenRouterRequest {
        let params = CompletionParams::resolve(spec, &self.config, overrides);
        OpenRouterRequest {
            model: params.model,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            extra: params.extra,
        }
    }
}

#[async_trait]
impl ChatClient for OpenRouterChatClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::OpenRouter
    }

    async fn complete(
        &self,
        spec: &ModelSpec,
        mut messages: Vec<Message>,
        overrides: Overrides
    ) -> Result<String, ProviderError> {
        apply_system_prompt(&mut messages, system_prompt_for(spec, &self.config));
        let req = self.build_request(spec, messages, overrides);
        info!("OpenRouter request: model={}, messages={}", req.model, req.messages.len());
        post_chat_completion(&self.http, &self.config, &req).await
    }
}
