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

/// Client for the HuggingFace inference router (OpenAI-compatible).
pub struct HuggingFaceChatClient {
    http: HttpClient,
    config: ProviderConfig,
}

#[derive(Serialize)]
struct HuggingFaceRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl HuggingFaceChatClient {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_http_client(config)?,
            config: config.clone(),
        })
    }

    fn build_request(&self, spec: &ModelSpec, messages: Vec<Message>, overrides: Overrides) -> HuggingFaceRequest {
        let params = CompletionParams::resolve(spec, &self.config, overrides);
        HuggingFaceRequest {
            model: params.model,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: params.stream,
            extra: params.extra,
        }
    }
}

#[async_trait]
impl ChatClient for HuggingFaceChatClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    async fn complete(
        &self,
        spec: &ModelSpec,
        mut messages: Vec<Message>,
        overrides: Overrides
    ) -> Result<String, ProviderError> {
        apply_system_prompt(&mut messages, system_prompt_for(spec, &self.config));
        let req = self.build_request(spec, messages, overrides);
        info!("HuggingFace request: model={}, messages={}", req.model, req.messages.len());
        post_chat_completion(&self.http, &self.config, &req).await
    }
}
