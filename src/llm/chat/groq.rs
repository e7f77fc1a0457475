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

pub struct GroqChatClient {
    http: HttpClient,
    config: ProviderConfig,
}

#[derive(Serialize)]
struct GroqRequest {
    messages: Vec<Message>,
    model: String,
    temperature: f32,
    #[serde(rename = "max_tokens")]
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl GroqChatClient {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_http_client(config)?,
            config: config.clone(),
        })
    }

    fn build_request(&self, spec: &ModelSpec, messages: Vec<Message>, overrides: Overrides) -> GroqRequest {
        let params = CompletionParams::resolve(spec, &self.config, overrides);
        GroqRequest {
            messages,
            model: params.model,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: params.top_p,
            extra: params.extra,
        }
    }
}

#[async_trait]
impl ChatClient for GroqChatClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Groq
    }

    async fn complete(
        &self,
        spec: &ModelSpec,
        mut messages: Vec<Message>,
        overrides: Overrides
    ) -> Result<String, ProviderError> {
        apply_system_prompt(&mut messages, system_prompt_for(spec, &self.config));
        let req = self.build_request(spec, messages, overrides);
        info!("Groq request: model={}, messages={}", req.model, req.messages.len());
        post_chat_completion(&self.http, &self.config, &req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::default_models;
    use crate::models::chat::Role;
    use serde_json::json;

    fn client() -> GroqChatClient {
        GroqChatClient::from_config(&ProviderConfig::new(ProviderKind::Groq, "gsk_x")).unwrap()
    }

    #[test]
    fn payload_includes_top_p_and_never_stream() {
        let table = default_models().unwrap();
        let spec = table.lookup("groq-llama").unwrap();
        let value = serde_json::to_value(
            client().build_request(spec, vec![Message::user("hi")], Overrides::default())
        ).unwrap();

        assert_eq!(value["model"], json!("llama-3.3-70b-versatile"));
        assert_eq!(value["max_tokens"], json!(4000));
        assert_eq!(value["top_p"], json!(0.9f32));
        assert_eq!(value["temperature"], json!(0.3f32));
        assert!(value.get("stream").is_none());
    }

    #[test]
    fn request_overrides_reach_the_payload() {
        let table = default_models().unwrap();
        let spec = table.lookup("moon").unwrap();
        let overrides = Overrides {
            max_tokens: Some(64),
            temperature: Some(1.0),
            ..Default::default()
        };
        let value = serde_json::to_value(client().build_request(spec, vec![], overrides)).unwrap();
        assert_eq!(value["max_tokens"], json!(64));
        assert_eq!(value["temperature"], json!(1.0f32));
        assert_eq!(value["model"], json!("moonshotai/kimi-k2-instruct-0905"));
    }

    #[test]
    fn extra_params_are_flattened_into_payload() {
        let mut config = ProviderConfig::new(ProviderKind::Groq, "gsk_x");
        config.extra_params.insert("seed".into(), json!(7));
        let client = GroqChatClient::from_config(&config).unwrap();
        let spec = ModelSpec::new("m", ProviderKind::Groq, "upstream");
        let value = serde_json::to_value(
            client.build_request(&spec, vec![Message::new(Role::User, "x")], Overrides::default())
        ).unwrap();
        assert_eq!(value["seed"], json!(7));
        assert!(value.get("top_p").is_none());
    }
}
