pub mod groq;
pub mod huggingface;
pub mod openrouter;

use async_trait::async_trait;
use log::{ debug, error };
use reqwest::{ Client as HttpClient, StatusCode, header::{ HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE } };
use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value };
use std::sync::Arc;

use self::groq::GroqChatClient;
use self::huggingface::HuggingFaceChatClient;
use self::openrouter::OpenRouterChatClient;
use super::{ ProviderConfig, ProviderKind };
use crate::config::models::ModelSpec;
use crate::error::ProviderError;
use crate::models::chat::{ Message, Role };

/// Payload keys owned by the adapters; passthrough options cannot replace them.
const RESERVED_PARAMS: [&str; 6] = ["model", "messages", "max_tokens", "temperature", "top_p", "stream"];

/// Per-request overrides. Take precedence over the model row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub options: Map<String, Value>,
}

/// Effective sampling parameters for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub stream: Option<bool>,
    pub extra: Map<String, Value>,
}

impl CompletionParams {
    /// Request override, then model row, then provider default.
    ///
    /// Extra params merge the provider's `extra_params` with the request's
    /// options, request winning.
    pub fn resolve(spec: &ModelSpec, config: &ProviderConfig, overrides: Overrides) -> Self {
        let extra = config.extra_params
            .clone()
            .into_iter()
            .chain(overrides.options)
            .filter(|(key, _)| !RESERVED_PARAMS.contains(&key.as_str()))
            .collect();
        Self {
            model: spec.model.clone(),
            max_tokens: overrides.max_tokens.or(spec.max_tokens).unwrap_or(config.max_tokens),
            temperature: overrides.temperature.or(spec.temperature).unwrap_or(config.temperature),
            top_p: spec.top_p,
            stream: spec.stream,
            extra,
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// Sends `messages` to the backend serving `spec` and returns the assistant text.
    async fn complete(
        &self,
        spec: &ModelSpec,
        messages: Vec<Message>,
        overrides: Overrides
    ) -> Result<String, ProviderError>;
}

/// Prepends the persona when the conversation is a lone user turn.
pub fn apply_system_prompt(messages: &mut Vec<Message>, system_prompt: Option<&str>) {
    let Some(prompt) = system_prompt else {
        return;
    };
    if messages.len() == 1 && messages[0].role == Role::User {
        messages.insert(0, Message::system(prompt));
    }
}

pub fn system_prompt_for<'a>(spec: &'a ModelSpec, config: &'a ProviderConfig) -> Option<&'a str> {
    spec.system_prompt.as_deref().or(config.default_system_prompt.as_deref())
}

pub fn new_client(config: &ProviderConfig) -> Result<Arc<dyn ChatClient>, ProviderError> {
    let client: Arc<dyn ChatClient> = match config.kind {
        ProviderKind::HuggingFace => Arc::new(HuggingFaceChatClient::from_config(config)?),
        ProviderKind::Groq => Arc::new(GroqChatClient::from_config(config)?),
        ProviderKind::OpenRouter => Arc::new(OpenRouterChatClient::from_config(config)?),
    };
    Ok(client)
}

pub(crate) fn build_http_client(config: &ProviderConfig) -> Result<HttpClient, ProviderError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", config.auth_token)).map_err(|e|
            ProviderError::Client(format!("Invalid API key format for {}: {}", config.kind, e))
        )?
    );
    for (name, value) in &config.extra_headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e|
            ProviderError::Client(format!("Invalid header name '{}': {}", name, e))
        )?;
        let value = HeaderValue::from_str(value).map_err(|e|
            ProviderError::Client(format!("Invalid value for header '{}': {}", name, e))
        )?;
        headers.insert(name, value);
    }

    HttpClient::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .build()
        .map_err(|e| ProviderError::Client(e.to_string()))
}

#[derive(Deserialize)]
struct CompletionEnvelope {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

/// POSTs `payload` and extracts `choices[0].message.content`.
pub(crate) async fn post_chat_completion<P: Serialize + Sync>(
    http: &HttpClient,
    config: &ProviderConfig,
    payload: &P
) -> Result<String, ProviderError> {
    let map_err = |e: reqwest::Error| {
        if e.is_timeout() {
            ProviderError::Timeout(config.timeout.as_secs())
        } else {
            ProviderError::Transport(e.to_string())
        }
    };

    let resp = http.post(&config.endpoint_url).json(payload).send().await.map_err(map_err)?;
    let status = resp.status();
    let body = resp.text().await.map_err(map_err)?;
    debug!("{} responded {} ({} bytes)", config.kind, status, body.len());

    parse_completion(status, body).map_err(|e| {
        error!("{} call failed: {}", config.kind, e);
        e
    })
}

pub(crate) fn parse_completion(status: StatusCode, body: String) -> Result<String, ProviderError> {
    if status != StatusCode::OK {
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let envelope: CompletionEnvelope = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return Err(ProviderError::Malformed {
                detail: e.to_string(),
                body,
            });
        }
    };

    match envelope.choices.into_iter().next() {
        Some(choice) => Ok(choice.message.content),
        None => Err(ProviderError::EmptyChoices { body }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice_content() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"hi there"}},{"message":{"content":"second"}}]}"#;
        assert_eq!(parse_completion(StatusCode::OK, body.to_string()).unwrap(), "hi there");
    }

    #[test]
    fn empty_choices_is_an_error() {
        let err = parse_completion(StatusCode::OK, r#"{"choices":[]}"#.to_string()).unwrap_err();
        assert!(matches!(err, ProviderError::EmptyChoices { .. }));
    }

    #[test]
    fn wrong_shapes_are_malformed() {
        for body in [
            r#"{}"#,
            r#"{"choices":"nope"}"#,
            r#"{"choices":[{"text":"legacy"}]}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
            r#"{"choices":[{"message":{"content":42}}]}"#,
            "not json",
        ] {
            let err = parse_completion(StatusCode::OK, body.to_string()).unwrap_err();
            match err {
                ProviderError::Malformed { body: raw, .. } => assert_eq!(raw, body),
                other => panic!("expected malformed for {}, got {:?}", body, other),
            }
        }
    }

    #[test]
    fn non_200_keeps_status_and_body() {
        let err = parse_completion(StatusCode::UNAUTHORIZED, "invalid token".to_string()).unwrap_err();
        match err {
            ProviderError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid token");
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = parse_completion(
            StatusCode::CREATED,
            r#"{"choices":[{"message":{"content":"x"}}]}"#.to_string()
        ).unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 201, .. }));
    }

    #[test]
    fn system_prompt_only_for_first_user_turn() {
        let mut messages = vec![Message::user("hi")];
        apply_system_prompt(&mut messages, Some("persona"));
        assert_eq!(messages, vec![Message::system("persona"), Message::user("hi")]);

        let mut messages = vec![Message::user("q1"), Message::assistant("a1"), Message::user("q2")];
        apply_system_prompt(&mut messages, Some("persona"));
        assert_eq!(messages.len(), 3);

        let mut messages = vec![Message::user("hi")];
        apply_system_prompt(&mut messages, None);
        assert_eq!(messages, vec![Message::user("hi")]);
    }

    #[test]
    fn params_prefer_request_then_row_then_provider() {
        let config = ProviderConfig::new(ProviderKind::Groq, "k");
        let mut spec = ModelSpec::new("m", ProviderKind::Groq, "upstream");

        let params = CompletionParams::resolve(&spec, &config, Overrides::default());
        assert_eq!(params.max_tokens, config.max_tokens);
        assert_eq!(params.temperature, config.temperature);

        spec.max_tokens = Some(100);
        spec.temperature = Some(0.9);
        let params = CompletionParams::resolve(&spec, &config, Overrides {
            max_tokens: Some(10),
            ..Default::default()
        });
        assert_eq!(params.max_tokens, 10);
        assert_eq!(params.temperature, 0.9);
        assert_eq!(params.model, "upstream");
    }

    #[test]
    fn request_options_merge_over_provider_extras() {
        let mut config = ProviderConfig::new(ProviderKind::Groq, "k");
        config.extra_params.insert("seed".into(), serde_json::json!(1));
        config.extra_params.insert("user".into(), serde_json::json!("gateway"));
        let spec = ModelSpec::new("m", ProviderKind::Groq, "upstream");

        let mut options = Map::new();
        options.insert("seed".into(), serde_json::json!(42));
        options.insert("model".into(), serde_json::json!("hijack"));
        options.insert("presence_penalty".into(), serde_json::json!(0.5));
        let params = CompletionParams::resolve(&spec, &config, Overrides {
            options,
            ..Default::default()
        });

        assert_eq!(params.model, "upstream");
        assert_eq!(params.extra.get("seed"), Some(&serde_json::json!(42)));
        assert_eq!(params.extra.get("user"), Some(&serde_json::json!("gateway")));
        assert_eq!(params.extra.get("presence_penalty"), Some(&serde_json::json!(0.5)));
        assert!(!params.extra.contains_key("model"));
    }

    #[test]
    fn row_persona_wins_over_provider_default() {
        let mut config = ProviderConfig::new(ProviderKind::OpenRouter, "k");
        config.default_system_prompt = Some("provider".into());
        let mut spec = ModelSpec::new("m", ProviderKind::OpenRouter, "x");
        assert_eq!(system_prompt_for(&spec, &config), Some("provider"));
        spec.system_prompt = Some("row".into());
        assert_eq!(system_prompt_for(&spec, &config), Some("row"));
    }

    #[test]
    fn invalid_token_fails_client_construction() {
        let config = ProviderConfig::new(ProviderKind::Groq, "bad\ntoken");
        assert!(matches!(build_http_client(&config), Err(ProviderError::Client(_))));
        assert!(build_http_client(&ProviderConfig::new(ProviderKind::Groq, "")).is_ok());
    }
}
