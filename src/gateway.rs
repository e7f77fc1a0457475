use crate::config::models::{ ModelSpec, ModelTable };
use crate::error::{ DispatchError, ProviderError };
use crate::history::normalize::normalize;
use crate::history::{ ConversationKey, HistoryStore };
use crate::llm::chat::{ new_client, ChatClient, Overrides };
use crate::llm::{ ProviderConfig, ProviderKind };
use crate::models::chat::{ ChatRequest, ChatResponse, Content, Role };

use log::{ info, warn };
use std::collections::HashMap;
use std::sync::Arc;

/// Routes chat requests to provider clients and keeps conversation memory.
///
/// Every model id goes through the model table lookup in [`Gateway::resolve`];
/// there is no other routing path.
pub struct Gateway {
    models: Arc<ModelTable>,
    clients: HashMap<ProviderKind, Arc<dyn ChatClient>>,
    history: Arc<dyn HistoryStore>,
    history_window: usize,
}

impl Gateway {
    pub fn new(
        models: Arc<ModelTable>,
        clients: Vec<Arc<dyn ChatClient>>,
        history: Arc<dyn HistoryStore>,
        history_window: usize
    ) -> Self {
        let clients = clients
            .into_iter()
            .map(|client| (client.provider(), client))
            .collect();
        Self {
            models,
            clients,
            history,
            history_window,
        }
    }

    pub fn from_configs(
        models: Arc<ModelTable>,
        providers: &[ProviderConfig],
        history: Arc<dyn HistoryStore>,
        history_window: usize
    ) -> Result<Self, ProviderError> {
        let mut clients = Vec::with_capacity(providers.len());
        for config in providers {
            if config.auth_token.is_empty() {
                warn!("No credentials configured for {}; calls will be rejected upstream", config.kind);
            }
            info!("Provider {} -> {}", config.kind, config.endpoint_url);
            clients.push(new_client(config)?);
        }
        Ok(Self::new(models, clients, history, history_window))
    }

    pub fn models(&self) -> &ModelTable {
        &self.models
    }

    /// Checks required fields and looks the model up in the table.
    pub fn resolve(&self, request: &ChatRequest) -> Result<&ModelSpec, DispatchError> {
        if request.message.is_empty() {
            return Err(DispatchError::Validation("Message is required".to_string()));
        }
        if request.model.is_empty() {
            return Err(DispatchError::Validation("Model is required".to_string()));
        }
        self.models.lookup(&request.model).ok_or_else(|| DispatchError::UnknownModel(request.model.clone()))
    }

    /// Runs a request and wraps the outcome.
    ///
    /// Validation-class failures come back as `Err`, before any network call.
    /// Provider failures come back as an unsuccessful [`ChatResponse`].
    pub async fn dispatch(&self, request: ChatRequest) -> Result<ChatResponse, DispatchError> {
        match self.complete(&request).await {
            Ok(text) => Ok(ChatResponse::success(request.model, text)),
            Err(e) if e.is_validation() => Err(e),
            Err(e) => Ok(ChatResponse::failure(request.model, e.code(), e.to_string())),
        }
    }

    /// Runs a request end to end and returns the assistant text.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String, DispatchError> {
        let spec = self.resolve(request)?;
        let client = self.clients
            .get(&spec.provider)
            .ok_or_else(||
                ProviderError::Client(format!("no client configured for provider {}", spec.provider))
            )?;

        let key = ConversationKey::from_request(request);
        let prior = match (&request.history, &key) {
            (None, Some(key)) => self.history.read(key, self.history_window),
            _ => Vec::new(),
        };
        let messages = normalize(request, &prior);

        info!(
            "Dispatching '{}' to {} ({} messages, conversation {})",
            spec.id,
            spec.provider,
            messages.len(),
            key.as_ref().map(|k| k.to_string()).unwrap_or_else(|| "none".to_string())
        );

        let overrides = Overrides {
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            options: request.options.clone().unwrap_or_default(),
        };
        let text = client.complete(spec, messages, overrides).await?;

        if let Some(key) = key {
            self.history.append(&key, Role::User, Content::Text(request.message.clone()));
            self.history.append(&key, Role::Assistant, Content::Text(text.clone()));
        }
        Ok(text)
    }

    pub fn clear_history(&self, chat_id: &str, sender_id: &str) -> Result<(), DispatchError> {
        if chat_id.is_empty() || sender_id.is_empty() {
            return Err(DispatchError::Validation("chatId and senderId are required".to_string()));
        }
        let key = ConversationKey::new(chat_id, sender_id);
        self.history.clear(&key);
        info!("Cleared conversation history for {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::default_models;
    use crate::error::ErrorCode;
    use crate::history::MemoryHistoryStore;
    use crate::models::chat::Message;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Scripted client that records what it was sent.
    struct FakeClient {
        kind: ProviderKind,
        reply: Option<String>,
        calls: Mutex<Vec<(String, Vec<Message>, Overrides)>>,
    }

    impl FakeClient {
        fn replying(kind: ProviderKind, reply: &str) -> Arc<Self> {
            Arc::new(Self {
                kind,
                reply: Some(reply.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(kind: ProviderKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                reply: None,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatClient for FakeClient {
        fn provider(&self) -> ProviderKind {
            self.kind
        }

        async fn complete(
            &self,
            spec: &ModelSpec,
            messages: Vec<Message>,
            overrides: Overrides
        ) -> Result<String, ProviderError> {
            self.calls.lock().push((spec.id.clone(), messages, overrides));
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None =>
                    Err(ProviderError::Status {
                        status: 500,
                        body: "upstream exploded".to_string(),
                    }),
            }
        }
    }

    fn gateway(client: Arc<FakeClient>) -> (Gateway, Arc<MemoryHistoryStore>) {
        let store = Arc::new(MemoryHistoryStore::new(100, 50));
        let clients: Vec<Arc<dyn ChatClient>> = vec![client];
        let gateway = Gateway::new(default_models().unwrap(), clients, store.clone(), 10);
        (gateway, store)
    }

    #[tokio::test]
    async fn successful_call_writes_user_then_assistant() {
        let client = FakeClient::replying(ProviderKind::HuggingFace, "hi there");
        let (gateway, store) = gateway(client.clone());

        let req = ChatRequest::new("deepseek", "hello").with_conversation("c1", "u1");
        let resp = gateway.dispatch(req).await.unwrap();
        assert!(resp.success);
        assert_eq!(resp.text, "hi there");
        assert_eq!(resp.model_used, "deepseek");

        let turns = store.read(&ConversationKey::new("c1", "u1"), 10);
        let messages: Vec<Message> = turns.iter().map(Message::from).collect();
        assert_eq!(messages, vec![Message::user("hello"), Message::assistant("hi there")]);
    }

    #[tokio::test]
    async fn stored_history_is_sent_on_next_call() {
        let client = FakeClient::replying(ProviderKind::Groq, "answer");
        let (gateway, _) = gateway(client.clone());

        let req = ChatRequest::new("groq-llama", "first").with_conversation("c1", "u1");
        gateway.complete(&req).await.unwrap();
        let req = ChatRequest::new("groq-llama", "second").with_conversation("c1", "u1");
        gateway.complete(&req).await.unwrap();

        let calls = client.calls.lock();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, vec![Message::user("first")]);
        assert_eq!(
            calls[1].1,
            vec![Message::user("first"), Message::assistant("answer"), Message::user("second")]
        );
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_any_call() {
        let client = FakeClient::replying(ProviderKind::HuggingFace, "unused");
        let (gateway, _) = gateway(client.clone());

        let err = gateway.dispatch(ChatRequest::new("deepseek", "")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
        let err = gateway.dispatch(ChatRequest::new("", "x")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
        assert!(client.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn unknown_model_is_rejected_before_any_call() {
        let client = FakeClient::replying(ProviderKind::HuggingFace, "unused");
        let (gateway, _) = gateway(client.clone());

        let err = gateway.dispatch(ChatRequest::new("unknown-model", "x")).await.unwrap_err();
        match err {
            DispatchError::UnknownModel(model) => assert_eq!(model, "unknown-model"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(client.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_wrapped_and_not_remembered() {
        let client = FakeClient::failing(ProviderKind::OpenRouter);
        let (gateway, store) = gateway(client);

        let req = ChatRequest::new("qwen-coder", "hello").with_conversation("c1", "u1");
        let resp = gateway.dispatch(req).await.unwrap();
        assert!(!resp.success);
        assert_eq!(resp.code, Some(ErrorCode::ProviderResponse));
        assert!(resp.error.unwrap().contains("upstream exploded"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn missing_provider_client_is_a_provider_error() {
        let client = FakeClient::replying(ProviderKind::Groq, "x");
        let (gateway, _) = gateway(client);

        let err = gateway.complete(&ChatRequest::new("deepseek", "hi")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Provider(ProviderError::Client(_))));
    }

    #[tokio::test]
    async fn explicit_history_bypasses_store_but_result_is_stored() {
        let client = FakeClient::replying(ProviderKind::Groq, "ok");
        let (gateway, store) = gateway(client.clone());
        let key = ConversationKey::new("c1", "u1");
        store.append(&key, Role::User, "stored".into());

        let req = ChatRequest::new("moon", "now")
            .with_conversation("c1", "u1")
            .with_history(vec![Message::assistant("explicit")]);
        gateway.complete(&req).await.unwrap();

        assert_eq!(
            client.calls.lock()[0].1,
            vec![Message::assistant("explicit"), Message::user("now")]
        );
        assert_eq!(store.read(&key, 10).len(), 3);
    }

    #[tokio::test]
    async fn stateless_call_touches_no_memory() {
        let client = FakeClient::replying(ProviderKind::HuggingFace, "ok");
        let (gateway, store) = gateway(client.clone());

        let mut req = ChatRequest::new("llama4", "hello").with_image("https://img");
        req.max_tokens = Some(12);
        gateway.complete(&req).await.unwrap();

        assert!(store.is_empty());
        let calls = client.calls.lock();
        assert_eq!(calls[0].2.max_tokens, Some(12));
        assert!(matches!(calls[0].1[0].content, Content::Multimodal(_)));
    }

    #[tokio::test]
    async fn clear_history_requires_both_ids() {
        let client = FakeClient::replying(ProviderKind::HuggingFace, "ok");
        let (gateway, store) = gateway(client);
        let key = ConversationKey::new("c1", "u1");
        store.append(&key, Role::User, "x".into());

        assert!(gateway.clear_history("c1", "").is_err());
        gateway.clear_history("c1", "u1").unwrap();
        gateway.clear_history("c1", "u1").unwrap();
        assert!(store.read(&key, 10).is_empty());
    }
}
