pub mod chat;

use crate::cli::Args;
use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value };
use std::fmt;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Backend families. Each one has its own wire schema and adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    HuggingFace,
    Groq,
    OpenRouter,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::HuggingFace,
        ProviderKind::Groq,
        ProviderKind::OpenRouter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::HuggingFace => "huggingface",
            ProviderKind::Groq => "groq",
            ProviderKind::OpenRouter => "openrouter",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::HuggingFace => "https://router.huggingface.co/v1/chat/completions",
            ProviderKind::Groq => "https://api.groq.com/openai/v1/chat/completions",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1/chat/completions",
        }
    }

    fn default_max_tokens(&self) -> u32 {
        match self {
            ProviderKind::HuggingFace | ProviderKind::Groq => 4000,
            ProviderKind::OpenRouter => 2000,
        }
    }

    fn default_temperature(&self) -> f32 {
        match self {
            ProviderKind::HuggingFace => 0.7,
            ProviderKind::Groq | ProviderKind::OpenRouter => 0.3,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-provider endpoint, credentials and defaults. Built once at startup.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub endpoint_url: String,
    pub auth_token: String,
    pub default_system_prompt: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub extra_params: Map<String, Value>,
    pub extra_headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind, auth_token: impl Into<String>) -> Self {
        Self {
            kind,
            endpoint_url: kind.default_endpoint().to_string(),
            auth_token: auth_token.into(),
            default_system_prompt: None,
            max_tokens: kind.default_max_tokens(),
            temperature: kind.default_temperature(),
            extra_params: Map::new(),
            extra_headers: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_endpoint(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = endpoint_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_args(kind: ProviderKind, args: &Args) -> Self {
        let (token, base_url, system_prompt) = match kind {
            ProviderKind::HuggingFace => (&args.hf_token, &args.hf_base_url, &args.hf_system_prompt),
            ProviderKind::Groq => (&args.groq_api_key, &args.groq_base_url, &args.groq_system_prompt),
            ProviderKind::OpenRouter =>
                (&args.openrouter_api_key, &args.openrouter_base_url, &args.openrouter_system_prompt),
        };

        let mut config = Self::new(kind, token.clone()).with_timeout(
            Duration::from_secs(args.request_timeout_secs)
        );
        if let Some(url) = base_url.as_ref().filter(|u| !u.is_empty()) {
            config.endpoint_url = url.clone();
        }
        config.default_system_prompt = system_prompt.clone().filter(|p| !p.trim().is_empty());

        if kind == ProviderKind::OpenRouter {
            config.extra_headers = vec![
                ("HTTP-Referer".to_string(), args.openrouter_referer.clone()),
                ("X-Title".to_string(), args.openrouter_title.clone())
            ];
        }
        config
    }
}
