use crate::error::ConfigError;
use crate::llm::ProviderKind;
use lazy_static::lazy_static;
use log::info;
use serde::{ Deserialize, Serialize };
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

const CODING_ASSISTANT_PROMPT: &str =
    "You are Jinxie AI, a smart assistant skilled in coding, debugging and technical analysis. \
Give talkative, informative and clear answers, and include tips, explanations and examples when useful. \
Explain things in plain language, but always keep code in its original language.";

const EXPLAINER_PROMPT: &str =
    "You are Jinxie AI, a smart assistant skilled in giving information, analysis and technical explanations. \
Keep every explanation easy to understand. Focus on clear, concise and accurate answers, \
and include examples or tables when useful. Do not write program code.";

const PROGRAMMER_PROMPT: &str =
    "You are an AI programmer skilled in coding. Help with code, debugging and technical explanations. \
Explain things in plain language, but keep code in its original language.";

/// One routable model: which backend serves it and the defaults applied to it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub id: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub provider: ProviderKind,
    /// Upstream model name sent in the payload.
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl ModelSpec {
    pub fn new(id: &str, provider: ProviderKind, model: &str) -> Self {
        Self {
            id: id.to_string(),
            aliases: Vec::new(),
            provider,
            model: model.to_string(),
            max_tokens: None,
            temperature: None,
            top_p: None,
            stream: None,
            system_prompt: None,
        }
    }

    fn sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = Some(max_tokens);
        self.temperature = Some(temperature);
        self
    }

    fn persona(mut self, prompt: &str) -> Self {
        self.system_prompt = Some(prompt.to_string());
        self
    }
}

#[derive(Deserialize, Debug)]
struct ModelFile {
    models: Vec<ModelSpec>,
}

/// Model id (or alias) to model spec. Adding a model is adding a row.
#[derive(Debug, Clone)]
pub struct ModelTable {
    models: Vec<ModelSpec>,
    index: HashMap<String, usize>,
}

impl ModelTable {
    pub fn new(models: Vec<ModelSpec>) -> Result<Self, ConfigError> {
        let mut index = HashMap::new();
        for (pos, spec) in models.iter().enumerate() {
            if spec.id.is_empty() || spec.model.is_empty() {
                return Err(ConfigError::Invalid(format!("model '{}' needs an id and an upstream model", spec.id)));
            }
            if spec.stream == Some(true) {
                return Err(ConfigError::Invalid(format!("model '{}': streaming responses are not supported", spec.id)));
            }
            for name in std::iter::once(&spec.id).chain(spec.aliases.iter()) {
                if index.insert(name.clone(), pos).is_some() {
                    return Err(ConfigError::Invalid(format!("duplicate model id or alias '{}'", name)));
                }
            }
        }
        Ok(Self { models, index })
    }

    pub fn lookup(&self, name: &str) -> Option<&ModelSpec> {
        self.index.get(name).map(|&pos| &self.models[pos])
    }

    pub fn ids(&self) -> Vec<&str> {
        self.models
            .iter()
            .map(|m| m.id.as_str())
            .collect()
    }
}

lazy_static! {
    pub static ref DEFAULT_MODELS: Vec<ModelSpec> = {
        let mut deepseek = ModelSpec::new(
            "deepseek",
            ProviderKind::HuggingFace,
            "deepseek-ai/DeepSeek-V3.1:fireworks-ai"
        ).sampling(4000, 0.7);
        deepseek.stream = Some(false);

        let mut groq_llama = ModelSpec::new("groq-llama", ProviderKind::Groq, "llama-3.3-70b-versatile")
            .sampling(4000, 0.3)
            .persona(CODING_ASSISTANT_PROMPT);
        groq_llama.top_p = Some(0.9);

        let mut moon = ModelSpec::new("moon-ai", ProviderKind::Groq, "moonshotai/kimi-k2-instruct-0905")
            .sampling(4000, 0.3)
            .persona(EXPLAINER_PROMPT);
        moon.top_p = Some(0.9);
        moon.aliases = vec!["moon".to_string()];

        vec![
            deepseek,
            ModelSpec::new(
                "llama4",
                ProviderKind::HuggingFace,
                "meta-llama/Llama-4-Maverick-17B-128E-Instruct:groq"
            ).sampling(4000, 0.7),
            groq_llama,
            moon,
            ModelSpec::new("qwen-coder", ProviderKind::OpenRouter, "qwen/qwen3-coder")
                .sampling(2000, 0.3)
                .persona(PROGRAMMER_PROMPT),
            ModelSpec::new("sonoma-ai", ProviderKind::OpenRouter, "openrouter/sonoma-sky-alpha")
                .sampling(5000, 0.7)
        ]
    };
}

pub fn default_models() -> Result<Arc<ModelTable>, ConfigError> {
    Ok(Arc::new(ModelTable::new(DEFAULT_MODELS.clone())?))
}

pub fn load_models(path: &str) -> Result<Arc<ModelTable>, ConfigError> {
    let file_content = fs::read_to_string(path)?;
    let file: ModelFile = serde_json::from_str(&file_content)?;
    let table = ModelTable::new(file.models)?;
    info!("Loaded {} models from {}", table.models.len(), path);
    Ok(Arc::new(table))
}

pub fn initialize_models(path: Option<&str>) -> Result<Arc<ModelTable>, ConfigError> {
    match path.filter(|p| !p.is_empty()) {
        Some(path) => load_models(path),
        None => default_models(),
    }
}
