use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:8080")]
    pub server_addr: String,

    /// Comma separated API keys accepted as `Authorization: Bearer <key>`. With none configured every protected request is rejected.
    #[arg(long, env = "API_KEYS", value_delimiter = ',')]
    pub api_keys: Vec<String>,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    // --- Provider Credentials ---
    /// Access token for the HuggingFace inference router.
    #[arg(long, env = "HF_TOKEN", default_value = "", hide_env_values = true)]
    pub hf_token: String,

    /// API key for Groq.
    #[arg(long, env = "GROQ_API_KEY", default_value = "", hide_env_values = true)]
    pub groq_api_key: String,

    /// API key for OpenRouter.
    #[arg(long, env = "OPENROUTER_API_KEY", default_value = "", hide_env_values = true)]
    pub openrouter_api_key: String,

    // --- Provider Endpoints ---
    /// Full chat completions URL for HuggingFace. Defaults to the public router.
    #[arg(long, env = "HF_BASE_URL")]
    pub hf_base_url: Option<String>,

    /// Full chat completions URL for Groq. Defaults to the public API.
    #[arg(long, env = "GROQ_BASE_URL")]
    pub groq_base_url: Option<String>,

    /// Full chat completions URL for OpenRouter. Defaults to the public API.
    #[arg(long, env = "OPENROUTER_BASE_URL")]
    pub openrouter_base_url: Option<String>,

    /// Value sent as `HTTP-Referer` to OpenRouter.
    #[arg(long, env = "OPENROUTER_REFERER", default_value = "https://github.com/jinxie-bot")]
    pub openrouter_referer: String,

    /// Value sent as `X-Title` to OpenRouter.
    #[arg(long, env = "OPENROUTER_TITLE", default_value = "Jinxie WhatsApp Bot")]
    pub openrouter_title: String,

    // --- Provider Defaults ---
    /// System prompt for HuggingFace models that do not define their own.
    #[arg(long, env = "HF_SYSTEM_PROMPT")]
    pub hf_system_prompt: Option<String>,

    /// System prompt for Groq models that do not define their own.
    #[arg(long, env = "GROQ_SYSTEM_PROMPT")]
    pub groq_system_prompt: Option<String>,

    /// System prompt for OpenRouter models that do not define their own.
    #[arg(long, env = "OPENROUTER_SYSTEM_PROMPT")]
    pub openrouter_system_prompt: Option<String>,

    /// Timeout in seconds for every upstream provider call.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Path to a JSON model table replacing the built-in one.
    #[arg(long, env = "MODELS_PATH")]
    pub models_path: Option<String>,

    // --- History Store Args ---
    /// Maximum number of conversations kept in memory before the least recently written is evicted.
    #[arg(long, env = "HISTORY_MAX_CONVERSATIONS", default_value = "1000")]
    pub history_max_conversations: usize,

    /// Maximum number of turns stored per conversation.
    #[arg(long, env = "HISTORY_MAX_TURNS", default_value = "50")]
    pub history_max_turns: usize,

    /// Number of most recent turns sent to the provider as context.
    #[arg(long, env = "HISTORY_WINDOW", default_value = "10")]
    pub history_window: usize,
}
