use crate::error::ErrorCode;
use chrono::{ SecondsFormat, Utc };
use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value };

pub const IMAGE_DETAIL: &str = "high";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    pub detail: String,
}

/// One element of a multimodal message, in the OpenAI-compatible wire shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Part {
    #[serde(rename = "text")] Text {
        text: String,
    },
    #[serde(rename = "image_url")] Image {
        image_url: ImageUrl,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Part::Image {
            image_url: ImageUrl {
                url: url.into(),
                detail: IMAGE_DETAIL.to_string(),
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Part::Text { .. } => "text",
            Part::Image { .. } => "image",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Multimodal(Vec<Part>),
}

impl Content {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Multimodal(_) => None,
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

/// Provider-neutral message, as sent upstream and as supplied in explicit history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
}

impl Message {
    pub fn new(role: Role, content: impl Into<Content>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<Content>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<Content>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<Content>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A stored conversation turn. `created_at` is Unix milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: Content,
    pub created_at: i64,
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        Message {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub model: String,
    #[serde(default, alias = "image_url", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, alias = "chat_id", skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(default, alias = "sender_id", skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Message>>,
    #[serde(default, alias = "max_tokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Extra upstream parameters passed through to the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_conversation(mut self, chat_id: impl Into<String>, sender_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self.sender_id = Some(sender_id.into());
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = Some(history);
        self
    }

    /// Image URL, if one was supplied and is not blank.
    pub fn image(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|url| !url.is_empty())
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub success: bool,
    pub model_used: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub timestamp: String,
}

impl ChatResponse {
    pub fn success(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            success: true,
            model_used: model.into(),
            text: text.into(),
            error: None,
            code: None,
            timestamp: now_rfc3339(),
        }
    }

    pub fn failure(model: impl Into<String>, code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            model_used: model.into(),
            text: String::new(),
            error: Some(format!("{}: {}", code, detail.into())),
            code: Some(code),
            timestamp: now_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearHistoryRequest {
    #[serde(default, alias = "chat_id")]
    pub chat_id: String,
    #[serde(default, alias = "sender_id")]
    pub sender_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClearHistoryResponse {
    pub success: bool,
    pub message: String,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
