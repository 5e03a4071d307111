// Unified enum to wrap different provider configurations
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderConfig {
    Anthropic(AnthropicProviderConfig),
    OpenAi(OpenAiProviderConfig),
    Gemini(GeminiProviderConfig),
}

pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const GEMINI_HOST: &str = "https://generativelanguage.googleapis.com";

pub const ANTHROPIC_DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

#[derive(Debug, Clone, PartialEq)]
pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: i32,
    pub temperature: Option<f32>,
}

impl AnthropicProviderConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: ANTHROPIC_HOST.to_string(),
            api_key: api_key.into(),
            model: ANTHROPIC_DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl OpenAiProviderConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: OPENAI_HOST.to_string(),
            api_key: api_key.into(),
            model: OPENAI_DEFAULT_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeminiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
}

impl GeminiProviderConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: GEMINI_HOST.to_string(),
            api_key: api_key.into(),
            model: GEMINI_DEFAULT_MODEL.to_string(),
            temperature: Some(0.7),
        }
    }
}
