use super::{
    anthropic::AnthropicProvider,
    base::Provider,
    configs::{
        AnthropicProviderConfig, GeminiProviderConfig, OpenAiProviderConfig, ProviderConfig,
        ANTHROPIC_DEFAULT_MODEL, GEMINI_DEFAULT_MODEL, OPENAI_DEFAULT_MODEL,
    },
    gemini::GeminiProvider,
    openai::OpenAiProvider,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

#[derive(
    EnumIter, Display, EnumString, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderType {
    #[strum(serialize = "claude")]
    #[serde(rename = "claude")]
    Anthropic,
    OpenAi,
    Gemini,
}

impl ProviderType {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => ANTHROPIC_DEFAULT_MODEL,
            ProviderType::OpenAi => OPENAI_DEFAULT_MODEL,
            ProviderType::Gemini => GEMINI_DEFAULT_MODEL,
        }
    }

    /// Configuration with the vendor defaults and an optional model override
    pub fn config<S: Into<String>>(&self, api_key: S, model: Option<&str>) -> ProviderConfig {
        let mut config = match self {
            ProviderType::Anthropic => {
                ProviderConfig::Anthropic(AnthropicProviderConfig::new(api_key))
            }
            ProviderType::OpenAi => ProviderConfig::OpenAi(OpenAiProviderConfig::new(api_key)),
            ProviderType::Gemini => ProviderConfig::Gemini(GeminiProviderConfig::new(api_key)),
        };
        if let Some(model) = model.filter(|m| !m.is_empty()) {
            match &mut config {
                ProviderConfig::Anthropic(c) => c.model = model.to_string(),
                ProviderConfig::OpenAi(c) => c.model = model.to_string(),
                ProviderConfig::Gemini(c) => c.model = model.to_string(),
            }
        }
        config
    }
}

pub fn get_provider(config: ProviderConfig) -> Result<Box<dyn Provider>> {
    match config {
        ProviderConfig::Anthropic(anthropic_config) => {
            Ok(Box::new(AnthropicProvider::new(anthropic_config)?))
        }
        ProviderConfig::OpenAi(openai_config) => Ok(Box::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Gemini(gemini_config) => Ok(Box::new(GeminiProvider::new(gemini_config)?)),
    }
}
