use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use serde::Deserialize;
use std::net::SocketAddr;
use telegloss::providers::factory::ProviderType;
use telegloss::{telegram, telegraph};

#[derive(Debug, Default, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|_| ConfigError::InvalidAddress(addr))
    }
}

#[derive(Debug, Deserialize)]
pub struct TelegraphSettings {
    #[serde(default = "default_telegraph_host")]
    pub host: String,
    #[serde(default)]
    pub access_token: Option<String>,
    /// Path of the index page to load the glossary from at startup
    #[serde(default)]
    pub index_path: Option<String>,
    #[serde(default = "default_author")]
    pub author_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TelegramSettings {
    #[serde(default = "default_telegram_host")]
    pub host: String,
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Chat used when neither the request nor the user settings name one
    #[serde(default)]
    pub chat_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImgbbSettings {
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiSettings {
    #[serde(default = "default_provider")]
    pub provider: ProviderType,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            anthropic_api_key: None,
            openai_api_key: None,
            gemini_api_key: None,
        }
    }
}

impl AiSettings {
    pub fn api_key(&self, provider: ProviderType) -> Option<&str> {
        let key = match provider {
            ProviderType::Anthropic => &self.anthropic_api_key,
            ProviderType::OpenAi => &self.openai_api_key,
            ProviderType::Gemini => &self.gemini_api_key,
        };
        key.as_deref().filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub telegraph: TelegraphSettings,
    #[serde(default)]
    pub telegram: TelegramSettings,
    #[serde(default)]
    pub imgbb: ImgbbSettings,
    #[serde(default)]
    pub ai: AiSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("telegraph.host", default_telegraph_host())?
            .set_default("telegraph.author_name", default_author())?
            .add_source(
                Environment::with_prefix("TELEGLOSS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            match &err {
                config::ConfigError::NotFound(field) => ConfigError::MissingEnvVar {
                    env_var: to_env_var(field),
                },
                _ => ConfigError::Other(err),
            }
        })?;

        if settings
            .telegraph
            .access_token
            .as_deref()
            .map_or(true, str::is_empty)
        {
            return Err(ConfigError::MissingEnvVar {
                env_var: to_env_var("telegraph.access_token"),
            });
        }
        Ok(settings)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_telegraph_host() -> String {
    telegraph::DEFAULT_HOST.to_string()
}

fn default_author() -> String {
    telegraph::DEFAULT_AUTHOR.to_string()
}

fn default_telegram_host() -> String {
    telegram::DEFAULT_HOST.to_string()
}

fn default_provider() -> ProviderType {
    ProviderType::Anthropic
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("TELEGLOSS_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        env::set_var("TELEGLOSS_TELEGRAPH__ACCESS_TOKEN", "tg-token");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.telegraph.host, "https://api.telegra.ph");
        assert_eq!(settings.telegraph.access_token.as_deref(), Some("tg-token"));
        assert_eq!(settings.telegraph.author_name, "Telegraph Glossary");
        assert_eq!(settings.telegraph.index_path, None);
        assert_eq!(settings.telegram.bot_token, None);
        assert_eq!(settings.ai.provider, ProviderType::Anthropic);
        assert_eq!(settings.ai.api_key(ProviderType::Anthropic), None);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_access_token() {
        clean_env();

        match Settings::new() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "TELEGLOSS_TELEGRAPH__ACCESS_TOKEN");
            }
            other => panic!("Expected MissingEnvVar, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("TELEGLOSS_SERVER__PORT", "8080");
        env::set_var("TELEGLOSS_TELEGRAPH__ACCESS_TOKEN", "tg-token");
        env::set_var("TELEGLOSS_TELEGRAPH__INDEX_PATH", "Glossary-Index-01-01");
        env::set_var("TELEGLOSS_TELEGRAM__BOT_TOKEN", "123:abc");
        env::set_var("TELEGLOSS_AI__PROVIDER", "gemini");
        env::set_var("TELEGLOSS_AI__GEMINI_API_KEY", "g-key");
        env::set_var("TELEGLOSS_AI__MODEL", "gemini-1.5-pro");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(
            settings.telegraph.index_path.as_deref(),
            Some("Glossary-Index-01-01")
        );
        assert_eq!(settings.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(settings.ai.provider, ProviderType::Gemini);
        assert_eq!(settings.ai.api_key(ProviderType::Gemini), Some("g-key"));
        assert_eq!(settings.ai.model.as_deref(), Some("gemini-1.5-pro"));

        clean_env();
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");

        let bad = ServerSettings {
            host: "not a host".to_string(),
            port: 1,
        };
        assert!(bad.socket_addr().is_err());
    }
}
