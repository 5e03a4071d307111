use std::sync::Arc;
use telegloss::agent::Agent;
use telegloss::glossary::GlossaryService;
use telegloss::imgbb::ImgbbClient;
use telegloss::providers::factory::{get_provider, ProviderType};
use telegloss::telegram::TelegramBot;
use telegloss::telegraph::{TelegraphClient, DEFAULT_HOST};
use telegloss::tools::GlossaryTools;
use tokio::sync::Mutex;

use crate::configuration::{AiSettings, Settings};
use crate::error::ApiError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub glossary: Arc<Mutex<GlossaryService>>,
    pub telegram: Option<Arc<TelegramBot>>,
    pub default_chat_id: Option<String>,
    pub imgbb: Arc<ImgbbClient>,
    pub ai: Arc<AiSettings>,
    /// Telegraph API host used when registering new accounts
    pub telegraph_host: String,
}

impl AppState {
    pub fn new(service: GlossaryService, imgbb: ImgbbClient) -> Self {
        Self {
            glossary: Arc::new(Mutex::new(service)),
            telegram: None,
            default_chat_id: None,
            imgbb: Arc::new(imgbb),
            ai: Arc::new(AiSettings::default()),
            telegraph_host: DEFAULT_HOST.to_string(),
        }
    }

    pub fn with_telegram(mut self, bot: TelegramBot, default_chat_id: Option<String>) -> Self {
        self.telegram = Some(Arc::new(bot));
        self.default_chat_id = default_chat_id;
        self
    }

    pub fn with_telegraph_host<H: Into<String>>(mut self, host: H) -> Self {
        self.telegraph_host = host.into();
        self
    }

    pub fn with_ai(mut self, ai: AiSettings) -> Self {
        self.ai = Arc::new(ai);
        self
    }

    /// Build the clients from settings and load the glossary from its index page, if one is set
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let telegraph = &settings.telegraph;
        let client = TelegraphClient::with_host(
            telegraph.host.as_str(),
            telegraph.access_token.clone().unwrap_or_default(),
        )?;
        let mut service =
            GlossaryService::new(Arc::new(client)).with_author(telegraph.author_name.as_str());

        if let Some(index_path) = telegraph.index_path.as_deref().filter(|p| !p.is_empty()) {
            if let Err(e) = service.load(index_path).await {
                tracing::warn!(index_path, "starting with an empty glossary: {}", e);
            }
        }

        let imgbb = ImgbbClient::new(settings.imgbb.api_key.clone().unwrap_or_default())?;
        let mut state = Self::new(service, imgbb)
            .with_ai(settings.ai.clone())
            .with_telegraph_host(telegraph.host.as_str());

        if let Some(token) = settings.telegram.bot_token.as_deref().filter(|t| !t.is_empty()) {
            let bot = TelegramBot::with_host(settings.telegram.host.as_str(), token)?;
            state = state.with_telegram(bot, settings.telegram.chat_id.clone());
        }
        Ok(state)
    }

    /// An agent for `provider`, with the glossary page tools attached
    pub async fn agent(&self, provider: ProviderType) -> Result<Agent, ApiError> {
        let api_key = self
            .ai
            .api_key(provider)
            .ok_or(ApiError::NotConfigured("AI provider"))?;
        // the configured model only applies to the configured provider
        let model = self.ai.model.as_deref().filter(|_| provider == self.ai.provider);
        let provider = get_provider(provider.config(api_key, model))?;

        let store = self.glossary.lock().await.store();
        Ok(Agent::new(
            Arc::from(provider),
            Arc::new(GlossaryTools::new(store)),
        ))
    }
}
