//! Minimal Telegram Bot API client for posting processed text to a chat.
use regex::{Captures, RegexBuilder};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "https://api.telegram.org";

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Bot token is not configured")]
    MissingToken,

    #[error("Telegram API error [{}]: {description}{}", .code.map(|c| c.to_string()).unwrap_or_default(), .hint.unwrap_or(""))]
    Api {
        code: Option<i64>,
        description: String,
        hint: Option<&'static str>,
    },

    #[error("Telegram request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl TelegramError {
    fn api(code: Option<i64>, description: String) -> Self {
        let lowered = description.to_lowercase();
        let hint = if code == Some(404) || description.contains("Not Found") {
            Some(" (Check: Is bot added as admin to the channel?)")
        } else if code == Some(401) || description.contains("Unauthorized") {
            Some(" (Check: Is the bot token correct?)")
        } else if lowered.contains("chat not found") {
            Some(" (Check: Is the Chat ID correct? For private channels use -100XXXXXXXXXX)")
        } else {
            None
        };
        TelegramError::Api {
            code,
            description,
            hint,
        }
    }

    /// Troubleshooting hint without the surrounding punctuation
    pub fn hint(&self) -> Option<&str> {
        match self {
            TelegramError::Api { hint: Some(hint), .. } => {
                Some(hint.trim().trim_start_matches("(Check: ").trim_end_matches(')'))
            }
            TelegramError::MissingToken => Some("Set a bot token from @BotFather"),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Value,
    error_code: Option<i64>,
    description: Option<String>,
}

pub struct TelegramBot {
    client: Client,
    host: String,
    token: String,
}

impl TelegramBot {
    pub fn new<S: Into<String>>(token: S) -> Result<Self, TelegramError> {
        Self::with_host(DEFAULT_HOST, token)
    }

    pub fn with_host<H: Into<String>, S: Into<String>>(
        host: H,
        token: S,
    ) -> Result<Self, TelegramError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            host: host.into(),
            token: token.into().trim().to_string(),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, TelegramError> {
        if self.token.is_empty() {
            return Err(TelegramError::MissingToken);
        }
        let url = format!(
            "{}/bot{}/{}",
            self.host.trim_end_matches('/'),
            self.token,
            method
        );

        // Error bodies carry the useful description, so the status is not checked first.
        let body: ApiResponse = self.client.post(&url).json(&params).send().await?.json().await?;
        if body.ok {
            Ok(body.result)
        } else {
            let description = body
                .description
                .unwrap_or_else(|| "Unknown error".to_string());
            tracing::warn!(method, code = ?body.error_code, "telegram call failed: {}", description);
            Err(TelegramError::api(body.error_code, description))
        }
    }

    pub async fn get_me(&self) -> Result<Value, TelegramError> {
        self.call("getMe", json!({})).await
    }

    pub async fn get_chat(&self, chat_id: &str) -> Result<Value, TelegramError> {
        self.call("getChat", json!({"chat_id": chat_id.trim()})).await
    }

    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: &str,
    ) -> Result<Value, TelegramError> {
        self.call(
            "sendMessage",
            json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": parse_mode,
                "disable_web_page_preview": true,
            }),
        )
        .await
    }

    /// Send `text` as HTML with every occurrence of the linked terms turned into a link
    pub async fn send_formatted_text(
        &self,
        chat_id: &str,
        text: &str,
        links: &BTreeMap<String, String>,
    ) -> Result<Value, TelegramError> {
        self.send_message(chat_id, &format_with_links(text, links), "HTML")
            .await
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape `text` for Telegram HTML and wrap case-insensitive term occurrences in links.
///
/// All terms are matched in one pass, longest first, so a link is never nested
/// inside another or inside an `href`.
pub fn format_with_links(text: &str, links: &BTreeMap<String, String>) -> String {
    let escaped = escape(text);
    let mut terms: Vec<String> = links
        .keys()
        .filter(|term| !term.is_empty())
        .map(|term| escape(term))
        .collect();
    if terms.is_empty() {
        return escaped;
    }
    terms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

    let urls: HashMap<String, &String> = links
        .iter()
        .map(|(term, url)| (escape(term).to_lowercase(), url))
        .collect();
    let alternation = terms
        .iter()
        .map(|term| regex::escape(term))
        .collect::<Vec<_>>()
        .join("|");
    let Ok(matcher) = RegexBuilder::new(&alternation).case_insensitive(true).build() else {
        return escaped;
    };

    matcher
        .replace_all(&escaped, |caps: &Captures| {
            let found = &caps[0];
            match urls.get(&found.to_lowercase()) {
                Some(url) => format!("<a href=\"{}\">{}</a>", url, found),
                None => found.to_string(),
            }
        })
        .into_owned()
}
