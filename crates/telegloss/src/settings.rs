//! Per-user settings persisted in a URL query string.
//!
//! The store is opaque key/value text; [`UserSettings`] is the typed view the
//! rest of the crate works with.
use std::str::FromStr;

use crate::errors::SyntaxError;
use crate::marker::OutputFormat;
use crate::providers::factory::ProviderType;
use crate::syntax::{self, SyntaxPattern, DEFAULT_SYNTAX};

pub const KEY_CHAT_ID: &str = "cid";
pub const KEY_SYNTAX: &str = "syn";
pub const KEY_CUSTOM_PREFIX: &str = "cpre";
pub const KEY_CUSTOM_SUFFIX: &str = "csuf";
pub const KEY_FORMAT: &str = "fmt";
pub const KEY_PROVIDER: &str = "ai";

pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value; an empty value removes the key
    fn set(&mut self, key: &str, value: &str);

    /// Serialized form of the current contents
    fn flush(&self) -> String;
}

/// Settings kept in a query string, in first-seen key order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySettings {
    pairs: Vec<(String, String)>,
}

impl QuerySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string, with or without the leading `?`. Malformed input yields empty settings.
    pub fn parse(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_else(|e| {
            tracing::warn!("ignoring malformed settings query: {}", e);
            Vec::new()
        });

        let mut settings = Self::new();
        for (key, value) in pairs {
            settings.set(&key, &value);
        }
        settings
    }
}

impl SettingsStore for QuerySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn set(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.pairs.retain(|(k, _)| k != key);
            return;
        }
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.pairs.push((key.to_string(), value.to_string())),
        }
    }

    fn flush(&self) -> String {
        serde_urlencoded::to_string(&self.pairs).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSettings {
    pub chat_id: Option<String>,
    pub syntax: String,
    pub custom_prefix: String,
    pub custom_suffix: String,
    pub format: OutputFormat,
    pub provider: Option<ProviderType>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            chat_id: None,
            syntax: DEFAULT_SYNTAX.to_string(),
            custom_prefix: String::new(),
            custom_suffix: String::new(),
            format: OutputFormat::Telegram,
            provider: None,
        }
    }
}

impl UserSettings {
    /// Read typed settings; unknown format or provider values fall back to defaults
    pub fn load(store: &dyn SettingsStore) -> Self {
        let defaults = Self::default();
        Self {
            chat_id: store.get(KEY_CHAT_ID),
            syntax: store.get(KEY_SYNTAX).unwrap_or(defaults.syntax),
            custom_prefix: store.get(KEY_CUSTOM_PREFIX).unwrap_or_default(),
            custom_suffix: store.get(KEY_CUSTOM_SUFFIX).unwrap_or_default(),
            format: store
                .get(KEY_FORMAT)
                .and_then(|f| OutputFormat::from_str(&f).ok())
                .unwrap_or(defaults.format),
            provider: store
                .get(KEY_PROVIDER)
                .and_then(|p| ProviderType::from_str(&p).ok()),
        }
    }

    pub fn save(&self, store: &mut dyn SettingsStore) {
        store.set(KEY_CHAT_ID, self.chat_id.as_deref().unwrap_or_default());
        store.set(KEY_SYNTAX, &self.syntax);
        store.set(KEY_CUSTOM_PREFIX, &self.custom_prefix);
        store.set(KEY_CUSTOM_SUFFIX, &self.custom_suffix);
        store.set(KEY_FORMAT, &self.format.to_string());
        let provider = self.provider.map(|p| p.to_string()).unwrap_or_default();
        store.set(KEY_PROVIDER, &provider);
    }

    pub fn custom_pair(&self) -> Option<(&str, &str)> {
        Some((self.custom_prefix.as_str(), self.custom_suffix.as_str()))
    }

    /// Switch to a custom prefix/suffix pair after validating it
    pub fn set_custom_syntax(&mut self, prefix: &str, suffix: &str) -> Result<(), SyntaxError> {
        syntax::validate_custom(prefix, suffix)?;
        self.syntax = syntax::CUSTOM_SYNTAX.to_string();
        self.custom_prefix = prefix.to_string();
        self.custom_suffix = suffix.to_string();
        Ok(())
    }

    /// Switch to a builtin syntax, clearing any custom pair
    pub fn set_builtin_syntax(&mut self, name: &str) -> Result<(), SyntaxError> {
        let pattern = syntax::get_pattern(name)
            .ok_or_else(|| SyntaxError::InvalidSyntax(name.to_string()))?;
        self.syntax = pattern.name().to_string();
        self.custom_prefix.clear();
        self.custom_suffix.clear();
        Ok(())
    }

    pub fn pattern(&self) -> Result<SyntaxPattern, SyntaxError> {
        syntax::resolve(&self.syntax, self.custom_pair())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_settings_roundtrip() {
        let mut store = QuerySettings::parse("?cid=-100123&syn=%7B%7B%7D%7D");
        assert_eq!(store.get("cid").as_deref(), Some("-100123"));
        assert_eq!(store.get("syn").as_deref(), Some("{{}}"));

        store.set("fmt", "html");
        store.set("cid", "");
        assert_eq!(store.get("cid"), None);
        assert_eq!(store.flush(), "syn=%7B%7B%7D%7D&fmt=html");
        assert_eq!(QuerySettings::parse(&store.flush()), store);
    }

    #[test]
    fn test_user_settings_defaults() {
        let settings = UserSettings::load(&QuerySettings::new());
        assert_eq!(settings, UserSettings::default());
        assert_eq!(settings.format, OutputFormat::Telegram);
        assert_eq!(settings.pattern().unwrap().name(), "<?>");
    }

    #[test]
    fn test_user_settings_load_and_save() {
        let store = QuerySettings::parse("syn=custom&cpre=%7E%5B&csuf=%5D%7E&fmt=rtf&ai=gemini");
        let settings = UserSettings::load(&store);
        assert_eq!(settings.format, OutputFormat::Telegram);
        assert_eq!(settings.provider, Some(ProviderType::Gemini));
        assert_eq!(settings.pattern().unwrap().display(), "~[term]~");

        let mut saved = QuerySettings::new();
        settings.save(&mut saved);
        assert_eq!(saved.get("fmt").as_deref(), Some("telegram"));
        assert_eq!(saved.get("cid"), None);
        assert_eq!(UserSettings::load(&saved), settings);
    }

    #[test]
    fn test_syntax_switching() {
        let mut settings = UserSettings::default();
        assert_eq!(settings.set_custom_syntax("", "]"), Err(SyntaxError::EmptyField));
        settings.set_custom_syntax("@@", "@@").unwrap();
        assert_eq!(settings.syntax, "custom");

        settings.set_builtin_syntax("[[]]").unwrap();
        assert!(settings.custom_prefix.is_empty());
        assert!(settings.set_builtin_syntax("custom").is_err());
        assert_eq!(settings.pattern().unwrap().name(), "[[]]");
    }
}
