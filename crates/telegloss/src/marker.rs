//! Replaces marked terms in free text with links to their glossary pages.
use regex::Captures;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strum_macros::{Display, EnumIter, EnumString};

use crate::errors::SyntaxError;
use crate::models::glossary::Glossary;
use crate::syntax::{self, SyntaxPattern};

/// How a processed term is rendered
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Html,
    /// Plain text; links travel separately in [`ProcessedText::links`]
    Telegram,
}

impl OutputFormat {
    fn found(&self, raw: &str, url: &str) -> String {
        match self {
            OutputFormat::Markdown => format!("[{}]({})", raw, url),
            OutputFormat::Html => format!("<a href=\"{}\">{}</a>", url, raw),
            OutputFormat::Telegram => raw.to_string(),
        }
    }

    fn missing(&self, raw: &str) -> String {
        match self {
            OutputFormat::Markdown => format!("**{}**", raw),
            OutputFormat::Html => format!("<span style=\"color:red\">{}</span>", raw),
            OutputFormat::Telegram => format!("[{}?]", raw),
        }
    }
}

/// Result of a substitution pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessedText {
    pub text: String,
    /// Canonical glossary terms that were linked
    pub found_terms: BTreeSet<String>,
    /// Raw captured terms with no glossary entry
    pub missing_terms: BTreeSet<String>,
}

impl ProcessedText {
    /// Term to URL sidecar for the found terms, used by the telegram format
    pub fn links(&self, glossary: &Glossary) -> BTreeMap<String, String> {
        self.found_terms
            .iter()
            .filter_map(|term| {
                let entry = glossary.get(term)?;
                if entry.telegraph_url.is_empty() {
                    None
                } else {
                    Some((term.clone(), entry.telegraph_url.clone()))
                }
            })
            .collect()
    }
}

/// Substitute every match of `pattern` in `text`.
///
/// Matching is global and left to right. The display text is always what the
/// author typed; found terms are recorded under the glossary's own casing.
pub fn process(
    text: &str,
    pattern: &SyntaxPattern,
    glossary: &Glossary,
    format: OutputFormat,
) -> ProcessedText {
    let mut found_terms = BTreeSet::new();
    let mut missing_terms = BTreeSet::new();

    let replaced = pattern.regex().replace_all(text, |caps: &Captures| {
        let raw = &caps[1];
        match glossary.lookup(raw) {
            Some(entry) => {
                found_terms.insert(entry.term.clone());
                format.found(raw, &entry.telegraph_url)
            }
            None => {
                missing_terms.insert(raw.to_string());
                format.missing(raw)
            }
        }
    });

    ProcessedText {
        text: replaced.into_owned(),
        found_terms,
        missing_terms,
    }
}

/// Resolve the syntax, then process. Fails before scanning when the syntax is unknown.
pub fn process_with_syntax(
    text: &str,
    syntax_name: &str,
    custom: Option<(&str, &str)>,
    glossary: &Glossary,
    format: OutputFormat,
) -> Result<ProcessedText, SyntaxError> {
    let pattern = syntax::resolve(syntax_name, custom)?;
    Ok(process(text, &pattern, glossary, format))
}

/// The distinct raw terms marked in `text`
pub fn extract_terms(text: &str, pattern: &SyntaxPattern) -> BTreeSet<String> {
    pattern
        .regex()
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}
