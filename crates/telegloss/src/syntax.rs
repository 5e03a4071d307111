//! Marking syntaxes: the small DSL authors use to tag glossary terms in prose.
//!
//! Builtin syntaxes capture a single word (`\w+`). Custom syntaxes capture
//! `[\w\s]+?` so multi-word terms are only reachable through a custom pair.
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::errors::SyntaxError;

/// Longest accepted custom prefix or suffix, in characters
pub const MAX_AFFIX_LEN: usize = 10;
/// Name under which a custom prefix/suffix pair is selected
pub const CUSTOM_SYNTAX: &str = "custom";
pub const DEFAULT_SYNTAX: &str = "<?>";

/// A compiled marking pattern with exactly one capture group holding the bare term
#[derive(Debug, Clone)]
pub struct SyntaxPattern {
    name: String,
    matcher: Regex,
    display: String,
    example: String,
}

/// Serializable description of a syntax, for listing in the interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxInfo {
    pub name: String,
    pub display: String,
    pub example: String,
}

impl SyntaxPattern {
    fn builtin(name: &str, pattern: &str, display: &str) -> Self {
        Self {
            name: name.to_string(),
            matcher: Regex::new(pattern).unwrap(),
            display: display.to_string(),
            example: format!("The {} is fast", display.replace("term", "CPU")),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn example(&self) -> &str {
        &self.example
    }

    pub fn regex(&self) -> &Regex {
        &self.matcher
    }

    pub fn info(&self) -> SyntaxInfo {
        SyntaxInfo {
            name: self.name.clone(),
            display: self.display.clone(),
            example: self.example.clone(),
        }
    }
}

lazy_static! {
    static ref BUILTINS: Vec<SyntaxPattern> = vec![
        SyntaxPattern::builtin("<?>", r"(\w+)<\?>", "term<?>"),
        SyntaxPattern::builtin("[[]]", r"\[\[(\w+)\]\]", "[[term]]"),
        SyntaxPattern::builtin("{{}}", r"\{\{(\w+)\}\}", "{{term}}"),
        SyntaxPattern::builtin("<<>>", r"<<(\w+)>>", "<<term>>"),
    ];
}

/// Look up a builtin syntax by name
pub fn get_pattern(name: &str) -> Option<SyntaxPattern> {
    BUILTINS.iter().find(|p| p.name == name).cloned()
}

/// Builtin syntax names, in registry order
pub fn available() -> Vec<&'static str> {
    BUILTINS.iter().map(|p| p.name.as_str()).collect()
}

pub fn builtin_infos() -> Vec<SyntaxInfo> {
    BUILTINS.iter().map(SyntaxPattern::info).collect()
}

fn custom_regex(prefix: &str, suffix: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"{}([\w\s]+?){}",
        regex::escape(prefix),
        regex::escape(suffix)
    ))
}

/// Check a custom prefix/suffix pair before it is saved
pub fn validate_custom(prefix: &str, suffix: &str) -> Result<(), SyntaxError> {
    if prefix.is_empty() || suffix.is_empty() {
        return Err(SyntaxError::EmptyField);
    }
    if prefix.chars().count() > MAX_AFFIX_LEN || suffix.chars().count() > MAX_AFFIX_LEN {
        return Err(SyntaxError::TooLong { max: MAX_AFFIX_LEN });
    }
    custom_regex(prefix, suffix)
        .map(|_| ())
        .map_err(|e| SyntaxError::InvalidPattern(e.to_string()))
}

/// Build a custom syntax; the affixes are matched literally
pub fn build_custom(prefix: &str, suffix: &str) -> Result<SyntaxPattern, SyntaxError> {
    validate_custom(prefix, suffix)?;
    let matcher =
        custom_regex(prefix, suffix).map_err(|e| SyntaxError::InvalidPattern(e.to_string()))?;
    Ok(SyntaxPattern {
        name: CUSTOM_SYNTAX.to_string(),
        matcher,
        display: format!("{}term{}", prefix, suffix),
        example: format!("The {}CPU{} is fast", prefix, suffix),
    })
}

/// Resolve the active syntax from a name and an optional custom pair.
///
/// `custom` is honoured only when both affixes are present; any other unknown
/// name fails with `InvalidSyntax`.
pub fn resolve(name: &str, custom: Option<(&str, &str)>) -> Result<SyntaxPattern, SyntaxError> {
    if name == CUSTOM_SYNTAX {
        if let Some((prefix, suffix)) = custom.filter(|(p, s)| !p.is_empty() && !s.is_empty()) {
            return build_custom(prefix, suffix);
        }
    }
    get_pattern(name).ok_or_else(|| SyntaxError::InvalidSyntax(name.to_string()))
}
