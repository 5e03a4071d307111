//! Glossary service: the term map plus the Telegraph pages backing it.
//!
//! Each term owns one page holding its definition. A single index page lists
//! every term and embeds the whole map as JSON so the glossary can be restored
//! from Telegraph alone.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::content::{
    escape_html, extract_plain_text, markdown_to_html, nodes_to_text, truncate, Node,
};
use crate::errors::{GlossaryError, GlossaryResult};
use crate::models::glossary::{Glossary, GlossaryEntry};
use crate::telegraph::{Page, PageStore, DEFAULT_AUTHOR};

pub const INDEX_TITLE: &str = "Glossary Index";
const INDEX_VERSION: &str = "1.0";
/// Characters of the definition shown per line on the index page
const INDEX_PREVIEW_LEN: usize = 100;
/// Characters of the definition looked for when verifying an edit
const VERIFY_PREFIX_LEN: usize = 50;

/// JSON block embedded at the end of the index page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub version: String,
    pub updated: String,
    pub terms: Vec<GlossaryEntry>,
}

/// HTML stored on a term page: the term as heading followed by the definition
pub fn wrap_definition(term: &str, definition_html: &str) -> String {
    format!("<h3>{}</h3>\n{}", escape_html(term), definition_html)
}

/// Render the index page for `glossary`
pub fn render_index(glossary: &Glossary, updated: DateTime<Utc>) -> anyhow::Result<String> {
    let sorted = glossary.sorted();
    let mut parts = vec![
        format!("<h3>{}</h3>", INDEX_TITLE),
        format!("<p><i>{} terms</i></p>", glossary.len()),
    ];

    if sorted.is_empty() {
        parts.push("<p><i>No terms yet. Add your first term!</i></p>".to_string());
    }
    for entry in &sorted {
        parts.push(format!(
            "<p><b>{}</b>: <a href=\"{}\">{}</a></p>",
            escape_html(&entry.term),
            escape_html(&entry.telegraph_url),
            escape_html(&truncate(&entry.definition, INDEX_PREVIEW_LEN))
        ));
    }

    let metadata = IndexMetadata {
        version: INDEX_VERSION.to_string(),
        updated: updated.to_rfc3339(),
        terms: sorted.into_iter().cloned().collect(),
    };
    parts.push(format!(
        "<pre><code>{}</code></pre>",
        escape_html(&serde_json::to_string(&metadata)?)
    ));
    Ok(parts.join("\n"))
}

fn raw_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => raw_text(&element.children, out),
        }
    }
}

fn find_metadata(nodes: &[Node]) -> Option<IndexMetadata> {
    for node in nodes {
        let Node::Element(element) = node else {
            continue;
        };
        if element.tag == "pre" || element.tag == "code" {
            let mut text = String::new();
            raw_text(&element.children, &mut text);
            let text = text.trim();
            if text.starts_with('{') {
                if let Ok(metadata) = serde_json::from_str(text) {
                    return Some(metadata);
                }
            }
        }
        if let Some(metadata) = find_metadata(&element.children) {
            return Some(metadata);
        }
    }
    None
}

/// Recover the glossary from the nodes of an index page
pub fn parse_index(nodes: &[Node]) -> Option<Glossary> {
    find_metadata(nodes).map(|metadata| metadata.terms.into_iter().collect())
}

fn verification_text(definition: &str) -> String {
    definition
        .chars()
        .take(VERIFY_PREFIX_LEN)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct GlossaryService {
    store: Arc<dyn PageStore>,
    glossary: Glossary,
    index_path: Option<String>,
    author_name: String,
}

impl GlossaryService {
    pub fn new(store: Arc<dyn PageStore>) -> Self {
        Self {
            store,
            glossary: Glossary::new(),
            index_path: None,
            author_name: DEFAULT_AUTHOR.to_string(),
        }
    }

    pub fn with_author<S: Into<String>>(mut self, author_name: S) -> Self {
        self.author_name = author_name.into();
        self
    }

    pub fn glossary(&self) -> &Glossary {
        &self.glossary
    }

    pub fn index_path(&self) -> Option<&str> {
        self.index_path.as_deref()
    }

    pub fn store(&self) -> Arc<dyn PageStore> {
        Arc::clone(&self.store)
    }

    /// Replace the in-memory glossary with the one embedded in the index page
    pub async fn load(&mut self, index_path: &str) -> GlossaryResult<usize> {
        let page = self.store.get_page(index_path).await?;
        let glossary = page
            .content
            .as_deref()
            .and_then(parse_index)
            .unwrap_or_default();

        tracing::info!(index_path, terms = glossary.len(), "loaded glossary");
        self.glossary = glossary;
        self.index_path = Some(index_path.to_string());
        Ok(self.glossary.len())
    }

    /// Publish a new term. `definition` may be Markdown or HTML.
    pub async fn add_term(&mut self, term: &str, definition: &str) -> GlossaryResult<GlossaryEntry> {
        if self.glossary.contains(term) {
            return Err(GlossaryError::TermExists(term.to_string()));
        }

        let html = markdown_to_html(definition);
        let page = self
            .store
            .create_page(term, &wrap_definition(term, &html), &self.author_name)
            .await?;

        let entry = GlossaryEntry::new(
            term,
            extract_plain_text(&html),
            page.path.as_str(),
            page.public_url(),
        )
        .with_html(html);
        self.glossary.insert(entry.clone());
        tracing::info!(term, path = %page.path, "added term");

        self.sync_index().await;
        Ok(entry)
    }

    /// Rewrite a term's definition, optionally renaming it.
    ///
    /// The page is fetched back after editing and must contain the start of the
    /// new definition, otherwise the edit is reported as not applied.
    pub async fn update_term(
        &mut self,
        old_term: &str,
        new_term: &str,
        definition: &str,
    ) -> GlossaryResult<GlossaryEntry> {
        let existing = self
            .glossary
            .get(old_term)
            .cloned()
            .ok_or_else(|| GlossaryError::TermNotFound(old_term.to_string()))?;
        if new_term != old_term && self.glossary.contains(new_term) {
            return Err(GlossaryError::TermExists(new_term.to_string()));
        }

        let html = markdown_to_html(definition);
        let plain = extract_plain_text(&html);
        let page_html = wrap_definition(new_term, &html);

        let page = if existing.telegraph_path.is_empty() {
            self.store
                .create_page(new_term, &page_html, &self.author_name)
                .await?
        } else {
            let page = self
                .store
                .edit_page(&existing.telegraph_path, new_term, &page_html, &self.author_name)
                .await?;
            self.verify(&page, &plain).await?;
            page
        };

        let mut entry = GlossaryEntry::new(new_term, plain, page.path.as_str(), page.public_url())
            .with_html(html);
        entry.created_at = existing.created_at;

        if new_term != old_term {
            self.glossary.remove(old_term);
        }
        self.glossary.insert(entry.clone());
        tracing::info!(old_term, new_term, path = %page.path, "updated term");

        self.sync_index().await;
        Ok(entry)
    }

    async fn verify(&self, page: &Page, plain_definition: &str) -> GlossaryResult<()> {
        let expected = verification_text(plain_definition);
        if expected.is_empty() {
            return Ok(());
        }

        let fetched = match self.store.get_page(&page.path).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(path = %page.path, "could not fetch page for verification: {}", e);
                return Ok(());
            }
        };
        let text = nodes_to_text(fetched.content.as_deref().unwrap_or_default());
        if text.contains(&expected) || text.contains(&escape_html(&expected)) {
            Ok(())
        } else {
            Err(GlossaryError::VerificationMismatch {
                path: page.path.clone(),
            })
        }
    }

    /// Forget a term. Its page stays on Telegraph.
    pub async fn delete_term(&mut self, term: &str) -> GlossaryResult<GlossaryEntry> {
        let entry = self
            .glossary
            .remove(term)
            .ok_or_else(|| GlossaryError::TermNotFound(term.to_string()))?;
        tracing::info!(term, "deleted term");
        self.sync_index().await;
        Ok(entry)
    }

    /// Entries whose term or definition contains `query`, ignoring case, sorted by term
    pub fn search(&self, query: &str) -> Vec<&GlossaryEntry> {
        let query = query.to_lowercase();
        self.glossary
            .sorted()
            .into_iter()
            .filter(|entry| {
                query.is_empty()
                    || entry.term.to_lowercase().contains(&query)
                    || entry.definition.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Create or rewrite the index page from the current glossary
    pub async fn refresh_index(&mut self) -> anyhow::Result<Page> {
        let html = render_index(&self.glossary, Utc::now())?;
        let page = match &self.index_path {
            Some(path) => {
                self.store
                    .edit_page(path, INDEX_TITLE, &html, &self.author_name)
                    .await?
            }
            None => {
                self.store
                    .create_page(INDEX_TITLE, &html, &self.author_name)
                    .await?
            }
        };
        self.index_path = Some(page.path.clone());
        Ok(page)
    }

    async fn sync_index(&mut self) {
        if let Err(e) = self.refresh_index().await {
            tracing::warn!("failed to update glossary index: {}", e);
        }
    }
}
