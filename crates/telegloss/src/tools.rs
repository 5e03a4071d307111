use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::content::{markdown_to_html, nodes_to_html};
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};
use crate::systems::System;
use crate::telegraph::{page_url, PageStore, ViewsDate, DEFAULT_AUTHOR};

const DEFAULT_PAGE_LIMIT: i64 = 50;

/// Telegraph page tools offered to the model while it edits the glossary
pub struct GlossaryTools {
    store: Arc<dyn PageStore>,
    tools: Vec<Tool>,
}

impl GlossaryTools {
    pub fn new(store: Arc<dyn PageStore>) -> Self {
        let create_page = Tool::new(
            "create_page",
            "Create a new Telegraph page with the given title and content. Content can be in Markdown or HTML format.",
            json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "The title of the page"
                    },
                    "content": {
                        "type": "string",
                        "description": "The content of the page (Markdown or HTML)"
                    },
                    "author_name": {
                        "type": "string",
                        "description": "Author name to display on the page"
                    }
                },
                "required": ["title", "content"]
            }),
        );

        let edit_page = Tool::new(
            "edit_page",
            "Edit an existing Telegraph page. Requires the page path.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The path of the page to edit (e.g., 'My-Page-01-01')"
                    },
                    "title": {
                        "type": "string",
                        "description": "New title for the page"
                    },
                    "content": {
                        "type": "string",
                        "description": "New content for the page (Markdown or HTML)"
                    },
                    "author_name": {
                        "type": "string",
                        "description": "Author name to display on the page"
                    }
                },
                "required": ["path", "title", "content"]
            }),
        );

        let get_page = Tool::new(
            "get_page",
            "Get the content of an existing Telegraph page.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The path of the page to retrieve"
                    }
                },
                "required": ["path"]
            }),
        );

        let get_page_list = Tool::new(
            "get_page_list",
            "Get a list of pages in the current Telegraph account.",
            json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of pages to return (default: 50)"
                    },
                    "offset": {
                        "type": "integer",
                        "description": "Number of pages to skip (for pagination)"
                    }
                }
            }),
        );

        let get_account_info = Tool::new(
            "get_account_info",
            "Get information about the current Telegraph account.",
            json!({
                "type": "object",
                "properties": {}
            }),
        );

        let get_views = Tool::new(
            "get_views",
            "Get the number of views for a Telegraph page.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The path of the page"
                    },
                    "year": {
                        "type": "integer",
                        "description": "Year for view statistics (optional)"
                    },
                    "month": {
                        "type": "integer",
                        "description": "Month for view statistics (optional)"
                    },
                    "day": {
                        "type": "integer",
                        "description": "Day for view statistics (optional)"
                    }
                },
                "required": ["path"]
            }),
        );

        Self {
            store,
            tools: vec![
                create_page,
                edit_page,
                get_page,
                get_page_list,
                get_account_info,
                get_views,
            ],
        }
    }

    fn required<'a>(call: &'a ToolCall, key: &str) -> AgentResult<&'a str> {
        call.str_arg(key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                AgentError::InvalidParameters(format!("{} is required for {}", key, call.name))
            })
    }

    fn author(call: &ToolCall) -> &str {
        call.str_arg("author_name")
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_AUTHOR)
    }

    async fn create_page(&self, call: &ToolCall) -> AgentResult<Value> {
        let title = Self::required(call, "title")?;
        let content = Self::required(call, "content")?;

        let page = self
            .store
            .create_page(title, &markdown_to_html(content), Self::author(call))
            .await
            .map_err(|e| AgentError::ExecutionError(e.to_string()))?;

        Ok(json!({
            "success": true,
            "path": page.path,
            "url": page_url(&page.path),
            "title": page.title,
        }))
    }

    async fn edit_page(&self, call: &ToolCall) -> AgentResult<Value> {
        let path = Self::required(call, "path")?;
        let title = Self::required(call, "title")?;
        let content = Self::required(call, "content")?;

        let page = self
            .store
            .edit_page(path, title, &markdown_to_html(content), Self::author(call))
            .await
            .map_err(|e| AgentError::ExecutionError(e.to_string()))?;

        Ok(json!({
            "success": true,
            "path": page.path,
            "url": page_url(&page.path),
            "title": page.title,
        }))
    }

    async fn get_page(&self, call: &ToolCall) -> AgentResult<Value> {
        let path = Self::required(call, "path")?;

        let page = self
            .store
            .get_page(path)
            .await
            .map_err(|e| AgentError::ExecutionError(format!("Page not found: {}", e)))?;

        Ok(json!({
            "success": true,
            "path": page.path,
            "url": page_url(&page.path),
            "title": page.title,
            "description": page.description,
            "author_name": page.author_name,
            "views": page.views,
            "content": nodes_to_html(page.content.as_deref().unwrap_or_default()),
        }))
    }

    async fn get_page_list(&self, call: &ToolCall) -> AgentResult<Value> {
        let limit = call.int_arg("limit").unwrap_or(DEFAULT_PAGE_LIMIT).max(0) as u64;
        let offset = call.int_arg("offset").unwrap_or(0).max(0) as u64;

        let list = self
            .store
            .get_page_list(offset, limit)
            .await
            .map_err(|e| AgentError::ExecutionError(e.to_string()))?;

        let pages: Vec<Value> = list
            .pages
            .iter()
            .map(|page| {
                json!({
                    "path": page.path,
                    "url": page_url(&page.path),
                    "title": page.title,
                    "description": page.description,
                    "views": page.views,
                    "can_edit": page.can_edit.unwrap_or(true),
                })
            })
            .collect();

        Ok(json!({
            "success": true,
            "total_count": list.total_count,
            "pages": pages,
        }))
    }

    async fn get_account_info(&self) -> AgentResult<Value> {
        let account = self
            .store
            .get_account_info()
            .await
            .map_err(|e| AgentError::ExecutionError(e.to_string()))?;

        Ok(json!({
            "success": true,
            "short_name": account.short_name,
            "author_name": account.author_name,
            "author_url": account.author_url,
            "page_count": account.page_count,
        }))
    }

    async fn get_views(&self, call: &ToolCall) -> AgentResult<Value> {
        let path = Self::required(call, "path")?;
        let date = ViewsDate {
            year: call.int_arg("year"),
            month: call.int_arg("month"),
            day: call.int_arg("day"),
        };

        let views = self
            .store
            .get_views(path, date)
            .await
            .map_err(|e| AgentError::ExecutionError(e.to_string()))?;

        Ok(json!({
            "success": true,
            "path": path,
            "views": views,
        }))
    }
}

#[async_trait]
impl System for GlossaryTools {
    fn name(&self) -> &str {
        "GlossaryTools"
    }

    fn description(&self) -> &str {
        "Create, edit and inspect the Telegraph pages backing the glossary"
    }

    fn instructions(&self) -> &str {
        "Use create_page for new terms and edit_page with the existing path to change a term. \
        Look pages up with get_page_list before editing when the path is unknown."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: &ToolCall) -> AgentResult<String> {
        tracing::debug!(tool = %tool_call.name, id = %tool_call.id, "calling tool");
        let result = match tool_call.name.as_str() {
            "create_page" => self.create_page(tool_call).await,
            "edit_page" => self.edit_page(tool_call).await,
            "get_page" => self.get_page(tool_call).await,
            "get_page_list" => self.get_page_list(tool_call).await,
            "get_account_info" => self.get_account_info().await,
            "get_views" => self.get_views(tool_call).await,
            _ => Err(AgentError::ToolNotFound(tool_call.name.clone())),
        }?;
        Ok(result.to_string())
    }
}
