//! Client for the Telegraph publishing API, where every definition lives as a page.
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::content::{html_to_nodes, Node};

pub const DEFAULT_HOST: &str = "https://api.telegra.ph";
pub const DEFAULT_AUTHOR: &str = "Telegraph Glossary";

/// Public URL of a page path
pub fn page_url(path: &str) -> String {
    format!("https://telegra.ph/{}", path)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub path: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_edit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Node>>,
}

impl Page {
    /// The page URL as returned by the API, falling back to the path-derived one
    pub fn public_url(&self) -> String {
        if self.url.is_empty() {
            page_url(&self.path)
        } else {
            self.url.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageList {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Optional date filter for view counts; narrower fields need the wider ones set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewsDate {
    pub year: Option<i64>,
    pub month: Option<i64>,
    pub day: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PageViews {
    #[serde(default)]
    views: u64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error: Option<String>,
}

/// Storage for term and index pages
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageStore: Send + Sync {
    async fn create_page(&self, title: &str, html: &str, author_name: &str) -> Result<Page>;

    async fn edit_page(&self, path: &str, title: &str, html: &str, author_name: &str)
        -> Result<Page>;

    /// Fetch a page including its content nodes
    async fn get_page(&self, path: &str) -> Result<Page>;

    async fn get_page_list(&self, offset: u64, limit: u64) -> Result<PageList>;

    async fn get_account_info(&self) -> Result<Account>;

    async fn get_views(&self, path: &str, date: ViewsDate) -> Result<u64>;
}

pub struct TelegraphClient {
    client: Client,
    host: String,
    access_token: String,
}

impl TelegraphClient {
    pub fn new<S: Into<String>>(access_token: S) -> Result<Self> {
        Self::with_host(DEFAULT_HOST, access_token)
    }

    pub fn with_host<H: Into<String>, S: Into<String>>(host: H, access_token: S) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            host: host.into(),
            access_token: access_token.into(),
        })
    }

    /// Register a new account; the returned account carries its access token
    pub async fn create_account(host: &str, short_name: &str, author_name: &str) -> Result<Account> {
        let client = Self::with_host(host, "")?;
        let mut params = vec![("short_name", short_name.to_string())];
        if !author_name.is_empty() {
            params.push(("author_name", author_name.to_string()));
        }
        client.call("createAccount", params).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        mut params: Vec<(&str, String)>,
    ) -> Result<T> {
        let url = format!("{}/{}", self.host.trim_end_matches('/'), method);
        if !self.access_token.is_empty() {
            params.push(("access_token", self.access_token.clone()));
        }

        let response = self.client.post(&url).form(&params).send().await?;
        let body: ApiResponse<T> = match response.status() {
            StatusCode::OK => response.json().await?,
            status => return Err(anyhow!("Telegraph request {} failed: {}", method, status)),
        };

        if !body.ok {
            return Err(anyhow!(
                "Telegraph API error: {}",
                body.error.unwrap_or_else(|| "unknown error".to_string())
            ));
        }
        body.result
            .ok_or_else(|| anyhow!("Telegraph response for {} had no result", method))
    }

    fn page_params(title: &str, html: &str, author_name: &str) -> Result<Vec<(&'static str, String)>> {
        let nodes = serde_json::to_string(&html_to_nodes(html))?;
        Ok(vec![
            ("title", title.to_string()),
            ("content", nodes),
            ("author_name", author_name.to_string()),
            ("return_content", "false".to_string()),
        ])
    }
}

#[async_trait]
impl PageStore for TelegraphClient {
    async fn create_page(&self, title: &str, html: &str, author_name: &str) -> Result<Page> {
        let params = Self::page_params(title, html, author_name)?;
        let page: Page = self.call("createPage", params).await?;
        tracing::debug!(path = %page.path, "created telegraph page");
        Ok(page)
    }

    async fn edit_page(
        &self,
        path: &str,
        title: &str,
        html: &str,
        author_name: &str,
    ) -> Result<Page> {
        let params = Self::page_params(title, html, author_name)?;
        let page: Page = self.call(&format!("editPage/{}", path), params).await?;
        tracing::debug!(path = %page.path, "edited telegraph page");
        Ok(page)
    }

    async fn get_page(&self, path: &str) -> Result<Page> {
        self.call(
            &format!("getPage/{}", path),
            vec![("return_content", "true".to_string())],
        )
        .await
    }

    async fn get_page_list(&self, offset: u64, limit: u64) -> Result<PageList> {
        self.call(
            "getPageList",
            vec![("offset", offset.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn get_account_info(&self) -> Result<Account> {
        self.call(
            "getAccountInfo",
            vec![(
                "fields",
                r#"["short_name","author_name","author_url","page_count"]"#.to_string(),
            )],
        )
        .await
    }

    async fn get_views(&self, path: &str, date: ViewsDate) -> Result<u64> {
        let mut params = Vec::new();
        for (key, value) in [("year", date.year), ("month", date.month), ("day", date.day)] {
            if let Some(value) = value {
                params.push((key, value.to_string()));
            }
        }
        let views: PageViews = self.call(&format!("getViews/{}", path), params).await?;
        Ok(views.views)
    }
}
