use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use telegloss::content::html_to_nodes;
use telegloss::glossary::GlossaryService;
use telegloss::imgbb::ImgbbClient;
use telegloss::telegraph::{page_url, Account, Page, PageList, PageStore, ViewsDate};
use tower::ServiceExt;

use crate::state::AppState;

/// Telegraph stand-in that keeps pages in memory
#[derive(Default)]
pub struct MemoryStore {
    pub(crate) pages: Mutex<Vec<Page>>,
    /// When set, edits are accepted but not applied
    pub drop_edits: bool,
}

impl MemoryStore {
    pub fn page(&self, path: &str) -> Option<Page> {
        self.pages.lock().unwrap().iter().find(|p| p.path == path).cloned()
    }

    fn build(path: String, title: &str, html: &str, author_name: &str) -> Page {
        Page {
            url: page_url(&path),
            path,
            title: title.to_string(),
            author_name: Some(author_name.to_string()),
            content: Some(html_to_nodes(html)),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PageStore for MemoryStore {
    async fn create_page(&self, title: &str, html: &str, author_name: &str) -> Result<Page> {
        let mut pages = self.pages.lock().unwrap();
        let path = format!("{}-{:02}", title.replace(' ', "-"), pages.len() + 1);
        let page = Self::build(path, title, html, author_name);
        pages.push(page.clone());
        Ok(page)
    }

    async fn edit_page(&self, path: &str, title: &str, html: &str, author_name: &str) -> Result<Page> {
        let mut pages = self.pages.lock().unwrap();
        let existing = pages
            .iter_mut()
            .find(|p| p.path == path)
            .ok_or_else(|| anyhow!("PAGE_NOT_FOUND"))?;
        if !self.drop_edits {
            *existing = Self::build(path.to_string(), title, html, author_name);
        }
        Ok(existing.clone())
    }

    async fn get_page(&self, path: &str) -> Result<Page> {
        self.page(path).ok_or_else(|| anyhow!("PAGE_NOT_FOUND"))
    }

    async fn get_page_list(&self, offset: u64, limit: u64) -> Result<PageList> {
        let pages = self.pages.lock().unwrap();
        Ok(PageList {
            total_count: pages.len() as u64,
            pages: pages
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect(),
        })
    }

    async fn get_account_info(&self) -> Result<Account> {
        Ok(Account {
            short_name: Some("glossary".to_string()),
            page_count: Some(self.pages.lock().unwrap().len() as u64),
            ..Default::default()
        })
    }

    async fn get_views(&self, _path: &str, _date: ViewsDate) -> Result<u64> {
        Ok(0)
    }
}

pub fn state_with(store: Arc<MemoryStore>) -> AppState {
    let imgbb = ImgbbClient::new("").unwrap();
    AppState::new(GlossaryService::new(store), imgbb)
}

/// Send a request through the router and decode the JSON body
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
