//! Marketplace HTTP API catalog
//!
//! `GET {base}/components` answers searches, `GET {base}/components/{id}`
//! answers lookups. The backend owns filtering and pagination; responses
//! are taken as-is.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

use super::{CatalogProvider, Component, SearchQuery};
use crate::config::Settings;

/// Search response envelope
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    components: Vec<Component>,
}

/// Catalog provider backed by the marketplace API
#[derive(Debug, Clone)]
pub struct RemoteCatalog {
    client: reqwest::Client,
    base_url: Url,
}

impl RemoteCatalog {
    /// Build a client from settings (base URL, API key, timeout)
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        if let Some(key) = &settings.api_key {
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {key}"))
                .context("API key contains characters not allowed in a header")?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("wmx/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(settings.api_timeout))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(&settings.api_base_url)
            .with_context(|| format!("Invalid API base URL: {}", settings.api_base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot hold paths: {}", settings.api_base_url);
        }

        Ok(Self { client, base_url })
    }

    /// `{base}/<segments...>`, each segment percent-encoded as one path component
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn query_params(query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("limit", query.effective_limit().to_string()),
            ("offset", query.offset.to_string()),
        ];
        if let Some(q) = &query.query {
            params.push(("query", q.clone()));
        }
        if let Some(category) = &query.category {
            params.push(("category", category.clone()));
        }
        for tag in &query.tags {
            params.push(("tags", tag.clone()));
        }
        if let Some(author) = &query.author {
            params.push(("author", author.clone()));
        }
        if let Some(min_rating) = query.min_rating {
            params.push(("min_rating", min_rating.to_string()));
        }
        params
    }
}

#[async_trait]
impl CatalogProvider for RemoteCatalog {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Component>> {
        let url = self.endpoint(&["components"]);

        let response = self
            .client
            .get(url.clone())
            .query(&Self::query_params(query))
            .send()
            .await
            .with_context(|| format!("Failed to search components at {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("Component search failed: HTTP {} from {}", response.status(), url);
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse component search response")?;

        tracing::debug!("Remote catalog returned {} components", body.components.len());
        Ok(body.components)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Component>> {
        // `.` and `..` would be dropped as segments and hit another endpoint
        if id.is_empty() || id == "." || id == ".." {
            return Ok(None);
        }
        let url = self.endpoint(&["components", id]);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch component {id}"))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            anyhow::bail!("Component lookup failed: HTTP {} from {}", response.status(), url);
        }

        let component = response
            .json()
            .await
            .with_context(|| format!("Failed to parse component {id}"))?;

        Ok(Some(component))
    }
}
