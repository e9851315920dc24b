//! Catalog provider abstraction and search filtering

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Component;

/// Largest page a provider will return
pub const MAX_PAGE_SIZE: usize = 100;

/// Default page size when none is requested
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// A source of catalog components
///
/// Implementations answer each call independently and hold no state that
/// depends on earlier calls.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Return the page of components matching `query`
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Component>>;

    /// Look up a single component by its catalog id
    async fn get_by_id(&self, id: &str) -> Result<Option<Component>>;
}

/// Search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Matched against name, description and tags
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// A component matches when it carries any of these tags
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub min_rating: Option<f64>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: None,
            category: None,
            tags: Vec::new(),
            author: None,
            min_rating: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl SearchQuery {
    /// Page size clamped to `1..=MAX_PAGE_SIZE`
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    /// Whether a component passes every filter (pagination excluded)
    pub fn matches(&self, component: &Component) -> bool {
        if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
            let query_lower = query.to_lowercase();
            let matches_name = component.name.to_lowercase().contains(&query_lower);
            let matches_desc = component.description.to_lowercase().contains(&query_lower);
            let matches_tag = component
                .tags
                .iter()
                .any(|t| t.to_lowercase().contains(&query_lower));

            if !(matches_name || matches_desc || matches_tag) {
                return false;
            }
        }

        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if !component.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }

        if !self.tags.is_empty() {
            let any_tag = self.tags.iter().any(|wanted| {
                component
                    .tags
                    .iter()
                    .any(|tag| tag.to_lowercase() == wanted.to_lowercase())
            });
            if !any_tag {
                return false;
            }
        }

        if let Some(author) = self.author.as_deref().filter(|a| !a.is_empty()) {
            if !component
                .author
                .name
                .to_lowercase()
                .contains(&author.to_lowercase())
            {
                return false;
            }
        }

        if let Some(min_rating) = self.min_rating {
            if component.rating < min_rating {
                return false;
            }
        }

        true
    }

    /// Filter then paginate, preserving catalog order
    pub fn apply<'a, I>(&self, components: I) -> Vec<Component>
    where
        I: IntoIterator<Item = &'a Component>,
    {
        components
            .into_iter()
            .filter(|c| self.matches(c))
            .skip(self.offset)
            .take(self.effective_limit())
            .cloned()
            .collect()
    }
}
