//! Fixture-backed catalog
//!
//! Serves a static catalog document. The bundled document is used when no
//! marketplace backend is configured; tests build their own from YAML.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CatalogProvider, Component, SearchQuery};

/// Catalog shipped with the crate
const BUNDLED_CATALOG: &str = include_str!("fixtures/components.yaml");

/// A catalog document (components.yaml)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    /// API version
    pub api_version: String,

    /// Kind (ComponentCatalog)
    pub kind: String,

    /// Components in catalog order
    #[serde(default)]
    pub components: Vec<Component>,
}

/// Catalog provider over an in-memory document
#[derive(Debug, Clone)]
pub struct FixtureCatalog {
    components: Vec<Component>,
}

impl FixtureCatalog {
    /// Catalog with the bundled sample components
    pub fn bundled() -> Result<Self> {
        Self::from_yaml(BUNDLED_CATALOG).context("Bundled catalog is malformed")
    }

    /// Parse a catalog document from YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        let document: CatalogDocument =
            serde_yaml_ng::from_str(content).context("Failed to parse catalog YAML")?;
        Ok(Self::new(document.components))
    }

    pub fn new(components: Vec<Component>) -> Self {
        Self { components }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[async_trait]
impl CatalogProvider for FixtureCatalog {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Component>> {
        Ok(query.apply(&self.components))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Component>> {
        Ok(self.components.iter().find(|c| c.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_parses() {
        let catalog = FixtureCatalog::bundled().unwrap();
        assert_eq!(catalog.len(), 4);
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let catalog = FixtureCatalog::bundled().unwrap();

        let component = catalog.get_by_id("chart-dashboard").await.unwrap().unwrap();
        assert_eq!(component.name, "ChartDashboard");
        assert_eq!(component.dependencies, vec!["chart.js", "moment.js"]);

        assert!(catalog.get_by_id("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_by_category_is_case_insensitive() {
        let catalog = FixtureCatalog::bundled().unwrap();
        let query = SearchQuery {
            category: Some("input".to_string()),
            ..Default::default()
        };

        let results = catalog.search(&query).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["file-uploader-pro", "RnButton"]);
    }

    #[tokio::test]
    async fn test_search_query_matches_tags() {
        let catalog = FixtureCatalog::bundled().unwrap();
        let query = SearchQuery {
            query: Some("ANALYTICS".to_string()),
            ..Default::default()
        };

        let results = catalog.search(&query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "chart-dashboard");
    }
}
