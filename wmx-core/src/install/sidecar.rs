//! Installed-component provenance records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::{Component, ComponentAuthor};
use crate::error::{MarketplaceError, Result};

/// Sidecar file written into every installed component directory
pub const METADATA_FILE: &str = ".wmx-component-metadata.json";

/// Provenance of one installed component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledComponentRecord {
    pub id: String,
    pub name: String,
    pub version: String,
    pub installed_at: DateTime<Utc>,
    pub source_url: String,
    #[serde(default)]
    pub description: String,
    pub author: ComponentAuthor,
}

impl InstalledComponentRecord {
    pub fn for_component(component: &Component, installed_at: DateTime<Utc>) -> Self {
        Self {
            id: component.id.clone(),
            name: component.name.clone(),
            version: component.version.clone(),
            installed_at,
            source_url: component.repository_url.clone(),
            description: component.description.clone(),
            author: component.author.clone(),
        }
    }

    /// Write the sidecar into `component_dir`
    pub fn write_to(&self, component_dir: &Path) -> Result<PathBuf> {
        let path = component_dir.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            MarketplaceError::io(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        std::fs::write(&path, json).map_err(|e| MarketplaceError::io(&path, e))?;
        Ok(path)
    }

    /// Read the sidecar from `component_dir`
    pub fn read_from(component_dir: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let path = component_dir.join(METADATA_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// One entry of an installed-components listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstalledComponent {
    pub name: String,
    pub path: PathBuf,
    pub has_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl InstalledComponent {
    fn bare(name: String, path: PathBuf) -> Self {
        Self {
            name,
            path,
            has_metadata: false,
            id: None,
            version: None,
            description: None,
            author: None,
            installed_at: None,
            source_url: None,
        }
    }

    fn with_record(mut self, record: InstalledComponentRecord) -> Self {
        self.has_metadata = true;
        self.id = Some(record.id);
        self.version = Some(record.version);
        self.description = Some(record.description);
        self.author = Some(record.author.name);
        self.installed_at = Some(record.installed_at);
        self.source_url = Some(record.source_url);
        self
    }
}

/// List component directories under `base`, sorted by name
///
/// A missing `base` yields an empty listing. Hidden directories are skipped.
pub fn list_installed(base: &Path) -> Result<Vec<InstalledComponent>> {
    if !base.is_dir() {
        tracing::debug!("Components directory not found: {}", base.display());
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(base).map_err(|e| MarketplaceError::io(base, e))?;

    let mut installed = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MarketplaceError::io(base, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if name.starts_with('.') || !path.is_dir() {
            continue;
        }

        let mut component = InstalledComponent::bare(name, path.clone());
        if path.join(METADATA_FILE).is_file() {
            match InstalledComponentRecord::read_from(&path) {
                Ok(record) => component = component.with_record(record),
                Err(e) => tracing::warn!("Ignoring metadata for {}: {:#}", component.name, e),
            }
        }
        installed.push(component);
    }

    installed.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(installed)
}
