//! WMX component catalog
//!
//! The catalog answers two questions: which components match a search, and
//! what is the full record for a given id. Everything else in the crate
//! talks to it through [`CatalogProvider`].
//!
//! # Architecture
//!
//! ```text
//!   CatalogProvider (trait)
//!     ├── FixtureCatalog ← components.yaml bundled with the crate
//!     └── RemoteCatalog  ← marketplace HTTP API
//! ```

mod component;
mod fixture;
mod provider;
mod remote;

use anyhow::Result;
use std::sync::Arc;

pub use component::{Component, ComponentAuthor, ComponentVersion};
pub use fixture::{CatalogDocument, FixtureCatalog};
pub use provider::{CatalogProvider, SearchQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use remote::RemoteCatalog;

use crate::config::{CatalogBackend, Settings};

/// Build the provider selected in settings
pub fn provider_from_settings(settings: &Settings) -> Result<Arc<dyn CatalogProvider>> {
    let provider: Arc<dyn CatalogProvider> = match settings.catalog {
        CatalogBackend::Fixture => Arc::new(FixtureCatalog::bundled()?),
        CatalogBackend::Remote => Arc::new(RemoteCatalog::new(settings)?),
    };
    tracing::debug!("Using {:?} catalog backend", settings.catalog);
    Ok(provider)
}
