//! Shared helpers for wmx-core integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;
use walkdir::WalkDir;

use wmx_core::catalog::Component;
use wmx_core::error::{MarketplaceError, Result};
use wmx_core::install::{RetrievalRequest, SourceRetriever, CHECKOUT_DIR};

static INIT: Once = Once::new();

/// Initialize logging for tests (only once per test run)
pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Write `(relative path, content)` pairs under `root`
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

pub const VALID_WMCONFIG: &str = r#"{
  "name": "RnButton",
  "displayName": "RN Button",
  "version": "1.2.0",
  "description": "A pressable button",
  "category": "Input",
  "type": "component",
  "author": "Jane Dev",
  "license": "MIT",
  "tags": ["button", "input"],
  "reactNativeVersion": ">=0.72.0",
  "dependencies": [],
  "properties": {}
}"#;

pub const VALID_INDEX_TS: &str = "import React from 'react';\nimport { TouchableOpacity, Text } from 'react-native';\n\nexport default function RnButton() { return null; }\n";

pub const VALID_ICON_SVG: &str =
    "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"24\" height=\"24\"><rect width=\"24\" height=\"24\"/></svg>\n";

/// A component tree that passes strict validation
pub fn write_ready_component(root: &Path) {
    write_files(
        root,
        &[
            ("index.ts", VALID_INDEX_TS),
            ("wmconfig.json", VALID_WMCONFIG),
            ("icon.svg", VALID_ICON_SVG),
            ("README.md", "# RnButton\n"),
        ],
    );
}

/// Catalog record pointing at `repository_url`
pub fn component(id: &str, name: &str, repository_url: &str) -> Component {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "name": name,
        "display_name": name,
        "description": format!("{name} component"),
        "category": "Input",
        "tags": ["test"],
        "repository_url": repository_url,
        "branch": "main",
        "version": "2.0.1",
        "author": { "name": "Test Author" },
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-02-01T00:00:00Z"
    }))
    .unwrap()
}

/// Serves repositories from local directories instead of a remote
#[derive(Default)]
pub struct FakeRetriever {
    repositories: HashMap<String, PathBuf>,
    calls: AtomicUsize,
}

impl FakeRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(mut self, url: &str, source: &Path) -> Self {
        self.repositories.insert(url.to_string(), source.to_path_buf());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceRetriever for FakeRetriever {
    async fn fetch(&self, request: &RetrievalRequest, workspace: &Path) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let source = self
            .repositories
            .get(&request.repository_url)
            .ok_or_else(|| MarketplaceError::Retrieval {
                url: request.repository_url.clone(),
                branch: request.branch.clone(),
                message: "repository not found".to_string(),
            })?;

        let checkout = workspace.join(CHECKOUT_DIR);
        copy_dir(source, &checkout).map_err(|e| MarketplaceError::io(&checkout, e))?;
        Ok(checkout)
    }
}

fn copy_dir(from: &Path, to: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry.path().strip_prefix(from).unwrap();
        let destination = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else {
            fs::copy(entry.path(), &destination)?;
        }
    }
    Ok(())
}

/// Every path under `root` with its content, for before/after comparisons
pub fn snapshot(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut entries: Vec<(String, Vec<u8>)> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap().display().to_string();
            let content = if e.file_type().is_file() {
                fs::read(e.path()).unwrap()
            } else {
                Vec::new()
            };
            (relative, content)
        })
        .collect();
    entries.sort();
    entries
}

/// Names of the entries directly under `dir`
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
