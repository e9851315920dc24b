//! Publish readiness and dry-run simulation

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Settings;
use crate::error::{MarketplaceError, Result};
use crate::install::WorkerPool;
use crate::validator::{StructureValidator, ValidationResult};

/// Organization that hosts marketplace repositories
pub const MARKETPLACE_ORG_URL: &str = "https://github.com/wavemaker-marketplace";

/// What publishing would do, in order
pub const PUBLISHING_STEPS: &[&str] = &[
    "1. Validate component structure and metadata",
    "2. Prepare component files for publishing",
    "3. Create Git repository in marketplace organization",
    "4. Upload component files to repository",
    "5. Register component in marketplace database",
    "6. Generate component documentation",
    "7. Publish component to marketplace",
];

/// Caller-supplied values that win over the descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishOverrides {
    #[serde(default, alias = "git_repo_name")]
    pub repo_name: Option<String>,
    #[serde(default, alias = "marketplace_category")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default)]
    pub author_organization: Option<String>,
}

impl PublishOverrides {
    fn author(&self) -> Option<PublishAuthor> {
        if self.author_name.is_none()
            && self.author_email.is_none()
            && self.author_organization.is_none()
        {
            return None;
        }
        Some(PublishAuthor {
            name: self
                .author_name
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            email: self.author_email.clone().unwrap_or_default(),
            organization: self.author_organization.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishAuthor {
    pub name: String,
    pub email: String,
    pub organization: String,
}

/// Metadata bundle submitted to the marketplace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishComponent {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub version: String,
    pub category: String,
    pub tags: Vec<String>,
    pub author: PublishAuthor,
    pub license: String,
    pub wavemaker_version: String,
    pub dependencies: serde_json::Value,
}

/// Repository that would host the published component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryInfo {
    pub name: String,
    pub description: String,
    pub visibility: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishFile {
    pub path: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub file_type: &'static str,
    pub description: String,
}

/// Everything needed to publish a ready component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishBundle {
    pub component: PublishComponent,
    pub git_repo: RepositoryInfo,
    pub files_to_publish: Vec<PublishFile>,
    pub publishing_steps: Vec<&'static str>,
}

/// Why a component cannot be published yet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishRejection {
    pub error: String,
    pub message: String,
    pub validation_issues: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishPlan {
    Ready(PublishBundle),
    NotReady(PublishRejection),
}

impl PublishPlan {
    pub fn is_ready(&self) -> bool {
        matches!(self, PublishPlan::Ready(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishingDetails {
    pub repository_would_be_created: String,
    pub files_to_upload: usize,
    pub marketplace_id_would_be: String,
    pub dry_run: bool,
}

/// Preview of a publish that was never performed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishSimulation {
    pub component_id: String,
    pub component_name: String,
    pub version: String,
    pub git_repository: String,
    pub marketplace_url: String,
    pub message: String,
    pub publishing_details: PublishingDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishFailure {
    pub component_name: String,
    pub error: String,
    pub message: String,
    /// Stage that failed
    pub step: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishResult {
    Simulated(PublishSimulation),
    Failed(PublishFailure),
}

/// Turns a local component directory into a publish plan
#[derive(Debug, Clone)]
pub struct PublishPreparer {
    validator: StructureValidator,
    pool: WorkerPool,
    marketplace_base_url: String,
}

impl PublishPreparer {
    pub fn new(settings: &Settings, pool: WorkerPool) -> Self {
        Self {
            validator: StructureValidator::default(),
            pool,
            marketplace_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Strict validation, then metadata and file enumeration
    pub async fn prepare(&self, directory: &Path, overrides: &PublishOverrides) -> Result<PublishPlan> {
        let validator = self.validator.clone();
        let dir = directory.to_path_buf();
        let report = self.pool.run(move || Ok(validator.validate(&dir, true))).await?;

        if !report.marketplace_ready() {
            tracing::info!(
                "{} is not ready for publishing ({} issue(s))",
                directory.display(),
                report.issues.len()
            );
            return Ok(PublishPlan::NotReady(PublishRejection {
                error: "Component is not ready for publishing".to_string(),
                message: format!(
                    "Fix {} blocking issue(s) before publishing",
                    report.issues.len()
                ),
                validation_issues: report.issues,
                suggestions: report.suggested_improvements,
            }));
        }

        let dir = directory.to_path_buf();
        let files = self.pool.run(move || scan_publishable_files(&dir)).await?;

        let bundle = build_bundle(directory, &report, overrides, files);
        tracing::info!(
            "Prepared {} for publishing: {} file(s)",
            bundle.component.name,
            bundle.files_to_publish.len()
        );
        Ok(PublishPlan::Ready(bundle))
    }

    /// Dry run: describe what publishing would produce, persisting nothing
    pub async fn simulate(&self, directory: &Path, overrides: &PublishOverrides) -> PublishResult {
        let published_at = chrono::Utc::now().timestamp();
        self.simulate_at(directory, overrides, published_at).await
    }

    /// [`Self::simulate`] with a fixed timestamp for the synthesized id
    pub async fn simulate_at(
        &self,
        directory: &Path,
        overrides: &PublishOverrides,
        unix_seconds: i64,
    ) -> PublishResult {
        let bundle = match self.prepare(directory, overrides).await {
            Ok(PublishPlan::Ready(bundle)) => bundle,
            Ok(PublishPlan::NotReady(rejection)) => {
                return preparation_failed(rejection.error);
            }
            Err(err) => return preparation_failed(err.to_string()),
        };

        let name = &bundle.component.name;
        let component_id = format!("comp_{}_{}", name.to_lowercase().replace(' ', "_"), unix_seconds);
        let git_repository = format!("{MARKETPLACE_ORG_URL}/{}", bundle.git_repo.name);
        let marketplace_url = format!("{}/components/{}", self.marketplace_base_url, component_id);

        tracing::info!("[DRY RUN] {} would be published as {}", name, component_id);

        PublishResult::Simulated(PublishSimulation {
            component_name: name.clone(),
            version: bundle.component.version.clone(),
            message: format!("[DRY RUN] Component '{name}' would be published successfully!"),
            publishing_details: PublishingDetails {
                repository_would_be_created: git_repository.clone(),
                files_to_upload: bundle.files_to_publish.len(),
                marketplace_id_would_be: component_id.clone(),
                dry_run: true,
            },
            component_id,
            git_repository,
            marketplace_url,
        })
    }
}

fn preparation_failed(error: String) -> PublishResult {
    PublishResult::Failed(PublishFailure {
        component_name: "Unknown".to_string(),
        message: format!("Preparation failed: {error}"),
        error,
        step: "preparation",
    })
}

fn build_bundle(
    directory: &Path,
    report: &ValidationResult,
    overrides: &PublishOverrides,
    files_to_publish: Vec<PublishFile>,
) -> PublishBundle {
    let metadata = report.metadata.clone().unwrap_or(serde_json::Value::Null);
    let text = |key: &str| metadata.get(key).and_then(|v| v.as_str()).map(str::to_string);

    let dir_name = directory
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "component".to_string());
    let name = text("name").unwrap_or(dir_name);

    let tags = overrides.tags.clone().unwrap_or_else(|| {
        metadata
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    });

    let author = overrides
        .author()
        .unwrap_or_else(|| descriptor_author(metadata.get("author")));

    let repo_name = overrides
        .repo_name
        .clone()
        .unwrap_or_else(|| format!("wmx-{}", name.to_lowercase().replace(' ', "-")));

    let declared_url = ["repository", "git_repo"].iter().find_map(|key| {
        metadata
            .get(*key)
            .and_then(|repo| repo.get("url"))
            .and_then(|url| url.as_str())
            .map(str::to_string)
    });

    let description = text("description").unwrap_or_default();

    PublishBundle {
        component: PublishComponent {
            display_name: text("displayName").unwrap_or_else(|| name.clone()),
            version: text("version").unwrap_or_else(|| "1.0.0".to_string()),
            category: overrides
                .category
                .clone()
                .or_else(|| text("category"))
                .unwrap_or_else(|| "Custom".to_string()),
            tags,
            author,
            license: text("license").unwrap_or_else(|| "MIT".to_string()),
            wavemaker_version: text("wavemakerVersion").unwrap_or_else(|| ">=11.0.0".to_string()),
            dependencies: metadata
                .get("dependencies")
                .cloned()
                .unwrap_or_else(|| serde_json::json!([])),
            description: description.clone(),
            name: name.clone(),
        },
        git_repo: RepositoryInfo {
            url: declared_url.unwrap_or_else(|| format!("{MARKETPLACE_ORG_URL}/{repo_name}")),
            description: format!(
                "WMX Component: {}",
                if description.is_empty() { &name } else { &description }
            ),
            visibility: "public".to_string(),
            name: repo_name,
        },
        files_to_publish,
        publishing_steps: PUBLISHING_STEPS.to_vec(),
    }
}

/// Descriptor `author` may be a plain name or an object
fn descriptor_author(value: Option<&serde_json::Value>) -> PublishAuthor {
    let field = |key: &str| {
        value
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    match value {
        Some(serde_json::Value::String(name)) if !name.trim().is_empty() => PublishAuthor {
            name: name.clone(),
            email: String::new(),
            organization: String::new(),
        },
        Some(serde_json::Value::Object(_)) => {
            let name = field("name");
            PublishAuthor {
                name: if name.is_empty() { "Unknown".to_string() } else { name },
                email: field("email"),
                organization: field("organization"),
            }
        }
        _ => PublishAuthor {
            name: "Unknown".to_string(),
            email: String::new(),
            organization: String::new(),
        },
    }
}

/// Best-effort type label from the file extension
pub fn file_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "ts" => "typescript",
        "js" => "javascript",
        "json" => "json",
        "html" => "html",
        "css" => "css",
        "scss" => "scss",
        "md" => "markdown",
        "png" | "jpg" | "jpeg" => "image",
        "svg" => "svg",
        "xml" => "xml",
        "txt" => "text",
        _ => "unknown",
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Every publishable file under `root`, sorted by relative path
///
/// Skips hidden entries, `node_modules` and `*.tmp` files.
fn scan_publishable_files(root: &Path) -> Result<Vec<PublishFile>> {
    let walker = WalkDir::new(root).min_depth(1).into_iter().filter_entry(|e| {
        if e.file_type().is_dir() {
            !is_hidden(e.file_name()) && e.file_name() != "node_modules"
        } else {
            true
        }
    });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            MarketplaceError::io(path, std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if file_name.starts_with('.') || file_name.ends_with(".tmp") {
            continue;
        }

        let relative: PathBuf = entry
            .path()
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| entry.path().to_path_buf());
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let size = entry
            .metadata()
            .map(|m| m.len())
            .map_err(|e| {
                MarketplaceError::io(
                    entry.path(),
                    std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                )
            })?;

        files.push(PublishFile {
            file_type: file_type_for(entry.path()),
            description: format!("Component file: {relative}"),
            path: relative,
            size,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
