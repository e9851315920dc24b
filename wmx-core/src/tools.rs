//! Request/response boundary
//!
//! Callers send `{"tool": "<name>", "arguments": {...}}` and always get a
//! JSON object back. Internal errors never escape: they are logged and turned
//! into `{"success": false, "error": ..., "message": ...}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::{provider_from_settings, CatalogProvider, Component, SearchQuery};
use crate::config::Settings;
use crate::error::{MarketplaceError, Result};
use crate::install::{
    list_installed, InstallOptions, InstallResult, InstalledComponent, Installer, WorkerPool,
    DEFAULT_RETRIEVAL_SLOTS,
};
use crate::publish::{
    PublishOverrides, PublishPlan, PublishPreparer, PublishResult, PublishingTemplate,
    TEMPLATE_INSTRUCTIONS,
};
use crate::validator::{StructureValidator, ValidationResult};

/// Largest page the boundary hands out
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Page size when the caller gives none
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchArgs {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl SearchArgs {
    /// Provider query with the limit clamped to `1..=MAX_SEARCH_LIMIT`
    pub fn to_query(&self) -> SearchQuery {
        SearchQuery {
            query: self.query.clone(),
            category: self.category.clone(),
            tags: self.tags.clone(),
            author: self.author.clone(),
            min_rating: self.min_rating,
            limit: self
                .limit
                .unwrap_or(DEFAULT_SEARCH_LIMIT)
                .clamp(1, MAX_SEARCH_LIMIT),
            offset: self.offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetDetailsArgs {
    pub component_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallArgs {
    pub component_id: String,
    #[serde(default)]
    pub target_path: Option<PathBuf>,
    #[serde(default)]
    pub force_overwrite: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListInstalledArgs {
    #[serde(default)]
    pub base_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateArgs {
    pub component_path: PathBuf,
    #[serde(default = "default_strict", alias = "strict_validation")]
    pub strict: bool,
}

fn default_strict() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishArgs {
    pub component_path: PathBuf,
    #[serde(flatten)]
    pub overrides: PublishOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoArgs {}

/// Every operation the boundary accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "arguments", rename_all = "snake_case")]
pub enum ToolRequest {
    Search(SearchArgs),
    GetDetails(GetDetailsArgs),
    Install(InstallArgs),
    ListInstalled(ListInstalledArgs),
    Validate(ValidateArgs),
    PrepareForPublishing(PublishArgs),
    PublishDryRun(PublishArgs),
    GetPublishingTemplate(NoArgs),
}

impl ToolRequest {
    /// Parse a raw request; a missing `arguments` object counts as empty
    pub fn from_value(raw: &Value) -> std::result::Result<Self, String> {
        let tool = raw
            .get("tool")
            .and_then(Value::as_str)
            .ok_or_else(|| "Request must contain a string 'tool' field".to_string())?;
        let arguments = match raw.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(args) => args.clone(),
        };

        serde_json::from_value(json!({ "tool": tool, "arguments": arguments }))
            .map_err(|e| format!("Invalid request for tool '{tool}': {e}"))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolRequest::Search(_) => "search",
            ToolRequest::GetDetails(_) => "get_details",
            ToolRequest::Install(_) => "install",
            ToolRequest::ListInstalled(_) => "list_installed",
            ToolRequest::Validate(_) => "validate",
            ToolRequest::PrepareForPublishing(_) => "prepare_for_publishing",
            ToolRequest::PublishDryRun(_) => "publish_dry_run",
            ToolRequest::GetPublishingTemplate(_) => "get_publishing_template",
        }
    }
}

/// Install outcome plus the catalog record it came from
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub component: Component,
    pub result: InstallResult,
}

/// The marketplace service behind every tool
#[derive(Clone)]
pub struct Marketplace {
    settings: Settings,
    catalog: Arc<dyn CatalogProvider>,
    installer: Installer,
    preparer: PublishPreparer,
    validator: StructureValidator,
    pool: WorkerPool,
    retrieval_slots: WorkerPool,
}

impl Marketplace {
    /// Wire the production components from settings
    ///
    /// Clones take slots from their own pool so a hanging remote cannot
    /// starve the local tools.
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let pool = WorkerPool::default();
        let retrieval_slots = WorkerPool::new(DEFAULT_RETRIEVAL_SLOTS);
        let catalog = provider_from_settings(&settings)?;
        let installer = Installer::from_settings(&settings, pool.clone(), retrieval_slots.clone());
        Ok(Self::new(settings, catalog, installer, pool).with_retrieval_slots(retrieval_slots))
    }

    pub fn new(
        settings: Settings,
        catalog: Arc<dyn CatalogProvider>,
        installer: Installer,
        pool: WorkerPool,
    ) -> Self {
        let preparer = PublishPreparer::new(&settings, pool.clone());
        Self {
            settings,
            catalog,
            installer,
            preparer,
            validator: StructureValidator::default(),
            pool,
            retrieval_slots: WorkerPool::new(DEFAULT_RETRIEVAL_SLOTS),
        }
    }

    /// Record the slots the installer's retriever draws from
    pub fn with_retrieval_slots(mut self, retrieval_slots: WorkerPool) -> Self {
        self.retrieval_slots = retrieval_slots;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Slots bounding concurrent repository retrievals
    pub fn retrieval_slots(&self) -> &WorkerPool {
        &self.retrieval_slots
    }

    pub async fn search(&self, args: &SearchArgs) -> Result<Vec<Component>> {
        self.catalog
            .search(&args.to_query())
            .await
            .map_err(MarketplaceError::Catalog)
    }

    pub async fn get_details(&self, component_id: &str) -> Result<Component> {
        self.catalog
            .get_by_id(component_id)
            .await
            .map_err(MarketplaceError::Catalog)?
            .ok_or_else(|| MarketplaceError::ComponentNotFound {
                id: component_id.to_string(),
            })
    }

    /// Resolve the id, then run the install pipeline
    pub async fn install(&self, args: &InstallArgs) -> Result<InstallOutcome> {
        let component = self.get_details(&args.component_id).await?;
        let base = self.base_path(args.target_path.as_deref());
        let result = self
            .installer
            .install(
                &component,
                &base,
                InstallOptions {
                    force_overwrite: args.force_overwrite,
                },
            )
            .await;
        Ok(InstallOutcome { component, result })
    }

    pub async fn list_installed(&self, base_path: Option<&Path>) -> Result<Vec<InstalledComponent>> {
        let base = self.base_path(base_path);
        self.pool.run(move || list_installed(&base)).await
    }

    pub async fn validate(&self, component_path: &Path, strict: bool) -> Result<ValidationResult> {
        let validator = self.validator.clone();
        let path = component_path.to_path_buf();
        self.pool
            .run(move || Ok(validator.validate(&path, strict)))
            .await
    }

    pub async fn prepare_for_publishing(&self, args: &PublishArgs) -> Result<PublishPlan> {
        self.preparer
            .prepare(&args.component_path, &args.overrides)
            .await
    }

    pub async fn publish_dry_run(&self, args: &PublishArgs) -> PublishResult {
        self.preparer
            .simulate(&args.component_path, &args.overrides)
            .await
    }

    fn base_path(&self, requested: Option<&Path>) -> PathBuf {
        requested
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.settings.component_base_path.clone())
    }

    /// Parse and dispatch a raw request
    pub async fn handle_value(&self, raw: &Value) -> Value {
        match ToolRequest::from_value(raw) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                tracing::warn!("{}", e);
                json!({
                    "success": false,
                    "error": e,
                    "error_kind": "invalid_request",
                    "message": "Invalid tool request",
                })
            }
        }
    }

    /// Dispatch a parsed request
    pub async fn handle(&self, request: ToolRequest) -> Value {
        let tool = request.name();
        tracing::debug!("Handling tool request: {}", tool);

        match request {
            ToolRequest::Search(args) => match self.search(&args).await {
                Ok(components) => {
                    tracing::info!("Found {} components matching search criteria", components.len());
                    let query = args.to_query();
                    json!({
                        "success": true,
                        "total_found": components.len(),
                        "components": components.iter().map(Component::summary).collect::<Vec<_>>(),
                        "search_params": {
                            "query": query.query,
                            "category": query.category,
                            "tags": query.tags,
                            "limit": query.limit,
                            "offset": query.offset,
                        },
                    })
                }
                Err(e) => failure(tool, &e, "Search failed"),
            },

            ToolRequest::GetDetails(args) => match self.get_details(&args.component_id).await {
                Ok(component) => json!({ "success": true, "component": component }),
                Err(e) => failure(tool, &e, "Could not load component details"),
            },

            ToolRequest::Install(args) => match self.install(&args).await {
                Ok(InstallOutcome { component, result }) => {
                    let mut response = to_json(&result);
                    response["component_id"] = json!(component.id);
                    response["version"] = json!(component.version);
                    response["repository_url"] = json!(component.repository_url);
                    response["author"] = json!(component.author.name);
                    response
                }
                Err(e) => failure(tool, &e, "Installation could not start"),
            },

            ToolRequest::ListInstalled(args) => {
                let base = self.base_path(args.base_path.as_deref());
                match self.list_installed(Some(&base)).await {
                    Ok(installed) => {
                        let mut response = json!({
                            "success": true,
                            "installed_components": installed,
                            "total_count": installed.len(),
                            "components_path": base,
                        });
                        if !base.is_dir() {
                            response["message"] =
                                json!(format!("Components directory not found: {}", base.display()));
                        }
                        response
                    }
                    Err(e) => failure(tool, &e, "Could not list installed components"),
                }
            }

            ToolRequest::Validate(args) => match self.validate(&args.component_path, args.strict).await {
                Ok(report) => to_json(&report),
                Err(e) => {
                    let mut response = failure(tool, &e, "Validation could not run");
                    response["valid"] = json!(false);
                    response["marketplace_ready"] = json!(false);
                    response
                }
            },

            ToolRequest::PrepareForPublishing(args) => match self.prepare_for_publishing(&args).await {
                Ok(PublishPlan::Ready(bundle)) => with_success(true, &bundle),
                Ok(PublishPlan::NotReady(rejection)) => with_success(false, &rejection),
                Err(e) => failure(tool, &e, "Could not prepare component for publishing"),
            },

            ToolRequest::PublishDryRun(args) => match self.publish_dry_run(&args).await {
                PublishResult::Simulated(simulation) => with_success(true, &simulation),
                PublishResult::Failed(failed) => with_success(false, &failed),
            },

            ToolRequest::GetPublishingTemplate(_) => match PublishingTemplate::new() {
                Ok(template) => json!({
                    "success": true,
                    "template": template,
                    "instructions": TEMPLATE_INSTRUCTIONS,
                }),
                Err(e) => {
                    tracing::error!("Error getting component template: {:#}", e);
                    json!({
                        "success": false,
                        "error": format!("{e:#}"),
                        "message": "Could not load the component template",
                    })
                }
            },
        }
    }
}

fn failure(tool: &str, err: &MarketplaceError, message: &str) -> Value {
    tracing::error!("{} failed: {}", tool, err);
    json!({
        "success": false,
        "error": err.to_string(),
        "error_kind": err.kind(),
        "message": message,
    })
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        json!({
            "success": false,
            "error": e.to_string(),
            "message": "Failed to encode response",
        })
    })
}

/// Serialize `value` and stamp a `success` flag on the resulting object
fn with_success<T: Serialize>(success: bool, value: &T) -> Value {
    let mut response = to_json(value);
    if let Value::Object(map) = &mut response {
        map.insert("success".to_string(), Value::Bool(success));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_with_arguments() {
        let raw = json!({"tool": "get_details", "arguments": {"component_id": "chart-dashboard"}});
        assert_eq!(
            ToolRequest::from_value(&raw).unwrap(),
            ToolRequest::GetDetails(GetDetailsArgs {
                component_id: "chart-dashboard".to_string()
            })
        );
    }

    #[test]
    fn test_missing_arguments_means_defaults() {
        let raw = json!({"tool": "list_installed"});
        assert_eq!(
            ToolRequest::from_value(&raw).unwrap(),
            ToolRequest::ListInstalled(ListInstalledArgs::default())
        );

        let raw = json!({"tool": "get_publishing_template"});
        assert_eq!(
            ToolRequest::from_value(&raw).unwrap().name(),
            "get_publishing_template"
        );
    }

    #[test]
    fn test_validate_defaults_to_strict() {
        let raw = json!({"tool": "validate", "arguments": {"component_path": "/tmp/x"}});
        match ToolRequest::from_value(&raw).unwrap() {
            ToolRequest::Validate(args) => assert!(args.strict),
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn test_publish_args_accept_long_names() {
        let raw = json!({
            "tool": "publish_dry_run",
            "arguments": {
                "component_path": "/tmp/x",
                "git_repo_name": "wmx-custom",
                "marketplace_category": "Input",
                "author_name": "Jane"
            }
        });
        match ToolRequest::from_value(&raw).unwrap() {
            ToolRequest::PublishDryRun(args) => {
                assert_eq!(args.overrides.repo_name.as_deref(), Some("wmx-custom"));
                assert_eq!(args.overrides.category.as_deref(), Some("Input"));
                assert_eq!(args.overrides.author_name.as_deref(), Some("Jane"));
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tool_and_bad_arguments_are_errors() {
        assert!(ToolRequest::from_value(&json!({"tool": "format_disk"})).is_err());
        assert!(ToolRequest::from_value(&json!({"arguments": {}})).is_err());
        let err = ToolRequest::from_value(&json!({"tool": "install", "arguments": {}})).unwrap_err();
        assert!(err.contains("install"));
    }

    #[test]
    fn test_search_limit_clamped() {
        let args = SearchArgs {
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(args.to_query().limit, MAX_SEARCH_LIMIT);

        let args = SearchArgs {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(args.to_query().limit, 1);

        assert_eq!(SearchArgs::default().to_query().limit, DEFAULT_SEARCH_LIMIT);
    }

    #[test]
    fn test_with_success_stamps_flag() {
        let value = with_success(false, &json!({"error": "nope"}));
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "nope");
    }
}
