//! Install pipeline
//!
//! One call to [`Installer::install`] is one attempt:
//!
//! ```text
//! check target ─(exists)─> rejected
//!      │
//!      └─> fetch ─> validate (advisory) ─> size check ─> copy ─> stamp ─> succeeded
//!            └──────────────── any failure ───────────────────> failed, target rolled back
//! ```
//!
//! The staging workspace is removed on every exit path. With
//! `force_overwrite` the previous installation is moved to a hidden sibling
//! just before the copy; it is deleted on success and moved back on failure.

use serde::Serialize;
use std::path::{Component as PathPart, Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use super::pool::WorkerPool;
use super::retriever::{GitRetriever, RetrievalRequest, SourceRetriever};
use super::sidecar::InstalledComponentRecord;
use super::workspace::InstallWorkspace;
use crate::catalog::Component;
use crate::config::Settings;
use crate::error::{MarketplaceError, Result};
use crate::validator::StructureValidator;

/// Version-control metadata never copied into an installation
const VCS_DIR: &str = ".git";

/// Suffix of the hidden sibling a replaced installation waits in
const BACKUP_SUFFIX: &str = ".wmx-replaced";

/// Outcome of one install attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallResult {
    pub success: bool,
    pub component_name: String,
    pub install_path: PathBuf,
    pub message: String,
    /// Paths relative to the install base, in copy order
    pub files_installed: Vec<String>,
    pub errors: Vec<String>,
    /// Machine-readable failure kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl InstallResult {
    fn succeeded(component: &Component, install_path: PathBuf, files: Vec<String>) -> Self {
        Self {
            success: true,
            component_name: component.name.clone(),
            install_path,
            message: format!("Component {} installed successfully", component.name),
            files_installed: files,
            errors: Vec::new(),
            error_kind: None,
        }
    }

    fn failed(
        component: &Component,
        install_path: PathBuf,
        message: String,
        error: &MarketplaceError,
    ) -> Self {
        Self {
            success: false,
            component_name: component.name.clone(),
            install_path,
            message,
            files_installed: Vec::new(),
            errors: vec![error.to_string()],
            error_kind: Some(error.kind().to_string()),
        }
    }
}

/// Per-call install options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Replace an existing installation once the new source is in hand
    pub force_overwrite: bool,
}

/// Installs catalog components into a project tree
#[derive(Clone)]
pub struct Installer {
    retriever: Arc<dyn SourceRetriever>,
    pool: WorkerPool,
    validator: StructureValidator,
    max_component_size_bytes: u64,
    temp_root: PathBuf,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("pool_size", &self.pool.size())
            .field("max_component_size_bytes", &self.max_component_size_bytes)
            .field("temp_root", &self.temp_root)
            .finish()
    }
}

impl Installer {
    /// Installer backed by `git`
    ///
    /// `retrieval_slots` bounds concurrent clones; `pool` runs the blocking
    /// filesystem work.
    pub fn from_settings(
        settings: &Settings,
        pool: WorkerPool,
        retrieval_slots: WorkerPool,
    ) -> Self {
        let retriever = Arc::new(GitRetriever::new(settings, retrieval_slots));
        Self::new(settings, retriever, pool)
    }

    pub fn new(settings: &Settings, retriever: Arc<dyn SourceRetriever>, pool: WorkerPool) -> Self {
        Self {
            retriever,
            pool,
            validator: StructureValidator::default(),
            max_component_size_bytes: settings.max_component_size_bytes(),
            temp_root: std::env::temp_dir(),
        }
    }

    /// Stage workspaces under `temp_root` instead of the system temp dir
    pub fn with_temp_root(mut self, temp_root: impl Into<PathBuf>) -> Self {
        self.temp_root = temp_root.into();
        self
    }

    /// Install `component` into `target_base/<component.name>`
    pub async fn install(
        &self,
        component: &Component,
        target_base: &Path,
        options: InstallOptions,
    ) -> InstallResult {
        let target = target_base.join(&component.name);

        if !component.has_safe_name() {
            let err = MarketplaceError::InvalidComponentName {
                name: component.name.clone(),
            };
            tracing::warn!("{}", err);
            return InstallResult::failed(
                component,
                target,
                format!("Failed to install component {}", component.name),
                &err,
            );
        }

        if target.symlink_metadata().is_ok() && !options.force_overwrite {
            let err = MarketplaceError::AlreadyExists {
                path: target.clone(),
            };
            tracing::warn!(
                "Component {} already exists at {}",
                component.name,
                target.display()
            );
            return InstallResult::failed(
                component,
                target,
                format!(
                    "Component {} already exists. Use force_overwrite to replace it.",
                    component.name
                ),
                &err,
            );
        }

        tracing::info!(
            "Starting installation of component {} into {}",
            component.name,
            target_base.display()
        );

        let workspace = match InstallWorkspace::create_in(&component.name, &self.temp_root) {
            Ok(workspace) => workspace,
            Err(err) => {
                tracing::error!("Failed to install component {}: {}", component.name, err);
                return InstallResult::failed(
                    component,
                    target,
                    format!("Failed to install component {}", component.name),
                    &err,
                );
            }
        };

        let mut state = AttemptState::default();
        let outcome = self
            .run_attempt(
                component,
                target_base,
                &target,
                workspace.path(),
                options,
                &mut state,
            )
            .await;

        self.close_workspace(workspace).await;

        match outcome {
            Ok(files) => {
                if let Some(backup) = state.backup {
                    self.discard_backup(backup).await;
                }
                tracing::info!(
                    "Installed component {} ({} files) to {}",
                    component.name,
                    files.len(),
                    target.display()
                );
                InstallResult::succeeded(component, target, files)
            }
            Err(err) => {
                tracing::error!("Failed to install component {}: {}", component.name, err);
                if state.target_created {
                    self.roll_back(&target).await;
                }
                if let Some(backup) = state.backup {
                    self.restore_backup(backup, &target).await;
                }
                InstallResult::failed(
                    component,
                    target,
                    format!("Failed to install component {}", component.name),
                    &err,
                )
            }
        }
    }

    async fn run_attempt(
        &self,
        component: &Component,
        target_base: &Path,
        target: &Path,
        workspace: &Path,
        options: InstallOptions,
        state: &mut AttemptState,
    ) -> Result<Vec<String>> {
        let request = RetrievalRequest {
            repository_url: component.repository_url.clone(),
            branch: component.branch.clone(),
        };
        let checkout = self.retriever.fetch(&request, workspace).await?;
        let source = resolve_subpath(&checkout, component.subpath.as_deref())?;

        let validator = self.validator.clone();
        let validated = source.clone();
        let report = self
            .pool
            .run(move || Ok(validator.validate(&validated, false)))
            .await?;
        for issue in &report.issues {
            tracing::warn!("{}: {}", component.name, issue);
        }
        for warning in &report.warnings {
            tracing::debug!("{}: {}", component.name, warning);
        }

        let measured = source.clone();
        let size = self.pool.run(move || tree_size(&measured)).await?;
        if size > self.max_component_size_bytes {
            return Err(MarketplaceError::ComponentTooLarge {
                actual_bytes: size,
                limit_bytes: self.max_component_size_bytes,
            });
        }

        if options.force_overwrite {
            let existing = target.to_path_buf();
            state.backup = self.pool.run(move || set_aside(&existing)).await?;
        }

        let (base, claimed) = (target_base.to_path_buf(), target.to_path_buf());
        self.pool.run(move || claim_target(&base, &claimed)).await?;
        state.target_created = true;

        let (from, to, label) = (source.clone(), target.to_path_buf(), component.name.clone());
        let files = self
            .pool
            .run(move || copy_tree(&from, &to, &label))
            .await?;

        let record = InstalledComponentRecord::for_component(component, chrono::Utc::now());
        let stamped = target.to_path_buf();
        let sidecar = self.pool.run(move || record.write_to(&stamped)).await?;
        tracing::debug!("Wrote component metadata {}", sidecar.display());

        Ok(files)
    }

    async fn close_workspace(&self, workspace: InstallWorkspace) {
        // On a pool failure the closure is dropped and Drop removes the workspace
        if let Err(e) = self
            .pool
            .run(move || {
                workspace.close();
                Ok(())
            })
            .await
        {
            tracing::warn!("Workspace cleanup did not run on the pool: {}", e);
        }
    }

    async fn discard_backup(&self, backup: PathBuf) {
        let doomed = backup.clone();
        let outcome = self
            .pool
            .run(move || remove_path(&doomed).map_err(|e| MarketplaceError::io(&doomed, e)))
            .await;
        match outcome {
            Ok(()) => tracing::debug!("Removed replaced installation {}", backup.display()),
            Err(e) => tracing::warn!("Failed to remove replaced installation: {}", e),
        }
    }

    async fn restore_backup(&self, backup: PathBuf, target: &Path) {
        let (from, to) = (backup.clone(), target.to_path_buf());
        let outcome = self
            .pool
            .run(move || std::fs::rename(&from, &to).map_err(|e| MarketplaceError::io(&to, e)))
            .await;
        match outcome {
            Ok(()) => tracing::info!("Restored previous installation at {}", target.display()),
            Err(e) => tracing::error!(
                "Failed to restore previous installation from {}: {}",
                backup.display(),
                e
            ),
        }
    }

    async fn roll_back(&self, target: &Path) {
        let doomed = target.to_path_buf();
        let outcome = self
            .pool
            .run(move || remove_path(&doomed).map_err(|e| MarketplaceError::io(&doomed, e)))
            .await;
        match outcome {
            Ok(()) => tracing::debug!("Removed partial installation {}", target.display()),
            Err(e) => tracing::error!("Failed to clean up partial installation: {}", e),
        }
    }
}

/// What one attempt has changed under the install base
#[derive(Debug, Default)]
struct AttemptState {
    /// The target directory was created by this attempt
    target_created: bool,
    /// Previous installation moved aside by `force_overwrite`
    backup: Option<PathBuf>,
}

/// Hidden sibling that holds a replaced installation until the new one lands
fn backup_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}{BACKUP_SUFFIX}"))
}

/// Move an existing target out of the way, returning where it went
fn set_aside(target: &Path) -> Result<Option<PathBuf>> {
    if target.symlink_metadata().is_err() {
        return Ok(None);
    }

    let backup = backup_path(target);
    if backup.symlink_metadata().is_ok() {
        tracing::warn!("Removing stale backup {}", backup.display());
        remove_path(&backup).map_err(|e| MarketplaceError::io(&backup, e))?;
    }

    std::fs::rename(target, &backup).map_err(|e| MarketplaceError::io(target, e))?;
    tracing::info!(
        "Moved existing installation {} aside to {}",
        target.display(),
        backup.display()
    );
    Ok(Some(backup))
}

/// Create `target` exclusively, creating the base first if needed
fn claim_target(base: &Path, target: &Path) -> Result<()> {
    std::fs::create_dir_all(base).map_err(|e| MarketplaceError::io(base, e))?;
    match std::fs::create_dir(target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(MarketplaceError::AlreadyExists {
                path: target.to_path_buf(),
            })
        }
        Err(e) => Err(MarketplaceError::io(target, e)),
    }
}

/// Descend into a declared subpath, refusing anything that leaves the checkout
fn resolve_subpath(checkout: &Path, subpath: Option<&str>) -> Result<PathBuf> {
    let Some(subpath) = subpath.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(checkout.to_path_buf());
    };

    let relative = Path::new(subpath);
    let escapes = relative
        .components()
        .any(|part| !matches!(part, PathPart::Normal(_) | PathPart::CurDir));
    let source = checkout.join(relative);

    if escapes || !source.is_dir() {
        return Err(MarketplaceError::SubpathNotFound { path: source });
    }
    Ok(source)
}

fn is_vcs_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name() == VCS_DIR
}

/// Total bytes of regular files, excluding VCS metadata
fn tree_size(root: &Path) -> Result<u64> {
    let mut total = 0u64;
    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_vcs_dir(e)) {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if entry.file_type().is_file() {
            let meta = entry
                .metadata()
                .map_err(|e| walk_error(entry.path(), e))?;
            total = total.saturating_add(meta.len());
        }
    }
    Ok(total)
}

/// Copy `source` into the existing directory `target`
///
/// Returns `<label>/<relative path>` for every copied file in walk order.
fn copy_tree(source: &Path, target: &Path, label: &str) -> Result<Vec<String>> {
    let mut copied = Vec::new();

    let walker = WalkDir::new(source)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_vcs_dir(e));

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(source, e))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| {
                MarketplaceError::io(
                    entry.path(),
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
                )
            })?;
        let destination = target.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            std::fs::create_dir_all(&destination)
                .map_err(|e| MarketplaceError::io(&destination, e))?;
        } else if file_type.is_file() {
            std::fs::copy(entry.path(), &destination)
                .map_err(|e| MarketplaceError::io(&destination, e))?;
            let recorded = relative
                .components()
                .map(|part| part.as_os_str().to_string_lossy())
                .fold(label.to_string(), |acc, part| format!("{acc}/{part}"));
            tracing::trace!("Copied {} -> {}", entry.path().display(), destination.display());
            copied.push(recorded);
        } else {
            tracing::warn!("Skipping non-regular file {}", entry.path().display());
        }
    }

    Ok(copied)
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    let meta = path.symlink_metadata()?;
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

fn walk_error(path: &Path, err: walkdir::Error) -> MarketplaceError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf());
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop detected"));
    MarketplaceError::io(path, source)
}
