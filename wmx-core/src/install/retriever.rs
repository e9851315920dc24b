//! Source retrieval
//!
//! A [`SourceRetriever`] materializes a repository branch inside a workspace
//! the installer already owns. The production implementation shells out to
//! `git`; tests plug in an in-process fake.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::pool::WorkerPool;
use crate::config::Settings;
use crate::error::{MarketplaceError, Result};

/// Name of the checkout directory created inside the workspace
pub const CHECKOUT_DIR: &str = "repo";

/// What to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    pub repository_url: String,
    pub branch: String,
}

/// Fetches a repository into a workspace
#[async_trait]
pub trait SourceRetriever: Send + Sync {
    /// Materialize `request` under `workspace`, returning the checkout root
    ///
    /// Implementations must not write outside `workspace` and must not retry.
    async fn fetch(&self, request: &RetrievalRequest, workspace: &Path) -> Result<PathBuf>;
}

/// Shallow, single-branch `git clone`
#[derive(Debug, Clone)]
pub struct GitRetriever {
    depth: u32,
    timeout: Duration,
    slots: WorkerPool,
}

impl GitRetriever {
    /// `slots` bounds concurrent clones; keep it apart from the blocking-job pool
    pub fn new(settings: &Settings, slots: WorkerPool) -> Self {
        Self {
            depth: settings.git_depth.max(1),
            timeout: Duration::from_secs(settings.git_clone_timeout),
            slots,
        }
    }

    fn clone_command(&self, request: &RetrievalRequest, destination: &Path) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("clone")
            .arg("--quiet")
            .arg("--depth")
            .arg(self.depth.to_string())
            .arg("--single-branch")
            .arg("--branch")
            .arg(&request.branch)
            .arg("--")
            .arg(&request.repository_url)
            .arg(destination)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl SourceRetriever for GitRetriever {
    async fn fetch(&self, request: &RetrievalRequest, workspace: &Path) -> Result<PathBuf> {
        let destination = workspace.join(CHECKOUT_DIR);
        let retrieval_error = |message: String| MarketplaceError::Retrieval {
            url: request.repository_url.clone(),
            branch: request.branch.clone(),
            message,
        };

        // A clone ties up a retrieval slot for its whole duration
        let _permit = self.slots.acquire().await?;

        tracing::info!(
            "Cloning {} (branch '{}', depth {})",
            request.repository_url,
            request.branch,
            self.depth
        );

        let child = self
            .clone_command(request, &destination)
            .spawn()
            .map_err(|e| retrieval_error(format!("failed to start git: {e}")))?;

        // Dropping the future on timeout drops the child, which kills it
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| MarketplaceError::RetrievalTimeout {
                url: request.repository_url.clone(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| retrieval_error(format!("failed to wait for git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            tracing::debug!("git clone exited with code {}", exit_code);
            return Err(retrieval_error(format!(
                "git clone failed (exit code {exit_code}): {}",
                stderr.trim()
            )));
        }

        tracing::debug!("Cloned into {}", destination.display());
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_command_is_shallow_single_branch() {
        let settings = Settings {
            git_depth: 3,
            ..Default::default()
        };
        let retriever = GitRetriever::new(&settings, WorkerPool::default());
        let request = RetrievalRequest {
            repository_url: "https://example.com/x.git".to_string(),
            branch: "release".to_string(),
        };

        let cmd = retriever.clone_command(&request, Path::new("/tmp/ws/repo"));
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "clone",
                "--quiet",
                "--depth",
                "3",
                "--single-branch",
                "--branch",
                "release",
                "--",
                "https://example.com/x.git",
                "/tmp/ws/repo",
            ]
        );
    }

    #[tokio::test]
    async fn test_unreachable_remote_is_retrieval_failure() {
        if std::process::Command::new("git")
            .arg("--version")
            .output()
            .is_err()
        {
            eprintln!("git not available, skipping");
            return;
        }

        let workspace = tempfile::tempdir().unwrap();
        let retriever = GitRetriever::new(&Settings::default(), WorkerPool::default());
        let request = RetrievalRequest {
            repository_url: workspace
                .path()
                .join("no-such-repo")
                .to_string_lossy()
                .into_owned(),
            branch: "main".to_string(),
        };

        let err = retriever.fetch(&request, workspace.path()).await.unwrap_err();
        assert_eq!(err.kind(), "retrieval_failure");
    }
}
