//! Component installation
//!
//! - [`SourceRetriever`] fetches a repository into a private workspace
//! - [`Installer`] turns a catalog [`crate::catalog::Component`] into files
//!   under a project directory, or leaves the project untouched on failure
//! - [`list_installed`] reads back what is installed

mod installer;
mod pool;
mod retriever;
mod sidecar;
mod workspace;

pub use installer::{InstallOptions, InstallResult, Installer};
pub use pool::{WorkerPool, DEFAULT_POOL_SIZE, DEFAULT_RETRIEVAL_SLOTS};
pub use retriever::{GitRetriever, RetrievalRequest, SourceRetriever, CHECKOUT_DIR};
pub use sidecar::{list_installed, InstalledComponent, InstalledComponentRecord, METADATA_FILE};
pub use workspace::InstallWorkspace;
