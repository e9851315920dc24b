//! WMX component marketplace library
//!
//! Search the catalog, validate component packaging, install components into
//! a project and preview publishing. [`tools::Marketplace`] wires everything
//! together behind a JSON request/response boundary.

pub mod catalog;
pub mod config;
pub mod error;
pub mod install;
pub mod publish;
pub mod tools;
pub mod validator;

pub use config::Settings;
pub use error::{MarketplaceError, Result};
pub use tools::{Marketplace, ToolRequest};
