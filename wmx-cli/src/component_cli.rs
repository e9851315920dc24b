//! Catalog and install commands

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use wmx_core::tools::{GetDetailsArgs, InstallArgs, ListInstalledArgs, SearchArgs};
use wmx_core::{Marketplace, ToolRequest};

#[derive(Subcommand, Debug)]
pub enum ComponentSubcommand {
    /// Search the component catalog
    Search {
        /// Text matched against name, description and tags
        query: Option<String>,

        /// Filter by category (case-insensitive)
        #[clap(long)]
        category: Option<String>,

        /// Match any of these tags; repeatable
        #[clap(long = "tag")]
        tags: Vec<String>,

        /// Filter by author name
        #[clap(long)]
        author: Option<String>,

        /// Minimum rating
        #[clap(long)]
        min_rating: Option<f64>,

        /// Maximum number of results
        #[clap(long)]
        limit: Option<usize>,

        /// Number of results to skip
        #[clap(long, default_value = "0")]
        offset: usize,

        /// Output results as JSON
        #[clap(long)]
        json: bool,
    },

    /// Show full details for one component
    Show {
        /// Component id
        id: String,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Install a component into the project
    Install {
        /// Component id
        id: String,

        /// Components directory (defaults to component_base_path)
        #[clap(long)]
        target: Option<PathBuf>,

        /// Replace an existing install of the same name
        #[clap(long)]
        force: bool,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// List components installed in the project
    List {
        /// Components directory (defaults to component_base_path)
        #[clap(long)]
        base_path: Option<PathBuf>,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },
}

impl ComponentSubcommand {
    pub async fn execute(self, marketplace: &Marketplace) -> Result<()> {
        match self {
            ComponentSubcommand::Search {
                query,
                category,
                tags,
                author,
                min_rating,
                limit,
                offset,
                json,
            } => {
                let args = SearchArgs {
                    query,
                    category,
                    tags,
                    author,
                    min_rating,
                    limit,
                    offset,
                };
                if json {
                    return print_tool_response(marketplace, ToolRequest::Search(args)).await;
                }
                execute_search(marketplace, &args).await
            }
            ComponentSubcommand::Show { id, json } => {
                if json {
                    let request = ToolRequest::GetDetails(GetDetailsArgs { component_id: id });
                    return print_tool_response(marketplace, request).await;
                }
                execute_show(marketplace, &id).await
            }
            ComponentSubcommand::Install {
                id,
                target,
                force,
                json,
            } => {
                let args = InstallArgs {
                    component_id: id,
                    target_path: target,
                    force_overwrite: force,
                };
                if json {
                    return print_tool_response(marketplace, ToolRequest::Install(args)).await;
                }
                execute_install(marketplace, &args).await
            }
            ComponentSubcommand::List { base_path, json } => {
                if json {
                    let request = ToolRequest::ListInstalled(ListInstalledArgs { base_path });
                    return print_tool_response(marketplace, request).await;
                }
                execute_list(marketplace, base_path).await
            }
        }
    }
}

/// Print the boundary response as pretty JSON; fail the command if it failed
pub async fn print_tool_response(marketplace: &Marketplace, request: ToolRequest) -> Result<()> {
    let tool = request.name();
    let response = marketplace.handle(request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    // validate reports carry no success flag
    let succeeded = response
        .get("success")
        .or_else(|| response.get("marketplace_ready"))
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(true);
    if !succeeded {
        anyhow::bail!("{tool} did not succeed");
    }
    Ok(())
}

/// Row for search results
#[derive(Tabled)]
struct SearchResultRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Rating")]
    rating: String,
    #[tabled(rename = "Description")]
    description: String,
}

/// Row for installed components
#[derive(Tabled)]
struct InstalledRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Installed")]
    installed_at: String,
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn render(mut table: Table) -> String {
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string()
}

async fn execute_search(marketplace: &Marketplace, args: &SearchArgs) -> Result<()> {
    let results = marketplace.search(args).await?;

    if results.is_empty() {
        println!("\nNo components found.");
        return Ok(());
    }

    println!("\nFound {} component(s):\n", results.len());

    let rows: Vec<SearchResultRow> = results
        .iter()
        .map(|component| SearchResultRow {
            id: component.id.clone(),
            version: component.version.clone(),
            category: component.category.clone(),
            rating: format!("{:.1}", component.rating),
            description: truncate(component.short_description(), 50),
        })
        .collect();

    println!("{}", render(Table::new(&rows)));
    Ok(())
}

async fn execute_show(marketplace: &Marketplace, id: &str) -> Result<()> {
    let component = marketplace.get_details(id).await?;

    println!();
    println!("Component: {} ({})", component.display_name, component.id);
    println!("Version:   v{}", component.version);
    println!("Category:  {}", component.category);
    println!("Author:    {}", component.author.name);
    println!("License:   {}", component.license);
    if !component.tags.is_empty() {
        println!("Tags:      {}", component.tags.join(", "));
    }
    println!(
        "Rating:    {:.1} ({} reviews, {} downloads)",
        component.rating, component.review_count, component.downloads
    );

    println!();
    println!("Description:");
    for line in component.description.lines() {
        println!("  {line}");
    }

    println!();
    println!("Source:");
    println!("  {} ({})", component.repository_url, component.branch);
    if let Some(subpath) = &component.subpath {
        println!("  subpath: {subpath}");
    }

    println!();
    println!("Installation:");
    println!("  wmx install {}", component.id);

    if !component.versions.is_empty() {
        println!();
        println!("Available versions:");
        for version in &component.versions {
            let marker = if version.version == component.version {
                " (latest)"
            } else {
                ""
            };
            println!(
                "  v{}{} - {}",
                version.version,
                marker,
                version.release_date.format("%Y-%m-%d")
            );
        }
    }

    Ok(())
}

async fn execute_install(marketplace: &Marketplace, args: &InstallArgs) -> Result<()> {
    println!("Installing {}...", args.component_id);

    let outcome = marketplace.install(args).await?;
    let result = outcome.result;

    if !result.success {
        for error in &result.errors {
            eprintln!("  {error}");
        }
        anyhow::bail!("{}", result.message);
    }

    println!(
        "\nInstalled {} v{} to {}",
        outcome.component.name,
        outcome.component.version,
        result.install_path.display()
    );
    println!("  {} file(s) copied", result.files_installed.len());
    Ok(())
}

async fn execute_list(marketplace: &Marketplace, base_path: Option<PathBuf>) -> Result<()> {
    let installed = marketplace.list_installed(base_path.as_deref()).await?;

    if installed.is_empty() {
        println!("No components installed.");
        return Ok(());
    }

    let rows: Vec<InstalledRow> = installed
        .iter()
        .map(|component| InstalledRow {
            name: component.name.clone(),
            version: component.version.clone().unwrap_or_else(|| "-".to_string()),
            id: component.id.clone().unwrap_or_else(|| "-".to_string()),
            installed_at: component
                .installed_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    println!("{}", render(Table::new(&rows)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 50), "short");
        let long = "é".repeat(60);
        let cut = truncate(&long, 50);
        assert_eq!(cut.chars().count(), 50);
        assert!(cut.ends_with("..."));
    }
}
