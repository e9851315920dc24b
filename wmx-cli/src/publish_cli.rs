//! Validation, publish preview and scaffold commands

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use wmx_core::publish::{
    PublishOverrides, PublishPlan, PublishResult, PublishingTemplate, TEMPLATE_INSTRUCTIONS,
};
use wmx_core::tools::{NoArgs, PublishArgs, ValidateArgs};
use wmx_core::{Marketplace, ToolRequest};

use crate::component_cli::print_tool_response;

#[derive(Subcommand, Debug)]
pub enum PublishSubcommand {
    /// Check a component directory against the marketplace packaging rules
    Validate {
        /// Component directory
        path: PathBuf,

        /// Report findings without the stricter publish checks
        #[clap(long)]
        advisory: bool,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Prepare a component for publishing, or preview the result with --dry-run
    Publish {
        /// Component directory
        path: PathBuf,

        /// Preview the marketplace entry instead of listing what would be uploaded
        #[clap(long)]
        dry_run: bool,

        /// Repository name (defaults to the component name)
        #[clap(long)]
        repo_name: Option<String>,

        /// Marketplace category override
        #[clap(long)]
        category: Option<String>,

        /// Tag override; repeat for several
        #[clap(long = "tag")]
        tags: Vec<String>,

        #[clap(long)]
        author_name: Option<String>,

        #[clap(long)]
        author_email: Option<String>,

        #[clap(long)]
        author_organization: Option<String>,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Print the component scaffold, or write it with --output
    Template {
        /// Directory to write the scaffold into
        #[clap(long)]
        output: Option<PathBuf>,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },
}

impl PublishSubcommand {
    pub async fn execute(self, marketplace: &Marketplace) -> Result<()> {
        match self {
            PublishSubcommand::Validate {
                path,
                advisory,
                json,
            } => {
                let args = ValidateArgs {
                    component_path: path,
                    strict: !advisory,
                };
                if json {
                    return print_tool_response(marketplace, ToolRequest::Validate(args)).await;
                }
                execute_validate(marketplace, &args).await
            }
            PublishSubcommand::Publish {
                path,
                dry_run,
                repo_name,
                category,
                tags,
                author_name,
                author_email,
                author_organization,
                json,
            } => {
                let args = PublishArgs {
                    component_path: path,
                    overrides: PublishOverrides {
                        repo_name,
                        category,
                        tags: (!tags.is_empty()).then_some(tags),
                        author_name,
                        author_email,
                        author_organization,
                    },
                };
                if json {
                    let request = if dry_run {
                        ToolRequest::PublishDryRun(args)
                    } else {
                        ToolRequest::PrepareForPublishing(args)
                    };
                    return print_tool_response(marketplace, request).await;
                }
                if dry_run {
                    execute_dry_run(marketplace, &args).await
                } else {
                    execute_prepare(marketplace, &args).await
                }
            }
            PublishSubcommand::Template { output, json } => match output {
                Some(dir) => execute_write_template(&dir),
                None if json => {
                    let request = ToolRequest::GetPublishingTemplate(NoArgs {});
                    print_tool_response(marketplace, request).await
                }
                None => execute_show_template(),
            },
        }
    }
}

/// Row for the publish file list
#[derive(Tabled)]
struct PublishFileRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Type")]
    file_type: String,
    #[tabled(rename = "Size")]
    size: u64,
}

async fn execute_validate(marketplace: &Marketplace, args: &ValidateArgs) -> Result<()> {
    let report = marketplace
        .validate(&args.component_path, args.strict)
        .await?;

    println!("Component: {}", report.component_name);
    println!("Path:      {}", report.component_path);
    println!();
    for (requirement, met) in &report.requirements_met {
        let marker = if *met { "ok" } else { "missing" };
        println!("  {requirement:<16} {marker}");
    }

    if !report.issues.is_empty() {
        println!("\nIssues:");
        for issue in &report.issues {
            println!("  - {issue}");
        }
    }
    if !report.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &report.warnings {
            println!("  - {warning}");
        }
    }
    if !report.suggested_improvements.is_empty() {
        println!("\nSuggestions:");
        for suggestion in &report.suggested_improvements {
            println!("  - {suggestion}");
        }
    }

    println!();
    if report.marketplace_ready() {
        println!("Ready for the marketplace.");
        Ok(())
    } else {
        anyhow::bail!("{} is not ready for the marketplace", report.component_name)
    }
}

async fn execute_prepare(marketplace: &Marketplace, args: &PublishArgs) -> Result<()> {
    match marketplace.prepare_for_publishing(args).await? {
        PublishPlan::Ready(bundle) => {
            println!(
                "{} v{} ({}) is ready to publish",
                bundle.component.display_name, bundle.component.version, bundle.component.category
            );
            println!("Repository: {}", bundle.git_repo.url);
            println!();

            let rows: Vec<PublishFileRow> = bundle
                .files_to_publish
                .iter()
                .map(|file| PublishFileRow {
                    path: file.path.clone(),
                    file_type: file.file_type.to_string(),
                    size: file.size,
                })
                .collect();
            let table = Table::new(&rows)
                .with(Style::rounded())
                .with(Modify::new(Rows::first()).with(Alignment::center()))
                .to_string();
            println!("{table}");

            println!("\nNext steps:");
            for step in &bundle.publishing_steps {
                println!("  {step}");
            }
            Ok(())
        }
        PublishPlan::NotReady(rejection) => {
            for issue in &rejection.validation_issues {
                eprintln!("  - {issue}");
            }
            for suggestion in &rejection.suggestions {
                eprintln!("  hint: {suggestion}");
            }
            anyhow::bail!("{}", rejection.message)
        }
    }
}

async fn execute_dry_run(marketplace: &Marketplace, args: &PublishArgs) -> Result<()> {
    match marketplace.publish_dry_run(args).await {
        PublishResult::Simulated(simulation) => {
            println!("{}", simulation.message);
            println!();
            println!("Marketplace id: {}", simulation.component_id);
            println!("Repository:     {}", simulation.git_repository);
            println!("Listing:        {}", simulation.marketplace_url);
            println!(
                "Files:          {}",
                simulation.publishing_details.files_to_upload
            );
            Ok(())
        }
        PublishResult::Failed(failure) => {
            anyhow::bail!("{} ({}): {}", failure.message, failure.step, failure.error)
        }
    }
}

fn execute_show_template() -> Result<()> {
    let template = PublishingTemplate::new()?;

    println!("Files to create:");
    for file in &template.files_to_create {
        println!("  {:<14} {}", file.path, file.description);
    }
    println!("\nRecommended:");
    for file in &template.recommended_files {
        println!("  {file}");
    }
    println!();
    for step in TEMPLATE_INSTRUCTIONS {
        println!("{step}");
    }
    println!("\nRun `wmx template --output <dir>` to write the scaffold.");
    Ok(())
}

fn execute_write_template(dir: &std::path::Path) -> Result<()> {
    let written = PublishingTemplate::new()?.write_to(dir)?;
    println!("Created {} file(s) in {}:", written.len(), dir.display());
    for path in &written {
        println!("  {}", path.display());
    }
    Ok(())
}
