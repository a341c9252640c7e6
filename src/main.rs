use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ghprovision::provision::DefinitionSet;
use ghprovision::{
    CancellationToken, Config, GitHubClient, Normalizer, ProvisionConfig, ProvisioningOrchestrator,
    ProvisioningResult, ResourceSpec,
};

#[derive(Parser, Debug)]
#[command(name = "ghprovision")]
#[command(version = "0.1.0")]
#[command(about = "Provision a GitHub repository, labels, milestones, issues and project links")]
struct Args {
    /// JSON file with the issues to provision ({"issues": [...]})
    #[arg(short, long)]
    file: PathBuf,

    /// Target repository, "owner/name" or "name" for the authenticated user
    #[arg(short, long)]
    repo: String,

    /// Projects-V2 board to add created issues to
    #[arg(short, long)]
    project: Option<String>,

    /// Label/milestone definitions used to normalize names
    #[arg(long)]
    defaults: Option<PathBuf>,

    /// Show what would be created without calling GitHub
    #[arg(long)]
    dry_run: bool,

    /// Output format (text, json, markdown)
    #[arg(long, default_value = "text")]
    format: String,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Create the repository as public
    #[arg(long)]
    public: bool,

    /// Hide progress bars
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = if args.dry_run {
        Config::from_env_without_token()?
    } else {
        Config::from_env()?
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("ghprovision={}", config.log_level).parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    let input = std::fs::read_to_string(&args.file)?;
    let spec = ResourceSpec::from_json(&input)?;
    tracing::info!("Loaded {} issues from {}", spec.issues.len(), args.file.display());

    let github = GitHubClient::from_config(&config)?;

    let provision_config = ProvisionConfig {
        show_progress: !args.quiet,
        private_repository: !args.public,
        ..ProvisionConfig::from(&config)
    };

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current call");
            ctrl_c.cancel();
        }
    });

    let mut orchestrator = ProvisioningOrchestrator::new(Arc::new(github), provision_config)
        .with_cancellation(token);
    if let Some(ref path) = args.defaults {
        let definitions = DefinitionSet::from_file(path)?;
        tracing::info!(
            "Loaded {} label and {} milestone definitions",
            definitions.labels.len(),
            definitions.milestones.len()
        );
        orchestrator = orchestrator.with_normalizer(Normalizer::from_definitions(definitions));
    }

    match orchestrator
        .run(&spec, &args.repo, args.project.as_deref(), args.dry_run)
        .await
    {
        Ok(result) => {
            output_result(&result, &args)?;
            Ok(())
        }
        Err(halted) => {
            output_result(&halted.result, &args)?;
            Err(anyhow::Error::new(halted.source).context("Provisioning halted"))
        }
    }
}

fn output_result(result: &ProvisioningResult, args: &Args) -> anyhow::Result<()> {
    let output = match args.format.as_str() {
        "json" => serde_json::to_string_pretty(result)?,
        "markdown" => format_markdown(result),
        _ => format_text(result),
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output)?;
        tracing::info!("Report written to: {}", path);
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn format_text(result: &ProvisioningResult) -> String {
    let mut output = String::new();
    let issues = &result.issue_outcome;

    output.push_str("\n=== Provisioning Report ===\n\n");

    if let Some(ref url) = result.repository_url {
        output.push_str(&format!("Repository: {}\n", url));
    }
    match (&result.project_name, &result.project_id) {
        (Some(name), Some(id)) => output.push_str(&format!("Project: {} ({})\n", name, id)),
        (Some(name), None) => output.push_str(&format!("Project: {} (not found)\n", name)),
        _ => {}
    }
    if let Some(ref err) = result.project_lookup_error {
        output.push_str(&format!("  lookup error: {}\n", err));
    }

    output.push_str(&format!("\nLabels: {}\n", result.created_labels.len()));
    for (name, err) in &result.failed_labels {
        output.push_str(&format!("  ! {}: {}\n", name, err));
    }

    output.push_str(&format!("Milestones: {}\n", result.processed_milestones.len()));
    for (name, id) in &result.processed_milestones {
        output.push_str(&format!("  - {} (#{})\n", name, id));
    }
    for (name, err) in &result.failed_milestones {
        output.push_str(&format!("  ! {}: {}\n", name, err));
    }

    output.push_str(&format!(
        "\nIssues: {} created, {} skipped, {} failed\n",
        issues.created.len(),
        issues.skipped.len(),
        issues.failed.len()
    ));
    for (url, _) in &issues.created {
        output.push_str(&format!("  + {}\n", url));
    }
    for title in &issues.skipped {
        output.push_str(&format!("  = {} (already open)\n", title));
    }
    for err in &issues.errors {
        output.push_str(&format!("  ! {}\n", err));
    }
    for (title, logins) in &issues.invalid_assignee_issues {
        output.push_str(&format!(
            "  ? {}: invalid assignees {}\n",
            title,
            logins.join(", ")
        ));
    }

    if result.project_id.is_some() {
        output.push_str(&format!(
            "\nProject items: {} added, {} failed\n",
            result.project_items_added,
            result.project_items_failed.len()
        ));
        for (id, err) in &result.project_items_failed {
            output.push_str(&format!("  ! {}: {}\n", id, err));
        }
    }

    if let Some(ref fatal) = result.fatal_error {
        output.push_str(&format!("\nFATAL: {}\n", fatal));
    }

    output.push_str(&format!(
        "\nGenerated on: {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}

fn format_markdown(result: &ProvisioningResult) -> String {
    let mut output = String::new();
    let issues = &result.issue_outcome;

    output.push_str("# Provisioning Report\n\n");

    if let Some(ref fatal) = result.fatal_error {
        output.push_str(&format!("> **Halted:** {}\n\n", fatal));
    }

    output.push_str("| Resource | Value |\n|----------|-------|\n");
    if let Some(ref url) = result.repository_url {
        output.push_str(&format!("| Repository | {} |\n", url));
    }
    if let Some(ref name) = result.project_name {
        output.push_str(&format!(
            "| Project | {} ({}) |\n",
            name,
            result.project_id.as_deref().unwrap_or("not found")
        ));
    }
    output.push_str(&format!(
        "| Labels | {} ok, {} failed |\n",
        result.created_labels.len(),
        result.failed_labels.len()
    ));
    output.push_str(&format!(
        "| Milestones | {} ok, {} failed |\n",
        result.processed_milestones.len(),
        result.failed_milestones.len()
    ));
    output.push_str(&format!(
        "| Issues | {} created, {} skipped, {} failed |\n",
        issues.created.len(),
        issues.skipped.len(),
        issues.failed.len()
    ));
    output.push_str(&format!(
        "| Project items | {} added, {} failed |\n",
        result.project_items_added,
        result.project_items_failed.len()
    ));

    if !issues.created.is_empty() {
        output.push_str("\n## Created Issues\n\n");
        for (url, _) in &issues.created {
            output.push_str(&format!("- {}\n", url));
        }
    }

    let failures: Vec<String> = result
        .failed_labels
        .iter()
        .chain(result.failed_milestones.iter())
        .chain(result.project_items_failed.iter())
        .map(|(name, err)| format!("**{}**: {}", name, err))
        .chain(issues.errors.iter().cloned())
        .collect();
    if !failures.is_empty() {
        output.push_str("\n## Failures\n\n");
        for failure in failures {
            output.push_str(&format!("- {}\n", failure));
        }
    }

    if !issues.invalid_assignee_issues.is_empty() {
        output.push_str("\n## Invalid Assignees\n\n");
        for (title, logins) in &issues.invalid_assignee_issues {
            output.push_str(&format!("- **{}**: {}\n", title, logins.join(", ")));
        }
    }

    output.push_str(&format!(
        "\n---\n*Generated on {}*\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}
