use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::analysis;
use crate::claude;
use crate::energy::ModelTier;
use crate::report;
use crate::shared::Config;

#[derive(Parser)]
#[command(name = "cc-insights")]
#[command(version)]
#[command(about = "Analyze chat logs: topics, token usage, cost and energy estimates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze an exported conversations archive by topic
    Conversations {
        /// Path to conversations.json (defaults to the configured archive)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Output JSON file
        #[arg(short, long, default_value = "conversation_data.json")]
        output: PathBuf,

        /// Number of topic clusters; 0 uses keyword labeling instead
        #[arg(short, long)]
        clusters: Option<usize>,

        /// Model tier for cost/energy rates (haiku|sonnet|opus|default)
        #[arg(short, long)]
        model: Option<String>,

        /// Also generate an HTML dashboard
        #[arg(long)]
        visualize: bool,

        /// Dashboard output path
        #[arg(long, default_value = "conversation_dashboard.html")]
        dashboard_out: PathBuf,
    },

    /// Analyze per-project session logs under the Claude data directory
    Projects {
        /// Claude data directory (defaults to the configured one)
        #[arg(long)]
        claude_dir: Option<PathBuf>,

        /// Output JSON file
        #[arg(short, long, default_value = "claude_code_data.json")]
        output: PathBuf,

        /// Also generate an HTML dashboard
        #[arg(long)]
        visualize: bool,

        /// Dashboard output path
        #[arg(long, default_value = "claude_code_dashboard.html")]
        dashboard_out: PathBuf,
    },
}

/// Execute the parsed command. Config supplies defaults; flags win.
pub fn run(cli: Cli) -> Result<()> {
    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "could not load config, using defaults");
        Config::default()
    });

    match cli.command {
        Commands::Conversations {
            path,
            output,
            clusters,
            model,
            visualize,
            dashboard_out,
        } => {
            let path = path.unwrap_or(config.conversations_path);
            let clusters = clusters.unwrap_or(config.default_clusters);
            let tier = model
                .as_deref()
                .map(ModelTier::from_name)
                .unwrap_or(config.default_model_tier);

            let records = analysis::load_conversations(&path)?;
            let result = analysis::analyze(&records, clusters);
            let summary = analysis::build_summary(&result, tier);

            report::print_topic_report(&summary);
            report::write_json(&summary, &output)?;
            if visualize {
                report::html::write_conversation_dashboard(&summary, &dashboard_out)?;
            }
            Ok(())
        }
        Commands::Projects {
            claude_dir,
            output,
            visualize,
            dashboard_out,
        } => {
            let claude_dir = claude_dir.unwrap_or(config.claude_dir);

            let projects = claude::scan_projects(&claude_dir)?;
            let summary = claude::build_summary(&projects);

            report::print_project_report(&summary);
            report::write_json(&summary, &output)?;
            if visualize {
                report::html::write_project_dashboard(&summary, &dashboard_out)?;
            }
            Ok(())
        }
    }
}
