//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CRM batch SDK command-line client
#[derive(Parser, Debug)]
#[command(name = "crm-batch-sdk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Client configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Webhook URL, overrides the config file
    #[arg(short, long, global = true)]
    pub webhook_url: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Traverse a list method, printing one record per line
    List {
        /// List method, e.g. crm.deal.list
        method: String,

        /// Sort order as a JSON object, e.g. '{"ID":"DESC"}'
        #[arg(long)]
        order: Option<String>,

        /// Filter as a JSON object, e.g. '{"=STAGE_ID":"WON"}'
        #[arg(long)]
        filter: Option<String>,

        /// Returned fields (comma-separated)
        #[arg(long)]
        select: Option<String>,

        /// Extra method parameters as a JSON object
        #[arg(long)]
        params: Option<String>,

        /// Maximum number of records
        #[arg(long)]
        limit: Option<usize>,

        /// Payload layout of the method family
        #[arg(long)]
        variant: Option<Variant>,

        /// Key field used for windows
        #[arg(long)]
        key_field: Option<String>,

        /// The method cannot be sorted in reverse, page sequentially instead
        #[arg(long)]
        no_reverse_probe: bool,

        /// Let the remote side run window commands concurrently
        #[arg(long)]
        parallel: bool,
    },

    /// Call a single method and print its result
    Call {
        /// Method name, e.g. crm.deal.get
        method: String,

        /// Method parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
    },
}

/// Payload layout of a list method
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Variant {
    /// Records are the payload (`crm.deal.list`)
    Flat,
    /// Records under `items` (`crm.item.list`)
    Items,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one value per line)
    Json,
    /// Human-readable output
    Pretty,
}
