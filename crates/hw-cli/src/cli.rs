//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Client home/work analytics.
///
/// Infers likely home and work places from login geo-events and prepares
/// heatmap and meeting-planner inputs.
#[derive(Debug, Parser)]
#[command(name = "hw", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import JSONL rows from stdin.
    Import {
        /// Which table the rows belong to.
        #[arg(long, value_enum, default_value_t = ImportKind::Geo)]
        kind: ImportKind,
    },

    /// Infer home and work places with activity histograms.
    Homework {
        /// Client to analyse (repeatable).
        #[arg(long = "client", required = true)]
        clients: Vec<String>,

        #[command(flatten)]
        window: WindowArgs,

        /// Qualifying event action (repeatable).
        #[arg(long = "event")]
        events: Vec<String>,
    },

    /// Export heat points for one client or a debtor portfolio.
    Heatmap(HeatmapArgs),

    /// Build the meeting-planner context for one client.
    PlanContext {
        /// Client to plan for.
        #[arg(long)]
        client: String,

        /// Period preset: 7d, 30d, 90d or all.
        #[arg(long, default_value = "30d")]
        period: String,
    },

    /// Show stored event volume per action.
    Status,
}

/// Time window selection shared by query commands.
#[derive(Debug, Clone, Default, Args)]
pub struct WindowArgs {
    /// Period preset: 7d, 30d, 90d or all. Overrides --from/--to.
    #[arg(long)]
    pub period: Option<String>,

    /// Start of the window (YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS]).
    #[arg(long)]
    pub from: Option<String>,

    /// End of the window (YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS]).
    #[arg(long)]
    pub to: Option<String>,
}

/// Arguments for the heatmap command.
///
/// Without `--client`, points come from every client with outstanding debt
/// that passes the portfolio filters.
#[derive(Debug, Clone, Default, Args)]
pub struct HeatmapArgs {
    /// Client to map. Portfolio filters are ignored when set.
    #[arg(long)]
    pub client: Option<String>,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Qualifying event action (repeatable).
    #[arg(long = "event")]
    pub events: Vec<String>,

    /// Maximum number of points (clamped to 1000..=100000).
    #[arg(long, allow_negative_numbers = true)]
    pub limit: Option<i64>,

    /// Minimum outstanding debt.
    #[arg(long)]
    pub debt_min: Option<f64>,

    /// Maximum outstanding debt.
    #[arg(long)]
    pub debt_max: Option<f64>,

    /// Overdue bucket (repeatable).
    #[arg(long = "bucket")]
    pub buckets: Vec<String>,

    /// Non-performing loan flag: 1 or 0.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub npl: Option<u8>,

    /// Keep clients whose latest qualifying event is within this many days.
    #[arg(long)]
    pub last_login_days: Option<u32>,
}

/// Import targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImportKind {
    /// Geo events.
    Geo,
    /// Card transactions.
    Transactions,
    /// Client home cities.
    Cities,
    /// Debt contracts.
    Debts,
}
