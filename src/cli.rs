use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Verify mining registrations against SUNAT and REINFO
#[derive(Debug, Parser)]
#[command(name = "veta-scrape", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON config file; `VETA_*` environment variables are applied on top
    #[arg(global = true, long, value_name = "FILE", env = "VETA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show the browser window
    #[arg(global = true, long)]
    pub headed: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(global = true, short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run both lookups over a batch and cross-reference RECPO
    Verify(VerifyArgs),
    /// Look up the REINFO unique code of one RUC
    Reinfo(SingleArgs),
    /// Look up the SUNAT economic activity of one RUC
    Sunat(SingleArgs),
    /// Check that both portals answer
    Probe,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// RUCs to verify
    pub rucs: Vec<String>,

    /// File with one RUC per line (`RUC` or `RUC,NAME`)
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// RECPO JSON file (RUC -> registration number)
    #[arg(long, value_name = "FILE", conflicts_with = "recpo_dir")]
    pub recpo: Option<PathBuf>,

    /// Directory holding monthly `recpo_YYYY-MM.json` files
    #[arg(long, value_name = "DIR")]
    pub recpo_dir: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Only emit rows with at least one anomaly
    #[arg(long)]
    pub only_flagged: bool,
}

#[derive(Debug, Args)]
pub struct SingleArgs {
    pub ruc: String,

    /// Include the retry state path in the output
    #[arg(long)]
    pub trace: bool,
}
