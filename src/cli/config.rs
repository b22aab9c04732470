use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::config::AnalysisConfig;

pub const DEFAULT_CONFIG_FILE: &str = "dom-analyzer.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "dom-analyzer",
    version,
    about = "Snapshot, diff and pattern analysis of page DOM dumps"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: dom-analyzer.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Append one JSON line per analysis pass to this file
    #[arg(long, global = true)]
    pub trace: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a page dump
    Analyze {
        /// Page dump (JSON) to analyze
        #[arg(long)]
        input: String,

        /// Earlier dump of the same page, diffed against the input
        #[arg(long)]
        baseline: Option<String>,

        /// Write the full result JSON here instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Session id for the result store
        #[arg(long)]
        session: Option<String>,

        /// Post the diff summary to the configured delivery endpoint
        #[arg(long, default_value_t = false)]
        deliver: bool,
    },

    /// Diff two page dumps
    Diff {
        #[arg(long)]
        before: String,

        #[arg(long)]
        after: String,
    },

    /// Run pattern recognition on a page dump
    Patterns {
        #[arg(long)]
        input: String,

        /// YAML pattern library replacing the built-in catalog
        #[arg(long)]
        library: Option<String>,
    },

    /// Answer JSON requests on stdin, one per line
    Serve {
        #[arg(long)]
        session: Option<String>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `dom-analyzer.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_dir")]
    pub directory: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: default_store_dir(),
        }
    }
}

fn default_store_dir() -> String {
    ".dom-analyzer".to_string()
}

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            warn!(path = config_path, error = %e, "malformed config file, using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

/// `RUST_LOG`-style filter for a `-v` count.
pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
