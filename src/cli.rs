//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::BackfillMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DTS Insight - categorization and analytics for tracked documents
///
/// Categorizes documents with a remote prediction service (falling back to
/// keyword scoring) and derives analytics and insights from the collection.
///
/// Examples:
///   dtsinsight analytics
///   dtsinsight insights --format json --output insights.json
///   dtsinsight categorize --title "Purchase Request" --description "laptops"
///   dtsinsight register --title "Board memo" --type Institute
///   dtsinsight --no-remote recategorize
///   dtsinsight init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .dtsinsight.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path of the JSON document store
    #[arg(long, global = true, value_name = "FILE", env = "DTS_STORE")]
    pub store: Option<PathBuf>,

    /// Remote prediction endpoint URL
    #[arg(long, global = true, value_name = "URL", env = "LOCAL_AI_URL")]
    pub predict_url: Option<String>,

    /// Skip the remote prediction service and use keyword scoring only
    #[arg(long, global = true)]
    pub no_remote: bool,

    /// Remote prediction timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Number of concurrent backfill categorizations
    #[arg(long, global = true, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Whether backfilled categories are written back to the store
    #[arg(long, global = true, value_name = "MODE")]
    pub backfill: Option<BackfillMode>,

    /// Output format (markdown, json)
    #[arg(long, global = true, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Aggregate analytics over the whole collection
    Analytics,

    /// Heuristic, workload and workflow insights
    Insights,

    /// Categorize a title and description without storing anything
    Categorize {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// List documents with their categories
    Documents {
        /// Exact category to match
        #[arg(long)]
        category: Option<String>,

        /// Status to match (received, forwarded, ended)
        #[arg(long)]
        status: Option<String>,

        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Register a new document and categorize it
    Register {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Manually assigned category
        #[arg(long = "type", value_name = "CATEGORY", default_value = "")]
        doc_type: String,

        #[arg(long, value_name = "NAME")]
        registered_by: Option<String>,
    },

    /// Manually replace a document's derived category
    Override {
        /// DTS number of the document
        dts_number: String,

        #[arg(long)]
        category: String,

        #[arg(long)]
        confidence: Option<f64>,

        #[arg(long, value_name = "NAME")]
        by: String,

        #[arg(long, default_value = "")]
        reason: String,
    },

    /// Set a document's manually assigned category
    SetCategory {
        /// DTS number of the document
        dts_number: String,

        /// New category
        category: String,
    },

    /// Re-run categorization for every stored document
    Recategorize,

    /// Generate a default .dtsinsight.toml configuration file
    InitConfig,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.command == Command::InitConfig {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.predict_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Prediction URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        match &self.command {
            Command::Categorize { title, description }
                if title.trim().is_empty() && description.trim().is_empty() =>
            {
                Err("Provide a title or a description to categorize".to_string())
            }
            Command::Register { title, .. } if title.trim().is_empty() => {
                Err("Title is required".to_string())
            }
            Command::Override { confidence: Some(c), .. } if !(0.0..=1.0).contains(c) => {
                Err("Confidence must be between 0.0 and 1.0".to_string())
            }
            Command::Override { category, .. } if category.trim().is_empty() => {
                Err("Category is required".to_string())
            }
            Command::SetCategory { category, .. } if category.trim().is_empty() => {
                Err("Category is required".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
