//! DTS Insight - document categorization and analytics
//!
//! A CLI tool that categorizes tracked documents with a remote prediction
//! service (falling back to keyword scoring) and derives analytics and
//! insights from the document collection.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid arguments, unreadable store or config, etc.)

mod analysis;
mod categorizer;
mod cli;
mod config;
mod models;
mod report;
mod service;
mod store;

use anyhow::{Context, Result};
use categorizer::{Categorizer, HttpPredictionClient, PredictorConfig};
use chrono::Utc;
use cli::{Args, Command, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use service::{DocumentService, ServiceSettings};
use std::sync::Arc;
use std::time::Duration;
use store::{CategoryOverride, DocumentFilter, DocumentStore, NewDocument};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if args.command == Command::InitConfig {
        return handle_init_config();
    }

    init_logging(&args);

    info!("dtsinsight v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Command failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .dtsinsight.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the store path, prediction service, and analytics.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` wins over the verbosity flags.
fn init_logging(args: &Args) {
    let level = args.log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch the parsed command.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let store = DocumentStore::open(&config.general.store)
        .with_context(|| format!("Failed to open document store {}", config.general.store))?;
    let categorizer = build_categorizer(&config);
    debug!("Remote prediction active: {}", categorizer.has_remote());
    let settings = ServiceSettings {
        backfill: config.analytics.backfill,
        concurrency: config.general.concurrency,
        recent_window_days: config.analytics.recent_window_days,
        sample_size: config.analytics.sample_size,
    };
    let mut service = DocumentService::new(store, categorizer, settings);
    debug!(
        "{} documents in {}",
        service.store().len(),
        service.store().path().display()
    );

    let output = match args.command.clone() {
        Command::Analytics => {
            let payload = service.analytics(Utc::now()).await?;
            render(&args, &payload, report::generate_analytics_markdown)?
        }
        Command::Insights => {
            let payload = service.insights().await?;
            render(&args, &payload, report::generate_insights_markdown)?
        }
        Command::Categorize { title, description } => {
            let result = service.categorize(&title, &description).await;
            render(&args, &result, report::generate_categorization_markdown)?
        }
        Command::Documents {
            category,
            status,
            limit,
        } => {
            let filter = DocumentFilter {
                category,
                status,
                limit: Some(limit),
            };
            let listing = service.categorized_documents(&filter).await?;
            render(&args, &listing, report::generate_documents_markdown)?
        }
        Command::Register {
            title,
            description,
            doc_type,
            registered_by,
        } => {
            let new = NewDocument {
                title,
                description,
                doc_type,
                registered_by,
            };
            let receipt = service.register(new, Utc::now()).await?;
            render(&args, &receipt, report::generate_receipt_markdown)?
        }
        Command::Override {
            dts_number,
            category,
            confidence,
            by,
            reason,
        } => {
            let correction = CategoryOverride {
                category,
                confidence,
                by,
                reason,
            };
            service.override_category(&dts_number, correction, Utc::now())?;
            format!("✅ Category of {} overridden.\n", dts_number)
        }
        Command::SetCategory {
            dts_number,
            category,
        } => {
            service.set_manual_category(&dts_number, &category)?;
            format!("✅ Manual category of {} set to {}.\n", dts_number, category.trim())
        }
        Command::Recategorize => {
            let count = service.recategorize_all(!args.quiet).await?;
            format!("✅ Re-categorized {} documents.\n", count)
        }
        Command::InitConfig => return handle_init_config(),
    };

    write_output(&args, &output)
}

/// Remote-first categorizer, or keyword scoring when the service is disabled.
fn build_categorizer(config: &Config) -> Categorizer {
    if !config.predictor.enabled {
        info!("Remote prediction disabled, using keyword scoring");
        return Categorizer::keyword_only();
    }

    let predictor_config = PredictorConfig {
        url: config.predictor.url.clone(),
        timeout_seconds: config.predictor.timeout_seconds,
    };

    match HttpPredictionClient::new(predictor_config) {
        Ok(client) => {
            debug!("Using prediction service at {}", client.url());
            Categorizer::with_remote(
                Arc::new(client),
                Duration::from_secs(config.predictor.timeout_seconds),
            )
        }
        Err(e) => {
            warn!("Failed to create prediction client, using keyword scoring: {}", e);
            Categorizer::keyword_only()
        }
    }
}

/// Render `payload` in the requested format.
fn render<T: serde::Serialize>(
    args: &Args,
    payload: &T,
    markdown: fn(&T) -> String,
) -> Result<String> {
    match args.format {
        OutputFormat::Json => report::generate_json(payload),
        OutputFormat::Markdown => Ok(markdown(payload)),
    }
}

/// Write to `--output` if given, stdout otherwise.
fn write_output(args: &Args, content: &str) -> Result<()> {
    match args.output {
        Some(ref path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!("Output saved to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
