//! Feature Stats command-line front end
//!
//! # CLI Commands
//!
//! - `query` - Run a grouped statistics query and print the result tree
//! - `fields` - List the fields available for grouping and statistics
//! - `extrude` - Evaluate an extrusion expression for every feature
//! - `check-config` - Validate configuration file
//!
//! # Configuration
//!
//! Configuration is read from:
//! 1. `--config` path (TOML file)
//! 2. `FSTATS_CONFIG` environment variable (path to TOML file)
//! 3. Default configuration
//!
//! `FSTATS_*` environment variables override file values in every case.
//!
//! # Example Usage
//!
//! ```bash
//! feature-stats --dataset counties.json query \
//!   --stat POP2007:Sum --stat POP07_SQMI:avg \
//!   --group-by SUB_REGION --group-by STATE_NAME \
//!   --order-by STATE_NAME:desc
//! ```

mod args;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use feature_stats::{
    config::Config,
    extrusion::{ExtrusionExpression, ExtrusionMode},
    metrics,
    service::DatasetDocument,
    InMemoryFeatureTable, StatisticsSession,
};
use tracing::{debug, info};

use args::{parse_order, parse_stat, OrderArg, StatArg};

type CliResult = Result<(), Box<dyn std::error::Error>>;

// =============================================================================
// CLI Definition
// =============================================================================

#[derive(Parser)]
#[command(name = "feature-stats")]
#[command(author = "Victor Oseghale")]
#[command(version)]
#[command(about = "Grouped statistics over feature datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (overrides FSTATS_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override dataset JSON path
    #[arg(short, long, global = true)]
    dataset: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a statistics query and print the grouped results
    Query {
        /// Statistic to compute, as FIELD:KIND (e.g. POP2007:Sum)
        #[arg(short, long = "stat", value_parser = parse_stat, required = true)]
        stats: Vec<StatArg>,

        /// Field to group by, in order
        #[arg(short, long = "group-by", required = true)]
        group_by: Vec<String>,

        /// Grouped field to order by, as FIELD[:asc|desc]
        #[arg(short, long = "order-by", value_parser = parse_order)]
        order_by: Vec<OrderArg>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Print Prometheus metrics after the query
        #[arg(long)]
        show_metrics: bool,
    },

    /// List fields available for grouping and statistics
    Fields,

    /// Evaluate an extrusion expression for every feature
    Extrude {
        /// Preset mode (total-population, population-density, none)
        #[arg(short, long, default_value = "total-population", conflicts_with = "expression")]
        mode: ExtrusionMode,

        /// Custom expression, e.g. "[POP2007] / 10"
        #[arg(short, long)]
        expression: Option<String>,

        /// Attribute printed next to each height
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Validate configuration file
    CheckConfig,
}

// =============================================================================
// Setup
// =============================================================================

/// Load configuration from the CLI path, `FSTATS_CONFIG` or defaults
fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var("FSTATS_CONFIG").ok().map(PathBuf::from));

    let mut config = match path {
        Some(path) => Config::from_file_with_env(path)?,
        None => Config::from_env(),
    };

    if let Some(dataset) = &cli.dataset {
        config.dataset.source = Some(dataset.clone());
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.monitoring.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Read the configured dataset into an in-memory table
fn load_table(config: &Config) -> Result<InMemoryFeatureTable, Box<dyn std::error::Error>> {
    let source = config
        .dataset
        .source
        .as_ref()
        .ok_or("no dataset configured (use --dataset or FSTATS_DATASET)")?;

    let contents = std::fs::read_to_string(source)
        .map_err(|e| format!("Failed to read dataset {}: {}", source.display(), e))?;
    let mut document: DatasetDocument = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse dataset {}: {}", source.display(), e))?;

    if !config.dataset.name.is_empty() {
        document.name = config.dataset.name.clone();
    }

    debug!(
        source = %source.display(),
        features = document.features.len(),
        "Read dataset document"
    );

    let mut table = InMemoryFeatureTable::from_document(document);
    if let Some(limit) = config.result_limit() {
        table = table.with_max_records(limit);
    }
    Ok(table)
}

// =============================================================================
// CLI Command Handlers
// =============================================================================

async fn cmd_query(
    config: &Config,
    stats: &[StatArg],
    group_by: &[String],
    order_by: &[OrderArg],
    format: &str,
    show_metrics: bool,
) -> CliResult {
    let table = load_table(config)?;
    let mut session = StatisticsSession::with_separator(config.query.group_separator.clone());
    session.load(&table).await?;

    for stat in stats {
        if !session.add_statistic_definition(&stat.field, stat.kind)? {
            debug!(field = %stat.field, kind = %stat.kind, "Ignoring duplicate statistic");
        }
    }
    for field in group_by {
        session.set_group_by_selected(field, true)?;
    }
    for order in order_by {
        session.set_order_by_selected(&order.field, true)?;
        session.set_order_direction(&order.field, order.direction)?;
    }

    let outcome = session.execute(&table).await?;
    info!(?outcome, "Query finished");

    if format == "json" {
        let records: Vec<_> = session.results().records().collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        if let Some(catalog) = session.catalog() {
            println!("{}", catalog.title());
            println!();
        }
        print!("{}", session.results().render_text());
    }

    if show_metrics && config.monitoring.metrics_enabled {
        println!();
        println!("{}", metrics::gather_metrics()?);
    }

    Ok(())
}

async fn cmd_fields(config: &Config) -> CliResult {
    let table = load_table(config)?;
    let mut session = StatisticsSession::new();
    let catalog = session.load(&table).await?;

    println!("{}", catalog.title());
    println!();
    for field in catalog.group_by_fields() {
        let marker = if field.field_type.is_numeric() { " [numeric]" } else { "" };
        println!("  {} ({}){}", field.name, field.field_type, marker);
    }
    Ok(())
}

async fn cmd_extrude(
    config: &Config,
    mode: ExtrusionMode,
    expression: Option<&str>,
    label: Option<&str>,
) -> CliResult {
    let table = load_table(config)?;
    let expression = match expression {
        Some(text) => ExtrusionExpression::parse(text)?,
        None => mode.expression()?,
    };

    if expression.expr().is_none() {
        println!("No extrusion");
        return Ok(());
    }

    println!("Extrusion: {}", expression);
    for (index, (feature, height)) in table
        .features()
        .iter()
        .zip(expression.heights(table.features()))
        .enumerate()
    {
        let name = label
            .and_then(|field| feature.get(field))
            .map(|value| value.to_string())
            .unwrap_or_else(|| format!("#{}", index));
        match height {
            Ok(Some(h)) => println!("  {}: {}", name, h),
            Ok(None) => println!("  {}: -", name),
            Err(e) => println!("  {}: error ({})", name, e),
        }
    }
    Ok(())
}

fn cmd_check_config(config: &Config) -> CliResult {
    println!("Configuration is valid!");
    println!();
    println!("Dataset:");
    match &config.dataset.source {
        Some(source) => println!("  Source: {}", source.display()),
        None => println!("  Source: (none)"),
    }
    if !config.dataset.name.is_empty() {
        println!("  Name: {}", config.dataset.name);
    }
    println!();
    println!("Query:");
    println!("  Group separator: {:?}", config.query.group_separator);
    match config.result_limit() {
        Some(limit) => println!("  Max result records: {}", limit),
        None => println!("  Max result records: unlimited"),
    }
    println!();
    println!("Monitoring:");
    println!("  Metrics enabled: {}", config.monitoring.metrics_enabled);
    println!("  Log level: {}", config.monitoring.log_level);
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> CliResult {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config);

    match &cli.command {
        Commands::Query {
            stats,
            group_by,
            order_by,
            format,
            show_metrics,
        } => cmd_query(&config, stats, group_by, order_by, format, *show_metrics).await,
        Commands::Fields => cmd_fields(&config).await,
        Commands::Extrude {
            mode,
            expression,
            label,
        } => cmd_extrude(&config, *mode, expression.as_deref(), label.as_deref()).await,
        Commands::CheckConfig => cmd_check_config(&config),
    }
}
