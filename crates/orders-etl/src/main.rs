//! CLI entry point for the orders ETL pipeline.

use anyhow::{Result, anyhow};
use clap::Parser;
use orders_etl::{EtlConfig, EtlPipeline, RunSummary};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Batch ETL for orders and users exports",
    long_about = "Cleans, validates and joins raw orders and users CSV exports into an \
                  analytics table with time parts, winsorized amounts and outlier flags.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  RUST_LOG    Overrides --log-level (e.g. RUST_LOG=orders_etl=debug)\n\n\
                  EXAMPLES:\n  \
                  # Run against ./data/raw and write to ./data/processed and ./reports\n  \
                  orders-etl\n\n  \
                  # Different project root, strict order ids\n  \
                  orders-etl --root /srv/analytics --unique-order-id\n\n  \
                  # Validate and transform without writing anything\n  \
                  orders-etl --dry-run\n\n  \
                  # Machine-readable run metadata\n  \
                  orders-etl --json | jq .country_match_rate"
)]
struct Args {
    /// Project root containing data/ and reports/
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Raw orders CSV (default: <root>/data/raw/orders.csv)
    #[arg(long)]
    orders: Option<PathBuf>,

    /// Raw users CSV (default: <root>/data/raw/users.csv)
    #[arg(long)]
    users: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the final summary)
    #[arg(short, long)]
    quiet: bool,

    /// Print the run metadata as JSON to stdout instead of the summary
    ///
    /// Disables all logs so stdout carries only the JSON document.
    #[arg(long)]
    json: bool,

    /// Run every stage in memory without writing any artifact
    #[arg(long)]
    dry_run: bool,

    /// Tukey fence multiplier for amount outliers
    #[arg(long, default_value = "1.5")]
    outlier_k: f64,

    /// Lower winsorizing quantile for amount
    #[arg(long, default_value = "0.01")]
    winsor_lo: f64,

    /// Upper winsorizing quantile for amount
    #[arg(long, default_value = "0.99")]
    winsor_hi: f64,

    /// Fail when orders.order_id is duplicated
    #[arg(long)]
    unique_order_id: bool,

    /// Skip the non-negative check on amount and quantity
    #[arg(long)]
    no_range_check: bool,

    /// Keep the local wall-clock time of offset-aware timestamps instead of converting to UTC
    #[arg(long)]
    keep_local_time: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let config = build_config(&args)?;

    let mut builder = EtlPipeline::builder().config(config);
    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }
    let pipeline = builder.build()?;

    info!("{}", "=".repeat(80));
    info!("Starting orders ETL...");
    info!("{}", "=".repeat(80));

    let summary = match pipeline.run() {
        Ok(summary) => summary,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return Err(anyhow!("Pipeline failed: {}", e));
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary.metadata)?);
        return Ok(());
    }

    print_human_readable_summary(&summary, args.dry_run);
    Ok(())
}

fn build_config(args: &Args) -> Result<EtlConfig> {
    let mut builder = EtlConfig::builder(&args.root)
        .outlier_k(args.outlier_k)
        .winsor_quantiles(args.winsor_lo, args.winsor_hi)
        .enforce_unique_order_id(args.unique_order_id)
        .validate_ranges(!args.no_range_check)
        .utc(!args.keep_local_time)
        .save_to_disk(!args.dry_run);

    if let Some(ref orders) = args.orders {
        builder = builder.raw_orders(orders);
    }
    if let Some(ref users) = args.users {
        builder = builder.raw_users(users);
    }

    Ok(builder.build()?)
}

/// Print a human-readable summary of the run.
///
/// Uses `println!` so the summary is visible regardless of log level.
fn print_human_readable_summary(summary: &RunSummary, dry_run: bool) {
    let meta = &summary.metadata;

    println!();
    println!("{}", "=".repeat(80));
    if dry_run {
        println!("DRY RUN COMPLETE (nothing written)");
    } else {
        println!("ETL COMPLETE");
    }
    println!("{}", "=".repeat(80));
    println!();

    println!("Rows:");
    println!("  Orders (raw): {}", meta.rows.orders_raw);
    println!("  Users:        {}", meta.rows.users);
    println!("  Analytics:    {}", meta.rows.analytics);
    println!();

    println!("Quality:");
    println!("  Missing created_at:  {}", meta.missing_created_at);
    println!("  Country match rate:  {:.3}", meta.country_match_rate);
    println!("  Amount outliers:     {}", summary.outliers);
    let invalid: Vec<String> = summary
        .schema
        .columns
        .iter()
        .filter(|(_, counts)| counts.invalid > 0)
        .map(|(name, counts)| format!("{} ({})", name, counts.invalid))
        .collect();
    if invalid.is_empty() {
        println!("  Unparseable values:  none");
    } else {
        println!("  Unparseable values:  {}", invalid.join(", "));
    }
    println!("  Duration:            {}ms", summary.duration_ms);
    println!();

    if dry_run {
        println!("OUTPUT FILES (would be created)");
    } else {
        println!("OUTPUT FILES");
    }
    println!("{}", "-".repeat(40));
    for (name, path) in &meta.outputs {
        println!("  {:<20} {}", name, display_path(path));
    }
    println!();
    println!("{}", "=".repeat(80));
}

fn display_path(path: &Path) -> String {
    path.strip_prefix("./")
        .unwrap_or(path)
        .display()
        .to_string()
}
