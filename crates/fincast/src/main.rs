//! CLI entry point for the forecasting session client.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use fincast::config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use fincast::dataset::table;
use fincast::{
    ChartData, FEATURE_RECOMMENDATIONS, HttpModelService, IngestReport, ModelType,
    ServiceConfig, Session, SubmitOutcome, parse_csv_path,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// CLI-compatible model type enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliModelType {
    /// Ordinary least squares
    Linear,
    /// Random forest regressor
    RandomForest,
    /// Gradient boosted trees
    Xgboost,
    /// Average of all models
    Ensemble,
}

impl From<CliModelType> for ModelType {
    fn from(cli: CliModelType) -> Self {
        match cli {
            CliModelType::Linear => ModelType::Linear,
            CliModelType::RandomForest => ModelType::RandomForest,
            CliModelType::Xgboost => ModelType::Xgboost,
            CliModelType::Ensemble => ModelType::Ensemble,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author = "Fincast Team",
    version,
    about = "Forecasting session client",
    long_about = "Loads a CSV dataset, configures a forecast and runs it on the remote modeling service.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  FINCAST_SERVICE_URL   Base URL of the modeling service (also read from .env)\n\n\
                  EXAMPLES:\n  \
                  # Show columns and the first rows\n  \
                  fincast inspect sales.csv\n\n  \
                  # Forecast amount from price and promo with a random forest\n  \
                  fincast predict sales.csv --date date --target amount --x price,promo --model random-forest\n\n  \
                  # Re-run with engineered features and save the predictions\n  \
                  fincast predict sales.csv --date date --target amount --x price --features lag_1 -o out.csv\n\n  \
                  # Check the service is up\n  \
                  fincast ping"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs so stdout only carries JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Base URL of the modeling service
    #[arg(long, env = "FINCAST_SERVICE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a CSV file locally and show its columns and first rows
    Inspect {
        /// Path to the CSV file
        input: PathBuf,

        /// Number of rows to preview
        #[arg(long, default_value = "10")]
        rows: usize,
    },

    /// Configure a forecast and run it on the modeling service
    Predict {
        /// Path to the CSV file
        input: PathBuf,

        /// Date column
        #[arg(long)]
        date: String,

        /// Target (y) variable
        #[arg(short, long)]
        target: String,

        /// Predictor (x) variables, comma separated
        #[arg(long = "x", value_delimiter = ',', required = true)]
        x_variables: Vec<String>,

        /// Category columns, comma separated
        #[arg(long = "category", value_delimiter = ',')]
        category_columns: Vec<String>,

        /// Engineered features to include, comma separated
        ///
        /// The service only offers engineered features after a first run, so
        /// when this is set the forecast runs twice: once to discover the
        /// offered features and once with the requested ones.
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,

        /// Model to fit
        #[arg(short, long, value_enum, default_value = "linear")]
        model: CliModelType,

        /// Write the predictions dataset to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of prediction rows to preview
        #[arg(long, default_value = "10")]
        rows: usize,
    },

    /// Let the service parse a CSV file (legacy upload endpoint)
    Upload {
        /// Path to the CSV file
        input: PathBuf,

        /// Number of rows to preview
        #[arg(long, default_value = "10")]
        rows: usize,
    },

    /// Check that the modeling service is reachable
    Ping,
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

#[tokio::main]
async fn main() -> Result<()> {
    // .env has to be loaded before parsing so FINCAST_SERVICE_URL is seen
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    let config = ServiceConfig::builder()
        .base_url(&args.base_url)
        .timeout_secs(args.timeout_secs)
        .build()
        .context("Invalid service configuration")?;
    debug!("Service endpoint: {}", config.base_url);

    match &args.command {
        Command::Inspect { input, rows } => run_inspect(&args, input, *rows),
        Command::Predict { .. } => run_predict(&args, config).await,
        Command::Upload { input, rows } => run_upload(&args, config, input, *rows).await,
        Command::Ping => run_ping(&args, config).await,
    }
}

fn load_csv(path: &Path) -> Result<IngestReport> {
    if !path.exists() {
        return Err(anyhow!("Input file not found: {}", path.display()));
    }
    let report = parse_csv_path(path)?;
    for error in &report.errors {
        warn!("Skipped row at {}", error);
    }
    Ok(report)
}

fn run_inspect(args: &Args, input: &Path, rows: usize) -> Result<()> {
    let report = load_csv(input)?;

    if args.json {
        let output = serde_json::json!({
            "columns": report.header,
            "rows": report.dataset.len(),
            "errors": report.errors,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("Dataset: {}", input.display());
    println!("  Rows:    {}", report.dataset.len());
    println!("  Columns: {}", report.header.join(", "));
    if report.has_errors() {
        println!("  Skipped rows: {}", report.errors.len());
        for error in &report.errors {
            println!("    - {}", error);
        }
    }
    println!();
    println!("{}", table::preview(&report.dataset, rows)?);
    Ok(())
}

async fn run_predict(args: &Args, config: ServiceConfig) -> Result<()> {
    let Command::Predict {
        input,
        date,
        target,
        x_variables,
        category_columns,
        features,
        model,
        output,
        rows,
    } = &args.command
    else {
        return Err(anyhow!("predict called with a different command"));
    };

    let report = load_csv(input)?;
    let show_phases = !args.quiet && !args.json;
    let session = Session::builder(HttpModelService::new(config)?)
        .on_phase(move |update| {
            if show_phases {
                println!("[{}] {}", update.phase.display_name(), update.message);
            }
        })
        .build();
    session.ingest(report.dataset);

    let model_type = ModelType::from(*model);
    session.update_config(|selector| {
        selector.set_date_column(Some(date.clone()))?;
        selector.set_y_variable(Some(target.clone()))?;
        selector.set_x_variables(x_variables.iter().cloned())?;
        selector.set_category_columns(category_columns.iter().cloned())?;
        selector.set_model_type(model_type);
        Ok(())
    })?;

    let mut outcome = session.submit().await?;

    if !features.is_empty() {
        let offered = session.feature_options();
        let (requested, missing): (Vec<String>, Vec<String>) = features
            .iter()
            .cloned()
            .partition(|feature| offered.contains(feature));
        for feature in &missing {
            warn!("Engineered feature '{}' was not offered by the service", feature);
        }
        if requested.is_empty() {
            warn!("None of the requested engineered features are available");
        } else {
            info!("Re-running with engineered features: {}", requested.join(", "));
            session.update_config(|selector| selector.set_selected_features(requested))?;
            outcome = session.submit().await?;
        }
    }

    if let SubmitOutcome::Superseded { request_id } = outcome {
        return Err(anyhow!("Request {} was superseded", request_id));
    }

    let charts = session
        .charts()
        .ok_or_else(|| anyhow!("No predictions were adopted"))?;

    if let Some(path) = output {
        let dataset = session.dataset();
        table::write_csv(&dataset, path)?;
        if !args.json {
            println!("Predictions written to {}", path.display());
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(charts.as_ref())?);
        return Ok(());
    }

    print_charts(&charts);
    println!();
    println!("{}", table::preview(&session.dataset(), *rows)?);

    let offered = session.feature_options();
    if !offered.is_empty() {
        println!();
        println!("Engineered features offered: {}", offered.join(", "));
        for hint in FEATURE_RECOMMENDATIONS {
            println!("  - {}", hint);
        }
    }
    Ok(())
}

fn print_charts(charts: &ChartData) {
    println!();
    println!("Forecast for '{}'", charts.target);
    println!("  Points: {}", charts.forecast.len());
    println!("  Gaps:   {}", charts.gap_count());

    if !charts.error_metrics.is_empty() {
        println!();
        println!("Error metrics:");
        for metric in &charts.error_metrics {
            println!(
                "  {:<16} MAE {:>10.4}  RMSE {:>10.4}",
                metric.model, metric.mae, metric.rmse
            );
        }
    }

    for series in &charts.feature_importance {
        println!();
        println!("Feature importance ({}):", series.model);
        for point in &series.points {
            println!("  {:<24} {:.4}", point.feature, point.importance);
        }
    }
}

async fn run_upload(args: &Args, config: ServiceConfig, input: &Path, rows: usize) -> Result<()> {
    if !input.exists() {
        return Err(anyhow!("Input file not found: {}", input.display()));
    }
    let contents = std::fs::read(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.csv".to_string());

    let service = HttpModelService::new(config)?;
    let dataset = service.upload(&file_name, contents).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&dataset)?);
        return Ok(());
    }

    println!();
    println!("Service parsed {} rows", dataset.len());
    println!("  Columns: {}", dataset.columns().join(", "));
    println!();
    println!("{}", table::preview(&dataset, rows)?);
    Ok(())
}

async fn run_ping(args: &Args, config: ServiceConfig) -> Result<()> {
    let url = config.base_url.clone();
    let service = HttpModelService::new(config)?;
    let message = service.ping().await?;

    if args.json {
        let output = serde_json::json!({ "url": url, "message": message });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{} is up: {}", url, message);
    }
    Ok(())
}
