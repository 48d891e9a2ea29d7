use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metric_rollup::app::AggregateUseCase;
use metric_rollup::config::Config;
use metric_rollup::period::Period;
use metric_rollup::resolver::resolve;
use metric_rollup::server::{self, AppState};
use metric_rollup::{logging, metrics, storage, validation};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "metric_rollup")]
#[command(about = "Metric reading ingestion and periodic rollups")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP ingestion and query server
    Serve {
        /// Listen address, overrides ROLLUP_BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run the rollup job once (invoked by the scheduler)
    Aggregate {
        /// WEEK, MONTH or YEAR
        #[arg(long)]
        period: Option<String>,
        /// Window length in seconds, counted back from now
        #[arg(long)]
        seconds: Option<u64>,
        /// Raw scheduler event as JSON, e.g. '{"period":"WEEK","seconds":604800}'
        #[arg(long, conflicts_with_all = ["period", "seconds"])]
        event: Option<String>,
    },
    /// Print the partition keys covering a date range, one per line
    Resolve {
        /// DAY, WEEK, MONTH or YEAR
        #[arg(long)]
        period: Period,
        /// ISO 8601 start date
        #[arg(long)]
        from: String,
        /// ISO 8601 end date
        #[arg(long)]
        to: String,
    },
}

/// Scheduler event from either the raw JSON or the individual flags.
/// Absent flags are left out so validation reports them as missing.
fn build_event(period: Option<String>, seconds: Option<u64>, event: Option<String>) -> Result<Value> {
    if let Some(raw) = event {
        return serde_json::from_str(&raw).context("--event is not valid JSON");
    }
    let mut fields = Map::new();
    if let Some(period) = period {
        fields.insert("period".to_string(), Value::String(period));
    }
    if let Some(seconds) = seconds {
        fields.insert("seconds".to_string(), Value::from(seconds));
    }
    Ok(Value::Object(fields))
}

async fn serve(config: &Config, bind: Option<String>) -> Result<()> {
    if let Some(addr) = config.metrics_addr.as_deref() {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid metrics address '{addr}'"))?;
        metrics::init_metrics(addr);
    }

    let bind = bind.unwrap_or_else(|| config.bind_addr.clone());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address '{bind}'"))?;

    let store = storage::open_store(config)?;
    server::start_server(AppState { store }, addr).await
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load()?;
    let _log_guard = logging::init_logging(&config.log_dir);

    match cli.command {
        Commands::Serve { bind } => serve(&config, bind).await?,
        Commands::Aggregate {
            period,
            seconds,
            event,
        } => {
            let event = build_event(period, seconds, event)?;
            info!(event = %event, "Running aggregation");

            let store = storage::open_store(&config)?;
            match AggregateUseCase::new(store).run(&event).await {
                Ok(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
                Err(e) => {
                    error!("Aggregation failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Commands::Resolve { period, from, to } => {
            let start = validation::parse_iso_date(&from)
                .with_context(|| format!("--from '{from}' is not an ISO 8601 date"))?;
            let end = validation::parse_iso_date(&to)
                .with_context(|| format!("--to '{to}' is not an ISO 8601 date"))?;
            for key in resolve(period, start, end) {
                println!("{key}");
            }
        }
    }
    Ok(())
}
