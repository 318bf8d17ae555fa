//! harvest-cli: Evaluate a portfolio for tax-loss harvesting opportunities.
//!
//! Reads a `{"positions": [...], "tax_bracket": 0.24}` request and prints the
//! harvest report as JSON. Quotes come from Polygon unless a price file is given.
//!
//! Usage:
//!   cargo run -p harvest-cli -- portfolio.json
//!   cargo run -p harvest-cli -- portfolio.json --prices prices.json --as-of 2025-11-14
//!   cargo run -p harvest-cli -- portfolio.json --catalog replacements.json --narrate

use anyhow::Context;
use chrono::NaiveDate;
use harvest_core::{FixedClock, PortfolioRequest, QuoteSource};
use harvest_engine::{
    HarvestAnalyzer, HarvestingConfig, PlainNarrator, ReplacementCatalog, StaticQuoteSource,
};
use polygon_client::PolygonClient;
use std::sync::Arc;

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    request: String,
    catalog: Option<String>,
    prices: Option<String>,
    as_of: Option<NaiveDate>,
    narrate: bool,
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_args(args: &[String]) -> anyhow::Result<Option<CliArgs>> {
    let with_value = ["--catalog", "--prices", "--as-of"];

    // First argument that is neither a flag nor a flag's value
    let request = args.iter().enumerate().skip(1).find_map(|(i, a)| {
        let is_value = with_value.contains(&args[i - 1].as_str());
        (!a.starts_with("--") && !is_value).then(|| a.clone())
    });

    let request = match request {
        Some(r) => r,
        None => return Ok(None),
    };

    let as_of = flag_value(args, "--as-of")
        .map(|v| {
            NaiveDate::parse_from_str(&v, "%Y-%m-%d")
                .with_context(|| format!("--as-of expects YYYY-MM-DD, got {:?}", v))
        })
        .transpose()?;

    Ok(Some(CliArgs {
        request,
        catalog: flag_value(args, "--catalog"),
        prices: flag_value(args, "--prices"),
        as_of,
        narrate: args.iter().any(|a| a == "--narrate"),
    }))
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  harvest-cli <request.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --catalog PATH       Replacement catalog JSON (default: built-in)");
    eprintln!("  --prices PATH        Static price file instead of Polygon quotes");
    eprintln!("  --as-of YYYY-MM-DD   Evaluate as of this date (default: today)");
    eprintln!("  --narrate            Attach a Markdown action plan to the report");
}

fn init_logging() {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(
                "harvest_cli=info,harvest_engine=info,polygon_client=warn",
            )
        })
    };

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // Logs go to stderr so stdout stays a clean JSON report
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let cli = match parse_args(&args)? {
        Some(cli) => cli,
        None => {
            print_usage();
            std::process::exit(1);
        }
    };

    let raw = std::fs::read_to_string(&cli.request)
        .with_context(|| format!("reading request {}", cli.request))?;
    let request: PortfolioRequest = serde_json::from_str(&raw)
        .with_context(|| format!("parsing request {}", cli.request))?;

    let config = HarvestingConfig::from_env()?;

    let catalog = match &cli.catalog {
        Some(path) => ReplacementCatalog::from_path(path)?,
        None => ReplacementCatalog::builtin(),
    };
    tracing::info!("Replacement catalog: {} tickers", catalog.len());

    let quotes: Arc<dyn QuoteSource> = match &cli.prices {
        Some(path) => {
            tracing::info!("Using static prices from {}", path);
            Arc::new(StaticQuoteSource::from_path(path)?)
        }
        None => Arc::new(PolygonClient::from_env()?),
    };

    let mut analyzer = HarvestAnalyzer::new(quotes, Arc::new(catalog), config);
    if let Some(date) = cli.as_of {
        analyzer = analyzer.with_clock(Arc::new(FixedClock::on(date)));
    }
    if cli.narrate {
        analyzer = analyzer.with_narrator(Arc::new(PlainNarrator));
    }

    let report = analyzer.analyze(&request).await?;

    if report.is_partial() {
        tracing::warn!(
            "{} position(s) could not be evaluated",
            report.failures.len()
        );
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
