use anyhow::Context;
use clap::Parser;
use offer_resolver::utils::error::OfferError;
use offer_resolver::utils::logger;
use offer_resolver::utils::validation::{validate_date, Validate};
use offer_resolver::{build_orchestrator, AppConfig, ResolutionResult};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "batch-search")]
#[command(about = "Run many offer resolutions and print one summary line per search")]
struct Args {
    #[arg(long, help = "CSV file with origin,destination,date[,adults] rows")]
    input: Option<PathBuf>,

    #[arg(long, help = "Path to a TOML configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Log as JSON lines instead of compact text")]
    json_logs: bool,

    #[arg(long, help = "Enable verbose output")]
    verbose: bool,
}

#[derive(Debug, Clone)]
struct SearchRow {
    origin: String,
    destination: String,
    date: String,
    adults: Option<u32>,
}

impl SearchRow {
    fn new(origin: &str, destination: &str, date: &str) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            date: date.to_string(),
            adults: None,
        }
    }
}

fn default_searches() -> Vec<SearchRow> {
    [
        ("Paris", "Athens", "2026-01-01"),
        ("Athens", "Madrid", "2026-01-02"),
        ("Madrid", "Moscow", "2026-01-03"),
        ("Moscow", "Beijing", "2026-01-04"),
        ("Paris", "Madrid", "2026-01-05"),
        ("Madrid", "Paris", "2026-01-06"),
        ("Athens", "Beijing", "2026-01-07"),
        ("Moscow", "Athens", "2026-01-08"),
        ("London", "Rome", "2026-01-09"),
        ("Rome", "Madrid", "2026-01-10"),
    ]
    .iter()
    .map(|(o, d, date)| SearchRow::new(o, d, date))
    .collect()
}

fn read_searches(path: &Path) -> Result<Vec<SearchRow>, OfferError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or("").to_string();
        if line == 0 && field(0).eq_ignore_ascii_case("origin") {
            continue;
        }
        if record.len() < 3 {
            return Err(OfferError::ValidationError {
                message: format!("row {} has {} column(s), expected at least 3", line + 1, record.len()),
            });
        }

        let adults = match record.get(3).filter(|v| !v.is_empty()) {
            Some(raw) => Some(raw.parse::<u32>().map_err(|_| OfferError::ValidationError {
                message: format!("row {}: adults must be a number, got '{}'", line + 1, raw),
            })?),
            None => None,
        };
        rows.push(SearchRow {
            origin: field(0),
            destination: field(1),
            date: field(2),
            adults,
        });
    }
    Ok(rows)
}

fn summary_line(row: &SearchRow, result: &ResolutionResult) -> String {
    format!(
        "{} -> {} {} result=count={} sample_price={} used_origin={} used_dest={} used_date={} fallback={}",
        row.origin,
        row.destination,
        row.date,
        result.offers.len(),
        result
            .sample_price()
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| "None".to_string()),
        result.used_origin_code.as_deref().unwrap_or("None"),
        result.used_destination_code.as_deref().unwrap_or("None"),
        result.used_date,
        result.used_fallback
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    let config = match &args.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::default(),
    }
    .with_env()?;
    config.validate()?;

    let searches = match &args.input {
        Some(path) => read_searches(path).with_context(|| format!("reading {}", path.display()))?,
        None => default_searches(),
    };
    tracing::info!("running {} search(es)", searches.len());

    let orchestrator = build_orchestrator(&config)?;

    let mut failed = 0;
    for row in &searches {
        let date = match validate_date("date", &row.date) {
            Ok(date) => date,
            Err(e) => {
                println!("{} -> {} {} error={}", row.origin, row.destination, row.date, e);
                failed += 1;
                continue;
            }
        };

        match orchestrator
            .resolve_offers(&row.origin, &row.destination, date, row.adults.unwrap_or(1))
            .await
        {
            Ok(result) => println!("{}", summary_line(row, &result)),
            Err(e @ OfferError::Provider(_)) => {
                // Only fatal provider failures reach here and they hit every remaining search too.
                tracing::error!("❌ {}: {}", e, e.recovery_suggestion());
                return Err(e.into());
            }
            Err(e) => {
                println!("{} -> {} {} error={}", row.origin, row.destination, row.date, e);
                failed += 1;
            }
        }

        let evicted = orchestrator.evict_expired();
        if evicted > 0 {
            tracing::debug!("evicted {} expired cache entr(ies)", evicted);
        }
    }

    tracing::info!("finished: {} ok, {} failed", searches.len() - failed, failed);
    Ok(())
}
