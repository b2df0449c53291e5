use clap::Parser;
use offer_resolver::domain::journey::NewJourney;
use offer_resolver::utils::error::{ErrorSeverity, OfferError};
use offer_resolver::utils::{logger, validation::Validate};
use offer_resolver::{
    build_orchestrator, CliConfig, JourneySeeder, LocalJourneyStore, ResolutionResult, SeedOptions,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting offer-resolver");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = run(&config).await {
        tracing::error!("❌ Resolution failed: {} (Severity: {:?})", e, e.severity());
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 4,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }

    Ok(())
}

async fn run(config: &CliConfig) -> Result<(), OfferError> {
    config.validate()?;
    let date = offer_resolver::utils::validation::validate_date("date", &config.date)?;

    let app_config = config.app_config()?;
    app_config.validate()?;

    let orchestrator = Arc::new(build_orchestrator(&app_config)?);
    let result = orchestrator
        .resolve_offers(&config.origin, &config.destination, date, config.adults)
        .await?;

    print_result(config, &result);

    if let Some(dir) = &config.journey_output {
        let store = Arc::new(LocalJourneyStore::new(dir.clone()));
        let seeder = JourneySeeder::new(store, orchestrator.clone(), SeedOptions::default());
        let journey = NewJourney {
            user_id: config.user_id,
            destination_country: None,
            destination_city: config.destination.trim().to_string(),
            budget: config.budget,
        };
        let report = seeder.seed(&journey, &result).await?;
        println!(
            "📁 Journey {} saved to {} ({} flights, {} hotels, {} activities)",
            report.journey_id,
            dir.display(),
            report.flights,
            report.accommodations,
            report.activities
        );
        for warning in &report.warnings {
            println!("⚠️  {}", warning);
        }
    }

    Ok(())
}

fn print_result(config: &CliConfig, result: &ResolutionResult) {
    let codes = format!(
        "{}->{}",
        result.used_origin_code.as_deref().unwrap_or("?"),
        result.used_destination_code.as_deref().unwrap_or("?")
    );

    if result.is_empty() {
        println!(
            "No offers for {} -> {} around {} (tried {})",
            config.origin, config.destination, config.date, codes
        );
        return;
    }

    println!(
        "✅ {} offer(s) {} on {}{}",
        result.offers.len(),
        codes,
        result.used_date,
        if result.used_fallback { " (alternative date)" } else { "" }
    );
    for offer in &result.offers {
        println!(
            "  {} {} {} -> {} departing {}",
            offer
                .total_price()
                .map(|p| format!("{:.2}", p))
                .unwrap_or_else(|| "n/a".to_string()),
            offer.currency().unwrap_or(""),
            offer.first_departure_code().unwrap_or("?"),
            offer.last_arrival_code().unwrap_or("?"),
            offer.departure_time().unwrap_or("?")
        );
    }
}
