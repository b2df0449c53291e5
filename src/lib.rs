pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{AmadeusClient, LocalJourneyStore};
pub use config::AppConfig;
pub use crate::core::{
    cache::OfferCache,
    orchestrator::{OfferOrchestrator, ResolutionSettings},
    resolver::CodeResolver,
    retry::{RetryPolicy, RetryingClient, RetryingProvider},
    seeder::{JourneySeeder, SeedOptions},
};
pub use domain::model::{Offer, OfferQuery, ResolutionResult};
pub use utils::error::{OfferError, ProviderError, Result};

use std::sync::Arc;

/// Wires the production stack from a loaded configuration: HTTP provider
/// behind the retry decorator, the two-tier cache, resolver and orchestrator.
pub fn build_orchestrator(config: &AppConfig) -> Result<OfferOrchestrator> {
    let client = AmadeusClient::new(config.amadeus_settings()?)?;
    let retrying = RetryingClient::new(config.retry_policy(), Arc::new(crate::core::retry::TokioDelay));
    let provider: Arc<dyn domain::ports::TravelProvider> =
        Arc::new(RetryingProvider::new(client, retrying));
    let cache = Arc::new(OfferCache::new(config.cache.dir.clone(), config.offer_ttl()));
    let resolver = CodeResolver::new(
        provider.clone(),
        cache.clone(),
        &config.resolution.overrides,
        config.location_ttl(),
    );
    Ok(OfferOrchestrator::new(
        resolver,
        provider,
        cache,
        config.resolution_settings(),
    ))
}
