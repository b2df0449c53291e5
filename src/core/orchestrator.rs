use crate::core::cache::OfferCache;
use crate::core::resolver::CodeResolver;
use crate::domain::model::{
    AttemptPair, GeoBox, GeoPoint, Offer, OfferQuery, PlaceRole, ResolutionResult, ResolvedPlace,
};
use crate::domain::ports::{ProviderResult, TravelProvider};
use crate::utils::error::{OfferError, ProviderError, Result};
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionSettings {
    /// How many provider-suggested dates to try per pair.
    pub fallback_date_limit: usize,
    /// How many ranked airports per side take part in attempt pairs.
    pub airports_per_side: usize,
    pub offer_ttl: Duration,
    pub activity_radius_km: u32,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self {
            fallback_date_limit: 3,
            airports_per_side: 1,
            offer_ttl: Duration::from_secs(300),
            activity_radius_km: 1,
        }
    }
}

/// Attempt pairs in priority order: city/city, airport/airport, city/airport,
/// airport/city. Duplicates keep their first position.
pub fn build_attempt_pairs(
    origin: &ResolvedPlace,
    destination: &ResolvedPlace,
    airports_per_side: usize,
) -> Vec<AttemptPair> {
    let origin_city = origin.city();
    let destination_city = destination.city();
    let origin_airports = origin.airports(airports_per_side);
    let destination_airports = destination.airports(airports_per_side);

    let mut candidates = Vec::new();
    if let (Some(o), Some(d)) = (&origin_city, &destination_city) {
        candidates.push(AttemptPair::new(&o.code, &d.code));
    }
    for o in &origin_airports {
        for d in &destination_airports {
            candidates.push(AttemptPair::new(&o.code, &d.code));
        }
    }
    if let Some(o) = &origin_city {
        for d in &destination_airports {
            candidates.push(AttemptPair::new(&o.code, &d.code));
        }
    }
    if let Some(d) = &destination_city {
        for o in &origin_airports {
            candidates.push(AttemptPair::new(&o.code, &d.code));
        }
    }

    let mut pairs: Vec<AttemptPair> = Vec::with_capacity(candidates.len());
    for pair in candidates {
        if pair.origin_code.is_empty() || pair.destination_code.is_empty() {
            continue;
        }
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }
    pairs
}

/// Picks the suggested dates to retry with, nearest to `desired` first.
/// Ties keep the provider's order; the desired date itself and unparseable
/// entries are skipped.
pub fn rank_fallback_dates(suggestions: &[Value], desired: NaiveDate, limit: usize) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = Vec::new();
    for item in suggestions {
        let raw = item
            .get("departureDate")
            .or_else(|| item.get("date"))
            .and_then(Value::as_str);
        let Some(raw) = raw else { continue };

        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) if date != desired && !dates.contains(&date) => dates.push(date),
            Ok(_) => {}
            Err(e) => tracing::debug!("skipping suggested date '{}': {}", raw, e),
        }
    }

    dates.sort_by_key(|date| (*date - desired).num_days().abs());
    dates.truncate(limit);
    dates
}

/// Finds bookable offers for a pair of free-text places on or near a date.
pub struct OfferOrchestrator {
    resolver: CodeResolver,
    provider: Arc<dyn TravelProvider>,
    cache: Arc<OfferCache>,
    settings: ResolutionSettings,
}

impl OfferOrchestrator {
    pub fn new(
        resolver: CodeResolver,
        provider: Arc<dyn TravelProvider>,
        cache: Arc<OfferCache>,
        settings: ResolutionSettings,
    ) -> Self {
        Self {
            resolver,
            provider,
            cache,
            settings,
        }
    }

    pub fn resolver(&self) -> &CodeResolver {
        &self.resolver
    }

    /// Drops in-memory entries older than the offer TTL. The disk tier is
    /// untouched, so longer-lived location records are still read from there.
    pub fn evict_expired(&self) -> usize {
        self.cache.evict_expired(self.settings.offer_ttl)
    }

    /// Resolves both places, then probes every attempt pair on the desired
    /// date and, failing that, on up to `fallback_date_limit` suggested dates.
    ///
    /// "No offers" is a normal, empty result. Errors are reserved for places
    /// that resolve to no code at all and for fatal provider failures.
    pub async fn resolve_offers(
        &self,
        origin_name: &str,
        destination_name: &str,
        desired_date: NaiveDate,
        party_size: u32,
    ) -> Result<ResolutionResult> {
        let resolution_key = format!(
            "resolution:{}:{}:{}:{}",
            origin_name.trim().to_lowercase(),
            destination_name.trim().to_lowercase(),
            desired_date.format("%Y-%m-%d"),
            party_size
        );
        if let Some(result) = self
            .cache
            .get_as::<ResolutionResult>(&resolution_key, self.settings.offer_ttl)
        {
            tracing::debug!("reusing cached resolution {}", resolution_key);
            return Ok(result);
        }

        let origin = self.resolve_place(origin_name, PlaceRole::Origin).await?;
        let destination = self
            .resolve_place(destination_name, PlaceRole::Destination)
            .await?;

        let pairs = build_attempt_pairs(&origin, &destination, self.settings.airports_per_side);
        tracing::debug!(
            "attempt pairs for {} -> {}: {:?}",
            origin_name,
            destination_name,
            pairs.iter().map(ToString::to_string).collect::<Vec<_>>()
        );

        let (result, degraded) = self.probe(&pairs, desired_date, party_size).await?;

        tracing::info!(
            "{} -> {} on {}: {} offer(s) via {:?}->{:?} on {} (fallback={})",
            origin_name,
            destination_name,
            desired_date,
            result.offers.len(),
            result.used_origin_code,
            result.used_destination_code,
            result.used_date,
            result.used_fallback
        );

        // An empty answer built from failed provider calls is not a real "no offers".
        if !result.is_empty() || !degraded {
            self.cache.set_as(&resolution_key, &result);
        } else {
            tracing::debug!("not caching {}: empty after provider failures", resolution_key);
        }
        Ok(result)
    }

    async fn resolve_place(&self, name: &str, role: PlaceRole) -> Result<ResolvedPlace> {
        let place = self.resolver.resolve(name).await?;
        if place.is_empty() {
            return Err(OfferError::UnresolvedPlace {
                place: name.to_string(),
                role,
            });
        }
        Ok(place)
    }

    /// Runs both passes. The flag is set when any offer or date lookup
    /// failed and was treated as empty.
    async fn probe(
        &self,
        pairs: &[AttemptPair],
        desired_date: NaiveDate,
        party_size: u32,
    ) -> Result<(ResolutionResult, bool)> {
        let mut degraded = false;

        for pair in pairs {
            let query = OfferQuery::new(pair, desired_date, party_size);
            match self.attempt(&query).await? {
                Some(offers) if !offers.is_empty() => {
                    let result = ResolutionResult::found(pair, desired_date, offers, false);
                    return Ok((result, degraded));
                }
                Some(_) => {}
                None => degraded = true,
            }
        }

        for pair in pairs {
            let Some(suggestions) = self.suggested_dates(pair).await? else {
                degraded = true;
                continue;
            };
            let dates = rank_fallback_dates(
                &suggestions,
                desired_date,
                self.settings.fallback_date_limit,
            );
            for date in dates {
                let query = OfferQuery::new(pair, date, party_size);
                match self.attempt(&query).await? {
                    Some(offers) if !offers.is_empty() => {
                        let result = ResolutionResult::found(pair, date, offers, true);
                        return Ok((result, degraded));
                    }
                    Some(_) => {}
                    None => degraded = true,
                }
            }
        }

        Ok((ResolutionResult::empty(pairs.first(), desired_date), degraded))
    }

    /// One cache-then-call probe. `None` means a non-fatal provider failure,
    /// which the caller counts as "no offers" so the remaining pairs still get their turn.
    async fn attempt(&self, query: &OfferQuery) -> Result<Option<Vec<Offer>>> {
        match self.offers_for(query).await {
            Ok(offers) => Ok(Some(offers)),
            Err(e) => {
                absorb(&e, &query.cache_key())?;
                Ok(None)
            }
        }
    }

    /// Flight offers for one exact query; non-empty answers are cached.
    pub async fn offers_for(&self, query: &OfferQuery) -> ProviderResult<Vec<Offer>> {
        let key = query.cache_key();
        if let Some(offers) = self
            .cache
            .get_as::<Vec<Offer>>(&key, self.settings.offer_ttl)
        {
            if !offers.is_empty() {
                return Ok(offers);
            }
        }

        let offers = self.provider.flight_offers(query).await?;
        tracing::debug!("{}: {} offer(s) from provider", key, offers.len());
        if !offers.is_empty() {
            self.cache.set_as(&key, &offers);
        }
        Ok(offers)
    }

    async fn suggested_dates(&self, pair: &AttemptPair) -> Result<Option<Vec<Value>>> {
        match self
            .provider
            .flight_dates(&pair.origin_code, &pair.destination_code)
            .await
        {
            Ok(items) => Ok(Some(items)),
            Err(e) => {
                absorb(&e, &format!("flight-dates:{}", pair))?;
                Ok(None)
            }
        }
    }

    pub async fn hotels_in_city(&self, city_code: &str) -> ProviderResult<Vec<Value>> {
        let key = format!("hotels:{}", city_code);
        self.cached(&key, || self.provider.hotels_by_city(city_code))
            .await
    }

    pub async fn activities_near(&self, point: GeoPoint) -> ProviderResult<Vec<Value>> {
        let radius = self.settings.activity_radius_km;
        let key = point.cache_key(radius);
        self.cached(&key, || self.provider.activities_near(point, radius))
            .await
    }

    pub async fn activities_in_box(&self, area: GeoBox) -> ProviderResult<Vec<Value>> {
        self.cached(&area.cache_key(), || self.provider.activities_in_box(area))
            .await
    }

    async fn cached<F, Fut>(&self, key: &str, fetch: F) -> ProviderResult<Vec<Value>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ProviderResult<Vec<Value>>>,
    {
        if let Some(items) = self
            .cache
            .get_as::<Vec<Value>>(key, self.settings.offer_ttl)
        {
            return Ok(items);
        }
        let items = fetch().await?;
        self.cache.set_as(key, &items);
        Ok(items)
    }
}

fn absorb(err: &ProviderError, context: &str) -> Result<()> {
    if err.is_fatal() {
        return Err(OfferError::Provider(err.clone()));
    }
    tracing::warn!("{} failed, treating as no offers: {}", context, err);
    Ok(())
}
