use crate::core::orchestrator::OfferOrchestrator;
use crate::domain::journey::{
    AccommodationRow, ActivityRow, ExtraRow, FlightRow, JourneyId, NewJourney, SeedReport,
};
use crate::domain::model::{Offer, ResolutionResult};
use crate::domain::ports::JourneyStore;
use crate::utils::error::Result;
use serde_json::Value;
use std::sync::Arc;

/// Flattens one offer. Fields that cannot be read become `None`; the row is kept.
pub fn flight_row(offer: &Offer) -> FlightRow {
    let date_part = |at: Option<&str>| at.map(|at| at.chars().take(10).collect::<String>());
    FlightRow {
        airline: offer.carrier_code().map(str::to_string),
        origin_code: offer.first_departure_code().map(str::to_string),
        destination_code: offer.last_arrival_code().map(str::to_string),
        departure_date: date_part(offer.departure_time()),
        arrival_date: date_part(offer.arrival_time()),
        price: offer.total_price(),
    }
}

fn parse_amount(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(item: &Value, pointer: &str) -> Option<String> {
    item.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub fn accommodation_row(item: &Value, city: &str) -> AccommodationRow {
    AccommodationRow {
        name: text(item, "/name"),
        address: text(item, "/address/lines/0").or_else(|| text(item, "/address/countryCode")),
        city: city.to_string(),
        price_per_night: parse_amount(item.pointer("/price/total")),
    }
}

pub fn activity_row(item: &Value) -> ActivityRow {
    ActivityRow {
        name: text(item, "/name"),
        category: text(item, "/type"),
        description: text(item, "/shortDescription"),
        price: parse_amount(item.pointer("/price/amount")),
    }
}

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub max_flights: usize,
    pub max_accommodations: usize,
    pub max_activities: usize,
    pub include_defaults: bool,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            max_flights: 5,
            max_accommodations: 5,
            max_activities: 5,
            include_defaults: true,
        }
    }
}

/// Persists a resolved trip: the journey and its flights are required,
/// hotels, activities and default extras are best-effort enrichment.
pub struct JourneySeeder {
    store: Arc<dyn JourneyStore>,
    orchestrator: Arc<OfferOrchestrator>,
    options: SeedOptions,
}

impl JourneySeeder {
    pub fn new(
        store: Arc<dyn JourneyStore>,
        orchestrator: Arc<OfferOrchestrator>,
        options: SeedOptions,
    ) -> Self {
        Self {
            store,
            orchestrator,
            options,
        }
    }

    pub async fn seed(
        &self,
        journey: &NewJourney,
        result: &ResolutionResult,
    ) -> Result<SeedReport> {
        let journey_id = self.store.insert_journey(journey).await?;

        let flights: Vec<FlightRow> = result
            .offers
            .iter()
            .take(self.options.max_flights)
            .map(flight_row)
            .collect();
        self.store.insert_flights(journey_id, &flights).await?;

        let mut report = SeedReport {
            journey_id,
            flights: flights.len(),
            ..SeedReport::default()
        };

        match self.seed_accommodations(journey_id, journey, result).await {
            Ok(count) => report.accommodations = count,
            Err(warning) => report.warnings.push(warning),
        }

        match self.seed_activities(journey_id, &journey.destination_city).await {
            Ok(count) => report.activities = count,
            Err(warning) => report.warnings.push(warning),
        }

        if self.options.include_defaults {
            let extras = ExtraRow::defaults();
            match self.store.insert_extras(journey_id, &extras).await {
                Ok(()) => report.extras = extras.len(),
                Err(e) => report.warnings.push(format!("default extras: {}", e)),
            }
        }

        for warning in &report.warnings {
            tracing::warn!("journey {}: skipped enrichment ({})", journey_id, warning);
        }
        tracing::info!(
            "seeded journey {} with {} flight(s), {} accommodation(s), {} activity row(s)",
            journey_id,
            report.flights,
            report.accommodations,
            report.activities
        );
        Ok(report)
    }

    async fn seed_accommodations(
        &self,
        journey_id: JourneyId,
        journey: &NewJourney,
        result: &ResolutionResult,
    ) -> std::result::Result<usize, String> {
        // Hotel search takes a city code; the flight may have landed on an airport code.
        let city = match self
            .orchestrator
            .resolver()
            .resolve(&journey.destination_city)
            .await
        {
            Ok(place) => place.city_code,
            Err(e) => {
                tracing::debug!("city code for {}: {}", journey.destination_city, e);
                None
            }
        };
        let Some(city_code) = city.or_else(|| result.used_destination_code.clone()) else {
            return Ok(0);
        };
        let city_code = city_code.as_str();

        let hotels = self
            .orchestrator
            .hotels_in_city(city_code)
            .await
            .map_err(|e| format!("hotels for {}: {}", city_code, e))?;
        let rows: Vec<AccommodationRow> = hotels
            .iter()
            .take(self.options.max_accommodations)
            .map(|item| accommodation_row(item, city_code))
            .collect();
        if rows.is_empty() {
            return Ok(0);
        }

        self.store
            .insert_accommodations(journey_id, &rows)
            .await
            .map_err(|e| format!("accommodations: {}", e))?;
        Ok(rows.len())
    }

    async fn seed_activities(
        &self,
        journey_id: JourneyId,
        destination: &str,
    ) -> std::result::Result<usize, String> {
        let point = self
            .orchestrator
            .resolver()
            .geo_code(destination)
            .await
            .map_err(|e| format!("location of {}: {}", destination, e))?;
        let Some(point) = point else {
            return Ok(0);
        };

        let activities = self
            .orchestrator
            .activities_near(point)
            .await
            .map_err(|e| format!("activities near {}: {}", destination, e))?;
        let rows: Vec<ActivityRow> = activities
            .iter()
            .take(self.options.max_activities)
            .map(activity_row)
            .collect();
        if rows.is_empty() {
            return Ok(0);
        }

        self.store
            .insert_activities(journey_id, &rows)
            .await
            .map_err(|e| format!("activities: {}", e))?;
        Ok(rows.len())
    }
}
