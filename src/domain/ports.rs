use crate::domain::journey::{
    AccommodationRow, ActivityRow, ExtraRow, FlightRow, JourneyId, NewJourney,
};
use crate::domain::model::{GeoBox, GeoPoint, Offer, OfferQuery};
use crate::utils::error::{ProviderError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    City,
    Airport,
    Any,
}

impl LocationKind {
    pub fn sub_type(&self) -> &'static str {
        match self {
            LocationKind::City => "CITY",
            LocationKind::Airport => "AIRPORT",
            LocationKind::Any => "CITY,AIRPORT",
        }
    }
}

/// Upstream travel provider. Every call returns a list; providers wrap
/// single-object responses.
#[async_trait]
pub trait TravelProvider: Send + Sync {
    async fn search_cities(&self, keyword: &str) -> ProviderResult<Vec<Value>>;

    async fn search_locations(&self, keyword: &str, kind: LocationKind)
        -> ProviderResult<Vec<Value>>;

    async fn airports_near(&self, point: GeoPoint) -> ProviderResult<Vec<Value>>;

    async fn flight_offers(&self, query: &OfferQuery) -> ProviderResult<Vec<Offer>>;

    async fn flight_dates(&self, origin: &str, destination: &str) -> ProviderResult<Vec<Value>>;

    async fn hotels_by_city(&self, city_code: &str) -> ProviderResult<Vec<Value>>;

    async fn activities_near(&self, point: GeoPoint, radius_km: u32)
        -> ProviderResult<Vec<Value>>;

    async fn activities_in_box(&self, area: GeoBox) -> ProviderResult<Vec<Value>>;
}

/// Waits between retry attempts. Swapped for a no-op in tests.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Source of "now" as fractional epoch seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Relational store for journeys and their child rows.
#[async_trait]
pub trait JourneyStore: Send + Sync {
    async fn insert_journey(&self, journey: &NewJourney) -> Result<JourneyId>;
    async fn insert_flights(&self, journey_id: JourneyId, rows: &[FlightRow]) -> Result<()>;
    async fn insert_accommodations(
        &self,
        journey_id: JourneyId,
        rows: &[AccommodationRow],
    ) -> Result<()>;
    async fn insert_activities(&self, journey_id: JourneyId, rows: &[ActivityRow]) -> Result<()>;
    async fn insert_extras(&self, journey_id: JourneyId, rows: &[ExtraRow]) -> Result<()>;
}
