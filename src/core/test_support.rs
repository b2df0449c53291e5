//! In-memory provider used by the unit tests of the core modules.

use crate::domain::model::{GeoBox, GeoPoint, Offer, OfferQuery};
use crate::domain::ports::{LocationKind, ProviderResult, TravelProvider};
use crate::utils::error::ProviderError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;

pub fn sample_offer(origin: &str, destination: &str, price: &str) -> Offer {
    Offer(json!({
        "type": "flight-offer",
        "price": {"total": price, "currency": "EUR"},
        "itineraries": [{
            "segments": [{
                "carrierCode": "A3",
                "departure": {"iataCode": origin, "at": "2026-01-15T08:00:00"},
                "arrival": {"iataCode": destination, "at": "2026-01-15T12:30:00"}
            }]
        }]
    }))
}

fn offer_key(origin: &str, destination: &str, date: &str) -> String {
    format!("{}:{}:{}", origin, destination, date)
}

#[derive(Default)]
pub struct FakeProvider {
    cities: HashMap<String, Vec<Value>>,
    airports: HashMap<String, Vec<Value>>,
    nearby_airports: Vec<Value>,
    offers: HashMap<String, Vec<Offer>>,
    offer_errors: HashMap<String, ProviderError>,
    dates: HashMap<String, Vec<Value>>,
    date_errors: HashMap<String, ProviderError>,
    hotels: HashMap<String, Vec<Value>>,
    activities: Vec<Value>,
    city_error: Option<ProviderError>,
    hotel_error: Option<ProviderError>,
    calls: Mutex<Vec<(&'static str, String)>>,
}

impl FakeProvider {
    pub fn with_cities(mut self, keyword: &str, items: Vec<Value>) -> Self {
        self.cities.insert(keyword.trim().to_lowercase(), items);
        self
    }

    pub fn with_city_code(self, keyword: &str, code: &str) -> Self {
        self.with_cities(keyword, vec![json!({"iataCode": code})])
    }

    pub fn with_airports(self, keyword: &str, codes: &[&str]) -> Self {
        let items = codes.iter().map(|code| json!({"iataCode": code})).collect();
        self.with_airports_raw(keyword, items)
    }

    pub fn with_airports_raw(mut self, keyword: &str, items: Vec<Value>) -> Self {
        self.airports.insert(keyword.trim().to_lowercase(), items);
        self
    }

    pub fn with_nearby_airports(mut self, items: Vec<Value>) -> Self {
        self.nearby_airports = items;
        self
    }

    pub fn with_offers(mut self, origin: &str, destination: &str, date: &str, count: usize) -> Self {
        let offers = (0..count)
            .map(|i| sample_offer(origin, destination, &format!("{}.00", 100 + i)))
            .collect();
        self.offers.insert(offer_key(origin, destination, date), offers);
        self
    }

    pub fn with_offer_error(
        mut self,
        origin: &str,
        destination: &str,
        date: &str,
        error: ProviderError,
    ) -> Self {
        self.offer_errors
            .insert(offer_key(origin, destination, date), error);
        self
    }

    pub fn with_dates(mut self, origin: &str, destination: &str, dates: &[&str]) -> Self {
        let items = dates
            .iter()
            .map(|date| json!({"type": "flight-date", "departureDate": date}))
            .collect();
        self.dates
            .insert(format!("{}:{}", origin, destination), items);
        self
    }

    pub fn fail_dates(mut self, origin: &str, destination: &str, error: ProviderError) -> Self {
        self.date_errors
            .insert(format!("{}:{}", origin, destination), error);
        self
    }

    pub fn with_hotels(mut self, city_code: &str, items: Vec<Value>) -> Self {
        self.hotels.insert(city_code.to_string(), items);
        self
    }

    pub fn with_activities(mut self, items: Vec<Value>) -> Self {
        self.activities = items;
        self
    }

    pub fn fail_cities(mut self, error: ProviderError) -> Self {
        self.city_error = Some(error);
        self
    }

    pub fn fail_hotels(mut self, error: ProviderError) -> Self {
        self.hotel_error = Some(error);
        self
    }

    fn record(&self, method: &'static str, args: String) {
        self.calls.lock().push((method, args));
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(name, _)| *name == method)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// `origin:destination:date` for every flight-offer request, in order.
    pub fn offer_requests(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(name, _)| *name == "flight_offers")
            .map(|(_, args)| args.clone())
            .collect()
    }
}

#[async_trait]
impl TravelProvider for FakeProvider {
    async fn search_cities(&self, keyword: &str) -> ProviderResult<Vec<Value>> {
        self.record("search_cities", keyword.to_string());
        if let Some(err) = &self.city_error {
            return Err(err.clone());
        }
        Ok(self
            .cities
            .get(&keyword.trim().to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn search_locations(
        &self,
        keyword: &str,
        _kind: LocationKind,
    ) -> ProviderResult<Vec<Value>> {
        self.record("search_locations", keyword.to_string());
        Ok(self
            .airports
            .get(&keyword.trim().to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn airports_near(&self, _point: GeoPoint) -> ProviderResult<Vec<Value>> {
        self.record("airports_near", String::new());
        Ok(self.nearby_airports.clone())
    }

    async fn flight_offers(&self, query: &OfferQuery) -> ProviderResult<Vec<Offer>> {
        let key = offer_key(
            &query.origin_code,
            &query.destination_code,
            &query.date.format("%Y-%m-%d").to_string(),
        );
        self.record("flight_offers", key.clone());
        if let Some(err) = self.offer_errors.get(&key) {
            return Err(err.clone());
        }
        Ok(self.offers.get(&key).cloned().unwrap_or_default())
    }

    async fn flight_dates(&self, origin: &str, destination: &str) -> ProviderResult<Vec<Value>> {
        let key = format!("{}:{}", origin, destination);
        self.record("flight_dates", key.clone());
        if let Some(err) = self.date_errors.get(&key) {
            return Err(err.clone());
        }
        Ok(self.dates.get(&key).cloned().unwrap_or_default())
    }

    async fn hotels_by_city(&self, city_code: &str) -> ProviderResult<Vec<Value>> {
        self.record("hotels_by_city", city_code.to_string());
        if let Some(err) = &self.hotel_error {
            return Err(err.clone());
        }
        Ok(self.hotels.get(city_code).cloned().unwrap_or_default())
    }

    async fn activities_near(
        &self,
        _point: GeoPoint,
        _radius_km: u32,
    ) -> ProviderResult<Vec<Value>> {
        self.record("activities_near", String::new());
        Ok(self.activities.clone())
    }

    async fn activities_in_box(&self, _area: GeoBox) -> ProviderResult<Vec<Value>> {
        self.record("activities_in_box", String::new());
        Ok(self.activities.clone())
    }
}
