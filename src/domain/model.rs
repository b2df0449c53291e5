use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceRole {
    Origin,
    Destination,
}

impl fmt::Display for PlaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceRole::Origin => write!(f, "origin"),
            PlaceRole::Destination => write!(f, "destination"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    City,
    Airport,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedCode {
    pub code: String,
    pub granularity: Granularity,
    pub rank: usize,
}

/// City code plus airport codes for one place, best candidate first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPlace {
    pub city_code: Option<String>,
    pub airport_codes: Vec<String>,
}

impl ResolvedPlace {
    pub fn is_empty(&self) -> bool {
        self.city_code.is_none() && self.airport_codes.is_empty()
    }

    pub fn city(&self) -> Option<ResolvedCode> {
        self.city_code.as_ref().map(|code| ResolvedCode {
            code: code.clone(),
            granularity: Granularity::City,
            rank: 0,
        })
    }

    /// Top `limit` airport codes with their rank.
    pub fn airports(&self, limit: usize) -> Vec<ResolvedCode> {
        self.airport_codes
            .iter()
            .take(limit)
            .enumerate()
            .map(|(rank, code)| ResolvedCode {
                code: code.clone(),
                granularity: Granularity::Airport,
                rank,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttemptPair {
    pub origin_code: String,
    pub destination_code: String,
}

impl AttemptPair {
    pub fn new(origin_code: impl Into<String>, destination_code: impl Into<String>) -> Self {
        Self {
            origin_code: origin_code.into(),
            destination_code: destination_code.into(),
        }
    }
}

impl fmt::Display for AttemptPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.origin_code, self.destination_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferQuery {
    pub origin_code: String,
    pub destination_code: String,
    pub date: NaiveDate,
    pub party_size: u32,
}

impl OfferQuery {
    pub fn new(pair: &AttemptPair, date: NaiveDate, party_size: u32) -> Self {
        Self {
            origin_code: pair.origin_code.clone(),
            destination_code: pair.destination_code.clone(),
            date,
            party_size,
        }
    }

    pub fn cache_key(&self) -> String {
        format!(
            "flight-offers:{}:{}:{}:{}",
            self.origin_code,
            self.destination_code,
            self.date.format("%Y-%m-%d"),
            self.party_size
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBox {
    pub north: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
}

/// Coordinates are rounded so that near-identical lookups share one entry.
fn round_coordinate(value: f64) -> String {
    format!("{:.3}", value)
}

impl GeoPoint {
    pub fn cache_key(&self, radius_km: u32) -> String {
        format!(
            "activities:{}:{}:{}",
            round_coordinate(self.latitude),
            round_coordinate(self.longitude),
            radius_km
        )
    }
}

impl GeoBox {
    pub fn cache_key(&self) -> String {
        format!(
            "activities-box:{}:{}:{}:{}",
            round_coordinate(self.north),
            round_coordinate(self.west),
            round_coordinate(self.south),
            round_coordinate(self.east)
        )
    }
}

/// Provider-shaped flight offer. Only the price and segment codes are read,
/// everything else passes through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Offer(pub Value);

impl Offer {
    /// `price.total`, accepting either a JSON number or a numeric string.
    pub fn total_price(&self) -> Option<f64> {
        match self.0.pointer("/price/total")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn currency(&self) -> Option<&str> {
        self.0.pointer("/price/currency")?.as_str()
    }

    fn segments(&self) -> Option<&Vec<Value>> {
        self.0.pointer("/itineraries/0/segments")?.as_array()
    }

    pub fn first_departure_code(&self) -> Option<&str> {
        self.segments()?
            .first()?
            .pointer("/departure/iataCode")?
            .as_str()
    }

    pub fn last_arrival_code(&self) -> Option<&str> {
        self.segments()?.last()?.pointer("/arrival/iataCode")?.as_str()
    }

    pub fn carrier_code(&self) -> Option<&str> {
        self.segments()?.first()?.get("carrierCode")?.as_str()
    }

    pub fn departure_time(&self) -> Option<&str> {
        self.segments()?.first()?.pointer("/departure/at")?.as_str()
    }

    pub fn arrival_time(&self) -> Option<&str> {
        self.segments()?.last()?.pointer("/arrival/at")?.as_str()
    }
}

/// Outcome of one top-level resolution. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub offers: Vec<Offer>,
    pub used_origin_code: Option<String>,
    pub used_destination_code: Option<String>,
    pub used_date: NaiveDate,
    pub used_fallback: bool,
}

impl ResolutionResult {
    pub fn found(pair: &AttemptPair, date: NaiveDate, offers: Vec<Offer>, fallback: bool) -> Self {
        Self {
            offers,
            used_origin_code: Some(pair.origin_code.clone()),
            used_destination_code: Some(pair.destination_code.clone()),
            used_date: date,
            used_fallback: fallback,
        }
    }

    pub fn empty(first_pair: Option<&AttemptPair>, date: NaiveDate) -> Self {
        Self {
            offers: Vec::new(),
            used_origin_code: first_pair.map(|pair| pair.origin_code.clone()),
            used_destination_code: first_pair.map(|pair| pair.destination_code.clone()),
            used_date: date,
            used_fallback: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn sample_price(&self) -> Option<f64> {
        self.offers.first().and_then(Offer::total_price)
    }
}
