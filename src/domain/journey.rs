use serde::{Deserialize, Serialize};

/// Parent record for a planned trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJourney {
    pub user_id: i64,
    pub destination_country: Option<String>,
    pub destination_city: String,
    pub budget: f64,
}

pub type JourneyId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRow {
    pub airline: Option<String>,
    pub origin_code: Option<String>,
    pub destination_code: Option<String>,
    pub departure_date: Option<String>,
    pub arrival_date: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccommodationRow {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: String,
    pub price_per_night: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRow {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

/// Placeholder rows added to every seeded journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraRow {
    pub kind: ExtraKind,
    pub name: String,
    pub category: String,
    pub price_hint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraKind {
    Transportation,
    FoodChoice,
    ShoppingChoice,
}

impl ExtraRow {
    pub fn defaults() -> Vec<ExtraRow> {
        vec![
            ExtraRow {
                kind: ExtraKind::Transportation,
                name: "City Transit".to_string(),
                category: "Metro".to_string(),
                price_hint: "15.0".to_string(),
            },
            ExtraRow {
                kind: ExtraKind::FoodChoice,
                name: "Local Bistro".to_string(),
                category: "Mediterranean".to_string(),
                price_hint: "$$".to_string(),
            },
            ExtraRow {
                kind: ExtraKind::ShoppingChoice,
                name: "Central Mall".to_string(),
                category: "General".to_string(),
                price_hint: "$$$".to_string(),
            },
        ]
    }
}

/// What a seeding run actually wrote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedReport {
    pub journey_id: JourneyId,
    pub flights: usize,
    pub accommodations: usize,
    pub activities: usize,
    pub extras: usize,
    pub warnings: Vec<String>,
}
