// Adapters layer: concrete implementations of the domain ports (provider http, journey storage).

pub mod amadeus;
pub mod journey_store;

pub use amadeus::{AmadeusClient, AmadeusHost, AmadeusSettings};
pub use journey_store::{JourneyDocument, LocalJourneyStore};
