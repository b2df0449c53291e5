pub mod cache;
pub mod orchestrator;
pub mod resolver;
pub mod retry;
pub mod seeder;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::domain::model::{Offer, OfferQuery, ResolutionResult, ResolvedPlace};
pub use crate::domain::ports::{Clock, Delay, JourneyStore, TravelProvider};
pub use crate::utils::error::Result;
