use crate::domain::model::{GeoBox, GeoPoint, Offer, OfferQuery};
use crate::domain::ports::{Delay, LocationKind, ProviderResult, TravelProvider};
use crate::utils::error::ProviderError;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(800),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// `base_delay * 2^attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn sleep(&self, _duration: Duration) {}
}

/// Bounded retry with exponential backoff around any upstream call.
#[derive(Clone)]
pub struct RetryingClient {
    policy: RetryPolicy,
    delay: Arc<dyn Delay>,
}

impl RetryingClient {
    pub fn new(policy: RetryPolicy, delay: Arc<dyn Delay>) -> Self {
        Self { policy, delay }
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget runs out. Only server-side (5xx) failures are
    /// retried; there is no sleep after the final attempt.
    pub async fn call<T, F, Fut>(&self, label: &str, mut operation: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = ProviderResult<T>> + Send,
    {
        let attempts = self.policy.max_retries.max(1);
        let mut attempt = 0;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                tracing::debug!("{} failed without retry: {}", label, err);
                return Err(err);
            }

            if attempt + 1 >= attempts {
                tracing::warn!(
                    "{} failed after {} attempt(s): {}",
                    label,
                    attempts,
                    err
                );
                return Err(ProviderError::Exhausted {
                    attempts,
                    detail: err.to_string(),
                });
            }

            let wait = self.policy.backoff(attempt);
            tracing::warn!(
                "{} attempt {}/{} failed ({}), retrying in {:?}",
                label,
                attempt + 1,
                attempts,
                err,
                wait
            );
            self.delay.sleep(wait).await;
            attempt += 1;
        }
    }
}

/// Decorates a provider so that every call goes through a [`RetryingClient`].
pub struct RetryingProvider<P: TravelProvider> {
    inner: P,
    client: RetryingClient,
}

impl<P: TravelProvider> RetryingProvider<P> {
    pub fn new(inner: P, client: RetryingClient) -> Self {
        Self { inner, client }
    }
}

#[async_trait]
impl<P: TravelProvider> TravelProvider for RetryingProvider<P> {
    async fn search_cities(&self, keyword: &str) -> ProviderResult<Vec<Value>> {
        self.client
            .call("city search", || self.inner.search_cities(keyword))
            .await
    }

    async fn search_locations(
        &self,
        keyword: &str,
        kind: LocationKind,
    ) -> ProviderResult<Vec<Value>> {
        self.client
            .call("location search", || self.inner.search_locations(keyword, kind))
            .await
    }

    async fn airports_near(&self, point: GeoPoint) -> ProviderResult<Vec<Value>> {
        self.client
            .call("airport geo search", || self.inner.airports_near(point))
            .await
    }

    async fn flight_offers(&self, query: &OfferQuery) -> ProviderResult<Vec<Offer>> {
        self.client
            .call("flight offers", || self.inner.flight_offers(query))
            .await
    }

    async fn flight_dates(&self, origin: &str, destination: &str) -> ProviderResult<Vec<Value>> {
        self.client
            .call("flight dates", || self.inner.flight_dates(origin, destination))
            .await
    }

    async fn hotels_by_city(&self, city_code: &str) -> ProviderResult<Vec<Value>> {
        self.client
            .call("hotels by city", || self.inner.hotels_by_city(city_code))
            .await
    }

    async fn activities_near(
        &self,
        point: GeoPoint,
        radius_km: u32,
    ) -> ProviderResult<Vec<Value>> {
        self.client
            .call("activities near", || {
                self.inner.activities_near(point, radius_km)
            })
            .await
    }

    async fn activities_in_box(&self, area: GeoBox) -> ProviderResult<Vec<Value>> {
        self.client
            .call("activities in box", || self.inner.activities_in_box(area))
            .await
    }
}
