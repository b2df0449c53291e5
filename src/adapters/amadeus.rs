//! Amadeus self-service REST client.
//!
//! Authenticates with the OAuth2 client-credentials grant and keeps the
//! bearer token until shortly before it expires. Every call returns the
//! `data` member of the response as a list.

use crate::domain::model::{GeoBox, GeoPoint, Offer, OfferQuery};
use crate::domain::ports::{LocationKind, ProviderResult, TravelProvider};
use crate::utils::error::ProviderError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const TOKEN_PATH: &str = "/v1/security/oauth2/token";
const CORRELATION_HEADER: &str = "x-correlationid";
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmadeusHost {
    #[default]
    Test,
    Production,
}

impl AmadeusHost {
    pub fn base_url(&self) -> &'static str {
        match self {
            AmadeusHost::Test => "https://test.api.amadeus.com",
            AmadeusHost::Production => "https://api.amadeus.com",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AmadeusSettings {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    1799
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct AmadeusClient {
    client: Client,
    settings: AmadeusSettings,
    token: Mutex<Option<AccessToken>>,
}

impl AmadeusClient {
    pub fn new(settings: AmadeusSettings) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(Self {
            client,
            settings,
            token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        self.settings.base_url.trim_end_matches('/')
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    async fn access_token(&self) -> ProviderResult<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("requesting new access token from {}", self.base_url());
        let response = self
            .client
            .post(self.url(TOKEN_PATH))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Auth {
                message: format!("token request rejected with HTTP {}: {}", status.as_u16(), body.trim()),
            });
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *guard = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    async fn get_data(&self, path: &str, query: &[(&str, String)]) -> ProviderResult<Vec<Value>> {
        let token = self.access_token().await?;
        let request = self.client.get(self.url(path)).bearer_auth(token).query(query);
        let body = self.send(request, path).await?;
        Ok(data_items(body))
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> ProviderResult<Value> {
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("GET {} -> {}", path, status);

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let correlation_id = response
            .headers()
            .get(CORRELATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();
        let err = ProviderError::from_status(status.as_u16(), &body, correlation_id);
        if err.is_fatal() {
            // The next call fetches a fresh token instead of reusing a revoked one.
            self.token.lock().await.take();
        }
        Err(err)
    }
}

/// Extracts `data`, wrapping a single object into a one-element list.
pub fn data_items(body: Value) -> Vec<Value> {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(item) => vec![item],
        },
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

#[async_trait]
impl TravelProvider for AmadeusClient {
    async fn search_cities(&self, keyword: &str) -> ProviderResult<Vec<Value>> {
        self.get_data(
            "/v1/reference-data/locations/cities",
            &[("keyword", keyword.to_string())],
        )
        .await
    }

    async fn search_locations(
        &self,
        keyword: &str,
        kind: LocationKind,
    ) -> ProviderResult<Vec<Value>> {
        self.get_data(
            "/v1/reference-data/locations",
            &[
                ("keyword", keyword.to_string()),
                ("subType", kind.sub_type().to_string()),
            ],
        )
        .await
    }

    async fn airports_near(&self, point: GeoPoint) -> ProviderResult<Vec<Value>> {
        self.get_data(
            "/v1/reference-data/locations/airports",
            &[
                ("latitude", point.latitude.to_string()),
                ("longitude", point.longitude.to_string()),
            ],
        )
        .await
    }

    async fn flight_offers(&self, query: &OfferQuery) -> ProviderResult<Vec<Offer>> {
        let items = self
            .get_data(
                "/v2/shopping/flight-offers",
                &[
                    ("originLocationCode", query.origin_code.clone()),
                    ("destinationLocationCode", query.destination_code.clone()),
                    ("departureDate", query.date.format("%Y-%m-%d").to_string()),
                    ("adults", query.party_size.to_string()),
                ],
            )
            .await?;
        Ok(items.into_iter().map(Offer).collect())
    }

    async fn flight_dates(&self, origin: &str, destination: &str) -> ProviderResult<Vec<Value>> {
        self.get_data(
            "/v1/shopping/flight-dates",
            &[
                ("origin", origin.to_string()),
                ("destination", destination.to_string()),
            ],
        )
        .await
    }

    async fn hotels_by_city(&self, city_code: &str) -> ProviderResult<Vec<Value>> {
        self.get_data(
            "/v1/reference-data/locations/hotels/by-city",
            &[("cityCode", city_code.to_string())],
        )
        .await
    }

    async fn activities_near(
        &self,
        point: GeoPoint,
        radius_km: u32,
    ) -> ProviderResult<Vec<Value>> {
        self.get_data(
            "/v1/shopping/activities",
            &[
                ("latitude", point.latitude.to_string()),
                ("longitude", point.longitude.to_string()),
                ("radius", radius_km.to_string()),
            ],
        )
        .await
    }

    async fn activities_in_box(&self, area: GeoBox) -> ProviderResult<Vec<Value>> {
        self.get_data(
            "/v1/shopping/activities/by-square",
            &[
                ("north", area.north.to_string()),
                ("west", area.west.to_string()),
                ("south", area.south.to_string()),
                ("east", area.east.to_string()),
            ],
        )
        .await
    }
}
