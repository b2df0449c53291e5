use anyhow::Result;
use chrono::NaiveDate;
use httpmock::prelude::*;
use offer_resolver::adapters::{AmadeusClient, AmadeusSettings};
use offer_resolver::core::retry::NoDelay;
use offer_resolver::domain::model::{AttemptPair, OfferQuery};
use offer_resolver::domain::ports::{LocationKind, TravelProvider};
use offer_resolver::{ProviderError, RetryPolicy, RetryingClient, RetryingProvider};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn client_for(server: &MockServer) -> AmadeusClient {
    AmadeusClient::new(AmadeusSettings {
        base_url: server.base_url(),
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/security/oauth2/token")
            .body_contains("grant_type=client_credentials")
            .body_contains("client_id=client-id");
        then.status(200).json_body(json!({
            "type": "amadeusOAuth2Token",
            "access_token": "test_token_123",
            "expires_in": 1799
        }));
    })
}

fn query(origin: &str, destination: &str, date: &str) -> OfferQuery {
    OfferQuery::new(
        &AttemptPair::new(origin, destination),
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        2,
    )
}

/// Token is requested once and reused as a bearer header on every call.
#[tokio::test]
async fn test_token_is_cached_and_sent_as_bearer() -> Result<()> {
    let server = MockServer::start();
    let token_mock = mock_token(&server);

    let cities_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/reference-data/locations/cities")
            .query_param("keyword", "Paris")
            .header("authorization", "Bearer test_token_123");
        then.status(200)
            .json_body(json!({"data": [{"iataCode": "PAR", "name": "PARIS"}]}));
    });
    let airports_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/reference-data/locations")
            .query_param("keyword", "Paris")
            .query_param("subType", "AIRPORT")
            .header("authorization", "Bearer test_token_123");
        then.status(200)
            .json_body(json!({"data": [{"iataCode": "CDG"}, {"iataCode": "ORY"}]}));
    });

    let client = client_for(&server);
    let cities = client.search_cities("Paris").await?;
    let airports = client.search_locations("Paris", LocationKind::Airport).await?;

    assert_eq!(cities[0]["iataCode"], "PAR");
    assert_eq!(airports.len(), 2);
    token_mock.assert_hits(1);
    cities_mock.assert();
    airports_mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_flight_offers_query_parameters() -> Result<()> {
    let server = MockServer::start();
    mock_token(&server);

    let offers_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v2/shopping/flight-offers")
            .query_param("originLocationCode", "PAR")
            .query_param("destinationLocationCode", "ATH")
            .query_param("departureDate", "2026-01-15")
            .query_param("adults", "2");
        then.status(200).json_body(json!({
            "meta": {"count": 1},
            "data": [{"type": "flight-offer", "price": {"total": "245.30", "currency": "EUR"}}]
        }));
    });

    let offers = client_for(&server)
        .flight_offers(&query("PAR", "ATH", "2026-01-15"))
        .await?;

    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].total_price(), Some(245.30));
    offers_mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_single_object_response_is_wrapped() -> Result<()> {
    let server = MockServer::start();
    mock_token(&server);
    server.mock(|when, then| {
        when.method(GET).path("/v1/reference-data/locations/hotels/by-city");
        then.status(200)
            .json_body(json!({"data": {"name": "Hotel Plaka", "hotelId": "ATHPLK01"}}));
    });

    let hotels = client_for(&server).hotels_by_city("ATH").await?;
    assert_eq!(hotels.len(), 1);
    assert_eq!(hotels[0]["hotelId"], "ATHPLK01");
    Ok(())
}

/// Three 500s exhaust the budget; the aggregated error keeps body and correlation id.
#[tokio::test]
async fn test_server_errors_are_retried_until_exhausted() -> Result<()> {
    let server = MockServer::start();
    mock_token(&server);
    let offers_mock = server.mock(|when, then| {
        when.method(GET).path("/v2/shopping/flight-offers");
        then.status(500)
            .header("x-correlationid", "corr-42")
            .body("internal error");
    });

    let provider = RetryingProvider::new(
        client_for(&server),
        RetryingClient::new(RetryPolicy::default(), Arc::new(NoDelay)),
    );
    let err = provider
        .flight_offers(&query("PAR", "ATH", "2026-01-15"))
        .await
        .unwrap_err();

    match err {
        ProviderError::Exhausted { attempts, detail } => {
            assert_eq!(attempts, 3);
            assert_eq!(detail, "internal error [correlation_id=corr-42]");
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    offers_mock.assert_hits(3);
    Ok(())
}

#[tokio::test]
async fn test_client_errors_are_not_retried() -> Result<()> {
    let server = MockServer::start();
    mock_token(&server);
    let dates_mock = server.mock(|when, then| {
        when.method(GET).path("/v1/shopping/flight-dates");
        then.status(404).body("no dates");
    });

    let provider = RetryingProvider::new(
        client_for(&server),
        RetryingClient::new(RetryPolicy::default(), Arc::new(NoDelay)),
    );
    let err = provider.flight_dates("PAR", "ATH").await.unwrap_err();

    assert!(matches!(err, ProviderError::NotFound { .. }));
    dates_mock.assert_hits(1);
    Ok(())
}

#[tokio::test]
async fn test_rejected_credentials_are_an_auth_failure() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/security/oauth2/token");
        then.status(401).json_body(json!({"error": "invalid_client"}));
    });

    let err = client_for(&server).search_cities("Paris").await.unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, ProviderError::Auth { .. }));
    Ok(())
}
