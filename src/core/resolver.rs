use crate::core::cache::OfferCache;
use crate::domain::model::{GeoPoint, ResolvedPlace};
use crate::domain::ports::{LocationKind, ProviderResult, TravelProvider};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// City names the provider is known to resolve to the wrong metropolitan area.
pub fn default_overrides() -> BTreeMap<String, String> {
    [
        ("Paris", "PAR"),
        ("Athens", "ATH"),
        ("Madrid", "MAD"),
        ("Moscow", "MOW"),
        ("Beijing", "BJS"),
        ("London", "LON"),
        ("Rome", "ROM"),
    ]
    .into_iter()
    .map(|(name, code)| (name.to_string(), code.to_string()))
    .collect()
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn item_code<'a>(item: &'a Value, fallback_pointer: &str) -> Option<&'a str> {
    item.get("iataCode")
        .and_then(Value::as_str)
        .or_else(|| item.pointer(fallback_pointer).and_then(Value::as_str))
        .filter(|code| !code.is_empty())
}

/// Turns free-text place names into provider location codes.
pub struct CodeResolver {
    provider: Arc<dyn TravelProvider>,
    cache: Arc<OfferCache>,
    overrides: HashMap<String, String>,
    location_ttl: Duration,
}

impl CodeResolver {
    pub fn new(
        provider: Arc<dyn TravelProvider>,
        cache: Arc<OfferCache>,
        overrides: &BTreeMap<String, String>,
        location_ttl: Duration,
    ) -> Self {
        let overrides = overrides
            .iter()
            .map(|(name, code)| (normalize(name), code.trim().to_uppercase()))
            .collect();
        Self {
            provider,
            cache,
            overrides,
            location_ttl,
        }
    }

    pub fn preferred_code(&self, place: &str) -> Option<&str> {
        self.overrides.get(&normalize(place)).map(String::as_str)
    }

    /// Resolves `place` with two independent lookups. A failed lookup empties
    /// its own half of the result; only fatal failures (bad credentials) are
    /// returned as errors.
    pub async fn resolve(&self, place: &str) -> ProviderResult<ResolvedPlace> {
        let keyword = place.trim();
        let preferred = self.preferred_code(keyword).map(str::to_string);

        let city_code = match self.lookup(keyword, LocationKind::City).await {
            Ok(items) => preferred.clone().or_else(|| {
                items
                    .iter()
                    .find_map(|item| item_code(item, "/address/cityCode"))
                    .map(str::to_string)
            }),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!("city lookup for '{}' failed: {}", keyword, e);
                None
            }
        };

        let mut airport_codes = match self.lookup(keyword, LocationKind::Airport).await {
            Ok(items) => collect_codes(&items),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!("airport lookup for '{}' failed: {}", keyword, e);
                Vec::new()
            }
        };

        if let Some(code) = &preferred {
            if let Some(position) = airport_codes.iter().position(|c| c == code) {
                let preferred_airport = airport_codes.remove(position);
                airport_codes.insert(0, preferred_airport);
            }
        }

        tracing::debug!(
            "resolved '{}' to city={:?} airports={:?}",
            keyword,
            city_code,
            airport_codes
        );

        Ok(ResolvedPlace {
            city_code,
            airport_codes,
        })
    }

    /// Coordinates of the first city match that carries a `geoCode`.
    pub async fn geo_code(&self, place: &str) -> ProviderResult<Option<GeoPoint>> {
        let items = self.lookup(place.trim(), LocationKind::City).await?;
        Ok(items.iter().find_map(|item| {
            Some(GeoPoint {
                latitude: item.pointer("/geoCode/latitude")?.as_f64()?,
                longitude: item.pointer("/geoCode/longitude")?.as_f64()?,
            })
        }))
    }

    /// Airports around a coordinate, nearest first as ranked by the provider.
    pub async fn resolve_point(&self, point: GeoPoint) -> ProviderResult<ResolvedPlace> {
        let key = format!(
            "airports-near:{:.3}:{:.3}",
            point.latitude, point.longitude
        );
        let items = match self.cache.get_as::<Vec<Value>>(&key, self.location_ttl) {
            Some(items) => items,
            None => {
                let items = self.provider.airports_near(point).await?;
                self.cache.set_as(&key, &items);
                items
            }
        };

        Ok(ResolvedPlace {
            city_code: None,
            airport_codes: collect_codes(&items),
        })
    }

    async fn lookup(&self, keyword: &str, kind: LocationKind) -> ProviderResult<Vec<Value>> {
        let key = format!("locations:{}:{}", kind.sub_type(), normalize(keyword));
        if let Some(items) = self.cache.get_as::<Vec<Value>>(&key, self.location_ttl) {
            return Ok(items);
        }

        let items = match kind {
            LocationKind::City => self.provider.search_cities(keyword).await?,
            LocationKind::Airport | LocationKind::Any => {
                self.provider.search_locations(keyword, kind).await?
            }
        };
        self.cache.set_as(&key, &items);
        Ok(items)
    }
}

fn collect_codes(items: &[Value]) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for code in items.iter().filter_map(|item| item_code(item, "/address/iataCode")) {
        if !codes.iter().any(|existing| existing == code) {
            codes.push(code.to_string());
        }
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::FakeProvider;
    use crate::utils::error::ProviderError;
    use serde_json::json;

    fn resolver(provider: FakeProvider) -> CodeResolver {
        CodeResolver::new(
            Arc::new(provider),
            Arc::new(OfferCache::in_memory(Duration::from_secs(300))),
            &default_overrides(),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_override_replaces_ambiguous_city_and_leads_airports() {
        let provider = FakeProvider::default()
            .with_cities("Paris", vec![json!({"iataCode": "PRX"}), json!({"iataCode": "PAR"})])
            .with_airports("Paris", &["CDG", "ORY", "PAR"]);

        let place = resolver(provider).resolve("Paris").await.unwrap();

        assert_eq!(place.city_code.as_deref(), Some("PAR"));
        assert_eq!(place.airport_codes, vec!["PAR", "CDG", "ORY"]);
    }

    #[tokio::test]
    async fn test_override_matches_case_insensitively() {
        let provider = FakeProvider::default().with_cities("athens", vec![json!({"iataCode": "AHN"})]);
        let place = resolver(provider).resolve("  athens ").await.unwrap();
        assert_eq!(place.city_code.as_deref(), Some("ATH"));
    }

    #[tokio::test]
    async fn test_unknown_name_uses_first_provider_result() {
        let provider = FakeProvider::default()
            .with_cities("Lyon", vec![json!({"address": {"cityCode": "LYS"}})])
            .with_airports_raw(
                "Lyon",
                vec![json!({"address": {"iataCode": "LYS"}}), json!({"iataCode": ""})],
            );

        let place = resolver(provider).resolve("Lyon").await.unwrap();
        assert_eq!(place.city_code.as_deref(), Some("LYS"));
        assert_eq!(place.airport_codes, vec!["LYS"]);
    }

    #[tokio::test]
    async fn test_failed_half_degrades_to_empty() {
        let provider = FakeProvider::default()
            .with_airports("Oslo", &["OSL"])
            .fail_cities(ProviderError::from_status(500, "boom", None));

        let place = resolver(provider).resolve("Oslo").await.unwrap();
        assert_eq!(place.city_code, None);
        assert_eq!(place.airport_codes, vec!["OSL"]);
    }

    #[tokio::test]
    async fn test_auth_failure_is_propagated() {
        let provider = FakeProvider::default()
            .fail_cities(ProviderError::from_status(401, "invalid token", None));

        let result = resolver(provider).resolve("Oslo").await;
        assert!(matches!(result, Err(ProviderError::Auth { .. })));
    }

    #[tokio::test]
    async fn test_lookups_are_cached() {
        let provider = Arc::new(
            FakeProvider::default()
                .with_cities("Madrid", vec![json!({"iataCode": "MAD"})])
                .with_airports("Madrid", &["MAD"]),
        );
        let resolver = CodeResolver::new(
            provider.clone(),
            Arc::new(OfferCache::in_memory(Duration::from_secs(300))),
            &BTreeMap::new(),
            Duration::from_secs(3600),
        );

        resolver.resolve("Madrid").await.unwrap();
        resolver.resolve("madrid").await.unwrap();
        assert_eq!(provider.calls("search_cities"), 1);
        assert_eq!(provider.calls("search_locations"), 1);
    }

    #[tokio::test]
    async fn test_geo_code_reuses_city_lookup() {
        let provider = Arc::new(FakeProvider::default().with_cities(
            "Athens",
            vec![json!({"iataCode": "ATH", "geoCode": {"latitude": 37.97, "longitude": 23.72}})],
        ));
        let resolver = CodeResolver::new(
            provider.clone(),
            Arc::new(OfferCache::in_memory(Duration::from_secs(300))),
            &default_overrides(),
            Duration::from_secs(3600),
        );

        resolver.resolve("Athens").await.unwrap();
        let point = resolver.geo_code("Athens").await.unwrap().unwrap();
        assert_eq!(point.latitude, 37.97);
        assert_eq!(provider.calls("search_cities"), 1);
    }

    #[tokio::test]
    async fn test_resolve_point_lists_airports() {
        let provider = FakeProvider::default()
            .with_nearby_airports(vec![json!({"iataCode": "MAD"}), json!({"iataCode": "TOJ"})]);
        let place = resolver(provider)
            .resolve_point(GeoPoint {
                latitude: 40.4168,
                longitude: -3.7038,
            })
            .await
            .unwrap();
        assert_eq!(place.airport_codes, vec!["MAD", "TOJ"]);
        assert!(place.city_code.is_none());
    }
}
