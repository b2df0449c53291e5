use crate::adapters::amadeus::{AmadeusHost, AmadeusSettings};
use crate::core::orchestrator::ResolutionSettings;
use crate::core::resolver::default_overrides;
use crate::core::retry::RetryPolicy;
use crate::utils::error::{OfferError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Whole-application settings, every section optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub resolution: ResolutionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub host: AmadeusHost,
    /// Overrides the URL implied by `host`; used for local mocks.
    pub base_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            host: AmadeusHost::Test,
            base_url: None,
            client_id: None,
            client_secret: None,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub default_ttl_seconds: u64,
    pub location_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./cache"),
            default_ttl_seconds: 300,
            location_ttl_seconds: 86_400,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    pub fallback_date_limit: usize,
    pub airports_per_side: usize,
    pub activity_radius_km: u32,
    pub overrides: BTreeMap<String, String>,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            fallback_date_limit: 3,
            airports_per_side: 1,
            activity_radius_km: 1,
            overrides: default_overrides(),
        }
    }
}

fn is_unset(value: &Option<String>) -> bool {
    match value {
        None => true,
        // An unsubstituted `${VAR}` placeholder counts as missing.
        Some(v) => v.trim().is_empty() || v.trim_start().starts_with("${"),
    }
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(OfferError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| OfferError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| OfferError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Applies `AMADEUS_CLIENT_ID`, `AMADEUS_CLIENT_SECRET`, `AMADEUS_HOST`
    /// and `CACHE_DEFAULT_TTL` from the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if is_unset(&self.provider.client_id) {
            self.provider.client_id = lookup("AMADEUS_CLIENT_ID");
        }
        if is_unset(&self.provider.client_secret) {
            self.provider.client_secret = lookup("AMADEUS_CLIENT_SECRET");
        }
        if let Some(host) = lookup("AMADEUS_HOST") {
            self.provider.host = match host.trim().to_lowercase().as_str() {
                "production" => AmadeusHost::Production,
                "test" => AmadeusHost::Test,
                other => {
                    return Err(OfferError::InvalidConfigValueError {
                        field: "AMADEUS_HOST".to_string(),
                        value: other.to_string(),
                        reason: "Expected 'test' or 'production'".to_string(),
                    })
                }
            };
        }
        if let Some(ttl) = lookup("CACHE_DEFAULT_TTL") {
            self.cache.default_ttl_seconds =
                ttl.trim()
                    .parse()
                    .map_err(|_| OfferError::InvalidConfigValueError {
                        field: "CACHE_DEFAULT_TTL".to_string(),
                        value: ttl.clone(),
                        reason: "Expected a number of seconds".to_string(),
                    })?;
        }
        Ok(self)
    }

    pub fn base_url(&self) -> String {
        self.provider
            .base_url
            .clone()
            .unwrap_or_else(|| self.provider.host.base_url().to_string())
    }

    /// Connection settings for the provider; credentials are mandatory.
    pub fn amadeus_settings(&self) -> Result<AmadeusSettings> {
        let credential = |value: &Option<String>, name: &str| -> Result<String> {
            if is_unset(value) {
                return Err(OfferError::ConfigError {
                    message: format!("{} is not set (config file or environment)", name),
                });
            }
            Ok(value.clone().unwrap_or_default().trim().to_string())
        };

        Ok(AmadeusSettings {
            base_url: self.base_url(),
            client_id: credential(&self.provider.client_id, "AMADEUS_CLIENT_ID")?,
            client_secret: credential(&self.provider.client_secret, "AMADEUS_CLIENT_SECRET")?,
            timeout: Duration::from_secs(self.provider.timeout_seconds),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }

    pub fn offer_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.default_ttl_seconds)
    }

    pub fn location_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.location_ttl_seconds)
    }

    pub fn resolution_settings(&self) -> ResolutionSettings {
        ResolutionSettings {
            fallback_date_limit: self.resolution.fallback_date_limit,
            airports_per_side: self.resolution.airports_per_side,
            offer_ttl: self.offer_ttl(),
            activity_radius_km: self.resolution.activity_radius_km,
        }
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("provider.base_url", &self.base_url())?;
        validation::validate_range("provider.timeout_seconds", self.provider.timeout_seconds, 1, 300)?;
        validation::validate_path("cache.dir", &self.cache.dir.to_string_lossy())?;
        validation::validate_positive_number("retry.max_retries", self.retry.max_retries as usize, 1)?;
        validation::validate_positive_number(
            "resolution.airports_per_side",
            self.resolution.airports_per_side,
            1,
        )?;
        validation::validate_range("resolution.activity_radius_km", self.resolution.activity_radius_km, 1, 20)?;

        for (name, code) in &self.resolution.overrides {
            validation::validate_non_empty_string("resolution.overrides", name)?;
            validation::validate_location_code(&format!("resolution.overrides.{}", name), code)?;
        }
        Ok(())
    }
}
