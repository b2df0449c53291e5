use crate::domain::model::PlaceRole;
use thiserror::Error;

/// How a caller should treat a failed upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Retryable,
    NonRetryable,
    NotFound,
}

/// Outcome of a failed call to the travel provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("{}", with_correlation(.message, .correlation_id))]
    Server {
        status: u16,
        message: String,
        correlation_id: Option<String>,
    },

    #[error("{}", with_correlation(.message, .correlation_id))]
    Client {
        status: u16,
        message: String,
        correlation_id: Option<String>,
    },

    #[error("{}", with_correlation(.message, .correlation_id))]
    NotFound {
        message: String,
        correlation_id: Option<String>,
    },

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    Decode(String),

    #[error("{detail}")]
    Exhausted { attempts: u32, detail: String },
}

fn with_correlation(message: &str, correlation_id: &Option<String>) -> String {
    match correlation_id {
        Some(id) => format!("{} [correlation_id={}]", message, id),
        None => message.to_string(),
    }
}

impl ProviderError {
    /// Maps an HTTP status plus body to the matching failure variant.
    pub fn from_status(status: u16, body: &str, correlation_id: Option<String>) -> Self {
        let message = if body.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            body.trim().to_string()
        };

        match status {
            500.. => ProviderError::Server {
                status,
                message,
                correlation_id,
            },
            404 => ProviderError::NotFound {
                message,
                correlation_id,
            },
            401 | 403 => ProviderError::Auth {
                message: with_correlation(&message, &correlation_id),
            },
            _ => ProviderError::Client {
                status,
                message,
                correlation_id,
            },
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ProviderError::Server { .. } | ProviderError::Exhausted { .. } => {
                FailureKind::Retryable
            }
            ProviderError::NotFound { .. } => FailureKind::NotFound,
            ProviderError::Client { .. }
            | ProviderError::Auth { .. }
            | ProviderError::Network(_)
            | ProviderError::Decode(_) => FailureKind::NonRetryable,
        }
    }

    /// Only server-side failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Server { .. })
    }

    /// Failures that would repeat identically on every further call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderError::Auth { .. })
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum OfferError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("No city or airport code found for {role} '{place}'")]
    UnresolvedPlace { place: String, role: PlaceRole },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Journey store error: {message}")]
    StoreError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl OfferError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            OfferError::UnresolvedPlace { .. } | OfferError::ValidationError { .. } => {
                ErrorSeverity::Low
            }
            OfferError::Provider(err) if err.kind() == FailureKind::Retryable => {
                ErrorSeverity::Medium
            }
            OfferError::Provider(_) | OfferError::CsvError(_) | OfferError::StoreError { .. } => {
                ErrorSeverity::High
            }
            OfferError::ConfigError { .. }
            | OfferError::MissingConfigError { .. }
            | OfferError::InvalidConfigValueError { .. }
            | OfferError::IoError(_)
            | OfferError::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            OfferError::Provider(ProviderError::Auth { .. }) => {
                "Check AMADEUS_CLIENT_ID / AMADEUS_CLIENT_SECRET and the selected host"
            }
            OfferError::Provider(err) if err.kind() == FailureKind::Retryable => {
                "The provider is unstable right now, try again in a few minutes"
            }
            OfferError::Provider(_) => "Check the request parameters (codes, date, party size)",
            OfferError::UnresolvedPlace { .. } => {
                "Use a different spelling, a larger nearby city or an IATA code"
            }
            OfferError::ConfigError { .. }
            | OfferError::MissingConfigError { .. }
            | OfferError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or environment variables"
            }
            OfferError::IoError(_) | OfferError::SerializationError(_) => {
                "Check that the cache and output directories are writable"
            }
            OfferError::CsvError(_) => "Each row must be origin,destination,date[,adults]",
            OfferError::ValidationError { .. } => "Check the command line arguments",
            OfferError::StoreError { .. } => "Check the journey output directory",
        }
    }
}

pub type Result<T> = std::result::Result<T, OfferError>;
