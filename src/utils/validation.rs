use crate::utils::error::{OfferError, Result};
use chrono::NaiveDate;
use std::fmt::Display;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl Display, reason: impl Into<String>) -> OfferError {
    OfferError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Provider base URLs: absolute `http` or `https` only.
pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    let url = Url::parse(url_str).map_err(|e| invalid(field_name, url_str, format!("not a URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            field_name,
            url_str,
            format!("scheme '{}' is not http(s)", url.scheme()),
        ));
    }
    Ok(())
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    match path {
        "" => Err(invalid(field_name, path, "path is empty")),
        p if p.contains('\0') => Err(invalid(field_name, p.escape_default(), "path contains a NUL byte")),
        _ => Ok(()),
    }
}

/// Parses an ISO `YYYY-MM-DD` date.
pub fn validate_date(field_name: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| invalid(field_name, value, format!("expected YYYY-MM-DD: {}", e)))
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    validate_range(field_name, value, min_value, usize::MAX)
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(invalid(field_name, value, "blank"))
    } else {
        Ok(())
    }
}

/// Inclusive bounds. An open upper bound (`T::MAX`) reports only the minimum.
pub fn validate_range<T>(field_name: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + Display + Copy,
{
    if value < min {
        return Err(invalid(field_name, value, format!("must be at least {}", min)));
    }
    if value > max {
        return Err(invalid(field_name, value, format!("must be at most {}", max)));
    }
    Ok(())
}

/// Three-letter IATA city or airport code, upper case.
pub fn validate_location_code(field_name: &str, code: &str) -> Result<()> {
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(invalid(field_name, code, "expected a three-letter IATA code"))
    }
}
