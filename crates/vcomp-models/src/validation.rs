//! Field-level validation primitives.
//!
//! Every check names the offending field (using the request's wire name,
//! e.g. `videoVolume` or `segments[2].trimEnd`) and the violated constraint.
//! Boundary values are accepted: a range check is inclusive unless the
//! constraint explicitly says otherwise.

use thiserror::Error;
use url::Url;

/// Result type for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A rejected request parameter.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {field}: {constraint}")]
pub struct ValidationError {
    /// Wire name of the offending field
    pub field: String,
    /// Human-readable description of the violated constraint
    pub constraint: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    /// A required field was absent or empty.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, "is required")
    }
}

/// Inclusive range check for floating point parameters.
pub fn check_range(field: &str, value: f64, min: f64, max: f64) -> ValidationResult<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            format!("must be between {} and {} (got {})", min, max, value),
        ))
    }
}

/// Range check with an exclusive lower bound, e.g. `(0, 60]`.
pub fn check_range_exclusive_min(field: &str, value: f64, min: f64, max: f64) -> ValidationResult<()> {
    if value.is_finite() && value > min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            format!("must be greater than {} and at most {} (got {})", min, max, value),
        ))
    }
}

/// Inclusive range check for integer parameters.
///
/// Integers arrive as signed JSON numbers so that negative input is
/// reported against the field rather than as a decode failure.
pub fn check_range_int(field: &str, value: i64, min: u32, max: u32) -> ValidationResult<u32> {
    if value >= i64::from(min) && value <= i64::from(max) {
        Ok(value as u32)
    } else {
        Err(ValidationError::new(
            field,
            format!("must be between {} and {} (got {})", min, max, value),
        ))
    }
}

/// Require a present, URL-shaped string.
///
/// Accepts any absolute URL with a scheme (`https://`, `file://`, `s3://`).
pub fn require_url(field: &str, value: Option<&str>) -> ValidationResult<String> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(ValidationError::missing(field));
    }

    let parsed = Url::parse(value)
        .map_err(|e| ValidationError::new(field, format!("must be a valid URL ({})", e)))?;

    if parsed.cannot_be_a_base() && parsed.scheme() != "data" {
        return Err(ValidationError::new(field, "must be an absolute URL"));
    }

    Ok(value.to_string())
}

/// Parse a `#RRGGBB` color. The leading `#` is optional.
///
/// Returns the normalized lowercase form with a leading `#`.
pub fn parse_hex_color(field: &str, value: &str) -> ValidationResult<String> {
    let digits = value.trim().strip_prefix('#').unwrap_or(value.trim());
    if digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(format!("#{}", digits.to_ascii_lowercase()))
    } else {
        Err(ValidationError::new(
            field,
            format!("must be a hex color like #ffffff (got '{}')", value),
        ))
    }
}

/// Lenient decoders for numeric request fields.
///
/// Float fields take a JSON number or a numeric string (`"1.5"`). Integer
/// fields take an integer, an integral float (`200.0`) or an integer string.
pub(crate) mod lenient {
    use serde::de::{self, Deserializer, Unexpected, Visitor};
    use std::fmt;

    pub fn float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(FloatVisitor)
    }

    pub fn optional_float<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<f64>, D::Error> {
        deserializer.deserialize_option(OptionalFloatVisitor)
    }

    pub fn integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        deserializer.deserialize_any(IntegerVisitor)
    }

    struct FloatVisitor;

    impl<'de> Visitor<'de> for FloatVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number or numeric string")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            v.trim()
                .parse::<f64>()
                .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
        }
    }

    struct OptionalFloatVisitor;

    impl<'de> Visitor<'de> for OptionalFloatVisitor {
        type Value = Option<f64>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("null, a number or numeric string")
        }

        fn visit_none<E: de::Error>(self) -> Result<Option<f64>, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Option<f64>, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Option<f64>, D::Error> {
            float(deserializer).map(Some)
        }
    }

    struct IntegerVisitor;

    impl<'de> Visitor<'de> for IntegerVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a whole number")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                Ok(v as i64)
            } else {
                Err(E::invalid_value(Unexpected::Float(v), &self))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            v.trim()
                .parse::<i64>()
                .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
        }
    }
}
