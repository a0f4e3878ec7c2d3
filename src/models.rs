//! Request query parameters and their validation

use crate::date_index::parse_date;

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer};
use validator::{Validate, ValidationError};

/// Southern and northern bounds of queryable locations
const LATITUDE_RANGE: (f64, f64) = (-40.0, 40.0);
/// Western and eastern bounds of queryable locations
const LONGITUDE_RANGE: (f64, f64) = (-20.0, 55.0);

/// Query parameters of a rainfall request
#[derive(Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields)]
pub struct RainfallQuery {
    /// Latitude in degrees north
    #[validate(custom = "validate_latitude")]
    pub lat: f64,
    /// Longitude in degrees east
    #[validate(custom = "validate_longitude")]
    pub long: f64,
    /// First day of the series
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    /// Number of days in the series
    #[validate(range(min = 1, max = 365, message = "days must be between 1 and 365"))]
    pub days: u32,
}

/// Query parameters of a cache status request
#[derive(Debug, Default, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields)]
pub struct StatusQuery {
    /// First day of the listing. Default is the start of the cache window
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub date: Option<NaiveDate>,
    /// Number of days in the listing. Default is the rest of the cache window
    #[validate(range(min = 1, message = "days must be greater than 0"))]
    pub days: Option<u32>,
}

/// Deserialise a `YYYYMMDD` date
fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_date(&value).map_err(|_| {
        de::Error::invalid_value(de::Unexpected::Str(&value), &"a date formatted as YYYYMMDD")
    })
}

/// Deserialise an optional `YYYYMMDD` date
fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_date(deserializer).map(Some)
}

/// Validate a latitude
fn validate_latitude(latitude: f64) -> Result<(), ValidationError> {
    validate_coordinate(latitude, LATITUDE_RANGE, "lat must be between -40 and 40")
}

/// Validate a longitude
fn validate_longitude(longitude: f64) -> Result<(), ValidationError> {
    validate_coordinate(longitude, LONGITUDE_RANGE, "long must be between -20 and 55")
}

fn validate_coordinate(
    value: f64,
    (min, max): (f64, f64),
    message: &'static str,
) -> Result<(), ValidationError> {
    // NaN fails both comparisons.
    if value >= min && value <= max {
        return Ok(());
    }
    let mut error = ValidationError::new(message);
    error.add_param("value".into(), &value);
    Err(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{assert_de_tokens, assert_de_tokens_error, Token};

    // The following tests use serde_test to validate the correct function of the deserialiser.
    // The validations are also tested.

    fn rainfall_query() -> RainfallQuery {
        RainfallQuery {
            lat: -0.9,
            long: 37.7,
            date: NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
            days: 4,
        }
    }

    #[test]
    fn test_rainfall_query() {
        let query = rainfall_query();
        assert_de_tokens(
            &query,
            &[
                Token::Struct {
                    name: "RainfallQuery",
                    len: 4,
                },
                Token::Str("lat"),
                Token::F64(-0.9),
                Token::Str("long"),
                Token::F64(37.7),
                Token::Str("date"),
                Token::Str("20200201"),
                Token::Str("days"),
                Token::U32(4),
                Token::StructEnd,
            ],
        );
        query.validate().unwrap()
    }

    #[test]
    fn test_missing_date() {
        assert_de_tokens_error::<RainfallQuery>(
            &[
                Token::Struct {
                    name: "RainfallQuery",
                    len: 4,
                },
                Token::Str("lat"),
                Token::F64(-0.9),
                Token::Str("long"),
                Token::F64(37.7),
                Token::StructEnd,
            ],
            "missing field `date`",
        )
    }

    #[test]
    fn test_invalid_date() {
        assert_de_tokens_error::<RainfallQuery>(
            &[
                Token::Struct {
                    name: "RainfallQuery",
                    len: 4,
                },
                Token::Str("date"),
                Token::Str("2020-02-01"),
                Token::StructEnd,
            ],
            "invalid value: string \"2020-02-01\", expected a date formatted as YYYYMMDD",
        )
    }

    #[test]
    fn test_unknown_field() {
        assert_de_tokens_error::<RainfallQuery>(
            &[
                Token::Struct {
                    name: "RainfallQuery",
                    len: 4,
                },
                Token::Str("latitude"),
                Token::StructEnd,
            ],
            "unknown field `latitude`, expected one of `lat`, `long`, `date`, `days`",
        )
    }

    #[test]
    fn test_coordinate_bounds_inclusive() {
        let mut query = rainfall_query();
        for (lat, long) in [(-40.0, -20.0), (40.0, 55.0)] {
            query.lat = lat;
            query.long = long;
            query.validate().unwrap()
        }
    }

    #[test]
    #[should_panic(expected = "lat must be between -40 and 40")]
    fn test_invalid_lat() {
        let mut query = rainfall_query();
        query.lat = 40.5;
        query.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "lat must be between -40 and 40")]
    fn test_nan_lat() {
        let mut query = rainfall_query();
        query.lat = f64::NAN;
        query.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "long must be between -20 and 55")]
    fn test_invalid_long() {
        let mut query = rainfall_query();
        query.long = -20.5;
        query.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "days must be between 1 and 365")]
    fn test_zero_days() {
        let mut query = rainfall_query();
        query.days = 0;
        query.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "days must be between 1 and 365")]
    fn test_too_many_days() {
        let mut query = rainfall_query();
        query.days = 366;
        query.validate().unwrap()
    }

    #[test]
    fn test_empty_status_query() {
        let query = StatusQuery::default();
        assert_de_tokens(
            &query,
            &[
                Token::Struct {
                    name: "StatusQuery",
                    len: 2,
                },
                Token::StructEnd,
            ],
        );
        query.validate().unwrap()
    }

    #[test]
    fn test_status_query() {
        let query = StatusQuery {
            date: NaiveDate::from_ymd_opt(2020, 2, 1),
            days: Some(7),
        };
        assert_de_tokens(
            &query,
            &[
                Token::Struct {
                    name: "StatusQuery",
                    len: 2,
                },
                Token::Str("date"),
                Token::Str("20200201"),
                Token::Str("days"),
                Token::Some,
                Token::U32(7),
                Token::StructEnd,
            ],
        );
        query.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "days must be greater than 0")]
    fn test_status_zero_days() {
        let query = StatusQuery {
            date: None,
            days: Some(0),
        };
        query.validate().unwrap()
    }
}
