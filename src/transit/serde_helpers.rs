use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::Deserializer;
use serde::Deserialize;

/// Stored attributes come back either as JSON numbers or as decimal strings
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MaybeStringWrapped<T> {
    Str(String),
    Val(T),
}

impl<T: FromStr> MaybeStringWrapped<T> {
    pub fn into_inner(self) -> Result<T, T::Err> {
        match self {
            MaybeStringWrapped::Str(s) => s.trim().parse(),
            MaybeStringWrapped::Val(v) => Ok(v),
        }
    }
}

pub fn deserialize_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: MaybeStringWrapped<f64> = Deserialize::deserialize(deserializer)?;
    raw.into_inner().map_err(serde::de::Error::custom)
}

/// Missing or null counts as zero
pub fn deserialize_option_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<MaybeStringWrapped<f64>> = Deserialize::deserialize(deserializer)?;
    match raw {
        None => Ok(0.0),
        Some(raw) => raw.into_inner().map_err(serde::de::Error::custom),
    }
}

/// Minute offsets: every entry must be finite and not negative
pub fn deserialize_offsets<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<MaybeStringWrapped<f64>>> = Deserialize::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|v| {
            let offset = v.into_inner().map_err(serde::de::Error::custom)?;
            if !offset.is_finite() || offset < 0.0 {
                return Err(serde::de::Error::custom(format!("Invalid offset: {}", offset)));
            }
            Ok(offset)
        })
        .collect()
}

/// Parses an ISO-8601 timestamp, treating one without an offset as UTC
pub fn parse_iso_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn deserialize_iso_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: String = Deserialize::deserialize(deserializer)?;
    parse_iso_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("Invalid timestamp: {}", raw)))
}
