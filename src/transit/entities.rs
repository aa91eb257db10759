use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::serde_helpers::{
    deserialize_iso_date, deserialize_number, deserialize_offsets, deserialize_option_number,
};
use crate::entities::{
    EtaEstimate, PassengerSample, PredictionPoint, RouteId, RouteMapping, Schedule,
};

/// Any payload may carry an `error` field instead of (or beside) its data
#[derive(Deserialize, Debug, Default)]
pub struct ErrorPayload {
    pub error: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RoutesResponse {
    #[serde(default)]
    pub routes: Vec<RouteId>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Prediction {
    #[serde(deserialize_with = "deserialize_iso_date")]
    pub timestamp_iso: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_option_number")]
    pub predicted_delay_sec: f64,
}

#[derive(Deserialize, Debug)]
pub struct PredictionsResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScheduleRecord {
    #[serde(deserialize_with = "deserialize_iso_date")]
    pub timestamp_iso: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_offsets")]
    pub departures_minutes: Vec<f64>,
    #[serde(default, deserialize_with = "deserialize_option_number")]
    pub fitness: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MappingRecord {
    pub origin: Option<String>,
    pub destination: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct EtaRecord {
    #[serde(deserialize_with = "deserialize_number")]
    pub distance_m: f64,
    #[serde(deserialize_with = "deserialize_number")]
    pub duration_s: f64,
    #[serde(deserialize_with = "deserialize_number")]
    pub duration_in_traffic_s: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PassengerRecord {
    #[serde(deserialize_with = "deserialize_iso_date")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_option_number")]
    pub boarding: f64,
    #[serde(default, deserialize_with = "deserialize_option_number")]
    pub landing: f64,
    #[serde(default, deserialize_with = "deserialize_option_number")]
    pub loader: f64,
}

#[derive(Deserialize, Debug)]
pub struct PassengersResponse {
    #[serde(default)]
    pub passenger_data: Option<Vec<PassengerRecord>>,
}

/// Operator write body: `{routes: {routeId: [origin, destination]}}`
#[derive(Serialize, Debug)]
pub struct PushRoutesRequest<'a> {
    pub routes: HashMap<&'a str, [&'a str; 2]>,
}

#[derive(Serialize, Debug)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub totp_code: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct LoginFailure {
    #[serde(default)]
    pub mfa_required: bool,
    pub error: Option<String>,
}

impl From<Prediction> for PredictionPoint {
    fn from(p: Prediction) -> Self {
        PredictionPoint {
            timestamp: p.timestamp_iso,
            predicted_delay_seconds: p.predicted_delay_sec,
        }
    }
}

impl From<ScheduleRecord> for Schedule {
    fn from(s: ScheduleRecord) -> Self {
        Schedule {
            generated_at: s.timestamp_iso,
            departure_offsets_minutes: s.departures_minutes,
            fitness_score: s.fitness,
        }
    }
}

impl From<MappingRecord> for RouteMapping {
    fn from(m: MappingRecord) -> Self {
        RouteMapping {
            origin: m.origin,
            destination: m.destination,
        }
    }
}

impl From<EtaRecord> for EtaEstimate {
    fn from(e: EtaRecord) -> Self {
        EtaEstimate {
            distance_meters: e.distance_m,
            normal_duration_seconds: e.duration_s,
            current_duration_seconds: e.duration_in_traffic_s,
        }
    }
}

impl From<PassengerRecord> for PassengerSample {
    fn from(p: PassengerRecord) -> Self {
        PassengerSample {
            timestamp: p.timestamp,
            boarding: p.boarding,
            alighting: p.landing,
            bus_load: p.loader,
        }
    }
}
