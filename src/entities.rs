use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque route identifier, the join key across every feed
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(String);

impl RouteId {
    pub fn new(id: impl Into<String>) -> Self {
        RouteId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RouteId {
    fn from(id: &str) -> Self {
        RouteId::new(id)
    }
}

/// Routes in server order
pub type RouteList = Vec<RouteId>;

/// A generated schedule. Offsets are minutes after `generated_at`
/// and are not sorted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    pub generated_at: DateTime<Utc>,
    pub departure_offsets_minutes: Vec<f64>,
    pub fitness_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionPoint {
    pub timestamp: DateTime<Utc>,
    pub predicted_delay_seconds: f64,
}

/// Operator-maintained origin/destination for a route.
/// Either side may be missing on a partially configured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteMapping {
    pub origin: Option<String>,
    pub destination: Option<String>,
}

impl RouteMapping {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        RouteMapping {
            origin: Some(origin.into()),
            destination: Some(destination.into()),
        }
    }

    /// Both addresses, if both are set and non-empty
    pub fn endpoints(&self) -> Option<(&str, &str)> {
        match (self.origin.as_deref(), self.destination.as_deref()) {
            (Some(o), Some(d)) if !o.is_empty() && !d.is_empty() => Some((o, d)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtaEstimate {
    pub distance_meters: f64,
    pub normal_duration_seconds: f64,
    pub current_duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassengerSample {
    pub timestamp: DateTime<Utc>,
    pub boarding: f64,
    pub alighting: f64,
    pub bus_load: f64,
}

/// Everything known about one route after one aggregation cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSnapshot {
    pub route_id: RouteId,
    pub schedule: Option<Schedule>,
    pub predictions: Vec<PredictionPoint>,
    pub mapping: Option<RouteMapping>,
    pub eta: Option<EtaEstimate>,
    pub passenger_series: Vec<PassengerSample>,
}

impl FeedSnapshot {
    #[cfg(test)]
    pub fn empty(route_id: RouteId) -> Self {
        FeedSnapshot {
            route_id,
            schedule: None,
            predictions: vec![],
            mapping: None,
            eta: None,
            passenger_series: vec![],
        }
    }
}

/// Feedback for the operator after a mapping write
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum OperatorMessage {
    Success(String),
    Failure(String),
}
