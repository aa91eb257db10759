//! Display-ready signals computed from a committed [`FeedSnapshot`].
//!
//! Everything here is pure: callers pass in "now" and the display zone.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use itertools::Itertools;
use serde::Serialize;

use crate::entities::{
    EtaEstimate, FeedSnapshot, OperatorMessage, PassengerSample, PredictionPoint, RouteId,
    RouteMapping, Schedule,
};

/// Charts only show this many of the latest passenger samples
pub const PASSENGER_WINDOW: usize = 20;

const MAJOR_DELAY_RATIO: f64 = 1.5;
const SOME_DELAY_RATIO: f64 = 1.2;

#[derive(Debug, Clone, PartialEq)]
pub enum NextDeparture {
    NoSchedule,
    NoUpcoming,
    At {
        time: DateTime<Utc>,
        minutes_remaining: i64,
    },
}

impl NextDeparture {
    pub fn describe(&self, tz: &Tz) -> String {
        match self {
            NextDeparture::NoSchedule => "No schedule available.".to_string(),
            NextDeparture::NoUpcoming => "No upcoming departures.".to_string(),
            NextDeparture::At {
                time,
                minutes_remaining,
            } => format!(
                "Next bus at {} (in ~{} min)",
                time.with_timezone(tz).format("%H:%M"),
                minutes_remaining
            ),
        }
    }
}

/// Earliest departure that has not yet left.
///
/// Offsets are relative to when the schedule was generated, so they are
/// compared against the minutes elapsed since then. Source order is ignored.
pub fn next_departure(schedule: Option<&Schedule>, now: DateTime<Utc>) -> NextDeparture {
    let Some(schedule) = schedule else {
        return NextDeparture::NoSchedule;
    };

    let elapsed_minutes = (now - schedule.generated_at).num_milliseconds() as f64 / 60_000.0;

    let next = schedule
        .departure_offsets_minutes
        .iter()
        .copied()
        .filter(|offset| *offset >= elapsed_minutes)
        .min_by(f64::total_cmp);

    let Some(offset) = next else {
        return NextDeparture::NoUpcoming;
    };

    // An offset past the representable date range never departs
    let time = Duration::try_milliseconds((offset * 60_000.0).round() as i64)
        .and_then(|delta| schedule.generated_at.checked_add_signed(delta));
    match time {
        None => NextDeparture::NoUpcoming,
        Some(time) => NextDeparture::At {
            time,
            minutes_remaining: ((offset - elapsed_minutes).round() as i64).max(0),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficSeverity {
    MajorDelay,
    SomeDelay,
    OnSchedule,
}

impl TrafficSeverity {
    pub fn label(&self) -> &'static str {
        match self {
            TrafficSeverity::MajorDelay => "Major delays due to traffic",
            TrafficSeverity::SomeDelay => "Some delays (traffic slower than usual)",
            TrafficSeverity::OnSchedule => "On schedule",
        }
    }
}

/// Buckets current travel time against the normal one. No ETA, no classification.
pub fn classify_traffic(eta: Option<&EtaEstimate>) -> Option<TrafficSeverity> {
    let eta = eta?;

    // Without a usable baseline there is nothing to be slower than
    if eta.normal_duration_seconds <= 0.0 {
        return Some(TrafficSeverity::OnSchedule);
    }

    let ratio = eta.current_duration_seconds / eta.normal_duration_seconds;
    let severity = if ratio > MAJOR_DELAY_RATIO {
        TrafficSeverity::MajorDelay
    } else if ratio > SOME_DELAY_RATIO {
        TrafficSeverity::SomeDelay
    } else {
        TrafficSeverity::OnSchedule
    };
    Some(severity)
}

pub fn prediction_series(predictions: &[PredictionPoint]) -> Vec<PredictionPoint> {
    predictions
        .iter()
        .sorted_by_key(|p| p.timestamp)
        .cloned()
        .collect()
}

/// The latest [`PASSENGER_WINDOW`] samples, oldest first
pub fn passenger_window(series: &[PassengerSample]) -> Vec<PassengerSample> {
    let sorted = series
        .iter()
        .sorted_by_key(|s| s.timestamp)
        .collect::<Vec<_>>();
    let skip = sorted.len().saturating_sub(PASSENGER_WINDOW);
    sorted.into_iter().skip(skip).cloned().collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripSummary {
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
    pub normal_minutes: i64,
    pub current_minutes: i64,
}

pub fn trip_summary(mapping: Option<&RouteMapping>, eta: Option<&EtaEstimate>) -> Option<TripSummary> {
    let (origin, destination) = mapping?.endpoints()?;
    let eta = eta?;

    Some(TripSummary {
        origin: origin.to_string(),
        destination: destination.to_string(),
        distance_km: (eta.distance_meters / 100.0).round() / 10.0,
        normal_minutes: (eta.normal_duration_seconds / 60.0).round() as i64,
        current_minutes: (eta.current_duration_seconds / 60.0).round() as i64,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleSummary {
    pub generated_at: String,
    pub fitness: f64,
    /// Minutes after generation, as the schedule lists them
    pub departures_minutes: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficStatus {
    pub severity: TrafficSeverity,
    pub label: &'static str,
}

/// What the view layer renders for the selected route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub route_id: Option<RouteId>,
    /// The selection has changed and its feeds are still being fetched
    pub pending: bool,
    pub next_departure: String,
    pub traffic: Option<TrafficStatus>,
    pub mapping: Option<RouteMapping>,
    pub trip: Option<TripSummary>,
    pub schedule: Option<ScheduleSummary>,
    pub predictions: Vec<PredictionPoint>,
    pub passengers: Vec<PassengerSample>,
    pub operator_message: Option<OperatorMessage>,
}

/// Builds the view. A snapshot belonging to another route than `current`
/// is never shown.
pub fn dashboard_view(
    current: Option<&RouteId>,
    snapshot: Option<&FeedSnapshot>,
    operator_message: Option<OperatorMessage>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> DashboardView {
    let snapshot = snapshot.filter(|s| Some(&s.route_id) == current);

    let Some(snapshot) = snapshot else {
        return DashboardView {
            route_id: current.cloned(),
            pending: current.is_some(),
            next_departure: NextDeparture::NoSchedule.describe(tz),
            traffic: None,
            mapping: None,
            trip: None,
            schedule: None,
            predictions: vec![],
            passengers: vec![],
            operator_message,
        };
    };

    DashboardView {
        route_id: Some(snapshot.route_id.clone()),
        pending: false,
        next_departure: next_departure(snapshot.schedule.as_ref(), now).describe(tz),
        traffic: classify_traffic(snapshot.eta.as_ref()).map(|severity| TrafficStatus {
            severity,
            label: severity.label(),
        }),
        mapping: snapshot.mapping.clone(),
        trip: trip_summary(snapshot.mapping.as_ref(), snapshot.eta.as_ref()),
        schedule: snapshot.schedule.as_ref().map(|s| ScheduleSummary {
            generated_at: s.generated_at.with_timezone(tz).format("%Y-%m-%d %H:%M:%S").to_string(),
            fitness: s.fitness_score,
            departures_minutes: s.departure_offsets_minutes.clone(),
        }),
        predictions: prediction_series(&snapshot.predictions),
        passengers: passenger_window(&snapshot.passenger_series),
        operator_message,
    }
}
