use futures_util::future::join;

use crate::entities::{EtaEstimate, FeedSnapshot, RouteId, RouteMapping};
use crate::transit::error::{ClientError, ClientResult};
use crate::transit::{ScheduleLookup, TransitApi};

/// Logs a failed feed and degrades it to its empty value
fn degrade<T>(route_id: &RouteId, feed: &str, result: ClientResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(ClientError::NoMapping(_)) => {
            log::info!("Route {} has no mapping yet", route_id);
            None
        }
        Err(e) => {
            log::warn!("Feed {} unavailable for route {}: {}", feed, route_id, e);
            None
        }
    }
}

/// Runs one aggregation cycle for a route.
///
/// Predictions and schedule are fetched together, then passengers, then the
/// mapping, and the ETA only when the mapping is complete. No single feed can
/// fail the cycle; a failed feed is left absent or empty in the snapshot.
pub async fn aggregate(api: &impl TransitApi, route_id: &RouteId) -> FeedSnapshot {
    log::debug!("Aggregating feeds for route {}", route_id);

    let (predictions, schedule) =
        join(api.get_predictions(route_id), api.get_schedule(route_id)).await;

    let predictions = degrade(route_id, "predictions", predictions).unwrap_or_default();
    let schedule = match degrade(route_id, "schedule", schedule) {
        Some(ScheduleLookup::Available(schedule)) => Some(schedule),
        Some(ScheduleLookup::Unavailable(reason)) => {
            log::info!("No schedule for route {}: {}", route_id, reason);
            None
        }
        None => None,
    };

    let passenger_series = degrade(
        route_id,
        "passengers",
        api.get_passenger_data(route_id).await,
    )
    .unwrap_or_default();

    let (mapping, eta) = resolve_mapping(api, route_id).await;

    FeedSnapshot {
        route_id: route_id.clone(),
        schedule,
        predictions,
        mapping,
        eta,
        passenger_series,
    }
}

/// The mapping/ETA part of a cycle, also re-run after an operator write
pub async fn resolve_mapping(
    api: &impl TransitApi,
    route_id: &RouteId,
) -> (Option<RouteMapping>, Option<EtaEstimate>) {
    let Some(mapping) = degrade(route_id, "mapping", api.get_route_mapping(route_id).await) else {
        return (None, None);
    };

    let eta = match mapping.endpoints() {
        Some((origin, destination)) => {
            degrade(route_id, "eta", api.get_eta(origin, destination).await)
        }
        None => {
            log::debug!("Mapping for route {} is incomplete, skipping ETA", route_id);
            None
        }
    };

    (Some(mapping), eta)
}
