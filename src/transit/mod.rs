pub mod auth;
pub mod client;
pub mod entities;
pub mod error;
mod serde_helpers;

use crate::entities::{
    EtaEstimate, PassengerSample, PredictionPoint, RouteId, RouteList, RouteMapping, Schedule,
};
use error::ClientResult;

/// The schedule endpoint answers `{error}` when nothing has been generated yet
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleLookup {
    Available(Schedule),
    Unavailable(String),
}

/// Everything the dashboard needs from the transit backend.
///
/// Each call is independently failable. Error-shape quirks of the backend
/// (sentinel payloads, alternative endpoint forms) are resolved by the
/// implementation, never by callers.
#[allow(async_fn_in_trait)]
pub trait TransitApi {
    async fn list_routes(&self) -> ClientResult<RouteList>;

    async fn get_predictions(&self, route_id: &RouteId) -> ClientResult<Vec<PredictionPoint>>;

    async fn get_schedule(&self, route_id: &RouteId) -> ClientResult<ScheduleLookup>;

    /// Fails with [`error::ClientError::NoMapping`] when the route is unmapped
    async fn get_route_mapping(&self, route_id: &RouteId) -> ClientResult<RouteMapping>;

    async fn get_eta(&self, origin: &str, destination: &str) -> ClientResult<EtaEstimate>;

    /// An empty series is a valid result
    async fn get_passenger_data(&self, route_id: &RouteId) -> ClientResult<Vec<PassengerSample>>;

    async fn push_route_mapping(
        &self,
        route_id: &RouteId,
        origin: &str,
        destination: &str,
    ) -> ClientResult<RouteMapping>;
}
