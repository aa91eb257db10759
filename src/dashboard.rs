use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::derived::{dashboard_view, DashboardView};
use crate::entities::{FeedSnapshot, OperatorMessage, RouteId, RouteList, RouteMapping};
use crate::error::{DashError, DashResult};
use crate::feed;
use crate::selection::{RouteSelection, Ticket};
use crate::transit::TransitApi;

/// Whether an aggregation cycle made it into the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Commit {
    Applied,
    /// A newer selection was made while the cycle was in flight
    Superseded,
}

#[derive(Default)]
struct DashboardState {
    selection: RouteSelection,
    snapshot: Option<FeedSnapshot>,
    operator_message: Option<OperatorMessage>,
    /// Bumped on every successful mapping write
    mapping_revision: u64,
}

/// One dashboard session: the route selection, the committed snapshot
/// and the operations that change them.
///
/// State is only locked between awaits. Every aggregation cycle carries the
/// [`Ticket`] of the selection that started it and is dropped at commit time
/// if that selection is no longer current.
pub struct Dashboard<A> {
    api: A,
    display_tz: Tz,
    state: Mutex<DashboardState>,
}

impl<A: TransitApi> Dashboard<A> {
    pub fn new(api: A, display_tz: Tz) -> Self {
        Dashboard {
            api,
            display_tz,
            state: Mutex::new(DashboardState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, DashboardState> {
        // State is always left consistent, a panic elsewhere does not invalidate it
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn routes(&self) -> (RouteList, Option<RouteId>) {
        let state = self.state();
        (
            state.selection.routes().clone(),
            state.selection.current().cloned(),
        )
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Option<FeedSnapshot> {
        self.state().snapshot.clone()
    }

    pub fn view(&self, now: DateTime<Utc>) -> DashboardView {
        let state = self.state();
        dashboard_view(
            state.selection.current(),
            state.snapshot.as_ref(),
            state.operator_message.clone(),
            now,
            &self.display_tz,
        )
    }

    /// (Re)loads the route list. When this changes the selection, the new
    /// route is aggregated straight away.
    pub async fn load_routes(&self) -> DashResult<Option<Commit>> {
        let routes = self.api.list_routes().await?;
        log::info!("Loaded {} routes", routes.len());

        let ticket = {
            let mut state = self.state();
            let ticket = state.selection.load_routes(routes);
            if ticket.is_some() || state.selection.current().is_none() {
                state.operator_message = None;
            }
            ticket
        };

        match ticket {
            Some(ticket) => {
                log::info!("Auto-selected route {}", ticket.route_id);
                Ok(Some(self.run_cycle(ticket).await))
            }
            None => Ok(None),
        }
    }

    /// The selection change event: one call, one aggregation cycle
    pub async fn select_route(&self, route_id: RouteId) -> DashResult<Commit> {
        let ticket = {
            let mut state = self.state();
            let ticket = state.selection.select(route_id)?;
            state.operator_message = None;
            ticket
        };

        log::debug!("Selected route {} (generation {})", ticket.route_id, ticket.generation);
        Ok(self.run_cycle(ticket).await)
    }

    async fn run_cycle(&self, ticket: Ticket) -> Commit {
        let mut revision = self.state().mapping_revision;
        let mut snapshot = feed::aggregate(&self.api, &ticket.route_id).await;

        loop {
            {
                let mut state = self.state();
                if !state.selection.is_current(&ticket) {
                    log::debug!(
                        "Discarding snapshot for route {} (generation {})",
                        ticket.route_id,
                        ticket.generation
                    );
                    return Commit::Superseded;
                }

                if state.mapping_revision == revision {
                    log::debug!("Committing snapshot for route {}", ticket.route_id);
                    state.snapshot = Some(snapshot);
                    return Commit::Applied;
                }
                revision = state.mapping_revision;
            }

            // The mapping may have been fetched before a write landed
            log::debug!("Mapping for route {} changed mid-cycle, re-fetching", ticket.route_id);
            let (mapping, eta) = feed::resolve_mapping(&self.api, &ticket.route_id).await;
            snapshot.mapping = mapping;
            snapshot.eta = eta;
        }
    }

    /// Operator write for the selected route.
    ///
    /// On success the mapping and ETA are re-fetched and replace only those two
    /// fields of the snapshot. On failure nothing in the snapshot changes and
    /// a failure message is raised.
    pub async fn update_mapping(&self, origin: &str, destination: &str) -> DashResult<RouteMapping> {
        let origin = origin.trim();
        let destination = destination.trim();
        if origin.is_empty() || destination.is_empty() {
            return Err(DashError::InvalidInput(
                "origin and destination are required".to_string(),
            ));
        }

        let route_id = self
            .state()
            .selection
            .current()
            .cloned()
            .ok_or(DashError::NoSelection)?;

        let written = match self.api.push_route_mapping(&route_id, origin, destination).await {
            Ok(written) => written,
            Err(e) => {
                log::warn!("Mapping update for route {} failed: {}", route_id, e);
                self.notify(&route_id, OperatorMessage::Failure("Failed to update route.".to_string()));
                return Err(e.into());
            }
        };

        log::info!("Mapping for route {} updated", route_id);
        self.state().mapping_revision += 1;
        let (mapping, eta) = feed::resolve_mapping(&self.api, &route_id).await;

        let mut state = self.state();
        if state.selection.current() != Some(&route_id) {
            log::debug!("Selection moved away from {}, dropping re-fetched mapping", route_id);
            return Ok(written);
        }
        if let Some(snapshot) = state.snapshot.as_mut().filter(|s| s.route_id == route_id) {
            snapshot.mapping = mapping;
            snapshot.eta = eta;
        }
        state.operator_message = Some(OperatorMessage::Success("Route updated.".to_string()));

        Ok(written)
    }

    fn notify(&self, route_id: &RouteId, message: OperatorMessage) {
        let mut state = self.state();
        if state.selection.current() == Some(route_id) {
            state.operator_message = Some(message);
        }
    }
}
