use crate::entities::{RouteId, RouteList};

/// Identifies one selection change. An aggregation result may only be
/// committed while its ticket is still current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub route_id: RouteId,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SelectionError {
    #[error("Unknown route: {0}")]
    UnknownRoute(RouteId),
}

/// The route list and which route is currently selected
#[derive(Debug, Default)]
pub struct RouteSelection {
    routes: RouteList,
    current: Option<RouteId>,
    generation: u64,
}

impl RouteSelection {
    pub fn routes(&self) -> &RouteList {
        &self.routes
    }

    pub fn current(&self) -> Option<&RouteId> {
        self.current.as_ref()
    }

    /// Replaces the route list wholesale. If nothing valid is selected
    /// the first route is picked and its ticket returned.
    pub fn load_routes(&mut self, routes: RouteList) -> Option<Ticket> {
        self.routes = routes;

        let still_listed = self
            .current
            .as_ref()
            .is_some_and(|current| self.routes.contains(current));
        if still_listed {
            return None;
        }

        match self.routes.first().cloned() {
            Some(first) => Some(self.advance(first)),
            None => {
                if self.current.take().is_some() {
                    self.generation += 1;
                }
                None
            }
        }
    }

    /// Selecting a route, even the current one again, supersedes anything in flight
    pub fn select(&mut self, route_id: RouteId) -> Result<Ticket, SelectionError> {
        // Before the list has loaded any id is accepted
        if !self.routes.is_empty() && !self.routes.contains(&route_id) {
            return Err(SelectionError::UnknownRoute(route_id));
        }
        Ok(self.advance(route_id))
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation && self.current.as_ref() == Some(&ticket.route_id)
    }

    fn advance(&mut self, route_id: RouteId) -> Ticket {
        self.generation += 1;
        self.current = Some(route_id.clone());
        Ticket {
            generation: self.generation,
            route_id,
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;

    fn routes(ids: &[&str]) -> RouteList {
        ids.iter().map(|&id| RouteId::from(id)).collect()
    }

    #[test]
    fn test_first_load_auto_selects() {
        let mut selection = RouteSelection::default();
        assert!(selection.current().is_none());

        let ticket = selection.load_routes(routes(&["R2", "R1"])).unwrap();
        assert_eq!(ticket.route_id, "R2".into());
        assert_eq!(selection.current(), Some(&"R2".into()));
        assert!(selection.is_current(&ticket));
    }

    #[test]
    fn test_reload_keeps_listed_selection() {
        let mut selection = RouteSelection::default();
        selection.load_routes(routes(&["R1", "R2"]));
        let ticket = selection.select("R2".into()).unwrap();

        assert!(selection.load_routes(routes(&["R3", "R2"])).is_none());
        assert!(selection.is_current(&ticket));
        assert_eq!(selection.routes(), &routes(&["R3", "R2"]));
    }

    #[test]
    fn test_reload_without_selection_falls_back_to_first() {
        let mut selection = RouteSelection::default();
        selection.load_routes(routes(&["R1", "R2"]));
        let old = selection.select("R2".into()).unwrap();

        let ticket = selection.load_routes(routes(&["R3"])).unwrap();
        assert_eq!(ticket.route_id, "R3".into());
        assert!(!selection.is_current(&old));
    }

    #[test]
    fn test_empty_list_clears_selection() {
        let mut selection = RouteSelection::default();
        let ticket = selection.load_routes(routes(&["R1"])).unwrap();

        assert!(selection.load_routes(vec![]).is_none());
        assert!(selection.current().is_none());
        assert!(!selection.is_current(&ticket));
    }

    #[test]
    fn test_newer_selection_supersedes() {
        let mut selection = RouteSelection::default();
        selection.load_routes(routes(&["R1", "R2"]));

        let first = selection.select("R1".into()).unwrap();
        let second = selection.select("R2".into()).unwrap();
        let third = selection.select("R1".into()).unwrap();

        assert!(!selection.is_current(&first));
        assert!(!selection.is_current(&second));
        assert!(selection.is_current(&third));
    }

    #[test]
    fn test_unknown_route_rejected() {
        let mut selection = RouteSelection::default();
        selection.load_routes(routes(&["R1"]));
        let before = selection.current().cloned();

        assert_eq!(
            selection.select("R9".into()),
            Err(SelectionError::UnknownRoute("R9".into()))
        );
        assert_eq!(selection.current().cloned(), before);
    }
}
