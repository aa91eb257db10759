use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use actix_web::{web, App, HttpServer};
use tokio::sync::oneshot;
use url::Url;

use crate::entities::{
    EtaEstimate, PassengerSample, PredictionPoint, RouteId, RouteList, RouteMapping,
};
use crate::transit::client::{base_url, Session, TransitClient};
use crate::transit::error::{ClientError, ClientResult};
use crate::transit::{ScheduleLookup, TransitApi};

pub fn init() {
    dotenvy::from_filename(".dev.vars").ok();
    env_logger::builder().is_test(true).try_init().ok();
}

/// Starts a throwaway backend on an ephemeral port and returns its base URL.
/// Must be called from within an actix system, e.g. `#[actix_web::test]`.
pub fn serve<F>(configure: F) -> Url
where
    F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
{
    init();

    let server = HttpServer::new(move || App::new().configure(configure.clone()))
        .workers(1)
        .bind("127.0.0.1:0")
        .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());

    base_url(&format!("http://{}", addr)).unwrap()
}

pub fn client_for(base: &Url) -> TransitClient {
    TransitClient::new(Session::new(base.clone(), "test-token")).unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    Routes,
    Predictions,
    Schedule,
    Passengers,
    Mapping,
    Eta,
    Push,
}

/// Holds back one fetch until released
pub struct Gate(oneshot::Sender<()>);

impl Gate {
    pub fn release(self) {
        self.0.send(()).ok();
    }
}

#[derive(Default)]
struct FakeState {
    routes: RouteList,
    schedules: HashMap<RouteId, ScheduleLookup>,
    predictions: HashMap<RouteId, Vec<PredictionPoint>>,
    passengers: HashMap<RouteId, Vec<PassengerSample>>,
    mappings: HashMap<RouteId, RouteMapping>,
    etas: HashMap<(String, String), EtaEstimate>,
    failing: HashSet<Feed>,
    push_error: Option<String>,
    gates: HashMap<(RouteId, Feed), oneshot::Receiver<()>>,
    eta_calls: usize,
}

/// In-memory backend. Clones share state, so a test can keep a handle
/// while the dashboard owns another.
#[derive(Clone, Default)]
pub struct FakeTransit {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransit {
    pub fn new(routes: &[&str]) -> Self {
        let fake = FakeTransit::default();
        fake.set_routes(routes);
        fake
    }

    fn with<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn set_routes(&self, routes: &[&str]) {
        self.with(|s| s.routes = routes.iter().map(|&r| RouteId::from(r)).collect());
    }

    pub fn set_schedule(&self, route: &str, schedule: ScheduleLookup) {
        self.with(|s| s.schedules.insert(route.into(), schedule));
    }

    pub fn set_predictions(&self, route: &str, predictions: Vec<PredictionPoint>) {
        self.with(|s| s.predictions.insert(route.into(), predictions));
    }

    pub fn set_passengers(&self, route: &str, passengers: Vec<PassengerSample>) {
        self.with(|s| s.passengers.insert(route.into(), passengers));
    }

    pub fn set_mapping(&self, route: &str, mapping: RouteMapping) {
        self.with(|s| s.mappings.insert(route.into(), mapping));
    }

    pub fn set_eta(&self, origin: &str, destination: &str, eta: EtaEstimate) {
        self.with(|s| {
            s.etas
                .insert((origin.to_string(), destination.to_string()), eta)
        });
    }

    /// Writes answer success status with this error in the payload
    pub fn set_push_error(&self, error: &str) {
        self.with(|s| s.push_error = Some(error.to_string()));
    }

    pub fn fail(&self, feed: Feed) {
        self.with(|s| s.failing.insert(feed));
    }

    pub fn recover(&self, feed: Feed) {
        self.with(|s| s.failing.remove(&feed));
    }

    /// The next `feed` fetch for `route` waits until the gate is released.
    /// Only predictions, mapping and ETA fetches are gated. ETA fetches are
    /// keyed by their origin.
    pub fn hold(&self, route: &str, feed: Feed) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.with(|s| s.gates.insert((route.into(), feed), rx));
        Gate(tx)
    }

    pub fn eta_calls(&self) -> usize {
        self.with(|s| s.eta_calls)
    }

    async fn pass(&self, route_id: &RouteId, feed: Feed) -> ClientResult<()> {
        let gate = self.with(|s| s.gates.remove(&(route_id.clone(), feed)));
        if let Some(gate) = gate {
            gate.await.ok();
        }
        self.check(feed)
    }

    fn check(&self, feed: Feed) -> ClientResult<()> {
        if self.with(|s| s.failing.contains(&feed)) {
            return Err(ClientError::Transport(500, format!("fake {:?}", feed)));
        }
        Ok(())
    }
}

impl TransitApi for FakeTransit {
    async fn list_routes(&self) -> ClientResult<RouteList> {
        self.check(Feed::Routes)?;
        Ok(self.with(|s| s.routes.clone()))
    }

    async fn get_predictions(&self, route_id: &RouteId) -> ClientResult<Vec<PredictionPoint>> {
        self.pass(route_id, Feed::Predictions).await?;
        Ok(self.with(|s| s.predictions.get(route_id).cloned().unwrap_or_default()))
    }

    async fn get_schedule(&self, route_id: &RouteId) -> ClientResult<ScheduleLookup> {
        self.check(Feed::Schedule)?;
        Ok(self.with(|s| {
            s.schedules
                .get(route_id)
                .cloned()
                .unwrap_or_else(|| ScheduleLookup::Unavailable("no schedule".to_string()))
        }))
    }

    async fn get_route_mapping(&self, route_id: &RouteId) -> ClientResult<RouteMapping> {
        self.pass(route_id, Feed::Mapping).await?;
        self.with(|s| s.mappings.get(route_id).cloned())
            .ok_or_else(|| ClientError::NoMapping(route_id.to_string()))
    }

    async fn get_eta(&self, origin: &str, destination: &str) -> ClientResult<EtaEstimate> {
        self.with(|s| s.eta_calls += 1);
        self.pass(&RouteId::from(origin), Feed::Eta).await?;
        self.with(|s| {
            s.etas
                .get(&(origin.to_string(), destination.to_string()))
                .cloned()
        })
        .ok_or_else(|| ClientError::Transport(404, "fake eta".to_string()))
    }

    async fn get_passenger_data(&self, route_id: &RouteId) -> ClientResult<Vec<PassengerSample>> {
        self.check(Feed::Passengers)?;
        Ok(self.with(|s| s.passengers.get(route_id).cloned().unwrap_or_default()))
    }

    async fn push_route_mapping(
        &self,
        route_id: &RouteId,
        origin: &str,
        destination: &str,
    ) -> ClientResult<RouteMapping> {
        self.check(Feed::Push)?;
        if let Some(error) = self.with(|s| s.push_error.clone()) {
            return Err(ClientError::Validation(error));
        }

        let mapping = RouteMapping::new(origin, destination);
        self.set_mapping(route_id.as_str(), mapping.clone());
        Ok(mapping)
    }
}
