use std::collections::HashMap;

use reqwest::{Response, StatusCode};
use url::Url;

use super::entities::{
    ErrorPayload, EtaRecord, MappingRecord, PassengersResponse, PredictionsResponse,
    PushRoutesRequest, RoutesResponse, ScheduleRecord,
};
use super::error::{ClientError, ClientResult};
use super::{ScheduleLookup, TransitApi};
use crate::entities::{
    EtaEstimate, PassengerSample, PredictionPoint, RouteId, RouteList, RouteMapping,
};

/// Candidate paths for reading a route mapping, tried in order.
/// The backend has served the resource under both forms.
const MAPPING_PATHS: [&str; 2] = ["api/routeMapping", "api/route-mapping/"];

/// Who we are talking to and as whom
#[derive(Clone, Debug)]
pub struct Session {
    pub api_base: Url,
    pub token: String,
}

impl Session {
    pub fn new(api_base: Url, token: impl Into<String>) -> Self {
        Session {
            api_base,
            token: token.into(),
        }
    }
}

/// Parses a base URL so that relative paths join beneath it
pub fn base_url(raw: &str) -> ClientResult<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[derive(Clone)]
pub struct TransitClient {
    client: reqwest::Client,
    session: Session,
}

impl TransitClient {
    pub fn new(session: Session) -> ClientResult<TransitClient> {
        let client = TransitClient {
            client: reqwest::Client::builder()
                .build()
                .map_err(|e| ClientError::Init(e.to_string()))?,
            session,
        };

        Ok(client)
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<Url> {
        let mut url = self.session.api_base.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn send(&self, url: Url) -> ClientResult<Response> {
        log::debug!("Requesting {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.session.token)
            .send()
            .await?;
        Ok(response)
    }

    /// Any non-success status is a transport error
    async fn request_text(&self, url: Url) -> ClientResult<String> {
        let response = self.send(url.clone()).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Transport(status.as_u16(), url.to_string()));
        }

        let data_str = response.text().await?;
        log::trace!("Response: {}", data_str);
        Ok(data_str)
    }

    async fn request<T>(&self, url: Url) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let data_str = self.request_text(url).await?;
        let data = serde_json::from_str(&data_str)?;
        Ok(data)
    }

    async fn try_mapping_path(&self, path: &str, route_id: &RouteId) -> ClientResult<RouteMapping> {
        let url = self.url(path, &[("route_id", route_id.as_str())])?;
        let data_str = self.request_text(url.clone()).await?;

        if let Ok(ErrorPayload { error: Some(error) }) = serde_json::from_str::<ErrorPayload>(&data_str) {
            return Err(ClientError::Transport(StatusCode::OK.as_u16(), format!("{}: {}", url, error)));
        }

        let record: MappingRecord = serde_json::from_str(&data_str)?;
        Ok(record.into())
    }
}

impl TransitApi for TransitClient {
    async fn list_routes(&self) -> ClientResult<RouteList> {
        let url = self.url("api/routes/", &[])?;
        let RoutesResponse { routes } = self.request(url).await?;
        Ok(routes)
    }

    async fn get_predictions(&self, route_id: &RouteId) -> ClientResult<Vec<PredictionPoint>> {
        let url = self.url("api/predictions/", &[("route_id", route_id.as_str())])?;
        let PredictionsResponse { predictions } = self.request(url).await?;
        Ok(predictions.into_iter().map(Into::into).collect())
    }

    async fn get_schedule(&self, route_id: &RouteId) -> ClientResult<ScheduleLookup> {
        let url = self.url("api/schedule/", &[("route_id", route_id.as_str())])?;
        let data_str = self.request_text(url).await?;

        let ErrorPayload { error } = serde_json::from_str(&data_str)?;
        if let Some(error) = error {
            return Ok(ScheduleLookup::Unavailable(error));
        }

        let record: ScheduleRecord = serde_json::from_str(&data_str)?;
        Ok(ScheduleLookup::Available(record.into()))
    }

    async fn get_route_mapping(&self, route_id: &RouteId) -> ClientResult<RouteMapping> {
        for path in MAPPING_PATHS {
            match self.try_mapping_path(path, route_id).await {
                Ok(mapping) => return Ok(mapping),
                Err(e @ ClientError::Deserialize(_)) => return Err(e),
                Err(e) => {
                    log::debug!("Mapping path {} failed for {}: {}", path, route_id, e);
                }
            }
        }

        Err(ClientError::NoMapping(route_id.to_string()))
    }

    async fn get_eta(&self, origin: &str, destination: &str) -> ClientResult<EtaEstimate> {
        let url = self.url(
            "api/eta/",
            &[("origin", origin), ("destination", destination)],
        )?;
        let record: EtaRecord = self.request(url).await?;
        Ok(record.into())
    }

    async fn get_passenger_data(&self, route_id: &RouteId) -> ClientResult<Vec<PassengerSample>> {
        let url = self.url("api/passengers/", &[("route_id", route_id.as_str())])?;
        let PassengersResponse { passenger_data } = self.request(url).await?;
        Ok(passenger_data
            .unwrap_or_default()
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn push_route_mapping(
        &self,
        route_id: &RouteId,
        origin: &str,
        destination: &str,
    ) -> ClientResult<RouteMapping> {
        let url = self.url("api/operator/routes/", &[])?;
        let body = PushRoutesRequest {
            routes: HashMap::from([(route_id.as_str(), [origin, destination])]),
        };

        log::debug!("Posting mapping for {} to {}", route_id, url);
        let response = self
            .client
            .post(url.clone())
            .bearer_auth(&self.session.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let data_str = response.text().await?;
        log::trace!("Response: {}", data_str);

        // Either the status or the payload can carry the failure
        let ErrorPayload { error } =
            serde_json::from_str::<ErrorPayload>(&data_str).unwrap_or_default();
        match (status.is_success(), error) {
            (_, Some(error)) => return Err(ClientError::Validation(error)),
            (false, None) => return Err(ClientError::Transport(status.as_u16(), url.to_string())),
            (true, None) => {}
        }

        let echoed = serde_json::from_str::<MappingRecord>(&data_str)
            .map(RouteMapping::from)
            .ok()
            .filter(|m| m.endpoints().is_some());
        Ok(echoed.unwrap_or_else(|| RouteMapping::new(origin, destination)))
    }
}
