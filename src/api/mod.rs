pub mod endpoint;
pub mod error;
pub mod request;
pub mod response;

use crate::model;
pub use error::Error;

use md5::{Digest, Md5};
use response::Envelope;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

/// Bearer token lifetime documented by the service.
const TOKEN_VALIDITY: Duration = Duration::from_secs(7200);

/* The token is sent verbatim, no `Bearer ` prefix. */
const AUTHORIZATION_HEADER: &str = "Authorization";

pub fn api(api_url: String, username: String, password: String) -> model::Api {
    model::Api {
        api_url,
        username,
        password,
    }
}

/// Token state for one account. A session that never authenticated reports
/// expired; refresh is always caller-driven, right before use.
#[derive(Debug, Default)]
pub struct Session {
    token: Option<String>,
    expires_at: Option<Instant>,
}

impl Session {
    fn record(&mut self, token: String) {
        self.token = Some(token);
        self.expires_at = Some(Instant::now() + TOKEN_VALIDITY);
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => true,
        }
    }

    /// Drop the cached token so the next data request re-authenticates.
    pub fn invalidate(&mut self) {
        self.token = None;
        self.expires_at = None;
    }
}

fn decode_envelope(body: String) -> Result<Envelope, Error> {
    serde_json::from_str(&body).map_err(|e| Error::Protocol(e.to_string(), body))
}

pub struct Client {
    api: model::Api,
    http: reqwest::Client,
    session: Session,
}

impl Client {
    pub fn new(api: model::Api) -> Result<Client, Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let http = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Internal(format!("unable to build HTTP client: {}", e)))?;

        Ok(Client {
            api,
            http,
            session: Session::default(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Send the username and a one-way digest of the password, recording the
    /// returned token. Expected rejections (bad credentials) come back as
    /// `Ok(false)` with any previous token left in place; transport and
    /// protocol failures propagate.
    pub async fn authenticate(&mut self) -> Result<bool, Error> {
        let body = request::Login {
            user_name: self.api.username.to_owned(),
            password: format!("{:x}", Md5::digest(self.api.password.as_bytes())),
        };
        let url = format!("{}{}", self.api.api_url, endpoint::AUTH);

        let envelope = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))
            .map(|r| r.text())?
            .await
            .map_err(|e| Error::Transport(format!("error reading API response: {}", e)))
            .map(decode_envelope)??;

        if !envelope.is_success() {
            log::error!(
                "authentication failed: {} - {}",
                envelope.status,
                envelope.message
            );
            return Ok(false);
        }

        let login = serde_json::from_value::<response::auth::Login>(envelope.data.clone())
            .map_err(|e| {
                Error::Protocol(
                    format!("login payload: {}", e),
                    envelope.data.to_string(),
                )
            })?;
        self.session.record(login.token);
        Ok(true)
    }

    /// Lazy token guard run before every data request.
    async fn ensure_token(&mut self) -> Result<(), Error> {
        if !self.session.is_expired() {
            return Ok(());
        }

        log::debug!("token missing or expired, authenticating");
        if self.authenticate().await? {
            Ok(())
        } else {
            Err(Error::AuthRejected(
                "credentials rejected during token refresh".to_string(),
            ))
        }
    }

    /// POST `body` to `endpoint` with the current token and decode the
    /// uniform envelope. Upstream rejections come back as a normal envelope
    /// for the caller to interpret.
    async fn post<T: Serialize>(
        &self,
        endpoint: &endpoint::Endpoint,
        body: &T,
    ) -> Result<Envelope, Error> {
        let url = format!("{}{}", self.api.api_url, endpoint);

        let mut request = self.http.post(url).json(body);
        if let Some(token) = &self.session.token {
            request = request.header(AUTHORIZATION_HEADER, token);
        }

        let response_text = request
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))
            .map(|r| r.text())?
            .await
            .map_err(|e| Error::Transport(format!("error reading API response: {}", e)))?;

        log::trace!("endpoint: {}, response: {}", endpoint, response_text);

        decode_envelope(response_text)
    }

    /// List the account's stations. One fixed-size page; an upstream
    /// rejection or an unexpected payload shape reads as zero stations.
    pub async fn stations(&mut self) -> Result<Vec<model::Station>, Error> {
        self.ensure_token().await?;

        let envelope = self
            .post(endpoint::STATIONS, &request::StationPageQuery::first_page())
            .await?;
        if !envelope.is_success() {
            log::warn!(
                "failed to list stations: {} - {}",
                envelope.status,
                envelope.message
            );
            return Ok(Vec::new());
        }

        match serde_json::from_value::<response::station_page::Page>(envelope.data) {
            Ok(page) => Ok(page
                .list
                .into_iter()
                .map(|record| model::Station {
                    id: record.id,
                    name: record.name.unwrap_or_default(),
                })
                .collect()),
            Err(e) => {
                log::warn!("undecodable station page payload: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// List the DTUs installed at `station_id`. The model number doubles as
    /// the display name.
    pub async fn dtus(&mut self, station_id: &str) -> Result<Vec<model::Device>, Error> {
        self.ensure_token().await?;

        let envelope = self
            .post(
                endpoint::DTUS,
                &request::DevicePageQuery::for_station(station_id)?,
            )
            .await?;
        if !envelope.is_success() {
            log::warn!(
                "failed to list dtus for station {}: {} - {}",
                station_id,
                envelope.status,
                envelope.message
            );
            return Ok(Vec::new());
        }

        match serde_json::from_value::<response::device_page::DtuPage>(envelope.data) {
            Ok(page) => Ok(page
                .list
                .into_iter()
                .map(|record| model::Device {
                    id: record.id,
                    name: record.model_no.unwrap_or_default(),
                })
                .collect()),
            Err(e) => {
                log::warn!(
                    "undecodable dtu page payload for station {}: {}",
                    station_id,
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    /// List the microinverters installed at `station_id`. The initial
    /// hardware number doubles as the display name.
    pub async fn microinverters(&mut self, station_id: &str) -> Result<Vec<model::Device>, Error> {
        self.ensure_token().await?;

        let envelope = self
            .post(
                endpoint::MICROINVERTERS,
                &request::DevicePageQuery::for_station(station_id)?,
            )
            .await?;
        if !envelope.is_success() {
            log::warn!(
                "failed to list microinverters for station {}: {} - {}",
                station_id,
                envelope.status,
                envelope.message
            );
            return Ok(Vec::new());
        }

        match serde_json::from_value::<response::device_page::MicroPage>(envelope.data) {
            Ok(page) => Ok(page
                .list
                .into_iter()
                .map(|record| model::Device {
                    id: record.id,
                    name: record.init_hard_no.unwrap_or_default(),
                })
                .collect()),
            Err(e) => {
                log::warn!(
                    "undecodable microinverter page payload for station {}: {}",
                    station_id,
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    /// Real-time readings for a station; empty map on upstream rejection.
    pub async fn station_real_data(
        &mut self,
        station_id: &str,
    ) -> Result<Map<String, Value>, Error> {
        self.ensure_token().await?;

        let envelope = self
            .post(
                endpoint::STATION_REAL_DATA,
                &request::StationQuery::new(station_id)?,
            )
            .await?;
        if envelope.is_success() {
            Ok(envelope.into_object())
        } else {
            log::error!(
                "failed to get real-time data for station {}: {} - {}",
                station_id,
                envelope.status,
                envelope.message
            );
            Ok(Map::new())
        }
    }

    /// Real-time readings for a microinverter; empty map on upstream
    /// rejection.
    pub async fn micro_real_data(
        &mut self,
        station_id: &str,
        micro_id: &str,
    ) -> Result<Map<String, Value>, Error> {
        self.ensure_token().await?;

        let envelope = self
            .post(
                endpoint::MICRO_DETAIL,
                &request::DeviceQuery::new(station_id, micro_id)?,
            )
            .await?;
        if envelope.is_success() {
            Ok(envelope.into_object())
        } else {
            log::error!(
                "failed to get real-time data for microinverter {}: {} - {}",
                micro_id,
                envelope.status,
                envelope.message
            );
            Ok(Map::new())
        }
    }

    /// Real-time readings for a DTU, merged from two calls. The detail
    /// endpoint is the primary source; the per-station listing is consulted
    /// afterwards only to patch in `warn_data` and `model_no`, which the
    /// detail endpoint does not return. A rejected detail call returns the
    /// payload accumulated so far and skips the listing call.
    pub async fn dtu_real_data(
        &mut self,
        station_id: &str,
        dtu_id: &str,
    ) -> Result<Map<String, Value>, Error> {
        self.ensure_token().await?;

        let mut data = Map::new();

        let envelope = self
            .post(
                endpoint::DTU_DETAIL,
                &request::DeviceQuery::new(station_id, dtu_id)?,
            )
            .await?;
        if !envelope.is_success() {
            log::error!(
                "failed to get real-time data for dtu {}: {} - {}",
                dtu_id,
                envelope.status,
                envelope.message
            );
            return Ok(data);
        }
        data = envelope.into_object();

        let envelope = self
            .post(
                endpoint::DTUS,
                &request::DevicePageQuery::for_station(station_id)?,
            )
            .await?;
        if !envelope.is_success() {
            log::error!(
                "failed to get listing data for dtu {}: {} - {}",
                dtu_id,
                envelope.status,
                envelope.message
            );
            return Ok(data);
        }

        match serde_json::from_value::<response::device_page::DtuPage>(envelope.data) {
            Ok(page) => {
                if let Some(entry) = page.list.into_iter().find(|entry| entry.id == dtu_id) {
                    data.insert("warn_data".to_string(), entry.warn_data);
                    data.insert(
                        "model_no".to_string(),
                        entry.model_no.map(Value::String).unwrap_or(Value::Null),
                    );
                }
            }
            Err(e) => log::warn!(
                "undecodable dtu page payload for station {}: {}",
                station_id,
                e
            ),
        }

        Ok(data)
    }
}
